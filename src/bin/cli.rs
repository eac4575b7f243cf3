//! Operator CLI for out-of-band role administration. Every mutation goes
//! through the same store layer as the HTTP surface, so the audit entry is
//! written in the same transaction as the change.

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;
use uuid::Uuid;

use gatekeeper::authz::catalog::{OrgRole, Permission};
use gatekeeper::store;

#[derive(Parser, Debug)]
#[command(author, version, about = "gatekeeper role administration tool", long_about = None)]
struct Cli {
    /// Acting user recorded as the audit actor; omit for system actions
    #[arg(long, global = true)]
    actor: Option<Uuid>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a custom role inheriting a base org role's defaults
    CreateRole {
        name: String,
        /// Base org role (owner, admin, sub_admin, member)
        base_role: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// Set (or replace) one permission override on a role
    SetOverride {
        role_id: Uuid,
        permission: String,
        allowed: bool,
    },
    /// Remove an override, reverting to the base role's default
    RemoveOverride {
        role_id: Uuid,
        permission: String,
    },
    /// Assign a custom role to a user
    AssignRole {
        user_id: Uuid,
        role_id: Uuid,
    },
    /// Unassign a user's custom role
    UnassignRole {
        user_id: Uuid,
    },
    /// List audit entries, newest first
    ListAudit {
        #[arg(long)]
        limit: Option<i64>,
    },
    /// Re-verify the audit log's hash chain
    AuditVerify,
    /// Apply pending migrations
    MigrateRun,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Try to load env from CWD; when running in Docker the binary CWD may differ,
    // so fall back to the crate-local `.env` using CARGO_MANIFEST_DIR.
    if dotenvy::dotenv().is_err() {
        let crate_env = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(crate_env);
    }

    let cli = Cli::parse();
    let actor = cli.actor;

    match cli.command {
        Commands::CreateRole { name, base_role, description } => {
            let base_role = parse_org_role(&base_role)?;
            let pool = get_pool().await?;
            let role = store::roles::create(
                &pool,
                actor,
                gatekeeper::models::custom_role::RoleCreateRequest { name, description, base_role },
            )
            .await?;
            println!("{}", serde_json::to_string_pretty(&role)?);
        }
        Commands::SetOverride { role_id, permission, allowed } => {
            let permission = parse_permission(&permission)?;
            let pool = get_pool().await?;
            let entry = store::roles::set_override(&pool, actor, role_id, permission, allowed).await?;
            println!("{}", serde_json::to_string_pretty(&entry)?);
        }
        Commands::RemoveOverride { role_id, permission } => {
            let permission = parse_permission(&permission)?;
            let pool = get_pool().await?;
            store::roles::remove_override(&pool, actor, role_id, permission).await?;
            println!("Override removed; {} reverts to the base default", permission.as_str());
        }
        Commands::AssignRole { user_id, role_id } => {
            let pool = get_pool().await?;
            let user = store::users::assign_role(&pool, actor, user_id, role_id).await?;
            println!("{}", serde_json::to_string_pretty(&user)?);
        }
        Commands::UnassignRole { user_id } => {
            let pool = get_pool().await?;
            let user = store::users::unassign_role(&pool, actor, user_id).await?;
            println!("{}", serde_json::to_string_pretty(&user)?);
        }
        Commands::ListAudit { limit } => {
            let pool = get_pool().await?;
            let entries = store::audit::list(&pool, limit).await?;
            println!("{:<38} {:<20} {:<8} {}", "Id", "Entity", "Action", "At");
            for entry in entries {
                println!(
                    "{:<38} {:<20} {:<8} {}",
                    entry.id,
                    entry.entity_type,
                    entry.action.as_str(),
                    entry.created_at.to_rfc3339()
                );
            }
        }
        Commands::AuditVerify => {
            let pool = get_pool().await?;
            let count = store::audit::verify_chain(&pool).await?;
            println!("Audit chain intact ({} entries)", count);
        }
        Commands::MigrateRun => {
            let pool = get_pool().await?;
            let migrator = get_migrator().await?;
            migrator.run(&pool).await?;
            println!("Migrations applied");
        }
    }

    Ok(())
}

fn parse_org_role(value: &str) -> anyhow::Result<OrgRole> {
    OrgRole::parse(value).with_context(|| format!("unknown org role: {}", value))
}

fn parse_permission(value: &str) -> anyhow::Result<Permission> {
    Permission::parse(value).with_context(|| format!("unknown permission: {}", value))
}

async fn get_pool() -> anyhow::Result<SqlitePool> {
    use std::str::FromStr;

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL not set")?;
    let options = sqlx::sqlite::SqliteConnectOptions::from_str(&database_url)
        .context("invalid DATABASE_URL")?
        .create_if_missing(true);

    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .context("failed to connect to database")
}

async fn get_migrator() -> anyhow::Result<sqlx::migrate::Migrator> {
    // Prefer ./migrations (repo root); fall back to the crate-local folder
    // when the CWD differs, as it does in containers.
    let local = Path::new("./migrations");
    let migrator_path = if local.exists() {
        local.to_path_buf()
    } else {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations")
    };

    let migrator_path_display = migrator_path.display().to_string();
    sqlx::migrate::Migrator::new(migrator_path)
        .await
        .with_context(|| format!("failed to load migrations from {}", migrator_path_display))
}
