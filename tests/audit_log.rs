//! Audit log behavior: exactly one entry per successful mutation, none for
//! failed ones, newest-first listing with a limit, and an intact hash chain.

use anyhow::{Context, Result};
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tempfile::tempdir;
use tower::ServiceExt;
use uuid::Uuid;

use gatekeeper::create_app;
use gatekeeper::jwt::JwtConfig;
use gatekeeper::store;

async fn setup() -> Result<(tempfile::TempDir, SqlitePool, Router)> {
    let dir = tempdir().context("failed to create tempdir")?;
    let db_path = dir.path().join("test.db");

    use sqlx::sqlite::SqliteConnectOptions;
    let opts = SqliteConnectOptions::new()
        .filename(db_path.as_path())
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(opts).await?;

    let migrator = sqlx::migrate::Migrator::new(
        std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations"),
    )
    .await?;
    migrator.run(&pool).await?;

    std::env::set_var("JWT_SECRET", "test-secret");
    let app = create_app(pool.clone()).await?;
    Ok((dir, pool, app))
}

fn token(user_id: Uuid) -> Result<String> {
    Ok(JwtConfig::from_env()?.encode(user_id)?)
}

async fn send(app: &Router, method: &str, uri: &str, token: &str, payload: Option<Value>) -> Result<Response> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", token));

    let req = match payload {
        Some(payload) => builder.body(Body::from(payload.to_string()))?,
        None => builder.body(Body::empty())?,
    };

    Ok(app.clone().oneshot(req).await?)
}

async fn json_body(resp: Response) -> Result<Value> {
    let bytes = body::to_bytes(resp.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

async fn audit_entries(app: &Router, actor: &str, limit: Option<i64>) -> Result<Vec<Value>> {
    let uri = match limit {
        Some(limit) => format!("/audit?limit={}", limit),
        None => "/audit".to_string(),
    };
    let resp = send(app, "GET", &uri, actor, None).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await?;
    Ok(body.as_array().cloned().context("audit response should be an array")?)
}

#[tokio::test]
async fn every_mutation_appends_exactly_one_entry() -> Result<()> {
    let (_dir, pool, app) = setup().await?;
    let admin_id = Uuid::new_v4();
    let actor = token(admin_id)?;

    // Seed a user to assign roles to.
    let resp = send(
        &app,
        "POST",
        "/users",
        &actor,
        Some(json!({"display_name": "subject", "org_role": "member", "department_id": Uuid::new_v4()})),
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let user = json_body(resp).await?;
    let user_id = user.get("id").and_then(|v| v.as_str()).context("missing id")?.to_string();

    assert_eq!(audit_entries(&app, &actor, None).await?.len(), 0, "user sync is not audited");

    // 1: role create
    let resp = send(
        &app,
        "POST",
        "/roles",
        &actor,
        Some(json!({"name": "audited", "base_role": "member"})),
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let role = json_body(resp).await?;
    let role_id = role.get("id").and_then(|v| v.as_str()).context("missing id")?.to_string();

    // 2: override create, 3: override update (same pair), 4: override delete
    for allowed in [false, true] {
        let resp = send(
            &app,
            "PUT",
            &format!("/roles/{}/overrides", role_id),
            &actor,
            Some(json!({"permission": "can_view_users", "allowed": allowed})),
        )
        .await?;
        assert_eq!(resp.status(), StatusCode::OK);
    }
    let resp = send(
        &app,
        "DELETE",
        &format!("/roles/{}/overrides/can_view_users", role_id),
        &actor,
        None,
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    // 5: assign, 6: unassign
    let resp = send(
        &app,
        "POST",
        &format!("/users/{}/role", user_id),
        &actor,
        Some(json!({"role_id": role_id})),
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let resp = send(&app, "DELETE", &format!("/users/{}/role", user_id), &actor, None).await?;
    assert_eq!(resp.status(), StatusCode::OK);

    let entries = audit_entries(&app, &actor, None).await?;
    assert_eq!(entries.len(), 6);

    // Newest first: the unassign tops the list, the role create is last.
    assert_eq!(entries[0].get("entity_type").and_then(|v| v.as_str()), Some("role_assignment"));
    assert_eq!(entries[0].get("action").and_then(|v| v.as_str()), Some("delete"));
    assert_eq!(entries[5].get("entity_type").and_then(|v| v.as_str()), Some("custom_role"));
    assert_eq!(entries[5].get("action").and_then(|v| v.as_str()), Some("create"));

    // The override update recorded both sides of the change.
    let update = &entries[3];
    assert_eq!(update.get("entity_type").and_then(|v| v.as_str()), Some("permission_override"));
    assert_eq!(update.get("action").and_then(|v| v.as_str()), Some("update"));
    assert_eq!(update.get("permission").and_then(|v| v.as_str()), Some("can_view_users"));
    assert_eq!(
        update.pointer("/old_value/allowed").and_then(|v| v.as_bool()),
        Some(false)
    );
    assert_eq!(
        update.pointer("/new_value/allowed").and_then(|v| v.as_bool()),
        Some(true)
    );

    // Actor attribution flows from the bearer token.
    assert_eq!(
        entries[0].get("actor_id").and_then(|v| v.as_str()),
        Some(admin_id.to_string().as_str())
    );

    // Limit caps the page from the newest end.
    let page = audit_entries(&app, &actor, Some(2)).await?;
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].get("id"), entries[0].get("id"));

    // The chain verifies end to end.
    let verified = store::audit::verify_chain(&pool).await?;
    assert_eq!(verified, 6);

    Ok(())
}

#[tokio::test]
async fn failed_mutations_write_no_audit_entry() -> Result<()> {
    let (_dir, pool, app) = setup().await?;
    let actor = token(Uuid::new_v4())?;

    // Removing an override that does not exist fails and leaves no trace.
    let resp = send(
        &app,
        "POST",
        "/roles",
        &actor,
        Some(json!({"name": "lonely", "base_role": "member"})),
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let role = json_body(resp).await?;
    let role_id = role.get("id").and_then(|v| v.as_str()).context("missing id")?.to_string();

    let resp = send(
        &app,
        "DELETE",
        &format!("/roles/{}/overrides/can_view_users", role_id),
        &actor,
        None,
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // A duplicate role name conflicts without an entry.
    let resp = send(
        &app,
        "POST",
        "/roles",
        &actor,
        Some(json!({"name": "lonely", "base_role": "member"})),
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let entries = audit_entries(&app, &actor, None).await?;
    assert_eq!(entries.len(), 1, "only the successful create is recorded");

    let verified = store::audit::verify_chain(&pool).await?;
    assert_eq!(verified, 1);

    Ok(())
}

#[tokio::test]
async fn tampering_breaks_the_chain() -> Result<()> {
    let (_dir, pool, app) = setup().await?;
    let actor = token(Uuid::new_v4())?;

    for name in ["first", "second"] {
        let resp = send(
            &app,
            "POST",
            "/roles",
            &actor,
            Some(json!({"name": name, "base_role": "member"})),
        )
        .await?;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }
    assert_eq!(store::audit::verify_chain(&pool).await?, 2);

    // Rewrite history behind the store's back.
    sqlx::query("UPDATE audit_log SET action = 'delete' WHERE rowid = 1")
        .execute(&pool)
        .await?;

    assert!(store::audit::verify_chain(&pool).await.is_err());

    Ok(())
}
