//! Custom role lifecycle: overrides round-trip through the effective
//! permission map, deactivation falls back to the org role, deletion clears
//! assignments.

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

async fn create_user(app: &Router, actor: &str, org_role: &str) -> Result<Uuid> {
    let resp = send(
        app,
        "POST",
        "/users",
        actor,
        Some(json!({"display_name": "user", "org_role": org_role, "department_id": Uuid::new_v4()})),
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let user = json_body(resp).await?;
    Ok(Uuid::parse_str(user.get("id").and_then(|v| v.as_str()).context("missing id")?)?)
}

async fn create_role(app: &Router, actor: &str, name: &str, base_role: &str) -> Result<Uuid> {
    let resp = send(
        app,
        "POST",
        "/roles",
        actor,
        Some(json!({"name": name, "base_role": base_role})),
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let role = json_body(resp).await?;
    Ok(Uuid::parse_str(role.get("id").and_then(|v| v.as_str()).context("missing id")?)?)
}

/// Pull one permission's entry out of the effective-permissions response.
async fn effective_entry(app: &Router, actor: &str, user: Uuid, permission: &str) -> Result<(bool, String)> {
    let resp = send(app, "GET", &format!("/users/{}/effective-permissions", user), actor, None).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await?;

    let entry = body
        .get("permissions")
        .and_then(|v| v.as_array())
        .and_then(|entries| {
            entries.iter().find(|e| e.get("permission").and_then(|p| p.as_str()) == Some(permission))
        })
        .with_context(|| format!("{} missing from effective permissions", permission))?;

    Ok((
        entry.get("allowed").and_then(|v| v.as_bool()).context("missing allowed")?,
        entry.get("source").and_then(|v| v.as_str()).context("missing source")?.to_string(),
    ))
}

#[tokio::test]
async fn set_then_remove_override_restores_the_default() -> Result<()> {
    let (_dir, _pool, app) = setup().await?;
    let actor = token(Uuid::new_v4())?;

    let user = create_user(&app, &actor, "member").await?;
    let role_id = create_role(&app, &actor, "narrowed-member", "member").await?;

    let resp = send(
        &app,
        "POST",
        &format!("/users/{}/role", user),
        &actor,
        Some(json!({"role_id": role_id})),
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::OK);

    // Member default: can_share_resources allowed.
    let (allowed, source) = effective_entry(&app, &actor, user, "can_share_resources").await?;
    assert!(allowed);
    assert_eq!(source, "default");

    // Pin it to false.
    let resp = send(
        &app,
        "PUT",
        &format!("/roles/{}/overrides", role_id),
        &actor,
        Some(json!({"permission": "can_share_resources", "allowed": false})),
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::OK);

    let (allowed, source) = effective_entry(&app, &actor, user, "can_share_resources").await?;
    assert!(!allowed);
    assert_eq!(source, "override");

    // Re-setting the same pair replaces rather than duplicates.
    let resp = send(
        &app,
        "PUT",
        &format!("/roles/{}/overrides", role_id),
        &actor,
        Some(json!({"permission": "can_share_resources", "allowed": true})),
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = send(&app, "GET", &format!("/roles/{}/overrides", role_id), &actor, None).await?;
    let overrides = json_body(resp).await?;
    assert_eq!(overrides.as_array().map(|a| a.len()), Some(1), "one row per (role, permission)");

    // Removing the override reverts to the base default exactly.
    let resp = send(
        &app,
        "DELETE",
        &format!("/roles/{}/overrides/can_share_resources", role_id),
        &actor,
        None,
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let (allowed, source) = effective_entry(&app, &actor, user, "can_share_resources").await?;
    assert!(allowed);
    assert_eq!(source, "default");

    Ok(())
}

#[tokio::test]
async fn custom_role_narrows_an_admin() -> Result<()> {
    let (_dir, _pool, app) = setup().await?;
    let actor = token(Uuid::new_v4())?;

    let admin = create_user(&app, &actor, "admin").await?;
    let role_id = create_role(&app, &actor, "member-shaped", "member").await?;

    let resp = send(
        &app,
        "POST",
        &format!("/users/{}/role", admin),
        &actor,
        Some(json!({"role_id": role_id})),
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::OK);

    // The admin now resolves through the member base.
    let (allowed, _) = effective_entry(&app, &actor, admin, "can_change_roles").await?;
    assert!(!allowed, "member-based role should strip admin authority");

    Ok(())
}

#[tokio::test]
async fn deactivated_role_falls_back_to_the_org_role() -> Result<()> {
    let (_dir, _pool, app) = setup().await?;
    let actor = token(Uuid::new_v4())?;

    let admin = create_user(&app, &actor, "admin").await?;
    let role_id = create_role(&app, &actor, "temporary", "member").await?;

    let resp = send(
        &app,
        "POST",
        &format!("/users/{}/role", admin),
        &actor,
        Some(json!({"role_id": role_id})),
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::OK);

    let (allowed, _) = effective_entry(&app, &actor, admin, "can_change_roles").await?;
    assert!(!allowed);

    // Deactivate, keeping the role and its assignment on record.
    let resp = send(
        &app,
        "PUT",
        &format!("/roles/{}", role_id),
        &actor,
        Some(json!({"is_active": false})),
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::OK);

    let (allowed, source) = effective_entry(&app, &actor, admin, "can_change_roles").await?;
    assert!(allowed, "deactivated role must not constrain the user");
    assert_eq!(source, "default");

    // Assigning a deactivated role to someone else is rejected.
    let member = create_user(&app, &actor, "member").await?;
    let resp = send(
        &app,
        "POST",
        &format!("/users/{}/role", member),
        &actor,
        Some(json!({"role_id": role_id})),
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    Ok(())
}

#[tokio::test]
async fn assignment_is_single_and_swaps_are_two_phase() -> Result<()> {
    let (_dir, _pool, app) = setup().await?;
    let actor = token(Uuid::new_v4())?;

    let user = create_user(&app, &actor, "member").await?;
    let first = create_role(&app, &actor, "first", "member").await?;
    let second = create_role(&app, &actor, "second", "member").await?;

    let resp = send(
        &app,
        "POST",
        &format!("/users/{}/role", user),
        &actor,
        Some(json!({"role_id": first})),
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::OK);

    // A second assignment conflicts; the swap needs an explicit unassign.
    let resp = send(
        &app,
        "POST",
        &format!("/users/{}/role", user),
        &actor,
        Some(json!({"role_id": second})),
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = send(&app, "DELETE", &format!("/users/{}/role", user), &actor, None).await?;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = send(
        &app,
        "POST",
        &format!("/users/{}/role", user),
        &actor,
        Some(json!({"role_id": second})),
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn deleting_a_role_clears_its_assignments() -> Result<()> {
    let (_dir, _pool, app) = setup().await?;
    let actor = token(Uuid::new_v4())?;

    let user = create_user(&app, &actor, "member").await?;
    let role_id = create_role(&app, &actor, "doomed", "member").await?;

    let resp = send(
        &app,
        "POST",
        &format!("/users/{}/role", user),
        &actor,
        Some(json!({"role_id": role_id})),
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = send(&app, "DELETE", &format!("/roles/{}", role_id), &actor, None).await?;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = send(&app, "GET", &format!("/users/{}", user), &actor, None).await?;
    let body = json_body(resp).await?;
    assert!(body.get("custom_role_id").is_none(), "assignment should be cleared");

    // Duplicate role names stay rejected.
    let resp = send(
        &app,
        "POST",
        "/roles",
        &actor,
        Some(json!({"name": "unique-name", "base_role": "member"})),
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let resp = send(
        &app,
        "POST",
        "/roles",
        &actor,
        Some(json!({"name": "unique-name", "base_role": "admin"})),
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    Ok(())
}

#[tokio::test]
async fn superadmin_cannot_seed_a_custom_role() -> Result<()> {
    let (_dir, _pool, app) = setup().await?;
    let actor = token(Uuid::new_v4())?;

    let resp = send(
        &app,
        "POST",
        "/roles",
        &actor,
        Some(json!({"name": "god-mode", "base_role": "superadmin"})),
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    Ok(())
}
