//! Sharing grants: who may create them, level ordering, duplicates, and
//! revocation.

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

async fn create_user(app: &Router, actor: &str, org_role: &str, department_id: Uuid) -> Result<Uuid> {
    let resp = send(
        app,
        "POST",
        "/users",
        actor,
        Some(json!({"display_name": "user", "org_role": org_role, "department_id": department_id})),
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let user = json_body(resp).await?;
    Ok(Uuid::parse_str(user.get("id").and_then(|v| v.as_str()).context("missing id")?)?)
}

async fn register_contact(app: &Router, actor: &str, owner_id: Uuid, department_id: Uuid) -> Result<Uuid> {
    let resp = send(
        app,
        "POST",
        "/resources",
        actor,
        Some(json!({"resource_type": "contact", "owner_id": owner_id, "department_id": department_id})),
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let resource = json_body(resp).await?;
    Ok(Uuid::parse_str(resource.get("id").and_then(|v| v.as_str()).context("missing id")?)?)
}

#[tokio::test]
async fn owner_shares_and_duplicates_conflict() -> Result<()> {
    let (_dir, _pool, app) = setup().await?;
    let actor = token(Uuid::new_v4())?;

    let dept = Uuid::new_v4();
    let owner = create_user(&app, &actor, "member", dept).await?;
    let grantee = create_user(&app, &actor, "member", dept).await?;
    let contact = register_contact(&app, &actor, owner, dept).await?;

    let owner_token = token(owner)?;
    let uri = format!("/resources/contact/{}/grants", contact);

    let resp = send(
        &app,
        "POST",
        &uri,
        &owner_token,
        Some(json!({"shared_with_id": grantee, "access_level": "view", "note": "covering"})),
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::CREATED);

    // Exactly one grant per (resource, user) pair.
    let resp = send(
        &app,
        "POST",
        &uri,
        &owner_token,
        Some(json!({"shared_with_id": grantee, "access_level": "edit"})),
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = send(&app, "GET", &uri, &owner_token, None).await?;
    let grants = json_body(resp).await?;
    assert_eq!(grants.as_array().map(|a| a.len()), Some(1));
    assert_eq!(
        grants[0].get("access_level").and_then(|v| v.as_str()),
        Some("view"),
        "the first grant must not be overwritten"
    );

    Ok(())
}

#[tokio::test]
async fn view_grantee_cannot_share_but_full_grantee_can() -> Result<()> {
    let (_dir, _pool, app) = setup().await?;
    let actor = token(Uuid::new_v4())?;

    let dept = Uuid::new_v4();
    let owner = create_user(&app, &actor, "member", dept).await?;
    let viewer = create_user(&app, &actor, "member", dept).await?;
    let deputy = create_user(&app, &actor, "member", dept).await?;
    let outsider = create_user(&app, &actor, "member", dept).await?;
    let contact = register_contact(&app, &actor, owner, dept).await?;

    let owner_token = token(owner)?;
    let uri = format!("/resources/contact/{}/grants", contact);

    let resp = send(
        &app,
        "POST",
        &uri,
        &owner_token,
        Some(json!({"shared_with_id": viewer, "access_level": "view"})),
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let resp = send(
        &app,
        "POST",
        &uri,
        &owner_token,
        Some(json!({"shared_with_id": deputy, "access_level": "full"})),
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::CREATED);

    // A view-level grantee lacks share authority over the resource.
    let viewer_token = token(viewer)?;
    let resp = send(
        &app,
        "POST",
        &uri,
        &viewer_token,
        Some(json!({"shared_with_id": outsider, "access_level": "view"})),
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // A full-level grantee may share onward.
    let deputy_token = token(deputy)?;
    let resp = send(
        &app,
        "POST",
        &uri,
        &deputy_token,
        Some(json!({"shared_with_id": outsider, "access_level": "view"})),
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::CREATED);

    Ok(())
}

#[tokio::test]
async fn revocation_removes_the_grant() -> Result<()> {
    let (_dir, _pool, app) = setup().await?;
    let actor = token(Uuid::new_v4())?;

    let dept = Uuid::new_v4();
    let owner = create_user(&app, &actor, "member", dept).await?;
    let grantee = create_user(&app, &actor, "member", dept).await?;
    let contact = register_contact(&app, &actor, owner, dept).await?;

    let owner_token = token(owner)?;
    let uri = format!("/resources/contact/{}/grants", contact);

    let resp = send(
        &app,
        "POST",
        &uri,
        &owner_token,
        Some(json!({"shared_with_id": grantee, "access_level": "edit"})),
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = send(&app, "DELETE", &format!("{}/{}", uri, grantee), &owner_token, None).await?;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    // The grantee's access is gone.
    let resp = send(
        &app,
        "POST",
        "/decide",
        &actor,
        Some(json!({"user_id": grantee, "action": "edit", "resource_type": "contact", "resource_id": contact})),
    )
    .await?;
    let verdict = json_body(resp).await?;
    assert_eq!(verdict.get("allow").and_then(|v| v.as_bool()), Some(false));

    // Revoking twice is a 404, not a silent no-op.
    let resp = send(&app, "DELETE", &format!("{}/{}", uri, grantee), &owner_token, None).await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    Ok(())
}
