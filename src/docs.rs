use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::json;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::authz;
use crate::models;
use crate::routes;

#[derive(OpenApi)]
#[openapi(
	paths(
		routes::health::health,
		routes::decisions::decide,
		routes::users::create_user,
		routes::users::get_user,
		routes::users::assign_role,
		routes::users::unassign_role,
		routes::users::effective_permissions,
		routes::roles::list_roles,
		routes::roles::create_role,
		routes::roles::get_role,
		routes::roles::update_role,
		routes::roles::delete_role,
		routes::roles::list_overrides,
		routes::roles::set_override,
		routes::roles::remove_override,
		routes::resources::register_resource,
		routes::resources::get_resource,
		routes::resources::transfer_resource,
		routes::grants::list_grants,
		routes::grants::create_grant,
		routes::grants::revoke_grant,
		routes::audit::list_audit,
	),
	components(
		schemas(
			routes::health::HealthResponse,
			authz::catalog::OrgRole,
			authz::catalog::Category,
			authz::catalog::Permission,
			authz::catalog::AccessLevel,
			authz::catalog::ResourceType,
			authz::catalog::Action,
			authz::engine::DenyReason,
			models::user::User,
			models::user::UserCreateRequest,
			models::user::EffectivePermissionsResponse,
			models::user::PermissionStatus,
			models::custom_role::CustomRole,
			models::custom_role::CustomRoleDetail,
			models::custom_role::RoleCreateRequest,
			models::custom_role::RoleUpdateRequest,
			models::custom_role::PermissionOverride,
			models::custom_role::SetOverrideRequest,
			models::custom_role::AssignRoleRequest,
			models::resource::Resource,
			models::resource::ResourceRegisterRequest,
			models::resource::TransferRequest,
			models::grant::ShareGrant,
			models::grant::GrantCreateRequest,
			models::audit::AuditAction,
			models::audit::AuditLogEntry,
			models::decision::DecideRequest,
			models::decision::DecisionResponse,
		)
	),
	tags(
		(name = "Health", description = "Liveness and database checks"),
		(name = "Decisions", description = "Authorization verdicts"),
		(name = "Users", description = "Identity snapshots and role assignment"),
		(name = "Roles", description = "Custom roles and permission overrides"),
		(name = "Resources", description = "Resource metadata and transfer"),
		(name = "Grants", description = "Sharing grants"),
		(name = "Audit", description = "Append-only audit log"),
	)
)]
pub struct ApiDoc;

pub fn build_openapi(port: u16) -> anyhow::Result<utoipa::openapi::OpenApi> {
	let mut doc = serde_json::to_value(ApiDoc::openapi())?;

	// bearer scheme so Swagger UI's Authorize dialog sends the header
	if let Some(components) = doc.get_mut("components").and_then(|c| c.as_object_mut()) {
		components
			.entry("securitySchemes")
			.or_insert_with(|| json!({}));
	}
	if let Some(schemes) = doc
		.pointer_mut("/components/securitySchemes")
		.and_then(|s| s.as_object_mut())
	{
		schemes.insert(
			"bearerAuth".to_string(),
			json!({ "type": "http", "scheme": "bearer", "bearerFormat": "JWT" }),
		);
	}

	if doc.get("servers").is_none() {
		doc["servers"] = json!([{ "url": format!("http://localhost:{}", port) }]);
	}

	Ok(serde_json::from_value(doc)?)
}

pub fn swagger_routes(doc: utoipa::openapi::OpenApi) -> Router {
	let swagger_config = utoipa_swagger_ui::Config::new(["/api-docs/openapi.json"])
		.try_it_out_enabled(true)
		.with_credentials(true)
		.persist_authorization(true);

	let doc_json = Arc::new(serde_json::to_value(&doc).expect("OpenAPI serialization must succeed"));

	let json_route = {
		let doc_json = Arc::clone(&doc_json);
		get(move || {
			let doc_json = Arc::clone(&doc_json);
			async move { Json((*doc_json).clone()) }
		})
	};

	Router::new()
		.route("/api-docs/openapi.json", json_route)
		.merge(SwaggerUi::new("/docs").config(swagger_config))
}
