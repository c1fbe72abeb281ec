use std::sync::Arc;

use poem::Request;
use poem_openapi::{param::Path, payload::Json, OpenApi, Tags};

use crate::api::helpers::{AuthGate, BearerAuth};
use crate::api::Api;
use crate::errors::api::admin::AdminError;
use crate::services::{AuditRecorder, PermissionService};
use crate::stores::{CredentialStore, RoleStore};
use crate::types::db::user;
use crate::types::dto::admin::{
    AssignRoleRequest, CreateUserRequest, CreateUserResponse, GrantPermissionRequest,
    PermissionResponse, RoleResponse, UpdateUserStatusRequest,
};
use crate::types::dto::common::MessageResponse;
use crate::types::internal::audit::{AuditAction, AuditEvent};
use crate::types::internal::permissions;

#[derive(Tags)]
enum AdminTags {
    /// User provisioning and lifecycle
    Users,
    /// Roles and the permission catalog
    Roles,
}

/// Administrative API endpoints
///
/// Each operation declares its required permission as a constant from the
/// permission catalog; none of them derive it from request data.
pub struct AdminApi {
    credentials: Arc<CredentialStore>,
    roles: Arc<RoleStore>,
    permissions: Arc<PermissionService>,
    audit: Arc<AuditRecorder>,
    gate: Arc<AuthGate>,
}

impl Api for AdminApi {}

impl AdminApi {
    /// Create a new AdminApi
    pub fn new(
        credentials: Arc<CredentialStore>,
        roles: Arc<RoleStore>,
        permissions: Arc<PermissionService>,
        audit: Arc<AuditRecorder>,
        gate: Arc<AuthGate>,
    ) -> Self {
        Self {
            credentials,
            roles,
            permissions,
            audit,
            gate,
        }
    }
}

#[OpenApi(prefix_path = "/admin")]
impl AdminApi {
    /// Provision a new user
    #[oai(path = "/users", method = "post", tag = "AdminTags::Users")]
    async fn create_user(
        &self,
        req: &Request,
        auth: BearerAuth,
        body: Json<CreateUserRequest>,
    ) -> Result<Json<CreateUserResponse>, AdminError> {
        let claims = self
            .gate
            .require(&auth, permissions::USER_MANAGEMENT)
            .await?;
        let ctx = self.authenticated_context(req, &claims);

        let role = self
            .roles
            .find_role_by_name(&body.role_name)
            .await?
            .ok_or_else(|| AdminError::role_not_found(&body.role_name))?;

        let created = self
            .credentials
            .create_user(&body.email, &body.display_name, &body.password, &role.id)
            .await?;

        self.audit
            .record(
                AuditEvent::new(AuditAction::Create, "user")
                    .with_context(&ctx)
                    .with_resource_id(created.id.clone())
                    .with_detail("email", created.email.clone())
                    .with_detail("role_name", role.name),
            )
            .await;

        Ok(Json(CreateUserResponse {
            user_id: created.id,
        }))
    }

    /// Change a user's status ("active"/"disabled")
    ///
    /// Users are never deleted: disabling preserves audit attribution.
    #[oai(path = "/users/:user_id/status", method = "put", tag = "AdminTags::Users")]
    async fn set_user_status(
        &self,
        req: &Request,
        auth: BearerAuth,
        user_id: Path<String>,
        body: Json<UpdateUserStatusRequest>,
    ) -> Result<Json<MessageResponse>, AdminError> {
        let claims = self
            .gate
            .require(&auth, permissions::USER_MANAGEMENT)
            .await?;
        let ctx = self.authenticated_context(req, &claims);

        if body.status != user::STATUS_ACTIVE && body.status != user::STATUS_DISABLED {
            return Err(AdminError::bad_request(format!(
                "Unknown status: {}",
                body.status
            )));
        }

        self.credentials.set_status(&user_id.0, &body.status).await?;

        self.audit
            .record(
                AuditEvent::new(AuditAction::Update, "user")
                    .with_context(&ctx)
                    .with_resource_id(user_id.0.clone())
                    .with_detail("change", "status")
                    .with_detail("status", body.status.clone()),
            )
            .await;

        Ok(Json(MessageResponse {
            message: "Status updated".to_string(),
        }))
    }

    /// Change a user's role
    #[oai(path = "/users/:user_id/role", method = "put", tag = "AdminTags::Users")]
    async fn set_user_role(
        &self,
        req: &Request,
        auth: BearerAuth,
        user_id: Path<String>,
        body: Json<AssignRoleRequest>,
    ) -> Result<Json<MessageResponse>, AdminError> {
        let claims = self
            .gate
            .require(&auth, permissions::USER_MANAGEMENT)
            .await?;
        let ctx = self.authenticated_context(req, &claims);

        let role = self
            .roles
            .find_role_by_name(&body.role_name)
            .await?
            .ok_or_else(|| AdminError::role_not_found(&body.role_name))?;

        self.credentials.set_role(&user_id.0, &role.id).await?;

        self.audit
            .record(
                AuditEvent::new(AuditAction::Update, "user")
                    .with_context(&ctx)
                    .with_resource_id(user_id.0.clone())
                    .with_detail("change", "role")
                    .with_detail("role_name", role.name),
            )
            .await;

        Ok(Json(MessageResponse {
            message: "Role updated".to_string(),
        }))
    }

    /// List roles with their resolved permission keys
    #[oai(path = "/roles", method = "get", tag = "AdminTags::Roles")]
    async fn list_roles(&self, auth: BearerAuth) -> Result<Json<Vec<RoleResponse>>, AdminError> {
        self.gate
            .require(&auth, permissions::ROLE_MANAGEMENT)
            .await?;

        let roles = self.roles.list_roles().await?;
        let mut out = Vec::with_capacity(roles.len());
        for role in roles {
            let mut keys: Vec<String> = self
                .roles
                .permission_keys_for_role(&role.id)
                .await?
                .into_iter()
                .collect();
            keys.sort();
            out.push(RoleResponse {
                id: role.id,
                name: role.name,
                display_name: role.display_name,
                permissions: keys,
            });
        }
        Ok(Json(out))
    }

    /// List the permission catalog
    #[oai(path = "/permissions", method = "get", tag = "AdminTags::Roles")]
    async fn list_permissions(
        &self,
        auth: BearerAuth,
    ) -> Result<Json<Vec<PermissionResponse>>, AdminError> {
        self.gate
            .require(&auth, permissions::ROLE_MANAGEMENT)
            .await?;

        let rows = self.roles.list_permissions().await?;
        Ok(Json(
            rows.into_iter()
                .map(|p| PermissionResponse {
                    key: p.key,
                    label: p.label,
                    category: p.category,
                })
                .collect(),
        ))
    }

    /// Grant a permission to a role
    #[oai(
        path = "/roles/:role_name/permissions",
        method = "post",
        tag = "AdminTags::Roles"
    )]
    async fn grant_permission(
        &self,
        req: &Request,
        auth: BearerAuth,
        role_name: Path<String>,
        body: Json<GrantPermissionRequest>,
    ) -> Result<Json<MessageResponse>, AdminError> {
        let claims = self
            .gate
            .require(&auth, permissions::ROLE_MANAGEMENT)
            .await?;
        let ctx = self.authenticated_context(req, &claims);

        self.permissions
            .grant(&ctx, &role_name.0, &body.permission_key)
            .await?;

        Ok(Json(MessageResponse {
            message: "Permission granted".to_string(),
        }))
    }

    /// Revoke a permission from a role
    #[oai(
        path = "/roles/:role_name/permissions/:permission_key",
        method = "delete",
        tag = "AdminTags::Roles"
    )]
    async fn revoke_permission(
        &self,
        req: &Request,
        auth: BearerAuth,
        role_name: Path<String>,
        permission_key: Path<String>,
    ) -> Result<Json<MessageResponse>, AdminError> {
        let claims = self
            .gate
            .require(&auth, permissions::ROLE_MANAGEMENT)
            .await?;
        let ctx = self.authenticated_context(req, &claims);

        self.permissions
            .revoke(&ctx, &role_name.0, &permission_key.0)
            .await?;

        Ok(Json(MessageResponse {
            message: "Permission revoked".to_string(),
        }))
    }
}
