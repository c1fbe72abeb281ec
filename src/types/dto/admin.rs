use poem_openapi::Object;
use serde::{Deserialize, Serialize};

/// Request model for user provisioning
#[derive(Object, Debug, Serialize, Deserialize)]
pub struct CreateUserRequest {
    /// Email address (unique)
    pub email: String,

    /// Display name
    pub display_name: String,

    /// Initial password
    pub password: String,

    /// Role name to assign
    pub role_name: String,
}

/// Response model for user provisioning
#[derive(Object, Debug, Serialize, Deserialize)]
pub struct CreateUserResponse {
    /// ID of the created user
    pub user_id: String,
}

/// Request model for changing a user's status
#[derive(Object, Debug, Serialize, Deserialize)]
pub struct UpdateUserStatusRequest {
    /// "active" or "disabled"
    pub status: String,
}

/// Request model for changing a user's role
#[derive(Object, Debug, Serialize, Deserialize)]
pub struct AssignRoleRequest {
    /// Role name to assign
    pub role_name: String,
}

/// Request model for granting a permission to a role
#[derive(Object, Debug, Serialize, Deserialize)]
pub struct GrantPermissionRequest {
    /// Permission key to grant (e.g. "inventory.view")
    pub permission_key: String,
}

/// Role with its resolved permission keys
#[derive(Object, Debug, Serialize, Deserialize)]
pub struct RoleResponse {
    /// Role ID (UUID)
    pub id: String,

    /// Role name
    pub name: String,

    /// Human-readable name
    pub display_name: String,

    /// Permission keys held by the role
    pub permissions: Vec<String>,
}

/// Permission catalog entry
#[derive(Object, Debug, Serialize, Deserialize)]
pub struct PermissionResponse {
    /// Stable permission key
    pub key: String,

    /// Human-readable label
    pub label: String,

    /// Category (namespace)
    pub category: String,
}
