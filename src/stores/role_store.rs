use std::collections::HashSet;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter, Set,
};
use uuid::Uuid;

use crate::errors::internal::{InternalError, RbacError};
use crate::types::db::permission::{self, Entity as Permission};
use crate::types::db::role::{self, Entity as Role};
use crate::types::db::role_permission::{self, Entity as RolePermission};
use crate::types::internal::permissions;

/// RoleStore owns roles, the permission catalog and the role-permission join
pub struct RoleStore {
    db: DatabaseConnection,
}

impl RoleStore {
    /// Create a new RoleStore with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Ensure the permission catalog and the built-in roles exist
    ///
    /// Idempotent; called once at startup. The super_admin role holds no
    /// explicit grants because it short-circuits every check.
    pub async fn seed_defaults(&self) -> Result<(), InternalError> {
        for (key, label, category) in permissions::CATALOG {
            if self.find_permission_by_key(key).await?.is_none() {
                let row = permission::ActiveModel {
                    id: Set(Uuid::new_v4().to_string()),
                    key: Set((*key).to_string()),
                    label: Set((*label).to_string()),
                    category: Set((*category).to_string()),
                };
                row.insert(&self.db)
                    .await
                    .map_err(|e| InternalError::database("insert_permission", e))?;
            }
        }

        self.ensure_role(role::SUPER_ADMIN, "Super Admin", &[])
            .await?;
        self.ensure_role(
            "warehouse_manager",
            "Warehouse Manager",
            &[
                permissions::INVENTORY_VIEW,
                permissions::INVENTORY_EDIT,
                permissions::DISPATCH_VIEW,
                permissions::DISPATCH_CREATE,
                permissions::RETURNS_VIEW,
                permissions::RETURNS_CREATE,
                permissions::DASHBOARD_VIEW,
            ],
        )
        .await?;
        self.ensure_role(
            "clerk",
            "Clerk",
            &[
                permissions::INVENTORY_VIEW,
                permissions::DISPATCH_VIEW,
                permissions::RETURNS_VIEW,
            ],
        )
        .await?;

        Ok(())
    }

    async fn ensure_role(
        &self,
        name: &str,
        display_name: &str,
        grants: &[&str],
    ) -> Result<(), InternalError> {
        if self.find_role_by_name(name).await?.is_some() {
            return Ok(());
        }

        let role_row = role::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            name: Set(name.to_string()),
            display_name: Set(display_name.to_string()),
        };
        let created = role_row
            .insert(&self.db)
            .await
            .map_err(|e| InternalError::database("insert_role", e))?;

        for key in grants {
            if let Some(perm) = self.find_permission_by_key(key).await? {
                let edge = role_permission::ActiveModel {
                    role_id: Set(created.id.clone()),
                    permission_id: Set(perm.id),
                };
                edge.insert(&self.db)
                    .await
                    .map_err(|e| InternalError::database("insert_role_permission", e))?;
            }
        }
        Ok(())
    }

    /// Find a role by its unique name
    pub async fn find_role_by_name(&self, name: &str) -> Result<Option<role::Model>, InternalError> {
        Role::find()
            .filter(role::Column::Name.eq(name))
            .one(&self.db)
            .await
            .map_err(|e| InternalError::database("find_role_by_name", e))
    }

    /// Find a role by id
    pub async fn find_role_by_id(&self, role_id: &str) -> Result<Option<role::Model>, InternalError> {
        Role::find_by_id(role_id)
            .one(&self.db)
            .await
            .map_err(|e| InternalError::database("find_role_by_id", e))
    }

    /// List all roles
    pub async fn list_roles(&self) -> Result<Vec<role::Model>, InternalError> {
        Role::find()
            .all(&self.db)
            .await
            .map_err(|e| InternalError::database("list_roles", e))
    }

    /// List the full permission catalog
    pub async fn list_permissions(&self) -> Result<Vec<permission::Model>, InternalError> {
        Permission::find()
            .all(&self.db)
            .await
            .map_err(|e| InternalError::database("list_permissions", e))
    }

    async fn find_permission_by_key(
        &self,
        key: &str,
    ) -> Result<Option<permission::Model>, InternalError> {
        Permission::find()
            .filter(permission::Column::Key.eq(key))
            .one(&self.db)
            .await
            .map_err(|e| InternalError::database("find_permission_by_key", e))
    }

    /// Resolve the set of permission keys held by a role
    pub async fn permission_keys_for_role(
        &self,
        role_id: &str,
    ) -> Result<HashSet<String>, InternalError> {
        let edges = RolePermission::find()
            .filter(role_permission::Column::RoleId.eq(role_id))
            .all(&self.db)
            .await
            .map_err(|e| InternalError::database("find_role_permissions", e))?;

        if edges.is_empty() {
            return Ok(HashSet::new());
        }

        let permission_ids: Vec<String> = edges.into_iter().map(|e| e.permission_id).collect();
        let rows = Permission::find()
            .filter(permission::Column::Id.is_in(permission_ids))
            .all(&self.db)
            .await
            .map_err(|e| InternalError::database("find_permissions_by_ids", e))?;

        Ok(rows.into_iter().map(|p| p.key).collect())
    }

    /// Grant a permission to a role
    ///
    /// # Returns
    /// * `Ok(role_id)` - The affected role's id, for cache invalidation
    /// * `Err(RbacError::RoleNotFound | PermissionNotFound)` - Unknown name/key
    pub async fn grant(&self, role_name: &str, permission_key: &str) -> Result<String, RbacError> {
        let (role, perm) = self.resolve_edge(role_name, permission_key).await?;

        let existing = RolePermission::find_by_id((role.id.clone(), perm.id.clone()))
            .one(&self.db)
            .await
            .map_err(|e| InternalError::database("find_role_permission", e))?;

        if existing.is_none() {
            let edge = role_permission::ActiveModel {
                role_id: Set(role.id.clone()),
                permission_id: Set(perm.id),
            };
            edge.insert(&self.db)
                .await
                .map_err(|e| InternalError::database("insert_role_permission", e))?;
        }

        Ok(role.id)
    }

    /// Revoke a permission from a role
    ///
    /// # Returns
    /// * `Ok(role_id)` - The affected role's id, for cache invalidation
    pub async fn revoke(&self, role_name: &str, permission_key: &str) -> Result<String, RbacError> {
        let (role, perm) = self.resolve_edge(role_name, permission_key).await?;

        if let Some(edge) = RolePermission::find_by_id((role.id.clone(), perm.id))
            .one(&self.db)
            .await
            .map_err(|e| InternalError::database("find_role_permission", e))?
        {
            edge.delete(&self.db)
                .await
                .map_err(|e| InternalError::database("delete_role_permission", e))?;
        }

        Ok(role.id)
    }

    async fn resolve_edge(
        &self,
        role_name: &str,
        permission_key: &str,
    ) -> Result<(role::Model, permission::Model), RbacError> {
        let role = self
            .find_role_by_name(role_name)
            .await?
            .ok_or_else(|| RbacError::RoleNotFound(role_name.to_string()))?;
        let perm = self
            .find_permission_by_key(permission_key)
            .await?
            .ok_or_else(|| RbacError::PermissionNotFound(permission_key.to_string()))?;
        Ok((role, perm))
    }
}
