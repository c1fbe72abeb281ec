use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use crate::errors::internal::{InternalError, RbacError};
use crate::services::audit_recorder::AuditRecorder;
use crate::stores::RoleStore;
use crate::types::db::role;
use crate::types::internal::audit::{AuditAction, AuditEvent};
use crate::types::internal::context::RequestContext;

/// Resolves role permissions with a process-wide cache
///
/// The role_permissions table is the sole authority; the cache exists only
/// to keep the authorization gate off the database on every request, and is
/// invalidated before a grant or revoke returns, so a stale answer is never
/// served after a write.
pub struct PermissionService {
    role_store: Arc<RoleStore>,
    audit: Arc<AuditRecorder>,
    cache: RwLock<HashMap<String, Arc<HashSet<String>>>>,
}

impl PermissionService {
    /// Create a new PermissionService
    pub fn new(role_store: Arc<RoleStore>, audit: Arc<AuditRecorder>) -> Self {
        Self {
            role_store,
            audit,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve the permission keys held by a role, from cache when possible
    pub async fn permissions_of(
        &self,
        role_id: &str,
    ) -> Result<Arc<HashSet<String>>, InternalError> {
        if let Some(cached) = self
            .cache
            .read()
            .expect("permission cache poisoned")
            .get(role_id)
        {
            return Ok(cached.clone());
        }

        let keys = Arc::new(self.role_store.permission_keys_for_role(role_id).await?);
        self.cache
            .write()
            .expect("permission cache poisoned")
            .insert(role_id.to_string(), keys.clone());
        Ok(keys)
    }

    /// Answer "does this role hold this permission"
    ///
    /// The super_admin role short-circuits to true for every key without a
    /// table lookup.
    pub async fn has_permission(
        &self,
        role_name: &str,
        role_id: &str,
        permission_key: &str,
    ) -> Result<bool, InternalError> {
        if role_name == role::SUPER_ADMIN {
            return Ok(true);
        }
        Ok(self.permissions_of(role_id).await?.contains(permission_key))
    }

    /// Grant a permission to a role
    ///
    /// Fails with `NotFound` for an unknown role name or permission key.
    /// The cache entry is invalidated before this returns, so an immediate
    /// re-check observes the grant.
    pub async fn grant(
        &self,
        ctx: &RequestContext,
        role_name: &str,
        permission_key: &str,
    ) -> Result<(), RbacError> {
        let role_id = self.role_store.grant(role_name, permission_key).await?;
        self.invalidate(&role_id);

        self.audit
            .record(
                AuditEvent::new(AuditAction::PermissionGrant, "role")
                    .with_context(ctx)
                    .with_resource_id(role_id)
                    .with_detail("role_name", role_name)
                    .with_detail("permission_key", permission_key),
            )
            .await;

        Ok(())
    }

    /// Revoke a permission from a role
    pub async fn revoke(
        &self,
        ctx: &RequestContext,
        role_name: &str,
        permission_key: &str,
    ) -> Result<(), RbacError> {
        let role_id = self.role_store.revoke(role_name, permission_key).await?;
        self.invalidate(&role_id);

        self.audit
            .record(
                AuditEvent::new(AuditAction::PermissionRevoke, "role")
                    .with_context(ctx)
                    .with_resource_id(role_id)
                    .with_detail("role_name", role_name)
                    .with_detail("permission_key", permission_key),
            )
            .await;

        Ok(())
    }

    /// Drop the cached set for a role
    ///
    /// Readers holding the previous Arc finish with the old set; new reads
    /// refetch from the table.
    pub fn invalidate(&self, role_id: &str) {
        self.cache
            .write()
            .expect("permission cache poisoned")
            .remove(role_id);
    }
}
