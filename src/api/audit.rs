use std::sync::Arc;

use poem_openapi::{param::Query, payload::Json, OpenApi, Tags};

use crate::api::helpers::{AuthGate, BearerAuth};
use crate::errors::api::admin::AdminError;
use crate::stores::AuditStore;
use crate::types::dto::audit::{AuditEntryResponse, AuditPageResponse};
use crate::types::internal::audit::AuditQuery;
use crate::types::internal::permissions;

const DEFAULT_PAGE_SIZE: u64 = 50;
const MAX_PAGE_SIZE: u64 = 500;

#[derive(Tags)]
enum AuditTags {
    /// Audit trail queries
    Audit,
}

/// Audit trail query API
///
/// Read access is gated by its own permission, distinct from whatever
/// permission triggered the logged actions.
pub struct AuditApi {
    audit_store: Arc<AuditStore>,
    gate: Arc<AuthGate>,
}

impl AuditApi {
    /// Create a new AuditApi
    pub fn new(audit_store: Arc<AuditStore>, gate: Arc<AuthGate>) -> Self {
        Self { audit_store, gate }
    }
}

#[OpenApi(prefix_path = "/audit")]
impl AuditApi {
    /// Query audit entries, newest first
    #[oai(path = "/entries", method = "get", tag = "AuditTags::Audit")]
    #[allow(clippy::too_many_arguments)]
    async fn entries(
        &self,
        auth: BearerAuth,
        /// Filter by actor user id
        actor_id: Query<Option<String>>,
        /// Filter by action verb (e.g. LOGIN)
        action: Query<Option<String>>,
        /// Filter by resource type
        resource_type: Query<Option<String>>,
        /// Inclusive lower bound, RFC 3339
        from: Query<Option<String>>,
        /// Inclusive upper bound, RFC 3339
        to: Query<Option<String>>,
        /// Zero-based page number
        page: Query<Option<u64>>,
        /// Page size (max 500)
        page_size: Query<Option<u64>>,
    ) -> Result<Json<AuditPageResponse>, AdminError> {
        self.gate.require(&auth, permissions::AUDIT_VIEW).await?;

        let filter = AuditQuery {
            actor_id: actor_id.0,
            action: action.0,
            resource_type: resource_type.0,
            from: from.0,
            to: to.0,
        };
        let page = page.0.unwrap_or(0);
        let page_size = page_size.0.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE);

        let (entries, total) = self.audit_store.query(&filter, page, page_size).await?;

        let entries = entries
            .into_iter()
            .map(|row| AuditEntryResponse {
                id: row.id,
                actor_id: row.actor_id,
                action: row.action,
                resource_type: row.resource_type,
                resource_id: row.resource_id,
                detail: serde_json::from_str(&row.detail)
                    .unwrap_or(serde_json::Value::Null),
                ip_address: row.ip_address,
                user_agent: row.user_agent,
                geo_country: row.geo_country,
                geo_city: row.geo_city,
                geo_region: row.geo_region,
                geo_latitude: row.geo_latitude,
                geo_longitude: row.geo_longitude,
                created_at: row.created_at,
            })
            .collect();

        Ok(Json(AuditPageResponse {
            entries,
            page,
            page_size,
            total,
        }))
    }
}
