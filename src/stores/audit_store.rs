use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, Unchanged,
};

use crate::errors::internal::{AuditError, InternalError};
use crate::types::db::audit_log_entry::{self, Entity as AuditLogEntry};
use crate::types::internal::audit::{AuditEvent, AuditQuery, GeoInfo};

/// Repository for the append-only audit trail
///
/// Rows are inserted once and never deleted; the geo_* columns are the only
/// ones ever updated, by the enrichment step.
pub struct AuditStore {
    db: DatabaseConnection,
}

impl AuditStore {
    /// Create a new AuditStore with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Write an audit event and return the new entry's id
    ///
    /// # Errors
    /// Returns `InternalError` if serialization or the insert fails.
    pub async fn insert_entry(&self, event: &AuditEvent) -> Result<i64, InternalError> {
        let detail_json = serde_json::to_string(&event.detail)
            .map_err(|e| AuditError::SerializationFailed(e.to_string()))?;

        let row = audit_log_entry::ActiveModel {
            id: sea_orm::ActiveValue::NotSet,
            actor_id: Set(event.actor_id.clone()),
            action: Set(event.action.to_string()),
            resource_type: Set(event.resource_type.clone()),
            resource_id: Set(event.resource_id.clone()),
            detail: Set(detail_json),
            ip_address: Set(event.ip_address.clone()),
            user_agent: Set(event.user_agent.clone()),
            geo_country: Set(None),
            geo_city: Set(None),
            geo_region: Set(None),
            geo_latitude: Set(None),
            geo_longitude: Set(None),
            created_at: Set(event.recorded_at.clone()),
        };

        let inserted = row
            .insert(&self.db)
            .await
            .map_err(|e| AuditError::WriteFailed(e.to_string()))?;

        Ok(inserted.id)
    }

    /// Attach geolocation fields to an existing entry
    ///
    /// The one permitted in-place update; everything else on the row is
    /// immutable once written.
    pub async fn apply_geo(&self, entry_id: i64, geo: &GeoInfo) -> Result<(), InternalError> {
        let update = audit_log_entry::ActiveModel {
            id: Unchanged(entry_id),
            geo_country: Set(geo.country.clone()),
            geo_city: Set(geo.city.clone()),
            geo_region: Set(geo.region.clone()),
            geo_latitude: Set(geo.latitude),
            geo_longitude: Set(geo.longitude),
            ..Default::default()
        };
        update
            .update(&self.db)
            .await
            .map_err(|e| InternalError::database("apply_geo", e))?;
        Ok(())
    }

    /// Paginated query in reverse chronological order
    ///
    /// # Returns
    /// * `Ok((entries, total))` - One page plus the total match count
    pub async fn query(
        &self,
        filter: &AuditQuery,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<audit_log_entry::Model>, u64), InternalError> {
        let mut select = AuditLogEntry::find();

        if let Some(actor_id) = &filter.actor_id {
            select = select.filter(audit_log_entry::Column::ActorId.eq(actor_id));
        }
        if let Some(action) = &filter.action {
            select = select.filter(audit_log_entry::Column::Action.eq(action));
        }
        if let Some(resource_type) = &filter.resource_type {
            select = select.filter(audit_log_entry::Column::ResourceType.eq(resource_type));
        }
        // RFC 3339 UTC strings compare lexicographically in time order
        if let Some(from) = &filter.from {
            select = select.filter(audit_log_entry::Column::CreatedAt.gte(from));
        }
        if let Some(to) = &filter.to {
            select = select.filter(audit_log_entry::Column::CreatedAt.lte(to));
        }

        let paginator = select
            .order_by_desc(audit_log_entry::Column::CreatedAt)
            .paginate(&self.db, page_size);

        let total = paginator
            .num_items()
            .await
            .map_err(|e| InternalError::database("count_audit_entries", e))?;
        let entries = paginator
            .fetch_page(page)
            .await
            .map_err(|e| InternalError::database("fetch_audit_page", e))?;

        Ok((entries, total))
    }
}
