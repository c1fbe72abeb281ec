use sea_orm::entity::prelude::*;

/// SeaORM entity for the append-only audit_log_entries table
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "audit_log_entries")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Null for failed authentication attempts where no identity was proven
    pub actor_id: Option<String>,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<String>,
    /// Structured detail payload, serialized JSON object
    pub detail: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub geo_country: Option<String>,
    pub geo_city: Option<String>,
    pub geo_region: Option<String>,
    pub geo_latitude: Option<f64>,
    pub geo_longitude: Option<f64>,
    /// RFC 3339 UTC timestamp
    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
