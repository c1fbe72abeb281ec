use poem_openapi::Object;
use serde::{Deserialize, Serialize};

/// One audit log entry as returned by the query endpoint
#[derive(Object, Debug, Serialize, Deserialize)]
pub struct AuditEntryResponse {
    /// Entry ID
    pub id: i64,

    /// Actor user ID, null for failed authentication attempts
    pub actor_id: Option<String>,

    /// Action verb (LOGIN, CREATE, UPDATE, ...)
    pub action: String,

    /// Resource type the action targeted
    pub resource_type: String,

    /// Resource ID the action targeted
    pub resource_id: Option<String>,

    /// Structured detail payload (JSON object)
    pub detail: serde_json::Value,

    /// Client IP address
    pub ip_address: Option<String>,

    /// Client user agent
    pub user_agent: Option<String>,

    /// Country resolved from the IP address, if enrichment succeeded
    pub geo_country: Option<String>,

    /// City resolved from the IP address
    pub geo_city: Option<String>,

    /// Region resolved from the IP address
    pub geo_region: Option<String>,

    /// Latitude resolved from the IP address
    pub geo_latitude: Option<f64>,

    /// Longitude resolved from the IP address
    pub geo_longitude: Option<f64>,

    /// RFC 3339 timestamp of the event
    pub created_at: String,
}

/// One page of audit log entries
#[derive(Object, Debug, Serialize, Deserialize)]
pub struct AuditPageResponse {
    /// Entries in reverse chronological order
    pub entries: Vec<AuditEntryResponse>,

    /// Zero-based page number
    pub page: u64,

    /// Page size used for this query
    pub page_size: u64,

    /// Total number of entries matching the filter
    pub total: u64,
}
