use std::collections::HashMap;
use std::fmt;

use super::context::RequestContext;

/// Action verbs for audit log entries
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditAction {
    Login,
    Logout,
    Create,
    Update,
    Delete,
    PermissionGrant,
    PermissionRevoke,
    TotpEnrollStart,
    TotpEnrollConfirm,
    TotpDisable,
    ChallengeFailed,
    Custom(String),
}

impl AuditAction {
    /// String form stored in the `action` column
    pub fn as_str(&self) -> &str {
        match self {
            Self::Login => "LOGIN",
            Self::Logout => "LOGOUT",
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::PermissionGrant => "PERMISSION_GRANT",
            Self::PermissionRevoke => "PERMISSION_REVOKE",
            Self::TotpEnrollStart => "TOTP_ENROLL_START",
            Self::TotpEnrollConfirm => "TOTP_ENROLL_CONFIRM",
            Self::TotpDisable => "TOTP_DISABLE",
            Self::ChallengeFailed => "CHALLENGE_FAILED",
            Self::Custom(s) => s.as_str(),
        }
    }

    /// Security-critical events are written synchronously and never dropped
    /// from the background queue.
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            Self::Login | Self::Logout | Self::PermissionGrant | Self::PermissionRevoke
        )
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An audit event prior to persistence
#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub actor_id: Option<String>,
    pub action: AuditAction,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub detail: HashMap<String, serde_json::Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    /// RFC 3339 timestamp assigned when the event was recorded, not when it
    /// reached the database.
    pub recorded_at: String,
}

impl AuditEvent {
    /// Create a new event for the given action and resource type, stamped
    /// with the current time.
    pub fn new(action: AuditAction, resource_type: impl Into<String>) -> Self {
        Self {
            actor_id: None,
            action,
            resource_type: resource_type.into(),
            resource_id: None,
            detail: HashMap::new(),
            ip_address: None,
            user_agent: None,
            recorded_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Attach actor, IP address and user agent from a request context
    pub fn with_context(mut self, ctx: &RequestContext) -> Self {
        self.actor_id = ctx.actor_id.clone();
        self.ip_address = ctx.ip_address.clone();
        self.user_agent = ctx.user_agent.clone();
        self
    }

    pub fn with_actor(mut self, actor_id: impl Into<String>) -> Self {
        self.actor_id = Some(actor_id.into());
        self
    }

    pub fn with_resource_id(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_id = Some(resource_id.into());
        self
    }

    /// Add a field to the structured detail payload
    pub fn with_detail(mut self, key: impl Into<String>, value: impl serde::Serialize) -> Self {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.detail.insert(key.into(), json_value);
        }
        self
    }
}

/// Geolocation fields resolved from an IP address by the external lookup
///
/// Absence of these fields on an audit entry is a valid terminal state.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoInfo {
    pub country: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Filter for audit trail queries; all fields are conjunctive
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
    pub actor_id: Option<String>,
    pub action: Option<String>,
    pub resource_type: Option<String>,
    /// Inclusive lower bound, RFC 3339
    pub from: Option<String>,
    /// Inclusive upper bound, RFC 3339
    pub to: Option<String>,
}
