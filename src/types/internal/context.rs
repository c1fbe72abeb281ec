use uuid::Uuid;

/// Request context that flows from the API layer into services
///
/// Carries the client attribution needed for audit entries: who acted, from
/// which address, with which user agent.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestContext {
    /// Unique identifier for this request (for log correlation)
    pub request_id: String,

    /// IP address of the client as reported by the transport or proxy headers
    pub ip_address: Option<String>,

    /// User-Agent header of the client
    pub user_agent: Option<String>,

    /// Authenticated actor, if any. None until the authorization gate has
    /// validated a token, and permanently None for failed logins.
    pub actor_id: Option<String>,
}

impl RequestContext {
    /// Context for an unauthenticated request (login, challenge exchange)
    pub fn anonymous(ip_address: Option<String>, user_agent: Option<String>) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            ip_address,
            user_agent,
            actor_id: None,
        }
    }

    /// Context for a request whose bearer token has been validated
    pub fn authenticated(
        actor_id: impl Into<String>,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            ip_address,
            user_agent,
            actor_id: Some(actor_id.into()),
        }
    }

    /// Context for internal operations (startup seeding, workers)
    pub fn system() -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            ip_address: None,
            user_agent: None,
            actor_id: Some("system".to_string()),
        }
    }
}
