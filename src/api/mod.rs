// API layer - HTTP endpoints
pub mod admin;
pub mod audit;
pub mod auth;
pub mod health;
pub mod helpers;
pub mod totp;

pub use admin::AdminApi;
pub use audit::AuditApi;
pub use auth::AuthApi;
pub use health::HealthApi;
pub use helpers::{AuthGate, BearerAuth};
pub use totp::TotpApi;

use poem::Request;

use crate::types::internal::auth::Claims;
use crate::types::internal::context::RequestContext;

/// Shared request helpers for all endpoint groups
pub trait Api {
    /// Extract the client IP address, preferring proxy headers
    fn extract_ip_address(&self, req: &Request) -> Option<String> {
        // X-Forwarded-For (proxy/load balancer): first hop is the client
        if let Some(forwarded) = req.header("X-Forwarded-For") {
            if let Some(ip) = forwarded.split(',').next() {
                let ip = ip.trim();
                if !ip.is_empty() {
                    return Some(ip.to_string());
                }
            }
        }

        // X-Real-IP (nginx)
        if let Some(real_ip) = req.header("X-Real-IP") {
            return Some(real_ip.trim().to_string());
        }

        req.remote_addr()
            .as_socket_addr()
            .map(|addr| addr.ip().to_string())
    }

    /// Extract the User-Agent header
    fn extract_user_agent(&self, req: &Request) -> Option<String> {
        req.header("User-Agent").map(|ua| ua.to_string())
    }

    /// Context for an endpoint that runs before authentication
    fn anonymous_context(&self, req: &Request) -> RequestContext {
        RequestContext::anonymous(self.extract_ip_address(req), self.extract_user_agent(req))
    }

    /// Context for an endpoint behind the authorization gate
    fn authenticated_context(&self, req: &Request, claims: &Claims) -> RequestContext {
        RequestContext::authenticated(
            claims.sub.clone(),
            self.extract_ip_address(req),
            self.extract_user_agent(req),
        )
    }
}
