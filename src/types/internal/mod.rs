// Internal types shared between services and stores, never serialized to
// API clients directly.
pub mod audit;
pub mod auth;
pub mod context;
pub mod permissions;

pub use auth::Claims;
pub use context::RequestContext;
