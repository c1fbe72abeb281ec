//! Static permission catalog.
//!
//! Every protected operation declares its required permission as one of
//! these constants; nothing is ever resolved from client input. Routes with
//! no bearer scheme (login, challenge exchange, health) are the explicit
//! unauthenticated allow-list.

pub const INVENTORY_VIEW: &str = "inventory.view";
pub const INVENTORY_EDIT: &str = "inventory.edit";
pub const DISPATCH_VIEW: &str = "dispatch.view";
pub const DISPATCH_CREATE: &str = "dispatch.create";
pub const RETURNS_VIEW: &str = "returns.view";
pub const RETURNS_CREATE: &str = "returns.create";
pub const DASHBOARD_VIEW: &str = "dashboard.view";
pub const AUDIT_VIEW: &str = "audit.view";
pub const USER_MANAGEMENT: &str = "system.user_management";
pub const ROLE_MANAGEMENT: &str = "system.role_management";

/// Seed catalog: (key, label, category). Immutable once referenced by audit
/// history; keys are only ever added.
pub const CATALOG: &[(&str, &str, &str)] = &[
    (INVENTORY_VIEW, "View inventory", "inventory"),
    (INVENTORY_EDIT, "Edit inventory", "inventory"),
    (DISPATCH_VIEW, "View dispatches", "dispatch"),
    (DISPATCH_CREATE, "Create dispatches", "dispatch"),
    (RETURNS_VIEW, "View returns", "returns"),
    (RETURNS_CREATE, "Create returns", "returns"),
    (DASHBOARD_VIEW, "View dashboards", "dashboard"),
    (AUDIT_VIEW, "View audit trail", "system"),
    (USER_MANAGEMENT, "Manage users", "system"),
    (ROLE_MANAGEMENT, "Manage roles and permissions", "system"),
];
