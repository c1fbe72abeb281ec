mod common;

use common::setup_test_env;
use stockpile_backend::errors::internal::RbacError;
use stockpile_backend::types::internal::context::RequestContext;

#[tokio::test]
async fn test_absent_row_means_denied() {
    let env = setup_test_env().await;
    let clerk = env.roles.find_role_by_name("clerk").await.unwrap().unwrap();

    let allowed = env
        .permissions
        .has_permission("clerk", &clerk.id, "system.user_management")
        .await
        .unwrap();
    assert!(!allowed);
}

#[tokio::test]
async fn test_super_admin_short_circuits_every_key() {
    let env = setup_test_env().await;
    let role = env
        .roles
        .find_role_by_name("super_admin")
        .await
        .unwrap()
        .unwrap();

    // No role_permissions rows exist for super_admin, including for keys
    // that are not even in the catalog
    assert!(env
        .permissions
        .has_permission("super_admin", &role.id, "system.user_management")
        .await
        .unwrap());
    assert!(env
        .permissions
        .has_permission("super_admin", &role.id, "not.a_real_key")
        .await
        .unwrap());
}

#[tokio::test]
async fn test_grant_is_observed_immediately() {
    let env = setup_test_env().await;
    let clerk = env.roles.find_role_by_name("clerk").await.unwrap().unwrap();
    let ctx = RequestContext::system();

    // Warm the cache with the pre-grant set
    assert!(!env
        .permissions
        .has_permission("clerk", &clerk.id, "system.user_management")
        .await
        .unwrap());

    env.permissions
        .grant(&ctx, "clerk", "system.user_management")
        .await
        .expect("grant failed");

    assert!(env
        .permissions
        .has_permission("clerk", &clerk.id, "system.user_management")
        .await
        .unwrap());
}

#[tokio::test]
async fn test_revoke_is_observed_immediately() {
    let env = setup_test_env().await;
    let clerk = env.roles.find_role_by_name("clerk").await.unwrap().unwrap();
    let ctx = RequestContext::system();

    assert!(env
        .permissions
        .has_permission("clerk", &clerk.id, "inventory.view")
        .await
        .unwrap());

    env.permissions
        .revoke(&ctx, "clerk", "inventory.view")
        .await
        .expect("revoke failed");

    assert!(!env
        .permissions
        .has_permission("clerk", &clerk.id, "inventory.view")
        .await
        .unwrap());
}

#[tokio::test]
async fn test_grant_unknown_role_or_permission_fails() {
    let env = setup_test_env().await;
    let ctx = RequestContext::system();

    let unknown_role = env
        .permissions
        .grant(&ctx, "no_such_role", "inventory.view")
        .await;
    assert!(matches!(unknown_role, Err(RbacError::RoleNotFound(_))));

    let unknown_key = env
        .permissions
        .grant(&ctx, "clerk", "no.such_permission")
        .await;
    assert!(matches!(
        unknown_key,
        Err(RbacError::PermissionNotFound(_))
    ));
}

#[tokio::test]
async fn test_grant_and_revoke_are_audited_synchronously() {
    let env = setup_test_env().await;
    let ctx = RequestContext::system();

    env.permissions
        .grant(&ctx, "clerk", "system.user_management")
        .await
        .unwrap();
    env.permissions
        .revoke(&ctx, "clerk", "system.user_management")
        .await
        .unwrap();

    let grants = env.audit_entries("PERMISSION_GRANT").await;
    assert_eq!(grants.len(), 1);
    let detail: serde_json::Value = serde_json::from_str(&grants[0].detail).unwrap();
    assert_eq!(detail["role_name"], "clerk");
    assert_eq!(detail["permission_key"], "system.user_management");

    let revokes = env.audit_entries("PERMISSION_REVOKE").await;
    assert_eq!(revokes.len(), 1);
}

#[tokio::test]
async fn test_grant_is_idempotent() {
    let env = setup_test_env().await;
    let clerk = env.roles.find_role_by_name("clerk").await.unwrap().unwrap();
    let ctx = RequestContext::system();

    env.permissions
        .grant(&ctx, "clerk", "dashboard.view")
        .await
        .unwrap();
    env.permissions
        .grant(&ctx, "clerk", "dashboard.view")
        .await
        .expect("second grant should not fail");

    assert!(env
        .permissions
        .has_permission("clerk", &clerk.id, "dashboard.view")
        .await
        .unwrap());
}

#[tokio::test]
async fn test_seeded_role_sets() {
    let env = setup_test_env().await;
    let manager = env
        .roles
        .find_role_by_name("warehouse_manager")
        .await
        .unwrap()
        .unwrap();

    let keys = env.permissions.permissions_of(&manager.id).await.unwrap();
    assert!(keys.contains("inventory.edit"));
    assert!(keys.contains("dispatch.create"));
    assert!(!keys.contains("system.role_management"));
    assert!(!keys.contains("audit.view"));
}
