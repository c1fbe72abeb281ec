mod common;

use common::setup_test_env;
use poem_openapi::auth::Bearer;
use stockpile_backend::api::BearerAuth;
use stockpile_backend::errors::api::auth::AuthError;
use stockpile_backend::types::internal::permissions;

fn bearer(token: &str) -> BearerAuth {
    BearerAuth(Bearer {
        token: token.to_string(),
    })
}

async fn token_for(env: &common::TestEnv, email: &str, role: &str) -> String {
    let user = env.create_user(email, "correct-password", role).await;
    let role = env
        .roles
        .find_role_by_id(&user.role_id)
        .await
        .unwrap()
        .unwrap();
    env.tokens.issue(&user, &role).unwrap()
}

#[tokio::test]
async fn test_garbage_token_is_unauthenticated() {
    let env = setup_test_env().await;

    let result = env.gate.authenticate(&bearer("garbage"));
    assert!(matches!(result, Err(AuthError::InvalidToken(_))));
}

#[tokio::test]
async fn test_valid_token_authenticates() {
    let env = setup_test_env().await;
    let token = token_for(&env, "alice@example.com", "clerk").await;

    let claims = env.gate.authenticate(&bearer(&token)).expect("gate rejected");
    assert_eq!(claims.email, "alice@example.com");
    assert_eq!(claims.role_name, "clerk");
}

#[tokio::test]
async fn test_missing_permission_is_forbidden_not_unauthenticated() {
    let env = setup_test_env().await;
    let token = token_for(&env, "alice@example.com", "clerk").await;

    let result = env
        .gate
        .require(&bearer(&token), permissions::AUDIT_VIEW)
        .await;
    // 403, never 401: the identity is proven, the permission is missing
    assert!(matches!(result, Err(AuthError::Forbidden(_))));
}

#[tokio::test]
async fn test_held_permission_passes_the_gate() {
    let env = setup_test_env().await;
    let token = token_for(&env, "alice@example.com", "clerk").await;

    let claims = env
        .gate
        .require(&bearer(&token), permissions::INVENTORY_VIEW)
        .await
        .expect("gate rejected a held permission");
    assert_eq!(claims.role_name, "clerk");
}

#[tokio::test]
async fn test_super_admin_passes_every_gate() {
    let env = setup_test_env().await;
    let token = token_for(&env, "admin@company.com", "super_admin").await;

    for key in [
        permissions::AUDIT_VIEW,
        permissions::USER_MANAGEMENT,
        permissions::ROLE_MANAGEMENT,
        permissions::INVENTORY_EDIT,
    ] {
        env.gate
            .require(&bearer(&token), key)
            .await
            .expect("super_admin was denied");
    }
}

#[tokio::test]
async fn test_grant_propagates_through_gate() {
    let env = setup_test_env().await;
    let token = token_for(&env, "alice@example.com", "clerk").await;
    let ctx = stockpile_backend::types::internal::context::RequestContext::system();

    assert!(matches!(
        env.gate.require(&bearer(&token), permissions::AUDIT_VIEW).await,
        Err(AuthError::Forbidden(_))
    ));

    env.permissions
        .grant(&ctx, "clerk", permissions::AUDIT_VIEW)
        .await
        .unwrap();

    // Same token, no re-login: the grant is visible immediately
    env.gate
        .require(&bearer(&token), permissions::AUDIT_VIEW)
        .await
        .expect("grant not visible through gate");
}
