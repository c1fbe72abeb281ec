mod common;

use common::{setup_test_env, setup_test_env_with};
use stockpile_backend::errors::api::auth::AuthError;
use stockpile_backend::services::auth_service::LoginOutcome;
use stockpile_backend::types::db::user;
use totp_rs::{Algorithm, Secret, TOTP};

/// Build the authenticator-side TOTP from an enrollment secret
fn authenticator(secret_base32: &str, account: &str) -> TOTP {
    TOTP::new(
        Algorithm::SHA1,
        6,
        1,
        30,
        Secret::Encoded(secret_base32.to_string()).to_bytes().unwrap(),
        Some("Stockpile".to_string()),
        account.to_string(),
    )
    .unwrap()
}

#[tokio::test]
async fn test_enrollment_and_confirmation() {
    let env = setup_test_env().await;
    let created = env.create_user("alice@example.com", "pw-irrelevant-here", "clerk").await;

    let enrollment = env.totp.start_enrollment(&created).await.expect("enroll failed");
    assert!(!enrollment.secret.is_empty());
    assert!(enrollment.provisioning_uri.starts_with("otpauth://totp/"));
    assert_eq!(enrollment.backup_codes.len(), 10);

    // Pending enrollment does not demand a second factor at login yet
    let pending = env.reload_user(&created.id).await;
    assert_eq!(pending.totp_state, user::TOTP_STATE_PENDING);

    let code = authenticator(&enrollment.secret, "alice@example.com")
        .generate_current()
        .unwrap();
    env.totp
        .confirm_enrollment(&pending, &code)
        .await
        .expect("confirm failed");

    let enabled = env.reload_user(&created.id).await;
    assert_eq!(enabled.totp_state, user::TOTP_STATE_ENABLED);
}

#[tokio::test]
async fn test_confirm_with_wrong_code_stays_pending() {
    let env = setup_test_env().await;
    let created = env.create_user("alice@example.com", "pw-irrelevant-here", "clerk").await;

    env.totp.start_enrollment(&created).await.expect("enroll failed");
    let pending = env.reload_user(&created.id).await;

    let result = env.totp.confirm_enrollment(&pending, "000000").await;
    assert!(result.is_err());

    let still_pending = env.reload_user(&created.id).await;
    assert_eq!(still_pending.totp_state, user::TOTP_STATE_PENDING);
}

async fn enable_totp(env: &common::TestEnv, user: &user::Model) -> String {
    let enrollment = env.totp.start_enrollment(user).await.expect("enroll failed");
    let pending = env.reload_user(&user.id).await;
    let code = authenticator(&enrollment.secret, &user.email)
        .generate_current()
        .unwrap();
    env.totp
        .confirm_enrollment(&pending, &code)
        .await
        .expect("confirm failed");
    enrollment.secret
}

#[tokio::test]
async fn test_login_with_totp_requires_challenge_exchange() {
    let env = setup_test_env().await;
    let created = env.create_user("alice@example.com", "correct-password", "clerk").await;
    let secret = enable_totp(&env, &created).await;

    let outcome = env
        .auth
        .login(&env.client_ctx(), "alice@example.com", "correct-password")
        .await
        .expect("password step failed");

    let LoginOutcome::ChallengeRequired { challenge, .. } = outcome else {
        panic!("expected a challenge");
    };

    // No token was issued yet: no LOGIN entry either
    assert!(env.audit_entries("LOGIN").await.is_empty());

    let code = authenticator(&secret, "alice@example.com")
        .generate_current()
        .unwrap();
    let completed = env
        .auth
        .verify_challenge(&env.client_ctx(), &challenge, &code)
        .await
        .expect("challenge failed");

    let claims = env.tokens.validate(&completed.token).unwrap();
    assert_eq!(claims.sub, created.id);

    let entries = env.audit_entries("LOGIN").await;
    assert_eq!(entries.len(), 1);
    let detail: serde_json::Value = serde_json::from_str(&entries[0].detail).unwrap();
    assert_eq!(detail["second_factor"], "totp");
}

#[tokio::test]
async fn test_wrong_code_rejected_and_audited() {
    let env = setup_test_env().await;
    let created = env.create_user("alice@example.com", "correct-password", "clerk").await;
    enable_totp(&env, &created).await;

    let LoginOutcome::ChallengeRequired { challenge, .. } = env
        .auth
        .login(&env.client_ctx(), "alice@example.com", "correct-password")
        .await
        .unwrap()
    else {
        panic!("expected a challenge");
    };

    let result = env
        .auth
        .verify_challenge(&env.client_ctx(), &challenge, "000000")
        .await;
    assert!(matches!(result, Err(AuthError::ChallengeInvalid(_))));

    let entries = env.audit_entries("CHALLENGE_FAILED").await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].actor_id.as_deref(), Some(created.id.as_str()));
}

#[tokio::test]
async fn test_unknown_challenge_reference_rejected() {
    let env = setup_test_env().await;

    let result = env
        .auth
        .verify_challenge(&env.client_ctx(), "no-such-challenge", "123456")
        .await;
    assert!(matches!(result, Err(AuthError::ChallengeInvalid(_))));
}

#[tokio::test]
async fn test_backup_code_works_once() {
    let env = setup_test_env().await;
    let created = env.create_user("alice@example.com", "correct-password", "clerk").await;

    let enrollment = env.totp.start_enrollment(&created).await.unwrap();
    let pending = env.reload_user(&created.id).await;
    let code = authenticator(&enrollment.secret, "alice@example.com")
        .generate_current()
        .unwrap();
    env.totp.confirm_enrollment(&pending, &code).await.unwrap();

    let backup = enrollment.backup_codes[0].clone();

    let LoginOutcome::ChallengeRequired { challenge, .. } = env
        .auth
        .login(&env.client_ctx(), "alice@example.com", "correct-password")
        .await
        .unwrap()
    else {
        panic!("expected a challenge");
    };

    let completed = env
        .auth
        .verify_challenge(&env.client_ctx(), &challenge, &backup)
        .await
        .expect("backup code rejected");
    assert!(env.tokens.validate(&completed.token).is_ok());

    let entries = env.audit_entries("LOGIN").await;
    let detail: serde_json::Value = serde_json::from_str(&entries[0].detail).unwrap();
    assert_eq!(detail["second_factor"], "backup_code");

    // Consumed: the same code is rejected on the next login
    let LoginOutcome::ChallengeRequired { challenge, .. } = env
        .auth
        .login(&env.client_ctx(), "alice@example.com", "correct-password")
        .await
        .unwrap()
    else {
        panic!("expected a challenge");
    };

    let reuse = env
        .auth
        .verify_challenge(&env.client_ctx(), &challenge, &backup)
        .await;
    assert!(matches!(reuse, Err(AuthError::ChallengeInvalid(_))));
}

#[tokio::test]
async fn test_rate_limit_blocks_after_configured_attempts() {
    let env = setup_test_env_with(None, 3).await;
    let created = env.create_user("alice@example.com", "correct-password", "clerk").await;
    enable_totp(&env, &created).await;

    let LoginOutcome::ChallengeRequired { challenge, .. } = env
        .auth
        .login(&env.client_ctx(), "alice@example.com", "correct-password")
        .await
        .unwrap()
    else {
        panic!("expected a challenge");
    };

    for _ in 0..3 {
        let result = env
            .auth
            .verify_challenge(&env.client_ctx(), &challenge, "000000")
            .await;
        assert!(matches!(result, Err(AuthError::ChallengeInvalid(_))));
    }

    let limited = env
        .auth
        .verify_challenge(&env.client_ctx(), &challenge, "000000")
        .await;
    assert!(matches!(limited, Err(AuthError::ChallengeRateLimited(_))));
}

#[tokio::test]
async fn test_disable_clears_secret_and_backup_codes() {
    let env = setup_test_env().await;
    let created = env.create_user("alice@example.com", "correct-password", "clerk").await;
    enable_totp(&env, &created).await;

    let enabled = env.reload_user(&created.id).await;
    env.totp.disable(&enabled).await.expect("disable failed");

    let disabled = env.reload_user(&created.id).await;
    assert_eq!(disabled.totp_state, user::TOTP_STATE_DISABLED);
    assert!(disabled.totp_secret.is_none());

    // Login no longer demands a second factor
    let outcome = env
        .auth
        .login(&env.client_ctx(), "alice@example.com", "correct-password")
        .await
        .unwrap();
    assert!(matches!(outcome, LoginOutcome::Complete(_)));
}

#[tokio::test]
async fn test_enrollment_cannot_restart_while_enabled() {
    let env = setup_test_env().await;
    let created = env.create_user("alice@example.com", "correct-password", "clerk").await;
    enable_totp(&env, &created).await;

    let enabled = env.reload_user(&created.id).await;
    let result = env.totp.start_enrollment(&enabled).await;
    assert!(result.is_err());
}
