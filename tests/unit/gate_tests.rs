// ==========================
// tests/unit/gate_tests.rs
// ==========================
//! Unit tests for role checks and bearer handling
use axum::http::{header::AUTHORIZATION, HeaderMap, HeaderValue};
use gymtrack_backend::auth::{authorize, role_satisfies};
use gymtrack_backend::clock::Clock;
use gymtrack_backend::error::AppError;
use gymtrack_common::Role;
use uuid::Uuid;

use crate::test_utils::{bearer, TestEnv};

#[test]
fn test_user_token_denied_on_admin_check() {
    assert!(matches!(
        authorize(Role::User, Role::Admin),
        Err(AppError::InsufficientRole { required: Role::Admin })
    ));
}

#[test]
fn test_admin_token_allowed_on_trainer_check() {
    assert!(authorize(Role::Admin, Role::Trainer).is_ok());
}

#[test]
fn test_role_table() {
    use Role::*;
    let granted = [
        (User, User),
        (Trainer, User),
        (Admin, User),
        (SuperAdmin, User),
        (Trainer, Trainer),
        (Admin, Trainer),
        (Admin, Admin),
        (SuperAdmin, Admin),
        (SuperAdmin, SuperAdmin),
    ];
    for verified in [User, Trainer, Admin, SuperAdmin] {
        for required in [User, Trainer, Admin, SuperAdmin] {
            assert_eq!(
                role_satisfies(verified, required),
                granted.contains(&(verified, required)),
                "{verified} vs {required}"
            );
        }
    }
}

#[tokio::test]
async fn test_gate_distinguishes_unauthenticated_from_forbidden() {
    let env = TestEnv::new();
    let member = env.seed_account("mia", Role::User).await;
    let header = env.bearer_for("mia").await;

    let principal = env.state.gate.require(Some(header.as_str()), Role::User).unwrap();
    assert_eq!(principal.account_id, member.id);

    let forbidden = env.state.gate.require(Some(header.as_str()), Role::Admin).unwrap_err();
    assert!(matches!(forbidden, AppError::InsufficientRole { .. }));
    assert!(!forbidden.is_unauthenticated());

    let missing = env.state.gate.require(None, Role::User).unwrap_err();
    assert!(missing.is_unauthenticated());
}

#[tokio::test]
async fn test_gate_reads_header_map() {
    let env = TestEnv::new();
    env.seed_account("coach", Role::Trainer).await;
    let header = env.bearer_for("coach").await;

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, HeaderValue::from_str(&header).unwrap());
    assert!(env.state.gate.require_headers(&headers, Role::Trainer).is_ok());

    headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic Y29hY2g6cHc="));
    assert!(matches!(
        env.state.gate.require_headers(&headers, Role::User),
        Err(AppError::Unauthenticated)
    ));
}

#[test]
fn test_gate_rejects_token_from_another_secret() {
    let env = TestEnv::new();
    let mut settings = crate::test_utils::test_settings();
    settings.auth.token_secret = "some-other-deployment-signing-secret".to_string();
    let other = TestEnv::with_settings(settings);

    let token = gymtrack_backend::auth::TokenIssuer::from_settings(&other.state.settings.auth)
        .unwrap()
        .issue(Uuid::new_v4(), Role::SuperAdmin, other.clock.now())
        .unwrap();

    assert!(matches!(
        env.state.gate.require(Some(bearer(&token).as_str()), Role::User),
        Err(AppError::TokenMalformed)
    ));
}
