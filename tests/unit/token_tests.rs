// ==========================
// tests/unit/token_tests.rs
// ==========================
//! Unit tests for token issuance and verification
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Duration;
use gymtrack_backend::auth::{generate_signing_secret, TokenIssuer, DEFAULT_TOKEN_TTL};
use gymtrack_backend::error::AppError;
use gymtrack_common::Role;
use uuid::Uuid;

use crate::test_utils::{epoch, test_settings, TEST_SECRET};

fn issuer() -> TokenIssuer {
    TokenIssuer::new(TEST_SECRET.as_bytes(), DEFAULT_TOKEN_TTL).unwrap()
}

#[test]
fn test_verify_returns_subject_and_role() {
    let subject = Uuid::new_v4();
    let token = issuer().issue(subject, Role::Admin, epoch()).unwrap();

    let claims = issuer().verify(&token, epoch() + Duration::hours(1)).unwrap();
    assert_eq!(claims.sub, subject);
    assert_eq!(claims.role, Role::Admin);
    assert_eq!(claims.issued_at(), Some(epoch()));
    assert_eq!(claims.expires_at(), Some(epoch() + DEFAULT_TOKEN_TTL));
}

#[test]
fn test_verify_is_repeatable() {
    let token = issuer().issue(Uuid::new_v4(), Role::User, epoch()).unwrap();
    let first = issuer().verify(&token, epoch()).unwrap();
    let second = issuer().verify(&token, epoch()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_expired_after_ttl() {
    let token = issuer().issue(Uuid::new_v4(), Role::User, epoch()).unwrap();
    assert!(matches!(
        issuer().verify(&token, epoch() + DEFAULT_TOKEN_TTL + Duration::seconds(1)),
        Err(AppError::TokenExpired)
    ));
}

#[test]
fn test_tampered_payload_is_malformed() {
    let token = issuer().issue(Uuid::new_v4(), Role::User, epoch()).unwrap();
    let segments: Vec<&str> = token.split('.').collect();
    assert_eq!(segments.len(), 3, "header.payload.signature");
    let forged_payload = URL_SAFE_NO_PAD.encode(format!(
        r#"{{"sub":"{}","role":"super_admin","iat":0,"exp":9999999999}}"#,
        Uuid::new_v4()
    ));
    let forged = format!("{}.{forged_payload}.{}", segments[0], segments[2]);

    assert!(matches!(
        issuer().verify(&forged, epoch()),
        Err(AppError::TokenMalformed)
    ));
}

#[test]
fn test_ttl_comes_from_settings() {
    let mut settings = test_settings();
    settings.auth.token_ttl_secs = 60;
    let issuer = TokenIssuer::from_settings(&settings.auth).unwrap();
    assert_eq!(issuer.ttl(), Duration::seconds(60));

    let token = issuer.issue(Uuid::new_v4(), Role::User, epoch()).unwrap();
    assert!(issuer.verify(&token, epoch() + Duration::seconds(59)).is_ok());
    assert!(matches!(
        issuer.verify(&token, epoch() + Duration::seconds(60)),
        Err(AppError::TokenExpired)
    ));
}

#[test]
fn test_generated_secret_is_accepted() {
    let secret = generate_signing_secret();
    assert!(TokenIssuer::new(secret.as_bytes(), DEFAULT_TOKEN_TTL).is_ok());
}

#[test]
fn test_header_names_hs256() {
    let token = issuer().issue(Uuid::new_v4(), Role::User, epoch()).unwrap();
    let (header, _) = token.split_once('.').unwrap();
    let header: serde_json::Value =
        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(header).unwrap()).unwrap();
    assert_eq!(header["alg"], "HS256");
}

#[test]
fn test_oversized_ttl_fails_without_panicking() {
    let mut settings = test_settings();
    settings.auth.token_ttl_secs = u64::MAX;
    assert!(matches!(
        TokenIssuer::from_settings(&settings.auth),
        Err(AppError::InvalidInput(_))
    ));
}
