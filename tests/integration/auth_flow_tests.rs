// ==================================
// tests/integration/auth_flow_tests.rs
// ==================================
//! End-to-end login, lockout and token flows through `AppState`
use std::sync::{Arc, Barrier, Condvar, Mutex};

use chrono::Duration;
use gymtrack_backend::auth::{LoginContext, PasswordHasher};
use gymtrack_backend::clock::ManualClock;
use gymtrack_backend::error::AppError;
use gymtrack_backend::storage::{AccountStore, InMemoryAccountStore, InMemoryClassStore};
use gymtrack_backend::AppState;
use gymtrack_common::{LoginRequest, Role, SignupRequest};

use crate::test_utils::{bearer, epoch, signup_request, test_settings, TestEnv, TEST_PASSWORD};

#[tokio::test]
async fn test_login_returns_token_and_summary() {
    let env = TestEnv::new();
    let seeded = env.seed_account("ada", Role::Admin).await;

    let response = env.login("ada@gym.example", TEST_PASSWORD).await.unwrap();
    assert_eq!(response.account.id, seeded.id);
    assert_eq!(response.account.role, Role::Admin);
    assert_eq!(response.account.last_login_at, Some(epoch()));

    let me = env
        .state
        .current_account(Some(bearer(&response.token).as_str()))
        .await
        .unwrap();
    assert_eq!(me.username, "ada");
}

#[tokio::test]
async fn test_five_failures_lock_admin_for_fifteen_minutes() {
    let env = TestEnv::new();
    env.seed_account("root", Role::SuperAdmin).await;

    for _ in 0..5 {
        assert!(matches!(
            env.login("root", "guess").await,
            Err(AppError::InvalidCredentials)
        ));
    }

    // Correct password is refused while locked
    assert!(matches!(
        env.login("root", TEST_PASSWORD).await,
        Err(AppError::AccountLocked { retry_after_secs: 900 })
    ));

    env.clock.advance(Duration::minutes(14) + Duration::seconds(59));
    assert!(matches!(
        env.login("root", TEST_PASSWORD).await,
        Err(AppError::AccountLocked { retry_after_secs: 1 })
    ));

    env.clock.advance(Duration::seconds(2));
    assert!(env.login("root", TEST_PASSWORD).await.is_ok());
}

#[tokio::test]
async fn test_locked_account_never_reaches_hasher() {
    let env = TestEnv::new();
    env.seed_account("root", Role::Admin).await;
    for _ in 0..5 {
        let _ = env.login("root", "guess").await;
    }
    let before = env.hasher.verifications();

    for _ in 0..10 {
        let _ = env.login("root", TEST_PASSWORD).await;
    }
    assert_eq!(env.hasher.verifications(), before);
}

#[tokio::test]
async fn test_success_resets_failure_counter() {
    let env = TestEnv::new();
    let seeded = env.seed_account("coach", Role::Trainer).await;

    for _ in 0..4 {
        let _ = env.login("coach", "guess").await;
    }
    env.login("coach", TEST_PASSWORD).await.unwrap();

    let account = env.accounts.find_by_id(seeded.id).await.unwrap().unwrap();
    assert_eq!(account.failed_attempts, 0);
    assert_eq!(account.locked_until, None);

    // Four more failures are not enough to lock again
    for _ in 0..4 {
        let _ = env.login("coach", "guess").await;
    }
    assert!(env.login("coach", TEST_PASSWORD).await.is_ok());
}

#[tokio::test]
async fn test_login_history_keeps_last_ten() {
    let env = TestEnv::new();
    let seeded = env.seed_account("mia", Role::User).await;

    for _ in 0..12 {
        env.clock.advance(Duration::minutes(1));
        env.login("mia", TEST_PASSWORD).await.unwrap();
    }

    let account = env.accounts.find_by_id(seeded.id).await.unwrap().unwrap();
    assert_eq!(account.login_history.len(), 10);
    assert_eq!(
        account.login_history.front().unwrap().timestamp,
        epoch() + Duration::minutes(3)
    );
    assert_eq!(
        account.login_history.back().unwrap().timestamp,
        epoch() + Duration::minutes(12)
    );
    assert_eq!(account.last_login_ip.as_deref(), Some("203.0.113.10"));
}

#[tokio::test]
async fn test_unknown_identity_looks_like_wrong_password() {
    let env = TestEnv::new();
    env.seed_account("ada", Role::User).await;

    let unknown = env.login("nobody", TEST_PASSWORD).await.unwrap_err();
    let wrong = env.login("ada", "nope").await.unwrap_err();
    assert_eq!(unknown.error_code(), wrong.error_code());
}

#[tokio::test]
async fn test_token_expires_after_ttl() {
    let env = TestEnv::new();
    env.seed_account("ada", Role::User).await;
    let header = env.bearer_for("ada").await;

    env.clock.advance(Duration::hours(23));
    assert!(env.state.current_account(Some(header.as_str())).await.is_ok());

    env.clock.advance(Duration::hours(1));
    assert!(matches!(
        env.state.current_account(Some(header.as_str())).await,
        Err(AppError::TokenExpired)
    ));
}

#[tokio::test]
async fn test_signup_issues_user_token() {
    let env = TestEnv::new();
    let response = env
        .state
        .auth
        .signup(SignupRequest {
            username: "newbie".to_string(),
            email: "Newbie@Gym.Example".to_string(),
            secret: "first-day".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(response.account.role, Role::User);
    assert_eq!(response.account.email, "newbie@gym.example");
    assert_eq!(env.hasher.hashes(), 1);

    let header = bearer(&response.token);
    assert!(matches!(
        env.state.gate.require(Some(header.as_str()), Role::Trainer),
        Err(AppError::InsufficientRole { required: Role::Trainer })
    ));
    assert!(env.login("NEWBIE", "first-day").await.is_ok());
}

#[tokio::test]
async fn test_signup_rejects_taken_email() {
    let env = TestEnv::new();
    env.seed_account("ada", Role::User).await;

    let err = env
        .state
        .auth
        .signup(SignupRequest {
            username: "ada2".to_string(),
            email: "ADA@gym.example".to_string(),
            secret: "x".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AccountExists));
}

/// Holds every verification until all callers have arrived, and holds the
/// correct password until the test releases it
struct GatedHasher {
    arrived: Barrier,
    released: Mutex<bool>,
    release: Condvar,
}

impl GatedHasher {
    fn new(callers: usize) -> Self {
        Self {
            arrived: Barrier::new(callers),
            released: Mutex::new(false),
            release: Condvar::new(),
        }
    }

    fn release_correct(&self) {
        *self.released.lock().unwrap() = true;
        self.release.notify_all();
    }
}

impl PasswordHasher for GatedHasher {
    fn hash(&self, secret: &str) -> Result<String, AppError> {
        Ok(format!("plain${secret}"))
    }

    fn verify(&self, secret: &str, digest: &str) -> bool {
        self.arrived.wait();
        if secret == TEST_PASSWORD {
            let mut released = self.released.lock().unwrap();
            while !*released {
                released = self.release.wait(released).unwrap();
            }
        }
        digest.strip_prefix("plain$") == Some(secret)
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_in_flight_logins_are_locked_whatever_the_password() {
    const WRONG: usize = 8;

    let hasher = Arc::new(GatedHasher::new(WRONG + 1));
    let accounts = Arc::new(InMemoryAccountStore::new());
    let state = AppState::with_hasher(
        accounts.clone(),
        Arc::new(InMemoryClassStore::new()),
        Arc::new(ManualClock::new(epoch())),
        hasher.clone(),
        test_settings(),
    )
    .unwrap();
    let seeded = state
        .auth
        .provision(signup_request("root"), Role::Admin)
        .await
        .unwrap();

    let attempt = |secret: String| {
        let state = state.clone();
        tokio::spawn(async move {
            state
                .auth
                .login(
                    LoginRequest {
                        identity: "root".to_string(),
                        secret,
                    },
                    LoginContext::default(),
                )
                .await
        })
    };

    // Every attempt reads the account before any failure is recorded
    let wrong: Vec<_> = (0..WRONG).map(|i| attempt(format!("guess-{i}"))).collect();
    let correct = attempt(TEST_PASSWORD.to_string());

    let mut rejected = 0;
    let mut locked = 0;
    for handle in wrong {
        match handle.await.unwrap() {
            Err(AppError::InvalidCredentials) => rejected += 1,
            Err(AppError::AccountLocked { retry_after_secs }) => {
                assert_eq!(retry_after_secs, 900);
                locked += 1;
            },
            other => panic!("unexpected outcome for a wrong password: {other:?}"),
        }
    }
    // The fifth failure locks; later wrong guesses see the lock
    assert_eq!(rejected, 5);
    assert_eq!(locked, WRONG - 5);

    // The right password gets the same answer as the late wrong guesses
    hasher.release_correct();
    assert!(matches!(
        correct.await.unwrap(),
        Err(AppError::AccountLocked { retry_after_secs: 900 })
    ));

    let stored = accounts.find_by_id(seeded.id).await.unwrap().unwrap();
    assert_eq!(stored.failed_attempts, 0);
    assert_eq!(stored.locked_until, Some(epoch() + Duration::minutes(15)));
    assert!(stored.login_history.is_empty());
}
