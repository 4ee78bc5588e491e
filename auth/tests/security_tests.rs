//! Security-focused integration tests.
//!
//! - Tokens never reach the store in clear text
//! - Restricting a user revokes every live token
//! - Verification codes and password hashes are not interchangeable

#![allow(clippy::expect_used)]

use bookstore_auth::mocks::InMemorySessionStore;
use bookstore_auth::providers::{Argon2Hasher, PasswordHasher, SessionStore};
use bookstore_auth::session::token_key;
use bookstore_auth::verification::{codes_match, generate_verification_code};
use bookstore_auth::{AuthError, SessionConfig, SessionManager, TokenKind};
use bookstore_core::environment::Clock;
use bookstore_core::types::{Rank, UserId};
use bookstore_testing::test_clock;
use std::sync::Arc;

#[tokio::test]
async fn store_is_keyed_by_token_digest() {
    let store = InMemorySessionStore::new();
    let manager = SessionManager::new(Arc::new(store.clone()), SessionConfig::default());
    let now = test_clock().now();

    let pair = manager
        .login(UserId::new(), Rank::User, now)
        .await
        .expect("login");

    let by_raw = store
        .get_session(pair.access.token.clone())
        .await
        .expect("store read");
    assert!(by_raw.is_none(), "raw token must not be a store key");

    let by_digest = store
        .get_session(token_key(&pair.access.token))
        .await
        .expect("store read");
    assert_eq!(by_digest.map(|s| s.kind), Some(TokenKind::Access));
}

#[tokio::test]
async fn revoking_a_user_logs_out_every_device() {
    let store = InMemorySessionStore::new();
    let manager = SessionManager::new(Arc::new(store.clone()), SessionConfig::default());
    let now = test_clock().now();
    let target = UserId::new();
    let bystander = UserId::new();

    let phone = manager.login(target, Rank::User, now).await.expect("login");
    let laptop = manager.login(target, Rank::User, now).await.expect("login");
    let other = manager.login(bystander, Rank::User, now).await.expect("login");

    assert_eq!(manager.revoke_user(target).await.expect("revoke"), 4);

    for token in [&phone.access.token, &laptop.access.token] {
        let err = manager
            .authenticate(token, TokenKind::Access, now)
            .await
            .expect_err("revoked");
        assert_eq!(err, AuthError::SessionNotFound);
        assert!(err.requires_login());
    }
    assert!(
        manager
            .authenticate(&other.access.token, TokenKind::Access, now)
            .await
            .is_ok()
    );
}

#[test]
fn hashes_do_not_verify_other_passwords() {
    let hasher = Argon2Hasher::with_params(1024, 1, 1).expect("params");
    let hash = hasher.hash("Secr3t!pass").expect("hash");

    assert!(!hasher.verify("secr3t!pass", &hash).expect("verify"));
    assert!(!hasher.verify("", &hash).expect("verify"));

    let code = generate_verification_code();
    assert!(codes_match(&code, &code));
    assert!(!codes_match(&code, &hash));
}
