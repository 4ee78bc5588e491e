//! Account lifecycle: sign-up, verification, login, refresh and logout.

use crate::metrics::AUTH_LOGINS;
use crate::server::state::AuthProviders;
use bookstore_auth::verification::{codes_match, generate_verification_code};
use bookstore_auth::{IssuedToken, TokenPair};
use bookstore_core::StoreError;
use bookstore_core::environment::Clock;
use bookstore_core::store::UserStore;
use bookstore_core::types::{Address, Credential, Money, Rank, User, UserId};
use bookstore_web::{AppError, WebResult};
use std::sync::Arc;

/// A validated sign-up.
#[derive(Debug, Clone)]
pub struct NewAccount {
    /// Login email
    pub email: String,
    /// Plaintext password
    pub password: String,
    /// Display name
    pub name: String,
    /// Phone number
    pub phone_number: String,
    /// Postal address
    pub address: Address,
}

/// Result of a verification attempt that found an unverified account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// The code matched; the account can log in
    Verified,
    /// The code did not match
    WrongCode,
}

/// A successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    /// The account's profile
    pub user: User,
    /// The account's rank
    pub rank: Rank,
    /// Tokens for the session cookies
    pub tokens: TokenPair,
}

/// Normalized form under which emails are stored and looked up.
fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn record_login(outcome: &'static str) {
    metrics::counter!(AUTH_LOGINS, "outcome" => outcome).increment(1);
}

/// Account lifecycle service.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    providers: AuthProviders,
    clock: Arc<dyn Clock>,
}

impl AuthService {
    /// Create an auth service.
    #[must_use]
    pub fn new(users: Arc<dyn UserStore>, providers: AuthProviders, clock: Arc<dyn Clock>) -> Self {
        Self {
            users,
            providers,
            clock,
        }
    }

    async fn hash_password(&self, password: String) -> WebResult<String> {
        let hasher = Arc::clone(&self.providers.hasher);
        let hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AppError::internal().with_source(anyhow::Error::new(e)))??;
        Ok(hash)
    }

    async fn verify_password(&self, password: String, hash: String) -> WebResult<bool> {
        let hasher = Arc::clone(&self.providers.hasher);
        let matches = tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| AppError::internal().with_source(anyhow::Error::new(e)))??;
        Ok(matches)
    }

    /// Create an unverified customer account and email its verification
    /// code.
    ///
    /// A failed delivery is logged; the account is still created.
    ///
    /// # Errors
    ///
    /// - 400 "The email is already in use"
    pub async fn sign_up(&self, account: NewAccount) -> WebResult<User> {
        let email = normalize_email(&account.email);
        if self
            .users
            .find_credential_by_email(email.clone())
            .await?
            .is_some()
        {
            return Err(AppError::bad_request("The email is already in use"));
        }

        let password_hash = self.hash_password(account.password).await?;
        let now = self.clock.now();
        let code = generate_verification_code();

        let user = User {
            id: UserId::new(),
            name: account.name.trim().to_string(),
            email: email.clone(),
            phone_number: account.phone_number,
            address: Address {
                country: account.address.country.trim().to_uppercase(),
                ..account.address
            },
            balance: Money::ZERO,
            created_at: now,
            updated_at: now,
        };
        let credential = Credential {
            user_id: user.id,
            email,
            password_hash,
            is_verified: false,
            verification_code: Some(code.clone()),
            rank: Rank::User,
            is_restricted: false,
        };

        self.users
            .create_account(user.clone(), credential)
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => AppError::bad_request("The email is already in use"),
                other => other.into(),
            })?;

        tracing::info!(user_id = %user.id, "Account created");

        if let Err(e) = self
            .providers
            .email
            .send_verification_code(user.email.clone(), user.name.clone(), code)
            .await
        {
            tracing::warn!(user_id = %user.id, error = %e, "Failed to send verification code");
        }

        Ok(user)
    }

    /// Check a verification code and mark the account verified on a match.
    ///
    /// # Errors
    ///
    /// - 404 "User not found"
    /// - 400 "Account already verified"
    pub async fn verify_account(&self, email: &str, code: &str) -> WebResult<VerifyOutcome> {
        let credential = self
            .users
            .find_credential_by_email(normalize_email(email))
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))?;

        if credential.is_verified {
            return Err(AppError::bad_request("Account already verified"));
        }

        let matches = credential
            .verification_code
            .as_deref()
            .is_some_and(|expected| codes_match(expected, code));
        if !matches {
            tracing::debug!(user_id = %credential.user_id, "Wrong verification code");
            return Ok(VerifyOutcome::WrongCode);
        }

        self.users.mark_verified(credential.user_id).await?;
        tracing::info!(user_id = %credential.user_id, "Account verified");
        Ok(VerifyOutcome::Verified)
    }

    /// Check credentials and open a session.
    ///
    /// # Errors
    ///
    /// 400 with one of "You are not registered", "You can not login.Your
    /// account is restricted", "Please verify your account before login",
    /// "Wrong credentials".
    pub async fn login(&self, email: &str, password: String) -> WebResult<LoginOutcome> {
        let Some(credential) = self
            .users
            .find_credential_by_email(normalize_email(email))
            .await?
        else {
            record_login("unregistered");
            return Err(AppError::bad_request("You are not registered"));
        };

        if credential.is_restricted {
            record_login("restricted");
            return Err(AppError::bad_request(
                "You can not login.Your account is restricted",
            ));
        }
        if !credential.is_verified {
            record_login("unverified");
            return Err(AppError::bad_request(
                "Please verify your account before login",
            ));
        }
        if !self
            .verify_password(password, credential.password_hash.clone())
            .await?
        {
            record_login("wrong_credentials");
            return Err(AppError::bad_request("Wrong credentials"));
        }

        let user = self
            .users
            .find_user(credential.user_id)
            .await?
            .ok_or_else(|| {
                AppError::internal()
                    .with_source(anyhow::anyhow!("credential {} has no user", credential.user_id))
            })?;

        let tokens = self
            .providers
            .sessions
            .login(user.id, credential.rank, self.clock.now())
            .await?;

        record_login("success");
        tracing::info!(user_id = %user.id, rank = credential.rank.as_i16(), "Logged in");

        Ok(LoginOutcome {
            user,
            rank: credential.rank,
            tokens,
        })
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// # Errors
    ///
    /// - 401 "Token can not be null" without a token
    /// - 401 "Please login again" for an unknown or expired token
    pub async fn refresh(&self, refresh_token: Option<String>) -> WebResult<IssuedToken> {
        let token = refresh_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::unauthorized("Token can not be null"))?;
        let issued = self
            .providers
            .sessions
            .refresh(&token, self.clock.now())
            .await?;
        Ok(issued)
    }

    /// Revoke whichever session tokens are present.
    ///
    /// # Errors
    ///
    /// Returns 500 if the session store is unreachable.
    pub async fn logout(
        &self,
        access_token: Option<String>,
        refresh_token: Option<String>,
    ) -> WebResult<()> {
        for token in [access_token, refresh_token].into_iter().flatten() {
            self.providers.sessions.revoke(&token).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use bookstore_auth::mocks::{InMemorySessionStore, RecordingEmailSender};
    use bookstore_auth::providers::Argon2Hasher;
    use bookstore_auth::{SessionConfig, SessionManager};
    use bookstore_testing::{InMemoryStore, test_clock};

    struct Fixture {
        service: AuthService,
        store: InMemoryStore,
        email: RecordingEmailSender,
    }

    fn fixture(email: RecordingEmailSender) -> Fixture {
        let store = InMemoryStore::new();
        let providers = AuthProviders {
            sessions: SessionManager::new(
                Arc::new(InMemorySessionStore::new()),
                SessionConfig::default(),
            ),
            hasher: Arc::new(Argon2Hasher::with_params(1024, 1, 1).unwrap()),
            email: Arc::new(email.clone()),
        };
        let service = AuthService::new(Arc::new(store.clone()), providers, Arc::new(test_clock()));
        Fixture {
            service,
            store,
            email,
        }
    }

    fn account(email: &str) -> NewAccount {
        NewAccount {
            email: email.to_string(),
            password: "Secr3t!pass".to_string(),
            name: "Karim Ahmed".to_string(),
            phone_number: "01712345678".to_string(),
            address: Address {
                country: "bd".to_string(),
                city: "Dhaka".to_string(),
                area: "Banani".to_string(),
                street: "Road 7".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn sign_up_then_verify_then_login() {
        let f = fixture(RecordingEmailSender::new());

        let user = f.service.sign_up(account("Karim@Example.com")).await.unwrap();
        assert_eq!(user.email, "karim@example.com");
        assert_eq!(user.address.country, "BD");
        assert_eq!(user.balance, Money::ZERO);

        let err = f
            .service
            .login("karim@example.com", "Secr3t!pass".into())
            .await
            .unwrap_err();
        assert_eq!(err.message(), "Please verify your account before login");

        let code = f.email.last_code_for("karim@example.com").unwrap().unwrap();
        assert_eq!(
            f.service.verify_account("karim@example.com", "000000x").await.unwrap(),
            VerifyOutcome::WrongCode
        );
        assert_eq!(
            f.service.verify_account("karim@example.com", &code).await.unwrap(),
            VerifyOutcome::Verified
        );

        let outcome = f
            .service
            .login("karim@example.com", "Secr3t!pass".into())
            .await
            .unwrap();
        assert_eq!(outcome.user.id, user.id);
        assert_eq!(outcome.rank, Rank::User);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let f = fixture(RecordingEmailSender::new());
        f.service.sign_up(account("dup@example.com")).await.unwrap();

        let err = f.service.sign_up(account("DUP@example.com")).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), "The email is already in use");
    }

    #[tokio::test]
    async fn failed_delivery_still_creates_account() {
        let f = fixture(RecordingEmailSender::failing());
        let user = f.service.sign_up(account("quiet@example.com")).await.unwrap();

        let credential = f.store.find_credential(user.id).await.unwrap().unwrap();
        assert!(!credential.is_verified);
        assert_eq!(credential.verification_code.map(|c| c.len()), Some(6));
    }

    #[tokio::test]
    async fn verifying_twice_is_rejected() {
        let f = fixture(RecordingEmailSender::new());
        f.service.sign_up(account("twice@example.com")).await.unwrap();
        let code = f.email.last_code_for("twice@example.com").unwrap().unwrap();
        f.service.verify_account("twice@example.com", &code).await.unwrap();

        let err = f
            .service
            .verify_account("twice@example.com", &code)
            .await
            .unwrap_err();
        assert_eq!(err.message(), "Account already verified");
    }

    #[tokio::test]
    async fn unknown_email_cannot_login() {
        let f = fixture(RecordingEmailSender::new());
        let err = f
            .service
            .login("ghost@example.com", "Secr3t!pass".into())
            .await
            .unwrap_err();
        assert_eq!(err.message(), "You are not registered");
    }

    #[tokio::test]
    async fn refresh_requires_a_token() {
        let f = fixture(RecordingEmailSender::new());
        let err = f.service.refresh(None).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.message(), "Token can not be null");

        let err = f.service.refresh(Some("stale".into())).await.unwrap_err();
        assert_eq!(err.message(), "Please login again");
    }
}
