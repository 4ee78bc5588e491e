//! Users and credentials.

use crate::rows::{CredentialRow, UserRow};
use crate::{PostgresStore, write_error};
use bookstore_core::error::StoreError;
use bookstore_core::store::{StoreFuture, UserStore};
use bookstore_core::types::{Address, Credential, Money, User, UserId};
use chrono::{DateTime, Utc};

const USER_COLUMNS: &str = "id, name, email, phone_number, country, city, area, street, \
                            balance_cents, created_at, updated_at";

const CREDENTIAL_COLUMNS: &str =
    "user_id, email, password_hash, is_verified, verification_code, rank, is_restricted";

impl UserStore for PostgresStore {
    fn create_account(&self, user: User, credential: Credential) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(|e| StoreError::DatabaseError(format!("Failed to start transaction: {e}")))?;

            sqlx::query(
                r"
                INSERT INTO users
                    (id, name, email, phone_number, country, city, area, street,
                     balance_cents, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                ",
            )
            .bind(user.id.as_uuid())
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.phone_number)
            .bind(&user.address.country)
            .bind(&user.address.city)
            .bind(&user.address.area)
            .bind(&user.address.street)
            .bind(user.balance.cents())
            .bind(user.created_at)
            .bind(user.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| write_error("create user", "Email already exists", &e))?;

            sqlx::query(
                r"
                INSERT INTO credentials
                    (user_id, email, password_hash, is_verified, verification_code, rank, is_restricted)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ",
            )
            .bind(credential.user_id.as_uuid())
            .bind(&credential.email)
            .bind(&credential.password_hash)
            .bind(credential.is_verified)
            .bind(&credential.verification_code)
            .bind(credential.rank.as_i16())
            .bind(credential.is_restricted)
            .execute(&mut *tx)
            .await
            .map_err(|e| write_error("create credential", "Email already exists", &e))?;

            tx.commit()
                .await
                .map_err(|e| StoreError::DatabaseError(format!("Failed to commit transaction: {e}")))?;

            tracing::debug!(user_id = %user.id, "Account created");
            Ok(())
        })
    }

    fn find_user(&self, user_id: UserId) -> StoreFuture<'_, Option<User>> {
        Box::pin(async move {
            let row: Option<UserRow> =
                sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                    .bind(user_id.as_uuid())
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(|e| StoreError::DatabaseError(format!("Failed to get user: {e}")))?;
            Ok(row.map(User::from))
        })
    }

    fn find_credential_by_email(&self, email: String) -> StoreFuture<'_, Option<Credential>> {
        Box::pin(async move {
            let row: Option<CredentialRow> = sqlx::query_as(&format!(
                "SELECT {CREDENTIAL_COLUMNS} FROM credentials WHERE email = $1"
            ))
            .bind(&email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::DatabaseError(format!("Failed to get credential: {e}")))?;
            row.map(Credential::try_from).transpose()
        })
    }

    fn find_credential(&self, user_id: UserId) -> StoreFuture<'_, Option<Credential>> {
        Box::pin(async move {
            let row: Option<CredentialRow> = sqlx::query_as(&format!(
                "SELECT {CREDENTIAL_COLUMNS} FROM credentials WHERE user_id = $1"
            ))
            .bind(user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::DatabaseError(format!("Failed to get credential: {e}")))?;
            row.map(Credential::try_from).transpose()
        })
    }

    fn mark_verified(&self, user_id: UserId) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query(
                r"
                UPDATE credentials
                SET is_verified = TRUE,
                    verification_code = NULL
                WHERE user_id = $1
                ",
            )
            .bind(user_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::DatabaseError(format!("Failed to verify account: {e}")))?;
            Ok(())
        })
    }

    fn set_restricted(&self, user_id: UserId, restricted: bool) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let result =
                sqlx::query("UPDATE credentials SET is_restricted = $2 WHERE user_id = $1")
                    .bind(user_id.as_uuid())
                    .bind(restricted)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| {
                        StoreError::DatabaseError(format!("Failed to restrict user: {e}"))
                    })?;
            Ok(result.rows_affected() == 1)
        })
    }

    fn list_active_users(&self) -> StoreFuture<'_, Vec<User>> {
        Box::pin(async move {
            let rows: Vec<UserRow> = sqlx::query_as(
                r"
                SELECT u.id, u.name, u.email, u.phone_number, u.country, u.city, u.area,
                       u.street, u.balance_cents, u.created_at, u.updated_at
                FROM users u
                JOIN credentials c ON c.user_id = u.id
                WHERE NOT c.is_restricted
                ORDER BY u.created_at
                ",
            )
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::DatabaseError(format!("Failed to list users: {e}")))?;
            Ok(rows.into_iter().map(User::from).collect())
        })
    }

    fn update_profile(
        &self,
        user_id: UserId,
        name: Option<String>,
        address: Option<Address>,
        now: DateTime<Utc>,
    ) -> StoreFuture<'_, Option<User>> {
        Box::pin(async move {
            let address = address.as_ref();
            let row: Option<UserRow> = sqlx::query_as(&format!(
                r"
                UPDATE users
                SET name = COALESCE($2, name),
                    country = COALESCE($3, country),
                    city = COALESCE($4, city),
                    area = COALESCE($5, area),
                    street = COALESCE($6, street),
                    updated_at = $7
                WHERE id = $1
                RETURNING {USER_COLUMNS}
                "
            ))
            .bind(user_id.as_uuid())
            .bind(name)
            .bind(address.map(|a| a.country.clone()))
            .bind(address.map(|a| a.city.clone()))
            .bind(address.map(|a| a.area.clone()))
            .bind(address.map(|a| a.street.clone()))
            .bind(now)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::DatabaseError(format!("Failed to update user: {e}")))?;
            Ok(row.map(User::from))
        })
    }

    fn add_balance(
        &self,
        user_id: UserId,
        amount: Money,
        now: DateTime<Utc>,
    ) -> StoreFuture<'_, Option<Money>> {
        Box::pin(async move {
            let balance: Option<i64> = sqlx::query_scalar(
                r"
                UPDATE users
                SET balance_cents = balance_cents + $2,
                    updated_at = $3
                WHERE id = $1
                RETURNING balance_cents
                ",
            )
            .bind(user_id.as_uuid())
            .bind(amount.cents())
            .bind(now)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::DatabaseError(format!("Failed to add balance: {e}")))?;
            Ok(balance.map(Money::from_cents))
        })
    }
}
