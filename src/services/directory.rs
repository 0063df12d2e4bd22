use sqlx::SqlitePool;

use crate::db::models::{Account, Role};
use crate::error::ServiceError;

/// Account storage and credential resolution.
///
/// Usernames are unique case-insensitively; credential comparison is the
/// load-bearing check for distributor and backup logins.
#[derive(Clone)]
pub struct AccountDirectory {
    pool: SqlitePool,
}

impl AccountDirectory {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Resolves an account by case-insensitive username, exact password and
    /// exact role. Pharmacies provisioned without a password never match.
    pub async fn find_by_credential(
        &self,
        username: &str,
        password: &str,
        role: Role,
    ) -> Result<Account, ServiceError> {
        sqlx::query_as::<_, Account>(
            "SELECT * FROM accounts
             WHERE LOWER(username) = LOWER($1) AND password = $2 AND role = $3",
        )
        .bind(username)
        .bind(password)
        .bind(role)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(ServiceError::NotFound("account"))
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Account, ServiceError> {
        sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE LOWER(username) = LOWER($1)")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(ServiceError::NotFound("account"))
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Account, ServiceError> {
        sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(ServiceError::NotFound("account"))
    }

    /// Creates a pharmacy account permanently linked to a distributor.
    ///
    /// `password` may be absent for pharmacies that authenticate through
    /// login-time linkage. The target of `linked_distributor_id` must be an
    /// existing Distributor account.
    pub async fn create_pharmacy(
        &self,
        username: &str,
        password: Option<&str>,
        linked_distributor_id: i64,
    ) -> Result<Account, ServiceError> {
        self.ensure_username_free(username).await?;

        let distributor = self.find_by_id(linked_distributor_id).await;
        match distributor {
            Ok(account) if account.role == Role::Distributor => {}
            _ => return Err(ServiceError::InvalidParty("linked_distributor_id")),
        }

        let account = sqlx::query_as::<_, Account>(
            "INSERT INTO accounts (username, password, role, linked_distributor_id)
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(username)
        .bind(password)
        .bind(Role::Pharmacy)
        .bind(linked_distributor_id)
        .fetch_one(&self.pool)
        .await?;

        log::info!(
            "Created pharmacy account '{}' linked to distributor {}",
            account.username,
            linked_distributor_id
        );
        Ok(account)
    }

    /// Seeding path for distributor and backup-operator accounts. Never sets
    /// a secret code or a distributor link.
    pub async fn create_account(
        &self,
        username: &str,
        password: &str,
        role: Role,
    ) -> Result<Account, ServiceError> {
        self.ensure_username_free(username).await?;

        let account = sqlx::query_as::<_, Account>(
            "INSERT INTO accounts (username, password, role) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(username)
        .bind(password)
        .bind(role)
        .fetch_one(&self.pool)
        .await?;

        log::info!("Created {} account '{}'", account.role, account.username);
        Ok(account)
    }

    async fn ensure_username_free(&self, username: &str) -> Result<(), ServiceError> {
        let taken: Option<i64> =
            sqlx::query_scalar("SELECT id FROM accounts WHERE LOWER(username) = LOWER($1)")
                .bind(username)
                .fetch_optional(&self.pool)
                .await?;

        match taken {
            Some(_) => Err(ServiceError::DuplicateUsername(username.to_string())),
            None => Ok(()),
        }
    }
}
