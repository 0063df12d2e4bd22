use std::str::FromStr;

use sqlx::SqlitePool;

use crate::db::models::{Account, Role, SessionIdentity};
use crate::error::ServiceError;
use crate::services::directory::AccountDirectory;

/// How a pharmacy proves its association with a distributor.
///
/// The two modes carry different invalidation semantics and are mutually
/// exclusive, so the choice is made once at construction (normally from
/// `LINKAGE_MODE` in the environment).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkageMode {
    /// The invite code acts as a capability token checked once, when the
    /// pharmacy registers; the link is permanent and later logins use the
    /// pharmacy's own password. Rotating the code never affects accounts that
    /// are already linked.
    Registration,
    /// The invite code acts as a rotating shared secret: pharmacies are
    /// pre-provisioned with a link and no password, and every login re-checks
    /// the distributor's current code. Rotation invalidates all future logins
    /// until the linked pharmacies learn the new code.
    Login,
}

impl FromStr for LinkageMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "registration" => Ok(LinkageMode::Registration),
            "login" => Ok(LinkageMode::Login),
            other => Err(format!("unknown linkage mode: {other}")),
        }
    }
}

/// Binds pharmacy accounts to the one distributor they order from, and
/// resolves login credentials for every role.
#[derive(Clone)]
pub struct LinkageProtocol {
    pool: SqlitePool,
    directory: AccountDirectory,
    mode: LinkageMode,
}

impl LinkageProtocol {
    pub fn new(pool: SqlitePool, mode: LinkageMode) -> Self {
        let directory = AccountDirectory::new(pool.clone());
        Self {
            pool,
            directory,
            mode,
        }
    }

    pub fn mode(&self) -> LinkageMode {
        self.mode
    }

    /// Registration-time linkage: creates a pharmacy account permanently
    /// linked to the distributor whose current invite code was submitted.
    ///
    /// A taken username fails with `DuplicateUsername` regardless of whether
    /// the code is valid, so the check runs before the code lookup.
    pub async fn register_pharmacy(
        &self,
        username: &str,
        password: Option<&str>,
        invite_code: &str,
    ) -> Result<Account, ServiceError> {
        match self.directory.find_by_username(username).await {
            Ok(_) => return Err(ServiceError::DuplicateUsername(username.to_string())),
            Err(ServiceError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }

        let distributor = self.distributor_for_code(invite_code).await?;
        self.directory
            .create_pharmacy(username, password, distributor.id)
            .await
    }

    /// Resolves submitted credentials to the identity a session should
    /// authorize as. Session establishment and destruction belong to the
    /// transport layer.
    ///
    /// Distributor and backup logins always match username, password and role
    /// directly. Pharmacy logins depend on the linkage mode: under
    /// registration-time linkage `secret` is the pharmacy's own password;
    /// under login-time linkage it is the linked distributor's invite code as
    /// of this instant.
    pub async fn login(
        &self,
        role: Role,
        username: &str,
        secret: &str,
    ) -> Result<SessionIdentity, ServiceError> {
        let account = match (role, self.mode) {
            (Role::Pharmacy, LinkageMode::Login) => {
                self.login_linked_pharmacy(username, secret).await?
            }
            _ => self.directory.find_by_credential(username, secret, role).await?,
        };

        log::info!("Login for '{}' as {}", account.username, account.role);
        Ok(SessionIdentity {
            account_id: account.id,
            username: account.username,
            role: account.role,
        })
    }

    async fn login_linked_pharmacy(
        &self,
        username: &str,
        code: &str,
    ) -> Result<Account, ServiceError> {
        let pharmacy = self.directory.find_by_username(username).await?;
        if pharmacy.role != Role::Pharmacy {
            return Err(ServiceError::NotFound("pharmacy account"));
        }

        let distributor_id = pharmacy
            .linked_distributor_id
            .ok_or(ServiceError::Unauthorized)?;
        let distributor = self.directory.find_by_id(distributor_id).await?;

        // Compared against the distributor's code at this instant; rotation
        // invalidates immediately.
        if distributor.secret_code.as_deref() == Some(code) {
            Ok(pharmacy)
        } else {
            Err(ServiceError::Unauthorized)
        }
    }

    async fn distributor_for_code(&self, invite_code: &str) -> Result<Account, ServiceError> {
        sqlx::query_as::<_, Account>(
            "SELECT * FROM accounts WHERE secret_code = $1 AND role = $2",
        )
        .bind(invite_code)
        .bind(Role::Distributor)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(ServiceError::InvalidInviteCode)
    }
}
