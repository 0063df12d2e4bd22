use rand::Rng;
use sqlx::SqlitePool;

use crate::db::models::{Role, SessionIdentity};
use crate::error::ServiceError;

const CODE_LEN: usize = 6;
const CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Issues and rotates the shared secret code a distributor hands to
/// pharmacies to authorize linkage.
#[derive(Clone)]
pub struct InviteCodeIssuer {
    pool: SqlitePool,
}

impl InviteCodeIssuer {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Rotates the distributor's invite code and returns the new one.
    ///
    /// The caller must already be authenticated as that distributor. The
    /// prior code is overwritten unconditionally and no history is kept, so
    /// under login-time linkage any pharmacy still holding the old code loses
    /// access immediately.
    pub async fn generate(
        &self,
        identity: &SessionIdentity,
        distributor_id: i64,
    ) -> Result<String, ServiceError> {
        if identity.role != Role::Distributor || identity.account_id != distributor_id {
            return Err(ServiceError::Unauthorized);
        }

        let code = new_code();
        let updated = sqlx::query("UPDATE accounts SET secret_code = $1 WHERE id = $2 AND role = $3")
            .bind(&code)
            .bind(distributor_id)
            .bind(Role::Distributor)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if updated == 0 {
            return Err(ServiceError::NotFound("distributor"));
        }

        log::info!("Rotated invite code for distributor {}", distributor_id);
        Ok(code)
    }
}

/// Samples a 6-character code from uppercase letters and digits. Codes are
/// not guaranteed unique across distributors; the 36^6 space makes collisions
/// negligible and they are not checked.
fn new_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LEN)
        .map(|_| CODE_CHARSET[rng.gen_range(0..CODE_CHARSET.len())] as char)
        .collect()
}
