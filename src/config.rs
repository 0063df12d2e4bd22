use envconfig::Envconfig;

use crate::services::linkage::LinkageMode;

/// Process configuration, read from the environment (optionally via a `.env`
/// file loaded by the binary).
#[derive(Envconfig)]
pub struct Config {
    #[envconfig(from = "DATABASE_URL")]
    pub database_url: String,

    /// Which trust model governs pharmacy logins: `registration` or `login`.
    #[envconfig(from = "LINKAGE_MODE", default = "registration")]
    pub linkage_mode: LinkageMode,
}
