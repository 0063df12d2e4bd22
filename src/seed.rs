use envconfig::Envconfig;

use pharmaconnect::config::Config;
use pharmaconnect::db;
use pharmaconnect::db::models::{Role, SessionIdentity};
use pharmaconnect::services::directory::AccountDirectory;
use pharmaconnect::services::invite::InviteCodeIssuer;
use pharmaconnect::services::ledger::InventoryLedger;

/// Demo catalog and stock levels for the seeded distributor.
const SEED_STOCK: [(&str, i64); 5] = [
    ("Paracetamol 500mg", 25),
    ("Amoxicillin 250mg", 0),
    ("Ibuprofen 400mg", 40),
    ("Vitamin C Tablets", 10),
    ("Azithromycin 500mg", 10),
];

/// Creates the schema and loads demo data: one distributor with a fresh
/// invite code, one linked pharmacy, one backup operator, and the demo
/// catalog with its stock levels. Skips seeding when accounts already exist.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
    dotenvy::dotenv().ok();
    let config = Config::init_from_env()?;

    let pool = db::init_db(&config.database_url).await?;
    db::apply_schema(&pool).await?;

    let accounts: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounts")
        .fetch_one(&pool)
        .await?;
    if accounts > 0 {
        log::info!("Accounts already present; skipping seed");
        return Ok(());
    }

    let directory = AccountDirectory::new(pool.clone());
    let distributor = directory
        .create_account("main-distributor", "pass", Role::Distributor)
        .await?;
    directory
        .create_pharmacy("pharma-plus", Some("pass"), distributor.id)
        .await?;
    directory.create_account("backup", "123", Role::Backup).await?;

    let issuer = InviteCodeIssuer::new(pool.clone());
    let identity = SessionIdentity {
        account_id: distributor.id,
        username: distributor.username.clone(),
        role: Role::Distributor,
    };
    let code = issuer.generate(&identity, distributor.id).await?;
    log::info!("Invite code for '{}': {}", distributor.username, code);

    let ledger = InventoryLedger::new(pool.clone());
    for (name, qty) in SEED_STOCK {
        let medicine = ledger.add_medicine(name).await?;
        ledger.set_stock(distributor.id, medicine.id, qty).await?;
    }

    log::info!("Seeded demo data");
    Ok(())
}
