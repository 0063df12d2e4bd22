pub mod directory;
pub mod invite;
pub mod ledger;
pub mod linkage;
pub mod orders;
