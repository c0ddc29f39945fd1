pub mod error;
pub mod ledger;
pub mod persist;

pub use error::LedgerError;
pub use ledger::Ledger;
