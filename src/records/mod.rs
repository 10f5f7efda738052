// Record management - in-memory position ledger and transaction store

pub mod positions;
pub mod transactions;

pub use positions::PositionLedger;
pub use transactions::TransactionStore;
