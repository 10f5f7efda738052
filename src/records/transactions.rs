use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::TaxError;
use crate::models::Transaction;

/// Submitted transactions, in submission order
///
/// Tax runs read this store but never mutate it; classification works on
/// detached copies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionStore {
    transactions: Vec<Transaction>,
}

impl TransactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, transaction: Transaction) -> Result<(), TaxError> {
        debug!(
            "Adding new transaction: {} (id {})",
            transaction.instrument_name, transaction.operation_id
        );
        if self.position_of(transaction.operation_id).is_some() {
            warn!("Transaction {} already exists", transaction.operation_id);
            return Err(TaxError::DuplicateKey(format!(
                "transaction {}",
                transaction.operation_id
            )));
        }
        self.transactions.push(transaction);
        Ok(())
    }

    /// Replace the transaction carrying `operation_id`; the id itself is kept
    pub fn edit(&mut self, operation_id: u64, mut updated: Transaction) -> Result<(), TaxError> {
        debug!("Editing transaction: {}", operation_id);
        let idx = self.position_of(operation_id).ok_or_else(|| {
            warn!("Transaction {} does not exist", operation_id);
            TaxError::NotFound(format!("transaction {}", operation_id))
        })?;
        updated.operation_id = operation_id;
        self.transactions[idx] = updated;
        Ok(())
    }

    pub fn remove(&mut self, operation_id: u64) -> Result<Transaction, TaxError> {
        debug!("Removing transaction: {}", operation_id);
        let idx = self
            .position_of(operation_id)
            .ok_or_else(|| TaxError::NotFound(format!("transaction {}", operation_id)))?;
        Ok(self.transactions.remove(idx))
    }

    pub fn find(&self, operation_id: u64) -> Option<&Transaction> {
        self.transactions
            .iter()
            .find(|t| t.operation_id == operation_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions.iter()
    }

    pub fn as_slice(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Drop every transaction, e.g. when moving on to the next tax period
    pub fn clear(&mut self) {
        debug!("Clearing {} transactions", self.transactions.len());
        self.transactions.clear();
    }

    /// Next free operation id (one past the highest stored id)
    pub fn next_id(&self) -> u64 {
        self.transactions
            .iter()
            .map(|t| t.operation_id)
            .max()
            .map_or(1, |max| max + 1)
    }

    fn position_of(&self, operation_id: u64) -> Option<usize> {
        self.transactions
            .iter()
            .position(|t| t.operation_id == operation_id)
    }
}
