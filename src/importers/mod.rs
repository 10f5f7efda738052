// Import module - transaction ledger parsers

pub mod ledger_csv;

use anyhow::{anyhow, Result};
use std::path::Path;
use tracing::info;

use crate::models::Transaction;

pub use ledger_csv::{parse_ledger_csv, parse_ledger_reader};

/// Import transactions from a ledger file, dispatching on its extension
pub fn import_file<P: AsRef<Path>>(file_path: P) -> Result<Vec<Transaction>> {
    let path = file_path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| anyhow!("File has no extension"))?
        .to_lowercase();

    info!("Importing ledger file: {:?} (type: {})", path, extension);

    match extension.as_str() {
        "csv" | "txt" => parse_ledger_csv(path),
        _ => Err(anyhow!(
            "Unsupported file format: {}. Use a ;-separated .csv ledger",
            extension
        )),
    }
}
