use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use csv::ReaderBuilder;
use rust_decimal::Decimal;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::models::{Category, OperationType, Transaction};

/// Parse a `;`-separated transaction ledger
///
/// Headers may be in English or Portuguese. Rows that cannot be parsed are
/// skipped with a warning.
pub fn parse_ledger_csv<P: AsRef<Path>>(file_path: P) -> Result<Vec<Transaction>> {
    let path = file_path.as_ref();
    info!("Parsing ledger CSV file: {:?}", path);

    let file = std::fs::File::open(path).with_context(|| format!("Failed to open CSV file {:?}", path))?;
    parse_ledger_reader(file)
}

pub fn parse_ledger_reader<R: Read>(input: R) -> Result<Vec<Transaction>> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let headers = reader
        .headers()
        .context("Failed to read CSV headers")?
        .clone();
    debug!("CSV headers: {:?}", headers);

    let columns = find_columns(&headers)?;
    debug!("Column mapping: {:?}", columns);

    let mut transactions = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        let record = result.context("Failed to read CSV record")?;

        match parse_row(&record, &columns, line as u64) {
            Ok(Some(tx)) => transactions.push(tx),
            Ok(None) => continue,
            Err(e) => {
                warn!("Skipping row {}: {}", line, e);
                continue;
            }
        }
    }

    info!("Successfully parsed {} transactions from CSV", transactions.len());
    Ok(transactions)
}

#[derive(Debug)]
struct LedgerColumns {
    date: usize,
    name: usize,
    operation: usize,
    quantity: usize,
    price: usize,
    fees: Option<usize>,
    category: Option<usize>,
    id: Option<usize>,
}

fn find_columns(headers: &csv::StringRecord) -> Result<LedgerColumns> {
    let find = |candidates: &[&str]| find_column(headers, candidates);

    let date = find(&["date", "data"][..]);
    let name = find(&["ticker", "ativo", "código", "codigo", "instrument", "name"][..]);
    let operation = find(&["type", "tipo", "operação", "operacao", "c/v"][..]);
    let quantity = find(&["quantity", "qty", "quantidade"][..]);
    let price = find(&["price", "preço", "preco"][..]);

    Ok(LedgerColumns {
        date: date.ok_or_else(|| anyhow!("Could not find date column"))?,
        name: name.ok_or_else(|| anyhow!("Could not find ticker column"))?,
        operation: operation.ok_or_else(|| anyhow!("Could not find operation type column"))?,
        quantity: quantity.ok_or_else(|| anyhow!("Could not find quantity column"))?,
        price: price.ok_or_else(|| anyhow!("Could not find price column"))?,
        fees: find(&["fees", "taxas", "custos", "corretagem"][..]),
        category: find(&["category", "categoria", "mercado"][..]),
        id: find(&["id", "operation_id"][..]),
    })
}

fn find_column(headers: &csv::StringRecord, candidates: &[&str]) -> Option<usize> {
    headers.iter().position(|h| {
        let text = h.to_lowercase();
        candidates.iter().any(|c| text.starts_with(c))
    })
}

fn parse_row(record: &csv::StringRecord, columns: &LedgerColumns, line: u64) -> Result<Option<Transaction>> {
    if record.iter().all(|field| field.is_empty()) {
        return Ok(None);
    }

    let field = |idx: usize| record.get(idx).unwrap_or("");
    let optional = |idx: Option<usize>| idx.map(field).filter(|s| !s.is_empty());

    let operation_date = parse_date(field(columns.date))?;
    let instrument_name = field(columns.name).to_uppercase();
    if instrument_name.is_empty() {
        return Err(anyhow!("Empty ticker"));
    }
    let operation_type = OperationType::from_str(field(columns.operation))
        .map_err(|_| anyhow!("Unknown operation type '{}'", field(columns.operation)))?;
    let quantity = field(columns.quantity)
        .parse::<u64>()
        .with_context(|| format!("Invalid quantity '{}'", field(columns.quantity)))?;
    let unit_price = parse_decimal(field(columns.price))?;
    let fees_paid = optional(columns.fees)
        .map(parse_decimal)
        .transpose()?
        .unwrap_or(Decimal::ZERO);
    let category = match optional(columns.category) {
        Some(text) => Category::from_str(text).map_err(|_| anyhow!("Unknown category '{}'", text))?,
        None => Category::Normal,
    };
    let operation_id = match optional(columns.id) {
        Some(text) => text
            .parse::<u64>()
            .with_context(|| format!("Invalid id '{}'", text))?,
        None => line,
    };

    if quantity == 0 {
        return Err(anyhow!("Quantity must be greater than zero"));
    }
    if unit_price < Decimal::ZERO || fees_paid < Decimal::ZERO {
        return Err(anyhow!("Price and fees must not be negative"));
    }

    Ok(Some(Transaction::new(
        instrument_name,
        unit_price,
        category,
        quantity,
        fees_paid,
        operation_date,
        operation_type,
        operation_id,
    )))
}

fn parse_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(text, "%d/%m/%Y"))
        .with_context(|| format!("Invalid date '{}'. Use YYYY-MM-DD or DD/MM/YYYY", text))
}

/// Accepts "1234.56", "1.234,56" and an optional "R$" prefix
fn parse_decimal(text: &str) -> Result<Decimal> {
    let cleaned = text.trim().trim_start_matches("R$").trim();
    let normalized = if cleaned.contains(',') {
        cleaned.replace('.', "").replace(',', ".")
    } else {
        cleaned.to_string()
    };
    Decimal::from_str(&normalized).with_context(|| format!("Invalid decimal '{}'", text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_english_ledger() {
        let csv = "date;ticker;type;quantity;price;fees;category;id\n\
                   2024-03-01;petr4;buy;100;30.50;1.20;normal;10\n\
                   2024-03-01;PETR4;sell;40;31.00;0.50;;11\n\
                   2024-03-04;MXRF11;buy;10;10.10;0;fi;12\n";
        let txs = parse_ledger_reader(csv.as_bytes()).unwrap();

        assert_eq!(txs.len(), 3);
        assert_eq!(txs[0].instrument_name, "PETR4");
        assert_eq!(txs[0].unit_price, dec!(30.50));
        assert_eq!(txs[0].fees_paid, dec!(1.20));
        assert_eq!(txs[1].operation_type, OperationType::Sale);
        assert_eq!(txs[1].category, Category::Normal);
        assert_eq!(txs[2].category, Category::FixedIncome);
        assert_eq!(txs[2].operation_id, 12);
    }

    #[test]
    fn test_parse_portuguese_ledger_with_brazilian_numbers() {
        let csv = "Data;Ativo;Operação;Quantidade;Preço;Taxas\n\
                   05/02/2024;VALE3;Compra;1000;R$ 1.050,25;3,10\n";
        let txs = parse_ledger_reader(csv.as_bytes()).unwrap();

        assert_eq!(txs.len(), 1);
        let tx = &txs[0];
        assert_eq!(tx.operation_date, NaiveDate::from_ymd_opt(2024, 2, 5).unwrap());
        assert_eq!(tx.unit_price, dec!(1050.25));
        assert_eq!(tx.fees_paid, dec!(3.10));
        // Without an id column the line number is used
        assert_eq!(tx.operation_id, 2);
    }

    #[test]
    fn test_bad_rows_are_skipped() {
        let csv = "date;ticker;type;quantity;price\n\
                   2024-13-01;PETR4;buy;100;30\n\
                   2024-01-02;PETR4;hold;100;30\n\
                   2024-01-02;PETR4;buy;0;30\n\
                   ;;;;\n\
                   2024-01-03;PETR4;buy;5;30\n";
        let txs = parse_ledger_reader(csv.as_bytes()).unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].operation_id, 6);
    }

    #[test]
    fn test_missing_required_column() {
        let csv = "date;ticker;quantity;price\n2024-01-02;PETR4;1;2\n";
        assert!(parse_ledger_reader(csv.as_bytes()).is_err());
    }
}
