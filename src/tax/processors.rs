use rust_decimal::Decimal;
use tracing::debug;

use super::loss_carryforward::{settle, Settlement};
use super::regime::RegimeTotals;
use crate::config::TaxRules;
use crate::error::TaxError;
use crate::models::{Category, OperationType, Transaction};
use crate::records::PositionLedger;

/// Totals and loss settlement produced by one regime processor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegimeOutcome {
    pub totals: RegimeTotals,
    pub settlement: Settlement,
}

/// Process a fixed-income or normal bucket against the position ledger
///
/// Purchases re-average the held position; sales realize profit against
/// its average cost. Any oversold sale aborts the whole bucket.
pub fn process_position_regime(
    category: Category,
    bucket: &[Transaction],
    ledger: &mut PositionLedger,
    rules: &TaxRules,
    accumulated_loss: &mut Decimal,
) -> Result<RegimeOutcome, TaxError> {
    debug!("Processing {} {} transactions", bucket.len(), category.as_str());
    let mut totals = RegimeTotals::default();

    for tx in bucket {
        match tx.operation_type {
            OperationType::Purchase => {
                totals.total_purchase += tx.gross_amount();
                ledger.upsert_purchase(
                    &tx.instrument_name,
                    tx.unit_price,
                    tx.category,
                    tx.quantity,
                    tx.fees_paid,
                )?;
            }
            OperationType::Sale => {
                let profit =
                    ledger.apply_sale(&tx.instrument_name, tx.unit_price, tx.quantity, tx.fees_paid)?;
                totals.total_sale += tx.gross_amount();
                totals.total_profit += profit;
            }
        }
    }

    let settlement = settle(
        &mut totals,
        accumulated_loss,
        rules.rate(category),
        rules.exemption_threshold(category),
    );
    Ok(RegimeOutcome { totals, settlement })
}

/// Process the day-trade bucket as adjacent purchase/sale pairs
///
/// Day trades never touch the position ledger.
pub fn process_day_trades(
    bucket: &[Transaction],
    rules: &TaxRules,
    accumulated_loss: &mut Decimal,
) -> Result<RegimeOutcome, TaxError> {
    debug!("Processing {} day trade pairs", bucket.len() / 2);
    if bucket.len() % 2 != 0 {
        return Err(TaxError::MalformedDayTradePair {
            index: bucket.len() - 1,
            reason: "unpaired trailing transaction".to_string(),
        });
    }

    let mut totals = RegimeTotals::default();

    for (pair_idx, pair) in bucket.chunks_exact(2).enumerate() {
        let (purchase, sale) = split_pair(&pair[0], &pair[1]).ok_or_else(|| {
            TaxError::MalformedDayTradePair {
                index: pair_idx * 2,
                reason: format!(
                    "{} {} does not pair with {} {}",
                    pair[0].operation_type.as_str(),
                    pair[0].instrument_name,
                    pair[1].operation_type.as_str(),
                    pair[1].instrument_name
                ),
            }
        })?;

        let purchase_amount = purchase.gross_amount();
        let sale_amount = sale.gross_amount();
        totals.total_purchase += purchase_amount;
        totals.total_sale += sale_amount;
        totals.total_profit += sale_amount - purchase_amount - purchase.fees_paid - sale.fees_paid;
    }

    let settlement = settle(
        &mut totals,
        accumulated_loss,
        rules.rate(Category::DayTrade),
        rules.exemption_threshold(Category::DayTrade),
    );
    Ok(RegimeOutcome { totals, settlement })
}

/// Order a pair as (purchase, sale), rejecting mismatched sides or instruments
fn split_pair<'a>(
    first: &'a Transaction,
    second: &'a Transaction,
) -> Option<(&'a Transaction, &'a Transaction)> {
    if first.instrument_name != second.instrument_name
        || second.operation_type != first.operation_type.opposite()
    {
        return None;
    }
    match first.operation_type {
        OperationType::Purchase => Some((first, second)),
        OperationType::Sale => Some((second, first)),
    }
}
