//! Splits a run's transactions into fixed-income, day-trade and normal buckets.
//!
//! Transactions are copied and sorted by date with purchases before sales.
//! Each non fixed-income transaction then scans forward over the rest of
//! its day: same-side trades of the same instrument are merged into it, and
//! opposite-side trades are paired off as day trades until either side runs
//! out of quantity. Whatever is left becomes a normal (multi-day) trade.

use itertools::Itertools;
use rust_decimal::Decimal;
use tracing::debug;

use crate::error::TaxError;
use crate::models::{Category, Transaction};

/// Output of one classification pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub fixed_income: Vec<Transaction>,
    /// Matched pairs at adjacent indices (one purchase, one sale)
    pub day_trade: Vec<Transaction>,
    pub normal: Vec<Transaction>,
    /// Same-day duplicates absorbed into an earlier transaction, zeroed out
    pub tombstones: Vec<Transaction>,
}

impl Classification {
    /// Quantity across all three buckets
    pub fn total_quantity(&self) -> u64 {
        [&self.fixed_income, &self.day_trade, &self.normal]
            .into_iter()
            .flatten()
            .map(|t| t.quantity)
            .sum()
    }

    pub fn bucket(&self, category: Category) -> &[Transaction] {
        match category {
            Category::FixedIncome => &self.fixed_income,
            Category::DayTrade => &self.day_trade,
            Category::Normal => &self.normal,
        }
    }

    pub fn day_trade_pairs(&self) -> usize {
        self.day_trade.len() / 2
    }
}

/// Classify detached copies of `transactions`; the input is never touched
///
/// Fails only when merging same-day trades would overflow the quantity.
pub fn classify(transactions: &[Transaction]) -> Result<Classification, TaxError> {
    let mut working: Vec<Transaction> = transactions
        .iter()
        .cloned()
        .sorted_by_key(Transaction::sort_key)
        .collect();

    let mut output = Classification::default();

    for i in 0..working.len() {
        if working[i].is_consumed() {
            continue;
        }

        let category = working[i].category;
        match category {
            Category::FixedIncome => output.fixed_income.push(working[i].clone()),
            Category::Normal | Category::DayTrade => {
                match_same_day(&mut working, i, &mut output)?;

                if !working[i].is_consumed() {
                    let mut remaining = working[i].clone();
                    remaining.category = Category::Normal;
                    output.normal.push(remaining);
                }
            }
        }
    }

    debug!(
        "Classified {} transactions: {} fixed income, {} day trade pairs, {} normal, {} merged",
        transactions.len(),
        output.fixed_income.len(),
        output.day_trade_pairs(),
        output.normal.len(),
        output.tombstones.len()
    );

    Ok(output)
}

/// Scan the rest of the day for trades of the same instrument as `working[i]`
fn match_same_day(
    working: &mut [Transaction],
    i: usize,
    output: &mut Classification,
) -> Result<(), TaxError> {
    let (head, tail) = working.split_at_mut(i + 1);
    let current = &mut head[i];

    for candidate in tail.iter_mut() {
        if candidate.operation_date != current.operation_date || current.is_consumed() {
            break;
        }
        if candidate.instrument_name != current.instrument_name
            || candidate.category == Category::FixedIncome
            || candidate.is_consumed()
        {
            continue;
        }

        if candidate.operation_type == current.operation_type {
            merge_into(current, candidate)?;
            output.tombstones.push(candidate.clone());
        } else {
            pair_day_trade(current, candidate, &mut output.day_trade);
        }
    }
    Ok(())
}

/// Fold `later` into `earlier` at the weighted-average price and zero it out
fn merge_into(earlier: &mut Transaction, later: &mut Transaction) -> Result<(), TaxError> {
    let quantity = earlier.quantity.checked_add(later.quantity).ok_or_else(|| {
        TaxError::Parse(format!(
            "merged quantity of {} on {} overflows",
            earlier.instrument_name, earlier.operation_date
        ))
    })?;
    earlier.unit_price = (earlier.gross_amount() + later.gross_amount()) / Decimal::from(quantity);
    earlier.quantity = quantity;
    earlier.fees_paid += later.fees_paid;

    later.quantity = 0;
    later.unit_price = Decimal::ZERO;
    later.fees_paid = Decimal::ZERO;
    Ok(())
}

/// Match the smaller side fully against a slice of the larger side
fn pair_day_trade(current: &mut Transaction, candidate: &mut Transaction, bucket: &mut Vec<Transaction>) {
    if candidate.quantity < current.quantity {
        bucket.push(peel(current, candidate.quantity));
        bucket.push(take_whole(candidate));
    } else {
        let slice = peel(candidate, current.quantity);
        bucket.push(take_whole(current));
        bucket.push(slice);
    }
}

/// Split `quantity` units (with prorated fees) off `tx` as a day trade
fn peel(tx: &mut Transaction, quantity: u64) -> Transaction {
    let fees = if quantity == tx.quantity {
        tx.fees_paid
    } else {
        tx.fees_paid / Decimal::from(tx.quantity) * Decimal::from(quantity)
    };

    let mut slice = tx.clone();
    slice.quantity = quantity;
    slice.fees_paid = fees;
    slice.category = Category::DayTrade;

    tx.quantity -= quantity;
    tx.fees_paid -= fees;
    slice
}

/// Consume `tx` entirely as a day trade
fn take_whole(tx: &mut Transaction) -> Transaction {
    tx.category = Category::DayTrade;
    let whole = tx.clone();
    tx.quantity = 0;
    tx.fees_paid = Decimal::ZERO;
    whole
}
