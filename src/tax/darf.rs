use chrono::{Datelike, NaiveDate, Weekday};
use rust_decimal::Decimal;
use serde::Serialize;

use super::regime::{PerRegime, RegimeTotals};
use crate::error::TaxError;
use crate::utils::format_currency;

/// Revenue code for B3 variable-income capital gains
pub const DARF_CODE: &str = "6015";

/// Result of combining the per-regime dues with the deferred balance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DarfAssessment {
    pub due_tax: PerRegime<Decimal>,
    /// Deferred balance that entered this run
    pub carried_in: Decimal,
    /// Sum of the regime dues plus the deferred balance
    pub darf_value: Decimal,
    /// Amount surfaced for payment this run (zero when deferred)
    pub payable: Decimal,
    /// Deferred balance left for the next run
    pub carried_out: Decimal,
}

impl DarfAssessment {
    pub fn is_deferred(&self) -> bool {
        self.payable.is_zero() && !self.darf_value.is_zero()
    }

    /// Payment slip for the given period, if anything is payable
    pub fn payment_for(&self, year: i32, month: u32) -> Result<Option<DarfPayment>, TaxError> {
        if self.payable <= Decimal::ZERO {
            return Ok(None);
        }
        Ok(Some(DarfPayment {
            year,
            month,
            darf_code: DARF_CODE,
            amount: self.payable,
            due_date: calculate_darf_due_date(year, month)?,
        }))
    }
}

/// Sum the regime dues with the deferred balance and apply the minimum-payment rule
///
/// Below `minimum_darf` nothing is payable and the deferred balance is
/// replaced by the whole DARF value (replacement, not addition: the value
/// already contains the balance that came in). At or above the minimum the
/// full value is payable and the balance is left as it was; nothing here
/// resets it.
pub fn assess_darf(
    totals: &PerRegime<RegimeTotals>,
    carried_in: Decimal,
    minimum_darf: Decimal,
) -> DarfAssessment {
    let darf_value = totals.total_due_tax() + carried_in;

    let (payable, carried_out) = if darf_value < minimum_darf {
        (Decimal::ZERO, darf_value)
    } else {
        (darf_value, carried_in)
    };

    DarfAssessment {
        due_tax: totals.map(|t| t.due_tax),
        carried_in,
        darf_value,
        payable,
        carried_out,
    }
}

/// DARF payment information
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DarfPayment {
    pub year: i32,
    pub month: u32,
    pub darf_code: &'static str,
    pub amount: Decimal,
    pub due_date: NaiveDate,
}

/// Calculate DARF due date
/// Tax is due on the last business day of the month following the transaction month
pub fn calculate_darf_due_date(year: i32, month: u32) -> Result<NaiveDate, TaxError> {
    let (due_year, due_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let (next_year, next_month) = if due_month == 12 {
        (due_year + 1, 1)
    } else {
        (due_year, due_month + 1)
    };

    let mut due = NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .ok_or_else(|| TaxError::Parse(format!("invalid period {}/{}", month, year)))?;

    // Weekends only; bank holidays are not tracked
    while matches!(due.weekday(), Weekday::Sat | Weekday::Sun) {
        due = due
            .pred_opt()
            .ok_or_else(|| TaxError::Parse(format!("invalid period {}/{}", month, year)))?;
    }

    Ok(due)
}

/// Format DARF payment for display
pub fn format_darf_payment(payment: &DarfPayment) -> String {
    format!(
        "DARF {code} - Renda Variável ({month:02}/{year})\n  Vencimento: {due_date}\n  Valor: {amount}",
        code = payment.darf_code,
        month = payment.month,
        year = payment.year,
        due_date = payment.due_date.format("%d/%m/%Y"),
        amount = format_currency(payment.amount)
    )
}
