use rust_decimal::Decimal;
use tracing::{debug, error, info};

use super::loss_carryforward::Settlement;
use super::regime::RegimeTotals;
use crate::error::TaxError;
use crate::models::Category;

/// Progress of a single tax run, reported to the engine's observer
#[derive(Debug, Clone)]
pub enum RunEvent {
    Started {
        transactions: usize,
    },
    Classified {
        fixed_income: usize,
        day_trade_pairs: usize,
        normal: usize,
        merged: usize,
    },
    RegimeSettled {
        category: Category,
        totals: RegimeTotals,
        settlement: Settlement,
    },
    DarfDeferred {
        darf_value: Decimal,
        minimum: Decimal,
    },
    Completed {
        darf_value: Decimal,
        payable: Decimal,
    },
    Failed {
        error: TaxError,
    },
}

/// Receives run events from a [`TaxEngine`](super::engine::TaxEngine)
pub trait RunObserver {
    fn on_event(&mut self, event: &RunEvent);
}

impl<F> RunObserver for F
where
    F: FnMut(&RunEvent),
{
    fn on_event(&mut self, event: &RunEvent) {
        self(event)
    }
}

/// Default observer: forwards every event to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl RunObserver for TracingObserver {
    fn on_event(&mut self, event: &RunEvent) {
        match event {
            RunEvent::Started { transactions } => {
                debug!("Processing {} registered transactions", transactions);
            }
            RunEvent::Classified {
                fixed_income,
                day_trade_pairs,
                normal,
                merged,
            } => {
                debug!(
                    fixed_income,
                    day_trade_pairs, normal, merged, "Transactions classified"
                );
            }
            RunEvent::RegimeSettled {
                category,
                totals,
                settlement,
            } => {
                debug!(
                    regime = category.as_str(),
                    profit = %totals.total_profit,
                    due_tax = %totals.due_tax,
                    "Regime settled: {:?}",
                    settlement
                );
            }
            RunEvent::DarfDeferred { darf_value, minimum } => {
                info!("DARF of {} is below the {} minimum; deferred", darf_value, minimum);
            }
            RunEvent::Completed { darf_value, payable } => {
                info!("DARF calculated: value {}, payable {}", darf_value, payable);
            }
            RunEvent::Failed { error: err } => {
                error!("Error calculating the DARF: {}", err);
            }
        }
    }
}
