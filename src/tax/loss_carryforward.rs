use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::regime::{PerRegime, RegimeTotals};

/// State carried from one run to the next
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarryForward {
    /// Losses still available to offset future profit, per regime
    pub accumulated_loss: PerRegime<Decimal>,
    /// Sub-minimum DARF value deferred from earlier runs
    pub accumulated_darf: Decimal,
}

/// How a regime's run profit was settled against its carried loss
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// Profit exceeds the carried loss and tax is due on it
    Taxed { due_tax: Decimal },
    /// Profit exceeds the carried loss but sales stayed within the exemption
    Exempt { total_sale: Decimal },
    /// Profit did not exceed the carried loss; the loss balance absorbed it
    LossCarried { accumulated_loss: Decimal },
}

/// Apply the carry-forward rule to one regime's totals
///
/// When profit beats the carried loss, tax is charged on the full run
/// profit and the loss balance is left alone. Otherwise the run profit is
/// subtracted from the balance: a negative profit grows it, a covered
/// positive profit consumes it.
pub fn settle(
    totals: &mut RegimeTotals,
    accumulated_loss: &mut Decimal,
    rate: Decimal,
    exemption_threshold: Option<Decimal>,
) -> Settlement {
    totals.due_tax = Decimal::ZERO;

    if totals.total_profit - *accumulated_loss > Decimal::ZERO {
        match exemption_threshold {
            Some(threshold) if totals.total_sale <= threshold => Settlement::Exempt {
                total_sale: totals.total_sale,
            },
            _ => {
                totals.due_tax = rate * totals.total_profit;
                Settlement::Taxed {
                    due_tax: totals.due_tax,
                }
            }
        }
    } else {
        *accumulated_loss -= totals.total_profit;
        Settlement::LossCarried {
            accumulated_loss: *accumulated_loss,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn totals(sale: Decimal, profit: Decimal) -> RegimeTotals {
        RegimeTotals {
            total_sale: sale,
            total_profit: profit,
            ..Default::default()
        }
    }

    #[test]
    fn test_profit_above_loss_is_taxed_in_full() {
        let mut t = totals(dec!(5000), dec!(1000));
        let mut loss = dec!(300);
        let settlement = settle(&mut t, &mut loss, dec!(0.20), None);

        assert_eq!(settlement, Settlement::Taxed { due_tax: dec!(200.00) });
        assert_eq!(t.due_tax, dec!(200.00));
        assert_eq!(loss, dec!(300));
    }

    #[test]
    fn test_negative_profit_grows_carried_loss() {
        let mut t = totals(dec!(5000), dec!(-250));
        let mut loss = dec!(100);
        let settlement = settle(&mut t, &mut loss, dec!(0.15), Some(dec!(20000)));

        assert_eq!(settlement, Settlement::LossCarried { accumulated_loss: dec!(350) });
        assert_eq!(t.due_tax, Decimal::ZERO);
    }

    #[test]
    fn test_covered_profit_consumes_carried_loss() {
        let mut t = totals(dec!(30000), dec!(400));
        let mut loss = dec!(1000);
        settle(&mut t, &mut loss, dec!(0.15), Some(dec!(20000)));

        assert_eq!(loss, dec!(600));
        assert_eq!(t.due_tax, Decimal::ZERO);
    }

    #[test]
    fn test_exemption_boundary() {
        let threshold = Some(dec!(20000.00));

        let mut at_limit = totals(dec!(20000.00), dec!(2000));
        let mut loss = Decimal::ZERO;
        let settlement = settle(&mut at_limit, &mut loss, dec!(0.15), threshold);
        assert_eq!(settlement, Settlement::Exempt { total_sale: dec!(20000.00) });
        assert_eq!(at_limit.due_tax, Decimal::ZERO);

        let mut over_limit = totals(dec!(20000.01), dec!(2000));
        settle(&mut over_limit, &mut loss, dec!(0.15), threshold);
        assert_eq!(over_limit.due_tax, dec!(300.00));
        assert_eq!(loss, Decimal::ZERO);
    }
}
