use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::error::TaxError;
use crate::models::{Category, Position};

/// Average-cost positions keyed by instrument name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionLedger {
    positions: BTreeMap<String, Position>,
}

impl PositionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a position that does not exist yet
    pub fn add(&mut self, position: Position) -> Result<(), TaxError> {
        debug!("Adding a new position: {}", position.name);
        if self.positions.contains_key(&position.name) {
            warn!("Position {} already exists", position.name);
            return Err(TaxError::DuplicateKey(format!("position {}", position.name)));
        }
        self.positions.insert(position.name.clone(), position);
        Ok(())
    }

    /// Overwrite every field of an existing position
    pub fn edit(
        &mut self,
        name: &str,
        average_cost: Decimal,
        category: Category,
        quantity: u64,
        accumulated_fees: Decimal,
    ) -> Result<(), TaxError> {
        debug!("Editing position: {}", name);
        let position = self.positions.get_mut(name).ok_or_else(|| {
            warn!("Position {} does not exist", name);
            TaxError::NotFound(format!("position {}", name))
        })?;
        position.average_cost = average_cost;
        position.category = category;
        position.quantity = quantity;
        position.accumulated_fees = accumulated_fees;
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Result<Position, TaxError> {
        debug!("Removing position: {}", name);
        self.positions
            .remove(name)
            .ok_or_else(|| TaxError::NotFound(format!("position {}", name)))
    }

    pub fn find(&self, name: &str) -> Option<&Position> {
        self.positions.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Drop every position whose quantity is zero, returning how many were removed
    pub fn remove_zero_quantity(&mut self) -> usize {
        let before = self.positions.len();
        self.positions.retain(|_, p| p.quantity > 0);
        before - self.positions.len()
    }

    /// Record a purchase, creating the position or re-averaging its cost
    pub fn upsert_purchase(
        &mut self,
        name: &str,
        unit_price: Decimal,
        category: Category,
        quantity: u64,
        fees: Decimal,
    ) -> Result<(), TaxError> {
        match self.positions.get_mut(name) {
            Some(position) => {
                let new_quantity = position
                    .quantity
                    .checked_add(quantity)
                    .ok_or_else(|| TaxError::Parse(format!("quantity of {} overflows", name)))?;
                if new_quantity > 0 {
                    position.average_cost = (position.average_cost * Decimal::from(position.quantity)
                        + unit_price * Decimal::from(quantity))
                        / Decimal::from(new_quantity);
                }
                position.quantity = new_quantity;
                position.accumulated_fees += fees;
            }
            None => {
                self.positions.insert(
                    name.to_string(),
                    Position::new(name, unit_price, category, quantity, fees),
                );
            }
        }
        Ok(())
    }

    /// Record a sale against the average cost and return the realized profit
    ///
    /// Held fees are released in proportion to the quantity sold and charged
    /// against the profit together with the sale's own fees. The position is
    /// deleted when its quantity reaches zero.
    pub fn apply_sale(
        &mut self,
        name: &str,
        unit_price: Decimal,
        quantity: u64,
        fees: Decimal,
    ) -> Result<Decimal, TaxError> {
        let position = self
            .positions
            .get_mut(name)
            .ok_or_else(|| TaxError::OversoldPosition {
                name: name.to_string(),
                requested: quantity,
                available: 0,
            })?;

        if quantity > position.quantity {
            return Err(TaxError::OversoldPosition {
                name: name.to_string(),
                requested: quantity,
                available: position.quantity,
            });
        }

        let sold = Decimal::from(quantity);
        let released_fees = if position.quantity > 0 {
            position.accumulated_fees / Decimal::from(position.quantity) * sold
        } else {
            Decimal::ZERO
        };
        let profit = unit_price * sold - position.average_cost * sold - released_fees - fees;

        position.quantity -= quantity;
        position.accumulated_fees -= released_fees;

        if position.quantity == 0 {
            debug!("Position {} closed", name);
            self.positions.remove(name);
        }

        Ok(profit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_weighted_average_cost() {
        let mut ledger = PositionLedger::new();
        ledger.upsert_purchase("BBAS3", dec!(10), Category::Normal, 100, dec!(1)).unwrap();
        ledger.upsert_purchase("BBAS3", dec!(20), Category::Normal, 50, dec!(2)).unwrap();

        let position = ledger.find("BBAS3").unwrap();
        let expected = (dec!(10) * dec!(100) + dec!(20) * dec!(50)) / dec!(150);
        assert_eq!(position.average_cost, expected);
        assert_eq!(position.quantity, 150);
        assert_eq!(position.accumulated_fees, dec!(3));
    }

    #[test]
    fn test_full_sale_deletes_position() {
        let mut ledger = PositionLedger::new();
        ledger.upsert_purchase("X", dec!(10.00), Category::Normal, 100, dec!(1.00)).unwrap();

        let profit = ledger.apply_sale("X", dec!(15.00), 100, dec!(1.00)).unwrap();
        assert_eq!(profit, dec!(498.00));
        assert!(ledger.find("X").is_none());
    }

    #[test]
    fn test_partial_sale_releases_proportional_fees() {
        let mut ledger = PositionLedger::new();
        ledger.upsert_purchase("WEGE3", dec!(40), Category::Normal, 200, dec!(10)).unwrap();

        let profit = ledger.apply_sale("WEGE3", dec!(50), 50, dec!(2)).unwrap();
        // 2500 - 2000 - (10 / 200 * 50) - 2
        assert_eq!(profit, dec!(495.5));

        let position = ledger.find("WEGE3").unwrap();
        assert_eq!(position.quantity, 150);
        assert_eq!(position.accumulated_fees, dec!(7.5));
        assert_eq!(position.average_cost, dec!(40));
    }

    #[test]
    fn test_oversell_is_rejected_without_mutation() {
        let mut ledger = PositionLedger::new();
        ledger.upsert_purchase("ABEV3", dec!(12), Category::Normal, 10, dec!(0)).unwrap();
        let before = ledger.clone();

        let err = ledger.apply_sale("ABEV3", dec!(13), 11, dec!(0)).unwrap_err();
        assert!(matches!(
            err,
            TaxError::OversoldPosition { ref name, requested: 11, available: 10 } if name == "ABEV3"
        ));
        assert_eq!(ledger, before);
    }

    #[test]
    fn test_purchase_quantity_overflow_is_rejected() {
        let mut ledger = PositionLedger::new();
        ledger.upsert_purchase("BIG3", dec!(1), Category::Normal, u64::MAX, dec!(0)).unwrap();
        let before = ledger.clone();

        let result = ledger.upsert_purchase("BIG3", dec!(1), Category::Normal, 1, dec!(0));
        assert!(matches!(result, Err(TaxError::Parse(_))));
        assert_eq!(ledger, before);
    }

    #[test]
    fn test_sale_without_position_fails() {
        let mut ledger = PositionLedger::new();
        let result = ledger.apply_sale("GHOST3", dec!(1), 1, dec!(0));
        assert!(matches!(result, Err(TaxError::OversoldPosition { available: 0, .. })));
    }

    #[test]
    fn test_crud_surface() {
        let mut ledger = PositionLedger::new();
        let position = Position::new("MXRF11", dec!(10), Category::FixedIncome, 5, dec!(0));
        ledger.add(position.clone()).unwrap();
        assert!(matches!(ledger.add(position), Err(TaxError::DuplicateKey(_))));

        ledger.edit("MXRF11", dec!(11), Category::FixedIncome, 0, dec!(0)).unwrap();
        assert!(matches!(
            ledger.edit("NOPE11", dec!(1), Category::Normal, 1, dec!(0)),
            Err(TaxError::NotFound(_))
        ));

        assert_eq!(ledger.remove_zero_quantity(), 1);
        assert!(ledger.is_empty());
        assert!(matches!(ledger.remove("MXRF11"), Err(TaxError::NotFound(_))));
    }

    #[test]
    fn test_remove_zero_quantity_keeps_adjacent_entries() {
        let mut ledger = PositionLedger::new();
        for (name, qty) in [("A", 0), ("B", 0), ("C", 3), ("D", 0)] {
            ledger.add(Position::new(name, dec!(1), Category::Normal, qty, dec!(0))).unwrap();
        }
        assert_eq!(ledger.remove_zero_quantity(), 3);
        assert_eq!(ledger.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(), vec!["C"]);
    }
}
