use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

use crate::models::Category;

/// One value per tax regime, indexed by [`Category`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerRegime<T> {
    pub fixed_income: T,
    pub day_trade: T,
    pub normal: T,
}

impl<T> PerRegime<T> {
    pub fn new(fixed_income: T, day_trade: T, normal: T) -> Self {
        Self {
            fixed_income,
            day_trade,
            normal,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, &T)> {
        [
            (Category::FixedIncome, &self.fixed_income),
            (Category::DayTrade, &self.day_trade),
            (Category::Normal, &self.normal),
        ]
        .into_iter()
    }

    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> PerRegime<U> {
        PerRegime {
            fixed_income: f(&self.fixed_income),
            day_trade: f(&self.day_trade),
            normal: f(&self.normal),
        }
    }
}

impl<T> Index<Category> for PerRegime<T> {
    type Output = T;

    fn index(&self, category: Category) -> &T {
        match category {
            Category::FixedIncome => &self.fixed_income,
            Category::DayTrade => &self.day_trade,
            Category::Normal => &self.normal,
        }
    }
}

impl<T> IndexMut<Category> for PerRegime<T> {
    fn index_mut(&mut self, category: Category) -> &mut T {
        match category {
            Category::FixedIncome => &mut self.fixed_income,
            Category::DayTrade => &mut self.day_trade,
            Category::Normal => &mut self.normal,
        }
    }
}

/// Purchase, sale, profit and tax totals of one regime for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegimeTotals {
    pub total_purchase: Decimal,
    pub total_sale: Decimal,
    pub total_profit: Decimal,
    pub due_tax: Decimal,
}

impl PerRegime<RegimeTotals> {
    /// Sum of the due tax across all regimes
    pub fn total_due_tax(&self) -> Decimal {
        self.iter().map(|(_, t)| t.due_tax).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_index_by_category() {
        let mut losses: PerRegime<Decimal> = PerRegime::default();
        losses[Category::DayTrade] += dec!(12.5);
        assert_eq!(losses.day_trade, dec!(12.5));
        assert_eq!(losses[Category::Normal], Decimal::ZERO);
    }

    #[test]
    fn test_total_due_tax() {
        let totals = PerRegime::new(
            RegimeTotals { due_tax: dec!(1), ..Default::default() },
            RegimeTotals { due_tax: dec!(2.5), ..Default::default() },
            RegimeTotals { due_tax: dec!(0.49), ..Default::default() },
        );
        assert_eq!(totals.total_due_tax(), dec!(3.99));
        assert_eq!(totals.iter().map(|(c, _)| c).collect::<Vec<_>>(), Category::ALL.to_vec());
    }
}
