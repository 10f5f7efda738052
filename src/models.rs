use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Tax regime a transaction or position belongs to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Category {
    FixedIncome, // Fixed-income-like instruments (FII and similar)
    DayTrade,    // Same-day purchase + sale of one instrument
    Normal,      // Ordinary multi-day trades (swing trade)
}

impl Category {
    pub const ALL: [Category; 3] = [Category::FixedIncome, Category::DayTrade, Category::Normal];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::FixedIncome => "FIXED_INCOME",
            Category::DayTrade => "DAY_TRADE",
            Category::Normal => "NORMAL",
        }
    }

    /// Portuguese label used in reports
    pub fn label(&self) -> &'static str {
        match self {
            Category::FixedIncome => "Renda Fixa / FII",
            Category::DayTrade => "Day Trade",
            Category::Normal => "Operações Comuns",
        }
    }
}

impl FromStr for Category {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FIXED_INCOME" | "FI" | "FII" | "RENDA_FIXA" => Ok(Category::FixedIncome),
            "DAY_TRADE" | "DAYTRADE" | "DT" => Ok(Category::DayTrade),
            "NORMAL" | "SWING" | "SWING_TRADE" | "" => Ok(Category::Normal),
            _ => Err(()),
        }
    }
}

/// Operation type (purchase or sale)
///
/// Ordering matters: within a day every purchase sorts before every sale.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OperationType {
    Purchase,
    Sale,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Purchase => "PURCHASE",
            OperationType::Sale => "SALE",
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            OperationType::Purchase => OperationType::Sale,
            OperationType::Sale => OperationType::Purchase,
        }
    }
}

impl FromStr for OperationType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PURCHASE" | "BUY" | "COMPRA" | "C" => Ok(OperationType::Purchase),
            "SALE" | "SELL" | "VENDA" | "V" => Ok(OperationType::Sale),
            _ => Err(()),
        }
    }
}

/// A submitted buy or sell of an instrument
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transaction {
    pub instrument_name: String,
    pub unit_price: Decimal,
    pub category: Category,
    pub quantity: u64, // 0 once fully consumed by classification
    pub fees_paid: Decimal,
    pub operation_date: NaiveDate,
    pub operation_type: OperationType,
    pub operation_id: u64,
}

impl Transaction {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        instrument_name: impl Into<String>,
        unit_price: Decimal,
        category: Category,
        quantity: u64,
        fees_paid: Decimal,
        operation_date: NaiveDate,
        operation_type: OperationType,
        operation_id: u64,
    ) -> Self {
        Self {
            instrument_name: instrument_name.into(),
            unit_price,
            category,
            quantity,
            fees_paid,
            operation_date,
            operation_type,
            operation_id,
        }
    }

    /// Price times quantity, excluding fees
    pub fn gross_amount(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }

    pub fn is_consumed(&self) -> bool {
        self.quantity == 0
    }

    /// Composite classification order: date first, then purchase before sale
    pub fn sort_key(&self) -> (NaiveDate, OperationType) {
        (self.operation_date, self.operation_type)
    }
}

/// Held quantity of one instrument at weighted-average cost
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Position {
    pub name: String,
    pub average_cost: Decimal,
    pub category: Category,
    pub quantity: u64,
    pub accumulated_fees: Decimal, // fees attributable to the held quantity
}

impl Position {
    pub fn new(
        name: impl Into<String>,
        average_cost: Decimal,
        category: Category,
        quantity: u64,
        accumulated_fees: Decimal,
    ) -> Self {
        Self {
            name: name.into(),
            average_cost,
            category,
            quantity,
            accumulated_fees,
        }
    }

    /// Cost basis of the whole position, excluding fees
    pub fn total_cost(&self) -> Decimal {
        self.average_cost * Decimal::from(self.quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_purchase_sorts_before_sale() {
        assert!(OperationType::Purchase < OperationType::Sale);

        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let sale = Transaction::new("PETR4", dec!(30), Category::Normal, 10, dec!(0), date, OperationType::Sale, 1);
        let buy = Transaction::new("PETR4", dec!(29), Category::Normal, 10, dec!(0), date, OperationType::Purchase, 2);
        assert!(buy.sort_key() < sale.sort_key());
    }

    #[test]
    fn test_category_parsing() {
        assert_eq!(Category::from_str("fi"), Ok(Category::FixedIncome));
        assert_eq!(Category::from_str("day_trade"), Ok(Category::DayTrade));
        assert_eq!(Category::from_str(" normal "), Ok(Category::Normal));
        assert!(Category::from_str("crypto").is_err());
    }

    #[test]
    fn test_operation_type_parsing() {
        assert_eq!(OperationType::from_str("compra"), Ok(OperationType::Purchase));
        assert_eq!(OperationType::from_str("V"), Ok(OperationType::Sale));
        assert_eq!(OperationType::Sale.opposite(), OperationType::Purchase);
    }

    #[test]
    fn test_gross_amount() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let tx = Transaction::new("ITSA4", dec!(9.87), Category::Normal, 300, dec!(1.5), date, OperationType::Purchase, 7);
        assert_eq!(tx.gross_amount(), dec!(2961.00));
    }
}
