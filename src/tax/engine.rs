//! Tax engine: owns the records and the carry-forward state and runs
//! classification, the three regime processors and the DARF aggregator as
//! one atomic computation.

use rust_decimal::Decimal;
use tracing::info_span;

use super::classifier::{classify, Classification};
use super::darf::{assess_darf, DarfAssessment};
use super::events::{RunEvent, RunObserver, TracingObserver};
use super::loss_carryforward::CarryForward;
use super::processors::{process_day_trades, process_position_regime, RegimeOutcome};
use super::regime::{PerRegime, RegimeTotals};
use crate::config::TaxRules;
use crate::error::TaxError;
use crate::models::Category;
use crate::persistence::EngineSnapshot;
use crate::records::{PositionLedger, TransactionStore};

pub struct TaxEngine {
    positions: PositionLedger,
    transactions: TransactionStore,
    rules: TaxRules,
    totals: PerRegime<RegimeTotals>,
    carry: CarryForward,
    assessment: Option<DarfAssessment>,
    observer: Box<dyn RunObserver>,
}

impl TaxEngine {
    pub fn new(rules: TaxRules) -> Self {
        Self::with_observer(rules, TracingObserver)
    }

    pub fn with_observer(rules: TaxRules, observer: impl RunObserver + 'static) -> Self {
        Self {
            positions: PositionLedger::new(),
            transactions: TransactionStore::new(),
            rules,
            totals: PerRegime::default(),
            carry: CarryForward::default(),
            assessment: None,
            observer: Box::new(observer),
        }
    }

    pub fn rules(&self) -> &TaxRules {
        &self.rules
    }

    pub fn positions(&self) -> &PositionLedger {
        &self.positions
    }

    pub fn positions_mut(&mut self) -> &mut PositionLedger {
        &mut self.positions
    }

    pub fn transactions(&self) -> &TransactionStore {
        &self.transactions
    }

    pub fn transactions_mut(&mut self) -> &mut TransactionStore {
        &mut self.transactions
    }

    /// Compute the DARF for the current transaction set
    ///
    /// Either every effect of the run (positions, totals, carry-forward) is
    /// committed, or on error none is and the engine is left as it was.
    pub fn calculate_darf(&mut self) -> Result<DarfAssessment, TaxError> {
        let _span = info_span!("darf_run", transactions = self.transactions.len()).entered();
        self.observer.on_event(&RunEvent::Started {
            transactions: self.transactions.len(),
        });

        let classification = classify(self.transactions.as_slice()).map_err(|e| self.fail(e))?;
        self.observer.on_event(&RunEvent::Classified {
            fixed_income: classification.fixed_income.len(),
            day_trade_pairs: classification.day_trade_pairs(),
            normal: classification.normal.len(),
            merged: classification.tombstones.len(),
        });

        let mut positions = self.positions.clone();
        let mut carry = self.carry.clone();

        let outcomes = self
            .run_processors(&classification, &mut positions, &mut carry)
            .map_err(|e| self.fail(e))?;

        for (category, outcome) in outcomes.iter() {
            self.observer.on_event(&RunEvent::RegimeSettled {
                category,
                totals: outcome.totals,
                settlement: outcome.settlement,
            });
        }

        let totals = outcomes.map(|o| o.totals);
        let assessment = assess_darf(&totals, carry.accumulated_darf, self.rules.minimum_darf);
        carry.accumulated_darf = assessment.carried_out;

        if assessment.is_deferred() {
            self.observer.on_event(&RunEvent::DarfDeferred {
                darf_value: assessment.darf_value,
                minimum: self.rules.minimum_darf,
            });
        }
        self.observer.on_event(&RunEvent::Completed {
            darf_value: assessment.darf_value,
            payable: assessment.payable,
        });

        self.positions = positions;
        self.carry = carry;
        self.totals = totals;
        self.assessment = Some(assessment);

        Ok(assessment)
    }

    /// Report a failed run to the observer and hand the error back
    fn fail(&mut self, error: TaxError) -> TaxError {
        self.observer.on_event(&RunEvent::Failed {
            error: error.clone(),
        });
        error
    }

    fn run_processors(
        &self,
        classification: &Classification,
        positions: &mut PositionLedger,
        carry: &mut CarryForward,
    ) -> Result<PerRegime<RegimeOutcome>, TaxError> {
        let fixed_income = process_position_regime(
            Category::FixedIncome,
            &classification.fixed_income,
            positions,
            &self.rules,
            &mut carry.accumulated_loss.fixed_income,
        )?;
        let day_trade = process_day_trades(
            &classification.day_trade,
            &self.rules,
            &mut carry.accumulated_loss.day_trade,
        )?;
        let normal = process_position_regime(
            Category::Normal,
            &classification.normal,
            positions,
            &self.rules,
            &mut carry.accumulated_loss.normal,
        )?;
        Ok(PerRegime::new(fixed_income, day_trade, normal))
    }

    pub fn totals(&self) -> &PerRegime<RegimeTotals> {
        &self.totals
    }

    pub fn total_purchase(&self, category: Category) -> Decimal {
        self.totals[category].total_purchase
    }

    pub fn total_sale(&self, category: Category) -> Decimal {
        self.totals[category].total_sale
    }

    pub fn total_profit(&self, category: Category) -> Decimal {
        self.totals[category].total_profit
    }

    pub fn total_due_tax(&self, category: Category) -> Decimal {
        self.totals[category].due_tax
    }

    /// DARF value of the last successful run, including any deferred balance
    pub fn darf_value(&self) -> Decimal {
        self.assessment.map_or(Decimal::ZERO, |a| a.darf_value)
    }

    /// Amount payable from the last successful run (zero when deferred)
    pub fn payable_darf(&self) -> Decimal {
        self.assessment.map_or(Decimal::ZERO, |a| a.payable)
    }

    pub fn last_assessment(&self) -> Option<&DarfAssessment> {
        self.assessment.as_ref()
    }

    pub fn accumulated_loss(&self, category: Category) -> Decimal {
        self.carry.accumulated_loss[category]
    }

    pub fn accumulated_darf(&self) -> Decimal {
        self.carry.accumulated_darf
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            positions: self.positions.clone(),
            carry: self.carry.clone(),
        }
    }

    /// Replace positions and carry-forward state with a saved snapshot
    pub fn restore(&mut self, snapshot: EngineSnapshot) {
        self.positions = snapshot.positions;
        self.carry = snapshot.carry;
    }
}

impl Default for TaxEngine {
    fn default() -> Self {
        Self::new(TaxRules::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OperationType, Transaction};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn add(engine: &mut TaxEngine, id: u64, name: &str, op: OperationType, qty: u64, price: Decimal, day: u32) {
        let tx = Transaction::new(
            name,
            price,
            Category::Normal,
            qty,
            Decimal::ZERO,
            NaiveDate::from_ymd_opt(2024, 4, day).unwrap(),
            op,
            id,
        );
        engine.transactions_mut().add(tx).unwrap();
    }

    #[test]
    fn test_observer_sees_run_lifecycle() {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        let mut engine = TaxEngine::with_observer(TaxRules::default(), move |e: &RunEvent| {
            sink.borrow_mut().push(e.clone())
        });
        add(&mut engine, 1, "PETR4", OperationType::Purchase, 10, dec!(30), 1);

        engine.calculate_darf().unwrap();

        let events = events.borrow();
        assert!(matches!(events.first(), Some(RunEvent::Started { transactions: 1 })));
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, RunEvent::RegimeSettled { .. }))
                .count(),
            3
        );
        assert!(matches!(events.last(), Some(RunEvent::Completed { .. })));
    }

    #[test]
    fn test_failed_run_reports_and_commits_nothing() {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        let mut engine = TaxEngine::with_observer(TaxRules::default(), move |e: &RunEvent| {
            sink.borrow_mut().push(e.clone())
        });
        add(&mut engine, 1, "PETR4", OperationType::Purchase, 10, dec!(30), 1);
        add(&mut engine, 2, "PETR4", OperationType::Sale, 20, dec!(31), 2);

        let err = engine.calculate_darf().unwrap_err();
        assert!(matches!(err, TaxError::OversoldPosition { .. }));
        assert!(engine.positions().is_empty());
        assert!(engine.last_assessment().is_none());
        assert!(matches!(events.borrow().last(), Some(RunEvent::Failed { .. })));
    }

    #[test]
    fn test_snapshot_round_trip_through_restore() {
        let mut engine = TaxEngine::default();
        add(&mut engine, 1, "ITSA4", OperationType::Purchase, 100, dec!(10), 1);
        add(&mut engine, 2, "ITSA4", OperationType::Sale, 100, dec!(8), 2);
        engine.calculate_darf().unwrap();
        assert_eq!(engine.accumulated_loss(Category::Normal), dec!(200));

        let mut fresh = TaxEngine::default();
        fresh.restore(engine.snapshot());
        assert_eq!(fresh.accumulated_loss(Category::Normal), dec!(200));
        assert_eq!(fresh.snapshot(), engine.snapshot());
    }
}
