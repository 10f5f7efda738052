// Tax module - day-trade classification, regime processing and DARF aggregation

pub mod classifier;
pub mod darf;
pub mod engine;
pub mod events;
pub mod loss_carryforward;
pub mod processors;
pub mod regime;

pub use classifier::{classify, Classification};
pub use darf::{assess_darf, calculate_darf_due_date, format_darf_payment, DarfAssessment, DarfPayment};
pub use engine::TaxEngine;
pub use events::{RunEvent, RunObserver, TracingObserver};
pub use loss_carryforward::{CarryForward, Settlement};
pub use regime::{PerRegime, RegimeTotals};
