//! Darf - Brazilian B3 capital-gains tax calculator
//!
//! This library classifies buy/sell transactions into fixed-income,
//! day-trade and normal operations, keeps average-cost positions, and
//! computes the DARF due per period with loss carry-forward and the
//! minimum-payment rule.

pub mod config;
pub mod error;
pub mod importers;
pub mod models;
pub mod persistence;
pub mod records;
pub mod tax;
pub mod utils;

pub use error::TaxError;
pub use tax::TaxEngine;
