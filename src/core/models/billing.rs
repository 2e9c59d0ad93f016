use serde::{Deserialize, Serialize};

use crate::core::error::MeterError;

/// Currency label attached to every bill. Never converted.
pub const CURRENCY: &str = "AED";

/// Caller-supplied side of a bill.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BillingInput {
    pub previous_reading: f64,
    pub unit_cost: f64,
}

impl BillingInput {
    pub fn new(previous_reading: f64, unit_cost: f64) -> Self {
        Self {
            previous_reading,
            unit_cost,
        }
    }

    /// Reject negative or non-finite values before any network work happens.
    pub fn validate(&self) -> Result<(), MeterError> {
        check_non_negative("previous_reading", self.previous_reading)?;
        check_non_negative("unit_cost", self.unit_cost)?;
        Ok(())
    }
}

fn check_non_negative(name: &str, value: f64) -> Result<(), MeterError> {
    if !value.is_finite() {
        return Err(MeterError::InvalidInput(format!(
            "{} must be a finite number, got {}",
            name, value
        )));
    }
    if value < 0.0 {
        return Err(MeterError::InvalidInput(format!(
            "{} must be >= 0, got {}",
            name, value
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingResult {
    pub current_reading: f64,
    pub previous_reading: f64,
    /// `current_reading - previous_reading`, never negative
    pub consumption: f64,
    pub unit_cost: f64,
    /// `consumption * unit_cost`, unrounded
    pub total_price: f64,
    pub currency: String,
}
