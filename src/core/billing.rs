use crate::core::error::MeterError;
use crate::core::models::billing::{BillingResult, CURRENCY};

/// Compute consumption and price for one billing interval.
///
/// Fails instead of clamping when the meter appears to have run backwards.
pub fn calculate(
    current_reading: f64,
    previous_reading: f64,
    unit_cost: f64,
) -> Result<BillingResult, MeterError> {
    let consumption = current_reading - previous_reading;
    if consumption < 0.0 {
        return Err(MeterError::NegativeConsumption {
            current: current_reading,
            previous: previous_reading,
        });
    }

    Ok(BillingResult {
        current_reading,
        previous_reading,
        consumption,
        unit_cost,
        total_price: consumption * unit_cost,
        currency: CURRENCY.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn computes_consumption_and_total() {
        let result = calculate(120.0, 100.0, 2.5).unwrap();
        assert!((result.consumption - 20.0).abs() < 1e-10);
        assert!((result.total_price - 50.0).abs() < 1e-10);
        assert_eq!(result.currency, "AED");
        assert_eq!(result.current_reading, 120.0);
        assert_eq!(result.previous_reading, 100.0);
        assert_eq!(result.unit_cost, 2.5);
    }

    #[test]
    fn equal_readings_bill_nothing() {
        let result = calculate(42.5, 42.5, 10.0).unwrap();
        assert_eq!(result.consumption, 0.0);
        assert_eq!(result.total_price, 0.0);
    }

    #[test]
    fn rejects_backwards_meter() {
        let err = calculate(99.9, 100.0, 1.0).unwrap_err();
        assert!(matches!(
            err,
            MeterError::NegativeConsumption { current, previous }
                if current == 99.9 && previous == 100.0
        ));
    }

    #[test]
    fn totals_are_not_rounded() {
        let result = calculate(10.333, 0.0, 3.0).unwrap();
        assert!((result.total_price - 30.999).abs() < 1e-9);
    }

    #[test]
    fn holds_over_a_grid_of_valid_inputs() {
        let previous = [0.0, 0.5, 100.0, 12345.67];
        let deltas = [0.0, 0.1, 1.0, 250.25, 99999.0];
        let costs = [0.0, 0.01, 2.5, 10.0];
        for &p in &previous {
            for &d in &deltas {
                for &c in &costs {
                    let current = p + d;
                    let r = calculate(current, p, c).unwrap();
                    assert!((r.consumption - (current - p)).abs() < 1e-9);
                    assert!((r.total_price - r.consumption * c).abs() < 1e-9);
                    assert!(r.consumption >= 0.0);
                }
            }
        }
    }

    #[test]
    fn any_decrease_fails() {
        for &(current, previous) in &[(0.0, 0.1), (5.0, 6.0), (1000.0, 1000.5)] {
            assert!(calculate(current, previous, 1.0).is_err());
        }
    }
}
