use crate::core::models::billing::CURRENCY;

/// Returns "AED 123.45".
pub fn format_price(amount: f64) -> String {
    format!("{} {:.2}", CURRENCY, amount)
}

/// Shortest representation that still reads as a decimal: 12345 -> "12345.0",
/// 123.45 -> "123.45".
pub fn format_reading(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

/// Two-decimal form used by the numeric input fields.
pub fn format_input(value: f64) -> String {
    format!("{:.2}", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_price_two_decimals() {
        assert_eq!(format_price(50.0), "AED 50.00");
        assert_eq!(format_price(0.0), "AED 0.00");
        assert_eq!(format_price(12.346), "AED 12.35");
    }

    #[test]
    fn format_reading_keeps_one_decimal_for_whole_numbers() {
        assert_eq!(format_reading(12345.0), "12345.0");
        assert_eq!(format_reading(123.45), "123.45");
        assert_eq!(format_reading(0.0), "0.0");
    }

    #[test]
    fn format_input_pads() {
        assert_eq!(format_input(0.1), "0.10");
        assert_eq!(format_input(100.0), "100.00");
    }
}
