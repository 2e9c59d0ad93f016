use colored::{control, Colorize};

use crate::core::formatter::{format_price, format_reading};
use crate::core::models::billing::BillingResult;

/// Render a bill as a colored (or plain) block.
///
/// Layout:
/// ```text
///  Meter Bill
///   Current Meter Reading:   12345.0
///   Previous Meter Reading:  12000.0
///   Consumption (Units):     345.0
///   Total Price:             AED 862.50
/// ```
pub fn render_bill(result: &BillingResult, use_color: bool) -> String {
    control::set_override(use_color);

    let rows = [
        ("Current Meter Reading:", format_reading(result.current_reading).green()),
        ("Previous Meter Reading:", format_reading(result.previous_reading).cyan()),
        ("Consumption (Units):", format_reading(result.consumption).green()),
        ("Total Price:", format_price(result.total_price).green().bold()),
    ];

    let mut lines = vec![" Meter Bill".bold().to_string()];
    for (label, value) in rows {
        lines.push(format!("  {:<24} {}", label, value));
    }
    lines.join("\n")
}

/// One-line error in the same style as the bill.
pub fn render_error(message: &str, use_color: bool) -> String {
    control::set_override(use_color);
    format!("  {}", message.red())
}
