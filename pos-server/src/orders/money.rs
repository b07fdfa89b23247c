//! Money calculation utilities using rust_decimal for precision
//!
//! All calculations are done using `Decimal` internally, then converted to `f64`
//! for storage/serialization.

use crate::core::{PosError, PosResult};
use rust_decimal::prelude::*;
use shared::models::{MenuItemRef, Order, OrderItem, PaymentLine};

/// Rounding strategy for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Tolerance for monetary comparisons (0.01)
pub const MONEY_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Maximum allowed price per item
const MAX_PRICE: f64 = 1_000_000.0;
/// Maximum allowed quantity per line
pub const MAX_QUANTITY: u32 = 9999;
/// Maximum allowed payment amount
const MAX_PAYMENT_AMOUNT: f64 = 1_000_000.0;

/// Validate that a f64 value is finite (not NaN, not Infinity)
#[inline]
fn require_finite(value: f64, field_name: &str) -> PosResult<()> {
    if !value.is_finite() {
        return Err(PosError::validation(format!(
            "{} must be a finite number, got {}",
            field_name, value
        )));
    }
    Ok(())
}

/// Validate a menu item captured into an order
pub fn validate_menu_item(item: &MenuItemRef) -> PosResult<()> {
    if item.id.trim().is_empty() {
        return Err(PosError::validation("menu item id must not be empty"));
    }
    require_finite(item.unit_price, "unit_price")?;
    if item.unit_price < 0.0 {
        return Err(PosError::validation(format!(
            "unit_price must be non-negative, got {}",
            item.unit_price
        )));
    }
    if item.unit_price > MAX_PRICE {
        return Err(PosError::validation(format!(
            "unit_price exceeds maximum allowed ({}), got {}",
            MAX_PRICE, item.unit_price
        )));
    }
    Ok(())
}

/// Quantity must be positive and within bounds
pub fn validate_quantity(qty: u32) -> PosResult<()> {
    if qty == 0 {
        return Err(PosError::validation("quantity must be positive"));
    }
    if qty > MAX_QUANTITY {
        return Err(PosError::validation(format!(
            "quantity exceeds maximum allowed ({}), got {}",
            MAX_QUANTITY, qty
        )));
    }
    Ok(())
}

/// Validate a payment line before settlement
pub fn validate_payment(payment: &PaymentLine) -> PosResult<()> {
    require_finite(payment.amount, "payment amount")?;
    if payment.amount <= 0.0 {
        return Err(PosError::validation(format!(
            "payment amount must be positive, got {}",
            payment.amount
        )));
    }
    if payment.amount > MAX_PAYMENT_AMOUNT {
        return Err(PosError::validation(format!(
            "payment amount exceeds maximum allowed ({}), got {}",
            MAX_PAYMENT_AMOUNT, payment.amount
        )));
    }
    Ok(())
}

/// Convert f64 to Decimal for calculation
#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Convert Decimal back to f64 for storage, rounded to 2 decimal places
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or_default()
}

/// unit_price × qty
pub fn calculate_line_total(unit_price: f64, qty: u32) -> Decimal {
    to_decimal(unit_price) * Decimal::from(qty)
}

/// Build an order line from a menu item
pub fn build_item(item: &MenuItemRef, qty: u32) -> OrderItem {
    OrderItem {
        menu_item_id: item.id.clone(),
        name: item.name.clone(),
        unit_price: item.unit_price,
        qty,
        line_total: to_f64(calculate_line_total(item.unit_price, qty)),
    }
}

/// Recompute every line total and the order total from `items` alone
///
/// Lines with qty 0 are dropped first. No value from a previous total is
/// reused, so any mutation sequence ends in the same state as building the
/// final items directly.
pub fn recalculate_totals(order: &mut Order) {
    order.items.retain(|item| item.qty > 0);

    let mut total = Decimal::ZERO;
    for item in &mut order.items {
        let line = calculate_line_total(item.unit_price, item.qty);
        item.line_total = to_f64(line);
        total += line;
    }
    order.total = to_f64(total);
}

/// Sum payment amounts with precise arithmetic
pub fn sum_payments(payments: &[PaymentLine]) -> f64 {
    let total: Decimal = payments.iter().map(|p| to_decimal(p.amount)).sum();
    to_f64(total)
}

/// Payments add up to the total within `tolerance` (clamped to 0.01)
pub fn payments_match(total: f64, paid: f64, tolerance: f64) -> bool {
    let tolerance = to_decimal(tolerance).min(MONEY_TOLERANCE);
    (to_decimal(total) - to_decimal(paid)).abs() <= tolerance
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{OrderStatus, PaymentMethod};

    fn menu(id: &str, price: f64) -> MenuItemRef {
        MenuItemRef {
            id: id.to_string(),
            name: id.to_string(),
            unit_price: price,
        }
    }

    fn payment(amount: f64) -> PaymentLine {
        PaymentLine {
            method: PaymentMethod::Cash,
            amount,
            details: None,
        }
    }

    #[test]
    fn test_to_decimal_precision() {
        // Classic floating point problem: 0.1 + 0.2 != 0.3
        let sum_f64 = 0.1_f64 + 0.2_f64;
        assert_ne!(sum_f64, 0.3);

        let sum_dec = to_decimal(0.1) + to_decimal(0.2);
        assert_eq!(to_f64(sum_dec), 0.3);
    }

    #[test]
    fn test_to_decimal_nan_becomes_zero() {
        assert_eq!(to_decimal(f64::NAN), Decimal::ZERO);
        assert_eq!(to_decimal(f64::INFINITY), Decimal::ZERO);
    }

    #[test]
    fn test_build_item_line_total() {
        let item = build_item(&menu("pollo", 30.0), 2);
        assert_eq!(item.line_total, 60.0);

        let item = build_item(&menu("gaseosa", 3.35), 3);
        assert_eq!(item.line_total, 10.05);
    }

    #[test]
    fn test_recalculate_drops_zero_lines_and_ignores_stale_totals() {
        let mut order = Order {
            id: "o1".into(),
            table_id: "t1".into(),
            table_number: 1,
            owner_id: "w1".into(),
            items: vec![build_item(&menu("a", 10.0), 1), build_item(&menu("b", 2.5), 4)],
            total: 999.0,
            status: OrderStatus::Pending,
            created_at: 0,
            updated_at: 0,
        };
        order.items[0].qty = 0;
        order.items[1].line_total = 1.0;

        recalculate_totals(&mut order);
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].line_total, 10.0);
        assert_eq!(order.total, 10.0);
    }

    #[test]
    fn test_payments_match_tolerance() {
        assert!(payments_match(60.0, 60.0, 0.01));
        assert!(payments_match(60.0, 59.99, 0.01));
        assert!(!payments_match(60.0, 59.5, 0.01));
        assert!(!payments_match(60.0, 60.02, 0.01));
        // A configured tolerance never widens past 0.01
        assert!(!payments_match(60.0, 59.5, 1.0));
        assert!(!payments_match(60.0, 59.99, 0.0));
    }

    #[test]
    fn test_sum_payments() {
        let payments = vec![payment(20.1), payment(20.2), payment(19.7)];
        assert_eq!(sum_payments(&payments), 60.0);
    }

    #[test]
    fn test_validate_menu_item() {
        assert!(validate_menu_item(&menu("a", 1.0)).is_ok());
        assert!(validate_menu_item(&menu("a", -1.0)).is_err());
        assert!(validate_menu_item(&menu("a", f64::NAN)).is_err());
        assert!(validate_menu_item(&menu(" ", 1.0)).is_err());
    }

    #[test]
    fn test_validate_quantity_and_payment() {
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(MAX_QUANTITY + 1).is_err());
        assert!(validate_quantity(3).is_ok());

        assert!(validate_payment(&payment(0.0)).is_err());
        assert!(validate_payment(&payment(f64::INFINITY)).is_err());
        assert!(validate_payment(&payment(12.0)).is_ok());
    }
}
