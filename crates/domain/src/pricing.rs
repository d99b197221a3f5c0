//! Order pricing rules.
//!
//! Pure functions over `(unit price, quantity)` pairs. No storage access,
//! no clock, no configuration: the same input always yields the same
//! breakdown.

use common::Money;
use serde::{Deserialize, Serialize};

/// Orders whose item subtotal is strictly above this ship for free.
pub const FREE_SHIPPING_THRESHOLD: Money = Money::from_cents(10_000);

/// Shipping charged when the subtotal does not exceed the threshold.
pub const FLAT_SHIPPING_FEE: Money = Money::from_cents(1_000);

/// Sales tax applied to the item subtotal.
pub const TAX_RATE_PERCENT: i64 = 15;

/// Computed price components of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub items_subtotal: Money,
    pub shipping: Money,
    pub tax: Money,
    pub total: Money,
}

/// An order amount does not fit in the money representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("order amount exceeds the largest supported total")]
pub struct AmountOverflow;

/// Prices an ordered sequence of `(unit price, quantity)` pairs.
pub fn price_lines<I>(lines: I) -> Result<PriceBreakdown, AmountOverflow>
where
    I: IntoIterator<Item = (Money, u32)>,
{
    let items_subtotal = lines
        .into_iter()
        .try_fold(Money::zero(), |acc, (unit_price, quantity)| {
            acc.checked_add(unit_price.checked_multiply(quantity)?)
        })
        .ok_or(AmountOverflow)?;

    let shipping = shipping_for(items_subtotal);
    let tax = items_subtotal.percentage(TAX_RATE_PERCENT);
    let total = items_subtotal
        .checked_add(shipping)
        .and_then(|sum| sum.checked_add(tax))
        .ok_or(AmountOverflow)?;

    Ok(PriceBreakdown {
        items_subtotal,
        shipping,
        tax,
        total,
    })
}

/// Shipping fee for a given item subtotal.
pub fn shipping_for(items_subtotal: Money) -> Money {
    if items_subtotal > FREE_SHIPPING_THRESHOLD {
        Money::zero()
    } else {
        FLAT_SHIPPING_FEE
    }
}
