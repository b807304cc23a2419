//! Zero-Total Detection
//!
//! Decides whether a cart costs nothing, which is what switches the whole
//! card-validation flow on.

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::model::Cart;
use crate::ports::PriceSource;

/// Price evaluator over an external price table
pub struct PriceEvaluator {
    prices: Arc<dyn PriceSource>,
}

impl PriceEvaluator {
    pub fn new(prices: Arc<dyn PriceSource>) -> Self {
        Self { prices }
    }

    /// Whether the payable total is zero or less.
    ///
    /// A pre-computed total from the rendering context wins when it parses;
    /// recomputing from the price table is the fallback.
    pub fn is_zero_total(&self, cart: &Cart, currency: &str, rendered_total: Option<&str>) -> bool {
        if let Some(total) = rendered_total.and_then(parse_formatted_total) {
            return total <= Decimal::ZERO;
        }

        self.cart_total(cart, currency)
            .is_some_and(|total| total <= Decimal::ZERO)
    }

    /// Recurring prices plus positive setup fees.
    ///
    /// `None` when any product lacks a price row or the lookup fails, so an
    /// unpriceable cart is never mistaken for a free one.
    pub fn cart_total(&self, cart: &Cart, currency: &str) -> Option<Decimal> {
        let mut total = Decimal::ZERO;
        let mut setup_fees = Decimal::ZERO;

        for item in &cart.items {
            let pricing = match self.prices.pricing(item.product_id, currency) {
                Ok(Some(pricing)) => pricing,
                Ok(None) => {
                    tracing::debug!(product_id = item.product_id, currency, "No pricing row");
                    return None;
                }
                Err(e) => {
                    tracing::warn!(product_id = item.product_id, error = %e, "Price lookup failed");
                    return None;
                }
            };

            total += pricing.price_for(&item.billing_cycle);
            if pricing.setup_fee > Decimal::ZERO {
                setup_fees += pricing.setup_fee;
            }
        }

        Some(total + setup_fees)
    }
}

/// Whether a page's visible total text reads as zero or less.
///
/// Missing or unparseable text is not zero.
pub fn displays_zero_total(rendered: Option<&str>) -> bool {
    rendered
        .and_then(parse_formatted_total)
        .is_some_and(|total| total <= Decimal::ZERO)
}

/// Parse a display total such as `$0.00 USD` or `1.234,50 €`
pub fn parse_formatted_total(formatted: &str) -> Option<Decimal> {
    let negative = formatted.contains('-');
    let kept: String = formatted
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    if !kept.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let normalized = match (kept.rfind('.'), kept.rfind(',')) {
        // Whichever separator comes last is the decimal point
        (Some(dot), Some(comma)) if comma > dot => kept.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => kept.replace(',', ""),
        (None, Some(comma)) if kept.len() - comma - 1 == 2 => kept.replace(',', "."),
        (None, Some(_)) => kept.replace(',', ""),
        _ => kept,
    };

    let value: Decimal = normalized.parse().ok()?;
    Some(if negative { -value } else { value })
}
