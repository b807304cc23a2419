//! Checkout Gatekeeper
//!
//! The two places the host checkout is told to stand aside for a card that
//! was validated in the browser. Both trust the submitted flag only as far
//! as skipping local card handling; nothing is stored from here.

use checkout_core::{fields, CheckoutForm, ValidationClaim};

/// Drop the native payment-method selection and raw card inputs when the
/// form carries a validation claim. Returns whether the claim applied.
pub fn strip_native_payment_fields(form: &mut CheckoutForm) -> bool {
    if ValidationClaim::from_form(form).is_none() {
        return false;
    }

    let mut removed = form.remove(fields::NATIVE_METHOD).is_some();
    for name in fields::NATIVE_CARD_FIELDS {
        removed |= form.remove(name).is_some();
    }
    if removed {
        tracing::debug!("Native payment fields stripped for validated card");
    }
    true
}

/// Card-field errors, short-circuited to none when the form carries a
/// validation claim; otherwise the platform's own rules decide.
pub fn card_validation_errors<F>(form: &CheckoutForm, platform_rules: F) -> Vec<String>
where
    F: FnOnce(&CheckoutForm) -> Vec<String>,
{
    if ValidationClaim::from_form(form).is_some() {
        return Vec::new();
    }
    platform_rules(form)
}

/// Stand-in for the host platform's raw card checks
pub fn native_card_errors(form: &CheckoutForm) -> Vec<String> {
    let mut errors = Vec::new();

    match form.non_empty("ccnumber") {
        None => errors.push("You did not enter your credit card number".to_string()),
        Some(number) if !luhn_valid(number) => {
            errors.push("The credit card number you entered is invalid".to_string());
        }
        Some(_) => {}
    }
    if form.non_empty("ccexpirydate").is_none() {
        errors.push("You did not enter the credit card expiration date".to_string());
    }
    if form.non_empty("cccvv").is_none() {
        errors.push("You did not enter the card security code".to_string());
    }
    errors
}

fn luhn_valid(number: &str) -> bool {
    let digits: Vec<u32> = number
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .map(|c| c.to_digit(10))
        .collect::<Option<_>>()
        .unwrap_or_default();
    if digits.len() < 12 {
        return false;
    }

    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();
    sum % 10 == 0
}
