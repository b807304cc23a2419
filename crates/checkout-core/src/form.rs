//! Checkout Form Fields
//!
//! The submitted checkout form as a flat field map, plus the validation claim
//! the browser widget smuggles through it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{PaymentMethodRef, RemoteCustomerId};

/// Field names shared by the widget, the gatekeeper and order acceptance
pub mod fields {
    pub const VALIDATED_FLAG: &str = "stripe_zero_order_validated";
    pub const PAYMENT_METHOD_ID: &str = "stripe_payment_method_id";
    pub const CUSTOMER_ID: &str = "stripe_customer_id";
    pub const SETUP_INTENT_ID: &str = "stripe_setup_intent_id";

    pub const FIRST_NAME: &str = "firstname";
    pub const LAST_NAME: &str = "lastname";
    pub const EMAIL: &str = "email";
    pub const PHONE: &str = "phonenumber";
    pub const ADDRESS1: &str = "address1";
    pub const ADDRESS2: &str = "address2";
    pub const CITY: &str = "city";
    pub const STATE: &str = "state";
    pub const POSTCODE: &str = "postcode";
    pub const COUNTRY: &str = "country";

    /// Native payment-method radio selection
    pub const NATIVE_METHOD: &str = "paymentmethod";

    /// Raw card inputs the platform would otherwise collect and validate
    pub const NATIVE_CARD_FIELDS: &[&str] = &[
        "ccinfo",
        "cctype",
        "ccnumber",
        "ccexpirydate",
        "ccstartdate",
        "ccissuenum",
        "cccvv",
        "ccdescription",
    ];
}

/// Element ids shared by the rendered widget and the browser controller
pub mod dom {
    pub const ROOT: &str = "zero-order-card";
    pub const CARD_ELEMENT: &str = "zero-order-card-element";
    pub const ERRORS: &str = "zero-order-card-errors";
    pub const SUCCESS: &str = "zero-order-card-success";
    /// Host checkout form
    pub const CHECKOUT_FORM: &str = "frmCheckout";
    /// Visible order total on the host page
    pub const TOTAL_DUE: &str = "totalDueToday";
}

/// Submitted checkout fields
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckoutForm(BTreeMap<String, String>);

impl CheckoutForm {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: &str) {
        self.0.insert(name.to_string(), value.to_string());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Trimmed value, `None` when absent or blank
    pub fn non_empty(&self, name: &str) -> Option<&str> {
        self.get(name).map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.0.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for CheckoutForm {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<BTreeMap<String, String>> for CheckoutForm {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}

/// Client assertion that the card was verified out-of-band.
///
/// Nothing here is trusted: it is whatever the browser posted. Only order
/// acceptance may act on it, and only after talking to the provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationClaim {
    pub payment_method: PaymentMethodRef,
    pub customer: Option<RemoteCustomerId>,
    pub setup_intent: Option<String>,
}

impl ValidationClaim {
    /// Read the claim; present only when the flag is set and a payment-method id is non-empty
    pub fn from_form(form: &CheckoutForm) -> Option<Self> {
        let flag = form.non_empty(fields::VALIDATED_FLAG)?;
        if matches!(flag.to_lowercase().as_str(), "0" | "false" | "off" | "no") {
            return None;
        }
        let payment_method = PaymentMethodRef::new(form.non_empty(fields::PAYMENT_METHOD_ID)?);

        Some(Self {
            payment_method,
            customer: form.non_empty(fields::CUSTOMER_ID).map(RemoteCustomerId::new),
            setup_intent: form.non_empty(fields::SETUP_INTENT_ID).map(str::to_string),
        })
    }
}
