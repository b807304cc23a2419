//! Domain Models
//!
//! Carts, customer identities and the stored payment-method pair.
//! Uses `rust_decimal` for all monetary values.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Gateway tag written on every stored method this system creates
pub const GATEWAY_TAG: &str = "stripe";

/// Method type for provider-held cards
pub const REMOTE_CARD_TYPE: &str = "RemoteCreditCard";

/// Local customer id
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(pub u64);

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Local order id
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub u64);

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Provider-assigned customer id (`cus_...`)
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteCustomerId(String);

impl RemoteCustomerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RemoteCustomerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Provider payment-method id (`pm_...`)
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentMethodRef(String);

impl PaymentMethodRef {
    const PREFIX: &'static str = "pm_";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Parse a decrypted reference, accepting only payment-method ids.
    ///
    /// Older stored cards may hold customer or card ids instead.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        (raw.starts_with(Self::PREFIX) && raw.len() > Self::PREFIX.len()).then(|| Self(raw.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PaymentMethodRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Billing cycle tag on a cart line
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BillingCycle {
    Monthly,
    Quarterly,
    SemiAnnually,
    Annually,
    Biennially,
    Triennially,
    Free,
    /// Anything else; priced as monthly
    Unrecognized(String),
}

impl BillingCycle {
    pub fn parse(tag: &str) -> Self {
        match tag.trim().to_lowercase().replace(['-', ' '], "").as_str() {
            "monthly" => Self::Monthly,
            "quarterly" => Self::Quarterly,
            "semiannually" => Self::SemiAnnually,
            "annually" => Self::Annually,
            "biennially" => Self::Biennially,
            "triennially" => Self::Triennially,
            "free" | "freeaccount" => Self::Free,
            _ => Self::Unrecognized(tag.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::SemiAnnually => "semiannually",
            Self::Annually => "annually",
            Self::Biennially => "biennially",
            Self::Triennially => "triennially",
            Self::Free => "free",
            Self::Unrecognized(tag) => tag,
        }
    }
}

impl From<String> for BillingCycle {
    fn from(tag: String) -> Self {
        Self::parse(&tag)
    }
}

impl From<BillingCycle> for String {
    fn from(cycle: BillingCycle) -> Self {
        cycle.as_str().to_string()
    }
}

/// A single cart line
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: u64,
    pub billing_cycle: BillingCycle,
}

impl LineItem {
    pub fn new(product_id: u64, billing_cycle: BillingCycle) -> Self {
        Self {
            product_id,
            billing_cycle,
        }
    }
}

/// In-progress cart, passed explicitly instead of read from the session
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub items: Vec<LineItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_item(mut self, product_id: u64, billing_cycle: BillingCycle) -> Self {
        self.items.push(LineItem::new(product_id, billing_cycle));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Per-cycle prices for one product in one currency
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPricing {
    #[serde(default)]
    pub monthly: Decimal,
    #[serde(default)]
    pub quarterly: Decimal,
    #[serde(default)]
    pub semiannually: Decimal,
    #[serde(default)]
    pub annually: Decimal,
    #[serde(default)]
    pub biennially: Decimal,
    #[serde(default)]
    pub triennially: Decimal,
    /// One-time setup fee
    #[serde(default)]
    pub setup_fee: Decimal,
}

impl ProductPricing {
    /// Recurring price for a cycle
    pub fn price_for(&self, cycle: &BillingCycle) -> Decimal {
        match cycle {
            BillingCycle::Monthly | BillingCycle::Unrecognized(_) => self.monthly,
            BillingCycle::Quarterly => self.quarterly,
            BillingCycle::SemiAnnually => self.semiannually,
            BillingCycle::Annually => self.annually,
            BillingCycle::Biennially => self.biennially,
            BillingCycle::Triennially => self.triennially,
            BillingCycle::Free => Decimal::ZERO,
        }
    }
}

/// Local customer identity
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerIdentity {
    pub id: ClientId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl CustomerIdentity {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Id of a stored payment-method row
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MethodId(pub u64);

/// Id of a stored card-detail row
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(pub u64);

/// Payment-method descriptor row
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredPaymentMethod {
    pub id: MethodId,
    pub client_id: ClientId,
    pub method_type: String,
    pub gateway: String,
    pub description: String,
    pub order_preference: u32,
    pub card_id: CardId,
    pub created_at: DateTime<Utc>,
    /// Soft-delete marker, set by the host platform
    pub deleted_at: Option<DateTime<Utc>>,
}

impl StoredPaymentMethod {
    pub const fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

/// Card-detail row
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardDetail {
    pub id: CardId,
    /// Back-reference filled once the method row exists
    pub method_id: Option<MethodId>,
    pub brand: String,
    pub last_four: String,
    pub expiry_date: NaiveDate,
    /// Encrypted provider payment-method id
    pub remote_ref: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A method row joined with its card row
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SavedCard {
    pub method: StoredPaymentMethod,
    pub card: CardDetail,
}

/// Card row to insert
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewCardDetail {
    pub brand: String,
    pub last_four: String,
    pub expiry_date: NaiveDate,
    pub remote_ref: String,
}

/// Method row to insert
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewPaymentMethod {
    pub client_id: ClientId,
    pub method_type: String,
    pub gateway: String,
    pub description: String,
    pub order_preference: u32,
    pub card_id: CardId,
}

/// Title-case a provider brand tag (`visa` → `Visa`, `american_express` → `American Express`)
pub fn title_case_brand(brand: &str) -> String {
    brand
        .split(['_', ' ', '-'])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Display label for a stored card
pub fn card_label(brand: &str, last_four: &str) -> String {
    format!("{} ending in {last_four}", title_case_brand(brand))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_billing_cycle_parsing() {
        assert_eq!(BillingCycle::parse("Monthly"), BillingCycle::Monthly);
        assert_eq!(BillingCycle::parse("Semi-Annually"), BillingCycle::SemiAnnually);
        assert_eq!(BillingCycle::parse("free"), BillingCycle::Free);
        assert_eq!(
            BillingCycle::parse("onetime"),
            BillingCycle::Unrecognized("onetime".into())
        );
    }

    #[test]
    fn test_unrecognized_cycle_uses_monthly_price() {
        let pricing = ProductPricing {
            monthly: dec!(5),
            annually: dec!(50),
            ..Default::default()
        };
        assert_eq!(pricing.price_for(&BillingCycle::parse("onetime")), dec!(5));
        assert_eq!(pricing.price_for(&BillingCycle::Annually), dec!(50));
        assert_eq!(pricing.price_for(&BillingCycle::Free), Decimal::ZERO);
    }

    #[test]
    fn test_payment_method_ref_prefix() {
        assert!(PaymentMethodRef::parse("pm_123").is_some());
        assert!(PaymentMethodRef::parse("cus_123").is_none());
        assert!(PaymentMethodRef::parse("pm_").is_none());
    }

    #[test]
    fn test_card_label() {
        assert_eq!(card_label("visa", "4242"), "Visa ending in 4242");
        assert_eq!(card_label("american_express", "0005"), "American Express ending in 0005");
    }
}
