//! End-to-end zero-total checkout against the mock provider and memory stores

use std::sync::Arc;

use rust_decimal_macros::dec;

use checkout_core::memory::{
    FailPoint, MemoryActivityLog, MemoryIdentityStore, MemoryPaymentMethodStore, MemoryPriceSource,
};
use checkout_core::model::GATEWAY_TAG;
use checkout_core::{
    fields, BillingCycle, Cart, CheckoutError, CheckoutForm, ClientId, CustomerIdentity, OrderId,
    PaymentMethodStore, ProductPricing, RemoteCustomerId,
};
use checkout_payments::provider::MockOp;
use checkout_payments::{
    AcceptanceOutcome, HostPorts, MockProvider, ProviderContext, ReferenceCipher, WidgetRequest,
    ZeroCheckout,
};

struct World {
    provider: Arc<MockProvider>,
    methods: Arc<MemoryPaymentMethodStore>,
    activity: Arc<MemoryActivityLog>,
    checkout: ZeroCheckout,
}

fn ports(
    methods: Arc<MemoryPaymentMethodStore>,
    activity: Arc<MemoryActivityLog>,
) -> HostPorts {
    let identities = Arc::new(MemoryIdentityStore::new());
    identities
        .add_customer(CustomerIdentity {
            id: ClientId(1),
            email: "ada@example.com".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
        })
        .unwrap();
    identities.add_order(OrderId(100), ClientId(1)).unwrap();
    identities.add_order(OrderId(101), ClientId(1)).unwrap();
    identities
        .add_customer(CustomerIdentity {
            id: ClientId(2),
            email: "charles@example.com".into(),
            first_name: "Charles".into(),
            last_name: "Babbage".into(),
        })
        .unwrap();
    identities.add_order(OrderId(200), ClientId(2)).unwrap();

    let prices = Arc::new(MemoryPriceSource::new());
    prices.insert(1, "USD", ProductPricing::default());
    prices.insert(
        2,
        "USD",
        ProductPricing {
            monthly: dec!(9.99),
            ..Default::default()
        },
    );

    HostPorts {
        prices,
        identities,
        methods,
        activity,
    }
}

fn world(strict: bool) -> World {
    let provider = Arc::new(MockProvider::new());
    let methods = Arc::new(MemoryPaymentMethodStore::new());
    let activity = Arc::new(MemoryActivityLog::new());
    let context = ProviderContext::new(provider.clone(), ReferenceCipher::ephemeral(), "pk_test_123")
        .with_strict_receipts(strict);
    let checkout = ZeroCheckout::new(
        Some(context),
        ports(methods.clone(), activity.clone()),
        "/static",
    );
    World {
        provider,
        methods,
        activity,
        checkout,
    }
}

fn free_cart() -> WidgetRequest {
    WidgetRequest {
        cart: Cart::new().with_item(1, BillingCycle::Monthly),
        currency: "USD".into(),
        rendered_total: None,
        client_id: Some(ClientId(1)),
    }
}

fn validated_form(pm: &str, customer: &str) -> CheckoutForm {
    CheckoutForm::new()
        .with(fields::VALIDATED_FLAG, "1")
        .with(fields::PAYMENT_METHOD_ID, pm)
        .with(fields::CUSTOMER_ID, customer)
}

#[tokio::test]
async fn zero_total_new_customer_stores_default_card() {
    let w = world(false);

    let html = w.checkout.prepare_widget(&free_cart()).await.unwrap();
    assert!(html.contains(r#"data-client-secret="seti_1_secret_x""#));
    assert!(html.contains(r#"data-customer="cus_1""#));

    let pm = w
        .provider
        .confirm_setup_intent("seti_1_secret_x", "4242424242424242", 12, 2030)
        .unwrap();
    assert_eq!(pm.as_str(), "pm_1");

    let outcome = w
        .checkout
        .accept_order(OrderId(100), &validated_form("pm_1", "cus_1"))
        .await;
    assert_eq!(
        outcome,
        AcceptanceOutcome::Stored {
            customer: RemoteCustomerId::new("cus_1"),
            payment_method: pm.clone(),
            label: "Visa ending in 4242".into(),
        }
    );

    let rows = w.methods.active_methods(ClientId(1), GATEWAY_TAG).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].method.description, "Visa ending in 4242");
    assert_eq!(
        w.provider.default_payment_method(&RemoteCustomerId::new("cus_1")),
        Some(pm)
    );
    assert_eq!(w.activity.matching("Visa ending in 4242").len(), 1);
}

#[tokio::test]
async fn second_checkout_reuses_provider_customer() {
    let w = world(false);
    w.checkout.prepare_widget(&free_cart()).await.unwrap();
    w.provider
        .confirm_setup_intent("seti_1_secret_x", "4242424242424242", 12, 2030)
        .unwrap();
    w.checkout
        .accept_order(OrderId(100), &validated_form("pm_1", "cus_1"))
        .await;

    let html = w.checkout.prepare_widget(&free_cart()).await.unwrap();
    assert!(html.contains(r#"data-customer="cus_1""#));
    assert!(html.contains(r#"data-client-secret="seti_2_secret_x""#));
    assert_eq!(w.provider.customer_count(), 1);
}

#[tokio::test]
async fn loose_payment_method_is_attached_before_storing() {
    let w = world(false);
    let card = checkout_payments::RemoteCard {
        brand: "mastercard".into(),
        last4: "4444".into(),
        exp_month: 3,
        exp_year: 2029,
    };
    let pm = w.provider.add_payment_method(card, None).unwrap();

    let outcome = w
        .checkout
        .accept_order(OrderId(101), &validated_form(pm.as_str(), ""))
        .await;

    assert!(outcome.is_stored());
    assert_eq!(w.provider.calls_of(MockOp::AttachPaymentMethod), 1);
    assert_eq!(
        w.provider.default_payment_method(&RemoteCustomerId::new("cus_1")),
        Some(pm)
    );
}

#[tokio::test]
async fn paid_cart_gets_no_widget() {
    let w = world(false);
    let mut request = free_cart();
    request.cart = request.cart.with_item(2, BillingCycle::Monthly);

    assert!(w.checkout.prepare_widget(&request).await.is_none());
    assert_eq!(w.provider.calls().len(), 0);
}

#[tokio::test]
async fn guest_intents_are_distinct() {
    let w = world(false);
    let form = CheckoutForm::new()
        .with(fields::EMAIL, "guest@example.com")
        .with(fields::FIRST_NAME, "Grace");

    let first = w.checkout.create_guest_intent(&form).await.unwrap();
    let second = w.checkout.create_guest_intent(&form).await.unwrap();

    assert_ne!(first.client_secret, second.client_secret);
    assert_ne!(first.customer, second.customer);

    let missing_email = CheckoutForm::new().with(fields::FIRST_NAME, "Grace");
    assert!(matches!(
        w.checkout.create_guest_intent(&missing_email).await,
        Err(CheckoutError::InvalidRequest(_))
    ));
}

#[tokio::test]
async fn unconfigured_provider_leaves_checkout_alone() {
    let methods = Arc::new(MemoryPaymentMethodStore::new());
    let checkout = ZeroCheckout::new(
        None,
        ports(methods.clone(), Arc::new(MemoryActivityLog::new())),
        "/static",
    );

    assert!(!checkout.is_configured());
    assert!(checkout.prepare_widget(&free_cart()).await.is_none());
    assert!(matches!(
        checkout
            .create_guest_intent(&CheckoutForm::new().with(fields::EMAIL, "a@b.c"))
            .await,
        Err(CheckoutError::NotConfigured)
    ));
    assert_eq!(
        checkout
            .accept_order(OrderId(100), &validated_form("pm_1", "cus_1"))
            .await,
        AcceptanceOutcome::Skipped
    );
    assert_eq!(methods.method_count(), 0);
}

#[tokio::test]
async fn flag_without_order_acceptance_writes_nothing() {
    let w = world(false);
    let form = validated_form("pm_1", "cus_1").with("ccnumber", "4242");

    let cleaned = w.checkout.pre_checkout(form.clone());
    assert!(!cleaned.contains("ccnumber"));
    assert!(w.checkout.validate_card(&form, |_| vec!["bad".into()]).is_empty());

    assert_eq!(w.methods.method_count(), 0);
    assert!(w.provider.calls().is_empty());
}

#[tokio::test]
async fn provider_failure_degrades_acceptance() {
    let w = world(false);
    w.checkout.prepare_widget(&free_cart()).await.unwrap();
    w.provider
        .confirm_setup_intent("seti_1_secret_x", "4242424242424242", 12, 2030)
        .unwrap();
    w.provider.fail_on(MockOp::RetrievePaymentMethod);

    let outcome = w
        .checkout
        .accept_order(OrderId(100), &validated_form("pm_1", "cus_1"))
        .await;
    assert!(matches!(outcome, AcceptanceOutcome::Degraded { .. }));
    assert_eq!(w.methods.method_count(), 0);
}

#[tokio::test]
async fn card_on_another_clients_customer_is_not_stored() {
    let w = world(false);
    let mut other = free_cart();
    other.client_id = Some(ClientId(2));
    w.checkout.prepare_widget(&other).await.unwrap();
    let pm = w
        .provider
        .confirm_setup_intent("seti_1_secret_x", "4111111111111111", 1, 2031)
        .unwrap();

    for claimed in ["cus_1", "cus_attacker_claimed"] {
        let outcome = w
            .checkout
            .accept_order(OrderId(100), &validated_form(pm.as_str(), claimed))
            .await;
        assert!(matches!(outcome, AcceptanceOutcome::Degraded { .. }), "{outcome:?}");
    }

    assert_eq!(w.methods.method_count(), 0);
    assert_eq!(w.provider.default_payment_method(&RemoteCustomerId::new("cus_1")), None);
    assert_eq!(w.provider.calls_of(MockOp::SetDefaultPaymentMethod), 0);
    assert_eq!(w.provider.calls_of(MockOp::AttachPaymentMethod), 0);

    let own = w
        .checkout
        .accept_order(OrderId(200), &validated_form(pm.as_str(), "cus_1"))
        .await;
    assert!(own.is_stored());
    assert_eq!(w.methods.active_methods(ClientId(2), GATEWAY_TAG).unwrap().len(), 1);
}

#[tokio::test]
async fn guest_checkout_card_is_stored_for_new_account() {
    let w = world(false);
    let form = CheckoutForm::new()
        .with(fields::EMAIL, "grace@example.com")
        .with(fields::FIRST_NAME, "Grace");
    let guest = w.checkout.create_guest_intent(&form).await.unwrap();
    let pm = w
        .provider
        .confirm_setup_intent(&guest.client_secret, "5555555555554444", 6, 2030)
        .unwrap();

    let wrong_customer = w
        .checkout
        .accept_order(OrderId(100), &validated_form(pm.as_str(), "cus_999"))
        .await;
    assert!(matches!(wrong_customer, AcceptanceOutcome::Degraded { .. }));
    assert_eq!(w.methods.method_count(), 0);

    let outcome = w
        .checkout
        .accept_order(OrderId(100), &validated_form(pm.as_str(), guest.customer.as_str()))
        .await;
    match outcome {
        AcceptanceOutcome::Stored {
            customer,
            payment_method,
            ..
        } => {
            assert_eq!(customer, guest.customer);
            assert_eq!(payment_method, pm);
        }
        other => panic!("expected stored card, got {other:?}"),
    }

    assert_eq!(w.methods.active_methods(ClientId(1), GATEWAY_TAG).unwrap().len(), 1);
    assert_eq!(w.provider.default_payment_method(&guest.customer), Some(pm));
    assert_eq!(w.provider.calls_of(MockOp::AttachPaymentMethod), 0);
}

#[tokio::test]
async fn persistence_failure_degrades_acceptance() {
    let w = world(false);
    w.checkout.prepare_widget(&free_cart()).await.unwrap();
    let pm = w
        .provider
        .confirm_setup_intent("seti_1_secret_x", "4242424242424242", 12, 2030)
        .unwrap();
    w.methods.fail_next(FailPoint::LinkCard);

    let outcome = w
        .checkout
        .accept_order(OrderId(100), &validated_form(pm.as_str(), "cus_1"))
        .await;

    match outcome {
        AcceptanceOutcome::Degraded { reason } => assert!(reason.contains("persistence"), "{reason}"),
        other => panic!("expected degraded acceptance, got {other:?}"),
    }
    assert_eq!(w.methods.method_count(), 0);
    assert_eq!(w.methods.card_count(), 0);
}

#[tokio::test]
async fn strict_receipts_reject_unconfirmed_claims() {
    let w = world(true);
    w.checkout.prepare_widget(&free_cart()).await.unwrap();
    let card = checkout_payments::RemoteCard {
        brand: "visa".into(),
        last4: "1111".into(),
        exp_month: 1,
        exp_year: 2031,
    };
    let forged = w
        .provider
        .add_payment_method(card, Some(RemoteCustomerId::new("cus_1")))
        .unwrap();

    let no_receipt = w
        .checkout
        .accept_order(OrderId(100), &validated_form(forged.as_str(), "cus_1"))
        .await;
    assert!(matches!(no_receipt, AcceptanceOutcome::Rejected { .. }));

    let wrong_receipt = validated_form(forged.as_str(), "cus_1").with(fields::SETUP_INTENT_ID, "seti_1");
    let outcome = w.checkout.accept_order(OrderId(100), &wrong_receipt).await;
    assert!(matches!(outcome, AcceptanceOutcome::Rejected { .. }));
    assert_eq!(w.methods.method_count(), 0);
    assert_eq!(w.activity.matching("Rejected").len(), 2);

    let pm = w
        .provider
        .confirm_setup_intent("seti_1_secret_x", "4242424242424242", 12, 2030)
        .unwrap();
    let genuine = validated_form(pm.as_str(), "cus_1").with(fields::SETUP_INTENT_ID, "seti_1");
    assert!(w.checkout.accept_order(OrderId(100), &genuine).await.is_stored());
}

#[test]
fn outcome_serializes_with_tag() {
    let json = serde_json::to_value(AcceptanceOutcome::Degraded {
        reason: "x".into(),
    })
    .unwrap();
    assert_eq!(json["outcome"], "degraded");
    assert_eq!(json["reason"], "x");
}
