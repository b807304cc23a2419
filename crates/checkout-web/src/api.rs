//! Provider Adapters
//!
//! Setup-intent requests to the checkout server, card confirmation through
//! Stripe.js and the script host used while Stripe.js loads.

use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use futures::channel::oneshot;
use gloo_timers::future::TimeoutFuture;
use serde::Deserialize;
use wasm_bindgen::{prelude::Closure, JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

use checkout_core::{
    fields, BillingDetails, CardConfirmer, ConfirmedSetup, IntentGrant, IntentSource,
    PaymentMethodRef, RemoteCustomerId, ScriptHost,
};

use crate::stripe::{get_path_str, js_message, js_object, stripe_loaded, StripeCard};

/// Stripe.js location
const STRIPE_JS_URL: &str = "https://js.stripe.com/v3/";

/// Path of the server's auxiliary checkout endpoint
pub const AJAX_PATH: &str = "/checkout/ajax";

#[derive(Debug, Deserialize)]
struct AjaxReply {
    #[serde(default)]
    success: bool,
    client_secret: Option<String>,
    stripe_customer_id: Option<String>,
    error: Option<String>,
}

/// Requests guest setup intents from the checkout server
pub struct AjaxIntentSource {
    endpoint: String,
}

impl AjaxIntentSource {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }

    /// Endpoint on the page's own origin
    pub fn same_origin() -> Self {
        let origin = web_sys::window()
            .and_then(|w| w.location().origin().ok())
            .unwrap_or_default();
        Self::new(format!("{origin}{AJAX_PATH}"))
    }
}

#[async_trait(?Send)]
impl IntentSource for AjaxIntentSource {
    async fn request_intent(&self, billing: &BillingDetails) -> Result<IntentGrant, String> {
        let mut form = vec![
            ("action", "create_setup_intent".to_string()),
            (fields::FIRST_NAME, billing.first_name.clone()),
            (fields::LAST_NAME, billing.last_name.clone()),
            (fields::EMAIL, billing.email.clone()),
        ];
        if let Some(phone) = &billing.phone {
            form.push((fields::PHONE, phone.clone()));
        }

        let response = reqwest::Client::new()
            .post(&self.endpoint)
            .form(&form)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        let reply: AjaxReply = response.json().await.map_err(|e| e.to_string())?;

        match reply {
            AjaxReply {
                success: true,
                client_secret: Some(client_secret),
                stripe_customer_id: Some(customer),
                ..
            } => Ok(IntentGrant {
                client_secret,
                customer: RemoteCustomerId::new(customer),
            }),
            AjaxReply { error, .. } => Err(error.unwrap_or_else(|| "Request failed".into())),
        }
    }
}

/// Confirms setup intents against the mounted card element
pub struct StripeConfirmer {
    card: Rc<StripeCard>,
}

impl StripeConfirmer {
    pub fn new(card: Rc<StripeCard>) -> Self {
        Self { card }
    }
}

fn billing_object(billing: &BillingDetails) -> JsValue {
    let text = |v: &Option<String>| v.as_deref().map(JsValue::from_str);
    let address = &billing.address;
    let (line1, line2, city, state, postal_code, country) = (
        text(&address.line1),
        text(&address.line2),
        text(&address.city),
        text(&address.state),
        text(&address.postal_code),
        text(&address.country),
    );
    let address = js_object(&[
        ("line1", line1.as_ref()),
        ("line2", line2.as_ref()),
        ("city", city.as_ref()),
        ("state", state.as_ref()),
        ("postal_code", postal_code.as_ref()),
        ("country", country.as_ref()),
    ]);

    let name = JsValue::from_str(&billing.name());
    let email = (!billing.email.is_empty()).then(|| JsValue::from_str(&billing.email));
    let phone = text(&billing.phone);
    js_object(&[
        ("name", Some(&name)),
        ("email", email.as_ref()),
        ("phone", phone.as_ref()),
        ("address", Some(&address)),
    ])
}

#[async_trait(?Send)]
impl CardConfirmer for StripeConfirmer {
    async fn confirm_card_setup(
        &self,
        client_secret: &str,
        billing: &BillingDetails,
    ) -> Result<ConfirmedSetup, String> {
        let card: &JsValue = self.card.card.as_ref();
        let billing_details = billing_object(billing);
        let payment_method = js_object(&[
            ("card", Some(card)),
            ("billing_details", Some(&billing_details)),
        ]);
        let data = js_object(&[("payment_method", Some(&payment_method))]);

        let promise = self
            .card
            .stripe
            .confirm_card_setup(client_secret, &data)
            .map_err(js_message)?;
        let result = JsFuture::from(promise).await.map_err(js_message)?;

        if let Some(message) = get_path_str(&result, &["error", "message"]) {
            return Err(message);
        }
        let payment_method = get_path_str(&result, &["setupIntent", "payment_method"])
            .ok_or_else(|| "Card confirmation returned no payment method.".to_string())?;

        Ok(ConfirmedSetup {
            payment_method: PaymentMethodRef::new(payment_method),
            setup_intent: get_path_str(&result, &["setupIntent", "id"]),
        })
    }
}

/// `ScriptHost` over the live page
pub struct BrowserScriptHost;

#[async_trait(?Send)]
impl ScriptHost for BrowserScriptHost {
    fn provider_ready(&self) -> bool {
        stripe_loaded()
    }

    async fn pause(&self, interval: Duration) {
        let millis = u32::try_from(interval.as_millis()).unwrap_or(u32::MAX);
        TimeoutFuture::new(millis).await;
    }

    async fn load_provider_script(&self) -> Result<(), String> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or("No document")?;
        let script = document
            .create_element("script")
            .map_err(js_message)?
            .unchecked_into::<web_sys::HtmlScriptElement>();
        script.set_src(STRIPE_JS_URL);

        let (tx, rx) = oneshot::channel::<bool>();
        let tx = Rc::new(std::cell::RefCell::new(Some(tx)));
        let on_load = {
            let tx = tx.clone();
            Closure::<dyn FnMut()>::new(move || {
                if let Some(tx) = tx.borrow_mut().take() {
                    let _ = tx.send(true);
                }
            })
        };
        let on_error = Closure::<dyn FnMut()>::new(move || {
            if let Some(tx) = tx.borrow_mut().take() {
                let _ = tx.send(false);
            }
        });
        script.set_onload(Some(on_load.as_ref().unchecked_ref()));
        script.set_onerror(Some(on_error.as_ref().unchecked_ref()));

        let head = document.head().ok_or("No document head")?;
        head.append_child(&script).map_err(js_message)?;

        let loaded = rx.await.unwrap_or(false);
        drop((on_load, on_error));
        if loaded && stripe_loaded() {
            Ok(())
        } else {
            Err("Stripe.js could not be loaded.".into())
        }
    }
}
