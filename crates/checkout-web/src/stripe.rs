//! Stripe.js Bindings
//!
//! The slice of Stripe.js v3 the card widget uses: the client, the Elements
//! factory, the card element and `confirmCardSetup`.

use wasm_bindgen::prelude::*;
use web_sys::js_sys::{Object, Promise, Reflect};

#[wasm_bindgen]
extern "C" {
    /// Stripe.js client handle
    #[wasm_bindgen(js_name = Stripe, js_namespace = window)]
    #[derive(Debug, Clone)]
    pub type JsStripe;

    /// Elements factory handle
    #[wasm_bindgen(js_name = Elements)]
    #[derive(Debug, Clone)]
    pub type JsElements;

    /// Card element handle
    #[wasm_bindgen(js_name = CardElement)]
    #[derive(Debug, Clone)]
    pub type JsCardElement;

    /// `Stripe("pk_...")`
    #[wasm_bindgen(catch, js_name = Stripe, js_namespace = window)]
    pub fn new_stripe(publishable_key: &str) -> Result<JsStripe, JsValue>;

    /// `stripe.elements()`
    #[wasm_bindgen(method, catch, js_name = elements)]
    pub fn elements(this: &JsStripe) -> Result<JsElements, JsValue>;

    /// `elements.create("card", options)`
    #[wasm_bindgen(method, catch, js_name = create)]
    pub fn create_card(
        this: &JsElements,
        element_type: &str,
        options: &JsValue,
    ) -> Result<JsCardElement, JsValue>;

    /// `card.mount(selector)`
    #[wasm_bindgen(method, catch, js_name = mount)]
    pub fn mount(this: &JsCardElement, selector: &str) -> Result<(), JsValue>;

    /// `stripe.confirmCardSetup(clientSecret, data)`, resolving to
    /// `{ setupIntent }` or `{ error }`
    #[wasm_bindgen(method, catch, js_name = confirmCardSetup)]
    pub fn confirm_card_setup(
        this: &JsStripe,
        client_secret: &str,
        data: &JsValue,
    ) -> Result<Promise, JsValue>;
}

/// Whether `window.Stripe` is defined
pub fn stripe_loaded() -> bool {
    web_sys::window()
        .and_then(|w| Reflect::get(&w, &JsValue::from_str("Stripe")).ok())
        .is_some_and(|v| v.is_function())
}

/// Plain JS object from string pairs, skipping `None` values
pub fn js_object(pairs: &[(&str, Option<&JsValue>)]) -> JsValue {
    let object = Object::new();
    for (key, value) in pairs {
        if let Some(value) = value {
            let _ = Reflect::set(&object, &JsValue::from_str(key), value);
        }
    }
    object.into()
}

/// `obj.a.b...` as a string, if every step exists
pub fn get_path_str(value: &JsValue, path: &[&str]) -> Option<String> {
    let mut current = value.clone();
    for key in path {
        current = Reflect::get(&current, &JsValue::from_str(key)).ok()?;
        if current.is_undefined() || current.is_null() {
            return None;
        }
    }
    current.as_string()
}

/// Mounted card element plus the client that confirms against it
pub struct StripeCard {
    pub stripe: JsStripe,
    pub card: JsCardElement,
}

impl StripeCard {
    pub fn create(publishable_key: &str) -> Result<Self, String> {
        let stripe = new_stripe(publishable_key).map_err(js_message)?;
        let elements = stripe.elements().map_err(js_message)?;
        let options = js_object(&[(
            "hidePostalCode",
            Some(&JsValue::TRUE),
        )]);
        let card = elements.create_card("card", &options).map_err(js_message)?;
        Ok(Self { stripe, card })
    }
}

/// Best-effort message out of a thrown JS value
pub fn js_message(value: JsValue) -> String {
    get_path_str(&value, &["message"])
        .or_else(|| value.as_string())
        .unwrap_or_else(|| "Unexpected error from the card form.".to_string())
}
