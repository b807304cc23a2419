//! DOM Checkout Surface
//!
//! `CheckoutSurface` over the host checkout page.

use std::rc::Rc;

use leptos::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlElement, HtmlFormElement, HtmlInputElement, HtmlSelectElement};

use checkout_core::{dom, fields, BillingAddress, BillingDetails, CheckoutSurface};

use crate::stripe::{js_message, StripeCard};

pub struct DomSurface {
    document: Document,
    form: HtmlFormElement,
    card: Rc<StripeCard>,
    error: RwSignal<Option<String>>,
}

impl DomSurface {
    pub fn new(
        document: Document,
        form: HtmlFormElement,
        card: Rc<StripeCard>,
        error: RwSignal<Option<String>>,
    ) -> Self {
        Self {
            document,
            form,
            card,
            error,
        }
    }

    fn named(&self, name: &str) -> Option<Element> {
        self.form
            .query_selector(&format!("[name=\"{name}\"]"))
            .ok()
            .flatten()
    }

    /// Trimmed value of a named input or select
    fn value(&self, name: &str) -> Option<String> {
        let element = self.named(name)?;
        let raw = if let Some(input) = element.dyn_ref::<HtmlInputElement>() {
            input.value()
        } else if let Some(select) = element.dyn_ref::<HtmlSelectElement>() {
            select.value()
        } else {
            return None;
        };
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }

    fn by_id(&self, id: &str) -> Option<HtmlElement> {
        self.document
            .get_element_by_id(id)
            .and_then(|e| e.dyn_into::<HtmlElement>().ok())
    }

    fn each(&self, selector: &str, mut apply: impl FnMut(Element)) {
        let Ok(nodes) = self.form.query_selector_all(selector) else {
            return;
        };
        for i in 0..nodes.length() {
            if let Some(element) = nodes.item(i).and_then(|n| n.dyn_into::<Element>().ok()) {
                apply(element);
            }
        }
    }
}

impl CheckoutSurface for DomSurface {
    fn rendered_total(&self) -> Option<String> {
        self.document
            .get_element_by_id(dom::TOTAL_DUE)
            .and_then(|e| e.text_content())
    }

    fn billing_details(&self) -> BillingDetails {
        BillingDetails {
            first_name: self.value(fields::FIRST_NAME).unwrap_or_default(),
            last_name: self.value(fields::LAST_NAME).unwrap_or_default(),
            email: self.value(fields::EMAIL).unwrap_or_default(),
            phone: self.value(fields::PHONE),
            address: BillingAddress {
                line1: self.value(fields::ADDRESS1),
                line2: self.value(fields::ADDRESS2),
                city: self.value(fields::CITY),
                state: self.value(fields::STATE),
                postal_code: self.value(fields::POSTCODE),
                country: self.value(fields::COUNTRY),
            },
        }
    }

    fn mount_card_widget(&self) -> Result<(), String> {
        self.card
            .card
            .mount(&format!("#{}", dom::CARD_ELEMENT))
            .map_err(js_message)?;

        for name in fields::NATIVE_CARD_FIELDS {
            self.each(&format!("[name=\"{name}\"]"), |element| {
                if let Ok(element) = element.dyn_into::<HtmlElement>() {
                    element.set_hidden(true);
                }
            });
        }
        Ok(())
    }

    fn deselect_native_methods(&self) {
        self.each(&format!("input[name=\"{}\"]", fields::NATIVE_METHOD), |element| {
            if let Ok(radio) = element.dyn_into::<HtmlInputElement>() {
                radio.set_checked(false);
            }
        });
    }

    fn set_submit_enabled(&self, enabled: bool) {
        self.each("[type=\"submit\"]", |element| {
            if enabled {
                let _ = element.remove_attribute("disabled");
            } else {
                let _ = element.set_attribute("disabled", "disabled");
            }
        });
    }

    fn show_error(&self, message: &str) {
        self.error.set(Some(message.to_string()));
    }

    fn clear_error(&self) {
        self.error.set(None);
    }

    fn inject_field(&self, name: &str, value: &str) {
        if let Some(input) = self
            .named(name)
            .and_then(|e| e.dyn_into::<HtmlInputElement>().ok())
        {
            input.set_value(value);
            return;
        }

        let Ok(input) = self
            .document
            .create_element("input")
            .map(JsCast::unchecked_into::<HtmlInputElement>)
        else {
            return;
        };
        input.set_type("hidden");
        input.set_name(name);
        input.set_value(value);
        let _ = self.form.append_child(&input);
    }

    fn hide_card_widget(&self) {
        if let Some(element) = self.by_id(dom::CARD_ELEMENT) {
            element.set_hidden(true);
        }
    }

    fn show_success(&self) {
        if let Some(element) = self.by_id(dom::SUCCESS) {
            element.set_hidden(false);
        }
    }

    fn resubmit(&self) {
        if let Err(e) = self.form.request_submit() {
            tracing::warn!(error = %js_message(e), "Checkout form resubmit failed");
        }
    }
}
