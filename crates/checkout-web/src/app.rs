//! Widget Bootstrap
//!
//! Reads the server-rendered mount point, waits for Stripe.js, then hands the
//! checkout form's submit event to the validation controller.

use std::rc::Rc;

use leptos::prelude::*;
use wasm_bindgen::{prelude::Closure, JsCast};
use web_sys::{Element, HtmlElement, HtmlFormElement};

use checkout_core::{
    displays_zero_total, dom, wait_for_provider, IntentGrant, PollPolicy, RemoteCustomerId,
    SubmitDecision, ValidationController,
};

use crate::api::{AjaxIntentSource, BrowserScriptHost, StripeConfirmer};
use crate::components::CardErrors;
use crate::stripe::StripeCard;
use crate::surface::DomSurface;

type Controller = ValidationController<DomSurface, AjaxIntentSource, StripeConfirmer>;

/// Settings carried on the mount element's `data-` attributes
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WidgetConfig {
    pub publishable_key: String,
    pub pre_issued: Option<IntentGrant>,
    pub intent_receipts: bool,
}

impl WidgetConfig {
    pub fn from_element(root: &Element) -> Option<Self> {
        let attr = |name: &str| root.get_attribute(name).filter(|v| !v.trim().is_empty());
        let pre_issued = match (attr("data-client-secret"), attr("data-customer")) {
            (Some(client_secret), Some(customer)) => Some(IntentGrant {
                client_secret,
                customer: RemoteCustomerId::new(customer),
            }),
            _ => None,
        };

        Some(Self {
            publishable_key: attr("data-publishable-key")?,
            pre_issued,
            intent_receipts: attr("data-intent-receipts").is_some_and(|v| v == "1"),
        })
    }
}

/// Start the widget if this page carries one
pub async fn start() -> Result<(), String> {
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or("No document")?;
    let Some(root) = document.get_element_by_id(dom::ROOT) else {
        return Ok(());
    };
    let config = WidgetConfig::from_element(&root).ok_or("Card widget is missing its key")?;
    let form = document
        .get_element_by_id(dom::CHECKOUT_FORM)
        .and_then(|e| e.dyn_into::<HtmlFormElement>().ok())
        .ok_or("Checkout form not found")?;

    let rendered_total = document
        .get_element_by_id(dom::TOTAL_DUE)
        .and_then(|e| e.text_content());
    if !displays_zero_total(rendered_total.as_deref()) {
        tracing::debug!("Total due is not zero; card widget not started");
        return Ok(());
    }

    let error = RwSignal::new(None::<String>);
    if let Some(slot) = document
        .get_element_by_id(dom::ERRORS)
        .and_then(|e| e.dyn_into::<HtmlElement>().ok())
    {
        leptos::mount::mount_to(slot, move || view! { <CardErrors error=error /> }).forget();
    }

    if let Err(e) = wait_for_provider(&BrowserScriptHost, PollPolicy::default()).await {
        error.set(Some(e.clone()));
        return Err(e);
    }

    let card = Rc::new(StripeCard::create(&config.publishable_key)?);
    let surface = DomSurface::new(document, form.clone(), card.clone(), error);
    let controller: Rc<Controller> = Rc::new(
        ValidationController::new(
            surface,
            AjaxIntentSource::same_origin(),
            StripeConfirmer::new(card),
            config.pre_issued,
        )
        .with_intent_receipts(config.intent_receipts),
    );

    if !controller.on_page_ready() {
        return Ok(());
    }
    intercept_submit(&form, controller);
    tracing::debug!("Zero-total card widget ready");
    Ok(())
}

/// Route every submit of the checkout form through the controller
fn intercept_submit(form: &HtmlFormElement, controller: Rc<Controller>) {
    let on_submit = Closure::<dyn FnMut(web_sys::Event)>::new(move |event: web_sys::Event| {
        match controller.begin_submit() {
            SubmitDecision::PassThrough => {}
            SubmitDecision::Suppressed => event.prevent_default(),
            SubmitDecision::Intercepted => {
                event.prevent_default();
                let controller = controller.clone();
                leptos::task::spawn_local(async move {
                    controller.run_validation().await;
                });
            }
        }
    });

    if form
        .add_event_listener_with_callback("submit", on_submit.as_ref().unchecked_ref())
        .is_ok()
    {
        on_submit.forget();
    }
}
