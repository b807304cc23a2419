//! Card Widget Rendering
//!
//! Markup injected into the checkout page: the mount point with its
//! configuration in `data-` attributes, the Stripe.js tag and the WASM
//! bootstrap that drives the validation controller.

use std::fmt::Write as _;

use checkout_core::dom;

/// Stripe.js location
pub const STRIPE_JS_URL: &str = "https://js.stripe.com/v3/";

/// Everything the widget needs to start
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WidgetParams {
    pub publishable_key: String,
    /// Pre-issued setup intent secret, for logged-in customers
    pub client_secret: Option<String>,
    pub customer: Option<String>,
    /// URL prefix the WASM bundle is served from
    pub asset_base: String,
    pub strict_receipts: bool,
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn render_widget(params: &WidgetParams) -> String {
    let mut attrs = format!(
        r#" data-publishable-key="{}""#,
        escape_html(&params.publishable_key)
    );
    if let Some(secret) = &params.client_secret {
        let _ = write!(attrs, r#" data-client-secret="{}""#, escape_html(secret));
    }
    if let Some(customer) = &params.customer {
        let _ = write!(attrs, r#" data-customer="{}""#, escape_html(customer));
    }
    if params.strict_receipts {
        attrs.push_str(r#" data-intent-receipts="1""#);
    }

    let base = escape_html(params.asset_base.trim_end_matches('/'));
    format!(
        r#"<div id="{root}" class="zero-order-card"{attrs}>
  <label for="{element}">Card details</label>
  <p class="zero-order-card-note">Your card will not be charged today. It is saved for future renewals.</p>
  <div id="{element}"></div>
  <div id="{errors}" class="zero-order-card-errors" role="alert"></div>
  <div id="{success}" class="zero-order-card-success" hidden>Card verified.</div>
</div>
<script src="{stripe}"></script>
<script type="module">import init from "{base}/checkout_web.js"; init("{base}/checkout_web_bg.wasm");</script>
"#,
        root = dom::ROOT,
        element = dom::CARD_ELEMENT,
        errors = dom::ERRORS,
        success = dom::SUCCESS,
        stripe = STRIPE_JS_URL,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attributes_are_escaped() {
        let html = render_widget(&WidgetParams {
            publishable_key: r#"pk_test_"><script>"#.into(),
            client_secret: Some("seti_1_secret_x".into()),
            customer: Some("cus_1".into()),
            asset_base: "/static/".into(),
            strict_receipts: false,
        });
        assert!(html.contains(r#"data-publishable-key="pk_test_&quot;&gt;&lt;script&gt;""#));
        assert!(html.contains(r#"data-client-secret="seti_1_secret_x""#));
        assert!(html.contains(r#"data-customer="cus_1""#));
        assert!(html.contains("/static/checkout_web.js"));
        assert!(!html.contains("data-intent-receipts"));
    }

    #[test]
    fn test_guest_widget_has_no_secret() {
        let html = render_widget(&WidgetParams {
            publishable_key: "pk_test".into(),
            strict_receipts: true,
            ..Default::default()
        });
        assert!(!html.contains("data-client-secret"));
        assert!(html.contains(r#"data-intent-receipts="1""#));
        assert!(html.contains(STRIPE_JS_URL));
    }
}
