//! HTTP Handlers

use std::collections::BTreeMap;

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Form, Json,
};
use serde::{Deserialize, Serialize};

use checkout_core::{CheckoutError, CheckoutForm, OrderId};
use checkout_payments::{native_card_errors, AcceptanceOutcome, WidgetRequest};

use crate::state::AppState;

/// `action` value for the guest intent request
pub const CREATE_SETUP_INTENT: &str = "create_setup_intent";

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub stripe_configured: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct SetupIntentResponse {
    pub success: bool,
    pub client_secret: String,
    pub stripe_customer_id: String,
}

#[derive(Debug, Serialize)]
pub struct ValidateCardResponse {
    pub errors: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct OrderAcceptedRequest {
    pub order_id: u64,
    #[serde(default)]
    pub fields: CheckoutForm,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(err: &CheckoutError) -> ApiError {
    let (status, code) = match err {
        CheckoutError::NotConfigured => (StatusCode::SERVICE_UNAVAILABLE, "PAYMENTS_DISABLED"),
        CheckoutError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
        CheckoutError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        CheckoutError::ResolverFailed(_) | CheckoutError::IssueFailed(_) => {
            (StatusCode::BAD_GATEWAY, "SETUP_INTENT_FAILED")
        }
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "CHECKOUT_ERROR"),
    };
    (
        status,
        Json(ErrorResponse {
            error: err.user_message(),
            code: code.into(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        stripe_configured: state.checkout.is_configured(),
    })
}

/// Card widget for the checkout page, 204 when the order is not free
pub async fn render_widget(
    State(state): State<AppState>,
    Json(request): Json<WidgetRequest>,
) -> Response {
    match state.checkout.prepare_widget(&request).await {
        Some(html) => Html(html).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

/// Checkout page auxiliary requests
pub async fn checkout_ajax(
    State(state): State<AppState>,
    Form(fields): Form<BTreeMap<String, String>>,
) -> Result<Json<SetupIntentResponse>, ApiError> {
    let form = CheckoutForm::from(fields);
    let action = form.non_empty("action").unwrap_or_default();
    if action != CREATE_SETUP_INTENT {
        return Err(api_error(&CheckoutError::InvalidRequest(format!(
            "Unknown action: {action}"
        ))));
    }

    let intent = state.checkout.create_guest_intent(&form).await.map_err(|e| {
        tracing::warn!(error = %e, "Guest setup intent failed");
        api_error(&e)
    })?;

    Ok(Json(SetupIntentResponse {
        success: true,
        client_secret: intent.client_secret,
        stripe_customer_id: intent.customer.to_string(),
    }))
}

/// Checkout fields with native payment inputs removed for validated cards
pub async fn pre_checkout(
    State(state): State<AppState>,
    Form(fields): Form<BTreeMap<String, String>>,
) -> Json<CheckoutForm> {
    Json(state.checkout.pre_checkout(CheckoutForm::from(fields)))
}

/// Card-field validation errors
pub async fn validate_card(
    State(state): State<AppState>,
    Form(fields): Form<BTreeMap<String, String>>,
) -> Json<ValidateCardResponse> {
    let form = CheckoutForm::from(fields);
    Json(ValidateCardResponse {
        errors: state.checkout.validate_card(&form, native_card_errors),
    })
}

/// Order accepted; store the validated card if there is one
pub async fn order_accepted(
    State(state): State<AppState>,
    Json(request): Json<OrderAcceptedRequest>,
) -> (StatusCode, Json<AcceptanceOutcome>) {
    let order = OrderId(request.order_id);
    let outcome = state.checkout.accept_order(order, &request.fields).await;

    let status = match outcome {
        AcceptanceOutcome::Rejected { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::OK,
    };
    (status, Json(outcome))
}
