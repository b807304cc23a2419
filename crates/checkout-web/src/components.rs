//! UI Components

use leptos::prelude::*;

/// Inline card error, driven by the surface's error signal
#[component]
pub fn CardErrors(error: RwSignal<Option<String>>) -> impl IntoView {
    view! {
        <Show when=move || error.get().is_some()>
            <span class="zero-order-card-error-text">
                {move || error.get().unwrap_or_default()}
            </span>
        </Show>
    }
}
