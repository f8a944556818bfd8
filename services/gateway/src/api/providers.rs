//! Provider listing handler.
use crate::api::types::{ProviderInfo, ProviderListResponse};
use crate::app::AppState;
use axum::Json;
use axum::extract::State;

#[utoipa::path(
    get,
    path = "/auth/providers",
    tag = "auth",
    responses(
        (status = 200, description = "Configured identity providers", body = ProviderListResponse)
    )
)]
pub(crate) async fn list_providers(State(state): State<AppState>) -> Json<ProviderListResponse> {
    let mut items: Vec<ProviderInfo> = state
        .providers
        .iter()
        .map(|provider| ProviderInfo {
            name: provider.name().to_string(),
            issuer: provider.issuer().to_string(),
        })
        .collect();
    items.sort_by(|a, b| a.name.cmp(&b.name));
    Json(ProviderListResponse { items })
}
