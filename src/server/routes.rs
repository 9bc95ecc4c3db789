//! REST endpoints over the orchestrator, consumed by the dashboard.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};

use crate::crm::{CampaignId, ChannelKind, ContactId, CrmApi};
use crate::error::{CrmError, Error};
use crate::orchestrator::{CancelFlag, Orchestrator, SendRequest};

/// Shared state for the API routes.
#[derive(Clone)]
pub struct AppState {
    pub crm: Arc<dyn CrmApi>,
    pub orchestrator: Arc<Orchestrator>,
}

/// Build the API router. CORS is open: the dashboard is served from a
/// different origin in development.
pub fn api_routes(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/campaigns", get(list_campaigns))
        .route("/campaigns/{id}/contacts", get(campaign_contacts))
        .route("/run_campaign", post(run_campaign))
        .layer(cors)
        .with_state(state)
}

// ── Handlers ────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "outreach-engine"
    }))
}

/// GET /campaigns
async fn list_campaigns(State(state): State<AppState>) -> Response {
    match state.crm.list_campaigns().await {
        Ok(campaigns) => {
            let campaigns: Vec<_> = campaigns
                .iter()
                .map(|c| serde_json::json!({"id": c.id, "name": c.name}))
                .collect();
            Json(serde_json::json!({"campaigns": campaigns})).into_response()
        }
        Err(e) => crm_error_response(&e),
    }
}

#[derive(Debug, Deserialize)]
struct ContactsQuery {
    contact_method: Option<String>,
}

/// GET /campaigns/{id}/contacts?contact_method=email|network-message
async fn campaign_contacts(
    State(state): State<AppState>,
    Path(id): Path<CampaignId>,
    Query(query): Query<ContactsQuery>,
) -> Response {
    let Some(kind) = query
        .contact_method
        .as_deref()
        .and_then(ChannelKind::from_wire)
    else {
        return bad_request("contact_method must be \"email\" or \"network-message\"");
    };

    // Existence check first so an unknown campaign is a 404, not an
    // empty contact list.
    if let Err(e) = state.crm.get_campaign(id).await {
        return crm_error_response(&e);
    }

    match state.crm.list_contacts(id, kind).await {
        Ok(contacts) => Json(serde_json::json!({"contacts": contacts})).into_response(),
        Err(e) => crm_error_response(&e),
    }
}

#[derive(Debug, Deserialize)]
struct RunCampaignBody {
    campaign_id: Option<CampaignId>,
    contact_method: Option<String>,
    /// Empty means every contact of the campaign.
    #[serde(default)]
    contact_ids: Vec<ContactId>,
}

/// POST /run_campaign
async fn run_campaign(
    State(state): State<AppState>,
    Json(body): Json<RunCampaignBody>,
) -> Response {
    let Some(campaign_id) = body.campaign_id else {
        return bad_request("campaign_id is required");
    };
    let Some(kind) = body
        .contact_method
        .as_deref()
        .and_then(ChannelKind::from_wire)
    else {
        return bad_request("contact_method must be \"email\" or \"network-message\"");
    };
    if state.orchestrator.channels().get(kind).is_none() {
        return bad_request(&format!("channel {kind} is not configured"));
    }

    let request = SendRequest::new(campaign_id, kind, body.contact_ids);
    match state.orchestrator.run(request, CancelFlag::new()).await {
        Ok(report) => {
            let message = format!("Campaign {campaign_id} run complete: {}", report.summary());
            let mut value = serde_json::to_value(&report).unwrap_or_default();
            if let Some(obj) = value.as_object_mut() {
                obj.insert("message".into(), serde_json::json!(message));
            }
            Json(value).into_response()
        }
        Err(e) => error_response(&e),
    }
}

// ── Error mapping ───────────────────────────────────────────────────

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({"error": message})),
    )
        .into_response()
}

fn crm_error_response(err: &CrmError) -> Response {
    let status = if err.is_not_found() {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::BAD_GATEWAY
    };
    (status, Json(serde_json::json!({"error": err.to_string()}))).into_response()
}

fn error_response(err: &Error) -> Response {
    match err {
        Error::Crm(e) => crm_error_response(e),
        Error::Config(e) => bad_request(&e.to_string()),
        Error::Channel(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"error": e.to_string()})),
        )
            .into_response(),
    }
}
