use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, Instrument};

use super::actor::RequestActor;
use super::responses::ApiError;
use crate::error::{TrackingError, ValidationError};
use crate::service::TrackingService;
use crate::specimens::{NewSpecimen, SpecimenId};
use crate::telemetry::{create_transition_span, generate_correlation_id};
use crate::workflows::{Stage, TransitionRequest};

pub type AppState = Arc<TrackingService>;

type ApiResult = Result<(StatusCode, Json<Value>), ApiError>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageUpdateBody {
    pub stage: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub photo_reference: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingBody {
    pub specimen_id: String,
    #[serde(flatten)]
    pub update: StageUpdateBody,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

pub fn router(service: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/api/stages", get(list_stages))
        .route("/api/specimens", get(list_specimens).post(create_specimen))
        .route("/api/specimens/search", get(search_specimens))
        .route("/api/specimens/stats", get(specimen_stats))
        .route("/api/specimens/:id", get(specimen_detail))
        .route("/api/specimens/:id/history", get(specimen_history))
        .route("/api/specimens/:id/stage", put(update_stage))
        .route("/api/tracking", post(track))
        .layer(middleware::from_fn(request_span))
        .with_state(service)
}

async fn request_span(request: Request, next: Next) -> Response {
    let correlation_id = generate_correlation_id();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let span = create_transition_span("http_request", None, None, Some(&correlation_id));

    async move {
        let response = next.run(request).await;
        info!(%method, %path, status = response.status().as_u16(), "Handled request");
        response
    }
    .instrument(span)
    .await
}

fn ok(body: Value) -> ApiResult {
    Ok((StatusCode::OK, Json(body)))
}

fn parse_stage(raw: &str) -> Result<Stage, ApiError> {
    raw.parse::<Stage>().map_err(|e| {
        ApiError::Tracking(TrackingError::Validation(ValidationError::InvalidField {
            field: "stage",
            reason: e.to_string(),
        }))
    })
}

async fn resolve_id(service: &TrackingService, reference: &str) -> Result<SpecimenId, ApiError> {
    Ok(service.resolve(reference).await?.id)
}

async fn health() -> Json<Value> {
    Json(json!({ "message": "HistoPath Tracker API is running!" }))
}

async fn list_stages(State(service): State<AppState>) -> ApiResult {
    ok(json!({ "success": true, "stages": service.stages() }))
}

async fn list_specimens(State(service): State<AppState>) -> ApiResult {
    let specimens = service.list().await?;
    ok(json!({ "success": true, "specimens": specimens }))
}

async fn create_specimen(
    State(service): State<AppState>,
    RequestActor(actor): RequestActor,
    body: Result<Json<NewSpecimen>, JsonRejection>,
) -> ApiResult {
    let Json(input) = body?;
    let registration = service.register(input, &actor).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Specimen registered successfully",
            "accession_number": registration.specimen.accession_number,
            "specimen": registration.specimen,
        })),
    ))
}

async fn search_specimens(
    State(service): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult {
    let specimens = service.search(&params.q).await?;
    ok(json!({ "success": true, "specimens": specimens }))
}

async fn specimen_stats(State(service): State<AppState>) -> ApiResult {
    let stats = service.stats().await?;
    ok(json!({ "success": true, "stats": stats }))
}

async fn specimen_detail(State(service): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let id = resolve_id(&service, &id).await?;
    let detail = service.detail(id).await?;
    ok(json!({
        "success": true,
        "specimen": detail.specimen,
        "timeline": detail.timeline,
        "ledger": detail.ledger,
    }))
}

async fn specimen_history(State(service): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let id = resolve_id(&service, &id).await?;
    let history = service.history(id).await?;
    ok(json!({ "success": true, "history": history }))
}

async fn apply_update(
    service: &TrackingService,
    reference: &str,
    actor: crate::specimens::Actor,
    update: StageUpdateBody,
) -> ApiResult {
    let target = parse_stage(&update.stage)?;
    let specimen_id = resolve_id(service, reference).await?;
    let specimen = service
        .update_stage(TransitionRequest {
            specimen_id,
            target,
            actor,
            notes: update.notes,
            photo_reference: update.photo_reference,
        })
        .await?;

    ok(json!({
        "success": true,
        "message": format!("Stage updated to {}", target.label()),
        "specimen": specimen,
    }))
}

async fn update_stage(
    State(service): State<AppState>,
    Path(id): Path<String>,
    RequestActor(actor): RequestActor,
    body: Result<Json<StageUpdateBody>, JsonRejection>,
) -> ApiResult {
    let Json(update) = body?;
    apply_update(&service, &id, actor, update).await
}

async fn track(
    State(service): State<AppState>,
    RequestActor(actor): RequestActor,
    body: Result<Json<TrackingBody>, JsonRejection>,
) -> ApiResult {
    let Json(TrackingBody {
        specimen_id,
        update,
    }) = body?;
    apply_update(&service, &specimen_id, actor, update).await
}
