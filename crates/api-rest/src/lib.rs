//! # API REST
//!
//! REST API implementation for the triage service.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS, status codes)
//!
//! Uses `api-shared` for request and response bodies. The server binary at the workspace root
//! builds an [`AppState`] and serves [`router`].

#![warn(rust_2018_idioms)]

use api_shared::{types as api, HealthService};
use axum::{
    extract::{Path as AxumPath, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use triage_core::{
    facilities, first_aid, AssessmentInput, TriageError, TriageResult, TriageService,
};
use utoipa::{IntoParams, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

type ApiError = (StatusCode, &'static str);

/// Application state shared by every handler.
#[derive(Clone, Debug)]
pub struct AppState {
    pub triage: TriageService,
}

impl AppState {
    pub fn new(triage: TriageService) -> Self {
        Self { triage }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        assess,
        alert,
        emergency_call,
        emergency_mode,
        deactivate_emergency_mode,
        first_aid_for,
        emergency_facilities,
        nearest_facility,
        rules,
        records,
    ),
    components(schemas(
        api::HealthRes,
        api::AssessReq,
        api::AssessRes,
        api::AlertReq,
        api::AlertRes,
        api::EmergencyCallReq,
        api::EmergencyCallRes,
        api::EmergencyModeRes,
        api::FirstAidRes,
        api::FacilityRes,
        api::FacilitiesRes,
        api::RulesRes,
        api::RecordRes,
        api::RecordsRes,
        triage_core::Assessment,
        triage_core::DetectedMatch,
        triage_core::Recommendation,
        triage_core::SeverityLevel,
        triage_core::Tone,
        triage_core::UrgencyHint,
        triage_core::ClassifierOpinion,
        triage_core::ConditionRule,
        triage_core::EmergencyContact,
        triage_core::AlertLocation,
        triage_core::EmergencyCall,
        triage_core::DispatchResult,
        triage_core::notification::Channel,
    ))
)]
pub struct ApiDoc;

/// Build the REST router with Swagger UI and permissive CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/assessments", post(assess))
        .route("/alerts", post(alert))
        .route("/emergency-calls", post(emergency_call))
        .route("/first-aid/:condition", get(first_aid_for))
        .route("/facilities/emergency", get(emergency_facilities))
        .route("/facilities/emergency/nearest", get(nearest_facility))
        .route("/rules", get(rules))
        .route("/subjects/:subject_id/records", get(records))
        .route(
            "/subjects/:subject_id/emergency-mode",
            get(emergency_mode).delete(deactivate_emergency_mode),
        )
        .merge(
            SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Run blocking triage work (record I/O, classifier wait) off the async runtime.
///
/// Invalid input maps to `400 Bad Request`; any other failure is logged and maps to
/// `500 Internal Server Error`.
async fn run_blocking<T, F>(what: &'static str, work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> TriageResult<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(TriageError::InvalidInput(e))) => {
            tracing::warn!("rejected {what} request: {e}");
            Err((StatusCode::BAD_REQUEST, "Invalid request"))
        }
        Ok(Err(e)) => {
            tracing::error!("{what} error: {:?}", e);
            Err((StatusCode::INTERNAL_SERVER_ERROR, "Internal error"))
        }
        Err(e) => {
            tracing::error!("{what} task failed: {e}");
            Err((StatusCode::INTERNAL_SERVER_ERROR, "Internal error"))
        }
    }
}

fn require_symptoms(symptoms: &str) -> Result<(), ApiError> {
    if symptoms.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Symptoms must not be empty"));
    }
    Ok(())
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = api::HealthRes)
    )
)]
/// Health check endpoint, reporting how many condition rules are loaded.
#[axum::debug_handler]
async fn health(State(state): State<AppState>) -> Json<api::HealthRes> {
    let conditions = state.triage.assessor().rules().conditions().len();
    Json(HealthService::check_health_with_rules(conditions))
}

#[utoipa::path(
    post,
    path = "/assessments",
    request_body = api::AssessReq,
    responses(
        (status = 200, description = "Severity assessment", body = api::AssessRes),
        (status = 400, description = "Bad request"),
        (status = 500, description = "Internal server error")
    )
)]
/// Score a symptom description.
///
/// The assessment is stored against the subject (or the anonymous subject). `emergency_mode`
/// reports whether the subject is in emergency mode after this assessment, including from an
/// earlier one that has not been deactivated. Emergencies carry first-aid steps for the primary
/// condition.
///
/// # Errors
/// Returns `400 Bad Request` if the symptoms are blank or the subject id is invalid, and
/// `500 Internal Server Error` if the subject's records cannot be read.
#[axum::debug_handler]
async fn assess(
    State(state): State<AppState>,
    Json(req): Json<api::AssessReq>,
) -> Result<Json<api::AssessRes>, ApiError> {
    require_symptoms(&req.symptoms)?;
    let subject_id = req.subject_id;
    let input = AssessmentInput {
        symptom_text: req.symptoms,
        additional_info: req.additional_info,
        urgency_hint: req.urgency,
    };

    let triage = state.triage.clone();
    let (assessment, ctx) = run_blocking("assessment", move || {
        let mut ctx = triage.resume_context(subject_id.as_deref())?;
        let assessment = triage.assess(&mut ctx, &input);
        Ok((assessment, ctx))
    })
    .await?;

    let steps = if assessment.is_emergency {
        state.triage.first_aid(&assessment)
    } else {
        Vec::new()
    };

    Ok(Json(api::AssessRes {
        assessment,
        emergency_mode: ctx.emergency_mode(),
        first_aid: steps,
    }))
}

#[utoipa::path(
    post,
    path = "/alerts",
    request_body = api::AlertReq,
    responses(
        (status = 200, description = "Per-channel dispatch results", body = api::AlertRes),
        (status = 400, description = "Bad request"),
        (status = 500, description = "Internal server error")
    )
)]
/// Assess the symptoms and alert every listed emergency contact with the resulting level.
#[axum::debug_handler]
async fn alert(
    State(state): State<AppState>,
    Json(req): Json<api::AlertReq>,
) -> Result<Json<api::AlertRes>, ApiError> {
    require_symptoms(&req.symptoms)?;
    let subject_id = req.subject_id;
    let input = AssessmentInput {
        symptom_text: req.symptoms,
        additional_info: req.additional_info,
        urgency_hint: None,
    };
    let contacts = req.contacts;

    let triage = state.triage.clone();
    let (assessment, results) = run_blocking("alert", move || {
        let mut ctx = triage.resume_context(subject_id.as_deref())?;
        let assessment = triage.assess(&mut ctx, &input);
        let results = triage.alert_contacts(&ctx, &contacts, &assessment);
        Ok((assessment, results))
    })
    .await?;

    Ok(Json(api::AlertRes {
        assessment,
        results,
    }))
}

#[utoipa::path(
    post,
    path = "/emergency-calls",
    request_body = api::EmergencyCallReq,
    responses(
        (status = 200, description = "Call record and per-channel dispatch results", body = api::EmergencyCallRes),
        (status = 400, description = "Bad request"),
        (status = 500, description = "Internal server error")
    )
)]
/// Call emergency services: store an `ambulance_call` record and send the full alert, with
/// time and location, to every listed contact.
#[axum::debug_handler]
async fn emergency_call(
    State(state): State<AppState>,
    Json(req): Json<api::EmergencyCallReq>,
) -> Result<Json<api::EmergencyCallRes>, ApiError> {
    let triage = state.triage.clone();
    let (call, results) = run_blocking("emergency call", move || {
        let ctx = triage.resume_context(req.subject_id.as_deref())?;
        Ok(triage.call_emergency_services(&ctx, &req.contacts, req.location))
    })
    .await?;

    Ok(Json(api::EmergencyCallRes { call, results }))
}

#[utoipa::path(
    get,
    path = "/subjects/{subject_id}/emergency-mode",
    params(("subject_id" = String, Path, description = "Subject to check")),
    responses(
        (status = 200, description = "Current emergency mode", body = api::EmergencyModeRes),
        (status = 400, description = "Bad request"),
        (status = 500, description = "Internal server error")
    )
)]
#[axum::debug_handler]
async fn emergency_mode(
    State(state): State<AppState>,
    AxumPath(subject_id): AxumPath<String>,
) -> Result<Json<api::EmergencyModeRes>, ApiError> {
    let triage = state.triage.clone();
    let ctx = run_blocking("emergency mode", move || {
        triage.resume_context(Some(&subject_id))
    })
    .await?;

    Ok(Json(api::EmergencyModeRes {
        subject_id: ctx.subject_id().to_owned(),
        emergency_mode: ctx.emergency_mode(),
        changed: false,
    }))
}

#[utoipa::path(
    delete,
    path = "/subjects/{subject_id}/emergency-mode",
    params(("subject_id" = String, Path, description = "Subject to take out of emergency mode")),
    responses(
        (status = 200, description = "Emergency mode after the request", body = api::EmergencyModeRes),
        (status = 400, description = "Bad request"),
        (status = 500, description = "Internal server error")
    )
)]
/// Deactivate emergency mode for a subject. A subject that is not in emergency mode is left
/// unchanged and `changed` is false.
#[axum::debug_handler]
async fn deactivate_emergency_mode(
    State(state): State<AppState>,
    AxumPath(subject_id): AxumPath<String>,
) -> Result<Json<api::EmergencyModeRes>, ApiError> {
    let triage = state.triage.clone();
    let (ctx, changed) = run_blocking("emergency mode", move || {
        let mut ctx = triage.resume_context(Some(&subject_id))?;
        let changed = triage.deactivate_emergency(&mut ctx)?;
        Ok((ctx, changed))
    })
    .await?;

    Ok(Json(api::EmergencyModeRes {
        subject_id: ctx.subject_id().to_owned(),
        emergency_mode: ctx.emergency_mode(),
        changed,
    }))
}

#[utoipa::path(
    get,
    path = "/first-aid/{condition}",
    params(("condition" = String, Path, description = "Condition tag, e.g. chest_pain")),
    responses(
        (status = 200, description = "First-aid steps", body = api::FirstAidRes)
    )
)]
/// First-aid steps for a condition tag. Unknown tags get the generic steps.
#[axum::debug_handler]
async fn first_aid_for(AxumPath(condition): AxumPath<String>) -> Json<api::FirstAidRes> {
    let instructions = first_aid::instructions_for(&condition)
        .iter()
        .map(|s| (*s).to_owned())
        .collect();
    Json(api::FirstAidRes {
        generic: !first_aid::has_specific_instructions(&condition),
        condition,
        instructions,
    })
}

#[utoipa::path(
    get,
    path = "/facilities/emergency",
    responses(
        (status = 200, description = "Emergency facilities, nearest first", body = api::FacilitiesRes)
    )
)]
#[axum::debug_handler]
async fn emergency_facilities() -> Json<api::FacilitiesRes> {
    Json(api::FacilitiesRes {
        facilities: facilities::emergency_hospitals()
            .iter()
            .map(api::FacilityRes::from)
            .collect(),
    })
}

#[utoipa::path(
    get,
    path = "/facilities/emergency/nearest",
    responses(
        (status = 200, description = "Nearest hospital with an emergency room", body = api::FacilityRes),
        (status = 404, description = "No emergency facility known")
    )
)]
#[axum::debug_handler]
async fn nearest_facility() -> Result<Json<api::FacilityRes>, ApiError> {
    facilities::nearest_emergency_hospital()
        .map(|f| Json(api::FacilityRes::from(f)))
        .ok_or((StatusCode::NOT_FOUND, "No emergency facility known"))
}

#[utoipa::path(
    get,
    path = "/rules",
    responses(
        (status = 200, description = "Active rule table", body = api::RulesRes)
    )
)]
/// The rule table the assessor is scoring with.
#[axum::debug_handler]
async fn rules(State(state): State<AppState>) -> Json<api::RulesRes> {
    Json(api::RulesRes::from(state.triage.assessor().rules()))
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
struct RecordsQuery {
    /// Only return records of this type, e.g. `symptom_assessment`.
    record_type: Option<String>,
    /// Maximum number of records, newest first.
    limit: Option<usize>,
}

#[utoipa::path(
    get,
    path = "/subjects/{subject_id}/records",
    params(
        ("subject_id" = String, Path, description = "Subject whose history to list"),
        RecordsQuery
    ),
    responses(
        (status = 200, description = "Stored records, newest first", body = api::RecordsRes),
        (status = 400, description = "Bad request"),
        (status = 500, description = "Internal server error")
    )
)]
/// Stored assessment, emergency mode and emergency call records for a subject.
///
/// # Errors
/// Returns `400 Bad Request` for an invalid subject id or record type, and
/// `500 Internal Server Error` if the record store cannot be read.
#[axum::debug_handler]
async fn records(
    State(state): State<AppState>,
    AxumPath(subject_id): AxumPath<String>,
    Query(query): Query<RecordsQuery>,
) -> Result<Json<api::RecordsRes>, ApiError> {
    let triage = state.triage.clone();
    let (subject_id, records) = run_blocking("records", move || {
        let ctx = triage_core::RequestContext::new(subject_id)?;
        let records = triage.history(&ctx, query.record_type.as_deref(), query.limit)?;
        Ok((ctx.subject_id().to_owned(), records))
    })
    .await?;

    Ok(Json(api::RecordsRes {
        subject_id,
        records: records.into_iter().map(api::RecordRes::from).collect(),
    }))
}
