use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::api::{ApiResult, AppState};
use crate::models::{Alert, BatchSummary, Severity};
use crate::preferences::{account_key, AlertPreference, PreferenceError, PreferenceUpdate, ThresholdLevel};
use crate::query::ListParams;
use crate::types::Iban;

/// Wire form of an alert, with its display bucket computed on the way out.
#[derive(Debug, Serialize)]
pub struct AlertView {
    #[serde(flatten)]
    pub alert: Alert,
    #[serde(rename = "severidad")]
    pub severity: Severity
}

impl From<Alert> for AlertView {
    fn from(alert: Alert) -> Self {
        let severity = alert.severity();
        Self { alert, severity }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub alertas: usize,
    pub version: String
}

/// `POST /processing/file`. The raw body is parsed here so malformed JSON gets the same error
/// shape as every other failure.
pub async fn process_file(State(state): State<AppState>, body: Result<Bytes, BytesRejection>) -> ApiResult<(StatusCode, Json<BatchSummary>)> {
    let body = body?;
    let summary = state.pipeline.ingest_slice(&body).await?;

    Ok((StatusCode::ACCEPTED, Json(summary)))
}

/// `GET /alerts?iban=&min_score=&limit=&offset=`
pub async fn list_alerts(State(state): State<AppState>, params: Result<Query<ListParams>, QueryRejection>) -> ApiResult<Json<Vec<AlertView>>> {
    let Query(params) = params?;
    let alerts = state.queries.list_params(params).await?;

    Ok(Json(alerts.into_iter().map(AlertView::from).collect()))
}

pub async fn health(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let alertas = state.queries.count().await?;

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        alertas,
        version: state.version.clone()
    }))
}

/// Wire form of an account's alert preference, with the cutoff it resolves to.
#[derive(Debug, Serialize)]
pub struct PreferenceView {
    #[serde(rename = "IBAN")]
    pub iban: Iban,
    #[serde(rename = "notificaciones")]
    pub notifications: bool,
    #[serde(rename = "umbral")]
    pub level: Option<ThresholdLevel>,
    #[serde(rename = "umbral_probabilistico")]
    pub cutoff: Option<f64>
}

impl PreferenceView {
    fn new(iban: Iban, preference: AlertPreference) -> Self {
        Self {
            iban,
            notifications: preference.notifications,
            level: preference.level,
            cutoff: preference.cutoff()
        }
    }
}

pub async fn get_preference(State(state): State<AppState>, Path(raw): Path<String>) -> ApiResult<Json<PreferenceView>> {
    let iban = account_key(&raw)?;
    let preference = state.preferences.get(&iban)
        .ok_or_else(|| PreferenceError::NotFound(iban.to_string()))?;

    Ok(Json(PreferenceView::new(iban, preference)))
}

/// `PUT /preferences/{iban}` with `{ "notificaciones"?, "umbral"? }`; creates or merges.
pub async fn put_preference(State(state): State<AppState>, Path(raw): Path<String>, body: Result<Bytes, BytesRejection>) -> ApiResult<Json<PreferenceView>> {
    let iban = account_key(&raw)?;
    let update = PreferenceUpdate::from_slice(&body?)?;
    let preference = state.preferences.apply(iban.clone(), update);

    Ok(Json(PreferenceView::new(iban, preference)))
}

/// Drops the account's preference so it falls back to the global threshold.
pub async fn delete_preference(State(state): State<AppState>, Path(raw): Path<String>) -> ApiResult<StatusCode> {
    let iban = account_key(&raw)?;
    state.preferences.remove(&iban)
        .ok_or_else(|| PreferenceError::NotFound(iban.to_string()))?;

    Ok(StatusCode::NO_CONTENT)
}
