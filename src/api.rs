use axum::{
    extract::{DefaultBodyLimit, Json, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::{
    app_state::AppState,
    errors::{AnalysisError, SheetError},
    images::{self, InlineImage},
    models::{FoodAnalysis, FoodGroupPortions, UserProfile},
    reconcile,
};

/// Tamaño máximo del archivo de imagen aceptado (4 MB), igual que el
/// límite del cliente original.
const MAX_IMAGE_BYTES: usize = 4 * 1024 * 1024;

/// Límite del cuerpo HTTP. Tiene que superar al de la imagen con margen:
/// el base64 infla los bytes 4/3 y el JSON añade el resto de campos. Sin
/// esto, el límite por defecto del extractor (2 MB) respondería 413 antes
/// de llegar al mensaje de "imagen demasiado grande".
const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

type ApiError = (StatusCode, Json<serde_json::Value>);

// --- Payloads de la API ---

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzePayload {
    image_base64: String,
    mime_type: String,
    description: Option<String>,
}

/// Borrador editado tal como llega del formulario: los ingredientes vienen
/// como texto libre y se reparsean en el servidor.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftPayload {
    food_name: String,
    portion_size: String,
    ingredients_text: String,
    food_groups: FoodGroupPortions,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReestimatePayload {
    image_base64: String,
    mime_type: String,
    current: FoodAnalysis,
    draft: DraftPayload,
    description: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveMealPayload {
    username: String,
    analysis: FoodAnalysis,
    /// Imagen original; el servidor la reduce antes de mandarla a la hoja.
    image_base64: Option<String>,
}

#[derive(Deserialize)]
pub struct CredentialsPayload {
    username: String,
    password: String,
}

#[derive(Deserialize)]
pub struct SignupPayload {
    username: String,
    password: String,
    profile: UserProfile,
}

#[derive(Deserialize)]
pub struct UpdateProfilePayload {
    username: String,
    profile: UserProfile,
}

#[derive(Deserialize)]
pub struct SummaryPayload {
    username: String,
}

// --- Router ---

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/api/analyze", post(analyze_handler))
        .route("/api/reestimate", post(reestimate_handler))
        .route("/api/save-meal", post(save_meal_handler))
        .route("/api/summary", post(summary_handler))
        .route("/api/login", post(login_handler))
        .route("/api/signup", post(signup_handler))
        .route("/api/profile", post(update_profile_handler))
        .route("/api/health", get(health_handler))
        .route("/api/shutdown", post(shutdown_handler))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(app_state)
}

// --- Handlers ---

#[axum::debug_handler]
async fn analyze_handler(
    State(state): State<AppState>,
    Json(payload): Json<AnalyzePayload>,
) -> Result<Json<FoodAnalysis>, ApiError> {
    let image = decode_image(&payload.image_base64, &payload.mime_type)?;
    let analysis = state
        .analyzer
        .analyze(&image, payload.description.as_deref())
        .await
        .map_err(analysis_error_response)?;
    info!(food = %analysis.food_name, "Análisis completado");
    Ok(Json(analysis))
}

#[axum::debug_handler]
async fn reestimate_handler(
    State(state): State<AppState>,
    Json(payload): Json<ReestimatePayload>,
) -> Result<Json<FoodAnalysis>, ApiError> {
    // La reestimación se construye siempre sobre el análisis vigente que
    // manda el cliente junto con su borrador; sin diferencias no hay nada
    // que recalcular.
    let adjustments = reconcile::build_adjustments(
        &payload.draft.food_name,
        &payload.draft.portion_size,
        &payload.draft.ingredients_text,
        &payload.draft.food_groups,
    );
    if !reconcile::has_changes(&payload.current, &adjustments) {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "No hay cambios respecto al análisis actual."})),
        ));
    }

    let image = decode_image(&payload.image_base64, &payload.mime_type)?;
    let analysis = state
        .analyzer
        .reestimate(
            &image,
            &payload.current,
            &adjustments,
            payload.description.as_deref(),
        )
        .await
        .map_err(analysis_error_response)?;
    info!(food = %analysis.food_name, "Reestimación completada");
    Ok(Json(analysis))
}

#[axum::debug_handler]
async fn save_meal_handler(
    State(state): State<AppState>,
    Json(payload): Json<SaveMealPayload>,
) -> Result<impl IntoResponse, ApiError> {
    // Si la miniatura falla se guarda el registro sin imagen; perder la
    // foto no debe perder la comida.
    let thumbnail = match payload.image_base64.as_deref() {
        Some(b64) => {
            let bytes = decode_base64(b64)?;
            match images::resize_for_sheet(&bytes) {
                Ok(data_url) => Some(data_url),
                Err(err) => {
                    warn!("No se pudo redimensionar la imagen para la hoja: {err}");
                    None
                }
            }
        }
        None => None,
    };

    state
        .sheet
        .save_meal(&payload.username, &payload.analysis, thumbnail.as_deref())
        .await
        .map_err(sheet_error_response)?;
    Ok((StatusCode::OK, Json(json!({ "status": "success" }))))
}

#[axum::debug_handler]
async fn summary_handler(
    State(state): State<AppState>,
    Json(payload): Json<SummaryPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let summary = state
        .sheet
        .get_summary(&payload.username)
        .await
        .map_err(sheet_error_response)?;
    Ok(Json(json!({ "status": "success", "summary": summary })))
}

#[axum::debug_handler]
async fn login_handler(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .sheet
        .login(&payload.username, &payload.password)
        .await
        .map_err(sheet_error_response)?;
    info!(username = %user.username, "Inicio de sesión correcto");
    Ok(Json(user))
}

#[axum::debug_handler]
async fn signup_handler(
    State(state): State<AppState>,
    Json(payload): Json<SignupPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .sheet
        .signup(&payload.username, &payload.password, &payload.profile)
        .await
        .map_err(sheet_error_response)?;
    info!(username = %user.username, "Cuenta creada");
    Ok(Json(user))
}

#[axum::debug_handler]
async fn update_profile_handler(
    State(state): State<AppState>,
    Json(payload): Json<UpdateProfilePayload>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .sheet
        .update_profile(&payload.username, &payload.profile)
        .await
        .map_err(sheet_error_response)?;
    Ok(Json(json!({ "status": "success" })))
}

#[axum::debug_handler]
async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

#[axum::debug_handler]
async fn shutdown_handler(State(state): State<AppState>) -> impl IntoResponse {
    info!("Petición de apagado recibida.");
    if let Some(sender) = state.shutdown_sender.lock().unwrap().take() {
        let _ = sender.send(());
    }
    StatusCode::OK
}

// --- Utilidades ---

/// Decodifica la imagen del payload, tolerando el prefijo data-URL que
/// agregan los navegadores, y aplica el límite de tamaño.
fn decode_image(b64: &str, mime_type: &str) -> Result<InlineImage, ApiError> {
    let bytes = decode_base64(b64)?;
    Ok(InlineImage::from_bytes(&bytes, mime_type))
}

fn decode_base64(b64: &str) -> Result<Vec<u8>, ApiError> {
    let raw = match b64.split_once(";base64,") {
        Some((_, rest)) => rest,
        None => b64,
    };
    let bytes = STANDARD.decode(raw.trim()).map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "La imagen no es base64 válido."})),
        )
    })?;
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": format!(
                    "La imagen es demasiado grande. Por favor, sube un archivo de menos de {}MB.",
                    MAX_IMAGE_BYTES / 1024 / 1024
                )
            })),
        ));
    }
    Ok(bytes)
}

fn analysis_error_response(err: AnalysisError) -> ApiError {
    let status = match &err {
        AnalysisError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
        AnalysisError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        AnalysisError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        AnalysisError::Unknown(_) => StatusCode::BAD_GATEWAY,
        // Errores de dominio del normalizador: la petición fue bien pero el
        // contenido no sirve.
        _ => StatusCode::UNPROCESSABLE_ENTITY,
    };
    (status, Json(json!({"error": err.to_string()})))
}

fn sheet_error_response(err: SheetError) -> ApiError {
    let status = match &err {
        SheetError::Rejected(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::BAD_GATEWAY,
    };
    (status, Json(json!({"error": err.to_string()})))
}
