//! Cliente del webhook de la hoja de cálculo (Apps Script): guardado de
//! comidas, resumen diario y cuentas de usuario.
//!
//! A diferencia del cliente original en el navegador (no-cors, éxito
//! optimista), aquí se exige la confirmación estructurada `{status: ...}`
//! del endpoint; un fallo de red o un `status` distinto de `success` es un
//! error real, no un éxito supuesto.

use serde_json::{json, Value};
use tracing::info;

use crate::config::AppConfig;
use crate::errors::SheetError;
use crate::models::{FoodAnalysis, FoodSummary, User, UserProfile};

#[derive(Debug, Clone)]
pub struct SheetClient {
    http: reqwest::Client,
    webhook_url: String,
}

impl SheetClient {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            webhook_url: cfg.sheet_webhook_url.clone(),
        }
    }

    /// Registra una comida analizada en la hoja del usuario. La imagen, si
    /// viene, ya debe estar reducida a data-URL JPEG (ver
    /// `images::resize_for_sheet`); si no, se envía cadena vacía.
    pub async fn save_meal(
        &self,
        username: &str,
        analysis: &FoodAnalysis,
        image_data_url: Option<&str>,
    ) -> Result<(), SheetError> {
        let payload = save_meal_payload(username, analysis, image_data_url);
        self.post(&payload).await?;
        info!(username, food = %analysis.food_name, "Comida guardada en la hoja");
        Ok(())
    }

    /// Totales consumidos hoy por el usuario.
    pub async fn get_summary(&self, username: &str) -> Result<FoodSummary, SheetError> {
        let ack = self
            .post(&json!({ "action": "get_summary", "username": username }))
            .await?;
        let summary = ack.get("summary").cloned().unwrap_or(Value::Null);
        serde_json::from_value(summary).map_err(|_| SheetError::InvalidResponse)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<User, SheetError> {
        let ack = self
            .post(&json!({
                "action": "login",
                "username": username,
                "password": password,
            }))
            .await?;
        Ok(user_from_ack(&ack, username))
    }

    pub async fn signup(
        &self,
        username: &str,
        password: &str,
        profile: &UserProfile,
    ) -> Result<User, SheetError> {
        let ack = self
            .post(&json!({
                "action": "signup",
                "username": username,
                "password": password,
                "profile": profile,
            }))
            .await?;
        let mut user = user_from_ack(&ack, username);
        // En el alta la hoja puede no devolver el perfil; vale el enviado.
        if user.profile.is_none() {
            user.profile = Some(profile.clone());
        }
        Ok(user)
    }

    pub async fn update_profile(
        &self,
        username: &str,
        profile: &UserProfile,
    ) -> Result<(), SheetError> {
        self.post(&json!({
            "action": "update_profile",
            "username": username,
            "profile": profile,
        }))
        .await?;
        Ok(())
    }

    /// POST común: envía el cuerpo JSON y valida la confirmación. Una
    /// respuesta sin JSON válido o con `status` distinto de `success`
    /// se reporta como error.
    async fn post(&self, body: &Value) -> Result<Value, SheetError> {
        let response = self
            .http
            .post(&self.webhook_url)
            .json(body)
            .send()
            .await
            .map_err(SheetError::Network)?;

        let text = response.text().await.map_err(SheetError::Network)?;
        let ack: Value =
            serde_json::from_str(&text).map_err(|_| SheetError::InvalidResponse)?;

        match ack.get("status").and_then(Value::as_str) {
            Some("success") => Ok(ack),
            _ => {
                let message = ack
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("Ocurrió un error inesperado")
                    .to_string();
                Err(SheetError::Rejected(message))
            }
        }
    }
}

/// Cuerpo del `save_meal`: campos del análisis con los seis grupos
/// desglosados al nivel superior, como espera el Apps Script.
fn save_meal_payload(
    username: &str,
    analysis: &FoodAnalysis,
    image_data_url: Option<&str>,
) -> Value {
    let mut payload = json!({
        "action": "save_meal",
        "username": username,
        "foodName": analysis.food_name,
        "portionSize": analysis.portion_size,
        "estimatedCalories": analysis.estimated_calories,
        "ingredients": analysis.ingredients,
        "image": image_data_url.unwrap_or(""),
    });

    // Timestamp EXIF solo si la foto lo traía.
    if let Some(ts) = &analysis.photo_timestamp {
        payload["timestamp"] = json!(ts);
    }
    for (key, value) in analysis.food_groups.entries() {
        payload[key] = json!(value);
    }
    payload
}

fn user_from_ack(ack: &Value, requested_username: &str) -> User {
    let username = ack
        .get("username")
        .and_then(Value::as_str)
        .unwrap_or(requested_username)
        .to_string();
    // El perfil llega laxamente tipado desde la hoja; los campos ausentes
    // caen en los defaults del modelo.
    let profile = ack
        .get("profile")
        .filter(|p| !p.is_null())
        .and_then(|p| serde_json::from_value::<UserProfile>(p.clone()).ok());
    User { username, profile }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        EstimateExplanations, FoodGroupExplanations, FoodGroupPortions,
    };

    fn analisis() -> FoodAnalysis {
        FoodAnalysis {
            photo_timestamp: None,
            food_name: "Casado".to_string(),
            portion_size: "1 plato".to_string(),
            ingredients: vec!["arroz".to_string(), "pollo".to_string()],
            estimated_calories: 650,
            food_groups: FoodGroupPortions {
                harinas: 2.0,
                vegetales: 1.0,
                proteinas: 1.5,
                frutas: 0.0,
                leches: 0.0,
                grasas: 1.0,
            },
            estimate_explanations: EstimateExplanations {
                portion_size: "p".to_string(),
                estimated_calories: "c".to_string(),
                food_groups: FoodGroupExplanations {
                    harinas: "h".to_string(),
                    vegetales: "v".to_string(),
                    proteinas: "p".to_string(),
                    frutas: "f".to_string(),
                    leches: "l".to_string(),
                    grasas: "g".to_string(),
                },
            },
        }
    }

    #[test]
    fn el_payload_desglosa_los_grupos_al_nivel_superior() {
        let payload = save_meal_payload("ana", &analisis(), None);
        assert_eq!(payload["action"], "save_meal");
        assert_eq!(payload["harinas"], 2.0);
        assert_eq!(payload["grasas"], 1.0);
        assert_eq!(payload["image"], "");
        // Sin EXIF no viaja campo de timestamp.
        assert!(payload.get("timestamp").is_none());
    }

    #[test]
    fn el_payload_incluye_timestamp_e_imagen_cuando_existen() {
        let mut a = analisis();
        a.photo_timestamp = Some("2024-05-01T12:30:00Z".to_string());
        let payload = save_meal_payload("ana", &a, Some("data:image/jpeg;base64,xyz"));
        assert_eq!(payload["timestamp"], "2024-05-01T12:30:00Z");
        assert_eq!(payload["image"], "data:image/jpeg;base64,xyz");
    }

    #[test]
    fn user_from_ack_tolera_perfil_ausente() {
        let ack = json!({ "status": "success", "username": "ana" });
        let user = user_from_ack(&ack, "ana");
        assert_eq!(user.username, "ana");
        assert!(user.profile.is_none());
    }

    #[test]
    fn user_from_ack_parsea_perfil_laxo() {
        let ack = json!({
            "status": "success",
            "profile": { "fullName": "Ana Mora", "goals": { "harinas": 8 } }
        });
        let user = user_from_ack(&ack, "ana");
        let profile = user.profile.unwrap();
        assert_eq!(profile.full_name, "Ana Mora");
        assert_eq!(profile.goals.harinas, 8.0);
        assert_eq!(profile.goals.calorias, 0.0);
    }
}
