//! Cliente del modelo de visión de Gemini: una sola llamada HTTP por
//! análisis, con esquema de respuesta fijo, y clasificación del fallo en
//! una de las categorías de `AnalysisError`. Sin reintentos.

use serde_json::{json, Value};
use tracing::{error, warn};

use crate::config::AppConfig;
use crate::errors::{classify_transport, AnalysisError, Operation};
use crate::images::InlineImage;
use crate::models::{AnalysisAdjustments, FoodAnalysis};
use crate::normalize::normalize;
use crate::prompt;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Cliente de análisis nutricional sobre la API REST de Gemini.
#[derive(Debug, Clone)]
pub struct GeminiAnalyzer {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiAnalyzer {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: GEMINI_BASE_URL.to_string(),
            api_key: cfg.gemini_api_key.clone(),
            model: cfg.gemini_model.clone(),
        }
    }

    /// Análisis inicial de una foto de comida, con descripción opcional
    /// del usuario como contexto de apoyo.
    pub async fn analyze(
        &self,
        image: &InlineImage,
        description: Option<&str>,
    ) -> Result<FoodAnalysis, AnalysisError> {
        let instruction = prompt::build_initial_prompt(description);
        self.generate(Operation::Analyze, image, &instruction).await
    }

    /// Reestimación: mismo ciclo de llamada y normalización, pero el prompt
    /// incorpora el análisis vigente y los ajustes del usuario. Debe
    /// construirse siempre sobre el último análisis aceptado.
    pub async fn reestimate(
        &self,
        image: &InlineImage,
        current: &FoodAnalysis,
        adjustments: &AnalysisAdjustments,
        description: Option<&str>,
    ) -> Result<FoodAnalysis, AnalysisError> {
        let instruction = prompt::build_reestimate_prompt(current, adjustments, description);
        self.generate(Operation::Reestimate, image, &instruction).await
    }

    async fn generate(
        &self,
        op: Operation,
        image: &InlineImage,
        instruction: &str,
    ) -> Result<FoodAnalysis, AnalysisError> {
        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "inline_data": { "mime_type": image.mime_type, "data": image.data } },
                    { "text": instruction }
                ]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": food_analysis_schema()
            }
        });

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                error!("Fallo de red llamando a Gemini: {err}");
                classify_transport(op, err.status().map(|s| s.as_u16()))
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!(%status, "Gemini devolvió un error: {detail}");
            return Err(classify_transport(op, Some(status.as_u16())));
        }

        let payload: Value = response.json().await.map_err(|err| {
            error!("No se pudo leer el cuerpo de la respuesta de Gemini: {err}");
            classify_transport(op, None)
        })?;

        // Los errores del normalizador son de dominio y se propagan tal
        // cual: nunca se reclasifican como fallo de transporte.
        normalize(extract_text(&payload).trim())
    }
}

/// Concatena las partes de texto del primer candidato de la respuesta.
fn extract_text(payload: &Value) -> String {
    let parts = payload["candidates"][0]["content"]["parts"]
        .as_array()
        .cloned()
        .unwrap_or_default();

    let mut text = String::new();
    for part in parts {
        if let Some(t) = part.get("text").and_then(Value::as_str) {
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(t);
        }
    }
    text
}

/// Esquema fijo que restringe la salida del modelo a la forma de
/// `FoodAnalysis`: todos los campos requeridos, las seis claves numéricas
/// de grupos y las explicaciones anidadas.
fn food_analysis_schema() -> Value {
    let group_numbers = json!({
        "type": "OBJECT",
        "description": "Un desglose del número de porciones por grupo alimenticio.",
        "properties": {
            "harinas": { "type": "NUMBER", "description": "Número de porciones de harinas/carbohidratos." },
            "vegetales": { "type": "NUMBER", "description": "Número de porciones de vegetales." },
            "proteinas": { "type": "NUMBER", "description": "Número de porciones de proteínas." },
            "frutas": { "type": "NUMBER", "description": "Número de porciones de frutas." },
            "leches": { "type": "NUMBER", "description": "Número de porciones de lácteos." },
            "grasas": { "type": "NUMBER", "description": "Número de porciones de grasas." }
        },
        "required": ["harinas", "vegetales", "proteinas", "frutas", "leches", "grasas"]
    });

    let group_texts = json!({
        "type": "OBJECT",
        "description": "Explicaciones por cada grupo alimenticio.",
        "properties": {
            "harinas": { "type": "STRING" },
            "vegetales": { "type": "STRING" },
            "proteinas": { "type": "STRING" },
            "frutas": { "type": "STRING" },
            "leches": { "type": "STRING" },
            "grasas": { "type": "STRING" }
        },
        "required": ["harinas", "vegetales", "proteinas", "frutas", "leches", "grasas"]
    });

    json!({
        "type": "OBJECT",
        "properties": {
            "photoTimestamp": {
                "type": "STRING",
                "description": "Opcional. La fecha y hora en que se tomó la foto, extraída de los metadatos EXIF, en formato ISO 8601."
            },
            "foodName": {
                "type": "STRING",
                "description": "El nombre del plato de comida identificado (usando el nombre costarricense si aplica)."
            },
            "portionSize": {
                "type": "STRING",
                "description": "Una estimación del tamaño de la porción, ej., '1 taza', 'aprox. 200g'."
            },
            "ingredients": {
                "type": "ARRAY",
                "description": "Una lista de los ingredientes principales encontrados en el plato.",
                "items": { "type": "STRING" }
            },
            "estimatedCalories": {
                "type": "NUMBER",
                "description": "Un recuento total estimado de calorías para la porción identificada."
            },
            "foodGroups": group_numbers,
            "estimateExplanations": {
                "type": "OBJECT",
                "description": "Explicaciones breves para cada estimación nutricional.",
                "properties": {
                    "portionSize": { "type": "STRING" },
                    "estimatedCalories": { "type": "STRING" },
                    "foodGroups": group_texts
                },
                "required": ["portionSize", "estimatedCalories", "foodGroups"]
            }
        },
        "required": ["foodName", "portionSize", "ingredients", "estimatedCalories", "foodGroups", "estimateExplanations"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn el_esquema_exige_todos_los_campos() {
        let schema = food_analysis_schema();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        for field in [
            "foodName",
            "portionSize",
            "ingredients",
            "estimatedCalories",
            "foodGroups",
            "estimateExplanations",
        ] {
            assert!(required.contains(&field), "falta {field}");
        }
        // El timestamp EXIF es opcional a propósito.
        assert!(!required.contains(&"photoTimestamp"));

        let groups = schema["properties"]["foodGroups"]["required"]
            .as_array()
            .unwrap();
        assert_eq!(groups.len(), 6);
    }

    #[test]
    fn extract_text_concatena_las_partes_del_primer_candidato() {
        let payload = json!({
            "candidates": [{
                "content": { "parts": [ { "text": "{\"a\":" }, { "text": "1}" } ] }
            }]
        });
        assert_eq!(extract_text(&payload), "{\"a\":\n1}");
    }

    #[test]
    fn extract_text_sin_candidatos_devuelve_vacio() {
        assert_eq!(extract_text(&json!({})), "");
    }
}
