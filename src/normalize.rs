//! Normalización de la respuesta JSON del modelo a un `FoodAnalysis`
//! completo. El JSON del modelo se trata como entrada no confiable y se
//! valida campo a campo; nunca se deserializa directamente al tipo destino.

use serde_json::Value;

use crate::errors::AnalysisError;
use crate::models::{
    EstimateExplanations, FoodAnalysis, FoodGroupExplanations, FoodGroupPortions,
};

const FALLBACK_GROUP: &str = "Estimación basada en la imagen.";
const FALLBACK_PORTION: &str = "Estimación basada en dimensiones visibles del plato.";
const FALLBACK_CALORIES: &str = "Estimación basada en porción e ingredientes identificados.";

/// Convierte el texto crudo devuelto por el modelo en un análisis
/// estrictamente tipado, o falla con el error de dominio correspondiente:
/// texto vacío, JSON no parseable, o campos requeridos ausentes/ inválidos.
pub fn normalize(raw: &str) -> Result<FoodAnalysis, AnalysisError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AnalysisError::EmptyResponse);
    }

    let parsed: Value =
        serde_json::from_str(raw).map_err(|_| AnalysisError::MalformedJson)?;

    let food_name = required_text(parsed.get("foodName"))?;
    let portion_size = required_text(parsed.get("portionSize"))?;

    let raw_ingredients = parsed
        .get("ingredients")
        .and_then(Value::as_array)
        .ok_or(AnalysisError::IncompleteResponse)?;

    // Calorías negativas o no numéricas cuentan como campo requerido inválido,
    // no se silencian a cero.
    let calories = parsed
        .get("estimatedCalories")
        .and_then(Value::as_f64)
        .filter(|c| c.is_finite() && *c >= 0.0)
        .ok_or(AnalysisError::IncompleteResponse)?;

    let groups = parsed
        .get("foodGroups")
        .filter(|v| !v.is_null())
        .ok_or(AnalysisError::IncompleteResponse)?;
    let explanations = parsed
        .get("estimateExplanations")
        .filter(|v| !v.is_null())
        .ok_or(AnalysisError::IncompleteResponse)?;

    let ingredients: Vec<String> = raw_ingredients
        .iter()
        .filter_map(ingredient_text)
        .collect();
    if ingredients.is_empty() {
        return Err(AnalysisError::IncompleteResponse);
    }

    Ok(FoodAnalysis {
        // Se conserva solo si vino como string; jamás se rellena con la
        // hora actual.
        photo_timestamp: parsed
            .get("photoTimestamp")
            .and_then(Value::as_str)
            .map(str::to_string),
        food_name,
        portion_size,
        ingredients,
        estimated_calories: calories.round() as i64,
        food_groups: normalize_food_groups(groups),
        estimate_explanations: normalize_explanations(explanations),
    })
}

fn required_text(value: Option<&Value>) -> Result<String, AnalysisError> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or(AnalysisError::IncompleteResponse)
}

fn ingredient_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parsea una porción individual: acepta números y strings numéricos,
/// redondea a un decimal y recorta a ≥ 0. Cualquier otra cosa vale 0.
pub fn parse_portion(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(v) if v.is_finite() && v > 0.0 => (v * 10.0).round() / 10.0,
        _ => 0.0,
    }
}

fn normalize_food_groups(value: &Value) -> FoodGroupPortions {
    FoodGroupPortions {
        harinas: parse_portion(value.get("harinas")),
        vegetales: parse_portion(value.get("vegetales")),
        proteinas: parse_portion(value.get("proteinas")),
        frutas: parse_portion(value.get("frutas")),
        leches: parse_portion(value.get("leches")),
        grasas: parse_portion(value.get("grasas")),
    }
}

fn explanation_text(value: Option<&Value>, fallback: &str) -> String {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| fallback.to_string())
}

fn normalize_explanations(value: &Value) -> EstimateExplanations {
    let groups = value.get("foodGroups").cloned().unwrap_or(Value::Null);
    EstimateExplanations {
        portion_size: explanation_text(value.get("portionSize"), FALLBACK_PORTION),
        estimated_calories: explanation_text(value.get("estimatedCalories"), FALLBACK_CALORIES),
        food_groups: FoodGroupExplanations {
            harinas: explanation_text(groups.get("harinas"), FALLBACK_GROUP),
            vegetales: explanation_text(groups.get("vegetales"), FALLBACK_GROUP),
            proteinas: explanation_text(groups.get("proteinas"), FALLBACK_GROUP),
            frutas: explanation_text(groups.get("frutas"), FALLBACK_GROUP),
            leches: explanation_text(groups.get("leches"), FALLBACK_GROUP),
            grasas: explanation_text(groups.get("grasas"), FALLBACK_GROUP),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn respuesta_completa() -> Value {
        json!({
            "foodName": " Gallo pinto ",
            "portionSize": "1 taza",
            "ingredients": ["arroz", " frijoles ", ""],
            "estimatedCalories": 203.6,
            "foodGroups": {
                "harinas": 2.0,
                "vegetales": 0.5,
                "proteinas": 1.0,
                "frutas": 0,
                "leches": 0,
                "grasas": 1.0
            },
            "estimateExplanations": {
                "portionSize": "Plato estándar de desayuno.",
                "estimatedCalories": "Suma de arroz y frijoles.",
                "foodGroups": {
                    "harinas": "Arroz y frijoles.",
                    "proteinas": "Frijoles."
                }
            }
        })
    }

    #[test]
    fn respuesta_vacia_falla_con_empty_response() {
        assert_eq!(normalize(""), Err(AnalysisError::EmptyResponse));
        assert_eq!(normalize("   "), Err(AnalysisError::EmptyResponse));
    }

    #[test]
    fn json_invalido_falla_con_malformed_json() {
        assert_eq!(normalize("{not json"), Err(AnalysisError::MalformedJson));
    }

    #[test]
    fn campos_faltantes_fallan_con_incomplete_response() {
        assert_eq!(
            normalize(r#"{"foodName":"x"}"#),
            Err(AnalysisError::IncompleteResponse)
        );
    }

    #[test]
    fn calorias_negativas_o_no_numericas_son_invalidas() {
        let mut v = respuesta_completa();
        v["estimatedCalories"] = json!(-10);
        assert_eq!(
            normalize(&v.to_string()),
            Err(AnalysisError::IncompleteResponse)
        );
        v["estimatedCalories"] = json!("muchas");
        assert_eq!(
            normalize(&v.to_string()),
            Err(AnalysisError::IncompleteResponse)
        );
    }

    #[test]
    fn ingredientes_vacios_tras_limpiar_son_incompletos() {
        let mut v = respuesta_completa();
        v["ingredients"] = json!(["", "  "]);
        assert_eq!(
            normalize(&v.to_string()),
            Err(AnalysisError::IncompleteResponse)
        );
    }

    #[test]
    fn normaliza_respuesta_valida() {
        let analysis = normalize(&respuesta_completa().to_string()).unwrap();
        assert_eq!(analysis.food_name, "Gallo pinto");
        assert_eq!(analysis.portion_size, "1 taza");
        assert_eq!(analysis.ingredients, vec!["arroz", "frijoles"]);
        assert_eq!(analysis.estimated_calories, 204);
        assert_eq!(analysis.food_groups.harinas, 2.0);
        assert_eq!(analysis.photo_timestamp, None);
    }

    #[test]
    fn grupos_con_tipos_mixtos_se_normalizan_a_cero() {
        let mut v = respuesta_completa();
        v["foodGroups"] = json!({"harinas": "2", "vegetales": -1, "proteinas": null});
        let analysis = normalize(&v.to_string()).unwrap();
        let g = analysis.food_groups;
        assert_eq!(g.harinas, 2.0);
        assert_eq!(g.vegetales, 0.0);
        assert_eq!(g.proteinas, 0.0);
        assert_eq!(g.frutas, 0.0);
        assert_eq!(g.leches, 0.0);
        assert_eq!(g.grasas, 0.0);
    }

    #[test]
    fn la_suma_de_porciones_iguala_la_suma_recortada_de_entradas() {
        let entradas = [3.0_f64, -2.0, 0.5, 1.5, -0.1, 2.0];
        let mut v = respuesta_completa();
        v["foodGroups"] = json!({
            "harinas": entradas[0], "vegetales": entradas[1], "proteinas": entradas[2],
            "frutas": entradas[3], "leches": entradas[4], "grasas": entradas[5]
        });
        let analysis = normalize(&v.to_string()).unwrap();
        let esperado: f64 = entradas.iter().map(|x| x.max(0.0)).sum();
        let total: f64 = analysis.food_groups.entries().iter().map(|(_, v)| v).sum();
        assert!((total - esperado).abs() < 1e-9);
    }

    #[test]
    fn explicaciones_ausentes_usan_texto_por_defecto() {
        let analysis = normalize(&respuesta_completa().to_string()).unwrap();
        let e = analysis.estimate_explanations;
        assert_eq!(e.portion_size, "Plato estándar de desayuno.");
        assert_eq!(e.food_groups.proteinas, "Frijoles.");
        assert_eq!(e.food_groups.vegetales, FALLBACK_GROUP);
        assert_eq!(e.food_groups.frutas, FALLBACK_GROUP);
    }

    #[test]
    fn timestamp_solo_se_conserva_si_es_string() {
        let mut v = respuesta_completa();
        v["photoTimestamp"] = json!("2024-05-01T12:30:00Z");
        let analysis = normalize(&v.to_string()).unwrap();
        assert_eq!(
            analysis.photo_timestamp.as_deref(),
            Some("2024-05-01T12:30:00Z")
        );

        v["photoTimestamp"] = json!(12345);
        let analysis = normalize(&v.to_string()).unwrap();
        assert_eq!(analysis.photo_timestamp, None);
    }

    #[test]
    fn renormalizar_la_salida_serializada_es_idempotente() {
        let primero = normalize(&respuesta_completa().to_string()).unwrap();
        let reserializado = serde_json::to_string(&primero).unwrap();
        let segundo = normalize(&reserializado).unwrap();
        assert_eq!(primero, segundo);
    }
}
