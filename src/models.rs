//! Modelos de dominio (análisis nutricional, ajustes del usuario y
//! datos de perfil provenientes de la hoja de cálculo).

use serde::{Deserialize, Serialize};

/// Porciones por grupo alimenticio. Las seis claves son fijas y siempre
/// están presentes; valores fraccionales con paso de 0.5 y nunca negativos.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FoodGroupPortions {
    pub harinas: f64,
    pub vegetales: f64,
    pub proteinas: f64,
    pub frutas: f64,
    pub leches: f64,
    pub grasas: f64,
}

impl FoodGroupPortions {
    /// Devuelve las porciones como pares (clave, valor) en orden fijo.
    pub fn entries(&self) -> [(&'static str, f64); 6] {
        [
            ("harinas", self.harinas),
            ("vegetales", self.vegetales),
            ("proteinas", self.proteinas),
            ("frutas", self.frutas),
            ("leches", self.leches),
            ("grasas", self.grasas),
        ]
    }
}

/// Justificación textual por grupo alimenticio. Nunca vacía: las claves
/// ausentes se rellenan con un texto por defecto durante la normalización.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodGroupExplanations {
    pub harinas: String,
    pub vegetales: String,
    pub proteinas: String,
    pub frutas: String,
    pub leches: String,
    pub grasas: String,
}

/// Explicaciones de cada estimación nutricional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateExplanations {
    pub portion_size: String,
    pub estimated_calories: String,
    pub food_groups: FoodGroupExplanations,
}

/// Resultado canónico de un análisis. Se crea completo a partir de cada
/// llamada exitosa al modelo y no se muta: el siguiente análisis lo sustituye.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodAnalysis {
    /// Fecha de captura extraída de los metadatos EXIF, en ISO 8601.
    /// Solo presente si la foto traía ese dato; nunca se inventa.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_timestamp: Option<String>,
    pub food_name: String,
    pub portion_size: String,
    pub ingredients: Vec<String>,
    pub estimated_calories: i64,
    pub food_groups: FoodGroupPortions,
    pub estimate_explanations: EstimateExplanations,
}

/// Borrador editado por el usuario sobre el último análisis. Se compara
/// campo a campo contra el `FoodAnalysis` vigente para habilitar la
/// reestimación.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisAdjustments {
    pub food_name: String,
    pub portion_size: String,
    pub ingredients: Vec<String>,
    pub food_groups: FoodGroupPortions,
}

// --- Datos externos de la hoja de cálculo (perfil y resumen diario) ---

/// Metas diarias del usuario: porciones por grupo más calorías totales.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NutritionGoals {
    pub harinas: f64,
    pub vegetales: f64,
    pub proteinas: f64,
    pub frutas: f64,
    pub leches: f64,
    pub grasas: f64,
    pub calorias: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightTarget {
    pub actual: f64,
    pub meta: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
    pub full_name: String,
    pub goals: NutritionGoals,
    pub exercise_plan: String,
    pub indications: String,
    pub liquid_liters: f64,
    pub weight: WeightTarget,
}

/// Totales consumidos en el día, tal como los devuelve la hoja.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FoodSummary {
    pub harinas: f64,
    pub vegetales: f64,
    pub proteinas: f64,
    pub frutas: f64,
    pub leches: f64,
    pub grasas: f64,
    pub calorias: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<UserProfile>,
}
