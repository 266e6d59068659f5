//! Reconciliación del borrador del usuario con el último análisis aceptado.
//! Funciones puras y deterministas: la UI las usa para habilitar o no la
//! reestimación.

use crate::models::{AnalysisAdjustments, FoodAnalysis, FoodGroupPortions};

/// Parsea el texto libre de ingredientes: separa por comas y saltos de
/// línea, recorta espacios y descarta entradas vacías. Conserva el orden.
pub fn parse_ingredients(text: &str) -> Vec<String> {
    text.split(|c| c == ',' || c == '\n')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Recorta un valor de porción ingresado a mano: negativos y no finitos
/// valen 0.
pub fn clamp_portion(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

fn clamp_groups(groups: &FoodGroupPortions) -> FoodGroupPortions {
    FoodGroupPortions {
        harinas: clamp_portion(groups.harinas),
        vegetales: clamp_portion(groups.vegetales),
        proteinas: clamp_portion(groups.proteinas),
        frutas: clamp_portion(groups.frutas),
        leches: clamp_portion(groups.leches),
        grasas: clamp_portion(groups.grasas),
    }
}

/// Construye el borrador de ajustes a partir de los campos editados,
/// normalizando ingredientes y porciones con las mismas reglas que usa
/// la comparación.
pub fn build_adjustments(
    food_name: &str,
    portion_size: &str,
    ingredients_text: &str,
    food_groups: &FoodGroupPortions,
) -> AnalysisAdjustments {
    AnalysisAdjustments {
        food_name: food_name.trim().to_string(),
        portion_size: portion_size.trim().to_string(),
        ingredients: parse_ingredients(ingredients_text),
        food_groups: clamp_groups(food_groups),
    }
}

/// Decide si el borrador difiere del análisis vigente: nombre y porción
/// recortados, igualdad de ingredientes sensible al orden, y cada uno de
/// los seis valores de grupo. Una sola diferencia basta.
pub fn has_changes(current: &FoodAnalysis, draft: &AnalysisAdjustments) -> bool {
    if current.food_name.trim() != draft.food_name.trim() {
        return true;
    }
    if current.portion_size.trim() != draft.portion_size.trim() {
        return true;
    }
    if current.ingredients != draft.ingredients {
        return true;
    }
    current
        .food_groups
        .entries()
        .iter()
        .zip(draft.food_groups.entries().iter())
        .any(|((_, a), (_, b))| a != b)
}
