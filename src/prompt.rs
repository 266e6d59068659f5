//! Construcción de las instrucciones en lenguaje natural para el modelo.
//! Funciones puras: mismo input, mismo prompt, sin I/O.

use crate::models::{AnalysisAdjustments, FoodAnalysis};

/// Prompt del análisis inicial: identificar el plato (con nombre
/// costarricense si aplica), estimar porción y calorías, desglosar por
/// grupo alimenticio, listar ingredientes, justificar cada estimación y
/// extraer el timestamp EXIF solo si existe.
pub fn build_initial_prompt(description: Option<&str>) -> String {
    let description_context = match cleaned(description) {
        Some(desc) => format!(
            "Contexto adicional proporcionado por el usuario sobre el plato: \"{desc}\". \
             Usa esta descripcion para mejorar la precision del analisis nutricional, \
             pero prioriza la evidencia visual de la imagen si hay conflicto."
        ),
        None => "No hay descripcion adicional del usuario para este plato.".to_string(),
    };

    format!(
        "Importante: el usuario es de Costa Rica. Teniendo esto en cuenta, realiza una \
         evaluacion nutricional de la comida en la imagen. Primero, identifica el plato \
         (si es un plato tipico costarricense como un casado, gallo pinto, etc., usa su \
         nombre local). Luego, estima el tamano de la porcion, proporciona un recuento de \
         calorias estimadas y, lo mas importante, desglosa el plato en porciones por grupo \
         alimenticio: harinas, vegetales, proteinas, frutas, leches y grasas. Finalmente, \
         lista los ingredientes principales. Incluye explicaciones claras y breves para \
         cada estimacion: tamano de porcion, calorias y cada grupo alimenticio, para que \
         el usuario pueda refinar facilmente el analisis. Adicionalmente, si la imagen \
         contiene metadatos EXIF, extrae la fecha y hora en que se tomo la foto \
         ('DateTimeOriginal') y devuelvela en formato ISO 8601. Si no hay datos EXIF de \
         fecha disponibles, omite por completo el campo del timestamp en la respuesta. \
         {description_context}"
    )
}

/// Prompt de reestimación: incluye el análisis vigente y los ajustes del
/// usuario serializados, con las reglas de precedencia explícitas (los
/// cambios del usuario mandan, la imagen valida coherencia, calorías y
/// grupos se recalculan, explicaciones obligatorias, JSON puro).
pub fn build_reestimate_prompt(
    current: &FoodAnalysis,
    adjustments: &AnalysisAdjustments,
    description: Option<&str>,
) -> String {
    let description_context = match cleaned(description) {
        Some(desc) => format!("Descripcion del usuario sobre el plato: \"{desc}\"."),
        None => "No hay descripcion adicional del usuario.".to_string(),
    };

    let current_json =
        serde_json::to_string(current).unwrap_or_else(|_| "{}".to_string());
    let adjustments_json =
        serde_json::to_string(adjustments).unwrap_or_else(|_| "{}".to_string());

    format!(
        "Recalcula el analisis nutricional del plato usando la imagen y los ajustes del usuario.\n\
         \n\
         Analisis original:\n\
         {current_json}\n\
         \n\
         Ajustes solicitados por el usuario:\n\
         {adjustments_json}\n\
         \n\
         Reglas:\n\
         1) Respeta los cambios del usuario en ingredientes y tamano de porcion como fuente prioritaria para el recalculo.\n\
         2) Usa la imagen para validar coherencia y corregir inconsistencias evidentes.\n\
         3) Reestima calorias y porciones por grupo alimenticio con base en los cambios.\n\
         4) Incluye explicaciones claras y breves para cada estimacion (porcion, calorias y cada grupo).\n\
         5) Devuelve JSON valido con la misma estructura requerida.\n\
         6) No incluyas texto fuera del JSON.\n\
         \n\
         {description_context}"
    )
}

fn cleaned(description: Option<&str>) -> Option<&str> {
    description.map(str::trim).filter(|d| !d.is_empty())
}
