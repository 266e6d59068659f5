//! Taxonomía de errores del análisis y de la persistencia en la hoja.
//!
//! Los tres primeros casos de `AnalysisError` son errores de dominio que
//! produce el normalizador; el cliente de análisis los propaga sin
//! reclasificar. El resto son fallos de transporte categorizados y llevan
//! el mensaje de usuario específico de la operación que los disparó.

use thiserror::Error;

/// Operación que originó la llamada al modelo; decide la redacción de los
/// mensajes de transporte (análisis inicial vs. reestimación).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Analyze,
    Reestimate,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("Análisis fallido: La IA no pudo identificar ninguna comida en la imagen. Por favor, intenta con una foto más clara o un ángulo diferente.")]
    EmptyResponse,

    #[error("Análisis fallido: La IA devolvió una respuesta en un formato inesperado. Por favor, inténtalo de nuevo.")]
    MalformedJson,

    #[error("Análisis fallido: La respuesta de la IA estaba incompleta. Por favor, inténtalo de nuevo.")]
    IncompleteResponse,

    #[error("{0}")]
    RateLimited(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    ServiceUnavailable(String),

    #[error("{0}")]
    Unknown(String),
}

impl AnalysisError {
    /// `true` para los errores que produce el normalizador. Se comprueban
    /// antes que la clasificación de transporte para que un error de dominio
    /// nunca termine reportado como "desconocido".
    pub fn is_domain(&self) -> bool {
        matches!(
            self,
            Self::EmptyResponse | Self::MalformedJson | Self::IncompleteResponse
        )
    }
}

/// Clasifica un fallo de transporte según el código HTTP equivalente,
/// con la redacción propia de cada operación. El orden de comprobación
/// (429, 400, 5xx, resto) es el mismo para ambos puntos de llamada.
pub fn classify_transport(op: Operation, status: Option<u16>) -> AnalysisError {
    match status {
        Some(429) => AnalysisError::RateLimited(match op {
            Operation::Analyze => {
                "¡Estás analizando demasiado rápido! Por favor, espera un momento antes de volver a intentarlo.".to_string()
            }
            Operation::Reestimate => {
                "¡Estás reestimando demasiado rápido! Espera un momento antes de intentarlo de nuevo.".to_string()
            }
        }),
        Some(400) => AnalysisError::InvalidInput(match op {
            Operation::Analyze => {
                "Análisis fallido: La imagen enviada podría ser inválida o no compatible. Por favor, intenta con una imagen diferente.".to_string()
            }
            Operation::Reestimate => {
                "Reestimación fallida: no se pudieron procesar los cambios. Revisa los datos e inténtalo otra vez.".to_string()
            }
        }),
        Some(code) if (500..600).contains(&code) => AnalysisError::ServiceUnavailable(
            "El servicio de análisis no está disponible temporalmente. Por favor, inténtalo de nuevo más tarde.".to_string(),
        ),
        _ => AnalysisError::Unknown(match op {
            Operation::Analyze => {
                "Ocurrió un error desconocido al analizar la imagen. Por favor, revisa tu conexión e inténtalo de nuevo.".to_string()
            }
            Operation::Reestimate => {
                "Ocurrió un error al reestimar la comida. Por favor, revisa tu conexión e inténtalo de nuevo.".to_string()
            }
        }),
    }
}

/// Fallos de la persistencia. Se reportan por separado de los errores de
/// análisis y nunca descartan el análisis ya mostrado.
#[derive(Debug, Error)]
pub enum SheetError {
    #[error("No se pudo conectar con el servidor. Revisa tu conexión e inténtalo de nuevo.")]
    Network(#[source] reqwest::Error),

    #[error("Respuesta inválida del servidor")]
    InvalidResponse,

    /// La hoja respondió pero con `status` distinto de `success`.
    #[error("{0}")]
    Rejected(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_429_siempre_es_rate_limited() {
        for op in [Operation::Analyze, Operation::Reestimate] {
            assert!(matches!(
                classify_transport(op, Some(429)),
                AnalysisError::RateLimited(_)
            ));
        }
    }

    #[test]
    fn status_400_es_entrada_invalida() {
        assert!(matches!(
            classify_transport(Operation::Analyze, Some(400)),
            AnalysisError::InvalidInput(_)
        ));
    }

    #[test]
    fn status_5xx_es_servicio_no_disponible() {
        for code in [500, 502, 503] {
            assert!(matches!(
                classify_transport(Operation::Reestimate, Some(code)),
                AnalysisError::ServiceUnavailable(_)
            ));
        }
    }

    #[test]
    fn sin_status_es_error_desconocido() {
        assert!(matches!(
            classify_transport(Operation::Analyze, None),
            AnalysisError::Unknown(_)
        ));
    }

    #[test]
    fn los_errores_de_dominio_se_distinguen() {
        assert!(AnalysisError::EmptyResponse.is_domain());
        assert!(AnalysisError::IncompleteResponse.is_domain());
        assert!(!classify_transport(Operation::Analyze, Some(429)).is_domain());
    }
}
