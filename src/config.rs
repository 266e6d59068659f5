//! Carga y gestión de configuración de la aplicación (Gemini + hoja).

use std::env;

use anyhow::{anyhow, Result};

/// Configuración completa de la aplicación.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub sheet_webhook_url: String,
    pub server_addr: String,
}

impl AppConfig {
    /// Carga la configuración desde variables de entorno (usando .env si
    /// existe). La credencial de Gemini y la URL del webhook son
    /// obligatorias: su ausencia es un error fatal de arranque.
    pub fn from_env() -> Result<Self> {
        let gemini_api_key = env::var("GEMINI_API_KEY")
            .map_err(|_| anyhow!("Falta GEMINI_API_KEY en el entorno"))?;
        if gemini_api_key.is_empty() || gemini_api_key == "ENTER_YOUR_API_KEY_HERE" {
            return Err(anyhow!(
                "GEMINI_API_KEY no está configurada. Añádela a tu fichero .env"
            ));
        }

        let sheet_webhook_url = env::var("SHEET_WEBHOOK_URL")
            .map_err(|_| anyhow!("Falta SHEET_WEBHOOK_URL en el entorno"))?;

        let gemini_model =
            env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-2.5-flash".to_string());
        let server_addr =
            env::var("SERVER_ADDR").unwrap_or_else(|_| "127.0.0.1:3344".to_string());

        Ok(Self {
            gemini_api_key,
            gemini_model,
            sheet_webhook_url,
            server_addr,
        })
    }
}
