use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;

use crate::{config::AppConfig, gemini::GeminiAnalyzer, sheet::SheetClient};

/// Estado compartido de la aplicación. Los clientes son puros y sin estado
/// mutable: el "análisis vigente" pertenece a cada sesión del frontend, no
/// al servidor, así que los handlers pueden correr concurrentemente.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub analyzer: GeminiAnalyzer,
    pub sheet: SheetClient,
    pub shutdown_sender: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}
