use std::sync::Arc;

use crate::config::AppConfig;
use crate::output::OutputDir;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub output: OutputDir,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let output = OutputDir::new(config.output_dir.clone());
        Self {
            config: Arc::new(config),
            output,
        }
    }
}
