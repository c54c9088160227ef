use std::sync::Arc;
use std::time::Duration;

use cotation_core::config::{AppConfig, ConfigError, LoadOptions};
use cotation_core::rates::{RateTables, TableError};
use cotation_core::recap::{RecapRenderer, RenderError};
use cotation_core::{QuoteEngine, SessionStore};
use thiserror::Error;
use tracing::info;

use crate::chat::ExportStore;
use crate::pdf::PdfRecapRenderer;

pub struct Application {
    pub config: AppConfig,
    pub engine: QuoteEngine,
    pub sessions: Arc<SessionStore>,
    pub exports: Arc<ExportStore>,
    pub renderer: Arc<dyn RecapRenderer>,
    pub exports_pdf: bool,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("rate tables could not be loaded: {0}")]
    RateTables(#[source] TableError),
    #[error("recap renderer could not be initialized: {0}")]
    Renderer(#[source] RenderError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        tables_dir = %config.tables.dir.display(),
        "starting application bootstrap"
    );

    let tables = RateTables::load_dir(&config.tables.dir).map_err(BootstrapError::RateTables)?;
    for summary in tables.summary() {
        info!(
            event_name = "system.bootstrap.table_loaded",
            correlation_id = "bootstrap",
            product = %summary.product,
            keys = summary.keys,
            age_range = ?summary.age_range,
            "rate table loaded"
        );
    }

    let renderer = PdfRecapRenderer::new(&config.export).map_err(BootstrapError::Renderer)?;
    let engine = QuoteEngine::new(Arc::new(tables), config.clock());

    info!(
        event_name = "system.bootstrap.ready",
        correlation_id = "bootstrap",
        current_year = engine.current_year(),
        "quote engine ready"
    );

    let session_idle = Duration::from_secs(config.server.session_idle_secs);
    let exports = ExportStore::new(
        Duration::from_secs(config.export.retention_secs),
        config.export.max_pending,
    );

    Ok(Application {
        config,
        engine,
        sessions: Arc::new(SessionStore::new(session_idle)),
        exports: Arc::new(exports),
        exports_pdf: renderer.produces_pdf(),
        renderer: Arc::new(renderer),
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::PathBuf;

    use cotation_core::config::{AppConfig, ConfigOverrides, LoadOptions};

    use super::{bootstrap_with_config, Application};

    pub fn sample_tables_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../data/rates")
    }

    /// Options pinned to the repository sample tables and reference year 2025,
    /// ignoring any config file in the working directory.
    pub fn options(tables_dir: PathBuf) -> LoadOptions {
        LoadOptions {
            config_path: Some(PathBuf::from("/nonexistent/cotation.toml")),
            overrides: ConfigOverrides {
                tables_dir: Some(tables_dir),
                reference_year: Some(2025),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    /// Sample application exporting HTML recaps regardless of the host tools.
    pub async fn sample_application() -> Application {
        let mut config = match AppConfig::load(options(sample_tables_dir())) {
            Ok(config) => config,
            Err(error) => panic!("sample config failed to load: {error}"),
        };
        config.export.use_wkhtmltopdf = false;
        match bootstrap_with_config(config).await {
            Ok(app) => app,
            Err(error) => panic!("sample application failed to bootstrap: {error}"),
        }
    }
}
