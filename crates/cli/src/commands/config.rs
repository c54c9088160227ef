use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use cotation_core::config::{AppConfig, LoadOptions, DEFAULT_CONFIG_FILES};
use toml::Value;

struct Field {
    key_path: &'static str,
    env_keys: &'static [&'static str],
    value: String,
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in fields(&config) {
        let source = field_source(
            field.key_path,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key_path, &field.value, source));
    }

    lines.join("\n")
}

fn fields(config: &AppConfig) -> Vec<Field> {
    vec![
        Field {
            key_path: "tables.dir",
            env_keys: &["COTATION_TABLES_DIR"],
            value: config.tables.dir.display().to_string(),
        },
        Field {
            key_path: "quote.reference_year",
            env_keys: &["COTATION_QUOTE_REFERENCE_YEAR"],
            value: config
                .quote
                .reference_year
                .map(|year| year.to_string())
                .unwrap_or_else(|| "<system clock>".to_string()),
        },
        Field {
            key_path: "server.bind_address",
            env_keys: &["COTATION_SERVER_BIND_ADDRESS"],
            value: config.server.bind_address.clone(),
        },
        Field {
            key_path: "server.port",
            env_keys: &["COTATION_SERVER_PORT"],
            value: config.server.port.to_string(),
        },
        Field {
            key_path: "server.graceful_shutdown_secs",
            env_keys: &["COTATION_SERVER_GRACEFUL_SHUTDOWN_SECS"],
            value: config.server.graceful_shutdown_secs.to_string(),
        },
        Field {
            key_path: "server.session_idle_secs",
            env_keys: &["COTATION_SERVER_SESSION_IDLE_SECS"],
            value: config.server.session_idle_secs.to_string(),
        },
        Field {
            key_path: "export.template_dir",
            env_keys: &["COTATION_EXPORT_TEMPLATE_DIR"],
            value: config
                .export
                .template_dir
                .as_ref()
                .map(|dir| dir.display().to_string())
                .unwrap_or_else(|| "<embedded>".to_string()),
        },
        Field {
            key_path: "export.use_wkhtmltopdf",
            env_keys: &["COTATION_EXPORT_USE_WKHTMLTOPDF"],
            value: config.export.use_wkhtmltopdf.to_string(),
        },
        Field {
            key_path: "export.company_name",
            env_keys: &["COTATION_EXPORT_COMPANY_NAME"],
            value: config.export.company_name.clone(),
        },
        Field {
            key_path: "export.retention_secs",
            env_keys: &["COTATION_EXPORT_RETENTION_SECS"],
            value: config.export.retention_secs.to_string(),
        },
        Field {
            key_path: "export.max_pending",
            env_keys: &["COTATION_EXPORT_MAX_PENDING"],
            value: config.export.max_pending.to_string(),
        },
        Field {
            key_path: "logging.level",
            env_keys: &["COTATION_LOGGING_LEVEL", "COTATION_LOG_LEVEL"],
            value: config.logging.level.clone(),
        },
        Field {
            key_path: "logging.format",
            env_keys: &["COTATION_LOGGING_FORMAT", "COTATION_LOG_FORMAT"],
            value: format!("{:?}", config.logging.format),
        },
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    DEFAULT_CONFIG_FILES.into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    let set_env = env_keys
        .iter()
        .find(|key| env::var(key).is_ok_and(|value| !value.trim().is_empty()));
    if let Some(env_key) = set_env {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

#[cfg(test)]
mod tests {
    use toml::Value;

    use super::contains_path;

    #[test]
    fn nested_keys_are_found_in_config_documents() {
        let doc: Value = "[tables]\ndir = \"rates\"\n[quote]\n".parse().expect("valid toml");
        assert!(contains_path(&doc, "tables.dir"));
        assert!(contains_path(&doc, "quote"));
        assert!(!contains_path(&doc, "quote.reference_year"));
        assert!(!contains_path(&doc, "server.port"));
    }
}
