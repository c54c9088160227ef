//! Recap export rendering
//!
//! Renders a [`RecapRecord`] through a Tera HTML template, then converts it to
//! PDF with `wkhtmltopdf` when the tool is installed and enabled. Without it
//! the HTML page itself is the downloadable artifact.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use chrono::Utc;
use cotation_core::config::ExportConfig;
use cotation_core::formatting::grouped;
use cotation_core::recap::{RecapRecord, RecapRenderer, RenderError, RenderedDocument};
use rust_decimal::Decimal;
use tera::{Context, Tera};
use tokio::process::Command;
use tracing::{error, info, warn};

pub const RECAP_TEMPLATE: &str = "recap.html.tera";
const EMBEDDED_RECAP_TEMPLATE: &str = include_str!("../templates/recap.html.tera");
const PRIMARY_COLOR: &str = "#1d4ed8";

/// Register custom Tera filters used by recap templates.
///
/// - `money`: groups thousands of a two-decimal amount, e.g. `1540000.00` becomes
///   `1,540,000.00`. Any other value is passed through untouched.
pub fn register_template_filters(tera: &mut Tera) {
    tera.register_filter("money", tera_money_filter);
}

fn tera_money_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let formatted = match value {
        tera::Value::String(text) => money(text).unwrap_or_else(|| text.clone()),
        tera::Value::Number(number) => {
            let parsed = number.to_string().parse::<Decimal>().ok();
            parsed.map(|amount| grouped(amount, 2)).unwrap_or_else(|| number.to_string())
        }
        tera::Value::Null => String::new(),
        other => other.to_string(),
    };
    Ok(tera::Value::String(formatted))
}

fn money(text: &str) -> Option<String> {
    let (_, fraction) = text.split_once('.')?;
    if fraction.len() != 2 {
        return None;
    }
    text.parse::<Decimal>().ok().map(|amount| grouped(amount, 2))
}

pub struct PdfRecapRenderer {
    tera: Tera,
    wkhtmltopdf_path: Option<PathBuf>,
    company_name: String,
}

impl PdfRecapRenderer {
    pub fn new(config: &ExportConfig) -> Result<Self, RenderError> {
        let mut tera = match &config.template_dir {
            Some(dir) => load_template_dir(dir)?,
            None => embedded_templates()?,
        };
        register_template_filters(&mut tera);

        let wkhtmltopdf_path =
            if config.use_wkhtmltopdf { which::which("wkhtmltopdf").ok() } else { None };

        match &wkhtmltopdf_path {
            Some(path) => info!(
                event_name = "system.export.converter_found",
                correlation_id = "bootstrap",
                path = %path.display(),
                "wkhtmltopdf found, recaps are exported as PDF"
            ),
            None => warn!(
                event_name = "system.export.converter_missing",
                correlation_id = "bootstrap",
                "wkhtmltopdf unavailable or disabled, recaps are exported as HTML"
            ),
        }

        Ok(Self { tera, wkhtmltopdf_path, company_name: config.company_name.clone() })
    }

    pub fn produces_pdf(&self) -> bool {
        self.wkhtmltopdf_path.is_some()
    }

    pub fn render_html(&self, recap: &RecapRecord) -> Result<String, RenderError> {
        let mut context = Context::new();
        context.insert("recap", recap);
        context.insert("company_name", &self.company_name);
        context.insert("primary_color", PRIMARY_COLOR);
        context.insert("generated_at", &Utc::now().format("%d/%m/%Y %H:%M UTC").to_string());

        self.tera
            .render(RECAP_TEMPLATE, &context)
            .map_err(|error| RenderError::Template(error.to_string()))
    }

    async fn convert_html_to_pdf(
        &self,
        html: &str,
        wkhtmltopdf: &Path,
    ) -> Result<Vec<u8>, RenderError> {
        let temp_dir = std::env::temp_dir();
        let stem = uuid::Uuid::new_v4();
        let html_path = temp_dir.join(format!("recap_{stem}.html"));
        let pdf_path = temp_dir.join(format!("recap_{stem}.pdf"));

        tokio::fs::write(&html_path, html).await?;

        let output = Command::new(wkhtmltopdf)
            .args(["--page-size", "A4", "--encoding", "utf-8", "--quiet"])
            .args(["--margin-top", "10mm", "--margin-bottom", "10mm"])
            .args(["--margin-left", "10mm", "--margin-right", "10mm"])
            .arg(&html_path)
            .arg(&pdf_path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await;

        let result = match output {
            Ok(output) if output.status.success() => {
                tokio::fs::read(&pdf_path).await.map_err(RenderError::from)
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr).to_string();
                error!(
                    event_name = "export.pdf.conversion_failed",
                    stderr = %stderr,
                    "wkhtmltopdf failed"
                );
                Err(RenderError::Conversion(stderr))
            }
            Err(source) => Err(RenderError::Io(source)),
        };

        let _ = tokio::fs::remove_file(&html_path).await;
        let _ = tokio::fs::remove_file(&pdf_path).await;

        result
    }
}

#[async_trait]
impl RecapRenderer for PdfRecapRenderer {
    async fn render(&self, recap: &RecapRecord) -> Result<RenderedDocument, RenderError> {
        let html = self.render_html(recap)?;
        let stem = format!("cotation_{}", recap.product.id());

        if let Some(wkhtmltopdf) = &self.wkhtmltopdf_path {
            match self.convert_html_to_pdf(&html, wkhtmltopdf).await {
                Ok(bytes) => {
                    info!(
                        event_name = "export.pdf.generated",
                        size = bytes.len(),
                        "recap PDF generated"
                    );
                    return Ok(RenderedDocument {
                        content_type: "application/pdf".to_owned(),
                        file_name: format!("{stem}.pdf"),
                        bytes,
                    });
                }
                Err(error) => {
                    warn!(
                        event_name = "export.pdf.fallback_html",
                        error = %error,
                        "PDF conversion failed, falling back to HTML"
                    );
                }
            }
        }

        Ok(RenderedDocument {
            content_type: "text/html; charset=utf-8".to_owned(),
            file_name: format!("{stem}.html"),
            bytes: html.into_bytes(),
        })
    }
}

fn load_template_dir(dir: &Path) -> Result<Tera, RenderError> {
    let pattern = dir.join("**").join("*");
    let tera = Tera::new(&pattern.to_string_lossy())
        .map_err(|error| RenderError::Template(error.to_string()))?;
    if !tera.get_template_names().any(|name| name == RECAP_TEMPLATE) {
        return Err(RenderError::Template(format!(
            "template directory `{}` has no `{RECAP_TEMPLATE}`",
            dir.display()
        )));
    }
    Ok(tera)
}

fn embedded_templates() -> Result<Tera, RenderError> {
    let mut tera = Tera::default();
    tera.add_raw_template(RECAP_TEMPLATE, EMBEDDED_RECAP_TEMPLATE)
        .map_err(|error| RenderError::Template(error.to_string()))?;
    Ok(tera)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use cotation_core::config::ExportConfig;
    use cotation_core::recap::{RecapEntry, RecapRecord, RecapRenderer};
    use cotation_core::Product;

    use super::{money, PdfRecapRenderer};

    fn html_only() -> ExportConfig {
        ExportConfig {
            template_dir: None,
            use_wkhtmltopdf: false,
            company_name: "Assurances Test".to_owned(),
            retention_secs: 900,
            max_pending: 256,
        }
    }

    fn endowment_recap() -> RecapRecord {
        RecapRecord {
            product: Product::Endowment,
            product_name: Product::Endowment.display_name().to_owned(),
            inputs: vec![
                RecapEntry { label: "Choix".to_owned(), value: "H".to_owned() },
                RecapEntry { label: "Durée (années)".to_owned(), value: "20".to_owned() },
            ],
            results: vec![
                RecapEntry { label: "Capital acquis".to_owned(), value: "1540000.00".to_owned() },
                RecapEntry {
                    label: "Capital décès".to_owned(),
                    value: "20000000 + épargne constituée".to_owned(),
                },
            ],
        }
    }

    #[test]
    fn money_filter_groups_two_decimal_amounts_only() {
        assert_eq!(money("1540000.00").as_deref(), Some("1,540,000.00"));
        assert_eq!(money("0.001494"), None);
        assert_eq!(money("1985"), None);
    }

    #[tokio::test]
    async fn renders_html_when_conversion_is_disabled() {
        let renderer = PdfRecapRenderer::new(&html_only()).expect("embedded template loads");
        assert!(!renderer.produces_pdf());

        let document = renderer.render(&endowment_recap()).await.expect("render succeeds");
        assert_eq!(document.content_type, "text/html; charset=utf-8");
        assert_eq!(document.file_name, "cotation_fer_plus.html");

        let html = String::from_utf8(document.bytes).expect("utf-8 html");
        assert!(html.contains("Assurances Test"));
        assert!(html.contains("Capital acquis"));
        assert!(html.contains("1,540,000.00"));
        assert!(html.contains("20000000 + épargne constituée"));
    }

    #[test]
    fn missing_template_directory_is_reported() {
        let config = ExportConfig {
            template_dir: Some(PathBuf::from("/nonexistent/cotation/templates")),
            ..html_only()
        };
        assert!(PdfRecapRenderer::new(&config).is_err());
    }
}
