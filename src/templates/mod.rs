use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;
use tokio::fs;
use tracing::info;

use crate::core::{PredictionError, PricePrediction};
use crate::encoding::EncodingTable;

const INDEX_TEMPLATE: &str = include_str!("../../templates/index.html");
const RESULT_TEMPLATE: &str = include_str!("../../templates/result.html");
const ERROR_TEMPLATE: &str = include_str!("../../templates/error.html");

/// Message shown for internal failures unless details are exposed.
pub const GENERIC_FAILURE_MESSAGE: &str =
    "Sorry, the price could not be computed right now. Please try again later.";

/// Pages rendered by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    Index,
    Result,
    Error,
}

impl View {
    pub const ALL: [View; 3] = [View::Index, View::Result, View::Error];

    pub fn file_name(&self) -> &'static str {
        match self {
            View::Index => "index.html",
            View::Result => "result.html",
            View::Error => "error.html",
        }
    }

    fn builtin(&self) -> &'static str {
        match self {
            View::Index => INDEX_TEMPLATE,
            View::Result => RESULT_TEMPLATE,
            View::Error => ERROR_TEMPLATE,
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Unclosed placeholder in {0}")]
    UnclosedPlaceholder(&'static str),

    #[error("No value for placeholder '{placeholder}' in {view}")]
    MissingValue {
        view: &'static str,
        placeholder: String,
    },
}

/// HTML view management: built-in pages with optional on-disk overrides.
pub struct TemplateManager {
    templates_dir: Option<PathBuf>,
    templates: HashMap<View, String>,
}

impl Default for TemplateManager {
    fn default() -> Self {
        Self::new(None)
    }
}

impl TemplateManager {
    pub fn new(templates_dir: Option<PathBuf>) -> Self {
        let templates = View::ALL
            .iter()
            .map(|view| (*view, view.builtin().to_string()))
            .collect();

        Self {
            templates_dir,
            templates,
        }
    }

    /// Replace built-in views with files found in the templates directory.
    pub async fn load_templates(&mut self) -> Result<()> {
        let Some(dir) = self.templates_dir.clone() else {
            return Ok(());
        };

        let metadata = fs::metadata(&dir)
            .await
            .with_context(|| format!("Templates directory {} is not accessible", dir.display()))?;
        if !metadata.is_dir() {
            anyhow::bail!("Templates path {} is not a directory", dir.display());
        }

        for view in View::ALL {
            let path = dir.join(view.file_name());
            let exists = fs::try_exists(&path)
                .await
                .with_context(|| format!("Failed to check template {}", path.display()))?;
            if exists {
                let content = fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("Failed to read template {}", path.display()))?;
                info!(template = %path.display(), "Using template override");
                self.templates.insert(view, content);
            }
        }

        Ok(())
    }

    /// Substitute `{{ name }}` placeholders. Values are inserted verbatim.
    pub fn render(&self, view: View, values: &HashMap<&str, String>) -> Result<String, TemplateError> {
        let template = self
            .templates
            .get(&view)
            .map(String::as_str)
            .unwrap_or_else(|| view.builtin());

        let mut output = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find("{{") {
            output.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let end = after
                .find("}}")
                .ok_or(TemplateError::UnclosedPlaceholder(view.file_name()))?;
            let name = after[..end].trim();
            let value = values.get(name).ok_or_else(|| TemplateError::MissingValue {
                view: view.file_name(),
                placeholder: name.to_string(),
            })?;
            output.push_str(value);
            rest = &after[end + 2..];
        }
        output.push_str(rest);

        Ok(output)
    }

    /// Landing page with the prediction form.
    pub fn render_index(
        &self,
        brands: &EncodingTable,
        transmissions: &EncodingTable,
    ) -> Result<String, TemplateError> {
        let values = HashMap::from([
            ("brand_options", select_options(brands)),
            ("transmission_options", select_options(transmissions)),
        ]);
        self.render(View::Index, &values)
    }

    pub fn render_prediction(&self, prediction: &PricePrediction) -> Result<String, TemplateError> {
        let values = HashMap::from([
            ("brand", escape_html(&prediction.brand)),
            ("year", prediction.year.to_string()),
            ("transmission", escape_html(&prediction.transmission)),
            ("engine", format!("{:?}", prediction.engine)),
            ("max_power", format!("{:?}", prediction.max_power)),
            ("predicted_price", format!("{:.2}", prediction.predicted_price)),
            ("request_id", prediction.request_id.to_string()),
        ]);
        self.render(View::Result, &values)
    }

    pub fn render_error(&self, message: &str) -> Result<String, TemplateError> {
        let values = HashMap::from([("error", escape_html(message))]);
        self.render(View::Error, &values)
    }
}

/// Text shown to the user for a failed prediction.
///
/// Input errors are always shown in full; internal failures only when `expose_internal` is set.
pub fn user_message(error: &PredictionError, expose_internal: bool) -> String {
    if error.is_user_error() || expose_internal {
        error.to_string()
    } else {
        GENERIC_FAILURE_MESSAGE.to_string()
    }
}

fn select_options(table: &EncodingTable) -> String {
    table
        .categories()
        .into_iter()
        .map(|name| {
            let name = escape_html(name);
            format!("            <option value=\"{}\">{}</option>", name, name)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
