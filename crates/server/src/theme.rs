//! Theme engine wrapping Tera templates.

use std::path::Path;

use anyhow::{Context, Result};
use tera::Tera;
use tracing::debug;

use crate::content::text;

/// Theme engine for rendering templates.
pub struct ThemeEngine {
    /// Tera template engine instance.
    tera: Tera,
}

impl ThemeEngine {
    /// Create a new theme engine loading templates from the given directory.
    pub fn new(template_dir: &Path) -> Result<Self> {
        let pattern = template_dir.join("**/*.html");
        let pattern_str = pattern
            .to_str()
            .context("invalid template directory path")?;

        let mut tera = Tera::new(pattern_str).context("failed to initialize Tera templates")?;

        // Register custom filters
        Self::register_filters(&mut tera);

        let template_names: Vec<_> = tera.get_template_names().collect();
        debug!(count = template_names.len(), "loaded templates");

        Ok(Self { tera })
    }

    /// Create a theme engine with no templates (for testing).
    pub fn empty() -> Result<Self> {
        let mut tera = Tera::default();
        Self::register_filters(&mut tera);
        Ok(Self { tera })
    }

    /// Register custom Tera filters.
    fn register_filters(tera: &mut Tera) {
        // Filter for formatting Unix timestamps as human-readable dates
        tera.register_filter(
            "format_date",
            |value: &tera::Value, _args: &std::collections::HashMap<String, tera::Value>| {
                let timestamp = match value {
                    tera::Value::Number(n) => n.as_i64().unwrap_or(0),
                    _ => return Ok(tera::Value::String(String::new())),
                };

                let formatted = chrono::DateTime::from_timestamp(timestamp, 0)
                    .map(|dt| dt.format("%B %-d, %Y").to_string())
                    .unwrap_or_else(|| "Unknown date".to_string());

                Ok(tera::Value::String(formatted))
            },
        );

        // Filter for estimated reading time in minutes
        tera.register_filter(
            "reading_time",
            |value: &tera::Value, _args: &std::collections::HashMap<String, tera::Value>| {
                let content = tera::try_get_value!("reading_time", "value", String, value);
                Ok(tera::Value::Number(text::reading_time(&content).into()))
            },
        );

        // Filter for a word-safe excerpt; `length` defaults to 200 characters
        tera.register_filter(
            "excerpt",
            |value: &tera::Value, args: &std::collections::HashMap<String, tera::Value>| {
                let content = tera::try_get_value!("excerpt", "value", String, value);
                let length = args
                    .get("length")
                    .and_then(tera::Value::as_u64)
                    .unwrap_or(200) as usize;

                Ok(tera::Value::String(text::excerpt(&content, length)))
            },
        );
    }

    /// Render a template by name.
    pub fn render(&self, template: &str, context: &tera::Context) -> Result<String> {
        self.tera
            .render(template, context)
            .with_context(|| format!("failed to render template: {template}"))
    }

}

impl std::fmt::Debug for ThemeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThemeEngine")
            .field("template_count", &self.tera.get_template_names().count())
            .finish()
    }
}
