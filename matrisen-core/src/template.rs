use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;
use tera::{Context, Tera, Value};

const BASE_TEMPLATE: &str = include_str!("../theme/base.html");
const HOME_TEMPLATE: &str = include_str!("../theme/home.html");
const FEATURES_TEMPLATE: &str = include_str!("../theme/features.html");

#[derive(Debug)]
pub enum TemplateError {
    TeraError(tera::Error),
    IoError(std::io::Error),
}

impl From<tera::Error> for TemplateError {
    fn from(err: tera::Error) -> Self {
        TemplateError::TeraError(err)
    }
}

impl From<std::io::Error> for TemplateError {
    fn from(err: std::io::Error) -> Self {
        TemplateError::IoError(err)
    }
}

impl std::fmt::Display for TemplateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TemplateError::TeraError(e) => write!(f, "Template error: {}", e),
            TemplateError::IoError(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for TemplateError {}

/// Tera wrapper holding the templates and the context shared by every page.
///
/// Autoescaping is off. Templates escape explicitly with the `text` and
/// `attr` filters, which leave `/` in URLs alone, and with `js` for values
/// placed inside inline scripts.
pub struct TemplateRenderer {
    tera: Tera,
    context: Context,
}

impl TemplateRenderer {
    /// Renderer over the built-in theme only.
    pub fn embedded() -> Result<Self, TemplateError> {
        let mut tera = Tera::default();
        add_builtin_templates(&mut tera)?;
        Ok(Self::from_tera(tera))
    }

    /// Renderer over `theme_path`. Templates found there replace the
    /// built-in ones with the same name; missing ones fall back.
    pub fn new<P: AsRef<Path>>(theme_path: P) -> Result<Self, TemplateError> {
        let theme_path = theme_path.as_ref();
        if !theme_path.is_dir() {
            tracing::debug!(theme = %theme_path.display(), "theme directory not found, using built-in theme");
            return Self::embedded();
        }

        let glob = format!("{}/**/*.html", theme_path.display());
        let mut tera = Tera::parse(&glob)?;

        let mut builtin = Tera::default();
        add_builtin_templates(&mut builtin)?;
        tera.extend(&builtin)?;

        tracing::debug!(theme = %theme_path.display(), "loaded theme");
        Ok(Self::from_tera(tera))
    }

    fn from_tera(mut tera: Tera) -> Self {
        tera.autoescape_on(vec![]);
        tera.register_filter("text", escape_text);
        tera.register_filter("attr", escape_attr);
        tera.register_filter("js", escape_js);

        Self {
            tera,
            context: Context::new(),
        }
    }

    /// Add a value to the context every render sees
    pub fn add_to_context<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) {
        self.context.insert(key, value);
    }

    /// Render a template with the shared context only
    pub fn render(&self, template: &str) -> Result<String, TemplateError> {
        Ok(self.tera.render(template, &self.context)?)
    }

    /// Render a template with page-specific values layered over the shared context
    pub fn render_with_context(
        &self,
        template: &str,
        context: &Context,
    ) -> Result<String, TemplateError> {
        let mut merged = self.context.clone();
        merged.extend(context.clone());
        Ok(self.tera.render(template, &merged)?)
    }
}

fn add_builtin_templates(tera: &mut Tera) -> Result<(), TemplateError> {
    tera.add_raw_templates(vec![
        ("base.html", BASE_TEMPLATE),
        ("home.html", HOME_TEMPLATE),
        ("features.html", FEATURES_TEMPLATE),
    ])?;
    Ok(())
}

fn value_as_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn escape_text(value: &Value, _: &HashMap<String, Value>) -> tera::Result<Value> {
    let raw = value_as_string(value);
    Ok(Value::String(html_escape::encode_text(&raw).into_owned()))
}

fn escape_attr(value: &Value, _: &HashMap<String, Value>) -> tera::Result<Value> {
    let raw = value_as_string(value);
    Ok(Value::String(
        html_escape::encode_double_quoted_attribute(&raw).into_owned(),
    ))
}

/// Quoted JS string literal that cannot close the surrounding `<script>`.
fn escape_js(value: &Value, _: &HashMap<String, Value>) -> tera::Result<Value> {
    let raw = value_as_string(value);
    let quoted = serde_json::to_string(&raw).map_err(tera::Error::json)?;
    let escaped = quoted
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029");
    Ok(Value::String(escaped))
}
