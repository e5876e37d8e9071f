//! Homepage feature cards.
//!
//! A [`Feature`] describes one card: a title, an optional image and a short
//! markdown description. [`render_features`] turns an ordered list of them
//! into a responsive three-column row, one card per feature, keyed by
//! position. Rendering is a pure function of its inputs.

use std::path::Path;

use pulldown_cmark::{Options, Parser, html};
use serde::{Deserialize, Serialize};
use tera::Context;

use crate::config::SiteConfig;
use crate::template::{TemplateError, TemplateRenderer};

pub const FEATURES_TEMPLATE: &str = "features.html";

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ImageType {
    Svg,
    Jpg,
    Png,
}

impl ImageType {
    /// Guesses the format from a file extension.
    pub fn from_path(path: &str) -> Option<Self> {
        let ext = Path::new(path).extension()?.to_string_lossy().to_lowercase();
        match ext.as_str() {
            "svg" => Some(ImageType::Svg),
            "jpg" | "jpeg" => Some(ImageType::Jpg),
            "png" => Some(ImageType::Png),
            _ => None,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Feature {
    pub title: String,
    /// Path under the static directory, or an absolute URL.
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub image_type: Option<ImageType>,
    /// Markdown, rendered inline.
    #[serde(default)]
    pub description: String,
}

impl Feature {
    pub fn new(title: &str, image: &str, description: &str) -> Self {
        Self {
            title: title.into(),
            image: Some(image.into()),
            image_type: ImageType::from_path(image),
            description: description.into(),
        }
    }

    /// The image reference, if it is set to something non-blank.
    pub fn image(&self) -> Option<&str> {
        self.image.as_deref().filter(|image| !image.trim().is_empty())
    }

    pub fn image_type(&self) -> Option<ImageType> {
        self.image_type
            .or_else(|| self.image().and_then(ImageType::from_path))
    }
}

/// The three cards shown on the Matrisen homepage.
pub fn default_features() -> Vec<Feature> {
    vec![
        Feature::new(
            "Plot",
            "/img/3dplot.png",
            "placeholder image stolen from the internet.",
        ),
        Feature::new(
            "Render",
            "/img/teapot.png",
            "placeholder image stolen from the internet.",
        ),
        Feature::new(
            "Export",
            "/img/cube.png",
            "placeholder image stolen from the internet.",
        ),
    ]
}

/// Drops image references that do not exist under `static_dir`.
///
/// External URLs are kept as they are.
pub fn resolve_images(features: &[Feature], static_dir: &Path) -> Vec<Feature> {
    features
        .iter()
        .map(|feature| {
            let mut feature = feature.clone();
            if let Some(image) = feature.image()
                && !crate::config::is_external(image)
            {
                let file = static_dir.join(image.trim_start_matches('/'));
                if !file.is_file() {
                    tracing::warn!(
                        feature = %feature.title,
                        image = %file.display(),
                        "feature image not found, rendering card without it"
                    );
                    feature.image = None;
                }
            }
            feature
        })
        .collect()
}

#[derive(Serialize, Debug)]
struct FeatureCard<'a> {
    key: usize,
    title: &'a str,
    image: Option<String>,
    image_type: Option<ImageType>,
    description: Description,
}

/// Rendered description HTML. `inline` is set when it fits inside a `<p>`;
/// multi-paragraph text, lists and other blocks are not.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Description {
    pub html: String,
    pub inline: bool,
}

/// Renders one card per feature, in order.
pub fn render_features(
    renderer: &TemplateRenderer,
    site: &SiteConfig,
    features: &[Feature],
) -> Result<String, TemplateError> {
    let cards: Vec<FeatureCard> = features
        .iter()
        .enumerate()
        .map(|(key, feature)| FeatureCard {
            key,
            title: &feature.title,
            image: feature.image().map(|image| site.asset_url(image)),
            image_type: feature.image_type(),
            description: render_description(&feature.description),
        })
        .collect();

    let mut context = Context::new();
    context.insert("cards", &cards);

    renderer.render_with_context(FEATURES_TEMPLATE, &context)
}

/// Markdown to HTML. A lone wrapping paragraph is removed, leaving inline
/// markup for the card template to wrap itself.
pub fn render_description(markdown: &str) -> Description {
    let parser = Parser::new_ext(markdown, Options::ENABLE_STRIKETHROUGH);
    let mut out = String::new();
    html::push_html(&mut out, parser);

    let trimmed = out.trim_end();
    if trimmed.is_empty() {
        return Description {
            html: String::new(),
            inline: true,
        };
    }
    if let Some(inner) = trimmed
        .strip_prefix("<p>")
        .and_then(|rest| rest.strip_suffix("</p>"))
        && !inner.contains("<p>")
    {
        return Description {
            html: inner.to_string(),
            inline: true,
        };
    }

    Description {
        html: trimmed.to_string(),
        inline: false,
    }
}
