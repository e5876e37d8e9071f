use chrono::Datelike;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tera::Context;
use walkdir::WalkDir;

use crate::config::{
    Config, ConfigError, FooterConfig, LinkTarget, NavPosition, NavbarConfig, SiteConfig,
};
use crate::features::{Feature, render_features, resolve_images};
use crate::template::{TemplateError, TemplateRenderer};

pub const HOME_TEMPLATE: &str = "home.html";

#[derive(Debug)]
pub enum BuildError {
    Config(ConfigError),
    TemplateError(TemplateError),
    IoError(std::io::Error),
    SerializationError(serde_json::Error),
    Render(RenderError),
}

impl From<ConfigError> for BuildError {
    fn from(err: ConfigError) -> Self {
        BuildError::Config(err)
    }
}

impl From<TemplateError> for BuildError {
    fn from(err: TemplateError) -> Self {
        BuildError::TemplateError(err)
    }
}

impl From<std::io::Error> for BuildError {
    fn from(err: std::io::Error) -> Self {
        BuildError::IoError(err)
    }
}

impl From<RenderError> for BuildError {
    fn from(err: RenderError) -> Self {
        BuildError::Render(err)
    }
}

impl From<serde_json::Error> for BuildError {
    fn from(err: serde_json::Error) -> Self {
        BuildError::SerializationError(err)
    }
}

impl std::fmt::Display for BuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildError::Config(e) => write!(f, "Config error: {}", e),
            BuildError::TemplateError(e) => write!(f, "Template error: {}", e),
            BuildError::IoError(e) => write!(f, "IO error: {}", e),
            BuildError::SerializationError(e) => write!(f, "Serialization error: {}", e),
            BuildError::Render(e) => write!(f, "Render error: {}", e),
        }
    }
}

impl std::error::Error for BuildError {}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct NavItem {
    pub text: String,
    pub link: String,
    pub external: bool,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
struct LogoView {
    alt: String,
    src: String,
}

#[derive(Debug, Serialize)]
struct NavbarView {
    title: String,
    home: String,
    logo: Option<LogoView>,
    left: Vec<NavItem>,
    right: Vec<NavItem>,
}

#[derive(Debug, Serialize)]
struct FooterGroupView {
    title: String,
    items: Vec<NavItem>,
}

#[derive(Debug, Serialize)]
struct FooterView {
    style: crate::config::FooterStyle,
    groups: Vec<FooterGroupView>,
    copyright: String,
}

/// Where the dev server listens for reload signals.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct LiveReload {
    pub host: String,
    pub port: u16,
    pub path: String,
}

pub struct SiteBuilder {
    config: Config,
    features: Option<Vec<Feature>>,
    output_dir: PathBuf,
    theme_dir: PathBuf,
    static_dir: Option<PathBuf>,
    live_reload: Option<LiveReload>,
    year: Option<i32>,
    custom: HashMap<String, serde_json::Value>,
}

impl Default for SiteBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SiteBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            features: None,
            output_dir: PathBuf::from("./build"),
            theme_dir: PathBuf::from("./theme"),
            static_dir: None,
            live_reload: None,
            year: None,
            custom: HashMap::new(),
        }
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Replaces the feature cards from `[home] features`.
    pub fn features(mut self, features: Vec<Feature>) -> Self {
        self.features = Some(features);
        self
    }

    pub fn output_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.output_dir = path.as_ref().to_path_buf();
        self
    }

    pub fn theme_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.theme_dir = path.as_ref().to_path_buf();
        self
    }

    /// Directory whose files are copied verbatim into the output and
    /// against which feature images are resolved.
    pub fn static_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.static_dir = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn live_reload(mut self, live_reload: LiveReload) -> Self {
        self.live_reload = Some(live_reload);
        self
    }

    /// Year substituted into the footer copyright. Defaults to the current one.
    pub fn year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn add_custom<T: Serialize>(mut self, key: &str, value: T) -> Result<Self, BuildError> {
        let json_value = serde_json::to_value(value)?;
        self.custom.insert(key.to_string(), json_value);
        Ok(self)
    }

    pub fn build(self) -> Result<Site, BuildError> {
        self.config.validate()?;

        let mut features = self
            .features
            .unwrap_or_else(|| self.config.home.features.clone());
        if let Some(static_dir) = &self.static_dir {
            features = resolve_images(&features, static_dir);
        }

        let mut renderer = TemplateRenderer::new(&self.theme_dir)?;

        let site = &self.config.site;
        let year = self.year.unwrap_or_else(|| chrono::Local::now().year());

        renderer.add_to_context("site", site);
        renderer.add_to_context("site_url", &site.site_url());
        renderer.add_to_context("favicon", &site.asset_url(&site.favicon));
        renderer.add_to_context(
            "custom_css",
            &self.config.theme.custom_css.as_deref().map(|css| site.asset_url(css)),
        );
        renderer.add_to_context(
            "social_image",
            &self
                .config
                .theme
                .image
                .as_deref()
                .map(|image| format!("{}{}", site.site_url(), image.trim_start_matches('/'))),
        );
        renderer.add_to_context("prism", &self.config.theme.prism);
        renderer.add_to_context("navbar", &navbar_view(site, &self.config.navbar));
        renderer.add_to_context("footer", &footer_view(site, &self.config.footer, year));
        renderer.add_to_context("live_reload", &self.live_reload);

        for (key, value) in &self.custom {
            renderer.add_to_context(key, value);
        }

        Ok(Site {
            config: self.config,
            features,
            renderer,
            output_dir: self.output_dir,
            static_dir: self.static_dir,
        })
    }
}

fn nav_item(site: &SiteConfig, text: &str, target: LinkTarget<'_>) -> NavItem {
    let (link, external) = match target {
        LinkTarget::Internal(to) => (site.resolve_link(to), false),
        LinkTarget::External(href) => (href.to_string(), true),
        LinkTarget::DocSidebar(_) => (site.resolve_link("/docs/"), false),
    };

    NavItem {
        text: text.to_string(),
        link,
        external,
    }
}

fn navbar_view(site: &SiteConfig, navbar: &NavbarConfig) -> NavbarView {
    let mut left = Vec::new();
    let mut right = Vec::new();

    for item in &navbar.items {
        // validate() guarantees a target
        let Some(target) = item.target() else {
            continue;
        };
        let nav = nav_item(site, &item.label, target);
        match item.position {
            NavPosition::Left => left.push(nav),
            NavPosition::Right => right.push(nav),
        }
    }

    NavbarView {
        title: navbar.title.clone(),
        home: site.base_url.clone(),
        logo: navbar.logo.as_ref().map(|logo| LogoView {
            alt: logo.alt.clone(),
            src: site.asset_url(&logo.src),
        }),
        left,
        right,
    }
}

fn footer_view(site: &SiteConfig, footer: &FooterConfig, year: i32) -> FooterView {
    let groups = footer
        .links
        .iter()
        .map(|group| FooterGroupView {
            title: group.title.clone(),
            items: group
                .items
                .iter()
                .filter_map(|item| item.target().map(|t| nav_item(site, &item.label, t)))
                .collect(),
        })
        .collect();

    FooterView {
        style: footer.style,
        groups,
        copyright: footer.copyright_for(year),
    }
}

#[derive(Debug)]
pub enum RenderError {
    TemplateError(TemplateError),
    IoError(std::io::Error),
}

impl From<TemplateError> for RenderError {
    fn from(err: TemplateError) -> Self {
        RenderError::TemplateError(err)
    }
}

impl From<std::io::Error> for RenderError {
    fn from(err: std::io::Error) -> Self {
        RenderError::IoError(err)
    }
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderError::TemplateError(e) => write!(f, "Template error: {}", e),
            RenderError::IoError(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for RenderError {}

pub struct Site {
    config: Config,
    features: Vec<Feature>,
    renderer: TemplateRenderer,
    output_dir: PathBuf,
    static_dir: Option<PathBuf>,
}

impl Site {
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Feature cards after image resolution.
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn render_home(&self) -> Result<String, RenderError> {
        let home = &self.config.home;
        let mut context = Context::new();

        let features_html = render_features(&self.renderer, &self.config.site, &self.features)?;
        context.insert("features_html", &features_html);
        context.insert("home", home);
        context.insert(
            "primary_action",
            &home.primary_action.as_ref().map(|action| NavItem {
                text: action.text.clone(),
                external: crate::config::is_external(&action.link),
                link: self.config.site.resolve_link(&action.link),
            }),
        );

        Ok(self.renderer.render_with_context(HOME_TEMPLATE, &context)?)
    }

    /// Copies static assets and writes `index.html` into the output directory.
    pub fn render_all(&self) -> Result<(), RenderError> {
        std::fs::create_dir_all(&self.output_dir)?;

        if let Some(static_dir) = &self.static_dir {
            let copied = copy_static(static_dir, &self.output_dir)?;
            tracing::debug!(files = copied, from = %static_dir.display(), "copied static assets");
        }

        let html = self.render_home()?;
        let output_path = self.output_dir.join("index.html");
        std::fs::write(&output_path, html)?;
        tracing::info!(path = %output_path.display(), cards = self.features.len(), "rendered homepage");

        Ok(())
    }
}

fn copy_static(static_dir: &Path, output_dir: &Path) -> Result<usize, std::io::Error> {
    if !static_dir.is_dir() {
        tracing::warn!(dir = %static_dir.display(), "static directory not found, skipping");
        return Ok(0);
    }

    let mut copied = 0;
    for entry in WalkDir::new(static_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
    {
        let Ok(relative) = entry.path().strip_prefix(static_dir) else {
            continue;
        };
        let target = output_dir.join(relative);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(entry.path(), &target)?;
        copied += 1;
    }

    Ok(copied)
}
