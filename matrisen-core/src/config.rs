use std::{fmt, path::Path};

use serde::{Deserialize, Serialize};

use crate::features::{Feature, default_features};

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parsing(toml::de::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parsing(e) => write!(f, "TOML parse error: {}", e),
            ConfigError::Invalid(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        ConfigError::Io(value)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        ConfigError::Parsing(value)
    }
}

/// The site configuration descriptor. Every section is optional in the
/// TOML file and falls back to the Matrisen defaults.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    pub docs: DocsConfig,
    pub blog: BlogConfig,
    pub theme: ThemeConfig,
    pub navbar: NavbarConfig,
    pub footer: FooterConfig,
    pub home: HomeConfig,
}

impl Config {
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&data)?;

        Ok(config)
    }

    /// Checks the values a site generator cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let site = &self.site;

        if !site.base_url.starts_with('/') || !site.base_url.ends_with('/') {
            return Err(ConfigError::Invalid(format!(
                "base_url must start and end with '/', got {:?}",
                site.base_url
            )));
        }

        let origin = site
            .url
            .strip_prefix("https://")
            .or_else(|| site.url.strip_prefix("http://"));
        match origin {
            Some(host) if !host.is_empty() && !host.trim_end_matches('/').contains('/') => {}
            _ => {
                return Err(ConfigError::Invalid(format!(
                    "url must be an http(s) origin without a path, got {:?}",
                    site.url
                )));
            }
        }

        if !site.i18n.locales.contains(&site.i18n.default_locale) {
            return Err(ConfigError::Invalid(format!(
                "default locale {:?} is not listed in i18n.locales",
                site.i18n.default_locale
            )));
        }

        for item in &self.navbar.items {
            if item.target().is_none() {
                return Err(ConfigError::Invalid(format!(
                    "navbar item {:?} needs exactly one of to, href or doc_sidebar",
                    item.label
                )));
            }
        }

        for group in &self.footer.links {
            for item in &group.items {
                if item.target().is_none() {
                    return Err(ConfigError::Invalid(format!(
                        "footer item {:?} in {:?} needs exactly one of to or href",
                        item.label, group.title
                    )));
                }
            }
        }

        Ok(())
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReportingSeverity {
    Ignore,
    Log,
    #[default]
    Warn,
    Throw,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SiteConfig {
    pub title: String,
    pub tagline: String,
    pub favicon: String,
    /// Production origin, e.g. `https://kniv0gaffel.github.io`.
    pub url: String,
    /// Path the site is served under. Always starts and ends with `/`.
    pub base_url: String,
    pub organization_name: Option<String>,
    pub project_name: Option<String>,
    pub deployment_branch: Option<String>,
    pub trailing_slash: Option<bool>,
    pub on_broken_links: ReportingSeverity,
    pub on_broken_markdown_links: ReportingSeverity,
    pub i18n: I18nConfig,
    pub stylesheets: Vec<Stylesheet>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Matrisen".into(),
            tagline: "everything is tasty in the matrix".into(),
            favicon: "favicon.ico".into(),
            url: "https://kniv0gaffel.github.io".into(),
            base_url: "/matrisen/".into(),
            organization_name: Some("kniv0gaffel".into()),
            project_name: Some("matrisen".into()),
            deployment_branch: Some("pages".into()),
            trailing_slash: Some(false),
            on_broken_links: ReportingSeverity::Throw,
            on_broken_markdown_links: ReportingSeverity::Warn,
            i18n: I18nConfig::default(),
            stylesheets: vec![
                Stylesheet {
                    href: "https://cdn.jsdelivr.net/npm/katex@0.13.24/dist/katex.min.css".into(),
                    kind: "text/css".into(),
                    integrity: Some(
                        "sha384-odtC+0UGzzFL/6PNoE8rX/SPcQDXBJ+uRepguP4QkPCm2LBxH3FA3y+fKSiJ+AmM"
                            .into(),
                    ),
                    crossorigin: Some("anonymous".into()),
                },
                Stylesheet::css("https://fonts.googleapis.com/css?family=DM Sans"),
                Stylesheet::css("https://fonts.googleapis.com/css?family=DM Mono"),
            ],
        }
    }
}

impl SiteConfig {
    /// Canonical address of the site root.
    pub fn site_url(&self) -> String {
        format!("{}{}", self.url.trim_end_matches('/'), self.base_url)
    }

    /// Resolves a link target for use in generated markup. Internal paths
    /// are placed under `base_url`; external URLs pass through untouched.
    pub fn resolve_link(&self, target: &str) -> String {
        if is_external(target) {
            return target.to_string();
        }

        let mut link = format!("{}{}", self.base_url, target.trim_start_matches('/'));
        match self.trailing_slash {
            Some(true) if !link.ends_with('/') => link.push('/'),
            Some(false) if link != self.base_url => {
                while link.ends_with('/') && link.len() > 1 {
                    link.pop();
                }
            }
            _ => {}
        }

        link
    }

    /// Resolves a path to a file under the static directory.
    pub fn asset_url(&self, path: &str) -> String {
        if is_external(path) {
            return path.to_string();
        }
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }
}

pub fn is_external(target: &str) -> bool {
    target.starts_with("http://")
        || target.starts_with("https://")
        || target.starts_with("//")
        || target.starts_with("mailto:")
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct I18nConfig {
    pub default_locale: String,
    pub locales: Vec<String>,
}

impl Default for I18nConfig {
    fn default() -> Self {
        Self {
            default_locale: "en".into(),
            locales: vec!["en".into()],
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Stylesheet {
    pub href: String,
    #[serde(rename = "type", default = "default_stylesheet_type")]
    pub kind: String,
    pub integrity: Option<String>,
    pub crossorigin: Option<String>,
}

impl Stylesheet {
    pub fn css<S: Into<String>>(href: S) -> Self {
        Self {
            href: href.into(),
            kind: default_stylesheet_type(),
            integrity: None,
            crossorigin: None,
        }
    }
}

fn default_stylesheet_type() -> String {
    "text/css".into()
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct DocsConfig {
    pub sidebar_path: String,
    pub edit_url: Option<String>,
    /// Enables the math plugins (remark-math and katex).
    pub math: bool,
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            sidebar_path: "./sidebars.ts".into(),
            edit_url: Some("https://github.com/kniv0gaffel/matrisen".into()),
            math: true,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct BlogConfig {
    pub show_reading_time: bool,
    pub edit_url: Option<String>,
    pub math: bool,
}

impl Default for BlogConfig {
    fn default() -> Self {
        Self {
            show_reading_time: true,
            edit_url: Some("https://github.com/kniv0gaffel/matrisen".into()),
            math: true,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ThemeConfig {
    pub custom_css: Option<String>,
    /// Social card image.
    pub image: Option<String>,
    pub prism: PrismConfig,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            custom_css: Some("css/custom.css".into()),
            image: Some("img/docusaurus.png".into()),
            prism: PrismConfig::default(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PrismConfig {
    pub theme: String,
    pub dark_theme: String,
}

impl Default for PrismConfig {
    fn default() -> Self {
        Self {
            theme: "github".into(),
            dark_theme: "materialDark".into(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NavPosition {
    #[default]
    Left,
    Right,
}

/// Where a navbar or footer link points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget<'a> {
    Internal(&'a str),
    External(&'a str),
    /// First page of a docs sidebar; rendered as the docs root.
    DocSidebar(&'a str),
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct NavbarItem {
    pub label: String,
    pub to: Option<String>,
    pub href: Option<String>,
    pub doc_sidebar: Option<String>,
    #[serde(default)]
    pub position: NavPosition,
}

impl NavbarItem {
    /// The single target of this item, or `None` when zero or several are set.
    pub fn target(&self) -> Option<LinkTarget<'_>> {
        match (&self.to, &self.href, &self.doc_sidebar) {
            (Some(to), None, None) => Some(LinkTarget::Internal(to)),
            (None, Some(href), None) => Some(LinkTarget::External(href)),
            (None, None, Some(id)) => Some(LinkTarget::DocSidebar(id)),
            _ => None,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Logo {
    pub alt: String,
    pub src: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct NavbarConfig {
    pub title: String,
    pub logo: Option<Logo>,
    pub items: Vec<NavbarItem>,
}

impl Default for NavbarConfig {
    fn default() -> Self {
        Self {
            title: "Home".into(),
            logo: Some(Logo {
                alt: "My Site Logo".into(),
                src: "img/docusaurus.png".into(),
            }),
            items: vec![
                NavbarItem {
                    label: "Guide".into(),
                    to: None,
                    href: None,
                    doc_sidebar: Some("tutorialSidebar".into()),
                    position: NavPosition::Left,
                },
                NavbarItem {
                    label: "Blog".into(),
                    to: Some("/blog".into()),
                    href: None,
                    doc_sidebar: None,
                    position: NavPosition::Left,
                },
                NavbarItem {
                    label: "GitHub".into(),
                    to: None,
                    href: Some("https://github.com/kniv0gaffel/matrisen".into()),
                    doc_sidebar: None,
                    position: NavPosition::Right,
                },
            ],
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FooterStyle {
    #[default]
    Dark,
    Light,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct FooterItem {
    pub label: String,
    pub to: Option<String>,
    pub href: Option<String>,
}

impl FooterItem {
    pub fn internal(label: &str, to: &str) -> Self {
        Self {
            label: label.into(),
            to: Some(to.into()),
            href: None,
        }
    }

    pub fn external(label: &str, href: &str) -> Self {
        Self {
            label: label.into(),
            to: None,
            href: Some(href.into()),
        }
    }

    pub fn target(&self) -> Option<LinkTarget<'_>> {
        match (&self.to, &self.href) {
            (Some(to), None) => Some(LinkTarget::Internal(to)),
            (None, Some(href)) => Some(LinkTarget::External(href)),
            _ => None,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct FooterGroup {
    pub title: String,
    #[serde(default)]
    pub items: Vec<FooterItem>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct FooterConfig {
    pub style: FooterStyle,
    pub links: Vec<FooterGroup>,
    /// `{year}` is replaced with the build year.
    pub copyright: String,
}

impl Default for FooterConfig {
    fn default() -> Self {
        Self {
            style: FooterStyle::Dark,
            links: vec![
                FooterGroup {
                    title: "Read the Docs".into(),
                    items: vec![
                        FooterItem::internal("Guide", "/docs/category/guide"),
                        FooterItem::internal("API Reference", "/docs/category/reference"),
                    ],
                },
                FooterGroup {
                    title: "Community".into(),
                    items: vec![
                        FooterItem::external(
                            "Stack Overflow",
                            "https://stackoverflow.com/questions/tagged/docusaurus",
                        ),
                        FooterItem::external("Discord", "https://discordapp.com/invite/docusaurus"),
                        FooterItem::external("Twitter", "https://twitter.com/docusaurus"),
                    ],
                },
                FooterGroup {
                    title: "More".into(),
                    items: vec![
                        FooterItem::internal("Blog", "/blog"),
                        FooterItem::external("GitHub", "https://github.com/kniv0gaffel/matrisen"),
                    ],
                },
            ],
            copyright: "Version 0.0.1 Copyright © {year} kniv0gaffel. Built with Docusaurus."
                .into(),
        }
    }
}

impl FooterConfig {
    pub fn copyright_for(&self, year: i32) -> String {
        self.copyright.replace("{year}", &year.to_string())
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct HomeConfig {
    pub hero: bool,
    pub primary_action: Option<Link>,
    pub features: Vec<Feature>,
}

impl Default for HomeConfig {
    fn default() -> Self {
        Self {
            hero: true,
            primary_action: Some(Link {
                text: "Guide".into(),
                link: "/docs/category/guide".into(),
            }),
            features: default_features(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct Link {
    pub text: String,
    pub link: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_describe_matrisen() {
        let config = Config::default();
        assert_eq!(config.site.title, "Matrisen");
        assert_eq!(config.site.base_url, "/matrisen/");
        assert_eq!(config.site.on_broken_links, ReportingSeverity::Throw);
        assert_eq!(config.navbar.items.len(), 3);
        assert_eq!(config.footer.links.len(), 3);
        assert_eq!(config.home.features.len(), 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [site]
            title = "Other"
            base_url = "/"

            [[navbar.items]]
            label = "Docs"
            to = "/docs"
            position = "right"
            "#,
        )
        .unwrap();

        assert_eq!(config.site.title, "Other");
        assert_eq!(config.site.tagline, "everything is tasty in the matrix");
        assert_eq!(config.navbar.items.len(), 1);
        assert_eq!(config.navbar.items[0].position, NavPosition::Right);
        assert_eq!(config.footer, FooterConfig::default());
    }

    #[test]
    fn test_validate_rejects_bad_base_url() {
        let mut config = Config::default();
        config.site.base_url = "matrisen".into();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_url_with_path() {
        let mut config = Config::default();
        config.site.url = "https://example.com/matrisen".into();
        assert!(config.validate().is_err());

        config.site.url = "ftp://example.com".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_default_locale() {
        let mut config = Config::default();
        config.site.i18n.default_locale = "nb".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_ambiguous_nav_item() {
        let mut config = Config::default();
        config.navbar.items[1].href = Some("https://example.com".into());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Blog"));
    }

    #[test]
    fn test_validate_rejects_footer_item_without_target() {
        let mut config = Config::default();
        config.footer.links[0].items[0].to = None;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_resolve_link() {
        let site = SiteConfig::default();
        assert_eq!(site.resolve_link("/blog"), "/matrisen/blog");
        assert_eq!(site.resolve_link("/docs/category/guide/"), "/matrisen/docs/category/guide");
        assert_eq!(site.resolve_link("/"), "/matrisen/");
        assert_eq!(
            site.resolve_link("https://github.com/kniv0gaffel/matrisen"),
            "https://github.com/kniv0gaffel/matrisen"
        );

        let site = SiteConfig {
            trailing_slash: Some(true),
            ..SiteConfig::default()
        };
        assert_eq!(site.resolve_link("/blog"), "/matrisen/blog/");
    }

    #[test]
    fn test_site_url_and_assets() {
        let site = SiteConfig::default();
        assert_eq!(site.site_url(), "https://kniv0gaffel.github.io/matrisen/");
        assert_eq!(site.asset_url("/img/cube.png"), "/matrisen/img/cube.png");
        assert_eq!(site.asset_url("img/cube.png"), "/matrisen/img/cube.png");
    }

    #[test]
    fn test_copyright_year() {
        let footer = FooterConfig::default();
        assert_eq!(
            footer.copyright_for(2026),
            "Version 0.0.1 Copyright © 2026 kniv0gaffel. Built with Docusaurus."
        );
    }

    #[test]
    fn test_nav_item_target() {
        let items = NavbarConfig::default().items;
        assert_eq!(items[0].target(), Some(LinkTarget::DocSidebar("tutorialSidebar")));
        assert_eq!(items[1].target(), Some(LinkTarget::Internal("/blog")));
        assert!(matches!(items[2].target(), Some(LinkTarget::External(_))));
    }
}
