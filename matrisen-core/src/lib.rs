pub mod builder;
pub mod config;
pub mod features;
pub mod template;

// Re-export main types
pub use builder::{BuildError, LiveReload, NavItem, RenderError, Site, SiteBuilder};
pub use config::{Config, ConfigError};
pub use features::{Description, Feature, ImageType, default_features, render_features};
pub use template::{TemplateError, TemplateRenderer};

use std::path::Path;

/// Validates `config` and writes the homepage into `output_dir`.
pub fn build_site(
    config: &Config,
    static_dir: &Path,
    output_dir: &Path,
    theme_dir: &Path,
    live_reload: Option<LiveReload>,
) -> Result<Site, BuildError> {
    let mut builder = SiteBuilder::new()
        .config(config.clone())
        .static_dir(static_dir)
        .output_dir(output_dir)
        .theme_dir(theme_dir);

    if let Some(live_reload) = live_reload {
        builder = builder.live_reload(live_reload);
    }

    let site = builder.build()?;
    site.render_all()?;

    Ok(site)
}
