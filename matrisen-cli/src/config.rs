use anyhow::Result;
use clap::ArgMatches;
use config::{Config as ConfigBuilder, Environment, File, FileFormat, Map};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete configuration that merges CLI args, env vars, config files, and defaults
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MatrisenConfig {
    /// Build configuration
    pub build: BuildConfig,
    /// Site configuration descriptor (from matrisen-core)
    #[serde(flatten)]
    pub site: matrisen_core::Config,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BuildConfig {
    /// Static assets copied into the output
    pub static_dir: String,
    /// Output directory for generated site
    pub output: String,
    /// Theme directory
    pub theme: String,
    /// Configuration file path
    pub config: String,
    /// Host for dev server
    pub host: String,
    /// Port for dev server
    pub port: u16,
    /// Open browser automatically
    pub open: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            static_dir: "./static".to_string(),
            output: "./build".to_string(),
            theme: "./theme".to_string(),
            config: "./matrisen.toml".to_string(),
            host: "127.0.0.1".to_string(),
            port: 3000,
            open: false,
        }
    }
}

impl MatrisenConfig {
    /// Load configuration with cascading precedence:
    /// 1. CLI arguments (highest priority)
    /// 2. Environment variables (MATRISEN_*)
    /// 3. Configuration file
    /// 4. Defaults (lowest priority)
    pub fn load(args: &ArgMatches) -> Result<Self> {
        Self::load_with_env(args, None)
    }

    /// Same as [`MatrisenConfig::load`], reading `MATRISEN_*` variables from
    /// `env` instead of the process environment when given.
    pub fn load_with_env(args: &ArgMatches, env: Option<Map<String, String>>) -> Result<Self> {
        let config_file = args
            .try_get_one::<String>("config")
            .ok()
            .flatten()
            .cloned()
            .unwrap_or_else(|| BuildConfig::default().config);

        let mut builder = ConfigBuilder::builder();

        let defaults = Self::default();
        builder = builder.add_source(ConfigBuilder::try_from(&defaults)?);

        if Path::new(&config_file).exists() {
            tracing::debug!(file = %config_file, "reading configuration file");
            builder = builder.add_source(File::new(&config_file, FileFormat::Toml));
        }

        builder = builder.add_source(
            Environment::with_prefix("MATRISEN")
                .prefix_separator("_")
                .separator("__")
                // Site values are flattened, so serde will not coerce strings for them
                .try_parsing(true)
                .source(env),
        );

        let mut cli_overrides = std::collections::HashMap::new();

        for (arg, key) in [
            ("static", "build.static_dir"),
            ("output", "build.output"),
            ("theme", "build.theme"),
            ("config", "build.config"),
            ("host", "build.host"),
        ] {
            // Only args defined for this subcommand
            if let Some(value) = args.try_get_one::<String>(arg).ok().flatten() {
                cli_overrides.insert(key.to_string(), value.clone());
            }
        }
        if let Some(port) = args.try_get_one::<String>("port").ok().flatten()
            && let Ok(port_num) = port.parse::<u16>()
        {
            cli_overrides.insert("build.port".to_string(), port_num.to_string());
        }
        if args.try_get_one::<bool>("open").ok().flatten() == Some(&true) {
            cli_overrides.insert("build.open".to_string(), "true".to_string());
        }

        if !cli_overrides.is_empty() {
            builder = builder.add_source(ConfigBuilder::try_from(&cli_overrides)?);
        }

        let config = builder.build()?;
        let matrisen_config: MatrisenConfig = config.try_deserialize()?;

        Ok(matrisen_config)
    }

    pub fn build_config(&self) -> &BuildConfig {
        &self.build
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{Arg, Command};

    #[test]
    fn test_default_config() {
        let config = MatrisenConfig::default();
        assert_eq!(config.build.static_dir, "./static");
        assert_eq!(config.build.output, "./build");
        assert_eq!(config.build.theme, "./theme");
        assert_eq!(config.build.port, 3000);
        assert_eq!(config.site.site.title, "Matrisen");
    }

    #[test]
    fn test_cli_args_override() {
        let app = Command::new("test")
            .arg(Arg::new("static").long("static").value_name("DIR"))
            .arg(Arg::new("output").long("output").value_name("DIR"))
            .arg(Arg::new("config").long("config").value_name("FILE"));

        let matches = app
            .try_get_matches_from(vec![
                "test",
                "--static",
                "/custom/static",
                "--output",
                "/custom/output",
                "--config",
                "/custom/missing.toml",
            ])
            .unwrap();

        let config = MatrisenConfig::load(&matches).unwrap();
        assert_eq!(config.build.static_dir, "/custom/static");
        assert_eq!(config.build.output, "/custom/output");
        // Should still have defaults for non-overridden values
        assert_eq!(config.build.theme, "./theme");
        assert_eq!(config.site.site.base_url, "/matrisen/");
    }

    #[test]
    fn test_env_vars_set_typed_and_string_values() {
        let app = Command::new("test").arg(Arg::new("config").long("config"));
        let matches = app
            .try_get_matches_from(vec!["test", "--config", "/custom/missing.toml"])
            .unwrap();

        let mut env = Map::new();
        env.insert("MATRISEN_SITE__TRAILING_SLASH".to_string(), "true".to_string());
        env.insert("MATRISEN_HOME__HERO".to_string(), "false".to_string());
        env.insert("MATRISEN_SITE__PROJECT_NAME".to_string(), "linalg".to_string());
        env.insert("MATRISEN_BUILD__PORT".to_string(), "4000".to_string());

        let config = MatrisenConfig::load_with_env(&matches, Some(env)).unwrap();
        assert_eq!(config.site.site.trailing_slash, Some(true));
        assert!(!config.site.home.hero);
        assert_eq!(config.site.site.project_name.as_deref(), Some("linalg"));
        assert_eq!(config.build.port, 4000);
        // Untouched values keep their defaults
        assert_eq!(config.site.site.title, "Matrisen");
    }

    #[test]
    fn test_config_file_sets_site_values() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("matrisen.toml");
        std::fs::write(
            &file,
            "[site]\ntitle = \"Other\"\n\n[build]\noutput = \"./dist\"\n",
        )
        .unwrap();

        let app = Command::new("test").arg(Arg::new("config").long("config"));
        let matches = app
            .try_get_matches_from(vec!["test", "--config", file.to_str().unwrap()])
            .unwrap();

        let config = MatrisenConfig::load(&matches).unwrap();
        assert_eq!(config.site.site.title, "Other");
        assert_eq!(config.site.site.tagline, "everything is tasty in the matrix");
        assert_eq!(config.build.output, "./dist");
    }
}
