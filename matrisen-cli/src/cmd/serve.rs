use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use matrisen_core::{LiveReload, build_site};
use matrisen_dev_server::{LIVERELOAD_PATH, PreviewConfig, PreviewServer};
use notify_debouncer_mini::notify::{RecursiveMode, Watcher};
use notify_debouncer_mini::{DebounceEventResult, new_debouncer};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::MatrisenConfig;

pub fn make_subcommand() -> Command {
    super::build::add_build_args(Command::new("serve"))
        .about("Start development server with live reload")
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .value_name("PORT")
                .help("Port to serve on [default: 3000]"),
        )
        .arg(
            Arg::new("host")
                .long("host")
                .value_name("HOST")
                .help("Host to bind to [default: 127.0.0.1]"),
        )
        .arg(
            Arg::new("open")
                .long("open")
                .help("Open browser automatically")
                .action(clap::ArgAction::SetTrue),
        )
}

fn live_reload(config: &MatrisenConfig) -> LiveReload {
    LiveReload {
        host: config.build.host.clone(),
        port: config.build.port,
        path: LIVERELOAD_PATH.to_string(),
    }
}

fn rebuild(config: &MatrisenConfig) -> Result<()> {
    let build_config = config.build_config();
    build_site(
        &config.site,
        Path::new(&build_config.static_dir),
        Path::new(&build_config.output),
        Path::new(&build_config.theme),
        Some(live_reload(config)),
    )?;
    Ok(())
}

pub async fn execute(args: &ArgMatches) -> Result<()> {
    let config = MatrisenConfig::load(args)?;
    let build_config = config.build_config();

    rebuild(&config)?;

    // The preview server watches the output dir and signals reloads itself
    let server = PreviewServer::new(PreviewConfig {
        host: build_config.host.clone(),
        port: build_config.port,
        root: PathBuf::from(&build_config.output),
        open: build_config.open,
        ignore: vec![".git".to_string(), "*.tmp".to_string()],
    });
    let watcher = watch_inputs(config, args.clone());
    run_until_first_exit(server.run(), watcher).await
}

/// Runs the preview server and the input watcher side by side. Whichever
/// stops first ends the command, carrying its error out.
async fn run_until_first_exit<S, W>(server: S, watcher: W) -> Result<()>
where
    S: Future<Output = Result<()>> + Send + 'static,
    W: Future<Output = Result<()>> + Send + 'static,
{
    let mut server = tokio::spawn(server);
    let mut watcher = tokio::spawn(watcher);

    let result = tokio::select! {
        res = &mut server => res
            .map_err(anyhow::Error::from)
            .and_then(|r| r.context("dev server stopped")),
        res = &mut watcher => res
            .map_err(anyhow::Error::from)
            .and_then(|r| r.context("input watcher stopped")),
    };

    server.abort();
    watcher.abort();

    result
}

/// Rebuilds the homepage whenever the config file, theme or static assets change.
async fn watch_inputs(mut config: MatrisenConfig, args: ArgMatches) -> Result<()> {
    let static_dir = PathBuf::from(&config.build.static_dir);
    let theme_dir = PathBuf::from(&config.build.theme);
    let config_file = PathBuf::from(&config.build.config);

    let (tx, mut rx) = tokio::sync::mpsc::channel(100);

    let mut debouncer = new_debouncer(Duration::from_millis(500), move |res: DebounceEventResult| {
        if let Ok(events) = res {
            for event in events {
                let _ = tx.blocking_send(event.path);
            }
        }
    })?;

    for (dir, what) in [(&static_dir, "static"), (&theme_dir, "theme")] {
        if dir.exists() {
            debouncer.watcher().watch(dir, RecursiveMode::Recursive)?;
            tracing::info!("watching {} directory: {}", what, dir.display());
        }
    }
    if config_file.exists() {
        debouncer
            .watcher()
            .watch(&config_file, RecursiveMode::NonRecursive)?;
        tracing::info!("watching config file: {}", config_file.display());
    }

    let abs_static = static_dir.canonicalize().unwrap_or(static_dir.clone());
    let abs_theme = theme_dir.canonicalize().unwrap_or(theme_dir.clone());
    let abs_config = config_file.canonicalize().unwrap_or(config_file.clone());

    while let Some(path) = rx.recv().await {
        let abs_path = path.canonicalize().unwrap_or(path.clone());
        let config_changed = abs_path == abs_config;

        if !config_changed && !abs_path.starts_with(&abs_static) && !abs_path.starts_with(&abs_theme) {
            tracing::debug!("skipping change outside inputs: {}", path.display());
            continue;
        }

        tracing::info!("input changed: {}", path.display());

        if config_changed {
            match MatrisenConfig::load(&args) {
                Ok(reloaded) => config = reloaded,
                Err(e) => {
                    tracing::error!("config reload failed, keeping previous: {}", e);
                    continue;
                }
            }
        }

        // The preview server picks up the new output and reloads clients
        match rebuild(&config) {
            Ok(()) => tracing::info!("site rebuilt"),
            Err(e) => tracing::error!("build error: {}", e),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_server_failure_ends_serve() {
        let server = async { Err(anyhow::anyhow!("address in use")) };
        let watcher = std::future::pending::<Result<()>>();

        let err = run_until_first_exit(server, watcher).await.unwrap_err();
        assert!(format!("{:#}", err).contains("address in use"));
        assert!(err.to_string().contains("dev server stopped"));
    }

    #[tokio::test]
    async fn test_watcher_failure_ends_serve() {
        let server = std::future::pending::<Result<()>>();
        let watcher = async { Err(anyhow::anyhow!("watch limit reached")) };

        let err = run_until_first_exit(server, watcher).await.unwrap_err();
        assert!(err.to_string().contains("input watcher stopped"));
    }
}
