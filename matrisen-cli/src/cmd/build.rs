use anyhow::Result;
use clap::{Arg, ArgMatches, Command};
use std::path::Path;

use crate::config::MatrisenConfig;

pub fn add_build_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("static")
                .short('s')
                .long("static")
                .value_name("DIR")
                .help("Static assets copied into the site (images, favicon, css)"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("DIR")
                .help("Output directory for generated site"),
        )
        .arg(
            Arg::new("theme")
                .short('t')
                .long("theme")
                .value_name("DIR")
                .help("Theme directory overriding the built-in templates"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file [default: ./matrisen.toml]"),
        )
}

pub fn make_subcommand() -> Command {
    add_build_args(Command::new("build")).about("Build the site homepage")
}

pub fn execute(args: &ArgMatches) -> Result<()> {
    let config = MatrisenConfig::load(args)?;
    let build_config = config.build_config();

    let output_dir = Path::new(&build_config.output);

    let site = matrisen_core::build_site(
        &config.site,
        Path::new(&build_config.static_dir),
        output_dir,
        Path::new(&build_config.theme),
        None,
    )?;

    tracing::info!(
        title = %site.config().site.title,
        url = %site.config().site.site_url(),
        "site built successfully in {}",
        output_dir.display()
    );

    Ok(())
}
