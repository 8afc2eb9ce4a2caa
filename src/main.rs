use std::path::{Path, PathBuf};
use std::process;

use anyhow::Result;
use clap::{App, Arg};
use log::error;
use quire::build::build_site;
use quire::config::{Config, BASE_PATH_VAR};

fn main() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .init();

    if let Err(e) = run() {
        error!("{:#}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let matches = App::new("quire")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Builds a static blog from a directory of markdown documents")
        .arg(
            Arg::with_name("project")
                .value_name("PROJECT_DIR")
                .help("The project directory (containing `content/`)")
                .default_value("."),
        )
        .arg(
            Arg::with_name("base-path")
                .long("base-path")
                .value_name("PATH")
                .env(BASE_PATH_VAR)
                .help("URL prefix for every generated link, e.g. `/my-blog`")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("output")
                .long("output")
                .short("o")
                .value_name("DIR")
                .help("Output directory [default: PROJECT_DIR/dist]")
                .takes_value(true),
        )
        .get_matches();

    // `default_value` guarantees a value.
    let project = Path::new(matches.value_of("project").unwrap_or("."));
    let mut config = Config::from_directory(project, matches.value_of("base-path"))?;
    if let Some(output) = matches.value_of("output") {
        config = config.with_output_directory(PathBuf::from(output));
    }

    build_site(&config)?;
    Ok(())
}
