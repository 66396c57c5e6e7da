// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use docker_update::{ProcessEnv, Registry, SystemRunner, Updater};

use anyhow::Result;
use clap::Parser;
use std::{
    fs::OpenOptions,
    path::{Path, PathBuf},
    process::exit,
    sync::Mutex,
};
use tracing::{error, level_filters::LevelFilter};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Refresh Docker Compose services on a homelab machine.
#[derive(Debug, Clone, Parser)]
#[command(about, version)]
struct Cli {
    /// Name of machine to update.
    #[arg(short, long, alias = "machine_name", value_name = "name")]
    pub machine_name: String,

    /// Path to machine registry file to use instead of the built-in one.
    #[arg(short, long, value_name = "path")]
    pub config: Option<PathBuf>,

    /// Path to debug log file.
    #[arg(long, value_name = "path", default_value = "debug.log")]
    pub log_file: PathBuf,
}

impl Cli {
    fn run(self) -> Result<()> {
        let registry = Registry::discover(self.config)?;
        Updater::new(registry, SystemRunner::new()).update(&self.machine_name, &ProcessEnv)?;

        Ok(())
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(error) = init_logging(&cli.log_file) {
        eprintln!("{error:?}");
        exit(1);
    }

    if let Err(error) = cli.run() {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

fn init_logging(log_file: &Path) -> Result<()> {
    let console = fmt::layer().compact().with_target(false).with_filter(
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?,
    );

    let file = OpenOptions::new().create(true).append(true).open(log_file)?;
    let file = fmt::layer()
        .with_ansi(false)
        .with_target(false)
        .with_writer(Mutex::new(file))
        .with_filter(LevelFilter::DEBUG);

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .init();

    Ok(())
}
