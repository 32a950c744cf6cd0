//! OTA archive builder
//!
//! Builds the filesystem image, bundles it with the font and firmware and
//! writes a single archive ready for upload.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use ota_archive::config::DEFAULT_PIO_ENV;
use ota_archive::error::EXIT_FAILURE;
use ota_archive::{
    read_archive, run_build, ArchiveError, BuildConfig, BuildReport, CommandRunner, Encoding,
    NoopRunner,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "ota-archive")]
#[command(about = "Assemble sector-aligned OTA firmware archives")]
struct Args {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Build the filesystem image and assemble the archive
    Build {
        /// TOML build configuration (defaults to the PlatformIO layout)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// PlatformIO project root
        #[arg(long, default_value = ".")]
        project_root: PathBuf,

        /// PlatformIO environment
        #[arg(long, default_value = DEFAULT_PIO_ENV)]
        pio_env: String,

        /// Output encoding (overrides the config)
        #[arg(short, long, value_enum)]
        encoding: Option<EncodingArg>,

        /// Output path (overrides the config)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Do not run the filesystem-image build step
        #[arg(long)]
        skip_build: bool,

        /// Print the build report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Verify an archive and list its entries
    Inspect {
        /// Archive file
        path: PathBuf,

        /// Print the listing as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum EncodingArg {
    Raw,
    Compressed,
}

impl From<EncodingArg> for Encoding {
    fn from(arg: EncodingArg) -> Self {
        match arg {
            EncodingArg::Raw => Encoding::Raw,
            EncodingArg::Compressed => Encoding::Compressed,
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match args.command {
        Cmd::Build {
            config,
            project_root,
            pio_env,
            encoding,
            output,
            skip_build,
            json,
        } => build(
            config,
            project_root,
            &pio_env,
            encoding,
            output,
            skip_build,
            json,
        ),
        Cmd::Inspect { path, json } => inspect(path, json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{:#}", err);
            let code = err
                .downcast_ref::<ArchiveError>()
                .map(ArchiveError::exit_code)
                .unwrap_or(EXIT_FAILURE);
            ExitCode::from(code)
        }
    }
}

fn build(
    config_path: Option<PathBuf>,
    project_root: PathBuf,
    pio_env: &str,
    encoding: Option<EncodingArg>,
    output: Option<PathBuf>,
    skip_build: bool,
    json: bool,
) -> anyhow::Result<()> {
    let mut config = match &config_path {
        Some(path) => BuildConfig::load(path)?,
        None => BuildConfig::platformio(&project_root, pio_env),
    };
    if let Some(encoding) = encoding {
        config.encoding = encoding.into();
    }
    if let Some(output) = output {
        config.output = output;
    }

    info!(
        "Building {} archive at {}",
        config.encoding,
        config.output.display()
    );

    let report = if skip_build {
        run_build(&config, &NoopRunner)?
    } else {
        run_build(&config, &CommandRunner)?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &BuildReport) {
    for entry in &report.entries {
        println!(
            "{:<8} {:>10} -> {:>10}  md5 {}",
            entry.label, entry.original_len, entry.padded_len, entry.md5
        );
    }
    println!(
        "Made OTA archive at {} ({}, {} bytes, sha256 {})",
        report.output.display(),
        report.encoding,
        report.written_len,
        report.sha256
    );
}

fn inspect(path: PathBuf, json: bool) -> anyhow::Result<()> {
    let bytes =
        std::fs::read(&path).with_context(|| format!("reading archive '{}'", path.display()))?;
    let contents = read_archive(&bytes)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&contents)?);
        return Ok(());
    }

    println!(
        "{}: {} archive, {} raw bytes, {} entries",
        path.display(),
        contents.encoding,
        contents.raw_len,
        contents.entries.len()
    );
    for entry in &contents.entries {
        println!(
            "  @{:<8} {:<8} {:>10} -> {:>10}  md5 {}",
            entry.offset,
            entry.label,
            entry.original_len,
            entry.padded_len,
            ota_archive::checksum::to_hex(&entry.checksum)
        );
    }
    Ok(())
}
