//! Assemble the bootloader and signed images into a single image that can be
//! flashed on the device.

use std::path::PathBuf;

use anyhow::{Context, Result};
use assemble::Config;
use clap::{ArgAction, Parser};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "assemble", version, about, long_about = None)]
struct Args {
    /// Directory of built bootloader
    #[arg(short, long)]
    bootdir: PathBuf,

    /// Signed image file for primary image
    #[arg(short, long)]
    primary: PathBuf,

    /// Signed image file for secondary image
    #[arg(short, long)]
    secondary: Option<PathBuf>,

    /// Filename to write full image to
    #[arg(short, long)]
    output: PathBuf,

    /// Zephyr base containing the Zephyr repository
    #[arg(short, long, env = "ZEPHYR_BASE")]
    zephyr_base: Option<PathBuf>,

    /// Generated header describing the flash partitions, instead of the one
    /// found in the bootloader build
    #[arg(long, value_name = "HEADER")]
    partitions: Option<PathBuf>,

    /// Increase verbosity (-v, -vv).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Only report errors.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Args {
    fn level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // RUST_LOG, when set, overrides the command line.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = Config {
        bootdir: args.bootdir,
        primary: args.primary,
        secondary: args.secondary,
        output: args.output,
        partitions: args.partitions,
        zephyr_base: args.zephyr_base,
    };

    config
        .run()
        .with_context(|| format!("Unable to assemble {}", config.output.display()))?;
    Ok(())
}
