//! Command line checks for names, manifests and configuration.

use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use registry_core::manifest::Versioned;
use registry_core::names::validate_tag;
use registry_core::{RegistryBuilder, RegistryConfig, SignedManifest, validate_repository_name};
use storage_driver::MemoryDriver;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "registry-tool", version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check a repository name against the naming grammar
    ValidateName { name: String },

    /// Check a tag against the tag grammar
    ValidateTag { tag: String },

    /// Print the content address of a manifest file
    Digest { path: Utf8PathBuf },

    /// Load a configuration file and resolve every handler it names
    CheckConfig { path: Utf8PathBuf },
}

fn run(command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::ValidateName { name } => {
            validate_repository_name(&name)?;
            println!("{name}: ok");
        }
        Command::ValidateTag { tag } => {
            validate_tag(&tag)?;
            println!("{tag}: ok");
        }
        Command::Digest { path } => {
            let payload = std::fs::read(&path)?;
            let version = Versioned::from_slice(&payload)?;
            tracing::debug!(%path, schema_version = version.schema_version, "read manifest");

            let manifest = SignedManifest::from_slice(&payload)?;
            if let Err(error) = manifest.validate() {
                tracing::warn!(%path, "manifest does not follow the naming grammar: {error}");
            }
            let preserved = manifest.to_bytes()? == payload.as_slice();
            println!("{}", manifest.digest()?);
            println!("raw bytes preserved: {preserved}");
        }
        Command::CheckConfig { path } => {
            let text = std::fs::read_to_string(&path)?;
            let config = RegistryConfig::from_toml(&text)?;
            RegistryBuilder::new()
                .driver(MemoryDriver::new())
                .config(config)
                .build()?;
            println!("{path}: ok");
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(args.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}
