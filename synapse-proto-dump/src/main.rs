//! synapse-proto-dump: Print the package definition built from a schema
//!
//! Reads `.proto` files (or a binary/JSON `FileDescriptorSet`) and prints a
//! JSON summary of every service, message and enum the loader produces.

use clap::Parser;
use std::path::PathBuf;
use synapse_proto_loader::{
    Options, PackageDefinition, load_file_descriptor_set_from_buffer,
    load_file_descriptor_set_from_json, load_sync,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod summary;

#[derive(Parser, Debug)]
#[command(name = "synapse-proto-dump")]
#[command(about = "Print the package definition built from proto files or descriptor sets")]
struct Args {
    /// Input proto file(s)
    #[arg(required_unless_present = "descriptor_set")]
    input: Vec<PathBuf>,

    /// Proto include paths for imports
    #[arg(short = 'I', long = "proto-path")]
    proto_paths: Vec<PathBuf>,

    /// Read a FileDescriptorSet instead of proto sources (`.json` for the JSON form)
    #[arg(long, conflicts_with = "input")]
    descriptor_set: Option<PathBuf>,

    /// Shaping options, e.g. `keep_case,longs=String,enums=String`
    #[arg(long, default_value = "")]
    shape: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let mut options: Options = args.shape.parse()?;
    options.include_dirs.extend(args.proto_paths.iter().cloned());

    let package = load(&args, &options)?;
    info!(entries = package.len(), "loaded package definition");

    let output = serde_json::to_string_pretty(&summary::package_summary(&package))?;
    println!("{}", output);

    Ok(())
}

fn load(args: &Args, options: &Options) -> Result<PackageDefinition, Box<dyn std::error::Error>> {
    let Some(path) = &args.descriptor_set else {
        return Ok(load_sync(&args.input, options)?);
    };

    let package = if path.extension().is_some_and(|ext| ext == "json") {
        let value: serde_json::Value = serde_json::from_slice(&std::fs::read(path)?)?;
        load_file_descriptor_set_from_json(&value, options)?
    } else {
        load_file_descriptor_set_from_buffer(&std::fs::read(path)?, options)?
    };
    Ok(package)
}
