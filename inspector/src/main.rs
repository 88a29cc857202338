use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use serde::Serialize;

use uasset_core::cursor::BoundsPolicy;
use uasset_core::{decode_package, DecodeOptions};

/// Inspect the structural metadata of an Unreal Engine .uasset package.
#[derive(ClapParser, Debug)]
#[command(version, about)]
struct Args {
    /// Package file to decode
    input: PathBuf,

    /// Record and print the byte-exact audit trail of every read
    #[arg(long)]
    audit: bool,

    /// Print only the package summary header
    #[arg(long)]
    header_only: bool,

    /// Fail on reads past the end of the buffer instead of reading zeros
    #[arg(long)]
    strict: bool,
}

#[derive(Debug, Serialize)]
struct Report<'a> {
    file: &'a str,
    file_size: usize,
    #[serde(flatten)]
    document: &'a uasset_core::PackageDocument,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let bytes = std::fs::read(&args.input)
        .with_context(|| format!("unable to load: {:?}", args.input))?;
    let file_size = bytes.len();
    log::info!("decoding {:?} ({} bytes)", args.input, file_size);

    let options = DecodeOptions {
        audit: args.audit,
        bounds: if args.strict {
            BoundsPolicy::Strict
        } else {
            BoundsPolicy::Permissive
        },
    };
    let document = decode_package(bytes, &options)
        .with_context(|| format!("failed to decode {:?}", args.input))?;

    log::info!(
        "decoded {} names, {} imports, {} exports",
        document.names.len(),
        document.imports.len(),
        document.exports.len()
    );

    let out = if args.header_only {
        serde_yaml::to_string(&document.summary)?
    } else {
        let file = args.input.to_string_lossy();
        serde_yaml::to_string(&Report {
            file: &file,
            file_size,
            document: &document,
        })?
    };
    print!("{out}");

    Ok(())
}
