//! Run a program image.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

use super::{ExecOptions, execute, load_image};

pub struct RunArgs {
    pub image: PathBuf,
    pub output: PathBuf,
    pub no_header: bool,
    pub exec: ExecOptions,
}

pub fn run(args: RunArgs) -> Result<()> {
    let bytes = fs::read(&args.image).with_context(|| format!("Read {}", args.image.display()))?;
    let image = load_image(&bytes, args.no_header, &args.image)?;
    execute(image, &args.exec, &args.output)
}
