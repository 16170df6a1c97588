//! Assemble and run in one step.

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use turtle_machine::ProgramImage;

use super::{ExecOptions, assemble_file, execute};

pub struct DrawArgs {
    pub source: PathBuf,
    pub output: PathBuf,
    pub exec: ExecOptions,
}

pub fn run(args: DrawArgs) -> Result<()> {
    let bytes = assemble_file(&args.source)?;
    let image = ProgramImage::with_header(&bytes).map_err(|err| anyhow!("{err}"))?;
    execute(image, &args.exec, &args.output)
}
