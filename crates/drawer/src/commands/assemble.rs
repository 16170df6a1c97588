//! Assemble a source file into a program image.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use turtle_machine::HEADER_LEN;

use super::assemble_file;

pub struct AssembleArgs {
    pub source: PathBuf,
    pub output: PathBuf,
}

pub fn run(args: AssembleArgs) -> Result<()> {
    let image = assemble_file(&args.source)?;
    fs::write(&args.output, &image)
        .with_context(|| format!("Write {}", args.output.display()))?;
    eprintln!(
        "wrote {} bytes of code to {}",
        image.len().saturating_sub(HEADER_LEN),
        args.output.display()
    );
    Ok(())
}
