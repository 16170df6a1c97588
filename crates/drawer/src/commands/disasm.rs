//! List the instructions of a program image.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use turtle_machine::verify::{disassemble, verify};

use super::load_image;

pub struct DisasmArgs {
    pub image: PathBuf,
    pub no_header: bool,
}

pub fn run(args: DisasmArgs) -> Result<()> {
    let bytes = fs::read(&args.image).with_context(|| format!("Read {}", args.image.display()))?;
    let image = load_image(&bytes, args.no_header, &args.image)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_listing(&mut out, image.code(), image.header().map(|size| (size.width, size.height)))?;
    out.flush()?;
    verify(image.code()).map_err(|err| anyhow!("{}: {err}", args.image.display()))?;
    Ok(())
}

pub fn write_listing(
    out: &mut impl Write,
    code: &[u8],
    header: Option<(u16, u16)>,
) -> Result<()> {
    if let Some((width, height)) = header {
        writeln!(out, "WIDTH {width}")?;
        writeln!(out, "HEIGHT {height}")?;
    }
    for item in disassemble(code) {
        match item {
            Ok((offset, op)) => writeln!(out, "{offset:#06x}  {op}")?,
            Err(err) => {
                writeln!(out, "; {err}")?;
                break;
            }
        }
    }
    Ok(())
}
