pub mod assemble;
pub mod disasm;
pub mod draw;
pub mod run;

use std::fs;
use std::io;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use turtle_machine::assembler::DEFAULT_LABEL_CAP;
use turtle_machine::builder::MAX_STREAM_LEN;
use turtle_machine::{
    AssemblerError, Canvas, HEADER_LEN, Limits, Machine, NoopTracer, ProgramImage, assemble_source,
};

use crate::pbm;
use crate::tracer::PrintTracer;

pub struct ExecOptions {
    pub max_steps: u64,
    pub trace: bool,
}

/// Assembles `source` into a complete image, header included.
pub fn assemble_text(source: &str) -> Result<Vec<u8>, AssemblerError> {
    let mut buffer = vec![0u8; HEADER_LEN + MAX_STREAM_LEN];
    let descriptor = assemble_source::<DEFAULT_LABEL_CAP>(source, &mut buffer)?;
    buffer.truncate(descriptor.length);
    Ok(buffer)
}

pub fn assemble_file(path: &Path) -> Result<Vec<u8>> {
    let source =
        fs::read_to_string(path).with_context(|| format!("Read {}", path.display()))?;
    assemble_text(&source).map_err(|err| anyhow!("{}: {err}", path.display()))
}

pub fn load_image<'a>(bytes: &'a [u8], no_header: bool, path: &Path) -> Result<ProgramImage<'a>> {
    if no_header {
        return Ok(ProgramImage::without_header(bytes));
    }
    ProgramImage::with_header(bytes).map_err(|err| anyhow!("{}: {err}", path.display()))
}

/// Runs `image` and writes whatever was drawn to `output`, even when the
/// program faults.
pub fn execute(image: ProgramImage<'_>, options: &ExecOptions, output: &Path) -> Result<()> {
    let size = image.canvas_size();
    let mut canvas = vec![0u8; Canvas::required_bytes(size)];
    let mut machine = Machine::new(image, &mut canvas).map_err(|err| anyhow!("{err}"))?;
    let limits = Limits::new().max_steps(options.max_steps);

    let outcome = if options.trace {
        let mut tracer = PrintTracer::new(io::stderr().lock());
        let outcome = machine.run_with(&mut tracer, limits);
        tracer.finish().context("Write trace")?;
        outcome
    } else {
        machine.run_with(NoopTracer, limits)
    };

    let canvas = machine.into_canvas();
    pbm::write_file(output, &canvas)?;

    match outcome {
        Ok(halted) => {
            eprintln!(
                "halted at {:#06x} after {} steps, {} pixels set on {}x{}",
                halted.pc,
                halted.steps,
                canvas.count_set(),
                size.width,
                size.height
            );
            Ok(())
        }
        Err(fault) => bail!(
            "fault at {:#06x}: {}\nregisters: {}",
            fault.pc,
            fault.error,
            fault.registers
        ),
    }
}
