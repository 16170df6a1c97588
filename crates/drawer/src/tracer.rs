use std::fmt;
use std::io::{self, Write};

use turtle_machine::{Fault, Halted, Op, Registers, Tracer};

/// Writes one line per executed instruction. The first write error
/// stops further output and is returned by [`PrintTracer::finish`].
pub struct PrintTracer<W: Write> {
    out: W,
    error: Option<io::Error>,
}

impl<W: Write> PrintTracer<W> {
    pub fn new(out: W) -> Self {
        Self { out, error: None }
    }

    pub fn finish(self) -> io::Result<W> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.out),
        }
    }

    fn line(&mut self, args: fmt::Arguments<'_>) {
        if self.error.is_some() {
            return;
        }
        if let Err(err) = self.out.write_fmt(args).and_then(|()| self.out.write_all(b"\n")) {
            self.error = Some(err);
        }
    }
}

impl<W: Write> Tracer for PrintTracer<W> {
    fn trace_step(&mut self, pc: usize, op: &Op, registers: &Registers) {
        let op = op.to_string();
        self.line(format_args!("{pc:#06x}  {op:<18} {registers}"));
    }

    fn trace_plot(&mut self, x: i64, y: i64, on_canvas: bool) {
        if on_canvas {
            self.line(format_args!("        plot {x} {y}"));
        } else {
            self.line(format_args!("        plot {x} {y} (clipped)"));
        }
    }

    fn trace_halt(&mut self, halted: &Halted) {
        self.line(format_args!("halt at {:#06x} after {} steps", halted.pc, halted.steps));
    }

    fn trace_fault(&mut self, fault: &Fault) {
        self.line(format_args!("fault at {:#06x}: {}", fault.pc, fault.error));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use turtle_machine::{Limits, Machine, ProgramImage};

    use crate::commands::assemble_text;

    #[test]
    fn prints_steps_plots_and_halt() {
        let image = assemble_text("WIDTH 4\nHEIGHT 4\nDRW\nMOV\nHLT").unwrap();
        let image = ProgramImage::with_header(&image).unwrap();
        let mut canvas = [0u8; 4];
        let mut machine = Machine::new(image, &mut canvas).unwrap();
        let mut tracer = PrintTracer::new(Vec::new());
        machine.run_with(&mut tracer, Limits::default()).unwrap();

        let text = String::from_utf8(tracer.finish().unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("0x0000  DRW"));
        assert!(lines[0].ends_with("A=0 B=0 C=0 D=0 E=0 F=0 G=0 H=0"));
        assert!(lines[1].starts_with("0x0001  MOV"));
        assert_eq!(lines[2], "        plot 3 2");
        assert!(lines[3].starts_with("0x0002  HLT"));
        assert_eq!(lines[4], "halt at 0x0002 after 3 steps");
    }

    #[test]
    fn reports_faults() {
        let image = ProgramImage::without_header(&[0x0f, 0x00, 0x00, 0x00]);
        let mut canvas = vec![0u8; 512 * 64];
        let mut machine = Machine::new(image, &mut canvas).unwrap();
        let mut tracer = PrintTracer::new(Vec::new());
        machine.run_with(&mut tracer, Limits::default()).unwrap_err();

        let text = String::from_utf8(tracer.finish().unwrap()).unwrap();
        assert_eq!(text.lines().last(), Some("fault at 0x0000: division by zero"));
    }

    struct FullDisk {
        writes: usize,
    }

    impl Write for FullDisk {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            self.writes += 1;
            Err(io::ErrorKind::StorageFull.into())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn keeps_the_first_write_error() {
        let image = assemble_text("WIDTH 4\nHEIGHT 4\nDRW\nMOV\nHLT").unwrap();
        let image = ProgramImage::with_header(&image).unwrap();
        let mut canvas = [0u8; 4];
        let mut machine = Machine::new(image, &mut canvas).unwrap();
        let mut tracer = PrintTracer::new(FullDisk { writes: 0 });
        machine.run_with(&mut tracer, Limits::default()).unwrap();

        assert_eq!(tracer.out.writes, 1);
        let err = tracer.finish().err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::StorageFull);
    }
}
