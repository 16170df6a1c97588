use crate::builder::Op;
use crate::machine::{Fault, Halted, Registers};

/// Hooks called by [`Machine::run_with`](crate::Machine::run_with).
/// Every method defaults to doing nothing.
pub trait Tracer {
    /// Called after decode and before the op runs.
    fn trace_step(&mut self, _pc: usize, _op: &Op, _registers: &Registers) {}

    /// Called for every pixel the turtle lands on while drawing,
    /// including ones clipped off the canvas.
    fn trace_plot(&mut self, _x: i64, _y: i64, _on_canvas: bool) {}

    fn trace_halt(&mut self, _halted: &Halted) {}

    fn trace_fault(&mut self, _fault: &Fault) {}
}

pub struct NoopTracer;

impl Tracer for NoopTracer {}

impl<T: Tracer + ?Sized> Tracer for &mut T {
    fn trace_step(&mut self, pc: usize, op: &Op, registers: &Registers) {
        (**self).trace_step(pc, op, registers);
    }

    fn trace_plot(&mut self, x: i64, y: i64, on_canvas: bool) {
        (**self).trace_plot(x, y, on_canvas);
    }

    fn trace_halt(&mut self, halted: &Halted) {
        (**self).trace_halt(halted);
    }

    fn trace_fault(&mut self, fault: &Fault) {
        (**self).trace_fault(fault);
    }
}
