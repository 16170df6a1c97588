use core::fmt;

use super::*;
use crate::trig::{to_fixed, to_pixel, unit_vector};

pub const DEFAULT_MAX_STEPS: u64 = 10_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineState {
    Running,
    Halted,
    Faulted,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Registers([RegisterWord; REGISTER_COUNT]);

impl Registers {
    pub fn get(&self, register: Register) -> RegisterWord {
        self.0.get(register.index()).copied().unwrap_or(0)
    }

    pub fn set(&mut self, register: Register, value: RegisterWord) {
        if let Some(slot) = self.0.get_mut(register.index()) {
            *slot = value;
        }
    }

    pub fn as_array(&self) -> &[RegisterWord; REGISTER_COUNT] {
        &self.0
    }

    fn update(&mut self, register: Register, f: impl FnOnce(RegisterWord) -> RegisterWord) {
        self.set(register, f(self.get(register)));
    }
}

impl fmt::Display for Registers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, value) in self.0.iter().enumerate() {
            if index > 0 {
                write!(f, " ")?;
            }
            let name = u8::try_from(index)
                .ok()
                .and_then(|index| Register::try_from(index).ok())
                .map(Register::name)
                .unwrap_or('?');
            write!(f, "{name}={value}")?;
        }
        Ok(())
    }
}

/// Bounds for [`Machine::run_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    max_steps: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
        }
    }
}

impl Limits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unlimited() -> Self {
        Self { max_steps: u64::MAX }
    }

    pub fn max_steps(mut self, max_steps: u64) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn get_max_steps(&self) -> u64 {
        self.max_steps
    }
}

/// Turtle position in fixed point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Turtle {
    x: i64,
    y: i64,
    drawing: bool,
}

impl Turtle {
    fn centered(size: CanvasSize) -> Self {
        Self {
            x: to_fixed(i64::from(size.width / 2)),
            y: to_fixed(i64::from(size.height / 2)),
            drawing: false,
        }
    }

    pub fn position(&self) -> (i64, i64) {
        (self.x, self.y)
    }

    pub fn pixel(&self) -> (i64, i64) {
        (to_pixel(self.x), to_pixel(self.y))
    }

    pub fn is_drawing(&self) -> bool {
        self.drawing
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Halted {
    /// Offset of the `HLT` that stopped the machine.
    pub pc: usize,
    pub steps: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fault {
    pub error: MachineError,
    pub pc: usize,
    pub registers: Registers,
}

pub struct Machine<'a, 'b> {
    code: &'a [u8],
    canvas: Canvas<'b>,
    registers: Registers,
    pc: usize,
    turtle: Turtle,
    state: MachineState,
    steps: u64,
}

impl<'a, 'b> Machine<'a, 'b> {
    pub fn new(image: ProgramImage<'a>, canvas_buffer: &'b mut [u8]) -> Result<Self, MachineError> {
        let size = image.canvas_size();
        let canvas = Canvas::new(size, canvas_buffer)?;
        Ok(Self {
            code: image.code(),
            canvas,
            registers: Registers::default(),
            pc: 0,
            turtle: Turtle::centered(size),
            state: MachineState::Running,
            steps: 0,
        })
    }

    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn state(&self) -> MachineState {
        self.state
    }

    pub fn turtle(&self) -> &Turtle {
        &self.turtle
    }

    pub fn canvas(&self) -> &Canvas<'b> {
        &self.canvas
    }

    pub fn into_canvas(self) -> Canvas<'b> {
        self.canvas
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Executes one instruction and returns the state it left the
    /// machine in.
    pub fn step(&mut self) -> Result<MachineState, MachineError> {
        self.step_with(&mut NoopTracer)
    }

    pub fn step_with<T: Tracer>(&mut self, tracer: &mut T) -> Result<MachineState, MachineError> {
        if self.state != MachineState::Running {
            return Err(MachineError::NotRunning);
        }
        match self.execute(tracer) {
            Ok(state) => {
                self.state = state;
                Ok(state)
            }
            Err(error) => {
                self.state = MachineState::Faulted;
                Err(error)
            }
        }
    }

    pub fn run(&mut self) -> Result<Halted, Fault> {
        self.run_with(NoopTracer, Limits::default())
    }

    pub fn run_with<T: Tracer>(&mut self, mut tracer: T, limits: Limits) -> Result<Halted, Fault> {
        loop {
            if self.state == MachineState::Running && self.steps >= limits.max_steps {
                self.state = MachineState::Faulted;
                let fault = self.fault(MachineError::StepLimitExceeded(limits.max_steps));
                tracer.trace_fault(&fault);
                return Err(fault);
            }

            match self.step_with(&mut tracer) {
                Ok(MachineState::Running) => {}
                Ok(_) => {
                    let halted = Halted {
                        pc: self.pc,
                        steps: self.steps,
                    };
                    tracer.trace_halt(&halted);
                    return Ok(halted);
                }
                Err(error) => {
                    let fault = self.fault(error);
                    tracer.trace_fault(&fault);
                    return Err(fault);
                }
            }
        }
    }

    fn fault(&self, error: MachineError) -> Fault {
        Fault {
            error,
            pc: self.pc,
            registers: self.registers,
        }
    }

    fn execute<T: Tracer>(&mut self, tracer: &mut T) -> Result<MachineState, MachineError> {
        let op = Op::decode(self.code, self.pc)?;
        tracer.trace_step(self.pc, &op, &self.registers);
        self.steps = self.steps.saturating_add(1);

        let next = self
            .pc
            .checked_add(op.width())
            .ok_or(MachineError::ProgramCounterOutOfBounds(self.pc))?;
        let mut jump = None;

        match op {
            Op::Halt => return Ok(MachineState::Halted),
            Op::Draw => self.turtle.drawing = true,
            Op::Move => self.advance(tracer),
            Op::Store(register, operand) => {
                let value = self.value(operand);
                self.registers.set(register, value);
            }
            Op::Increment(register) => self.registers.update(register, |v| v.wrapping_add(1)),
            Op::IncrementBy(register, amount) => self
                .registers
                .update(register, |v| v.wrapping_add(RegisterWord::from(amount))),
            Op::Decrement(register) => self.registers.update(register, |v| v.wrapping_sub(1)),
            Op::Add(register, operand) => {
                let rhs = self.value(operand);
                self.registers.update(register, |v| v.wrapping_add(rhs));
            }
            Op::Subtract(register, operand) => {
                let rhs = self.value(operand);
                self.registers.update(register, |v| v.wrapping_sub(rhs));
            }
            Op::Multiply(register, operand) => {
                let rhs = self.value(operand);
                self.registers.update(register, |v| v.wrapping_mul(rhs));
            }
            Op::Divide(register, operand) => {
                let rhs = self.value(operand);
                if rhs == 0 {
                    return Err(MachineError::DivisionByZero);
                }
                // i32::MIN / -1 wraps back to i32::MIN.
                self.registers.update(register, |v| v.wrapping_div(rhs));
            }
            Op::MultiplyInto(dest, src, factor) => {
                let value = self.registers.get(src).wrapping_mul(RegisterWord::from(factor));
                self.registers.set(dest, value);
            }
            Op::JumpIfNonZero(register, target) => {
                if self.registers.get(register) != 0 {
                    jump = Some(target);
                }
            }
            Op::JumpIfEqual(register, operand, target) => {
                if self.registers.get(register) == self.value(operand) {
                    jump = Some(target);
                }
            }
            Op::JumpIfNotEqual(register, operand, target) => {
                if self.registers.get(register) != self.value(operand) {
                    jump = Some(target);
                }
            }
            Op::JumpIfGreaterThan(register, operand, target) => {
                if self.registers.get(register) > self.value(operand) {
                    jump = Some(target);
                }
            }
            Op::JumpIfLessThan(register, operand, target) => {
                if self.registers.get(register) < self.value(operand) {
                    jump = Some(target);
                }
            }
        }

        self.pc = jump.map(usize::from).unwrap_or(next);
        Ok(MachineState::Running)
    }

    fn value(&self, operand: Operand) -> RegisterWord {
        match operand {
            Operand::Immediate(value) => RegisterWord::from(value),
            Operand::Register(register) => self.registers.get(register),
        }
    }

    fn advance<T: Tracer>(&mut self, tracer: &mut T) {
        let (dx, dy) = unit_vector(self.registers.get(Register::A));
        self.turtle.x = self.turtle.x.wrapping_add(i64::from(dx));
        self.turtle.y = self.turtle.y.wrapping_add(i64::from(dy));
        if self.turtle.drawing {
            let (x, y) = self.turtle.pixel();
            let on_canvas = self.canvas.plot(x, y);
            tracer.trace_plot(x, y, on_canvas);
        }
    }
}

/// A finished run: the canvas is handed back whether or not the
/// program halted cleanly.
#[derive(Debug)]
pub struct Run<'b> {
    pub canvas: Canvas<'b>,
    pub registers: Registers,
    pub outcome: Result<Halted, Fault>,
}

/// Runs `image` to completion with the default [`Limits`].
pub fn run<'b>(image: ProgramImage<'_>, canvas_buffer: &'b mut [u8]) -> Result<Run<'b>, MachineError> {
    let mut machine = Machine::new(image, canvas_buffer)?;
    let outcome = machine.run();
    let registers = machine.registers;
    Ok(Run {
        canvas: machine.into_canvas(),
        registers,
        outcome,
    })
}
