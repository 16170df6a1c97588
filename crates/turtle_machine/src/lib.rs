#![no_std]

#![cfg_attr(
    not(test),
    deny(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::todo,
        clippy::unimplemented,
        clippy::indexing_slicing,
        clippy::string_slice,
        clippy::arithmetic_side_effects,
        clippy::panicking_unwrap,
        clippy::out_of_bounds_indexing,
        clippy::panic_in_result_fn,
        clippy::unwrap_in_result,
    )
)]
#![cfg_attr(not(test), warn(clippy::missing_panics_doc))]

use core::fmt;
use core::mem::transmute;
use thiserror_no_std::Error;
use variant_count::VariantCount;

pub mod assembler;
pub mod builder;
pub mod canvas;
pub mod lexer;
pub mod machine;
pub mod trace;
pub mod trig;
pub mod verify;

pub use assembler::{assemble, assemble_source, AssemblerError, AssemblerErrorKind};
pub use builder::{ImageBuilder, ImageDescriptor, Op, Operand};
pub use canvas::Canvas;
pub use machine::{run, Fault, Halted, Limits, Machine, MachineState, Registers, Run};
pub use trace::{NoopTracer, Tracer};

/// This crate implements the turtle machine.
///
/// A program image is an optional four byte header followed by a
/// stream of byte oriented instructions:
/// `
///     [width: u16 LE][height: u16 LE][instructions ...]
/// `
/// Every instruction starts with a one byte opcode and its width is
/// fixed by that byte alone, which lets the assembler lay out offsets
/// before any label is known.
///
/// The machine has eight signed 32 bit registers, `A` through `H`.
/// Register `A` holds the turtle heading in degrees. Drawing happens
/// on a caller provided bit buffer so the crate needs no allocator.
pub type RegisterWord = i32;

/// Byte offset into the instruction stream. Jump targets and labels
/// are encoded as little endian `Offset`s.
pub type Offset = u16;

/// Set on an opcode byte when the second operand is a register
/// instead of a 16 bit immediate.
pub const REGISTER_FORM: u8 = 0b1000_0000;

pub const WIDTH_OFFSET: usize = 0;
pub const HEIGHT_OFFSET: usize = WIDTH_OFFSET + 2;
pub const HEADER_LEN: usize = HEIGHT_OFFSET + 2;

pub const DEFAULT_WIDTH: u16 = 512;
pub const DEFAULT_HEIGHT: u16 = 512;

#[repr(u8)] // Must match the opcode byte
#[derive(VariantCount, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ops {
    Draw = 0x01,
    Move,
    Store,
    Increment,
    Add,
    Decrement,
    JumpIfNonZero,
    Halt,
    Multiply,
    JumpIfGreaterThan,
    Subtract,
    JumpIfEqual,
    JumpIfNotEqual,
    JumpIfLessThan,
    Divide,
    IncrementBy,
    MultiplyInto,
}

impl Ops {
    /// Ops whose second operand may be a register.
    pub fn has_register_form(self) -> bool {
        matches!(
            self,
            Ops::Store
                | Ops::Add
                | Ops::Subtract
                | Ops::Multiply
                | Ops::Divide
                | Ops::JumpIfEqual
                | Ops::JumpIfNotEqual
                | Ops::JumpIfGreaterThan
                | Ops::JumpIfLessThan
        )
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Ops::Draw => "DRW",
            Ops::Move => "MOV",
            Ops::Store => "STO",
            Ops::Increment | Ops::IncrementBy => "INC",
            Ops::Add => "ADD",
            Ops::Decrement => "DEC",
            Ops::JumpIfNonZero => "JNZ",
            Ops::Halt => "HLT",
            Ops::Multiply | Ops::MultiplyInto => "MUL",
            Ops::JumpIfGreaterThan => "JGT",
            Ops::Subtract => "SUB",
            Ops::JumpIfEqual => "JEQ",
            Ops::JumpIfNotEqual => "JNE",
            Ops::JumpIfLessThan => "JLT",
            Ops::Divide => "DIV",
        }
    }
}

impl TryFrom<u8> for Ops {
    type Error = MachineError;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        // SAFTY: Ops is `repr(u8)` and numbered contiguously from 1.
        if value == 0 || usize::from(value) > Ops::VARIANT_COUNT {
            return Err(MachineError::InvalidOp(value));
        }

        // SAFTY: We just check that the value is in range.
        let op = unsafe { transmute::<u8, Self>(value) };
        Ok(op)
    }
}

/// A decoded opcode byte: the operation plus the operand form flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcode {
    pub op: Ops,
    pub register_form: bool,
}

impl Opcode {
    pub fn new(op: Ops, register_form: bool) -> Self {
        Self { op, register_form }
    }

    /// Encoded width in bytes, opcode included.
    pub fn width(&self) -> usize {
        match (self.op, self.register_form) {
            (Ops::Draw | Ops::Move | Ops::Halt, _) => 1,
            (Ops::Increment | Ops::Decrement, _) => 2,
            (Ops::Store | Ops::Add | Ops::Subtract | Ops::Multiply | Ops::Divide, true) => 3,
            (Ops::Store | Ops::Add | Ops::Subtract | Ops::Multiply | Ops::Divide, false) => 4,
            (Ops::IncrementBy, _) => 4,
            (Ops::MultiplyInto, _) => 5,
            (Ops::JumpIfNonZero, _) => 4,
            (
                Ops::JumpIfEqual
                | Ops::JumpIfNotEqual
                | Ops::JumpIfGreaterThan
                | Ops::JumpIfLessThan,
                true,
            ) => 5,
            (
                Ops::JumpIfEqual
                | Ops::JumpIfNotEqual
                | Ops::JumpIfGreaterThan
                | Ops::JumpIfLessThan,
                false,
            ) => 6,
        }
    }
}

impl TryFrom<u8> for Opcode {
    type Error = MachineError;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        let register_form = value & REGISTER_FORM != 0;
        let op = Ops::try_from(value & !REGISTER_FORM).map_err(|_| MachineError::InvalidOp(value))?;
        if register_form && !op.has_register_form() {
            return Err(MachineError::InvalidOp(value));
        }
        Ok(Self { op, register_form })
    }
}

impl From<Opcode> for u8 {
    fn from(opcode: Opcode) -> u8 {
        if opcode.register_form {
            opcode.op as u8 | REGISTER_FORM
        } else {
            opcode.op as u8
        }
    }
}

#[repr(u8)]
#[derive(VariantCount, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    /// Heading in degrees.
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
}

pub const REGISTER_COUNT: usize = Register::VARIANT_COUNT;

const REGISTER_NAMES: [char; REGISTER_COUNT] = ['A', 'B', 'C', 'D', 'E', 'F', 'G', 'H'];

impl Register {
    pub fn index(self) -> usize {
        usize::from(self as u8)
    }

    pub fn name(self) -> char {
        REGISTER_NAMES.get(self.index()).copied().unwrap_or('?')
    }

    /// Parses a single letter register name, either case.
    pub fn from_name(name: &str) -> Option<Self> {
        let mut chars = name.chars();
        let letter = chars.next()?.to_ascii_uppercase();
        if chars.next().is_some() {
            return None;
        }
        let index = REGISTER_NAMES.iter().position(|candidate| *candidate == letter)?;
        let index = u8::try_from(index).ok()?;
        Self::try_from(index).ok()
    }
}

impl TryFrom<u8> for Register {
    type Error = MachineError;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if usize::from(value) >= Register::VARIANT_COUNT {
            return Err(MachineError::RegisterOutOfRange(value));
        }

        // SAFTY: Register is `repr(u8)` and we just checked the range.
        let register = unsafe { transmute::<u8, Self>(value) };
        Ok(register)
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineError {
    #[error("program counter {0} is outside the instruction stream")]
    ProgramCounterOutOfBounds(usize),
    #[error("register index {0} is out of range")]
    RegisterOutOfRange(u8),
    #[error("the byte {0:#04x} is an invalid opcode")]
    InvalidOp(u8),
    #[error("division by zero")]
    DivisionByZero,
    #[error("step limit of {0} instructions exceeded")]
    StepLimitExceeded(u64),
    #[error("the machine is not running")]
    NotRunning,
    #[error("canvas buffer holds {actual} bytes but {required} are needed")]
    CanvasBufferTooSmall { required: usize, actual: usize },
    #[error("program header needs 4 bytes but the image has {0}")]
    HeaderTooShort(usize),
    #[error("canvas dimensions must be non zero")]
    InvalidCanvasSize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasSize {
    pub width: u16,
    pub height: u16,
}

impl CanvasSize {
    pub fn new(width: u16, height: u16) -> Result<Self, MachineError> {
        if width == 0 || height == 0 {
            return Err(MachineError::InvalidCanvasSize);
        }
        Ok(Self { width, height })
    }

    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let [w0, w1] = self.width.to_le_bytes();
        let [h0, h1] = self.height.to_le_bytes();
        [w0, w1, h0, h1]
    }
}

impl Default for CanvasSize {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
        }
    }
}

/// A loaded program. Whether the bytes start with a canvas header is
/// decided by the loader, the stream itself carries no marker.
#[derive(Debug, Clone, Copy)]
pub struct ProgramImage<'a> {
    header: Option<CanvasSize>,
    code: &'a [u8],
}

impl<'a> ProgramImage<'a> {
    pub fn with_header(bytes: &'a [u8]) -> Result<Self, MachineError> {
        let (Some(header), Some(code)) = (bytes.get(..HEADER_LEN), bytes.get(HEADER_LEN..)) else {
            return Err(MachineError::HeaderTooShort(bytes.len()));
        };
        let width = read_u16(header, WIDTH_OFFSET).ok_or(MachineError::HeaderTooShort(bytes.len()))?;
        let height = read_u16(header, HEIGHT_OFFSET).ok_or(MachineError::HeaderTooShort(bytes.len()))?;
        Ok(Self {
            header: Some(CanvasSize::new(width, height)?),
            code,
        })
    }

    pub fn without_header(code: &'a [u8]) -> Self {
        Self { header: None, code }
    }

    pub fn header(&self) -> Option<CanvasSize> {
        self.header
    }

    pub fn canvas_size(&self) -> CanvasSize {
        self.header.unwrap_or_default()
    }

    pub fn code(&self) -> &'a [u8] {
        self.code
    }
}

pub(crate) fn read_u16(bytes: &[u8], at: usize) -> Option<u16> {
    let low = *bytes.get(at)?;
    let high = *bytes.get(at.checked_add(1)?)?;
    Some(u16::from_le_bytes([low, high]))
}
