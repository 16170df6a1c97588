use core::fmt;

use super::*;

/// Longest instruction stream an `Offset` can address.
pub const MAX_STREAM_LEN: usize = Offset::MAX as usize;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderError {
    #[error("output buffer is too small")]
    BufferTooSmall,
    #[error("instruction stream of {0} bytes exceeds the addressable range")]
    StreamTooLong(usize),
}

/// Second operand of the ops that accept either form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Immediate(u16),
    Register(Register),
}

impl Operand {
    fn is_register(&self) -> bool {
        matches!(self, Operand::Register(_))
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Immediate(value) => write!(f, "{value}"),
            Operand::Register(register) => write!(f, "{register}"),
        }
    }
}

/// A fully decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Draw,
    Move,
    Halt,
    Store(Register, Operand),
    Increment(Register),
    IncrementBy(Register, u16),
    Decrement(Register),
    Add(Register, Operand),
    Subtract(Register, Operand),
    Multiply(Register, Operand),
    Divide(Register, Operand),
    /// dest = src * immediate
    MultiplyInto(Register, Register, u16),
    JumpIfNonZero(Register, Offset),
    JumpIfEqual(Register, Operand, Offset),
    JumpIfNotEqual(Register, Operand, Offset),
    JumpIfGreaterThan(Register, Operand, Offset),
    JumpIfLessThan(Register, Operand, Offset),
}

impl Op {
    pub fn opcode(&self) -> Opcode {
        match self {
            Op::Draw => Opcode::new(Ops::Draw, false),
            Op::Move => Opcode::new(Ops::Move, false),
            Op::Halt => Opcode::new(Ops::Halt, false),
            Op::Store(_, operand) => Opcode::new(Ops::Store, operand.is_register()),
            Op::Increment(_) => Opcode::new(Ops::Increment, false),
            Op::IncrementBy(..) => Opcode::new(Ops::IncrementBy, false),
            Op::Decrement(_) => Opcode::new(Ops::Decrement, false),
            Op::Add(_, operand) => Opcode::new(Ops::Add, operand.is_register()),
            Op::Subtract(_, operand) => Opcode::new(Ops::Subtract, operand.is_register()),
            Op::Multiply(_, operand) => Opcode::new(Ops::Multiply, operand.is_register()),
            Op::Divide(_, operand) => Opcode::new(Ops::Divide, operand.is_register()),
            Op::MultiplyInto(..) => Opcode::new(Ops::MultiplyInto, false),
            Op::JumpIfNonZero(..) => Opcode::new(Ops::JumpIfNonZero, false),
            Op::JumpIfEqual(_, operand, _) => Opcode::new(Ops::JumpIfEqual, operand.is_register()),
            Op::JumpIfNotEqual(_, operand, _) => {
                Opcode::new(Ops::JumpIfNotEqual, operand.is_register())
            }
            Op::JumpIfGreaterThan(_, operand, _) => {
                Opcode::new(Ops::JumpIfGreaterThan, operand.is_register())
            }
            Op::JumpIfLessThan(_, operand, _) => {
                Opcode::new(Ops::JumpIfLessThan, operand.is_register())
            }
        }
    }

    pub fn width(&self) -> usize {
        self.opcode().width()
    }

    pub fn jump_target(&self) -> Option<Offset> {
        match self {
            Op::JumpIfNonZero(_, target)
            | Op::JumpIfEqual(_, _, target)
            | Op::JumpIfNotEqual(_, _, target)
            | Op::JumpIfGreaterThan(_, _, target)
            | Op::JumpIfLessThan(_, _, target) => Some(*target),
            _ => None,
        }
    }

    /// Decodes the instruction starting at `pc`.
    pub fn decode(code: &[u8], pc: usize) -> Result<Op, MachineError> {
        let mut reader = Reader { code, cursor: pc };
        let opcode = Opcode::try_from(reader.read_u8()?)?;
        let form = opcode.register_form;
        let op = match opcode.op {
            Ops::Draw => Op::Draw,
            Ops::Move => Op::Move,
            Ops::Halt => Op::Halt,
            Ops::Store => Op::Store(reader.register()?, reader.operand(form)?),
            Ops::Increment => Op::Increment(reader.register()?),
            Ops::IncrementBy => Op::IncrementBy(reader.register()?, reader.read_u16()?),
            Ops::Decrement => Op::Decrement(reader.register()?),
            Ops::Add => Op::Add(reader.register()?, reader.operand(form)?),
            Ops::Subtract => Op::Subtract(reader.register()?, reader.operand(form)?),
            Ops::Multiply => Op::Multiply(reader.register()?, reader.operand(form)?),
            Ops::Divide => Op::Divide(reader.register()?, reader.operand(form)?),
            Ops::MultiplyInto => {
                Op::MultiplyInto(reader.register()?, reader.register()?, reader.read_u16()?)
            }
            Ops::JumpIfNonZero => Op::JumpIfNonZero(reader.register()?, reader.read_u16()?),
            Ops::JumpIfEqual => {
                Op::JumpIfEqual(reader.register()?, reader.operand(form)?, reader.read_u16()?)
            }
            Ops::JumpIfNotEqual => {
                Op::JumpIfNotEqual(reader.register()?, reader.operand(form)?, reader.read_u16()?)
            }
            Ops::JumpIfGreaterThan => {
                Op::JumpIfGreaterThan(reader.register()?, reader.operand(form)?, reader.read_u16()?)
            }
            Ops::JumpIfLessThan => {
                Op::JumpIfLessThan(reader.register()?, reader.operand(form)?, reader.read_u16()?)
            }
        };
        Ok(op)
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mnemonic = self.opcode().op.mnemonic();
        match self {
            Op::Draw | Op::Move | Op::Halt => write!(f, "{mnemonic}"),
            Op::Increment(register) | Op::Decrement(register) => write!(f, "{mnemonic} {register}"),
            Op::IncrementBy(register, value) => write!(f, "{mnemonic} {register} {value}"),
            Op::Store(register, operand)
            | Op::Add(register, operand)
            | Op::Subtract(register, operand)
            | Op::Multiply(register, operand)
            | Op::Divide(register, operand) => write!(f, "{mnemonic} {register} {operand}"),
            Op::MultiplyInto(dest, src, value) => write!(f, "{mnemonic} {dest} {src} {value}"),
            Op::JumpIfNonZero(register, target) => write!(f, "{mnemonic} {register} @{target:#06x}"),
            Op::JumpIfEqual(register, operand, target)
            | Op::JumpIfNotEqual(register, operand, target)
            | Op::JumpIfGreaterThan(register, operand, target)
            | Op::JumpIfLessThan(register, operand, target) => {
                write!(f, "{mnemonic} {register} {operand} @{target:#06x}")
            }
        }
    }
}

struct Reader<'a> {
    code: &'a [u8],
    cursor: usize,
}

impl Reader<'_> {
    fn read_u8(&mut self) -> Result<u8, MachineError> {
        let byte = *self
            .code
            .get(self.cursor)
            .ok_or(MachineError::ProgramCounterOutOfBounds(self.cursor))?;
        self.cursor = self
            .cursor
            .checked_add(1)
            .ok_or(MachineError::ProgramCounterOutOfBounds(self.cursor))?;
        Ok(byte)
    }

    fn read_u16(&mut self) -> Result<u16, MachineError> {
        Ok(u16::from_le_bytes([self.read_u8()?, self.read_u8()?]))
    }

    fn register(&mut self) -> Result<Register, MachineError> {
        Register::try_from(self.read_u8()?)
    }

    fn operand(&mut self, register_form: bool) -> Result<Operand, MachineError> {
        if register_form {
            Ok(Operand::Register(self.register()?))
        } else {
            Ok(Operand::Immediate(self.read_u16()?))
        }
    }
}

/// Result of a finished image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDescriptor {
    /// Bytes written, header included.
    pub length: usize,
    pub size: CanvasSize,
}

/// Image is
/// [width][height][instructions ...]
///
pub struct ImageBuilder<'a> {
    buffer: &'a mut [u8],
    size: CanvasSize,
    free: usize,
}

impl<'a> ImageBuilder<'a> {
    pub fn new(buffer: &'a mut [u8]) -> Result<Self, BuilderError> {
        let size = CanvasSize::default();
        let header = buffer.get_mut(..HEADER_LEN).ok_or(BuilderError::BufferTooSmall)?;
        header.copy_from_slice(&size.to_bytes());
        Ok(Self {
            buffer,
            size,
            free: HEADER_LEN,
        })
    }

    pub fn set_canvas_size(&mut self, size: CanvasSize) -> Result<(), BuilderError> {
        let header = self
            .buffer
            .get_mut(..HEADER_LEN)
            .ok_or(BuilderError::BufferTooSmall)?;
        header.copy_from_slice(&size.to_bytes());
        self.size = size;
        Ok(())
    }

    /// Offset the next op will be written at, relative to the stream start.
    pub fn code_offset(&self) -> usize {
        self.free.saturating_sub(HEADER_LEN)
    }

    pub fn add_op(&mut self, op: &Op) -> Result<(), BuilderError> {
        let end = self
            .code_offset()
            .checked_add(op.width())
            .ok_or(BuilderError::StreamTooLong(usize::MAX))?;
        if end > MAX_STREAM_LEN {
            return Err(BuilderError::StreamTooLong(end));
        }

        self.add_byte(u8::from(op.opcode()))?;
        match *op {
            Op::Draw | Op::Move | Op::Halt => {}
            Op::Increment(register) | Op::Decrement(register) => self.add_register(register)?,
            Op::IncrementBy(register, value) => {
                self.add_register(register)?;
                self.add_u16(value)?;
            }
            Op::Store(register, operand)
            | Op::Add(register, operand)
            | Op::Subtract(register, operand)
            | Op::Multiply(register, operand)
            | Op::Divide(register, operand) => {
                self.add_register(register)?;
                self.add_operand(operand)?;
            }
            Op::MultiplyInto(dest, src, value) => {
                self.add_register(dest)?;
                self.add_register(src)?;
                self.add_u16(value)?;
            }
            Op::JumpIfNonZero(register, target) => {
                self.add_register(register)?;
                self.add_u16(target)?;
            }
            Op::JumpIfEqual(register, operand, target)
            | Op::JumpIfNotEqual(register, operand, target)
            | Op::JumpIfGreaterThan(register, operand, target)
            | Op::JumpIfLessThan(register, operand, target) => {
                self.add_register(register)?;
                self.add_operand(operand)?;
                self.add_u16(target)?;
            }
        }
        Ok(())
    }

    pub fn finish(self) -> ImageDescriptor {
        ImageDescriptor {
            length: self.free,
            size: self.size,
        }
    }

    fn add_byte(&mut self, byte: u8) -> Result<(), BuilderError> {
        let slot = self
            .buffer
            .get_mut(self.free)
            .ok_or(BuilderError::BufferTooSmall)?;
        *slot = byte;
        self.free = self.free.checked_add(1).ok_or(BuilderError::BufferTooSmall)?;
        Ok(())
    }

    fn add_u16(&mut self, value: u16) -> Result<(), BuilderError> {
        let [low, high] = value.to_le_bytes();
        self.add_byte(low)?;
        self.add_byte(high)
    }

    fn add_register(&mut self, register: Register) -> Result<(), BuilderError> {
        self.add_byte(register as u8)
    }

    fn add_operand(&mut self, operand: Operand) -> Result<(), BuilderError> {
        match operand {
            Operand::Immediate(value) => self.add_u16(value),
            Operand::Register(register) => self.add_register(register),
        }
    }
}
