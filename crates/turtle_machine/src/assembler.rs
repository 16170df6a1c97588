// Two pass assembler for turtle programs.
//
// Pass one walks every line, binding labels to the running byte offset
// and collecting the canvas directives. Widths depend only on the
// opcode, so no label has to be known yet. Pass two walks the same
// lines again and emits bytes with every label resolved.

use heapless::{String, Vec};
use thiserror_no_std::Error;

use crate::builder::{BuilderError, ImageBuilder, ImageDescriptor, MAX_STREAM_LEN, Op, Operand};
use crate::lexer::{lex_source, Line, Token};
use crate::{CanvasSize, Offset, DEFAULT_HEIGHT, DEFAULT_WIDTH};

pub const NAME_CAP: usize = 32;
pub const DEFAULT_LABEL_CAP: usize = 256;

pub type Name = String<NAME_CAP>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssemblerError {
    #[error("{0}")]
    Kind(AssemblerErrorKind),
    #[error("line {line}: {kind}")]
    WithLine { line: u32, kind: AssemblerErrorKind },
}

impl AssemblerError {
    pub(crate) fn with_line(self, line: u32) -> Self {
        match self {
            AssemblerError::WithLine { .. } => self,
            AssemblerError::Kind(kind) => AssemblerError::WithLine { line, kind },
        }
    }

    pub fn line_number(&self) -> Option<u32> {
        match self {
            Self::Kind(_) => None,
            Self::WithLine { line, .. } => Some(*line),
        }
    }

    pub fn error_kind(&self) -> &AssemblerErrorKind {
        match self {
            Self::Kind(kind) => kind,
            Self::WithLine { kind, .. } => kind,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssemblerErrorKind {
    #[error("too many tokens")]
    TooManyTokens,
    #[error("malformed label")]
    InvalidLabel,
    #[error("unknown mnemonic")]
    UnknownMnemonic,
    #[error("invalid operands for {0}")]
    InvalidOperands(&'static str),
    #[error("invalid number")]
    InvalidNumber,
    #[error("immediate {0} does not fit in 16 bits")]
    ImmediateOutOfRange(i64),
    #[error("canvas dimension {0} is out of range")]
    InvalidCanvasSize(i64),
    #[error("{0} given more than once")]
    DuplicateDirective(&'static str),
    #[error("name is longer than 32 bytes")]
    NameTooLong,
    #[error("label `{0}` is already defined")]
    DuplicateLabel(Name),
    #[error("label `{0}` is never defined")]
    UnknownLabel(Name),
    #[error("label table is full")]
    MaxLabelsExceeded,
    #[error("instruction stream of {0} bytes is too long")]
    StreamTooLong(usize),
    #[error("{0}")]
    Builder(BuilderError),
}

impl From<BuilderError> for AssemblerError {
    fn from(err: BuilderError) -> Self {
        AssemblerError::Kind(AssemblerErrorKind::Builder(err))
    }
}

impl From<AssemblerErrorKind> for AssemblerError {
    fn from(kind: AssemblerErrorKind) -> Self {
        AssemblerError::Kind(kind)
    }
}

#[derive(Clone, Debug)]
struct Label {
    name: Name,
    offset: Offset,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mnemonic {
    Drw,
    Mov,
    Sto,
    Inc,
    Dec,
    Add,
    Sub,
    Mul,
    Div,
    Jnz,
    Jeq,
    Jne,
    Jgt,
    Jlt,
    Hlt,
    Width,
    Height,
}

const MNEMONICS: [(&str, Mnemonic); 18] = [
    ("DRW", Mnemonic::Drw),
    ("MOV", Mnemonic::Mov),
    ("FWD", Mnemonic::Mov),
    ("STO", Mnemonic::Sto),
    ("INC", Mnemonic::Inc),
    ("DEC", Mnemonic::Dec),
    ("ADD", Mnemonic::Add),
    ("SUB", Mnemonic::Sub),
    ("MUL", Mnemonic::Mul),
    ("DIV", Mnemonic::Div),
    ("JNZ", Mnemonic::Jnz),
    ("JEQ", Mnemonic::Jeq),
    ("JNE", Mnemonic::Jne),
    ("JGT", Mnemonic::Jgt),
    ("JLT", Mnemonic::Jlt),
    ("HLT", Mnemonic::Hlt),
    ("WIDTH", Mnemonic::Width),
    ("HEIGHT", Mnemonic::Height),
];

impl Mnemonic {
    fn parse(word: &str) -> Result<Self, AssemblerError> {
        MNEMONICS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(word))
            .map(|(_, mnemonic)| *mnemonic)
            .ok_or(AssemblerError::Kind(AssemblerErrorKind::UnknownMnemonic))
    }

    fn name(self) -> &'static str {
        MNEMONICS
            .iter()
            .find(|(_, mnemonic)| *mnemonic == self)
            .map(|(name, _)| *name)
            .unwrap_or("?")
    }
}

enum Statement {
    Op(Op),
    Width(u16),
    Height(u16),
}

/// First pass. Feed it every line, then turn it into an [`Emitter`]
/// and feed the same lines again.
pub struct Assembler<const LABEL_CAP: usize> {
    labels: Vec<Label, LABEL_CAP>,
    cursor: usize,
    width: Option<u16>,
    height: Option<u16>,
}

impl<const LABEL_CAP: usize> Default for Assembler<LABEL_CAP> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const LABEL_CAP: usize> Assembler<LABEL_CAP> {
    pub fn new() -> Self {
        Self {
            labels: Vec::new(),
            cursor: 0,
            width: None,
            height: None,
        }
    }

    pub fn scan_line(&mut self, line: &Line<'_>) -> Result<(), AssemblerError> {
        self.scan(line).map_err(|err| err.with_line(line.number))
    }

    /// Bytes of code laid out so far.
    pub fn code_len(&self) -> usize {
        self.cursor
    }

    pub fn canvas_size(&self) -> CanvasSize {
        CanvasSize {
            width: self.width.unwrap_or(DEFAULT_WIDTH),
            height: self.height.unwrap_or(DEFAULT_HEIGHT),
        }
    }

    pub fn label_offset(&self, name: &str) -> Option<Offset> {
        find_label(&self.labels, name)
    }

    /// Ends the first pass. Output goes to `buffer`.
    pub fn into_emitter(self, buffer: &mut [u8]) -> Result<Emitter<'_, LABEL_CAP>, AssemblerError> {
        let size = self.canvas_size();
        let mut builder = ImageBuilder::new(buffer)?;
        builder.set_canvas_size(size)?;
        Ok(Emitter {
            builder,
            labels: self.labels,
        })
    }

    fn scan(&mut self, line: &Line<'_>) -> Result<(), AssemblerError> {
        for name in line.labels() {
            self.add_label(name)?;
        }
        let Some((word, operands)) = line.instruction() else {
            return Ok(());
        };
        let mnemonic = Mnemonic::parse(word)?;

        // Widths do not depend on label values.
        match parse_statement(mnemonic, operands, |_| Ok(0))? {
            Statement::Op(op) => {
                let end = self
                    .cursor
                    .checked_add(op.width())
                    .ok_or(AssemblerErrorKind::StreamTooLong(usize::MAX))?;
                if end > MAX_STREAM_LEN {
                    return Err(AssemblerErrorKind::StreamTooLong(end).into());
                }
                self.cursor = end;
            }
            Statement::Width(width) => {
                if self.width.replace(width).is_some() {
                    return Err(AssemblerErrorKind::DuplicateDirective("WIDTH").into());
                }
            }
            Statement::Height(height) => {
                if self.height.replace(height).is_some() {
                    return Err(AssemblerErrorKind::DuplicateDirective("HEIGHT").into());
                }
            }
        }
        Ok(())
    }

    fn add_label(&mut self, name: &str) -> Result<(), AssemblerError> {
        let name = to_name(name)?;
        if self.labels.iter().any(|label| label.name == name) {
            return Err(AssemblerErrorKind::DuplicateLabel(name).into());
        }
        let offset = Offset::try_from(self.cursor)
            .map_err(|_| AssemblerErrorKind::StreamTooLong(self.cursor))?;
        self.labels
            .push(Label { name, offset })
            .map_err(|_| AssemblerError::Kind(AssemblerErrorKind::MaxLabelsExceeded))?;
        Ok(())
    }
}

/// Second pass.
pub struct Emitter<'a, const LABEL_CAP: usize> {
    builder: ImageBuilder<'a>,
    labels: Vec<Label, LABEL_CAP>,
}

impl<'a, const LABEL_CAP: usize> Emitter<'a, LABEL_CAP> {
    pub fn emit_line(&mut self, line: &Line<'_>) -> Result<(), AssemblerError> {
        self.emit(line).map_err(|err| err.with_line(line.number))
    }

    pub fn finish(self) -> ImageDescriptor {
        self.builder.finish()
    }

    fn emit(&mut self, line: &Line<'_>) -> Result<(), AssemblerError> {
        let Some((word, operands)) = line.instruction() else {
            return Ok(());
        };
        let mnemonic = Mnemonic::parse(word)?;
        let labels = &self.labels;
        let statement = parse_statement(mnemonic, operands, |name| {
            let name = to_name(name)?;
            find_label(labels, &name).ok_or(AssemblerError::Kind(AssemblerErrorKind::UnknownLabel(name)))
        })?;
        if let Statement::Op(op) = statement {
            self.builder.add_op(&op)?;
        }
        Ok(())
    }
}

/// Runs both passes over already lexed lines.
pub fn assemble<const LABEL_CAP: usize>(
    lines: &[Line<'_>],
    buffer: &mut [u8],
) -> Result<ImageDescriptor, AssemblerError> {
    let mut assembler = Assembler::<LABEL_CAP>::new();
    for line in lines {
        assembler.scan_line(line)?;
    }
    let mut emitter = assembler.into_emitter(buffer)?;
    for line in lines {
        emitter.emit_line(line)?;
    }
    Ok(emitter.finish())
}

/// Lexes `source` and runs both passes. The text is lexed once per pass
/// so no line storage is needed.
pub fn assemble_source<const LABEL_CAP: usize>(
    source: &str,
    buffer: &mut [u8],
) -> Result<ImageDescriptor, AssemblerError> {
    let mut assembler = Assembler::<LABEL_CAP>::new();
    for line in lex_source(source) {
        assembler.scan_line(&line?)?;
    }
    let mut emitter = assembler.into_emitter(buffer)?;
    for line in lex_source(source) {
        emitter.emit_line(&line?)?;
    }
    Ok(emitter.finish())
}

fn parse_statement(
    mnemonic: Mnemonic,
    operands: &[Token<'_>],
    resolve: impl Fn(&str) -> Result<Offset, AssemblerError>,
) -> Result<Statement, AssemblerError> {
    use Token::{LabelRef, Number, Register as Reg};

    let name = mnemonic.name();
    let invalid = || AssemblerError::Kind(AssemblerErrorKind::InvalidOperands(name));
    let operand = |token: &Token<'_>| -> Result<Operand, AssemblerError> {
        match token {
            Reg(register) => Ok(Operand::Register(*register)),
            Number(value) => Ok(Operand::Immediate(immediate(*value)?)),
            _ => Err(invalid()),
        }
    };

    let op = match (mnemonic, operands) {
        (Mnemonic::Drw, []) => Op::Draw,
        (Mnemonic::Mov, []) => Op::Move,
        (Mnemonic::Hlt, []) => Op::Halt,
        (Mnemonic::Sto, [Reg(register), rhs]) => Op::Store(*register, operand(rhs)?),
        (Mnemonic::Inc, [Reg(register)]) => Op::Increment(*register),
        (Mnemonic::Inc, [Reg(register), Number(value)]) => {
            Op::IncrementBy(*register, immediate(*value)?)
        }
        (Mnemonic::Dec, [Reg(register)]) => Op::Decrement(*register),
        (Mnemonic::Add, [Reg(register), rhs]) => Op::Add(*register, operand(rhs)?),
        (Mnemonic::Sub, [Reg(register), rhs]) => Op::Subtract(*register, operand(rhs)?),
        (Mnemonic::Mul, [Reg(register), rhs]) => Op::Multiply(*register, operand(rhs)?),
        (Mnemonic::Mul, [Reg(dest), Reg(src), Number(value)]) => {
            Op::MultiplyInto(*dest, *src, immediate(*value)?)
        }
        (Mnemonic::Div, [Reg(register), rhs]) => Op::Divide(*register, operand(rhs)?),
        (Mnemonic::Jnz, [Reg(register), LabelRef(label)]) => {
            Op::JumpIfNonZero(*register, resolve(label)?)
        }
        (Mnemonic::Jeq, [Reg(register), rhs, LabelRef(label)]) => {
            Op::JumpIfEqual(*register, operand(rhs)?, resolve(label)?)
        }
        (Mnemonic::Jne, [Reg(register), rhs, LabelRef(label)]) => {
            Op::JumpIfNotEqual(*register, operand(rhs)?, resolve(label)?)
        }
        (Mnemonic::Jgt, [Reg(register), rhs, LabelRef(label)]) => {
            Op::JumpIfGreaterThan(*register, operand(rhs)?, resolve(label)?)
        }
        (Mnemonic::Jlt, [Reg(register), rhs, LabelRef(label)]) => {
            Op::JumpIfLessThan(*register, operand(rhs)?, resolve(label)?)
        }
        (Mnemonic::Width, [Number(value)]) => return Ok(Statement::Width(dimension(*value)?)),
        (Mnemonic::Height, [Number(value)]) => return Ok(Statement::Height(dimension(*value)?)),
        _ => return Err(invalid()),
    };
    Ok(Statement::Op(op))
}

fn immediate(value: i64) -> Result<u16, AssemblerError> {
    u16::try_from(value).map_err(|_| AssemblerError::Kind(AssemblerErrorKind::ImmediateOutOfRange(value)))
}

fn dimension(value: i64) -> Result<u16, AssemblerError> {
    match u16::try_from(value) {
        Ok(dimension) if dimension > 0 => Ok(dimension),
        _ => Err(AssemblerError::Kind(AssemblerErrorKind::InvalidCanvasSize(value))),
    }
}

fn find_label(labels: &[Label], name: &str) -> Option<Offset> {
    labels
        .iter()
        .find(|label| label.name.as_str() == name)
        .map(|label| label.offset)
}

fn to_name(name: &str) -> Result<Name, AssemblerError> {
    let mut out: Name = String::new();
    out.push_str(name)
        .map_err(|_| AssemblerError::Kind(AssemblerErrorKind::NameTooLong))?;
    Ok(out)
}
