use super::*;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyError {
    #[error("offset {offset}: {error}")]
    Decode { offset: usize, error: MachineError },
    #[error("jump at offset {at} targets {target}, past the end of the stream")]
    TargetOutOfBounds { at: usize, target: Offset },
    #[error("jump at offset {at} targets {target}, inside another instruction")]
    MisalignedTarget { at: usize, target: Offset },
}

/// Linear walk over an instruction stream yielding `(offset, op)`.
/// Stops after the first decode error.
pub struct Instructions<'a> {
    code: &'a [u8],
    offset: usize,
    failed: bool,
}

pub fn disassemble(code: &[u8]) -> Instructions<'_> {
    Instructions {
        code,
        offset: 0,
        failed: false,
    }
}

impl Iterator for Instructions<'_> {
    type Item = Result<(usize, Op), VerifyError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.code.len() {
            return None;
        }
        let offset = self.offset;
        let decoded = Op::decode(self.code, offset).and_then(|op| {
            offset
                .checked_add(op.width())
                .map(|next| (op, next))
                .ok_or(MachineError::ProgramCounterOutOfBounds(offset))
        });
        match decoded {
            Ok((op, next)) => {
                self.offset = next;
                Some(Ok((offset, op)))
            }
            Err(error) => {
                self.failed = true;
                Some(Err(VerifyError::Decode { offset, error }))
            }
        }
    }
}

/// Checks that the whole stream decodes and every jump lands on the
/// first byte of an instruction or on the end of the stream. Jumping
/// to the end is legal here; running into it faults at runtime.
/// Returns the instruction count.
pub fn verify(code: &[u8]) -> Result<usize, VerifyError> {
    let mut boundaries = Boundaries::new();
    let mut count = 0usize;
    for item in disassemble(code) {
        let (offset, _) = item?;
        boundaries.mark(offset);
        count = count.saturating_add(1);
    }
    boundaries.mark(code.len());

    for (at, op) in disassemble(code).map_while(Result::ok) {
        let Some(target) = op.jump_target() else {
            continue;
        };
        let offset = usize::from(target);
        if offset > code.len() {
            return Err(VerifyError::TargetOutOfBounds { at, target });
        }
        if !boundaries.contains(offset) {
            return Err(VerifyError::MisalignedTarget { at, target });
        }
    }
    Ok(count)
}

// 65536 addressable offsets, one bit each.
const BOUNDARY_BYTES: usize = 8192;

struct Boundaries([u8; BOUNDARY_BYTES]);

impl Boundaries {
    fn new() -> Self {
        Self([0; BOUNDARY_BYTES])
    }

    fn locate(offset: usize) -> Option<(usize, u8)> {
        let byte = offset.checked_div(8)?;
        let bit = u32::try_from(offset.checked_rem(8)?).ok()?;
        Some((byte, 1u8.checked_shl(bit)?))
    }

    // Offsets past the addressable range are never jump targets.
    fn mark(&mut self, offset: usize) {
        let Some((byte, mask)) = Self::locate(offset) else {
            return;
        };
        if let Some(slot) = self.0.get_mut(byte) {
            *slot |= mask;
        }
    }

    fn contains(&self, offset: usize) -> bool {
        Self::locate(offset)
            .and_then(|(byte, mask)| self.0.get(byte).map(|slot| slot & mask != 0))
            .unwrap_or(false)
    }
}
