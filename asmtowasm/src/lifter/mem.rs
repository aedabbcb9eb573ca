use ir::{BinOp, InstKind, ValueId};

use crate::error::LiftError;
use crate::lifter::Lifter;

/// Shapes a memory operand body can take: `%reg+offset`, `%reg`, or an
/// absolute integer address.
#[derive(Debug, Clone, PartialEq, Eq)]
enum MemAddr {
    BaseOffset(String, i32),
    Base(String),
    Absolute(i32),
}

fn parse_mem(body: &str) -> Result<MemAddr, LiftError> {
    let invalid = || LiftError::InvalidMemoryOperand {
        body: body.to_string(),
    };
    if let Some((base, offset)) = body.split_once('+') {
        let offset = offset.trim().parse::<i32>().map_err(|_| invalid())?;
        return Ok(MemAddr::BaseOffset(base.trim().to_string(), offset));
    }
    if body.contains('%') {
        return Ok(MemAddr::Base(body.trim().to_string()));
    }
    body.trim()
        .parse::<i32>()
        .map(MemAddr::Absolute)
        .map_err(|_| invalid())
}

impl Lifter {
    /// The effective address of a memory operand, as an i32 value.
    pub(super) fn mem_address(&mut self, body: &str) -> Result<ValueId, LiftError> {
        match parse_mem(body)? {
            MemAddr::BaseOffset(base, offset) => {
                let slot = self.slot(&base);
                let base = self.push(InstKind::Load { addr: slot });
                let offset = self.push_const(offset);
                Ok(self.push(InstKind::Binary {
                    op: BinOp::Add,
                    lhs: base,
                    rhs: offset,
                }))
            }
            MemAddr::Base(base) => {
                let slot = self.slot(&base);
                Ok(self.push(InstKind::Load { addr: slot }))
            }
            MemAddr::Absolute(addr) => Ok(self.push_const(addr)),
        }
    }
}
