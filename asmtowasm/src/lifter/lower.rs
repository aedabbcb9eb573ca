use ir::{BinOp, InstKind, Pred, Terminator, ValueId};

use crate::error::LiftError;
use crate::lifter::Lifter;
use crate::parser::{Instruction, Opcode, Operand};

// Per-opcode lowering. Arithmetic and moves write through register slots,
// compares fan out into the five flag slots, jumps terminate the current
// block and continue in a fresh one.

const STACK_PTR: &str = "STACK_PTR";

impl Lifter {
    pub(super) fn lower(&mut self, inst: &Instruction) -> Result<(), LiftError> {
        if inst.op != Opcode::LABEL {
            self.ensure_function();
        }
        match inst.op {
            Opcode::ADD | Opcode::SUB | Opcode::MUL | Opcode::DIV => self.lower_arith(inst),
            Opcode::MOV => self.lower_mov(inst),
            Opcode::CMP => self.lower_cmp(inst),
            Opcode::JMP
            | Opcode::JE
            | Opcode::JNE
            | Opcode::JL
            | Opcode::JG
            | Opcode::JLE
            | Opcode::JGE => self.lower_jump(inst),
            Opcode::CALL => self.lower_call(inst),
            Opcode::RET => self.lower_ret(inst),
            Opcode::PUSH | Opcode::POP => self.lower_stack(inst),
            // Block discovery already consumed the label.
            Opcode::LABEL => Ok(()),
            Opcode::UNKNOWN => Err(LiftError::UnsupportedInstruction {
                op: inst.op.to_string(),
            }),
        }
    }

    /// Loads an operand as an i32 value. A memory operand yields its
    /// effective *address*; only `mov` dereferences it.
    fn operand_value(&mut self, inst: &Instruction, op: &Operand) -> Result<ValueId, LiftError> {
        match op {
            Operand::Register(name) => {
                let slot = self.slot(name);
                Ok(self.push(InstKind::Load { addr: slot }))
            }
            Operand::Immediate(value) => Ok(self.push_const(*value)),
            Operand::Memory(body) => self.mem_address(body),
            Operand::Label(_) => Err(LiftError::UnsupportedOperand {
                op: inst.op.to_string(),
            }),
        }
    }

    fn need(inst: &Instruction, needs: usize) -> Result<(), LiftError> {
        if inst.operands.len() < needs {
            return Err(LiftError::MissingOperands {
                op: inst.op.to_string(),
                needs,
                got: inst.operands.len(),
            });
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Arithmetic / moves

    fn lower_arith(&mut self, inst: &Instruction) -> Result<(), LiftError> {
        Self::need(inst, 2)?;
        let lhs = self.operand_value(inst, &inst.operands[0])?;
        let rhs = self.operand_value(inst, &inst.operands[1])?;
        let op = match inst.op {
            Opcode::ADD => BinOp::Add,
            Opcode::SUB => BinOp::Sub,
            Opcode::MUL => BinOp::Mul,
            _ => BinOp::Sdiv,
        };
        let result = self.push(InstKind::Binary { op, lhs, rhs });
        // The result lands in the first operand's slot when it is a
        // register; otherwise it is discarded.
        if let Operand::Register(name) = &inst.operands[0] {
            let slot = self.slot(name);
            self.push(InstKind::Store {
                value: result,
                addr: slot,
            });
        }
        Ok(())
    }

    fn lower_mov(&mut self, inst: &Instruction) -> Result<(), LiftError> {
        Self::need(inst, 2)?;
        match (&inst.operands[0], &inst.operands[1]) {
            (Operand::Register(dst), src) => {
                let value = self.operand_value(inst, src)?;
                let slot = self.slot(dst);
                self.push(InstKind::Store { value, addr: slot });
                Ok(())
            }
            // Memory first, register second: load through the effective
            // address into the register.
            (Operand::Memory(body), Operand::Register(reg)) => {
                let addr = self.mem_address(body)?;
                let ptr = self.push(InstKind::IntToPtr { value: addr });
                let value = self.push(InstKind::Load { addr: ptr });
                let slot = self.slot(reg);
                self.push(InstKind::Store { value, addr: slot });
                Ok(())
            }
            (Operand::Memory(_), _) => Err(LiftError::MemoryToMemoryMove),
            _ => Err(LiftError::InvalidDestination {
                op: inst.op.to_string(),
            }),
        }
    }

    // ------------------------------------------------------------------------
    // Compare and flags

    fn lower_cmp(&mut self, inst: &Instruction) -> Result<(), LiftError> {
        Self::need(inst, 2)?;
        let lhs = self.operand_value(inst, &inst.operands[0])?;
        let rhs = self.operand_value(inst, &inst.operands[1])?;
        for (pred, flag) in [
            (Pred::Eq, "FLAG_ZF"),
            (Pred::Slt, "FLAG_LT"),
            (Pred::Sgt, "FLAG_GT"),
            (Pred::Sle, "FLAG_LE"),
            (Pred::Sge, "FLAG_GE"),
        ] {
            let cmp = self.push(InstKind::Icmp { pred, lhs, rhs });
            let bit = self.push(InstKind::Zext { value: cmp });
            let slot = self.slot(flag);
            self.push(InstKind::Store {
                value: bit,
                addr: slot,
            });
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Control flow

    fn lower_jump(&mut self, inst: &Instruction) -> Result<(), LiftError> {
        Self::need(inst, 1)?;
        let Operand::Label(name) = &inst.operands[0] else {
            return Err(LiftError::UnsupportedOperand {
                op: inst.op.to_string(),
            });
        };
        let target = self.block_by_name(name);

        if inst.op == Opcode::JMP {
            self.terminate_current(Terminator::Br { target });
            let cont = self.fresh_block();
            self.set_cursor(cont);
            return Ok(());
        }

        let flag = match inst.op {
            Opcode::JE | Opcode::JNE => "FLAG_ZF",
            Opcode::JL => "FLAG_LT",
            Opcode::JG => "FLAG_GT",
            Opcode::JLE => "FLAG_LE",
            _ => "FLAG_GE",
        };
        let slot = self.slot(flag);
        let cond = self.push(InstKind::Load { addr: slot });
        let cont = self.fresh_block();
        // Taken if the flag is non-zero; JNE jumps on a cleared ZF, so its
        // successors swap.
        let term = if inst.op == Opcode::JNE {
            Terminator::CondBr {
                cond,
                then_dest: cont,
                else_dest: target,
            }
        } else {
            Terminator::CondBr {
                cond,
                then_dest: target,
                else_dest: cont,
            }
        };
        self.terminate_current(term);
        self.set_cursor(cont);
        Ok(())
    }

    fn lower_call(&mut self, inst: &Instruction) -> Result<(), LiftError> {
        Self::need(inst, 1)?;
        let name = match &inst.operands[0] {
            Operand::Label(name) | Operand::Register(name) => name.clone(),
            _ => {
                return Err(LiftError::UnsupportedOperand {
                    op: inst.op.to_string(),
                })
            }
        };
        // Declare the callee on first reference; the return value is
        // discarded.
        self.declare(&name);
        self.push(InstKind::Call { callee: name });
        Ok(())
    }

    fn lower_ret(&mut self, inst: &Instruction) -> Result<(), LiftError> {
        let value = match inst.operands.first() {
            Some(op) => self.operand_value(inst, op)?,
            None => self.push_const(0),
        };
        self.terminate_current(Terminator::Ret { value: Some(value) });
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Pseudo stack

    fn lower_stack(&mut self, inst: &Instruction) -> Result<(), LiftError> {
        Self::need(inst, 1)?;
        if inst.op == Opcode::PUSH {
            let value = self.operand_value(inst, &inst.operands[0])?;
            let sp = self.slot(STACK_PTR);
            let top = self.push(InstKind::Load { addr: sp });
            let four = self.push_const(4);
            let new_top = self.push(InstKind::Binary {
                op: BinOp::Sub,
                lhs: top,
                rhs: four,
            });
            self.push(InstKind::Store {
                value: new_top,
                addr: sp,
            });
            let addr = self.push(InstKind::IntToPtr { value: new_top });
            self.push(InstKind::Store { value, addr });
        } else {
            let sp = self.slot(STACK_PTR);
            let top = self.push(InstKind::Load { addr: sp });
            let addr = self.push(InstKind::IntToPtr { value: top });
            let value = self.push(InstKind::Load { addr });
            let four = self.push_const(4);
            let new_top = self.push(InstKind::Binary {
                op: BinOp::Add,
                lhs: top,
                rhs: four,
            });
            self.push(InstKind::Store {
                value: new_top,
                addr: sp,
            });
            if let Operand::Register(name) = &inst.operands[0] {
                let slot = self.slot(name);
                self.push(InstKind::Store { value, addr: slot });
            }
        }
        Ok(())
    }
}
