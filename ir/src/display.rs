use std::fmt;

use crate::func::{Function, ValueId};
use crate::inst::{InstKind, Terminator};
use crate::module::Module;

// LLVM-like textual dump. This is what `-o` writes and what verifier
// diagnostics embed, so it favors readability over round-tripping.

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, func) in self.functions.values().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", func)?;
        }
        Ok(())
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_declaration() {
            return writeln!(f, "declare {} @{}()", self.ret, self.name);
        }
        writeln!(f, "define {} @{}() {{", self.ret, self.name)?;
        for block in self.blocks() {
            writeln!(f, "{}:", block.name)?;
            for &id in &block.insts {
                writeln!(f, "  {}", self.fmt_inst(id))?;
            }
            match &block.term {
                Some(term) => writeln!(f, "  {}", self.fmt_term(term))?,
                None => writeln!(f, "  <no terminator>")?,
            }
        }
        writeln!(f, "}}")
    }
}

impl Function {
    /// Operand spelling: constants inline, everything else by arena index.
    fn operand(&self, id: ValueId) -> String {
        match &self.value(id).kind {
            InstKind::Const { value } => value.to_string(),
            _ => format!("%{}", id.0),
        }
    }

    fn fmt_inst(&self, id: ValueId) -> String {
        let inst = self.value(id);
        match &inst.kind {
            InstKind::Alloca { name } => format!("%{} = alloca i32  ; {}", id.0, name),
            InstKind::Const { value } => format!("%{} = i32 {}", id.0, value),
            InstKind::Load { addr } => {
                format!("%{} = load i32, ptr {}", id.0, self.operand(*addr))
            }
            InstKind::Store { value, addr } => format!(
                "store i32 {}, ptr {}",
                self.operand(*value),
                self.operand(*addr)
            ),
            InstKind::Binary { op, lhs, rhs } => format!(
                "%{} = {} i32 {}, {}",
                id.0,
                op,
                self.operand(*lhs),
                self.operand(*rhs)
            ),
            InstKind::Icmp { pred, lhs, rhs } => format!(
                "%{} = icmp {} i32 {}, {}",
                id.0,
                pred,
                self.operand(*lhs),
                self.operand(*rhs)
            ),
            InstKind::Zext { value } => {
                format!("%{} = zext i1 {} to i32", id.0, self.operand(*value))
            }
            InstKind::IntToPtr { value } => {
                format!("%{} = inttoptr i32 {} to ptr", id.0, self.operand(*value))
            }
            InstKind::PtrToInt { value } => {
                format!("%{} = ptrtoint ptr {} to i32", id.0, self.operand(*value))
            }
            InstKind::Bitcast { value } => format!(
                "%{} = bitcast {} {}",
                id.0,
                self.value(*value).ty,
                self.operand(*value)
            ),
            InstKind::Call { callee } => format!("%{} = call i32 @{}()", id.0, callee),
        }
    }

    fn fmt_term(&self, term: &Terminator) -> String {
        match term {
            Terminator::Br { target } => {
                format!("br label %{}", self.block(*target).name)
            }
            Terminator::CondBr {
                cond,
                then_dest,
                else_dest,
            } => format!(
                "br i32 {}, label %{}, label %{}",
                self.operand(*cond),
                self.block(*then_dest).name,
                self.block(*else_dest).name
            ),
            Terminator::Ret { value: Some(v) } => format!("ret i32 {}", self.operand(*v)),
            Terminator::Ret { value: None } => "ret void".to_string(),
        }
    }
}
