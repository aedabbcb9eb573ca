mod lower;
mod mem;

use std::collections::{HashMap, HashSet};

use ir::{BlockId, Function, InstKind, Module, Terminator, ValueId};

use crate::error::LiftError;
use crate::parser::{Instruction, Opcode, Operand};

// ----------------------------------------------------------------------------
// Lifter

/// Lifts the flat instruction stream into a verified SSA module.
///
/// Function discovery runs first: every `call` target that is a label, plus
/// `main`, names a function. A labeled instruction either opens one of those
/// functions (fresh block and slot namespaces) or opens a basic block inside
/// the current function. Machine registers and flag bits materialize as i32
/// stack slots on first reference.
pub struct Lifter {
    module: Module,
    targets: HashSet<String>,
    cur: Option<FuncState>,
}

struct FuncState {
    name: String,
    block: BlockId,
    slots: HashMap<String, ValueId>,
    conts: usize,
}

impl Lifter {
    pub fn lift(instructions: &[Instruction]) -> Result<Module, LiftError> {
        let mut lifter = Lifter {
            module: Module::new(),
            targets: call_targets(instructions),
            cur: None,
        };
        for inst in instructions {
            lifter.enter_label(inst);
            lifter.lower(inst)?;
        }
        lifter.terminate();
        lifter.check()?;
        Ok(lifter.module)
    }

    // ------------------------------------------------------------------------
    // Function and block bookkeeping

    fn enter_label(&mut self, inst: &Instruction) {
        let Some(label) = inst.label.clone() else {
            return;
        };
        if label == "main" || self.targets.contains(&label) {
            self.open_function(&label, &label);
        } else if self.cur.is_none() {
            // A plain label before any function: open `main` implicitly with
            // the labeled block as its entry.
            self.open_function("main", &label);
        } else {
            let block = self.block_by_name(&label);
            self.set_cursor(block);
        }
    }

    fn open_function(&mut self, name: &str, entry: &str) {
        let func = self.module.get_or_insert(name);
        let block = func.add_block(entry);
        self.cur = Some(FuncState {
            name: name.to_string(),
            block,
            slots: HashMap::new(),
            conts: 0,
        });
    }

    /// Opens `main` when instructions appear before any label.
    fn ensure_function(&mut self) {
        if self.cur.is_none() {
            self.open_function("main", "entry");
        }
    }

    fn parts(&mut self) -> (&mut FuncState, &mut Function) {
        let cur = self.cur.as_mut().expect("lifter: no function open");
        let func = self
            .module
            .functions
            .get_mut(&cur.name)
            .expect("lifter: current function exists");
        (cur, func)
    }

    fn set_cursor(&mut self, block: BlockId) {
        self.parts().0.block = block;
    }

    fn block_by_name(&mut self, name: &str) -> BlockId {
        let (_, func) = self.parts();
        match func.find_block(name) {
            Some(block) => block,
            None => func.add_block(name),
        }
    }

    /// A fresh continuation block (`cont`, `cont.1`, ...), skipping names the
    /// source already uses as labels.
    fn fresh_block(&mut self) -> BlockId {
        let (cur, func) = self.parts();
        loop {
            let name = if cur.conts == 0 {
                "cont".to_string()
            } else {
                format!("cont.{}", cur.conts)
            };
            cur.conts += 1;
            if func.find_block(&name).is_none() {
                return func.add_block(&name);
            }
        }
    }

    /// The block new instructions go into. A terminated current block (a
    /// `ret` was just lowered) rolls over into a fresh continuation block so
    /// nothing is ever appended after a terminator.
    fn insertion_block(&mut self) -> BlockId {
        let (cur, func) = self.parts();
        if !func.is_terminated(cur.block) {
            return cur.block;
        }
        let block = self.fresh_block();
        self.set_cursor(block);
        block
    }

    fn push(&mut self, kind: InstKind) -> ValueId {
        let block = self.insertion_block();
        let (_, func) = self.parts();
        func.push_inst(block, kind)
    }

    fn push_const(&mut self, value: i32) -> ValueId {
        self.parts().1.push_const(value)
    }

    fn terminate_current(&mut self, term: Terminator) {
        let block = self.insertion_block();
        let (_, func) = self.parts();
        func.set_term(block, term);
    }

    /// The i32 stack slot for a register, flag, or the pseudo stack pointer,
    /// created at the current insertion point on first reference.
    fn slot(&mut self, name: &str) -> ValueId {
        if let Some(&slot) = self.parts().0.slots.get(name) {
            return slot;
        }
        let slot = self.push(InstKind::Alloca {
            name: name.to_string(),
        });
        self.parts().0.slots.insert(name.to_string(), slot);
        slot
    }

    /// Ensures `name` exists in the module, as a declaration if its body has
    /// not been seen.
    fn declare(&mut self, name: &str) {
        self.module.get_or_insert(name);
    }

    // ------------------------------------------------------------------------
    // Finalization

    /// Every block of every function must end in a terminator; blocks the
    /// stream left open return 0.
    fn terminate(&mut self) {
        for func in self.module.functions.values_mut() {
            for i in 0..func.blocks().len() {
                let block = BlockId(i as u32);
                if !func.is_terminated(block) {
                    let zero = func.push_const(0);
                    func.set_term(block, Terminator::Ret { value: Some(zero) });
                }
            }
        }
    }

    fn check(&self) -> Result<(), LiftError> {
        if let Err(err) = ir::verify(&self.module) {
            let dump = match self.module.get(err.function()) {
                Some(func) => func.to_string(),
                None => self.module.to_string(),
            };
            return Err(LiftError::Verify {
                message: err.to_string(),
                dump,
            });
        }
        Ok(())
    }
}

/// The function set: every `call` target that parsed as a label.
fn call_targets(instructions: &[Instruction]) -> HashSet<String> {
    instructions
        .iter()
        .filter(|inst| inst.op == Opcode::CALL)
        .filter_map(|inst| match inst.operands.as_slice() {
            [Operand::Label(name)] => Some(name.clone()),
            _ => None,
        })
        .collect()
}
