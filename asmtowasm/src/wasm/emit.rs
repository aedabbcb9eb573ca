use std::collections::HashMap;

use indexmap::IndexMap;
use ir::{BinOp, BlockId, Function, InstKind, Pred, Terminator, ValueId};

use crate::error::EmitError;
use crate::wasm::{WasmFunction, WasmInst, WasmModule, WasmType};

// ----------------------------------------------------------------------------
// Module emission

pub struct Emitter;

impl Emitter {
    /// Lowers the IR module into a wasm module: one function per defined IR
    /// function, indexed by declaration order. Declaration-only functions are
    /// skipped and are not callable; resolving one is an error.
    pub fn emit(module: &ir::Module) -> Result<WasmModule, EmitError> {
        let mut indices: IndexMap<String, u32> = IndexMap::new();
        for func in module.functions.values() {
            if !func.is_declaration() {
                let index = indices.len() as u32;
                indices.insert(func.name.clone(), index);
            }
        }

        let mut wasm = WasmModule::new();
        for func in module.functions.values() {
            if func.is_declaration() {
                continue;
            }
            wasm.functions.push(FuncEmitter::new(func, &indices).run()?);
        }
        wasm.function_indices = indices;
        Ok(wasm)
    }
}

// ----------------------------------------------------------------------------
// Function emission

struct FuncEmitter<'a> {
    func: &'a Function,
    indices: &'a IndexMap<String, u32>,
    locals: HashMap<ValueId, u32>,
    local_types: Vec<WasmType>,
    insts: Vec<WasmInst>,
}

impl<'a> FuncEmitter<'a> {
    fn new(func: &'a Function, indices: &'a IndexMap<String, u32>) -> Self {
        FuncEmitter {
            func,
            indices,
            locals: HashMap::new(),
            local_types: Vec::new(),
            insts: Vec::new(),
        }
    }

    fn run(mut self) -> Result<WasmFunction, EmitError> {
        self.assign_locals();
        if self.needs_dispatch() {
            self.emit_dispatch()?;
        } else {
            self.emit_block(BlockId(0), None)?;
        }
        Ok(WasmFunction {
            name: self.func.name.clone(),
            params: Vec::new(),
            ret: WasmType::from_ir(self.func.ret),
            locals: self.local_types,
            insts: self.insts,
        })
    }

    // ------------------------------------------------------------------------
    // Local pre-assignment

    /// Every alloca gets a local first, then every SSA value that must
    /// survive on its own: arithmetic, compares, zero-extensions, casts, and
    /// loads through linear memory (their result feeds a later push).
    fn assign_locals(&mut self) {
        let func = self.func;
        for block in func.blocks() {
            for &v in &block.insts {
                if matches!(func.value(v).kind, InstKind::Alloca { .. }) {
                    self.assign(v);
                }
            }
        }
        for block in func.blocks() {
            for &v in &block.insts {
                match &func.value(v).kind {
                    InstKind::Binary { .. }
                    | InstKind::Icmp { .. }
                    | InstKind::Zext { .. }
                    | InstKind::IntToPtr { .. }
                    | InstKind::PtrToInt { .. }
                    | InstKind::Bitcast { .. } => {
                        self.assign(v);
                    }
                    InstKind::Load { addr } if !self.is_alloca(*addr) => {
                        self.assign(v);
                    }
                    _ => {}
                }
            }
        }
    }

    fn assign(&mut self, v: ValueId) -> u32 {
        if let Some(&index) = self.locals.get(&v) {
            return index;
        }
        let index = self.local_types.len() as u32;
        self.local_types.push(WasmType::I32);
        self.locals.insert(v, index);
        index
    }

    fn local(&self, v: ValueId) -> Result<u32, EmitError> {
        self.locals.get(&v).copied().ok_or(EmitError::MissingLocal {
            func: self.func.name.clone(),
            value: v.0,
        })
    }

    fn is_alloca(&self, v: ValueId) -> bool {
        matches!(self.func.value(v).kind, InstKind::Alloca { .. })
    }

    // ------------------------------------------------------------------------
    // Control flow

    /// Straight-line emission is only safe for a lone `ret`-terminated block;
    /// anything with a branch goes through the dispatch loop.
    fn needs_dispatch(&self) -> bool {
        self.func.blocks().len() > 1
            || !matches!(
                self.func.block(BlockId(0)).term,
                Some(Terminator::Ret { .. })
            )
    }

    /// Arbitrary CFGs lower through a dispatch loop: a `pc` local selects the
    /// basic block, `br_table` jumps to its code, and every terminator either
    /// returns or updates `pc` and restarts the loop.
    fn emit_dispatch(&mut self) -> Result<(), EmitError> {
        let count = self.func.blocks().len();
        let pc = self.local_types.len() as u32;
        self.local_types.push(WasmType::I32);

        self.insts.push(WasmInst::I32Const(0));
        self.insts.push(WasmInst::LocalSet(pc));
        self.insts.push(WasmInst::Loop);
        for _ in 0..count {
            self.insts.push(WasmInst::Block);
        }
        self.insts.push(WasmInst::LocalGet(pc));
        self.insts
            .push(WasmInst::BrTable((0..count as u32).collect(), 0));
        for i in 0..count {
            self.insts.push(WasmInst::End);
            // From block i's code the loop header sits below the remaining
            // selector blocks.
            let loop_depth = (count - 1 - i) as u32;
            self.emit_block(BlockId(i as u32), Some((pc, loop_depth)))?;
        }
        self.insts.push(WasmInst::End);
        self.insts.push(WasmInst::Unreachable);
        Ok(())
    }

    fn emit_block(&mut self, id: BlockId, dispatch: Option<(u32, u32)>) -> Result<(), EmitError> {
        let func = self.func;
        let block = func.block(id);
        for &v in &block.insts {
            self.emit_inst(v)?;
        }
        match &block.term {
            Some(term) => self.emit_term(term, dispatch),
            // The lifter seals every block; an open one cannot reach here
            // through `Lifter::lift`, but a hand-built module might.
            None => Err(EmitError::UnsupportedValue {
                func: self.func.name.clone(),
                value: id.0,
            }),
        }
    }

    fn emit_term(
        &mut self,
        term: &Terminator,
        dispatch: Option<(u32, u32)>,
    ) -> Result<(), EmitError> {
        match *term {
            Terminator::Ret { value } => {
                if let Some(v) = value {
                    self.push_value(v)?;
                }
                self.insts.push(WasmInst::Return);
                Ok(())
            }
            Terminator::Br { target } => {
                let (pc, depth) = self.dispatch_slot(dispatch)?;
                self.insts.push(WasmInst::I32Const(target.0 as i32));
                self.insts.push(WasmInst::LocalSet(pc));
                self.insts.push(WasmInst::Br(depth));
                Ok(())
            }
            Terminator::CondBr {
                cond,
                then_dest,
                else_dest,
            } => {
                let (pc, depth) = self.dispatch_slot(dispatch)?;
                self.push_value(cond)?;
                self.insts.push(WasmInst::If);
                self.insts.push(WasmInst::I32Const(then_dest.0 as i32));
                self.insts.push(WasmInst::LocalSet(pc));
                self.insts.push(WasmInst::Else);
                self.insts.push(WasmInst::I32Const(else_dest.0 as i32));
                self.insts.push(WasmInst::LocalSet(pc));
                self.insts.push(WasmInst::End);
                self.insts.push(WasmInst::Br(depth));
                Ok(())
            }
        }
    }

    fn dispatch_slot(&self, dispatch: Option<(u32, u32)>) -> Result<(u32, u32), EmitError> {
        dispatch.ok_or(EmitError::UnsupportedValue {
            func: self.func.name.clone(),
            value: 0,
        })
    }

    // ------------------------------------------------------------------------
    // Instructions

    fn emit_inst(&mut self, v: ValueId) -> Result<(), EmitError> {
        let func = self.func;
        match &func.value(v).kind {
            // Already a local; nothing executes.
            InstKind::Alloca { .. } => Ok(()),
            InstKind::Const { .. } => Ok(()),

            InstKind::Binary { .. } => {
                self.push_binary(v)?;
                let slot = self.local(v)?;
                self.insts.push(WasmInst::LocalSet(slot));
                Ok(())
            }

            // The result stays on the stack; the zero-extension that follows
            // claims it.
            InstKind::Icmp { pred, lhs, rhs } => {
                let (pred, lhs, rhs) = (*pred, *lhs, *rhs);
                self.push_value(lhs)?;
                self.push_value(rhs)?;
                self.insts.push(pred_inst(pred));
                Ok(())
            }

            InstKind::Zext { value } => {
                match &func.value(*value).kind {
                    InstKind::Icmp { .. } => {}
                    InstKind::Const { value } => {
                        self.insts.push(WasmInst::I32Const(*value));
                    }
                    InstKind::Load { addr } if self.is_alloca(*addr) => {
                        let slot = self.local(*addr)?;
                        self.insts.push(WasmInst::LocalGet(slot));
                    }
                    _ => {
                        return Err(EmitError::UnsupportedZext {
                            func: func.name.clone(),
                        })
                    }
                }
                let slot = self.local(v)?;
                self.insts.push(WasmInst::LocalSet(slot));
                Ok(())
            }

            InstKind::Load { addr } => {
                // A register slot read lowers at its use sites; only loads
                // through linear memory execute here.
                if self.is_alloca(*addr) {
                    return Ok(());
                }
                self.push_addr(*addr)?;
                self.insts.push(WasmInst::I32Load { align: 2, offset: 0 });
                let slot = self.local(v)?;
                self.insts.push(WasmInst::LocalSet(slot));
                Ok(())
            }

            InstKind::Store { value, addr } => {
                let (value, addr) = (*value, *addr);
                if self.is_alloca(addr) {
                    self.push_value(value)?;
                    let slot = self.local(addr)?;
                    self.insts.push(WasmInst::LocalSet(slot));
                } else {
                    // Address first, then value: wasm's store operand order.
                    self.push_addr(addr)?;
                    self.push_value(value)?;
                    self.insts.push(WasmInst::I32Store { align: 2, offset: 0 });
                }
                Ok(())
            }

            // Pure casts never materialize.
            InstKind::IntToPtr { .. } | InstKind::PtrToInt { .. } | InstKind::Bitcast { .. } => {
                Ok(())
            }

            InstKind::Call { callee } => {
                let index =
                    self.indices
                        .get(callee)
                        .copied()
                        .ok_or_else(|| EmitError::UnknownCallee {
                            name: callee.clone(),
                        })?;
                self.insts.push(WasmInst::Call(index));
                // The i32 result is always discarded in this subset.
                self.insts.push(WasmInst::Drop);
                Ok(())
            }
        }
    }

    // ------------------------------------------------------------------------
    // Operand pushes

    /// Pushes an i32 value: constants inline, register reads from their
    /// slot, everything else from its captured local.
    fn push_value(&mut self, v: ValueId) -> Result<(), EmitError> {
        let func = self.func;
        match &func.value(v).kind {
            InstKind::Const { value } => {
                self.insts.push(WasmInst::I32Const(*value));
                Ok(())
            }
            InstKind::Load { addr } if self.is_alloca(*addr) => {
                let slot = self.local(*addr)?;
                self.insts.push(WasmInst::LocalGet(slot));
                Ok(())
            }
            InstKind::Load { .. }
            | InstKind::Binary { .. }
            | InstKind::Icmp { .. }
            | InstKind::Zext { .. } => {
                let slot = self.local(v)?;
                self.insts.push(WasmInst::LocalGet(slot));
                Ok(())
            }
            InstKind::IntToPtr { value }
            | InstKind::PtrToInt { value }
            | InstKind::Bitcast { value } => self.push_value(*value),
            InstKind::Alloca { .. } | InstKind::Store { .. } | InstKind::Call { .. } => {
                Err(EmitError::UnsupportedValue {
                    func: func.name.clone(),
                    value: v.0,
                })
            }
        }
    }

    /// Pushes a linear-memory address: the integer value behind the
    /// `inttoptr` cast.
    fn push_addr(&mut self, addr: ValueId) -> Result<(), EmitError> {
        let func = self.func;
        match &func.value(addr).kind {
            InstKind::IntToPtr { value } => self.push_value(*value),
            InstKind::Bitcast { value } => self.push_addr(*value),
            InstKind::Const { value } => {
                self.insts.push(WasmInst::I32Const(*value));
                Ok(())
            }
            _ => Err(EmitError::UnsupportedValue {
                func: func.name.clone(),
                value: addr.0,
            }),
        }
    }

    fn push_binary(&mut self, v: ValueId) -> Result<(), EmitError> {
        let func = self.func;
        let InstKind::Binary { op, lhs, rhs } = &func.value(v).kind else {
            return Err(EmitError::UnsupportedValue {
                func: func.name.clone(),
                value: v.0,
            });
        };
        let (op, lhs, rhs) = (*op, *lhs, *rhs);
        self.push_value(lhs)?;
        self.push_value(rhs)?;
        self.insts.push(binop_inst(op));
        Ok(())
    }
}

fn binop_inst(op: BinOp) -> WasmInst {
    match op {
        BinOp::Add => WasmInst::I32Add,
        BinOp::Sub => WasmInst::I32Sub,
        BinOp::Mul => WasmInst::I32Mul,
        BinOp::Sdiv => WasmInst::I32DivS,
        BinOp::Udiv => WasmInst::I32DivU,
    }
}

fn pred_inst(pred: Pred) -> WasmInst {
    match pred {
        Pred::Eq => WasmInst::I32Eq,
        Pred::Ne => WasmInst::I32Ne,
        Pred::Slt => WasmInst::I32LtS,
        Pred::Ult => WasmInst::I32LtU,
        Pred::Sgt => WasmInst::I32GtS,
        Pred::Ugt => WasmInst::I32GtU,
        Pred::Sle => WasmInst::I32LeS,
        Pred::Ule => WasmInst::I32LeU,
        Pred::Sge => WasmInst::I32GeS,
        Pred::Uge => WasmInst::I32GeU,
    }
}
