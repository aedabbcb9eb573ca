use std::fmt;

use itertools::Itertools;

/// The instruction subset of the modelled module. Each variant knows its
/// text mnemonic (`Display`) and its binary encoding (`binary::encode_inst`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WasmInst {
    // Control
    Block,
    Loop,
    If,
    Else,
    End,
    Br(u32),
    BrIf(u32),
    BrTable(Vec<u32>, u32),
    Return,
    Call(u32),
    Unreachable,
    Nop,

    // Parametric and locals
    Drop,
    LocalGet(u32),
    LocalSet(u32),
    LocalTee(u32),

    // Memory
    I32Load { align: u32, offset: u32 },
    I32Store { align: u32, offset: u32 },

    // Constants
    I32Const(i32),

    // Comparison
    I32Eq,
    I32Ne,
    I32LtS,
    I32LtU,
    I32GtS,
    I32GtU,
    I32LeS,
    I32LeU,
    I32GeS,
    I32GeU,

    // Arithmetic
    I32Add,
    I32Sub,
    I32Mul,
    I32DivS,
    I32DivU,
}

impl fmt::Display for WasmInst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WasmInst::Block => write!(f, "block"),
            WasmInst::Loop => write!(f, "loop"),
            WasmInst::If => write!(f, "if"),
            WasmInst::Else => write!(f, "else"),
            WasmInst::End => write!(f, "end"),
            WasmInst::Br(depth) => write!(f, "br {}", depth),
            WasmInst::BrIf(depth) => write!(f, "br_if {}", depth),
            WasmInst::BrTable(targets, default) => {
                write!(f, "br_table {} {}", targets.iter().join(" "), default)
            }
            WasmInst::Return => write!(f, "return"),
            WasmInst::Call(index) => write!(f, "call {}", index),
            WasmInst::Unreachable => write!(f, "unreachable"),
            WasmInst::Nop => write!(f, "nop"),
            WasmInst::Drop => write!(f, "drop"),
            WasmInst::LocalGet(index) => write!(f, "local.get {}", index),
            WasmInst::LocalSet(index) => write!(f, "local.set {}", index),
            WasmInst::LocalTee(index) => write!(f, "local.tee {}", index),
            WasmInst::I32Load { .. } => write!(f, "i32.load"),
            WasmInst::I32Store { .. } => write!(f, "i32.store"),
            WasmInst::I32Const(value) => write!(f, "i32.const {}", value),
            WasmInst::I32Eq => write!(f, "i32.eq"),
            WasmInst::I32Ne => write!(f, "i32.ne"),
            WasmInst::I32LtS => write!(f, "i32.lt_s"),
            WasmInst::I32LtU => write!(f, "i32.lt_u"),
            WasmInst::I32GtS => write!(f, "i32.gt_s"),
            WasmInst::I32GtU => write!(f, "i32.gt_u"),
            WasmInst::I32LeS => write!(f, "i32.le_s"),
            WasmInst::I32LeU => write!(f, "i32.le_u"),
            WasmInst::I32GeS => write!(f, "i32.ge_s"),
            WasmInst::I32GeU => write!(f, "i32.ge_u"),
            WasmInst::I32Add => write!(f, "i32.add"),
            WasmInst::I32Sub => write!(f, "i32.sub"),
            WasmInst::I32Mul => write!(f, "i32.mul"),
            WasmInst::I32DivS => write!(f, "i32.div_s"),
            WasmInst::I32DivU => write!(f, "i32.div_u"),
        }
    }
}
