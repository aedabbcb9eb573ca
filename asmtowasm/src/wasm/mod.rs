mod binary;
mod emit;
mod inst;
mod text;

pub use emit::Emitter;
pub use inst::WasmInst;

use indexmap::IndexMap;

// ----------------------------------------------------------------------------
// Types

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WasmType {
    I32,
    I64,
    F32,
    F64,
    Void,
}

impl WasmType {
    /// Projection of an IR type. Anything outside the modelled subset (i1,
    /// pointers) defaults to i32.
    pub fn from_ir(ty: ir::Type) -> WasmType {
        match ty {
            ir::Type::Void => WasmType::Void,
            _ => WasmType::I32,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            WasmType::I32 => "i32",
            WasmType::I64 => "i64",
            WasmType::F32 => "f32",
            WasmType::F64 => "f64",
            WasmType::Void => "void",
        }
    }
}

// ----------------------------------------------------------------------------
// Module

#[derive(Debug, Clone)]
pub struct WasmFunction {
    pub name: String,
    pub params: Vec<WasmType>,
    pub ret: WasmType,
    /// Locals are indexed contiguously after the parameters.
    pub locals: Vec<WasmType>,
    pub insts: Vec<WasmInst>,
}

#[derive(Debug, Clone)]
pub struct WasmModule {
    pub functions: Vec<WasmFunction>,
    pub function_indices: IndexMap<String, u32>,
    /// Linear memory limits, in 64KiB pages.
    pub memory_min: u32,
    pub memory_max: u32,
}

impl WasmModule {
    pub fn new() -> Self {
        WasmModule {
            functions: Vec::new(),
            function_indices: IndexMap::new(),
            memory_min: 1,
            memory_max: 65536,
        }
    }
}

impl Default for WasmModule {
    fn default() -> Self {
        WasmModule::new()
    }
}
