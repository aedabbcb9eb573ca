use std::fmt::Write;

use itertools::Itertools;

use crate::wasm::{WasmFunction, WasmModule, WasmType};

// S-expression output. This is the authoritative artifact; one instruction
// per line, locals numbered after the parameters.

impl WasmModule {
    pub fn to_wat(&self) -> String {
        let mut out = String::new();
        out.push_str("(module\n");
        let _ = writeln!(out, "  (memory {} {})", self.memory_min, self.memory_max);
        for func in &self.functions {
            out.push_str(&function_wat(func));
        }
        out.push_str(")\n");
        out
    }
}

fn function_wat(func: &WasmFunction) -> String {
    let mut out = String::new();
    let _ = write!(out, "  (func ${}", func.name);
    for (i, ty) in func.params.iter().enumerate() {
        let _ = write!(out, " (param ${} {})", i, ty.name());
    }
    if func.ret != WasmType::Void {
        let _ = write!(out, " (result {})", func.ret.name());
    }
    let locals = func
        .locals
        .iter()
        .enumerate()
        .map(|(i, ty)| format!(" (local ${} {})", func.params.len() + i, ty.name()))
        .join("");
    out.push_str(&locals);
    out.push('\n');
    for inst in &func.insts {
        let _ = writeln!(out, "    {}", inst);
    }
    out.push_str("  )\n");
    out
}
