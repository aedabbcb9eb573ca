use itertools::Itertools;

use crate::wasm::{WasmFunction, WasmInst, WasmModule, WasmType};

// Binary encoding: magic + version, then type / function / memory / export /
// code sections. Indices and sizes are unsigned LEB128, `i32.const` payloads
// are signed LEB128.

const MAGIC: [u8; 4] = [0x00, 0x61, 0x73, 0x6D];
const VERSION: [u8; 4] = [0x01, 0x00, 0x00, 0x00];

const SECTION_TYPE: u8 = 0x01;
const SECTION_FUNCTION: u8 = 0x03;
const SECTION_MEMORY: u8 = 0x05;
const SECTION_EXPORT: u8 = 0x07;
const SECTION_CODE: u8 = 0x0A;

const FUNC_TYPE: u8 = 0x60;
const EXPORT_FUNC: u8 = 0x00;
const EXPORT_MEMORY: u8 = 0x02;
const END: u8 = 0x0B;

impl WasmModule {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&MAGIC);
        out.extend_from_slice(&VERSION);

        // Deduplicated function signatures, in first-use order.
        let mut signatures: Vec<(Vec<WasmType>, WasmType)> = Vec::new();
        let mut type_of: Vec<u32> = Vec::new();
        for func in &self.functions {
            let sig = (func.params.clone(), func.ret);
            let index = match signatures.iter().position(|s| *s == sig) {
                Some(i) => i,
                None => {
                    signatures.push(sig);
                    signatures.len() - 1
                }
            };
            type_of.push(index as u32);
        }

        section(&mut out, SECTION_TYPE, &type_section(&signatures));
        section(&mut out, SECTION_FUNCTION, &function_section(&type_of));
        section(&mut out, SECTION_MEMORY, &self.memory_section());
        section(&mut out, SECTION_EXPORT, &self.export_section());
        section(&mut out, SECTION_CODE, &self.code_section());
        out
    }

    fn memory_section(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        uleb(&mut buf, 1);
        buf.push(0x01); // min and max present
        uleb(&mut buf, self.memory_min);
        uleb(&mut buf, self.memory_max);
        buf
    }

    fn export_section(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        uleb(&mut buf, self.functions.len() as u32 + 1);
        for (index, func) in self.functions.iter().enumerate() {
            name(&mut buf, &func.name);
            buf.push(EXPORT_FUNC);
            uleb(&mut buf, index as u32);
        }
        name(&mut buf, "memory");
        buf.push(EXPORT_MEMORY);
        uleb(&mut buf, 0);
        buf
    }

    fn code_section(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        uleb(&mut buf, self.functions.len() as u32);
        for func in &self.functions {
            let body = function_body(func);
            uleb(&mut buf, body.len() as u32);
            buf.extend_from_slice(&body);
        }
        buf
    }
}

fn type_section(signatures: &[(Vec<WasmType>, WasmType)]) -> Vec<u8> {
    let mut buf = Vec::new();
    uleb(&mut buf, signatures.len() as u32);
    for (params, ret) in signatures {
        buf.push(FUNC_TYPE);
        uleb(&mut buf, params.len() as u32);
        for ty in params {
            buf.push(type_byte(*ty));
        }
        if *ret == WasmType::Void {
            uleb(&mut buf, 0);
        } else {
            uleb(&mut buf, 1);
            buf.push(type_byte(*ret));
        }
    }
    buf
}

fn function_section(type_of: &[u32]) -> Vec<u8> {
    let mut buf = Vec::new();
    uleb(&mut buf, type_of.len() as u32);
    for &index in type_of {
        uleb(&mut buf, index);
    }
    buf
}

fn function_body(func: &WasmFunction) -> Vec<u8> {
    let mut buf = Vec::new();
    // Locals as (count, type) runs.
    let runs: Vec<(usize, WasmType)> = func
        .locals
        .iter()
        .copied()
        .dedup_with_count()
        .collect();
    uleb(&mut buf, runs.len() as u32);
    for (count, ty) in runs {
        uleb(&mut buf, count as u32);
        buf.push(type_byte(ty));
    }
    for inst in &func.insts {
        encode_inst(inst, &mut buf);
    }
    buf.push(END);
    buf
}

fn type_byte(ty: WasmType) -> u8 {
    match ty {
        WasmType::I32 => 0x7F,
        WasmType::I64 => 0x7E,
        WasmType::F32 => 0x7D,
        WasmType::F64 => 0x7C,
        // Void never appears in a param or local list.
        WasmType::Void => 0x7F,
    }
}

fn encode_inst(inst: &WasmInst, buf: &mut Vec<u8>) {
    match inst {
        WasmInst::Unreachable => buf.push(0x00),
        WasmInst::Nop => buf.push(0x01),
        // Block-likes carry the empty block type.
        WasmInst::Block => buf.extend_from_slice(&[0x02, 0x40]),
        WasmInst::Loop => buf.extend_from_slice(&[0x03, 0x40]),
        WasmInst::If => buf.extend_from_slice(&[0x04, 0x40]),
        WasmInst::Else => buf.push(0x05),
        WasmInst::End => buf.push(END),
        WasmInst::Br(depth) => {
            buf.push(0x0C);
            uleb(buf, *depth);
        }
        WasmInst::BrIf(depth) => {
            buf.push(0x0D);
            uleb(buf, *depth);
        }
        WasmInst::BrTable(targets, default) => {
            buf.push(0x0E);
            uleb(buf, targets.len() as u32);
            for &target in targets {
                uleb(buf, target);
            }
            uleb(buf, *default);
        }
        WasmInst::Return => buf.push(0x0F),
        WasmInst::Call(index) => {
            buf.push(0x10);
            uleb(buf, *index);
        }
        WasmInst::Drop => buf.push(0x1A),
        WasmInst::LocalGet(index) => {
            buf.push(0x20);
            uleb(buf, *index);
        }
        WasmInst::LocalSet(index) => {
            buf.push(0x21);
            uleb(buf, *index);
        }
        WasmInst::LocalTee(index) => {
            buf.push(0x22);
            uleb(buf, *index);
        }
        WasmInst::I32Load { align, offset } => {
            buf.push(0x28);
            uleb(buf, *align);
            uleb(buf, *offset);
        }
        WasmInst::I32Store { align, offset } => {
            buf.push(0x36);
            uleb(buf, *align);
            uleb(buf, *offset);
        }
        WasmInst::I32Const(value) => {
            buf.push(0x41);
            sleb(buf, *value);
        }
        WasmInst::I32Eq => buf.push(0x46),
        WasmInst::I32Ne => buf.push(0x47),
        WasmInst::I32LtS => buf.push(0x48),
        WasmInst::I32LtU => buf.push(0x49),
        WasmInst::I32GtS => buf.push(0x4A),
        WasmInst::I32GtU => buf.push(0x4B),
        WasmInst::I32LeS => buf.push(0x4C),
        WasmInst::I32LeU => buf.push(0x4D),
        WasmInst::I32GeS => buf.push(0x4E),
        WasmInst::I32GeU => buf.push(0x4F),
        WasmInst::I32Add => buf.push(0x6A),
        WasmInst::I32Sub => buf.push(0x6B),
        WasmInst::I32Mul => buf.push(0x6C),
        WasmInst::I32DivS => buf.push(0x6D),
        WasmInst::I32DivU => buf.push(0x6E),
    }
}

fn section(out: &mut Vec<u8>, id: u8, payload: &[u8]) {
    out.push(id);
    uleb(out, payload.len() as u32);
    out.extend_from_slice(payload);
}

fn name(buf: &mut Vec<u8>, s: &str) {
    uleb(buf, s.len() as u32);
    buf.extend_from_slice(s.as_bytes());
}

fn uleb(buf: &mut Vec<u8>, mut value: u32) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            buf.push(byte);
            return;
        }
        buf.push(byte | 0x80);
    }
}

fn sleb(buf: &mut Vec<u8>, mut value: i32) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        let done = (value == 0 && byte & 0x40 == 0) || (value == -1 && byte & 0x40 != 0);
        if done {
            buf.push(byte);
            return;
        }
        buf.push(byte | 0x80);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uleb_boundaries() {
        let enc = |v| {
            let mut buf = Vec::new();
            uleb(&mut buf, v);
            buf
        };
        assert_eq!(enc(0), vec![0x00]);
        assert_eq!(enc(127), vec![0x7F]);
        assert_eq!(enc(128), vec![0x80, 0x01]);
        assert_eq!(enc(65536), vec![0x80, 0x80, 0x04]);
    }

    #[test]
    fn sleb_signs() {
        let enc = |v| {
            let mut buf = Vec::new();
            sleb(&mut buf, v);
            buf
        };
        assert_eq!(enc(0), vec![0x00]);
        assert_eq!(enc(5), vec![0x05]);
        assert_eq!(enc(-1), vec![0x7F]);
        assert_eq!(enc(63), vec![0x3F]);
        assert_eq!(enc(64), vec![0xC0, 0x00]);
        assert_eq!(enc(-64), vec![0x40]);
        assert_eq!(enc(-65), vec![0xBF, 0x7F]);
    }

    #[test]
    fn header_bytes() {
        let module = WasmModule::new();
        let bytes = module.to_bytes();
        assert_eq!(&bytes[..8], &[0x00, 0x61, 0x73, 0x6D, 0x01, 0x00, 0x00, 0x00]);
    }
}
