pub mod error;
pub mod lifter;
pub mod parser;
pub mod wasm;

pub use error::{EmitError, Error, LiftError, ParseError};
pub use lifter::Lifter;
pub use parser::{Instruction, Labels, Opcode, Operand, Parser};
pub use wasm::{Emitter, WasmModule};
