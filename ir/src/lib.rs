mod display;
mod func;
mod inst;
mod module;
mod types;
mod verify;

pub use func::{Block, BlockId, Function, ValueId};
pub use inst::{BinOp, Inst, InstKind, Pred, Terminator};
pub use module::Module;
pub use types::Type;
pub use verify::{verify, VerifyError};
