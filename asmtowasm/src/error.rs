use thiserror::Error;

// One error enum per pipeline stage. Each error is reported once, at the
// stage boundary where it arises, and stops the pipeline.

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Lift(#[from] LiftError),

    #[error(transparent)]
    Emit(#[from] EmitError),

    #[error("failed to create file: {0}")]
    FileCreate(String, #[source] std::io::Error),

    #[error("failed to write file: {0}")]
    FileWrite(String, #[source] std::io::Error),
}

// Parse errors carry the 1-based source line.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to open file: {0}")]
    FileOpen(String, #[source] std::io::Error),

    #[error("failed to read line")]
    FileRead(#[source] std::io::Error),

    #[error("line {line}: unknown operation: `{op}`")]
    UnknownOperation { line: usize, op: String },

    #[error("line {line}: cannot parse `{token}` as an immediate")]
    InvalidImmediate { line: usize, token: String },

    #[error("line {line}: re-defined label: `{name}`")]
    RedefinedLabel { line: usize, name: String },
}

impl ParseError {
    /// Source line of the error, when it has one.
    pub fn line(&self) -> Option<usize> {
        match self {
            ParseError::UnknownOperation { line, .. }
            | ParseError::InvalidImmediate { line, .. }
            | ParseError::RedefinedLabel { line, .. } => Some(*line),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum LiftError {
    #[error("`{op}` requires {needs} operand(s), found {got}")]
    MissingOperands {
        op: String,
        needs: usize,
        got: usize,
    },

    #[error("instruction cannot be lifted: `{op}`")]
    UnsupportedInstruction { op: String },

    #[error("`{op}`: label operand in a value position")]
    UnsupportedOperand { op: String },

    #[error("cannot parse memory operand: `({body})`")]
    InvalidMemoryOperand { body: String },

    #[error("`mov` with a memory destination requires a register source")]
    MemoryToMemoryMove,

    #[error("`{op}`: destination must be a register or a memory operand")]
    InvalidDestination { op: String },

    #[error("IR verification failed: {message}\n{dump}")]
    Verify { message: String, dump: String },
}

#[derive(Debug, Error)]
pub enum EmitError {
    #[error("function `{func}`: unsupported zext operand")]
    UnsupportedZext { func: String },

    #[error("function `{func}`: value %{value} cannot be pushed")]
    UnsupportedValue { func: String, value: u32 },

    #[error("function `{func}`: no local assigned for %{value}")]
    MissingLocal { func: String, value: u32 },

    #[error("call target is not a defined function: `{name}`")]
    UnknownCallee { name: String },
}
