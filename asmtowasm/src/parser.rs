use std::fs::File;
use std::io::{BufRead, BufReader};
use std::str::FromStr;

use indexmap::IndexMap;
use strum::EnumString;

use crate::error::ParseError;

// ----------------------------------------------------------------------------
// Instruction stream

/// Label name -> index of the instruction it decorates.
pub type Labels = IndexMap<String, usize>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum Opcode {
    ADD,
    SUB,
    MUL,
    DIV,
    MOV,
    CMP,
    JMP,
    #[strum(serialize = "JE", serialize = "JZ")]
    JE,
    #[strum(serialize = "JNE", serialize = "JNZ")]
    JNE,
    JL,
    JG,
    JLE,
    JGE,
    CALL,
    RET,
    PUSH,
    POP,
    /// Synthetic record for a standalone label; never spelled in source.
    #[strum(disabled)]
    LABEL,
    #[strum(disabled)]
    UNKNOWN,
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// Token with its leading `%`, e.g. `%eax`.
    Register(String),
    Immediate(i32),
    /// The body between the parentheses, e.g. `%esi+4` or `1000`.
    Memory(String),
    Label(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub op: Opcode,
    pub operands: Vec<Operand>,
    pub label: Option<String>,
}

// ----------------------------------------------------------------------------
// Parser

/// Line-oriented parser: `#` starts a comment, whitespace and commas separate
/// tokens, a first token ending in `:` defines a label at the index of the
/// next instruction.
#[derive(Debug, Default)]
pub struct Parser {
    instructions: Vec<Instruction>,
    labels: Labels,
}

impl Parser {
    pub fn parse_file(path: &str) -> Result<(Vec<Instruction>, Labels), ParseError> {
        let file =
            File::open(path).map_err(|e| ParseError::FileOpen(path.to_string(), e))?;
        let mut parser = Parser::default();
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(ParseError::FileRead)?;
            parser.parse_line(idx + 1, &line)?;
        }
        Ok((parser.instructions, parser.labels))
    }

    pub fn parse_str(text: &str) -> Result<(Vec<Instruction>, Labels), ParseError> {
        let mut parser = Parser::default();
        for (idx, line) in text.lines().enumerate() {
            parser.parse_line(idx + 1, line)?;
        }
        Ok((parser.instructions, parser.labels))
    }

    fn parse_line(&mut self, line_no: usize, raw: &str) -> Result<(), ParseError> {
        let code = raw.split('#').next().unwrap_or("");
        let tokens: Vec<&str> = code
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|t| !t.is_empty())
            .collect();
        let Some(&first) = tokens.first() else {
            return Ok(());
        };

        let (label, rest) = match first.strip_suffix(':') {
            Some(name) => {
                if self.labels.contains_key(name) {
                    return Err(ParseError::RedefinedLabel {
                        line: line_no,
                        name: name.to_string(),
                    });
                }
                self.labels.insert(name.to_string(), self.instructions.len());
                (Some(name.to_string()), &tokens[1..])
            }
            None => (None, &tokens[..]),
        };

        if rest.is_empty() {
            // A standalone label still occupies a slot in the stream so that
            // its index stays meaningful.
            if let Some(name) = label {
                self.instructions.push(Instruction {
                    op: Opcode::LABEL,
                    operands: Vec::new(),
                    label: Some(name),
                });
            }
            return Ok(());
        }

        let op = Opcode::from_str(rest[0]).map_err(|_| ParseError::UnknownOperation {
            line: line_no,
            op: rest[0].to_string(),
        })?;
        let operands = rest[1..]
            .iter()
            .map(|tok| classify(line_no, tok))
            .collect::<Result<Vec<_>, _>>()?;
        self.instructions.push(Instruction { op, operands, label });
        Ok(())
    }
}

/// Operand classification, applied in order: register, memory, immediate,
/// label reference.
fn classify(line: usize, token: &str) -> Result<Operand, ParseError> {
    if token.len() >= 2 && token.starts_with('%') {
        return Ok(Operand::Register(token.to_string()));
    }
    if token.len() >= 3 && token.starts_with('(') && token.ends_with(')') {
        return Ok(Operand::Memory(token[1..token.len() - 1].to_string()));
    }
    if token
        .chars()
        .all(|c| c.is_ascii_digit() || c == '+' || c == '-')
    {
        let value = token
            .parse::<i32>()
            .map_err(|_| ParseError::InvalidImmediate {
                line,
                token: token.to_string(),
            })?;
        return Ok(Operand::Immediate(value));
    }
    Ok(Operand::Label(token.to_string()))
}
