use crate::inst::{Inst, InstKind, Terminator};
use crate::types::Type;

// ----------------------------------------------------------------------------
// Arena indices

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(pub u32);

// ----------------------------------------------------------------------------
// Basic block

#[derive(Debug, Clone)]
pub struct Block {
    pub name: String,
    pub insts: Vec<ValueId>,
    pub term: Option<Terminator>,
}

// ----------------------------------------------------------------------------
// Function

/// A function owns two arenas: the value arena (`ValueId` indexes it) and the
/// block list (`BlockId`). Blocks reference values and each other by index,
/// so the cyclic CFG needs no shared ownership.
///
/// A function with no blocks is a declaration (an external callee created on
/// first reference).
#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub ret: Type,
    values: Vec<Inst>,
    blocks: Vec<Block>,
}

impl Function {
    pub fn new(name: &str, ret: Type) -> Self {
        Function {
            name: name.to_string(),
            ret,
            values: Vec::new(),
            blocks: Vec::new(),
        }
    }

    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }

    // ------------------------------------------------------------------------
    // Values

    /// Appends an instruction to the given block and defines its value.
    pub fn push_inst(&mut self, block: BlockId, kind: InstKind) -> ValueId {
        let id = self.define(kind);
        self.blocks[block.0 as usize].insts.push(id);
        id
    }

    /// Defines a constant. Constants live in the arena but are not placed in
    /// any block; they are referenced in operand position only.
    pub fn push_const(&mut self, value: i32) -> ValueId {
        self.define(InstKind::Const { value })
    }

    fn define(&mut self, kind: InstKind) -> ValueId {
        let ty = self.result_type(&kind);
        let id = ValueId(self.values.len() as u32);
        self.values.push(Inst { kind, ty });
        id
    }

    fn result_type(&self, kind: &InstKind) -> Type {
        match kind {
            InstKind::Alloca { .. } => Type::Ptr,
            InstKind::Const { .. } => Type::I32,
            InstKind::Load { .. } => Type::I32,
            InstKind::Store { .. } => Type::Void,
            InstKind::Binary { .. } => Type::I32,
            InstKind::Icmp { .. } => Type::I1,
            InstKind::Zext { .. } => Type::I32,
            InstKind::IntToPtr { .. } => Type::Ptr,
            InstKind::PtrToInt { .. } => Type::I32,
            InstKind::Bitcast { value } => self.value(*value).ty,
            InstKind::Call { .. } => Type::I32,
        }
    }

    pub fn value(&self, id: ValueId) -> &Inst {
        &self.values[id.0 as usize]
    }

    pub fn try_value(&self, id: ValueId) -> Option<&Inst> {
        self.values.get(id.0 as usize)
    }

    pub fn value_count(&self) -> usize {
        self.values.len()
    }

    // ------------------------------------------------------------------------
    // Blocks

    /// Appends an empty, unterminated block.
    pub fn add_block(&mut self, name: &str) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(Block {
            name: name.to_string(),
            insts: Vec::new(),
            term: None,
        });
        id
    }

    pub fn find_block(&self, name: &str) -> Option<BlockId> {
        self.blocks
            .iter()
            .position(|b| b.name == name)
            .map(|i| BlockId(i as u32))
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.0 as usize]
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn block_ids(&self) -> impl Iterator<Item = BlockId> {
        (0..self.blocks.len() as u32).map(BlockId)
    }

    /// Sets the block terminator. The caller is the only writer; the lifter
    /// never terminates a block twice because it switches to a fresh
    /// continuation block right after emitting a branch.
    pub fn set_term(&mut self, block: BlockId, term: Terminator) {
        self.blocks[block.0 as usize].term = Some(term);
    }

    pub fn is_terminated(&self, block: BlockId) -> bool {
        self.blocks[block.0 as usize].term.is_some()
    }
}
