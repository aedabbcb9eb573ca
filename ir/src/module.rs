use indexmap::IndexMap;

use crate::func::Function;
use crate::types::Type;

/// A set of functions in declaration order. Insertion order is semantic: the
/// wasm emitter numbers defined functions by their position here.
#[derive(Debug, Clone, Default)]
pub struct Module {
    pub functions: IndexMap<String, Function>,
}

impl Module {
    pub fn new() -> Self {
        Module {
            functions: IndexMap::new(),
        }
    }

    /// Returns the function named `name`, declaring it (zero-arg, i32 return,
    /// no body) on first reference.
    pub fn get_or_insert(&mut self, name: &str) -> &mut Function {
        self.functions
            .entry(name.to_string())
            .or_insert_with(|| Function::new(name, Type::I32))
    }

    pub fn get(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }
}
