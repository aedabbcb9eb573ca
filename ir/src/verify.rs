use thiserror::Error;

use crate::func::{Function, ValueId};
use crate::inst::{InstKind, Terminator};
use crate::module::Module;
use crate::types::Type;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VerifyError {
    #[error("function `{func}`: block `{block}` has no terminator")]
    NotTerminated { func: String, block: String },

    #[error("function `{func}`: block `{block}`: value %{value} is not defined")]
    UndefinedValue {
        func: String,
        block: String,
        value: u32,
    },

    #[error("function `{func}`: block `{block}`: operand %{value} has type {found}, expected {expected}")]
    TypeMismatch {
        func: String,
        block: String,
        value: u32,
        expected: Type,
        found: Type,
    },

    #[error("function `{func}`: block `{block}` branches to an unknown block")]
    BadTarget { func: String, block: String },
}

impl VerifyError {
    /// Name of the function the error was found in.
    pub fn function(&self) -> &str {
        match self {
            VerifyError::NotTerminated { func, .. }
            | VerifyError::UndefinedValue { func, .. }
            | VerifyError::TypeMismatch { func, .. }
            | VerifyError::BadTarget { func, .. } => func,
        }
    }
}

/// Checks the structural invariants of a lifted module: every block of every
/// defined function ends in exactly one terminator, every operand is defined
/// and carries the type its user expects, and every branch target exists.
pub fn verify(module: &Module) -> Result<(), VerifyError> {
    for func in module.functions.values() {
        if func.is_declaration() {
            continue;
        }
        verify_function(func)?;
    }
    Ok(())
}

fn verify_function(func: &Function) -> Result<(), VerifyError> {
    for id in func.block_ids() {
        let block = func.block(id);
        for &v in &block.insts {
            verify_inst(func, &block.name, v)?;
        }
        match &block.term {
            None => {
                return Err(VerifyError::NotTerminated {
                    func: func.name.clone(),
                    block: block.name.clone(),
                })
            }
            Some(Terminator::Br { target }) => {
                check_target(func, &block.name, target.0)?;
            }
            Some(Terminator::CondBr {
                cond,
                then_dest,
                else_dest,
            }) => {
                expect(func, &block.name, *cond, Type::I32)?;
                check_target(func, &block.name, then_dest.0)?;
                check_target(func, &block.name, else_dest.0)?;
            }
            Some(Terminator::Ret { value: Some(v) }) => {
                expect(func, &block.name, *v, Type::I32)?;
            }
            Some(Terminator::Ret { value: None }) => {}
        }
    }
    Ok(())
}

fn verify_inst(func: &Function, block: &str, id: ValueId) -> Result<(), VerifyError> {
    let inst = defined(func, block, id)?;
    match &inst.kind {
        InstKind::Alloca { .. } | InstKind::Const { .. } | InstKind::Call { .. } => Ok(()),
        InstKind::Load { addr } => expect(func, block, *addr, Type::Ptr),
        InstKind::Store { value, addr } => {
            expect(func, block, *value, Type::I32)?;
            expect(func, block, *addr, Type::Ptr)
        }
        InstKind::Binary { lhs, rhs, .. } | InstKind::Icmp { lhs, rhs, .. } => {
            expect(func, block, *lhs, Type::I32)?;
            expect(func, block, *rhs, Type::I32)
        }
        InstKind::Zext { value } => expect(func, block, *value, Type::I1),
        InstKind::IntToPtr { value } => expect(func, block, *value, Type::I32),
        InstKind::PtrToInt { value } => expect(func, block, *value, Type::Ptr),
        InstKind::Bitcast { value } => defined(func, block, *value).map(|_| ()),
    }
}

fn defined<'a>(
    func: &'a Function,
    block: &str,
    id: ValueId,
) -> Result<&'a crate::inst::Inst, VerifyError> {
    func.try_value(id).ok_or_else(|| VerifyError::UndefinedValue {
        func: func.name.clone(),
        block: block.to_string(),
        value: id.0,
    })
}

fn expect(func: &Function, block: &str, id: ValueId, expected: Type) -> Result<(), VerifyError> {
    let found = defined(func, block, id)?.ty;
    if found != expected {
        return Err(VerifyError::TypeMismatch {
            func: func.name.clone(),
            block: block.to_string(),
            value: id.0,
            expected,
            found,
        });
    }
    Ok(())
}

fn check_target(func: &Function, block: &str, target: u32) -> Result<(), VerifyError> {
    if (target as usize) < func.blocks().len() {
        Ok(())
    } else {
        Err(VerifyError::BadTarget {
            func: func.name.clone(),
            block: block.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inst::BinOp;

    fn module_with(f: Function) -> Module {
        let mut m = Module::new();
        m.functions.insert(f.name.clone(), f);
        m
    }

    #[test]
    fn accepts_terminated_function() {
        let mut f = Function::new("main", Type::I32);
        let entry = f.add_block("entry");
        let slot = f.push_inst(entry, InstKind::Alloca { name: "%eax".into() });
        let five = f.push_const(5);
        f.push_inst(entry, InstKind::Store { value: five, addr: slot });
        let v = f.push_inst(entry, InstKind::Load { addr: slot });
        f.set_term(entry, Terminator::Ret { value: Some(v) });
        assert_eq!(verify(&module_with(f)), Ok(()));
    }

    #[test]
    fn rejects_unterminated_block() {
        let mut f = Function::new("main", Type::I32);
        f.add_block("entry");
        let err = verify(&module_with(f)).unwrap_err();
        assert!(matches!(err, VerifyError::NotTerminated { .. }));
    }

    #[test]
    fn rejects_store_to_non_pointer() {
        let mut f = Function::new("main", Type::I32);
        let entry = f.add_block("entry");
        let a = f.push_const(1);
        let b = f.push_const(2);
        f.push_inst(entry, InstKind::Store { value: a, addr: b });
        f.set_term(entry, Terminator::Ret { value: Some(a) });
        let err = verify(&module_with(f)).unwrap_err();
        assert!(matches!(err, VerifyError::TypeMismatch { .. }));
    }

    #[test]
    fn rejects_branch_out_of_range() {
        use crate::func::BlockId;
        let mut f = Function::new("main", Type::I32);
        let entry = f.add_block("entry");
        f.set_term(entry, Terminator::Br { target: BlockId(7) });
        let err = verify(&module_with(f)).unwrap_err();
        assert!(matches!(err, VerifyError::BadTarget { .. }));
    }

    #[test]
    fn rejects_zext_of_i32() {
        let mut f = Function::new("main", Type::I32);
        let entry = f.add_block("entry");
        let a = f.push_const(1);
        let z = f.push_inst(entry, InstKind::Zext { value: a });
        let _ = z;
        f.set_term(entry, Terminator::Ret { value: Some(a) });
        let err = verify(&module_with(f)).unwrap_err();
        assert!(matches!(err, VerifyError::TypeMismatch { .. }));
    }

    #[test]
    fn skips_declarations() {
        let mut m = Module::new();
        m.get_or_insert("foo");
        assert_eq!(verify(&m), Ok(()));

        let mut f = Function::new("main", Type::I32);
        let entry = f.add_block("entry");
        let l = f.push_const(1);
        let r = f.push_const(2);
        let s = f.push_inst(entry, InstKind::Binary { op: BinOp::Add, lhs: l, rhs: r });
        f.set_term(entry, Terminator::Ret { value: Some(s) });
        m.functions.insert("main".into(), f);
        assert_eq!(verify(&m), Ok(()));
    }
}
