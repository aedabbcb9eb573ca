use asmtowasm::{LiftError, Lifter, Parser};
use ir::{BinOp, Function, Inst, InstKind, Module, Pred, Terminator, ValueId};

fn lift(code: &str) -> Module {
    println!("--- input ---\n{}", code);
    let (instructions, _labels) = Parser::parse_str(code).unwrap();
    let module = Lifter::lift(&instructions).unwrap();
    println!("--- module ---\n{}", module);
    module
}

fn lift_err(code: &str) -> LiftError {
    let (instructions, _labels) = Parser::parse_str(code).unwrap();
    let err = Lifter::lift(&instructions).unwrap_err();
    println!("{}", err);
    err
}

fn values(func: &Function) -> Vec<(ValueId, &Inst)> {
    (0..func.value_count() as u32)
        .map(|i| (ValueId(i), func.value(ValueId(i))))
        .collect()
}

fn alloca(func: &Function, name: &str) -> Option<ValueId> {
    values(func).into_iter().find_map(|(id, inst)| match &inst.kind {
        InstKind::Alloca { name: n } if n == name => Some(id),
        _ => None,
    })
}

#[test]
fn instructions_before_any_label_open_main() {
    let module = lift("mov %eax, 5\n ret %eax");
    let main = module.get("main").unwrap();
    assert!(!main.is_declaration());
    assert_eq!(main.blocks().len(), 1);
    assert_eq!(main.blocks()[0].name, "entry");
    assert!(alloca(main, "%eax").is_some());
}

#[test]
fn conditional_jump_consults_zf_and_splits_blocks() {
    let module = lift(
        "main:\n\
         \x20 mov %eax, 1\n\
         \x20 cmp %eax, 1\n\
         \x20 je L\n\
         \x20 mov %eax, 2\n\
         L:\n\
         \x20 ret %eax",
    );
    let main = module.get("main").unwrap();
    let names: Vec<_> = main.blocks().iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, vec!["main", "L", "cont"]);

    let Some(Terminator::CondBr {
        cond,
        then_dest,
        else_dest,
    }) = main.blocks()[0].term
    else {
        panic!("entry block must end in a conditional branch");
    };
    // Taken path goes to L, skipping the `mov %eax, 2` in the continuation.
    assert_eq!(main.block(then_dest).name, "L");
    assert_eq!(main.block(else_dest).name, "cont");

    // The condition is a load of the ZF slot.
    let InstKind::Load { addr } = main.value(cond).kind else {
        panic!("condition must be a flag load");
    };
    assert_eq!(Some(addr), alloca(main, "FLAG_ZF"));
}

#[test]
fn jne_swaps_the_successors() {
    let module = lift(
        "main:\n\
         \x20 cmp %eax, 1\n\
         \x20 jne L\n\
         L:\n\
         \x20 ret 0",
    );
    let main = module.get("main").unwrap();
    let Some(Terminator::CondBr {
        then_dest,
        else_dest,
        ..
    }) = main.blocks()[0].term
    else {
        panic!("expected a conditional branch");
    };
    // JNE is taken when ZF is zero.
    assert_eq!(main.block(then_dest).name, "cont");
    assert_eq!(main.block(else_dest).name, "L");
}

#[test]
fn cmp_fans_out_into_five_flags() {
    let module = lift("main:\n cmp %eax, %ebx\n ret 0");
    let main = module.get("main").unwrap();
    for flag in ["FLAG_ZF", "FLAG_LT", "FLAG_GT", "FLAG_LE", "FLAG_GE"] {
        assert!(alloca(main, flag).is_some(), "missing {}", flag);
    }
    let preds: Vec<Pred> = values(main)
        .into_iter()
        .filter_map(|(_, inst)| match inst.kind {
            InstKind::Icmp { pred, .. } => Some(pred),
            _ => None,
        })
        .collect();
    assert_eq!(
        preds,
        vec![Pred::Eq, Pred::Slt, Pred::Sgt, Pred::Sle, Pred::Sge]
    );
    // Each comparison is widened before being stored.
    let zexts = values(main)
        .into_iter()
        .filter(|(_, inst)| matches!(inst.kind, InstKind::Zext { .. }))
        .count();
    assert_eq!(zexts, 5);
}

#[test]
fn call_targets_become_functions() {
    let module = lift(
        "main:\n\
         \x20 call foo\n\
         \x20 ret 0\n\
         foo:\n\
         \x20 mov %ebx, 7\n\
         \x20 ret %ebx",
    );
    let names: Vec<_> = module.functions.keys().cloned().collect();
    assert_eq!(names, vec!["main", "foo"]);
    assert!(!module.get("foo").unwrap().is_declaration());

    let main = module.get("main").unwrap();
    assert!(values(main)
        .into_iter()
        .any(|(_, inst)| matches!(&inst.kind, InstKind::Call { callee } if callee == "foo")));
    // foo's registers live in foo's namespace, not main's.
    assert!(alloca(main, "%ebx").is_none());
}

#[test]
fn unseen_call_target_stays_a_declaration() {
    let module = lift("main:\n call ext\n ret 0");
    assert!(module.get("ext").unwrap().is_declaration());
}

#[test]
fn memory_operand_loads_through_a_pointer() {
    let module = lift("mov (%esi+4), %eax\n ret %eax");
    let main = module.get("main").unwrap();
    assert!(alloca(main, "%esi").is_some());
    let eax = alloca(main, "%eax").unwrap();

    // %esi + 4, cast to a pointer, loaded, stored into %eax.
    let add = values(main)
        .into_iter()
        .find_map(|(id, inst)| match inst.kind {
            InstKind::Binary {
                op: BinOp::Add,
                rhs,
                ..
            } if matches!(main.value(rhs).kind, InstKind::Const { value: 4 }) => Some(id),
            _ => None,
        })
        .expect("address arithmetic");
    let ptr = values(main)
        .into_iter()
        .find_map(|(id, inst)| match inst.kind {
            InstKind::IntToPtr { value } if value == add => Some(id),
            _ => None,
        })
        .expect("inttoptr of the sum");
    let load = values(main)
        .into_iter()
        .find_map(|(id, inst)| match inst.kind {
            InstKind::Load { addr } if addr == ptr => Some(id),
            _ => None,
        })
        .expect("load through the pointer");
    assert!(values(main).into_iter().any(|(_, inst)| matches!(
        inst.kind,
        InstKind::Store { value, addr } if value == load && addr == eax
    )));
}

#[test]
fn push_and_pop_model_a_stack_pointer() {
    let module = lift("push 42\n pop %eax\n ret %eax");
    let main = module.get("main").unwrap();
    assert!(alloca(main, "STACK_PTR").is_some());

    let subs = values(main)
        .into_iter()
        .filter(|(_, inst)| {
            matches!(inst.kind, InstKind::Binary { op: BinOp::Sub, rhs, .. }
                if matches!(main.value(rhs).kind, InstKind::Const { value: 4 }))
        })
        .count();
    let adds = values(main)
        .into_iter()
        .filter(|(_, inst)| {
            matches!(inst.kind, InstKind::Binary { op: BinOp::Add, rhs, .. }
                if matches!(main.value(rhs).kind, InstKind::Const { value: 4 }))
        })
        .count();
    assert_eq!(subs, 1, "push decrements STACK_PTR by 4");
    assert_eq!(adds, 1, "pop increments STACK_PTR by 4");

    // The pushed value goes through an inttoptr'd store, not the slot.
    assert!(values(main).into_iter().any(|(_, inst)| matches!(
        inst.kind,
        InstKind::Store { value, addr }
            if matches!(main.value(addr).kind, InstKind::IntToPtr { .. })
            && matches!(main.value(value).kind, InstKind::Const { value: 42 })
    )));
}

#[test]
fn every_block_ends_terminated() {
    for code in [
        "mov %eax, 1\n ret %eax",
        "main:\n jmp X\n",
        "main:\n cmp %eax, 1\n je L\n mov %eax, 2\n",
        "L:\n",
    ] {
        let module = lift(code);
        for func in module.functions.values() {
            for block in func.blocks() {
                assert!(block.term.is_some(), "open block `{}`", block.name);
            }
        }
    }
}

#[test]
fn bare_label_yields_return_zero() {
    let module = lift("L:\n");
    let main = module.get("main").unwrap();
    assert_eq!(main.blocks().len(), 1);
    assert_eq!(main.blocks()[0].name, "L");
    let Some(Terminator::Ret { value: Some(v) }) = main.blocks()[0].term else {
        panic!("expected ret");
    };
    assert!(matches!(main.value(v).kind, InstKind::Const { value: 0 }));
}

#[test]
fn ret_without_operand_returns_zero() {
    let module = lift("main:\n ret");
    let main = module.get("main").unwrap();
    let Some(Terminator::Ret { value: Some(v) }) = main.blocks()[0].term else {
        panic!("expected ret");
    };
    assert!(matches!(main.value(v).kind, InstKind::Const { value: 0 }));
}

#[test]
fn lift_errors() {
    assert!(matches!(
        lift_err("mov %eax"),
        LiftError::MissingOperands { needs: 2, got: 1, .. }
    ));
    assert!(matches!(lift_err("jmp %eax"), LiftError::UnsupportedOperand { .. }));
    assert!(matches!(
        lift_err("mov (1000), 5"),
        LiftError::MemoryToMemoryMove
    ));
    assert!(matches!(
        lift_err("mov %eax, out"),
        LiftError::UnsupportedOperand { .. }
    ));
    assert!(matches!(
        lift_err("mov 5, %eax"),
        LiftError::InvalidDestination { .. }
    ));
}
