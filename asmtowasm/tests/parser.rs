use asmtowasm::parser::{Opcode, Operand, Parser};
use asmtowasm::ParseError;

fn case(code: &str) -> (Vec<asmtowasm::Instruction>, asmtowasm::Labels) {
    println!("--- input ---\n{}", code);
    let (instructions, labels) = Parser::parse_str(code).unwrap();
    for (idx, inst) in instructions.iter().enumerate() {
        println!("{:>2}: {:?}", idx, inst);
    }
    for (name, idx) in &labels {
        println!("label {} -> {}", name, idx);
    }
    (instructions, labels)
}

#[test]
fn label_indices_point_at_their_instruction() {
    let (instructions, labels) = case(
        "main:\n\
         \x20 mov %eax, 1\n\
         loop:\n\
         \x20 sub %eax, 1\n\
         \x20 jne loop\n\
         done:\n",
    );
    for (name, &idx) in &labels {
        assert_eq!(instructions[idx].label.as_deref(), Some(name.as_str()));
    }
    // Standalone labels still occupy a slot in the stream.
    assert_eq!(labels["done"], 5);
    assert_eq!(instructions[5].op, Opcode::LABEL);
}

#[test]
fn commas_and_whitespace_are_insignificant() {
    let (a, _) = case("add %eax,%ebx");
    let (b, _) = case("add   %eax ,   %ebx");
    let (c, _) = case("add %eax, %ebx");
    assert_eq!(a[0].operands, b[0].operands);
    assert_eq!(b[0].operands, c[0].operands);
    assert_eq!(
        a[0].operands,
        vec![
            Operand::Register("%eax".to_string()),
            Operand::Register("%ebx".to_string())
        ]
    );
}

#[test]
fn comments_and_blank_lines_produce_nothing() {
    let (instructions, labels) = case(
        "# leading comment\n\
         \n\
         mov %eax, 1   # trailing comment\n\
         \n\
         # another\n\
         L:\n\
         \x20 ret %eax\n",
    );
    assert_eq!(instructions.len(), 3);
    assert_eq!(labels["L"], 1);
    assert_eq!(instructions[1].op, Opcode::LABEL);
}

#[test]
fn operand_classification() {
    let (instructions, _) = case("mov %eax, 5\nmov (%esi+4), %eax\nmov %eax, -7\njmp exit");
    assert_eq!(
        instructions[0].operands,
        vec![
            Operand::Register("%eax".to_string()),
            Operand::Immediate(5)
        ]
    );
    assert_eq!(
        instructions[1].operands[0],
        Operand::Memory("%esi+4".to_string())
    );
    assert_eq!(instructions[2].operands[1], Operand::Immediate(-7));
    assert_eq!(instructions[3].operands[0], Operand::Label("exit".to_string()));
}

#[test]
fn opcode_lookup_is_case_insensitive_with_aliases() {
    let (instructions, _) = case("MOV %eax, 1\njz L\nJnZ L\nJmp L");
    assert_eq!(instructions[0].op, Opcode::MOV);
    assert_eq!(instructions[1].op, Opcode::JE);
    assert_eq!(instructions[2].op, Opcode::JNE);
    assert_eq!(instructions[3].op, Opcode::JMP);
}

#[test]
fn label_with_instruction_on_the_same_line() {
    let (instructions, labels) = case("main: mov %eax, 1\n ret %eax");
    assert_eq!(labels["main"], 0);
    assert_eq!(instructions[0].op, Opcode::MOV);
    assert_eq!(instructions[0].label.as_deref(), Some("main"));
}

#[test]
fn unknown_opcode_reports_the_line() {
    let err = Parser::parse_str("mov %eax, 1\nfoo %eax").unwrap_err();
    println!("{}", err);
    match err {
        ParseError::UnknownOperation { line, op } => {
            assert_eq!(line, 2);
            assert_eq!(op, "foo");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn unknown_opcode_after_label_reports_the_line() {
    let err = Parser::parse_str("main: frobnicate %eax").unwrap_err();
    assert!(matches!(
        err,
        ParseError::UnknownOperation { line: 1, .. }
    ));
}

#[test]
fn malformed_immediate_is_rejected() {
    let err = Parser::parse_str("mov %eax, 5+3").unwrap_err();
    println!("{}", err);
    assert!(matches!(err, ParseError::InvalidImmediate { line: 1, .. }));
}

#[test]
fn duplicate_label_is_rejected() {
    let err = Parser::parse_str("L:\n mov %eax, 1\nL:\n").unwrap_err();
    println!("{}", err);
    match err {
        ParseError::RedefinedLabel { line, name } => {
            assert_eq!(line, 3);
            assert_eq!(name, "L");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn standalone_label_at_end_of_file() {
    let (instructions, labels) = case("mov %eax, 1\nL:\n");
    assert_eq!(labels["L"], 1);
    assert_eq!(instructions[1].op, Opcode::LABEL);
    assert_eq!(instructions[1].label.as_deref(), Some("L"));
    assert!(instructions[1].operands.is_empty());
}
