use basis_rs::basic_io::ScriptedInput;
use basis_rs::basic_runtime::{
    apply_infix, apply_prefix, format_number, format_prompt, line_target, parse_input_fields,
    read_input_line, Environment, ExecState, ForLoopState, LineReader, LineSource, Value,
};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn num(n: f64) -> Value {
    Value::Number(n)
}

fn text(s: &str) -> Value {
    Value::String(s.to_string())
}

#[rstest]
#[case(0.0, "0")]
#[case(1.0, "1")]
#[case(-6.0, "-6")]
#[case(3.5, "3.5")]
#[case(0.1, "0.1")]
#[case(0.0001, "0.0001")]
#[case(0.00001, "1e-05")]
#[case(123456.0, "123456")]
#[case(1000000.0, "1e+06")]
#[case(1234567.0, "1.234567e+06")]
#[case(-2.5e-7, "-2.5e-07")]
#[case(1e100, "1e+100")]
#[case(f64::INFINITY, "+Inf")]
#[case(f64::NEG_INFINITY, "-Inf")]
fn test_format_number(#[case] n: f64, #[case] expected: &str) {
    assert_eq!(format_number(n), expected);
}

#[test]
fn test_format_nan() {
    assert_eq!(format_number(f64::NAN), "NaN");
}

#[rstest]
#[case("+", num(2.0), num(3.0), num(5.0))]
#[case("-", num(2.0), num(3.0), num(-1.0))]
#[case("*", num(2.0), num(3.0), num(6.0))]
#[case("/", num(3.0), num(2.0), num(1.5))]
#[case("MOD", num(7.0), num(3.0), num(1.0))]
#[case("<", num(1.0), num(2.0), num(1.0))]
#[case(">=", num(1.0), num(2.0), num(0.0))]
#[case("<>", num(1.0), num(2.0), num(1.0))]
#[case("AND", num(2.0), num(0.0), num(0.0))]
#[case("OR", num(2.0), num(0.0), num(1.0))]
#[case("+", text("AB"), text("C"), text("ABC"))]
#[case("==", text("A"), text("A"), num(1.0))]
#[case("<>", text("A"), text("A"), num(0.0))]
fn test_apply_infix(#[case] op: &str, #[case] left: Value, #[case] right: Value, #[case] expected: Value) {
    assert_eq!(apply_infix(op, &left, &right).unwrap(), expected);
}

#[rstest]
#[case("/", num(1.0), num(0.0), "division by zero")]
#[case("*", num(1.0), text("A"), "unsupported operation: NUMBER * STRING")]
#[case("<", text("A"), text("B"), "unsupported operation: STRING < STRING")]
#[case("AND", text("A"), text("B"), "unsupported operation: STRING AND STRING")]
fn test_apply_infix_errors(#[case] op: &str, #[case] left: Value, #[case] right: Value, #[case] message: &str) {
    assert_eq!(apply_infix(op, &left, &right).unwrap_err(), message);
}

#[test]
fn test_mod_by_zero_is_nan() {
    let result = apply_infix("MOD", &num(1.0), &num(0.0)).unwrap();
    assert_eq!(result.to_string(), "NaN");
}

#[test]
fn test_apply_prefix() {
    assert_eq!(apply_prefix("-", &num(4.0)).unwrap(), num(-4.0));
    assert_eq!(apply_prefix("NOT", &text("")).unwrap(), num(1.0));
    assert_eq!(apply_prefix("NOT", &num(3.0)).unwrap(), num(0.0));
    assert_eq!(apply_prefix("-", &text("A")).unwrap_err(), "cannot negate non-number");
}

#[test]
fn test_truthiness() {
    assert!(num(-1.0).is_truthy());
    assert!(!num(0.0).is_truthy());
    assert!(text(" ").is_truthy());
    assert!(!text("").is_truthy());
}

#[test]
fn test_line_target_truncates() {
    assert_eq!(line_target(&num(20.9), "GOTO").unwrap(), 20);
    assert_eq!(line_target(&num(-3.7), "GOTO").unwrap(), -3);
    assert_eq!(
        line_target(&text("10"), "GOSUB").unwrap_err(),
        "GOSUB requires a number"
    );
}

#[test]
fn test_environment() {
    let mut env = Environment::new();
    assert_eq!(env.get("X"), num(0.0));
    assert_eq!(env.lookup("X"), None);

    env.set("X", text("HI"));
    assert_eq!(env.get("X"), text("HI"));

    assert_eq!(env.read_array("A", &num(0.0)).unwrap_err(), "array A not defined");
    env.dim_array("A");
    assert!(env.has_array("A"));
    assert_eq!(env.read_array("A", &num(5.0)).unwrap(), num(0.0));
    assert_eq!(
        env.read_array("A", &text("1")).unwrap_err(),
        "array index must be a number"
    );
}

#[rstest]
#[case(1.0, 3.0, 3.0, true)]
#[case(1.0, 3.0, 4.0, false)]
#[case(-1.0, 1.0, 1.0, true)]
#[case(-1.0, 1.0, 0.0, false)]
fn test_loop_bounds(#[case] step: f64, #[case] end: f64, #[case] next: f64, #[case] continues: bool) {
    let state = ForLoopState {
        end,
        step,
        resume_pc: 0,
    };
    assert_eq!(state.continues(next), continues);
}

#[test]
fn test_exec_state_jumps() {
    let mut state = ExecState::new();
    state.jump_to(0);
    state.advance();
    assert_eq!(state.pc, 0);

    state.jump_to(3);
    state.advance();
    assert_eq!(state.pc, 3);
    assert_eq!(state.any_open_loop(), None);
}

#[test]
fn test_input_fields() {
    assert_eq!(
        parse_input_fields("  3, abc ,4.5  ", 3),
        vec![num(3.0), text("abc"), num(4.5)]
    );
    assert_eq!(parse_input_fields("7", 2), vec![num(7.0), num(0.0)]);
    assert_eq!(parse_input_fields("1,2,3", 1), vec![num(1.0)]);
    assert_eq!(parse_input_fields("", 1), vec![text("")]);
}

#[test]
fn test_prompt_padding() {
    assert_eq!(format_prompt("Age"), "Age ");
    assert_eq!(format_prompt("Age? "), "Age? ");
    assert_eq!(format_prompt(""), "");
}

#[test]
fn test_read_input_line_flushes_and_exhausts() {
    let mut out: Vec<u8> = Vec::new();
    let mut input = ScriptedInput::new(vec!["42"]);

    assert_eq!(read_input_line(&mut out, &mut input).unwrap(), "42");
    assert_eq!(read_input_line(&mut out, &mut input).unwrap_err(), "end of input");
}

#[test]
fn test_line_reader_strips_terminators() {
    let mut reader = LineReader::new("one\r\ntwo\nthree".as_bytes());

    assert_eq!(reader.read_line().unwrap(), Some("one".to_string()));
    assert_eq!(reader.read_line().unwrap(), Some("two".to_string()));
    assert_eq!(reader.read_line().unwrap(), Some("three".to_string()));
    assert_eq!(reader.read_line().unwrap(), None);
}
