// Runtime model shared by the interpreter and by every compiled program.
// The compiler embeds this file verbatim, so it must only depend on std.

use std::collections::HashMap;
use std::fmt;
use std::io::{self, BufRead, Write};

/// A BASIC value: either a number or a string.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    String(String),
}

impl Value {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "NUMBER",
            Value::String(_) => "STRING",
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::String(_) => None,
        }
    }

    /// Nonzero numbers and non-empty strings are true.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Number(n) => *n != 0.0,
            Value::String(s) => !s.is_empty(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::String(s) => f.write_str(s),
        }
    }
}

fn bool_value(b: bool) -> Value {
    Value::Number(if b { 1.0 } else { 0.0 })
}

/// Formats a number with the shortest digits that round-trip, switching to
/// exponent notation when the decimal exponent is below -4 or at least 6.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "+Inf" } else { "-Inf" }.to_string();
    }

    let scientific = format!("{:e}", n);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some((m, e)) => match e.parse::<i32>() {
            Ok(exp) => (m.to_string(), exp),
            Err(_) => return scientific,
        },
        None => return scientific,
    };

    if (-4..6).contains(&exponent) {
        format!("{}", n)
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exponent.abs())
    }
}

/// Applies a binary operator. Numbers support every operator, strings only
/// support `+`, `==` and `<>`.
pub fn apply_infix(op: &str, left: &Value, right: &Value) -> Result<Value, String> {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => {
            let (l, r) = (*l, *r);
            let result = match op {
                "+" => Value::Number(l + r),
                "-" => Value::Number(l - r),
                "*" => Value::Number(l * r),
                "/" => {
                    if r == 0.0 {
                        return Err("division by zero".to_string());
                    }
                    Value::Number(l / r)
                }
                "MOD" => Value::Number(l % r),
                "<" => bool_value(l < r),
                ">" => bool_value(l > r),
                "<=" => bool_value(l <= r),
                ">=" => bool_value(l >= r),
                "==" => bool_value(l == r),
                "<>" => bool_value(l != r),
                "AND" => bool_value(left.is_truthy() && right.is_truthy()),
                "OR" => bool_value(left.is_truthy() || right.is_truthy()),
                _ => return Err(unsupported(op, left, right)),
            };
            Ok(result)
        }
        (Value::String(l), Value::String(r)) => match op {
            "+" => Ok(Value::String(format!("{}{}", l, r))),
            "==" => Ok(bool_value(l == r)),
            "<>" => Ok(bool_value(l != r)),
            _ => Err(unsupported(op, left, right)),
        },
        _ => Err(unsupported(op, left, right)),
    }
}

fn unsupported(op: &str, left: &Value, right: &Value) -> String {
    format!(
        "unsupported operation: {} {} {}",
        left.kind_name(),
        op,
        right.kind_name()
    )
}

/// Applies a unary operator. `-` needs a number, `NOT` accepts any value.
pub fn apply_prefix(op: &str, right: &Value) -> Result<Value, String> {
    match op {
        "-" => match right {
            Value::Number(n) => Ok(Value::Number(-n)),
            Value::String(_) => Err("cannot negate non-number".to_string()),
        },
        "NOT" => Ok(bool_value(!right.is_truthy())),
        _ => Err(format!("unknown operator: {}", op)),
    }
}

/// Requires a number, failing with `message` otherwise.
pub fn expect_number(value: &Value, message: &str) -> Result<f64, String> {
    value.as_number().ok_or_else(|| message.to_string())
}

/// Converts a GOTO/GOSUB target to the integer line number it names.
pub fn line_target(value: &Value, keyword: &str) -> Result<i64, String> {
    let n = expect_number(value, &format!("{} requires a number", keyword))?;
    Ok(n as i64)
}

pub fn line_not_found(line: i64) -> String {
    format!("line {} not found", line)
}

/// Scalar variables and sparse arrays of one run.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    variables: HashMap<String, Value>,
    arrays: HashMap<String, HashMap<i64, Value>>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unset variables read as zero.
    pub fn get(&self, name: &str) -> Value {
        self.variables
            .get(name)
            .cloned()
            .unwrap_or(Value::Number(0.0))
    }

    pub fn set(&mut self, name: &str, value: Value) {
        self.variables.insert(name.to_string(), value);
    }

    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    /// Replaces any array of the same name with a fresh, empty one.
    pub fn dim_array(&mut self, name: &str) {
        self.arrays.insert(name.to_string(), HashMap::new());
    }

    pub fn has_array(&self, name: &str) -> bool {
        self.arrays.contains_key(name)
    }

    pub fn read_array(&self, name: &str, index: &Value) -> Result<Value, String> {
        let elements = self
            .arrays
            .get(name)
            .ok_or_else(|| format!("array {} not defined", name))?;
        let index = expect_number(index, "array index must be a number")? as i64;
        Ok(elements.get(&index).cloned().unwrap_or(Value::Number(0.0)))
    }
}

/// Bookkeeping for an open FOR loop, keyed by its variable name.
#[derive(Debug, Clone, PartialEq)]
pub struct ForLoopState {
    pub end: f64,
    pub step: f64,
    pub resume_pc: usize,
}

impl ForLoopState {
    /// Whether `next` is still inside the loop's bound.
    pub fn continues(&self, next: f64) -> bool {
        if self.step > 0.0 {
            next <= self.end
        } else {
            next >= self.end
        }
    }
}

/// Everything a run mutates. `pc` indexes the sorted line list.
#[derive(Debug, Clone, Default)]
pub struct ExecState {
    pub env: Environment,
    pub pc: usize,
    pub call_stack: Vec<usize>,
    pub for_loops: HashMap<String, ForLoopState>,
    pub halted: bool,
}

impl ExecState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Positions `pc` so that the dispatch loop's increment lands on `index`.
    pub fn jump_to(&mut self, index: usize) {
        self.pc = index.wrapping_sub(1);
    }

    pub fn advance(&mut self) {
        self.pc = self.pc.wrapping_add(1);
    }

    /// Picks the loop a bare NEXT refers to. Any open loop may be chosen.
    pub fn any_open_loop(&self) -> Option<String> {
        self.for_loops.keys().next().cloned()
    }
}

/// Source of lines for INPUT.
pub trait LineSource {
    /// Reads one line without its terminator, or `None` when exhausted.
    fn read_line(&mut self) -> io::Result<Option<String>>;
}

/// Line source over any buffered reader, typically locked stdin.
pub struct LineReader<R> {
    reader: R,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(reader: R) -> Self {
        LineReader { reader }
    }
}

impl<R: BufRead> LineSource for LineReader<R> {
    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok(Some(line))
    }
}

pub fn emit(out: &mut dyn Write, text: &str) -> Result<(), String> {
    out.write_all(text.as_bytes()).map_err(|e| e.to_string())
}

/// Prompt text as printed by INPUT: empty prompts print nothing, others
/// are followed by a space unless they already end with one.
pub fn format_prompt(prompt: &str) -> String {
    if prompt.is_empty() || prompt.ends_with(' ') {
        prompt.to_string()
    } else {
        format!("{} ", prompt)
    }
}

/// Flushes pending output, then blocks for one line of input.
pub fn read_input_line(out: &mut dyn Write, input: &mut dyn LineSource) -> Result<String, String> {
    out.flush().map_err(|e| e.to_string())?;
    match input.read_line() {
        Ok(Some(line)) => Ok(line),
        Ok(None) => Err("end of input".to_string()),
        Err(e) => Err(e.to_string()),
    }
}

/// Splits an INPUT line into `count` values. Fields that parse as numbers
/// become numbers, the rest strings; missing fields are zero.
pub fn parse_input_fields(line: &str, count: usize) -> Vec<Value> {
    let fields: Vec<&str> = line.trim().split(',').collect();
    (0..count)
        .map(|i| match fields.get(i) {
            Some(field) => {
                let text = field.trim();
                match text.parse::<f64>() {
                    Ok(n) => Value::Number(n),
                    Err(_) => Value::String(text.to_string()),
                }
            }
            None => Value::Number(0.0),
        })
        .collect()
}
