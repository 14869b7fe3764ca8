use tracing::{debug, info};

use crate::basic_types::{BasicError, Expression, Program, Statement};
use crate::rust_source_builder::RustSourceBuilder;

/// Runtime model shared with the interpreter, pasted into every program.
const RUNTIME_PRELUDE: &str = include_str!("basic_runtime.rs");

/// Signature shared by every generated line function.
const LINE_FN_PARAMS: &str =
    "(state: &mut ExecState, out: &mut dyn Write, input: &mut dyn LineSource) -> Result<(), String>";

/// Translates a `Program` into a standalone Rust program that needs only
/// std. The emitted code runs the same dispatch loop as the interpreter
/// over the same runtime model.
pub struct RustCodeGenerator {
    builder: RustSourceBuilder,
    program: Program,
    trace: bool,
}

impl RustCodeGenerator {
    pub fn new(program: Program, trace: bool) -> Self {
        Self {
            builder: RustSourceBuilder::new(),
            program,
            trace,
        }
    }

    pub fn generate(&mut self) -> Result<String, BasicError> {
        self.builder = RustSourceBuilder::new();
        self.check_line_numbers()?;

        self.builder
            .line("#![allow(dead_code, unused_variables, unused_mut, unused_assignments, unused_imports)]");
        self.builder.comment("Generated by basis-compiler from a BASIC program.");
        self.builder.blank();
        self.builder.raw(RUNTIME_PRELUDE);
        self.builder.blank();

        self.emit_line_table();

        let lines = self.program.lines().to_vec();
        for line in &lines {
            self.builder.blank();
            self.builder.reset_temps();
            self.builder.comment(&format!("{} {}", line.line_number, line.statement));
            self.builder
                .open_block(&format!("fn line_{}{}", line.line_number, LINE_FN_PARAMS));
            self.generate_statement(&line.statement);
            self.builder.line("Ok(())");
            self.builder.close_block("");
            debug!(line = line.line_number, "generated line");
        }

        self.builder.blank();
        self.emit_run();
        self.builder.blank();
        self.emit_main();

        info!(
            lines = self.program.len(),
            bytes = self.builder.len(),
            "compiled program"
        );
        Ok(self.builder.build())
    }

    fn check_line_numbers(&self) -> Result<(), BasicError> {
        for line in self.program.lines() {
            if i64::try_from(line.line_number).is_err() {
                return Err(BasicError::Translation {
                    message: format!("unsupported line number {}", line.line_number),
                });
            }
        }
        Ok(())
    }

    fn emit_line_table(&mut self) {
        let numbers: Vec<String> = self
            .program
            .line_numbers()
            .iter()
            .map(|n| n.to_string())
            .collect();
        self.builder.line(&format!(
            "const PROGRAM_LINES: [usize; {}] = [{}];",
            numbers.len(),
            numbers.join(", ")
        ));
        self.builder.blank();

        self.builder.open_block("fn line_index(line: i64) -> Option<usize>");
        self.builder.open_block("match line");
        for (index, number) in numbers.iter().enumerate() {
            self.builder.line(&format!("{} => Some({}),", number, index));
        }
        self.builder.line("_ => None,");
        self.builder.close_block("");
        self.builder.close_block("");
    }

    fn emit_run(&mut self) {
        self.builder
            .open_block("fn run(out: &mut dyn Write, input: &mut dyn LineSource) -> Result<(), String>");
        self.builder.line("let mut state = ExecState::new();");
        self.builder
            .open_block("while state.pc < PROGRAM_LINES.len() && !state.halted");
        self.builder.line("let index = state.pc;");
        if self.trace {
            self.builder.line("eprintln!(\"[{}]\", PROGRAM_LINES[index]);");
        }
        self.builder.open_block("let result: Result<(), String> = match index");
        let numbers = self.program.line_numbers();
        for (index, number) in numbers.iter().enumerate() {
            self.builder.line(&format!(
                "{} => line_{}(&mut state, out, input),",
                index, number
            ));
        }
        self.builder.line("_ => Ok(()),");
        self.builder.close_block(";");
        self.builder.open_block("if let Err(message) = result");
        self.builder.line("out.flush().map_err(|e| e.to_string())?;");
        self.builder.line(
            "return Err(format!(\"error at line {}: {}\", PROGRAM_LINES[index], message));",
        );
        self.builder.close_block("");
        self.builder.line("state.advance();");
        self.builder.close_block("");
        self.builder.line("out.flush().map_err(|e| e.to_string())");
        self.builder.close_block("");
    }

    fn emit_main(&mut self) {
        self.builder.open_block("fn main()");
        self.builder.line("let stdout = io::stdout();");
        self.builder.line("let mut out = io::BufWriter::new(stdout.lock());");
        self.builder.line("let stdin = io::stdin();");
        self.builder.line("let mut input = LineReader::new(stdin.lock());");
        self.builder.line("let result = run(&mut out, &mut input);");
        self.builder.line("let _ = out.flush();");
        self.builder.open_block("if let Err(message) = result");
        self.builder.line("eprintln!(\"error: {}\", message);");
        self.builder.line("std::process::exit(1);");
        self.builder.close_block("");
        self.builder.close_block("");
    }

    fn generate_statement(&mut self, statement: &Statement) {
        match statement {
            Statement::Print {
                items,
                separators,
                trailing_newline,
            } => {
                for (i, item) in items.iter().enumerate() {
                    let value = self.generate_expression(item);
                    self.builder
                        .line(&format!("emit(out, &{}.to_string())?;", value));
                    if let Some(separator) = separators.get(i) {
                        self.emit_text(separator.text());
                    }
                }
                if *trailing_newline {
                    self.emit_text("\n");
                }
            }
            Statement::Let { name, value } => {
                let value = self.generate_expression(value);
                self.builder.line(&format!(
                    "state.env.set({}, {});",
                    RustSourceBuilder::string_literal(name),
                    value
                ));
            }
            Statement::If {
                condition,
                consequence,
                alternative,
            } => {
                let condition = self.generate_expression(condition);
                self.builder
                    .open_block(&format!("if {}.is_truthy()", condition));
                self.generate_statement(consequence);
                if let Some(alternative) = alternative {
                    self.builder.continue_block("else");
                    self.generate_statement(alternative);
                }
                self.builder.close_block("");
            }
            Statement::Goto { target } => {
                let index = self.generate_target(target, "GOTO", false);
                self.builder.line(&format!("state.jump_to({});", index));
            }
            Statement::Gosub { target } => {
                let index = self.generate_target(target, "GOSUB", true);
                self.builder.line(&format!("state.jump_to({});", index));
            }
            Statement::Return => {
                let index = self.builder.next_temp();
                self.builder.line(&format!(
                    "let {} = state.call_stack.pop().ok_or_else(|| \"RETURN without GOSUB\".to_string())?;",
                    index
                ));
                self.builder.line(&format!("state.pc = {};", index));
            }
            Statement::For {
                var,
                start,
                end,
                step,
            } => {
                let start = self.generate_number(start, "FOR start value must be a number");
                let end = self.generate_number(end, "FOR end value must be a number");
                let step = self.generate_number(step, "FOR step value must be a number");
                let name = RustSourceBuilder::string_literal(var);
                self.builder
                    .line(&format!("state.env.set({}, Value::Number({}));", name, start));
                self.builder.line(&format!(
                    "state.for_loops.insert(String::from({}), ForLoopState {{ end: {}, step: {}, resume_pc: state.pc }});",
                    name, end, step
                ));
            }
            Statement::Next { var } => {
                let name = self.builder.next_temp();
                match var {
                    Some(var) => self.builder.line(&format!(
                        "let {} = String::from({});",
                        name,
                        RustSourceBuilder::string_literal(var)
                    )),
                    None => self.builder.line(&format!(
                        "let {} = state.any_open_loop().ok_or_else(|| \"NEXT without FOR\".to_string())?;",
                        name
                    )),
                }
                let loop_state = self.builder.next_temp();
                self.builder.line(&format!(
                    "let {} = state.for_loops.get(&{}).cloned().ok_or_else(|| \"NEXT without matching FOR\".to_string())?;",
                    loop_state, name
                ));
                let current = self.builder.next_temp();
                self.builder.line(&format!(
                    "let {} = expect_number(&state.env.get(&{}), \"loop variable must be a number\")?;",
                    current, name
                ));
                let next = self.builder.next_temp();
                self.builder
                    .line(&format!("let {} = {} + {}.step;", next, current, loop_state));
                self.builder
                    .open_block(&format!("if {}.continues({})", loop_state, next));
                self.builder
                    .line(&format!("state.env.set(&{}, Value::Number({}));", name, next));
                self.builder
                    .line(&format!("state.pc = {}.resume_pc;", loop_state));
                self.builder.continue_block("else");
                self.builder
                    .line(&format!("state.for_loops.remove(&{});", name));
                self.builder.close_block("");
            }
            Statement::Input { prompt, vars } => {
                if let Some(prompt) = prompt {
                    self.builder.line(&format!(
                        "emit(out, &format_prompt({}))?;",
                        RustSourceBuilder::string_literal(prompt)
                    ));
                }
                let line = self.builder.next_temp();
                self.builder
                    .line(&format!("let {} = read_input_line(out, input)?;", line));
                let fields = self.builder.next_temp();
                self.builder.line(&format!(
                    "let {} = parse_input_fields(&{}, {});",
                    fields,
                    line,
                    vars.len()
                ));
                for (i, var) in vars.iter().enumerate() {
                    self.builder.line(&format!(
                        "state.env.set({}, {}[{}].clone());",
                        RustSourceBuilder::string_literal(var),
                        fields,
                        i
                    ));
                }
            }
            Statement::End => self.builder.line("state.halted = true;"),
            Statement::Rem { comment } => self.builder.comment(&format!("REM {}", comment)),
            Statement::Dim { name, size } => {
                self.generate_number(size, "DIM size must be a number");
                self.builder.line(&format!(
                    "state.env.dim_array({});",
                    RustSourceBuilder::string_literal(name)
                ));
            }
            Statement::ExpressionStatement { expression } => {
                self.generate_expression(expression);
            }
            Statement::Sequence { statements } => {
                for statement in statements {
                    self.generate_statement(statement);
                }
            }
        }
    }

    /// Emits code computing `expr` into a fresh temporary and returns its name.
    fn generate_expression(&mut self, expr: &Expression) -> String {
        match expr {
            Expression::NumberLiteral { value } => {
                let temp = self.builder.next_temp();
                self.builder.line(&format!(
                    "let {} = Value::Number({});",
                    temp,
                    RustSourceBuilder::float_literal(*value)
                ));
                temp
            }
            Expression::StringLiteral { value } => {
                let temp = self.builder.next_temp();
                self.builder.line(&format!(
                    "let {} = Value::String(String::from({}));",
                    temp,
                    RustSourceBuilder::string_literal(value)
                ));
                temp
            }
            Expression::Identifier { name } => {
                let temp = self.builder.next_temp();
                self.builder.line(&format!(
                    "let {} = state.env.get({});",
                    temp,
                    RustSourceBuilder::string_literal(name)
                ));
                temp
            }
            Expression::Infix { op, left, right } => {
                let left = self.generate_expression(left);
                let right = self.generate_expression(right);
                let temp = self.builder.next_temp();
                self.builder.line(&format!(
                    "let {} = apply_infix({}, &{}, &{})?;",
                    temp,
                    RustSourceBuilder::string_literal(op.symbol()),
                    left,
                    right
                ));
                temp
            }
            Expression::Prefix { op, right } => {
                let right = self.generate_expression(right);
                let temp = self.builder.next_temp();
                self.builder.line(&format!(
                    "let {} = apply_prefix({}, &{})?;",
                    temp,
                    RustSourceBuilder::string_literal(op.symbol()),
                    right
                ));
                temp
            }
            Expression::ArrayAccess { name, index } => {
                let index = self.generate_expression(index);
                let temp = self.builder.next_temp();
                self.builder.line(&format!(
                    "let {} = state.env.read_array({}, &{})?;",
                    temp,
                    RustSourceBuilder::string_literal(name),
                    index
                ));
                temp
            }
        }
    }

    /// Emits code requiring `expr` to be a number; returns the `f64` temporary.
    fn generate_number(&mut self, expr: &Expression, message: &str) -> String {
        let value = self.generate_expression(expr);
        let temp = self.builder.next_temp();
        self.builder.line(&format!(
            "let {} = expect_number(&{}, {})?;",
            temp,
            value,
            RustSourceBuilder::string_literal(message)
        ));
        temp
    }

    /// Emits the GOTO/GOSUB target lookup; returns the temporary holding the
    /// program-counter index. A GOSUB pushes its return point first.
    fn generate_target(&mut self, target: &Expression, keyword: &str, push_return: bool) -> String {
        let value = self.generate_expression(target);
        let line = self.builder.next_temp();
        self.builder.line(&format!(
            "let {} = line_target(&{}, {})?;",
            line,
            value,
            RustSourceBuilder::string_literal(keyword)
        ));
        if push_return {
            self.builder.line("state.call_stack.push(state.pc);");
        }
        let index = self.builder.next_temp();
        self.builder.line(&format!(
            "let {} = line_index({}).ok_or_else(|| line_not_found({}))?;",
            index, line, line
        ));
        index
    }

    fn emit_text(&mut self, text: &str) {
        self.builder.line(&format!(
            "emit(out, {})?;",
            RustSourceBuilder::string_literal(text)
        ));
    }
}

/// Compiles a parsed program to Rust source text.
pub fn compile(program: &Program, trace: bool) -> Result<String, BasicError> {
    RustCodeGenerator::new(program.clone(), trace).generate()
}
