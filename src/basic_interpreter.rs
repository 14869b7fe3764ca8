use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::basic_runtime::{
    apply_infix, apply_prefix, emit, expect_number, format_prompt, line_not_found, line_target,
    parse_input_fields, read_input_line, ExecState, ForLoopState, LineSource, Value,
};
use crate::basic_types::{BasicError, Expression, Program, RunStatus, Statement};

/// Tree-walking backend. Every call to `run` starts from a fresh
/// `ExecState`; the state of the last run stays available for inspection.
pub struct Interpreter {
    program: Rc<Program>,
    line_index: HashMap<i64, usize>,
    state: ExecState,
    run_status: RunStatus,
    trace: bool,
}

impl Interpreter {
    pub fn new(program: Program) -> Self {
        let line_index = program.line_index_map();
        Interpreter {
            program: Rc::new(program),
            line_index,
            state: ExecState::new(),
            run_status: RunStatus::Run,
            trace: false,
        }
    }

    /// Echo each executed line number to stderr as `[N]`.
    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn run(
        &mut self,
        out: &mut dyn Write,
        input: &mut dyn LineSource,
    ) -> Result<RunStatus, BasicError> {
        self.state = ExecState::new();
        self.run_status = RunStatus::Run;

        let program = Rc::clone(&self.program);
        let lines = program.lines();

        while self.state.pc < lines.len() && !self.state.halted {
            let line = &lines[self.state.pc];
            trace!(line = line.line_number, statement = %line.statement, "dispatch");
            if self.trace {
                eprintln!("[{}]", line.line_number);
            }

            if let Err(message) = self.execute_statement(&line.statement, out, input) {
                self.run_status = RunStatus::EndErrorRuntime;
                out.flush()?;
                return Err(BasicError::Runtime {
                    message,
                    line_number: line.line_number,
                });
            }

            self.state.advance();
        }

        out.flush()?;
        self.run_status = if self.state.halted {
            RunStatus::EndNormal
        } else {
            RunStatus::EndOfProgram
        };
        Ok(self.run_status)
    }

    pub fn get_run_status(&self) -> RunStatus {
        self.run_status
    }

    /// Execution state left behind by the most recent run.
    pub fn last_state(&self) -> &ExecState {
        &self.state
    }

    /// Reads a scalar from the last run. Unset names read as zero.
    pub fn get_symbol(&self, name: &str) -> Value {
        self.state.env.get(name)
    }

    fn execute_statement(
        &mut self,
        stmt: &Statement,
        out: &mut dyn Write,
        input: &mut dyn LineSource,
    ) -> Result<(), String> {
        match stmt {
            Statement::Print {
                items,
                separators,
                trailing_newline,
            } => {
                for (i, item) in items.iter().enumerate() {
                    let value = self.evaluate_expression(item)?;
                    emit(out, &value.to_string())?;
                    if let Some(separator) = separators.get(i) {
                        emit(out, separator.text())?;
                    }
                }
                if *trailing_newline {
                    emit(out, "\n")?;
                }
                Ok(())
            }
            Statement::Let { name, value } => {
                let result = self.evaluate_expression(value)?;
                self.state.env.set(name, result);
                Ok(())
            }
            Statement::If {
                condition,
                consequence,
                alternative,
            } => {
                if self.evaluate_expression(condition)?.is_truthy() {
                    self.execute_statement(consequence, out, input)
                } else if let Some(alternative) = alternative {
                    self.execute_statement(alternative, out, input)
                } else {
                    Ok(())
                }
            }
            Statement::Goto { target } => {
                let index = self.resolve_target(target, "GOTO")?;
                self.state.jump_to(index);
                Ok(())
            }
            Statement::Gosub { target } => {
                let value = self.evaluate_expression(target)?;
                let line = line_target(&value, "GOSUB")?;
                self.state.call_stack.push(self.state.pc);
                let index = self.lookup_line(line)?;
                debug!(line, depth = self.state.call_stack.len(), "GOSUB");
                self.state.jump_to(index);
                Ok(())
            }
            Statement::Return => {
                let index = self
                    .state
                    .call_stack
                    .pop()
                    .ok_or_else(|| "RETURN without GOSUB".to_string())?;
                debug!(depth = self.state.call_stack.len(), "RETURN");
                self.state.pc = index;
                Ok(())
            }
            Statement::For {
                var,
                start,
                end,
                step,
            } => {
                let start = expect_number(
                    &self.evaluate_expression(start)?,
                    "FOR start value must be a number",
                )?;
                let end = expect_number(
                    &self.evaluate_expression(end)?,
                    "FOR end value must be a number",
                )?;
                let step = expect_number(
                    &self.evaluate_expression(step)?,
                    "FOR step value must be a number",
                )?;

                self.state.env.set(var, Value::Number(start));
                // A FOR reusing an open loop's variable replaces that loop.
                self.state.for_loops.insert(
                    var.clone(),
                    ForLoopState {
                        end,
                        step,
                        resume_pc: self.state.pc,
                    },
                );
                Ok(())
            }
            Statement::Next { var } => {
                let name = match var {
                    Some(name) => name.clone(),
                    None => self
                        .state
                        .any_open_loop()
                        .ok_or_else(|| "NEXT without FOR".to_string())?,
                };
                let state = self
                    .state
                    .for_loops
                    .get(&name)
                    .cloned()
                    .ok_or_else(|| "NEXT without matching FOR".to_string())?;

                let current = expect_number(
                    &self.state.env.get(&name),
                    "loop variable must be a number",
                )?;
                let next = current + state.step;

                if state.continues(next) {
                    self.state.env.set(&name, Value::Number(next));
                    self.state.pc = state.resume_pc;
                } else {
                    debug!(variable = %name, "loop finished");
                    self.state.for_loops.remove(&name);
                }
                Ok(())
            }
            Statement::Input { prompt, vars } => {
                if let Some(prompt) = prompt {
                    emit(out, &format_prompt(prompt))?;
                }
                let line = read_input_line(out, input)?;
                for (name, value) in vars.iter().zip(parse_input_fields(&line, vars.len())) {
                    self.state.env.set(name, value);
                }
                Ok(())
            }
            Statement::End => {
                self.state.halted = true;
                Ok(())
            }
            Statement::Rem { .. } => Ok(()),
            Statement::Dim { name, size } => {
                expect_number(&self.evaluate_expression(size)?, "DIM size must be a number")?;
                self.state.env.dim_array(name);
                Ok(())
            }
            Statement::ExpressionStatement { expression } => {
                self.evaluate_expression(expression)?;
                Ok(())
            }
            Statement::Sequence { statements } => {
                for statement in statements {
                    self.execute_statement(statement, out, input)?;
                }
                Ok(())
            }
        }
    }

    fn evaluate_expression(&self, expr: &Expression) -> Result<Value, String> {
        match expr {
            Expression::NumberLiteral { value } => Ok(Value::Number(*value)),
            Expression::StringLiteral { value } => Ok(Value::String(value.clone())),
            Expression::Identifier { name } => Ok(self.state.env.get(name)),
            Expression::Infix { op, left, right } => {
                let left = self.evaluate_expression(left)?;
                let right = self.evaluate_expression(right)?;
                apply_infix(op.symbol(), &left, &right)
            }
            Expression::Prefix { op, right } => {
                let right = self.evaluate_expression(right)?;
                apply_prefix(op.symbol(), &right)
            }
            Expression::ArrayAccess { name, index } => {
                let index = self.evaluate_expression(index)?;
                self.state.env.read_array(name, &index)
            }
        }
    }

    fn resolve_target(&self, target: &Expression, keyword: &str) -> Result<usize, String> {
        let value = self.evaluate_expression(target)?;
        let line = line_target(&value, keyword)?;
        self.lookup_line(line)
    }

    fn lookup_line(&self, line: i64) -> Result<usize, String> {
        self.line_index
            .get(&line)
            .copied()
            .ok_or_else(|| line_not_found(line))
    }
}
