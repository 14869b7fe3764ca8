use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::basic_dialect::{PRINT_COMMA_TEXT, PRINT_SEMICOLON_TEXT};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Special
    Illegal,
    Eof,
    Newline,

    // Values
    Ident,
    Number,
    String,

    // Operators
    Assign,
    Plus,
    Minus,
    Mult,
    Div,
    Mod,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    Equal,
    NotEqual,

    // Punctuation
    LeftParen,
    RightParen,
    Comma,
    Colon,
    Semicolon,

    // Keywords
    Print,
    Let,
    If,
    Then,
    Else,
    Goto,
    Gosub,
    Return,
    For,
    To,
    Step,
    Next,
    Input,
    Rem,
    End,
    Dim,
    And,
    Or,
    Not,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            TokenKind::Illegal => "ILLEGAL",
            TokenKind::Eof => "EOF",
            TokenKind::Newline => "NEWLINE",
            TokenKind::Ident => "IDENT",
            TokenKind::Number => "NUMBER",
            TokenKind::String => "STRING",
            TokenKind::Assign => "=",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Mult => "*",
            TokenKind::Div => "/",
            TokenKind::Mod => "MOD",
            TokenKind::Less => "<",
            TokenKind::Greater => ">",
            TokenKind::LessEqual => "<=",
            TokenKind::GreaterEqual => ">=",
            TokenKind::Equal => "==",
            TokenKind::NotEqual => "<>",
            TokenKind::LeftParen => "(",
            TokenKind::RightParen => ")",
            TokenKind::Comma => ",",
            TokenKind::Colon => ":",
            TokenKind::Semicolon => ";",
            TokenKind::Print => "PRINT",
            TokenKind::Let => "LET",
            TokenKind::If => "IF",
            TokenKind::Then => "THEN",
            TokenKind::Else => "ELSE",
            TokenKind::Goto => "GOTO",
            TokenKind::Gosub => "GOSUB",
            TokenKind::Return => "RETURN",
            TokenKind::For => "FOR",
            TokenKind::To => "TO",
            TokenKind::Step => "STEP",
            TokenKind::Next => "NEXT",
            TokenKind::Input => "INPUT",
            TokenKind::Rem => "REM",
            TokenKind::End => "END",
            TokenKind::Dim => "DIM",
            TokenKind::And => "AND",
            TokenKind::Or => "OR",
            TokenKind::Not => "NOT",
        };
        f.write_str(name)
    }
}

/// A lexed token. `literal` is the source text, with original casing.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub literal: String,
    pub line: usize,
}

impl Token {
    pub fn new(kind: TokenKind, literal: &str, line: usize) -> Self {
        Token {
            kind,
            literal: literal.to_string(),
            line,
        }
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind {
            TokenKind::String => write!(f, "\"{}\"", self.literal),
            TokenKind::Eof => write!(f, "EOF"),
            TokenKind::Newline => write!(f, "NEWLINE"),
            _ => write!(f, "{}", self.literal),
        }
    }
}

#[derive(Debug, Error)]
pub enum BasicError {
    #[error("{}", .messages.join("; "))]
    Syntax { messages: Vec<String> },

    #[error("error at line {line_number}: {message}")]
    Runtime { message: String, line_number: usize },

    #[error("translation error: {message}")]
    Translation { message: String },

    #[error("internal error: {message}")]
    Internal { message: String },
}

impl From<std::io::Error> for BasicError {
    fn from(error: std::io::Error) -> Self {
        BasicError::Internal {
            message: format!("I/O error: {}", error),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RunStatus {
    Run,
    /// END halted the program.
    EndNormal,
    /// Execution fell off the last line.
    EndOfProgram,
    EndErrorRuntime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InfixOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    Equal,
    NotEqual,
    And,
    Or,
}

impl InfixOp {
    pub fn from_token(kind: TokenKind) -> Option<Self> {
        let op = match kind {
            TokenKind::Plus => InfixOp::Add,
            TokenKind::Minus => InfixOp::Sub,
            TokenKind::Mult => InfixOp::Mul,
            TokenKind::Div => InfixOp::Div,
            TokenKind::Mod => InfixOp::Mod,
            TokenKind::Less => InfixOp::Less,
            TokenKind::Greater => InfixOp::Greater,
            TokenKind::LessEqual => InfixOp::LessEqual,
            TokenKind::GreaterEqual => InfixOp::GreaterEqual,
            TokenKind::Equal => InfixOp::Equal,
            TokenKind::NotEqual => InfixOp::NotEqual,
            TokenKind::And => InfixOp::And,
            TokenKind::Or => InfixOp::Or,
            _ => return None,
        };
        Some(op)
    }

    /// The operator spelling understood by `basic_runtime::apply_infix`.
    pub fn symbol(&self) -> &'static str {
        match self {
            InfixOp::Add => "+",
            InfixOp::Sub => "-",
            InfixOp::Mul => "*",
            InfixOp::Div => "/",
            InfixOp::Mod => "MOD",
            InfixOp::Less => "<",
            InfixOp::Greater => ">",
            InfixOp::LessEqual => "<=",
            InfixOp::GreaterEqual => ">=",
            InfixOp::Equal => "==",
            InfixOp::NotEqual => "<>",
            InfixOp::And => "AND",
            InfixOp::Or => "OR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PrefixOp {
    Neg,
    Not,
}

impl PrefixOp {
    pub fn from_token(kind: TokenKind) -> Option<Self> {
        match kind {
            TokenKind::Minus => Some(PrefixOp::Neg),
            TokenKind::Not => Some(PrefixOp::Not),
            _ => None,
        }
    }

    /// The operator spelling understood by `basic_runtime::apply_prefix`.
    pub fn symbol(&self) -> &'static str {
        match self {
            PrefixOp::Neg => "-",
            PrefixOp::Not => "NOT",
        }
    }
}

// Expression types
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum Expression {
    NumberLiteral {
        value: f64,
    },
    StringLiteral {
        value: String,
    },
    Identifier {
        name: String,
    },
    Infix {
        op: InfixOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Prefix {
        op: PrefixOp,
        right: Box<Expression>,
    },
    ArrayAccess {
        name: String,
        index: Box<Expression>,
    },
}

impl Expression {
    pub fn new_number(value: f64) -> Self {
        Expression::NumberLiteral { value }
    }

    pub fn new_string(value: &str) -> Self {
        Expression::StringLiteral {
            value: value.to_string(),
        }
    }

    pub fn new_identifier(name: &str) -> Self {
        Expression::Identifier {
            name: name.to_string(),
        }
    }

    pub fn new_infix(op: InfixOp, left: Expression, right: Expression) -> Self {
        Expression::Infix {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn new_prefix(op: PrefixOp, right: Expression) -> Self {
        Expression::Prefix {
            op,
            right: Box::new(right),
        }
    }

    pub fn new_array_access(name: &str, index: Expression) -> Self {
        Expression::ArrayAccess {
            name: name.to_string(),
            index: Box::new(index),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::NumberLiteral { value } => write!(f, "{}", value),
            Expression::StringLiteral { value } => write!(f, "\"{}\"", value),
            Expression::Identifier { name } => write!(f, "{}", name),
            Expression::Infix { op, left, right } => {
                write!(f, "({} {} {})", left, op.symbol(), right)
            }
            Expression::Prefix { op: PrefixOp::Neg, right } => write!(f, "-{}", right),
            Expression::Prefix { op: PrefixOp::Not, right } => write!(f, "NOT {}", right),
            Expression::ArrayAccess { name, index } => write!(f, "{}({})", name, index),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PrintSeparator {
    Semicolon,
    Comma,
}

impl PrintSeparator {
    /// Text written to the output for this separator.
    pub fn text(&self) -> &'static str {
        match self {
            PrintSeparator::Semicolon => PRINT_SEMICOLON_TEXT,
            PrintSeparator::Comma => PRINT_COMMA_TEXT,
        }
    }

    fn source(&self) -> &'static str {
        match self {
            PrintSeparator::Semicolon => ";",
            PrintSeparator::Comma => ",",
        }
    }
}

// Statement types
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum Statement {
    /// `separators[i]` follows `items[i]`; a dangling separator clears
    /// `trailing_newline`.
    Print {
        items: Vec<Expression>,
        separators: Vec<PrintSeparator>,
        trailing_newline: bool,
    },
    Let {
        name: String,
        value: Expression,
    },
    If {
        condition: Expression,
        consequence: Box<Statement>,
        alternative: Option<Box<Statement>>,
    },
    Goto {
        target: Expression,
    },
    Gosub {
        target: Expression,
    },
    Return,
    For {
        var: String,
        start: Expression,
        end: Expression,
        step: Expression,
    },
    Next {
        var: Option<String>,
    },
    Input {
        prompt: Option<String>,
        vars: Vec<String>,
    },
    End,
    Rem {
        comment: String,
    },
    /// The size is evaluated but never bounds an array.
    Dim {
        name: String,
        size: Expression,
    },
    ExpressionStatement {
        expression: Expression,
    },
    /// Colon-chained statements sharing one line.
    Sequence {
        statements: Vec<Statement>,
    },
}

impl Statement {
    pub fn new_print(items: Vec<Expression>) -> Self {
        Statement::Print {
            items,
            separators: Vec::new(),
            trailing_newline: true,
        }
    }

    pub fn new_let(name: &str, value: Expression) -> Self {
        Statement::Let {
            name: name.to_string(),
            value,
        }
    }

    pub fn new_if(condition: Expression, consequence: Statement, alternative: Option<Statement>) -> Self {
        Statement::If {
            condition,
            consequence: Box::new(consequence),
            alternative: alternative.map(Box::new),
        }
    }

    pub fn new_goto(line: usize) -> Self {
        Statement::Goto {
            target: Expression::new_number(line as f64),
        }
    }

    pub fn new_gosub(line: usize) -> Self {
        Statement::Gosub {
            target: Expression::new_number(line as f64),
        }
    }

    pub fn new_for(var: &str, start: Expression, end: Expression, step: Expression) -> Self {
        Statement::For {
            var: var.to_string(),
            start,
            end,
            step,
        }
    }

    pub fn new_next(var: Option<&str>) -> Self {
        Statement::Next {
            var: var.map(str::to_string),
        }
    }

    pub fn new_dim(name: &str, size: Expression) -> Self {
        Statement::Dim {
            name: name.to_string(),
            size,
        }
    }

    pub fn new_sequence(statements: Vec<Statement>) -> Self {
        Statement::Sequence { statements }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use Statement::*;

        match self {
            Print {
                items,
                separators,
                ..
            } => {
                write!(f, "PRINT")?;
                for (i, item) in items.iter().enumerate() {
                    write!(f, " {}", item)?;
                    if let Some(sep) = separators.get(i) {
                        write!(f, "{}", sep.source())?;
                    }
                }
                Ok(())
            }
            Let { name, value } => write!(f, "LET {} = {}", name, value),
            If {
                condition,
                consequence,
                alternative,
            } => {
                write!(f, "IF {} THEN {}", condition, consequence)?;
                if let Some(alt) = alternative {
                    write!(f, " ELSE {}", alt)?;
                }
                Ok(())
            }
            Goto { target } => write!(f, "GOTO {}", target),
            Gosub { target } => write!(f, "GOSUB {}", target),
            Return => write!(f, "RETURN"),
            For {
                var,
                start,
                end,
                step,
            } => write!(f, "FOR {} = {} TO {} STEP {}", var, start, end, step),
            Next { var: Some(var) } => write!(f, "NEXT {}", var),
            Next { var: None } => write!(f, "NEXT"),
            Input { prompt, vars } => {
                write!(f, "INPUT ")?;
                if let Some(prompt) = prompt {
                    write!(f, "\"{}\"; ", prompt)?;
                }
                write!(f, "{}", vars.join(", "))
            }
            End => write!(f, "END"),
            Rem { comment } => write!(f, "REM {}", comment),
            Dim { name, size } => write!(f, "DIM {}({})", name, size),
            ExpressionStatement { expression } => write!(f, "{}", expression),
            Sequence { statements } => {
                for (i, stmt) in statements.iter().enumerate() {
                    if i > 0 {
                        write!(f, " : ")?;
                    }
                    write!(f, "{}", stmt)?;
                }
                Ok(())
            }
        }
    }
}

// Program line structure
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgramLine {
    pub line_number: usize,
    pub statement: Statement,
}

impl fmt::Display for ProgramLine {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.line_number, self.statement)
    }
}

/// Statements keyed by line number, kept in ascending line order. The
/// position of a line in `lines` is its program-counter index.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Program {
    lines: Vec<ProgramLine>,
}

impl Program {
    pub fn new() -> Self {
        Program { lines: Vec::new() }
    }

    /// Stores a statement, replacing whatever was on that line.
    pub fn add_line(&mut self, line_number: usize, statement: Statement) {
        match self.lines.binary_search_by_key(&line_number, |l| l.line_number) {
            Ok(pos) => self.lines[pos] = ProgramLine { line_number, statement },
            Err(pos) => self.lines.insert(pos, ProgramLine { line_number, statement }),
        }
    }

    pub fn get_line(&self, line_number: usize) -> Option<&ProgramLine> {
        self.lines
            .binary_search_by_key(&line_number, |l| l.line_number)
            .ok()
            .map(|i| &self.lines[i])
    }

    pub fn remove_line(&mut self, line_number: usize) {
        if let Ok(pos) = self.lines.binary_search_by_key(&line_number, |l| l.line_number) {
            self.lines.remove(pos);
        }
    }

    pub fn lines(&self) -> &[ProgramLine] {
        &self.lines
    }

    pub fn line_numbers(&self) -> Vec<usize> {
        self.lines.iter().map(|l| l.line_number).collect()
    }

    /// Maps each declared line number to its index in execution order.
    /// Lines past `i64::MAX` cannot be jump targets and get no entry.
    pub fn line_index_map(&self) -> HashMap<i64, usize> {
        self.lines
            .iter()
            .enumerate()
            .filter_map(|(i, l)| i64::try_from(l.line_number).ok().map(|n| (n, i)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}
