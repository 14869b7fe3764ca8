use tracing::{debug, warn};

use crate::basic_dialect::{DEFAULT_FOR_STEP, IMMEDIATE_LINE};
use crate::basic_lexer::Lexer;
use crate::basic_types::{
    BasicError, Expression, InfixOp, PrefixOp, PrintSeparator, Program, Statement, Token,
    TokenKind,
};

/// Binding strength of infix operators, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Lowest,
    Logical,
    Equals,
    LessGreater,
    Sum,
    Product,
    Prefix,
    Call,
}

fn precedence_of(kind: TokenKind) -> Precedence {
    match kind {
        TokenKind::And | TokenKind::Or => Precedence::Logical,
        TokenKind::Equal | TokenKind::NotEqual => Precedence::Equals,
        TokenKind::Less | TokenKind::Greater | TokenKind::LessEqual | TokenKind::GreaterEqual => {
            Precedence::LessGreater
        }
        TokenKind::Plus | TokenKind::Minus => Precedence::Sum,
        TokenKind::Mult | TokenKind::Div | TokenKind::Mod => Precedence::Product,
        TokenKind::LeftParen => Precedence::Call,
        _ => Precedence::Lowest,
    }
}

type ParseResult<T> = Result<T, String>;

/// Deepest nesting of expressions and IF statements accepted on one line.
pub const MAX_NESTING_DEPTH: usize = 256;

/// Builds a `Program` from tokens. Errors are collected per line: a line
/// that fails to parse is reported, skipped, and parsing carries on with
/// the next line.
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    errors: Vec<String>,
    depth: usize,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map_or(true, |t| t.kind != TokenKind::Eof) {
            let line = tokens.last().map_or(1, |t| t.line);
            tokens.push(Token::new(TokenKind::Eof, "", line));
        }
        Parser {
            tokens,
            current: 0,
            errors: Vec::new(),
            depth: 0,
        }
    }

    /// Parses every line, returning the program together with all errors seen.
    pub fn parse_program(&mut self) -> (Program, Vec<String>) {
        let mut program = Program::new();

        while !self.is_at_end() {
            if self.check(TokenKind::Newline) {
                self.advance();
                continue;
            }

            match self.parse_line() {
                Ok((line_number, statement)) => program.add_line(line_number, statement),
                Err(message) => {
                    warn!(line = self.peek().line, %message, "parse error");
                    self.errors.push(message);
                    self.synchronize();
                }
            }
        }

        debug!(lines = program.len(), errors = self.errors.len(), "parsed program");
        (program, self.errors.clone())
    }

    /// Parses the program, failing if any line had an error.
    pub fn parse(&mut self) -> Result<Program, BasicError> {
        let (program, errors) = self.parse_program();
        if errors.is_empty() {
            Ok(program)
        } else {
            Err(BasicError::Syntax { messages: errors })
        }
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    fn parse_line(&mut self) -> ParseResult<(usize, Statement)> {
        let line_number = if self.check(TokenKind::Number) {
            let literal = self.advance().literal.clone();
            // Jump targets are looked up as i64, so larger line numbers are rejected.
            literal
                .parse::<i64>()
                .ok()
                .and_then(|n| usize::try_from(n).ok())
                .ok_or_else(|| format!("could not parse {:?} as line number", literal))?
        } else {
            IMMEDIATE_LINE
        };

        let statement = self.parse_statement_group()?;

        if !self.check(TokenKind::Newline) && !self.is_at_end() {
            return Err(self.expected(TokenKind::Newline));
        }
        Ok((line_number, statement))
    }

    /// Parses colon-chained statements. Stops at a colon that is followed by
    /// the end of the line or by ELSE, which leaves ELSE for an enclosing IF.
    fn parse_statement_group(&mut self) -> ParseResult<Statement> {
        let mut statements = vec![self.parse_statement()?];

        while self.check(TokenKind::Colon) {
            self.advance();
            if self.check_any(&[
                TokenKind::Newline,
                TokenKind::Eof,
                TokenKind::Colon,
                TokenKind::Else,
            ]) {
                break;
            }
            statements.push(self.parse_statement()?);
        }

        if statements.len() == 1 {
            Ok(statements.remove(0))
        } else {
            Ok(Statement::new_sequence(statements))
        }
    }

    fn parse_statement(&mut self) -> ParseResult<Statement> {
        match self.peek().kind {
            TokenKind::Print => self.parse_print(),
            TokenKind::Let => {
                self.advance();
                let name = self.expect_identifier()?;
                self.consume(TokenKind::Assign)?;
                let value = self.parse_expression(Precedence::Lowest)?;
                Ok(Statement::Let { name, value })
            }
            TokenKind::If => self.nested(Self::parse_if),
            TokenKind::Goto => {
                self.advance();
                let target = self.parse_expression(Precedence::Lowest)?;
                Ok(Statement::Goto { target })
            }
            TokenKind::Gosub => {
                self.advance();
                let target = self.parse_expression(Precedence::Lowest)?;
                Ok(Statement::Gosub { target })
            }
            TokenKind::Return => {
                self.advance();
                Ok(Statement::Return)
            }
            TokenKind::For => self.parse_for(),
            TokenKind::Next => {
                self.advance();
                let var = if self.check(TokenKind::Ident) {
                    Some(self.advance().literal.clone())
                } else {
                    None
                };
                Ok(Statement::Next { var })
            }
            TokenKind::Input => self.parse_input(),
            TokenKind::End => {
                self.advance();
                Ok(Statement::End)
            }
            TokenKind::Rem => {
                self.advance();
                let mut words = Vec::new();
                while !self.check_any(&[TokenKind::Eof, TokenKind::Newline, TokenKind::Colon]) {
                    words.push(self.advance().literal.clone());
                }
                Ok(Statement::Rem {
                    comment: words.join(" "),
                })
            }
            TokenKind::Dim => {
                self.advance();
                let name = self.expect_identifier()?;
                self.consume(TokenKind::LeftParen)?;
                let size = self.parse_expression(Precedence::Lowest)?;
                self.consume(TokenKind::RightParen)?;
                Ok(Statement::Dim { name, size })
            }
            _ => {
                let expression = self.parse_expression(Precedence::Lowest)?;
                Ok(Statement::ExpressionStatement { expression })
            }
        }
    }

    fn parse_print(&mut self) -> ParseResult<Statement> {
        self.advance();
        let mut items = Vec::new();
        let mut separators = Vec::new();
        let mut trailing_newline = true;

        if self.at_statement_end() {
            return Ok(Statement::Print {
                items,
                separators,
                trailing_newline,
            });
        }

        loop {
            items.push(self.parse_expression(Precedence::Lowest)?);

            let separator = match self.peek().kind {
                TokenKind::Semicolon => PrintSeparator::Semicolon,
                TokenKind::Comma => PrintSeparator::Comma,
                _ => break,
            };
            self.advance();
            separators.push(separator);

            if self.at_statement_end() {
                trailing_newline = false;
                break;
            }
        }

        Ok(Statement::Print {
            items,
            separators,
            trailing_newline,
        })
    }

    fn parse_if(&mut self) -> ParseResult<Statement> {
        self.advance();
        let condition = self.parse_expression(Precedence::Lowest)?;
        self.consume(TokenKind::Then)?;
        let consequence = self.parse_statement_group()?;

        let alternative = if self.check(TokenKind::Else) {
            self.advance();
            Some(Box::new(self.parse_statement_group()?))
        } else {
            None
        };

        Ok(Statement::If {
            condition,
            consequence: Box::new(consequence),
            alternative,
        })
    }

    fn parse_for(&mut self) -> ParseResult<Statement> {
        self.advance();
        let var = self.expect_identifier()?;
        self.consume(TokenKind::Assign)?;
        let start = self.parse_expression(Precedence::Lowest)?;
        self.consume(TokenKind::To)?;
        let end = self.parse_expression(Precedence::Lowest)?;

        let step = if self.check(TokenKind::Step) {
            self.advance();
            self.parse_expression(Precedence::Lowest)?
        } else {
            Expression::new_number(DEFAULT_FOR_STEP)
        };

        Ok(Statement::For {
            var,
            start,
            end,
            step,
        })
    }

    fn parse_input(&mut self) -> ParseResult<Statement> {
        self.advance();

        let prompt = if self.check(TokenKind::String) {
            let prompt = self.advance().literal.clone();
            if !self.match_any(&[TokenKind::Semicolon, TokenKind::Comma]) {
                return Err(self.expected(TokenKind::Semicolon));
            }
            Some(prompt)
        } else {
            None
        };

        let mut vars = vec![self.expect_identifier()?];
        while self.check(TokenKind::Comma) {
            self.advance();
            vars.push(self.expect_identifier()?);
        }

        Ok(Statement::Input { prompt, vars })
    }

    /// Precedence climbing: a prefix parse followed by infix operators that
    /// bind tighter than `precedence`.
    fn parse_expression(&mut self, precedence: Precedence) -> ParseResult<Expression> {
        self.nested(|parser| parser.parse_expression_at(precedence))
    }

    fn parse_expression_at(&mut self, precedence: Precedence) -> ParseResult<Expression> {
        let mut left = self.parse_prefix()?;

        while !self.check_any(&[TokenKind::Eof, TokenKind::Newline, TokenKind::Colon])
            && precedence < precedence_of(self.peek().kind)
        {
            left = self.parse_infix(left)?;
        }

        Ok(left)
    }

    fn parse_prefix(&mut self) -> ParseResult<Expression> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Ident => {
                self.advance();
                Ok(Expression::new_identifier(&token.literal))
            }
            TokenKind::Number => {
                self.advance();
                token
                    .literal
                    .parse::<f64>()
                    .map(Expression::new_number)
                    .map_err(|_| format!("could not parse {:?} as number", token.literal))
            }
            TokenKind::String => {
                self.advance();
                Ok(Expression::new_string(&token.literal))
            }
            TokenKind::Minus | TokenKind::Not => {
                self.advance();
                let right = self.parse_expression(Precedence::Prefix)?;
                match PrefixOp::from_token(token.kind) {
                    Some(op) => Ok(Expression::new_prefix(op, right)),
                    None => Err(format!("no prefix parse function for {} found", token.kind)),
                }
            }
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.parse_expression(Precedence::Lowest)?;
                self.consume(TokenKind::RightParen)?;
                Ok(inner)
            }
            other => Err(format!("no prefix parse function for {} found", other)),
        }
    }

    fn parse_infix(&mut self, left: Expression) -> ParseResult<Expression> {
        let token = self.peek().clone();

        if token.kind == TokenKind::LeftParen {
            let name = match left {
                Expression::Identifier { name } => name,
                other => return Err(format!("expected array name before (, got {}", other)),
            };
            self.advance();
            let index = self.parse_expression(Precedence::Lowest)?;
            self.consume(TokenKind::RightParen)?;
            return Ok(Expression::new_array_access(&name, index));
        }

        let op = InfixOp::from_token(token.kind)
            .ok_or_else(|| format!("no infix parse function for {} found", token.kind))?;
        let precedence = precedence_of(token.kind);
        self.advance();
        let right = self.parse_expression(precedence)?;
        Ok(Expression::new_infix(op, left, right))
    }

    // Helper methods
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> ParseResult<T>) -> ParseResult<T> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(format!("nesting deeper than {} levels", MAX_NESTING_DEPTH));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn peek(&self) -> &Token {
        // The stream always ends with Eof and `current` never moves past it.
        &self.tokens[self.current]
    }

    fn advance(&mut self) -> &Token {
        let index = self.current;
        if !self.is_at_end() {
            self.current += 1;
        }
        &self.tokens[index]
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn check_any(&self, kinds: &[TokenKind]) -> bool {
        kinds.iter().any(|&kind| self.check(kind))
    }

    fn match_any(&mut self, kinds: &[TokenKind]) -> bool {
        if self.check_any(kinds) {
            self.advance();
            return true;
        }
        false
    }

    fn consume(&mut self, kind: TokenKind) -> ParseResult<&Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.expected(kind))
        }
    }

    fn expect_identifier(&mut self) -> ParseResult<String> {
        Ok(self.consume(TokenKind::Ident)?.literal.clone())
    }

    fn expected(&self, kind: TokenKind) -> String {
        format!(
            "expected next token to be {}, got {} instead",
            kind,
            self.peek().kind
        )
    }

    fn at_statement_end(&self) -> bool {
        self.check_any(&[
            TokenKind::Eof,
            TokenKind::Newline,
            TokenKind::Colon,
            TokenKind::Else,
        ])
    }

    fn is_at_end(&self) -> bool {
        self.check(TokenKind::Eof)
    }

    fn synchronize(&mut self) {
        while !self.is_at_end() && !self.check(TokenKind::Newline) {
            self.advance();
        }
    }
}

/// Lexes and parses `source` in one step.
pub fn parse_source(source: &str) -> Result<Program, BasicError> {
    let tokens = Lexer::new(source).tokenize();
    Parser::new(tokens).parse()
}
