use std::iter::Peekable;
use std::str::Chars;

use crate::basic_keyword_registry::KEYWORD_REGISTRY;
use crate::basic_types::{Token, TokenKind};

/// Turns source text into tokens. Lexing never fails: unknown characters
/// come back as `Illegal` tokens and are reported by the parser.
pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    current: Option<char>,
    line_number: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        let mut chars = input.chars().peekable();
        let current = chars.next();
        Lexer {
            chars,
            current,
            line_number: 1,
        }
    }

    /// Returns the next token. Once input is exhausted every call yields `Eof`.
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();
        let line = self.line_number;

        let c = match self.current {
            Some(c) => c,
            None => return Token::new(TokenKind::Eof, "", line),
        };

        match c {
            '=' => self.one_or_two(TokenKind::Assign, &[('=', TokenKind::Equal)]),
            '<' => self.one_or_two(
                TokenKind::Less,
                &[('=', TokenKind::LessEqual), ('>', TokenKind::NotEqual)],
            ),
            '>' => self.one_or_two(TokenKind::Greater, &[('=', TokenKind::GreaterEqual)]),
            '+' => self.single(TokenKind::Plus),
            '-' => self.single(TokenKind::Minus),
            '*' => self.single(TokenKind::Mult),
            '/' => self.single(TokenKind::Div),
            '(' => self.single(TokenKind::LeftParen),
            ')' => self.single(TokenKind::RightParen),
            ',' => self.single(TokenKind::Comma),
            ':' => self.single(TokenKind::Colon),
            ';' => self.single(TokenKind::Semicolon),
            '\n' => {
                let token = self.single(TokenKind::Newline);
                self.line_number += 1;
                token
            }
            '"' => {
                let text = self.read_string();
                Token::new(TokenKind::String, &text, line)
            }
            c if c.is_alphabetic() || c == '_' => {
                let word = self.read_while(|c| c.is_alphanumeric() || c == '_');
                Token::new(KEYWORD_REGISTRY.lookup_ident(&word), &word, line)
            }
            c if c.is_ascii_digit() => {
                let number = self.read_while(|c| c.is_ascii_digit() || c == '.');
                Token::new(TokenKind::Number, &number, line)
            }
            other => {
                self.advance();
                Token::new(TokenKind::Illegal, &other.to_string(), line)
            }
        }
    }

    /// Lexes the whole input, including the final `Eof` token.
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = token.is(TokenKind::Eof);
            tokens.push(token);
            if done {
                return tokens;
            }
        }
    }

    fn advance(&mut self) {
        self.current = self.chars.next();
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.current, Some(' ' | '\t' | '\r')) {
            self.advance();
        }
    }

    fn single(&mut self, kind: TokenKind) -> Token {
        let literal = self.current.map(String::from).unwrap_or_default();
        self.advance();
        Token::new(kind, &literal, self.line_number)
    }

    /// Emits a two-character operator when the following character matches
    /// one of `pairs`, otherwise the one-character `kind`.
    fn one_or_two(&mut self, kind: TokenKind, pairs: &[(char, TokenKind)]) -> Token {
        let first = self.current.unwrap_or_default();
        if let Some(&next) = self.chars.peek() {
            if let Some(&(_, two)) = pairs.iter().find(|(c, _)| *c == next) {
                self.advance();
                self.advance();
                return Token::new(two, &format!("{}{}", first, next), self.line_number);
            }
        }
        self.single(kind)
    }

    fn read_while(&mut self, accept: impl Fn(char) -> bool) -> String {
        let mut text = String::new();
        while let Some(c) = self.current {
            if !accept(c) {
                break;
            }
            text.push(c);
            self.advance();
        }
        text
    }

    // No escapes. An unterminated string runs to the end of input.
    fn read_string(&mut self) -> String {
        self.advance();
        let mut text = String::new();
        while let Some(c) = self.current {
            if c == '"' {
                self.advance();
                break;
            }
            if c == '\n' {
                self.line_number += 1;
            }
            text.push(c);
            self.advance();
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source).tokenize().iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_tokenize_let() {
        let tokens = Lexer::new("LET X = 123").tokenize();

        assert_eq!(tokens.len(), 5);
        assert_eq!(tokens[0], Token::new(TokenKind::Let, "LET", 1));
        assert_eq!(tokens[1], Token::new(TokenKind::Ident, "X", 1));
        assert_eq!(tokens[2], Token::new(TokenKind::Assign, "=", 1));
        assert_eq!(tokens[3], Token::new(TokenKind::Number, "123", 1));
        assert_eq!(tokens[4].kind, TokenKind::Eof);
    }

    #[test]
    fn test_tokenize_for() {
        assert_eq!(
            kinds("FOR I = 1 TO 10 STEP 2"),
            vec![
                TokenKind::For,
                TokenKind::Ident,
                TokenKind::Assign,
                TokenKind::Number,
                TokenKind::To,
                TokenKind::Number,
                TokenKind::Step,
                TokenKind::Number,
                TokenKind::Eof,
            ]
        );
    }

    #[rstest]
    #[case("==", TokenKind::Equal)]
    #[case("<=", TokenKind::LessEqual)]
    #[case(">=", TokenKind::GreaterEqual)]
    #[case("<>", TokenKind::NotEqual)]
    #[case("<", TokenKind::Less)]
    #[case(">", TokenKind::Greater)]
    #[case("=", TokenKind::Assign)]
    fn test_operators(#[case] source: &str, #[case] expected: TokenKind) {
        let tokens = Lexer::new(source).tokenize();
        assert_eq!(tokens[0].kind, expected);
        assert_eq!(tokens[0].literal, source);
        assert_eq!(tokens[1].kind, TokenKind::Eof);
    }

    #[test]
    fn test_keywords_keep_original_casing() {
        let tokens = Lexer::new("print Total mod 2").tokenize();

        assert_eq!(tokens[0].kind, TokenKind::Print);
        assert_eq!(tokens[0].literal, "print");
        assert_eq!(tokens[1], Token::new(TokenKind::Ident, "Total", 1));
        assert_eq!(tokens[2].kind, TokenKind::Mod);
    }

    #[test]
    fn test_newlines_count_lines() {
        let tokens = Lexer::new("10 PRINT X\r\n20 END").tokenize();

        assert_eq!(tokens[3].kind, TokenKind::Newline);
        assert_eq!(tokens[3].line, 1);
        assert_eq!(tokens[4], Token::new(TokenKind::Number, "20", 2));
    }

    #[test]
    fn test_strings() {
        let tokens = Lexer::new("PRINT \"a, b: c\"").tokenize();
        assert_eq!(tokens[1], Token::new(TokenKind::String, "a, b: c", 1));
    }

    #[test]
    fn test_unterminated_string_runs_to_end() {
        let tokens = Lexer::new("PRINT \"open\n20 END").tokenize();

        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[1].kind, TokenKind::String);
        assert_eq!(tokens[1].literal, "open\n20 END");
    }

    #[test]
    fn test_illegal_character() {
        let tokens = Lexer::new("PRINT 1 ^ 2").tokenize();
        assert_eq!(tokens[2], Token::new(TokenKind::Illegal, "^", 1));
        assert_eq!(tokens[3].kind, TokenKind::Number);
    }

    #[test]
    fn test_numbers_are_unsigned() {
        assert_eq!(
            kinds("-3.5"),
            vec![TokenKind::Minus, TokenKind::Number, TokenKind::Eof]
        );
    }

    #[test]
    fn test_eof_repeats() {
        let mut lexer = Lexer::new("");
        assert_eq!(lexer.next_token().kind, TokenKind::Eof);
        assert_eq!(lexer.next_token().kind, TokenKind::Eof);
    }
}
