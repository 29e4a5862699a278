//! Path expression lexer
//!
//! Converts expression strings into a stream of tokens.

use crate::error::{Error, Result};
use crate::token::{Token, TokenType};

pub struct Lexer {
    position: usize,
    chars: Vec<char>,
    current_char: Option<char>,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        let chars: Vec<char> = input.chars().collect();
        let current_char = chars.first().copied();

        Self {
            position: 0,
            chars,
            current_char,
        }
    }

    fn advance(&mut self) {
        self.position += 1;
        self.current_char = self.chars.get(self.position).copied();
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.position + 1).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.current_char.is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    fn read_identifier(&mut self) -> String {
        let start_pos = self.position;
        while self
            .current_char
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
        {
            self.advance();
        }
        self.chars[start_pos..self.position].iter().collect()
    }

    /// Read a string literal: 'string'
    fn read_string(&mut self) -> Result<String> {
        self.advance(); // opening quote

        let mut value = String::new();
        while let Some(c) = self.current_char {
            match c {
                '\'' => {
                    self.advance();
                    return Ok(value);
                }
                '\\' => {
                    self.advance();
                    let Some(escaped) = self.current_char else {
                        break;
                    };
                    match escaped {
                        'n' => value.push('\n'),
                        'r' => value.push('\r'),
                        't' => value.push('\t'),
                        other => value.push(other),
                    }
                    self.advance();
                }
                _ => {
                    value.push(c);
                    self.advance();
                }
            }
        }

        Err(Error::ParseError("Unterminated string literal".into()))
    }

    /// Read a number; the dot is only consumed when digits follow it.
    fn read_number(&mut self) -> String {
        let start_pos = self.position;
        while self.current_char.is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        if self.current_char == Some('.') && self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            while self.current_char.is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }
        self.chars[start_pos..self.position].iter().collect()
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let position = self.position;
        let Some(c) = self.current_char else {
            return Token::eof(position);
        };

        let single = |token_type: TokenType| Token::new(token_type, c.to_string(), position);
        match c {
            '.' => {
                self.advance();
                single(TokenType::Dot)
            }
            '(' => {
                self.advance();
                single(TokenType::OpenParen)
            }
            ')' => {
                self.advance();
                single(TokenType::CloseParen)
            }
            '{' => {
                self.advance();
                single(TokenType::OpenBrace)
            }
            '}' => {
                self.advance();
                single(TokenType::CloseBrace)
            }
            ',' => {
                self.advance();
                single(TokenType::Comma)
            }
            '=' => {
                self.advance();
                single(TokenType::Equal)
            }
            '!' if self.peek() == Some('=') => {
                self.advance();
                self.advance();
                Token::new(TokenType::NotEqual, "!=", position)
            }
            '\'' => match self.read_string() {
                Ok(value) => Token::new(TokenType::StringLiteral, value, position),
                Err(e) => Token::error(e.to_string(), position),
            },
            '$' => {
                self.advance();
                let name = self.read_identifier();
                if name == "this" {
                    Token::new(TokenType::This, "$this", position)
                } else {
                    Token::error(format!("Unknown variable ${}", name), position)
                }
            }
            c if c.is_ascii_digit() => {
                let value = self.read_number();
                Token::new(TokenType::NumberLiteral, value, position)
            }
            c if c.is_alphabetic() || c == '_' => {
                let ident = self.read_identifier();
                let token_type = match ident.as_str() {
                    "true" => TokenType::True,
                    "false" => TokenType::False,
                    "and" => TokenType::And,
                    "or" => TokenType::Or,
                    _ => TokenType::Identifier,
                };
                Token::new(token_type, ident, position)
            }
            other => {
                self.advance();
                Token::error(format!("Unexpected character '{}'", other), position)
            }
        }
    }
}
