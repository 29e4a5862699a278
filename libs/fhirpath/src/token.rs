//! Token types for the path expression lexer

/// Token types for the path expression lexer
#[derive(Debug, PartialEq, Clone, Eq)]
pub enum TokenType {
    // Literals
    StringLiteral,
    NumberLiteral,

    Identifier,

    // Keywords
    True,
    False,
    And,
    Or,
    This, // $this

    // Operators
    Dot,      // .
    Equal,    // =
    NotEqual, // !=

    // Delimiters
    OpenParen,  // (
    CloseParen, // )
    OpenBrace,  // {
    CloseBrace, // }
    Comma,      // ,

    Eof,

    /// Lexical error; the token value holds the message
    Error,
}

/// A token in the expression
#[derive(Debug, Clone)]
pub struct Token {
    pub token_type: TokenType,
    pub value: String,
    pub position: usize,
}

impl Token {
    pub fn new(token_type: TokenType, value: impl Into<String>, position: usize) -> Self {
        Self {
            token_type,
            value: value.into(),
            position,
        }
    }

    pub fn eof(position: usize) -> Self {
        Self::new(TokenType::Eof, String::new(), position)
    }

    pub fn error(message: impl Into<String>, position: usize) -> Self {
        Self::new(TokenType::Error, message, position)
    }
}
