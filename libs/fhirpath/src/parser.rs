//! Path expression parser
//!
//! Recursive descent over a small grammar. Precedence (lowest to highest):
//! 1. or
//! 2. and
//! 3. equality (=, !=)
//! 4. invocation (.)
//! 5. term (literal, identifier, function call, `$this`, `{}`, parenthesized)

use crate::ast::*;
use crate::error::{Error, Result};
use crate::lexer::Lexer;
use crate::token::{Token, TokenType};
use serde_json::Number;

pub struct Parser {
    lexer: Lexer,
    current_token: Token,
    recursion_depth: usize,
}

const MAX_RECURSION_DEPTH: usize = 200;

impl Parser {
    pub fn new(input: &str) -> Self {
        let mut lexer = Lexer::new(input);
        let current_token = lexer.next_token();
        Self {
            lexer,
            current_token,
            recursion_depth: 0,
        }
    }

    fn advance(&mut self) {
        self.current_token = self.lexer.next_token();
    }

    fn current_token_is(&self, token_type: TokenType) -> bool {
        self.current_token.token_type == token_type
    }

    fn unexpected(&self) -> Error {
        let token = &self.current_token;
        match token.token_type {
            TokenType::Error => Error::ParseError(format!(
                "{} at position {}",
                token.value, token.position
            )),
            TokenType::Eof => Error::ParseError("Unexpected end of expression".into()),
            _ => Error::ParseError(format!(
                "Unexpected token '{}' at position {}",
                token.value, token.position
            )),
        }
    }

    fn expect(&mut self, token_type: TokenType) -> Result<()> {
        if self.current_token_is(token_type.clone()) {
            self.advance();
            Ok(())
        } else if self.current_token_is(TokenType::Error) {
            Err(self.unexpected())
        } else {
            Err(Error::ParseError(format!(
                "Expected {:?}, got '{}' at position {}",
                token_type, self.current_token.value, self.current_token.position
            )))
        }
    }

    /// Parse the entire input as one expression.
    pub fn parse(&mut self) -> Result<AstNode> {
        let expr = self.parse_expression()?;
        if !self.current_token_is(TokenType::Eof) {
            return Err(self.unexpected());
        }
        Ok(expr)
    }

    fn parse_expression(&mut self) -> Result<AstNode> {
        self.recursion_depth += 1;
        if self.recursion_depth > MAX_RECURSION_DEPTH {
            return Err(Error::ParseError(format!(
                "Expression too deeply nested (max depth: {})",
                MAX_RECURSION_DEPTH
            )));
        }
        let expr = self.parse_or_expression();
        self.recursion_depth -= 1;
        expr
    }

    fn parse_or_expression(&mut self) -> Result<AstNode> {
        let mut left = self.parse_and_expression()?;
        while self.current_token_is(TokenType::Or) {
            self.advance();
            let right = self.parse_and_expression()?;
            left = AstNode::Or {
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and_expression(&mut self) -> Result<AstNode> {
        let mut left = self.parse_equality_expression()?;
        while self.current_token_is(TokenType::And) {
            self.advance();
            let right = self.parse_equality_expression()?;
            left = AstNode::And {
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_equality_expression(&mut self) -> Result<AstNode> {
        let mut left = self.parse_invocation_expression()?;
        loop {
            let operator = match self.current_token.token_type {
                TokenType::Equal => EqualityOperator::Equal,
                TokenType::NotEqual => EqualityOperator::NotEqual,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_invocation_expression()?;
            left = AstNode::Equality {
                left: Box::new(left),
                operator,
                right: Box::new(right),
            };
        }
    }

    fn parse_invocation_expression(&mut self) -> Result<AstNode> {
        let mut expr = self.parse_term()?;
        while self.current_token_is(TokenType::Dot) {
            self.advance();
            let invocation = self.parse_invocation()?;
            expr = AstNode::Invocation {
                expression: Box::new(expr),
                invocation,
            };
        }
        Ok(expr)
    }

    fn parse_term(&mut self) -> Result<AstNode> {
        match self.current_token.token_type {
            TokenType::StringLiteral => {
                let value = std::mem::take(&mut self.current_token.value);
                self.advance();
                Ok(AstNode::Literal(Literal::String(value)))
            }
            TokenType::NumberLiteral => {
                let number = parse_number(&self.current_token.value)?;
                self.advance();
                Ok(AstNode::Literal(Literal::Number(number)))
            }
            TokenType::True | TokenType::False => {
                let value = self.current_token_is(TokenType::True);
                self.advance();
                Ok(AstNode::Literal(Literal::Boolean(value)))
            }
            TokenType::OpenBrace => {
                self.advance();
                self.expect(TokenType::CloseBrace)?;
                Ok(AstNode::Empty)
            }
            TokenType::OpenParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(TokenType::CloseParen)?;
                Ok(expr)
            }
            TokenType::Identifier | TokenType::This => Ok(AstNode::Term(self.parse_invocation()?)),
            _ => Err(self.unexpected()),
        }
    }

    /// Member name, function call or `$this`
    fn parse_invocation(&mut self) -> Result<Invocation> {
        if self.current_token_is(TokenType::This) {
            self.advance();
            return Ok(Invocation::This);
        }
        if !self.current_token_is(TokenType::Identifier) {
            return Err(self.unexpected());
        }

        let name = std::mem::take(&mut self.current_token.value);
        let position = self.current_token.position;
        self.advance();
        if !self.current_token_is(TokenType::OpenParen) {
            return Ok(Invocation::Member(name));
        }

        let function = Function::from_name(&name).ok_or_else(|| {
            Error::FunctionNotFound(format!("{}() at position {}", name, position))
        })?;
        self.advance();
        let mut args = Vec::new();
        if !self.current_token_is(TokenType::CloseParen) {
            args.push(self.parse_expression()?);
            while self.current_token_is(TokenType::Comma) {
                self.advance();
                args.push(self.parse_expression()?);
            }
        }
        self.expect(TokenType::CloseParen)?;

        let (min, max) = function.arity();
        if args.len() < min || args.len() > max {
            return Err(Error::ParseError(format!(
                "{}() takes {} argument(s), got {}",
                function.name(),
                if min == max { min.to_string() } else { format!("{}-{}", min, max) },
                args.len()
            )));
        }
        Ok(Invocation::Function {
            name: function,
            args,
        })
    }
}

/// Integers stay integers; anything with a fraction becomes a float.
fn parse_number(text: &str) -> Result<Number> {
    if let Ok(n) = text.parse::<i64>() {
        return Ok(Number::from(n));
    }
    text.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .ok_or_else(|| Error::ParseError(format!("Invalid number literal '{}'", text)))
}

/// Parse `input` into an AST.
pub fn parse(input: &str) -> Result<AstNode> {
    Parser::new(input).parse()
}
