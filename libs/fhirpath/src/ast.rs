//! Abstract syntax tree of a path expression

use serde_json::Number;

#[derive(Debug, Clone, PartialEq)]
pub enum AstNode {
    /// `expression '.' invocation`
    Invocation {
        expression: Box<AstNode>,
        invocation: Invocation,
    },
    /// An invocation with no explicit focus: the leading segment of a path,
    /// or a term inside `where(...)`
    Term(Invocation),
    Literal(Literal),
    /// `{}`
    Empty,
    Equality {
        left: Box<AstNode>,
        operator: EqualityOperator,
        right: Box<AstNode>,
    },
    And {
        left: Box<AstNode>,
        right: Box<AstNode>,
    },
    Or {
        left: Box<AstNode>,
        right: Box<AstNode>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Invocation {
    Member(String),
    Function { name: Function, args: Vec<AstNode> },
    This,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    First,
    Last,
    Where,
    Exists,
    StartsWith,
    Resolve,
}

impl Function {
    pub fn from_name(name: &str) -> Option<Self> {
        let function = match name {
            "first" => Self::First,
            "last" => Self::Last,
            "where" => Self::Where,
            "exists" => Self::Exists,
            "startsWith" => Self::StartsWith,
            "resolve" => Self::Resolve,
            _ => return None,
        };
        Some(function)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::First => "first",
            Self::Last => "last",
            Self::Where => "where",
            Self::Exists => "exists",
            Self::StartsWith => "startsWith",
            Self::Resolve => "resolve",
        }
    }

    /// Accepted argument counts, inclusive
    pub fn arity(&self) -> (usize, usize) {
        match self {
            Self::First | Self::Last | Self::Resolve => (0, 0),
            Self::Where | Self::StartsWith => (1, 1),
            Self::Exists => (0, 1),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Number(Number),
    Boolean(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EqualityOperator {
    Equal,
    NotEqual,
}
