use smol_str::SmolStr;
use std::fmt;

use lamina_ast::Span;

#[derive(Debug, Clone)]
pub struct TypeError {
    pub kind: TypeErrorKind,
    pub span: Span,
}

impl TypeError {
    pub fn new(kind: TypeErrorKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TypeErrorKind {
    #[error("cannot resolve variable `{0}` in scope")]
    UnboundVariable(SmolStr),

    #[error("head of application is not a function (found {0})")]
    NotAFunction(String),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("conflicting instantiations for type variable `{name}`: {first} vs {second}")]
    OccursCheck {
        name: SmolStr,
        first: String,
        second: String,
    },

    #[error("resolving a unification variable to {0} violates a recorded constraint")]
    ConstraintViolation(String),

    #[error("{value} is not an integer; a value of type {ty} was expected")]
    NonIntegerLiteral { value: f64, ty: String },

    #[error("numeric literal declared at non-numeric type {0}")]
    NonNumericLiteralType(String),

    #[error("value of polymorphic type {0} cannot be an operand of arithmetic")]
    PolymorphicOperand(String),
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}:{}] {}", self.span.start, self.span.end, self.kind)
    }
}
