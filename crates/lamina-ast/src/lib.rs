use la_arena::{Arena, Idx};
use smol_str::SmolStr;
use std::fmt;

pub use lamina_lexer::Span;

// ── ID types ──────────────────────────────────────────────────────

pub type ExprId = Idx<Expr>;

// ── Program ───────────────────────────────────────────────────────

/// A parsed source file: an ordered sequence of top-level bindings.
/// Each binding sees only the bindings before it.
#[derive(Debug, Clone)]
pub struct Program {
    pub bindings: Vec<Binding>,
    pub exprs: Arena<Expr>,
}

impl Program {
    pub fn new() -> Self {
        Self {
            bindings: Vec::new(),
            exprs: Arena::new(),
        }
    }
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}

/// Top-level binding: `name = expr`
#[derive(Debug, Clone)]
pub struct Binding {
    pub name: SmolStr,
    pub name_span: Span,
    pub value: ExprId,
    pub span: Span,
}

// ── Expressions ───────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    /// Variable reference.
    Var(SmolStr),
    /// Numeric literal with its declared type: `41`, `2.5:F64`
    Num { value: f64, declared: TypeAnn },
    /// Lambda abstraction: `\x:I32. body`
    Abs {
        param: SmolStr,
        param_span: Span,
        param_ann: TypeAnn,
        body: ExprId,
    },
    /// Application: `f x`
    App { func: ExprId, arg: ExprId },
    /// Arithmetic: `a + b`
    Arith { op: ArithOp, lhs: ExprId, rhs: ExprId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithOp {
    pub fn symbol(self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
        }
    }
}

// ── Type syntax ───────────────────────────────────────────────────

/// The four base numeric kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseTy {
    I32,
    I64,
    F32,
    F64,
}

impl BaseTy {
    pub fn from_name(name: &str) -> Option<BaseTy> {
        match name {
            "I32" => Some(BaseTy::I32),
            "I64" => Some(BaseTy::I64),
            "F32" => Some(BaseTy::F32),
            "F64" => Some(BaseTy::F64),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BaseTy::I32 => "I32",
            BaseTy::I64 => "I64",
            BaseTy::F32 => "F32",
            BaseTy::F64 => "F64",
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(self, BaseTy::I32 | BaseTy::I64)
    }
}

impl fmt::Display for BaseTy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Syntactic type annotation, as written in the source.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeAnn {
    /// Base numeric kind: `I32`
    Base(BaseTy),
    /// Polymorphic type variable: `a`
    Poly(SmolStr),
    /// Function type, right-associative: `I32 -> a -> a`
    Fn(Box<TypeAnn>, Box<TypeAnn>),
}

impl fmt::Display for TypeAnn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeAnn::Base(base) => write!(f, "{}", base),
            TypeAnn::Poly(name) => write!(f, "{}", name),
            TypeAnn::Fn(param, ret) => {
                // `->` is right-associative, so a function-typed parameter
                // needs parentheses.
                if matches!(**param, TypeAnn::Fn(_, _)) {
                    write!(f, "({}) -> {}", param, ret)
                } else {
                    write!(f, "{} -> {}", param, ret)
                }
            }
        }
    }
}

// ── Pretty printer ────────────────────────────────────────────────

pub fn pretty_print(program: &Program) -> String {
    let mut printer = PrettyPrinter {
        program,
        buf: String::new(),
    };
    printer.print_program();
    printer.buf
}

struct PrettyPrinter<'a> {
    program: &'a Program,
    buf: String,
}

impl<'a> PrettyPrinter<'a> {
    fn print_program(&mut self) {
        for binding in &self.program.bindings {
            self.buf.push_str(binding.name.as_str());
            self.buf.push_str(" = ");
            self.print_expr(binding.value);
            self.buf.push('\n');
        }
    }

    fn print_expr(&mut self, id: ExprId) {
        let expr = &self.program.exprs[id];
        match &expr.kind {
            ExprKind::Var(name) => self.buf.push_str(name),
            ExprKind::Num { value, declared } => {
                if value.fract() == 0.0 {
                    self.buf.push_str(&format!("{}", *value as i64));
                } else {
                    self.buf.push_str(&format!("{:?}", value));
                }
                self.buf.push(':');
                self.buf.push_str(&declared.to_string());
            }
            ExprKind::Abs {
                param, param_ann, body, ..
            } => {
                self.buf.push('\\');
                self.buf.push_str(param);
                self.buf.push(':');
                self.buf.push_str(&param_ann.to_string());
                self.buf.push_str(". ");
                self.print_expr(*body);
            }
            ExprKind::App { func, arg } => {
                self.buf.push('(');
                self.print_expr(*func);
                self.buf.push(' ');
                self.print_expr(*arg);
                self.buf.push(')');
            }
            ExprKind::Arith { op, lhs, rhs } => {
                self.buf.push('(');
                self.print_expr(*lhs);
                self.buf.push(' ');
                self.buf.push_str(op.symbol());
                self.buf.push(' ');
                self.print_expr(*rhs);
                self.buf.push(')');
            }
        }
    }
}
