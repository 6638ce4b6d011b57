use lamina_ast::*;
use lamina_lexer::{lex, Span, Token};
use smol_str::SmolStr;

#[derive(Debug, Clone)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}:{}: {}", self.span.start, self.span.end, self.message)
    }
}

pub fn parse(source: &str) -> (Program, Vec<ParseError>) {
    let (tokens, lex_errors) = lex(source);
    let mut parser = Parser::new(tokens);
    let mut errors: Vec<ParseError> = lex_errors
        .into_iter()
        .map(|span| ParseError {
            message: "unexpected character".into(),
            span,
        })
        .collect();
    parser.parse_program();
    errors.append(&mut parser.errors);
    (parser.program, errors)
}

struct Parser {
    tokens: Vec<(Token, Span)>,
    pos: usize,
    program: Program,
    errors: Vec<ParseError>,
}

impl Parser {
    fn new(tokens: Vec<(Token, Span)>) -> Self {
        Self {
            tokens,
            pos: 0,
            program: Program::new(),
            errors: Vec::new(),
        }
    }

    // ── Token helpers ─────────────────────────────────────────────

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn peek_span(&self) -> Span {
        self.tokens.get(self.pos).map(|(_, s)| *s).unwrap_or_else(|| {
            self.tokens
                .last()
                .map(|(_, s)| Span::new(s.end, s.end))
                .unwrap_or(Span::new(0, 0))
        })
    }

    fn advance(&mut self) -> (Token, Span) {
        let tok = self.tokens[self.pos].clone();
        self.pos += 1;
        tok
    }

    fn check(&self, expected: &Token) -> bool {
        self.peek() == Some(expected)
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.check(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token) -> Option<Span> {
        if self.check(expected) {
            let (_, span) = self.advance();
            Some(span)
        } else {
            let span = self.peek_span();
            self.error(
                format!("expected {:?}, found {:?}", expected, self.peek()),
                span,
            );
            None
        }
    }

    fn expect_ident(&mut self) -> Option<(SmolStr, Span)> {
        if let Some(Token::Ident(_)) = self.peek() {
            let (tok, span) = self.advance();
            if let Token::Ident(name) = tok {
                return Some((name, span));
            }
        }
        let span = self.peek_span();
        self.error(format!("expected identifier, found {:?}", self.peek()), span);
        None
    }

    fn error(&mut self, message: String, span: Span) {
        self.errors.push(ParseError { message, span });
    }

    fn alloc(&mut self, kind: ExprKind, span: Span) -> ExprId {
        self.program.exprs.alloc(Expr { kind, span })
    }

    fn expr_span(&self, id: ExprId) -> Span {
        self.program.exprs[id].span
    }

    /// Skip forward to just past the next `;` (error recovery).
    fn synchronize(&mut self) {
        while !self.at_end() {
            if let (Token::Semi, _) = self.advance() {
                return;
            }
        }
    }

    // ── Program and bindings ──────────────────────────────────────

    fn parse_program(&mut self) {
        while !self.at_end() {
            // Tolerate stray separators between bindings.
            if self.eat(&Token::Semi) {
                continue;
            }
            match self.parse_binding() {
                Some(binding) => {
                    self.program.bindings.push(binding);
                    if !self.at_end() && self.expect(&Token::Semi).is_none() {
                        self.synchronize();
                    }
                }
                None => self.synchronize(),
            }
        }
    }

    fn parse_binding(&mut self) -> Option<Binding> {
        let (name, name_span) = self.expect_ident()?;
        self.expect(&Token::Equals)?;
        let value = self.parse_expr()?;
        let span = name_span.merge(self.expr_span(value));
        Some(Binding {
            name,
            name_span,
            value,
            span,
        })
    }

    // ── Expressions ───────────────────────────────────────────────

    fn parse_expr(&mut self) -> Option<ExprId> {
        self.parse_additive()
    }

    fn parse_additive(&mut self) -> Option<ExprId> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => ArithOp::Add,
                Some(Token::Minus) => ArithOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_multiplicative()?;
            let span = self.expr_span(lhs).merge(self.expr_span(rhs));
            lhs = self.alloc(ExprKind::Arith { op, lhs, rhs }, span);
        }
        Some(lhs)
    }

    fn parse_multiplicative(&mut self) -> Option<ExprId> {
        let mut lhs = self.parse_apply()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => ArithOp::Mul,
                Some(Token::Slash) => ArithOp::Div,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_apply()?;
            let span = self.expr_span(lhs).merge(self.expr_span(rhs));
            lhs = self.alloc(ExprKind::Arith { op, lhs, rhs }, span);
        }
        Some(lhs)
    }

    /// Application by juxtaposition, left-associative: `f x y` = `(f x) y`.
    /// A lambda argument must be parenthesized; a bare lambda is only valid
    /// in head position, where its body extends as far right as possible.
    fn parse_apply(&mut self) -> Option<ExprId> {
        let mut func = self.parse_primary()?;
        while matches!(
            self.peek(),
            Some(Token::Ident(_)) | Some(Token::Int(_)) | Some(Token::Float(_)) | Some(Token::LParen)
        ) {
            let arg = self.parse_primary()?;
            let span = self.expr_span(func).merge(self.expr_span(arg));
            func = self.alloc(ExprKind::App { func, arg }, span);
        }
        Some(func)
    }

    fn parse_primary(&mut self) -> Option<ExprId> {
        match self.peek() {
            Some(Token::Ident(_)) => {
                let (tok, span) = self.advance();
                let Token::Ident(name) = tok else { unreachable!() };
                Some(self.alloc(ExprKind::Var(name), span))
            }
            Some(Token::Int(_)) => {
                let (tok, span) = self.advance();
                let Token::Int(value) = tok else { unreachable!() };
                self.finish_literal(value as f64, span, BaseTy::I32)
            }
            Some(Token::Float(_)) => {
                let (tok, span) = self.advance();
                let Token::Float(value) = tok else { unreachable!() };
                self.finish_literal(value, span, BaseTy::F64)
            }
            Some(Token::Backslash) => self.parse_lambda(),
            Some(Token::LParen) => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                Some(inner)
            }
            _ => {
                let span = self.peek_span();
                self.error(
                    format!("expected expression, found {:?}", self.peek()),
                    span,
                );
                None
            }
        }
    }

    /// Attach the literal's declared type, defaulting when unannotated.
    fn finish_literal(&mut self, value: f64, span: Span, default: BaseTy) -> Option<ExprId> {
        let (declared, span) = if self.check(&Token::Colon) {
            self.advance();
            let ann_span = self.peek_span();
            let declared = self.parse_literal_ann()?;
            (declared, span.merge(ann_span))
        } else {
            (TypeAnn::Base(default), span)
        };
        Some(self.alloc(ExprKind::Num { value, declared }, span))
    }

    /// A literal annotation is a base kind or a type variable, never an arrow.
    fn parse_literal_ann(&mut self) -> Option<TypeAnn> {
        match self.peek() {
            Some(Token::UpperIdent(_)) => {
                let (tok, span) = self.advance();
                let Token::UpperIdent(name) = tok else { unreachable!() };
                match BaseTy::from_name(&name) {
                    Some(base) => Some(TypeAnn::Base(base)),
                    None => {
                        self.error(format!("unknown type name `{}`", name), span);
                        None
                    }
                }
            }
            Some(Token::Ident(_)) => {
                let (tok, _) = self.advance();
                let Token::Ident(name) = tok else { unreachable!() };
                Some(TypeAnn::Poly(name))
            }
            _ => {
                let span = self.peek_span();
                self.error(format!("expected type, found {:?}", self.peek()), span);
                None
            }
        }
    }

    fn parse_lambda(&mut self) -> Option<ExprId> {
        let (_, start) = self.advance(); // `\`
        let (param, param_span) = self.expect_ident()?;
        self.expect(&Token::Colon)?;
        let param_ann = self.parse_type()?;
        self.expect(&Token::Dot)?;
        let body = self.parse_expr()?;
        let span = start.merge(self.expr_span(body));
        Some(self.alloc(
            ExprKind::Abs {
                param,
                param_span,
                param_ann,
                body,
            },
            span,
        ))
    }

    // ── Types ─────────────────────────────────────────────────────

    /// `->` is right-associative: `I32 -> I64 -> F64` = `I32 -> (I64 -> F64)`.
    fn parse_type(&mut self) -> Option<TypeAnn> {
        let head = self.parse_type_head()?;
        if self.eat(&Token::Arrow) {
            let ret = self.parse_type()?;
            Some(TypeAnn::Fn(Box::new(head), Box::new(ret)))
        } else {
            Some(head)
        }
    }

    fn parse_type_head(&mut self) -> Option<TypeAnn> {
        match self.peek() {
            Some(Token::UpperIdent(_)) => {
                let (tok, span) = self.advance();
                let Token::UpperIdent(name) = tok else { unreachable!() };
                match BaseTy::from_name(&name) {
                    Some(base) => Some(TypeAnn::Base(base)),
                    None => {
                        self.error(format!("unknown type name `{}`", name), span);
                        None
                    }
                }
            }
            Some(Token::Ident(_)) => {
                let (tok, _) = self.advance();
                let Token::Ident(name) = tok else { unreachable!() };
                Some(TypeAnn::Poly(name))
            }
            Some(Token::LParen) => {
                self.advance();
                let inner = self.parse_type()?;
                self.expect(&Token::RParen)?;
                Some(inner)
            }
            _ => {
                let span = self.peek_span();
                self.error(format!("expected type, found {:?}", self.peek()), span);
                None
            }
        }
    }
}
