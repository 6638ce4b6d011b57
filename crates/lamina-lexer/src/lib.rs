use logos::Logos;
use smol_str::SmolStr;

/// Source span as byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
#[logos(skip r"--[^\n]*")]
pub enum Token {
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("\\")]
    Backslash,
    #[token(".")]
    Dot,
    #[token(":")]
    Colon,
    #[token(";")]
    Semi,
    #[token("=")]
    Equals,
    #[token("->")]
    Arrow,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,

    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?", priority = 3, callback = |lex| lex.slice().parse::<f64>().ok())]
    Float(f64),

    #[regex(r"[0-9]+", priority = 2, callback = |lex| lex.slice().parse::<i64>().ok())]
    Int(i64),

    /// Base type name: `I32`, `F64`
    #[regex(r"[A-Z][a-zA-Z0-9_]*", callback = |lex| SmolStr::new(lex.slice()))]
    UpperIdent(SmolStr),

    /// Binding, parameter, and type variable names: `main`, `addOne`, `a`
    #[regex(r"[a-z_][a-zA-Z0-9_]*", callback = |lex| SmolStr::new(lex.slice()))]
    Ident(SmolStr),
}

/// Lex source code into a list of (token, span) pairs.
pub fn lex(source: &str) -> (Vec<(Token, Span)>, Vec<Span>) {
    let mut tokens = Vec::new();
    let mut errors = Vec::new();
    let mut lexer = Token::lexer(source);

    while let Some(result) = lexer.next() {
        let range = lexer.span();
        let span = Span::new(range.start as u32, range.end as u32);
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(_) => errors.push(span),
        }
    }

    (tokens, errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_tokens(source: &str) -> Vec<Token> {
        let (tokens, errors) = lex(source);
        assert!(errors.is_empty(), "lex errors at {:?}", errors);
        tokens.into_iter().map(|(t, _)| t).collect()
    }

    #[test]
    fn binding_tokens() {
        let tokens = lex_tokens("main = 2 + 3;");
        assert_eq!(
            tokens,
            vec![
                Token::Ident(SmolStr::new("main")),
                Token::Equals,
                Token::Int(2),
                Token::Plus,
                Token::Int(3),
                Token::Semi,
            ]
        );
    }

    #[test]
    fn lambda_tokens() {
        let tokens = lex_tokens(r"\x:I32. x");
        assert_eq!(
            tokens,
            vec![
                Token::Backslash,
                Token::Ident(SmolStr::new("x")),
                Token::Colon,
                Token::UpperIdent(SmolStr::new("I32")),
                Token::Dot,
                Token::Ident(SmolStr::new("x")),
            ]
        );
    }

    #[test]
    fn arrow_is_not_minus() {
        let tokens = lex_tokens("I32 -> I64");
        assert_eq!(tokens[1], Token::Arrow);
    }

    #[test]
    fn annotated_literal() {
        let tokens = lex_tokens("41:I64");
        assert_eq!(
            tokens,
            vec![
                Token::Int(41),
                Token::Colon,
                Token::UpperIdent(SmolStr::new("I64")),
            ]
        );
    }

    #[test]
    fn float_literal() {
        let tokens = lex_tokens("2.5");
        assert_eq!(tokens, vec![Token::Float(2.5)]);
    }

    #[test]
    fn comments_are_skipped() {
        let tokens = lex_tokens("x -- the variable\n= 1");
        assert_eq!(tokens.len(), 3);
    }

    #[test]
    fn unexpected_character_is_reported() {
        let (_, errors) = lex("main = 2 @ 3");
        assert_eq!(errors.len(), 1);
    }
}
