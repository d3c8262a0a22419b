//! Lexer for JSONC documents using logos

use logos::Logos;

use crate::ast::Span;
use crate::error::{ParseError, ParseResult};

/// Token types for JSON with comments
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum Token<'src> {
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,

    // Literals (raw slices, quotes included; decoded by the parser)
    #[regex(r#""([^"\\]|\\.)*""#, |lex| lex.slice())]
    String(&'src str),

    #[regex(r"-?[0-9]+(\.[0-9]+)?([eE][+-]?[0-9]+)?", |lex| lex.slice())]
    Number(&'src str),

    // Punctuation
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,

    // Comments
    #[regex(r"//[^\n]*", |lex| lex.slice())]
    LineComment(&'src str),

    #[regex(r"/\*[^*]*\*+(?:[^/*][^*]*\*+)*/", |lex| lex.slice())]
    BlockComment(&'src str),
}

impl Token<'_> {
    pub fn is_comment(&self) -> bool {
        matches!(self, Token::LineComment(_) | Token::BlockComment(_))
    }

    /// Short human-readable name for error messages
    pub fn describe(&self) -> String {
        match self {
            Token::True => "'true'".to_string(),
            Token::False => "'false'".to_string(),
            Token::Null => "'null'".to_string(),
            Token::String(raw) => format!("string {raw}"),
            Token::Number(raw) => format!("number {raw}"),
            Token::LBrace => "'{'".to_string(),
            Token::RBrace => "'}'".to_string(),
            Token::LBracket => "'['".to_string(),
            Token::RBracket => "']'".to_string(),
            Token::Comma => "','".to_string(),
            Token::Colon => "':'".to_string(),
            Token::LineComment(_) | Token::BlockComment(_) => "comment".to_string(),
        }
    }
}

/// A token with its span
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpannedToken<'src> {
    pub token: Token<'src>,
    pub span: Span,
}

/// Lex source text into tokens with spans, comments included
pub fn lex(source: &str) -> impl Iterator<Item = ParseResult<SpannedToken<'_>>> + '_ {
    Token::lexer(source)
        .spanned()
        .map(|(result, span)| match result {
            Ok(token) => Ok(SpannedToken {
                token,
                span: Span::new(span.start, span.end),
            }),
            Err(_) => Err(ParseError::lexer_error(span.start)),
        })
}

/// Lex source text, dropping comments. Stops at the first lexer error.
pub fn tokenize(source: &str) -> ParseResult<Vec<SpannedToken<'_>>> {
    let mut tokens = Vec::new();
    for token in lex(source) {
        let token = token?;
        if !token.token.is_comment() {
            tokens.push(token);
        }
    }
    Ok(tokens)
}
