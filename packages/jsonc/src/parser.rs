use serde_json::Number;

use crate::ast::*;
use crate::error::{ParseError, ParseResult};
use crate::lexer::{tokenize, SpannedToken, Token};

/// Deepest object/array nesting accepted before parsing gives up
pub const MAX_DEPTH: usize = 128;

/// Recursive-descent parser producing a span tree.
///
/// Accepts JSON plus line/block comments and trailing commas.
pub struct Parser<'src> {
    tokens: Vec<SpannedToken<'src>>,
    pos: usize,
    source_len: usize,
    depth: usize,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> ParseResult<Self> {
        Ok(Self {
            tokens: tokenize(source)?,
            pos: 0,
            source_len: source.len(),
            depth: 0,
        })
    }

    /// Parse a complete document: exactly one value
    pub fn parse_document(&mut self) -> ParseResult<Node> {
        let value = self.parse_value()?;
        if let Some(token) = self.peek() {
            return Err(ParseError::unexpected_token(
                token.span.start,
                "end of document",
                token.token.describe(),
            ));
        }
        Ok(value)
    }

    fn parse_value(&mut self) -> ParseResult<Node> {
        let token = self.advance()?;
        let span = token.span;
        match token.token {
            Token::LBrace => {
                self.enter(span.start)?;
                let object = self.parse_object(span.start);
                self.depth -= 1;
                object
            }
            Token::LBracket => {
                self.enter(span.start)?;
                let array = self.parse_array(span.start);
                self.depth -= 1;
                array
            }
            Token::String(raw) => Ok(Node::new(span, NodeKind::String(decode_string(raw, span)?))),
            Token::Number(raw) => {
                let number: Number = serde_json::from_str(raw)
                    .map_err(|err| ParseError::invalid_syntax(span.start, err.to_string()))?;
                Ok(Node::new(span, NodeKind::Number(number)))
            }
            Token::True => Ok(Node::new(span, NodeKind::Bool(true))),
            Token::False => Ok(Node::new(span, NodeKind::Bool(false))),
            Token::Null => Ok(Node::new(span, NodeKind::Null)),
            other => Err(ParseError::unexpected_token(span.start, "a value", other.describe())),
        }
    }

    /// Parse object members after the opening brace
    fn parse_object(&mut self, start: usize) -> ParseResult<Node> {
        let mut members = Vec::new();

        loop {
            let token = self.advance()?;
            let (key, key_span) = match token.token {
                Token::RBrace => {
                    return Ok(Node::new(Span::new(start, token.span.end), NodeKind::Object(members)))
                }
                Token::String(raw) => (decode_string(raw, token.span)?, token.span),
                other => {
                    return Err(ParseError::unexpected_token(
                        token.span.start,
                        "a string key or '}'",
                        other.describe(),
                    ))
                }
            };

            self.expect(Token::Colon, "':'")?;
            let value = self.parse_value()?;
            let comma = self.match_comma();

            members.push(Member {
                key,
                key_span,
                value,
                comma,
            });

            if comma.is_none() {
                let end = self.expect(Token::RBrace, "',' or '}'")?;
                return Ok(Node::new(Span::new(start, end), NodeKind::Object(members)));
            }
        }
    }

    /// Parse array elements after the opening bracket
    fn parse_array(&mut self, start: usize) -> ParseResult<Node> {
        let mut elements = Vec::new();

        loop {
            if let Some(token) = self.peek() {
                if token.token == Token::RBracket {
                    let end = token.span.end;
                    self.pos += 1;
                    return Ok(Node::new(Span::new(start, end), NodeKind::Array(elements)));
                }
            }

            let value = self.parse_value()?;
            let comma = self.match_comma();
            elements.push(Element { value, comma });

            if comma.is_none() {
                let end = self.expect(Token::RBracket, "',' or ']'")?;
                return Ok(Node::new(Span::new(start, end), NodeKind::Array(elements)));
            }
        }
    }

    fn enter(&mut self, pos: usize) -> ParseResult<()> {
        if self.depth == MAX_DEPTH {
            return Err(ParseError::too_deep(pos, MAX_DEPTH));
        }
        self.depth += 1;
        Ok(())
    }

    fn peek(&self) -> Option<&SpannedToken<'src>> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> ParseResult<SpannedToken<'src>> {
        let token = self
            .tokens
            .get(self.pos)
            .copied()
            .ok_or(ParseError::unexpected_eof(self.source_len))?;
        self.pos += 1;
        Ok(token)
    }

    /// Consume `expected` and return the end offset of the token
    fn expect(&mut self, expected: Token<'static>, description: &str) -> ParseResult<usize> {
        let token = self.advance()?;
        if token.token == expected {
            Ok(token.span.end)
        } else {
            Err(ParseError::unexpected_token(
                token.span.start,
                description,
                token.token.describe(),
            ))
        }
    }

    fn match_comma(&mut self) -> Option<usize> {
        match self.peek() {
            Some(token) if token.token == Token::Comma => {
                let offset = token.span.start;
                self.pos += 1;
                Some(offset)
            }
            _ => None,
        }
    }
}

fn decode_string(raw: &str, span: Span) -> ParseResult<String> {
    serde_json::from_str(raw).map_err(|err| ParseError::invalid_syntax(span.start, err.to_string()))
}

/// Parse JSONC source into a span tree
pub fn parse(source: &str) -> ParseResult<Node> {
    Parser::new(source)?.parse_document()
}
