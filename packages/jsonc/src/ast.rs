use serde_json::{Map, Number, Value};

use crate::path::PathSegment;

/// Byte range of a node in the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// A parsed value together with the text it came from
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub span: Span,
    pub kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Object(Vec<Member>),
    Array(Vec<Element>),
    String(String),
    Number(Number),
    Bool(bool),
    Null,
}

/// Object member: `"key": value` plus the separator that follows it
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub key: String,
    pub key_span: Span,
    pub value: Node,
    /// Offset of the comma after the value, if any
    pub comma: Option<usize>,
}

/// Array element plus the separator that follows it
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub value: Node,
    pub comma: Option<usize>,
}

impl Node {
    pub fn new(span: Span, kind: NodeKind) -> Self {
        Self { span, kind }
    }

    /// Member lookup. With duplicate keys the last one wins, as in `to_value`.
    pub fn member(&self, key: &str) -> Option<(usize, &Member)> {
        match &self.kind {
            NodeKind::Object(members) => members
                .iter()
                .enumerate()
                .rev()
                .find(|(_, member)| member.key == key),
            _ => None,
        }
    }

    pub fn get(&self, segment: &PathSegment) -> Option<&Node> {
        match (&self.kind, segment) {
            (NodeKind::Object(_), PathSegment::Key(key)) => {
                self.member(key).map(|(_, member)| &member.value)
            }
            (NodeKind::Array(elements), PathSegment::Index(index)) => {
                elements.get(*index).map(|element| &element.value)
            }
            _ => None,
        }
    }

    pub fn resolve(&self, segments: &[PathSegment]) -> Option<&Node> {
        segments
            .iter()
            .try_fold(self, |node, segment| node.get(segment))
    }

    /// Number of members or elements; zero for scalars
    pub fn len(&self) -> usize {
        match &self.kind {
            NodeKind::Object(members) => members.len(),
            NodeKind::Array(elements) => elements.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_value(&self) -> Value {
        match &self.kind {
            NodeKind::Object(members) => {
                let mut map = Map::new();
                for member in members {
                    map.insert(member.key.clone(), member.value.to_value());
                }
                Value::Object(map)
            }
            NodeKind::Array(elements) => {
                Value::Array(elements.iter().map(|e| e.value.to_value()).collect())
            }
            NodeKind::String(s) => Value::String(s.clone()),
            NodeKind::Number(n) => Value::Number(n.clone()),
            NodeKind::Bool(b) => Value::Bool(*b),
            NodeKind::Null => Value::Null,
        }
    }
}
