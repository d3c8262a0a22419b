use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::ast::{Node, NodeKind, Span};
use crate::edit::{EditScript, TextEdit};
use crate::error::{DocumentError, DocumentResult};
use crate::format::Formatting;
use crate::parser::parse;
use crate::path::{JsonPath, PathSegment};

/// Options for [`JsoncDocument::mutate`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MutateOptions {
    /// Treat a final index as an insertion point instead of a slot to overwrite
    pub is_array_insertion: bool,
}

impl MutateOptions {
    pub fn insertion() -> Self {
        Self {
            is_array_insertion: true,
        }
    }
}

/// A JSON-with-comments document addressed by structural paths.
///
/// The text is the source of truth. The span tree is rebuilt after every
/// edit, so [`JsoncDocument::value`] always reflects the latest change.
#[derive(Debug, Clone)]
pub struct JsoncDocument {
    text: String,
    root: Node,
    formatting: Formatting,
    journal: Option<Vec<TextEdit>>,
}

/// Replacement of `start..end` in the text as it stands when the splice runs
#[derive(Debug)]
struct Splice {
    start: usize,
    end: usize,
    text: String,
}

impl Splice {
    fn insert(at: usize, text: impl Into<String>) -> Self {
        Self {
            start: at,
            end: at,
            text: text.into(),
        }
    }

    fn remove(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            text: String::new(),
        }
    }

    fn replace(span: Span, text: String) -> Self {
        Self {
            start: span.start,
            end: span.end,
            text,
        }
    }
}

/// Layout of one member or element inside its container
#[derive(Debug, Clone, Copy)]
struct Item {
    start: usize,
    value_end: usize,
    comma: Option<usize>,
}

impl Item {
    /// End of the item including its separator
    fn end(&self) -> usize {
        self.comma.map_or(self.value_end, |comma| comma + 1)
    }
}

fn items_of(node: &Node) -> Vec<Item> {
    match &node.kind {
        NodeKind::Object(members) => members
            .iter()
            .map(|m| Item {
                start: m.key_span.start,
                value_end: m.value.span.end,
                comma: m.comma,
            })
            .collect(),
        NodeKind::Array(elements) => elements
            .iter()
            .map(|e| Item {
                start: e.value.span.start,
                value_end: e.value.span.end,
                comma: e.comma,
            })
            .collect(),
        _ => Vec::new(),
    }
}

impl JsoncDocument {
    pub fn parse(text: impl Into<String>) -> DocumentResult<Self> {
        let text = text.into();
        let root = parse(&text)?;
        let formatting = Formatting::detect(&text);
        Ok(Self {
            text,
            root,
            formatting,
            journal: None,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn formatting(&self) -> &Formatting {
        &self.formatting
    }

    /// Override the detected indent unit used for newly written values
    pub fn set_indent_unit(&mut self, unit: impl Into<String>) {
        self.formatting.indent_unit = unit.into();
    }

    /// Deserialize the whole document into `T`
    pub fn value<T: DeserializeOwned>(&self) -> DocumentResult<T> {
        serde_json::from_value(self.root.to_value()).map_err(DocumentError::Deserialize)
    }

    pub fn json(&self) -> Value {
        self.root.to_value()
    }

    pub fn value_at(&self, path: &JsonPath) -> Option<Value> {
        self.root.resolve(path.segments()).map(Node::to_value)
    }

    /// Source location of the value at `path`
    pub fn span_of(&self, path: &JsonPath) -> Option<Span> {
        self.root.resolve(path.segments()).map(|node| node.span)
    }

    pub fn contains(&self, path: &JsonPath) -> bool {
        self.root.resolve(path.segments()).is_some()
    }

    /// Replace (or insert) the value at `path`.
    ///
    /// A missing final key is added as the last member of its object. A
    /// final index equal to the array length appends. With
    /// `is_array_insertion`, a final index `0..=len` inserts before that
    /// index instead of overwriting it. Every non-final segment must exist.
    pub fn mutate<T: Serialize + ?Sized>(
        &mut self,
        path: &JsonPath,
        value: &T,
        options: MutateOptions,
    ) -> DocumentResult<()> {
        let splices = self.plan_mutation(path, value, options)?;
        self.commit(splices)
    }

    /// Shorthand for `mutate` without insertion
    pub fn set<T: Serialize + ?Sized>(&mut self, path: &JsonPath, value: &T) -> DocumentResult<()> {
        self.mutate(path, value, MutateOptions::default())
    }

    /// Shorthand for `mutate` with array insertion
    pub fn insert<T: Serialize + ?Sized>(&mut self, path: &JsonPath, value: &T) -> DocumentResult<()> {
        self.mutate(path, value, MutateOptions::insertion())
    }

    /// Remove the member or element at `path`, closing the gap it leaves
    pub fn delete(&mut self, path: &JsonPath) -> DocumentResult<()> {
        let splices = self.plan_delete(path)?;
        self.commit(splices)
    }

    /// Replace the whole text, e.g. after the file changed on disk
    pub fn replace_text(&mut self, text: impl Into<String>) -> DocumentResult<()> {
        let splice = Splice::remove(0, self.text.len());
        let splice = Splice {
            text: text.into(),
            ..splice
        };
        self.commit(vec![splice])?;
        self.formatting = Formatting::detect(&self.text);
        Ok(())
    }

    /// Start collecting the text edits made by `mutate`/`delete`
    pub fn start_recording(&mut self) {
        if self.journal.is_none() {
            self.journal = Some(Vec::new());
        }
    }

    pub fn is_recording(&self) -> bool {
        self.journal.is_some()
    }

    /// Stop recording and return the edits made since `start_recording`
    pub fn finish_recording(&mut self) -> EditScript {
        EditScript::from(self.journal.take().unwrap_or_default())
    }

    /// Replay recorded edits
    pub fn apply_script(&mut self, script: &EditScript) -> DocumentResult<()> {
        let text = script.apply_to(&self.text)?;
        self.reset(text)
    }

    /// Undo recorded edits, restoring the exact text they replaced
    pub fn revert_script(&mut self, script: &EditScript) -> DocumentResult<()> {
        let text = script.inverse().apply_to(&self.text)?;
        self.reset(text)
    }

    fn reset(&mut self, text: String) -> DocumentResult<()> {
        self.root = parse(&text)?;
        self.text = text;
        Ok(())
    }

    fn commit(&mut self, splices: Vec<Splice>) -> DocumentResult<()> {
        let mut text = self.text.clone();
        let mut edits = Vec::with_capacity(splices.len());

        for splice in splices {
            let removed = text[splice.start..splice.end].to_string();
            text.replace_range(splice.start..splice.end, &splice.text);
            edits.push(TextEdit {
                offset: splice.start,
                removed,
                inserted: splice.text,
            });
        }

        self.reset(text)?;
        if let Some(journal) = &mut self.journal {
            journal.extend(edits);
        }
        Ok(())
    }

    fn plan_mutation<T: Serialize + ?Sized>(
        &self,
        path: &JsonPath,
        value: &T,
        options: MutateOptions,
    ) -> DocumentResult<Vec<Splice>> {
        let Some((last, parent_path)) = path.split_last() else {
            let rendered = self.render(value, self.line_indent(self.root.span.start))?;
            return Ok(vec![Splice::replace(self.root.span, rendered)]);
        };

        let parent = self
            .root
            .resolve(parent_path)
            .ok_or_else(|| DocumentError::path_not_found(path))?;
        let items = items_of(parent);

        match (&parent.kind, last) {
            (NodeKind::Object(_), PathSegment::Key(key)) => match parent.member(key) {
                Some((_, member)) => {
                    let rendered = self.render(value, self.line_indent(member.value.span.start))?;
                    Ok(vec![Splice::replace(member.value.span, rendered)])
                }
                None => self.plan_append(parent, &items, Some(key), value),
            },
            (NodeKind::Array(elements), PathSegment::Index(index)) => {
                let index = *index;
                let len = elements.len();
                if index == len {
                    self.plan_append(parent, &items, None, value)
                } else if index > len {
                    Err(DocumentError::path_not_found(path))
                } else if options.is_array_insertion {
                    self.plan_insert_before(items[index], value)
                } else {
                    let node = &elements[index].value;
                    let rendered = self.render(value, self.line_indent(node.span.start))?;
                    Ok(vec![Splice::replace(node.span, rendered)])
                }
            }
            _ => Err(DocumentError::path_not_found(path)),
        }
    }

    /// Add a new last member/element to `container`
    fn plan_append<T: Serialize + ?Sized>(
        &self,
        container: &Node,
        items: &[Item],
        key: Option<&str>,
        value: &T,
    ) -> DocumentResult<Vec<Splice>> {
        let newline = &self.formatting.newline;
        let open = container.span.start;

        let Some(last) = items.last() else {
            let base = self.line_indent(open).to_string();
            let child = format!("{base}{}", self.formatting.indent_unit);
            let entry = self.render_entry(key, value, &child)?;
            let inner = &self.text[open + 1..container.span.end - 1];
            let inserted = if inner.contains('\n') {
                format!("{newline}{child}{entry}")
            } else {
                format!("{newline}{child}{entry}{newline}{base}")
            };
            return Ok(vec![Splice::insert(open + 1, inserted)]);
        };

        if !self.starts_line(last.start) {
            // Single-line container: keep it on one line, after any block
            // comment trailing the old last value
            let entry = self.render_entry(key, value, self.line_indent(last.start))?;
            return Ok(match last.comma {
                Some(comma) => vec![Splice::insert(self.inline_comments_end(comma + 1), format!(" {entry},"))],
                None => vec![Splice::insert(self.inline_comments_end(last.value_end), format!(", {entry}"))],
            });
        }

        let child = self.line_indent(last.start).to_string();
        let entry = self.render_entry(key, value, &child)?;
        match last.comma {
            Some(comma) => {
                let at = self.trailing_trivia_end(comma + 1).unwrap_or(comma + 1);
                Ok(vec![Splice::insert(at, format!("{newline}{child}{entry},"))])
            }
            None => {
                // A comment after the old last value stays on its line
                let at = self
                    .trailing_trivia_end(last.value_end)
                    .unwrap_or(last.value_end);
                Ok(vec![
                    Splice::insert(last.value_end, ","),
                    Splice::insert(at + 1, format!("{newline}{child}{entry}")),
                ])
            }
        }
    }

    fn plan_insert_before<T: Serialize + ?Sized>(
        &self,
        target: Item,
        value: &T,
    ) -> DocumentResult<Vec<Splice>> {
        let indent = self.line_indent(target.start).to_string();
        let entry = self.render_entry(None, value, &indent)?;
        let inserted = if self.starts_line(target.start) {
            format!("{entry},{}{indent}", self.formatting.newline)
        } else {
            format!("{entry}, ")
        };
        Ok(vec![Splice::insert(target.start, inserted)])
    }

    fn plan_delete(&self, path: &JsonPath) -> DocumentResult<Vec<Splice>> {
        let Some((last, parent_path)) = path.split_last() else {
            return Err(DocumentError::invalid_path(path, "cannot delete the document root"));
        };

        let parent = self
            .root
            .resolve(parent_path)
            .ok_or_else(|| DocumentError::path_not_found(path))?;

        let index = match (&parent.kind, last) {
            (NodeKind::Object(_), PathSegment::Key(key)) => parent.member(key).map(|(i, _)| i),
            (NodeKind::Array(elements), PathSegment::Index(index)) if *index < elements.len() => {
                Some(*index)
            }
            _ => None,
        }
        .ok_or_else(|| DocumentError::path_not_found(path))?;

        let items = items_of(parent);
        let item = items[index];
        let own_line = self.starts_line(item.start);
        let start = if own_line {
            self.line_start(item.start)
        } else {
            item.start
        };

        // Not the last item: its own separator goes with it
        if index + 1 < items.len() {
            return Ok(vec![Splice::remove(start, self.consume_line(item.end()))]);
        }

        match index.checked_sub(1).map(|i| items[i]) {
            // Last item without a trailing comma: drop the previous separator
            Some(prev) if item.comma.is_none() => {
                let prev_comma = prev.comma.unwrap_or(prev.value_end);
                if own_line {
                    Ok(vec![
                        Splice::remove(start, self.consume_line(item.end())),
                        Splice::remove(prev_comma, prev_comma + 1),
                    ])
                } else {
                    Ok(vec![Splice::remove(prev_comma, item.end())])
                }
            }
            _ if own_line => Ok(vec![Splice::remove(start, self.consume_line(item.end()))]),
            _ => Ok(vec![Splice::remove(start, self.skip_spaces(item.end()))]),
        }
    }

    fn render<T: Serialize + ?Sized>(&self, value: &T, base_indent: &str) -> DocumentResult<String> {
        self.formatting
            .render(value, base_indent)
            .map_err(DocumentError::Serialize)
    }

    fn render_entry<T: Serialize + ?Sized>(
        &self,
        key: Option<&str>,
        value: &T,
        indent: &str,
    ) -> DocumentResult<String> {
        let rendered = self.render(value, indent)?;
        match key {
            Some(key) => {
                let key = serde_json::to_string(key).map_err(DocumentError::Serialize)?;
                Ok(format!("{key}: {rendered}"))
            }
            None => Ok(rendered),
        }
    }

    fn line_start(&self, pos: usize) -> usize {
        self.text[..pos].rfind('\n').map_or(0, |i| i + 1)
    }

    fn line_indent(&self, pos: usize) -> &str {
        let start = self.line_start(pos);
        let line = &self.text[start..];
        let trimmed = line.trim_start_matches([' ', '\t']);
        &line[..line.len() - trimmed.len()]
    }

    /// Whether only whitespace precedes `pos` on its line
    fn starts_line(&self, pos: usize) -> bool {
        self.text[self.line_start(pos)..pos].trim().is_empty()
    }

    fn skip_spaces(&self, pos: usize) -> usize {
        let rest = &self.text[pos..];
        pos + (rest.len() - rest.trim_start_matches([' ', '\t']).len())
    }

    /// End of the block comments that follow `pos` and close on the same
    /// line, or `pos` when there are none
    fn inline_comments_end(&self, pos: usize) -> usize {
        let mut end = pos;
        let mut cursor = self.skip_spaces(pos);
        while let Some(rest) = self.text[cursor..].strip_prefix("/*") {
            match rest.find("*/") {
                Some(close) if !rest[..close].contains('\n') => {
                    end = cursor + 2 + close + 2;
                    cursor = self.skip_spaces(end);
                }
                _ => break,
            }
        }
        end
    }

    /// If the rest of the line from `pos` is spaces, same-line block
    /// comments and an optional line comment, the offset of the line break
    /// (or end of text)
    fn trailing_trivia_end(&self, pos: usize) -> Option<usize> {
        let after_spaces = self.skip_spaces(self.inline_comments_end(pos));
        let rest = &self.text[after_spaces..];
        let end = if rest.starts_with("//") {
            after_spaces + rest.find('\n').unwrap_or(rest.len())
        } else if rest.is_empty() || rest.starts_with('\n') || rest.starts_with("\r\n") {
            after_spaces
        } else {
            return None;
        };
        if end > after_spaces && self.text[..end].ends_with('\r') {
            Some(end - 1)
        } else {
            Some(end)
        }
    }

    /// Offset just past the rest of the line when it is only trivia,
    /// otherwise past any spaces
    fn consume_line(&self, pos: usize) -> usize {
        match self.trailing_trivia_end(pos) {
            Some(end) if self.text[end..].starts_with("\r\n") => end + 2,
            Some(end) if self.text[end..].starts_with('\n') => end + 1,
            Some(end) => end,
            None => self.skip_spaces(pos),
        }
    }
}

impl fmt::Display for JsoncDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl FromStr for JsoncDocument {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
