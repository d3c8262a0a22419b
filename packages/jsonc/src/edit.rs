use crate::error::{DocumentError, DocumentResult};

/// A single text splice: at `offset`, `removed` was replaced by `inserted`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub offset: usize,
    pub removed: String,
    pub inserted: String,
}

impl TextEdit {
    pub fn inverse(&self) -> TextEdit {
        TextEdit {
            offset: self.offset,
            removed: self.inserted.clone(),
            inserted: self.removed.clone(),
        }
    }

    /// Apply in place, failing if the text at `offset` is not `removed`
    pub fn apply(&self, text: &mut String) -> DocumentResult<()> {
        let end = self.offset + self.removed.len();
        match text.get(self.offset..end) {
            Some(current) if current == self.removed => {
                text.replace_range(self.offset..end, &self.inserted);
                Ok(())
            }
            _ => Err(DocumentError::StaleEdit {
                offset: self.offset,
            }),
        }
    }
}

/// Ordered edits recorded while a document was being patched.
///
/// Edits are sequential: each offset refers to the text produced by the
/// edits before it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditScript {
    edits: Vec<TextEdit>,
}

impl EditScript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, edit: TextEdit) {
        self.edits.push(edit);
    }

    pub fn edits(&self) -> &[TextEdit] {
        &self.edits
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Script that undoes this one
    pub fn inverse(&self) -> EditScript {
        EditScript {
            edits: self.edits.iter().rev().map(TextEdit::inverse).collect(),
        }
    }

    /// Apply every edit to a copy of `text`
    pub fn apply_to(&self, text: &str) -> DocumentResult<String> {
        let mut text = text.to_string();
        for edit in &self.edits {
            edit.apply(&mut text)?;
        }
        Ok(text)
    }
}

impl From<Vec<TextEdit>> for EditScript {
    fn from(edits: Vec<TextEdit>) -> Self {
        Self { edits }
    }
}
