use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

/// Whitespace conventions of a source document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formatting {
    pub indent_unit: String,
    pub newline: String,
}

impl Default for Formatting {
    fn default() -> Self {
        Self {
            indent_unit: "  ".to_string(),
            newline: "\n".to_string(),
        }
    }
}

impl Formatting {
    /// Detect the indent unit (tab or smallest space run) and line ending
    pub fn detect(source: &str) -> Self {
        let newline = if source.contains("\r\n") { "\r\n" } else { "\n" };
        let mut unit: Option<String> = None;

        for line in source.lines() {
            let trimmed = line.trim_start_matches([' ', '\t']);
            // Skip blank lines, unindented lines and block comment bodies
            if trimmed.is_empty() || trimmed.len() == line.len() || trimmed.starts_with('*') {
                continue;
            }
            let lead = &line[..line.len() - trimmed.len()];
            if lead.starts_with('\t') {
                unit = Some("\t".to_string());
                break;
            }
            let width = lead.len();
            unit = match unit {
                Some(current) if current.len() <= width => Some(current),
                _ => Some(" ".repeat(width)),
            };
        }

        Self {
            indent_unit: unit.unwrap_or_else(|| Self::default().indent_unit),
            newline: newline.to_string(),
        }
    }

    /// Pretty-print `value` so that it can be spliced at a site indented by `base_indent`
    pub fn render<T: Serialize + ?Sized>(
        &self,
        value: &T,
        base_indent: &str,
    ) -> Result<String, serde_json::Error> {
        let mut buf = Vec::new();
        let formatter = PrettyFormatter::with_indent(self.indent_unit.as_bytes());
        let mut serializer = Serializer::with_formatter(&mut buf, formatter);
        value.serialize(&mut serializer)?;

        // serde_json only emits valid UTF-8
        let raw = String::from_utf8_lossy(&buf);
        let line_break = format!("{}{}", self.newline, base_indent);
        Ok(raw.replace('\n', &line_break))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_detect_spaces_and_tabs() {
        let two = Formatting::detect("{\n  \"a\": {\n    \"b\": 1\n  }\n}");
        assert_eq!(two.indent_unit, "  ");
        assert_eq!(two.newline, "\n");

        let four = Formatting::detect("{\r\n    \"a\": 1\r\n}");
        assert_eq!(four.indent_unit, "    ");
        assert_eq!(four.newline, "\r\n");

        let tabs = Formatting::detect("{\n\t\"a\": 1\n}");
        assert_eq!(tabs.indent_unit, "\t");

        assert_eq!(Formatting::detect("{}"), Formatting::default());
    }

    #[test]
    fn test_render_reindents() {
        let formatting = Formatting::default();
        let rendered = formatting.render(&json!({ "x": 1 }), "    ").unwrap();
        assert_eq!(rendered, "{\n      \"x\": 1\n    }");

        assert_eq!(formatting.render(&json!(3), "  ").unwrap(), "3");
        assert_eq!(formatting.render(&json!([]), "  ").unwrap(), "[]");
    }
}
