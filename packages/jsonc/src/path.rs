use std::fmt;
use std::str::FromStr;

use crate::error::DocumentError;

/// One step of a structural path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        PathSegment::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

/// Structural address of a value, from the document root.
///
/// Paths are built right before an edit from the current shape of the
/// document, so they never go stale across earlier edits:
///
/// ```
/// use composer_jsonc::JsonPath;
///
/// let path = JsonPath::root().key("objects").index(2).key("transform");
/// assert_eq!(path.to_string(), "objects[2].transform");
/// assert_eq!("objects[2].transform".parse::<JsonPath>().unwrap(), path);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct JsonPath {
    segments: Vec<PathSegment>,
}

impl JsonPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.segments.push(PathSegment::Key(key.into()));
        self
    }

    pub fn index(mut self, index: usize) -> Self {
        self.segments.push(PathSegment::Index(index));
        self
    }

    pub fn push(&mut self, segment: impl Into<PathSegment>) {
        self.segments.push(segment.into());
    }

    /// Append all segments of `other`
    pub fn join(mut self, other: &JsonPath) -> Self {
        self.segments.extend(other.segments.iter().cloned());
        self
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Final segment and the path of its container
    pub fn split_last(&self) -> Option<(&PathSegment, &[PathSegment])> {
        self.segments.split_last()
    }

    pub fn last(&self) -> Option<&PathSegment> {
        self.segments.last()
    }

    /// Path of the container, or `None` at the root
    pub fn parent(&self) -> Option<JsonPath> {
        self.split_last().map(|(_, parent)| JsonPath {
            segments: parent.to_vec(),
        })
    }
}

impl FromIterator<PathSegment> for JsonPath {
    fn from_iter<I: IntoIterator<Item = PathSegment>>(iter: I) -> Self {
        Self {
            segments: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "<root>");
        }
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Key(key) if i == 0 => write!(f, "{key}")?,
                PathSegment::Key(key) => write!(f, ".{key}")?,
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

/// Parses `objects[0].transform.position` style paths. Empty input is the root.
impl FromStr for JsonPath {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut path = JsonPath::root();
        if s.is_empty() || s == "<root>" {
            return Ok(path);
        }

        for part in s.split('.') {
            let (key, mut rest) = match part.find('[') {
                Some(bracket) => (&part[..bracket], &part[bracket..]),
                None => (part, ""),
            };

            if key.is_empty() && rest.is_empty() {
                return Err(DocumentError::invalid_path(s, "empty segment"));
            }
            if !key.is_empty() {
                path.push(key);
            }

            while !rest.is_empty() {
                let close = rest
                    .find(']')
                    .ok_or_else(|| DocumentError::invalid_path(s, "unclosed '['"))?;
                let index = rest[1..close]
                    .parse::<usize>()
                    .map_err(|_| DocumentError::invalid_path(s, "index must be a non-negative integer"))?;
                path.push(index);
                rest = &rest[close + 1..];
                if !rest.is_empty() && !rest.starts_with('[') {
                    return Err(DocumentError::invalid_path(s, "unexpected text after ']'"));
                }
            }
        }

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_parse() {
        let path = JsonPath::root().key("objects").index(0).index(3).key("name");
        assert_eq!(path.to_string(), "objects[0][3].name");
        assert_eq!(path.to_string().parse::<JsonPath>().unwrap(), path);

        let leading_index: JsonPath = "[1].id".parse().unwrap();
        assert_eq!(leading_index, JsonPath::root().index(1).key("id"));
    }

    #[test]
    fn test_root() {
        assert!("".parse::<JsonPath>().unwrap().is_root());
        assert_eq!(JsonPath::root().to_string(), "<root>");
        assert_eq!(JsonPath::root().parent(), None);
    }

    #[test]
    fn test_invalid_paths() {
        assert!("objects[x]".parse::<JsonPath>().is_err());
        assert!("objects[0".parse::<JsonPath>().is_err());
        assert!("a..b".parse::<JsonPath>().is_err());
        assert!("objects[0]name".parse::<JsonPath>().is_err());
    }

    #[test]
    fn test_parent_and_join() {
        let path = JsonPath::root().key("objects").index(1);
        assert_eq!(path.parent(), Some(JsonPath::root().key("objects")));

        let joined = path.join(&JsonPath::root().key("children").index(0));
        assert_eq!(joined.to_string(), "objects[1].children[0]");
    }
}
