//! JSON path reader
//!
//! Supports the subset rules use:
//!
//! ```text
//! $.instance.title                       member access
//! $.instance.editions[*]                 every array element
//! $.holdings[0].hrid                     one array element
//! $.instance.notes[?(@.staffOnly==false)].note
//! $.instance.identifiers[?(@.identifierTypeId=='abc')].value
//! ```
//!
//! Filters compare one member of each element against a string, boolean,
//! number or `null` literal with `==` or `!=`.

use crate::domain::BibExportError;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Comparison of a filter predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// `==`
    Equal,
    /// `!=`
    NotEqual,
}

/// One step of a path
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// `.name`
    Member(String),
    /// `[*]`
    Wildcard,
    /// `[n]`
    Index(usize),
    /// `[?(@.member==literal)]`
    Filter {
        /// Member of each element to compare
        member: String,
        /// Operator
        comparison: Comparison,
        /// Literal compared against
        expected: Value,
    },
}

impl Segment {
    /// Returns true for segments that can select more than one node
    pub fn is_multi(&self) -> bool {
        matches!(self, Segment::Wildcard | Segment::Filter { .. })
    }
}

/// Parsed path
#[derive(Debug, Clone, PartialEq)]
pub struct JsonPath {
    raw: String,
    segments: Vec<Segment>,
}

impl JsonPath {
    /// Parse a path; the leading `$` is optional
    ///
    /// # Errors
    ///
    /// Returns [`BibExportError::Rule`] describing the first malformed part.
    pub fn parse(raw: &str) -> Result<Self, BibExportError> {
        let raw = raw.trim();
        let normalized = match raw.strip_prefix('$') {
            Some(after_root) => after_root.to_string(),
            None if raw.starts_with(|c: char| c == '.' || c == '[') => raw.to_string(),
            None => format!(".{raw}"),
        };
        let mut rest = normalized.as_str();
        let mut segments = Vec::new();
        let invalid = |reason: &str| BibExportError::Rule(format!("Invalid path '{raw}': {reason}"));

        while !rest.is_empty() {
            if let Some(after_dot) = rest.strip_prefix('.') {
                let end = after_dot
                    .find(|c: char| c == '.' || c == '[')
                    .unwrap_or(after_dot.len());
                let name = &after_dot[..end];
                if name.is_empty() {
                    return Err(invalid("empty member name"));
                }
                segments.push(Segment::Member(name.to_string()));
                rest = &after_dot[end..];
            } else if let Some(after_bracket) = rest.strip_prefix('[') {
                let end = closing_bracket(after_bracket).ok_or_else(|| invalid("unclosed '['"))?;
                let inner = after_bracket[..end].trim();
                segments.push(parse_bracket(inner).ok_or_else(|| invalid(inner))?);
                rest = &after_bracket[end + 1..];
            } else {
                return Err(invalid("expected '.' or '['"));
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// Segments in order
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Returns true when the path can select several nodes
    pub fn is_multi(&self) -> bool {
        self.segments.iter().any(Segment::is_multi)
    }

    /// Split after the first multi-selecting segment
    ///
    /// `$.items[*].barcode` splits into `$.items[*]` and `$.barcode`.
    pub fn split_at_first_multi(&self) -> Option<(JsonPath, JsonPath)> {
        let index = self.segments.iter().position(Segment::is_multi)?;
        let (head, tail) = self.segments.split_at(index + 1);
        Some((Self::from_segments(head), Self::from_segments(tail)))
    }

    fn from_segments(segments: &[Segment]) -> Self {
        let mut raw = String::from("$");
        for segment in segments {
            raw.push_str(&segment.to_string());
        }
        Self {
            raw,
            segments: segments.to_vec(),
        }
    }

    /// Nodes selected from `root`, in document order
    pub fn select<'a>(&self, root: &'a Value) -> Vec<&'a Value> {
        let mut current = vec![root];
        for segment in &self.segments {
            let mut next = Vec::new();
            for node in current {
                match segment {
                    Segment::Member(name) => {
                        if let Some(child) = node.get(name.as_str()) {
                            next.push(child);
                        }
                    }
                    Segment::Wildcard => match node {
                        Value::Array(items) => next.extend(items.iter()),
                        Value::Object(map) => next.extend(map.values()),
                        _ => {}
                    },
                    Segment::Index(i) => {
                        if let Some(child) = node.as_array().and_then(|a| a.get(*i)) {
                            next.push(child);
                        }
                    }
                    Segment::Filter {
                        member,
                        comparison,
                        expected,
                    } => {
                        if let Value::Array(items) = node {
                            next.extend(items.iter().filter(|item| {
                                let actual = item.get(member.as_str()).unwrap_or(&Value::Null);
                                match comparison {
                                    Comparison::Equal => actual == expected,
                                    Comparison::NotEqual => actual != expected,
                                }
                            }));
                        }
                    }
                }
            }
            current = next;
            if current.is_empty() {
                break;
            }
        }
        current
    }
}

fn closing_bracket(s: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in s.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, ']') => return Some(i),
            _ => {}
        }
    }
    None
}

fn parse_bracket(inner: &str) -> Option<Segment> {
    if inner == "*" {
        return Some(Segment::Wildcard);
    }
    if let Ok(index) = inner.parse::<usize>() {
        return Some(Segment::Index(index));
    }
    let predicate = inner.strip_prefix("?(")?.strip_suffix(')')?.trim();
    let predicate = predicate.strip_prefix("@.")?;
    let (member, comparison, literal) = if let Some((m, l)) = predicate.split_once("==") {
        (m, Comparison::Equal, l)
    } else {
        let (m, l) = predicate.split_once("!=")?;
        (m, Comparison::NotEqual, l)
    };
    let member = member.trim();
    if member.is_empty() {
        return None;
    }
    Some(Segment::Filter {
        member: member.to_string(),
        comparison,
        expected: parse_literal(literal.trim())?,
    })
}

fn parse_literal(literal: &str) -> Option<Value> {
    for quote in ['\'', '"'] {
        if let Some(s) = literal
            .strip_prefix(quote)
            .and_then(|s| s.strip_suffix(quote))
        {
            return Some(Value::String(s.to_string()));
        }
    }
    match literal {
        "true" => Some(Value::Bool(true)),
        "false" => Some(Value::Bool(false)),
        "null" => Some(Value::Null),
        _ => serde_json::from_str::<serde_json::Number>(literal)
            .ok()
            .map(Value::Number),
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Member(name) => write!(f, ".{name}"),
            Segment::Wildcard => write!(f, "[*]"),
            Segment::Index(i) => write!(f, "[{i}]"),
            Segment::Filter {
                member,
                comparison,
                expected,
            } => {
                let op = match comparison {
                    Comparison::Equal => "==",
                    Comparison::NotEqual => "!=",
                };
                match expected {
                    Value::String(s) => write!(f, "[?(@.{member}{op}'{s}')]"),
                    other => write!(f, "[?(@.{member}{op}{other})]"),
                }
            }
        }
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for JsonPath {
    type Err = BibExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> Value {
        json!({
            "instance": {
                "title": "Moby Dick",
                "editions": ["1st", "2nd"],
                "identifiers": [
                    {"identifierTypeId": "isbn", "value": "978-0"},
                    {"identifierTypeId": "issn", "value": "1234-5678"},
                    {"identifierTypeId": "isbn", "value": "978-1"}
                ],
                "contributors": [
                    {"name": "Melville, Herman", "primary": true},
                    {"name": "Kent, Rockwell", "primary": false}
                ]
            },
            "holdings": [{"hrid": "ho1"}, {"hrid": "ho2"}]
        })
    }

    fn strings(path: &str) -> Vec<String> {
        let record = record();
        JsonPath::parse(path)
            .unwrap()
            .select(&record)
            .into_iter()
            .map(|v| v.as_str().unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn test_member_access() {
        assert_eq!(strings("$.instance.title"), vec!["Moby Dick"]);
        assert_eq!(strings("instance.title"), vec!["Moby Dick"]);
        assert!(strings("$.instance.subtitle").is_empty());
    }

    #[test]
    fn test_wildcard_and_index() {
        assert_eq!(strings("$.instance.editions[*]"), vec!["1st", "2nd"]);
        assert_eq!(strings("$.holdings[1].hrid"), vec!["ho2"]);
        assert!(strings("$.holdings[5].hrid").is_empty());
    }

    #[test]
    fn test_filters() {
        assert_eq!(
            strings("$.instance.identifiers[?(@.identifierTypeId=='isbn')].value"),
            vec!["978-0", "978-1"]
        );
        assert_eq!(
            strings("$.instance.contributors[?(@.primary==true)].name"),
            vec!["Melville, Herman"]
        );
        assert_eq!(
            strings("$.instance.identifiers[?(@.identifierTypeId != \"isbn\")].value"),
            vec!["1234-5678"]
        );
    }

    #[test]
    fn test_filter_literal_with_bracket() {
        let record = json!({"a": [{"k": "x]y", "v": "hit"}]});
        let path = JsonPath::parse("$.a[?(@.k=='x]y')].v").unwrap();
        assert_eq!(path.select(&record), vec![&json!("hit")]);
    }

    #[test]
    fn test_split_at_first_multi() {
        let path = JsonPath::parse("$.items[*].barcode").unwrap();
        assert!(path.is_multi());
        let (head, tail) = path.split_at_first_multi().unwrap();
        assert_eq!(head.to_string(), "$.items[*]");
        assert_eq!(tail.to_string(), "$.barcode");

        let single = JsonPath::parse("$.holdings[0].hrid").unwrap();
        assert!(!single.is_multi());
        assert!(single.split_at_first_multi().is_none());
    }

    #[test]
    fn test_invalid_paths() {
        assert!(JsonPath::parse("$.a[").is_err());
        assert!(JsonPath::parse("$..a").is_err());
        assert!(JsonPath::parse("$.a[?(@.b~'x')]").is_err());
        assert!(JsonPath::parse("$.a[foo]").is_err());
    }

    #[test]
    fn test_root_path_selects_record() {
        let record = record();
        let path = JsonPath::parse("$").unwrap();
        assert_eq!(path.select(&record).len(), 1);
    }
}
