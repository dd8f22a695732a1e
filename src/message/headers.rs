//! Ordered header fields

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Header fields in the order they were received.
///
/// A name may appear more than once; every occurrence is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    fields: Vec<(String, String)>,
}

impl Headers {
    /// Unfold a raw header block into fields.
    ///
    /// Continuation lines are joined to the previous field with a single space.
    /// Lines that are neither a field nor a continuation are skipped.
    pub fn parse(block: &str) -> Self {
        let mut fields: Vec<(String, String)> = Vec::new();

        for line in block.lines() {
            if line.starts_with(' ') || line.starts_with('\t') {
                if let Some(last) = fields.last_mut() {
                    if !last.1.is_empty() {
                        last.1.push(' ');
                    }
                    last.1.push_str(line.trim());
                }
            } else if let Some((name, value)) = line.split_once(':') {
                if is_field_name(name) {
                    fields.push((name.to_owned(), value.trim().to_owned()));
                }
            }
        }

        Self { fields }
    }

    /// Append a field
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    /// First value for a name (case-insensitive)
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name).next()
    }

    /// Every value for a name, in received order
    pub fn get_all<'a, 'n>(
        &'a self,
        name: &'n str,
    ) -> impl Iterator<Item = &'a str> + use<'a, 'n> {
        self.fields
            .iter()
            .filter(move |(field, _)| field.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Check that a string is a valid RFC 5322 field name
fn is_field_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| (33..=126).contains(&b) && b != b':')
}

/// Serialized as `{ "name": ["value", ...] }` with lower-cased names in order
/// of first appearance.
impl Serialize for Headers {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut names: Vec<String> = Vec::new();
        for (name, _) in &self.fields {
            let lower = name.to_ascii_lowercase();
            if !names.contains(&lower) {
                names.push(lower);
            }
        }

        let mut map = serializer.serialize_map(Some(names.len()))?;
        for name in &names {
            let values: Vec<&str> = self.get_all(name).collect();
            map.serialize_entry(name, &values)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_preserves_order_and_repeats() {
        let headers = Headers::parse(
            "Received: from a\r\nSubject: Hi\r\nReceived: from b\r\nX-Tag: one\r\n",
        );

        let names: Vec<&str> = headers.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["Received", "Subject", "Received", "X-Tag"]);
        assert_eq!(
            headers.get_all("received").collect::<Vec<_>>(),
            vec!["from a", "from b"]
        );
        assert_eq!(headers.get("SUBJECT"), Some("Hi"));
    }

    #[test]
    fn test_values_outlive_lookup_name() {
        let headers = Headers::parse("Subject: Hi\r\nReceived: from a\r\n");

        let subject = {
            let name = String::from("subject");
            headers.get(&name)
        };
        let received: Vec<&str> = {
            let name = "RECEIVED".to_ascii_lowercase();
            headers.get_all(&name).collect()
        };

        assert_eq!(subject, Some("Hi"));
        assert_eq!(received, vec!["from a"]);
    }

    #[test]
    fn test_parse_unfolds_continuations() {
        let headers = Headers::parse("Subject: a very\r\n long\r\n\tsubject\r\nTo: b@y.com");

        assert_eq!(headers.get("subject"), Some("a very long subject"));
        assert_eq!(headers.get("to"), Some("b@y.com"));
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn test_parse_skips_garbage_lines() {
        let headers = Headers::parse("Subject: ok\r\nnot a header\r\nbad name: x\r\n");
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn test_is_field_name() {
        assert!(is_field_name("Subject"));
        assert!(is_field_name("X-Custom-1"));
        assert!(!is_field_name(""));
        assert!(!is_field_name("bad name"));
    }

    #[test]
    fn test_serialize_groups_by_lowercase_name() {
        let mut headers = Headers::default();
        headers.push("Received", "one");
        headers.push("Subject", "Hi");
        headers.push("received", "two");

        let json = serde_json::to_string(&headers).unwrap();
        assert_eq!(json, r#"{"received":["one","two"],"subject":["Hi"]}"#);
    }
}
