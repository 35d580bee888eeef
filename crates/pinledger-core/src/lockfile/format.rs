//! Byte-exact JSON layout of `Package.resolved` files.
//!
//! The host toolchain writes two-space indented JSON with keys sorted, but
//! its key/value separator changed between generations: generation 1 uses
//! `": "`, later generations use `" : "`. Later generations also write
//! empty arrays and objects over two lines (`[\n\n  ]`). Downstream tooling
//! diffs these files, so both quirks are reproduced exactly.

use std::io;

use serde::Serialize;
use serde_json::Value;
use serde_json::ser::{Formatter, Serializer};

const INDENT: &[u8] = b"  ";

/// Key/value separator used by a lock-file generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySeparator {
    /// `"key": value` (generation 1).
    Tight,
    /// `"key" : value` (generations 2 and 3).
    Spaced,
}

impl KeySeparator {
    fn as_bytes(self) -> &'static [u8] {
        match self {
            Self::Tight => b": ",
            Self::Spaced => b" : ",
        }
    }

    fn splits_empty_containers(self) -> bool {
        self == Self::Spaced
    }
}

/// Top-level entries written in the given order; nested maps stay sorted.
#[derive(Debug, Clone, Default)]
pub(crate) struct OrderedDocument(pub(crate) Vec<(String, Value)>);

impl OrderedDocument {
    /// Entries of a JSON object, in key order.
    pub(crate) fn sorted(document: Value) -> Self {
        match document {
            Value::Object(map) => Self(map.into_iter().collect()),
            _ => Self::default(),
        }
    }
}

impl Serialize for OrderedDocument {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_map(self.0.iter().map(|(k, v)| (k, v)))
    }
}

/// Pretty formatter with a configurable key/value separator.
///
/// Mirrors `serde_json::ser::PrettyFormatter`, which hard-codes `": "`.
#[derive(Debug)]
struct ResolvedFormatter {
    current_indent: usize,
    has_value: bool,
    separator: KeySeparator,
}

impl ResolvedFormatter {
    fn new(separator: KeySeparator) -> Self {
        Self {
            current_indent: 0,
            has_value: false,
            separator,
        }
    }

    fn close<W>(&mut self, writer: &mut W, bracket: &[u8]) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.current_indent -= 1;
        if self.has_value {
            writer.write_all(b"\n")?;
            indent(writer, self.current_indent)?;
        } else if self.separator.splits_empty_containers() {
            writer.write_all(b"\n\n")?;
            indent(writer, self.current_indent)?;
        }
        writer.write_all(bracket)
    }
}

fn indent<W>(writer: &mut W, n: usize) -> io::Result<()>
where
    W: ?Sized + io::Write,
{
    for _ in 0..n {
        writer.write_all(INDENT)?;
    }
    Ok(())
}

impl Formatter for ResolvedFormatter {
    fn begin_array<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.current_indent += 1;
        self.has_value = false;
        writer.write_all(b"[")
    }

    fn end_array<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.close(writer, b"]")
    }

    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(if first { b"\n" } else { b",\n" })?;
        indent(writer, self.current_indent)
    }

    fn end_array_value<W>(&mut self, _writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.has_value = true;
        Ok(())
    }

    fn begin_object<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.current_indent += 1;
        self.has_value = false;
        writer.write_all(b"{")
    }

    fn end_object<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.close(writer, b"}")
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(if first { b"\n" } else { b",\n" })?;
        indent(writer, self.current_indent)
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(self.separator.as_bytes())
    }

    fn end_object_value<W>(&mut self, _writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.has_value = true;
        Ok(())
    }
}

/// Render `document` in lock-file layout, with a trailing newline.
///
/// Nested keys come out sorted because `serde_json::Map` is ordered by key
/// unless the `preserve_order` feature is enabled, which this workspace
/// never does.
pub(crate) fn render<T>(document: &T, separator: KeySeparator) -> Result<Vec<u8>, serde_json::Error>
where
    T: Serialize + ?Sized,
{
    let mut buf = Vec::with_capacity(1024);
    let mut ser = Serializer::with_formatter(&mut buf, ResolvedFormatter::new(separator));
    document.serialize(&mut ser)?;
    buf.push(b'\n');
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tight_matches_pretty_formatter() {
        let doc = json!({"b": [1, {"x": null}], "a": {"c": "d"}, "e": [], "f": {}});
        let ours = render(&doc, KeySeparator::Tight).unwrap();
        let mut theirs = serde_json::to_vec_pretty(&doc).unwrap();
        theirs.push(b'\n');
        assert_eq!(String::from_utf8(ours).unwrap(), String::from_utf8(theirs).unwrap());
    }

    #[test]
    fn test_spaced_separator() {
        let doc = json!({"pins": [{"identity": "a"}], "version": 2});
        let out = String::from_utf8(render(&doc, KeySeparator::Spaced).unwrap()).unwrap();
        let expected = "{\n  \"pins\" : [\n    {\n      \"identity\" : \"a\"\n    }\n  ],\n  \"version\" : 2\n}\n";
        assert_eq!(out, expected);
    }

    #[test]
    fn test_spaced_splits_empty_containers() {
        let doc = json!({"pins": [], "state": {}, "version": 2});
        let out = String::from_utf8(render(&doc, KeySeparator::Spaced).unwrap()).unwrap();
        assert_eq!(
            out,
            "{\n  \"pins\" : [\n\n  ],\n  \"state\" : {\n\n  },\n  \"version\" : 2\n}\n"
        );
    }

    #[test]
    fn test_ordered_document_keeps_top_level_order() {
        let doc = OrderedDocument(vec![
            ("version".to_string(), json!(3)),
            ("originHash".to_string(), json!("abc")),
            ("extra".to_string(), json!({"b": 1, "a": 2})),
        ]);
        let out = String::from_utf8(render(&doc, KeySeparator::Spaced).unwrap()).unwrap();
        let expected = "{\n  \"version\" : 3,\n  \"originHash\" : \"abc\",\n  \"extra\" : {\n    \"a\" : 2,\n    \"b\" : 1\n  }\n}\n";
        assert_eq!(out, expected);
    }

    #[test]
    fn test_keys_are_sorted() {
        let doc = json!({"version": 3, "pins": [], "originHash": "abc"});
        let out = String::from_utf8(render(&doc, KeySeparator::Spaced).unwrap()).unwrap();
        let origin = out.find("originHash").unwrap();
        let pins = out.find("pins").unwrap();
        let version = out.find("version").unwrap();
        assert!(origin < pins && pins < version);
    }
}
