use std::io;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::ser::{Formatter, PrettyFormatter, Serializer};

use crate::psdle::Document;

/// Single-line JSON with a space after every `,` and `:`.
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}

/// Renders the document, pretty-printed with `indent` spaces per level
/// when given, on one line otherwise. Non-ASCII text is kept as is.
pub fn render(document: &Document, indent: Option<usize>) -> Result<String> {
    let mut buf = Vec::new();

    let written = match indent {
        Some(width) => {
            let spaces = vec![b' '; width];
            let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(&spaces));
            document.serialize(&mut ser)
        }
        None => {
            let mut ser = Serializer::with_formatter(&mut buf, SpacedFormatter);
            document.serialize(&mut ser)
        }
    };
    written.context("Failed to serialize JSON")?;

    String::from_utf8(buf).context("Serialized JSON is not valid UTF-8")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc() -> Document {
        serde_json::from_value(json!({
            "items": [{"name": "Café ☺", "date": "2019-06-01T00:00:00+0000"}],
            "empty": []
        }))
        .unwrap()
    }

    #[test]
    fn compact_is_one_spaced_line() {
        assert_eq!(
            render(&doc(), None).unwrap(),
            r#"{"items": [{"name": "Café ☺", "date": "2019-06-01T00:00:00+0000"}], "empty": []}"#
        );
    }

    #[test]
    fn pretty_uses_requested_width() {
        let expected = "{\n  \"items\": [\n    {\n      \"name\": \"Café ☺\",\n      \"date\": \"2019-06-01T00:00:00+0000\"\n    }\n  ],\n  \"empty\": []\n}";
        assert_eq!(render(&doc(), Some(2)).unwrap(), expected);
    }

    #[test]
    fn zero_width_breaks_lines_without_indenting() {
        let expected = "{\n\"items\": [\n{\n\"name\": \"Café ☺\",\n\"date\": \"2019-06-01T00:00:00+0000\"\n}\n],\n\"empty\": []\n}";
        assert_eq!(render(&doc(), Some(0)).unwrap(), expected);
    }
}
