//! CSV codelist decoding
//!
//! Codelist files are semicolon-delimited with a header row. Lines starting
//! with `#` are comments and a single trailing semicolon per line is allowed.

use schemata_core::{Codelist, CodelistItem};

/// Normalize raw codelist text before decoding
pub fn clean_csv(contents: &str) -> String {
    let mut cleaned = String::with_capacity(contents.len());
    let mut previous_blank = false;

    for line in contents.lines() {
        if line.starts_with('#') {
            continue;
        }

        let line = line.strip_suffix(';').unwrap_or(line);
        let blank = line.trim().is_empty();
        if blank && previous_blank {
            continue;
        }
        previous_blank = blank;

        cleaned.push_str(line);
        cleaned.push('\n');
    }

    cleaned
}

/// Decode a codelist; every row maps header -> value as opaque strings
pub fn decode_codelist(name: &str, contents: &str) -> Result<Codelist, csv::Error> {
    let cleaned = clean_csv(contents);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .flexible(true)
        .from_reader(cleaned.as_bytes());

    let headers = reader.headers()?.clone();
    let mut items = Vec::new();

    for record in reader.records() {
        let record = record?;
        let item: CodelistItem = headers
            .iter()
            .zip(record.iter())
            .map(|(header, value)| (header.to_string(), value.to_string()))
            .collect();
        items.push(item);
    }

    Ok(Codelist::new(name, items))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn cleaning() {
        let raw = "# countries\ncode;label;\nNL;Netherlands;\n\n\n\nDE;Germany\n# trailing comment\n";
        assert_eq!(clean_csv(raw), "code;label\nNL;Netherlands\n\nDE;Germany\n");
    }

    #[test]
    fn decode_rows() {
        let raw = "# ISO codes\ncode;label;\nNL;Netherlands;\n\n\nDE;Germany;\n";
        let codelist = decode_codelist("countries", raw).unwrap();

        assert_eq!(codelist.name, "countries");
        assert_eq!(codelist.codes(), vec!["NL", "DE"]);
        assert_eq!(codelist.items[1].get("label").map(String::as_str), Some("Germany"));
    }

    #[test]
    fn extra_columns_are_kept() {
        let raw = "code;label;sort\n01;One;10\n";
        let codelist = decode_codelist("numbers", raw).unwrap();

        // Values stay opaque strings, leading zeros included
        assert_eq!(codelist.items[0].get("code").map(String::as_str), Some("01"));
        assert_eq!(codelist.items[0].get("sort").map(String::as_str), Some("10"));
    }

    #[test]
    fn header_only() {
        let codelist = decode_codelist("empty", "code;label\n").unwrap();
        assert!(codelist.items.is_empty());
    }
}
