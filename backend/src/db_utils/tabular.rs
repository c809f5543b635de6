//! Parser for the CSV bodies returned by the query service.

use std::collections::BTreeMap;

/// One result tuple: bound variable name to value.
pub type RawResultRow = BTreeMap<String, String>;

/// Turns a CSV body whose first record is the header into rows keyed by column name.
///
/// Records with a field count different from the header are dropped.
pub fn parse_tabular_response(text: &str) -> Vec<RawResultRow> {
    let mut records = split_records(text).into_iter();
    let Some(header) = records.next() else {
        return vec![];
    };
    let header = header.into_iter().map(|name| name.trim().to_string()).collect::<Vec<_>>();

    let mut rows = Vec::new();
    for (index, record) in records.enumerate() {
        if record.len() == 1 && record[0].is_empty() {
            continue;
        }
        if record.len() != header.len() {
            tracing::warn!(
                "Skipping result record {}: {} fields for {} columns",
                index + 1,
                record.len(),
                header.len()
            );
            continue;
        }
        rows.push(header.iter().cloned().zip(record).collect());
    }
    rows
}

/// Splits CSV text into records, honouring quoted fields and `""` escapes.
fn split_records(text: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    // set once the current record has any content, so a trailing newline does not add an empty record
    let mut record_started = false;

    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                other => field.push(other),
            }
            continue;
        }
        match c {
            '"' => {
                in_quotes = true;
                record_started = true;
            }
            ',' => {
                record.push(std::mem::take(&mut field));
                record_started = true;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' | '\r' => {
                if record_started || !field.is_empty() {
                    record.push(std::mem::take(&mut field));
                    records.push(std::mem::take(&mut record));
                } else {
                    records.push(vec![String::new()]);
                }
                record_started = false;
            }
            other => {
                field.push(other);
                record_started = true;
            }
        }
    }
    if record_started || !field.is_empty() {
        record.push(field);
        records.push(record);
    }
    records
}

/// Reads a single unsigned count out of a one-row result, e.g. `?count`.
pub fn parse_count(rows: &[RawResultRow], column: &str) -> Option<u64> {
    let value = rows.first()?.get(column)?;
    // typed literals may come back as "12"^^<xsd:integer>
    let digits = value.split("^^").next().unwrap_or(value).trim_matches('"').trim();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_header_and_rows() {
        let rows = parse_tabular_response("s,cp\nhttp://x/1,Caffeine Synthesis\nhttp://x/2,Aspirin Trial\n");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["s"], "http://x/1");
        assert_eq!(rows[1]["cp"], "Aspirin Trial");
    }

    #[test]
    fn handles_quotes_commas_and_crlf() {
        let body = "cn_list,sm\r\n\"methanol | methyl iodide\",\"C[O-].[Na+], \"\"quoted\"\"\"\r\n";
        let rows = parse_tabular_response(body);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["cn_list"], "methanol | methyl iodide");
        assert_eq!(rows[0]["sm"], "C[O-].[Na+], \"quoted\"");
    }

    #[test]
    fn keeps_empty_fields_and_skips_blank_lines() {
        let rows = parse_tabular_response("a,b\n,x\n\nonly\n1,2");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["a"], "");
        assert_eq!(rows[1]["b"], "2");
    }

    #[test]
    fn empty_body_has_no_rows() {
        assert!(parse_tabular_response("").is_empty());
        assert!(parse_tabular_response("count\n").is_empty());
    }

    #[test]
    fn reads_plain_and_typed_counts() {
        let rows = parse_tabular_response("count\n42\n");
        assert_eq!(parse_count(&rows, "count"), Some(42));
        let mut typed = RawResultRow::new();
        typed.insert("count".into(), "\"7\"^^<http://www.w3.org/2001/XMLSchema#integer>".into());
        assert_eq!(parse_count(&[typed], "count"), Some(7));
        assert_eq!(parse_count(&[], "count"), None);
    }
}
