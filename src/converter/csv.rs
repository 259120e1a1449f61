//! Source CSV format: `network,asn,organization`.
//!
//! Fields may be double-quoted; a quote inside a quoted field is doubled.
//! A first line whose network column is not a CIDR is treated as a header.

use ipnet::IpNet;
use std::io::{BufRead, BufReader, Read, Write};

use crate::builder::SourceRecord;
use crate::error::{Error, Result};

/// Reader and writer for source CSV files.
pub struct CsvSource;

impl CsvSource {
    /// Parse records from a reader.
    pub fn parse<R: Read>(reader: R) -> Result<Vec<SourceRecord>> {
        let mut records = Vec::new();
        let mut first = true;

        for (index, line) in BufReader::new(reader).lines().enumerate() {
            let line = line?;
            let line_no = index + 1;
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }

            let fields = split_fields(line).map_err(|reason| Error::InvalidRecord {
                line: line_no,
                reason,
            })?;

            if first {
                first = false;
                let is_header = fields
                    .first()
                    .map(|f| f.trim().parse::<IpNet>().is_err())
                    .unwrap_or(true);
                if is_header {
                    continue;
                }
            }

            records.push(parse_record(&fields).map_err(|reason| Error::InvalidRecord {
                line: line_no,
                reason,
            })?);
        }

        Ok(records)
    }

    /// Write records without a header row.
    pub fn write<W: Write>(records: &[SourceRecord], mut writer: W) -> Result<()> {
        for record in records {
            writeln!(
                writer,
                "{},{},{}",
                record.network,
                record.asn,
                quote(&record.organization)
            )?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn parse_record(fields: &[String]) -> std::result::Result<SourceRecord, String> {
    if fields.len() != 3 {
        return Err(format!("expected 3 fields, got {}", fields.len()));
    }

    let network: IpNet = fields[0]
        .trim()
        .parse()
        .map_err(|_| format!("invalid network: {}", fields[0]))?;
    let asn = parse_asn(&fields[1]).ok_or_else(|| format!("invalid ASN: {}", fields[1]))?;

    Ok(SourceRecord::new(network, asn, fields[2].trim()))
}

/// Parse `4242420000` or `AS4242420000`.
pub fn parse_asn(s: &str) -> Option<u32> {
    let s = s.trim();
    let digits = match s.get(..2) {
        Some(prefix) if prefix.eq_ignore_ascii_case("AS") => &s[2..],
        _ => s,
    };
    digits.parse().ok()
}

fn split_fields(line: &str) -> std::result::Result<Vec<String>, String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut chars = line.chars().peekable();
    let mut quoted = false;

    while let Some(c) = chars.next() {
        match (quoted, c) {
            (true, '"') if chars.peek() == Some(&'"') => {
                chars.next();
                field.push('"');
            }
            (true, '"') => quoted = false,
            (false, '"') if field.is_empty() => quoted = true,
            (false, ',') => fields.push(std::mem::take(&mut field)),
            (_, c) => field.push(c),
        }
    }

    if quoted {
        return Err("unterminated quoted field".to_string());
    }
    fields.push(field);
    Ok(fields)
}

fn quote(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
