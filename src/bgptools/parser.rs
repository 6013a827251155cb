// Parsers for the three bgp.tools text formats

use serde::Deserialize;
use serde_json::Value;

use super::{AsnNames, RouteTable, WhoisRecord};

/// One line of table.jsonl. Other fields (Hits, ...) are ignored.
#[derive(Debug, Deserialize)]
struct TableLine {
    #[serde(rename = "CIDR")]
    cidr: Option<String>,
    #[serde(rename = "ASN")]
    asn: Option<Value>,
}

/// Result of parsing a table.jsonl document
#[derive(Debug, Default)]
pub struct TableParse {
    pub entries: RouteTable,
    /// Lines that produced an entry (duplicates included)
    pub parsed: usize,
    /// Non-empty lines that were dropped
    pub skipped: usize,
}

/// Parse newline-delimited JSON; bad lines are skipped, never fatal.
pub fn parse_route_table(text: &str) -> TableParse {
    let mut result = TableParse::default();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let row: TableLine = match serde_json::from_str(line) {
            Ok(row) => row,
            Err(e) => {
                tracing::trace!("Skipping malformed table line: {}", e);
                result.skipped += 1;
                continue;
            }
        };

        match (row.cidr, row.asn.as_ref().and_then(asn_from_json)) {
            (Some(cidr), Some(asn)) if !cidr.is_empty() => {
                // last one wins on duplicate prefixes
                result.entries.insert(cidr, asn);
                result.parsed += 1;
            }
            _ => result.skipped += 1,
        }
    }

    result
}

// The export uses numbers, but a quoted number is accepted too. ASN 0 is not
// a real origin and is dropped.
fn asn_from_json(value: &Value) -> Option<u32> {
    let asn = match value {
        Value::Number(n) => n.as_u64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    u32::try_from(asn).ok().filter(|asn| *asn != 0)
}

/// Parse asns.csv: a header row, then `AS<number>,<name>,<class>` rows.
pub fn parse_asn_names(text: &str) -> AsnNames {
    let mut names = AsnNames::new();

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    for record in reader.records() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                tracing::trace!("Skipping malformed CSV row: {}", e);
                continue;
            }
        };

        let (Some(asn_field), Some(name)) = (record.get(0), record.get(1)) else {
            continue;
        };

        let Some(asn) = asn_field
            .strip_prefix("AS")
            .and_then(|digits| digits.parse::<u32>().ok())
        else {
            continue;
        };

        names.insert(asn, name.trim_matches('"').to_string());
    }

    names
}

/// Parse verbose whois output. Only lines with at least seven `|` separated
/// fields and a numeric first field are records; everything else (header,
/// blank lines, errors) is skipped.
pub fn parse_whois_records(text: &str) -> Vec<WhoisRecord> {
    text.lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split('|').map(str::trim).collect();
            if fields.len() < 7 {
                return None;
            }
            let asn = fields[0].parse::<u32>().ok()?;
            Some(WhoisRecord {
                asn,
                country: fields[4].to_string(),
                name: fields[6].to_string(),
            })
        })
        .collect()
}
