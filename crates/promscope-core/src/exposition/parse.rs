//! Text exposition reader.
//!
//! Accepts what `TextEncoder` writes: comment lines, `name{labels} value`
//! with an optional trailing timestamp, escaped label values, and the special
//! values `+Inf`, `-Inf`, `NaN`.

use crate::error::{MetricsError, Result};
use crate::labels::LabelSet;

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSample {
    pub name: String,
    pub labels: LabelSet,
    pub value: f64,
}

pub fn parse_text(input: &str) -> Result<Vec<ParsedSample>> {
    let mut out = Vec::new();
    for (i, raw) in input.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let sample = parse_line(line).map_err(|msg| MetricsError::Parse { line: i + 1, msg })?;
        out.push(sample);
    }
    Ok(out)
}

fn parse_line(line: &str) -> std::result::Result<ParsedSample, String> {
    let name_end = line
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == ':'))
        .unwrap_or(line.len());
    if name_end == 0 {
        return Err("missing metric name".into());
    }
    let name = &line[..name_end];
    let mut rest = &line[name_end..];

    let mut labels = LabelSet::new();
    if let Some(after) = rest.strip_prefix('{') {
        rest = parse_labels(after, &mut labels)?;
    }

    let mut fields = rest.split_whitespace();
    let value = fields.next().ok_or("missing value")?;
    let value = parse_value(value)?;
    if let Some(ts) = fields.next() {
        ts.parse::<i64>()
            .map_err(|_| format!("bad timestamp: {ts}"))?;
    }
    if fields.next().is_some() {
        return Err("trailing input".into());
    }

    Ok(ParsedSample {
        name: name.to_string(),
        labels,
        value,
    })
}

/// Parse `k="v",...}` and return what follows the closing brace.
fn parse_labels<'a>(
    mut s: &'a str,
    labels: &mut LabelSet,
) -> std::result::Result<&'a str, String> {
    loop {
        s = s.trim_start();
        if let Some(after) = s.strip_prefix('}') {
            return Ok(after);
        }

        let eq = s.find('=').ok_or("label without '='")?;
        let key = s[..eq].trim();
        if key.is_empty() {
            return Err("empty label name".into());
        }
        s = s[eq + 1..].trim_start();
        s = s.strip_prefix('"').ok_or("label value must be quoted")?;

        let mut value = String::new();
        let mut chars = s.char_indices();
        let end = loop {
            let (i, c) = chars.next().ok_or("unterminated label value")?;
            match c {
                '"' => break i,
                '\\' => match chars.next() {
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, '\\')) => value.push('\\'),
                    Some((_, '"')) => value.push('"'),
                    Some((_, other)) => return Err(format!("bad escape: \\{other}")),
                    None => return Err("unterminated escape".into()),
                },
                c => value.push(c),
            }
        };
        labels.insert(key, value);

        s = s[end + 1..].trim_start();
        if let Some(after) = s.strip_prefix(',') {
            s = after;
        } else if !s.starts_with('}') {
            return Err("expected ',' or '}' after label".into());
        }
    }
}

fn parse_value(s: &str) -> std::result::Result<f64, String> {
    match s {
        "+Inf" => Ok(f64::INFINITY),
        "-Inf" => Ok(f64::NEG_INFINITY),
        "NaN" => Ok(f64::NAN),
        _ => s.parse::<f64>().map_err(|_| format!("bad value: {s}")),
    }
}
