//! Text exposition encoder.

use std::fmt::Write;

use bytes::Bytes;

use crate::error::{MetricsError, Result};
use crate::labels::{LabelSet, BUCKET_LABEL};
use crate::snapshot::{MetricSnapshot, RegistrySnapshot, Samples};

/// Content type of the text format.
pub const TEXT_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Escape a label value (`\`, `"` and newline).
pub fn escape_label_value(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

/// Escape HELP text (`\` and newline).
pub fn escape_help(v: &str) -> String {
    v.replace('\\', "\\\\").replace('\n', "\\n")
}

/// Render a sample value: integers without a fraction, `+Inf`, `-Inf`, `NaN`.
pub fn format_value(v: f64) -> String {
    if v.is_nan() {
        "NaN".into()
    } else if v == f64::INFINITY {
        "+Inf".into()
    } else if v == f64::NEG_INFINITY {
        "-Inf".into()
    } else {
        v.to_string()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TextEncoder;

impl TextEncoder {
    pub fn new() -> Self {
        Self
    }

    pub fn content_type(&self) -> &'static str {
        TEXT_CONTENT_TYPE
    }

    /// Encode a whole registry snapshot.
    pub fn encode(&self, snapshot: &RegistrySnapshot) -> Result<Bytes> {
        let mut out = String::new();
        for m in &snapshot.metrics {
            self.encode_metric(m, &mut out)?;
        }
        Ok(Bytes::from(out))
    }

    /// Append one metric family to `out`.
    pub fn encode_metric(&self, m: &MetricSnapshot, out: &mut String) -> Result<()> {
        write_family(m, out).map_err(|e| MetricsError::Encode(format!("{}: {e}", m.name)))
    }
}

fn write_family(m: &MetricSnapshot, out: &mut String) -> std::fmt::Result {
    writeln!(out, "# HELP {} {}", m.name, escape_help(&m.help))?;
    writeln!(out, "# TYPE {} {}", m.name, m.kind.as_str())?;

    match &m.samples {
        Samples::Counter(samples) => {
            for s in samples {
                write_sample(out, &m.name, "", &s.labels, None, s.value)?;
            }
        }
        Samples::Histogram(samples) => {
            for s in samples {
                for (le, count) in &s.buckets {
                    let le = format_value(*le);
                    write_sample(out, &m.name, "_bucket", &s.labels, Some(&le), *count as f64)?;
                }
                write_sample(out, &m.name, "_sum", &s.labels, None, s.sum)?;
                write_sample(out, &m.name, "_count", &s.labels, None, s.count as f64)?;
            }
        }
    }
    Ok(())
}

fn write_sample(
    out: &mut String,
    name: &str,
    suffix: &str,
    labels: &LabelSet,
    le: Option<&str>,
    value: f64,
) -> std::fmt::Result {
    write!(out, "{name}{suffix}")?;
    if !labels.is_empty() || le.is_some() {
        out.push('{');
        let mut first = true;
        for (k, v) in labels.iter() {
            if !first {
                out.push(',');
            }
            first = false;
            write!(out, "{k}=\"{}\"", escape_label_value(v))?;
        }
        if let Some(le) = le {
            if !first {
                out.push(',');
            }
            write!(out, "{BUCKET_LABEL}=\"{le}\"")?;
        }
        out.push('}');
    }
    writeln!(out, " {}", format_value(value))
}
