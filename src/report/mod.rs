//! Reporting of evaluation results
//!
//! Per-example outcomes are written as four `%g`-formatted numbers per line:
//! `<true_class> <predicted_class> <r1> <r5>`. Run summaries can also be
//! saved as JSON for later comparison of hyperparameter settings.

use crate::classifier::Ema;
use crate::core::{EmaError, Outcome, OutcomeSink, Result};
use crate::evaluation::EvaluationSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

const G_PRECISION: i32 = 6;

/// Format a number like C's `%g`
///
/// Six significant digits, trailing zeros removed, exponent notation when
/// the exponent is below -4 or at least 6.
pub fn format_g(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    // Rounding to the target precision first decides the exponent
    let sci = format!("{:.*e}", (G_PRECISION - 1) as usize, value);
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return sci;
    };
    let exp: i32 = exp.parse().unwrap_or(0);

    if exp < -4 || exp >= G_PRECISION {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_zeros(mantissa), sign, exp.abs())
    } else {
        let decimals = (G_PRECISION - 1 - exp) as usize;
        trim_zeros(&format!("{value:.decimals$}")).to_string()
    }
}

fn trim_zeros(number: &str) -> &str {
    if number.contains('.') {
        number.trim_end_matches('0').trim_end_matches('.')
    } else {
        number
    }
}

/// Format one outcome as `<true_class> <predicted_class> <r1> <r5>`
pub fn format_outcome(outcome: &Outcome) -> String {
    format!(
        "{} {} {} {}",
        format_g(outcome.label as f64),
        format_g(outcome.predicted as f64),
        format_g(f64::from(u8::from(outcome.r1))),
        format_g(f64::from(u8::from(outcome.r5)))
    )
}

/// Format the summary line `<mean_r1>\t<mean_r5>`
pub fn format_summary(summary: &EvaluationSummary) -> String {
    format!(
        "{}\t{}",
        format_g(summary.mean_r1()),
        format_g(summary.mean_r5())
    )
}

/// Outcome sink writing one text line per example
pub struct OutcomeWriter<W: Write> {
    writer: W,
}

impl OutcomeWriter<BufWriter<File>> {
    /// Create (or truncate) an outcome file
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path).map_err(EmaError::IoError)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> OutcomeWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Flush buffered lines
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Return the underlying writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> OutcomeSink for OutcomeWriter<W> {
    fn record(&mut self, outcome: &Outcome) -> Result<()> {
        writeln!(self.writer, "{}", format_outcome(outcome))?;
        Ok(())
    }
}

/// Machine-readable summary of one evaluation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryReport {
    /// Name of the evaluated input
    pub source: String,
    pub examples: usize,
    pub updates: usize,
    pub mean_r1: f64,
    pub mean_r5: f64,
    /// Final weight matrix shape as (features, classes)
    pub weights_shape: (usize, usize),
    pub weights_nnz: usize,
    pub elapsed_ms: i64,
    pub created_at: DateTime<Utc>,
}

impl SummaryReport {
    /// Build a report for a finished run that began at `started`
    pub fn new(
        source: impl Into<String>,
        summary: &EvaluationSummary,
        classifier: &Ema,
        started: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        let (weights_shape, weights_nnz) = classifier
            .weights()
            .map_or(((0, 0), 0), |w| (w.shape(), w.nnz()));
        Self {
            source: source.into(),
            examples: summary.examples,
            updates: summary.updates,
            mean_r1: summary.mean_r1(),
            mean_r5: summary.mean_r5(),
            weights_shape,
            weights_nnz,
            elapsed_ms: (now - started).num_milliseconds(),
            created_at: now,
        }
    }

    /// Save a list of reports as a JSON array
    pub fn save_all<P: AsRef<Path>>(reports: &[SummaryReport], path: P) -> Result<()> {
        let file = File::create(path).map_err(EmaError::IoError)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, reports)
            .map_err(|e| EmaError::SerializationError(e.to_string()))?;
        Ok(())
    }

    /// Load reports saved with [`save_all`](Self::save_all)
    pub fn load_all<P: AsRef<Path>>(path: P) -> Result<Vec<SummaryReport>> {
        let file = File::open(path).map_err(EmaError::IoError)?;
        serde_json::from_reader(std::io::BufReader::new(file))
            .map_err(|e| EmaError::SerializationError(e.to_string()))
    }
}
