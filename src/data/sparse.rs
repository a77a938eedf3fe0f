//! Encoded sparse dataset format
//!
//! One example per line, whitespace-separated positive integers:
//! <class> <feature_count> <feature_id_1> ... <feature_id_n>
//!
//! Example:
//! 3 2 1 7
//! 1 3 2 7 9

use crate::core::{EmaError, Example, Result};
use log::warn;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines, Write};
use std::path::Path;

/// Lazy reader over an encoded sparse dataset
#[derive(Debug)]
pub struct SparseDatasetReader<R> {
    lines: Lines<R>,
    line_num: usize,
}

impl SparseDatasetReader<BufReader<File>> {
    /// Open an encoded dataset file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path).map_err(EmaError::IoError)?;
        Ok(Self::from_reader(BufReader::new(file)))
    }
}

impl<R: BufRead> SparseDatasetReader<R> {
    /// Read examples from any buffered reader
    pub fn from_reader(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_num: 0,
        }
    }
}

impl<R: BufRead> Iterator for SparseDatasetReader<R> {
    type Item = Result<Example>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(EmaError::IoError(e))),
            };
            self.line_num += 1;
            let line = line.trim();

            // Skip empty lines and comments
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            return Some(parse_line(line).map_err(|e| {
                EmaError::ParseError(format!("Error parsing line {}: {}", self.line_num, e))
            }));
        }
    }
}

/// Parse a single line of the encoded format
pub fn parse_line(line: &str) -> Result<Example> {
    let parts: Vec<&str> = line.split_whitespace().collect();

    if parts.len() < 2 {
        return Err(EmaError::ParseError(format!(
            "Expected <class> <feature_count> [features...], got: {line}"
        )));
    }

    let label = parts[0]
        .parse::<usize>()
        .map_err(|_| EmaError::ParseError(format!("Invalid class: {}", parts[0])))?;
    if label == 0 {
        return Err(EmaError::ParseError("Class must be positive: 0".to_string()));
    }

    let count = parts[1].parse::<usize>().map_err(|_| {
        EmaError::ParseError(format!("Invalid feature count: {}", parts[1]))
    })?;

    let features = parts[2..]
        .iter()
        .map(|s| match s.parse::<usize>() {
            Ok(0) => Err(EmaError::ParseError(
                "Feature id must be positive: 0".to_string(),
            )),
            Ok(id) => Ok(id),
            Err(_) => Err(EmaError::ParseError(format!("Invalid feature id: {s}"))),
        })
        .collect::<Result<Vec<usize>>>()?;

    if count != features.len() {
        warn!(
            "Feature count {} does not match the {} listed features",
            count,
            features.len()
        );
    }

    Ok(Example::new(label, features))
}

/// Write an example in the encoded format: `class\tcount\tids...`
pub fn write_example<W: Write>(writer: &mut W, example: &Example) -> Result<()> {
    let ids: Vec<String> = example.features.iter().map(usize::to_string).collect();
    writeln!(
        writer,
        "{}\t{}\t{}",
        example.label,
        example.features.len(),
        ids.join(" ")
    )?;
    Ok(())
}
