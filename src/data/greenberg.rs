//! Featurizer for Greenberg's Unix command-history logs
//!
//! Each `C <command>` line is a class: the full command text. Its features
//! describe the context right before the command was typed: the previous
//! command (full text, stub and arguments), the command before that, the
//! current directory, whether the previous command failed and whether a
//! session just started. An "always active" feature is added to every example.
//!
//! Classes and text features get 1-based ids in first-seen order. The
//! vocabulary can be saved as JSON so predicted classes can be decoded later.
//!
//! ```text
//! S Thu Feb 26 17:23:27 1987
//! C cd workspace
//! D /home/user
//! X NIL
//! C ls
//! ```

use crate::core::{EmaError, Example, Result};
use log::trace;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Lines};
use std::path::Path;

const ALWAYS_ACTIVE: &str = "always_active:";
const SESSION_START: &str = "session_start:";
const EMPTY_ARGS: &str = "args:";

/// Class and feature names, indexed by id - 1
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    pub classes: Vec<String>,
    pub features: Vec<String>,
}

/// Assigns numeric ids to command classes and text features
#[derive(Debug, Clone, Default)]
pub struct GreenbergFeaturizer {
    class_ids: HashMap<String, usize>,
    classes: Vec<String>,
    feature_ids: HashMap<String, usize>,
    features: Vec<String>,
}

impl GreenbergFeaturizer {
    /// Create a featurizer with an empty vocabulary
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a featurizer from a saved vocabulary
    pub fn from_vocabulary(vocabulary: Vocabulary) -> Self {
        let index = |names: &[String]| -> HashMap<String, usize> {
            names
                .iter()
                .enumerate()
                .map(|(i, name)| (name.clone(), i + 1))
                .collect()
        };
        Self {
            class_ids: index(&vocabulary.classes),
            feature_ids: index(&vocabulary.features),
            classes: vocabulary.classes,
            features: vocabulary.features,
        }
    }

    /// Snapshot of the current vocabulary
    pub fn vocabulary(&self) -> Vocabulary {
        Vocabulary {
            classes: self.classes.clone(),
            features: self.features.clone(),
        }
    }

    /// Save the vocabulary as JSON
    pub fn save_vocabulary<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path).map_err(EmaError::IoError)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, &self.vocabulary())
            .map_err(|e| EmaError::SerializationError(e.to_string()))?;
        Ok(())
    }

    /// Load a featurizer from a JSON vocabulary
    pub fn load_vocabulary<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path).map_err(EmaError::IoError)?;
        let vocabulary = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| EmaError::SerializationError(e.to_string()))?;
        Ok(Self::from_vocabulary(vocabulary))
    }

    /// Id of the class for a full command, assigning a new one if unseen
    pub fn class_id(&mut self, command: &str) -> usize {
        intern(&mut self.class_ids, &mut self.classes, command)
    }

    /// Id of a text feature, assigning a new one if unseen
    pub fn feature_id(&mut self, feature: &str) -> usize {
        intern(&mut self.feature_ids, &mut self.features, feature)
    }

    /// Ids of the given text features, without repeats, in first-seen order
    pub fn feature_ids<S: AsRef<str>>(&mut self, features: &[S]) -> Vec<usize> {
        let mut ids = Vec::with_capacity(features.len());
        for feature in features {
            let id = self.feature_id(feature.as_ref());
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }

    /// Full command of a class id
    pub fn decode_class(&self, id: usize) -> Option<&str> {
        id.checked_sub(1)
            .and_then(|i| self.classes.get(i))
            .map(String::as_str)
    }

    /// Text of a feature id
    pub fn decode_feature(&self, id: usize) -> Option<&str> {
        id.checked_sub(1)
            .and_then(|i| self.features.get(i))
            .map(String::as_str)
    }

    /// Number of known classes
    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    /// Number of known features
    pub fn n_features(&self) -> usize {
        self.features.len()
    }

    /// Lazily encode a log into examples, extending this vocabulary
    pub fn encode<R: BufRead>(&mut self, reader: R) -> GreenbergEncoder<'_, R> {
        GreenbergEncoder {
            featurizer: self,
            lines: reader.lines(),
            tokens: Vec::new(),
            previous_command: None,
        }
    }
}

fn intern(ids: &mut HashMap<String, usize>, names: &mut Vec<String>, name: &str) -> usize {
    if let Some(&id) = ids.get(name) {
        return id;
    }
    names.push(name.to_string());
    ids.insert(name.to_string(), names.len());
    names.len()
}

/// Iterator of examples over a Greenberg log
#[derive(Debug)]
pub struct GreenbergEncoder<'a, R> {
    featurizer: &'a mut GreenbergFeaturizer,
    lines: Lines<R>,
    tokens: Vec<String>,
    previous_command: Option<String>,
}

impl<R: BufRead> Iterator for GreenbergEncoder<'_, R> {
    type Item = Result<Example>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(EmaError::IoError(e))),
            };

            if line.starts_with("C ") {
                let label = self.featurizer.class_id(line[2..].trim());
                self.tokens.push(ALWAYS_ACTIVE.to_string());
                trace!("Class: {:>3};\tFeatures: {:?}", label, self.tokens);
                let features = self.featurizer.feature_ids(&self.tokens);

                self.tokens.clear();
                if let Some(previous) = &self.previous_command {
                    self.tokens.push(previous_command_feature(previous));
                }
                self.tokens.extend(command_features(&line));
                self.previous_command = Some(line);

                return Some(Ok(Example::new(label, features)));
            } else if line.starts_with("D ") {
                self.tokens.push(directory_feature(&line));
            } else if line.starts_with("X ") {
                self.tokens.push(error_feature(&line).to_string());
            } else if line.starts_with("S ") {
                self.tokens.clear();
                self.tokens.push(EMPTY_ARGS.to_string());
                self.tokens.push(SESSION_START.to_string());
                self.previous_command = None;
            }
        }
    }
}

/// `full:<command>` with whitespace collapsed
fn full_command_feature(line: &str) -> String {
    let command: Vec<&str> = line.get(2..).unwrap_or("").split_whitespace().collect();
    format!("full:{}", command.join(" "))
}

/// Full command, stub and arguments of a `C` line
fn command_features(line: &str) -> [String; 3] {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let stub = parts.get(1).copied().unwrap_or("");
    let args = parts.get(2..).map(|rest| rest.join(" ")).unwrap_or_default();
    [
        full_command_feature(line),
        format!("stub:{stub}"),
        format!("args:{args}"),
    ]
}

fn previous_command_feature(line: &str) -> String {
    format!("prev:{}", full_command_feature(line))
}

fn directory_feature(line: &str) -> String {
    format!("pwd:{}", line.split_whitespace().nth(1).unwrap_or(""))
}

fn error_feature(line: &str) -> &'static str {
    if line.starts_with("X NIL") {
        "noerror:"
    } else {
        "error:"
    }
}
