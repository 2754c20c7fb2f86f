use serde::Serialize;
use std::path::{Path, PathBuf};

use super::rules::{default_rules, Rule};
use crate::error::{Error, Result};

/// Root scanned when no other directory is given.
pub const DEFAULT_ROOT: &str = "src";

/// File name suffixes eligible for rewriting (case-sensitive).
pub const DEFAULT_EXTENSIONS: &[&str] = &[".ts", ".tsx"];

/// How file bytes are turned into text before rules run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeMode {
    /// Invalid UTF-8 sequences become U+FFFD.
    #[default]
    Lossy,
    /// Invalid UTF-8 aborts the run.
    Strict,
}

/// Everything a rewrite run needs. Immutable once the run starts.
#[derive(Debug, Clone)]
pub struct RewriteConfig {
    pub root: PathBuf,
    pub rules: Vec<Rule>,
    pub extensions: Vec<String>,
    pub decode: DecodeMode,
}

impl RewriteConfig {
    /// Config for `root` with the fixed ruleset and extension set.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        Ok(RewriteConfig {
            root: root.into(),
            rules: default_rules()?,
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            decode: DecodeMode::default(),
        })
    }

    pub fn with_decode(mut self, decode: DecodeMode) -> Self {
        self.decode = decode;
        self
    }

    pub fn with_rules(mut self, rules: Vec<Rule>) -> Self {
        self.rules = rules;
        self
    }
}

/// Decode file bytes according to `mode`.
pub fn decode(bytes: Vec<u8>, mode: DecodeMode, path: &Path) -> Result<String> {
    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(err) => match mode {
            DecodeMode::Lossy => Ok(String::from_utf8_lossy(err.as_bytes()).into_owned()),
            DecodeMode::Strict => Err(Error::rewrite_invalid_utf8(
                path.display().to_string(),
                err.utf8_error().valid_up_to(),
            )),
        },
    }
}
