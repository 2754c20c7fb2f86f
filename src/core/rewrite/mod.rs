//! Codemod: add non-null assertions to `doc(db, ...)` and `collection(db, ...)`.
//!
//! Walks a source tree, runs `.ts`/`.tsx` files through an ordered list of regex
//! rules, and overwrites only the files whose text changed.

mod config;
mod engine;
mod rules;

pub use config::{decode, DecodeMode, RewriteConfig, DEFAULT_EXTENSIONS, DEFAULT_ROOT};
pub use engine::{accepts_path, run, FileEdit, RewriteReport, RuleSummary};
pub use rules::{
    apply_rules, default_rules, Applied, Rule, COLLECTION_PATTERN, COLLECTION_REPLACEMENT,
    DOC_PATTERN, DOC_REPLACEMENT,
};
