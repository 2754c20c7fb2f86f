//! Tree walk and in-place rewrite.
//!
//! Every entry under the root is visited once. Accepted files are read, run
//! through the rules, and written back only when the text changed.

use serde::Serialize;
use std::path::Path;
use walkdir::WalkDir;

use super::config::{decode, DecodeMode, RewriteConfig};
use super::rules::{apply_rules, Applied};
use crate::error::{Error, Result};
use crate::io;

// ============================================================================
// Types
// ============================================================================

/// Per-rule totals for a run.
#[derive(Debug, Clone, Serialize)]
pub struct RuleSummary {
    pub pattern: String,
    pub replacement: String,
    pub replacements: usize,
}

/// A file that was rewritten.
#[derive(Debug, Clone, Serialize)]
pub struct FileEdit {
    /// File path relative to root.
    pub file: String,
    /// Number of replacements in this file.
    pub replacements: usize,
}

/// The full result of a rewrite run.
#[derive(Debug, Clone, Serialize)]
pub struct RewriteReport {
    pub root: String,
    pub decode: DecodeMode,
    pub rules: Vec<RuleSummary>,
    /// Every entry the walk produced, including directories.
    pub entries_visited: usize,
    /// Files that passed the extension filter.
    pub files_scanned: usize,
    pub files_rewritten: usize,
    pub total_replacements: usize,
    pub edits: Vec<FileEdit>,
}

impl RewriteReport {
    fn new(config: &RewriteConfig) -> Self {
        RewriteReport {
            root: config.root.display().to_string(),
            decode: config.decode,
            rules: config
                .rules
                .iter()
                .map(|r| RuleSummary {
                    pattern: r.pattern().to_string(),
                    replacement: r.replacement().to_string(),
                    replacements: 0,
                })
                .collect(),
            entries_visited: 0,
            files_scanned: 0,
            files_rewritten: 0,
            total_replacements: 0,
            edits: Vec::new(),
        }
    }

    fn record(&mut self, file: String, applied: &Applied) {
        for (summary, count) in self.rules.iter_mut().zip(&applied.counts) {
            summary.replacements += count;
        }
        self.total_replacements += applied.total();
        self.files_rewritten += 1;
        self.edits.push(FileEdit {
            file,
            replacements: applied.total(),
        });
    }
}

// ============================================================================
// Filtering
// ============================================================================

/// True if the file name ends with one of `extensions` (exact, case-sensitive).
pub fn accepts_path(path: &Path, extensions: &[String]) -> bool {
    let Some(name) = path.file_name() else {
        return false;
    };
    let name = name.to_string_lossy();
    extensions.iter().any(|ext| name.ends_with(ext.as_str()))
}

fn relative_to(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .to_string()
}

// ============================================================================
// Run
// ============================================================================

/// Walk `config.root` and rewrite every accepted file whose text changes.
///
/// The first traversal, read, decode or write failure aborts the run. Files
/// rewritten before the failure stay rewritten; their paths are listed under
/// `rewritten` in the error details.
pub fn run(config: &RewriteConfig) -> Result<RewriteReport> {
    let mut report = RewriteReport::new(config);

    log_status!("rewrite", "Scanning {}", config.root.display());

    for entry in WalkDir::new(&config.root) {
        let entry = entry.map_err(|e| {
            let err = Error::internal_io(e.to_string(), Some(walk_context(&e, &config.root)));
            abort(err, &report)
        })?;

        report.entries_visited += 1;

        if !entry.file_type().is_file() || !accepts_path(entry.path(), &config.extensions) {
            continue;
        }
        report.files_scanned += 1;

        let path = entry.path();
        match rewrite_file(path, config) {
            Ok(Some(applied)) => {
                let file = relative_to(path, &config.root);
                log_status!("rewrite", "{} ({} replacement(s))", file, applied.total());
                report.record(file, &applied);
            }
            Ok(None) => {}
            Err(err) => return Err(abort(err, &report)),
        }
    }

    log_status!(
        "rewrite",
        "Rewrote {} of {} file(s)",
        report.files_rewritten,
        report.files_scanned
    );

    Ok(report)
}

/// Rewrite a single file. Returns `None` when the rules leave the text unchanged,
/// in which case the file is not opened for writing.
fn rewrite_file(path: &Path, config: &RewriteConfig) -> Result<Option<Applied>> {
    let bytes = io::read_bytes(path, &format!("read {}", path.display()))?;
    let original = decode(bytes, config.decode, path)?;

    let applied = apply_rules(&original, &config.rules);
    if applied.text == original {
        return Ok(None);
    }

    io::write_file(path, &applied.text, &format!("write {}", path.display()))?;
    Ok(Some(applied))
}

fn walk_context(err: &walkdir::Error, root: &Path) -> String {
    match err.path() {
        Some(path) => format!("walk {}", path.display()),
        None => format!("walk {}", root.display()),
    }
}

fn abort(err: Error, report: &RewriteReport) -> Error {
    let rewritten: Vec<&str> = report.edits.iter().map(|e| e.file.as_str()).collect();
    err.with_detail("rewritten", serde_json::json!(rewritten))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewrite::Rule;
    use std::fs;
    use std::time::{Duration, SystemTime};

    fn exts() -> Vec<String> {
        vec![".ts".to_string(), ".tsx".to_string()]
    }

    #[test]
    fn accepts_ts_and_tsx_only() {
        assert!(accepts_path(Path::new("src/a.ts"), &exts()));
        assert!(accepts_path(Path::new("src/b.tsx"), &exts()));
        assert!(accepts_path(Path::new("src/types.d.ts"), &exts()));
        assert!(!accepts_path(Path::new("src/c.txt"), &exts()));
        assert!(!accepts_path(Path::new("src/d.js"), &exts()));
        assert!(!accepts_path(Path::new("src/e.tsx.bak"), &exts()));
    }

    #[test]
    fn extension_match_is_case_sensitive() {
        assert!(!accepts_path(Path::new("src/A.TS"), &exts()));
        assert!(!accepts_path(Path::new("src/B.Tsx"), &exts()));
    }

    #[test]
    fn bare_suffix_name_is_accepted() {
        // Matching is on the name suffix, so a file named exactly `.ts` qualifies.
        assert!(accepts_path(Path::new("src/.ts"), &exts()));
        assert!(accepts_path(Path::new(".tsx"), &exts()));
        assert!(!accepts_path(Path::new("src/ts"), &exts()));
    }

    #[test]
    fn rewrites_example_tree() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        fs::write(root.join("a.ts"), "const x = doc(db, \"users\");").unwrap();
        fs::write(root.join("b.tsx"), "collection(db , \"posts\")").unwrap();
        fs::write(root.join("c.txt"), "doc(db, \"x\")").unwrap();

        let config = RewriteConfig::new(root).unwrap();
        let report = run(&config).unwrap();

        assert_eq!(
            fs::read_to_string(root.join("a.ts")).unwrap(),
            "const x = doc(db!, \"users\");"
        );
        assert_eq!(
            fs::read_to_string(root.join("b.tsx")).unwrap(),
            "collection(db!, \"posts\")"
        );
        assert_eq!(fs::read_to_string(root.join("c.txt")).unwrap(), "doc(db, \"x\")");

        assert_eq!(report.files_scanned, 2);
        assert_eq!(report.files_rewritten, 2);
        assert_eq!(report.total_replacements, 2);
        assert_eq!(report.rules[0].replacements, 1);
        assert_eq!(report.rules[1].replacements, 1);
    }

    #[test]
    fn walks_nested_directories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("components").join("admin");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("Team.tsx"), "getDocs(collection(db, 'team'))").unwrap();

        let config = RewriteConfig::new(dir.path()).unwrap();
        let report = run(&config).unwrap();

        assert_eq!(
            fs::read_to_string(nested.join("Team.tsx")).unwrap(),
            "getDocs(collection(db!, 'team'))"
        );
        assert_eq!(report.edits.len(), 1);
        assert_eq!(
            Path::new(&report.edits[0].file),
            Path::new("components").join("admin").join("Team.tsx")
        );
        // root + components + admin + file
        assert_eq!(report.entries_visited, 4);
    }

    #[test]
    fn no_op_file_is_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clean.ts");
        fs::write(&path, "export const x = 1;\r\n").unwrap();

        let past = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000);
        fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(past)
            .unwrap();

        let config = RewriteConfig::new(dir.path()).unwrap();
        let report = run(&config).unwrap();

        assert_eq!(report.files_rewritten, 0);
        assert_eq!(fs::read(&path).unwrap(), b"export const x = 1;\r\n");
        assert_eq!(fs::metadata(&path).unwrap().modified().unwrap(), past);
    }

    #[test]
    fn second_run_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.ts");
        fs::write(&path, "doc(db  , 'a');\ncollection(db,'b');\n").unwrap();

        let config = RewriteConfig::new(dir.path()).unwrap();
        let first = run(&config).unwrap();
        let after_first = fs::read_to_string(&path).unwrap();
        let second = run(&config).unwrap();

        assert_eq!(first.files_rewritten, 1);
        assert_eq!(second.files_rewritten, 0);
        assert_eq!(fs::read_to_string(&path).unwrap(), after_first);
        assert_eq!(after_first, "doc(db!, 'a');\ncollection(db!,'b');\n");
    }

    #[test]
    fn lossy_mode_leaves_unmatched_invalid_utf8_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latin1.ts");
        fs::write(&path, b"const s = 'caf\xe9';\n").unwrap();

        let config = RewriteConfig::new(dir.path()).unwrap();
        let report = run(&config).unwrap();

        assert_eq!(report.files_rewritten, 0);
        assert_eq!(fs::read(&path).unwrap(), b"const s = 'caf\xe9';\n");
    }

    #[test]
    fn lossy_mode_replaces_invalid_bytes_when_rewriting() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latin1.ts");
        fs::write(&path, b"doc(db, '\xe9')").unwrap();

        let config = RewriteConfig::new(dir.path()).unwrap();
        run(&config).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "doc(db!, '\u{FFFD}')");
    }

    #[test]
    fn strict_mode_aborts_on_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bad.ts"), b"doc(db, '\xe9')").unwrap();

        let config = RewriteConfig::new(dir.path())
            .unwrap()
            .with_decode(DecodeMode::Strict);
        let err = run(&config).unwrap_err();

        assert_eq!(err.code.as_str(), "rewrite.invalid_utf8");
        assert_eq!(
            fs::read(dir.path().join("bad.ts")).unwrap(),
            b"doc(db, '\xe9')"
        );
    }

    #[test]
    fn failure_lists_files_rewritten_before_it() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..12 {
            fs::write(dir.path().join(format!("f{}.ts", i)), "doc(db, 'a')").unwrap();
        }
        fs::write(dir.path().join("bad.ts"), b"doc(db, '\xe9')").unwrap();

        let config = RewriteConfig::new(dir.path())
            .unwrap()
            .with_decode(DecodeMode::Strict);
        let err = run(&config).unwrap_err();

        assert_eq!(err.code.as_str(), "rewrite.invalid_utf8");
        assert!(err.details["path"].as_str().unwrap().ends_with("bad.ts"));

        let mut listed: Vec<String> = err.details["rewritten"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap().to_string())
            .collect();
        listed.sort();

        let mut on_disk: Vec<String> = (0..12)
            .map(|i| format!("f{}.ts", i))
            .filter(|name| {
                fs::read_to_string(dir.path().join(name))
                    .unwrap()
                    .contains("db!")
            })
            .collect();
        on_disk.sort();

        assert_eq!(listed, on_disk);
        assert_eq!(
            fs::read(dir.path().join("bad.ts")).unwrap(),
            b"doc(db, '\xe9')"
        );
    }

    #[test]
    fn missing_root_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = RewriteConfig::new(dir.path().join("nope")).unwrap();

        let err = run(&config).unwrap_err();

        assert_eq!(err.code.as_str(), "internal.io_error");
        assert_eq!(err.details["rewritten"], serde_json::json!([]));
    }

    #[test]
    fn custom_rules_apply_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.ts");
        fs::write(&path, "foo").unwrap();

        let rules = vec![
            Rule::new("foo", "bar").unwrap(),
            Rule::new("bar", "baz").unwrap(),
        ];
        let config = RewriteConfig::new(dir.path()).unwrap().with_rules(rules);
        run(&config).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "baz");
    }

    #[test]
    fn directory_named_like_source_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let fake = dir.path().join("pkg.ts");
        fs::create_dir_all(&fake).unwrap();
        fs::write(fake.join("index.ts"), "doc(db, 'a')").unwrap();

        let config = RewriteConfig::new(dir.path()).unwrap();
        let report = run(&config).unwrap();

        assert_eq!(report.files_scanned, 1);
        assert_eq!(
            fs::read_to_string(fake.join("index.ts")).unwrap(),
            "doc(db!, 'a')"
        );
    }
}
