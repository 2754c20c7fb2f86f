use clap::Args;
use std::path::PathBuf;

use db_assert::rewrite::{self, DecodeMode, RewriteConfig, RewriteReport, DEFAULT_ROOT};

use crate::commands::CmdResult;

#[derive(Args, Debug)]
pub struct RewriteArgs {
    /// Directory to scan
    #[arg(long, default_value = DEFAULT_ROOT)]
    pub root: PathBuf,
    /// Fail on files that are not valid UTF-8 instead of decoding them lossily
    #[arg(long)]
    pub strict_utf8: bool,
    /// Print a JSON report on success
    #[arg(long)]
    pub report: bool,
}

pub fn run(args: &RewriteArgs) -> CmdResult<RewriteReport> {
    if args.root.exists() && !args.root.is_dir() {
        return Err(db_assert::Error::validation_invalid_argument(
            "root",
            format!("'{}' is not a directory", args.root.display()),
        ));
    }

    let decode = if args.strict_utf8 {
        DecodeMode::Strict
    } else {
        DecodeMode::Lossy
    };
    let config = RewriteConfig::new(&args.root)?.with_decode(decode);

    let report = rewrite::run(&config)?;
    Ok((report, 0))
}
