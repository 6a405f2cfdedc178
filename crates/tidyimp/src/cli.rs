// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Command-line interface.
//!
//! Each subcommand reads file paths (or standard input when none are
//! given), runs one rewriting pass per file, and writes the transformed
//! text, a unified diff (`--diff`), or the files in place (`--write`).
//! Diagnostics stream to stderr as `<file>:<line>:<col>: <level>: <msg>`
//! lines; `--json` adds a machine-readable run report on stdout.
//!
//! Exit codes: 0 success, 1 fatal error (including error-level
//! diagnostics), 2 usage error, 100 no changes but some diagnostics.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing::debug;

use tidyimp_core::FileText;

use crate::error::{ExitStatus, TidyError};
use crate::format::{AlignImports, FormatParams, HangingIndent};
use crate::importclns::ImportMap;
use crate::importdb::{DbCache, PATH_ENV};
use crate::output::{FileReport, RunReport};
use crate::probe::NullProbe;
use crate::rewrite::{
    canonicalize_imports, collect_imports, reformat_import_statements, remove_broken_imports,
    replace_star_imports, tidy_imports, transform_imports, CancelFlag, RemoveUnused, Rewritten,
    TidyOptions,
};

/// Automatic maintenance of Python import statements.
#[derive(Debug, Parser)]
#[command(name = "tidyimp", version, about)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Reformat, fix missing and unused imports, enforce mandatory
    /// imports, and canonicalize.
    Tidy(TidyArgs),
    /// Reformat import blocks without changing their contents.
    Reformat(CommonArgs),
    /// Replace `from M import *` with explicit names from the probe.
    ReplaceStar(CommonArgs),
    /// Remove imports the probe reports as unresolvable.
    RemoveBroken(CommonArgs),
    /// Rewrite import prefixes, e.g. `--map old.mod=new.mod`.
    Transform(TransformArgs),
    /// Apply the database's canonical rename rules.
    Canonicalize(CommonArgs),
    /// Print the union of all imports found in the inputs.
    Collect(CollectArgs),
}

#[derive(Debug, Args)]
struct CommonArgs {
    /// Input files; standard input when none are given.
    files: Vec<PathBuf>,

    /// Print a unified diff instead of the transformed text.
    #[arg(long)]
    diff: bool,

    /// Rewrite files in place.
    #[arg(long, short = 'w', conflicts_with = "diff")]
    write: bool,

    /// Emit a JSON run report on stdout.
    #[arg(long)]
    json: bool,

    /// Database path; defaults to $TIDYIMP_PATH or the built-in path.
    #[arg(long, value_name = "PATH")]
    db_path: Option<String>,

    /// Target wrap width.
    #[arg(long, default_value_t = 79)]
    max_line_length: usize,

    /// Align the `import` keyword: `off`, `tab`, or a column number.
    #[arg(long, default_value = "off", value_parser = parse_align)]
    align_imports: AlignImports,

    /// Multi-line layout: `auto`, `never`, or `always`.
    #[arg(long, default_value = "auto", value_parser = parse_hanging)]
    hanging_indent: HangingIndent,

    /// Minimum spaces between `from` and the module name.
    #[arg(long, default_value_t = 1)]
    from_spaces: usize,

    /// Do not parenthesize multi-import from statements that fit.
    #[arg(long)]
    no_parens: bool,
}

#[derive(Debug, Args)]
struct TidyArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Do not add imports for undefined names.
    #[arg(long)]
    no_add_missing: bool,

    /// Never remove unused imports.
    #[arg(long)]
    keep_unused: bool,

    /// Remove unused imports even in __init__.py files.
    #[arg(long, conflicts_with = "keep_unused")]
    remove_unused: bool,

    /// Do not add the database's mandatory imports.
    #[arg(long)]
    no_add_mandatory: bool,
}

#[derive(Debug, Args)]
struct TransformArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// A rewrite rule `OLD=NEW`; may be repeated.
    #[arg(long = "map", value_name = "OLD=NEW", required = true)]
    maps: Vec<String>,
}

#[derive(Debug, Args)]
struct CollectArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Fail on non-import statements instead of skipping them.
    #[arg(long)]
    strict: bool,
}

fn parse_align(value: &str) -> Result<AlignImports, String> {
    match value {
        "off" | "none" => Ok(AlignImports::Off),
        "tab" => Ok(AlignImports::TabStop),
        n => n
            .parse::<usize>()
            .map(AlignImports::Column)
            .map_err(|_| format!("expected 'off', 'tab', or a column number, got {:?}", value)),
    }
}

fn parse_hanging(value: &str) -> Result<HangingIndent, String> {
    match value {
        "auto" => Ok(HangingIndent::Auto),
        "never" => Ok(HangingIndent::Never),
        "always" => Ok(HangingIndent::Always),
        _ => Err(format!(
            "expected 'auto', 'never', or 'always', got {:?}",
            value
        )),
    }
}

impl CommonArgs {
    fn params(&self) -> FormatParams {
        FormatParams {
            align_imports: self.align_imports,
            from_spaces: self.from_spaces,
            hanging_indent: self.hanging_indent,
            max_line_length: self.max_line_length,
            use_parens: !self.no_parens,
            ..FormatParams::default()
        }
    }

    fn db_spec(&self) -> Option<String> {
        self.db_path
            .clone()
            .or_else(|| std::env::var(PATH_ENV).ok())
    }
}

/// Entry point; returns the process exit code.
pub fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("TIDYIMP_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();
    match run(cli) {
        Ok(status) => ExitCode::from(status.code()),
        Err(err) => {
            eprintln!("tidyimp: {}", err);
            ExitCode::from(ExitStatus::Fatal.code())
        }
    }
}

fn run(cli: Cli) -> Result<ExitStatus, TidyError> {
    match cli.command {
        Command::Tidy(args) => {
            let options = TidyOptions {
                add_missing: !args.no_add_missing,
                remove_unused: if args.keep_unused {
                    RemoveUnused::Never
                } else if args.remove_unused {
                    RemoveUnused::Always
                } else {
                    RemoveUnused::Automatic
                },
                add_mandatory: !args.no_add_mandatory,
                canonicalize: true,
            };
            let mut cache = DbCache::new();
            run_pass(&args.common, |text| {
                let db = cache.get_or_load(
                    text.filename().unwrap_or(Path::new(".")),
                    args.common.db_spec().as_deref(),
                )?;
                tidy_imports(text, &db, &args.common.params(), &options, &CancelFlag::new())
            })
        }
        Command::Reformat(common) => run_pass(&common, |text| {
            reformat_import_statements(text, &common.params(), &CancelFlag::new())
        }),
        Command::ReplaceStar(common) => run_pass(&common, |text| {
            replace_star_imports(text, &NullProbe, &common.params(), &CancelFlag::new())
        }),
        Command::RemoveBroken(common) => run_pass(&common, |text| {
            remove_broken_imports(text, &NullProbe, &common.params(), &CancelFlag::new())
        }),
        Command::Transform(args) => {
            let map = parse_transform_maps(&args.maps)?;
            run_pass(&args.common, |text| {
                transform_imports(text, &map, &args.common.params(), &CancelFlag::new())
            })
        }
        Command::Canonicalize(common) => {
            let mut cache = DbCache::new();
            run_pass(&common, |text| {
                let db = cache.get_or_load(
                    text.filename().unwrap_or(Path::new(".")),
                    common.db_spec().as_deref(),
                )?;
                canonicalize_imports(text, &db, &common.params(), &CancelFlag::new())
            })
        }
        Command::Collect(args) => run_collect(&args),
    }
}

fn parse_transform_maps(maps: &[String]) -> Result<ImportMap, TidyError> {
    ImportMap::from_pairs(maps.iter().map(|rule| {
        match rule.split_once('=') {
            Some((old, new)) => (old.trim().to_string(), new.trim().to_string()),
            None => (rule.clone(), String::new()),
        }
    }))
    .map_err(|_| TidyError::ImportFormat(format!("expected OLD=NEW rules, got {:?}", maps)))
}

fn read_inputs(files: &[PathBuf]) -> Result<Vec<FileText>, TidyError> {
    if files.is_empty() {
        let mut source = String::new();
        std::io::stdin().read_to_string(&mut source)?;
        return Ok(vec![FileText::new(source)]);
    }
    let mut texts = Vec::with_capacity(files.len());
    for file in files {
        let source = std::fs::read_to_string(file)?;
        texts.push(FileText::with_filename(source, file));
    }
    Ok(texts)
}

fn file_label(text: &FileText) -> String {
    text.filename()
        .map(|f| f.display().to_string())
        .unwrap_or_else(|| "<stdin>".to_string())
}

/// Run one pass over every input. Per-file failures are reported and do
/// not abort the batch.
fn run_pass(
    common: &CommonArgs,
    mut pass: impl FnMut(&FileText) -> Result<Rewritten, TidyError>,
) -> Result<ExitStatus, TidyError> {
    let texts = read_inputs(&common.files)?;
    let mut reports = Vec::new();
    let mut any_changed = false;
    let mut any_diagnostics = false;
    let mut any_fatal = false;
    let mut any_error_diag = false;
    for text in &texts {
        let label = file_label(text);
        debug!(file = %label, "processing");
        let result = match pass(text) {
            Ok(result) => result,
            Err(err) => {
                eprintln!("tidyimp: {}", err);
                any_fatal = true;
                reports.push(FileReport::failed(label, err.to_string()));
                continue;
            }
        };
        for diag in &result.diagnostics {
            eprintln!("{}", diag);
        }
        any_changed |= result.changed;
        any_diagnostics |= !result.diagnostics.is_empty();
        any_error_diag |= result.has_errors();
        if common.diff {
            if result.changed {
                let diff = crate::diff::unified_diff(
                    text.as_str(),
                    &result.output,
                    &format!("a/{}", label),
                    &format!("b/{}", label),
                );
                print!("{}", diff);
            }
        } else if common.write && text.filename().is_some() {
            if result.changed {
                std::fs::write(text.filename().expect("checked above"), &result.output)?;
            }
        } else {
            print!("{}", result.output);
        }
        reports.push(FileReport {
            file: label,
            changed: result.changed,
            cancelled: result.cancelled,
            error: None,
            diagnostics: result.diagnostics,
        });
    }
    if common.json {
        println!("{}", RunReport::new(reports).to_json());
    }
    Ok(exit_status(
        any_fatal || any_error_diag,
        any_changed,
        any_diagnostics,
    ))
}

fn exit_status(fatal: bool, changed: bool, diagnostics: bool) -> ExitStatus {
    if fatal {
        ExitStatus::Fatal
    } else if !changed && diagnostics {
        ExitStatus::Diagnostics
    } else {
        ExitStatus::Success
    }
}

fn run_collect(args: &CollectArgs) -> Result<ExitStatus, TidyError> {
    let texts = read_inputs(&args.common.files)?;
    let set = collect_imports(&texts, !args.strict)?;
    let rendered = set.pretty_print(&args.common.params(), true)?;
    print!("{}", rendered);
    if args.common.json {
        let report = RunReport::new(
            texts
                .iter()
                .map(|t| FileReport {
                    file: file_label(t),
                    changed: false,
                    cancelled: false,
                    error: None,
                    diagnostics: Vec::new(),
                })
                .collect(),
        );
        println!("{}", report.to_json());
    }
    Ok(ExitStatus::Success)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_subcommands() {
        Cli::parse_from(["tidyimp", "tidy", "a.py", "--diff"]);
        Cli::parse_from(["tidyimp", "reformat", "--align-imports", "tab"]);
        Cli::parse_from(["tidyimp", "transform", "--map", "old=new", "f.py"]);
        Cli::parse_from(["tidyimp", "collect", "--strict"]);
    }

    #[test]
    fn align_parser() {
        assert_eq!(parse_align("off").unwrap(), AlignImports::Off);
        assert_eq!(parse_align("tab").unwrap(), AlignImports::TabStop);
        assert_eq!(parse_align("32").unwrap(), AlignImports::Column(32));
        assert!(parse_align("sideways").is_err());
    }

    #[test]
    fn diff_and_write_conflict() {
        assert!(Cli::try_parse_from(["tidyimp", "tidy", "--diff", "--write"]).is_err());
    }

    #[test]
    fn transform_requires_map() {
        assert!(Cli::try_parse_from(["tidyimp", "transform", "f.py"]).is_err());
    }

    #[test]
    fn transform_map_parsing() {
        let map = parse_transform_maps(&["numpy=numpy2".to_string()]).unwrap();
        assert_eq!(
            map.get(&"numpy".parse().unwrap()),
            Some(&"numpy2".parse().unwrap())
        );
        assert!(parse_transform_maps(&["no-equals".to_string()]).is_err());
    }

    #[test]
    fn exit_status_matrix() {
        assert_eq!(exit_status(false, false, false), ExitStatus::Success);
        assert_eq!(exit_status(false, true, true), ExitStatus::Success);
        assert_eq!(exit_status(false, false, true), ExitStatus::Diagnostics);
        assert_eq!(exit_status(true, true, true), ExitStatus::Fatal);
    }
}
