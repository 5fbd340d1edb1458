//! Convert command CLI handler.

use crate::convert::{self, ConvertConfig};
use std::path::PathBuf;

use super::glob_util::{expand_file_pattern, MultiFileResult};

#[allow(clippy::too_many_arguments)]
pub fn run(
    file: PathBuf,
    output: Option<PathBuf>,
    skip_tables: Vec<String>,
    lenient: bool,
    strict: bool,
    progress: bool,
    dry_run: bool,
    fail_fast: bool,
) -> anyhow::Result<()> {
    let expanded = expand_file_pattern(&file)?;

    if expanded.files.len() == 1 {
        run_single(
            expanded.files.into_iter().next().unwrap(),
            output,
            skip_tables,
            lenient,
            strict,
            progress,
            dry_run,
        )
    } else {
        let output_dir = match output {
            Some(dir) => dir,
            None => {
                anyhow::bail!(
                    "Output directory required when using glob patterns. Use --output <dir>"
                );
            }
        };

        run_multi(
            expanded.files,
            output_dir,
            skip_tables,
            lenient,
            strict,
            dry_run,
            fail_fast,
        )
    }
}

fn run_single(
    file: PathBuf,
    output: Option<PathBuf>,
    skip_tables: Vec<String>,
    lenient: bool,
    strict: bool,
    progress: bool,
    dry_run: bool,
) -> anyhow::Result<()> {
    let config = ConvertConfig {
        input: file,
        output,
        skip_tables,
        lenient,
        strict,
        dry_run,
        progress,
    };

    let stats = convert::run(config)?;

    print_stats(&stats, dry_run, progress);

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_multi(
    files: Vec<PathBuf>,
    output_dir: PathBuf,
    skip_tables: Vec<String>,
    lenient: bool,
    strict: bool,
    dry_run: bool,
    fail_fast: bool,
) -> anyhow::Result<()> {
    let total = files.len();
    let mut result = MultiFileResult::new();
    result.total_files = total;

    if !dry_run {
        std::fs::create_dir_all(&output_dir)?;
    }

    eprintln!("Converting {} files to MySQL syntax...\n", total);

    for (idx, file) in files.iter().enumerate() {
        eprintln!("[{}/{}] Converting: {}", idx + 1, total, file.display());

        let output_file = if dry_run {
            None
        } else {
            let file_name = file
                .file_name()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| format!("output_{}.sql", idx));
            Some(output_dir.join(file_name))
        };

        let config = ConvertConfig {
            input: file.clone(),
            output: output_file.clone(),
            skip_tables: skip_tables.clone(),
            lenient,
            strict,
            dry_run,
            progress: false,
        };

        match convert::run(config) {
            Ok(stats) => {
                let warning_str = if stats.warnings.is_empty() {
                    String::new()
                } else {
                    format!(" ({} warnings)", stats.warnings.len())
                };

                eprintln!(
                    "  {} lines → {} emitted, {} suppressed{}",
                    stats.lines_processed, stats.lines_emitted, stats.lines_suppressed, warning_str
                );

                if let Some(out) = output_file {
                    eprintln!("  → {}", out.display());
                }
                eprintln!();

                result.record_success();
            }
            Err(e) => {
                eprintln!("  Error: {}\n", e);
                result.record_failure(file.clone(), e.to_string());
                if fail_fast {
                    break;
                }
            }
        }
    }

    eprintln!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    eprintln!("Conversion Summary:");
    eprintln!("  Total files: {}", total);
    eprintln!("  Succeeded: {}", result.succeeded);
    eprintln!("  Failed: {}", result.failed);

    if result.has_failures() {
        eprintln!();
        eprintln!("Failed files:");
        for (path, error) in &result.errors {
            eprintln!("  - {}: {}", path.display(), error);
        }
        std::process::exit(1);
    }

    Ok(())
}

fn print_stats(stats: &convert::ConvertStats, dry_run: bool, progress: bool) {
    if !progress && !dry_run {
        return;
    }

    eprintln!();
    eprintln!("Conversion Statistics:");
    eprintln!("  Lines processed: {}", stats.lines_processed);
    eprintln!("  Lines emitted: {}", stats.lines_emitted);
    eprintln!("  Lines suppressed: {}", stats.lines_suppressed);
    eprintln!("  Deferred statements: {}", stats.statements_deferred);

    if !stats.warnings.is_empty() {
        eprintln!();
        eprintln!("Warnings ({}):", stats.warnings.len());
        for warning in &stats.warnings {
            eprintln!("  ⚠ {}", warning);
        }
    }

    if dry_run {
        eprintln!();
        eprintln!("(Dry run - no output written)");
    }
}
