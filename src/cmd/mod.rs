mod convert;
mod glob_util;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pg2mysql")]
#[command(version)]
#[command(about = "Convert PostgreSQL SQL dumps into MySQL-compatible dumps", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert a PostgreSQL dump file to MySQL syntax
    Convert {
        /// Input SQL file or glob pattern (e.g., *.sql, dumps/**/*.sql)
        /// Supports .gz, .bz2, .xz, .zst compression
        file: PathBuf,

        /// Output SQL file or directory (default: stdout for single file, required for glob)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Exclude a table from the output (schema-qualified, repeatable)
        #[arg(long = "skip-table", value_name = "TABLE")]
        skip_tables: Vec<String>,

        /// Rewrite INSERT INTO as INSERT IGNORE INTO
        #[arg(long)]
        lenient: bool,

        /// Strict mode: fail on user-defined type declarations
        #[arg(long)]
        strict: bool,

        /// Show progress during conversion
        #[arg(short, long)]
        progress: bool,

        /// Preview without writing files (dry run)
        #[arg(long)]
        dry_run: bool,

        /// Stop on first file that fails (for glob patterns)
        #[arg(long)]
        fail_fast: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Convert {
            file,
            output,
            skip_tables,
            lenient,
            strict,
            progress,
            dry_run,
            fail_fast,
        } => convert::run(
            file, output, skip_tables, lenient, strict, progress, dry_run, fail_fast,
        ),
        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "pg2mysql", &mut io::stdout());
            Ok(())
        }
    }
}
