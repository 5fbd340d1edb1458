//! Line-streamed conversion of PostgreSQL dumps to MySQL syntax.
//!
//! The converter never builds a parse tree. Each physical line is classified
//! by the currently open statement context (or by a statement-opening
//! pattern) and routed through a context-specific rewrite pipeline:
//! - CREATE TABLE: type/default rewriting, schema bootstrap, column quoting
//! - ALTER TABLE: constraint massaging, auto-increment deferral
//! - INSERT: identifier escaping, literal rewriting, quote-parity boundaries
//! - CREATE INDEX / setval: single-line rewrites
//! - BEGIN..COMMIT blocks: suppressed wholesale
//! - anything else: dropped with a warning

mod alter_table;
mod create_table;
mod insert;
mod types;
mod warnings;

use crate::input::{determine_buffer_size, Compression, LineReader};
use ahash::AHashSet;
use indicatif::{ProgressBar, ProgressStyle};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

pub use types::TypeMapper;
pub use warnings::{ConvertWarning, WarningCollector};

/// Configuration for the convert command
#[derive(Debug, Default)]
pub struct ConvertConfig {
    /// Input dump file
    pub input: PathBuf,
    /// Output SQL file (None for stdout)
    pub output: Option<PathBuf>,
    /// Schema-qualified table names to exclude from the output
    pub skip_tables: Vec<String>,
    /// Rewrite INSERT INTO as INSERT IGNORE INTO
    pub lenient: bool,
    /// Fail on user-defined type declarations
    pub strict: bool,
    /// Dry run mode
    pub dry_run: bool,
    /// Show progress
    pub progress: bool,
}

/// Statistics from a convert run
#[derive(Debug, Default)]
pub struct ConvertStats {
    /// Input lines processed
    pub lines_processed: u64,
    /// Output lines written
    pub lines_emitted: u64,
    /// Input lines suppressed or dropped
    pub lines_suppressed: u64,
    /// Auto-increment statements flushed after the main stream
    pub statements_deferred: u64,
    /// Warnings generated
    pub warnings: Vec<ConvertWarning>,
}

/// The statement context the dispatcher is currently inside.
///
/// Index creation and sequence-value lines are single-line statements and
/// never occupy a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatementContext {
    None,
    CreateTable,
    AlterTable,
    Insert,
    TransactionBlock,
}

/// Streaming PostgreSQL-to-MySQL statement converter.
///
/// Owns all per-run state: the open statement context, the exclusion set,
/// the schemas already bootstrapped, and the deferred auto-increment buffer.
pub struct Converter {
    ctx: StatementContext,
    skip: AHashSet<String>,
    seen_schemas: AHashSet<String>,
    deferred: Vec<String>,
    suppressed: bool,
    lenient: bool,
    strict: bool,
    warnings: WarningCollector,
}

static RE_CREATE_TABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^CREATE\s+TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?([^\s(]+)").unwrap());

static RE_ALTER_TABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^ALTER\s+TABLE\s+(?:ONLY\s+)?([^\s;]+)").unwrap());

static RE_INSERT_INTO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^INSERT\s+INTO\s+([^\s(]+)").unwrap());

static RE_CREATE_INDEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^CREATE\s+(?:UNIQUE\s+)?INDEX\b.*?\bON\s+(?:ONLY\s+)?([^\s(;]+)").unwrap()
});

static RE_SETVAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^SELECT\s+pg_catalog\.setval\('([^']+)',\s*(\d+)").unwrap()
});

static RE_CREATE_TYPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^CREATE\s+TYPE\b").unwrap());

static RE_INDEX_METHOD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s+USING\s+(?:btree|hash|gin|gist|spgist|brin)\b").unwrap());

static RE_PATTERN_OPS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s+(?:varchar|text|bpchar)_pattern_ops\b").unwrap());

static RE_SEQ_TABLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.+)_[^_.]+_seq$").unwrap());
static RE_SEQ_TABLE_SHORT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.+)_seq$").unwrap());

impl Converter {
    pub fn new(skip_tables: &[String]) -> Self {
        Self {
            ctx: StatementContext::None,
            skip: skip_tables.iter().map(|t| t.replace('"', "")).collect(),
            seen_schemas: AHashSet::new(),
            deferred: Vec::new(),
            suppressed: false,
            lenient: false,
            strict: false,
            warnings: WarningCollector::new(),
        }
    }

    pub fn with_lenient(mut self, lenient: bool) -> Self {
        self.lenient = lenient;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Convert one physical line. Returns the output lines to emit (empty
    /// when the line is suppressed or dropped).
    ///
    /// Precedence follows statement-pattern overlap: an open context always
    /// wins, then setval, CREATE TABLE, ALTER TABLE, INSERT, CREATE INDEX.
    pub fn convert_line(
        &mut self,
        line: &str,
        lookahead: Option<&str>,
    ) -> anyhow::Result<Vec<String>> {
        match self.ctx {
            StatementContext::TransactionBlock => {
                if line.trim() == "COMMIT;" {
                    self.ctx = StatementContext::None;
                }
                return Ok(Vec::new());
            }
            StatementContext::CreateTable => return Ok(self.create_table_line(line)),
            StatementContext::AlterTable => return Ok(self.alter_table_line(line)),
            StatementContext::Insert => return Ok(self.insert_line(line)),
            StatementContext::None => {}
        }

        if line.trim() == "BEGIN;" {
            self.ctx = StatementContext::TransactionBlock;
            self.warnings.add(ConvertWarning::SkippedStatement {
                reason: "transactional block".to_string(),
                statement_preview: "BEGIN; .. COMMIT;".to_string(),
            });
            return Ok(Vec::new());
        }

        if line.contains("setval(") && line.trim_start().to_uppercase().starts_with("SELECT") {
            return self.rewrite_setval(line);
        }

        if RE_CREATE_TABLE.is_match(line) {
            return Ok(self.open_create_table(line));
        }

        if RE_ALTER_TABLE.is_match(line) {
            return Ok(self.open_alter_table(line, lookahead));
        }

        if RE_INSERT_INTO.is_match(line) {
            return Ok(self.open_insert(line));
        }

        if RE_CREATE_INDEX.is_match(line) {
            return Ok(self.rewrite_create_index(line));
        }

        if RE_CREATE_TYPE.is_match(line) {
            if self.strict {
                anyhow::bail!("user-defined type declaration in strict mode: {}", line);
            }
            self.warnings.add(ConvertWarning::UnsupportedFeature {
                feature: "user-defined type".to_string(),
                suggestion: Some("recreate the type's columns as longtext".to_string()),
            });
            return Ok(Vec::new());
        }

        self.warnings.add(ConvertWarning::UnrecognizedLine {
            preview: line.chars().take(60).collect(),
        });
        Ok(Vec::new())
    }

    /// Flush the deferred auto-increment statements, in deferral order.
    pub fn finish(&mut self) -> Vec<String> {
        std::mem::take(&mut self.deferred)
    }

    /// Get collected warnings
    pub fn warnings(&self) -> &[ConvertWarning] {
        self.warnings.warnings()
    }

    /// Whether a statement targeting `table` must be suppressed.
    ///
    /// The exclusion list may carry schema-qualified or bare names; a dump
    /// table matches on either spelling.
    pub(crate) fn is_skipped(&self, table: &str) -> bool {
        let table = table.replace('"', "");
        if self.skip.contains(table.as_str()) {
            return true;
        }
        match table.rsplit_once('.') {
            Some((_, bare)) => self.skip.contains(bare),
            None => false,
        }
    }

    pub(crate) fn warn_skipped(&mut self, table: &str, statement: &str) {
        self.warnings.add(ConvertWarning::SkippedTable {
            table: table.replace('"', ""),
            statement: statement.to_string(),
        });
    }

    /// Emit the DROP DATABASE/CREATE DATABASE pair the first time a schema
    /// is referenced by a table-creation statement.
    pub(crate) fn bootstrap_schema(&mut self, table: &str) -> Vec<String> {
        let table = table.replace('"', "");
        let Some((schema, _)) = table.split_once('.') else {
            return Vec::new();
        };
        if !self.seen_schemas.insert(schema.to_string()) {
            return Vec::new();
        }
        vec![
            format!("DROP DATABASE IF EXISTS {};", schema),
            format!("CREATE DATABASE {};", schema),
        ]
    }

    /// CREATE INDEX is a single-line statement: strip the index-method and
    /// pattern-ops qualifiers, suppress for excluded tables. Column names are
    /// intentionally left unquoted.
    fn rewrite_create_index(&mut self, line: &str) -> Vec<String> {
        let table = RE_CREATE_INDEX
            .captures(line)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();

        if self.is_skipped(&table) {
            self.warn_skipped(&table, "CREATE INDEX");
            return Vec::new();
        }

        let mut result = RE_INDEX_METHOD.replace_all(line, "").to_string();
        result = RE_PATTERN_OPS.replace_all(&result, "").to_string();
        vec![result]
    }

    /// Rewrite `SELECT pg_catalog.setval('<seq>', N, ..)` into a MySQL
    /// auto-increment counter assignment. This construct is required input:
    /// an unparseable setval aborts the run.
    fn rewrite_setval(&mut self, line: &str) -> anyhow::Result<Vec<String>> {
        let caps = RE_SETVAL
            .captures(line)
            .ok_or_else(|| anyhow::anyhow!("cannot parse sequence value statement: {}", line))?;

        let sequence = caps[1].replace('"', "");
        let value = &caps[2];
        let table = sequence_table(&sequence)
            .ok_or_else(|| anyhow::anyhow!("cannot derive table from sequence '{}'", sequence))?;

        if self.is_skipped(&table) {
            self.warn_skipped(&table, "AUTO_INCREMENT assignment");
            return Ok(Vec::new());
        }

        Ok(vec![format!(
            "ALTER TABLE {} AUTO_INCREMENT = {};",
            table, value
        )])
    }

    pub(crate) fn push_deferred(&mut self, stmt: String) {
        self.deferred.push(stmt);
    }
}

/// Derive the owning table from a sequence name: `public.widgets_id_seq`
/// names table `public.widgets`.
fn sequence_table(sequence: &str) -> Option<String> {
    if let Some(caps) = RE_SEQ_TABLE.captures(sequence) {
        return Some(caps[1].to_string());
    }
    RE_SEQ_TABLE_SHORT
        .captures(sequence)
        .map(|caps| caps[1].to_string())
}

/// Run the convert command
pub fn run(config: ConvertConfig) -> anyhow::Result<ConvertStats> {
    let mut stats = ConvertStats::default();

    let progress_bar = if config.progress {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap(),
        );
        pb.set_message("Converting...");
        Some(pb)
    } else {
        None
    };

    let mut converter = Converter::new(&config.skip_tables)
        .with_lenient(config.lenient)
        .with_strict(config.strict);

    // Open input file
    let file = File::open(&config.input)?;
    let file_size = file.metadata().map(|m| m.len()).unwrap_or(0);
    let compression = Compression::from_path(&config.input);
    let reader = compression.wrap_reader(Box::new(file));
    let mut lines = LineReader::new(reader, determine_buffer_size(file_size))?;

    // Open output
    let mut writer: Box<dyn Write> = if config.dry_run {
        Box::new(std::io::sink())
    } else {
        match &config.output {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                Box::new(BufWriter::with_capacity(256 * 1024, File::create(path)?))
            }
            None => Box::new(BufWriter::new(std::io::stdout())),
        }
    };

    write_header(&mut writer, &config)?;

    while let Some(line) = lines.next_line()? {
        stats.lines_processed += 1;

        if let Some(ref pb) = progress_bar {
            if stats.lines_processed % 10_000 == 0 {
                pb.set_message(format!("Processed {} lines...", stats.lines_processed));
            }
        }

        let out = converter.convert_line(&line, lines.peek())?;
        if out.is_empty() {
            stats.lines_suppressed += 1;
        } else {
            for rewritten in &out {
                writeln!(writer, "{}", rewritten)?;
            }
            stats.lines_emitted += out.len() as u64;
        }
    }

    // The target dialect can only mark a column auto-incrementing once it is
    // part of a key, so these flush after every other statement.
    for stmt in converter.finish() {
        writeln!(writer, "{}", stmt)?;
        stats.statements_deferred += 1;
    }
    writer.flush()?;

    stats.warnings.extend(converter.warnings().iter().cloned());

    if let Some(pb) = progress_bar {
        pb.finish_with_message(format!("Converted {} lines", stats.lines_processed));
    }

    Ok(stats)
}

/// Write output banner and load prologue
fn write_header(writer: &mut dyn Write, config: &ConvertConfig) -> std::io::Result<()> {
    writeln!(writer, "-- Converted by pg2mysql")?;
    writeln!(writer, "-- Source: {}", config.input.display())?;
    writeln!(writer)?;
    writeln!(writer, "SET NAMES utf8mb4;")?;
    writeln!(writer, "SET FOREIGN_KEY_CHECKS = 0;")?;
    writeln!(writer)?;
    Ok(())
}
