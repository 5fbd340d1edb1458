//! Table-creation handler.
//!
//! The opening line bootstraps the owning schema and settles the skip
//! verdict; every following line runs the fixed rewrite pipeline: check
//! constraints first, then type mapping, default translation, cast
//! stripping, timestamp repair, and finally column-name quoting. The
//! statement closes on a line ending in `);`.

use super::{Converter, StatementContext, TypeMapper};
use once_cell::sync::Lazy;
use regex::Regex;

static RE_CHECK_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bCHECK\s*\(").unwrap());

static RE_DEFAULT_TRUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bDEFAULT\s+true\b").unwrap());
static RE_DEFAULT_FALSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bDEFAULT\s+false\b").unwrap());

// DEFAULT '5'::smallint and friends reduce to the bare literal
static RE_NUMERIC_CAST_DEFAULT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bDEFAULT\s+'?(-?\d+(?:\.\d+)?)'?::[a-z_][a-z0-9_]*(?:\s+precision)?")
        .unwrap()
});

static RE_NEXTVAL_DEFAULT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*DEFAULT\s+nextval\([^)]*\)").unwrap());

// ::text, ::character varying(255), ::timestamp with time zone, ::text[]
static RE_CAST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"::[a-zA-Z_][a-zA-Z0-9_]*(?:\s+(?:varying|precision|with|without|time|zone))*(?:\(\d+(?:,\s*\d+)?\))?(?:\[\])?",
    )
    .unwrap()
});

static RE_DEFAULT_NOW: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bDEFAULT\s+now\s*\(\s*\)").unwrap());

static RE_DEFAULT_TS_OFFSET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(DEFAULT\s+'\d{4}-\d{2}-\d{2}[ T]\d{2}:\d{2}:\d{2}(?:\.\d+)?)[+-]\d{2}(?::?\d{2})?'")
        .unwrap()
});

static RE_TIMESTAMP_NOT_NULL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(timestamp)\s+(NOT NULL)").unwrap());

static RE_LONGTEXT_DEFAULT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(longtext)\s+DEFAULT\s+('(?:[^']|'')*'|[A-Za-z0-9_.]+)").unwrap()
});

static RE_FUNC_DEFAULT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s+DEFAULT\s+((?:[a-z_][a-z0-9_]*\.)?([a-z_][a-z0-9_]*))\s*\([^()]*\)")
        .unwrap()
});

static RE_ANY_ARRAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)=\s*ANY\s*\(\s*\(?\s*ARRAY\[([^\]]*)\]\s*\)?\s*\)").unwrap()
});

static RE_QUOTED_COLUMN: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^(\s*)"([^"]+)""#).unwrap());
static RE_BARE_COLUMN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\s*)([A-Za-z_][A-Za-z0-9_$]*)").unwrap());

impl Converter {
    /// Opening line of `CREATE TABLE <schema.table> (`.
    pub(crate) fn open_create_table(&mut self, line: &str) -> Vec<String> {
        let table = super::RE_CREATE_TABLE
            .captures(line)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();

        let mut out = self.bootstrap_schema(&table);

        let closes = line.trim_end().ends_with(");");
        if !closes {
            self.ctx = StatementContext::CreateTable;
        }

        if self.is_skipped(&table) {
            self.suppressed = !closes;
            self.warn_skipped(&table, "CREATE TABLE");
            return out;
        }

        self.suppressed = false;
        out.push(line.to_string());
        out
    }

    /// A line inside an open CREATE TABLE statement.
    pub(crate) fn create_table_line(&mut self, line: &str) -> Vec<String> {
        let closes = line.trim_end().ends_with(");");
        if closes {
            self.ctx = StatementContext::None;
        }

        if self.suppressed {
            if closes {
                self.suppressed = false;
            }
            return Vec::new();
        }

        if line.trim() == ");" {
            return vec![line.to_string()];
        }

        if RE_CHECK_LINE.is_match(line) {
            return vec![rewrite_check_constraint(line)];
        }

        let mut l = TypeMapper::convert(line);

        l = RE_DEFAULT_TRUE.replace_all(&l, "DEFAULT 1").to_string();
        l = RE_DEFAULT_FALSE.replace_all(&l, "DEFAULT 0").to_string();
        l = RE_NUMERIC_CAST_DEFAULT
            .replace_all(&l, "DEFAULT $1")
            .to_string();
        // Auto-increment is established by a later alteration, never here
        l = RE_NEXTVAL_DEFAULT.replace_all(&l, "").to_string();
        l = RE_CAST.replace_all(&l, "").to_string();

        l = RE_DEFAULT_NOW
            .replace_all(&l, "DEFAULT CURRENT_TIMESTAMP")
            .to_string();
        l = RE_DEFAULT_TS_OFFSET.replace_all(&l, "$1'").to_string();
        if !l.to_uppercase().contains("DEFAULT") {
            // MySQL refuses timestamp columns with neither an explicit nor an
            // implicit default
            l = RE_TIMESTAMP_NOT_NULL
                .replace(&l, "$1 $2 DEFAULT '0000-00-00 00:00:00'")
                .to_string();
        }

        // Text columns cannot carry defaults on the MySQL side
        l = RE_LONGTEXT_DEFAULT.replace_all(&l, "$1").to_string();

        l = l.replace("json_build_object(", "json_object(");
        l = RE_FUNC_DEFAULT
            .replace_all(&l, |caps: &regex::Captures| {
                if caps[2].eq_ignore_ascii_case("json_object") {
                    caps[0].to_string()
                } else {
                    String::new()
                }
            })
            .to_string();

        if !closes {
            l = quote_column_name(&l);
        }

        vec![l]
    }
}

/// Wrap the single bare column-name token of a field-definition line in
/// backticks. CONSTRAINT and PRIMARY KEY lines keep their spelling.
fn quote_column_name(line: &str) -> String {
    let trimmed = line.trim_start();
    if trimmed.starts_with("CONSTRAINT")
        || trimmed.starts_with("PRIMARY KEY")
        || trimmed.starts_with('`')
    {
        return line.to_string();
    }
    if trimmed.starts_with('"') {
        return RE_QUOTED_COLUMN.replace(line, "$1`$2`").to_string();
    }
    RE_BARE_COLUMN.replace(line, "$1`$2`").to_string()
}

/// Rewrite a check-constraint clause into MySQL-compatible form.
///
/// Casts are stripped iteratively until none remain, `= ANY (ARRAY[..])`
/// becomes `IN (..)`, the doubled parenthesis pair that rewrite leaves is
/// collapsed, and any close-parens the passes orphaned are trimmed by
/// comparing total paren counts.
pub(crate) fn rewrite_check_constraint(line: &str) -> String {
    let mut l = line.to_string();

    loop {
        let next = RE_CAST.replace_all(&l, "").to_string();
        if next == l {
            break;
        }
        l = next;
    }

    l = RE_ANY_ARRAY.replace_all(&l, "IN ($1)").to_string();

    if l.contains("((") && l.contains("))") {
        l = l.replacen("((", "(", 1);
        if let Some(pos) = l.rfind("))") {
            l.replace_range(pos..pos + 2, ")");
        }
    }

    let opens = l.matches('(').count();
    let mut closes = l.matches(')').count();
    while closes > opens {
        match l.rfind(')') {
            Some(pos) => {
                l.remove(pos);
                closes -= 1;
            }
            None => break,
        }
    }

    l
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(converter: &mut Converter, input: &str) -> Vec<String> {
        let lines: Vec<&str> = input.lines().collect();
        let mut out = Vec::new();
        for (i, line) in lines.iter().enumerate() {
            out.extend(
                converter
                    .convert_line(line, lines.get(i + 1).copied())
                    .unwrap(),
            );
        }
        out
    }

    #[test]
    fn test_minimal_create_table() {
        let mut converter = Converter::new(&[]);
        let out = feed(
            &mut converter,
            "CREATE TABLE public.widgets (\n    id integer NOT NULL,\n    name character varying(80)\n);",
        );
        assert_eq!(
            out,
            vec![
                "DROP DATABASE IF EXISTS public;",
                "CREATE DATABASE public;",
                "CREATE TABLE public.widgets (",
                "    `id` integer NOT NULL,",
                "    `name` varchar(80)",
                ");",
            ]
        );
    }

    #[test]
    fn test_nextval_default_stripped() {
        let mut converter = Converter::new(&[]);
        let out = feed(
            &mut converter,
            "CREATE TABLE public.widgets (\n    id integer DEFAULT nextval('public.widgets_id_seq'::regclass) NOT NULL\n);",
        );
        assert!(out.iter().any(|l| l.contains("`id` integer NOT NULL")));
        assert!(!out.iter().any(|l| l.contains("nextval")));
    }

    #[test]
    fn test_numeric_cast_default() {
        let mut converter = Converter::new(&[]);
        let out = feed(
            &mut converter,
            "CREATE TABLE public.t (\n    n smallint DEFAULT '5'::smallint\n);",
        );
        assert!(out.iter().any(|l| l.contains("`n` smallint DEFAULT 5")));
    }

    #[test]
    fn test_boolean_with_literal_default() {
        let mut converter = Converter::new(&[]);
        let out = feed(
            &mut converter,
            "CREATE TABLE public.t (\n    active boolean DEFAULT true NOT NULL\n);",
        );
        assert!(out.iter().any(|l| l.contains("`active` bool DEFAULT 1 NOT NULL")));
    }

    #[test]
    fn test_timestamp_default_now() {
        let mut converter = Converter::new(&[]);
        let out = feed(
            &mut converter,
            "CREATE TABLE public.t (\n    created timestamp with time zone DEFAULT now()\n);",
        );
        assert!(out
            .iter()
            .any(|l| l.contains("`created` timestamp DEFAULT CURRENT_TIMESTAMP")));
    }

    #[test]
    fn test_not_null_timestamp_gets_zero_default() {
        let mut converter = Converter::new(&[]);
        let out = feed(
            &mut converter,
            "CREATE TABLE public.t (\n    updated timestamp without time zone NOT NULL\n);",
        );
        assert!(out
            .iter()
            .any(|l| l.contains("`updated` timestamp NOT NULL DEFAULT '0000-00-00 00:00:00'")));
    }

    #[test]
    fn test_timestamp_default_literal_offset_stripped() {
        let mut converter = Converter::new(&[]);
        let out = feed(
            &mut converter,
            "CREATE TABLE public.t (\n    seen timestamp with time zone DEFAULT '2020-01-01 00:00:00+00'\n);",
        );
        assert!(out
            .iter()
            .any(|l| l.contains("DEFAULT '2020-01-01 00:00:00'")));
    }

    #[test]
    fn test_text_default_dropped_not_null_kept() {
        let mut converter = Converter::new(&[]);
        let out = feed(
            &mut converter,
            "CREATE TABLE public.t (\n    body text DEFAULT ''::text NOT NULL\n);",
        );
        assert!(out.iter().any(|l| l.contains("`body` longtext NOT NULL")));
        assert!(!out.iter().any(|l| l.contains("DEFAULT ''")));
    }

    #[test]
    fn test_unsupported_function_default_stripped() {
        let mut converter = Converter::new(&[]);
        let out = feed(
            &mut converter,
            "CREATE TABLE public.t (\n    id uuid DEFAULT gen_random_uuid() NOT NULL\n);",
        );
        assert!(out.iter().any(|l| l.contains("`id` varchar(36) NOT NULL")));
        assert!(!out.iter().any(|l| l.contains("gen_random_uuid")));
    }

    #[test]
    fn test_json_build_object_default_mapped() {
        let mut converter = Converter::new(&[]);
        let out = feed(
            &mut converter,
            "CREATE TABLE public.t (\n    meta jsonb DEFAULT json_build_object('a', 1)\n);",
        );
        assert!(out
            .iter()
            .any(|l| l.contains("`meta` json DEFAULT json_object('a', 1)")));
    }

    #[test]
    fn test_quoted_identifier_becomes_backticked() {
        let mut converter = Converter::new(&[]);
        let out = feed(
            &mut converter,
            "CREATE TABLE public.t (\n    \"order\" integer\n);",
        );
        assert!(out.iter().any(|l| l.contains("`order` integer")));
    }

    #[test]
    fn test_constraint_line_not_column_quoted() {
        let mut converter = Converter::new(&[]);
        let out = feed(
            &mut converter,
            "CREATE TABLE public.t (\n    id integer,\n    CONSTRAINT t_id_check CHECK ((id > 0))\n);",
        );
        assert!(out
            .iter()
            .any(|l| l.trim_start().starts_with("CONSTRAINT t_id_check")));
    }

    #[test]
    fn test_skipped_table_lines_suppressed_until_close() {
        let mut converter = Converter::new(&["public.secrets".to_string()]);
        let out = feed(
            &mut converter,
            "CREATE TABLE public.secrets (\n    id integer\n);\nCREATE TABLE public.t (\n    id integer\n);",
        );
        assert!(!out.iter().any(|l| l.contains("secrets")));
        assert!(out.iter().any(|l| l.contains("CREATE TABLE public.t (")));
    }

    #[test]
    fn test_check_any_array_to_in_list() {
        let line = "    CONSTRAINT t_status_check CHECK (((status)::text = ANY ((ARRAY['new'::character varying, 'done'::character varying])::text[])))";
        let out = rewrite_check_constraint(line);
        assert!(out.contains("IN ('new', 'done')"));
        assert!(!out.contains("ANY"));
        assert!(!out.contains("::"));
        assert_eq!(out.matches('(').count(), out.matches(')').count());
    }

    #[test]
    fn test_check_trailing_paren_repair() {
        let out = rewrite_check_constraint("    CONSTRAINT c CHECK ((n > 0)))");
        assert_eq!(out.matches('(').count(), out.matches(')').count());
    }
}
