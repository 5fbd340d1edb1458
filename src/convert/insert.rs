//! Row-insertion handler.
//!
//! The opening line settles the skip verdict and quotes the column list;
//! every line of the statement runs the literal rewrites. Statement
//! boundaries use single-quote parity: a line ending in `);` only closes the
//! statement when the parity rule holds, because literal values can contain
//! text that merely resembles a terminator.

use super::{Converter, StatementContext};
use once_cell::sync::Lazy;
use regex::Regex;

static RE_INSERT_KEYWORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^INSERT\s+INTO\s+").unwrap());

static RE_INSERT_COLUMNS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(INSERT\s+INTO\s+\S+\s+)\(([^)]*)\)(\s+VALUES\b)").unwrap()
});

// '2024-05-01 12:00:00.123456+02' → '2024-05-01 12:00:00.123456'
static RE_TIMESTAMP_OFFSET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{2}:\d{2}:\d{2}\.\d+)[+-]\d{2}(?::?\d{2})?'").unwrap());

// '\x48656c6c6f' → X'48656c6c6f'
static RE_HEX_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"'\\x([0-9A-Fa-f]*)'").unwrap());

impl Converter {
    /// Opening line of `INSERT INTO <table> (<columns>) VALUES ...`.
    pub(crate) fn open_insert(&mut self, line: &str) -> Vec<String> {
        let table = super::RE_INSERT_INTO
            .captures(line)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();

        let quotes = line.matches('\'').count();
        let closes = line.ends_with(");") && quotes % 2 == 0;
        if !closes {
            self.ctx = StatementContext::Insert;
        }

        let skipped = self.is_skipped(&table);
        self.suppressed = skipped && !closes;
        if skipped {
            self.warn_skipped(&table, "INSERT");
            return Vec::new();
        }

        let mut l = quote_insert_columns(line);
        if self.lenient {
            l = RE_INSERT_KEYWORD.replace(&l, "INSERT IGNORE INTO ").to_string();
        }
        vec![rewrite_insert_literals(&l)]
    }

    /// A line inside an open INSERT statement.
    pub(crate) fn insert_line(&mut self, line: &str) -> Vec<String> {
        let quotes = line.matches('\'').count();
        // The statement opened with an odd cumulative quote count, so an odd
        // count on this line restores even parity at the terminator
        let closes = line.ends_with(");") && quotes % 2 == 1;
        if closes {
            self.ctx = StatementContext::None;
        }

        if self.suppressed {
            if closes {
                self.suppressed = false;
            }
            return Vec::new();
        }

        vec![rewrite_insert_literals(line)]
    }
}

/// Backtick-quote every column name in the insert column list.
fn quote_insert_columns(line: &str) -> String {
    RE_INSERT_COLUMNS
        .replace(line, |caps: &regex::Captures| {
            let columns = caps[2]
                .split(',')
                .map(|c| format!("`{}`", c.trim().replace('"', "")))
                .collect::<Vec<_>>()
                .join(", ");
            format!("{}({}){}", &caps[1], columns, &caps[3])
        })
        .to_string()
}

/// Literal-value rewrites applied to every line of an insertion statement.
pub(crate) fn rewrite_insert_literals(line: &str) -> String {
    let mut l = RE_TIMESTAMP_OFFSET.replace_all(line, "$1'").to_string();
    l = RE_HEX_LITERAL.replace_all(&l, "X'$1'").to_string();
    // MySQL consumes one level of backslash escaping on load
    l = l.replace("\\t", "\\\\t");
    l = l.replace("\\n", "\\\\n");
    // An escaped quote followed by a doubled quote would otherwise cancel out
    l = l.replace("\\'''", "\\\\'''");
    l = l.replace("\\\"", "\\\\\"");
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
    fn test_columns_quoted() {
        let mut converter = Converter::new(&[]);
        let out = feed(
            &mut converter,
            "INSERT INTO public.widgets (id, name) VALUES (1, 'gear');",
        );
        assert_eq!(
            out,
            vec!["INSERT INTO public.widgets (`id`, `name`) VALUES (1, 'gear');"]
        );
    }

    #[test]
    fn test_lenient_keyword() {
        let mut converter = Converter::new(&[]).with_lenient(true);
        let out = feed(
            &mut converter,
            "INSERT INTO public.widgets (id) VALUES (1);",
        );
        assert_eq!(
            out,
            vec!["INSERT IGNORE INTO public.widgets (`id`) VALUES (1);"]
        );
    }

    #[test]
    fn test_skipped_table_insert_suppressed() {
        let mut converter = Converter::new(&["public.widgets".to_string()]);
        let out = feed(
            &mut converter,
            "INSERT INTO public.widgets (id) VALUES (1);",
        );
        assert!(out.is_empty());
    }

    #[test]
    fn test_timestamp_offset_stripped() {
        let out = rewrite_insert_literals(
            "INSERT INTO t (at) VALUES ('2024-05-01 12:00:00.123456+02');",
        );
        assert!(out.contains("'2024-05-01 12:00:00.123456'"));
        assert!(!out.contains("+02"));
    }

    #[test]
    fn test_hex_literal_rewritten() {
        let out = rewrite_insert_literals("VALUES ('\\x48656c6c6f');");
        assert!(out.contains("X'48656c6c6f'"));
    }

    #[test]
    fn test_escaped_whitespace_doubles_backslash() {
        let out = rewrite_insert_literals("VALUES ('a\\tb\\nc');");
        assert!(out.contains("a\\\\tb\\\\nc"));
    }

    #[test]
    fn test_escaped_quote_before_doubled_quote() {
        let out = rewrite_insert_literals("VALUES ('it\\''''s');");
        assert!(out.contains("\\\\'''"));
    }

    #[test]
    fn test_escaped_double_quote() {
        let out = rewrite_insert_literals("VALUES ('say \\\"hi\\\"');");
        assert!(out.contains("\\\\\"hi"));
    }

    #[test]
    fn test_multiline_insert_closes_at_true_terminator() {
        let mut converter = Converter::new(&[]);
        // the literal spans three lines and contains a ");"-looking sequence
        let out = feed(
            &mut converter,
            "INSERT INTO public.notes (id, body) VALUES (1, 'first line\nlooks closed );\nreal end');\nINSERT INTO public.notes (id, body) VALUES (2, 'plain');",
        );
        assert_eq!(out.len(), 4);
        assert!(out[0].starts_with("INSERT INTO public.notes"));
        assert_eq!(out[1], "looks closed );");
        assert_eq!(out[2], "real end');");
        assert!(out[3].contains("VALUES (2, 'plain');"));
    }

    #[test]
    fn test_multiline_skipped_insert_consumes_whole_statement() {
        let mut converter = Converter::new(&["public.notes".to_string()]);
        let out = feed(
            &mut converter,
            "INSERT INTO public.notes (id, body) VALUES (1, 'first\nsecond');\nCREATE INDEX i ON public.other (a);",
        );
        assert_eq!(out, vec!["CREATE INDEX i ON public.other (a);"]);
    }
}
