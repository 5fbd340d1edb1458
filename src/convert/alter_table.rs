//! Table-alteration handler.
//!
//! Ownership assignments are dropped, constraint qualifiers are massaged
//! into MySQL spelling, and sequence-default alterations are replaced by
//! deferred auto-increment statements. A foreign-key alteration whose
//! REFERENCES target is excluded is suppressed along with its opening line,
//! which is what the dispatcher's lookahead exists for.

use super::{Converter, StatementContext};
use once_cell::sync::Lazy;
use regex::Regex;

static RE_OWNER_TO: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bOWNER\s+TO\b").unwrap());

static RE_ALTER_ONLY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^ALTER\s+TABLE\s+ONLY\s+").unwrap());

static RE_DEFERRABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s+(?:NOT\s+)?DEFERRABLE(?:\s+INITIALLY\s+(?:DEFERRED|IMMEDIATE))?").unwrap()
});

static RE_SET_DEFAULT_NEXTVAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^ALTER\s+TABLE\s+(\S+)\s+ALTER\s+COLUMN\s+(\S+)\s+SET\s+DEFAULT\s+nextval\(")
        .unwrap()
});

static RE_REFERENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bREFERENCES\s+([^\s(;]+)").unwrap());

static RE_KEY_COLUMNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(UNIQUE|PRIMARY KEY)\s*\(([^)]*)\)").unwrap());

impl Converter {
    /// Opening line of an ALTER TABLE statement.
    pub(crate) fn open_alter_table(&mut self, line: &str, lookahead: Option<&str>) -> Vec<String> {
        let table = super::RE_ALTER_TABLE
            .captures(line)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();

        if RE_OWNER_TO.is_match(line) {
            self.warnings.add(super::ConvertWarning::SkippedStatement {
                reason: "ownership assignment".to_string(),
                statement_preview: line.trim().chars().take(60).collect(),
            });
            return Vec::new();
        }

        let l = RE_ALTER_ONLY.replace(line, "ALTER TABLE ").to_string();

        if let Some(caps) = RE_SET_DEFAULT_NEXTVAL.captures(&l) {
            // MySQL can only mark a column auto-incrementing once it is part
            // of a key, which the dump establishes in a later alteration, so
            // this statement moves to the deferred buffer.
            if self.is_skipped(&table) {
                self.warn_skipped(&table, "ALTER TABLE");
            } else {
                let target = caps[1].replace('"', "");
                let column = caps[2].replace('"', "");
                self.push_deferred(format!(
                    "ALTER TABLE {} MODIFY {} int NOT NULL AUTO_INCREMENT;",
                    target, column
                ));
            }
            return Vec::new();
        }

        let closes = alter_closes(&l);
        let mut skipped = self.is_skipped(&table);
        if !skipped {
            // A foreign key cannot point at a dropped table
            if let Some(target) = references_target(&l) {
                skipped = self.is_skipped(&target);
            }
        }
        if !skipped && !closes {
            if let Some(next) = lookahead {
                if let Some(target) = references_target(next) {
                    skipped = self.is_skipped(&target);
                }
            }
        }

        if !closes {
            self.ctx = StatementContext::AlterTable;
        }
        self.suppressed = skipped && !closes;

        if skipped {
            self.warn_skipped(&table, "ALTER TABLE");
            return Vec::new();
        }

        vec![massage_constraint(l)]
    }

    /// A line inside an open ALTER TABLE statement.
    pub(crate) fn alter_table_line(&mut self, line: &str) -> Vec<String> {
        let closes = alter_closes(line);
        if closes {
            self.ctx = StatementContext::None;
        }

        if !self.suppressed {
            if let Some(target) = references_target(line) {
                if self.is_skipped(&target) {
                    self.suppressed = true;
                    self.warn_skipped(&target, "ALTER TABLE");
                }
            }
        }

        if self.suppressed {
            if closes {
                self.suppressed = false;
            }
            return Vec::new();
        }

        vec![massage_constraint(line.to_string())]
    }
}

/// ALTER statements close on a trailing terminator. Foreign-key constraint
/// lines occasionally carry a trailing space after the terminator (a known
/// pg_dump formatting quirk) and still count as closed.
fn alter_closes(line: &str) -> bool {
    line.ends_with(';') || (line.contains("FOREIGN KEY") && line.trim_end().ends_with(';'))
}

fn references_target(line: &str) -> Option<String> {
    RE_REFERENCES
        .captures(line)
        .map(|caps| caps[1].replace('"', ""))
}

/// Strip deferred-constraint and index-method qualifiers, backtick-quote
/// UNIQUE / PRIMARY KEY column lists.
fn massage_constraint(line: String) -> String {
    let mut l = RE_DEFERRABLE.replace_all(&line, "").to_string();
    l = super::RE_INDEX_METHOD.replace_all(&l, "").to_string();
    l = RE_KEY_COLUMNS
        .replace_all(&l, |caps: &regex::Captures| {
            let columns = caps[2]
                .split(',')
                .map(|c| format!("`{}`", c.trim().replace('"', "")))
                .collect::<Vec<_>>()
                .join(", ");
            format!("{} ({})", &caps[1], columns)
        })
        .to_string();
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
    fn test_owner_to_dropped() {
        let mut converter = Converter::new(&[]);
        let out = feed(&mut converter, "ALTER TABLE public.widgets OWNER TO admin;");
        assert!(out.is_empty());
    }

    #[test]
    fn test_alter_only_normalized() {
        let mut converter = Converter::new(&[]);
        let out = feed(
            &mut converter,
            "ALTER TABLE ONLY public.widgets\n    ADD CONSTRAINT widgets_pkey PRIMARY KEY (id);",
        );
        assert_eq!(
            out,
            vec![
                "ALTER TABLE public.widgets",
                "    ADD CONSTRAINT widgets_pkey PRIMARY KEY (`id`);",
            ]
        );
    }

    #[test]
    fn test_unique_columns_quoted() {
        let mut converter = Converter::new(&[]);
        let out = feed(
            &mut converter,
            "ALTER TABLE ONLY public.widgets\n    ADD CONSTRAINT widgets_name_key UNIQUE (name, version);",
        );
        assert!(out
            .iter()
            .any(|l| l.contains("UNIQUE (`name`, `version`)")));
    }

    #[test]
    fn test_deferrable_qualifier_removed() {
        let mut converter = Converter::new(&[]);
        let out = feed(
            &mut converter,
            "ALTER TABLE ONLY public.orders\n    ADD CONSTRAINT fk FOREIGN KEY (widget_id) REFERENCES public.widgets(id) DEFERRABLE INITIALLY DEFERRED;",
        );
        assert!(!out.iter().any(|l| l.contains("DEFERRABLE")));
        assert!(out.iter().any(|l| l.contains("REFERENCES public.widgets(id)")));
    }

    #[test]
    fn test_sequence_default_moves_to_deferred_buffer() {
        let mut converter = Converter::new(&[]);
        let out = feed(
            &mut converter,
            "ALTER TABLE ONLY public.widgets ALTER COLUMN id SET DEFAULT nextval('public.widgets_id_seq'::regclass);",
        );
        assert!(out.is_empty());
        let deferred = converter.finish();
        assert_eq!(
            deferred,
            vec!["ALTER TABLE public.widgets MODIFY id int NOT NULL AUTO_INCREMENT;"]
        );
    }

    #[test]
    fn test_sequence_default_skipped_table_defers_nothing() {
        let mut converter = Converter::new(&["public.widgets".to_string()]);
        let out = feed(
            &mut converter,
            "ALTER TABLE ONLY public.widgets ALTER COLUMN id SET DEFAULT nextval('public.widgets_id_seq'::regclass);",
        );
        assert!(out.is_empty());
        assert!(converter.finish().is_empty());
    }

    #[test]
    fn test_skipped_table_alteration_suppressed() {
        let mut converter = Converter::new(&["public.secrets".to_string()]);
        let out = feed(
            &mut converter,
            "ALTER TABLE ONLY public.secrets\n    ADD CONSTRAINT secrets_pkey PRIMARY KEY (id);",
        );
        assert!(out.is_empty());
    }

    #[test]
    fn test_fk_referencing_skipped_table_suppressed() {
        // public.orders is not excluded, but its FK points at an excluded
        // table, so the whole statement (both lines) must vanish
        let mut converter = Converter::new(&["public.widgets".to_string()]);
        let out = feed(
            &mut converter,
            "ALTER TABLE ONLY public.orders\n    ADD CONSTRAINT fk FOREIGN KEY (widget_id) REFERENCES public.widgets(id);",
        );
        assert!(out.is_empty());
    }

    #[test]
    fn test_fk_trailing_space_terminator_closes() {
        let mut converter = Converter::new(&[]);
        let out = feed(
            &mut converter,
            "ALTER TABLE ONLY public.orders\n    ADD CONSTRAINT fk FOREIGN KEY (widget_id) REFERENCES public.widgets(id); \nALTER TABLE public.other OWNER TO admin;",
        );
        assert!(out.iter().any(|l| l.contains("FOREIGN KEY")));
        // the OWNER TO line was dispatched as a fresh statement, not an
        // ALTER continuation
        assert!(!out.iter().any(|l| l.contains("OWNER")));
    }

    #[test]
    fn test_index_method_qualifier_removed() {
        let mut converter = Converter::new(&[]);
        let out = feed(
            &mut converter,
            "ALTER TABLE ONLY public.widgets\n    ADD CONSTRAINT widgets_pkey PRIMARY KEY (id) USING btree;",
        );
        assert!(!out.iter().any(|l| l.contains("USING")));
    }
}
