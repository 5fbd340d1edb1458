//! Diagnostics side channel for the conversion run.
//!
//! Every suppressed or unrecognized input line produces one warning. Warnings
//! go to stderr only, never into the converted SQL stream.

/// Warning types that can occur during conversion
#[derive(Debug, Clone, PartialEq)]
pub enum ConvertWarning {
    /// A statement targeting an excluded table was suppressed
    SkippedTable {
        table: String,
        statement: String,
    },
    /// A recognized statement with no MySQL equivalent was dropped
    SkippedStatement {
        reason: String,
        statement_preview: String,
    },
    /// Line matched no known statement opener and was dropped
    UnrecognizedLine { preview: String },
    /// Construct that cannot be translated faithfully
    UnsupportedFeature {
        feature: String,
        suggestion: Option<String>,
    },
}

impl std::fmt::Display for ConvertWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConvertWarning::SkippedTable { table, statement } => {
                write!(f, "Skipped {} for excluded table '{}'", statement, table)
            }
            ConvertWarning::SkippedStatement {
                reason,
                statement_preview,
            } => {
                write!(f, "Skipped: {} ({})", reason, statement_preview)
            }
            ConvertWarning::UnrecognizedLine { preview } => {
                if preview.is_empty() {
                    write!(f, "Dropped blank line")
                } else {
                    write!(f, "Dropped unrecognized line: {}", preview)
                }
            }
            ConvertWarning::UnsupportedFeature {
                feature,
                suggestion,
            } => {
                write!(f, "Unsupported feature: {}", feature)?;
                if let Some(s) = suggestion {
                    write!(f, " ({})", s)?;
                }
                Ok(())
            }
        }
    }
}

/// Collects warnings during conversion
#[derive(Debug, Default)]
pub struct WarningCollector {
    warnings: Vec<ConvertWarning>,
    max_warnings: usize,
}

impl WarningCollector {
    pub fn new() -> Self {
        Self {
            warnings: Vec::new(),
            max_warnings: 100, // Limit to avoid memory issues
        }
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            warnings: Vec::new(),
            max_warnings: limit,
        }
    }

    /// Add a warning
    pub fn add(&mut self, warning: ConvertWarning) {
        if self.warnings.len() < self.max_warnings {
            // Deduplicate similar warnings
            if !self.warnings.iter().any(|w| Self::is_similar(w, &warning)) {
                self.warnings.push(warning);
            }
        }
    }

    /// Check if two warnings are similar enough to deduplicate
    fn is_similar(a: &ConvertWarning, b: &ConvertWarning) -> bool {
        match (a, b) {
            (
                ConvertWarning::SkippedTable {
                    table: t1,
                    statement: s1,
                },
                ConvertWarning::SkippedTable {
                    table: t2,
                    statement: s2,
                },
            ) => t1 == t2 && s1 == s2,
            (
                ConvertWarning::UnrecognizedLine { preview: p1 },
                ConvertWarning::UnrecognizedLine { preview: p2 },
            ) => p1 == p2,
            (
                ConvertWarning::UnsupportedFeature { feature: f1, .. },
                ConvertWarning::UnsupportedFeature { feature: f2, .. },
            ) => f1 == f2,
            _ => false,
        }
    }

    /// Get all collected warnings
    pub fn warnings(&self) -> &[ConvertWarning] {
        &self.warnings
    }

    /// Check if any warnings were collected
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Get warning count
    pub fn count(&self) -> usize {
        self.warnings.len()
    }

    /// Print summary of warnings
    pub fn print_summary(&self) {
        if self.warnings.is_empty() {
            return;
        }

        eprintln!("\nConversion warnings ({}):", self.warnings.len());
        for warning in &self.warnings {
            eprintln!("  ⚠ {}", warning);
        }

        if self.warnings.len() >= self.max_warnings {
            eprintln!("  ... (additional warnings truncated)");
        }
    }
}
