//! Statement builder for the column probe and `UNLOAD` commands.
//!
//! Pure text transforms: nothing here talks to the warehouse, and option
//! combinations are not validated (the warehouse rejects invalid ones).
//!
//! Generated `UNLOAD` layout:
//!
//! ```text
//! UNLOAD ('<escaped-query>') TO '<uri>' ACCESS_KEY_ID '<id>' SECRET_ACCESS_KEY '<secret>'
//!     [MANIFEST] [DELIMITER '<d>'] [FIXEDWIDTH '<spec>'] [ENCRYPTED] [GZIP] [ADDQUOTES]
//!     [NULL '<s>'] [ESCAPE] [ALLOWOVERWRITE] PARALLEL {ON|OFF} [MAXFILESIZE <size>]
//! ```

use crate::credential::Credential;
use serde::{Deserialize, Serialize};

/// Optional clauses of an `UNLOAD` statement
///
/// Each field maps to at most one clause; unset fields emit nothing, except
/// `parallel` which is always rendered as `PARALLEL ON` or `PARALLEL OFF`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnloadOptions {
    /// Write a manifest object listing the partitions
    pub manifest: bool,
    /// Field delimiter
    pub delimiter: Option<char>,
    /// Fixed-width column specification (e.g. `"0:3,1:10"`)
    pub fixed_width: Option<String>,
    /// Client-side encrypt the partitions
    pub encrypted: bool,
    /// Gzip each partition
    pub gzip: bool,
    /// Quote every field
    pub add_quotes: bool,
    /// Representation of NULL values
    pub null_string: Option<String>,
    /// Escape delimiters, quotes and newlines in fields
    pub escape: bool,
    /// Overwrite existing objects under the destination prefix
    pub allow_overwrite: bool,
    /// Write one partition per slice (`true`) or a single serial stream
    pub parallel: bool,
    /// Maximum partition size, rendered verbatim (e.g. `"1GB"`)
    pub max_file_size: Option<String>,
}

impl Default for UnloadOptions {
    fn default() -> Self {
        Self {
            manifest: false,
            delimiter: None,
            fixed_width: None,
            encrypted: false,
            gzip: false,
            add_quotes: false,
            null_string: None,
            escape: false,
            allow_overwrite: false,
            parallel: true,
            max_file_size: None,
        }
    }
}

impl UnloadOptions {
    /// Standing policy of the export pipeline: gzip partitions, parallel write,
    /// comma-delimited, quoted fields, NULL as the empty string, overwrite allowed.
    pub fn export_policy() -> Self {
        Self::default()
            .gzip(true)
            .parallel(true)
            .delimiter(',')
            .null_string("")
            .add_quotes(true)
            .allow_overwrite(true)
    }

    /// Set whether a manifest is written
    pub fn manifest(mut self, enabled: bool) -> Self {
        self.manifest = enabled;
        self
    }

    /// Set the field delimiter
    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    /// Set the fixed-width specification
    pub fn fixed_width(mut self, spec: &str) -> Self {
        self.fixed_width = Some(spec.to_string());
        self
    }

    /// Set whether partitions are encrypted
    pub fn encrypted(mut self, enabled: bool) -> Self {
        self.encrypted = enabled;
        self
    }

    /// Set whether partitions are gzip-compressed
    pub fn gzip(mut self, enabled: bool) -> Self {
        self.gzip = enabled;
        self
    }

    /// Set whether fields are quoted
    pub fn add_quotes(mut self, enabled: bool) -> Self {
        self.add_quotes = enabled;
        self
    }

    /// Set the NULL representation
    pub fn null_string(mut self, value: &str) -> Self {
        self.null_string = Some(value.to_string());
        self
    }

    /// Set whether special characters are escaped
    pub fn escape(mut self, enabled: bool) -> Self {
        self.escape = enabled;
        self
    }

    /// Set whether existing objects may be overwritten
    pub fn allow_overwrite(mut self, enabled: bool) -> Self {
        self.allow_overwrite = enabled;
        self
    }

    /// Set parallel (multi-partition) output
    pub fn parallel(mut self, enabled: bool) -> Self {
        self.parallel = enabled;
        self
    }

    /// Set the maximum partition size
    pub fn max_file_size(mut self, size: &str) -> Self {
        self.max_file_size = Some(size.to_string());
        self
    }

    /// Render the option clauses in declaration order
    pub fn clauses(&self) -> Vec<String> {
        let mut clauses = Vec::new();

        if self.manifest {
            clauses.push("MANIFEST".to_string());
        }
        if let Some(delimiter) = self.delimiter {
            clauses.push(format!("DELIMITER '{}'", delimiter));
        }
        if let Some(ref spec) = self.fixed_width {
            clauses.push(format!("FIXEDWIDTH '{}'", spec));
        }
        if self.encrypted {
            clauses.push("ENCRYPTED".to_string());
        }
        if self.gzip {
            clauses.push("GZIP".to_string());
        }
        if self.add_quotes {
            clauses.push("ADDQUOTES".to_string());
        }
        if let Some(ref null) = self.null_string {
            clauses.push(format!("NULL '{}'", null));
        }
        if self.escape {
            clauses.push("ESCAPE".to_string());
        }
        if self.allow_overwrite {
            clauses.push("ALLOWOVERWRITE".to_string());
        }
        // Always present: callers rely on knowing whether output is partitioned.
        clauses.push(format!(
            "PARALLEL {}",
            if self.parallel { "ON" } else { "OFF" }
        ));
        if let Some(ref size) = self.max_file_size {
            clauses.push(format!("MAXFILESIZE {}", size));
        }

        clauses
    }
}

/// Wrap `query` so it yields its column list without producing rows
pub fn column_probe_statement(query: &str) -> String {
    format!("WITH query AS ({}) SELECT * FROM query LIMIT 0", query)
}

/// Escape `query` for use inside a single-quoted string literal
///
/// Every backslash and single quote is prefixed with a backslash.
pub fn escape_query(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for c in query.chars() {
        if c == '\\' || c == '\'' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Build the `UNLOAD` statement writing the result of `query` under `destination_uri`
pub fn unload_statement(
    query: &str,
    destination_uri: &str,
    credential: &Credential,
    options: &UnloadOptions,
) -> String {
    let mut parts = Vec::with_capacity(16);
    parts.push(format!(
        "UNLOAD ('{}') TO '{}'",
        escape_query(query),
        destination_uri
    ));
    parts.extend(
        credential
            .clauses()
            .iter()
            .map(|(keyword, value)| format!("{} '{}'", keyword, value)),
    );
    parts.extend(options.clauses());

    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential() -> Credential {
        Credential::new("test_access_key", "test_secret_key")
    }

    #[test]
    fn test_column_probe_statement() {
        assert_eq!(
            column_probe_statement("SELECT * FROM some_table"),
            "WITH query AS (SELECT * FROM some_table) SELECT * FROM query LIMIT 0"
        );
    }

    #[test]
    fn test_escape_query_quotes() {
        assert_eq!(
            escape_query("SELECT * FROM some_table WHERE date_column >= '2018-01-01'"),
            "SELECT * FROM some_table WHERE date_column >= \\'2018-01-01\\'"
        );
    }

    #[test]
    fn test_escape_query_backslashes_and_quotes() {
        assert_eq!(escape_query(r"a\b'c"), r"a\\b\'c");
        assert_eq!(escape_query(r"\\"), r"\\\\");
        assert_eq!(escape_query("''"), r"\'\'");
    }

    #[test]
    fn test_escape_query_leaves_other_characters() {
        let query = "SELECT \"col\", 'x' || E'\\n' FROM t -- naïve ünïcode";
        let escaped = escape_query(query);
        let unescaped: String = {
            let mut out = String::new();
            let mut chars = escaped.chars();
            while let Some(c) = chars.next() {
                if c == '\\' {
                    let next = chars.next().unwrap_or_default();
                    assert!(next == '\\' || next == '\'', "unexpected escape of {next:?}");
                    out.push(next);
                } else {
                    out.push(c);
                }
            }
            out
        };
        assert_eq!(unescaped, query);
        let specials = query.chars().filter(|c| *c == '\\' || *c == '\'').count();
        assert_eq!(escaped.chars().count(), query.chars().count() + specials);
    }

    #[test]
    fn test_unload_with_default_options() {
        let sql = unload_statement(
            "SELECT * FROM some_table WHERE date_column >= '2018-01-01'",
            "s3://some-bucket/path/to/",
            &credential(),
            &UnloadOptions::default(),
        );

        let expected = [
            "UNLOAD ('SELECT * FROM some_table WHERE date_column >= \\'2018-01-01\\'')",
            "TO 's3://some-bucket/path/to/'",
            "ACCESS_KEY_ID 'test_access_key'",
            "SECRET_ACCESS_KEY 'test_secret_key'",
            "PARALLEL ON",
        ]
        .join(" ");
        assert_eq!(sql, expected);
    }

    #[test]
    fn test_unload_with_every_option() {
        let options = UnloadOptions::default()
            .manifest(true)
            .delimiter(',')
            .fixed_width("0:3,1:10")
            .encrypted(true)
            .gzip(true)
            .add_quotes(true)
            .null_string("")
            .escape(true)
            .allow_overwrite(true)
            .parallel(true)
            .max_file_size("1GB");

        let sql = unload_statement(
            "SELECT * FROM some_table",
            "s3://some-bucket/path/to/",
            &credential(),
            &options,
        );

        let expected = [
            "UNLOAD ('SELECT * FROM some_table')",
            "TO 's3://some-bucket/path/to/'",
            "ACCESS_KEY_ID 'test_access_key'",
            "SECRET_ACCESS_KEY 'test_secret_key'",
            "MANIFEST",
            "DELIMITER ','",
            "FIXEDWIDTH '0:3,1:10'",
            "ENCRYPTED",
            "GZIP",
            "ADDQUOTES",
            "NULL ''",
            "ESCAPE",
            "ALLOWOVERWRITE",
            "PARALLEL ON",
            "MAXFILESIZE 1GB",
        ]
        .join(" ");
        assert_eq!(sql, expected);
    }

    #[test]
    fn test_parallel_off_is_rendered() {
        let clauses = UnloadOptions::default().parallel(false).clauses();
        assert_eq!(clauses, vec!["PARALLEL OFF".to_string()]);
    }

    #[test]
    fn test_clauses_follow_declaration_order_for_every_subset() {
        const ORDER: [&str; 11] = [
            "MANIFEST",
            "DELIMITER",
            "FIXEDWIDTH",
            "ENCRYPTED",
            "GZIP",
            "ADDQUOTES",
            "NULL",
            "ESCAPE",
            "ALLOWOVERWRITE",
            "PARALLEL",
            "MAXFILESIZE",
        ];

        // Bits 0..=9 toggle every option except PARALLEL, which is always present.
        for mask in 0u32..(1 << 10) {
            let bit = |i: u32| mask & (1 << i) != 0;
            let mut options = UnloadOptions::default().parallel(bit(9));
            if bit(0) {
                options = options.manifest(true);
            }
            if bit(1) {
                options = options.delimiter('|');
            }
            if bit(2) {
                options = options.fixed_width("0:1");
            }
            if bit(3) {
                options = options.encrypted(true);
            }
            if bit(4) {
                options = options.gzip(true);
            }
            if bit(5) {
                options = options.add_quotes(true);
            }
            if bit(6) {
                options = options.null_string("\\N");
            }
            if bit(7) {
                options = options.escape(true);
            }
            if bit(8) {
                options = options.allow_overwrite(true).max_file_size("6GB");
            }

            let keywords: Vec<String> = options
                .clauses()
                .iter()
                .map(|c| c.split(' ').next().unwrap_or_default().to_string())
                .collect();

            let expected_count = (0..8).filter(|i| bit(*i)).count()
                + if bit(8) { 2 } else { 0 }
                + 1;
            assert_eq!(keywords.len(), expected_count, "mask {mask:#b}");
            assert_eq!(
                keywords.iter().filter(|k| k.as_str() == "PARALLEL").count(),
                1
            );

            let positions: Vec<usize> = keywords
                .iter()
                .map(|k| ORDER.iter().position(|o| o == k).unwrap_or(usize::MAX))
                .collect();
            assert!(
                positions.windows(2).all(|w| w[0] < w[1]),
                "clauses out of order for mask {mask:#b}: {keywords:?}"
            );
        }
    }

    #[test]
    fn test_export_policy_clauses() {
        assert_eq!(
            UnloadOptions::export_policy().clauses(),
            vec![
                "DELIMITER ','",
                "GZIP",
                "ADDQUOTES",
                "NULL ''",
                "ALLOWOVERWRITE",
                "PARALLEL ON",
            ]
        );
    }
}
