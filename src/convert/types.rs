//! Column type mapping from PostgreSQL to MySQL.
//!
//! Applied to every line of a CREATE TABLE statement. Only the enumerated
//! subset is translated; anything else passes through unchanged and may fail
//! on the MySQL side.

use once_cell::sync::Lazy;
use regex::Regex;

/// Type mapper for PostgreSQL column definitions
pub struct TypeMapper;

impl TypeMapper {
    /// Convert all recognized column types in a single line.
    ///
    /// Rule order matters: `character varying` variants must be consumed
    /// before bare `character`, array forms before their scalar forms, and
    /// unsigned integer spellings before the serial rules.
    pub fn convert(line: &str) -> String {
        let mut result = line.to_string();

        // Unsigned integer spellings normalize to "<base type> UNSIGNED"
        result = RE_SMALLINT_UNSIGNED
            .replace_all(&result, "smallint UNSIGNED")
            .to_string();
        result = RE_BIGINT_UNSIGNED
            .replace_all(&result, "bigint UNSIGNED")
            .to_string();
        result = RE_INT_UNSIGNED
            .replace_all(&result, "int UNSIGNED")
            .to_string();

        // Self-incrementing integer columns
        result = RE_BIGSERIAL
            .replace_all(&result, "bigint AUTO_INCREMENT")
            .to_string();
        result = RE_SERIAL
            .replace_all(&result, "int AUTO_INCREMENT")
            .to_string();

        result = RE_UUID.replace_all(&result, "varchar(36)").to_string();
        result = RE_BYTEA.replace_all(&result, "BLOB").to_string();
        result = RE_BOOLEAN.replace_all(&result, "bool").to_string();
        result = RE_JSONB.replace_all(&result, "json").to_string();

        // Extension types collapse to their nearest plain-text equivalent
        result = RE_CITEXT.replace_all(&result, "longtext").to_string();
        result = RE_HSTORE.replace_all(&result, "longtext").to_string();

        // Array columns have no MySQL shape; store them as text
        result = RE_TEXT_ARRAY.replace_all(&result, "longtext").to_string();
        result = RE_VARCHAR_ARRAY.replace_all(&result, "longtext").to_string();
        result = RE_CHAR_ARRAY.replace_all(&result, "longtext").to_string();

        // Character types, longest spelling first
        result = RE_VARCHAR_N.replace_all(&result, "varchar($1)").to_string();
        result = RE_VARCHAR.replace_all(&result, "longtext").to_string();
        result = RE_CHAR_N.replace_all(&result, "char($1)").to_string();
        result = RE_CHAR.replace_all(&result, "char(1)").to_string();
        result = RE_TEXT.replace_all(&result, "longtext").to_string();

        // Network address and currency types
        result = RE_INET.replace_all(&result, "varchar(43)").to_string();
        result = RE_CIDR.replace_all(&result, "varchar(43)").to_string();
        result = RE_MACADDR.replace_all(&result, "varchar(17)").to_string();
        result = RE_MONEY.replace_all(&result, "decimal(19,2)").to_string();

        result = RE_DOUBLE_PRECISION.replace_all(&result, "double").to_string();

        // Time zone qualifiers have no MySQL equivalent
        result = RE_TIMESTAMP_TZ.replace_all(&result, "timestamp").to_string();
        result = RE_TIME_TZ.replace_all(&result, "time").to_string();

        result
    }
}

static RE_SMALLINT_UNSIGNED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:int2|smallint)\s+unsigned\b").unwrap());
static RE_BIGINT_UNSIGNED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:int8|bigint)\s+unsigned\b").unwrap());
static RE_INT_UNSIGNED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:int4|integer|int)\s+unsigned\b").unwrap());

static RE_BIGSERIAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bbigserial\b").unwrap());
static RE_SERIAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bserial\b").unwrap());

static RE_UUID: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\buuid\b").unwrap());
static RE_BYTEA: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bbytea\b").unwrap());
static RE_BOOLEAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bboolean\b").unwrap());
static RE_JSONB: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bjsonb\b").unwrap());

static RE_CITEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:public\.)?citext\b").unwrap());
static RE_HSTORE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:public\.)?hstore\b").unwrap());

static RE_TEXT_ARRAY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\btext\s*\[\]").unwrap());
static RE_VARCHAR_ARRAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bcharacter\s+varying(?:\(\d+\))?\s*\[\]").unwrap());
static RE_CHAR_ARRAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bcharacter(?:\(\d+\))?\s*\[\]").unwrap());

static RE_VARCHAR_N: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bcharacter\s+varying\((\d+)\)").unwrap());
static RE_VARCHAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bcharacter\s+varying\b").unwrap());
static RE_CHAR_N: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bcharacter\((\d+)\)").unwrap());
static RE_CHAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bcharacter\b").unwrap());
static RE_TEXT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\btext\b").unwrap());

static RE_INET: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\binet\b").unwrap());
static RE_CIDR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bcidr\b").unwrap());
static RE_MACADDR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bmacaddr\b").unwrap());
static RE_MONEY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bmoney\b").unwrap());

static RE_DOUBLE_PRECISION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bdouble\s+precision\b").unwrap());

static RE_TIMESTAMP_TZ: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\btimestamp(?:\(\d+\))?\s+with(?:out)?\s+time\s+zone\b").unwrap()
});
static RE_TIME_TZ: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\btime(?:\(\d+\))?\s+with(?:out)?\s+time\s+zone\b").unwrap()
});
