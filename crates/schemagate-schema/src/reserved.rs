//! Reserved-word registry
//!
//! A flat, case-insensitive set of identifiers that collide with a keyword in
//! at least one downstream consumer: the Rust compiler (generated models) and
//! the SQL dialects the schema is deployed to or exported into. Dialect
//! provenance is not tracked.

use std::collections::HashSet;
use std::sync::LazyLock;

/// Rust strict, reserved and weak keywords
const RUST_KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
    "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move",
    "mut", "pub", "ref", "return", "self", "static", "struct", "super", "trait", "true", "type",
    "unsafe", "use", "where", "while", "abstract", "become", "box", "do", "final", "gen",
    "macro", "override", "priv", "try", "typeof", "unsized", "virtual", "yield", "union",
    "macro_rules", "raw",
];

/// SQL:2016 reserved words and core DDL/DML keywords shared by most dialects
const SQL_STANDARD_KEYWORDS: &[&str] = &[
    "abs", "absolute", "action", "add", "all", "allocate", "alter", "and", "any", "are",
    "array", "as", "asc", "asensitive", "assertion", "asymmetric", "at", "atomic",
    "authorization", "avg", "begin", "between", "bigint", "binary", "bit", "blob", "boolean",
    "both", "by", "call", "called", "cascade", "cascaded", "case", "cast", "catalog", "char",
    "character", "check", "clob", "close", "coalesce", "collate", "collation", "column",
    "commit", "condition", "connect", "connection", "constraint", "constraints", "contains",
    "continue", "convert", "corresponding", "count", "create", "cross", "cube", "current",
    "current_date", "current_path", "current_role", "current_schema", "current_time",
    "current_timestamp", "current_user", "cursor", "cycle", "date", "day", "deallocate", "dec",
    "decimal", "declare", "default", "deferrable", "deferred", "delete", "deref", "desc",
    "describe", "descriptor", "deterministic", "diagnostics", "disconnect", "distinct", "do",
    "domain", "double", "drop", "dynamic", "each", "element", "else", "elseif", "end",
    "escape", "except", "exception", "exec", "execute", "exists", "exit", "external",
    "extract", "false", "fetch", "filter", "first", "float", "for", "foreign", "found", "free",
    "from", "full", "function", "get", "global", "go", "goto", "grant", "group", "grouping",
    "handler", "having", "hold", "hour", "identity", "if", "immediate", "in", "indicator",
    "initially", "inner", "inout", "input", "insensitive", "insert", "int", "integer",
    "intersect", "interval", "into", "is", "isolation", "iterate", "join", "key", "language",
    "large", "last", "lateral", "leading", "leave", "left", "level", "like", "limit", "local",
    "localtime", "localtimestamp", "loop", "lower", "match", "max", "member", "merge",
    "method", "min", "minute", "modifies", "module", "month", "multiset", "names", "national",
    "natural", "nchar", "nclob", "new", "next", "no", "none", "not", "null", "nullif",
    "numeric", "of", "offset", "old", "on", "only", "open", "option", "or", "order", "out",
    "outer", "output", "over", "overlaps", "overlay", "pad", "parameter", "partial",
    "partition", "position", "precision", "prepare", "preserve", "primary", "prior",
    "privileges", "procedure", "public", "range", "read", "reads", "real", "recursive", "ref",
    "references", "referencing", "relative", "release", "repeat", "resignal", "restrict",
    "return", "returns", "revoke", "right", "role", "rollback", "rollup", "routine", "row",
    "rows", "savepoint", "schema", "scope", "scroll", "search", "second", "section", "select",
    "sensitive", "session", "session_user", "set", "sets", "signal", "similar", "size",
    "smallint", "some", "space", "specific", "specifictype", "sql", "sqlcode", "sqlerror",
    "sqlexception", "sqlstate", "sqlwarning", "start", "state", "static", "submultiset",
    "substring", "sum", "symmetric", "system", "system_user", "table", "tablesample",
    "temporary", "then", "time", "timestamp", "timezone_hour", "timezone_minute", "to",
    "trailing", "transaction", "translate", "translation", "treat", "trigger", "trim", "true",
    "truncate", "undo", "union", "unique", "unknown", "unnest", "until", "update", "upper",
    "usage", "user", "using", "value", "values", "varchar", "varying", "view", "when",
    "whenever", "where", "while", "window", "with", "within", "without", "work", "write",
    "year", "zone",
];

/// PostgreSQL reserved and type keywords
const POSTGRES_KEYWORDS: &[&str] = &[
    "analyse", "analyze", "asymmetric", "bigserial", "bytea", "cidr", "concurrently", "do",
    "freeze", "ilike", "inet", "isnull", "json", "jsonb", "macaddr", "money", "notnull",
    "oid", "placing", "returning", "serial", "serial4", "serial8", "smallserial", "text",
    "tsquery", "tsvector", "txid_snapshot", "uuid", "variadic", "verbose", "xml", "int2",
    "int4", "int8", "float4", "float8", "bool", "timestamptz", "timetz", "vacuum", "regclass",
];

/// MySQL / MariaDB reserved and type keywords
const MYSQL_KEYWORDS: &[&str] = &[
    "accessible", "auto_increment", "before", "change", "databases", "database",
    "day_hour", "day_microsecond", "day_minute", "day_second", "delayed", "distinctrow",
    "div", "dual", "enclosed", "enum", "escaped", "explain", "fields", "force", "fulltext",
    "generated", "high_priority", "hour_microsecond", "hour_minute", "hour_second", "ignore",
    "index", "infile", "keys", "kill", "linear", "lines", "load", "lock", "long", "longblob",
    "longtext", "low_priority", "master_bind", "mediumblob", "mediumint", "mediumtext",
    "middleint", "minute_microsecond", "minute_second", "mod", "no_write_to_binlog",
    "optimize", "optionally", "purge", "regexp", "rename", "replace", "require", "rlike",
    "schemas", "separator", "show", "spatial", "sql_big_result", "sql_calc_found_rows",
    "sql_small_result", "ssl", "starting", "stored", "straight_join", "terminated",
    "tinyblob", "tinyint", "tinytext", "unlock", "unsigned", "use", "utc_date", "utc_time",
    "utc_timestamp", "varbinary", "varcharacter", "virtual", "xor", "year_month",
    "zerofill", "datetime", "mediumint", "set", "json",
];

/// SQLite keywords, including pragma-related words
const SQLITE_KEYWORDS: &[&str] = &[
    "abort", "after", "attach", "autoincrement", "conflict", "detach", "exclusive", "fail",
    "glob", "indexed", "instead", "nothing", "notnull", "plan", "pragma", "query", "raise",
    "regexp", "reindex", "rowid", "strict", "temp", "vacuum", "virtual", "without",
    "journal_mode", "foreign_keys", "synchronous", "user_version", "integer", "real", "blob",
    "text", "numeric",
];

/// SQL Server (T-SQL) reserved keywords
const TSQL_KEYWORDS: &[&str] = &[
    "backup", "break", "browse", "bulk", "checkpoint", "clustered", "compute", "containstable",
    "dbcc", "deny", "disk", "distributed", "dump", "errlvl", "file", "fillfactor",
    "freetext", "freetexttable", "holdlock", "identity_insert", "identitycol", "kill",
    "lineno", "nocheck", "nonclustered", "off", "offsets", "opendatasource", "openquery",
    "openrowset", "openxml", "percent", "pivot", "plan", "print", "proc", "raiserror",
    "readtext", "reconfigure", "replication", "restore", "revert", "rowcount", "rowguidcol",
    "rule", "securityaudit", "semantickeyphrasetable", "setuser", "shutdown", "statistics",
    "textsize", "top", "tran", "try_convert", "tsequal", "unpivot", "updatetext",
    "waitfor", "writetext", "nvarchar", "ntext", "uniqueidentifier", "datetime2",
];

static RESERVED_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        RUST_KEYWORDS,
        SQL_STANDARD_KEYWORDS,
        POSTGRES_KEYWORDS,
        MYSQL_KEYWORDS,
        SQLITE_KEYWORDS,
        TSQL_KEYWORDS,
    ]
    .into_iter()
    .flatten()
    .copied()
    .collect()
});

/// Read-only view over the process-wide reserved-word set
#[derive(Debug, Clone, Copy, Default)]
pub struct ReservedWordRegistry;

impl ReservedWordRegistry {
    /// Returns true if the lowercase form of `word` is reserved anywhere
    pub fn contains(word: &str) -> bool {
        RESERVED_WORDS.contains(word.to_ascii_lowercase().as_str())
    }

    /// Iterate over all reserved words (unordered)
    pub fn words() -> impl Iterator<Item = &'static str> {
        RESERVED_WORDS.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_is_lowercase() {
        assert!(ReservedWordRegistry::words().all(|w| w == w.to_ascii_lowercase()));
    }

    #[test]
    fn membership_is_case_insensitive() {
        assert!(ReservedWordRegistry::contains("select"));
        assert!(ReservedWordRegistry::contains("SELECT"));
        assert!(ReservedWordRegistry::contains("Select"));
        assert!(!ReservedWordRegistry::contains("selection"));
    }

    #[test]
    fn covers_every_vocabulary() {
        // one word unique to each source list
        for word in ["impl", "tablesample", "jsonb", "zerofill", "pragma", "waitfor"] {
            assert!(ReservedWordRegistry::contains(word), "{word} should be reserved");
        }
    }

    #[test]
    fn common_column_names_are_free() {
        for word in ["id", "email", "amount", "user_id", "created_at", "varA"] {
            assert!(!ReservedWordRegistry::contains(word), "{word} should be allowed");
        }
    }
}
