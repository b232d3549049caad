// Quoting for names that end up inside SQL handed to psql

/// `"name"`, with embedded double quotes doubled
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// `'value'`, with embedded single quotes doubled
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_identifier_test() {
        assert_eq!(quote_identifier("vmdb_production"), "\"vmdb_production\"");
        assert_eq!(quote_identifier("vmdb-Prod"), "\"vmdb-Prod\"");
        assert_eq!(quote_identifier("a\"b"), "\"a\"\"b\"");
        assert_eq!(
            quote_identifier("x; DROP DATABASE postgres"),
            "\"x; DROP DATABASE postgres\""
        );
    }

    #[test]
    fn quote_literal_test() {
        assert_eq!(quote_literal("vmdb_production"), "'vmdb_production'");
        assert_eq!(quote_literal("o'brien"), "'o''brien'");
        assert_eq!(quote_literal("x'); DROP TABLE t; --"), "'x''); DROP TABLE t; --'");
    }
}
