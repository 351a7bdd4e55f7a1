// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `sql`

#[cfg(test)]
mod tests {
    use crate::sql::{
        catalog_count_stmt, create_database_stmt, drop_database_stmt, quote_identifier,
        quote_literal, rename_database_stmt, terminate_sessions_stmt, SqlError,
    };
    use std::time::Duration;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("orders"), "\"orders\"");
        assert_eq!(quote_identifier("my-db"), "\"my-db\"");
    }

    #[test]
    fn test_quote_identifier_escapes_quotes() {
        assert_eq!(quote_identifier("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_quote_literal() {
        assert_eq!(quote_literal("orders"), "'orders'");
        assert_eq!(quote_literal("o'brien"), "'o''brien'");
    }

    #[test]
    fn test_create_database_stmt() {
        assert_eq!(
            create_database_stmt("orders"),
            "CREATE DATABASE \"orders\""
        );
    }

    #[test]
    fn test_drop_database_stmt() {
        assert_eq!(drop_database_stmt("orders"), "DROP DATABASE \"orders\"");
    }

    #[test]
    fn test_terminate_sessions_stmt() {
        assert_eq!(
            terminate_sessions_stmt("orders"),
            "SELECT pg_terminate_backend (pid) FROM pg_stat_activity WHERE datname = 'orders'"
        );
    }

    #[test]
    fn test_rename_database_stmt() {
        assert_eq!(
            rename_database_stmt("orders", "orders-v2"),
            "ALTER DATABASE \"orders\" RENAME TO \"orders-v2\""
        );
    }

    #[test]
    fn test_catalog_count_stmt() {
        assert_eq!(
            catalog_count_stmt("orders"),
            "SELECT COUNT(*) FROM pg_database WHERE datname = 'orders'"
        );
    }

    #[test]
    fn test_statement_builders_neutralize_injection() {
        // A hostile catalog name must stay inside the quoted identifier
        let stmt = create_database_stmt("x\"; DROP DATABASE other; --");
        assert_eq!(stmt, "CREATE DATABASE \"x\"\"; DROP DATABASE other; --\"");

        let stmt = catalog_count_stmt("x' OR '1'='1");
        assert_eq!(
            stmt,
            "SELECT COUNT(*) FROM pg_database WHERE datname = 'x'' OR ''1''=''1'"
        );
    }

    #[test]
    fn test_sql_error_display() {
        let err = SqlError::AlreadyExists("database \"orders\" already exists".to_string());
        assert!(err.to_string().contains("already exists"));

        let err = SqlError::Timeout(Duration::from_secs(30));
        assert!(err.to_string().contains("timed out"));

        let err = SqlError::Connect {
            host: "pg1-external-svc".to_string(),
            message: "connection refused".to_string(),
        };
        assert!(err.to_string().contains("pg1-external-svc"));
        assert!(err.to_string().contains("connection refused"));
    }
}
