use ::duckdb::{Connection, ToSql};

struct Migration {
    version: &'static str,
    sql: &'static str,
}

// `fact_exchange_rates` has no primary key: DuckDB checks unique constraints
// eagerly, which breaks DELETE followed by INSERT of the same keys inside one
// transaction. The replace writer owns key uniqueness instead.
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "0001_fact_exchange_rates",
        sql: r"
CREATE TABLE IF NOT EXISTS fact_exchange_rates (
    exchange_date DATE NOT NULL,
    base_currency VARCHAR NOT NULL,
    quote_currency VARCHAR NOT NULL,
    rate DECIMAL(38, 18) NOT NULL,
    rate_inverse DECIMAL(38, 18) NOT NULL,
    data_source VARCHAR NOT NULL,
    load_timestamp TIMESTAMP NOT NULL,
    CHECK (rate > 0),
    CHECK (rate_inverse > 0),
    CHECK (base_currency <> quote_currency)
);
",
    },
    Migration {
        version: "0002_load_log",
        sql: r"
CREATE TABLE IF NOT EXISTS load_log (
    run_id VARCHAR NOT NULL,
    exchange_date DATE NOT NULL,
    rows_written BIGINT NOT NULL,
    data_source VARCHAR NOT NULL,
    load_timestamp TIMESTAMP NOT NULL,
    logged_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
",
    },
];

/// Apply every migration that is not yet recorded in `schema_migrations`.
///
/// # Errors
/// Returns the first `DuckDB` error raised by a migration.
pub fn apply_migrations(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch(
        r"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version VARCHAR PRIMARY KEY,
    applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
",
    )?;

    for migration in MIGRATIONS {
        let params: [&dyn ToSql; 1] = [&migration.version];
        let applied_count: i64 = connection.query_row(
            "SELECT COUNT(*) FROM schema_migrations WHERE version = ?",
            params.as_slice(),
            |row| row.get(0),
        )?;

        if applied_count == 0 {
            tracing::debug!(version = migration.version, "applying warehouse migration");
            connection.execute_batch(migration.sql)?;
            connection.execute(
                "INSERT INTO schema_migrations (version) VALUES (?)",
                params.as_slice(),
            )?;
        }
    }

    Ok(())
}

/// Versions of the migrations known to this build, in application order.
#[must_use]
pub fn known_versions() -> Vec<&'static str> {
    MIGRATIONS.iter().map(|migration| migration.version).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_apply_once() {
        let connection = Connection::open_in_memory().expect("in-memory duckdb");

        apply_migrations(&connection).expect("first pass");
        apply_migrations(&connection).expect("second pass");

        let recorded: i64 = connection
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))
            .expect("count");
        assert_eq!(recorded, known_versions().len() as i64);
    }
}
