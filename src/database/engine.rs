//! DuckDB-based store engine
//!
//! Opens the HAPI database either natively (a DuckDB file or in-memory
//! database) or through DuckDB's postgres extension, attached read-only.

use crate::config::{DatabaseConfig, DatabaseEngine as DbType};
use crate::error::{Error, Result};
use duckdb::Connection;

/// Catalog name external databases are attached under
const SOURCE_DB: &str = "source_db";

/// Root DuckDB connection to the HAPI store
pub struct DatabaseEngine {
    /// DuckDB connection
    conn: Connection,
    /// Database type
    db_type: DbType,
    /// Connection string used (for logging)
    connection_string: String,
    /// Qualifier placed in front of the HAPI table names
    table_prefix: Option<String>,
}

impl DatabaseEngine {
    /// Create a new database engine from configuration
    pub fn new(config: &DatabaseConfig) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let connection_string = Self::build_connection_string(config);

        let attached = match config.engine {
            DbType::Postgres => true,
            DbType::Duckdb => connection_string != ":memory:",
        };
        let table_prefix = Self::table_prefix_for(&config.engine, attached, config.schema.as_deref());

        let engine = Self {
            conn,
            db_type: config.engine.clone(),
            connection_string,
            table_prefix,
        };

        if attached {
            engine.attach_database()?;
        }

        tracing::info!(
            engine = %engine.db_type,
            connection = %engine.connection_info(),
            "Opened HAPI store"
        );

        Ok(engine)
    }

    /// Wrap an existing DuckDB connection holding the HAPI tables
    pub fn from_connection(conn: Connection, table_prefix: Option<String>) -> Self {
        Self {
            conn,
            db_type: DbType::Duckdb,
            connection_string: ":memory:".to_string(),
            table_prefix,
        }
    }

    /// Create an empty in-memory store
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::from_connection(Connection::open_in_memory()?, None))
    }

    /// Build connection string from config
    fn build_connection_string(config: &DatabaseConfig) -> String {
        if let Some(ref conn_str) = config.connection_string {
            return conn_str.clone();
        }

        let host = config.host.as_deref().unwrap_or("localhost");
        let user = config.user.as_deref().unwrap_or("postgres");
        let password = config.password.as_deref().unwrap_or_default();

        match config.engine {
            DbType::Postgres => {
                let database = config.database.as_deref().unwrap_or("hapi");
                let port = config.port.unwrap_or(5432);
                format!("postgresql://{user}:{password}@{host}:{port}/{database}")
            }
            // DuckDB uses database as file path or :memory:
            DbType::Duckdb => config
                .database
                .clone()
                .unwrap_or_else(|| ":memory:".to_string()),
        }
    }

    fn table_prefix_for(db_type: &DbType, attached: bool, schema: Option<&str>) -> Option<String> {
        match (db_type, attached, schema) {
            (DbType::Postgres, _, schema) => {
                Some(format!("{SOURCE_DB}.{}", schema.unwrap_or("public")))
            }
            (DbType::Duckdb, true, Some(schema)) => Some(format!("{SOURCE_DB}.{schema}")),
            (DbType::Duckdb, true, None) => Some(SOURCE_DB.to_string()),
            (DbType::Duckdb, false, schema) => schema.map(String::from),
        }
    }

    /// Attach external database to DuckDB
    fn attach_database(&self) -> Result<()> {
        let connection_string = self.connection_string.replace('\'', "''");
        match self.db_type {
            DbType::Postgres => {
                self.conn
                    .execute_batch("INSTALL postgres; LOAD postgres;")
                    .map_err(|e| {
                        Error::config(format!("Failed to load postgres extension: {e}"))
                    })?;

                let attach_sql = format!(
                    "ATTACH '{connection_string}' AS {SOURCE_DB} (TYPE POSTGRES, READ_ONLY);"
                );
                self.conn.execute_batch(&attach_sql)?;
            }
            DbType::Duckdb => {
                let attach_sql = format!("ATTACH '{connection_string}' AS {SOURCE_DB} (READ_ONLY);");
                self.conn.execute_batch(&attach_sql)?;
            }
        }

        Ok(())
    }

    /// Test database connection
    pub fn check_connection(&self) -> Result<()> {
        let query = match self.db_type {
            DbType::Postgres => "SELECT 1 FROM source_db.pg_catalog.pg_tables LIMIT 1",
            DbType::Duckdb => "SELECT 1",
        };

        let _: i64 = self.conn.query_row(query, [], |row| row.get(0))?;
        Ok(())
    }

    /// Open another connection to the same database
    pub fn try_clone_connection(&self) -> Result<Connection> {
        Ok(self.conn.try_clone()?)
    }

    /// Root connection (for schema setup and loading)
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Qualifier for the HAPI tables, if any
    pub fn table_prefix(&self) -> Option<&str> {
        self.table_prefix.as_deref()
    }

    /// Get database type
    pub fn db_type(&self) -> &DbType {
        &self.db_type
    }

    /// Get connection string (for logging - password masked)
    pub fn connection_info(&self) -> String {
        if let Some(at_pos) = self.connection_string.find('@') {
            if let Some(colon_pos) = self.connection_string[..at_pos].rfind(':') {
                let before_pass = &self.connection_string[..=colon_pos];
                let after_at = &self.connection_string[at_pos..];
                return format!("{before_pass}****{after_at}");
            }
        }
        self.connection_string.clone()
    }
}
