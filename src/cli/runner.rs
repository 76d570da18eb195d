//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::ExtractionConfig;
use crate::database::{DatabaseEngine, DuckDbPool};
use crate::engine::ExtractionEngine;
use crate::error::{Error, Result, ResultExt};
use crate::partition::{plan, PartitionPlanner, PlannerConfig};
use serde_json::{json, Value};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Plan {
                resource_type,
                pool_size,
                batch_count,
                batch_number,
            } => self.plan(resource_type, *pool_size, *batch_count, *batch_number),
            Commands::Count { resource_types } => self.count(resource_types.as_deref()).await,
            Commands::Extract {
                resource_types,
                output,
            } => {
                self.extract(resource_types.as_deref(), output.as_deref())
                    .await
            }
            Commands::Check => self.check(),
        }
    }

    /// Load the configuration file
    fn load_config(&self) -> Result<ExtractionConfig> {
        let path = self
            .cli
            .config
            .as_ref()
            .ok_or_else(|| Error::config("Config file not specified (use -c flag)"))?;
        ExtractionConfig::from_file(path)
    }

    /// Resource types from the command line, falling back to the config file
    fn resource_types(config: &ExtractionConfig, inline: Option<&str>) -> Result<Vec<String>> {
        let types: Vec<String> = match inline {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            None => config.resource_types.clone(),
        };

        if types.is_empty() {
            return Err(Error::config(
                "No resource types given (use --resource-types or resource_types in config)",
            ));
        }
        Ok(types)
    }

    /// Open the store and wrap it in an extraction engine
    fn open_engine(config: &ExtractionConfig) -> Result<ExtractionEngine<DuckDbPool>> {
        let database = DatabaseEngine::new(&config.database)?;
        tracing::info!("Opened store: {}", database.connection_info());

        let pool = DuckDbPool::new(database, config.extraction.pool_size)?;
        Ok(ExtractionEngine::new(
            Arc::new(pool),
            config.extraction.clone(),
        ))
    }

    /// Record sink: the output file, or stdout
    fn open_sink(output: Option<&Path>) -> Result<Box<dyn Write>> {
        match output {
            Some(path) => {
                let file = File::create(path).with_context(|| {
                    format!("Failed to create output file '{}'", path.display())
                })?;
                Ok(Box::new(file))
            }
            None => Ok(Box::new(io::stdout())),
        }
    }

    /// Print partition descriptors
    fn plan(
        &self,
        resource_type: &str,
        pool_size: u32,
        batch_count: u32,
        batch_number: Option<u32>,
    ) -> Result<()> {
        let batches = match batch_number {
            Some(batch) => vec![(batch, plan(resource_type, pool_size, batch_count, batch)?)],
            None => {
                let planner = PartitionPlanner::new(PlannerConfig::new(pool_size, batch_count)?);
                (0..batch_count).zip(planner.plan_run(resource_type)?).collect()
            }
        };

        for (batch, descriptors) in batches {
            for descriptor in descriptors {
                self.output_message(&json!({
                    "type": "PARTITION",
                    "batch": batch,
                    "partition": descriptor
                }));
            }
        }

        Ok(())
    }

    /// Count resources per type
    async fn count(&self, resource_types: Option<&str>) -> Result<()> {
        let config = self.load_config()?;
        let resource_types = Self::resource_types(&config, resource_types)?;
        let engine = Self::open_engine(&config)?;

        for resource_type in &resource_types {
            let count = engine.count(resource_type).await?;
            self.output_message(&json!({
                "type": "COUNT",
                "resourceType": resource_type,
                "count": count
            }));
        }

        Ok(())
    }

    /// Extract resources as JSON lines
    async fn extract(&self, resource_types: Option<&str>, output: Option<&Path>) -> Result<()> {
        let config = self.load_config()?;
        let resource_types = Self::resource_types(&config, resource_types)?;
        let engine = Self::open_engine(&config)?;

        let mut writer = BufWriter::new(Self::open_sink(output)?);

        for resource_type in &resource_types {
            let stats = engine
                .run(resource_type, |record| {
                    serde_json::to_writer(&mut writer, &record)?;
                    writer.write_all(b"\n")?;
                    Ok(())
                })
                .await?;
            writer
                .flush()
                .with_context(|| format!("Failed to write {resource_type} records"))?;

            // Stats go to stderr so stdout carries only records
            eprintln!(
                "{}",
                serde_json::to_string(&json!({ "type": "STATS", "stats": stats }))?
            );
        }

        Ok(())
    }

    /// Check store connection
    fn check(&self) -> Result<()> {
        let config = self.load_config()?;

        self.output_message(&json!({
            "type": "LOG",
            "log": {
                "level": "INFO",
                "message": format!("Checking connection to {} store", config.database.engine)
            }
        }));

        let status = match DatabaseEngine::new(&config.database) {
            Ok(engine) => match engine.check_connection() {
                Ok(()) => json!({
                    "status": "SUCCEEDED",
                    "message": format!("Connection successful: {}", engine.connection_info())
                }),
                Err(e) => json!({
                    "status": "FAILED",
                    "message": format!("Connection check failed: {e}")
                }),
            },
            Err(e) => json!({
                "status": "FAILED",
                "message": format!("Failed to connect: {e}")
            }),
        };

        self.output_message(&json!({
            "type": "CONNECTION_STATUS",
            "connectionStatus": status
        }));

        Ok(())
    }

    /// Output a message
    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config(yaml: &str) -> ExtractionConfig {
        ExtractionConfig::from_yaml_str(yaml).unwrap()
    }

    #[test]
    fn test_resource_types_from_config() {
        let config = config("database:\n  engine: duckdb\nresource_types: [Patient, Encounter]\n");
        let types = Runner::resource_types(&config, None).unwrap();
        assert_eq!(types, vec!["Patient", "Encounter"]);
    }

    #[test]
    fn test_inline_resource_types_override() {
        let config = config("database:\n  engine: duckdb\nresource_types: [Patient]\n");
        let types = Runner::resource_types(&config, Some("Observation, Encounter,")).unwrap();
        assert_eq!(types, vec!["Observation", "Encounter"]);
    }

    #[test]
    fn test_open_sink_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing").join("out.jsonl");

        let err = Runner::open_sink(Some(&missing)).err().unwrap();
        assert!(matches!(err, Error::Other(_)));
        assert!(err.to_string().contains("Failed to create output file"));
        assert!(err.to_string().contains("out.jsonl"));
    }

    #[test]
    fn test_open_sink_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jsonl");

        let mut sink = Runner::open_sink(Some(&path)).unwrap();
        sink.write_all(b"{}\n").unwrap();
        drop(sink);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}\n");
    }

    #[test]
    fn test_no_resource_types() {
        let config = config("database:\n  engine: duckdb\n");
        assert!(matches!(
            Runner::resource_types(&config, None),
            Err(Error::InvalidConfiguration { .. })
        ));
    }
}
