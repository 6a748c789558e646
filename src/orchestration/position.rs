//! # Checkpoint Position Extraction
//!
//! A recovery checkpoint is an opaque, engine-specific string. Before a CDC task
//! can start from it, the structured position token has to be extracted, and how
//! that is done depends on the source engine family. Extraction strategies are
//! kept in a table keyed by engine name, so new engines are added by registering
//! a strategy (in code or through `task.position_patterns`) rather than by
//! touching the dispatch site.

use crate::config::TaskConfig;
use crate::error::{FlowError, FlowResult};
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Log sequence number form used by PostgreSQL-family checkpoints
pub const POSTGRES_POSITION_PATTERN: &str = r"[A-Z0-9]{3}/[A-Z0-9]*";

/// Engines without positional structure use the whole checkpoint
pub const CATCH_ALL_POSITION_PATTERN: &str = r".*";

pub trait PositionExtractor: Send + Sync + fmt::Debug {
    /// Position token inside `checkpoint`, `None` when there is none
    fn extract(&self, checkpoint: &str) -> Option<String>;
}

/// Leftmost match of a regular expression
#[derive(Debug, Clone)]
pub struct RegexPositionExtractor {
    pattern: Regex,
}

impl RegexPositionExtractor {
    pub fn new(pattern: &str) -> FlowResult<Self> {
        let pattern = Regex::new(pattern).map_err(|e| {
            FlowError::Configuration(format!("Invalid position pattern '{pattern}': {e}"))
        })?;
        Ok(Self { pattern })
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }
}

impl PositionExtractor for RegexPositionExtractor {
    fn extract(&self, checkpoint: &str) -> Option<String> {
        self.pattern
            .find(checkpoint)
            .map(|found| found.as_str().to_string())
    }
}

#[derive(Debug, Clone)]
pub struct PositionParserRegistry {
    extractors: HashMap<String, Arc<dyn PositionExtractor>>,
}

impl PositionParserRegistry {
    /// No engines registered
    pub fn empty() -> Self {
        Self {
            extractors: HashMap::new(),
        }
    }

    /// `postgresql` and `aurora-postgresql` extract the LSN; `mysql` and `aurora`
    /// (MySQL-compatible) take the checkpoint verbatim.
    pub fn with_builtin() -> FlowResult<Self> {
        let mut registry = Self::empty();
        for engine in ["postgresql", "aurora-postgresql"] {
            registry.register_pattern(engine, POSTGRES_POSITION_PATTERN)?;
        }
        for engine in ["mysql", "aurora"] {
            registry.register_pattern(engine, CATCH_ALL_POSITION_PATTERN)?;
        }
        Ok(registry)
    }

    /// Built-in table with the configured patterns merged over it
    pub fn from_config(config: &TaskConfig) -> FlowResult<Self> {
        let mut registry = Self::with_builtin()?;
        for (engine, pattern) in &config.position_patterns {
            registry.register_pattern(engine, pattern)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, engine: &str, extractor: Arc<dyn PositionExtractor>) {
        self.extractors.insert(engine.to_lowercase(), extractor);
    }

    pub fn register_pattern(&mut self, engine: &str, pattern: &str) -> FlowResult<()> {
        let extractor = RegexPositionExtractor::new(pattern)?;
        self.register(engine, Arc::new(extractor));
        Ok(())
    }

    pub fn supports(&self, engine: &str) -> bool {
        self.extractors.contains_key(&engine.to_lowercase())
    }

    pub fn engines(&self) -> Vec<&str> {
        let mut engines: Vec<&str> = self.extractors.keys().map(String::as_str).collect();
        engines.sort_unstable();
        engines
    }

    pub fn extract(&self, engine: &str, checkpoint: &str) -> FlowResult<String> {
        let extractor = self.extractors.get(&engine.to_lowercase()).ok_or_else(|| {
            FlowError::position_parse(engine, checkpoint, "no position pattern for engine")
        })?;

        extractor.extract(checkpoint).ok_or_else(|| {
            FlowError::position_parse(engine, checkpoint, "checkpoint does not match the engine pattern")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postgres_family_extracts_lsn() {
        let registry = PositionParserRegistry::with_builtin().unwrap();
        assert_eq!(
            registry.extract("aurora-postgresql", "AAA/1A2B3C").unwrap(),
            "AAA/1A2B3C"
        );
        assert_eq!(
            registry
                .extract("postgresql", "checkpoint:V1#27#0000002F/3A00C7E8:1#0#0#*#0#120")
                .unwrap(),
            "02F/3A00C7E8"
        );
    }

    #[test]
    fn test_mysql_family_takes_whole_checkpoint() {
        let registry = PositionParserRegistry::with_builtin().unwrap();
        let raw = "checkpoint:V1#34#mysql-bin-changelog.000024:2210:-1:2241:8589934592#0#0#*#0#7";
        assert_eq!(registry.extract("aurora", raw).unwrap(), raw);
        assert_eq!(registry.extract("MySQL", raw).unwrap(), raw);
    }

    #[test]
    fn test_parse_failures() {
        let registry = PositionParserRegistry::with_builtin().unwrap();
        assert!(matches!(
            registry.extract("postgresql", "no position here"),
            Err(FlowError::PositionParseFailure { .. })
        ));
        assert!(matches!(
            registry.extract("oracle", "SCN:123"),
            Err(FlowError::PositionParseFailure { .. })
        ));
    }

    #[test]
    fn test_configured_patterns_extend_builtin() {
        let mut config = TaskConfig::default();
        config
            .position_patterns
            .insert("oracle".to_string(), r"SCN:\d+".to_string());

        let registry = PositionParserRegistry::from_config(&config).unwrap();
        assert_eq!(registry.extract("oracle", "x SCN:123 y").unwrap(), "SCN:123");
        assert!(registry.supports("postgresql"));
        assert_eq!(registry.engines().len(), 5);
    }
}
