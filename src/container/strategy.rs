//! Ordered extraction strategies with fallback
//!
//! Each strategy either produces records for a parsed document or explains
//! why the document is not its shape. The chain tries them in order and
//! keeps the first one that yields records.

use serde_json::Value;
use tracing::trace;

use crate::config::EngineConfig;
use crate::error::ArtifactError;
use crate::types::{Provenance, RecordBatch};

/// One way of reading records out of a parsed document
pub trait ExtractionStrategy {
    /// Label stamped as `extractor` on every record the strategy produces
    fn name(&self) -> &'static str;

    fn apply(&self, doc: &Value, prov: &Provenance, config: &EngineConfig) -> Result<RecordBatch, ArtifactError>;
}

#[derive(Default)]
pub struct StrategyChain {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl StrategyChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, strategy: impl ExtractionStrategy + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// First strategy that yields records, with its name
    ///
    /// A strategy that succeeds without records counts as a miss. When every
    /// strategy misses, the reasons are joined into one error.
    pub fn run(
        &self,
        doc: &Value,
        prov: &Provenance,
        config: &EngineConfig,
    ) -> Result<(&'static str, RecordBatch), ArtifactError> {
        let mut misses: Vec<String> = Vec::new();

        for strategy in &self.strategies {
            let strategy_prov = Provenance {
                extractor: strategy.name(),
                ..prov.clone()
            };
            match strategy.apply(doc, &strategy_prov, config) {
                Ok(batch) if !batch.is_empty() => return Ok((strategy.name(), batch)),
                Ok(_) => misses.push(format!("{}: no records", strategy.name())),
                Err(e) => misses.push(format!("{}: {}", strategy.name(), e)),
            }
            trace!("{}: strategy {} missed", prov.artifact, strategy.name());
        }

        if misses.is_empty() {
            misses.push("no strategies configured".to_string());
        }
        Err(ArtifactError::Unrecognized(misses.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChatRecord;

    struct Never;

    impl ExtractionStrategy for Never {
        fn name(&self) -> &'static str {
            "never"
        }

        fn apply(&self, _: &Value, _: &Provenance, _: &EngineConfig) -> Result<RecordBatch, ArtifactError> {
            Err(ArtifactError::Unrecognized("wrong shape".to_string()))
        }
    }

    struct Empty;

    impl ExtractionStrategy for Empty {
        fn name(&self) -> &'static str {
            "empty"
        }

        fn apply(&self, _: &Value, _: &Provenance, _: &EngineConfig) -> Result<RecordBatch, ArtifactError> {
            Ok(RecordBatch::default())
        }
    }

    struct OneChat;

    impl ExtractionStrategy for OneChat {
        fn name(&self) -> &'static str {
            "one_chat"
        }

        fn apply(&self, _: &Value, prov: &Provenance, _: &EngineConfig) -> Result<RecordBatch, ArtifactError> {
            let mut batch = RecordBatch::default();
            batch.chat_records.push(ChatRecord {
                app_name: "Unknown".into(),
                sender: None,
                receiver: None,
                content: "x".into(),
                timestamp: None,
                message_type: "text".into(),
                is_deleted: false,
                source_metadata: prov.stamp(Default::default()),
            });
            Ok(batch)
        }
    }

    #[test]
    fn test_first_productive_strategy_wins() {
        let chain = StrategyChain::new().with(Never).with(Empty).with(OneChat);
        assert_eq!(chain.len(), 3);
        let prov = Provenance::new("a.json", "a.json", "unset");
        let (name, batch) = chain.run(&Value::Null, &prov, &EngineConfig::default()).unwrap();
        assert_eq!(name, "one_chat");
        assert_eq!(batch.chat_records[0].source_metadata["extractor"], "one_chat");
    }

    #[test]
    fn test_all_miss() {
        let chain = StrategyChain::new().with(Never).with(Empty);
        let prov = Provenance::new("a.json", "a.json", "unset");
        let err = chain.run(&Value::Null, &prov, &EngineConfig::default()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("never: unrecognized content: wrong shape"));
        assert!(msg.contains("empty: no records"));
    }

    #[test]
    fn test_empty_chain() {
        assert!(StrategyChain::new().is_empty());
        let prov = Provenance::new("a.json", "a.json", "unset");
        assert!(StrategyChain::new().run(&Value::Null, &prov, &EngineConfig::default()).is_err());
    }
}
