//! Backend section data
//!
//! A [`SectionDataSource`] returns field values for a section from some
//! external dataset. The result is an overlay candidate only; the
//! coordinator decides what may actually be written.

use crate::error::LoadError;
use async_trait::async_trait;
use sia_model::value::FieldMap;
use sia_model::SectionId;
use std::collections::HashMap;
use std::fmt::Debug;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Dataset key matching every section
pub const WILDCARD_SECTION: &str = "*";

/// Source of backend field values
#[async_trait]
pub trait SectionDataSource: Debug + Send + Sync {
    /// Values of `fields` for `section_id` (all known fields when empty)
    ///
    /// # Errors
    /// Returns error if the source cannot answer
    async fn load_fields(&self, section_id: &str, fields: &[String]) -> Result<FieldMap, LoadError>;
}

/// Time-bounded access to a data source
#[derive(Debug, Clone)]
pub struct SectionLoader {
    source: Arc<dyn SectionDataSource>,
    timeout: Duration,
}

impl SectionLoader {
    /// Loader over `source` with a time budget per load
    #[must_use]
    pub fn new(source: Arc<dyn SectionDataSource>, timeout: Duration) -> Self {
        Self { source, timeout }
    }

    /// Time budget per load
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Load fields of a section
    ///
    /// Errors and timeouts are logged and yield `None`.
    pub async fn load(&self, section_id: &str, fields: &[String]) -> Option<FieldMap> {
        match tokio::time::timeout(self.timeout, self.source.load_fields(section_id, fields)).await
        {
            Ok(Ok(values)) => {
                tracing::debug!(section = section_id, fields = values.len(), "section data loaded");
                Some(values)
            }
            Ok(Err(e)) => {
                tracing::warn!(section = section_id, error = %e, "section data load failed");
                None
            }
            Err(_) => {
                let e = LoadError::Timeout {
                    section: section_id.to_string(),
                    millis: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
                };
                tracing::warn!(section = section_id, error = %e, "section data load abandoned");
                None
            }
        }
    }
}

/// Dataset held in memory, keyed by section id
///
/// A lookup tries the exact section id, then its root (group segments
/// removed), then [`WILDCARD_SECTION`].
#[derive(Debug, Clone, Default)]
pub struct MockDataSource {
    sections: HashMap<String, FieldMap>,
    latency: Option<Duration>,
}

impl MockDataSource {
    /// Dataset from an already built map
    #[must_use]
    pub fn from_map(sections: HashMap<String, FieldMap>) -> Self {
        Self {
            sections,
            latency: None,
        }
    }

    /// Dataset from a JSON object of section objects
    ///
    /// # Errors
    /// Returns error if the document is not an object of objects
    pub fn from_json_str(raw: &str) -> Result<Self, LoadError> {
        Ok(Self::from_map(serde_json::from_str(raw)?))
    }

    /// Dataset from a JSON file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| LoadError::io_error(path, e))?;
        Self::from_json_str(&raw)
    }

    /// Delay every answer by `latency`
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Section ids the dataset knows
    #[must_use]
    pub fn section_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.sections.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    fn lookup(&self, section_id: &str) -> Option<&FieldMap> {
        if let Some(values) = self.sections.get(section_id) {
            return Some(values);
        }
        let root = section_id
            .parse::<SectionId>()
            .ok()
            .map(|id| id.root().to_string());
        root.and_then(|root| self.sections.get(&root))
            .or_else(|| self.sections.get(WILDCARD_SECTION))
    }
}

#[async_trait]
impl SectionDataSource for MockDataSource {
    async fn load_fields(&self, section_id: &str, fields: &[String]) -> Result<FieldMap, LoadError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let Some(values) = self.lookup(section_id) else {
            return Ok(FieldMap::new());
        };
        if fields.is_empty() {
            return Ok(values.clone());
        }
        Ok(values
            .iter()
            .filter(|(field, _)| fields.contains(*field))
            .map(|(field, value)| (field.clone(), value.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const DATASET: &str = r#"{
        "3.1.4.A.1.2": {"grupoAISD": "CC Ayroca", "distrito": "Cahuacho"},
        "3.1.4.2": {"grupoAISD": "Comunidad", "distrito": "Sin dato"},
        "*": {"provincia": "Caravelí"}
    }"#;

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[tokio::test]
    async fn exact_then_root_then_wildcard() {
        let source = MockDataSource::from_json_str(DATASET).unwrap();

        let exact = source.load_fields("3.1.4.A.1.2", &[]).await.unwrap();
        assert_eq!(exact["grupoAISD"], json!("CC Ayroca"));

        let root = source.load_fields("3.1.4.A.2.2", &[]).await.unwrap();
        assert_eq!(root["grupoAISD"], json!("Comunidad"));

        let wildcard = source.load_fields("3.1.5", &[]).await.unwrap();
        assert_eq!(wildcard["provincia"], json!("Caravelí"));
    }

    #[tokio::test]
    async fn requested_fields_only() {
        let source = MockDataSource::from_json_str(DATASET).unwrap();
        let values = source
            .load_fields("3.1.4.A.1.2", &fields(&["distrito", "otro"]))
            .await
            .unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values["distrito"], json!("Cahuacho"));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_source_times_out() {
        let source = MockDataSource::from_json_str(DATASET)
            .unwrap()
            .with_latency(Duration::from_secs(10));
        let loader = SectionLoader::new(Arc::new(source), Duration::from_millis(3000));

        assert_eq!(loader.load("3.1.4.A.1.2", &[]).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn fast_source_within_budget() {
        let source = MockDataSource::from_json_str(DATASET)
            .unwrap()
            .with_latency(Duration::from_millis(200));
        let loader = SectionLoader::new(Arc::new(source), Duration::from_millis(3000));

        let values = loader.load("3.1.4.A.1.2", &[]).await.unwrap();
        assert_eq!(values["distrito"], json!("Cahuacho"));
    }

    #[test]
    fn malformed_dataset_is_an_error() {
        assert!(matches!(
            MockDataSource::from_json_str(r#"{"3.1": 5}"#),
            Err(LoadError::Parse(_))
        ));
    }
}
