//! Testing utilities for SIA workspace
//!
//! Shared fixtures: configured coordinators, sample tables and datasets,
//! and data sources that fail or never answer.

#![allow(missing_docs)]

use async_trait::async_trait;
use serde_json::{json, Value};
use sia_model::value::FieldMap;
use sia_store::{
    FileStorage, LoadError, MemoryStorage, PersistenceCoordinator, SectionDataSource, SectionHost,
    StoreConfig,
};
use sia_tables::{TableConfig, TableRow};
use std::path::Path;
use std::sync::Arc;

pub const OCUPACIONES: &str = "peaOcupacionesTabla";
pub const POBLACION_SEXO: &str = "poblacionSexoTabla";
pub const PUNTOS: &str = "puntosPoblacionTabla";

pub const SAMPLE_DATASET: &str = r#"{
    "3.1.4.A.1.2": {
        "grupoAISD": "CC Ayroca",
        "distrito": "Cahuacho",
        "peaOcupacionesTabla": [
            {"categoria": "agricultura", "casos": "35"},
            {"categoria": "MINERIA", "casos": 12}
        ]
    },
    "3.1.4.2": {
        "distrito": "Cahuacho",
        "poblacionSexoTabla": [
            {"sexo": "hombre", "casos": 40},
            {"sexo": "mujer", "casos": 38}
        ]
    },
    "*": {"provincia": "Caravelí"}
}"#;

pub fn skeleton_row(field: &str, category: &str) -> TableRow {
    TableRow::new()
        .with(field, category)
        .with("casos", 0)
        .with("porcentaje", "")
}

pub fn count_row(field: &str, category: &str, casos: impl Into<Value>) -> TableRow {
    TableRow::new().with(field, category).with("casos", casos)
}

pub fn ocupaciones_table() -> TableConfig {
    TableConfig::new(OCUPACIONES).with_skeleton(vec![
        skeleton_row("categoria", "Agricultura"),
        skeleton_row("categoria", "Minería"),
        skeleton_row("categoria", "Comercio"),
    ])
}

pub fn poblacion_sexo_table() -> TableConfig {
    TableConfig::new(POBLACION_SEXO)
        .with_category_field("sexo")
        .with_skeleton(vec![
            skeleton_row("sexo", "Hombre"),
            skeleton_row("sexo", "Mujer"),
        ])
}

pub fn puntos_table() -> TableConfig {
    TableConfig::new(PUNTOS)
        .with_category_field("punto")
        .with_id_field("codigo")
}

pub fn sample_config() -> StoreConfig {
    StoreConfig::new()
        .with_table(ocupaciones_table())
        .with_table(poblacion_sexo_table())
        .with_table(puntos_table())
        .with_global_default("provincia", "Caravelí")
}

pub fn memory_store() -> Arc<PersistenceCoordinator> {
    Arc::new(PersistenceCoordinator::new(
        sample_config(),
        Arc::new(MemoryStorage::new()),
    ))
}

pub fn memory_store_with(config: StoreConfig) -> Arc<PersistenceCoordinator> {
    Arc::new(PersistenceCoordinator::new(
        config,
        Arc::new(MemoryStorage::new()),
    ))
}

pub fn file_store(dir: &Path) -> Arc<PersistenceCoordinator> {
    let backend = FileStorage::open(dir).unwrap();
    Arc::new(PersistenceCoordinator::new(sample_config(), Arc::new(backend)))
}

pub fn host(store: &Arc<PersistenceCoordinator>, section_id: &str) -> SectionHost {
    SectionHost::new(section_id, Arc::clone(store))
}

pub fn object(value: Value) -> FieldMap {
    value.as_object().cloned().unwrap()
}

pub fn agricultura_35() -> Value {
    json!([{"categoria": "agricultura", "casos": "35"}])
}

/// Source whose every load fails
#[derive(Debug, Default)]
pub struct FailingSource;

#[async_trait]
impl SectionDataSource for FailingSource {
    async fn load_fields(&self, _section_id: &str, _fields: &[String]) -> Result<FieldMap, LoadError> {
        Err(LoadError::Unavailable("backend offline".to_string()))
    }
}

/// Source that never answers
#[derive(Debug, Default)]
pub struct StalledSource;

#[async_trait]
impl SectionDataSource for StalledSource {
    async fn load_fields(&self, _section_id: &str, _fields: &[String]) -> Result<FieldMap, LoadError> {
        std::future::pending().await
    }
}
