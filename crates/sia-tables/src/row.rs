//! Table rows and per-table field configuration

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sia_model::value::{coerce_number, FieldMap};

/// One row of a questionnaire table
///
/// An ordered JSON object: a category field (`categoria`, `sexo`, `punto`)
/// plus numeric or derived fields (`casos`, `porcentaje`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableRow(FieldMap);

impl TableRow {
    /// Empty row
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(FieldMap::new())
    }

    /// Builder-style field insertion
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    /// Field value
    #[inline]
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Set a field, keeping its position if it already exists
    #[inline]
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(field.into(), value.into());
    }

    /// Text of a field; numbers are rendered, anything else is `""`
    #[must_use]
    pub fn text(&self, field: &str) -> String {
        match self.0.get(field) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        }
    }

    /// Numeric reading of a field (`0` when absent or unparsable)
    #[inline]
    #[must_use]
    pub fn number(&self, field: &str) -> f64 {
        self.0.get(field).map_or(0.0, coerce_number)
    }

    /// Underlying field map
    #[inline]
    #[must_use]
    pub fn fields(&self) -> &FieldMap {
        &self.0
    }

    /// Convert into a JSON object value
    #[inline]
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<FieldMap> for TableRow {
    fn from(map: FieldMap) -> Self {
        Self(map)
    }
}

/// Rows of a JSON array
///
/// Returns `None` when `value` is not an array. Non-object items are
/// dropped.
#[must_use]
pub fn rows_from_value(value: &Value) -> Option<Vec<TableRow>> {
    let items = value.as_array()?;
    let rows: Vec<TableRow> = items
        .iter()
        .filter_map(|item| item.as_object().cloned().map(TableRow))
        .collect();
    if rows.len() != items.len() {
        tracing::debug!(
            dropped = items.len() - rows.len(),
            "non-object items dropped from table value"
        );
    }
    Some(rows)
}

/// JSON array value of `rows`
#[must_use]
pub fn rows_to_value(rows: &[TableRow]) -> Value {
    Value::Array(rows.iter().cloned().map(TableRow::into_value).collect())
}

/// Which fields of a table play which role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableConfig {
    /// Base field name the table is stored under (`poblacionSexoTabla`)
    pub key: String,
    /// Category-identifying field
    #[serde(default = "default_category_field")]
    pub category_field: String,
    /// Count/total field filled by merges
    #[serde(default = "default_count_field")]
    pub count_field: String,
    /// Percentage field blanked by merges
    #[serde(default = "default_percentage_field")]
    pub percentage_field: String,
    /// Field identifying rows of an external dataset (active-row filtering)
    #[serde(default)]
    pub id_field: Option<String>,
    /// Default rows used when the current table has no categories yet
    #[serde(default)]
    pub skeleton: Vec<TableRow>,
}

fn default_category_field() -> String {
    "categoria".to_string()
}

fn default_count_field() -> String {
    "casos".to_string()
}

fn default_percentage_field() -> String {
    "porcentaje".to_string()
}

impl TableConfig {
    /// Table with the default `categoria` / `casos` / `porcentaje` fields
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            category_field: default_category_field(),
            count_field: default_count_field(),
            percentage_field: default_percentage_field(),
            id_field: None,
            skeleton: Vec::new(),
        }
    }

    /// With category field
    #[inline]
    #[must_use]
    pub fn with_category_field(mut self, field: impl Into<String>) -> Self {
        self.category_field = field.into();
        self
    }

    /// With count field
    #[inline]
    #[must_use]
    pub fn with_count_field(mut self, field: impl Into<String>) -> Self {
        self.count_field = field.into();
        self
    }

    /// With percentage field
    #[inline]
    #[must_use]
    pub fn with_percentage_field(mut self, field: impl Into<String>) -> Self {
        self.percentage_field = field.into();
        self
    }

    /// With external row id field
    #[inline]
    #[must_use]
    pub fn with_id_field(mut self, field: impl Into<String>) -> Self {
        self.id_field = Some(field.into());
        self
    }

    /// With default skeleton rows
    #[must_use]
    pub fn with_skeleton(mut self, rows: Vec<TableRow>) -> Self {
        self.skeleton = rows;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn row_accessors() {
        let row = TableRow::new()
            .with("categoria", "Agricultura")
            .with("casos", "35");

        assert_eq!(row.text("categoria"), "Agricultura");
        assert_eq!(row.number("casos"), 35.0);
        assert_eq!(row.number("missing"), 0.0);
        assert_eq!(row.text("missing"), "");
    }

    #[test]
    fn rows_from_non_array_is_none() {
        assert!(rows_from_value(&json!({"a": 1})).is_none());
        assert!(rows_from_value(&json!(null)).is_none());
    }

    #[test]
    fn rows_from_array_drops_scalars() {
        let rows = rows_from_value(&json!([{"sexo": "Hombre"}, 3, {"sexo": "Mujer"}])).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].text("sexo"), "Mujer");
    }

    #[test]
    fn config_defaults_from_json() {
        let config: TableConfig =
            serde_json::from_value(json!({"key": "peaTabla", "category_field": "sexo"})).unwrap();
        assert_eq!(config.category_field, "sexo");
        assert_eq!(config.count_field, "casos");
        assert_eq!(config.percentage_field, "porcentaje");
        assert_eq!(config.id_field, None);
    }
}
