//! Actions for updating the data of a published Hyper data source in place.

use serde::Serialize;
use serde_json::{Map, Value};

/// One step of a data update, applied to a table of the published extract.
///
/// Source tables come from the Hyper file uploaded alongside the update.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct DataAction {
    /// "insert", "update", "upsert", "delete" or "replace".
    pub action: String,
    pub target_schema: String,
    pub target_table: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_schema: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_table: Option<String>,
    /// Row-matching expression, e.g. `{"op": "eq", "target-col": .., "source-col": ..}`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<Value>,
}

impl DataAction {
    fn from_source(
        action: &str,
        target_schema: &str,
        target_table: &str,
        source_schema: &str,
        source_table: &str,
    ) -> Self {
        Self {
            action: action.to_string(),
            target_schema: target_schema.to_string(),
            target_table: target_table.to_string(),
            source_schema: Some(source_schema.to_string()),
            source_table: Some(source_table.to_string()),
            condition: None,
        }
    }

    /// Inserts source rows that match no target row and updates those that do.
    #[must_use]
    pub fn upsert(target_schema: &str, target_table: &str, source_schema: &str, source_table: &str) -> Self {
        Self::from_source("upsert", target_schema, target_table, source_schema, source_table)
    }

    /// Appends every source row to the target table.
    #[must_use]
    pub fn insert(target_schema: &str, target_table: &str, source_schema: &str, source_table: &str) -> Self {
        Self::from_source("insert", target_schema, target_table, source_schema, source_table)
    }

    /// Replaces the whole target table with the source table.
    #[must_use]
    pub fn replace(target_schema: &str, target_table: &str, source_schema: &str, source_table: &str) -> Self {
        Self::from_source("replace", target_schema, target_table, source_schema, source_table)
    }

    /// Deletes the target rows that match `condition`.
    #[must_use]
    pub fn delete(target_schema: &str, target_table: &str, condition: Value) -> Self {
        Self {
            action: "delete".to_string(),
            target_schema: target_schema.to_string(),
            target_table: target_table.to_string(),
            source_schema: None,
            source_table: None,
            condition: Some(condition),
        }
    }

    #[must_use]
    pub fn with_condition(mut self, condition: Value) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Matches rows whose `column` is equal in the target and source tables.
    #[must_use]
    pub fn matching_column(self, column: &str) -> Self {
        let mut condition = Map::new();
        condition.insert("op".to_string(), Value::from("eq"));
        condition.insert("target-col".to_string(), Value::from(column));
        condition.insert("source-col".to_string(), Value::from(column));
        self.with_condition(Value::Object(condition))
    }
}
