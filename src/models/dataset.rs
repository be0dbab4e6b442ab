//! Columnar in-memory table handed to the bulk exporter.

use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::Value as Json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Column {column} has {found} values, expected {expected}")]
    RaggedColumn {
        column: String,
        expected: usize,
        found: usize,
    },

    #[error("Duplicate column: {0}")]
    DuplicateColumn(String),

    #[error("Records must be a JSON array of objects")]
    NotAnArray,

    #[error("Record {0} is not an object")]
    NotARecord(usize),

    #[error("Unsupported value in column {column} at row {row}")]
    UnsupportedValue { column: String, row: usize },

    #[error("Failed to serialize records: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A single cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    Timestamp(NaiveDateTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    fn from_json(json: &Json, column: &str, row: usize) -> Result<Self, DatasetError> {
        let unsupported = || DatasetError::UnsupportedValue {
            column: column.to_string(),
            row,
        };

        match json {
            Json::Null => Ok(Value::Null),
            Json::Bool(b) => Ok(Value::Bool(*b)),
            Json::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => Ok(Value::Int(i)),
                // Integers past i64 would only survive as a lossy float.
                (None, Some(f)) if n.is_f64() => Ok(Value::Float(f)),
                _ => Err(unsupported()),
            },
            Json::String(s) => Ok(match parse_timestamp(s) {
                Some(ts) => Value::Timestamp(ts),
                None => Value::Text(s.clone()),
            }),
            Json::Array(_) | Json::Object(_) => Err(unsupported()),
        }
    }
}

/// Recognises the ISO form chrono serializes to, and the space separated form
/// timestamps are stored in.
fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
}

const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Column {
    name: String,
    values: Vec<Value>,
}

/// Named columns of equal length. Column order is insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    columns: Vec<Column>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Dataset::push_column`].
    pub fn with_column(
        mut self,
        name: impl Into<String>,
        values: Vec<Value>,
    ) -> Result<Self, DatasetError> {
        self.push_column(name, values)?;
        Ok(self)
    }

    pub fn push_column(
        &mut self,
        name: impl Into<String>,
        values: Vec<Value>,
    ) -> Result<(), DatasetError> {
        let name = name.into();

        if self.columns.iter().any(|c| c.name == name) {
            return Err(DatasetError::DuplicateColumn(name));
        }
        if let Some(first) = self.columns.first() {
            if first.values.len() != values.len() {
                return Err(DatasetError::RaggedColumn {
                    column: name,
                    expected: first.values.len(),
                    found: values.len(),
                });
            }
        }

        self.columns.push(Column { name, values });
        Ok(())
    }

    /// Builds a dataset from serializable records (structs or maps). A field
    /// missing from some records becomes `Null` in those rows.
    pub fn from_records<T: Serialize>(records: &[T]) -> Result<Self, DatasetError> {
        Self::from_json(serde_json::to_value(records)?)
    }

    /// Builds a dataset from a JSON array of flat objects.
    pub fn from_json(json: Json) -> Result<Self, DatasetError> {
        let records = match json {
            Json::Array(records) => records,
            _ => return Err(DatasetError::NotAnArray),
        };

        let mut names: Vec<String> = Vec::new();
        for (row, record) in records.iter().enumerate() {
            let object = record.as_object().ok_or(DatasetError::NotARecord(row))?;
            for key in object.keys() {
                if !names.contains(key) {
                    names.push(key.clone());
                }
            }
        }

        let mut dataset = Dataset::new();
        for name in names {
            let values = records
                .iter()
                .enumerate()
                .map(|(row, record)| {
                    Value::from_json(record.get(name.as_str()).unwrap_or(&Json::Null), &name, row)
                })
                .collect::<Result<Vec<_>, _>>()?;
            dataset.push_column(name, values)?;
        }

        Ok(dataset)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map_or(0, |c| c.values.len())
    }

    pub fn is_empty(&self) -> bool {
        self.num_rows() == 0
    }

    /// Cells of row `index`, in column order.
    pub fn row(&self, index: usize) -> impl Iterator<Item = &Value> {
        self.columns.iter().map(move |c| &c.values[index])
    }
}
