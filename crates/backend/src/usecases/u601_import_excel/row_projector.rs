use serde_json::Value;
use std::collections::BTreeMap;

use super::errors::ImportError;
use crate::shared::record_store::Fields;
use crate::shared::spreadsheet::RawRow;

/// Соответствие "индекс колонки -> имя поля".
///
/// Колонки без имени поля не попадают в маппинг и игнорируются.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMapping {
    columns: BTreeMap<usize, String>,
}

impl ColumnMapping {
    /// Разбирает маппинг из JSON, присланного клиентом.
    ///
    /// Поддерживаются объект `{"0": "name", "2": "email"}` и массив
    /// `["name", null, "email"]`. Значение `null` или пустая строка
    /// означают, что колонка не импортируется.
    pub fn parse(raw: &str) -> Result<Self, ImportError> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| ImportError::InvalidMapping(e.to_string()))?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self, ImportError> {
        let mut columns = BTreeMap::new();
        match value {
            Value::Object(map) => {
                for (key, field) in map {
                    let index = parse_column_index(key)?;
                    if let Some(name) = field_name(key, field)? {
                        columns.insert(index, name);
                    }
                }
            }
            Value::Array(items) => {
                for (index, field) in items.iter().enumerate() {
                    if let Some(name) = field_name(&index.to_string(), field)? {
                        columns.insert(index, name);
                    }
                }
            }
            other => {
                return Err(ImportError::InvalidMapping(format!(
                    "expected an object or an array, got {}",
                    json_type(other)
                )))
            }
        }
        Ok(Self { columns })
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.columns.iter().map(|(index, name)| (*index, name.as_str()))
    }
}

impl<'a> FromIterator<(usize, &'a str)> for ColumnMapping {
    fn from_iter<I: IntoIterator<Item = (usize, &'a str)>>(iter: I) -> Self {
        let columns = iter
            .into_iter()
            .filter(|(_, name)| !name.trim().is_empty())
            .map(|(index, name)| (index, name.trim().to_string()))
            .collect();
        Self { columns }
    }
}

fn parse_column_index(key: &str) -> Result<usize, ImportError> {
    match key.parse::<usize>() {
        // "01" и "+1" не являются индексами колонок
        Ok(index) if index.to_string() == key => Ok(index),
        _ => Err(ImportError::InvalidMapping(format!(
            "column key '{}' is not a non-negative integer",
            key
        ))),
    }
}

fn field_name(key: &str, field: &Value) -> Result<Option<String>, ImportError> {
    match field {
        Value::Null => Ok(None),
        Value::String(name) if name.trim().is_empty() => Ok(None),
        Value::String(name) => Ok(Some(name.trim().to_string())),
        other => Err(ImportError::InvalidMapping(format!(
            "field name for column {} must be a string, got {}",
            key,
            json_type(other)
        ))),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Запись-кандидат, полученная из строки файла
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateRecord {
    /// Zero-based index of the source row
    pub row: usize,
    pub fields: Fields,
}

/// Превращает строки файла в записи-кандидаты.
///
/// В запись попадают только заполненные ячейки; строки без единого
/// заполненного поля отбрасываются. Порядок строк сохраняется.
pub fn project(rows: &[RawRow], mapping: &ColumnMapping) -> Vec<CandidateRecord> {
    rows.iter()
        .enumerate()
        .filter_map(|(row, cells)| {
            let mut fields = Fields::new();
            for (index, name) in mapping.iter() {
                if let Some(value) = cells.get(index).and_then(|cell| cell.to_json()) {
                    fields.insert(name.to_string(), value);
                }
            }
            if fields.is_empty() {
                None
            } else {
                Some(CandidateRecord { row, fields })
            }
        })
        .collect()
}
