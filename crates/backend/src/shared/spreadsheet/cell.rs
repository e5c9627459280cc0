use serde_json::{Number, Value};

/// Значение ячейки листа после декодирования
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    String(String),
    /// Целое, точно представимое в `i64` или `u64`
    Integer(i128),
    Number(f64),
    Boolean(bool),
    Empty,
}

/// Строка листа: ячейки по порядку колонок, начиная с колонки A
pub type RawRow = Vec<CellValue>;

impl CellValue {
    /// Present means not `Empty` and not an empty string.
    pub fn is_present(&self) -> bool {
        match self {
            CellValue::Empty => false,
            CellValue::String(s) => !s.is_empty(),
            CellValue::Integer(_) => true,
            CellValue::Number(n) => n.is_finite(),
            CellValue::Boolean(_) => true,
        }
    }

    /// Converts the cell into the JSON value stored in a record.
    /// Whole numbers become integers so that `7` and `7.0` compare equal as keys.
    pub fn to_json(&self) -> Option<Value> {
        if !self.is_present() {
            return None;
        }
        match self {
            CellValue::String(s) => Some(Value::String(s.clone())),
            CellValue::Boolean(b) => Some(Value::Bool(*b)),
            CellValue::Integer(i) => Some(match i64::try_from(*i) {
                Ok(n) => Value::Number(Number::from(n)),
                Err(_) => match u64::try_from(*i) {
                    Ok(n) => Value::Number(Number::from(n)),
                    Err(_) => Value::String(i.to_string()),
                },
            }),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && *n >= i64::MIN as f64 && *n < i64::MAX as f64 {
                    Some(Value::Number(Number::from(*n as i64)))
                } else {
                    Number::from_f64(*n).map(Value::Number)
                }
            }
            CellValue::Empty => None,
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

impl From<i64> for CellValue {
    fn from(i: i64) -> Self {
        CellValue::Integer(i as i128)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Boolean(b)
    }
}
