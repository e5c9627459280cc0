pub mod cell;

pub use cell::{CellValue, RawRow};

use calamine::{open_workbook_auto_from_rs, Data, Reader, Sheets};
use std::io::Cursor;
use thiserror::Error;

/// Ошибки чтения файла таблицы
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("cannot read workbook: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("cannot read CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("unsupported file format")]
    UnsupportedFormat,
}

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const CFB_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
const UTF8_BOM: &str = "\u{feff}";

/// Декодирует файл (xlsx/xlsm/xlsb/xls/ods или CSV) в строки первого листа.
///
/// Первая строка не считается заголовком и возвращается как данные.
/// Позиции абсолютные: ячейка колонки A всегда имеет индекс 0, строка 1
/// листа всегда первая в результате, даже если данные начинаются правее или ниже.
pub fn decode_spreadsheet(bytes: &[u8]) -> Result<Vec<RawRow>, DecodeError> {
    if bytes.starts_with(ZIP_MAGIC) || bytes.starts_with(CFB_MAGIC) {
        return decode_workbook(bytes);
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => decode_csv(text.trim_start_matches(UTF8_BOM)),
        Err(_) => Err(DecodeError::UnsupportedFormat),
    }
}

fn decode_workbook(bytes: &[u8]) -> Result<Vec<RawRow>, DecodeError> {
    let mut workbook: Sheets<_> = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;

    let range = match workbook.worksheet_range_at(0) {
        Some(range) => range?,
        None => return Ok(Vec::new()),
    };

    let (row_offset, col_offset) = range
        .start()
        .map(|(row, col)| (row as usize, col as usize))
        .unwrap_or((0, 0));

    let mut rows: Vec<RawRow> = vec![RawRow::new(); row_offset];
    rows.extend(range.rows().map(|row| {
        let mut cells = vec![CellValue::Empty; col_offset];
        cells.extend(row.iter().map(data_to_cell));
        cells
    }));

    Ok(rows)
}

fn data_to_cell(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::String(s.clone()),
        Data::Int(i) => CellValue::Integer(*i as i128),
        Data::Float(f) => CellValue::Number(*f),
        Data::Bool(b) => CellValue::Boolean(*b),
        // Даты отдаём серийным номером Excel
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) => CellValue::String(s.clone()),
        Data::DurationIso(s) => CellValue::String(s.clone()),
        Data::Error(_) => CellValue::Empty,
    }
}

fn decode_csv(text: &str) -> Result<Vec<RawRow>, DecodeError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(csv_field_to_cell).collect());
    }
    Ok(rows)
}

fn csv_field_to_cell(field: &str) -> CellValue {
    if field.is_empty() {
        return CellValue::Empty;
    }
    if field.eq_ignore_ascii_case("true") {
        return CellValue::Boolean(true);
    }
    if field.eq_ignore_ascii_case("false") {
        return CellValue::Boolean(false);
    }
    if looks_numeric(field) {
        if is_integer_text(field) {
            // Длинные коды не должны терять точность через f64
            return match field.parse::<i128>() {
                Ok(i) if i64::try_from(i).is_ok() || u64::try_from(i).is_ok() => {
                    CellValue::Integer(i)
                }
                _ => CellValue::String(field.to_string()),
            };
        }
        if let Ok(n) = field.parse::<f64>() {
            if n.is_finite() {
                return CellValue::Number(n);
            }
        }
    }
    CellValue::String(field.to_string())
}

fn is_integer_text(field: &str) -> bool {
    let digits = field.strip_prefix('-').unwrap_or(field);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Коды с ведущими нулями ("007") оставляем строками
fn looks_numeric(field: &str) -> bool {
    let digits = field.strip_prefix('-').unwrap_or(field);
    let mut chars = digits.chars();
    match (chars.next(), chars.next()) {
        (Some('0'), Some(c)) if c.is_ascii_digit() => false,
        (Some(c), _) => c.is_ascii_digit(),
        _ => false,
    }
}
