//! Mapping of one row of the "Победители закупок" export to a purchase record.
//!
//! The export is a spreadsheet with Russian headers. Reading the workbook is
//! left to the caller; this module only deals with already extracted cells.

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use super::state_purchase::NewStatePurchase;

/// Export files are named like `Победители закупок 01.06.2025 1430.xlsx`.
pub const FILE_NAME_PREFIX: &str = "Победители закупок";
const FILE_NAME_STAMP_FORMAT: &str = "%d.%m.%Y %H%M";
const CELL_DATE_FORMAT: &str = "%d.%m.%Y";

pub mod headers {
    pub const PURCHASE_NUMBER: &str = "Номер закупки";
    pub const EIS_URL: &str = "Закупка в ЕИС";
    pub const WINNER_NAME: &str = "Победитель";
    pub const INN: &str = "ИНН победителя";
    pub const RESULT_DATE: &str = "Дата подведения итогов";
    pub const CUSTOMER_NAME: &str = "Заказчик";
    pub const NMCK: &str = "НМЦК";
    pub const CONTRACT_SECURING: &str = "Обеспечение контракта";
    pub const WARRANTY_OBLIGATIONS_SECURING: &str = "Обеспечение гарантийных обязательств";
    pub const CONTRACT_END_DATE: &str = "Окончание контракта";
    pub const WINNER_PRICE: &str = "Цена победителя";
    pub const PHONES: [&str; 3] = ["Телефон 1", "Телефон 2", "Телефон 3"];
    pub const FIOS: [&str; 3] = ["ФИО 1", "ФИО 2", "ФИО 3"];
    pub const EMAILS: [&str; 3] = ["Email 1", "Email 2", "Email 3"];
    /// Some exports duplicate the FIO columns; the duplicates land in the third slot.
    pub const FIO_3_FALLBACKS: [&str; 3] = ["ФИО 1.1", "ФИО 2.1", "ФИО 3.1"];
    pub const SMP_ADVANTAGES: &str = "Преимущества СМП";
    pub const SMP_STATUS: &str = "Статус СМП у победителя";
}

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
}

/// A single spreadsheet cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

/// Header -> cell for one data row.
pub type SourceRow = HashMap<String, CellValue>;

#[derive(Debug, Clone, PartialEq)]
pub enum SourceRowError {
    MissingPurchaseNumber,
    InvalidEmail { column: String, value: String },
    InvalidAmount { column: String, value: String },
    InvalidFileName(String),
}

impl std::fmt::Display for SourceRowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceRowError::MissingPurchaseNumber => write!(f, "Row has no purchase number"),
            SourceRowError::InvalidEmail { column, value } => {
                write!(f, "Invalid email in column '{}': {}", column, value)
            }
            SourceRowError::InvalidAmount { column, value } => {
                write!(f, "Invalid amount in column '{}': {}", column, value)
            }
            SourceRowError::InvalidFileName(name) => {
                write!(f, "Cannot read extraction time from file name: {}", name)
            }
        }
    }
}

impl std::error::Error for SourceRowError {}

/// Extraction time encoded in an export file name.
///
/// The stamp carries no zone, `offset` says which one it was written in.
pub fn extraction_dt_from_file_name(
    file_name: &str,
    offset: FixedOffset,
) -> Result<DateTime<FixedOffset>, SourceRowError> {
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| SourceRowError::InvalidFileName(file_name.to_string()))?;

    let stamp = stem.replace(FILE_NAME_PREFIX, "");
    let naive = NaiveDateTime::parse_from_str(stamp.trim(), FILE_NAME_STAMP_FORMAT)
        .map_err(|_| SourceRowError::InvalidFileName(file_name.to_string()))?;

    offset
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| SourceRowError::InvalidFileName(file_name.to_string()))
}

/// Build a record from one export row.
pub fn from_source_row(
    row: &SourceRow,
    extraction_dt: Option<DateTime<FixedOffset>>,
) -> Result<NewStatePurchase, SourceRowError> {
    let purchase_number =
        identifier(row, headers::PURCHASE_NUMBER).ok_or(SourceRowError::MissingPurchaseNumber)?;

    let [phone_1, phone_2, phone_3] = headers::PHONES.map(|h| identifier(row, h));
    let [fio_1, fio_2, _] = headers::FIOS.map(|h| text(row, h));
    let fio_3 = std::iter::once(headers::FIOS[2])
        .chain(headers::FIO_3_FALLBACKS)
        .find_map(|h| text(row, h));

    let email_1 = email(row, headers::EMAILS[0])?;
    let email_2 = email(row, headers::EMAILS[1])?;
    let email_3 = email(row, headers::EMAILS[2])?;

    Ok(NewStatePurchase {
        purchase_number,
        eis_url: text(row, headers::EIS_URL),
        winner_name: text(row, headers::WINNER_NAME),
        inn: identifier(row, headers::INN),
        time_zone: None,
        result_date: date(row, headers::RESULT_DATE),
        customer_name: text(row, headers::CUSTOMER_NAME),
        nmck: amount(row, headers::NMCK)?,
        contract_securing: amount(row, headers::CONTRACT_SECURING)?,
        warranty_obligations_securing: amount(row, headers::WARRANTY_OBLIGATIONS_SECURING)?,
        contract_end_date: date(row, headers::CONTRACT_END_DATE),
        winner_price: amount(row, headers::WINNER_PRICE)?,
        phone_1,
        fio_1,
        email_1,
        phone_2,
        fio_2,
        email_2,
        phone_3,
        fio_3,
        email_3,
        smp_advantages: text(row, headers::SMP_ADVANTAGES),
        smp_status: text(row, headers::SMP_STATUS),
        extraction_dt,
    })
}

fn cell<'a>(row: &'a SourceRow, header: &str) -> Option<&'a CellValue> {
    match row.get(header) {
        None | Some(CellValue::Empty) => None,
        Some(CellValue::Number(n)) if n.is_nan() => None,
        Some(CellValue::Text(s)) if s.trim().is_empty() => None,
        Some(value) => Some(value),
    }
}

fn text(row: &SourceRow, header: &str) -> Option<String> {
    match cell(row, header)? {
        CellValue::Text(s) => Some(s.trim().to_string()),
        CellValue::Number(n) => Some(n.to_string()),
        CellValue::Date(d) => Some(d.format(CELL_DATE_FORMAT).to_string()),
        CellValue::Empty => None,
    }
}

/// Phones, INN and purchase numbers. Spreadsheets hand these over as floats
/// when the column was not formatted as text; the fractional part is dropped.
fn identifier(row: &SourceRow, header: &str) -> Option<String> {
    match cell(row, header)? {
        CellValue::Number(n) if n.abs() < 1e18 => Some(format!("{}", n.trunc() as i64)),
        _ => text(row, header),
    }
}

/// Unparseable dates are dropped rather than failing the row.
fn date(row: &SourceRow, header: &str) -> Option<NaiveDate> {
    match cell(row, header)? {
        CellValue::Date(d) => Some(*d),
        CellValue::Text(s) => NaiveDate::parse_from_str(s.trim(), CELL_DATE_FORMAT).ok(),
        _ => None,
    }
}

fn amount(row: &SourceRow, header: &str) -> Result<Option<Decimal>, SourceRowError> {
    let invalid = |value: String| SourceRowError::InvalidAmount {
        column: header.to_string(),
        value,
    };

    match cell(row, header) {
        None => Ok(None),
        Some(CellValue::Number(n)) => Decimal::from_f64(*n)
            .map(|d| Some(round_money(d)))
            .ok_or_else(|| invalid(n.to_string())),
        Some(CellValue::Text(s)) => {
            let normalized: String = s
                .chars()
                .filter(|c| !c.is_whitespace())
                .map(|c| if c == ',' { '.' } else { c })
                .collect();
            Decimal::from_str(&normalized)
                .map(|d| Some(round_money(d)))
                .map_err(|_| invalid(s.clone()))
        }
        Some(CellValue::Date(d)) => Err(invalid(d.to_string())),
        Some(CellValue::Empty) => Ok(None),
    }
}

/// Same rounding Postgres applies when storing into `numeric(15, 2)`.
fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn email(row: &SourceRow, header: &str) -> Result<Option<String>, SourceRowError> {
    match text(row, header) {
        None => Ok(None),
        Some(value) if EMAIL_RE.is_match(&value) => Ok(Some(value)),
        Some(value) => Err(SourceRowError::InvalidEmail {
            column: header.to_string(),
            value,
        }),
    }
}
