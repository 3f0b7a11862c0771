//! Insertable purchase record and the helpers built on top of it.

use chrono::{DateTime, FixedOffset, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::{NotSet, Set};
use serde::{Deserialize, Serialize};

use crate::entities::state_purchases;

/// Number of contact person slots per purchase (phone/fio/email triples).
pub const CONTACT_SLOTS: usize = 3;

/// Values must stay strictly below 10^13 to fit `numeric(15, 2)`.
const MONEY_LIMIT: i64 = 10_000_000_000_000;

/// A purchase record that has not been stored yet.
///
/// `extraction_dt` is optional here because a record parsed from an export
/// row only learns its extraction time from the export file itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewStatePurchase {
    pub purchase_number: String,
    pub eis_url: Option<String>,
    pub winner_name: Option<String>,
    pub inn: Option<String>,
    pub time_zone: Option<String>,
    pub result_date: Option<NaiveDate>,
    pub customer_name: Option<String>,
    pub nmck: Option<Decimal>,
    pub contract_securing: Option<Decimal>,
    pub warranty_obligations_securing: Option<Decimal>,
    pub contract_end_date: Option<NaiveDate>,
    pub winner_price: Option<Decimal>,
    pub phone_1: Option<String>,
    pub fio_1: Option<String>,
    pub email_1: Option<String>,
    pub phone_2: Option<String>,
    pub fio_2: Option<String>,
    pub email_2: Option<String>,
    pub phone_3: Option<String>,
    pub fio_3: Option<String>,
    pub email_3: Option<String>,
    pub smp_advantages: Option<String>,
    pub smp_status: Option<String>,
    pub extraction_dt: Option<DateTime<FixedOffset>>,
}

/// One filled contact slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Contact {
    /// Slot number, 1-based
    pub index: usize,
    pub fio: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    MissingField(&'static str),
    NumericOverflow { column: &'static str, value: Decimal },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::MissingField(column) => {
                write!(f, "Missing required field: {}", column)
            }
            ValidationError::NumericOverflow { column, value } => {
                write!(f, "Value {} does not fit numeric(15, 2) in column {}", value, column)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Whether `value` can be stored in a `numeric(15, 2)` column.
///
/// Postgres rounds extra fractional digits half away from zero before the
/// precision check, so the same rounding is applied here.
pub fn fits_numeric_15_2(value: &Decimal) -> bool {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.abs() < Decimal::from(MONEY_LIMIT)
}

impl NewStatePurchase {
    pub fn new(purchase_number: impl Into<String>) -> Self {
        Self {
            purchase_number: purchase_number.into(),
            ..Default::default()
        }
    }

    pub fn with_extraction_dt(mut self, extraction_dt: DateTime<FixedOffset>) -> Self {
        self.extraction_dt = Some(extraction_dt);
        self
    }

    /// Check the constraints the table enforces, before a round trip.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.extraction_dt.is_none() {
            return Err(ValidationError::MissingField("extraction_dt"));
        }

        for (column, value) in self.money_fields() {
            if let Some(value) = value {
                if !fits_numeric_15_2(value) {
                    return Err(ValidationError::NumericOverflow {
                        column,
                        value: *value,
                    });
                }
            }
        }

        Ok(())
    }

    fn money_fields(&self) -> [(&'static str, &Option<Decimal>); 4] {
        [
            ("nmck", &self.nmck),
            ("contract_securing", &self.contract_securing),
            ("warranty_obligations_securing", &self.warranty_obligations_securing),
            ("winner_price", &self.winner_price),
        ]
    }

    /// Filled contact slots in slot order. Slots with no data are skipped.
    pub fn contacts(&self) -> Vec<Contact> {
        let slots = [
            (&self.fio_1, &self.phone_1, &self.email_1),
            (&self.fio_2, &self.phone_2, &self.email_2),
            (&self.fio_3, &self.phone_3, &self.email_3),
        ];

        slots
            .into_iter()
            .enumerate()
            .filter(|(_, (fio, phone, email))| {
                non_empty(fio).is_some() || non_empty(phone).is_some() || non_empty(email).is_some()
            })
            .map(|(i, (fio, phone, email))| Contact {
                index: i + 1,
                fio: non_empty(fio).map(str::to_string),
                phone: non_empty(phone).map(str::to_string),
                email: non_empty(email).map(str::to_string),
            })
            .collect()
    }

    /// All known contacts in one line, the way they are shown to managers.
    pub fn contact_details(&self) -> String {
        let details: Vec<String> = self
            .contacts()
            .into_iter()
            .map(|contact| {
                let mut parts = Vec::new();
                if let Some(fio) = &contact.fio {
                    parts.push(fio.clone());
                }
                if let Some(phone) = &contact.phone {
                    parts.push(format!("Тел: {}", phone));
                }
                if let Some(email) = &contact.email {
                    parts.push(format!("Email: {}", email));
                }
                format!("Контакт {}: ({})", contact.index, parts.join(", "))
            })
            .collect();

        if details.is_empty() {
            "Контактные данные: Нет данных".to_string()
        } else {
            details.join("; ")
        }
    }

    /// Purchase number and EIS link combined into one line.
    pub fn full_purchase_link(&self) -> String {
        let mut parts = Vec::new();
        if !self.purchase_number.is_empty() {
            parts.push(format!("Номер закупки: {}", self.purchase_number));
        }
        if let Some(url) = non_empty(&self.eis_url) {
            parts.push(format!("Ссылка в ЕИС: {}", url));
        }

        if parts.is_empty() {
            "Ссылка на закупку: Нет данных".to_string()
        } else {
            parts.join(", ")
        }
    }

    /// Active model for insertion. A missing `extraction_dt` is left unset
    /// so that the database reports the violation itself.
    pub fn into_active_model(self) -> state_purchases::ActiveModel {
        state_purchases::ActiveModel {
            id: NotSet,
            eis_url: Set(self.eis_url),
            winner_name: Set(self.winner_name),
            inn: Set(self.inn),
            time_zone: Set(self.time_zone),
            result_date: Set(self.result_date),
            customer_name: Set(self.customer_name),
            nmck: Set(self.nmck),
            contract_securing: Set(self.contract_securing),
            warranty_obligations_securing: Set(self.warranty_obligations_securing),
            contract_end_date: Set(self.contract_end_date),
            winner_price: Set(self.winner_price),
            phone_1: Set(self.phone_1),
            fio_1: Set(self.fio_1),
            email_1: Set(self.email_1),
            phone_2: Set(self.phone_2),
            fio_2: Set(self.fio_2),
            email_2: Set(self.email_2),
            phone_3: Set(self.phone_3),
            fio_3: Set(self.fio_3),
            email_3: Set(self.email_3),
            smp_advantages: Set(self.smp_advantages),
            smp_status: Set(self.smp_status),
            extraction_dt: match self.extraction_dt {
                Some(dt) => Set(dt),
                None => NotSet,
            },
            purchase_number: Set(self.purchase_number),
        }
    }
}

impl From<state_purchases::Model> for NewStatePurchase {
    fn from(model: state_purchases::Model) -> Self {
        Self {
            purchase_number: model.purchase_number,
            eis_url: model.eis_url,
            winner_name: model.winner_name,
            inn: model.inn,
            time_zone: model.time_zone,
            result_date: model.result_date,
            customer_name: model.customer_name,
            nmck: model.nmck,
            contract_securing: model.contract_securing,
            warranty_obligations_securing: model.warranty_obligations_securing,
            contract_end_date: model.contract_end_date,
            winner_price: model.winner_price,
            phone_1: model.phone_1,
            fio_1: model.fio_1,
            email_1: model.email_1,
            phone_2: model.phone_2,
            fio_2: model.fio_2,
            email_2: model.email_2,
            phone_3: model.phone_3,
            fio_3: model.fio_3,
            email_3: model.email_3,
            smp_advantages: model.smp_advantages,
            smp_status: model.smp_status,
            extraction_dt: Some(model.extraction_dt),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn extracted_at() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_numeric_15_2_bounds() {
        assert!(fits_numeric_15_2(&dec!(1234567890123.45)));
        assert!(fits_numeric_15_2(&dec!(9999999999999.99)));
        assert!(fits_numeric_15_2(&dec!(-9999999999999.99)));
        assert!(fits_numeric_15_2(&dec!(0.001)));

        assert!(!fits_numeric_15_2(&dec!(12345678901234.5)));
        // Rounds up to 10^13
        assert!(!fits_numeric_15_2(&dec!(9999999999999.995)));
    }

    #[test]
    fn test_validate_requires_extraction_dt() {
        let purchase = NewStatePurchase::new("PN-0002");
        assert_eq!(
            purchase.validate(),
            Err(ValidationError::MissingField("extraction_dt"))
        );

        let purchase = purchase.with_extraction_dt(extracted_at());
        assert_eq!(purchase.validate(), Ok(()));
    }

    #[test]
    fn test_validate_rejects_money_overflow() {
        let mut purchase = NewStatePurchase::new("PN-0003").with_extraction_dt(extracted_at());
        purchase.nmck = Some(dec!(1234567890123.45));
        assert!(purchase.validate().is_ok());

        purchase.winner_price = Some(dec!(123456789012345));
        assert_eq!(
            purchase.validate(),
            Err(ValidationError::NumericOverflow {
                column: "winner_price",
                value: dec!(123456789012345),
            })
        );
    }

    #[test]
    fn test_contacts_skip_empty_slots() {
        let mut purchase = NewStatePurchase::new("PN-1");
        purchase.fio_1 = Some("Иванов Иван".to_string());
        purchase.phone_1 = Some("79161234567".to_string());
        purchase.fio_2 = Some("   ".to_string());
        purchase.email_3 = Some("buyer@example.ru".to_string());

        let contacts = purchase.contacts();
        assert_eq!(contacts.len(), 2);
        assert_eq!(contacts[0].index, 1);
        assert_eq!(contacts[1].index, 3);
        assert_eq!(contacts[1].fio, None);
        assert!(contacts.len() <= CONTACT_SLOTS);
    }

    #[test]
    fn test_contact_details() {
        let mut purchase = NewStatePurchase::new("PN-1");
        assert_eq!(purchase.contact_details(), "Контактные данные: Нет данных");

        purchase.fio_1 = Some("Иванов Иван".to_string());
        purchase.phone_1 = Some("79161234567".to_string());
        purchase.email_2 = Some("buyer@example.ru".to_string());

        assert_eq!(
            purchase.contact_details(),
            "Контакт 1: (Иванов Иван, Тел: 79161234567); Контакт 2: (Email: buyer@example.ru)"
        );
    }

    #[test]
    fn test_full_purchase_link() {
        let mut purchase = NewStatePurchase::new("");
        assert_eq!(purchase.full_purchase_link(), "Ссылка на закупку: Нет данных");

        purchase.purchase_number = "0373100012324000001".to_string();
        assert_eq!(
            purchase.full_purchase_link(),
            "Номер закупки: 0373100012324000001"
        );

        purchase.eis_url = Some("https://zakupki.gov.ru/epz/order/1".to_string());
        assert_eq!(
            purchase.full_purchase_link(),
            "Номер закупки: 0373100012324000001, Ссылка в ЕИС: https://zakupki.gov.ru/epz/order/1"
        );
    }

    #[test]
    fn test_active_model_leaves_missing_extraction_dt_unset() {
        let active = NewStatePurchase::new("PN-0002").into_active_model();
        assert!(active.extraction_dt.is_not_set());
        assert!(active.id.is_not_set());
        assert_eq!(active.purchase_number, Set("PN-0002".to_string()));
    }

    #[test]
    fn test_stored_row_converts_back_to_record() {
        let model = state_purchases::Model {
            id: 42,
            eis_url: Some("https://zakupki.gov.ru/epz/order/1".to_string()),
            winner_name: Some("ООО Ромашка".to_string()),
            inn: Some("7701234567".to_string()),
            time_zone: None,
            result_date: NaiveDate::from_ymd_opt(2025, 5, 15),
            customer_name: None,
            nmck: Some(dec!(1500000.50)),
            contract_securing: None,
            warranty_obligations_securing: None,
            contract_end_date: None,
            winner_price: Some(dec!(1200000.25)),
            phone_1: Some("79161234567".to_string()),
            fio_1: Some("Иванов Иван".to_string()),
            email_1: None,
            phone_2: None,
            fio_2: None,
            email_2: None,
            phone_3: None,
            fio_3: None,
            email_3: Some("buyer@example.ru".to_string()),
            smp_advantages: None,
            smp_status: Some("Да".to_string()),
            extraction_dt: extracted_at(),
            purchase_number: "0373100012324000001".to_string(),
        };

        let record = NewStatePurchase::from(model.clone());
        assert_eq!(record.purchase_number, model.purchase_number);
        assert_eq!(record.extraction_dt, Some(model.extraction_dt));
        assert_eq!(record.winner_price, model.winner_price);
        assert_eq!(record.validate(), Ok(()));

        let active = record.into_active_model();
        assert!(active.id.is_not_set());
        assert_eq!(active.extraction_dt, Set(extracted_at()));
        assert_eq!(active.nmck, Set(Some(dec!(1500000.50))));
        assert_eq!(active.email_3, Set(Some("buyer@example.ru".to_string())));
        assert_eq!(active.purchase_number, Set("0373100012324000001".to_string()));
    }
}
