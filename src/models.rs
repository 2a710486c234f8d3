use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{AppError, AppResult};
use crate::shopping::categories::category_display_name;

#[derive(Debug, Error)]
#[error("unknown {kind} code: {code}")]
pub struct UnknownCode {
    kind: &'static str,
    code: String,
}

/// Implements code round-tripping (`FromStr`, `Display`, SQLite text) for a
/// closed enum whose variants are stored as upper-case codes.
macro_rules! coded_enum {
    ($ty:ident, $kind:literal, { $($variant:ident => $code:literal),+ $(,)? }) => {
        impl $ty {
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            pub fn code(&self) -> &'static str {
                match self {
                    $($ty::$variant => $code),+
                }
            }
        }

        impl FromStr for $ty {
            type Err = UnknownCode;

            // Legacy rows carry lower-case codes
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_uppercase().as_str() {
                    $($code => Ok($ty::$variant),)+
                    _ => Err(UnknownCode { kind: $kind, code: s.to_string() }),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.code())
            }
        }

        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.code()))
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e| FromSqlError::Other(Box::new(e)))
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductCategory {
    Food,
    Beverage,
    Snack,
    Meat,
    Dairy,
    Fruit,
    Vegetable,
    Bakery,
    Condiment,
    Frozen,
    Cleaning,
    Hygiene,
    Other,
}

coded_enum!(ProductCategory, "category", {
    Food => "FOOD",
    Beverage => "BEVERAGE",
    Snack => "SNACK",
    Meat => "MEAT",
    Dairy => "DAIRY",
    Fruit => "FRUIT",
    Vegetable => "VEGETABLE",
    Bakery => "BAKERY",
    Condiment => "CONDIMENT",
    Frozen => "FROZEN",
    Cleaning => "CLEANING",
    Hygiene => "HYGIENE",
    Other => "OTHER",
});

impl ProductCategory {
    /// Localized name shown in lists and CSV exports
    pub fn display_name(&self) -> String {
        category_display_name(self.code()).into_owned()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductUnit {
    Unit,
    Kg,
    Gram,
    Liter,
    Milliliter,
    Bottle,
    Can,
    Package,
    Box,
    Dozen,
}

coded_enum!(ProductUnit, "unit", {
    Unit => "UNIT",
    Kg => "KG",
    Gram => "GRAM",
    Liter => "LITER",
    Milliliter => "MILLILITER",
    Bottle => "BOTTLE",
    Can => "CAN",
    Package => "PACKAGE",
    Box => "BOX",
    Dozen => "DOZEN",
});

impl ProductUnit {
    pub fn label(&self) -> &'static str {
        match self {
            ProductUnit::Unit => "unidad",
            ProductUnit::Kg => "kg",
            ProductUnit::Gram => "g",
            ProductUnit::Liter => "L",
            ProductUnit::Milliliter => "ml",
            ProductUnit::Bottle => "botella",
            ProductUnit::Can => "lata",
            ProductUnit::Package => "paquete",
            ProductUnit::Box => "caja",
            ProductUnit::Dozen => "docena",
        }
    }
}

/// Meal a consumption record is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
    Other,
}

coded_enum!(MealType, "meal type", {
    Breakfast => "BREAKFAST",
    Lunch => "LUNCH",
    Dinner => "DINNER",
    Snack => "SNACK",
    Other => "OTHER",
});

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Trip {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Trip {
    /// Inclusive number of days between start and end
    pub fn duration_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateTrip {
    pub name: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl CreateTrip {
    pub fn validate(&self) -> AppResult<()> {
        require_name("trip", &self.name)?;
        if self.start_date > self.end_date {
            return Err(AppError::Validation(format!(
                "trip start date {} is after end date {}",
                self.start_date, self.end_date
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Participant {
    pub id: i64,
    pub trip_id: i64,
    pub name: String,
    pub email: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateParticipant {
    pub trip_id: i64,
    pub name: String,
    pub email: Option<String>,
    pub notes: Option<String>,
}

impl CreateParticipant {
    pub fn validate(&self) -> AppResult<()> {
        require_name("participant", &self.name)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub category: ProductCategory,
    pub unit: ProductUnit,
    pub default_quantity_per_person: Option<f64>,
    pub notes: Option<String>,
}

impl Product {
    /// Products with a positive per-person default are must-buy items
    pub fn is_essential(&self) -> bool {
        self.per_person_quantity() > 0.0
    }

    pub fn per_person_quantity(&self) -> f64 {
        self.default_quantity_per_person.unwrap_or(0.0)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateProduct {
    pub name: String,
    pub category: ProductCategory,
    pub unit: ProductUnit,
    pub default_quantity_per_person: Option<f64>,
    pub notes: Option<String>,
}

impl CreateProduct {
    pub fn validate(&self) -> AppResult<()> {
        require_name("product", &self.name)?;
        if let Some(q) = self.default_quantity_per_person {
            require_non_negative("default quantity per person", q)?;
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateProduct {
    pub id: i64,
    pub name: String,
    pub category: ProductCategory,
    pub unit: ProductUnit,
    pub default_quantity_per_person: Option<f64>,
    pub notes: Option<String>,
}

impl UpdateProduct {
    pub fn validate(&self) -> AppResult<()> {
        require_name("product", &self.name)?;
        if let Some(q) = self.default_quantity_per_person {
            require_non_negative("default quantity per person", q)?;
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Consumption {
    pub id: i64,
    pub trip_id: i64,
    pub participant_id: i64,
    pub product_id: i64,
    pub date: NaiveDate,
    pub meal_type: MealType,
    pub quantity: f64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateConsumption {
    pub trip_id: i64,
    pub participant_id: i64,
    pub product_id: i64,
    pub date: NaiveDate,
    pub meal_type: MealType,
    pub quantity: f64,
    pub notes: Option<String>,
}

impl CreateConsumption {
    pub fn validate(&self) -> AppResult<()> {
        require_non_negative("quantity", self.quantity)
    }
}

/// Trip, participant, product and date are fixed once recorded
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UpdateConsumption {
    pub id: i64,
    pub quantity: Option<f64>,
    pub meal_type: Option<MealType>,
    /// `None` keeps the notes, `Some(None)` clears them
    #[serde(default, deserialize_with = "present_or_null")]
    pub notes: Option<Option<String>>,
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`)
fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl UpdateConsumption {
    pub fn validate(&self) -> AppResult<()> {
        match self.quantity {
            Some(q) => require_non_negative("quantity", q),
            None => Ok(()),
        }
    }
}

/// Meals a participant attends on a given day
#[derive(Debug, Default, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct MealFlags {
    pub breakfast: bool,
    pub lunch: bool,
    pub dinner: bool,
}

impl MealFlags {
    pub fn count(&self) -> u32 {
        [self.breakfast, self.lunch, self.dinner]
            .iter()
            .filter(|attended| **attended)
            .count() as u32
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Availability {
    pub id: i64,
    pub participant_id: i64,
    pub trip_id: i64,
    pub date: NaiveDate,
    pub meals: MealFlags,
    pub notes: Option<String>,
}

/// Upsert payload; participant and date form the key
#[derive(Debug, Serialize, Deserialize)]
pub struct SetAvailability {
    pub participant_id: i64,
    pub trip_id: i64,
    pub date: NaiveDate,
    pub meals: MealFlags,
    pub notes: Option<String>,
}

fn require_name(kind: &str, name: &str) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::Validation(format!("{} name must not be empty", kind)));
    }
    Ok(())
}

fn require_non_negative(field: &str, value: f64) -> AppResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(AppError::Validation(format!(
            "{} must be a non-negative number, got {}",
            field, value
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_codes_parse_case_insensitively() {
        assert_eq!("food".parse::<ProductCategory>().unwrap(), ProductCategory::Food);
        assert_eq!("DAIRY".parse::<ProductCategory>().unwrap(), ProductCategory::Dairy);
        assert!("caviar".parse::<ProductCategory>().is_err());
    }

    #[test]
    fn trip_duration_is_inclusive() {
        let now = Utc::now();
        let trip = Trip {
            id: 1,
            name: "Pirineos".into(),
            description: None,
            start_date: NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 7, 3).unwrap(),
            created_at: now,
            updated_at: now,
        };
        assert_eq!(trip.duration_days(), 3);
    }

    #[test]
    fn create_trip_rejects_inverted_dates() {
        let trip = CreateTrip {
            name: "Costa".into(),
            description: None,
            start_date: NaiveDate::from_ymd_opt(2024, 7, 5).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
        };
        assert!(matches!(trip.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn negative_quantities_are_rejected() {
        let update = UpdateConsumption {
            id: 1,
            quantity: Some(-1.0),
            ..Default::default()
        };
        assert!(update.validate().is_err());
    }

    #[test]
    fn update_notes_distinguish_missing_from_null() {
        let keep: UpdateConsumption = serde_json::from_str(r#"{"id": 1}"#).unwrap();
        assert_eq!(keep.notes, None);

        let clear: UpdateConsumption = serde_json::from_str(r#"{"id": 1, "notes": null}"#).unwrap();
        assert_eq!(clear.notes, Some(None));

        let set: UpdateConsumption = serde_json::from_str(r#"{"id": 1, "notes": "frio"}"#).unwrap();
        assert_eq!(set.notes, Some(Some("frio".to_string())));
    }

    #[test]
    fn meal_flags_count_attended_meals() {
        let flags = MealFlags {
            breakfast: true,
            lunch: false,
            dinner: true,
        };
        assert_eq!(flags.count(), 2);
        assert_eq!(MealFlags::default().count(), 0);
    }
}
