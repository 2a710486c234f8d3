use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{ProductCategory, ProductUnit};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShoppingListOptions {
    /// Keep only products with a positive per-person default
    pub essential_only: bool,
    /// Inclusive day window applied to consumption and availability
    pub date_range: Option<DateRange>,
    /// Allow-list of categories; `None` keeps all
    pub categories: Option<Vec<ProductCategory>>,
    /// Accepted but ignored; `items_by_category` is always filled
    pub group_by_category: bool,
    pub quantity_multiplier: Option<f64>,
}

impl Default for ShoppingListOptions {
    fn default() -> Self {
        Self {
            essential_only: false,
            date_range: None,
            categories: None,
            group_by_category: true,
            quantity_multiplier: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateQuantity {
    pub date: NaiveDate,
    pub quantity: f64,
    pub participant_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoppingListItem {
    pub product_id: i64,
    pub product_name: String,
    pub category: ProductCategory,
    pub total_quantity: f64,
    pub unit: ProductUnit,
    pub is_essential: bool,
    pub notes: Option<String>,
    pub by_date: Vec<DateQuantity>,
    pub estimated_cost_per_unit: Option<f64>,
    pub total_estimated_cost: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryGroup {
    pub category: ProductCategory,
    pub category_name: String,
    pub items: Vec<ShoppingListItem>,
    pub subtotal: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoppingList {
    pub trip_id: i64,
    pub trip_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_days: i64,
    pub participant_count: u32,
    pub items: Vec<ShoppingListItem>,
    pub items_by_category: Vec<CategoryGroup>,
    pub total_items: usize,
    pub total_estimated_cost: f64,
    pub essential_items: usize,
    pub optional_items: usize,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarianceRecord {
    pub product_id: i64,
    pub product_name: String,
    pub estimated: f64,
    pub actual: f64,
    pub variance: f64,
    pub variance_percentage: f64,
    pub unit: ProductUnit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    IncreaseStock,
    ReduceStock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub product_id: i64,
    pub product_name: String,
    pub kind: SuggestionKind,
    pub priority: Priority,
    pub reason: String,
    pub suggested_quantity: f64,
    pub unit: ProductUnit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LowStockRecord {
    pub product_id: i64,
    pub product_name: String,
    pub estimated: f64,
    pub actual: f64,
    pub remaining_percentage: f64,
    pub unit: ProductUnit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvExportOptions {
    pub include_daily_breakdown: bool,
    pub include_notes: bool,
    pub sort_by_category: bool,
    pub include_header: bool,
}

impl Default for CsvExportOptions {
    fn default() -> Self {
        Self {
            include_daily_breakdown: false,
            include_notes: true,
            sort_by_category: true,
            include_header: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonExportOptions {
    pub pretty: bool,
    pub indent: usize,
}

impl Default for JsonExportOptions {
    fn default() -> Self {
        Self {
            pretty: true,
            indent: 2,
        }
    }
}
