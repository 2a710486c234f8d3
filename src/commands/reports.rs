use crate::error::AppResult;
use crate::shopping::{
    CsvExportOptions, JsonExportOptions, LowStockRecord, ShoppingList, ShoppingListOptions,
    Suggestion, VarianceRecord,
};
use crate::state::AppState;

pub async fn get_shopping_list(
    state: &AppState,
    trip_id: i64,
    options: ShoppingListOptions,
) -> AppResult<ShoppingList> {
    state.shopping.generate(trip_id, &options).await
}

pub async fn get_consumption_variance(
    state: &AppState,
    trip_id: i64,
) -> AppResult<Vec<VarianceRecord>> {
    state.shopping.consumption_variance(trip_id).await
}

pub async fn get_shopping_suggestions(
    state: &AppState,
    trip_id: i64,
) -> AppResult<Vec<Suggestion>> {
    state.shopping.shopping_suggestions(trip_id).await
}

/// Falls back to the configured threshold when none is given
pub async fn get_low_stock(
    state: &AppState,
    trip_id: i64,
    threshold: Option<f64>,
) -> AppResult<Vec<LowStockRecord>> {
    let threshold = threshold.unwrap_or(state.config.low_stock_threshold);
    state.shopping.low_stock_products(trip_id, Some(threshold)).await
}

pub async fn export_csv(
    state: &AppState,
    trip_id: i64,
    list_options: ShoppingListOptions,
    options: CsvExportOptions,
) -> AppResult<String> {
    state.shopping.export_csv(trip_id, &list_options, &options).await
}

pub async fn export_json(
    state: &AppState,
    trip_id: i64,
    list_options: ShoppingListOptions,
    options: JsonExportOptions,
) -> AppResult<String> {
    state.shopping.export_json(trip_id, &list_options, &options).await
}
