//! In-memory join of consumption, availability and the product catalog into
//! shopping list items.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use tracing::warn;

use super::dto::{CategoryGroup, DateQuantity, ShoppingListItem, ShoppingListOptions};
use crate::models::{Availability, Consumption, Product};

#[derive(Default)]
struct ProductTotals {
    quantity: f64,
    by_date: BTreeMap<NaiveDate, DateQuantity>,
}

/// Builds sorted shopping list items for one trip's records.
///
/// A date bucket's `participant_count` is the number of availability rows on
/// that day, not the number of distinct participants.
pub fn aggregate_items(
    consumptions: &[Consumption],
    availabilities: &[Availability],
    products: &[Product],
    options: &ShoppingListOptions,
) -> Vec<ShoppingListItem> {
    let in_range = |date: NaiveDate| options.date_range.map_or(true, |r| r.contains(date));

    let mut rows_per_day: HashMap<NaiveDate, u32> = HashMap::new();
    for availability in availabilities.iter().filter(|a| in_range(a.date)) {
        *rows_per_day.entry(availability.date).or_default() += 1;
    }

    let mut totals: BTreeMap<i64, ProductTotals> = BTreeMap::new();
    for consumption in consumptions.iter().filter(|c| in_range(c.date)) {
        let entry = totals.entry(consumption.product_id).or_default();
        entry.quantity += consumption.quantity;

        let bucket = entry
            .by_date
            .entry(consumption.date)
            .or_insert_with(|| DateQuantity {
                date: consumption.date,
                quantity: 0.0,
                participant_count: rows_per_day.get(&consumption.date).copied().unwrap_or(0),
            });
        bucket.quantity += consumption.quantity;
    }

    let catalog: HashMap<i64, &Product> = products.iter().map(|p| (p.id, p)).collect();
    let multiplier = options.quantity_multiplier.filter(|m| *m != 1.0);

    let mut items: Vec<ShoppingListItem> = totals
        .into_iter()
        .filter_map(|(product_id, totals)| {
            let Some(product) = catalog.get(&product_id) else {
                warn!(product_id, "consumption references a product missing from the catalog");
                return None;
            };
            Some(build_item(product, totals))
        })
        .filter(|item| !options.essential_only || item.is_essential)
        .filter(|item| {
            options
                .categories
                .as_ref()
                .map_or(true, |allowed| allowed.contains(&item.category))
        })
        .map(|mut item| {
            if let Some(m) = multiplier {
                apply_multiplier(&mut item, m);
            }
            item
        })
        .collect();

    sort_items(&mut items);
    items
}

fn build_item(product: &Product, totals: ProductTotals) -> ShoppingListItem {
    ShoppingListItem {
        product_id: product.id,
        product_name: product.name.clone(),
        category: product.category,
        total_quantity: totals.quantity,
        unit: product.unit,
        is_essential: product.is_essential(),
        notes: product.notes.clone(),
        by_date: totals.by_date.into_values().collect(),
        estimated_cost_per_unit: None,
        total_estimated_cost: None,
    }
}

/// Scales and rounds up the total and every day bucket independently, so
/// the total need not equal the sum of the rounded buckets.
fn apply_multiplier(item: &mut ShoppingListItem, multiplier: f64) {
    item.total_quantity = (item.total_quantity * multiplier).ceil();
    for day in &mut item.by_date {
        day.quantity = (day.quantity * multiplier).ceil();
    }
}

/// Category code first, then product name
pub fn sort_items(items: &mut [ShoppingListItem]) {
    items.sort_by(|a, b| {
        a.category
            .code()
            .cmp(b.category.code())
            .then_with(|| compare_names(&a.product_name, &b.product_name))
    });
}

/// Locale-style name ordering: base letters first, then accents (unaccented
/// first), then case (lower-case first), then code points so the order stays
/// total.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    fold(a)
        .cmp(&fold(b))
        .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
        .then_with(|| case_key(a).cmp(&case_key(b)))
        .then_with(|| a.cmp(b))
}

fn case_key(s: &str) -> Vec<bool> {
    s.chars().map(char::is_uppercase).collect()
}

fn fold(s: &str) -> String {
    s.chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ñ' => 'n',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

/// Buckets items by category in first-seen order, keeping item order
pub fn group_by_category(items: &[ShoppingListItem]) -> Vec<CategoryGroup> {
    let mut groups: Vec<CategoryGroup> = Vec::new();
    for item in items {
        let cost = item.total_estimated_cost.unwrap_or(0.0);
        match groups.iter_mut().find(|g| g.category == item.category) {
            Some(group) => {
                group.items.push(item.clone());
                group.subtotal += cost;
            }
            None => groups.push(CategoryGroup {
                category: item.category,
                category_name: item.category.display_name(),
                items: vec![item.clone()],
                subtotal: cost,
            }),
        }
    }
    groups
}
