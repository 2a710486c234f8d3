//! Estimated versus actual consumption, and the stock advice derived from it.

use std::collections::HashMap;

use super::dto::{LowStockRecord, Priority, Suggestion, SuggestionKind, VarianceRecord};
use crate::models::{Availability, Consumption, Product};

pub const DEFAULT_LOW_STOCK_THRESHOLD: f64 = 20.0;

/// Absorbs float noise such as 56/70 landing on 20.000000000000004
const THRESHOLD_EPSILON: f64 = 1e-9;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Compares each estimable product's expected use against what was logged.
///
/// The estimate is `default_quantity_per_person` times the trip-wide count of
/// attended meals, summed over every availability row. Products without a
/// per-person default have no basis and are left out.
pub fn consumption_variance(
    products: &[Product],
    consumptions: &[Consumption],
    availabilities: &[Availability],
) -> Vec<VarianceRecord> {
    let participant_meals: f64 = availabilities
        .iter()
        .map(|a| f64::from(a.meals.count()))
        .sum();

    let mut actual_by_product: HashMap<i64, f64> = HashMap::new();
    for consumption in consumptions {
        *actual_by_product.entry(consumption.product_id).or_default() += consumption.quantity;
    }

    let mut records: Vec<VarianceRecord> = products
        .iter()
        .filter(|p| p.per_person_quantity() != 0.0)
        .map(|product| {
            let estimated = product.per_person_quantity() * participant_meals;
            let actual = actual_by_product.get(&product.id).copied().unwrap_or(0.0);
            let variance = actual - estimated;
            let variance_percentage = if estimated > 0.0 {
                round2(variance / estimated * 100.0)
            } else {
                0.0
            };

            VarianceRecord {
                product_id: product.id,
                product_name: product.name.clone(),
                estimated,
                actual,
                variance,
                variance_percentage,
                unit: product.unit,
            }
        })
        .collect();

    records.sort_by(|a, b| b.variance.abs().total_cmp(&a.variance.abs()));
    records
}

/// Over-consumption asks for more stock; consumption more than 30% under the
/// estimate asks for less. Anything in between yields nothing.
pub fn shopping_suggestions(records: &[VarianceRecord]) -> Vec<Suggestion> {
    records
        .iter()
        .filter_map(|r| {
            if r.variance > 0.0 {
                let priority = if r.variance_percentage > 50.0 {
                    Priority::High
                } else if r.variance_percentage > 20.0 {
                    Priority::Medium
                } else {
                    Priority::Low
                };
                Some(Suggestion {
                    product_id: r.product_id,
                    product_name: r.product_name.clone(),
                    kind: SuggestionKind::IncreaseStock,
                    priority,
                    reason: format!(
                        "Consumo {:.2}% superior al estimado",
                        r.variance_percentage
                    ),
                    suggested_quantity: (r.estimated * 1.2).ceil(),
                    unit: r.unit,
                })
            } else if r.variance < -0.3 * r.estimated {
                Some(Suggestion {
                    product_id: r.product_id,
                    product_name: r.product_name.clone(),
                    kind: SuggestionKind::ReduceStock,
                    priority: Priority::Low,
                    reason: format!(
                        "Consumo {:.2}% inferior al estimado",
                        r.variance_percentage.abs()
                    ),
                    suggested_quantity: (r.actual * 1.1).ceil(),
                    unit: r.unit,
                })
            } else {
                None
            }
        })
        .collect()
}

/// Products whose remaining share of the estimate is at or below
/// `threshold_percentage`, most depleted first.
///
/// The comparison uses the unrounded share; only the reported
/// `remaining_percentage` is rounded to two decimals.
pub fn low_stock(records: &[VarianceRecord], threshold_percentage: f64) -> Vec<LowStockRecord> {
    let mut low: Vec<(f64, LowStockRecord)> = records
        .iter()
        .map(|r| {
            let remaining = if r.estimated == 0.0 {
                100.0
            } else {
                (r.estimated - r.actual) / r.estimated * 100.0
            };
            (remaining, r)
        })
        .filter(|(remaining, _)| *remaining <= threshold_percentage + THRESHOLD_EPSILON)
        .map(|(remaining, r)| {
            let record = LowStockRecord {
                product_id: r.product_id,
                product_name: r.product_name.clone(),
                estimated: r.estimated,
                actual: r.actual,
                remaining_percentage: round2(remaining),
                unit: r.unit,
            };
            (remaining, record)
        })
        .collect();

    low.sort_by(|a, b| a.0.total_cmp(&b.0));
    low.into_iter().map(|(_, record)| record).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MealFlags, MealType, ProductCategory, ProductUnit};
    use chrono::{NaiveDate, Utc};

    fn product(id: i64, per_person: Option<f64>) -> Product {
        Product {
            id,
            name: format!("Producto {}", id),
            category: ProductCategory::Food,
            unit: ProductUnit::Kg,
            default_quantity_per_person: per_person,
            notes: None,
        }
    }

    fn consumed(product_id: i64, quantity: f64) -> Consumption {
        let now = Utc::now();
        Consumption {
            id: 0,
            trip_id: 1,
            participant_id: 1,
            product_id,
            date: NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
            meal_type: MealType::Dinner,
            quantity,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn breakfast_and_lunch(participant_id: i64) -> Availability {
        Availability {
            id: 0,
            participant_id,
            trip_id: 1,
            date: NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
            meals: MealFlags {
                breakfast: true,
                lunch: true,
                dinner: false,
            },
            notes: None,
        }
    }

    fn record(estimated: f64, actual: f64) -> VarianceRecord {
        let variance = actual - estimated;
        VarianceRecord {
            product_id: 1,
            product_name: "Arroz".into(),
            estimated,
            actual,
            variance,
            variance_percentage: if estimated > 0.0 {
                round2(variance / estimated * 100.0)
            } else {
                0.0
            },
            unit: ProductUnit::Kg,
        }
    }

    #[test]
    fn variance_uses_trip_wide_meal_count() {
        let products = vec![product(1, Some(1.0))];
        let availabilities = vec![breakfast_and_lunch(1), breakfast_and_lunch(2)];
        let consumptions = vec![consumed(1, 4.0), consumed(1, 2.0)];

        let records = consumption_variance(&products, &consumptions, &availabilities);
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.estimated, 4.0);
        assert_eq!(r.actual, 6.0);
        assert_eq!(r.variance, 2.0);
        assert_eq!(r.variance_percentage, 50.0);
    }

    #[test]
    fn products_without_basis_are_excluded() {
        let products = vec![product(1, None), product(2, Some(0.0)), product(3, Some(0.5))];
        let records =
            consumption_variance(&products, &[consumed(1, 3.0)], &[breakfast_and_lunch(1)]);
        let ids: Vec<i64> = records.iter().map(|r| r.product_id).collect();
        assert_eq!(ids, vec![3]);
    }

    #[test]
    fn no_availability_means_zero_percentage() {
        let records = consumption_variance(&[product(1, Some(2.0))], &[consumed(1, 3.0)], &[]);
        assert_eq!(records[0].estimated, 0.0);
        assert_eq!(records[0].variance, 3.0);
        assert_eq!(records[0].variance_percentage, 0.0);
    }

    #[test]
    fn records_sort_by_absolute_variance() {
        let products = vec![product(1, Some(1.0)), product(2, Some(1.0)), product(3, Some(1.0))];
        let availabilities = vec![breakfast_and_lunch(1), breakfast_and_lunch(2)];
        // estimated 4 for each
        let consumptions = vec![consumed(1, 5.0), consumed(2, 0.0), consumed(3, 7.0)];

        let records = consumption_variance(&products, &consumptions, &availabilities);
        let order: Vec<i64> = records.iter().map(|r| r.product_id).collect();
        assert_eq!(order, vec![2, 3, 1]);
    }

    #[test]
    fn increase_priority_thresholds() {
        let high = shopping_suggestions(&[record(10.0, 16.0)]);
        assert_eq!(high[0].priority, Priority::High);
        assert_eq!(high[0].kind, SuggestionKind::IncreaseStock);
        assert_eq!(high[0].suggested_quantity, 12.0);

        let medium = shopping_suggestions(&[record(10.0, 13.0)]);
        assert_eq!(medium[0].priority, Priority::Medium);

        let low = shopping_suggestions(&[record(10.0, 11.0)]);
        assert_eq!(low[0].priority, Priority::Low);
    }

    #[test]
    fn significant_under_consumption_suggests_reduction() {
        let suggestions = shopping_suggestions(&[record(10.0, 5.0)]);
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].kind, SuggestionKind::ReduceStock);
        assert_eq!(suggestions[0].priority, Priority::Low);
        assert_eq!(suggestions[0].suggested_quantity, 6.0);
    }

    #[test]
    fn moderate_under_consumption_is_ignored() {
        assert!(shopping_suggestions(&[record(10.0, 8.0)]).is_empty());
        assert!(shopping_suggestions(&[record(10.0, 10.0)]).is_empty());
    }

    #[test]
    fn low_stock_boundary() {
        let records = vec![record(100.0, 85.0)];

        let included = low_stock(&records, 20.0);
        assert_eq!(included.len(), 1);
        assert_eq!(included[0].remaining_percentage, 15.0);

        assert!(low_stock(&records, 10.0).is_empty());
    }

    #[test]
    fn low_stock_compares_unrounded_share() {
        // 20.004% remaining would round to 20.0
        assert!(low_stock(&[record(100.0, 79.996)], 20.0).is_empty());

        let exact = low_stock(&[record(70.0, 56.0)], 20.0);
        assert_eq!(exact.len(), 1);
        assert_eq!(exact[0].remaining_percentage, 20.0);
    }

    #[test]
    fn low_stock_orders_most_depleted_first() {
        let mut second = record(10.0, 12.0);
        second.product_id = 2;
        let records = vec![record(100.0, 90.0), second];

        let low = low_stock(&records, DEFAULT_LOW_STOCK_THRESHOLD);
        let ids: Vec<i64> = low.iter().map(|r| r.product_id).collect();
        assert_eq!(ids, vec![2, 1]);
        assert_eq!(low[0].remaining_percentage, -20.0);
    }

    #[test]
    fn zero_estimate_counts_as_fully_stocked() {
        let low = low_stock(&[record(0.0, 3.0)], 20.0);
        assert!(low.is_empty());
        assert_eq!(low_stock(&[record(0.0, 3.0)], 100.0)[0].remaining_percentage, 100.0);
    }
}
