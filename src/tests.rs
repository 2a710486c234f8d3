//! Integration tests for the command layer
//! These tests run against an in-memory SQLite database through `AppState`

use chrono::NaiveDate;

use crate::commands::{availability, consumptions, participants, products, reports, trips};
use crate::config::AppConfig;
use crate::error::{AppError, EntityKind};
use crate::models::{
    CreateConsumption, CreateParticipant, CreateProduct, CreateTrip, MealFlags, MealType,
    ProductCategory, ProductUnit, SetAvailability, UpdateConsumption,
};
use crate::shopping::{
    CsvExportOptions, DateRange, ShoppingListOptions, ShoppingListService, SuggestionKind,
    UNKNOWN_TRIP_NAME,
};
use crate::state::AppState;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 7, d).unwrap()
}

struct Seeded {
    state: AppState,
    trip_id: i64,
    ana: i64,
    luis: i64,
    water: i64,
    bread: i64,
    chocolate: i64,
}

async fn add_product(
    state: &AppState,
    name: &str,
    category: ProductCategory,
    unit: ProductUnit,
    per_person: Option<f64>,
) -> i64 {
    products::create_product(
        state,
        CreateProduct {
            name: name.into(),
            category,
            unit,
            default_quantity_per_person: per_person,
            notes: None,
        },
    )
    .await
    .unwrap()
    .id
}

async fn consume(
    state: &AppState,
    trip_id: i64,
    participant_id: i64,
    product_id: i64,
    date: NaiveDate,
    quantity: f64,
) {
    consumptions::record_consumption(
        state,
        CreateConsumption {
            trip_id,
            participant_id,
            product_id,
            date,
            meal_type: MealType::Lunch,
            quantity,
            notes: None,
        },
    )
    .await
    .unwrap();
}

async fn attend(
    state: &AppState,
    trip_id: i64,
    participant_id: i64,
    date: NaiveDate,
    meals: (bool, bool, bool),
) {
    availability::set_availability(
        state,
        SetAvailability {
            participant_id,
            trip_id,
            date,
            meals: MealFlags {
                breakfast: meals.0,
                lunch: meals.1,
                dinner: meals.2,
            },
            notes: None,
        },
    )
    .await
    .unwrap();
}

/// Three-day trip, two participants, seven attended meals.
///
/// Water: 6.5 L consumed against 1 L per person and meal.
/// Bread: 1 unit against 0.5. Chocolate has no per-person default.
async fn seed() -> Seeded {
    let state = AppState::in_memory().unwrap();

    let trip_id = trips::create_trip(
        &state,
        CreateTrip {
            name: "Picos de Europa".into(),
            description: None,
            start_date: day(1),
            end_date: day(3),
        },
    )
    .await
    .unwrap()
    .id;

    let mut people = Vec::new();
    for name in ["Ana", "Luis"] {
        let participant = participants::create_participant(
            &state,
            CreateParticipant {
                trip_id,
                name: name.into(),
                email: None,
                notes: None,
            },
        )
        .await
        .unwrap();
        people.push(participant.id);
    }
    let (ana, luis) = (people[0], people[1]);

    let water =
        add_product(&state, "Agua", ProductCategory::Beverage, ProductUnit::Liter, Some(1.0)).await;
    let bread =
        add_product(&state, "Pan", ProductCategory::Bakery, ProductUnit::Unit, Some(0.5)).await;
    let chocolate =
        add_product(&state, "Chocolate", ProductCategory::Snack, ProductUnit::Unit, None).await;

    attend(&state, trip_id, ana, day(1), (true, true, false)).await;
    attend(&state, trip_id, luis, day(1), (false, true, true)).await;
    attend(&state, trip_id, ana, day(2), (true, true, true)).await;

    consume(&state, trip_id, ana, water, day(1), 2.0).await;
    consume(&state, trip_id, luis, water, day(1), 1.5).await;
    consume(&state, trip_id, ana, water, day(2), 3.0).await;
    consume(&state, trip_id, ana, bread, day(1), 1.0).await;
    consume(&state, trip_id, luis, chocolate, day(2), 2.0).await;

    Seeded {
        state,
        trip_id,
        ana,
        luis,
        water,
        bread,
        chocolate,
    }
}

// ===== SHOPPING LIST TESTS =====

#[tokio::test]
async fn test_shopping_list_header_and_items() {
    let s = seed().await;

    let list = reports::get_shopping_list(&s.state, s.trip_id, ShoppingListOptions::default())
        .await
        .unwrap();

    assert_eq!(list.trip_name, "Picos de Europa");
    assert_eq!(list.start_date, day(1));
    assert_eq!(list.end_date, day(3));
    assert_eq!(list.total_days, 3);
    assert_eq!(list.participant_count, 2);
    assert_eq!(list.total_items, 3);
    assert_eq!(list.essential_items, 2);
    assert_eq!(list.optional_items, 1);
    assert_eq!(list.total_estimated_cost, 0.0);

    // BAKERY < BEVERAGE < SNACK
    let names: Vec<&str> = list.items.iter().map(|i| i.product_name.as_str()).collect();
    assert_eq!(names, vec!["Pan", "Agua", "Chocolate"]);

    let water = list.items.iter().find(|i| i.product_id == s.water).unwrap();
    assert_eq!(water.total_quantity, 6.5);
    assert_eq!(water.by_date.len(), 2);
    assert_eq!(water.by_date[0].date, day(1));
    assert_eq!(water.by_date[0].quantity, 3.5);
    assert_eq!(water.by_date[0].participant_count, 2);
    assert_eq!(water.by_date[1].date, day(2));
    assert_eq!(water.by_date[1].participant_count, 1);

    let chocolate = list.items.iter().find(|i| i.product_id == s.chocolate).unwrap();
    assert!(!chocolate.is_essential);
    assert_eq!(chocolate.by_date[0].participant_count, 1);

    assert_eq!(list.items_by_category.len(), 3);
    assert_eq!(list.items_by_category[0].category_name, "Panadería");
    assert_eq!(list.items_by_category[1].category_name, "Bebidas");
}

#[tokio::test]
async fn test_generation_is_repeatable() {
    let s = seed().await;
    let options = ShoppingListOptions::default();

    let first = reports::get_shopping_list(&s.state, s.trip_id, options.clone()).await.unwrap();
    let mut second = reports::get_shopping_list(&s.state, s.trip_id, options).await.unwrap();
    second.generated_at = first.generated_at;

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_quantities_are_conserved() {
    let s = seed().await;

    let list = reports::get_shopping_list(&s.state, s.trip_id, ShoppingListOptions::default())
        .await
        .unwrap();
    let recorded: f64 = consumptions::get_consumptions(&s.state, s.trip_id, None)
        .await
        .unwrap()
        .iter()
        .map(|c| c.quantity)
        .sum();

    let listed: f64 = list.items.iter().map(|i| i.total_quantity).sum();
    assert_eq!(listed, recorded);
    for item in &list.items {
        let by_day: f64 = item.by_date.iter().map(|d| d.quantity).sum();
        assert_eq!(by_day, item.total_quantity);
    }
}

#[tokio::test]
async fn test_multiplier_rounds_up() {
    let s = seed().await;

    let options = ShoppingListOptions {
        quantity_multiplier: Some(1.5),
        ..Default::default()
    };
    let list = reports::get_shopping_list(&s.state, s.trip_id, options).await.unwrap();

    let water = list.items.iter().find(|i| i.product_id == s.water).unwrap();
    assert_eq!(water.total_quantity, 10.0);
    assert_eq!(water.by_date[0].quantity, 6.0);
    // 3 * 1.5 = 4.5
    assert_eq!(water.by_date[1].quantity, 5.0);

    let bread = list.items.iter().find(|i| i.product_id == s.bread).unwrap();
    assert_eq!(bread.total_quantity, 2.0);
}

#[tokio::test]
async fn test_multiplier_of_one_keeps_fractions() {
    let s = seed().await;

    let options = ShoppingListOptions {
        quantity_multiplier: Some(1.0),
        ..Default::default()
    };
    let list = reports::get_shopping_list(&s.state, s.trip_id, options).await.unwrap();

    let water = list.items.iter().find(|i| i.product_id == s.water).unwrap();
    assert_eq!(water.total_quantity, 6.5);
}

#[tokio::test]
async fn test_essential_and_category_filters() {
    let s = seed().await;

    let essential = reports::get_shopping_list(
        &s.state,
        s.trip_id,
        ShoppingListOptions {
            essential_only: true,
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert!(essential.items.iter().all(|i| i.is_essential));
    assert_eq!(essential.total_items, 2);
    assert_eq!(essential.optional_items, 0);

    let snacks = reports::get_shopping_list(
        &s.state,
        s.trip_id,
        ShoppingListOptions {
            categories: Some(vec![ProductCategory::Snack]),
            group_by_category: false,
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(snacks.items.len(), 1);
    assert_eq!(snacks.items[0].product_id, s.chocolate);
}

#[tokio::test]
async fn test_items_are_grouped_even_when_grouping_is_off() {
    let s = seed().await;

    let options = ShoppingListOptions {
        group_by_category: false,
        ..Default::default()
    };
    let list = reports::get_shopping_list(&s.state, s.trip_id, options).await.unwrap();

    assert_eq!(list.items.len(), 3);
    assert_eq!(list.items_by_category.len(), 3);
    assert_eq!(list.items_by_category[0].category, ProductCategory::Bakery);
    assert_eq!(list.items_by_category[2].items[0].product_id, s.chocolate);
}

#[tokio::test]
async fn test_date_range_limits_consumption_and_availability() {
    let s = seed().await;

    let options = ShoppingListOptions {
        date_range: Some(DateRange {
            start_date: day(2),
            end_date: day(2),
        }),
        ..Default::default()
    };
    let list = reports::get_shopping_list(&s.state, s.trip_id, options).await.unwrap();

    assert!(list.items.iter().all(|i| i.product_id != s.bread));
    let water = list.items.iter().find(|i| i.product_id == s.water).unwrap();
    assert_eq!(water.total_quantity, 3.0);
    assert_eq!(water.by_date.len(), 1);
    assert_eq!(water.by_date[0].participant_count, 1);
}

#[tokio::test]
async fn test_empty_trip_yields_empty_list() {
    let s = seed().await;
    let empty = trips::create_trip(
        &s.state,
        CreateTrip {
            name: "Sin datos".into(),
            description: None,
            start_date: day(10),
            end_date: day(10),
        },
    )
    .await
    .unwrap();

    let list = reports::get_shopping_list(&s.state, empty.id, ShoppingListOptions::default())
        .await
        .unwrap();

    assert!(list.items.is_empty());
    assert!(list.items_by_category.is_empty());
    assert_eq!(list.total_items, 0);
    assert_eq!(list.essential_items, 0);
    assert_eq!(list.optional_items, 0);
    assert_eq!(list.participant_count, 0);
    assert_eq!(list.total_days, 1);
}

#[tokio::test]
async fn test_missing_trip_is_not_found() {
    let s = seed().await;

    let err = reports::get_shopping_list(&s.state, 99, ShoppingListOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::NotFound {
            entity: EntityKind::Trip,
            id: 99
        }
    ));
}

#[tokio::test]
async fn test_placeholder_trip_metadata() {
    let s = seed().await;
    let repos = &s.state.repos;
    let service = ShoppingListService::new(
        repos.consumptions.clone(),
        repos.availabilities.clone(),
        repos.products.clone(),
    );

    let list = service.generate(s.trip_id, &ShoppingListOptions::default()).await.unwrap();
    assert_eq!(list.trip_name, UNKNOWN_TRIP_NAME);
    assert_eq!(list.start_date, list.end_date);
    assert_eq!(list.start_date, list.generated_at.date_naive());
    assert_eq!(list.total_days, 0);
    assert_eq!(list.participant_count, 0);
    assert_eq!(list.total_items, 3);

    // Unknown trips produce an empty list instead of an error
    let unknown = service.generate(99, &ShoppingListOptions::default()).await.unwrap();
    assert!(unknown.items.is_empty());
}

#[tokio::test]
async fn test_legacy_dates_with_time_are_truncated() {
    let s = seed().await;
    {
        let conn = s.state.db.lock().unwrap();
        conn.execute(
            "INSERT INTO consumptions
                (trip_id, participant_id, product_id, date, meal_type, quantity,
                 created_at, updated_at)
             VALUES (?1, ?2, ?3, '2024-07-01T19:30:00Z', 'dinner', 0.5,
                     '2024-07-01T19:30:00+00:00', '2024-07-01T19:30:00+00:00')",
            rusqlite::params![s.trip_id, s.luis, s.water],
        )
        .unwrap();
    }

    let on_first = consumptions::get_consumptions(&s.state, s.trip_id, Some(day(1))).await.unwrap();
    assert!(on_first.iter().any(|c| c.quantity == 0.5 && c.meal_type == MealType::Dinner));

    let list = reports::get_shopping_list(&s.state, s.trip_id, ShoppingListOptions::default())
        .await
        .unwrap();
    let water = list.items.iter().find(|i| i.product_id == s.water).unwrap();
    assert_eq!(water.by_date.len(), 2);
    assert_eq!(water.by_date[0].quantity, 4.0);
}

// ===== VARIANCE TESTS =====

#[tokio::test]
async fn test_consumption_variance() {
    let s = seed().await;

    let records = reports::get_consumption_variance(&s.state, s.trip_id).await.unwrap();

    // Chocolate has no estimate; bread deviates most
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].product_id, s.bread);
    assert_eq!(records[0].estimated, 3.5);
    assert_eq!(records[0].actual, 1.0);
    assert_eq!(records[0].variance, -2.5);
    assert_eq!(records[0].variance_percentage, -71.43);

    assert_eq!(records[1].product_id, s.water);
    assert_eq!(records[1].estimated, 7.0);
    assert_eq!(records[1].variance_percentage, -7.14);
}

#[tokio::test]
async fn test_shopping_suggestions() {
    let s = seed().await;

    let suggestions = reports::get_shopping_suggestions(&s.state, s.trip_id).await.unwrap();

    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0].product_id, s.bread);
    assert_eq!(suggestions[0].kind, SuggestionKind::ReduceStock);
    assert_eq!(suggestions[0].suggested_quantity, 2.0);
    assert_eq!(suggestions[0].reason, "Consumo 71.43% inferior al estimado");
}

#[tokio::test]
async fn test_low_stock_threshold() {
    let s = seed().await;

    let low = reports::get_low_stock(&s.state, s.trip_id, None).await.unwrap();
    assert_eq!(low.len(), 1);
    assert_eq!(low[0].product_id, s.water);
    assert_eq!(low[0].remaining_percentage, 7.14);

    let none = reports::get_low_stock(&s.state, s.trip_id, Some(5.0)).await.unwrap();
    assert!(none.is_empty());

    let all = reports::get_low_stock(&s.state, s.trip_id, Some(100.0)).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].product_id, s.water);
}

#[tokio::test]
async fn test_low_stock_at_exact_threshold() {
    let s = seed().await;
    let cheese =
        add_product(&s.state, "Queso", ProductCategory::Dairy, ProductUnit::Gram, Some(10.0)).await;
    // 7 meals estimate 70 g; 56 g leaves exactly 20%
    consume(&s.state, s.trip_id, s.ana, cheese, day(2), 56.0).await;

    let milk = add_product(
        &s.state,
        "Leche",
        ProductCategory::Dairy,
        ProductUnit::Milliliter,
        Some(10.0),
    )
    .await;
    // 55.997 ml leaves 20.004%, which must not round into the threshold
    consume(&s.state, s.trip_id, s.ana, milk, day(2), 55.997).await;

    let low = reports::get_low_stock(&s.state, s.trip_id, Some(20.0)).await.unwrap();
    let record = low.iter().find(|r| r.product_id == cheese).unwrap();
    assert_eq!(record.remaining_percentage, 20.0);
    assert!(low.iter().all(|r| r.product_id != milk));
}

// ===== EXPORT TESTS =====

#[tokio::test]
async fn test_csv_export_escapes_and_sorts_by_category_name() {
    let s = seed().await;
    let juice = products::create_product(
        &s.state,
        CreateProduct {
            name: "Juice, Orange".into(),
            category: ProductCategory::Beverage,
            unit: ProductUnit::Bottle,
            default_quantity_per_person: None,
            notes: Some("He said \"hi\"".into()),
        },
    )
    .await
    .unwrap()
    .id;
    consume(&s.state, s.trip_id, s.ana, juice, day(2), 1.0).await;

    let csv = reports::export_csv(
        &s.state,
        s.trip_id,
        ShoppingListOptions::default(),
        CsvExportOptions::default(),
    )
    .await
    .unwrap();
    let lines: Vec<&str> = csv.lines().collect();

    assert_eq!(lines[0], "Categoria,Producto,Cantidad,Unidad,Notas");
    assert_eq!(lines[1], "Bebidas,Agua,6.5,L,");
    assert_eq!(lines[2], "Bebidas,\"Juice, Orange\",1,botella,\"He said \"\"hi\"\"\"");
    assert_eq!(lines[3], "Panadería,Pan,1,unidad,");
    assert_eq!(lines[4], "Snacks,Chocolate,2,unidad,");
    assert_eq!(lines[5], "");
    assert_eq!(lines[6], "--- RESUMEN ---");
    assert_eq!(lines[7], "Viaje,Picos de Europa");
    assert_eq!(lines[11], "Participantes,2");
    assert_eq!(lines[12], "Total productos,4");
}

#[tokio::test]
async fn test_json_export_parses_back() {
    let s = seed().await;

    let json = reports::export_json(
        &s.state,
        s.trip_id,
        ShoppingListOptions::default(),
        Default::default(),
    )
        .await
        .unwrap();

    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["trip_name"], "Picos de Europa");
    assert_eq!(value["items"].as_array().unwrap().len(), 3);
    assert_eq!(value["items"][0]["category"], "BAKERY");
    assert_eq!(value["items"][0]["unit"], "UNIT");
}

// ===== RECORD KEEPING TESTS =====

#[tokio::test]
async fn test_availability_upsert_replaces() {
    let s = seed().await;

    attend(&s.state, s.trip_id, s.ana, day(1), (false, false, true)).await;

    let rows = availability::get_availability(&s.state, s.trip_id, Some(day(1))).await.unwrap();
    assert_eq!(rows.len(), 2);
    let ana = rows.iter().find(|a| a.participant_id == s.ana).unwrap();
    assert_eq!(ana.meals.count(), 1);
    assert!(ana.meals.dinner);
}

#[tokio::test]
async fn test_availability_outside_trip_is_rejected() {
    let s = seed().await;

    let err = availability::set_availability(
        &s.state,
        SetAvailability {
            participant_id: s.ana,
            trip_id: s.trip_id,
            date: day(20),
            meals: MealFlags::default(),
            notes: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn test_availability_requires_participant_of_trip() {
    let s = seed().await;
    let other = trips::create_trip(
        &s.state,
        CreateTrip {
            name: "Otro".into(),
            description: None,
            start_date: day(1),
            end_date: day(3),
        },
    )
    .await
    .unwrap();

    let err = availability::set_availability(
        &s.state,
        SetAvailability {
            participant_id: s.ana,
            trip_id: other.id,
            date: day(1),
            meals: MealFlags {
                breakfast: true,
                lunch: true,
                dinner: true,
            },
            notes: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    // Ana's row stays with the original trip
    let other_rows = availability::get_availability(&s.state, other.id, None).await.unwrap();
    assert!(other_rows.is_empty());
    let rows = availability::get_availability(&s.state, s.trip_id, Some(day(1))).await.unwrap();
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn test_consumption_update_keeps_identity() {
    let s = seed().await;
    let original = consumptions::get_consumptions(&s.state, s.trip_id, Some(day(2)))
        .await
        .unwrap()
        .into_iter()
        .find(|c| c.product_id == s.chocolate)
        .unwrap();

    let updated = consumptions::update_consumption(
        &s.state,
        UpdateConsumption {
            id: original.id,
            quantity: Some(4.0),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(updated.quantity, 4.0);
    assert_eq!(updated.trip_id, original.trip_id);
    assert_eq!(updated.participant_id, original.participant_id);
    assert_eq!(updated.product_id, original.product_id);
    assert_eq!(updated.date, original.date);
    assert_eq!(updated.meal_type, original.meal_type);

    let err = consumptions::update_consumption(
        &s.state,
        UpdateConsumption {
            id: original.id,
            quantity: Some(-1.0),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn test_consumption_notes_can_be_cleared() {
    let s = seed().await;
    let noted = consumptions::record_consumption(
        &s.state,
        CreateConsumption {
            trip_id: s.trip_id,
            participant_id: s.luis,
            product_id: s.bread,
            date: day(2),
            meal_type: MealType::Breakfast,
            quantity: 1.0,
            notes: Some("tostado".into()),
        },
    )
    .await
    .unwrap();

    let kept = consumptions::update_consumption(
        &s.state,
        UpdateConsumption {
            id: noted.id,
            quantity: Some(2.0),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(kept.notes.as_deref(), Some("tostado"));

    let cleared = consumptions::update_consumption(
        &s.state,
        UpdateConsumption {
            id: noted.id,
            notes: Some(None),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(cleared.notes, None);
    assert_eq!(cleared.quantity, 2.0);
}

#[tokio::test]
async fn test_consumption_requires_participant_of_trip() {
    let s = seed().await;
    let other = trips::create_trip(
        &s.state,
        CreateTrip {
            name: "Otro".into(),
            description: None,
            start_date: day(1),
            end_date: day(2),
        },
    )
    .await
    .unwrap();

    let err = consumptions::record_consumption(
        &s.state,
        CreateConsumption {
            trip_id: other.id,
            participant_id: s.ana,
            product_id: s.water,
            date: day(1),
            meal_type: MealType::Breakfast,
            quantity: 1.0,
            notes: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn test_deleting_trip_cascades() {
    let s = seed().await;

    trips::delete_trip(&s.state, s.trip_id).await.unwrap();

    let remaining = consumptions::get_consumptions(&s.state, s.trip_id, None).await.unwrap();
    assert!(remaining.is_empty());
    let err = participants::get_participants(&s.state, s.trip_id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound { entity: EntityKind::Trip, .. }));
}

#[tokio::test]
async fn test_product_in_use_cannot_be_deleted() {
    let s = seed().await;

    let err = products::delete_product(&s.state, s.water).await.unwrap_err();
    assert!(matches!(err, AppError::Database { .. }));

    let missing = products::delete_product(&s.state, 999).await.unwrap_err();
    assert!(matches!(missing, AppError::NotFound { entity: EntityKind::Product, id: 999 }));
}

// ===== LOGGING TESTS =====

#[test]
fn test_tracing_init_keeps_existing_subscriber() {
    let config = AppConfig::default();
    crate::init_tracing(&config);
    assert!(!crate::init_tracing(&config));
}
