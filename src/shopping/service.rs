use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument};

use super::aggregate::{aggregate_items, group_by_category};
use super::dto::{
    CsvExportOptions, JsonExportOptions, LowStockRecord, ShoppingList, ShoppingListOptions,
    Suggestion, VarianceRecord,
};
use super::{export, variance};
use crate::error::{AppError, AppResult, EntityKind};
use crate::repositories::{
    AvailabilityRepository, ConsumptionRepository, ParticipantRepository, ProductRepository,
    Repositories, TripRepository,
};

pub const UNKNOWN_TRIP_NAME: &str = "Viaje desconocido";

/// Where shopping list headers get their trip metadata
#[derive(Clone)]
pub enum TripSource {
    /// Look the trip up; a missing trip fails with `NotFound`
    Verified(Arc<dyn TripRepository>),
    /// Skip the lookup and emit placeholder metadata: unknown name, a
    /// zero-length range on the generation day, `total_days = 0`
    Placeholder,
}

/// Where the list's participant count comes from
#[derive(Clone)]
pub enum ParticipantSource {
    Counted(Arc<dyn ParticipantRepository>),
    /// Always reports zero participants
    Uncounted,
}

/// Builds shopping lists, variance reports and exports for a trip.
///
/// Every call reads fresh snapshots from the repositories and computes in
/// memory; nothing is cached between calls.
#[derive(Clone)]
pub struct ShoppingListService {
    consumptions: Arc<dyn ConsumptionRepository>,
    availabilities: Arc<dyn AvailabilityRepository>,
    products: Arc<dyn ProductRepository>,
    trips: TripSource,
    participants: ParticipantSource,
}

impl ShoppingListService {
    pub fn new(
        consumptions: Arc<dyn ConsumptionRepository>,
        availabilities: Arc<dyn AvailabilityRepository>,
        products: Arc<dyn ProductRepository>,
    ) -> Self {
        Self {
            consumptions,
            availabilities,
            products,
            trips: TripSource::Placeholder,
            participants: ParticipantSource::Uncounted,
        }
    }

    /// Service with trip verification and participant counting enabled
    pub fn from_repositories(repos: &Repositories) -> Self {
        Self::new(
            repos.consumptions.clone(),
            repos.availabilities.clone(),
            repos.products.clone(),
        )
        .with_trip_source(TripSource::Verified(repos.trips.clone()))
        .with_participant_source(ParticipantSource::Counted(repos.participants.clone()))
    }

    pub fn with_trip_source(mut self, trips: TripSource) -> Self {
        self.trips = trips;
        self
    }

    pub fn with_participant_source(mut self, participants: ParticipantSource) -> Self {
        self.participants = participants;
        self
    }

    #[instrument(skip(self, options))]
    pub async fn generate(
        &self,
        trip_id: i64,
        options: &ShoppingListOptions,
    ) -> AppResult<ShoppingList> {
        let generated_at = Utc::now();

        let (trip_name, start_date, end_date, total_days) = match &self.trips {
            TripSource::Verified(trips) => {
                let trip = trips
                    .find_by_id(trip_id)
                    .await?
                    .ok_or(AppError::not_found(EntityKind::Trip, trip_id))?;
                let days = trip.duration_days();
                (trip.name, trip.start_date, trip.end_date, days)
            }
            TripSource::Placeholder => {
                let today = generated_at.date_naive();
                (UNKNOWN_TRIP_NAME.to_string(), today, today, 0)
            }
        };

        let participant_count = match &self.participants {
            ParticipantSource::Counted(participants) => {
                participants.count_by_trip_id(trip_id).await?
            }
            ParticipantSource::Uncounted => 0,
        };

        let consumptions = self.consumptions.find_by_trip_id(trip_id).await?;
        let availabilities = self.availabilities.find_by_trip_id(trip_id).await?;
        let products = self.products.find_all().await?;
        debug!(
            consumptions = consumptions.len(),
            availabilities = availabilities.len(),
            products = products.len(),
            "loaded shopping list sources"
        );

        let items = aggregate_items(&consumptions, &availabilities, &products, options);
        let items_by_category = group_by_category(&items);

        let essential_items = items.iter().filter(|i| i.is_essential).count();
        let total_estimated_cost: f64 = items
            .iter()
            .map(|i| i.total_estimated_cost.unwrap_or(0.0))
            .sum();

        info!(trip_id, items = items.len(), essential_items, "shopping list generated");

        Ok(ShoppingList {
            trip_id,
            trip_name,
            start_date,
            end_date,
            total_days,
            participant_count,
            total_items: items.len(),
            optional_items: items.len() - essential_items,
            essential_items,
            total_estimated_cost,
            items,
            items_by_category,
            generated_at,
        })
    }

    #[instrument(skip(self))]
    pub async fn consumption_variance(&self, trip_id: i64) -> AppResult<Vec<VarianceRecord>> {
        let consumptions = self.consumptions.find_by_trip_id(trip_id).await?;
        let availabilities = self.availabilities.find_by_trip_id(trip_id).await?;
        let products = self.products.find_all().await?;

        let records = variance::consumption_variance(&products, &consumptions, &availabilities);
        debug!(records = records.len(), "variance computed");
        Ok(records)
    }

    pub async fn shopping_suggestions(&self, trip_id: i64) -> AppResult<Vec<Suggestion>> {
        let records = self.consumption_variance(trip_id).await?;
        Ok(variance::shopping_suggestions(&records))
    }

    /// `threshold_percentage` defaults to 20
    pub async fn low_stock_products(
        &self,
        trip_id: i64,
        threshold_percentage: Option<f64>,
    ) -> AppResult<Vec<LowStockRecord>> {
        let records = self.consumption_variance(trip_id).await?;
        Ok(variance::low_stock(
            &records,
            threshold_percentage.unwrap_or(variance::DEFAULT_LOW_STOCK_THRESHOLD),
        ))
    }

    pub async fn export_csv(
        &self,
        trip_id: i64,
        list_options: &ShoppingListOptions,
        options: &CsvExportOptions,
    ) -> AppResult<String> {
        let list = self.generate(trip_id, list_options).await?;
        let csv = export::to_csv(&list, options);
        info!(trip_id, bytes = csv.len(), "shopping list exported as csv");
        Ok(csv)
    }

    pub async fn export_json(
        &self,
        trip_id: i64,
        list_options: &ShoppingListOptions,
        options: &JsonExportOptions,
    ) -> AppResult<String> {
        let list = self.generate(trip_id, list_options).await?;
        let json = export::to_json(&list, options)?;
        info!(trip_id, bytes = json.len(), "shopping list exported as json");
        Ok(json)
    }
}
