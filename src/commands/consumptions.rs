use chrono::NaiveDate;

use crate::error::{AppError, AppResult, EntityKind};
use crate::models::{Consumption, CreateConsumption, UpdateConsumption};
use crate::state::AppState;

/// Records consumption after checking the participant belongs to the trip
pub async fn record_consumption(
    state: &AppState,
    consumption: CreateConsumption,
) -> AppResult<Consumption> {
    let participant = state
        .repos
        .participants
        .find_by_id(consumption.participant_id)
        .await?
        .ok_or(AppError::not_found(EntityKind::Participant, consumption.participant_id))?;

    if participant.trip_id != consumption.trip_id {
        return Err(AppError::Validation(format!(
            "participant {} does not belong to trip {}",
            participant.id, consumption.trip_id
        )));
    }

    state.repos.consumptions.create(consumption).await
}

pub async fn update_consumption(
    state: &AppState,
    update: UpdateConsumption,
) -> AppResult<Consumption> {
    state.repos.consumptions.update(update).await
}

pub async fn delete_consumption(state: &AppState, id: i64) -> AppResult<()> {
    state.repos.consumptions.delete(id).await
}

pub async fn get_consumptions(
    state: &AppState,
    trip_id: i64,
    date: Option<NaiveDate>,
) -> AppResult<Vec<Consumption>> {
    match date {
        Some(date) => state.repos.consumptions.find_by_date(trip_id, date).await,
        None => state.repos.consumptions.find_by_trip_id(trip_id).await,
    }
}
