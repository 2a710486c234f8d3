use chrono::NaiveDate;

use crate::error::{AppError, AppResult, EntityKind};
use crate::models::{Availability, SetAvailability};
use crate::state::AppState;

/// Sets a participant's meals for a day inside the trip they belong to
pub async fn set_availability(
    state: &AppState,
    availability: SetAvailability,
) -> AppResult<Availability> {
    let trip = state
        .repos
        .trips
        .find_by_id(availability.trip_id)
        .await?
        .ok_or(AppError::not_found(EntityKind::Trip, availability.trip_id))?;

    if availability.date < trip.start_date || availability.date > trip.end_date {
        return Err(AppError::Validation(format!(
            "{} is outside trip dates {} to {}",
            availability.date, trip.start_date, trip.end_date
        )));
    }

    let participant = state
        .repos
        .participants
        .find_by_id(availability.participant_id)
        .await?
        .ok_or(AppError::not_found(EntityKind::Participant, availability.participant_id))?;

    if participant.trip_id != availability.trip_id {
        return Err(AppError::Validation(format!(
            "participant {} does not belong to trip {}",
            participant.id, availability.trip_id
        )));
    }

    state.repos.availabilities.upsert(availability).await
}

pub async fn get_availability(
    state: &AppState,
    trip_id: i64,
    date: Option<NaiveDate>,
) -> AppResult<Vec<Availability>> {
    match date {
        Some(date) => state.repos.availabilities.find_by_date(trip_id, date).await,
        None => state.repos.availabilities.find_by_trip_id(trip_id).await,
    }
}

pub async fn delete_availability(state: &AppState, id: i64) -> AppResult<()> {
    state.repos.availabilities.delete(id).await
}
