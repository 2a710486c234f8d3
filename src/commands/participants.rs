use crate::error::{AppError, AppResult, EntityKind};
use crate::models::{CreateParticipant, Participant};
use crate::state::AppState;

pub async fn get_participants(state: &AppState, trip_id: i64) -> AppResult<Vec<Participant>> {
    if !state.repos.trips.exists(trip_id).await? {
        return Err(AppError::not_found(EntityKind::Trip, trip_id));
    }
    state.repos.participants.find_by_trip_id(trip_id).await
}

pub async fn create_participant(
    state: &AppState,
    participant: CreateParticipant,
) -> AppResult<Participant> {
    state.repos.participants.create(participant).await
}

pub async fn delete_participant(state: &AppState, id: i64) -> AppResult<()> {
    state.repos.participants.delete(id).await
}
