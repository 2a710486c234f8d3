use crate::error::AppResult;
use crate::models::{CreateTrip, Trip};
use crate::state::AppState;

pub async fn get_trips(state: &AppState) -> AppResult<Vec<Trip>> {
    state.repos.trips.find_all().await
}

pub async fn create_trip(state: &AppState, trip: CreateTrip) -> AppResult<Trip> {
    state.repos.trips.create(trip).await
}

pub async fn delete_trip(state: &AppState, id: i64) -> AppResult<()> {
    state.repos.trips.delete(id).await
}
