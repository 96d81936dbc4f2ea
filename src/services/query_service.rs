//! Read-only projections of stored matches. Clients use them to poll or to
//! recover full state after reconnecting to a push channel.

use crate::{
    dao::{match_store::MatchFilter, storage::StorageError},
    dto::matches::MatchView,
    error::ServiceError,
    state::{SharedState, cricket::Match},
};

/// Every match, most recently scheduled first.
pub async fn list_matches(state: &SharedState) -> Result<Vec<MatchView>, ServiceError> {
    list(state, MatchFilter::All).await
}

/// Matches currently accepting deliveries.
pub async fn list_live_matches(state: &SharedState) -> Result<Vec<MatchView>, ServiceError> {
    list(state, MatchFilter::Live).await
}

/// A single match by its external identifier.
pub async fn get_match(state: &SharedState, id: &str) -> Result<MatchView, ServiceError> {
    let store = state.require_match_store().await?;
    let entity = store
        .find_match(id.to_owned())
        .await?
        .ok_or_else(|| ServiceError::NotFound("Match not found".into()))?;
    let game = Match::try_from(entity)?;
    Ok(MatchView::from(&game))
}

async fn list(state: &SharedState, filter: MatchFilter) -> Result<Vec<MatchView>, ServiceError> {
    let store = state.require_match_store().await?;
    let entities = store.list_matches(filter).await?;
    entities
        .into_iter()
        .map(|entity| {
            Match::try_from(entity)
                .map(|game| MatchView::from(&game))
                .map_err(|err: StorageError| err.into())
        })
        .collect()
}
