use thiserror::Error;

use crate::models::{MatchId, OrganizationId, PlayerId};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Rate limit exceeded, please try again later")]
    RateLimited,

    #[error("Riot account not found: {0}")]
    AccountNotFound(String),

    #[error("Player {0} not found")]
    PlayerNotFound(PlayerId),

    #[error("Player {player} does not belong to organization {organization}")]
    ForeignPlayer {
        player: PlayerId,
        organization: OrganizationId,
    },

    #[error("Match {0} not found")]
    MatchNotFound(MatchId),

    #[error("Player {player} already has stats for match {match_id}")]
    DuplicateStat { player: PlayerId, match_id: MatchId },

    #[error("Riot match {0} was already imported")]
    DuplicateMatch(String),

    #[error("No roster player took part in match {0}")]
    NoRosterParticipants(String),

    #[error("Invalid time window: {0}")]
    InvalidWindow(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("HTTP error: {0}")]
    HttpError(String),

    #[error("JSON parsing error: {0}")]
    JsonError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
