use oa_spatial::SpatialError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TravelError {
    #[error("road graph unavailable: {0}")]
    Graph(#[from] SpatialError),

    #[error("unknown traffic level {0:?} (expected low, medium or high)")]
    UnknownTrafficLevel(String),

    #[error("unknown service type {0:?} (expected hospital, fire or police)")]
    UnknownServiceType(String),
}

pub type TravelResult<T> = Result<T, TravelError>;
