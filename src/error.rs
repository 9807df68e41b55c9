use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("received an error from the REST API ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("missing column: {0}")]
    MissingColumn(String),

    #[error("table has no rows")]
    EmptyTable,

    #[error("river id {0} not found")]
    ReachNotFound(i64),

    #[error("no region for {0}")]
    RegionNotFound(String),

    #[error("nearest river to ({lat}, {lon}) is {distance:.3} degrees away")]
    NoNearbyReach { lat: f64, lon: f64, distance: f64 },

    #[error("worker failed: {0}")]
    Worker(String),
}
