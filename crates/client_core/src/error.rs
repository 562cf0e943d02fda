use thiserror::Error;

/// Network or HTTP failure while talking to the game server.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("form action '{action}' is not resolvable against the game url: {source}")]
    BadAction {
        action: String,
        #[source]
        source: url::ParseError,
    },
    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

/// A response body was present but not a well-formed state snapshot.
/// A blank body is not a decode failure; it decodes to "no update yet".
#[derive(Debug, Error)]
#[error("malformed state payload: {0}")]
pub struct DecodeError(#[from] serde_json::Error);

#[derive(Debug, Error)]
pub enum PollError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The request was superseded by a newer one. Expected traffic whenever
    /// the session restarts; suppressed without logging.
    #[error("poll superseded by a newer request")]
    Aborted,
}
