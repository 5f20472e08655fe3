use chrono::{NaiveDate, NaiveTime};

/// Errors raised while turning a raw response envelope into domain entities (§4.A-§4.E).
#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
    #[error("response envelope was not recognized as //OK or //EX")]
    Envelope,

    #[error("server reported a remote exception: {body}")]
    RemoteException { body: String },

    #[error("stack underflow at position {pos}")]
    Underflow { pos: i64 },

    #[error("no reader registered for class '{name}'")]
    UnknownClass { name: String },

    #[error("class '{class}' field #{field_index} had an unexpected shape")]
    FieldShape { class: &'static str, field_index: usize },
}

/// Errors raised by the HTTP transport (§4.G).
#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("institution '{name}' was not found on the landing page")]
    SchoolNotFound { name: String },

    #[error("login did not reach the schedule or landing page")]
    AuthFailed,

    #[error("request exceeded its deadline")]
    Timeout,

    #[error("server responded with HTTP {code}")]
    HttpStatus { code: u16 },

    #[error("request was cancelled")]
    Cancelled,

    #[error("permutation hash or module layout is stale, needs re-derivation from a fresh client bundle")]
    StaleHashes,

    #[error("transport-level HTTP failure")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Errors raised by the domain API (§4.H).
#[derive(thiserror::Error, Debug)]
pub enum DomainError {
    #[error("no lesson found for {date} at {time}")]
    LessonNotFound { date: NaiveDate, time: NaiveTime },

    #[error("no assignment found at row {row_index}")]
    AssignmentNotFound { row_index: usize },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}
