/// Domain-level validation errors.
///
/// The `Display` strings are returned verbatim to API clients.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{0} required")]
    MissingField(&'static str),

    #[error("bad {0}")]
    InvalidField(&'static str),
}
