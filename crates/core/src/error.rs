use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum TripwireError {
    #[error("Unsupported field value: {0}")]
    UnsupportedValue(String),
}
