use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParabensError {
    #[error("Invalid time of day: {0}")]
    InvalidTime(String),

    #[error("Invalid notification config: {0}")]
    InvalidConfig(String),

    #[error("Unknown {kind}: {value}")]
    UnknownVariant { kind: &'static str, value: String },
}
