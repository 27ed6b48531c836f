use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unknown strategy \"{name}\"; valid strategies are {valid}")]
    UnknownStrategy { name: String, valid: String },

    #[error("invalid model: {0}")]
    Invalid(String),
}

pub type ModelResult<T> = Result<T, ModelError>;
