//! Errors shared by every crate in the workspace.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A declared action contradicts the algebra or an earlier declaration, or the text of a
    /// relation could not be understood.
    #[error("invalid relation: {0}")]
    InvalidRelation(String),

    #[error("unknown generator `{0}`")]
    UnknownGenerator(String),

    #[error("generator `{0}` declared twice")]
    DuplicateGenerator(String),

    /// The algebra was asked about a degree it cannot answer.
    #[error("algebra data insufficient: degree {requested} requested but only {available} available")]
    InsufficientAlgebraData { requested: i32, available: i32 },

    #[error("resolution not computed through bidegree (s, t) = ({s}, {t})")]
    ResolutionNotExtended { s: u32, t: i32 },

    #[error("inconsistent homomorphism: {0}")]
    InconsistentHomomorphism(String),

    #[error("degree {requested} exceeds the degree budget {budget}")]
    DegreeBudgetExceeded { requested: i32, budget: i32 },

    #[error("{0} is not a valid prime")]
    InvalidPrime(u32),

    #[error("failed to parse `{input}`: {reason}")]
    Parse { input: String, reason: String },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn parse(input: &str, reason: impl Into<String>) -> Self {
        Self::Parse {
            input: input.to_owned(),
            reason: reason.into(),
        }
    }

    /// The `Relation failed` error raised when a defining relation of the algebra does not act
    /// as zero.
    pub fn failed_relation(relation: impl std::fmt::Display, value: impl std::fmt::Display) -> Self {
        Self::InvalidRelation(format!(
            "Relation failed: {relation}  !=  0, instead it is {value}"
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages() {
        assert_eq!(
            Error::ResolutionNotExtended { s: 2, t: 7 }.to_string(),
            "resolution not computed through bidegree (s, t) = (2, 7)"
        );
        assert_eq!(
            Error::failed_relation("Sq1 * Sq1", "x2").to_string(),
            "invalid relation: Relation failed: Sq1 * Sq1  !=  0, instead it is x2"
        );
    }
}
