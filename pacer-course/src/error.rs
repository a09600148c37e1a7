use thiserror::Error;

/// Failures while extracting track points from a GPX document.
#[derive(Debug, Error)]
pub enum GpxError {
    #[error("malformed GPX document: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("track point missing required '{0}' attribute")]
    MissingCoordinate(&'static str),

    #[error("invalid numeric value in <{tag}>: '{value}'")]
    InvalidNumber {
        tag: &'static str,
        value: String,
    },

    #[error("latitude {0} out of range [-90, 90]")]
    LatitudeOutOfRange(f64),

    #[error("longitude {0} out of range [-180, 180]")]
    LongitudeOutOfRange(f64),

    #[error("course needs at least two track points, found {0}")]
    TooFewPoints(usize),
}

/// Invariant violations in an already-assembled course (typically one
/// that arrived via deserialization rather than the builder).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CourseError {
    #[error("course needs at least two route points, found {0}")]
    TooFewPoints(usize),

    #[error("route point {index} has sequence {actual}, expected {expected}")]
    NonDenseSequence {
        index: usize,
        expected: u32,
        actual: u32,
    },

    #[error("distance from start decreases at point {0}")]
    NonMonotonicDistance(usize),

    #[error("first route point must be START, last must be FINISH")]
    UntaggedEndpoints,

    #[error("checkpoint indices must be strictly increasing (violated at point {0})")]
    NonIncreasingCheckpointIndex(usize),
}
