use std::error::Error;
use std::fmt;

/// Failures raised by the LMNN objective.
///
/// All of these are precondition violations or numerical faults; nothing in
/// the engine retries.
#[derive(Debug, Clone, PartialEq)]
pub enum LmnnError {
    /// Dataset columns and label count differ.
    ShapeMismatch { points: usize, labels: usize },
    /// A configuration value is outside its admissible range.
    InvalidConfig(String),
    /// A point's class has fewer than `k` other members.
    NotEnoughTargetNeighbors {
        point: usize,
        label: usize,
        available: usize,
        k: usize,
    },
    /// `[begin, begin + batch_size)` does not fit inside the dataset.
    BatchOutOfBounds {
        begin: usize,
        batch_size: usize,
        points: usize,
    },
    /// Transformation column count does not match the feature count.
    TransformationShape {
        features: usize,
        found: (usize, usize),
    },
    /// A triplet evaluation produced NaN or infinity.
    NonFinite {
        point: usize,
        target_slot: usize,
        impostor_slot: usize,
    },
    /// A reordering is not a permutation of the point indices.
    InvalidPermutation { points: usize },
    /// The transformation, the transformed points or their pairwise
    /// distances are not all finite.
    NonFiniteTransformation,
    /// A constraint provider returned target neighbors of the wrong shape or
    /// with indices outside the dataset.
    InvalidTargetNeighbors(String),
}

impl fmt::Display for LmnnError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LmnnError::ShapeMismatch { points, labels } => write!(
                f,
                "Dataset has {} points but {} labels were given",
                points, labels
            ),
            LmnnError::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            LmnnError::NotEnoughTargetNeighbors {
                point,
                label,
                available,
                k,
            } => write!(
                f,
                "Point {} (class {}) has {} same-class neighbors, but k = {}",
                point, label, available, k
            ),
            LmnnError::BatchOutOfBounds {
                begin,
                batch_size,
                points,
            } => write!(
                f,
                "Batch [{}, {}) exceeds dataset of {} points",
                begin,
                begin + batch_size,
                points
            ),
            LmnnError::TransformationShape { features, found } => write!(
                f,
                "Transformation of shape {:?} cannot be applied to {} features",
                found, features
            ),
            LmnnError::NonFinite {
                point,
                target_slot,
                impostor_slot,
            } => write!(
                f,
                "Non-finite triplet value for point {} (target slot {}, impostor slot {})",
                point, target_slot, impostor_slot
            ),
            LmnnError::InvalidPermutation { points } => write!(
                f,
                "Ordering is not a permutation of {} points",
                points
            ),
            LmnnError::NonFiniteTransformation => write!(
                f,
                "Transformation yields non-finite coordinates or distances"
            ),
            LmnnError::InvalidTargetNeighbors(msg) => {
                write!(f, "Invalid target neighbors: {}", msg)
            }
        }
    }
}

impl Error for LmnnError {}

pub type Result<T> = std::result::Result<T, LmnnError>;
