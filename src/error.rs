use std::fmt;

use thiserror::Error;

/// Pipeline stage an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extract,
    Simplify,
    Place,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Extract => "extract",
            Stage::Simplify => "simplify",
            Stage::Place => "place",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while turning a mask into dots.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum DotsError {
    #[error("failed to load image: {0}")]
    ImageLoad(String),

    #[error("extract: no contours found in mask")]
    NoContours,

    #[error("extract: skeleton has no endpoints (closed loop?)")]
    NoEndpoints,

    #[error("{stage}: need at least 3 points for a closed path, got {got}")]
    InsufficientPoints { stage: Stage, got: usize },

    #[error("{stage}: shape has zero perimeter")]
    ZeroPerimeter { stage: Stage },

    #[error("font metrics unavailable: {0}")]
    FontMetrics(String),
}

impl DotsError {
    /// The stage that produced this error.
    pub fn stage(&self) -> Stage {
        match self {
            DotsError::ImageLoad(_) | DotsError::NoContours | DotsError::NoEndpoints => {
                Stage::Extract
            }
            DotsError::InsufficientPoints { stage, .. } | DotsError::ZeroPerimeter { stage } => {
                *stage
            }
            DotsError::FontMetrics(_) => Stage::Place,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_names_the_stage() {
        let err = DotsError::InsufficientPoints {
            stage: Stage::Simplify,
            got: 2,
        };
        assert_eq!(err.stage(), Stage::Simplify);
        assert_eq!(
            err.to_string(),
            "simplify: need at least 3 points for a closed path, got 2"
        );
        assert_eq!(DotsError::NoEndpoints.stage(), Stage::Extract);
    }
}
