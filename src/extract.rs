//! Shape extraction: binary mask → one ordered point sequence.

use image::GrayImage;
use kurbo::Point;

use crate::config::ExtractMode;
use crate::contour;
use crate::error::{DotsError, Stage};
use crate::geom::ensure_clockwise;
use crate::skeleton;

/// Non-fatal conditions noticed while processing a shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advisory {
    /// More than one sizeable outer contour; only the largest was used.
    MultipleContours { count: usize },
    /// Contour mode was requested but the shape has no hole.
    ContourWithoutHole,
    /// Path mode was requested but the shape has a hole.
    PathWithHole,
}

/// Ordered points pulled out of a mask.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Whole-pixel coordinates.
    pub points: Vec<Point>,
    /// True for a boundary ring, false for an open medial path.
    pub closed: bool,
    /// Contour or Path; never Automatic.
    pub mode_used: ExtractMode,
    pub has_hole: bool,
    pub advisories: Vec<Advisory>,
}

/// Extract the dominant shape's ordered points.
///
/// Contour mode returns the clockwise outer boundary. Path mode returns the
/// longest branch of the shape's skeleton. Automatic picks Contour when the
/// shape has a hole and Path otherwise.
pub fn extract(mask: &GrayImage, mode: ExtractMode) -> Result<Extraction, DotsError> {
    let scan = contour::scan(mask)?;
    let first = scan.largest.first().copied().ok_or(DotsError::NoContours)?;
    if scan.largest.iter().all(|&p| p == first) {
        return Err(DotsError::ZeroPerimeter {
            stage: Stage::Extract,
        });
    }
    let mut advisories = Vec::new();
    if scan.has_multiple_contours() {
        log::warn!(
            "{} separate shapes found; using the largest",
            scan.significant
        );
        advisories.push(Advisory::MultipleContours {
            count: scan.significant,
        });
    }

    let mode_used = match mode {
        ExtractMode::Automatic if scan.has_hole => ExtractMode::Contour,
        ExtractMode::Automatic => ExtractMode::Path,
        explicit => explicit,
    };
    if mode == ExtractMode::Automatic {
        log::info!(
            "shape {} a hole, using {:?} mode",
            if scan.has_hole { "has" } else { "has no" },
            mode_used
        );
    }

    let (points, closed) = match mode_used {
        ExtractMode::Path => {
            if scan.has_hole {
                log::warn!("path mode on a shape with a hole; contour mode may fit better");
                advisories.push(Advisory::PathWithHole);
            }
            let component = skeleton::isolate_component(mask, first);
            let skel = skeleton::thin(&component);
            (skeleton::longest_branch(&skel)?, false)
        }
        _ => {
            if !scan.has_hole && mode == ExtractMode::Contour {
                log::warn!("contour mode on a shape without a hole; path mode may fit better");
                advisories.push(Advisory::ContourWithoutHole);
            }
            let mut ring = scan.largest;
            ensure_clockwise(&mut ring);
            (ring, true)
        }
    };

    log::debug!(
        "extracted {} points ({})",
        points.len(),
        if closed { "closed" } else { "open" }
    );

    Ok(Extraction {
        points,
        closed,
        mode_used,
        has_hole: scan.has_hole,
        advisories,
    })
}
