//! img2dots: binary silhouette → numbered connect-the-dots puzzle.
//!
//! Extracts an ordered boundary or medial path from a shape, reduces it to
//! a few dominant points, and places a non-overlapping number next to each.
//! The result is geometry only; drawing it is left to the caller.
//!
//! # Example
//!
//! ```no_run
//! use img2dots::{generate_from_file, FixedAdvance, PuzzleConfig};
//! use std::path::Path;
//!
//! let config = PuzzleConfig::default();
//! let puzzle = generate_from_file(Path::new("shape.png"), &config, &FixedAdvance::default())?;
//! for dot in &puzzle.dots {
//!     println!("{} at {:?}", dot.id, dot.position);
//! }
//! # Ok::<(), img2dots::DotsError>(())
//! ```

#![forbid(unsafe_code)]

pub mod bitmap;
pub mod config;
mod contour;
pub mod error;
pub mod extract;
pub mod geom;
pub mod grid;
pub mod metrics;
pub mod model;
pub mod place;
mod skeleton;
pub mod simplify;

// Re-export kurbo so downstream users get the same Point/Size types.
pub use kurbo;

pub use config::{
    DensityParams, Epsilon, ExtractMode, PuzzleConfig, SimplifyParams, Spacing, Strategy,
    ThresholdMethod,
};
pub use error::{DotsError, Stage};
pub use extract::{Advisory, Extraction};
pub use grid::{Entity, EntityKey, OverlapGrid};
pub use metrics::{FixedAdvance, FontMetrics, GlyphMetrics};
pub use model::{Anchor, Dot, DotSequence, Label};
pub use place::LabelPlacer;

use std::collections::BTreeSet;
use std::path::Path;
use std::time::Instant;

use image::GrayImage;
use kurbo::Size;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// A generated puzzle: numbered dots with labels on a fixed canvas.
#[derive(Debug, Clone)]
pub struct Puzzle {
    pub dots: DotSequence,
    /// Indices of dots whose label overlaps something or leaves the canvas.
    pub invalid_labels: Vec<usize>,
    pub advisories: Vec<Advisory>,
    /// Contour or Path.
    pub mode_used: ExtractMode,
    /// Canvas (width, height) in pixels.
    pub canvas: (u32, u32),
    /// Overlap index over every dot and label, as of the last placement.
    pub grid: OverlapGrid,
}

impl Puzzle {
    /// Every dot and label currently overlapping something.
    pub fn overlapping(&self) -> BTreeSet<EntityKey> {
        self.grid.find_all_overlaps()
    }

    /// Re-index dots and labels where they currently are, without moving
    /// any label. Use after dragging dots or labels by hand.
    pub fn rebuild_grid(&mut self) {
        let (w, h) = (self.canvas.0 as f64, self.canvas.1 as f64);
        self.grid = OverlapGrid::from_dots(&self.dots, w, h, self.grid.cell_size());
    }

    /// Re-run label placement, e.g. after editing the dot sequence.
    pub fn relabel(&mut self, config: &PuzzleConfig, metrics: &dyn FontMetrics) {
        let (w, h) = (self.canvas.0 as f64, self.canvas.1 as f64);
        let cell = config.effective_cell_size();
        self.grid = OverlapGrid::new(w, h, cell);
        self.invalid_labels = place_labels(&mut self.dots, &mut self.grid, config, metrics, Size::new(w, h));
    }
}

/// Full pipeline: image file → puzzle.
pub fn generate_from_file(
    image_path: &Path,
    config: &PuzzleConfig,
    metrics: &dyn FontMetrics,
) -> Result<Puzzle, DotsError> {
    let mask = bitmap::load_mask(image_path, config)?;
    generate(&mask, config, metrics)
}

/// Full pipeline: binary mask (foreground = 255) → puzzle.
///
/// Extraction and simplification failures abort with an error. Labels that
/// cannot be placed cleanly do not; they are listed in `invalid_labels`.
pub fn generate(
    mask: &GrayImage,
    config: &PuzzleConfig,
    metrics: &dyn FontMetrics,
) -> Result<Puzzle, DotsError> {
    let t_start = Instant::now();
    let (w, h) = mask.dimensions();

    let extraction = extract::extract(mask, config.mode)?;
    log::info!(
        "extract: {}x{} px, {:?} mode, {} points",
        w,
        h,
        extraction.mode_used,
        extraction.points.len()
    );

    let points = simplify::simplify(&extraction.points, extraction.closed, &config.simplify)?;
    log::info!(
        "simplify: {} -> {} dominant points",
        extraction.points.len(),
        points.len()
    );

    let mut dots = DotSequence::from_points(&points, config.dot_radius, config.dot_color);
    let canvas = Size::new(w as f64, h as f64);
    let mut grid = OverlapGrid::new(canvas.width, canvas.height, config.effective_cell_size());
    let invalid_labels = place_labels(&mut dots, &mut grid, config, metrics, canvas);
    log::info!(
        "place: {} labels, {} invalid  ({}ms)",
        dots.len(),
        invalid_labels.len(),
        t_start.elapsed().as_millis()
    );

    Ok(Puzzle {
        dots,
        invalid_labels,
        advisories: extraction.advisories,
        mode_used: extraction.mode_used,
        canvas: (w, h),
        grid,
    })
}

fn place_labels(
    dots: &mut DotSequence,
    grid: &mut OverlapGrid,
    config: &PuzzleConfig,
    metrics: &dyn FontMetrics,
    canvas: Size,
) -> Vec<usize> {
    let placer = LabelPlacer::from_config(metrics, config, canvas);
    let seed = match &config.strategy {
        Strategy::Density(params) => params.seed,
        Strategy::FirstFit => 0,
    };
    let mut rng = StdRng::seed_from_u64(seed);
    placer.place_all(dots, grid, &mut rng)
}
