//! Label placement around dots.
//!
//! Dots are visited in sequence order. Each dot goes into the grid before
//! its label is chosen, so every label sees all earlier dots and labels as
//! obstacles.

use std::f64::consts::{PI, TAU};

use image::Rgba;
use kurbo::{Point, Size, Vec2};
use rand::Rng;

use crate::config::{DensityParams, PuzzleConfig, Strategy};
use crate::grid::{Entity, EntityKey, OverlapGrid};
use crate::metrics::FontMetrics;
use crate::model::{text_extent, Anchor, Dot, DotSequence, Label};

/// Label offset from the dot centre, in dot radii.
const OFFSET_FACTOR: f64 = 1.2;
/// Search radius of density sampling, in dot radii, when not configured.
const SEARCH_FACTOR: f64 = 4.0;

/// 2-D cubic spline smoothing kernel with support radius `h`.
///
/// Zero at and beyond `r = h`.
pub fn cubic_spline(r: f64, h: f64) -> f64 {
    if h <= 0.0 {
        return 0.0;
    }
    let q = 2.0 * r / h;
    let sigma = 40.0 / (7.0 * PI * h * h);
    if q < 1.0 {
        sigma * (1.0 - 1.5 * q * q + 0.75 * q * q * q)
    } else if q < 2.0 {
        sigma * 0.25 * (2.0 - q).powi(3)
    } else {
        0.0
    }
}

/// Fixed candidate list, in preference order: upper right, lower right,
/// upper left, lower left, above, below.
pub fn candidates(dot: &Dot) -> [(Point, Anchor); 6] {
    let d = OFFSET_FACTOR * dot.radius;
    let Point { x, y } = dot.position;
    [
        (Point::new(x + d, y - d), Anchor::LeftBaseline),
        (Point::new(x + d, y + d), Anchor::LeftBaseline),
        (Point::new(x - d, y - d), Anchor::RightBaseline),
        (Point::new(x - d, y + d), Anchor::RightBaseline),
        (Point::new(x, y - 2.0 * d), Anchor::CenterBaseline),
        (Point::new(x, y + 3.0 * d), Anchor::CenterBaseline),
    ]
}

/// Lowest-density candidate among `default` and `rest`.
///
/// The default's density is scaled by `bias` first; an infinite density
/// stays infinite. Earlier candidates win ties.
fn pick_least_dense(
    default: ((Point, Anchor), f64),
    rest: impl IntoIterator<Item = ((Point, Anchor), f64)>,
    bias: f64,
) -> ((Point, Anchor), f64) {
    let (mut best, density) = default;
    let mut best_density = if density.is_finite() {
        density * bias
    } else {
        density
    };
    for (candidate, density) in rest {
        if density < best_density {
            best = candidate;
            best_density = density;
        }
    }
    (best, best_density)
}

/// Chooses a position and anchor for each dot's label.
pub struct LabelPlacer<'a> {
    metrics: &'a dyn FontMetrics,
    font_size: f64,
    color: Rgba<u8>,
    canvas: Size,
    strategy: Strategy,
    cell_size: f64,
}

impl<'a> LabelPlacer<'a> {
    pub fn new(
        metrics: &'a dyn FontMetrics,
        font_size: f64,
        color: Rgba<u8>,
        canvas: Size,
        strategy: Strategy,
        cell_size: f64,
    ) -> Self {
        LabelPlacer {
            metrics,
            font_size,
            color,
            canvas,
            strategy,
            cell_size,
        }
    }

    pub fn from_config(metrics: &'a dyn FontMetrics, config: &PuzzleConfig, canvas: Size) -> Self {
        Self::new(
            metrics,
            config.font_size,
            config.label_color,
            canvas,
            config.strategy.clone(),
            config.effective_cell_size(),
        )
    }

    /// Place labels for every dot, replacing existing ones.
    ///
    /// Returns the indices of dots whose label could not be placed cleanly.
    pub fn place_all<R: Rng + ?Sized>(
        &self,
        dots: &mut DotSequence,
        grid: &mut OverlapGrid,
        rng: &mut R,
    ) -> Vec<usize> {
        dots.clear_labels();
        for i in 0..dots.len() {
            grid.remove(EntityKey::Label(i));
        }

        for i in 0..dots.len() {
            let label = self.place(i, &dots[i], grid, rng);
            grid.insert(EntityKey::Label(i), Entity::of_label(&label));
            if let Some(dot) = dots.get_mut(i) {
                dot.label = Some(label);
            }
        }

        let invalid = dots.invalid_labels();
        if !invalid.is_empty() {
            log::warn!(
                "{} of {} labels could not be placed without overlap",
                invalid.len(),
                dots.len()
            );
        }
        invalid
    }

    /// Insert the dot at `index` into `grid` and choose its label.
    ///
    /// The label itself is not inserted. A label that fits nowhere is still
    /// returned, at the default position with `valid` unset.
    pub fn place<R: Rng + ?Sized>(
        &self,
        index: usize,
        dot: &Dot,
        grid: &mut OverlapGrid,
        rng: &mut R,
    ) -> Label {
        grid.insert(EntityKey::Dot(index), Entity::of_dot(dot));

        let text = dot.id.to_string();
        let default = candidates(dot)[0];
        let size = match self.metrics.text_size(&text, self.font_size) {
            Ok(size) => size,
            Err(e) => {
                log::warn!("no metrics for label {}: {}", text, e);
                return self.label(text, default, Size::ZERO, false);
            }
        };

        let (chosen, valid) = match &self.strategy {
            Strategy::FirstFit => self.first_fit(dot, size, grid),
            Strategy::Density(params) => self.least_dense(dot, size, grid, params, rng),
        };
        if !valid {
            log::debug!("label {} overlaps its surroundings", text);
        }
        self.label(text, chosen, size, valid)
    }

    fn label(&self, text: String, (position, anchor): (Point, Anchor), size: Size, valid: bool) -> Label {
        Label {
            position,
            anchor,
            color: self.color,
            text,
            size,
            valid,
        }
    }

    fn first_fit(&self, dot: &Dot, size: Size, grid: &OverlapGrid) -> ((Point, Anchor), bool) {
        let all = candidates(dot);
        all.iter()
            .find(|&&(position, anchor)| self.fits(position, anchor, size, grid))
            .map_or((all[0], false), |&c| (c, true))
    }

    fn least_dense<R: Rng + ?Sized>(
        &self,
        dot: &Dot,
        size: Size,
        grid: &OverlapGrid,
        params: &DensityParams,
        rng: &mut R,
    ) -> ((Point, Anchor), bool) {
        let h = params.kernel_radius.unwrap_or(self.cell_size);
        let outer = params
            .search_radius
            .unwrap_or(SEARCH_FACTOR * dot.radius)
            .max(dot.radius);

        let default = candidates(dot)[0];
        let scored_default = (default, self.density(default, size, grid, h));
        let sampled = (0..params.samples).map(|_| {
            let angle = rng.random_range(0.0..TAU);
            let r = rng.random_range(dot.radius..=outer);
            let anchor = Anchor::ALL[rng.random_range(0..Anchor::ALL.len())];
            let candidate = (dot.position + Vec2::from_angle(angle) * r, anchor);
            (candidate, self.density(candidate, size, grid, h))
        });
        let (best, density) = pick_least_dense(scored_default, sampled, params.default_bias);
        (best, density.is_finite())
    }

    /// Kernel-weighted mass of everything near a candidate; infinite when
    /// the candidate collides or leaves the canvas.
    fn density(&self, (position, anchor): (Point, Anchor), size: Size, grid: &OverlapGrid, h: f64) -> f64 {
        if !self.fits(position, anchor, size, grid) {
            return f64::INFINITY;
        }
        let candidate = Entity::Label {
            position,
            anchor,
            size,
        };
        let centre = candidate.center();
        grid.near(position)
            .iter()
            .filter_map(|&k| grid.get(k))
            .map(|e| e.mass() * cubic_spline(centre.distance(e.center()), h))
            .sum()
    }

    fn fits(&self, position: Point, anchor: Anchor, size: Size, grid: &OverlapGrid) -> bool {
        let extent = text_extent(position, anchor, size);
        let inside = extent.x0 >= 0.0
            && extent.y0 >= 0.0
            && extent.x1 <= self.canvas.width
            && extent.y1 <= self.canvas.height;
        inside
            && !grid.collides(&Entity::Label {
                position,
                anchor,
                size,
            })
    }
}
