use image::Rgba;

/// All puzzle parameters in one struct.
/// Adjustable at runtime (for editor sliders) and cheap to clone.
#[derive(Debug, Clone)]
pub struct PuzzleConfig {
    // -- Bitmap stage --
    /// Threshold method for converting to binary.
    pub threshold: ThresholdMethod,
    /// If true, invert the mask (swap foreground/background) after thresholding.
    pub invert: bool,
    /// Morphological open + close (3x3) to remove speckles and pinholes.
    pub clean: bool,

    // -- Extraction --
    pub mode: ExtractMode,

    // -- Simplification --
    pub simplify: SimplifyParams,

    // -- Dots and labels --
    /// Dot radius in pixels.
    pub dot_radius: f64,
    pub dot_color: Rgba<u8>,
    /// Label font size in pixels.
    pub font_size: f64,
    pub label_color: Rgba<u8>,

    // -- Placement --
    /// Overlap grid cell size. If None, 7x the dot radius.
    pub cell_size: Option<f64>,
    pub strategy: Strategy,
}

/// Threshold method for converting a grayscale image to binary.
#[derive(Debug, Clone, Copy)]
pub enum ThresholdMethod {
    /// Fixed brightness threshold (0-255).
    Fixed(u8),
    /// Otsu's method (automatic).
    Otsu,
}

/// How the ordered point sequence is pulled out of the mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractMode {
    /// Closed outer boundary.
    Contour,
    /// Open medial path (longest skeleton branch).
    Path,
    /// Contour if the shape has a hole, Path otherwise.
    Automatic,
}

/// RDP tolerance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Epsilon {
    /// Pixels.
    Absolute(f64),
    /// Fraction of the path's arc length.
    ArcFraction(f64),
}

/// Maximum-distance insertion variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Spacing {
    /// Insert floor(d / max) evenly spaced points per long gap, in one pass.
    Even,
    /// Repeatedly bisect any gap longer than max.
    Bisect,
}

#[derive(Debug, Clone)]
pub struct SimplifyParams {
    pub epsilon: Epsilon,
    /// Drop points closer than this to the last kept point.
    pub min_distance: Option<f64>,
    /// Insert points so no gap exceeds this.
    pub max_distance: Option<f64>,
    pub spacing: Spacing,
    /// Visvalingam-Whyatt target point count.
    pub target_count: Option<usize>,
    /// Visvalingam-Whyatt stops once the smallest effective area reaches this.
    pub area_threshold: Option<f64>,
}

/// Label placement strategy.
#[derive(Debug, Clone, PartialEq)]
pub enum Strategy {
    /// First collision-free candidate from a fixed list.
    FirstFit,
    /// Lowest local density among random candidates.
    Density(DensityParams),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DensityParams {
    /// Random candidates in addition to the default one.
    pub samples: usize,
    /// Outer radius of the sampling annulus. If None, 4x the dot radius.
    pub search_radius: Option<f64>,
    /// Kernel support radius. If None, the grid cell size.
    pub kernel_radius: Option<f64>,
    /// Multiplier applied to the default candidate's density.
    pub default_bias: f64,
    pub seed: u64,
}

impl Default for DensityParams {
    fn default() -> Self {
        Self {
            samples: 32,
            search_radius: None,
            kernel_radius: None,
            default_bias: 0.9,
            seed: 0,
        }
    }
}

impl Default for SimplifyParams {
    fn default() -> Self {
        Self {
            epsilon: Epsilon::Absolute(15.0),
            min_distance: None,
            max_distance: None,
            spacing: Spacing::Even,
            target_count: None,
            area_threshold: None,
        }
    }
}

impl Default for PuzzleConfig {
    fn default() -> Self {
        Self {
            threshold: ThresholdMethod::Fixed(100),
            invert: false,
            clean: false,
            mode: ExtractMode::Automatic,
            simplify: SimplifyParams::default(),
            dot_radius: 10.0,
            dot_color: Rgba([0, 0, 0, 255]),
            font_size: 57.0,
            label_color: Rgba([0, 0, 0, 255]),
            cell_size: None,
            strategy: Strategy::FirstFit,
        }
    }
}

impl PuzzleConfig {
    /// Grid cell size actually used for placement.
    pub fn effective_cell_size(&self) -> f64 {
        self.cell_size.unwrap_or(self.dot_radius * 7.0).max(1.0)
    }
}
