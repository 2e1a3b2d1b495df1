use image::GrayImage;
use imageproc::contours::{find_contours, BorderType};
use kurbo::Point;

use crate::error::DotsError;
use crate::geom::signed_area;

/// Outer contours at or below this fraction of the largest one are noise.
const MIN_AREA_FRACTION: f64 = 0.01;

/// A contour traced from the mask, in pixel coordinates.
#[derive(Debug, Clone)]
pub struct RawContour {
    /// Boundary pixels, in tracing order (y=0 is top of image).
    pub points: Vec<Point>,
    /// Whether this is an outer contour or a hole.
    pub is_outer: bool,
    /// Index of the enclosing contour in the returned Vec.
    pub parent: Option<usize>,
}

impl RawContour {
    pub fn area(&self) -> f64 {
        signed_area(&self.points).abs()
    }
}

/// Result of scanning a mask for its dominant outer boundary.
#[derive(Debug, Clone)]
pub struct ContourScan {
    /// Largest outer contour.
    pub largest: Vec<Point>,
    /// Whether the largest outer contour encloses at least one hole.
    pub has_hole: bool,
    /// Outer contours above 1% of the largest one's area (largest included).
    pub significant: usize,
}

impl ContourScan {
    pub fn has_multiple_contours(&self) -> bool {
        self.significant > 1
    }
}

/// Trace every border (outer and hole) in a binary mask.
///
/// Non-zero pixels are foreground.
pub fn trace(mask: &GrayImage) -> Vec<RawContour> {
    find_contours::<i32>(mask)
        .into_iter()
        .map(|contour| RawContour {
            points: contour
                .points
                .iter()
                .map(|p| Point::new(p.x as f64, p.y as f64))
                .collect(),
            is_outer: contour.border_type == BorderType::Outer,
            parent: contour.parent,
        })
        .collect()
}

/// Find the largest outer contour, its holes, and any other sizeable shapes.
pub fn scan(mask: &GrayImage) -> Result<ContourScan, DotsError> {
    let contours = trace(mask);

    // Single pixels and hairlines have zero shoelace area but are still
    // valid shapes, so fall back to point count when comparing them.
    let size = |c: &RawContour| (c.area(), c.points.len());
    let (largest_idx, largest) = contours
        .iter()
        .enumerate()
        .filter(|(_, c)| c.is_outer)
        .max_by(|(_, a), (_, b)| {
            let (aa, an) = size(a);
            let (ba, bn) = size(b);
            aa.total_cmp(&ba).then(an.cmp(&bn))
        })
        .ok_or(DotsError::NoContours)?;

    let threshold = largest.area() * MIN_AREA_FRACTION;
    let significant = contours
        .iter()
        .enumerate()
        .filter(|&(i, c)| c.is_outer && (i == largest_idx || c.area() > threshold))
        .count();

    let has_hole = contours
        .iter()
        .any(|c| !c.is_outer && c.parent == Some(largest_idx));

    Ok(ContourScan {
        largest: largest.points.clone(),
        has_hole,
        significant,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect;

    fn blank() -> GrayImage {
        GrayImage::new(60, 60)
    }

    #[test]
    fn empty_mask_has_no_contours() {
        assert!(matches!(scan(&blank()), Err(DotsError::NoContours)));
    }

    #[test]
    fn ring_has_hole() {
        let mut mask = blank();
        draw_filled_rect_mut(&mut mask, Rect::at(10, 10).of_size(40, 40), Luma([255]));
        draw_filled_rect_mut(&mut mask, Rect::at(20, 20).of_size(20, 20), Luma([0]));
        let scan = scan(&mask).unwrap();
        assert!(scan.has_hole);
        assert!(!scan.has_multiple_contours());
    }

    #[test]
    fn solid_block_has_no_hole() {
        let mut mask = blank();
        draw_filled_rect_mut(&mut mask, Rect::at(10, 10).of_size(40, 40), Luma([255]));
        let scan = scan(&mask).unwrap();
        assert!(!scan.has_hole);
        assert!(scan.largest.len() > 100);
    }

    #[test]
    fn tiny_speck_does_not_count_as_second_shape() {
        let mut mask = blank();
        draw_filled_rect_mut(&mut mask, Rect::at(10, 10).of_size(40, 40), Luma([255]));
        mask.put_pixel(2, 2, Luma([255]));
        assert!(!scan(&mask).unwrap().has_multiple_contours());

        draw_filled_rect_mut(&mut mask, Rect::at(52, 52).of_size(6, 6), Luma([255]));
        let scan = scan(&mask).unwrap();
        assert!(scan.has_multiple_contours());
        assert_eq!(scan.significant, 2);
    }
}
