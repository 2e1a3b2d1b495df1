//! Dots, their labels, and the numbered sequence that owns them.

use std::ops::Index;

use image::Rgba;
use kurbo::{Point, Rect, Size};

/// Fraction of the label height trimmed from each side of its hit box.
const LABEL_SHRINK: f64 = 0.1;

/// Which point of the text's baseline sits at `Label::position`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Anchor {
    LeftBaseline,
    RightBaseline,
    CenterBaseline,
}

impl Anchor {
    pub const ALL: [Anchor; 3] = [
        Anchor::LeftBaseline,
        Anchor::RightBaseline,
        Anchor::CenterBaseline,
    ];

    /// Two-letter anchor code as used by common text renderers.
    pub fn code(self) -> &'static str {
        match self {
            Anchor::LeftBaseline => "ls",
            Anchor::RightBaseline => "rs",
            Anchor::CenterBaseline => "ms",
        }
    }
}

/// A dot's number, positioned next to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub position: Point,
    pub anchor: Anchor,
    pub color: Rgba<u8>,
    pub text: String,
    /// Rendered text extent from font metrics.
    pub size: Size,
    /// False when no collision-free spot was found.
    pub valid: bool,
}

/// Text box for text of `size` anchored at `position`.
pub fn text_extent(position: Point, anchor: Anchor, size: Size) -> Rect {
    let (w, h) = (size.width, size.height);
    let dx = match anchor {
        Anchor::LeftBaseline => 0.0,
        Anchor::RightBaseline => -w,
        Anchor::CenterBaseline => -w / 2.0,
    };
    let x0 = position.x + dx;
    let y0 = position.y - h;
    Rect::new(x0, y0, x0 + w, y0 + h)
}

/// Text box shrunk by 10% of its height on each side.
///
/// Anti-aliased glyph edges rarely fill the metric box, so overlap tests
/// use this tighter box.
pub fn hit_box(position: Point, anchor: Anchor, size: Size) -> Rect {
    let full = text_extent(position, anchor, size);
    let margin = size.height * LABEL_SHRINK;
    let w = (size.width - 2.0 * margin).max(1.0);
    let h = (size.height - 2.0 * margin).max(1.0);
    let x0 = full.x0 + (size.width - w) / 2.0;
    let y0 = full.y0 + (size.height - h) / 2.0;
    Rect::new(x0, y0, x0 + w, y0 + h)
}

/// A numbered dot.
#[derive(Debug, Clone, PartialEq)]
pub struct Dot {
    /// 1-based position in the sequence.
    pub id: usize,
    pub position: Point,
    pub radius: f64,
    pub color: Rgba<u8>,
    pub label: Option<Label>,
}

impl Dot {
    pub fn new(id: usize, position: Point, radius: f64, color: Rgba<u8>) -> Self {
        Dot {
            id,
            position,
            radius,
            color,
            label: None,
        }
    }
}

/// Ordered dots whose ids always read 1..=N in list order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DotSequence {
    dots: Vec<Dot>,
}

impl DotSequence {
    pub fn from_points(points: &[Point], radius: f64, color: Rgba<u8>) -> Self {
        let dots = points
            .iter()
            .enumerate()
            .map(|(i, &p)| Dot::new(i + 1, p, radius, color))
            .collect();
        DotSequence { dots }
    }

    pub fn len(&self) -> usize {
        self.dots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dots.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Dot> {
        self.dots.iter()
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Dot> {
        self.dots.get_mut(index)
    }

    pub fn positions(&self) -> Vec<Point> {
        self.dots.iter().map(|d| d.position).collect()
    }

    /// Reverse the numbering direction.
    pub fn reverse(&mut self) {
        self.dots.reverse();
        self.renumber();
    }

    /// Rotate so the dot at `index` becomes number 1.
    pub fn start_at(&mut self, index: usize) {
        if index < self.dots.len() {
            self.dots.rotate_left(index);
            self.renumber();
        }
    }

    /// Insert a new dot right after `index`, copying its neighbour's style.
    ///
    /// Returns the new dot's index. `index` past the end appends.
    pub fn insert_after(&mut self, index: usize, position: Point) -> usize {
        let at = (index + 1).min(self.dots.len());
        let (radius, color) = self
            .dots
            .get(index.min(self.dots.len().saturating_sub(1)))
            .map_or((10.0, Rgba([0, 0, 0, 255])), |d| (d.radius, d.color));
        self.dots.insert(at, Dot::new(0, position, radius, color));
        self.renumber();
        at
    }

    /// Remove the dot at `index` together with its label.
    pub fn remove(&mut self, index: usize) -> Option<Dot> {
        if index >= self.dots.len() {
            return None;
        }
        let removed = self.dots.remove(index);
        self.renumber();
        Some(removed)
    }

    /// Drop every label.
    pub fn clear_labels(&mut self) {
        for dot in &mut self.dots {
            dot.label = None;
        }
    }

    pub fn ids_are_dense(&self) -> bool {
        self.dots.iter().enumerate().all(|(i, d)| d.id == i + 1)
    }

    /// Indices of dots whose label is marked invalid.
    pub fn invalid_labels(&self) -> Vec<usize> {
        self.dots
            .iter()
            .enumerate()
            .filter(|(_, d)| d.label.as_ref().is_some_and(|l| !l.valid))
            .map(|(i, _)| i)
            .collect()
    }

    fn renumber(&mut self) {
        for (i, dot) in self.dots.iter_mut().enumerate() {
            dot.id = i + 1;
            if let Some(label) = &mut dot.label {
                label.text = dot.id.to_string();
            }
        }
    }
}

impl Index<usize> for DotSequence {
    type Output = Dot;

    fn index(&self, index: usize) -> &Dot {
        &self.dots[index]
    }
}

impl<'a> IntoIterator for &'a DotSequence {
    type Item = &'a Dot;
    type IntoIter = std::slice::Iter<'a, Dot>;

    fn into_iter(self) -> Self::IntoIter {
        self.dots.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labelled(n: usize) -> DotSequence {
        let points: Vec<Point> = (0..n).map(|i| Point::new(i as f64 * 10.0, 0.0)).collect();
        let mut seq = DotSequence::from_points(&points, 5.0, Rgba([0, 0, 0, 255]));
        for i in 0..n {
            let dot = seq.get_mut(i).unwrap();
            dot.label = Some(Label {
                position: dot.position,
                anchor: Anchor::LeftBaseline,
                color: Rgba([0, 0, 0, 255]),
                text: dot.id.to_string(),
                size: Size::new(10.0, 10.0),
                valid: true,
            });
        }
        seq
    }

    fn texts(seq: &DotSequence) -> Vec<String> {
        seq.iter()
            .map(|d| d.label.as_ref().map(|l| l.text.clone()).unwrap_or_default())
            .collect()
    }

    #[test]
    fn ids_stay_dense_through_edits() {
        let mut seq = labelled(5);
        seq.reverse();
        assert!(seq.ids_are_dense());
        assert_eq!(seq[0].position, Point::new(40.0, 0.0));

        seq.start_at(2);
        assert!(seq.ids_are_dense());
        let xs: Vec<f64> = seq.positions().iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![20.0, 10.0, 0.0, 40.0, 30.0]);

        let at = seq.insert_after(1, Point::new(99.0, 99.0));
        assert_eq!(at, 2);
        assert_eq!(seq.len(), 6);
        assert!(seq.ids_are_dense());
        assert!(seq[2].label.is_none());

        let removed = seq.remove(0).unwrap();
        assert_eq!(removed.position, Point::new(20.0, 0.0));
        assert!(seq.ids_are_dense());
        assert!(seq.remove(10).is_none());
    }

    #[test]
    fn label_text_follows_renumbering() {
        let mut seq = labelled(3);
        seq.reverse();
        assert_eq!(texts(&seq), vec!["1", "2", "3"]);
        assert_eq!(seq[0].position, Point::new(20.0, 0.0));
    }

    #[test]
    fn anchors_shift_the_box() {
        let size = Size::new(20.0, 10.0);
        let p = Point::new(100.0, 50.0);
        assert_eq!(text_extent(p, Anchor::LeftBaseline, size), Rect::new(100.0, 40.0, 120.0, 50.0));
        assert_eq!(text_extent(p, Anchor::RightBaseline, size), Rect::new(80.0, 40.0, 100.0, 50.0));
        assert_eq!(text_extent(p, Anchor::CenterBaseline, size), Rect::new(90.0, 40.0, 110.0, 50.0));
    }

    #[test]
    fn hit_box_is_shrunk_by_a_tenth_of_height() {
        let b = hit_box(Point::new(0.0, 10.0), Anchor::LeftBaseline, Size::new(20.0, 10.0));
        assert_eq!(b, Rect::new(1.0, 1.0, 19.0, 9.0));
    }
}
