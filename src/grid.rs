//! Uniform spatial hash over dots and labels for overlap queries.
//!
//! Each entity lives in the cell containing its anchor position. Cell size
//! must be at least the largest entity extent so that anything able to
//! overlap an entity sits in its 3x3 cell neighbourhood.

use std::collections::{BTreeSet, HashMap, HashSet};

use kurbo::{Point, Rect, Size};

use crate::model::{hit_box, Anchor, Dot, DotSequence, Label};

/// Handle of an entity stored in the grid: the owning dot's index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKey {
    Dot(usize),
    Label(usize),
}

impl EntityKey {
    /// Index of the dot this entity belongs to.
    pub fn dot_index(self) -> usize {
        match self {
            EntityKey::Dot(i) | EntityKey::Label(i) => i,
        }
    }
}

/// Overlap geometry of a dot or a label.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Entity {
    Dot { center: Point, radius: f64 },
    Label { position: Point, anchor: Anchor, size: Size },
}

impl Entity {
    pub fn of_dot(dot: &Dot) -> Self {
        Entity::Dot {
            center: dot.position,
            radius: dot.radius,
        }
    }

    pub fn of_label(label: &Label) -> Self {
        Entity::Label {
            position: label.position,
            anchor: label.anchor,
            size: label.size,
        }
    }

    /// Position used for cell assignment.
    pub fn position(&self) -> Point {
        match *self {
            Entity::Dot { center, .. } => center,
            Entity::Label { position, .. } => position,
        }
    }

    /// Visual centre: the dot centre or the middle of the label box.
    pub fn center(&self) -> Point {
        match *self {
            Entity::Dot { center, .. } => center,
            Entity::Label { .. } => self.hit_box().center(),
        }
    }

    /// Characteristic size: dot radius or label box diagonal.
    pub fn mass(&self) -> f64 {
        match *self {
            Entity::Dot { radius, .. } => radius,
            Entity::Label { size, .. } => size.width.hypot(size.height),
        }
    }

    fn hit_box(&self) -> Rect {
        match *self {
            Entity::Dot { center, radius } => Rect::from_center_size(center, (2.0 * radius, 2.0 * radius)),
            Entity::Label {
                position,
                anchor,
                size,
            } => hit_box(position, anchor, size),
        }
    }
}

/// Whether two entities overlap.
pub fn overlaps(a: &Entity, b: &Entity) -> bool {
    match (*a, *b) {
        (
            Entity::Dot {
                center: ca,
                radius: ra,
            },
            Entity::Dot {
                center: cb,
                radius: rb,
            },
        ) => (ca - cb).hypot2() < (ra + rb) * (ra + rb),
        (Entity::Dot { center, radius }, label @ Entity::Label { .. })
        | (label @ Entity::Label { .. }, Entity::Dot { center, radius }) => {
            circle_hits_rect(center, radius, label.hit_box())
        }
        (Entity::Label { .. }, Entity::Label { .. }) => {
            let (ra, rb) = (a.hit_box(), b.hit_box());
            !(ra.x1 <= rb.x0 || rb.x1 <= ra.x0 || ra.y1 <= rb.y0 || rb.y1 <= ra.y0)
        }
    }
}

fn circle_hits_rect(center: Point, radius: f64, rect: Rect) -> bool {
    let closest = Point::new(
        center.x.clamp(rect.x0, rect.x1),
        center.y.clamp(rect.y0, rect.y1),
    );
    (center - closest).hypot2() < radius * radius
}

/// Spatial hash over a fixed canvas.
///
/// Single writer; share it read-only once placement is done.
#[derive(Debug, Clone)]
pub struct OverlapGrid {
    cell_size: f64,
    cols: usize,
    rows: usize,
    cells: HashMap<(usize, usize), BTreeSet<EntityKey>>,
    entities: HashMap<EntityKey, Entity>,
}

impl OverlapGrid {
    pub fn new(width: f64, height: f64, cell_size: f64) -> Self {
        let cell_size = cell_size.max(1.0);
        OverlapGrid {
            cell_size,
            cols: ((width / cell_size).ceil() as usize).max(1),
            rows: ((height / cell_size).ceil() as usize).max(1),
            cells: HashMap::new(),
            entities: HashMap::new(),
        }
    }

    /// Grid holding every dot and label of `dots`.
    pub fn from_dots(dots: &DotSequence, width: f64, height: f64, cell_size: f64) -> Self {
        let mut grid = OverlapGrid::new(width, height, cell_size);
        for (i, dot) in dots.iter().enumerate() {
            grid.insert(EntityKey::Dot(i), Entity::of_dot(dot));
            if let Some(label) = &dot.label {
                grid.insert(EntityKey::Label(i), Entity::of_label(label));
            }
        }
        grid
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn get(&self, key: EntityKey) -> Option<&Entity> {
        self.entities.get(&key)
    }

    /// (row, col) of the cell containing `pos`, clamped to the canvas.
    pub fn cell_of(&self, pos: Point) -> (usize, usize) {
        let clamp = |v: f64, n: usize| ((v / self.cell_size).floor().max(0.0) as usize).min(n - 1);
        (clamp(pos.y, self.rows), clamp(pos.x, self.cols))
    }

    /// Add an entity. A key already present is moved instead.
    pub fn insert(&mut self, key: EntityKey, entity: Entity) {
        if self.entities.contains_key(&key) {
            self.remove(key);
        }
        let cell = self.cell_of(entity.position());
        self.cells.entry(cell).or_default().insert(key);
        self.entities.insert(key, entity);
    }

    pub fn remove(&mut self, key: EntityKey) -> Option<Entity> {
        let entity = self.entities.remove(&key)?;
        let cell = self.cell_of(entity.position());
        if let Some(members) = self.cells.get_mut(&cell) {
            members.remove(&key);
            if members.is_empty() {
                self.cells.remove(&cell);
            }
        }
        Some(entity)
    }

    /// Replace an entity's geometry after it moved.
    pub fn move_entity(&mut self, key: EntityKey, entity: Entity) {
        self.remove(key);
        self.insert(key, entity);
    }

    /// Everything in the 3x3 cell block around `pos`.
    pub fn near(&self, pos: Point) -> BTreeSet<EntityKey> {
        let (row, col) = self.cell_of(pos);
        let mut found = BTreeSet::new();
        for r in row.saturating_sub(1)..=(row + 1).min(self.rows - 1) {
            for c in col.saturating_sub(1)..=(col + 1).min(self.cols - 1) {
                if let Some(members) = self.cells.get(&(r, c)) {
                    found.extend(members.iter().copied());
                }
            }
        }
        found
    }

    /// Entities in the 3x3 block around `key`'s cell, excluding `key`.
    pub fn neighbors(&self, key: EntityKey) -> BTreeSet<EntityKey> {
        match self.entities.get(&key) {
            Some(entity) => {
                let mut found = self.near(entity.position());
                found.remove(&key);
                found
            }
            None => BTreeSet::new(),
        }
    }

    /// Whether two stored entities overlap. Unknown keys never overlap.
    pub fn overlaps(&self, a: EntityKey, b: EntityKey) -> bool {
        match (self.entities.get(&a), self.entities.get(&b)) {
            (Some(ea), Some(eb)) => overlaps(ea, eb),
            _ => false,
        }
    }

    /// Whether `candidate` would overlap anything stored near it.
    pub fn collides(&self, candidate: &Entity) -> bool {
        self.near(candidate.position())
            .iter()
            .filter_map(|k| self.entities.get(k))
            .any(|e| overlaps(candidate, e))
    }

    /// Every entity involved in at least one overlap.
    pub fn find_all_overlaps(&self) -> BTreeSet<EntityKey> {
        let mut hits = BTreeSet::new();
        let mut visited: HashSet<(EntityKey, EntityKey)> = HashSet::new();

        for members in self.cells.values() {
            let local: Vec<EntityKey> = members.iter().copied().collect();
            for (i, &a) in local.iter().enumerate() {
                for &b in &local[i + 1..] {
                    self.test_pair(a, b, &mut visited, &mut hits);
                }
                for b in self.neighbors(a) {
                    self.test_pair(a, b, &mut visited, &mut hits);
                }
            }
        }
        hits
    }

    fn test_pair(
        &self,
        a: EntityKey,
        b: EntityKey,
        visited: &mut HashSet<(EntityKey, EntityKey)>,
        hits: &mut BTreeSet<EntityKey>,
    ) {
        let pair = if a < b { (a, b) } else { (b, a) };
        if visited.insert(pair) && self.overlaps(a, b) {
            hits.insert(a);
            hits.insert(b);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dot(x: f64, y: f64, r: f64) -> Entity {
        Entity::Dot {
            center: Point::new(x, y),
            radius: r,
        }
    }

    fn label(x: f64, y: f64, w: f64, h: f64) -> Entity {
        Entity::Label {
            position: Point::new(x, y),
            anchor: Anchor::LeftBaseline,
            size: Size::new(w, h),
        }
    }

    #[test]
    fn dot_dot_uses_radii() {
        assert!(overlaps(&dot(0.0, 0.0, 5.0), &dot(9.0, 0.0, 5.0)));
        assert!(!overlaps(&dot(0.0, 0.0, 5.0), &dot(10.0, 0.0, 5.0)));
    }

    #[test]
    fn dot_label_uses_shrunk_box() {
        // Box spans x 20..40, y 0..10; hit box x 21..39, y 1..9.
        let l = label(20.0, 10.0, 20.0, 10.0);
        assert!(overlaps(&dot(15.0, 5.0, 6.5), &l));
        assert!(!overlaps(&dot(15.0, 5.0, 5.5), &l));
        assert!(overlaps(&l, &dot(15.0, 5.0, 6.5)));
    }

    #[test]
    fn label_label_separating_axis() {
        let a = label(0.0, 10.0, 20.0, 10.0);
        assert!(overlaps(&a, &label(15.0, 10.0, 20.0, 10.0)));
        // Touching after the shrink does not count.
        assert!(!overlaps(&a, &label(18.0, 10.0, 20.0, 10.0)));
        assert!(!overlaps(&a, &label(0.0, 30.0, 20.0, 10.0)));
    }

    #[test]
    fn cells_clamp_to_canvas() {
        let grid = OverlapGrid::new(100.0, 50.0, 10.0);
        assert_eq!(grid.cell_of(Point::new(-5.0, -5.0)), (0, 0));
        assert_eq!(grid.cell_of(Point::new(25.0, 12.0)), (1, 2));
        assert_eq!(grid.cell_of(Point::new(500.0, 500.0)), (4, 9));
    }

    #[test]
    fn neighbors_cover_three_by_three_block() {
        let mut grid = OverlapGrid::new(100.0, 100.0, 10.0);
        grid.insert(EntityKey::Dot(0), dot(15.0, 15.0, 1.0));
        grid.insert(EntityKey::Dot(1), dot(25.0, 25.0, 1.0));
        grid.insert(EntityKey::Dot(2), dot(35.0, 35.0, 1.0));
        let n = grid.neighbors(EntityKey::Dot(0));
        assert_eq!(n.into_iter().collect::<Vec<_>>(), vec![EntityKey::Dot(1)]);
        assert!(grid.neighbors(EntityKey::Dot(1)).contains(&EntityKey::Dot(2)));
    }

    #[test]
    fn move_and_remove_update_cells() {
        let mut grid = OverlapGrid::new(100.0, 100.0, 10.0);
        grid.insert(EntityKey::Dot(0), dot(5.0, 5.0, 1.0));
        grid.insert(EntityKey::Dot(1), dot(95.0, 95.0, 1.0));
        assert!(grid.neighbors(EntityKey::Dot(0)).is_empty());

        grid.move_entity(EntityKey::Dot(1), dot(12.0, 12.0, 1.0));
        assert!(grid.neighbors(EntityKey::Dot(0)).contains(&EntityKey::Dot(1)));
        assert_eq!(grid.len(), 2);

        assert!(grid.remove(EntityKey::Dot(1)).is_some());
        assert!(grid.neighbors(EntityKey::Dot(0)).is_empty());
        assert!(grid.remove(EntityKey::Dot(1)).is_none());
    }

    #[test]
    fn from_dots_indexes_dots_and_labels() {
        use image::Rgba;

        let black = Rgba([0, 0, 0, 255]);
        let points = [Point::new(20.0, 20.0), Point::new(80.0, 20.0), Point::new(85.0, 22.0)];
        let mut dots = DotSequence::from_points(&points, 4.0, black);
        if let Some(dot) = dots.get_mut(0) {
            dot.label = Some(Label {
                position: Point::new(26.0, 16.0),
                anchor: Anchor::LeftBaseline,
                color: black,
                text: "1".into(),
                size: Size::new(6.0, 7.0),
                valid: true,
            });
        }

        let grid = OverlapGrid::from_dots(&dots, 100.0, 100.0, 30.0);
        assert_eq!(grid.len(), 4);
        assert!(grid.get(EntityKey::Label(0)).is_some());
        assert!(grid.get(EntityKey::Label(1)).is_none());
        let expected: BTreeSet<EntityKey> = [EntityKey::Dot(1), EntityKey::Dot(2)].into_iter().collect();
        assert_eq!(grid.find_all_overlaps(), expected);
    }

    #[test]
    fn find_all_overlaps_reports_every_party() {
        let mut grid = OverlapGrid::new(100.0, 100.0, 10.0);
        grid.insert(EntityKey::Dot(0), dot(9.0, 9.0, 2.0));
        // Adjacent cell, overlapping dot 0.
        grid.insert(EntityKey::Dot(1), dot(11.0, 11.0, 2.0));
        grid.insert(EntityKey::Dot(2), dot(50.0, 50.0, 2.0));
        grid.insert(EntityKey::Label(2), label(51.0, 53.0, 10.0, 6.0));
        grid.insert(EntityKey::Dot(3), dot(90.0, 90.0, 2.0));

        let hits = grid.find_all_overlaps();
        let expected: BTreeSet<EntityKey> = [
            EntityKey::Dot(0),
            EntityKey::Dot(1),
            EntityKey::Dot(2),
            EntityKey::Label(2),
        ]
        .into_iter()
        .collect();
        assert_eq!(hits, expected);
        assert!(grid.overlaps(EntityKey::Dot(2), EntityKey::Label(2)));
        assert!(!grid.overlaps(EntityKey::Dot(2), EntityKey::Dot(3)));
    }
}
