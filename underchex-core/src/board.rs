//! Hex board geometry with axial coordinates
//!
//! The board is the radius-4 hexagon: every (q, r) with
//! `max(|q|, |r|, |q + r|) <= 4`, 61 cells in total. Each valid cell has a
//! stable index in `0..61` so positions can live in a flat array.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Board radius (distance from center to edge)
pub const BOARD_RADIUS: i8 = 4;

/// Number of cells on the board
pub const NUM_CELLS: usize = 61;

const GRID_WIDTH: usize = 2 * BOARD_RADIUS as usize + 1;
const NO_INDEX: u8 = u8::MAX;

/// Axial hex coordinates. The third coordinate is `s = -q - r`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Hex {
    pub q: i8,
    pub r: i8,
}

impl Hex {
    pub const fn new(q: i8, r: i8) -> Self {
        Self { q, r }
    }

    /// Implicit third axial coordinate
    pub const fn s(&self) -> i8 {
        -self.q - self.r
    }

    /// Check if this hex is on the board
    pub const fn is_valid(&self) -> bool {
        let q = self.q as i16;
        let r = self.r as i16;
        let s = -q - r;
        let radius = BOARD_RADIUS as i16;
        q.abs() <= radius && r.abs() <= radius && s.abs() <= radius
    }

    /// Index of this cell in `0..NUM_CELLS`, or `None` if off-board
    pub fn index(&self) -> Option<usize> {
        if !self.is_valid() {
            return None;
        }
        let slot = grid_slot(self.q, self.r);
        match CELL_INDEX[slot] {
            NO_INDEX => None,
            idx => Some(idx as usize),
        }
    }

    /// Inverse of [`Hex::index`]
    pub fn from_index(index: usize) -> Option<Hex> {
        CELLS.get(index).copied()
    }

    /// Distance from center (0,0)
    pub fn distance_to_center(&self) -> i8 {
        self.distance_to(Hex::new(0, 0))
    }

    /// Distance between two hexes
    pub fn distance_to(&self, other: Hex) -> i8 {
        let dq = (self.q as i16 - other.q as i16).abs();
        let dr = (self.r as i16 - other.r as i16).abs();
        let ds = (self.s() as i16 - other.s() as i16).abs();
        dq.max(dr).max(ds) as i8
    }

    /// Shift by an arbitrary axial offset; the result may be off-board
    pub fn offset(&self, dq: i8, dr: i8) -> Hex {
        Hex::new(self.q.saturating_add(dq), self.r.saturating_add(dr))
    }

    /// Neighbor in a direction, or `None` if it falls off the board
    pub fn neighbor(&self, direction: Direction) -> Option<Hex> {
        let (dq, dr) = direction.delta();
        let next = self.offset(dq, dr);
        next.is_valid().then_some(next)
    }

    /// All on-board neighbors (0-6 cells)
    pub fn neighbors(&self) -> Vec<Hex> {
        Direction::ALL
            .iter()
            .filter_map(|&dir| self.neighbor(dir))
            .collect()
    }

    /// Cells from the first step in `direction` up to the board edge.
    /// Occupancy is not considered here.
    pub fn ray(&self, direction: Direction) -> Ray {
        Ray {
            current: *self,
            direction,
        }
    }

    /// Direction from `self` towards `other` when the two are aligned
    pub fn direction_to(&self, other: Hex) -> Option<Direction> {
        let distance = self.distance_to(other) as i16;
        if distance == 0 {
            return None;
        }
        let dq = other.q as i16 - self.q as i16;
        let dr = other.r as i16 - self.r as i16;

        Direction::ALL.iter().copied().find(|dir| {
            let (uq, ur) = dir.delta();
            uq as i16 * distance == dq && ur as i16 * distance == dr
        })
    }

    /// Interior cells strictly between two aligned hexes.
    /// Returns `None` when the hexes share no direction.
    pub fn cells_between(&self, other: Hex) -> Option<Vec<Hex>> {
        let direction = self.direction_to(other)?;
        let (dq, dr) = direction.delta();
        let distance = self.distance_to(other);
        Some((1..distance).map(|k| self.offset(dq * k, dr * k)).collect())
    }

    /// On-board knight destinations (no blocking)
    pub fn knight_targets(&self) -> impl Iterator<Item = Hex> + '_ {
        KNIGHT_OFFSETS
            .iter()
            .map(move |&(dq, dr)| self.offset(dq, dr))
            .filter(Hex::is_valid)
    }
}

impl fmt::Display for Hex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.q, self.r)
    }
}

/// Iterator over a ray of cells, see [`Hex::ray`]
#[derive(Clone, Debug)]
pub struct Ray {
    current: Hex,
    direction: Direction,
}

impl Iterator for Ray {
    type Item = Hex;

    fn next(&mut self) -> Option<Hex> {
        let next = self.current.neighbor(self.direction)?;
        self.current = next;
        Some(next)
    }
}

/// The six hex directions
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    N,
    S,
    NE,
    SW,
    NW,
    SE,
}

impl Direction {
    pub const ALL: [Direction; 6] = [
        Direction::N,
        Direction::S,
        Direction::NE,
        Direction::SW,
        Direction::NW,
        Direction::SE,
    ];

    /// Unit vector (dq, dr)
    pub const fn delta(self) -> (i8, i8) {
        match self {
            Direction::N => (0, -1),
            Direction::S => (0, 1),
            Direction::NE => (1, -1),
            Direction::SW => (-1, 1),
            Direction::NW => (-1, 0),
            Direction::SE => (1, 0),
        }
    }

    pub const fn opposite(self) -> Direction {
        match self {
            Direction::N => Direction::S,
            Direction::S => Direction::N,
            Direction::NE => Direction::SW,
            Direction::SW => Direction::NE,
            Direction::NW => Direction::SE,
            Direction::SE => Direction::NW,
        }
    }
}

/// Knight leaps: one step in a direction plus one step in an adjacent one
pub const KNIGHT_OFFSETS: [(i8, i8); 6] = [
    (1, -2),  // N + NE
    (-1, -1), // N + NW
    (2, -1),  // NE + SE
    (1, 1),   // SE + S
    (-1, 2),  // S + SW
    (-2, 1),  // SW + NW
];

/// All 61 cells in index order
pub fn all_cells() -> &'static [Hex; NUM_CELLS] {
    &CELLS
}

const fn grid_slot(q: i8, r: i8) -> usize {
    (q + BOARD_RADIUS) as usize * GRID_WIDTH + (r + BOARD_RADIUS) as usize
}

static CELLS: [Hex; NUM_CELLS] = build_cells();
static CELL_INDEX: [u8; GRID_WIDTH * GRID_WIDTH] = build_cell_index();

const fn build_cells() -> [Hex; NUM_CELLS] {
    let mut cells = [Hex::new(0, 0); NUM_CELLS];
    let mut count = 0;
    let mut q = -BOARD_RADIUS;
    while q <= BOARD_RADIUS {
        let mut r = -BOARD_RADIUS;
        while r <= BOARD_RADIUS {
            let hex = Hex::new(q, r);
            if hex.is_valid() {
                cells[count] = hex;
                count += 1;
            }
            r += 1;
        }
        q += 1;
    }
    cells
}

const fn build_cell_index() -> [u8; GRID_WIDTH * GRID_WIDTH] {
    let cells = build_cells();
    let mut index = [NO_INDEX; GRID_WIDTH * GRID_WIDTH];
    let mut i = 0;
    while i < NUM_CELLS {
        index[grid_slot(cells[i].q, cells[i].r)] = i as u8;
        i += 1;
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_validity() {
        assert!(Hex::new(0, 0).is_valid());
        assert!(Hex::new(4, 0).is_valid());
        assert!(Hex::new(0, 4).is_valid());
        assert!(Hex::new(-4, 0).is_valid());
        assert!(Hex::new(4, -4).is_valid());
        assert!(!Hex::new(5, 0).is_valid());
        assert!(!Hex::new(3, 3).is_valid()); // q + r = 6 > 4
        assert!(!Hex::new(-3, -3).is_valid());
    }

    #[test]
    fn test_validity_matches_axial_bound() {
        let mut count = 0;
        for q in -6..=6i8 {
            for r in -6..=6i8 {
                let expected = q.abs().max(r.abs()).max((q + r).abs()) <= 4;
                assert_eq!(Hex::new(q, r).is_valid(), expected, "({}, {})", q, r);
                if expected {
                    count += 1;
                }
            }
        }
        assert_eq!(count, NUM_CELLS);
    }

    #[test]
    fn test_index_bijection() {
        for (i, hex) in all_cells().iter().enumerate() {
            assert_eq!(hex.index(), Some(i));
            assert_eq!(Hex::from_index(i), Some(*hex));
        }
        assert_eq!(Hex::new(5, 0).index(), None);
        assert_eq!(Hex::from_index(NUM_CELLS), None);
    }

    #[test]
    fn test_distance() {
        assert_eq!(Hex::new(0, 0).distance_to_center(), 0);
        assert_eq!(Hex::new(1, 0).distance_to_center(), 1);
        assert_eq!(Hex::new(2, 2).distance_to_center(), 4);
        assert_eq!(Hex::new(0, 0).distance_to(Hex::new(2, -1)), 2);
        assert_eq!(Hex::new(0, 0).distance_to(Hex::new(-4, 4)), 4);
    }

    #[test]
    fn test_neighbors() {
        assert_eq!(Hex::new(0, 0).neighbors().len(), 6);
        // Corner cell
        assert_eq!(Hex::new(4, 0).neighbors().len(), 3);
        // Edge, not a corner
        assert_eq!(Hex::new(4, -1).neighbors().len(), 4);
        assert_eq!(Hex::new(0, -4).neighbor(Direction::N), None);
    }

    #[test]
    fn test_ray() {
        let ray: Vec<_> = Hex::new(0, 0).ray(Direction::N).collect();
        assert_eq!(
            ray,
            vec![Hex::new(0, -1), Hex::new(0, -2), Hex::new(0, -3), Hex::new(0, -4)]
        );
        assert_eq!(Hex::new(0, -4).ray(Direction::N).count(), 0);
        assert_eq!(Hex::new(-4, 0).ray(Direction::SE).count(), 8);
    }

    #[test]
    fn test_direction_to() {
        let origin = Hex::new(0, 0);
        assert_eq!(origin.direction_to(Hex::new(0, -2)), Some(Direction::N));
        assert_eq!(origin.direction_to(Hex::new(0, 2)), Some(Direction::S));
        assert_eq!(origin.direction_to(Hex::new(2, -2)), Some(Direction::NE));
        assert_eq!(origin.direction_to(Hex::new(-2, 2)), Some(Direction::SW));
        assert_eq!(origin.direction_to(Hex::new(1, 1)), None);
        assert_eq!(origin.direction_to(origin), None);
    }

    #[test]
    fn test_cells_between() {
        let origin = Hex::new(0, 0);
        assert_eq!(
            origin.cells_between(Hex::new(3, 0)),
            Some(vec![Hex::new(1, 0), Hex::new(2, 0)])
        );
        assert_eq!(origin.cells_between(Hex::new(0, 1)), Some(vec![]));
        assert_eq!(origin.cells_between(Hex::new(1, 1)), None);
    }

    #[test]
    fn test_knight_targets() {
        assert_eq!(Hex::new(0, 0).knight_targets().count(), 6);
        for target in Hex::new(0, 0).knight_targets() {
            assert_eq!(Hex::new(0, 0).distance_to(target), 2);
        }
        assert!(Hex::new(4, 0).knight_targets().count() < 6);
    }

    #[test]
    fn test_opposite_directions() {
        for dir in Direction::ALL {
            let (dq, dr) = dir.delta();
            let (oq, or) = dir.opposite().delta();
            assert_eq!((dq + oq, dr + or), (0, 0));
        }
    }
}
