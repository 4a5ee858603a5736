// Safety filter: which moves avoid an immediate collision

use rand::seq::IndexedRandom;
use rand::Rng;
use std::fmt;

use crate::error::GridError;
use crate::grid::GridSnapshot;
use crate::types::Direction;

/// Small set of directions, iterated in score-vector order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MoveSet {
    bits: u8,
}

impl MoveSet {
    pub fn empty() -> Self {
        MoveSet { bits: 0 }
    }

    pub fn insert(&mut self, dir: Direction) {
        self.bits |= 1 << dir.index();
    }

    pub fn contains(&self, dir: Direction) -> bool {
        self.bits & (1 << dir.index()) != 0
    }

    pub fn len(&self) -> usize {
        self.bits.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Direction> + '_ {
        Direction::all().into_iter().filter(move |d| self.contains(*d))
    }

    pub fn to_vec(&self) -> Vec<Direction> {
        self.iter().collect()
    }

    /// Uniformly random member, or None for the empty set
    pub fn choose<R: Rng>(&self, rng: &mut R) -> Option<Direction> {
        self.to_vec().choose(rng).copied()
    }
}

impl FromIterator<Direction> for MoveSet {
    fn from_iter<I: IntoIterator<Item = Direction>>(iter: I) -> Self {
        let mut set = MoveSet::empty();
        for dir in iter {
            set.insert(dir);
        }
        set
    }
}

impl fmt::Display for MoveSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(|d| d.as_str()).collect();
        write!(f, "[{}]", names.join(", "))
    }
}

/// Moves whose destination cell has zero occupancy on `grid`.
///
/// The grid must be padded so every neighbour of the head exists; a head on
/// the outer ring is reported as [`GridError::HeadOnBoundary`] rather than
/// treated as blocked.
pub fn safe_moves(grid: &GridSnapshot) -> Result<MoveSet, GridError> {
    let (row, col) = grid.head_position()?;
    let mut safe = MoveSet::empty();

    for dir in Direction::all() {
        let (dr, dc) = dir.grid_delta();
        let occupancy = row
            .checked_add_signed(dr)
            .zip(col.checked_add_signed(dc))
            .and_then(|(r, c)| grid.occupancy(r, c))
            .ok_or(GridError::HeadOnBoundary {
                row,
                col,
                direction: dir.as_str(),
            })?;

        if occupancy == 0.0 {
            safe.insert(dir);
        }
    }

    Ok(safe)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_move_set_iterates_in_fixed_order() {
        let set: MoveSet = [Direction::Right, Direction::Up, Direction::Left]
            .into_iter()
            .collect();
        assert_eq!(set.to_vec(), vec![Direction::Up, Direction::Left, Direction::Right]);
        assert_eq!(set.len(), 3);
        assert_eq!(set.to_string(), "[up, left, right]");
    }

    #[test]
    fn test_choose_stays_inside_set() {
        let set: MoveSet = [Direction::Down, Direction::Left].into_iter().collect();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let pick = set.choose(&mut rng).unwrap();
            assert!(set.contains(pick));
        }
        assert_eq!(MoveSet::empty().choose(&mut rng), None);
    }

    #[test]
    fn test_head_on_edge_is_contract_violation() {
        // 2x2 grid, head at (0, 0), nothing padded
        let mut data = vec![0.0; 2 * 2 * 2];
        data[0] = 1.0;
        let grid = GridSnapshot::new(2, 2, 2, data).unwrap();
        assert!(matches!(
            safe_moves(&grid),
            Err(GridError::HeadOnBoundary { row: 0, col: 0, .. })
        ));
    }
}
