use crate::Error;

use super::{CellIndex, CellShift};

/// Candidate pair produced by the cell index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NeighborPair {
    /// first particle in the pair
    pub first: usize,
    /// second particle in the pair
    pub second: usize,
    /// periodic image offset from the cell of `first` to the cell of
    /// `second`. This only selects the nearest image along the axis given by
    /// [`CellIndex::exact_shifts`], use [`CellIndex::separation`] to get the
    /// vector between the particles.
    pub shift: CellShift,
}

/// Which neighbors of a particle should be visited by [`TargetPairs`].
///
/// The order is the one used by [`CellPairs`]: cells are ordered by their
/// linear index, and particles inside a cell by their position in the
/// membership list. `Up` and `Down` together visit the same particles as
/// `Both`, without duplicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Only visit particles coming after the target
    Up,
    /// Only visit particles coming before the target
    Down,
    /// Visit all neighbors of the target
    Both,
}

/// Iterator over all the pairs of particles which are in the same cell or in
/// neighboring cells of a [`CellIndex`].
///
/// This produces a so-called "half" neighbors list, where each unordered pair
/// is only included once: pairs inside a cell follow the membership order,
/// and pairs between two cells are only created from the cell with the lower
/// linear index.
///
/// Some pairs might be separated by more than the interaction range, so
/// additional filtering of the pairs might be required later.
pub struct CellPairs<'a> {
    index: &'a CellIndex,
    /// linear index of the current cell
    cell: usize,
    /// cells to pair the current cell with: the cell itself, followed by its
    /// forward neighbors
    targets: Vec<(usize, CellShift)>,
    /// index in `targets`
    target: usize,
    /// index of the first particle in the current cell
    first: usize,
    /// index of the second particle in the target cell
    second: usize,
}

impl<'a> CellPairs<'a> {
    pub(super) fn new(index: &'a CellIndex) -> CellPairs<'a> {
        let mut pairs = CellPairs {
            index: index,
            cell: 0,
            targets: Vec::new(),
            target: 0,
            first: 0,
            second: 1,
        };
        pairs.load_cell();
        return pairs;
    }

    /// Restart the iteration from the beginning
    pub fn reset(&mut self) {
        self.cell = 0;
        self.load_cell();
    }

    fn load_cell(&mut self) {
        self.targets.clear();
        self.target = 0;
        self.first = 0;
        self.second = 1;

        if self.cell >= self.index.n_cells() || self.index.members(self.cell).is_empty() {
            return;
        }

        let cell = self.cell;
        let targets = &mut self.targets;
        targets.push((cell, CellShift::default()));
        self.index.for_each_neighbor_cell(cell, |neighbor, shift| {
            if neighbor > cell {
                targets.push((neighbor, shift));
            }
        });
    }
}

impl<'a> Iterator for CellPairs<'a> {
    type Item = NeighborPair;

    fn next(&mut self) -> Option<NeighborPair> {
        loop {
            if self.cell >= self.index.n_cells() {
                return None;
            }

            if self.target < self.targets.len() {
                let current = self.index.members(self.cell);
                let (target, shift) = self.targets[self.target];
                let others = self.index.members(target);

                if self.first < current.len() {
                    if self.second < others.len() {
                        let pair = NeighborPair {
                            first: current[self.first],
                            second: others[self.second],
                            shift: shift,
                        };
                        self.second += 1;
                        return Some(pair);
                    }

                    self.first += 1;
                    // pairs inside the same cell are only created once
                    self.second = if self.target == 0 { self.first + 1 } else { 0 };
                    continue;
                }

                self.target += 1;
                self.first = 0;
                self.second = 0;
                continue;
            }

            self.cell += 1;
            self.load_cell();
        }
    }
}

/// Iterator over the candidate partners of a single target particle in a
/// [`CellIndex`]. Particles in the same cell as the target are produced
/// first, followed by particles in neighboring cells.
pub struct TargetPairs<'a> {
    index: &'a CellIndex,
    particle: usize,
    direction: Direction,
    /// position of the target in its own cell
    position: usize,
    /// cells to look for partners in, starting with the target own cell
    targets: Vec<(usize, CellShift)>,
    /// index in `targets`
    target: usize,
    /// index of the partner in the current target cell
    other: usize,
}

impl<'a> TargetPairs<'a> {
    pub(super) fn new(index: &'a CellIndex, particle: usize, direction: Direction) -> Result<TargetPairs<'a>, Error> {
        let (cell, position) = match (index.cell_of(particle), index.position_in_cell(particle)) {
            (Some(cell), Some(position)) => (cell, position),
            _ => {
                return Err(Error::InvalidParameter(format!(
                    "particle {} is not assigned to any cell", particle
                )));
            }
        };

        let mut targets = vec![(cell, CellShift::default())];
        index.for_each_neighbor_cell(cell, |neighbor, shift| {
            let keep = match direction {
                Direction::Up => neighbor > cell,
                Direction::Down => neighbor < cell,
                Direction::Both => true,
            };
            if keep {
                targets.push((neighbor, shift));
            }
        });

        let mut pairs = TargetPairs {
            index: index,
            particle: particle,
            direction: direction,
            position: position,
            targets: targets,
            target: 0,
            other: 0,
        };
        pairs.reset();
        return Ok(pairs);
    }

    /// Restart the iteration from the beginning
    pub fn reset(&mut self) {
        self.target = 0;
        self.other = match self.direction {
            Direction::Up => self.position + 1,
            Direction::Down | Direction::Both => 0,
        };
    }
}

impl<'a> Iterator for TargetPairs<'a> {
    type Item = NeighborPair;

    fn next(&mut self) -> Option<NeighborPair> {
        while self.target < self.targets.len() {
            let (cell, shift) = self.targets[self.target];
            let members = self.index.members(cell);

            let mut end = members.len();
            if self.target == 0 && self.direction == Direction::Down {
                end = self.position;
            }

            if self.target == 0 && self.direction == Direction::Both && self.other == self.position {
                self.other += 1;
                continue;
            }

            if self.other < end {
                let pair = NeighborPair {
                    first: self.particle,
                    second: members[self.other],
                    shift: shift,
                };
                self.other += 1;
                return Some(pair);
            }

            self.target += 1;
            self.other = 0;
        }

        return None;
    }
}
