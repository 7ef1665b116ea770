use log::{debug, warn};
use ndarray::Array3;

use crate::{Error, Vector3D};
use crate::systems::{Boundary, System};

mod pairs;
pub use self::pairs::{NeighborPair, CellPairs, TargetPairs, Direction};

/// Maximal number of cells along one axis. With a large box and a small
/// interaction range this reduces the resolution of the lattice instead of
/// allocating a huge number of cells.
pub const MAX_CELLS_PER_DIMENSION: usize = 100;

/// A cell shift represents the displacement, in number of box lengths along
/// each axis, between a cell and the periodic image of one of its neighbors.
///
/// Along the axis where [`CellIndex::exact_shifts`] is `true`, the vector
/// between two particles closer than the interaction range can be
/// reconstructed as `position[second] - position[first] +
/// shift.cartesian(lengths)`, where both positions are wrapped inside the
/// box. Along the other axis, the lattice is too small for the cell shift to
/// select the nearest image, and the minimal image convention must be used
/// instead; [`CellIndex::separation`] does both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CellShift([i32; 3]);

impl std::ops::Index<usize> for CellShift {
    type Output = i32;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl CellShift {
    /// Is this shift zero along all axis?
    pub fn is_zero(&self) -> bool {
        self.0 == [0, 0, 0]
    }

    /// Compute the shift vector in cartesian coordinates, using the given box
    /// lengths.
    pub fn cartesian(&self, lengths: Vector3D) -> Vector3D {
        Vector3D::new(
            lengths[0] * self[0] as f64,
            lengths[1] * self[1] as f64,
            lengths[2] * self[2] as f64,
        )
    }
}

/// Location of a particle inside the `CellIndex`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Slot {
    /// linear index of the cell containing the particle
    cell: usize,
    /// position of the particle in the cell membership list
    position: usize,
}

/// The cell index sorts particles inside a rectangular lattice of cells. The
/// lattice is sized such that `cell_range` cells along each axis always cover
/// the interaction range, so candidate pairs only need to be searched for in
/// the same cell and in the `cell_range` neighboring cells in each direction.
///
/// Cells are identified either by their lattice coordinates or by the
/// corresponding linear index `(x * ny + y) * nz + z`.
#[derive(Debug, Clone)]
pub struct CellIndex {
    /// Interaction range used to size the cells
    range: f64,
    /// How many cells along each axis cover the interaction range
    cell_range: usize,
    /// Box the lattice was built for
    boundary: Boundary,
    /// Membership lists of the cells
    cells: Array3<Vec<usize>>,
    /// Where each particle currently lives, indexed by particle
    slots: Vec<Option<Slot>>,
    /// Offsets to neighboring cells along each axis
    offsets: [Vec<i32>; 3],
    /// Along which axis the cell shifts select the nearest periodic image
    exact_shifts: [bool; 3],
}

impl CellIndex {
    /// Create a new, empty `CellIndex` for the given box, interaction range
    /// and cell range.
    ///
    /// If the box is smaller than the interaction range along one axis, a
    /// warning is emitted and a single cell is used along this axis.
    pub fn new(boundary: Boundary, range: f64, cell_range: usize) -> Result<CellIndex, Error> {
        if !(range > 0.0 && range.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "expected a positive interaction range for the cell index, got {}",
                range
            )));
        }

        if cell_range == 0 {
            return Err(Error::InvalidParameter(
                "cell range for the cell index must be at least 1".into()
            ));
        }

        let shape = lattice_shape(&boundary, range, cell_range);
        debug!("creating cell index with {}x{}x{} cells", shape[0], shape[1], shape[2]);

        return Ok(CellIndex {
            range: range,
            cell_range: cell_range,
            boundary: boundary,
            cells: Array3::from_elem(shape, Vec::new()),
            slots: Vec::new(),
            offsets: neighbor_offsets(&boundary, shape, cell_range),
            exact_shifts: exact_shifts(&boundary, shape, range, cell_range),
        });
    }

    /// Get the interaction range used to build this index
    pub fn range(&self) -> f64 {
        self.range
    }

    /// Get the cell range used to build this index
    pub fn cell_range(&self) -> usize {
        self.cell_range
    }

    /// Get the box used to build this index
    pub fn boundary(&self) -> Boundary {
        self.boundary
    }

    /// Get along which axis the [`CellShift`] of the pairs produced by this
    /// index select the nearest periodic image for pairs within the
    /// interaction range. This is `false` along periodic axis where the
    /// lattice had to be raised to `2 * cell_range + 1` cells, or reduced to
    /// a single cell, since pairs within range can then be reached through
    /// the opposite side of the neighborhood.
    pub fn exact_shifts(&self) -> [bool; 3] {
        self.exact_shifts
    }

    /// Get the number of cells along each axis
    pub fn shape(&self) -> [usize; 3] {
        let shape = self.cells.shape();
        [shape[0], shape[1], shape[2]]
    }

    /// Get the total number of cells
    pub fn n_cells(&self) -> usize {
        self.cells.len()
    }

    /// Get the size of a single cell along each axis
    pub fn cell_size(&self) -> Vector3D {
        let shape = self.shape();
        let lengths = self.boundary.lengths();
        Vector3D::new(
            lengths[0] / shape[0] as f64,
            lengths[1] / shape[1] as f64,
            lengths[2] / shape[2] as f64,
        )
    }

    /// Get the linear index of the cell with the given lattice coordinates
    pub fn linear_index(&self, coordinates: [usize; 3]) -> usize {
        let shape = self.shape();
        debug_assert!(coordinates[0] < shape[0] && coordinates[1] < shape[1] && coordinates[2] < shape[2]);
        (coordinates[0] * shape[1] + coordinates[1]) * shape[2] + coordinates[2]
    }

    /// Get the lattice coordinates of the cell with the given linear index
    pub fn lattice_coordinates(&self, cell: usize) -> [usize; 3] {
        let shape = self.shape();
        debug_assert!(cell < self.n_cells());
        let z = cell % shape[2];
        let y = (cell / shape[2]) % shape[1];
        let x = cell / (shape[1] * shape[2]);
        [x, y, z]
    }

    /// Get the particles currently inside the cell with the given linear
    /// index. The order of the particles inside a cell is not meaningful.
    pub fn members(&self, cell: usize) -> &[usize] {
        &self.cells[self.lattice_coordinates(cell)]
    }

    /// Get the linear index of the cell containing `particle`, or `None` if
    /// this particle was never assigned to a cell.
    pub fn cell_of(&self, particle: usize) -> Option<usize> {
        self.slots.get(particle).copied().flatten().map(|slot| slot.cell)
    }

    /// Get the linear index of the cell which should contain a particle at
    /// the given `position`. The position is first wrapped inside the box
    /// along periodic axis; along non-periodic axis positions outside of the
    /// box go in the closest cell.
    pub fn cell_containing(&self, position: Vector3D) -> usize {
        let mut position = position;
        self.boundary.wrap_vector(&mut position);
        let fractional = self.boundary.fractional(position);

        let shape = self.shape();
        let mut coordinates = [0; 3];
        for xyz in 0..3 {
            let n_cells = shape[xyz] as i64;
            let index = f64::floor(fractional[xyz] * n_cells as f64) as i64;
            coordinates[xyz] = i64::clamp(index, 0, n_cells - 1) as usize;
        }

        return self.linear_index(coordinates);
    }

    /// Add `particle` to the cell containing `position`, and return the
    /// linear index of this cell. If the particle was already assigned to a
    /// cell, it is removed from it first.
    pub fn assign(&mut self, particle: usize, position: Vector3D) -> usize {
        if self.cell_of(particle).is_some() {
            self.remove(particle);
        }

        let cell = self.cell_containing(position);
        self.insert(particle, cell);
        return cell;
    }

    /// Move `particle` from `old_cell` to the cell containing `new_position`,
    /// returning the linear index of the new cell.
    ///
    /// This fails if `particle` is not currently a member of `old_cell`.
    pub fn reassign(&mut self, particle: usize, old_cell: usize, new_position: Vector3D) -> Result<usize, Error> {
        if self.cell_of(particle) != Some(old_cell) {
            return Err(Error::InvalidParameter(format!(
                "particle {} is not a member of cell {}", particle, old_cell
            )));
        }

        self.remove(particle);
        let cell = self.cell_containing(new_position);
        self.insert(particle, cell);
        return Ok(cell);
    }

    /// Make sure `particle` is in the cell containing `position`, moving it
    /// only if it left its current cell. Returns the linear index of the cell
    /// containing the particle.
    pub fn update(&mut self, particle: usize, position: Vector3D) -> usize {
        let cell = self.cell_containing(position);
        if self.cell_of(particle) != Some(cell) {
            if self.cell_of(particle).is_some() {
                self.remove(particle);
            }
            self.insert(particle, cell);
        }
        return cell;
    }

    /// Remove `particle` from the index. This does nothing if the particle
    /// was not assigned to any cell.
    pub fn remove(&mut self, particle: usize) {
        let slot = match self.slots.get_mut(particle).and_then(Option::take) {
            Some(slot) => slot,
            None => return,
        };

        let coordinates = self.lattice_coordinates(slot.cell);
        let members = &mut self.cells[coordinates];
        debug_assert_eq!(members[slot.position], particle);
        members.swap_remove(slot.position);

        // the last member of the cell now lives where the removed particle was
        if let Some(&moved) = members.get(slot.position) {
            self.slots[moved] = Some(slot);
        }
    }

    /// Remove all particles from the cells, and assign all the particles in
    /// the `system` to their cell.
    #[time_graph::instrument(name = "CellIndex::assign_all")]
    pub fn assign_all(&mut self, system: &dyn System) {
        for members in &mut self.cells {
            members.clear();
        }
        self.slots.clear();
        self.slots.resize(system.size(), None);

        for (particle, &position) in system.positions().iter().enumerate() {
            let cell = self.cell_containing(position);
            self.insert(particle, cell);
        }
    }

    /// Update the lattice to match the current box of the `system`.
    ///
    /// If the number of cells along each axis and the periodicity do not
    /// change, the membership lists are kept as-is. Otherwise all cells are
    /// re-created and every particle is assigned again. Returns `true` if the
    /// lattice was rebuilt.
    pub fn resize_if_needed(&mut self, system: &dyn System) -> bool {
        let boundary = system.boundary();
        let shape = lattice_shape(&boundary, self.range, self.cell_range);
        let unchanged = shape == self.shape() && boundary.periodic() == self.boundary.periodic();

        self.boundary = boundary;
        if unchanged {
            return false;
        }

        debug!(
            "rebuilding cell index with {}x{}x{} cells (was {:?})",
            shape[0], shape[1], shape[2], self.shape()
        );
        self.cells = Array3::from_elem(shape, Vec::new());
        self.offsets = neighbor_offsets(&boundary, shape, self.cell_range);
        self.exact_shifts = exact_shifts(&boundary, shape, self.range, self.cell_range);
        self.assign_all(system);
        return true;
    }

    /// Call `function` with the linear index and image shift of every cell
    /// in the neighborhood of `cell`, excluding `cell` itself. Each
    /// neighboring cell is visited exactly once.
    pub fn for_each_neighbor_cell(&self, cell: usize, mut function: impl FnMut(usize, CellShift)) {
        let shape = self.shape();
        let periodic = self.boundary.periodic();
        let coordinates = self.lattice_coordinates(cell);

        for &delta_x in &self.offsets[0] {
            for &delta_y in &self.offsets[1] {
                for &delta_z in &self.offsets[2] {
                    if delta_x == 0 && delta_y == 0 && delta_z == 0 {
                        continue;
                    }

                    let delta = [delta_x, delta_y, delta_z];
                    let mut neighbor = [0; 3];
                    let mut shift = [0; 3];
                    let mut inside = true;
                    for xyz in 0..3 {
                        let index = coordinates[xyz] as i32 + delta[xyz];
                        if periodic[xyz] {
                            let (quotient, remainder) = divmod(index, shape[xyz]);
                            shift[xyz] = quotient;
                            neighbor[xyz] = remainder;
                        } else if index < 0 || index >= shape[xyz] as i32 {
                            inside = false;
                            break;
                        } else {
                            neighbor[xyz] = index as usize;
                        }
                    }

                    if inside {
                        function(self.linear_index(neighbor), CellShift(shift));
                    }
                }
            }
        }
    }

    /// Iterate over all pairs of particles in the same or in neighboring
    /// cells, each unordered pair being produced exactly once.
    pub fn pairs(&self) -> CellPairs<'_> {
        CellPairs::new(self)
    }

    /// Iterate over the particles which are candidates for pairing with
    /// `particle` in the given `direction`. This fails if `particle` was not
    /// assigned to a cell.
    pub fn pairs_with(&self, particle: usize, direction: Direction) -> Result<TargetPairs<'_>, Error> {
        TargetPairs::new(self, particle, direction)
    }

    /// Get the vector going from `pair.first` to `pair.second`, using the
    /// cell shift of the pair where it selects the nearest image and the
    /// minimal image convention everywhere else along periodic axis.
    pub fn separation(&self, pair: &NeighborPair, positions: &[Vector3D]) -> Vector3D {
        let mut first = positions[pair.first];
        let mut second = positions[pair.second];
        self.boundary.wrap_vector(&mut first);
        self.boundary.wrap_vector(&mut second);

        let lengths = self.boundary.lengths();
        let mut vector = second - first + pair.shift.cartesian(lengths);
        for xyz in 0..3 {
            if !self.exact_shifts[xyz] {
                vector[xyz] -= f64::round(vector[xyz] / lengths[xyz]) * lengths[xyz];
            }
        }
        return vector;
    }

    /// Get the position of `particle` in the membership list of its cell
    fn position_in_cell(&self, particle: usize) -> Option<usize> {
        self.slots.get(particle).copied().flatten().map(|slot| slot.position)
    }

    fn insert(&mut self, particle: usize, cell: usize) {
        if particle >= self.slots.len() {
            self.slots.resize(particle + 1, None);
        }

        let coordinates = self.lattice_coordinates(cell);
        let members = &mut self.cells[coordinates];
        members.push(particle);
        self.slots[particle] = Some(Slot {
            cell: cell,
            position: members.len() - 1,
        });
    }
}

/// Get the number of cells along each axis for the given box, interaction
/// range and cell range.
fn lattice_shape(boundary: &Boundary, range: f64, cell_range: usize) -> [usize; 3] {
    let lengths = boundary.lengths();
    let periodic = boundary.periodic();

    let mut shape = [1; 3];
    for xyz in 0..3 {
        if lengths[xyz] < range {
            warn!(
                "box length along axis {} ({}) is smaller than the interaction range ({}), \
                using a single cell in this direction",
                xyz, lengths[xyz], range
            );
            continue;
        }

        let mut n_cells = f64::floor(cell_range as f64 * lengths[xyz] / range) as usize;
        if periodic[xyz] {
            // with fewer cells, the periodic neighborhood of a cell would
            // contain some cells more than once
            n_cells = usize::max(n_cells, 2 * cell_range + 1);
        }
        shape[xyz] = usize::clamp(n_cells, 1, MAX_CELLS_PER_DIMENSION);
    }

    return shape;
}

/// Get the offsets to neighboring cells along each axis. Along periodic axis
/// with too few cells to hold the full neighborhood, every cell is used once.
fn neighbor_offsets(boundary: &Boundary, shape: [usize; 3], cell_range: usize) -> [Vec<i32>; 3] {
    let periodic = boundary.periodic();
    let cell_range = cell_range as i32;

    let offsets = |xyz: usize| -> Vec<i32> {
        let n_cells = shape[xyz] as i32;
        if !periodic[xyz] || n_cells > 2 * cell_range {
            return (-cell_range..=cell_range).collect();
        }

        let start = -(n_cells - 1) / 2;
        return (start..start + n_cells).collect();
    };

    return [offsets(0), offsets(1), offsets(2)];
}

/// Get along which axis the cell shifts select the nearest periodic image:
/// non-periodic axis, and periodic axis where `cell_range` cells cover the
/// interaction range without the neighborhood wrapping onto itself.
fn exact_shifts(boundary: &Boundary, shape: [usize; 3], range: f64, cell_range: usize) -> [bool; 3] {
    let lengths = boundary.lengths();
    let periodic = boundary.periodic();

    let mut exact = [true; 3];
    for xyz in 0..3 {
        if periodic[xyz] {
            let cell_size = lengths[xyz] / shape[xyz] as f64;
            exact[xyz] = shape[xyz] > 2 * cell_range && cell_size * cell_range as f64 >= range;
        }
    }
    return exact;
}

/// Function to compute both quotient and remainder of the division of a by b.
/// This function follows Python convention, making sure the remainder have the
/// same sign as `b`.
fn divmod(a: i32, b: usize) -> (i32, usize) {
    debug_assert!(b < (i32::MAX as usize));
    let b = b as i32;
    let mut quotient = a / b;
    let mut remainder = a % b;
    if remainder < 0 {
        remainder += b;
        quotient -= 1;
    }
    return (quotient, remainder as usize);
}
