use crate::Vector3D;

mod hard_sphere;
pub use self::hard_sphere::{approach_time, separation_time};

mod paired;
pub use self::paired::{PairedHardSpheres, PairedHardSpheresParameters};

/// The unique pair of particles allowed to overlap.
///
/// The pair is identified by the sum and product of the two particle
/// identifiers, which together define the unordered pair without having to
/// look at the order of the particles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BondedPair {
    first: usize,
    second: usize,
    sum: u128,
    product: u128,
}

impl BondedPair {
    /// Create a bonded pair from two different particles
    pub fn new(first: usize, second: usize) -> BondedPair {
        assert_ne!(first, second, "a particle can not be bonded with itself");
        let (first, second) = (usize::min(first, second), usize::max(first, second));
        BondedPair {
            first: first,
            second: second,
            sum: first as u128 + second as u128,
            product: first as u128 * second as u128,
        }
    }

    /// Get the particle with the smallest identifier in this pair
    pub fn first(&self) -> usize {
        self.first
    }

    /// Get the particle with the largest identifier in this pair
    pub fn second(&self) -> usize {
        self.second
    }

    /// Get the combination key `(sum, product)` of this pair
    pub fn key(&self) -> (u128, u128) {
        (self.sum, self.product)
    }

    /// Check if the unordered pair `a, b` is this pair
    #[inline]
    pub fn matches(&self, a: usize, b: usize) -> bool {
        a as u128 + b as u128 == self.sum && a as u128 * b as u128 == self.product
    }

    /// Check if `particle` is part of this pair
    pub fn contains(&self, particle: usize) -> bool {
        particle == self.first || particle == self.second
    }

    /// Get the other particle in this pair, if `particle` is part of it
    pub fn partner(&self, particle: usize) -> Option<usize> {
        if particle == self.first {
            Some(self.second)
        } else if particle == self.second {
            Some(self.first)
        } else {
            None
        }
    }
}

/// How a candidate pair of particles interacts, given the current bond state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairState {
    /// This pair is the bonded pair, and is currently overlapping
    Bonded,
    /// No pair is bonded, this pair can be captured when colliding
    Candidate,
    /// Another pair is bonded, this pair behaves as plain hard spheres
    Blocked,
}

/// Slot holding the (at most one) bonded pair of the simulation. It is owned
/// by the simulation driver and passed to the interaction when predicting and
/// resolving collisions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BondState(Option<BondedPair>);

impl BondState {
    /// Create an empty bond state, where no pair is bonded
    pub fn new() -> BondState {
        BondState(None)
    }

    /// Get the currently bonded pair, if any
    pub fn pair(&self) -> Option<BondedPair> {
        self.0
    }

    /// Is there a currently bonded pair?
    pub fn is_bonded(&self) -> bool {
        self.0.is_some()
    }

    /// Classify the pair `a, b` according to the current bond state
    #[inline]
    pub fn classify(&self, a: usize, b: usize) -> PairState {
        match self.0 {
            Some(pair) if pair.matches(a, b) => PairState::Bonded,
            Some(_) => PairState::Blocked,
            None => PairState::Candidate,
        }
    }

    /// Mark `a, b` as the bonded pair, replacing any previous pair. The two
    /// particles must currently overlap.
    pub fn set(&mut self, a: usize, b: usize) {
        self.0 = Some(BondedPair::new(a, b));
    }

    /// Remove the bonded pair
    pub fn clear(&mut self) {
        self.0 = None;
    }
}

/// Result of resolving a single collision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollisionOutcome {
    /// The bonded pair bounced back inside the core
    InternalBounce,
    /// The bonded pair separated and is no longer bonded
    Escape,
    /// Two particles bounced as regular hard spheres
    ExternalBounce,
    /// Two particles started to overlap and became the bonded pair
    Capture,
}

impl CollisionOutcome {
    /// Does this outcome involve the bonded pair from inside the core?
    pub fn is_internal(&self) -> bool {
        matches!(self, CollisionOutcome::InternalBounce | CollisionOutcome::Escape)
    }
}

/// All the data about a resolved collision, sent to the collision listeners
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionEvent {
    /// first particle in the collision
    pub first: usize,
    /// second particle in the collision
    pub second: usize,
    /// what happened during this collision
    pub outcome: CollisionOutcome,
    /// collision virial `r_ij · Δp_i`, which is zero for captures and escapes
    pub virial: f64,
    /// momentum given to the first particle, the second particle received
    /// the opposite
    pub impulse: Vector3D,
    /// simulation time at which the collision happened
    pub time: f64,
    /// time between the stored positions and the collision. The position of
    /// particle `i` at the collision is `position[i] + false_time * velocity[i]`
    pub false_time: f64,
    /// bond state after this collision was resolved
    pub bond: BondState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bonded_pair() {
        let pair = BondedPair::new(7, 3);
        assert_eq!(pair.first(), 3);
        assert_eq!(pair.second(), 7);
        assert_eq!(pair.key(), (10, 21));

        assert!(pair.matches(3, 7));
        assert!(pair.matches(7, 3));
        assert!(!pair.matches(1, 9));
        assert!(!pair.matches(3, 6));
        // same sum, different product
        assert!(!pair.matches(5, 5));

        assert!(pair.contains(3));
        assert!(!pair.contains(4));
        assert_eq!(pair.partner(7), Some(3));
        assert_eq!(pair.partner(3), Some(7));
        assert_eq!(pair.partner(0), None);

        // identifier zero still gives a unique key
        let pair = BondedPair::new(0, 4);
        assert!(pair.matches(4, 0));
        assert!(!pair.matches(0, 3));
        assert!(!pair.matches(1, 3));
    }

    #[test]
    #[should_panic(expected = "a particle can not be bonded with itself")]
    fn self_bond() {
        let _ = BondedPair::new(2, 2);
    }

    #[test]
    fn bond_state() {
        let mut state = BondState::new();
        assert!(!state.is_bonded());
        assert_eq!(state.classify(0, 1), PairState::Candidate);

        state.set(1, 0);
        assert!(state.is_bonded());
        assert_eq!(state.pair(), Some(BondedPair::new(0, 1)));
        assert_eq!(state.classify(0, 1), PairState::Bonded);
        assert_eq!(state.classify(0, 2), PairState::Blocked);

        state.clear();
        assert_eq!(state.pair(), None);
        assert_eq!(state.classify(0, 1), PairState::Candidate);
    }

    #[test]
    fn internal_outcomes() {
        assert!(CollisionOutcome::InternalBounce.is_internal());
        assert!(CollisionOutcome::Escape.is_internal());
        assert!(!CollisionOutcome::ExternalBounce.is_internal());
        assert!(!CollisionOutcome::Capture.is_internal());
    }
}
