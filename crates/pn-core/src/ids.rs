use core::fmt;
use core::num::NonZeroU32;

/// Index of a node (or selector) in its topology arena.
///
/// Stored as index+1 so `Option<NodeId>` (a node's `via`) costs nothing extra.
/// Ids are only meaningful for the topology that issued them.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id(NonZeroU32);

impl Id {
    /// Create an Id from a 0-based index by storing index+1.
    pub fn from_index(index: u32) -> Self {
        Self(NonZeroU32::MIN.saturating_add(index))
    }

    /// Recover the 0-based index.
    pub fn index(self) -> u32 {
        self.0.get() - 1
    }

    /// The 0-based index as a slice position.
    #[inline]
    pub fn slot(self) -> usize {
        self.index() as usize
    }

    /// Ids for the first `len` slots of an arena, in order.
    pub fn range(len: usize) -> impl Iterator<Item = Id> {
        (0..len as u32).map(Id::from_index)
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self.index())
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

/// Domain-specific ID aliases for clarity (no runtime cost).
pub type NodeId = Id;
pub type SelectorId = Id;
