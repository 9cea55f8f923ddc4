use core::fmt;
use core::num::NonZeroU32;

/// Arena handle for model, graph and flowsheet objects.
///
/// Ids are handed out in creation order, so `slot()` indexes the owning
/// `Vec` directly and comparing ids compares creation order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id(NonZeroU32);

impl Id {
    /// Id of the `index`-th object (0-based).
    pub fn from_index(index: u32) -> Self {
        Self(NonZeroU32::MIN.saturating_add(index))
    }

    pub fn from_slot(slot: usize) -> Self {
        debug_assert!(slot < u32::MAX as usize);
        Self::from_index(slot as u32)
    }

    pub fn index(self) -> u32 {
        self.0.get() - 1
    }

    pub fn slot(self) -> usize {
        self.index() as usize
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index())
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

pub type VarId = Id;
pub type ConId = Id;
pub type BlockId = Id;
pub type UnitId = Id;
pub type PortId = Id;
pub type StreamId = Id;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_survive_conversion() {
        for slot in [0_usize, 1, 17, 4096] {
            let id = Id::from_slot(slot);
            assert_eq!(id.slot(), slot);
            assert_eq!(id.index() as usize, slot);
        }
    }

    #[test]
    fn optional_ids_cost_nothing() {
        assert_eq!(
            core::mem::size_of::<VarId>(),
            core::mem::size_of::<Option<VarId>>()
        );
    }

    #[test]
    fn creation_order_is_id_order() {
        let first = UnitId::from_slot(3);
        let later = UnitId::from_slot(4);
        assert!(first < later);
        assert_eq!(format!("{first:?} {later}"), "#3 4");
    }
}
