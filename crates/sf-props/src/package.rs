//! Property packages: factories for state blocks.

use sf_core::BlockId;
use sf_model::Model;

use crate::error::PropsResult;
use crate::solutes::SoluteSet;
use crate::state::{Basis, StateBlock, UnitSet};

/// A property package decides which variables a stream state carries and
/// in which units.
///
/// Implementations must be thread-safe (Send + Sync) so a package can be
/// shared between flowsheets built on different threads.
pub trait PropertyPackage: Send + Sync {
    /// Package name (for logging and error messages).
    fn name(&self) -> &str;

    fn components(&self) -> &SoluteSet;

    fn basis(&self) -> Basis;

    fn units(&self) -> UnitSet;

    /// Create a state block named `name` under `parent`.
    fn build_state(
        &self,
        model: &mut Model,
        parent: BlockId,
        name: &str,
    ) -> PropsResult<StateBlock> {
        StateBlock::build(
            model,
            parent,
            name,
            self.name(),
            self.components(),
            self.basis(),
            self.units(),
        )
    }
}

/// Solvent flow plus solute mass flows, in m³/h and kg/h.
///
/// Used throughout the membrane cascade; concentrations are derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoluteFlowPackage {
    solutes: SoluteSet,
}

impl SoluteFlowPackage {
    pub fn new(solutes: SoluteSet) -> Self {
        Self { solutes }
    }
}

impl PropertyPackage for SoluteFlowPackage {
    fn name(&self) -> &str {
        "solute-flow"
    }

    fn components(&self) -> &SoluteSet {
        &self.solutes
    }

    fn basis(&self) -> Basis {
        Basis::MassFlow
    }

    fn units(&self) -> UnitSet {
        UnitSet::Process
    }
}

/// Dilute aqueous solution described by flow (L/h) and mass concentrations (mg/L).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AqueousPackage {
    name: String,
    components: SoluteSet,
}

impl AqueousPackage {
    pub fn new(name: impl Into<String>, components: SoluteSet) -> Self {
        Self {
            name: name.into(),
            components,
        }
    }
}

impl PropertyPackage for AqueousPackage {
    fn name(&self) -> &str {
        &self.name
    }

    fn components(&self) -> &SoluteSet {
        &self.components
    }

    fn basis(&self) -> Basis {
        Basis::Concentration
    }

    fn units(&self) -> UnitSet {
        UnitSet::Aqueous
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StateProvider;
    use sf_model::Scope;

    #[test]
    fn aqueous_state_has_no_derived_constraints() {
        let pkg = AqueousPackage::new("leach", SoluteSet::new(["H2O", "Nd"]).unwrap());
        let mut m = Model::new("fs");
        let root = m.root();
        let s = pkg.build_state(&mut m, root, "properties_out").unwrap();
        assert_eq!(s.package(), "leach");
        assert_eq!(s.state_vars().len(), 3);
        assert!(s.flow_mass_comp("Nd").is_none());
        assert!(m.active_constraints(Scope::Block(s.block())).is_empty());
    }

    #[test]
    fn packages_are_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SoluteFlowPackage>();
        assert_send_sync::<AqueousPackage>();
    }
}
