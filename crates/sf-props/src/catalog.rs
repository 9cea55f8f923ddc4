//! Component catalog for the solvent-extraction / leaching interface.

use crate::error::{PropsError, PropsResult};
use crate::package::AqueousPackage;
use crate::solutes::SoluteSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Solvent,
    Metal,
    Acid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentEntry {
    pub id: &'static str,
    pub kind: ComponentKind,
}

pub const WATER: &str = "H2O";

/// Metals carried across the SX/leaching interface.
pub const SX_METALS: [&str; 12] = [
    "Al", "Ca", "Fe", "Sc", "Y", "La", "Ce", "Pr", "Nd", "Sm", "Gd", "Dy",
];

/// Acid species tracked by leaching but not by solvent extraction.
pub const LEACH_ACIDS: [&str; 3] = ["H", "HSO4", "SO4"];

const CATALOG: [ComponentEntry; 18] = [
    ComponentEntry {
        id: "H2O",
        kind: ComponentKind::Solvent,
    },
    ComponentEntry {
        id: "Li",
        kind: ComponentKind::Metal,
    },
    ComponentEntry {
        id: "Co",
        kind: ComponentKind::Metal,
    },
    ComponentEntry {
        id: "Al",
        kind: ComponentKind::Metal,
    },
    ComponentEntry {
        id: "Ca",
        kind: ComponentKind::Metal,
    },
    ComponentEntry {
        id: "Fe",
        kind: ComponentKind::Metal,
    },
    ComponentEntry {
        id: "Sc",
        kind: ComponentKind::Metal,
    },
    ComponentEntry {
        id: "Y",
        kind: ComponentKind::Metal,
    },
    ComponentEntry {
        id: "La",
        kind: ComponentKind::Metal,
    },
    ComponentEntry {
        id: "Ce",
        kind: ComponentKind::Metal,
    },
    ComponentEntry {
        id: "Pr",
        kind: ComponentKind::Metal,
    },
    ComponentEntry {
        id: "Nd",
        kind: ComponentKind::Metal,
    },
    ComponentEntry {
        id: "Sm",
        kind: ComponentKind::Metal,
    },
    ComponentEntry {
        id: "Gd",
        kind: ComponentKind::Metal,
    },
    ComponentEntry {
        id: "Dy",
        kind: ComponentKind::Metal,
    },
    ComponentEntry {
        id: "H",
        kind: ComponentKind::Acid,
    },
    ComponentEntry {
        id: "HSO4",
        kind: ComponentKind::Acid,
    },
    ComponentEntry {
        id: "SO4",
        kind: ComponentKind::Acid,
    },
];

pub fn lookup(id: &str) -> Option<&'static ComponentEntry> {
    CATALOG.iter().find(|e| e.id == id)
}

/// Component set from catalog ids, each checked against its expected kind.
pub fn cataloged_set<'a>(
    ids: impl IntoIterator<Item = (&'a str, ComponentKind)>,
) -> PropsResult<SoluteSet> {
    let mut names = Vec::new();
    for (id, expected) in ids {
        match lookup(id) {
            Some(entry) if entry.kind == expected => names.push(entry.id),
            found => {
                return Err(PropsError::NotCataloged {
                    name: id.to_string(),
                    expected,
                    found: found.map(|e| e.kind),
                });
            }
        }
    }
    SoluteSet::new(names)
}

fn tagged(
    ids: &'static [&'static str],
    kind: ComponentKind,
) -> impl Iterator<Item = (&'static str, ComponentKind)> {
    ids.iter().map(move |&id| (id, kind))
}

/// Aqueous phase leaving solvent extraction: water plus the SX metals.
pub fn sx_aqueous_package() -> PropsResult<AqueousPackage> {
    let components = cataloged_set(
        std::iter::once((WATER, ComponentKind::Solvent))
            .chain(tagged(&SX_METALS, ComponentKind::Metal)),
    )?;
    Ok(AqueousPackage::new("sx-aqueous", components))
}

/// Leach liquor: water, the acid species and the SX metals.
pub fn leach_solution_package() -> PropsResult<AqueousPackage> {
    let components = cataloged_set(
        std::iter::once((WATER, ComponentKind::Solvent))
            .chain(tagged(&LEACH_ACIDS, ComponentKind::Acid))
            .chain(tagged(&SX_METALS, ComponentKind::Metal)),
    )?;
    Ok(AqueousPackage::new("leach-solution", components))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::PropertyPackage;

    #[test]
    fn every_listed_species_is_cataloged() {
        for id in SX_METALS {
            assert_eq!(lookup(id).map(|e| e.kind), Some(ComponentKind::Metal));
        }
        for id in LEACH_ACIDS {
            assert_eq!(lookup(id).map(|e| e.kind), Some(ComponentKind::Acid));
        }
        assert_eq!(lookup(WATER).map(|e| e.kind), Some(ComponentKind::Solvent));
    }

    #[test]
    fn uncataloged_or_misclassified_ids_rejected() {
        let err = cataloged_set([("Xx", ComponentKind::Metal)]).unwrap_err();
        assert_eq!(
            err,
            PropsError::NotCataloged {
                name: "Xx".into(),
                expected: ComponentKind::Metal,
                found: None,
            }
        );
        let err = cataloged_set([("SO4", ComponentKind::Metal)]).unwrap_err();
        assert!(matches!(
            err,
            PropsError::NotCataloged {
                found: Some(ComponentKind::Acid),
                ..
            }
        ));
        let set = cataloged_set([("Li", ComponentKind::Metal), ("H", ComponentKind::Acid)]).unwrap();
        assert_eq!(set.names(), ["Li", "H"]);
    }

    #[test]
    fn interface_packages() {
        let sx = sx_aqueous_package().unwrap();
        let leach = leach_solution_package().unwrap();
        assert_eq!(sx.components().len(), 13);
        assert_eq!(leach.components().len(), 16);
        assert!(!sx.components().contains("SO4"));
        assert_eq!(leach.components().names()[0], "H2O");
    }
}
