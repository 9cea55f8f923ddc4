//! Ordered component sets.

use std::fmt;
use std::sync::Arc;

use crate::error::{PropsError, PropsResult};

/// Ordered, de-duplicated set of component names.
///
/// Built once per model and shared by every state block; cloning shares the
/// same backing slice, so every stage sees the identical membership.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoluteSet {
    names: Arc<[String]>,
}

impl SoluteSet {
    /// Build a set, keeping the first occurrence of each name.
    ///
    /// Names are trimmed; blank names and empty sets are rejected.
    pub fn new<I, S>(names: I) -> PropsResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut unique: Vec<String> = Vec::new();
        for name in names {
            let name = name.as_ref().trim();
            if name.is_empty() {
                return Err(PropsError::InvalidComponent {
                    name: name.to_string(),
                });
            }
            if !unique.iter().any(|n| n == name) {
                unique.push(name.to_string());
            }
        }
        if unique.is_empty() {
            return Err(PropsError::EmptyComponents);
        }
        Ok(Self {
            names: unique.into(),
        })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Members of `self` that are also in `other`, in `self` order.
    pub fn intersection<'a>(&'a self, other: &'a SoluteSet) -> impl Iterator<Item = &'a str> {
        self.iter().filter(move |n| other.contains(n))
    }
}

impl fmt::Display for SoluteSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.names.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn keeps_first_occurrence_order() {
        let set = SoluteSet::new(["Li", "Co", "Li", " Co "]).unwrap();
        assert_eq!(set.names(), &["Li".to_string(), "Co".to_string()]);
        assert_eq!(set.position("Co"), Some(1));
        assert_eq!(set.to_string(), "{Li, Co}");
    }

    #[test]
    fn rejects_empty_and_blank() {
        assert_eq!(
            SoluteSet::new(Vec::<String>::new()),
            Err(PropsError::EmptyComponents)
        );
        assert!(matches!(
            SoluteSet::new(["Li", "  "]),
            Err(PropsError::InvalidComponent { .. })
        ));
    }

    #[test]
    fn clones_share_membership() {
        let a = SoluteSet::new(["Li", "Co"]).unwrap();
        let b = a.clone();
        assert!(Arc::ptr_eq(&a.names, &b.names));
    }

    proptest! {
        #[test]
        fn dedup_is_unique_and_preserves_first_seen(
            names in proptest::collection::vec("[A-Z][a-z]?", 1..20)
        ) {
            let set = SoluteSet::new(&names).unwrap();
            let mut expected: Vec<&str> = Vec::new();
            for n in &names {
                if !expected.contains(&n.as_str()) {
                    expected.push(n);
                }
            }
            let got: Vec<&str> = set.iter().collect();
            prop_assert_eq!(got, expected);
        }
    }
}
