//! Index tuples for indexed variables and constraints.

use std::fmt;

/// One component of an index tuple: an element number or a set member name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IndexPart {
    Int(usize),
    Name(String),
}

impl fmt::Display for IndexPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexPart::Int(i) => write!(f, "{i}"),
            IndexPart::Name(n) => f.write_str(n),
        }
    }
}

/// Index tuple, e.g. `[3,Li]` for tube element 3 and solute Li.
///
/// The empty index is displayed as nothing, so scalar constraints read
/// as their bare name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Index(Vec<IndexPart>);

impl Index {
    pub fn none() -> Self {
        Self(Vec::new())
    }

    pub fn parts(&self) -> &[IndexPart] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Append a part, returning the extended index.
    pub fn with(mut self, part: impl Into<Index>) -> Self {
        self.0.extend(part.into().0);
        self
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return Ok(());
        }
        f.write_str("[")?;
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{part}")?;
        }
        f.write_str("]")
    }
}

impl From<()> for Index {
    fn from(_: ()) -> Self {
        Index::none()
    }
}

impl From<usize> for Index {
    fn from(i: usize) -> Self {
        Self(vec![IndexPart::Int(i)])
    }
}

impl From<&str> for Index {
    fn from(name: &str) -> Self {
        Self(vec![IndexPart::Name(name.to_string())])
    }
}

impl From<&String> for Index {
    fn from(name: &String) -> Self {
        Index::from(name.as_str())
    }
}

impl From<(usize, &str)> for Index {
    fn from((i, name): (usize, &str)) -> Self {
        Self(vec![IndexPart::Int(i), IndexPart::Name(name.to_string())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_forms() {
        assert_eq!(Index::none().to_string(), "");
        assert_eq!(Index::from(3).to_string(), "[3]");
        assert_eq!(Index::from((2, "Li")).to_string(), "[2,Li]");
        assert_eq!(Index::from(1).with("Co").to_string(), "[1,Co]");
    }

    #[test]
    fn ordering_is_element_then_name() {
        let mut keys = vec![
            Index::from((2, "Co")),
            Index::from((1, "Li")),
            Index::from((1, "Co")),
        ];
        keys.sort();
        let shown: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        assert_eq!(shown, vec!["[1,Co]", "[1,Li]", "[2,Co]"]);
    }
}
