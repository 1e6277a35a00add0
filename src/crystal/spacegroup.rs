use super::symop::SymmetryOperator;
use crate::error::XtalError;

/// Built-in operator tables, keyed by Hermann-Mauguin symbol.
const TABLE: &[(&str, &[&str])] = &[
    ("P 1", &["x,y,z"]),
    ("P -1", &["x,y,z", "-x,-y,-z"]),
    ("P 1 21 1", &["x,y,z", "-x,y+1/2,-z"]),
    (
        "C 1 2 1",
        &["x,y,z", "-x,y,-z", "x+1/2,y+1/2,z", "-x+1/2,y+1/2,-z"],
    ),
    (
        "P 21 21 21",
        &[
            "x,y,z",
            "-x+1/2,-y,z+1/2",
            "-x,y+1/2,-z+1/2",
            "x+1/2,-y+1/2,-z",
        ],
    ),
];

/// A named set of symmetry operators. The identity is always first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spacegroup {
    name: String,
    ops: Vec<SymmetryOperator>,
}

impl Spacegroup {
    /// Build from explicit xyz triplets. The identity is added if absent
    /// and moved to the front; duplicates are dropped.
    ///
    /// # Errors
    ///
    /// [`XtalError::SymopParse`] if any triplet is malformed.
    pub fn from_xyz(name: &str, triplets: &[&str]) -> Result<Self, XtalError> {
        let mut ops = vec![SymmetryOperator::IDENTITY];
        for t in triplets {
            let op = SymmetryOperator::parse(t)?;
            if !ops.contains(&op) {
                ops.push(op);
            }
        }
        Ok(Self {
            name: name.to_owned(),
            ops,
        })
    }

    /// Look up a built-in spacegroup. Spaces and case are ignored, so
    /// `"P212121"` and `"p 21 21 21"` both resolve.
    ///
    /// # Errors
    ///
    /// [`XtalError::Configuration`] for a symbol not in the table.
    pub fn from_name(symbol: &str) -> Result<Self, XtalError> {
        let key = squash(symbol);
        let (name, triplets) = TABLE
            .iter()
            .find(|(name, _)| squash(name) == key)
            .ok_or_else(|| {
                XtalError::Configuration(format!("unknown spacegroup '{symbol}'"))
            })?;
        Self::from_xyz(name, triplets)
    }

    /// The trivial spacegroup containing only the identity.
    #[must_use]
    pub fn p1() -> Self {
        Self {
            name: "P 1".to_owned(),
            ops: vec![SymmetryOperator::IDENTITY],
        }
    }

    /// Hermann-Mauguin symbol.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Operators, identity first.
    #[must_use]
    pub fn ops(&self) -> &[SymmetryOperator] {
        &self.ops
    }

    /// Number of operators.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Never true: every spacegroup holds at least the identity.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Symbols of the built-in table.
    pub fn builtin_names() -> impl Iterator<Item = &'static str> {
        TABLE.iter().map(|(name, _)| *name)
    }
}

fn squash(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_parse_with_identity_first() {
        for name in Spacegroup::builtin_names() {
            let sg = Spacegroup::from_name(name).unwrap();
            assert!(sg.ops()[0].is_identity(), "{name}");
            assert!(!sg.is_empty());
        }
        assert_eq!(Spacegroup::from_name("p212121").unwrap().len(), 4);
        assert_eq!(Spacegroup::from_name("C 1 2 1").unwrap().len(), 4);
    }

    #[test]
    fn from_xyz_moves_identity_to_front_and_dedups() {
        let sg = Spacegroup::from_xyz("P 2", &["-x,y,-z", "x,y,z", "-x,y,-z"])
            .unwrap();
        assert_eq!(sg.len(), 2);
        assert!(sg.ops()[0].is_identity());
        assert_eq!(sg.ops()[1].to_string(), "-x,y,-z");
    }

    #[test]
    fn unknown_symbol_is_configuration_error() {
        assert!(matches!(
            Spacegroup::from_name("I 41/a"),
            Err(XtalError::Configuration(_))
        ));
        assert_eq!(Spacegroup::p1().len(), 1);
    }
}
