use std::fmt::Display;

use super::{Expression, Position};

/// A variable reference, optionally indexed (`a`, `a[i]`, `m[i, j]`).
/// `m[i][j]` parses to the same node as `m[i, j]`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Designator<T> {
    pub name: String,
    pub indexes: Vec<Expression<T>>,
    pub position: Position,
    pub info: T,
}

// Positions are not part of structural equality.
impl<T: PartialEq> PartialEq for Designator<T> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.indexes == other.indexes && self.info == other.info
    }
}

impl<T> Display for Designator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)?;
        if !self.indexes.is_empty() {
            let indexes = self
                .indexes
                .iter()
                .map(|index| index.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            write!(f, "[{indexes}]")?;
        }
        Ok(())
    }
}
