use std::fmt::Display;

use super::{Declaration, Position, Statement};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Module<T> {
    pub name: String,
    pub declarations: Vec<Declaration<T>>,
    pub body: Vec<Statement<T>>,
    pub position: Position,
}

// Structural equality ignores source positions, so a pretty-printed and
// re-parsed tree compares equal to the original.
impl<T: PartialEq> PartialEq for Module<T> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.declarations == other.declarations
            && self.body == other.body
    }
}

impl<T> Display for Module<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "MODULE {};", self.name)?;
        for declaration in &self.declarations {
            write!(f, "{declaration}")?;
        }
        writeln!(f, "BEGIN")?;
        for statement in &self.body {
            writeln!(f, "    {statement};")?;
        }
        write!(f, "END {}.", self.name)
    }
}
