use std::fmt::Display;

/// Type syntax as written in the source. The typechecker canonicalizes this
/// into right-nested [`crate::typechecker::Type`] descriptors.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TypeExpr {
    Integer,
    Real,
    String,
    Array {
        lengths: Vec<u32>,
        element: Box<TypeExpr>,
    },
}

impl Display for TypeExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeExpr::Integer => f.write_str("INTEGER"),
            TypeExpr::Real => f.write_str("REAL"),
            TypeExpr::String => f.write_str("STRING"),
            TypeExpr::Array { lengths, element } => {
                let lengths = lengths
                    .iter()
                    .map(|length| length.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "ARRAY {lengths} OF {element}")
            }
        }
    }
}
