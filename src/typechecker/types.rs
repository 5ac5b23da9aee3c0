use std::fmt::Display;

use crate::ast::TypeExpr;

/// Canonical type descriptor. Arrays are always right-nested, so
/// `ARRAY 2, 3 OF INTEGER` and `ARRAY 2 OF ARRAY 3 OF INTEGER` resolve to the
/// same descriptor. `Bool` has no surface syntax; it arises from relations
/// and logical operators only.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Type {
    Integer,
    Real,
    String,
    Bool,
    Array { element: Box<Type>, len: usize },
}

impl Type {
    pub fn from_type_expr(type_expr: &TypeExpr) -> Type {
        match type_expr {
            TypeExpr::Integer => Type::Integer,
            TypeExpr::Real => Type::Real,
            TypeExpr::String => Type::String,
            TypeExpr::Array { lengths, element } => {
                let element = Type::from_type_expr(element);
                lengths.iter().rev().fold(element, |element, len| Type::Array {
                    element: Box::new(element),
                    len: *len as usize,
                })
            }
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Integer | Type::Real)
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Type::Array { .. })
    }

    /// Whether a value of `source` type may be assigned (or passed, or
    /// returned) where `self` is expected. Equal types match; an INTEGER
    /// promotes to REAL.
    pub fn accepts(&self, source: &Type) -> bool {
        self == source || (*self == Type::Real && *source == Type::Integer)
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Integer => f.write_str("INTEGER"),
            Type::Real => f.write_str("REAL"),
            Type::String => f.write_str("STRING"),
            Type::Bool => f.write_str("BOOLEAN"),
            Type::Array { element, len } => write!(f, "ARRAY {len} OF {element}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_shorthand_canonicalizes_to_nested() {
        let shorthand = TypeExpr::Array {
            lengths: vec![2, 3],
            element: Box::new(TypeExpr::Integer),
        };
        let nested = TypeExpr::Array {
            lengths: vec![2],
            element: Box::new(TypeExpr::Array {
                lengths: vec![3],
                element: Box::new(TypeExpr::Integer),
            }),
        };

        assert_eq!(
            Type::from_type_expr(&shorthand),
            Type::from_type_expr(&nested)
        );
        assert_eq!(
            Type::Array {
                element: Box::new(Type::Array {
                    element: Box::new(Type::Integer),
                    len: 3,
                }),
                len: 2,
            },
            Type::from_type_expr(&shorthand)
        );
    }

    #[test]
    fn test_accepts_promotes_integer_to_real() {
        assert!(Type::Real.accepts(&Type::Integer));
        assert!(!Type::Integer.accepts(&Type::Real));
        assert!(Type::String.accepts(&Type::String));
        assert!(!Type::String.accepts(&Type::Integer));
    }
}
