use super::Type;

/// Annotation attached to every expression node by the typechecker.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TypeInfo {
    pub ty: Type,
}
