use std::fmt::Display;

use super::{Expression, Position, Statement, TypeExpr};

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Declaration<T> {
    Const(ConstDecl<T>),
    Var(VarDecl),
    Proc(ProcDecl<T>),
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ConstDecl<T> {
    pub name: String,
    pub value: Expression<T>,
    pub position: Position,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct VarDecl {
    pub names: Vec<String>,
    pub type_expr: TypeExpr,
    pub position: Position,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Param {
    pub name: String,
    pub type_expr: TypeExpr,
    pub position: Position,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ProcDecl<T> {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: Option<TypeExpr>,
    pub declarations: Vec<Declaration<T>>,
    pub body: Vec<Statement<T>>,
    pub position: Position,
}

// Positions are not part of structural equality.
impl<T: PartialEq> PartialEq for ConstDecl<T> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.value == other.value
    }
}

impl PartialEq for VarDecl {
    fn eq(&self, other: &Self) -> bool {
        self.names == other.names && self.type_expr == other.type_expr
    }
}

impl PartialEq for Param {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.type_expr == other.type_expr
    }
}

impl<T: PartialEq> PartialEq for ProcDecl<T> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.params == other.params
            && self.return_type == other.return_type
            && self.declarations == other.declarations
            && self.body == other.body
    }
}

impl<T> Display for Declaration<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Declaration::Const(constant) => {
                writeln!(f, "CONST {} = {};", constant.name, constant.value)
            }
            Declaration::Var(var) => {
                writeln!(f, "VAR {}: {};", var.names.join(", "), var.type_expr)
            }
            Declaration::Proc(proc) => write!(f, "{proc}"),
        }
    }
}

impl<T> Display for ProcDecl<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let params = self
            .params
            .iter()
            .map(|param| format!("{}: {}", param.name, param.type_expr))
            .collect::<Vec<_>>()
            .join(", ");

        write!(f, "PROCEDURE {}({params})", self.name)?;
        if let Some(return_type) = &self.return_type {
            write!(f, ": {return_type}")?;
        }
        writeln!(f, ";")?;

        for declaration in &self.declarations {
            write!(f, "{declaration}")?;
        }
        writeln!(f, "BEGIN")?;
        for statement in &self.body {
            writeln!(f, "    {statement};")?;
        }
        writeln!(f, "END {};", self.name)
    }
}
