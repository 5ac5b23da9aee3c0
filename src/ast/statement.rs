use std::fmt::{self, Display};

use super::{Designator, Expression, Position};

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Statement<T> {
    Assignment(Assignment<T>),
    Call(ProcCall<T>),
    If(If<T>),
    While(While<T>),
    For(For<T>),
    Return(Return<T>),
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Assignment<T> {
    pub target: Designator<T>,
    pub value: Expression<T>,
    pub position: Position,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ProcCall<T> {
    pub callee: String,
    pub arguments: Vec<Expression<T>>,
    pub position: Position,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct If<T> {
    pub condition: Expression<T>,
    pub then_branch: Vec<Statement<T>>,
    pub else_branch: Option<Vec<Statement<T>>>,
    pub position: Position,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct While<T> {
    pub condition: Expression<T>,
    pub body: Vec<Statement<T>>,
    pub position: Position,
}

/// `FOR variable := start TO end DO body END`; the upper bound is inclusive
/// and evaluated once.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct For<T> {
    pub variable: String,
    pub start: Expression<T>,
    pub end: Expression<T>,
    pub body: Vec<Statement<T>>,
    pub position: Position,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Return<T> {
    pub value: Option<Expression<T>>,
    pub position: Position,
}

// Positions are not part of structural equality.
impl<T: PartialEq> PartialEq for Assignment<T> {
    fn eq(&self, other: &Self) -> bool {
        self.target == other.target && self.value == other.value
    }
}

impl<T: PartialEq> PartialEq for ProcCall<T> {
    fn eq(&self, other: &Self) -> bool {
        self.callee == other.callee && self.arguments == other.arguments
    }
}

impl<T: PartialEq> PartialEq for If<T> {
    fn eq(&self, other: &Self) -> bool {
        self.condition == other.condition
            && self.then_branch == other.then_branch
            && self.else_branch == other.else_branch
    }
}

impl<T: PartialEq> PartialEq for While<T> {
    fn eq(&self, other: &Self) -> bool {
        self.condition == other.condition && self.body == other.body
    }
}

impl<T: PartialEq> PartialEq for For<T> {
    fn eq(&self, other: &Self) -> bool {
        self.variable == other.variable
            && self.start == other.start
            && self.end == other.end
            && self.body == other.body
    }
}

impl<T: PartialEq> PartialEq for Return<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

fn fmt_sequence<T>(statements: &[Statement<T>], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let sequence = statements
        .iter()
        .map(|statement| statement.to_string())
        .collect::<Vec<_>>()
        .join("; ");
    f.write_str(&sequence)
}

impl<T> Display for Statement<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Assignment(assignment) => {
                write!(f, "{} := {}", assignment.target, assignment.value)
            }
            Statement::Call(call) => {
                let arguments = call
                    .arguments
                    .iter()
                    .map(|argument| argument.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "{}({arguments})", call.callee)
            }
            Statement::If(if_statement) => {
                write!(f, "IF {} THEN ", if_statement.condition)?;
                fmt_sequence(&if_statement.then_branch, f)?;
                if let Some(else_branch) = &if_statement.else_branch {
                    f.write_str(" ELSE ")?;
                    fmt_sequence(else_branch, f)?;
                }
                f.write_str(" END")
            }
            Statement::While(while_loop) => {
                write!(f, "WHILE {} DO ", while_loop.condition)?;
                fmt_sequence(&while_loop.body, f)?;
                f.write_str(" END")
            }
            Statement::For(for_loop) => {
                write!(
                    f,
                    "FOR {} := {} TO {} DO ",
                    for_loop.variable, for_loop.start, for_loop.end
                )?;
                fmt_sequence(&for_loop.body, f)?;
                f.write_str(" END")
            }
            Statement::Return(return_statement) => match &return_statement.value {
                Some(value) => write!(f, "RETURN {value}"),
                None => f.write_str("RETURN"),
            },
        }
    }
}
