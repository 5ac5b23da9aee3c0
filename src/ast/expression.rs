use std::fmt::{self, Display};

use super::{Designator, Literal, Position};

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Expression<T> {
    Literal(LiteralExpr<T>),
    Designator(Designator<T>),
    Call(FuncCall<T>),
    Unary(UnaryExpr<T>),
    Binary(BinaryExpr<T>),
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LiteralExpr<T> {
    pub value: Literal,
    pub position: Position,
    pub info: T,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FuncCall<T> {
    pub callee: String,
    pub arguments: Vec<Expression<T>>,
    pub position: Position,
    pub info: T,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct UnaryExpr<T> {
    pub op: UnaryOp,
    pub operand: Box<Expression<T>>,
    pub position: Position,
    pub info: T,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BinaryExpr<T> {
    pub op: BinaryOp,
    pub lhs: Box<Expression<T>>,
    pub rhs: Box<Expression<T>>,
    pub position: Position,
    pub info: T,
}

// Positions are not part of structural equality.
impl<T: PartialEq> PartialEq for LiteralExpr<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value && self.info == other.info
    }
}

impl<T: PartialEq> PartialEq for FuncCall<T> {
    fn eq(&self, other: &Self) -> bool {
        self.callee == other.callee && self.arguments == other.arguments && self.info == other.info
    }
}

impl<T: PartialEq> PartialEq for UnaryExpr<T> {
    fn eq(&self, other: &Self) -> bool {
        self.op == other.op && self.operand == other.operand && self.info == other.info
    }
}

impl<T: PartialEq> PartialEq for BinaryExpr<T> {
    fn eq(&self, other: &Self) -> bool {
        self.op == other.op
            && self.lhs == other.lhs
            && self.rhs == other.rhs
            && self.info == other.info
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum UnaryOp {
    Plus,
    Minus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Quot,
    Div,
    Mod,
    And,
    Or,
    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    pub fn is_relation(&self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Neq | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }
}

impl<T> Expression<T> {
    pub fn position(&self) -> Position {
        match self {
            Expression::Literal(literal) => literal.position,
            Expression::Designator(designator) => designator.position,
            Expression::Call(call) => call.position,
            Expression::Unary(unary) => unary.position,
            Expression::Binary(binary) => binary.position,
        }
    }
}

impl<T> Expression<T>
where
    T: Clone,
{
    pub fn info(&self) -> T {
        match self {
            Expression::Literal(literal) => literal.info.clone(),
            Expression::Designator(designator) => designator.info.clone(),
            Expression::Call(call) => call.info.clone(),
            Expression::Unary(unary) => unary.info.clone(),
            Expression::Binary(binary) => binary.info.clone(),
        }
    }
}

impl Display for UnaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnaryOp::Plus => f.write_str("+"),
            UnaryOp::Minus => f.write_str("-"),
        }
    }
}

impl Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let value = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Quot => "/",
            BinaryOp::Div => "DIV",
            BinaryOp::Mod => "MOD",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
            BinaryOp::Eq => "=",
            BinaryOp::Neq => "#",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
        };
        f.write_str(value)
    }
}

/// Parenthesize nested operator expressions so the printed text re-parses to
/// the identical tree regardless of precedence.
fn fmt_operand<T>(expression: &Expression<T>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match expression {
        Expression::Unary(_) | Expression::Binary(_) => write!(f, "({expression})"),
        _ => write!(f, "{expression}"),
    }
}

impl<T> Display for Expression<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal(literal) => write!(f, "{}", literal.value),
            Expression::Designator(designator) => write!(f, "{designator}"),
            Expression::Call(call) => write!(f, "{call}"),
            Expression::Unary(unary) => {
                write!(f, "{}", unary.op)?;
                fmt_operand(&unary.operand, f)
            }
            Expression::Binary(binary) => {
                fmt_operand(&binary.lhs, f)?;
                write!(f, " {} ", binary.op)?;
                fmt_operand(&binary.rhs, f)
            }
        }
    }
}

impl<T> Display for FuncCall<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arguments = self
            .arguments
            .iter()
            .map(|argument| argument.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{}({arguments})", self.callee)
    }
}
