//! Typechecker for the Oberon-0 subset.
//!
//! Walks the parsed AST with a stack of scope frames, enforces the scoping
//! and type rules, folds constants, and rewrites `Module<()>` into
//! `Module<TypeInfo>` with the resolved type attached to every expression.

mod error;
mod info;
mod scope;
mod types;

pub use self::error::TypeError;
pub use self::info::TypeInfo;
pub use self::scope::{setup_scope, Symbol, TypeScope};
pub use self::types::Type;

use crate::ast::{
    Assignment, BinaryExpr, BinaryOp, ConstDecl, Declaration, Designator, Expression, For,
    FuncCall, If, Literal, LiteralExpr, Module, Position, ProcCall, ProcDecl, Return, Statement,
    UnaryExpr, UnaryOp, While,
};

/// Result of type checking a node within the AST.
type TResult<T> = Result<T, TypeError>;

/// Struct for type checking a parsed module.
pub struct Typechecker {
    module: Module<()>,
}

impl Typechecker {
    pub fn from_module(module: Module<()>) -> Self {
        Self { module }
    }

    /// Type check the contained module and return it with type information
    /// attached to each expression.
    pub fn check(&self) -> Result<Module<TypeInfo>, TypeError> {
        let mut scope = setup_scope();

        let declarations = self.check_declarations(&self.module.declarations, &mut scope)?;

        let mut body = vec![];
        for statement in &self.module.body {
            body.push(self.check_statement(statement, &mut scope, None)?);
        }

        Ok(Module {
            name: self.module.name.clone(),
            declarations,
            body,
            position: self.module.position,
        })
    }

    fn check_declarations(
        &self,
        declarations: &[Declaration<()>],
        scope: &mut TypeScope,
    ) -> TResult<Vec<Declaration<TypeInfo>>> {
        let mut checked = vec![];

        for declaration in declarations {
            checked.push(match declaration {
                Declaration::Const(constant) => {
                    Declaration::Const(self.check_const(constant, scope)?)
                }
                Declaration::Var(var) => {
                    let ty = Type::from_type_expr(&var.type_expr);
                    for name in &var.names {
                        scope.declare(name, Symbol::Var { ty: ty.clone() }, var.position)?;
                    }
                    Declaration::Var(var.clone())
                }
                Declaration::Proc(proc) => Declaration::Proc(self.check_proc(proc, scope)?),
            });
        }

        Ok(checked)
    }

    fn check_const(
        &self,
        constant: &ConstDecl<()>,
        scope: &mut TypeScope,
    ) -> TResult<ConstDecl<TypeInfo>> {
        let value = self.check_expression(&constant.value, scope)?;
        let folded = fold_constant(&value)?;
        let ty = value.info().ty;

        scope.declare(
            &constant.name,
            Symbol::Const { value: folded, ty },
            constant.position,
        )?;

        Ok(ConstDecl {
            name: constant.name.clone(),
            value,
            position: constant.position,
        })
    }

    fn check_proc(&self, proc: &ProcDecl<()>, scope: &mut TypeScope) -> TResult<ProcDecl<TypeInfo>> {
        let params = proc
            .params
            .iter()
            .map(|param| Type::from_type_expr(&param.type_expr))
            .collect::<Vec<_>>();

        let return_type = proc
            .return_type
            .as_ref()
            .map(Type::from_type_expr);
        if let Some(return_type) = &return_type {
            if return_type.is_array() {
                return Err(TypeError {
                    message: format!("procedure '{}' cannot return an array", proc.name),
                    position: proc.position,
                });
            }
        }

        // Declared before the body is checked, so the procedure may recurse.
        scope.declare(
            &proc.name,
            Symbol::Proc {
                params: params.clone(),
                return_type: return_type.clone(),
            },
            proc.position,
        )?;

        scope.push();
        for param in &proc.params {
            scope.declare(
                &param.name,
                Symbol::Param {
                    ty: Type::from_type_expr(&param.type_expr),
                },
                param.position,
            )?;
        }

        let declarations = self.check_declarations(&proc.declarations, scope)?;

        let mut body = vec![];
        for statement in &proc.body {
            body.push(self.check_statement(statement, scope, return_type.as_ref())?);
        }
        scope.pop();

        if return_type.is_some() && !contains_return(&proc.body) {
            return Err(TypeError {
                message: format!("procedure '{}' is missing a RETURN statement", proc.name),
                position: proc.position,
            });
        }

        Ok(ProcDecl {
            name: proc.name.clone(),
            params: proc.params.clone(),
            return_type: proc.return_type.clone(),
            declarations,
            body,
            position: proc.position,
        })
    }

    fn check_statement(
        &self,
        statement: &Statement<()>,
        scope: &mut TypeScope,
        return_type: Option<&Type>,
    ) -> TResult<Statement<TypeInfo>> {
        Ok(match statement {
            Statement::Assignment(assignment) => {
                Statement::Assignment(self.check_assignment(assignment, scope)?)
            }
            Statement::Call(call) => Statement::Call(self.check_proc_call(call, scope)?),
            Statement::If(if_statement) => {
                Statement::If(self.check_if(if_statement, scope, return_type)?)
            }
            Statement::While(while_loop) => {
                Statement::While(self.check_while(while_loop, scope, return_type)?)
            }
            Statement::For(for_loop) => {
                Statement::For(self.check_for(for_loop, scope, return_type)?)
            }
            Statement::Return(return_statement) => {
                Statement::Return(self.check_return(return_statement, scope, return_type)?)
            }
        })
    }

    fn check_assignment(
        &self,
        assignment: &Assignment<()>,
        scope: &mut TypeScope,
    ) -> TResult<Assignment<TypeInfo>> {
        let name = &assignment.target.name;
        let (frame, symbol) = resolve(name, assignment.target.position, scope)?;

        let ty = match symbol {
            Symbol::Var { ty } | Symbol::Param { ty } => ty.clone(),
            Symbol::Const { .. } => {
                return Err(TypeError {
                    message: format!("cannot assign to constant '{name}'"),
                    position: assignment.target.position,
                });
            }
            Symbol::Proc { .. } => {
                return Err(TypeError {
                    message: format!("cannot assign to procedure '{name}'"),
                    position: assignment.target.position,
                });
            }
        };

        let target = self.check_var_designator(&assignment.target, ty, frame, scope)?;
        if target.info.ty.is_array() {
            return Err(TypeError {
                message: format!("cannot assign to whole array '{name}'"),
                position: assignment.target.position,
            });
        }

        let value = self.check_expression(&assignment.value, scope)?;
        let value_ty = value.info().ty;
        if !target.info.ty.accepts(&value_ty) {
            return Err(TypeError {
                message: format!(
                    "type mismatch: cannot assign '{value_ty}' to '{}'",
                    target.info.ty
                ),
                position: assignment.position,
            });
        }

        Ok(Assignment {
            target,
            value,
            position: assignment.position,
        })
    }

    fn check_proc_call(&self, call: &ProcCall<()>, scope: &mut TypeScope) -> TResult<ProcCall<TypeInfo>> {
        match call.callee.as_str() {
            "Write" => {
                if call.arguments.len() != 1 {
                    return Err(TypeError {
                        message: format!(
                            "'Write' expects exactly one argument, got {}",
                            call.arguments.len()
                        ),
                        position: call.position,
                    });
                }
                let argument = self.check_expression(&call.arguments[0], scope)?;
                let ty = argument.info().ty;
                if !matches!(ty, Type::Integer | Type::Real | Type::String) {
                    return Err(TypeError {
                        message: format!(
                            "'Write' expects an INTEGER, REAL or STRING argument, got '{ty}'"
                        ),
                        position: argument.position(),
                    });
                }

                Ok(ProcCall {
                    callee: call.callee.clone(),
                    arguments: vec![argument],
                    position: call.position,
                })
            }
            "WriteLn" => {
                if !call.arguments.is_empty() {
                    return Err(TypeError {
                        message: format!(
                            "'WriteLn' expects no arguments, got {}",
                            call.arguments.len()
                        ),
                        position: call.position,
                    });
                }

                Ok(ProcCall {
                    callee: call.callee.clone(),
                    arguments: vec![],
                    position: call.position,
                })
            }
            _ => {
                let arguments = self.check_call_arguments(
                    &call.callee,
                    &call.arguments,
                    call.position,
                    scope,
                )?;

                Ok(ProcCall {
                    callee: call.callee.clone(),
                    arguments,
                    position: call.position,
                })
            }
        }
    }

    /// Resolve a callee, verify arity and positional argument types, and
    /// return the checked arguments.
    fn check_call_arguments(
        &self,
        callee: &str,
        arguments: &[Expression<()>],
        position: Position,
        scope: &mut TypeScope,
    ) -> TResult<Vec<Expression<TypeInfo>>> {
        let (_, symbol) = resolve(callee, position, scope)?;
        let Symbol::Proc { params, .. } = symbol else {
            return Err(TypeError {
                message: format!("'{callee}' is not a procedure"),
                position,
            });
        };
        let params = params.clone();

        if params.len() != arguments.len() {
            return Err(TypeError {
                message: format!(
                    "procedure '{callee}' expects {} arguments, got {}",
                    params.len(),
                    arguments.len()
                ),
                position,
            });
        }

        let mut checked = vec![];
        for (param, argument) in params.iter().zip(arguments) {
            let argument = self.check_expression(argument, scope)?;
            let ty = argument.info().ty;
            if !param.accepts(&ty) {
                return Err(TypeError {
                    message: format!(
                        "argument type mismatch in call to '{callee}': expected '{param}', got '{ty}'"
                    ),
                    position: argument.position(),
                });
            }
            checked.push(argument);
        }

        Ok(checked)
    }

    fn check_if(
        &self,
        if_statement: &If<()>,
        scope: &mut TypeScope,
        return_type: Option<&Type>,
    ) -> TResult<If<TypeInfo>> {
        let condition = self.check_condition(&if_statement.condition, scope)?;

        let mut then_branch = vec![];
        for statement in &if_statement.then_branch {
            then_branch.push(self.check_statement(statement, scope, return_type)?);
        }

        let else_branch = match &if_statement.else_branch {
            Some(statements) => {
                let mut checked = vec![];
                for statement in statements {
                    checked.push(self.check_statement(statement, scope, return_type)?);
                }
                Some(checked)
            }
            None => None,
        };

        Ok(If {
            condition,
            then_branch,
            else_branch,
            position: if_statement.position,
        })
    }

    fn check_while(
        &self,
        while_loop: &While<()>,
        scope: &mut TypeScope,
        return_type: Option<&Type>,
    ) -> TResult<While<TypeInfo>> {
        let condition = self.check_condition(&while_loop.condition, scope)?;

        let mut body = vec![];
        for statement in &while_loop.body {
            body.push(self.check_statement(statement, scope, return_type)?);
        }

        Ok(While {
            condition,
            body,
            position: while_loop.position,
        })
    }

    fn check_for(
        &self,
        for_loop: &For<()>,
        scope: &mut TypeScope,
        return_type: Option<&Type>,
    ) -> TResult<For<TypeInfo>> {
        let (frame, symbol) = resolve(&for_loop.variable, for_loop.position, scope)?;
        match symbol {
            Symbol::Var { ty } | Symbol::Param { ty } if *ty == Type::Integer => {}
            Symbol::Var { ty } | Symbol::Param { ty } => {
                return Err(TypeError {
                    message: format!(
                        "FOR variable '{}' must be INTEGER, got '{ty}'",
                        for_loop.variable
                    ),
                    position: for_loop.position,
                });
            }
            _ => {
                return Err(TypeError {
                    message: format!("FOR variable '{}' must be a variable", for_loop.variable),
                    position: for_loop.position,
                });
            }
        }
        check_frame_access(&for_loop.variable, frame, for_loop.position, scope)?;

        let start = self.check_expression(&for_loop.start, scope)?;
        let end = self.check_expression(&for_loop.end, scope)?;
        for (bound, name) in [(&start, "start"), (&end, "end")] {
            let ty = bound.info().ty;
            if ty != Type::Integer {
                return Err(TypeError {
                    message: format!("FOR {name} bound must be INTEGER, got '{ty}'"),
                    position: bound.position(),
                });
            }
        }

        let mut body = vec![];
        for statement in &for_loop.body {
            body.push(self.check_statement(statement, scope, return_type)?);
        }

        Ok(For {
            variable: for_loop.variable.clone(),
            start,
            end,
            body,
            position: for_loop.position,
        })
    }

    fn check_return(
        &self,
        return_statement: &Return<()>,
        scope: &mut TypeScope,
        return_type: Option<&Type>,
    ) -> TResult<Return<TypeInfo>> {
        let value = match (&return_statement.value, return_type) {
            (None, None) => None,
            (None, Some(expected)) => {
                return Err(TypeError {
                    message: format!("missing RETURN value, expected '{expected}'"),
                    position: return_statement.position,
                });
            }
            (Some(_), None) => {
                return Err(TypeError {
                    message: "RETURN with a value requires a procedure return type".to_string(),
                    position: return_statement.position,
                });
            }
            (Some(value), Some(expected)) => {
                let value = self.check_expression(value, scope)?;
                let ty = value.info().ty;
                if !expected.accepts(&ty) {
                    return Err(TypeError {
                        message: format!("return type mismatch: expected '{expected}', got '{ty}'"),
                        position: value.position(),
                    });
                }
                Some(value)
            }
        };

        Ok(Return {
            value,
            position: return_statement.position,
        })
    }

    fn check_condition(
        &self,
        condition: &Expression<()>,
        scope: &mut TypeScope,
    ) -> TResult<Expression<TypeInfo>> {
        let condition = self.check_expression(condition, scope)?;
        let ty = condition.info().ty;
        if ty != Type::Bool {
            return Err(TypeError {
                message: format!("condition must be a boolean expression, got '{ty}'"),
                position: condition.position(),
            });
        }
        Ok(condition)
    }

    fn check_expression(
        &self,
        expression: &Expression<()>,
        scope: &mut TypeScope,
    ) -> TResult<Expression<TypeInfo>> {
        Ok(match expression {
            Expression::Literal(literal) => {
                let ty = match &literal.value {
                    Literal::Int(_) => Type::Integer,
                    Literal::Real(_) => Type::Real,
                    Literal::Str(_) => Type::String,
                };
                Expression::Literal(LiteralExpr {
                    value: literal.value.clone(),
                    position: literal.position,
                    info: TypeInfo { ty },
                })
            }
            Expression::Designator(designator) => {
                let (frame, symbol) = resolve(&designator.name, designator.position, scope)?;
                match symbol {
                    Symbol::Const { value, ty } => {
                        if !designator.indexes.is_empty() {
                            return Err(TypeError {
                                message: format!("cannot index constant '{}'", designator.name),
                                position: designator.position,
                            });
                        }
                        // Constant references fold to their literal value.
                        Expression::Literal(LiteralExpr {
                            value: value.clone(),
                            position: designator.position,
                            info: TypeInfo { ty: ty.clone() },
                        })
                    }
                    Symbol::Proc { .. } => {
                        return Err(TypeError {
                            message: format!(
                                "'{}' is a procedure, not a variable",
                                designator.name
                            ),
                            position: designator.position,
                        });
                    }
                    Symbol::Var { ty } | Symbol::Param { ty } => {
                        let ty = ty.clone();
                        Expression::Designator(
                            self.check_var_designator(designator, ty, frame, scope)?,
                        )
                    }
                }
            }
            Expression::Call(call) => {
                if matches!(call.callee.as_str(), "Write" | "WriteLn") {
                    return Err(TypeError {
                        message: format!("'{}' cannot be used in an expression", call.callee),
                        position: call.position,
                    });
                }

                let (_, symbol) = resolve(&call.callee, call.position, scope)?;
                let Symbol::Proc { return_type, .. } = symbol else {
                    return Err(TypeError {
                        message: format!("'{}' is not a procedure", call.callee),
                        position: call.position,
                    });
                };
                let Some(return_type) = return_type.clone() else {
                    return Err(TypeError {
                        message: format!(
                            "procedure '{}' does not return a value",
                            call.callee
                        ),
                        position: call.position,
                    });
                };

                let arguments = self.check_call_arguments(
                    &call.callee,
                    &call.arguments,
                    call.position,
                    scope,
                )?;

                Expression::Call(FuncCall {
                    callee: call.callee.clone(),
                    arguments,
                    position: call.position,
                    info: TypeInfo { ty: return_type },
                })
            }
            Expression::Unary(unary) => {
                let operand = self.check_expression(&unary.operand, scope)?;
                let ty = operand.info().ty;
                if !ty.is_numeric() {
                    return Err(TypeError {
                        message: format!("unary '{}' requires a numeric operand, got '{ty}'", unary.op),
                        position: unary.position,
                    });
                }

                Expression::Unary(UnaryExpr {
                    op: unary.op,
                    operand: Box::new(operand),
                    position: unary.position,
                    info: TypeInfo { ty },
                })
            }
            Expression::Binary(binary) => Expression::Binary(self.check_binary(binary, scope)?),
        })
    }

    fn check_binary(
        &self,
        binary: &BinaryExpr<()>,
        scope: &mut TypeScope,
    ) -> TResult<BinaryExpr<TypeInfo>> {
        let lhs = self.check_expression(&binary.lhs, scope)?;
        let rhs = self.check_expression(&binary.rhs, scope)?;
        let (lhs_ty, rhs_ty) = (lhs.info().ty, rhs.info().ty);

        let mismatch = |message: String| TypeError {
            message,
            position: binary.position,
        };

        let ty = match binary.op {
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul => {
                if !lhs_ty.is_numeric() || !rhs_ty.is_numeric() {
                    return Err(mismatch(format!(
                        "operator '{}' cannot combine '{lhs_ty}' and '{rhs_ty}'",
                        binary.op
                    )));
                }
                if lhs_ty == Type::Integer && rhs_ty == Type::Integer {
                    Type::Integer
                } else {
                    Type::Real
                }
            }
            BinaryOp::Quot => {
                if !lhs_ty.is_numeric() || !rhs_ty.is_numeric() {
                    return Err(mismatch(format!(
                        "operator '/' cannot combine '{lhs_ty}' and '{rhs_ty}'"
                    )));
                }
                Type::Real
            }
            BinaryOp::Div | BinaryOp::Mod => {
                if lhs_ty != Type::Integer || rhs_ty != Type::Integer {
                    return Err(mismatch(format!(
                        "'{}' requires INTEGER operands, got '{lhs_ty}' and '{rhs_ty}'",
                        binary.op
                    )));
                }
                Type::Integer
            }
            BinaryOp::And | BinaryOp::Or => {
                if lhs_ty != Type::Bool || rhs_ty != Type::Bool {
                    return Err(mismatch(format!(
                        "'{}' requires boolean operands, got '{lhs_ty}' and '{rhs_ty}'",
                        binary.op
                    )));
                }
                Type::Bool
            }
            BinaryOp::Eq | BinaryOp::Neq | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                let comparable = (lhs_ty.is_numeric() && rhs_ty.is_numeric())
                    || (lhs_ty == Type::String && rhs_ty == Type::String);
                if !comparable {
                    return Err(mismatch(format!(
                        "operator '{}' cannot compare '{lhs_ty}' and '{rhs_ty}'",
                        binary.op
                    )));
                }
                if lhs_ty == Type::String
                    && !matches!(binary.op, BinaryOp::Eq | BinaryOp::Neq)
                {
                    return Err(mismatch(
                        "ordering is not defined for STRING operands".to_string(),
                    ));
                }
                Type::Bool
            }
        };

        Ok(BinaryExpr {
            op: binary.op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            position: binary.position,
            info: TypeInfo { ty },
        })
    }

    /// Check a variable reference: enforce the frame-access rule, type each
    /// index, and strip one array dimension per index.
    fn check_var_designator(
        &self,
        designator: &Designator<()>,
        ty: Type,
        frame: usize,
        scope: &mut TypeScope,
    ) -> TResult<Designator<TypeInfo>> {
        check_frame_access(&designator.name, frame, designator.position, scope)?;

        let mut indexes = vec![];
        let mut ty = ty;
        for index in &designator.indexes {
            let index = self.check_expression(index, scope)?;
            let index_ty = index.info().ty;
            if index_ty != Type::Integer {
                return Err(TypeError {
                    message: format!("array index must be INTEGER, got '{index_ty}'"),
                    position: index.position(),
                });
            }

            ty = match ty {
                Type::Array { element, .. } => *element,
                other => {
                    return Err(TypeError {
                        message: format!(
                            "too many indexes for '{}': '{other}' is not an array",
                            designator.name
                        ),
                        position: index.position(),
                    });
                }
            };
            indexes.push(index);
        }

        Ok(Designator {
            name: designator.name.clone(),
            indexes,
            position: designator.position,
            info: TypeInfo { ty },
        })
    }
}

fn resolve<'a>(
    name: &str,
    position: Position,
    scope: &'a TypeScope,
) -> TResult<(usize, &'a Symbol)> {
    scope.find(name).ok_or_else(|| TypeError {
        message: format!("undeclared identifier '{name}'"),
        position,
    })
}

/// Variables must live in the module frame or the current procedure's own
/// frame; there is no static link to reach the locals of an enclosing
/// procedure.
fn check_frame_access(
    name: &str,
    frame: usize,
    position: Position,
    scope: &TypeScope,
) -> Result<(), TypeError> {
    if frame != 0 && frame != scope.depth() - 1 {
        return Err(TypeError {
            message: format!(
                "cannot reference '{name}' declared in an enclosing procedure"
            ),
            position,
        });
    }
    Ok(())
}

/// Evaluate a checked constant initializer down to a literal.
fn fold_constant(expression: &Expression<TypeInfo>) -> Result<Literal, TypeError> {
    match expression {
        Expression::Literal(literal) => Ok(literal.value.clone()),
        Expression::Unary(unary) => {
            let operand = fold_constant(&unary.operand)?;
            Ok(match (unary.op, operand) {
                (UnaryOp::Plus, operand) => operand,
                (UnaryOp::Minus, Literal::Int(value)) => Literal::Int(value.wrapping_neg()),
                (UnaryOp::Minus, Literal::Real(value)) => Literal::Real(-value),
                (UnaryOp::Minus, Literal::Str(_)) => {
                    return Err(TypeError {
                        message: "cannot negate a string constant".to_string(),
                        position: unary.position,
                    });
                }
            })
        }
        Expression::Binary(binary) => {
            let lhs = fold_constant(&binary.lhs)?;
            let rhs = fold_constant(&binary.rhs)?;
            fold_binary(binary.op, lhs, rhs, binary.position)
        }
        other => Err(TypeError {
            message: "constant initializer must be a constant expression".to_string(),
            position: other.position(),
        }),
    }
}

fn fold_binary(op: BinaryOp, lhs: Literal, rhs: Literal, position: Position) -> Result<Literal, TypeError> {
    let error = |message: &str| TypeError {
        message: message.to_string(),
        position,
    };

    match (lhs, rhs) {
        (Literal::Int(lhs), Literal::Int(rhs)) => Ok(match op {
            BinaryOp::Add => Literal::Int(lhs.wrapping_add(rhs)),
            BinaryOp::Sub => Literal::Int(lhs.wrapping_sub(rhs)),
            BinaryOp::Mul => Literal::Int(lhs.wrapping_mul(rhs)),
            BinaryOp::Quot => Literal::Real(f64::from(lhs) / f64::from(rhs)),
            BinaryOp::Div => {
                if rhs == 0 {
                    return Err(error("division by zero in constant expression"));
                }
                Literal::Int(lhs.wrapping_div(rhs))
            }
            BinaryOp::Mod => {
                if rhs == 0 {
                    return Err(error("division by zero in constant expression"));
                }
                Literal::Int(lhs.wrapping_rem(rhs))
            }
            _ => return Err(error("only arithmetic constant expressions are supported")),
        }),
        (lhs, rhs) => {
            let (Some(lhs), Some(rhs)) = (as_real(&lhs), as_real(&rhs)) else {
                return Err(error("only arithmetic constant expressions are supported"));
            };
            Ok(match op {
                BinaryOp::Add => Literal::Real(lhs + rhs),
                BinaryOp::Sub => Literal::Real(lhs - rhs),
                BinaryOp::Mul => Literal::Real(lhs * rhs),
                BinaryOp::Quot => Literal::Real(lhs / rhs),
                _ => return Err(error("only arithmetic constant expressions are supported")),
            })
        }
    }
}

fn as_real(literal: &Literal) -> Option<f64> {
    match literal {
        Literal::Int(value) => Some(f64::from(*value)),
        Literal::Real(value) => Some(*value),
        Literal::Str(_) => None,
    }
}

fn contains_return<T>(statements: &[Statement<T>]) -> bool {
    statements.iter().any(|statement| match statement {
        Statement::Return(_) => true,
        Statement::If(if_statement) => {
            contains_return(&if_statement.then_branch)
                || if_statement
                    .else_branch
                    .as_ref()
                    .map(|statements| contains_return(statements))
                    .unwrap_or(false)
        }
        Statement::While(while_loop) => contains_return(&while_loop.body),
        Statement::For(for_loop) => contains_return(&for_loop.body),
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lexer::Lexer, parser};

    fn check_source(source: &str) -> Result<Module<TypeInfo>, TypeError> {
        let tokens = Lexer::new(source).lex().expect("lexing failed");
        let module = parser::parse(tokens).expect("parsing failed");
        Typechecker::from_module(module).check()
    }

    fn check_error(source: &str) -> TypeError {
        check_source(source).expect_err("type checking should fail")
    }

    #[test]
    fn test_check_undeclared_identifier() {
        let error = check_error("MODULE E; BEGIN x := 1; END E.");
        assert!(error.message.contains("undeclared identifier 'x'"));
    }

    #[test]
    fn test_check_redeclaration() {
        let error = check_error("MODULE E; VAR a: INTEGER; VAR a: REAL; BEGIN END E.");
        assert!(error.message.contains("redeclaration of 'a'"));
    }

    #[test]
    fn test_check_mixed_arithmetic_promotes_to_real() {
        let module = check_source(
            "MODULE M; VAR a: INTEGER; r: REAL; BEGIN r := a + 1.5; END M.",
        )
        .expect("type checking failed");

        let [Statement::Assignment(assignment)] = &module.body[..] else {
            panic!("expected a single assignment");
        };
        assert_eq!(Type::Real, assignment.value.info().ty);
    }

    #[test]
    fn test_check_integer_cannot_hold_real() {
        let error = check_error("MODULE M; VAR a: INTEGER; BEGIN a := 1.5; END M.");
        assert!(error
            .message
            .contains("cannot assign 'REAL' to 'INTEGER'"));
    }

    #[test]
    fn test_check_div_requires_integers() {
        let error = check_error("MODULE M; VAR r: REAL; BEGIN r := 1.0 DIV 2.0; END M.");
        assert!(error.message.contains("'DIV' requires INTEGER operands"));
    }

    #[test]
    fn test_check_condition_must_be_boolean() {
        let error = check_error("MODULE M; VAR a: INTEGER; BEGIN IF a THEN a := 1; END; END M.");
        assert!(error.message.contains("condition must be a boolean"));
    }

    #[test]
    fn test_check_for_variable_must_be_integer() {
        let error =
            check_error("MODULE M; VAR r: REAL; BEGIN FOR r := 1 TO 3 DO WriteLn(); END; END M.");
        assert!(error.message.contains("FOR variable 'r' must be INTEGER"));
    }

    #[test]
    fn test_check_call_arity() {
        let error = check_error(
            "MODULE M; PROCEDURE p(a: INTEGER); BEGIN WriteLn(); END p; BEGIN p(1, 2); END M.",
        );
        assert!(error
            .message
            .contains("procedure 'p' expects 1 arguments, got 2"));
    }

    #[test]
    fn test_check_constant_reference_folds_to_literal() {
        let module = check_source(
            "MODULE M; CONST size = 4 * 2; VAR a: INTEGER; BEGIN a := size; END M.",
        )
        .expect("type checking failed");

        let [Statement::Assignment(assignment)] = &module.body[..] else {
            panic!("expected a single assignment");
        };
        assert_eq!(
            Expression::Literal(LiteralExpr {
                value: Literal::Int(8),
                position: (1, 58),
                info: TypeInfo { ty: Type::Integer },
            }),
            assignment.value
        );
    }

    #[test]
    fn test_check_constant_requires_constant_initializer() {
        let error =
            check_error("MODULE M; VAR a: INTEGER; CONST b = a + 1; BEGIN END M.");
        assert!(error
            .message
            .contains("constant initializer must be a constant expression"));
    }

    #[test]
    fn test_check_index_must_be_integer() {
        let error = check_error(
            "MODULE M; VAR a: ARRAY 4 OF INTEGER; BEGIN a[1.5] := 0; END M.",
        );
        assert!(error.message.contains("array index must be INTEGER"));
    }

    #[test]
    fn test_check_too_many_indexes() {
        let error = check_error(
            "MODULE M; VAR a: ARRAY 4 OF INTEGER; BEGIN a[1, 2] := 0; END M.",
        );
        assert!(error.message.contains("too many indexes for 'a'"));
    }

    #[test]
    fn test_check_missing_return() {
        let error = check_error(
            "MODULE M; PROCEDURE f(): INTEGER; BEGIN WriteLn(); END f; BEGIN END M.",
        );
        assert!(error
            .message
            .contains("procedure 'f' is missing a RETURN statement"));
    }

    #[test]
    fn test_check_return_type_mismatch() {
        let error = check_error(
            "MODULE M; PROCEDURE f(): INTEGER; BEGIN RETURN 1.5; END f; BEGIN END M.",
        );
        assert!(error
            .message
            .contains("return type mismatch: expected 'INTEGER', got 'REAL'"));
    }

    #[test]
    fn test_check_nested_procedure_cannot_reach_enclosing_locals() {
        let error = check_error(
            "MODULE M;
             PROCEDURE outer();
             VAR x: INTEGER;
             PROCEDURE inner();
             BEGIN x := 1;
             END inner;
             BEGIN inner();
             END outer;
             BEGIN outer(); END M.",
        );
        assert!(error
            .message
            .contains("cannot reference 'x' declared in an enclosing procedure"));
    }

    #[test]
    fn test_check_nested_procedure_can_reach_globals() {
        check_source(
            "MODULE M;
             VAR g: INTEGER;
             PROCEDURE outer();
             PROCEDURE inner();
             BEGIN g := 1;
             END inner;
             BEGIN inner();
             END outer;
             BEGIN outer(); END M.",
        )
        .expect("globals are visible from nested procedures");
    }

    #[test]
    fn test_check_string_ordering_rejected() {
        let error = check_error(
            "MODULE M; VAR a: INTEGER; BEGIN IF \"a\" < \"b\" THEN a := 1; END; END M.",
        );
        assert!(error.message.contains("ordering is not defined for STRING"));
    }

    #[test]
    fn test_check_recursion_is_allowed() {
        check_source(
            "MODULE F;
             PROCEDURE f(n: INTEGER): INTEGER;
             BEGIN
                 IF n <= 1 THEN RETURN 1; ELSE RETURN n * f(n - 1); END;
             END f;
             BEGIN Write(f(5)); END F.",
        )
        .expect("recursive procedures type check");
    }
}
