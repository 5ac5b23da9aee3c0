use std::collections::HashMap;

use crate::{
    ast::{
        Assignment, BinaryOp, Declaration, Designator, Expression, For, FuncCall, If, Literal,
        ProcCall, ProcDecl, Return, Statement, UnaryOp, While,
    },
    ir::{FloatCond, Instruction, IntCond, IrType, Value},
    typechecker::{Type, TypeInfo},
};

use super::{lower_param_type, lower_type, EmitError, EmitResult, ProcSig, StringPool};

/// Storage assigned to one variable: the pointer it lives behind and the
/// pointee type. `indirect` marks array parameters, whose alloca holds the
/// incoming pointer rather than the aggregate itself.
#[derive(Debug, Clone)]
pub(super) struct Slot {
    pub ptr: Value,
    pub ty: IrType,
    pub indirect: bool,
}

/// Per-function emission state: variable slots, the `%tN` temp counter, the
/// label counter, and the growing instruction vector. Module-level state
/// (string pool, globals, signatures) is borrowed from the [`super::Compiler`].
pub(super) struct Scope<'a> {
    pool: &'a mut StringPool,
    globals: &'a HashMap<String, IrType>,
    sigs: &'a HashMap<String, ProcSig>,
    variables: HashMap<String, Slot>,
    pub instructions: Vec<Instruction>,
    temp_count: usize,
    label_count: usize,
    ret: IrType,
    main: bool,
    block_open: bool,
}

impl<'a> Scope<'a> {
    pub fn new(
        pool: &'a mut StringPool,
        globals: &'a HashMap<String, IrType>,
        sigs: &'a HashMap<String, ProcSig>,
        ret: IrType,
        main: bool,
    ) -> Self {
        Self {
            pool,
            globals,
            sigs,
            variables: HashMap::new(),
            instructions: vec![],
            temp_count: 0,
            label_count: 0,
            ret,
            main,
            block_open: false,
        }
    }

    fn temp(&mut self) -> Value {
        self.temp_count += 1;
        Value::Temp(format!("t{}", self.temp_count))
    }

    fn next_label(&mut self) -> usize {
        let id = self.label_count;
        self.label_count += 1;
        id
    }

    fn emit(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    /// Open a new basic block; an open predecessor falls through via an
    /// explicit `br`, keeping every block singly terminated.
    fn emit_label(&mut self, label: String) {
        if self.block_open {
            self.instructions.push(Instruction::Br(label.clone()));
        }
        self.instructions.push(Instruction::Label(label));
        self.block_open = true;
    }

    fn emit_br(&mut self, label: String) {
        self.instructions.push(Instruction::Br(label));
        self.block_open = false;
    }

    fn emit_br_cond(&mut self, cond: Value, then_label: String, else_label: String) {
        self.instructions.push(Instruction::BrCond {
            cond,
            then_label,
            else_label,
        });
        self.block_open = false;
    }

    fn emit_ret(&mut self, ty: IrType, value: Option<Value>) {
        self.instructions.push(Instruction::Ret { ty, value });
        self.block_open = false;
    }

    fn str_ptr(&mut self, value: &str) -> (IrType, Value) {
        let (index, len) = self.pool.intern(value);
        (IrType::I8.ptr(), Value::StrPtr { index, len })
    }

    fn internal(&self, message: impl ToString) -> EmitError {
        EmitError {
            message: message.to_string(),
        }
    }

    /// Emit a whole procedure body: `entry` block, allocas for parameters and
    /// locals, parameter stores, statements, and a final terminator.
    pub fn compile_proc(&mut self, proc: &ProcDecl<TypeInfo>) -> EmitResult<()> {
        self.emit_label("entry".to_string());

        for param in &proc.params {
            let ty = Type::from_type_expr(&param.type_expr);
            let slot_ty = lower_param_type(&ty);
            self.emit(Instruction::Alloca {
                dest: Value::Temp(param.name.clone()),
                ty: slot_ty.clone(),
            });
            self.variables.insert(
                param.name.clone(),
                Slot {
                    ptr: Value::Temp(param.name.clone()),
                    ty: slot_ty,
                    indirect: ty.is_array(),
                },
            );
        }

        for declaration in &proc.declarations {
            if let Declaration::Var(var) = declaration {
                let ty = lower_type(&Type::from_type_expr(&var.type_expr));
                for name in &var.names {
                    self.emit(Instruction::Alloca {
                        dest: Value::Temp(name.clone()),
                        ty: ty.clone(),
                    });
                    self.variables.insert(
                        name.clone(),
                        Slot {
                            ptr: Value::Temp(name.clone()),
                            ty: ty.clone(),
                            indirect: false,
                        },
                    );
                }
            }
        }

        for param in &proc.params {
            let Some(slot) = self.variables.get(&param.name).cloned() else {
                return Err(self.internal(format!("no slot for parameter '{}'", param.name)));
            };
            self.emit(Instruction::Store {
                ty: slot.ty,
                value: Value::Temp(format!("{}.arg", param.name)),
                ptr: slot.ptr,
            });
        }

        self.compile_statements(&proc.body)?;
        self.finish();
        Ok(())
    }

    /// Emit the module body as the body of `@main`.
    pub fn compile_main(&mut self, body: &[Statement<TypeInfo>]) -> EmitResult<()> {
        self.emit_label("entry".to_string());
        self.compile_statements(body)?;
        self.finish();
        Ok(())
    }

    /// Terminate the last block if control can still fall through.
    fn finish(&mut self) {
        if !self.block_open {
            return;
        }
        if self.main {
            self.emit_ret(IrType::I32, Some(Value::Int(0)));
            return;
        }
        match self.ret.clone() {
            IrType::Void => self.emit_ret(IrType::Void, None),
            IrType::I32 => self.emit_ret(IrType::I32, Some(Value::Int(0))),
            IrType::Double => self.emit_ret(IrType::Double, Some(Value::Real(0.0))),
            other => self.emit_ret(other, Some(Value::Null)),
        }
    }

    fn compile_statements(&mut self, statements: &[Statement<TypeInfo>]) -> EmitResult<()> {
        for statement in statements {
            // everything after a terminator in this sequence is unreachable
            if !self.block_open {
                break;
            }
            self.compile_statement(statement)?;
        }
        Ok(())
    }

    fn compile_statement(&mut self, statement: &Statement<TypeInfo>) -> EmitResult<()> {
        match statement {
            Statement::Assignment(assignment) => self.compile_assignment(assignment),
            Statement::Call(call) => self.compile_proc_call(call),
            Statement::If(if_statement) => self.compile_if(if_statement),
            Statement::While(while_loop) => self.compile_while(while_loop),
            Statement::For(for_loop) => self.compile_for(for_loop),
            Statement::Return(return_statement) => self.compile_return(return_statement),
        }
    }

    fn compile_assignment(&mut self, assignment: &Assignment<TypeInfo>) -> EmitResult<()> {
        let value = self.compile_expression(&assignment.value)?;
        let (target_ty, ptr) = self.designator_address(&assignment.target)?;
        let (_, value) = self.coerce(value, &target_ty);

        self.emit(Instruction::Store {
            ty: target_ty,
            value,
            ptr,
        });
        Ok(())
    }

    fn compile_proc_call(&mut self, call: &ProcCall<TypeInfo>) -> EmitResult<()> {
        match call.callee.as_str() {
            "Write" => match call.arguments.first() {
                Some(argument) => self.compile_write(argument),
                None => Err(self.internal("'Write' call without an argument")),
            },
            "WriteLn" => {
                let fmt = self.str_ptr("\n");
                let dest = self.temp();
                self.emit(Instruction::CallPrintf {
                    dest,
                    args: vec![fmt],
                });
                Ok(())
            }
            _ => self.compile_call(&call.callee, &call.arguments).map(|_| ()),
        }
    }

    /// `Write(expr)` dispatches on the argument's static type: `%d` for
    /// INTEGER, `%f` for REAL, `%s` for STRING.
    fn compile_write(&mut self, argument: &Expression<TypeInfo>) -> EmitResult<()> {
        let (ty, value) = self.compile_expression(argument)?;

        let fmt = match &ty {
            IrType::I32 => "%d",
            IrType::Double => "%f",
            IrType::Ptr(inner) if **inner == IrType::I8 => "%s",
            other => {
                return Err(self.internal(format!("Write argument of unexpected type '{other}'")));
            }
        };
        let fmt = self.str_ptr(fmt);

        let dest = self.temp();
        self.emit(Instruction::CallPrintf {
            dest,
            args: vec![fmt, (ty, value)],
        });
        Ok(())
    }

    fn compile_if(&mut self, if_statement: &If<TypeInfo>) -> EmitResult<()> {
        let id = self.next_label();
        let then_label = format!("then{id}");
        let else_label = format!("else{id}");
        let endif_label = format!("endif{id}");

        let (_, cond) = self.compile_expression(&if_statement.condition)?;
        let false_target = if if_statement.else_branch.is_some() {
            else_label.clone()
        } else {
            endif_label.clone()
        };
        self.emit_br_cond(cond, then_label.clone(), false_target);

        self.emit_label(then_label);
        self.compile_statements(&if_statement.then_branch)?;
        if self.block_open {
            self.emit_br(endif_label.clone());
        }

        if let Some(else_branch) = &if_statement.else_branch {
            self.emit_label(else_label);
            self.compile_statements(else_branch)?;
            if self.block_open {
                self.emit_br(endif_label.clone());
            }
        }

        self.emit_label(endif_label);
        Ok(())
    }

    fn compile_while(&mut self, while_loop: &While<TypeInfo>) -> EmitResult<()> {
        let id = self.next_label();
        let cond_label = format!("cond{id}");
        let body_label = format!("body{id}");
        let endw_label = format!("endw{id}");

        self.emit_br(cond_label.clone());
        self.emit_label(cond_label.clone());
        let (_, cond) = self.compile_expression(&while_loop.condition)?;
        self.emit_br_cond(cond, body_label.clone(), endw_label.clone());

        self.emit_label(body_label);
        self.compile_statements(&while_loop.body)?;
        if self.block_open {
            self.emit_br(cond_label);
        }

        self.emit_label(endw_label);
        Ok(())
    }

    /// `FOR v := a TO b DO S END`: store `a` into `v`, evaluate `b` once,
    /// then loop while `v <= b` (signed), incrementing `v` after each body.
    fn compile_for(&mut self, for_loop: &For<TypeInfo>) -> EmitResult<()> {
        let id = self.next_label();
        let start_label = format!("for_start{id}");
        let body_label = format!("for_body{id}");
        let end_label = format!("for_end{id}");

        let (_, start) = self.compile_expression(&for_loop.start)?;
        let (_, var_ptr) = self.variable_address(&for_loop.variable)?;
        self.emit(Instruction::Store {
            ty: IrType::I32,
            value: start,
            ptr: var_ptr.clone(),
        });
        let (_, bound) = self.compile_expression(&for_loop.end)?;

        self.emit_label(start_label.clone());
        let current = self.temp();
        self.emit(Instruction::Load {
            dest: current.clone(),
            ty: IrType::I32,
            ptr: var_ptr.clone(),
        });
        let cmp = self.temp();
        self.emit(Instruction::Icmp {
            dest: cmp.clone(),
            cond: IntCond::Sle,
            ty: IrType::I32,
            lhs: current,
            rhs: bound,
        });
        self.emit_br_cond(cmp, body_label.clone(), end_label.clone());

        self.emit_label(body_label);
        self.compile_statements(&for_loop.body)?;
        if self.block_open {
            let current = self.temp();
            self.emit(Instruction::Load {
                dest: current.clone(),
                ty: IrType::I32,
                ptr: var_ptr.clone(),
            });
            let next = self.temp();
            self.emit(Instruction::Add {
                dest: next.clone(),
                lhs: current,
                rhs: Value::Int(1),
            });
            self.emit(Instruction::Store {
                ty: IrType::I32,
                value: next,
                ptr: var_ptr,
            });
            self.emit_br(start_label);
        }

        self.emit_label(end_label);
        Ok(())
    }

    fn compile_return(&mut self, return_statement: &Return<TypeInfo>) -> EmitResult<()> {
        if self.main {
            self.emit_ret(IrType::I32, Some(Value::Int(0)));
            return Ok(());
        }

        match &return_statement.value {
            Some(value) => {
                let value = self.compile_expression(value)?;
                let ret = self.ret.clone();
                let (ty, value) = self.coerce(value, &ret);
                self.emit_ret(ty, Some(value));
            }
            None => self.emit_ret(IrType::Void, None),
        }
        Ok(())
    }

    fn compile_expression(&mut self, expression: &Expression<TypeInfo>) -> EmitResult<(IrType, Value)> {
        match expression {
            Expression::Literal(literal) => Ok(match &literal.value {
                Literal::Int(value) => (IrType::I32, Value::Int(*value)),
                Literal::Real(value) => (IrType::Double, Value::Real(*value)),
                Literal::Str(value) => {
                    let value = value.clone();
                    self.str_ptr(&value)
                }
            }),
            Expression::Designator(designator) => {
                let (ty, ptr) = self.designator_address(designator)?;
                if ty.is_aggregate() {
                    // an array value is its address
                    return Ok((ty.ptr(), ptr));
                }
                let dest = self.temp();
                self.emit(Instruction::Load {
                    dest: dest.clone(),
                    ty: ty.clone(),
                    ptr,
                });
                Ok((ty, dest))
            }
            Expression::Call(call) => self.compile_func_call(call),
            Expression::Unary(unary) => {
                let (ty, value) = self.compile_expression(&unary.operand)?;
                match unary.op {
                    UnaryOp::Plus => Ok((ty, value)),
                    UnaryOp::Minus => {
                        let dest = self.temp();
                        if ty == IrType::Double {
                            self.emit(Instruction::Fsub {
                                dest: dest.clone(),
                                lhs: Value::Real(0.0),
                                rhs: value,
                            });
                        } else {
                            self.emit(Instruction::Sub {
                                dest: dest.clone(),
                                lhs: Value::Int(0),
                                rhs: value,
                            });
                        }
                        Ok((ty, dest))
                    }
                }
            }
            Expression::Binary(binary) => {
                let lhs = self.compile_expression(&binary.lhs)?;
                let rhs = self.compile_expression(&binary.rhs)?;
                self.compile_binary(binary.op, lhs, rhs)
            }
        }
    }

    fn compile_binary(
        &mut self,
        op: BinaryOp,
        lhs: (IrType, Value),
        rhs: (IrType, Value),
    ) -> EmitResult<(IrType, Value)> {
        if matches!(op, BinaryOp::And | BinaryOp::Or) {
            let dest = self.temp();
            let instruction = match op {
                BinaryOp::And => Instruction::And {
                    dest: dest.clone(),
                    lhs: lhs.1,
                    rhs: rhs.1,
                },
                _ => Instruction::Or {
                    dest: dest.clone(),
                    lhs: lhs.1,
                    rhs: rhs.1,
                },
            };
            self.emit(instruction);
            return Ok((IrType::I1, dest));
        }

        if op.is_relation() {
            // string relations compare the interned literal pointers
            if lhs.0 == IrType::I8.ptr() {
                let cond = match op {
                    BinaryOp::Eq => IntCond::Eq,
                    _ => IntCond::Ne,
                };
                let dest = self.temp();
                self.emit(Instruction::Icmp {
                    dest: dest.clone(),
                    cond,
                    ty: IrType::I8.ptr(),
                    lhs: lhs.1,
                    rhs: rhs.1,
                });
                return Ok((IrType::I1, dest));
            }

            if lhs.0 == IrType::Double || rhs.0 == IrType::Double {
                let lhs = self.coerce(lhs, &IrType::Double).1;
                let rhs = self.coerce(rhs, &IrType::Double).1;
                let cond = match op {
                    BinaryOp::Eq => FloatCond::Oeq,
                    BinaryOp::Neq => FloatCond::One,
                    BinaryOp::Lt => FloatCond::Olt,
                    BinaryOp::Le => FloatCond::Ole,
                    BinaryOp::Gt => FloatCond::Ogt,
                    _ => FloatCond::Oge,
                };
                let dest = self.temp();
                self.emit(Instruction::Fcmp {
                    dest: dest.clone(),
                    cond,
                    lhs,
                    rhs,
                });
                return Ok((IrType::I1, dest));
            }

            let cond = match op {
                BinaryOp::Eq => IntCond::Eq,
                BinaryOp::Neq => IntCond::Ne,
                BinaryOp::Lt => IntCond::Slt,
                BinaryOp::Le => IntCond::Sle,
                BinaryOp::Gt => IntCond::Sgt,
                _ => IntCond::Sge,
            };
            let dest = self.temp();
            self.emit(Instruction::Icmp {
                dest: dest.clone(),
                cond,
                ty: IrType::I32,
                lhs: lhs.1,
                rhs: rhs.1,
            });
            return Ok((IrType::I1, dest));
        }

        // '/' always divides as REAL; the other arithmetic operators promote
        // to REAL as soon as one side is REAL
        let real = op == BinaryOp::Quot || lhs.0 == IrType::Double || rhs.0 == IrType::Double;
        if real {
            let lhs = self.coerce(lhs, &IrType::Double).1;
            let rhs = self.coerce(rhs, &IrType::Double).1;
            let dest = self.temp();
            let instruction = match op {
                BinaryOp::Add => Instruction::Fadd {
                    dest: dest.clone(),
                    lhs,
                    rhs,
                },
                BinaryOp::Sub => Instruction::Fsub {
                    dest: dest.clone(),
                    lhs,
                    rhs,
                },
                BinaryOp::Mul => Instruction::Fmul {
                    dest: dest.clone(),
                    lhs,
                    rhs,
                },
                BinaryOp::Quot => Instruction::Fdiv {
                    dest: dest.clone(),
                    lhs,
                    rhs,
                },
                other => {
                    return Err(self.internal(format!("operator '{other}' on REAL operands")));
                }
            };
            self.emit(instruction);
            return Ok((IrType::Double, dest));
        }

        let dest = self.temp();
        let instruction = match op {
            BinaryOp::Add => Instruction::Add {
                dest: dest.clone(),
                lhs: lhs.1,
                rhs: rhs.1,
            },
            BinaryOp::Sub => Instruction::Sub {
                dest: dest.clone(),
                lhs: lhs.1,
                rhs: rhs.1,
            },
            BinaryOp::Mul => Instruction::Mul {
                dest: dest.clone(),
                lhs: lhs.1,
                rhs: rhs.1,
            },
            BinaryOp::Div => Instruction::Sdiv {
                dest: dest.clone(),
                lhs: lhs.1,
                rhs: rhs.1,
            },
            BinaryOp::Mod => Instruction::Srem {
                dest: dest.clone(),
                lhs: lhs.1,
                rhs: rhs.1,
            },
            other => {
                return Err(self.internal(format!("operator '{other}' on INTEGER operands")));
            }
        };
        self.emit(instruction);
        Ok((IrType::I32, dest))
    }

    fn compile_func_call(&mut self, call: &FuncCall<TypeInfo>) -> EmitResult<(IrType, Value)> {
        self.compile_call(&call.callee, &call.arguments)?
            .ok_or_else(|| self.internal(format!("procedure '{}' has no result", call.callee)))
    }

    fn compile_call(
        &mut self,
        callee: &str,
        arguments: &[Expression<TypeInfo>],
    ) -> EmitResult<Option<(IrType, Value)>> {
        let Some(sig) = self.sigs.get(callee).cloned() else {
            return Err(self.internal(format!("no signature for procedure '{callee}'")));
        };

        let mut args = vec![];
        for (param, argument) in sig.params.iter().zip(arguments) {
            let value = self.compile_expression(argument)?;
            let value = if *param == Type::Real {
                self.coerce(value, &IrType::Double)
            } else {
                value
            };
            args.push((lower_param_type(param), value.1));
        }

        match &sig.return_type {
            None => {
                self.emit(Instruction::Call {
                    dest: None,
                    ty: IrType::Void,
                    callee: callee.to_string(),
                    args,
                });
                Ok(None)
            }
            Some(return_type) => {
                let ret = lower_type(return_type);
                let dest = self.temp();
                self.emit(Instruction::Call {
                    dest: Some(dest.clone()),
                    ty: ret.clone(),
                    callee: callee.to_string(),
                    args,
                });
                Ok(Some((ret, dest)))
            }
        }
    }

    /// Compute the address of a (possibly indexed) designator. Multi
    /// dimensional indexing emits a single GEP with a leading `i32 0` and one
    /// index per stripped dimension.
    fn designator_address(&mut self, designator: &Designator<TypeInfo>) -> EmitResult<(IrType, Value)> {
        let (base_ty, base_ptr) = match self.variables.get(&designator.name).cloned() {
            Some(slot) => {
                if slot.indirect {
                    let IrType::Ptr(inner) = slot.ty.clone() else {
                        return Err(self.internal(format!(
                            "array parameter '{}' has a non-pointer slot",
                            designator.name
                        )));
                    };
                    let dest = self.temp();
                    self.emit(Instruction::Load {
                        dest: dest.clone(),
                        ty: slot.ty,
                        ptr: slot.ptr,
                    });
                    (*inner, dest)
                } else {
                    (slot.ty, slot.ptr)
                }
            }
            None => match self.globals.get(&designator.name) {
                Some(ty) => (ty.clone(), Value::Global(designator.name.clone())),
                None => {
                    return Err(self.internal(format!(
                        "no storage for variable '{}'",
                        designator.name
                    )));
                }
            },
        };

        if designator.indexes.is_empty() {
            return Ok((base_ty, base_ptr));
        }

        let mut indexes = vec![Value::Int(0)];
        let mut result_ty = base_ty.clone();
        for index in &designator.indexes {
            let (_, value) = self.compile_expression(index)?;
            indexes.push(value);
            result_ty = match result_ty {
                IrType::Array { element, .. } => *element,
                other => {
                    return Err(self.internal(format!(
                        "indexing non-array type '{other}' through '{}'",
                        designator.name
                    )));
                }
            };
        }

        let dest = self.temp();
        self.emit(Instruction::GetElementPtr {
            dest: dest.clone(),
            ty: base_ty,
            ptr: base_ptr,
            indexes,
        });
        Ok((result_ty, dest))
    }

    fn variable_address(&mut self, name: &str) -> EmitResult<(IrType, Value)> {
        if let Some(slot) = self.variables.get(name) {
            return Ok((slot.ty.clone(), slot.ptr.clone()));
        }
        if let Some(ty) = self.globals.get(name) {
            return Ok((ty.clone(), Value::Global(name.to_string())));
        }
        Err(self.internal(format!("no storage for variable '{name}'")))
    }

    /// Insert the INTEGER→REAL promotion (`sitofp`) where a REAL is expected.
    fn coerce(&mut self, (ty, value): (IrType, Value), target: &IrType) -> (IrType, Value) {
        if *target == IrType::Double && ty == IrType::I32 {
            let dest = self.temp();
            self.emit(Instruction::Sitofp {
                dest: dest.clone(),
                value,
            });
            return (IrType::Double, dest);
        }
        (ty, value)
    }
}
