//! Tree-walking interpreter for the Oberon-0 subset.
//!
//! Executes the typechecker's output directly and agrees byte-for-byte with
//! the compiled program: logical operators evaluate both sides, integer
//! arithmetic wraps, arrays behave as references (compiled code passes them
//! as pointers), and `Write` on REAL prints six fractional digits like
//! printf's `%f`.

use std::{
    cell::RefCell,
    collections::HashMap,
    error::Error,
    fmt::Display,
    io::Write,
    rc::Rc,
};

use crate::{
    ast::{
        Assignment, BinaryOp, Declaration, Designator, Expression, For, If, Literal, Module,
        Position, ProcCall, ProcDecl, Statement, UnaryOp, While,
    },
    typechecker::{Type, TypeInfo},
};

#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeError {
    pub message: String,
    pub position: Position,
}

pub type RunResult<T> = Result<T, RuntimeError>;

impl Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (line, col) = self.position;
        write!(f, "{} at {line}:{col}", self.message)
    }
}

impl Error for RuntimeError {}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i32),
    Real(f64),
    Str(String),
    Bool(bool),
    Array(Rc<RefCell<Vec<Value>>>),
}

impl Value {
    /// The zero value of a type; what compiled code sees in fresh storage.
    fn zero(ty: &Type) -> Value {
        match ty {
            Type::Integer => Value::Int(0),
            Type::Real => Value::Real(0.0),
            Type::String => Value::Str(String::new()),
            Type::Bool => Value::Bool(false),
            Type::Array { element, len } => Value::Array(Rc::new(RefCell::new(
                (0..*len).map(|_| Value::zero(element)).collect(),
            ))),
        }
    }
}

/// Runtime scope frames: frame 0 holds the module variables, the last frame
/// the current procedure's parameters and locals. Lookup sees exactly those
/// two, mirroring the flat storage layout of the compiled code.
#[derive(Default, Debug)]
struct Scope {
    frames: Vec<HashMap<String, Value>>,
}

impl Scope {
    fn push(&mut self) {
        self.frames.push(HashMap::new());
    }

    fn pop(&mut self) {
        self.frames.pop();
    }

    fn find(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.frames.last().and_then(|frame| frame.get(name)) {
            return Some(value.clone());
        }
        self.frames.first().and_then(|frame| frame.get(name)).cloned()
    }

    fn set(&mut self, name: &str, value: Value) {
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.to_owned(), value);
        }
    }

    fn assign(&mut self, name: &str, value: Value) {
        if let Some(frame) = self.frames.last_mut() {
            if frame.contains_key(name) {
                frame.insert(name.to_owned(), value);
                return;
            }
        }
        if let Some(frame) = self.frames.first_mut() {
            frame.insert(name.to_owned(), value);
        }
    }
}

/// How a statement finished: normally, or unwinding a RETURN.
enum Flow {
    Normal,
    Return(Option<Value>),
}

pub struct Interpreter<'a, W> {
    module: &'a Module<TypeInfo>,
    procs: HashMap<String, &'a ProcDecl<TypeInfo>>,
    output: W,
}

impl<'a, W> Interpreter<'a, W>
where
    W: Write,
{
    pub fn new(module: &'a Module<TypeInfo>, output: W) -> Self {
        let mut procs = HashMap::new();
        collect_procs(&module.declarations, &mut procs);

        Self {
            module,
            procs,
            output,
        }
    }

    pub fn run(&mut self) -> RunResult<()> {
        let mut scope = Scope::default();
        scope.push();
        declare_vars(&self.module.declarations, &mut scope);

        for statement in &self.module.body {
            if let Flow::Return(_) = self.run_statement(statement, &mut scope)? {
                break;
            }
        }

        self.output.flush().map_err(|error| RuntimeError {
            message: format!("failed to write output: {error}"),
            position: self.module.position,
        })
    }

    fn run_statements(
        &mut self,
        statements: &[Statement<TypeInfo>],
        scope: &mut Scope,
    ) -> RunResult<Flow> {
        for statement in statements {
            match self.run_statement(statement, scope)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn run_statement(
        &mut self,
        statement: &Statement<TypeInfo>,
        scope: &mut Scope,
    ) -> RunResult<Flow> {
        match statement {
            Statement::Assignment(assignment) => {
                self.run_assignment(assignment, scope)?;
                Ok(Flow::Normal)
            }
            Statement::Call(call) => {
                self.run_proc_call(call, scope)?;
                Ok(Flow::Normal)
            }
            Statement::If(if_statement) => self.run_if(if_statement, scope),
            Statement::While(while_loop) => self.run_while(while_loop, scope),
            Statement::For(for_loop) => self.run_for(for_loop, scope),
            Statement::Return(return_statement) => {
                let value = match &return_statement.value {
                    Some(value) => Some(self.eval(value, scope)?),
                    None => None,
                };
                Ok(Flow::Return(value))
            }
        }
    }

    fn run_assignment(&mut self, assignment: &Assignment<TypeInfo>, scope: &mut Scope) -> RunResult<()> {
        let value = self.eval(&assignment.value, scope)?;
        let value = coerce(value, &assignment.target.info.ty);
        let target = &assignment.target;

        if target.indexes.is_empty() {
            scope.assign(&target.name, value);
            return Ok(());
        }

        let mut indexes = vec![];
        for index in &target.indexes {
            indexes.push(self.eval_int(index, scope)?);
        }

        let Some(base) = scope.find(&target.name) else {
            return Err(unbound(&target.name, target.position));
        };
        let mut current = self.as_array(base, target.position)?;
        let (last, outer) = indexes.split_last().unwrap_or((&0, &[]));
        for index in outer {
            let next = self.index_array(&current, *index, target.position)?;
            current = self.as_array(next, target.position)?;
        }

        let mut elements = current.borrow_mut();
        let slot = usize::try_from(*last)
            .ok()
            .and_then(|index| elements.get_mut(index));
        match slot {
            Some(slot) => *slot = value,
            None => {
                return Err(RuntimeError {
                    message: format!("index {last} out of bounds for '{}'", target.name),
                    position: target.position,
                });
            }
        }
        Ok(())
    }

    fn run_proc_call(&mut self, call: &ProcCall<TypeInfo>, scope: &mut Scope) -> RunResult<()> {
        match call.callee.as_str() {
            "Write" => {
                let Some(argument) = call.arguments.first() else {
                    return Err(RuntimeError {
                        message: "'Write' call without an argument".to_string(),
                        position: call.position,
                    });
                };
                let value = self.eval(argument, scope)?;
                let text = match value {
                    Value::Int(value) => format!("{value}"),
                    // printf's %f convention: six fractional digits
                    Value::Real(value) => format!("{value:.6}"),
                    Value::Str(value) => value,
                    other => {
                        return Err(RuntimeError {
                            message: format!("'Write' on unprintable value {other:?}"),
                            position: call.position,
                        });
                    }
                };
                self.write_output(&text, call.position)
            }
            "WriteLn" => self.write_output("\n", call.position),
            _ => self
                .call_proc(&call.callee, &call.arguments, scope, call.position)
                .map(|_| ()),
        }
    }

    fn write_output(&mut self, text: &str, position: Position) -> RunResult<()> {
        self.output
            .write_all(text.as_bytes())
            .map_err(|error| RuntimeError {
                message: format!("failed to write output: {error}"),
                position,
            })
    }

    fn run_if(&mut self, if_statement: &If<TypeInfo>, scope: &mut Scope) -> RunResult<Flow> {
        if self.eval_bool(&if_statement.condition, scope)? {
            self.run_statements(&if_statement.then_branch, scope)
        } else if let Some(else_branch) = &if_statement.else_branch {
            self.run_statements(else_branch, scope)
        } else {
            Ok(Flow::Normal)
        }
    }

    fn run_while(&mut self, while_loop: &While<TypeInfo>, scope: &mut Scope) -> RunResult<Flow> {
        while self.eval_bool(&while_loop.condition, scope)? {
            match self.run_statements(&while_loop.body, scope)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    /// Inclusive upper bound, evaluated once; the loop variable is re-read
    /// around the body so assignments inside the body stay visible, exactly
    /// like the compiled load/increment/store sequence.
    fn run_for(&mut self, for_loop: &For<TypeInfo>, scope: &mut Scope) -> RunResult<Flow> {
        let start = self.eval_int(&for_loop.start, scope)?;
        scope.assign(&for_loop.variable, Value::Int(start));
        let bound = self.eval_int(&for_loop.end, scope)?;

        loop {
            let Some(Value::Int(current)) = scope.find(&for_loop.variable) else {
                return Err(unbound(&for_loop.variable, for_loop.position));
            };
            if current > bound {
                return Ok(Flow::Normal);
            }

            match self.run_statements(&for_loop.body, scope)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }

            let Some(Value::Int(current)) = scope.find(&for_loop.variable) else {
                return Err(unbound(&for_loop.variable, for_loop.position));
            };
            scope.assign(&for_loop.variable, Value::Int(current.wrapping_add(1)));
        }
    }

    fn call_proc(
        &mut self,
        name: &str,
        arguments: &[Expression<TypeInfo>],
        scope: &mut Scope,
        position: Position,
    ) -> RunResult<Option<Value>> {
        let Some(proc) = self.procs.get(name).copied() else {
            return Err(RuntimeError {
                message: format!("call to unknown procedure '{name}'"),
                position,
            });
        };

        let mut values = vec![];
        for (param, argument) in proc.params.iter().zip(arguments) {
            let value = self.eval(argument, scope)?;
            values.push(coerce(value, &Type::from_type_expr(&param.type_expr)));
        }

        scope.push();
        for (param, value) in proc.params.iter().zip(values) {
            scope.set(&param.name, value);
        }
        declare_vars(&proc.declarations, scope);

        let mut result = None;
        for statement in &proc.body {
            if let Flow::Return(value) = self.run_statement(statement, scope)? {
                result = value;
                break;
            }
        }
        scope.pop();

        Ok(match proc.return_type.as_ref().map(Type::from_type_expr) {
            Some(return_type) => Some(match result {
                Some(value) => coerce(value, &return_type),
                // fallthrough yields the zero value, like the emitted code
                None => Value::zero(&return_type),
            }),
            None => None,
        })
    }

    fn eval(&mut self, expression: &Expression<TypeInfo>, scope: &mut Scope) -> RunResult<Value> {
        match expression {
            Expression::Literal(literal) => Ok(match &literal.value {
                Literal::Int(value) => Value::Int(*value),
                Literal::Real(value) => Value::Real(*value),
                Literal::Str(value) => Value::Str(value.clone()),
            }),
            Expression::Designator(designator) => self.eval_designator(designator, scope),
            Expression::Call(call) => {
                match self.call_proc(&call.callee, &call.arguments, scope, call.position)? {
                    Some(value) => Ok(value),
                    None => Err(RuntimeError {
                        message: format!("procedure '{}' has no result", call.callee),
                        position: call.position,
                    }),
                }
            }
            Expression::Unary(unary) => {
                let value = self.eval(&unary.operand, scope)?;
                Ok(match (unary.op, value) {
                    (UnaryOp::Plus, value) => value,
                    (UnaryOp::Minus, Value::Int(value)) => Value::Int(value.wrapping_neg()),
                    (UnaryOp::Minus, Value::Real(value)) => Value::Real(-value),
                    (UnaryOp::Minus, other) => {
                        return Err(RuntimeError {
                            message: format!("cannot negate {other:?}"),
                            position: unary.position,
                        });
                    }
                })
            }
            Expression::Binary(binary) => {
                let lhs = self.eval(&binary.lhs, scope)?;
                let rhs = self.eval(&binary.rhs, scope)?;
                eval_binary(binary.op, lhs, rhs, binary.position)
            }
        }
    }

    fn eval_designator(&mut self, designator: &Designator<TypeInfo>, scope: &mut Scope) -> RunResult<Value> {
        let Some(mut value) = scope.find(&designator.name) else {
            return Err(unbound(&designator.name, designator.position));
        };

        for index in &designator.indexes {
            let index = self.eval_int(index, scope)?;
            let array = self.as_array(value, designator.position)?;
            value = self.index_array(&array, index, designator.position)?;
        }

        Ok(value)
    }

    fn eval_int(&mut self, expression: &Expression<TypeInfo>, scope: &mut Scope) -> RunResult<i32> {
        match self.eval(expression, scope)? {
            Value::Int(value) => Ok(value),
            other => Err(RuntimeError {
                message: format!("expected an INTEGER value, got {other:?}"),
                position: expression.position(),
            }),
        }
    }

    fn eval_bool(&mut self, expression: &Expression<TypeInfo>, scope: &mut Scope) -> RunResult<bool> {
        match self.eval(expression, scope)? {
            Value::Bool(value) => Ok(value),
            other => Err(RuntimeError {
                message: format!("expected a boolean value, got {other:?}"),
                position: expression.position(),
            }),
        }
    }

    fn as_array(&self, value: Value, position: Position) -> RunResult<Rc<RefCell<Vec<Value>>>> {
        match value {
            Value::Array(array) => Ok(array),
            other => Err(RuntimeError {
                message: format!("expected an array value, got {other:?}"),
                position,
            }),
        }
    }

    fn index_array(
        &self,
        array: &Rc<RefCell<Vec<Value>>>,
        index: i32,
        position: Position,
    ) -> RunResult<Value> {
        usize::try_from(index)
            .ok()
            .and_then(|index| array.borrow().get(index).cloned())
            .ok_or_else(|| RuntimeError {
                message: format!("index {index} out of bounds"),
                position,
            })
    }
}

fn unbound(name: &str, position: Position) -> RuntimeError {
    RuntimeError {
        message: format!("unbound variable '{name}'"),
        position,
    }
}

fn coerce(value: Value, target: &Type) -> Value {
    match (value, target) {
        (Value::Int(value), Type::Real) => Value::Real(f64::from(value)),
        (value, _) => value,
    }
}

fn collect_procs<'a>(
    declarations: &'a [Declaration<TypeInfo>],
    procs: &mut HashMap<String, &'a ProcDecl<TypeInfo>>,
) {
    for declaration in declarations {
        if let Declaration::Proc(proc) = declaration {
            procs.insert(proc.name.clone(), proc);
            collect_procs(&proc.declarations, procs);
        }
    }
}

fn declare_vars(declarations: &[Declaration<TypeInfo>], scope: &mut Scope) {
    for declaration in declarations {
        if let Declaration::Var(var) = declaration {
            let ty = Type::from_type_expr(&var.type_expr);
            for name in &var.names {
                scope.set(name, Value::zero(&ty));
            }
        }
    }
}

fn eval_binary(op: BinaryOp, lhs: Value, rhs: Value, position: Position) -> RunResult<Value> {
    let error = |message: String| RuntimeError { message, position };

    match op {
        BinaryOp::And | BinaryOp::Or => {
            let (Value::Bool(lhs), Value::Bool(rhs)) = (&lhs, &rhs) else {
                return Err(error(format!("'{op}' on non-boolean values")));
            };
            Ok(Value::Bool(match op {
                BinaryOp::And => *lhs && *rhs,
                _ => *lhs || *rhs,
            }))
        }
        BinaryOp::Eq | BinaryOp::Neq | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            eval_relation(op, lhs, rhs, position)
        }
        BinaryOp::Div | BinaryOp::Mod => {
            let (Value::Int(lhs), Value::Int(rhs)) = (&lhs, &rhs) else {
                return Err(error(format!("'{op}' on non-INTEGER values")));
            };
            if *rhs == 0 {
                return Err(error("division by zero".to_string()));
            }
            Ok(Value::Int(match op {
                BinaryOp::Div => lhs.wrapping_div(*rhs),
                _ => lhs.wrapping_rem(*rhs),
            }))
        }
        BinaryOp::Quot => {
            let (Some(lhs), Some(rhs)) = (as_real(&lhs), as_real(&rhs)) else {
                return Err(error("'/' on non-numeric values".to_string()));
            };
            Ok(Value::Real(lhs / rhs))
        }
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul => match (&lhs, &rhs) {
            (Value::Int(lhs), Value::Int(rhs)) => Ok(Value::Int(match op {
                BinaryOp::Add => lhs.wrapping_add(*rhs),
                BinaryOp::Sub => lhs.wrapping_sub(*rhs),
                _ => lhs.wrapping_mul(*rhs),
            })),
            _ => {
                let (Some(lhs), Some(rhs)) = (as_real(&lhs), as_real(&rhs)) else {
                    return Err(error(format!("'{op}' on non-numeric values")));
                };
                Ok(Value::Real(match op {
                    BinaryOp::Add => lhs + rhs,
                    BinaryOp::Sub => lhs - rhs,
                    _ => lhs * rhs,
                }))
            }
        },
    }
}

fn eval_relation(op: BinaryOp, lhs: Value, rhs: Value, position: Position) -> RunResult<Value> {
    if let (Value::Str(lhs), Value::Str(rhs)) = (&lhs, &rhs) {
        return Ok(Value::Bool(match op {
            BinaryOp::Eq => lhs == rhs,
            _ => lhs != rhs,
        }));
    }

    if let (Value::Int(lhs), Value::Int(rhs)) = (&lhs, &rhs) {
        return Ok(Value::Bool(match op {
            BinaryOp::Eq => lhs == rhs,
            BinaryOp::Neq => lhs != rhs,
            BinaryOp::Lt => lhs < rhs,
            BinaryOp::Le => lhs <= rhs,
            BinaryOp::Gt => lhs > rhs,
            _ => lhs >= rhs,
        }));
    }

    let (Some(lhs), Some(rhs)) = (as_real(&lhs), as_real(&rhs)) else {
        return Err(RuntimeError {
            message: format!("'{op}' on incomparable values"),
            position,
        });
    };
    Ok(Value::Bool(match op {
        BinaryOp::Eq => lhs == rhs,
        BinaryOp::Neq => lhs != rhs,
        BinaryOp::Lt => lhs < rhs,
        BinaryOp::Le => lhs <= rhs,
        BinaryOp::Gt => lhs > rhs,
        _ => lhs >= rhs,
    }))
}

fn as_real(value: &Value) -> Option<f64> {
    match value {
        Value::Int(value) => Some(f64::from(*value)),
        Value::Real(value) => Some(*value),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lexer::Lexer, parser, typechecker::Typechecker};

    fn run_source(source: &str) -> String {
        let tokens = Lexer::new(source).lex().expect("lexing failed");
        let module = parser::parse(tokens).expect("parsing failed");
        let module = Typechecker::from_module(module)
            .check()
            .expect("type checking failed");

        let mut output = Vec::new();
        Interpreter::new(&module, &mut output)
            .run()
            .expect("interpretation failed");
        String::from_utf8(output).expect("output is not UTF-8")
    }

    #[test]
    fn test_run_hello() {
        assert_eq!(
            "Hi\n",
            run_source("MODULE H; BEGIN Write(\"Hi\"); WriteLn(); END H.")
        );
    }

    #[test]
    fn test_run_sum() {
        assert_eq!(
            "30\n",
            run_source(
                "MODULE S; VAR a, b, s: INTEGER; \
                 BEGIN a := 10; b := 20; s := a + b; Write(s); WriteLn(); END S."
            )
        );
    }

    #[test]
    fn test_run_for_loop() {
        assert_eq!(
            "1 2 3 \n",
            run_source(
                "MODULE L; VAR i: INTEGER; \
                 BEGIN FOR i := 1 TO 3 DO Write(i); Write(\" \"); END; WriteLn(); END L."
            )
        );
    }

    #[test]
    fn test_run_for_loop_empty_range() {
        assert_eq!(
            "done\n",
            run_source(
                "MODULE L; VAR i: INTEGER; \
                 BEGIN FOR i := 3 TO 1 DO Write(i); END; Write(\"done\"); WriteLn(); END L."
            )
        );
    }

    #[test]
    fn test_run_factorial() {
        assert_eq!(
            "120\n",
            run_source(
                "MODULE F;
                 PROCEDURE f(n: INTEGER): INTEGER;
                 BEGIN
                     IF n <= 1 THEN RETURN 1; ELSE RETURN n * f(n - 1); END;
                 END f;
                 BEGIN Write(f(5)); WriteLn(); END F."
            )
        );
    }

    #[test]
    fn test_run_matrix() {
        assert_eq!(
            "10\n",
            run_source(
                "MODULE M; VAR m: ARRAY 2, 2 OF INTEGER; i, j: INTEGER;
                 BEGIN
                     FOR i := 0 TO 1 DO FOR j := 0 TO 1 DO m[i, j] := i * 10 + j; END; END;
                     Write(m[1, 0]); WriteLn();
                 END M."
            )
        );
    }

    #[test]
    fn test_run_real_formatting_matches_printf() {
        assert_eq!(
            "1.500000",
            run_source("MODULE R; VAR r: REAL; BEGIN r := 3 / 2; Write(r); END R.")
        );
    }

    #[test]
    fn test_run_while_loop() {
        assert_eq!(
            "0123",
            run_source(
                "MODULE W; VAR i: INTEGER; \
                 BEGIN WHILE i < 4 DO Write(i); i := i + 1; END; END W."
            )
        );
    }

    #[test]
    fn test_run_array_parameters_are_references() {
        assert_eq!(
            "7\n",
            run_source(
                "MODULE A;
                 VAR m: ARRAY 2 OF INTEGER;
                 PROCEDURE fill(a: ARRAY 2 OF INTEGER);
                 BEGIN a[0] := 7;
                 END fill;
                 BEGIN fill(m); Write(m[0]); WriteLn(); END A."
            )
        );
    }

    #[test]
    fn test_run_division_by_zero_is_an_error() {
        let tokens = Lexer::new("MODULE D; VAR a: INTEGER; BEGIN a := 1 DIV 0; END D.")
            .lex()
            .expect("lexing failed");
        let module = parser::parse(tokens).expect("parsing failed");
        let module = Typechecker::from_module(module)
            .check()
            .expect("type checking failed");

        let mut output = Vec::new();
        let result = Interpreter::new(&module, &mut output).run();
        let error = result.expect_err("division by zero should fail");
        assert!(error.message.contains("division by zero"));
    }

    #[test]
    fn test_run_scope_shadowing() {
        assert_eq!(
            "5 1\n",
            run_source(
                "MODULE S;
                 VAR x: INTEGER;
                 PROCEDURE p(): INTEGER;
                 VAR x: INTEGER;
                 BEGIN x := 5; RETURN x;
                 END p;
                 BEGIN x := 1; Write(p()); Write(\" \"); Write(x); WriteLn(); END S."
            )
        );
    }
}
