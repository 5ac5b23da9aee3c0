//! Recursive-descent parser for the Oberon-0 subset.
//!
//! One method per grammar nonterminal. The parser consumes the token stream
//! produced by the lexer and builds an unannotated [`Module<()>`]. The first
//! unexpected token aborts parsing; there is no error recovery.

use std::{error::Error, fmt::Display, mem};

use crate::{
    ast::{
        Assignment, BinaryExpr, BinaryOp, ConstDecl, Declaration, Designator, Expression, For,
        FuncCall, If, Literal, LiteralExpr, Module, Param, Position, ProcCall, ProcDecl, Return,
        Statement, TypeExpr, UnaryExpr, UnaryOp, VarDecl, While,
    },
    lexer::{Token, TokenKind, Tokens},
};

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub position: Position,
}

pub type ParseResult<T> = Result<T, ParseError>;

impl Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (line, col) = self.position;
        write!(f, "{} at {line}:{col}", self.message)
    }
}

impl Error for ParseError {}

/// Parse a whole compilation unit from its token stream.
pub fn parse(tokens: Vec<Token>) -> ParseResult<Module<()>> {
    Parser::new(tokens).parse_module()
}

pub struct Parser {
    tokens: Tokens<Token>,
}

impl Parser {
    pub fn new(tokens: impl Into<Tokens<Token>>) -> Self {
        Self {
            tokens: tokens.into(),
        }
    }

    fn advance(&mut self) -> Token {
        self.tokens.next().unwrap_or(Token {
            kind: TokenKind::Eof,
            position: (0, 0),
        })
    }

    fn peek_kind(&mut self) -> TokenKind {
        self.tokens
            .peek()
            .map(|token| token.kind)
            .unwrap_or(TokenKind::Eof)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if mem::discriminant(&self.peek_kind()) == mem::discriminant(kind) {
            self.advance();
            return true;
        }
        false
    }

    fn expect(&mut self, expected: TokenKind) -> ParseResult<Token> {
        let token = self.advance();
        if mem::discriminant(&token.kind) != mem::discriminant(&expected) {
            return Err(ParseError {
                message: format!("expected {expected}, got {}", token.kind),
                position: token.position,
            });
        }
        Ok(token)
    }

    fn expect_ident(&mut self) -> ParseResult<(String, Position)> {
        let token = self.advance();
        match token.kind {
            TokenKind::Ident(name) => Ok((name, token.position)),
            other => Err(ParseError {
                message: format!("expected an identifier, got {other}"),
                position: token.position,
            }),
        }
    }

    fn expect_int(&mut self) -> ParseResult<(i32, Position)> {
        let token = self.advance();
        match token.kind {
            TokenKind::Int(value) => Ok((value, token.position)),
            other => Err(ParseError {
                message: format!("expected an integer literal, got {other}"),
                position: token.position,
            }),
        }
    }

    /// `program := 'MODULE' ident ';' decls 'BEGIN' stmts 'END' ident '.'`
    pub fn parse_module(&mut self) -> ParseResult<Module<()>> {
        let module = self.expect(TokenKind::Module)?;
        let (name, _) = self.expect_ident()?;
        self.expect(TokenKind::Semicolon)?;

        let declarations = self.parse_declarations()?;

        self.expect(TokenKind::Begin)?;
        let body = self.parse_statement_sequence()?;
        self.expect(TokenKind::End)?;

        let (trailing, trailing_position) = self.expect_ident()?;
        if trailing != name {
            return Err(ParseError {
                message: format!("trailing name '{trailing}' does not match module '{name}'"),
                position: trailing_position,
            });
        }
        self.expect(TokenKind::Dot)?;
        self.expect(TokenKind::Eof)?;

        Ok(Module {
            name,
            declarations,
            body,
            position: module.position,
        })
    }

    fn parse_declarations(&mut self) -> ParseResult<Vec<Declaration<()>>> {
        let mut declarations = vec![];

        loop {
            match self.peek_kind() {
                TokenKind::Const => declarations.extend(
                    self.parse_const()?
                        .into_iter()
                        .map(Declaration::Const),
                ),
                TokenKind::Var => declarations
                    .extend(self.parse_var()?.into_iter().map(Declaration::Var)),
                TokenKind::Procedure => declarations.push(Declaration::Proc(self.parse_proc()?)),
                _ => return Ok(declarations),
            }
        }
    }

    /// `constDecl := 'CONST' (ident '=' expr ';')+`
    fn parse_const(&mut self) -> ParseResult<Vec<ConstDecl<()>>> {
        self.expect(TokenKind::Const)?;

        let mut constants = vec![];
        // at least one binding, then more as long as an identifier follows
        loop {
            let (name, position) = self.expect_ident()?;
            self.expect(TokenKind::Eq)?;
            let value = self.parse_expression()?;
            self.expect(TokenKind::Semicolon)?;

            constants.push(ConstDecl {
                name,
                value,
                position,
            });

            if !matches!(self.peek_kind(), TokenKind::Ident(_)) {
                return Ok(constants);
            }
        }
    }

    /// `varDecl := 'VAR' (identList ':' type ';')+`
    fn parse_var(&mut self) -> ParseResult<Vec<VarDecl>> {
        self.expect(TokenKind::Var)?;

        let mut groups = vec![];
        // at least one group, then more as long as an identifier follows
        loop {
            let (first, position) = self.expect_ident()?;
            let mut names = vec![first];
            while self.eat(&TokenKind::Comma) {
                names.push(self.expect_ident()?.0);
            }

            self.expect(TokenKind::Colon)?;
            let type_expr = self.parse_type()?;
            self.expect(TokenKind::Semicolon)?;

            groups.push(VarDecl {
                names,
                type_expr,
                position,
            });

            if !matches!(self.peek_kind(), TokenKind::Ident(_)) {
                return Ok(groups);
            }
        }
    }

    /// `procDecl := 'PROCEDURE' ident '(' params? ')' (':' type)? ';'
    ///              decls 'BEGIN' stmts 'END' ident ';'`
    fn parse_proc(&mut self) -> ParseResult<ProcDecl<()>> {
        let position = self.expect(TokenKind::Procedure)?.position;
        let (name, _) = self.expect_ident()?;

        self.expect(TokenKind::LParen)?;
        let mut params = vec![];
        if !matches!(self.peek_kind(), TokenKind::RParen) {
            params.push(self.parse_param()?);
            while self.eat(&TokenKind::Comma) {
                params.push(self.parse_param()?);
            }
        }
        self.expect(TokenKind::RParen)?;

        let return_type = if self.eat(&TokenKind::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };
        self.expect(TokenKind::Semicolon)?;

        let declarations = self.parse_declarations()?;

        self.expect(TokenKind::Begin)?;
        let body = self.parse_statement_sequence()?;
        self.expect(TokenKind::End)?;

        let (trailing, trailing_position) = self.expect_ident()?;
        if trailing != name {
            return Err(ParseError {
                message: format!("trailing name '{trailing}' does not match procedure '{name}'"),
                position: trailing_position,
            });
        }
        self.expect(TokenKind::Semicolon)?;

        Ok(ProcDecl {
            name,
            params,
            return_type,
            declarations,
            body,
            position,
        })
    }

    fn parse_param(&mut self) -> ParseResult<Param> {
        let (name, position) = self.expect_ident()?;
        self.expect(TokenKind::Colon)?;
        let type_expr = self.parse_type()?;

        Ok(Param {
            name,
            type_expr,
            position,
        })
    }

    /// `type := 'INTEGER' | 'REAL' | 'STRING' | 'ARRAY' intLit (',' intLit)* 'OF' type`
    fn parse_type(&mut self) -> ParseResult<TypeExpr> {
        let token = self.advance();
        match token.kind {
            TokenKind::IntegerType => Ok(TypeExpr::Integer),
            TokenKind::RealType => Ok(TypeExpr::Real),
            TokenKind::StringType => Ok(TypeExpr::String),
            TokenKind::Array => {
                let mut lengths = vec![self.parse_array_length()?];
                while self.eat(&TokenKind::Comma) {
                    lengths.push(self.parse_array_length()?);
                }
                self.expect(TokenKind::Of)?;
                let element = self.parse_type()?;

                Ok(TypeExpr::Array {
                    lengths,
                    element: Box::new(element),
                })
            }
            other => Err(ParseError {
                message: format!("expected a type, got {other}"),
                position: token.position,
            }),
        }
    }

    fn parse_array_length(&mut self) -> ParseResult<u32> {
        let (value, position) = self.expect_int()?;
        if value <= 0 {
            return Err(ParseError {
                message: format!("array length must be positive, got {value}"),
                position,
            });
        }
        Ok(value as u32)
    }

    /// `stmts := stmt (';' stmt)*`, with empty statements tolerated and a
    /// trailing ';' before `END`/`ELSE` accepted.
    fn parse_statement_sequence(&mut self) -> ParseResult<Vec<Statement<()>>> {
        let mut statements = vec![];

        loop {
            while self.eat(&TokenKind::Semicolon) {}

            if matches!(
                self.peek_kind(),
                TokenKind::End | TokenKind::Else | TokenKind::Eof
            ) {
                return Ok(statements);
            }

            statements.push(self.parse_statement()?);

            if !matches!(self.peek_kind(), TokenKind::Semicolon) {
                return Ok(statements);
            }
        }
    }

    fn parse_statement(&mut self) -> ParseResult<Statement<()>> {
        match self.peek_kind() {
            TokenKind::If => self.parse_if().map(Statement::If),
            TokenKind::While => self.parse_while().map(Statement::While),
            TokenKind::For => self.parse_for().map(Statement::For),
            TokenKind::Return => self.parse_return().map(Statement::Return),
            TokenKind::Ident(_) => self.parse_assignment_or_call(),
            other => {
                let token = self.advance();
                Err(ParseError {
                    message: format!("expected a statement, got {other}"),
                    position: token.position,
                })
            }
        }
    }

    fn parse_assignment_or_call(&mut self) -> ParseResult<Statement<()>> {
        let (name, position) = self.expect_ident()?;

        if matches!(self.peek_kind(), TokenKind::LParen) {
            let arguments = self.parse_arguments()?;
            return Ok(Statement::Call(ProcCall {
                callee: name,
                arguments,
                position,
            }));
        }

        let target = self.parse_designator_rest(name, position)?;
        self.expect(TokenKind::Assign)?;
        let value = self.parse_expression()?;

        Ok(Statement::Assignment(Assignment {
            target,
            value,
            position,
        }))
    }

    /// `if := 'IF' expr 'THEN' stmts ('ELSE' stmts)? 'END'`
    fn parse_if(&mut self) -> ParseResult<If<()>> {
        let position = self.expect(TokenKind::If)?.position;
        let condition = self.parse_expression()?;
        self.expect(TokenKind::Then)?;
        let then_branch = self.parse_statement_sequence()?;

        let else_branch = if self.eat(&TokenKind::Else) {
            Some(self.parse_statement_sequence()?)
        } else {
            None
        };
        self.expect(TokenKind::End)?;

        Ok(If {
            condition,
            then_branch,
            else_branch,
            position,
        })
    }

    /// `while := 'WHILE' expr 'DO' stmts 'END'`
    fn parse_while(&mut self) -> ParseResult<While<()>> {
        let position = self.expect(TokenKind::While)?.position;
        let condition = self.parse_expression()?;
        self.expect(TokenKind::Do)?;
        let body = self.parse_statement_sequence()?;
        self.expect(TokenKind::End)?;

        Ok(While {
            condition,
            body,
            position,
        })
    }

    /// `for := 'FOR' ident ':=' expr 'TO' expr 'DO' stmts 'END'`
    fn parse_for(&mut self) -> ParseResult<For<()>> {
        let position = self.expect(TokenKind::For)?.position;
        let (variable, _) = self.expect_ident()?;
        self.expect(TokenKind::Assign)?;
        let start = self.parse_expression()?;
        self.expect(TokenKind::To)?;
        let end = self.parse_expression()?;
        self.expect(TokenKind::Do)?;
        let body = self.parse_statement_sequence()?;
        self.expect(TokenKind::End)?;

        Ok(For {
            variable,
            start,
            end,
            body,
            position,
        })
    }

    fn parse_return(&mut self) -> ParseResult<Return<()>> {
        let position = self.expect(TokenKind::Return)?.position;

        let value = match self.peek_kind() {
            TokenKind::Semicolon | TokenKind::End | TokenKind::Else => None,
            _ => Some(self.parse_expression()?),
        };

        Ok(Return { value, position })
    }

    /// `expr := simpleExpr (relOp simpleExpr)?`
    fn parse_expression(&mut self) -> ParseResult<Expression<()>> {
        let lhs = self.parse_simple_expression()?;

        let op = match self.peek_kind() {
            TokenKind::Eq => BinaryOp::Eq,
            TokenKind::Hash => BinaryOp::Neq,
            TokenKind::Lt => BinaryOp::Lt,
            TokenKind::Le => BinaryOp::Le,
            TokenKind::Gt => BinaryOp::Gt,
            TokenKind::Ge => BinaryOp::Ge,
            _ => return Ok(lhs),
        };
        let position = self.advance().position;
        let rhs = self.parse_simple_expression()?;

        Ok(Expression::Binary(BinaryExpr {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            position,
            info: (),
        }))
    }

    /// `simpleExpr := ('+'|'-')? term (addOp term)*`
    fn parse_simple_expression(&mut self) -> ParseResult<Expression<()>> {
        let sign = match self.peek_kind() {
            TokenKind::Plus => Some(UnaryOp::Plus),
            TokenKind::Minus => Some(UnaryOp::Minus),
            _ => None,
        };

        let mut lhs = if let Some(op) = sign {
            let position = self.advance().position;
            let operand = self.parse_term()?;
            Expression::Unary(UnaryExpr {
                op,
                operand: Box::new(operand),
                position,
                info: (),
            })
        } else {
            self.parse_term()?
        };

        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                TokenKind::Or => BinaryOp::Or,
                _ => return Ok(lhs),
            };
            let position = self.advance().position;
            let rhs = self.parse_term()?;

            lhs = Expression::Binary(BinaryExpr {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                position,
                info: (),
            });
        }
    }

    /// `term := factor (mulOp factor)*`
    fn parse_term(&mut self) -> ParseResult<Expression<()>> {
        let mut lhs = self.parse_factor()?;

        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Quot,
                TokenKind::Div => BinaryOp::Div,
                TokenKind::Mod => BinaryOp::Mod,
                TokenKind::And => BinaryOp::And,
                _ => return Ok(lhs),
            };
            let position = self.advance().position;
            let rhs = self.parse_factor()?;

            lhs = Expression::Binary(BinaryExpr {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                position,
                info: (),
            });
        }
    }

    /// `factor := designator | literal | '(' expr ')' | funcCall`
    fn parse_factor(&mut self) -> ParseResult<Expression<()>> {
        let token = self.advance();
        match token.kind {
            TokenKind::Int(value) => Ok(Expression::Literal(LiteralExpr {
                value: Literal::Int(value),
                position: token.position,
                info: (),
            })),
            TokenKind::Real(value) => Ok(Expression::Literal(LiteralExpr {
                value: Literal::Real(value),
                position: token.position,
                info: (),
            })),
            TokenKind::Str(value) => Ok(Expression::Literal(LiteralExpr {
                value: Literal::Str(value),
                position: token.position,
                info: (),
            })),
            TokenKind::LParen => {
                let expression = self.parse_expression()?;
                self.expect(TokenKind::RParen)?;
                Ok(expression)
            }
            TokenKind::Ident(name) => {
                if matches!(self.peek_kind(), TokenKind::LParen) {
                    let arguments = self.parse_arguments()?;
                    return Ok(Expression::Call(FuncCall {
                        callee: name,
                        arguments,
                        position: token.position,
                        info: (),
                    }));
                }

                let designator = self.parse_designator_rest(name, token.position)?;
                Ok(Expression::Designator(designator))
            }
            other => Err(ParseError {
                message: format!("expected an expression, got {other}"),
                position: token.position,
            }),
        }
    }

    /// Index suffixes of a designator; `a[i, j]` and `a[i][j]` are the same.
    fn parse_designator_rest(
        &mut self,
        name: String,
        position: Position,
    ) -> ParseResult<Designator<()>> {
        let mut indexes = vec![];

        while self.eat(&TokenKind::LBracket) {
            indexes.push(self.parse_expression()?);
            while self.eat(&TokenKind::Comma) {
                indexes.push(self.parse_expression()?);
            }
            self.expect(TokenKind::RBracket)?;
        }

        Ok(Designator {
            name,
            indexes,
            position,
            info: (),
        })
    }

    fn parse_arguments(&mut self) -> ParseResult<Vec<Expression<()>>> {
        self.expect(TokenKind::LParen)?;

        let mut arguments = vec![];
        if !matches!(self.peek_kind(), TokenKind::RParen) {
            arguments.push(self.parse_expression()?);
            while self.eat(&TokenKind::Comma) {
                arguments.push(self.parse_expression()?);
            }
        }
        self.expect(TokenKind::RParen)?;

        Ok(arguments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse_source(source: &str) -> ParseResult<Module<()>> {
        let tokens = Lexer::new(source).lex().expect("lexing failed");
        parse(tokens)
    }

    fn parse_body(statements: &str) -> Vec<Statement<()>> {
        let source = format!("MODULE T; VAR x, y: INTEGER; BEGIN {statements} END T.");
        parse_source(&source).expect("parsing failed").body
    }

    #[test]
    fn test_parse_empty_module() {
        let module = parse_source("MODULE Empty; BEGIN END Empty.").expect("parsing failed");

        assert_eq!("Empty", module.name);
        assert!(module.declarations.is_empty());
        assert!(module.body.is_empty());
    }

    #[test]
    fn test_parse_trailing_name_mismatch() {
        let result = parse_source("MODULE A; BEGIN END B.");

        assert_eq!(
            Err(ParseError {
                message: "trailing name 'B' does not match module 'A'".into(),
                position: (1, 21),
            }),
            result
        );
    }

    #[test]
    fn test_parse_mul_binds_tighter_than_add() {
        let body = parse_body("x := 1 + 2 * 3;");

        let [Statement::Assignment(assignment)] = body.as_slice() else {
            panic!("expected a single assignment");
        };
        let Expression::Binary(add) = &assignment.value else {
            panic!("expected a binary expression");
        };
        assert_eq!(BinaryOp::Add, add.op);
        let Expression::Binary(mul) = add.rhs.as_ref() else {
            panic!("expected the multiplication on the right");
        };
        assert_eq!(BinaryOp::Mul, mul.op);
    }

    #[test]
    fn test_parse_addition_is_left_associative() {
        let body = parse_body("x := 1 - 2 - 3;");

        let [Statement::Assignment(assignment)] = body.as_slice() else {
            panic!("expected a single assignment");
        };
        let Expression::Binary(outer) = &assignment.value else {
            panic!("expected a binary expression");
        };
        assert_eq!(BinaryOp::Sub, outer.op);
        assert!(matches!(outer.lhs.as_ref(), Expression::Binary(_)));
        assert!(matches!(outer.rhs.as_ref(), Expression::Literal(_)));
    }

    #[test]
    fn test_parse_index_sugar() {
        let comma = parse_body("x := y; y[1, 2] := 0;");
        let bracket = parse_body("x := y; y[1][2] := 0;");

        assert_eq!(comma, bracket);
    }

    #[test]
    fn test_parse_array_type_shorthand() {
        let module = parse_source("MODULE M; VAR m: ARRAY 2, 3 OF INTEGER; BEGIN END M.")
            .expect("parsing failed");

        let [Declaration::Var(var)] = module.declarations.as_slice() else {
            panic!("expected a single VAR declaration");
        };
        assert_eq!(
            TypeExpr::Array {
                lengths: vec![2, 3],
                element: Box::new(TypeExpr::Integer),
            },
            var.type_expr
        );
    }

    #[test]
    fn test_parse_procedure_with_return_type() {
        let module = parse_source(
            "MODULE F; PROCEDURE f(n: INTEGER): INTEGER; BEGIN RETURN n; END f; BEGIN END F.",
        )
        .expect("parsing failed");

        let [Declaration::Proc(proc)] = module.declarations.as_slice() else {
            panic!("expected a single procedure");
        };
        assert_eq!("f", proc.name);
        assert_eq!(1, proc.params.len());
        assert_eq!(Some(TypeExpr::Integer), proc.return_type);
        assert!(matches!(proc.body.as_slice(), [Statement::Return(_)]));
    }

    #[test]
    fn test_parse_unexpected_token() {
        let result = parse_source("MODULE X; BEGIN x := ; END X.");

        assert_eq!(
            Err(ParseError {
                message: "expected an expression, got ';'".into(),
                position: (1, 22),
            }),
            result
        );
    }

    #[test]
    fn test_parse_dangling_else_belongs_to_if() {
        let body = parse_body("IF x < y THEN x := 1; ELSE x := 2; END;");

        let [Statement::If(if_statement)] = body.as_slice() else {
            panic!("expected a single IF");
        };
        assert_eq!(1, if_statement.then_branch.len());
        assert_eq!(1, if_statement.else_branch.as_ref().map(Vec::len).unwrap_or(0));
    }
}
