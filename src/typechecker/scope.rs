use std::collections::HashMap;

use crate::ast::{Literal, Position};

use super::{error::TypeError, Type};

/// What a name resolves to. Constants carry their folded value; procedures
/// carry their signature.
#[derive(Debug, Clone, PartialEq)]
pub enum Symbol {
    Const { value: Literal, ty: Type },
    Var { ty: Type },
    Param { ty: Type },
    Proc {
        params: Vec<Type>,
        return_type: Option<Type>,
    },
}

/// Stack of lexical scope frames: frame 0 is the module scope, one frame per
/// enclosing procedure above it. Declaration inserts into the innermost frame
/// only; lookup walks from the innermost frame outward.
#[derive(Default, Debug, Clone)]
pub struct TypeScope {
    frames: Vec<HashMap<String, Symbol>>,
}

impl TypeScope {
    /// Push a new scope frame.
    pub fn push(&mut self) {
        self.frames.push(HashMap::new());
    }

    /// Pop the innermost scope frame.
    pub fn pop(&mut self) {
        self.frames.pop();
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Find a symbol, returning the index of the frame declaring it
    /// (0 = module scope) along with the symbol.
    pub fn find(&self, name: &str) -> Option<(usize, &Symbol)> {
        for (index, frame) in self.frames.iter().enumerate().rev() {
            if let Some(symbol) = frame.get(name) {
                return Some((index, symbol));
            }
        }

        None
    }

    /// Declare a name in the innermost frame; duplicate names within one
    /// frame are rejected.
    pub fn declare(
        &mut self,
        name: &str,
        symbol: Symbol,
        position: Position,
    ) -> Result<(), TypeError> {
        let Some(frame) = self.frames.last_mut() else {
            return Err(TypeError {
                message: format!("no open scope to declare '{name}' in"),
                position,
            });
        };

        if frame.contains_key(name) {
            return Err(TypeError {
                message: format!("redeclaration of '{name}'"),
                position,
            });
        }

        frame.insert(name.to_owned(), symbol);
        Ok(())
    }
}

pub fn setup_scope() -> TypeScope {
    let mut scope = TypeScope::default();

    scope.push();

    scope
}
