mod scope;
mod value;

pub use value::Value;

use std::{error::Error, fmt::Display};

use log::{debug, trace};

use crate::compiler::{Function, FunctionMap, PostfixLine, GLOBAL_FUNC};
use crate::lexer::{Class, Keyword, Position, Token};

use self::scope::ScopeStack;

#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeError(String);

pub type RuntimeResult<T> = Result<T, RuntimeError>;

impl RuntimeError {
    fn new(message: impl Into<String>) -> Self {
        RuntimeError(message.into())
    }

    fn at(message: impl Into<String>, position: Position) -> Self {
        let message = message.into();
        RuntimeError(format!("{message} at {}:{}", position.0, position.1))
    }
}

impl Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[RUNTIME EXCEPTION] {}", self.0)
    }
}

impl Error for RuntimeError {}

/// A slot on the per-line value stack: either a computed value or a name
/// that is resolved by the operator consuming it.
#[derive(Debug, Clone)]
enum Operand {
    Value(Value),
    Id { name: String, position: Position },
}

/// What a postfix line decided about control flow.
enum LineResult {
    Next,
    Jump(usize),
    Return(bool),
}

pub struct Interpreter<'a> {
    functions: &'a FunctionMap,
    scopes: ScopeStack,
    call_stack: Vec<Value>,
    active: Vec<String>,
}

impl<'a> Interpreter<'a> {
    pub fn new(functions: &'a FunctionMap) -> Self {
        Self {
            functions,
            scopes: ScopeStack::default(),
            call_stack: vec![],
            active: vec![],
        }
    }

    /// Execute `@global`, then `main` if the program defines one. Top-level
    /// return values are dropped.
    pub fn run(&mut self) -> RuntimeResult<()> {
        if self.call(GLOBAL_FUNC)? {
            self.call_stack.pop();
        }

        if self.functions.contains_key("main") && self.call("main")? {
            self.call_stack.pop();
        }

        Ok(())
    }

    /// Enter a function: bind its parameters from the call stack, run the
    /// body, and tear the frame down again. The `@global` frame is the one
    /// exception; it stays, since it doubles as the global scope. Returns
    /// whether the function produced a return value (left on the call
    /// stack for the caller to adopt).
    fn call(&mut self, name: &str) -> RuntimeResult<bool> {
        let Some(function) = self.functions.get(name) else {
            return Err(RuntimeError::new(format!(
                "Function with name `{name}` does not exist"
            )));
        };

        if self.call_stack.len() < function.params().len() {
            return Err(RuntimeError::new(format!(
                "Not enough arguments for function `{name}`"
            )));
        }

        debug!(
            "entering `{name}` with {} argument(s)",
            function.params().len()
        );

        self.scopes.push_frame();
        let args = self
            .call_stack
            .split_off(self.call_stack.len() - function.params().len());
        for (param, value) in function.params().iter().rev().zip(args.into_iter().rev()) {
            self.scopes.assign(param, value);
        }

        self.active.push(name.to_owned());
        let returned = self.run_function(function);
        self.active.pop();

        if name != GLOBAL_FUNC {
            self.scopes.pop_frame();
        }

        debug!("leaving `{name}`");
        returned
    }

    fn run_function(&mut self, function: &Function) -> RuntimeResult<bool> {
        let postfix = function.postfix();
        let mut index = 0;

        while let Some(line) = postfix.get(index) {
            match self.run_line(line)? {
                LineResult::Next => index += 1,
                LineResult::Jump(target) => index = target,
                LineResult::Return(has_value) => return Ok(has_value),
            }
        }

        Ok(false)
    }

    /// Evaluate one postfix line left to right. The value stack is local to
    /// the line and discarded at its end.
    fn run_line(&mut self, line: &PostfixLine) -> RuntimeResult<LineResult> {
        let mut stack: Vec<Operand> = vec![];

        let context = self.active.last().cloned().unwrap_or_default();

        for token in line {
            trace!("[{context}] processing {token}");

            match token {
                Token::Int { value, .. } => stack.push(Operand::Value(Value::Int(*value))),
                Token::Float { value, .. } => stack.push(Operand::Value(Value::Float(*value))),
                Token::Str { value, .. } => {
                    stack.push(Operand::Value(Value::Str(value.clone())))
                }
                Token::Bool { value, .. } => stack.push(Operand::Value(Value::Bool(*value))),
                Token::Id { value, position } => {
                    if self.functions.contains_key(value) {
                        self.run_call(value, &mut stack, *position)?;
                    } else {
                        stack.push(Operand::Id {
                            name: value.clone(),
                            position: *position,
                        });
                    }
                }
                Token::Kw { keyword, position } => {
                    if stack.is_empty() && *keyword != Keyword::Return {
                        return Err(RuntimeError::at(
                            format!("Unexpected operator `{}`", keyword.spelling()),
                            *position,
                        ));
                    }

                    match keyword {
                        Keyword::Return => {
                            let Some(top) = stack.pop() else {
                                return Ok(LineResult::Return(false));
                            };
                            let value = self.resolve(top)?;
                            self.call_stack.push(value);
                            return Ok(LineResult::Return(true));
                        }
                        Keyword::GotoUnary => {
                            let target = match stack.pop() {
                                Some(Operand::Value(Value::Int(target))) => target,
                                _ => {
                                    return Err(RuntimeError::at(
                                        "Non-integer goto target",
                                        *position,
                                    ))
                                }
                            };
                            return Ok(LineResult::Jump(jump_target(target, *position)?));
                        }
                        Keyword::GotoBinary => {
                            if stack.len() < 2 {
                                return Err(RuntimeError::at("Not enough operands", *position));
                            }
                            let target = match stack.pop() {
                                Some(Operand::Value(Value::Int(target))) => target,
                                _ => {
                                    return Err(RuntimeError::at(
                                        "Integer position expected for goto",
                                        *position,
                                    ))
                                }
                            };
                            let condition = match stack.pop() {
                                Some(Operand::Value(Value::Bool(condition))) => condition,
                                _ => {
                                    return Err(RuntimeError::at(
                                        "Boolean expected for goto",
                                        *position,
                                    ))
                                }
                            };
                            // the jump fragment ends its line either way
                            return if condition {
                                Ok(LineResult::Jump(jump_target(target, *position)?))
                            } else {
                                Ok(LineResult::Next)
                            };
                        }
                        Keyword::Global => match stack.pop() {
                            Some(Operand::Id { name, .. }) => {
                                self.scopes.declare_global(&name, *position)?
                            }
                            _ => {
                                return Err(RuntimeError::at(
                                    "Identifier expected after `global`",
                                    *position,
                                ))
                            }
                        },
                        Keyword::Assign => {
                            if stack.len() < 2 {
                                return Err(RuntimeError::at("Not enough operands", *position));
                            }
                            let Some(right) = stack.pop() else {
                                return Err(RuntimeError::at("Not enough operands", *position));
                            };
                            let value = self.resolve(right)?;
                            match stack.last() {
                                Some(Operand::Id { name, .. }) => {
                                    trace!("assigning {value} to `{name}`");
                                    self.scopes.assign(name, value);
                                }
                                _ => {
                                    return Err(RuntimeError::at(
                                        "Identifier expected on the left side of assignment",
                                        *position,
                                    ))
                                }
                            }
                            // the left operand stays on the stack so chains
                            // like `a = b = 3` assign right to left
                        }
                        _ => match keyword.class() {
                            Class::Prefix => {
                                let Some(top) = stack.last_mut() else {
                                    return Err(RuntimeError::at(
                                        "Not enough operands",
                                        *position,
                                    ));
                                };
                                self.apply_unary(*keyword, top, *position)?;
                            }
                            Class::Binary => {
                                if stack.len() < 2 {
                                    return Err(RuntimeError::at(
                                        "Not enough operands",
                                        *position,
                                    ));
                                }
                                let Some(right) = stack.pop() else {
                                    return Err(RuntimeError::at(
                                        "Not enough operands",
                                        *position,
                                    ));
                                };
                                let Some(left) = stack.pop() else {
                                    return Err(RuntimeError::at(
                                        "Not enough operands",
                                        *position,
                                    ));
                                };
                                let right = self.resolve(right)?;
                                let left = self.resolve(left)?;
                                let result = value::binary(*keyword, &left, &right, *position)?;
                                stack.push(Operand::Value(result));
                            }
                            _ => {
                                return Err(RuntimeError::at(
                                    format!("Unexpected keyword `{}`", keyword.spelling()),
                                    *position,
                                ))
                            }
                        },
                    }
                }
            }
        }

        Ok(LineResult::Next)
    }

    /// Pop the callee's arguments off the value stack, hand them over via
    /// the call stack (last argument on top) and adopt a returned value.
    fn run_call(
        &mut self,
        name: &str,
        stack: &mut Vec<Operand>,
        position: Position,
    ) -> RuntimeResult<()> {
        let Some(function) = self.functions.get(name) else {
            return Err(RuntimeError::at(
                format!("Function with name `{name}` does not exist"),
                position,
            ));
        };

        let params = function.params().len();
        if stack.len() < params {
            return Err(RuntimeError::at(
                format!("Not enough arguments in call of function `{name}`"),
                position,
            ));
        }

        let args = stack.split_off(stack.len() - params);
        for arg in args {
            let value = self.resolve(arg)?;
            self.call_stack.push(value);
        }

        if self.call(name)? {
            if let Some(result) = self.call_stack.pop() {
                stack.push(Operand::Value(result));
            }
        }

        Ok(())
    }

    /// Apply a prefix operator to the top of the stack without popping it.
    /// Identifiers are updated through their binding, so `-x` negates the
    /// stored value itself.
    fn apply_unary(
        &mut self,
        keyword: Keyword,
        top: &mut Operand,
        position: Position,
    ) -> RuntimeResult<()> {
        let value = match top {
            Operand::Id { name, .. } => self.scopes.get_mut(name, position)?,
            Operand::Value(value) => value,
        };

        match keyword {
            Keyword::Print => print!("{value}"),
            Keyword::Println => println!("{value}"),
            Keyword::UnaryMinus => value::negate(value, position)?,
            Keyword::Not => value::logical_not(value, position)?,
            other => {
                return Err(RuntimeError::at(
                    format!(
                        "Unexpected unary operator `{}` for {}",
                        other.spelling(),
                        value.type_name()
                    ),
                    position,
                ))
            }
        }

        Ok(())
    }

    fn resolve(&self, operand: Operand) -> RuntimeResult<Value> {
        match operand {
            Operand::Value(value) => Ok(value),
            Operand::Id { name, position } => self.scopes.get(&name, position).cloned(),
        }
    }
}

fn jump_target(target: i64, position: Position) -> RuntimeResult<usize> {
    usize::try_from(target)
        .map_err(|_| RuntimeError::at("Non-integer goto target", position))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile;
    use crate::lexer::Lexer;

    fn run_source(source: &str) -> RuntimeResult<()> {
        let lines = Lexer::new(source).lex().unwrap();
        let functions = compile(&lines).unwrap();
        Interpreter::new(&functions).run()
    }

    #[test]
    fn test_undefined_variable() {
        let result = run_source("a = b");

        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Variable with name `b` does not exist in this scope"));
    }

    #[test]
    fn test_string_comparison_is_runtime_error() {
        let result = run_source("a = \"a\" < \"b\"");

        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("[RUNTIME EXCEPTION] It is forbidden to compare strings"));
    }

    #[test]
    fn test_global_requires_existing_name() {
        let source = "function f()\nglobal g\nreturn\nf()";
        let result = run_source(source);

        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("does not exist in the global scope"));
    }

    #[test]
    fn test_local_assignment_does_not_touch_globals() {
        // without `global g` the function writes a local; the modulo check
        // blows up with `Modulo by zero` if the global had changed to 2
        let source = "g = 1\nfunction f()\ng = 2\nreturn\nf()\nchk = 1 % (2 - g)";
        assert_eq!(Ok(()), run_source(source));
    }

    #[test]
    fn test_global_assignment_updates_globals() {
        // two bumps must leave g == 3; a stale g == 1 hits `Modulo by zero`
        let source = "g = 1\nfunction f()\nglobal g\ng = g + 1\nreturn\nf()\nf()\nchk = 1 % (g - 1)";
        assert_eq!(Ok(()), run_source(source));
    }

    #[test]
    fn test_chained_assignment() {
        // both names end up bound to 3
        assert_eq!(Ok(()), run_source("a = b = 3\nchk = 1 % (a + b - 5)"));
    }

    #[test]
    fn test_unary_plus_is_rejected() {
        let result = run_source("a = +5");

        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Unexpected unary operator `+$`"));
    }

    #[test]
    fn test_non_boolean_condition() {
        let result = run_source("if 1\nendif");

        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Unexpected unary operator `!`"));
    }

    #[test]
    fn test_main_is_executed_after_globals() {
        // `main` sees `g` through an explicit global declaration
        let source = "g = 41\nfunction main()\nglobal g\ng = g + 1\nreturn\n";
        assert_eq!(Ok(()), run_source(source));
    }

    #[test]
    fn test_main_with_parameters_fails() {
        let result = run_source("function main(x)\nreturn x\n");

        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Not enough arguments for function `main`"));
    }

    #[test]
    fn test_returned_value_is_detached_from_callee() {
        let source = "function f()\nx = 1\nreturn x\ny = f()\nx = 2\nz = y == 1";
        assert_eq!(Ok(()), run_source(source));
    }
}
