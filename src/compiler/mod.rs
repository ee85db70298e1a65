mod postfix;

use std::{collections::HashMap, error::Error, fmt::Display};

use log::debug;

use crate::lexer::{Keyword, Position, Token, TokenLine};

use self::postfix::generate_postfix;

/// Name of the synthetic function holding all top-level statements. It is
/// executed first and its variable table doubles as the global scope.
pub const GLOBAL_FUNC: &str = "@global";

#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxError(String);

pub type SyntaxResult<T> = Result<T, SyntaxError>;

impl SyntaxError {
    fn new(message: impl Into<String>) -> Self {
        SyntaxError(message.into())
    }

    fn at(message: impl Into<String>, position: Position) -> Self {
        let message = message.into();
        SyntaxError(format!("{message} at {}:{}", position.0, position.1))
    }
}

impl Display for SyntaxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[SYNTAX EXCEPTION] {}", self.0)
    }
}

impl Error for SyntaxError {}

pub type PostfixLine = Vec<Token>;

/// A compiled function: its parameters and one postfix line per body line.
/// Jump targets are indices into the postfix list.
#[derive(Debug, Clone)]
pub struct Function {
    name: String,
    params: Vec<String>,
    postfix: Vec<PostfixLine>,
}

impl Function {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: vec![],
            postfix: vec![],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn postfix(&self) -> &[PostfixLine] {
        &self.postfix
    }
}

pub type FunctionMap = HashMap<String, Function>;

/// Translate lexed lines into the map of compiled functions. Function
/// definitions are compiled in source order; top-level statements end up in
/// the body of `@global`, which is compiled last so it can call anything.
pub fn compile(lines: &[TokenLine]) -> SyntaxResult<FunctionMap> {
    let mut functions = FunctionMap::new();
    let mut global_lines: Vec<&TokenLine> = vec![];

    let mut index = 0;
    while index < lines.len() {
        let line = &lines[index];
        if first_keyword(line) == Some(Keyword::Function) {
            let mut function = parse_header(line)?;
            let declared_at = line[0].position();
            let body_end = find_return(lines, index + 1, function.name(), declared_at)?;
            let body: Vec<&TokenLine> = lines[index + 1..=body_end].iter().collect();

            // Register the header first so the body can call the function
            // it belongs to.
            functions.insert(function.name().to_owned(), function.clone());
            generate_postfix(&body, &functions, &mut function)?;
            functions.insert(function.name().to_owned(), function);

            index = body_end + 1;
        } else {
            global_lines.push(line);
            index += 1;
        }
    }

    let mut global = Function::new(GLOBAL_FUNC);
    generate_postfix(&global_lines, &functions, &mut global)?;
    functions.insert(GLOBAL_FUNC.to_owned(), global);

    if log::log_enabled!(log::Level::Debug) {
        dump(&functions);
    }

    Ok(functions)
}

fn first_keyword(line: &TokenLine) -> Option<Keyword> {
    line.first().and_then(Token::keyword)
}

/// Parse `function NAME ( [ID {, ID}] )`; nothing may follow the `)`.
fn parse_header(line: &TokenLine) -> SyntaxResult<Function> {
    let declared_at = line[0].position();

    let name = match line.get(1) {
        Some(Token::Id { value, .. }) => value.clone(),
        _ => return Err(SyntaxError::at("Function name expected after token", declared_at)),
    };

    match line.get(2) {
        Some(Token::Kw {
            keyword: Keyword::LParen,
            ..
        }) => {}
        _ => {
            let position = line[1].position();
            return Err(SyntaxError::at("'(' expected after token", position));
        }
    }

    let mut function = Function::new(name);
    let mut index = 3;
    loop {
        match line.get(index) {
            Some(Token::Kw {
                keyword: Keyword::RParen,
                position,
            }) => {
                if index + 1 != line.len() {
                    return Err(SyntaxError::at(
                        "Extra tokens after ')' in the function declaration",
                        *position,
                    ));
                }
                break;
            }
            Some(Token::Id { value, .. }) => {
                function.params.push(value.clone());
                match line.get(index + 1) {
                    Some(Token::Kw {
                        keyword: Keyword::Comma,
                        ..
                    }) => index += 2,
                    Some(Token::Kw {
                        keyword: Keyword::RParen,
                        position,
                    }) => {
                        if index + 2 != line.len() {
                            return Err(SyntaxError::at(
                                "Extra tokens after ')' in the function declaration",
                                *position,
                            ));
                        }
                        break;
                    }
                    Some(token) => {
                        return Err(SyntaxError::at(
                            "',' or ')' expected after parameter",
                            token.position(),
                        ))
                    }
                    None => {
                        return Err(SyntaxError::at(
                            "')' expected in the function declaration",
                            declared_at,
                        ))
                    }
                }
            }
            Some(token) => {
                return Err(SyntaxError::at(
                    "Parameter identifier expected",
                    token.position(),
                ))
            }
            None => {
                return Err(SyntaxError::at(
                    "')' expected in the function declaration",
                    declared_at,
                ))
            }
        }
    }

    Ok(function)
}

/// Find the line terminating a function body: the first `return` at block
/// depth zero. A `return` inside an `if`/`while` block belongs to the body.
fn find_return(
    lines: &[TokenLine],
    start: usize,
    name: &str,
    declared_at: Position,
) -> SyntaxResult<usize> {
    let mut depth = 0usize;

    for (index, line) in lines.iter().enumerate().skip(start) {
        match first_keyword(line) {
            Some(Keyword::Function) => break,
            Some(Keyword::If) | Some(Keyword::While) => depth += 1,
            Some(Keyword::Endif) | Some(Keyword::Endwhile) => depth = depth.saturating_sub(1),
            Some(Keyword::Return) if depth == 0 => return Ok(index),
            _ => {}
        }
    }

    Err(SyntaxError::new(format!(
        "Return statement for function `{name}` declared at {}:{} not found",
        declared_at.0, declared_at.1
    )))
}

fn dump(functions: &FunctionMap) {
    debug!("postfix form for {} function(s):", functions.len());
    for function in functions.values() {
        debug!(
            "function `{}`({})",
            function.name(),
            function.params().join(", ")
        );
        for (index, line) in function.postfix().iter().enumerate() {
            let rendered = line
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" ");
            debug!("{index:>3}| {rendered}");
        }
    }
}
