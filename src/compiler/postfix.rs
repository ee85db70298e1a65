use crate::lexer::{Assoc, Class, Keyword, Position, Token, TokenLine};

use super::{Function, FunctionMap, PostfixLine, SyntaxError, SyntaxResult};

/// A pending `if`/`else`/`while` and the postfix line it originates from.
struct Block {
    keyword: Keyword,
    line: usize,
    position: Position,
}

/// Argument accounting for one in-progress call. `last_sep` is the token
/// index of the governing `(` or the most recent `,`.
struct CallInfo {
    arg_count: usize,
    last_sep: usize,
}

/// Shunting-Yard over every body line. Control flow is lowered into jump
/// fragments appended to already-emitted lines; `blocks` remembers where
/// each `if`/`while` originated so those lines can be patched later.
pub(super) fn generate_postfix(
    lines: &[&TokenLine],
    functions: &FunctionMap,
    function: &mut Function,
) -> SyntaxResult<()> {
    let mut blocks: Vec<Block> = vec![];

    for line in lines {
        let current = function.postfix.len();
        function.postfix.push(PostfixLine::new());

        let mut stack: Vec<Token> = vec![];
        let mut calls: Vec<CallInfo> = vec![];

        for (index, token) in line.iter().enumerate() {
            if token.is_constant() {
                function.postfix[current].push(token.clone());
                continue;
            }

            match token {
                Token::Id { value, position } => {
                    if functions.contains_key(value) {
                        match line.get(index + 1) {
                            Some(Token::Kw {
                                keyword: Keyword::LParen,
                                ..
                            }) => {}
                            _ => {
                                return Err(SyntaxError::at(
                                    format!("'(' expected after function name `{value}`"),
                                    *position,
                                ))
                            }
                        }
                        calls.push(CallInfo {
                            arg_count: 0,
                            last_sep: index + 1,
                        });
                        stack.push(token.clone());
                    } else {
                        function.postfix[current].push(token.clone());
                    }
                }
                Token::Kw { keyword, position } => match keyword {
                    Keyword::If | Keyword::While => blocks.push(Block {
                        keyword: *keyword,
                        line: current,
                        position: *position,
                    }),
                    Keyword::Else => match blocks.last_mut() {
                        Some(block) if block.keyword == Keyword::If => {
                            let target = function.postfix.len();
                            append_not_goto(&mut function.postfix[block.line], target, *position);
                            *block = Block {
                                keyword: Keyword::Else,
                                line: current,
                                position: *position,
                            };
                        }
                        _ => {
                            return Err(SyntaxError::at(
                                "`else` without matching `if`",
                                *position,
                            ))
                        }
                    },
                    Keyword::Endif => match blocks.pop() {
                        Some(block) if block.keyword == Keyword::If => {
                            let target = function.postfix.len();
                            append_not_goto(
                                &mut function.postfix[block.line],
                                target,
                                block.position,
                            );
                        }
                        Some(block) if block.keyword == Keyword::Else => {
                            // the true branch ends on the line right before
                            // the `else` line and jumps over the else body
                            let target = function.postfix.len();
                            let true_end = block.line.saturating_sub(1);
                            append_goto(&mut function.postfix[true_end], target, block.position);
                        }
                        _ => {
                            return Err(SyntaxError::at(
                                "`endif` without matching `if`",
                                *position,
                            ))
                        }
                    },
                    Keyword::Endwhile => match blocks.pop() {
                        Some(block) if block.keyword == Keyword::While => {
                            let target = function.postfix.len();
                            append_not_goto(
                                &mut function.postfix[block.line],
                                target,
                                block.position,
                            );
                            append_goto(&mut function.postfix[current], block.line, block.position);
                        }
                        _ => {
                            return Err(SyntaxError::at(
                                "`endwhile` without matching `while`",
                                *position,
                            ))
                        }
                    },
                    Keyword::Comma => {
                        let Some(call) = calls.last_mut() else {
                            return Err(SyntaxError::at(
                                "',' outside of a function call",
                                *position,
                            ));
                        };
                        if index == call.last_sep + 1 {
                            return Err(SyntaxError::at(
                                "Empty argument in function call",
                                *position,
                            ));
                        }
                        call.arg_count += 1;
                        call.last_sep = index;

                        loop {
                            match stack.last().and_then(Token::keyword) {
                                Some(Keyword::LParen) => break,
                                Some(keyword) if keyword.class() != Class::Bracket => {
                                    if let Some(top) = stack.pop() {
                                        function.postfix[current].push(top);
                                    }
                                }
                                _ => {
                                    return Err(SyntaxError::at(
                                        "Bracket mismatch or missed comma",
                                        *position,
                                    ))
                                }
                            }
                        }
                    }
                    Keyword::LParen | Keyword::LBracket => stack.push(token.clone()),
                    Keyword::RParen => {
                        loop {
                            match stack.pop() {
                                Some(Token::Kw {
                                    keyword: Keyword::LParen,
                                    ..
                                }) => break,
                                Some(top)
                                    if top.keyword().map(Keyword::class)
                                        == Some(Class::Bracket) =>
                                {
                                    return Err(SyntaxError::at(
                                        "Bracket mismatch",
                                        top.position(),
                                    ))
                                }
                                Some(top) => function.postfix[current].push(top),
                                None => {
                                    return Err(SyntaxError::at("Bracket mismatch", *position))
                                }
                            }
                        }

                        // a function identifier under the `(` closes its call
                        if let Some(Token::Id { value, .. }) = stack.last() {
                            let Some(call) = calls.pop() else {
                                return Err(SyntaxError::at("Bracket mismatch", *position));
                            };
                            let mut arg_count = call.arg_count;
                            if index > call.last_sep + 1 {
                                arg_count += 1;
                            }

                            let declared = functions
                                .get(value)
                                .map(|callee| callee.params.len())
                                .unwrap_or(0);
                            if arg_count < declared {
                                return Err(SyntaxError::at(
                                    format!("Not enough arguments in call of function `{value}`"),
                                    *position,
                                ));
                            }
                            if arg_count > declared {
                                return Err(SyntaxError::at(
                                    format!("Too many arguments in call of function `{value}`"),
                                    *position,
                                ));
                            }

                            if let Some(id) = stack.pop() {
                                function.postfix[current].push(id);
                            }
                        }
                    }
                    Keyword::RBracket => loop {
                        match stack.pop() {
                            Some(Token::Kw {
                                keyword: Keyword::LBracket,
                                ..
                            }) => break,
                            Some(top)
                                if top.keyword().map(Keyword::class) == Some(Class::Bracket) =>
                            {
                                return Err(SyntaxError::at("Bracket mismatch", top.position()))
                            }
                            Some(top) => function.postfix[current].push(top),
                            None => return Err(SyntaxError::at("Bracket mismatch", *position)),
                        }
                    },
                    _ => match keyword.class() {
                        Class::Binary => {
                            let keyword = match keyword {
                                Keyword::Plus if is_unary_position(line, index) => {
                                    Keyword::UnaryPlus
                                }
                                Keyword::Minus if is_unary_position(line, index) => {
                                    Keyword::UnaryMinus
                                }
                                other => *other,
                            };

                            if keyword.class() == Class::Prefix {
                                stack.push(Token::Kw {
                                    keyword,
                                    position: *position,
                                });
                                continue;
                            }

                            while let Some(top) = stack.last().and_then(Token::keyword) {
                                if top.class() == Class::Bracket {
                                    break;
                                }
                                let pops = top.precedence() < keyword.precedence()
                                    || (top.precedence() == keyword.precedence()
                                        && top.class() == Class::Binary
                                        && top.associativity() == Assoc::Left);
                                if !pops {
                                    break;
                                }
                                if let Some(top) = stack.pop() {
                                    function.postfix[current].push(top);
                                }
                            }
                            stack.push(Token::Kw {
                                keyword,
                                position: *position,
                            });
                        }
                        Class::Prefix => stack.push(token.clone()),
                        Class::Plain | Class::Bracket => {
                            return Err(SyntaxError::at("Unexpected token", *position))
                        }
                    },
                },
                _ => return Err(SyntaxError::at("Unexpected token", token.position())),
            }
        }

        while let Some(top) = stack.pop() {
            if top.keyword().map(Keyword::class) == Some(Class::Bracket) {
                return Err(SyntaxError::at("Bracket mismatch", top.position()));
            }
            function.postfix[current].push(top);
        }
    }

    if let Some(block) = blocks.last() {
        let terminator = match block.keyword {
            Keyword::While => "endwhile",
            _ => "endif",
        };
        return Err(SyntaxError::at(
            format!(
                "`{}` without matching `{terminator}`",
                block.keyword.spelling()
            ),
            block.position,
        ));
    }

    // sentinel for bodies whose last jump targets one past the end
    function.postfix.push(PostfixLine::new());

    Ok(())
}

/// A `+`/`-` at the start of an expression or right after an operator or
/// opening separator is a sign, not a binary operator.
fn is_unary_position(line: &TokenLine, index: usize) -> bool {
    let Some(previous) = index.checked_sub(1).and_then(|i| line.get(i)) else {
        return true;
    };

    match previous.keyword() {
        Some(Keyword::LParen) | Some(Keyword::LBracket) => true,
        Some(keyword) => matches!(keyword.class(), Class::Prefix | Class::Binary),
        None => false,
    }
}

/// `! P goto`: jump to line P when the value on top of the stack is false.
fn append_not_goto(line: &mut PostfixLine, target: usize, position: Position) {
    line.push(Token::Kw {
        keyword: Keyword::Not,
        position,
    });
    line.push(Token::Int {
        value: target as i64,
        position,
    });
    line.push(Token::Kw {
        keyword: Keyword::GotoBinary,
        position,
    });
}

/// `P goto*`: unconditional jump to line P.
fn append_goto(line: &mut PostfixLine, target: usize, position: Position) {
    line.push(Token::Int {
        value: target as i64,
        position,
    });
    line.push(Token::Kw {
        keyword: Keyword::GotoUnary,
        position,
    });
}
