mod lexmap;
mod token;

pub use lexmap::*;
pub use token::*;

use lazy_static::lazy_static;
use std::{error::Error, fmt::Display};

#[macro_export]
macro_rules! keyword {
    ($map:ident, $name:ident, $value:expr) => {
        $map.insert($value, Keyword::$name);
    };
}

lazy_static! {
    pub static ref LEX_MAP: LexMap = {
        let mut m = LexMap::default();

        keyword!(m, Function, "function");
        keyword!(m, Return, "return");
        keyword!(m, Println, "println");
        keyword!(m, Print, "print");
        keyword!(m, If, "if");
        keyword!(m, Else, "else");
        keyword!(m, Endif, "endif");
        keyword!(m, While, "while");
        keyword!(m, Endwhile, "endwhile");
        keyword!(m, Global, "global");
        keyword!(m, Comma, ",");
        keyword!(m, Assign, "=");
        keyword!(m, Or, "or");
        keyword!(m, And, "and");
        keyword!(m, Not, "!");
        keyword!(m, BitOr, "|");
        keyword!(m, BitAnd, "&");
        keyword!(m, BitXor, "^");
        keyword!(m, Equal, "==");
        keyword!(m, NotEqual, "!=");
        keyword!(m, Less, "<");
        keyword!(m, Leq, "<=");
        keyword!(m, Greater, ">");
        keyword!(m, Geq, ">=");
        keyword!(m, Shl, "<<");
        keyword!(m, Shr, ">>");
        keyword!(m, Plus, "+");
        keyword!(m, Minus, "-");
        keyword!(m, Times, "*");
        keyword!(m, Divide, "/");
        keyword!(m, Modulo, "%");
        keyword!(m, LParen, "(");
        keyword!(m, RParen, ")");
        keyword!(m, LBracket, "[");
        keyword!(m, RBracket, "]");
        keyword!(m, Colon, ":");
        keyword!(m, Quote, "\"");
        keyword!(m, GotoBinary, "goto");
        keyword!(m, GotoUnary, "goto*");
        keyword!(m, UnaryMinus, "-$");
        keyword!(m, UnaryPlus, "+$");

        m
    };
}

const PUNCTUATIONS: &str = "+,-*/%^|&!()[]:<>=\"";

fn is_punct_char(c: u8) -> bool {
    PUNCTUATIONS.as_bytes().contains(&c)
}

#[derive(Debug, Clone, PartialEq)]
pub struct LexError(String);

pub type LexResult<T> = Result<T, LexError>;

impl LexError {
    fn new(message: impl Into<String>, position: Position) -> Self {
        let message = message.into();
        LexError(format!("{message} at {}:{}", position.0, position.1))
    }
}

impl Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[PARSER EXCEPTION] {}", self.0)
    }
}

impl Error for LexError {}

pub type TokenLine = Vec<Token>;

/// Splits the input into lines of tokens. Empty and comment-only source
/// lines produce empty token lines; later stages rely on line indices being
/// stable.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    input: &'a str,
    lines: Vec<TokenLine>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            lines: vec![],
        }
    }

    pub fn lex(mut self) -> LexResult<Vec<TokenLine>> {
        for (index, line) in self.input.lines().enumerate() {
            let cursor = LineCursor::new(line, index + 1);
            self.lines.push(cursor.run()?);
        }

        Ok(self.lines)
    }
}

struct LineCursor<'a> {
    line: &'a str,
    bytes: &'a [u8],
    line_no: usize,
    index: usize,
    tokens: TokenLine,
}

impl<'a> LineCursor<'a> {
    fn new(line: &'a str, line_no: usize) -> Self {
        Self {
            line,
            bytes: line.as_bytes(),
            line_no,
            index: 0,
            tokens: vec![],
        }
    }

    fn position(&self) -> Position {
        (self.line_no, self.index + 1)
    }

    fn run(mut self) -> LexResult<TokenLine> {
        while let Some(&c) = self.bytes.get(self.index) {
            if c.is_ascii_whitespace() {
                self.index += 1;
            } else if c == b'#' {
                break;
            } else if c.is_ascii_digit() {
                self.lex_number()?;
            } else if c.is_ascii_alphabetic() || c == b'_' {
                self.lex_word();
            } else if c == b'"' {
                self.lex_literal()?;
            } else if is_punct_char(c) {
                self.lex_punctuation()?;
            } else {
                return Err(LexError::new("Invalid character", self.position()));
            }
        }

        Ok(self.tokens)
    }

    fn lex_number(&mut self) -> LexResult<()> {
        let start = self.index;
        let position = self.position();
        let mut has_dot = false;

        while let Some(&c) = self.bytes.get(self.index) {
            if c.is_ascii_digit() {
                self.index += 1;
            } else if c == b'.' && !has_dot {
                has_dot = true;
                self.index += 1;
            } else {
                break;
            }
        }

        if let Some(&c) = self.bytes.get(self.index) {
            if !c.is_ascii_whitespace() && c != b'#' && !is_punct_char(c) {
                return Err(LexError::new("Invalid character after number", self.position()));
            }
        }

        let text = &self.line[start..self.index];
        if text.bytes().all(|c| c == b'.') {
            return Err(LexError::new("Invalid number format", position));
        }

        let token = if has_dot {
            match text.parse::<f64>() {
                Ok(value) => Token::Float { value, position },
                Err(_) => return Err(LexError::new("Invalid number format", position)),
            }
        } else {
            match text.parse::<i64>() {
                Ok(value) => Token::Int { value, position },
                Err(_) => return Err(LexError::new("Invalid number format", position)),
            }
        };

        self.tokens.push(token);
        Ok(())
    }

    fn lex_word(&mut self) {
        let start = self.index;
        let position = self.position();

        while let Some(&c) = self.bytes.get(self.index) {
            if c.is_ascii_alphanumeric() || c == b'_' {
                self.index += 1;
            } else {
                break;
            }
        }

        let word = &self.line[start..self.index];
        let token = match word {
            "true" => Token::Bool {
                value: true,
                position,
            },
            "false" => Token::Bool {
                value: false,
                position,
            },
            _ => match LEX_MAP.get(word) {
                Some(keyword) => Token::Kw { keyword, position },
                None => Token::Id {
                    value: word.to_owned(),
                    position,
                },
            },
        };

        self.tokens.push(token);
    }

    fn lex_literal(&mut self) -> LexResult<()> {
        let position = self.position();
        self.index += 1;
        let start = self.index;

        while let Some(&c) = self.bytes.get(self.index) {
            if c == b'"' {
                let value = self.line[start..self.index].to_owned();
                self.index += 1;
                self.tokens.push(Token::Str { value, position });
                return Ok(());
            }
            self.index += 1;
        }

        Err(LexError::new("Incomplete literal", position))
    }

    /// Maximal munch: take the longest run of punctuation characters, then
    /// shrink it from the right until it matches a known spelling.
    fn lex_punctuation(&mut self) -> LexResult<()> {
        let start = self.index;
        let position = self.position();

        while let Some(&c) = self.bytes.get(self.index) {
            if is_punct_char(c) {
                self.index += 1;
            } else {
                break;
            }
        }

        let mut len = self.index - start;
        while len > 0 && !LEX_MAP.is_keyword(&self.line[start..start + len]) {
            len -= 1;
        }

        let Some(keyword) = LEX_MAP.get(&self.line[start..start + len]) else {
            return Err(LexError::new("Invalid character", position));
        };

        self.index = start + len;
        self.tokens.push(Token::Kw { keyword, position });
        Ok(())
    }
}
