use crate::{ParseError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String), // name, parentNodeRef, ModelHierarchyNode3
    Number(f64),
    String(String),

    At,     // @
    Equals, // =
    Comma,  // ,
    LParen, // (
    RParen, // )

    LBracket, // [
    RBracket, // ]

    Slash, // /
    Eof,
}

impl Token {
    /// Short human description used in error messages.
    pub fn describe(&self) -> String {
        match self {
            Token::Ident(s) => format!("identifier `{s}`"),
            Token::Number(n) => format!("number `{n}`"),
            Token::String(s) => format!("string \"{s}\""),
            Token::At => "`@`".to_string(),
            Token::Equals => "`=`".to_string(),
            Token::Comma => "`,`".to_string(),
            Token::LParen => "`(`".to_string(),
            Token::RParen => "`)`".to_string(),
            Token::LBracket => "`[`".to_string(),
            Token::RBracket => "`]`".to_string(),
            Token::Slash => "`/`".to_string(),
            Token::Eof => "end of input".to_string(),
        }
    }
}

pub struct Lexer<'a> {
    chars: std::str::Chars<'a>,
    peek: Option<char>,
    line: usize,
    token_line: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        let mut chars = src.chars();
        let peek = chars.next();
        Self {
            chars,
            peek,
            line: 1,
            token_line: 1,
        }
    }

    /// Line on which the most recently returned token started.
    pub fn token_line(&self) -> usize {
        self.token_line
    }

    fn bump(&mut self) -> Option<char> {
        let cur = self.peek;
        self.peek = self.chars.next();
        if cur == Some('\n') {
            self.line += 1;
        }
        cur
    }

    fn skip_ws(&mut self) {
        loop {
            match self.peek {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                // `#` comments run to end of line
                Some('#') => {
                    while !matches!(self.peek, None | Some('\n')) {
                        self.bump();
                    }
                }
                _ => break,
            }
        }
    }

    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_ws();

        let line = self.line;
        self.token_line = line;
        let c = match self.bump() {
            Some(c) => c,
            None => return Ok(Token::Eof),
        };

        let token = match c {
            '@' => Token::At,
            '=' => Token::Equals,
            ',' => Token::Comma,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            '/' => Token::Slash,

            '"' => {
                let mut s = String::new();
                loop {
                    match self.bump() {
                        Some('"') => break,
                        Some('\\') => match self.bump() {
                            Some('n') => s.push('\n'),
                            Some('t') => s.push('\t'),
                            Some(other) => s.push(other),
                            None => return Err(ParseError::UnterminatedString { line }),
                        },
                        Some(c) => s.push(c),
                        None => return Err(ParseError::UnterminatedString { line }),
                    }
                }
                Token::String(s)
            }

            c if c.is_ascii_digit() || c == '-' => {
                let mut s = String::new();
                s.push(c);
                while let Some(p) = self.peek {
                    if !(p.is_ascii_digit() || p == '.') {
                        break;
                    }
                    s.push(p);
                    self.bump();
                }
                let n = s
                    .parse::<f64>()
                    .map_err(|_| ParseError::InvalidNumber { line, text: s })?;
                Token::Number(n)
            }

            c if c.is_alphanumeric() || c == '_' => {
                let mut s = String::new();
                s.push(c);
                while let Some(p) = self.peek {
                    if !(p.is_alphanumeric() || p == '_') {
                        break;
                    }
                    s.push(p);
                    self.bump();
                }
                Token::Ident(s)
            }

            ch => return Err(ParseError::UnexpectedChar { line, ch }),
        };

        Ok(token)
    }
}
