use indexmap::IndexMap;
use mosaic_ids::{NodeId, TypeTag};

use crate::{Lexer, NodeRecord, ParseError, Result, SceneDocument, Token, Value, is_reference_field};

pub struct Parser<'a> {
    src: &'a str,
    lexer: Lexer<'a>,
    current: Token,
    line: usize,
    vars: IndexMap<String, Value>,
}

/// Parses a whole scene file.
pub fn parse_scene_text(src: &str) -> Result<SceneDocument> {
    Parser::new(src)?.parse_document()
}

impl<'a> Parser<'a> {
    pub fn new(src: &'a str) -> Result<Self> {
        let mut lexer = Lexer::new(src);
        let current = lexer.next_token()?;
        let line = lexer.token_line();
        Ok(Self {
            src,
            lexer,
            current,
            line,
            vars: IndexMap::new(),
        })
    }

    fn advance(&mut self) -> Result<()> {
        self.current = self.lexer.next_token()?;
        self.line = self.lexer.token_line();
        Ok(())
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        ParseError::Unexpected {
            line: self.line,
            expected: expected.to_string(),
            found: self.current.describe(),
        }
    }

    fn expect(&mut self, t: Token) -> Result<()> {
        if self.current != t {
            return Err(self.unexpected(&t.describe()));
        }
        self.advance()
    }

    fn expect_ident(&mut self) -> Result<String> {
        match std::mem::replace(&mut self.current, Token::Eof) {
            Token::Ident(s) => {
                self.advance()?;
                Ok(s)
            }
            other => {
                self.current = other;
                Err(self.unexpected("identifier"))
            }
        }
    }

    fn expect_close(&mut self, open: &str) -> Result<()> {
        self.expect(Token::LBracket)?;
        self.expect(Token::Slash)?;
        let line = self.line;
        let close = self.expect_ident()?;
        if close != open {
            return Err(ParseError::MismatchedClose {
                line,
                open: open.to_string(),
                close,
            });
        }
        self.expect(Token::RBracket)
    }
}

impl<'a> Parser<'a> {
    /// First pass: gather `@name = value` definitions so records may use variables
    /// declared further down the file. Values that cannot be resolved yet are left
    /// for the second pass to report.
    fn collect_vars(mut self) -> Result<IndexMap<String, Value>> {
        while self.current != Token::Eof {
            if self.current == Token::At {
                self.advance()?;
                if let Token::Ident(name) = &self.current {
                    let name = name.clone();
                    self.advance()?;
                    if self.current == Token::Equals {
                        self.advance()?;
                        match self.parse_value(&name) {
                            Ok(value) => {
                                self.vars.insert(name, value);
                            }
                            Err(ParseError::UnknownVariable { .. }) => {}
                            Err(err) => return Err(err),
                        }
                    }
                }
                continue;
            }
            self.advance()?;
        }

        Ok(self.vars)
    }

    fn parse_value(&mut self, field: &str) -> Result<Value> {
        match &self.current {
            Token::Number(n) => {
                let v = *n;
                self.advance()?;
                Ok(Value::Number(v))
            }

            Token::String(s) => {
                let v = s.clone();
                self.advance()?;
                Ok(Value::Str(v))
            }

            Token::At => {
                self.advance()?;
                let line = self.line;
                let name = self.expect_ident()?;
                self.vars
                    .get(&name)
                    .cloned()
                    .ok_or(ParseError::UnknownVariable { line, name })
            }

            Token::Ident(name) => {
                let value = match name.as_str() {
                    "true" => Value::Bool(true),
                    "false" => Value::Bool(false),
                    _ => Value::Ident(name.clone()),
                };
                self.advance()?;
                Ok(value)
            }

            Token::LParen => self.parse_list(field),

            _ => Err(self.unexpected("a value")),
        }
    }

    fn parse_list(&mut self, field: &str) -> Result<Value> {
        let line = self.line;
        self.expect(Token::LParen)?;

        let mut nums = Vec::new();
        let mut idents = Vec::new();
        loop {
            match &self.current {
                Token::RParen => break,
                Token::Number(n) => nums.push(*n),
                Token::Ident(s) => idents.push(s.clone()),
                _ => return Err(self.unexpected("number, identifier or `)`")),
            }
            self.advance()?;
            match self.current {
                Token::Comma => self.advance()?,
                Token::RParen => break,
                _ => return Err(self.unexpected("`,` or `)`")),
            }
        }
        self.expect(Token::RParen)?;

        match (nums.is_empty(), idents.is_empty()) {
            (_, true) => Ok(Value::Tuple(nums)),
            (true, false) => Ok(Value::IdentList(idents)),
            (false, false) => Err(ParseError::InvalidValue {
                line,
                field: field.to_string(),
                reason: "list mixes numbers and identifiers".to_string(),
            }),
        }
    }
}

impl<'a> Parser<'a> {
    fn parse_record(&mut self) -> Result<NodeRecord> {
        self.expect(Token::LBracket)?;
        let id = self.expect_ident()?;
        self.expect(Token::RBracket)?;

        let mut name = None;
        while matches!(self.current, Token::Ident(_)) {
            let line = self.line;
            let key = self.expect_ident()?;
            self.expect(Token::Equals)?;
            let value = self.parse_value(&key)?;
            match key.as_str() {
                "name" => match value {
                    Value::Str(s) => name = Some(s),
                    _ => {
                        return Err(ParseError::InvalidValue {
                            line,
                            field: key,
                            reason: "expected a string".to_string(),
                        });
                    }
                },
                _ => return Err(ParseError::UnknownRecordField { line, field: key }),
            }
        }

        self.expect(Token::LBracket)?;
        let node_type = self.expect_ident()?;
        self.expect(Token::RBracket)?;

        let mut references: IndexMap<String, Vec<NodeId>> = IndexMap::new();
        let mut attributes: IndexMap<String, Value> = IndexMap::new();

        loop {
            match &self.current {
                Token::Ident(_) => {
                    let line = self.line;
                    let key = self.expect_ident()?;
                    self.expect(Token::Equals)?;
                    let value = self.parse_value(&key)?;

                    if references.contains_key(&key) || attributes.contains_key(&key) {
                        return Err(ParseError::DuplicateField { line, field: key });
                    }

                    if is_reference_field(&key) {
                        let targets =
                            value
                                .as_reference_targets()
                                .ok_or_else(|| ParseError::InvalidValue {
                                    line,
                                    field: key.clone(),
                                    reason: "expected a node id or a list of node ids".to_string(),
                                })?;
                        references.insert(key, targets);
                    } else {
                        attributes.insert(key, value);
                    }
                }

                Token::LBracket => {
                    self.expect_close(&node_type)?;
                    break;
                }

                _ => return Err(self.unexpected(&format!("field or `[/{node_type}]`"))),
            }
        }

        self.expect_close(&id)?;

        Ok(NodeRecord {
            id: NodeId::from(id),
            node_type: TypeTag::from(node_type),
            name,
            references,
            attributes,
        })
    }

    fn parse_document_inner(mut self) -> Result<SceneDocument> {
        let mut document = SceneDocument::default();

        loop {
            match self.current {
                Token::Eof => break,

                Token::At => {
                    self.advance()?;
                    let name = self.expect_ident()?;
                    self.expect(Token::Equals)?;
                    let value = self.parse_value(&name)?;
                    self.vars.insert(name.clone(), value.clone());
                    document.vars.insert(name, value);
                }

                Token::LBracket => {
                    let record = self.parse_record()?;
                    document.records.push(record);
                }

                _ => return Err(self.unexpected("`@` or `[`")),
            }
        }

        Ok(document)
    }

    pub fn parse_document(self) -> Result<SceneDocument> {
        let vars = Parser::new(self.src)?.collect_vars()?;
        let mut parser = self;
        parser.vars = vars;
        parser.parse_document_inner()
    }
}
