//! Recursive-descent parser for the embedded SQL statement surface.

use nogdb_api::{PropertyType, RecordId};
use nogdb_core::{Error, Result, TraverseStrategy};

use crate::ast::*;
use crate::lexer::{Lexer, Token, TokenType};

pub struct Parser;

impl Parser {
    pub fn parse(input: &str) -> Result<Statement> {
        let tokens = Lexer::new(input).tokenize()?;
        let mut parser = TokenParser::new(tokens);
        let statement = parser.parse_statement()?;
        parser.match_token(&TokenType::Semicolon);
        parser.expect_eof()?;
        Ok(statement)
    }
}

struct TokenParser {
    tokens: Vec<Token>,
    position: usize,
}

impl TokenParser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    fn peek_type(&self) -> &TokenType {
        &self.peek().token_type
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.position < self.tokens.len() - 1 {
            self.position += 1;
        }
        token
    }

    fn check(&self, token_type: &TokenType) -> bool {
        self.peek_type() == token_type
    }

    fn match_token(&mut self, token_type: &TokenType) -> bool {
        if self.check(token_type) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume(&mut self, token_type: &TokenType, expected: &str) -> Result<Token> {
        if self.check(token_type) {
            Ok(self.advance())
        } else {
            Err(self.syntax_error(format!("expected {expected}")))
        }
    }

    fn syntax_error(&self, message: impl Into<String>) -> Error {
        let token = self.peek();
        Error::SyntaxError {
            message: message.into(),
            line: token.line,
            column: token.column,
        }
    }

    fn expect_eof(&self) -> Result<()> {
        if self.check(&TokenType::Eof) {
            Ok(())
        } else {
            Err(self.syntax_error("unexpected trailing input"))
        }
    }

    fn identifier(&mut self, expected: &str) -> Result<String> {
        match self.peek_type().clone() {
            TokenType::Identifier(name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.syntax_error(format!("expected {expected}"))),
        }
    }

    /// A plain (non-`@`) identifier, for class and property names.
    fn plain_identifier(&mut self, expected: &str) -> Result<String> {
        let name = self.identifier(expected)?;
        if name.starts_with('@') {
            return Err(self.syntax_error(format!("expected {expected}")));
        }
        Ok(name)
    }

    fn parse_statement(&mut self) -> Result<Statement> {
        match self.peek_type() {
            TokenType::Create => self.parse_create(),
            TokenType::Drop => self.parse_drop(),
            TokenType::Alter => self.parse_alter(),
            TokenType::Select => self.parse_select(),
            TokenType::Update => self.parse_update(),
            TokenType::Delete => self.parse_delete(),
            TokenType::Traverse => self.parse_traverse(),
            _ => Err(self.syntax_error("expected a statement keyword")),
        }
    }

    // --- DDL ---

    fn parse_create(&mut self) -> Result<Statement> {
        self.advance();
        match self.peek_type() {
            TokenType::Class => {
                self.advance();
                let name = self.class_name_token()?;
                let if_not_exists = self.parse_if_not_exists()?;
                self.consume(&TokenType::Extends, "EXTENDS")?;
                let extends = match self.peek_type().clone() {
                    TokenType::Vertex => {
                        self.advance();
                        Extends::Vertex
                    }
                    TokenType::Edge => {
                        self.advance();
                        Extends::Edge
                    }
                    TokenType::Identifier(_) => Extends::Class(self.plain_identifier("super class name")?),
                    _ => return Err(self.syntax_error("expected VERTEX, EDGE or a class name")),
                };
                Ok(Statement::CreateClass {
                    name,
                    extends,
                    if_not_exists,
                })
            }
            TokenType::Property => {
                self.advance();
                let (class, name) = self.parse_qualified_name()?;
                let if_not_exists = self.parse_if_not_exists()?;
                let property_type = self.parse_property_type()?;
                Ok(Statement::CreateProperty {
                    class,
                    name,
                    property_type,
                    if_not_exists,
                })
            }
            TokenType::Index => {
                self.advance();
                let (class, property) = self.parse_qualified_name()?;
                let unique = self.match_token(&TokenType::Unique);
                Ok(Statement::CreateIndex {
                    class,
                    property,
                    unique,
                })
            }
            TokenType::Vertex => {
                self.advance();
                let class = self.plain_identifier("class name")?;
                let set = if self.match_token(&TokenType::Set) {
                    self.parse_assignments()?
                } else {
                    Vec::new()
                };
                Ok(Statement::CreateVertex { class, set })
            }
            TokenType::Edge => {
                self.advance();
                let class = self.plain_identifier("class name")?;
                self.consume(&TokenType::From, "FROM")?;
                let from = self.parse_rid_set()?;
                self.consume(&TokenType::To, "TO")?;
                let to = self.parse_rid_set()?;
                let set = if self.match_token(&TokenType::Set) {
                    self.parse_assignments()?
                } else {
                    Vec::new()
                };
                Ok(Statement::CreateEdge {
                    class,
                    from,
                    to,
                    set,
                })
            }
            _ => Err(self.syntax_error("expected CLASS, PROPERTY, INDEX, VERTEX or EDGE")),
        }
    }

    /// Class names in DDL: an identifier, or a quoted string (which lets
    /// malformed names reach the engine's own validation).
    fn class_name_token(&mut self) -> Result<String> {
        match self.peek_type().clone() {
            TokenType::String(name) => {
                self.advance();
                Ok(name)
            }
            _ => self.plain_identifier("class name"),
        }
    }

    fn parse_if_not_exists(&mut self) -> Result<bool> {
        if self.match_token(&TokenType::If) {
            self.consume(&TokenType::Not, "NOT")?;
            self.consume(&TokenType::Exists, "EXISTS")?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn parse_if_exists(&mut self) -> Result<bool> {
        if self.match_token(&TokenType::If) {
            self.consume(&TokenType::Exists, "EXISTS")?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn parse_qualified_name(&mut self) -> Result<(String, String)> {
        let class = self.plain_identifier("class name")?;
        self.consume(&TokenType::Dot, "'.'")?;
        let name = self.plain_identifier("property name")?;
        Ok((class, name))
    }

    fn parse_property_type(&mut self) -> Result<PropertyType> {
        let word = self.identifier("property type")?;
        let ty = match word.to_ascii_uppercase().as_str() {
            "TINYINT" => PropertyType::TinyInt,
            "UNSIGNED_TINYINT" => PropertyType::UnsignedTinyInt,
            "SMALLINT" => PropertyType::SmallInt,
            "UNSIGNED_SMALLINT" => PropertyType::UnsignedSmallInt,
            "INTEGER" | "INT" => PropertyType::Integer,
            "UNSIGNED_INTEGER" | "UINT" => PropertyType::UnsignedInteger,
            "BIGINT" => PropertyType::BigInt,
            "UNSIGNED_BIGINT" | "UBIGINT" => PropertyType::UnsignedBigInt,
            "REAL" | "DOUBLE" => PropertyType::Real,
            "TEXT" => PropertyType::Text,
            "BLOB" => PropertyType::Blob,
            _ => return Err(self.syntax_error(format!("unknown property type {word}"))),
        };
        Ok(ty)
    }

    fn parse_drop(&mut self) -> Result<Statement> {
        self.advance();
        match self.peek_type() {
            TokenType::Class => {
                self.advance();
                let name = self.class_name_token()?;
                let if_exists = self.parse_if_exists()?;
                Ok(Statement::DropClass { name, if_exists })
            }
            TokenType::Property => {
                self.advance();
                let (class, name) = self.parse_qualified_name()?;
                let if_exists = self.parse_if_exists()?;
                Ok(Statement::DropProperty {
                    class,
                    name,
                    if_exists,
                })
            }
            TokenType::Index => {
                self.advance();
                let (class, property) = self.parse_qualified_name()?;
                Ok(Statement::DropIndex { class, property })
            }
            _ => Err(self.syntax_error("expected CLASS, PROPERTY or INDEX")),
        }
    }

    fn parse_alter(&mut self) -> Result<Statement> {
        self.advance();
        match self.peek_type() {
            TokenType::Class => {
                self.advance();
                let class = self.plain_identifier("class name")?;
                self.consume(&TokenType::Name, "NAME")?;
                let new_name = self.parse_name_literal()?;
                Ok(Statement::AlterClassName { class, new_name })
            }
            TokenType::Property => {
                self.advance();
                let (class, property) = self.parse_qualified_name()?;
                self.consume(&TokenType::Name, "NAME")?;
                let new_name = self.parse_name_literal()?;
                Ok(Statement::AlterPropertyName {
                    class,
                    property,
                    new_name,
                })
            }
            _ => Err(self.syntax_error("expected CLASS or PROPERTY")),
        }
    }

    fn parse_name_literal(&mut self) -> Result<String> {
        match self.peek_type().clone() {
            TokenType::String(name) => {
                self.advance();
                Ok(name)
            }
            TokenType::Identifier(_) => self.plain_identifier("new name"),
            _ => Err(self.syntax_error("expected a name")),
        }
    }

    // --- DML ---

    fn parse_assignments(&mut self) -> Result<Vec<(String, Literal)>> {
        let mut out = Vec::new();
        loop {
            let name = self.plain_identifier("property name")?;
            self.consume(&TokenType::Equals, "'='")?;
            let value = self.parse_literal()?;
            out.push((name, value));
            if !self.match_token(&TokenType::Comma) {
                break;
            }
        }
        Ok(out)
    }

    fn parse_literal(&mut self) -> Result<Literal> {
        let negative = self.match_token(&TokenType::Minus);
        let literal = match self.peek_type().clone() {
            TokenType::Integer(v) => {
                self.advance();
                Literal::Integer(if negative { -v } else { v })
            }
            TokenType::Real(v) => {
                self.advance();
                Literal::Real(if negative { -v } else { v })
            }
            TokenType::String(s) => {
                self.advance();
                Literal::Text(s)
            }
            TokenType::Blob(b) => {
                self.advance();
                Literal::Blob(b)
            }
            TokenType::Rid(rid) => {
                self.advance();
                Literal::Rid(rid)
            }
            TokenType::Null => {
                self.advance();
                Literal::Null
            }
            _ => return Err(self.syntax_error("expected a literal value")),
        };
        if negative && !matches!(literal, Literal::Integer(_) | Literal::Real(_)) {
            return Err(self.syntax_error("'-' applies to numbers only"));
        }
        Ok(literal)
    }

    fn parse_rid_set(&mut self) -> Result<Vec<RecordId>> {
        if self.match_token(&TokenType::LeftParen) {
            let mut rids = Vec::new();
            loop {
                rids.push(self.parse_rid()?);
                if !self.match_token(&TokenType::Comma) {
                    break;
                }
            }
            self.consume(&TokenType::RightParen, "')'")?;
            Ok(rids)
        } else {
            Ok(vec![self.parse_rid()?])
        }
    }

    fn parse_rid(&mut self) -> Result<RecordId> {
        match self.peek_type().clone() {
            TokenType::Rid(rid) => {
                self.advance();
                Ok(rid)
            }
            _ => Err(self.syntax_error("expected a record id (#class:position)")),
        }
    }

    fn parse_update(&mut self) -> Result<Statement> {
        self.advance();
        let target = self.parse_source()?;
        self.consume(&TokenType::Set, "SET")?;
        let set = self.parse_assignments()?;
        let condition = self.parse_optional_where()?;
        Ok(Statement::Update {
            target,
            set,
            condition,
        })
    }

    fn parse_delete(&mut self) -> Result<Statement> {
        self.advance();
        let vertex = match self.peek_type() {
            TokenType::Vertex => {
                self.advance();
                true
            }
            TokenType::Edge => {
                self.advance();
                false
            }
            _ => return Err(self.syntax_error("expected VERTEX or EDGE")),
        };
        let target = self.parse_source()?;
        let condition = self.parse_optional_where()?;
        Ok(if vertex {
            Statement::DeleteVertex { target, condition }
        } else {
            Statement::DeleteEdge { target, condition }
        })
    }

    fn parse_source(&mut self) -> Result<Source> {
        match self.peek_type().clone() {
            TokenType::Rid(_) | TokenType::LeftParen => Ok(Source::Rids(self.parse_rid_set()?)),
            TokenType::Identifier(_) => Ok(Source::Class(self.plain_identifier("class name")?)),
            _ => Err(self.syntax_error("expected a class name or record ids")),
        }
    }

    fn parse_optional_where(&mut self) -> Result<Option<CondExpr>> {
        if self.match_token(&TokenType::Where) {
            Ok(Some(self.parse_condition()?))
        } else {
            Ok(None)
        }
    }

    // --- SELECT ---

    fn parse_select(&mut self) -> Result<Statement> {
        self.advance();
        let projection = if self.check(&TokenType::From) {
            Vec::new()
        } else {
            let mut items = vec![self.parse_proj_item()?];
            while self.match_token(&TokenType::Comma) {
                items.push(self.parse_proj_item()?);
            }
            items
        };
        self.consume(&TokenType::From, "FROM")?;
        let source = self.parse_source()?;
        let condition = self.parse_optional_where()?;
        let group_by = if self.match_token(&TokenType::Group) {
            self.consume(&TokenType::By, "BY")?;
            Some(self.plain_identifier("property name")?)
        } else {
            None
        };
        let skip = if self.match_token(&TokenType::Skip) {
            Some(self.parse_unsigned()?)
        } else {
            None
        };
        let limit = if self.match_token(&TokenType::Limit) {
            Some(self.parse_unsigned()?)
        } else {
            None
        };
        Ok(Statement::Select {
            projection,
            source,
            condition,
            group_by,
            skip,
            limit,
        })
    }

    fn parse_unsigned(&mut self) -> Result<u64> {
        match self.peek_type().clone() {
            TokenType::Integer(v) if v >= 0 => {
                self.advance();
                Ok(v as u64)
            }
            _ => Err(self.syntax_error("expected a non-negative integer")),
        }
    }

    fn parse_proj_item(&mut self) -> Result<ProjItem> {
        let expr = self.parse_proj_expr()?;
        let alias = if self.match_token(&TokenType::As) {
            Some(self.parse_name_literal()?)
        } else {
            None
        };
        Ok(ProjItem { expr, alias })
    }

    fn parse_proj_expr(&mut self) -> Result<ProjExpr> {
        if self.match_token(&TokenType::Asterisk) {
            return Ok(ProjExpr::Star);
        }

        // count(...) / expand(...) / walk chains all start with a word
        // followed by '('.
        if let TokenType::Identifier(word) = self.peek_type().clone() {
            if self.next_is_call() {
                if word.eq_ignore_ascii_case("count") {
                    self.advance();
                    self.advance();
                    let args = self.parse_count_args()?;
                    self.consume(&TokenType::RightParen, "')'")?;
                    return Ok(ProjExpr::Count(args));
                }
                if word.eq_ignore_ascii_case("expand") {
                    self.advance();
                    self.advance();
                    let chain = self.parse_walk_chain()?;
                    self.consume(&TokenType::RightParen, "')'")?;
                    return Ok(ProjExpr::Expand(chain));
                }
                if walk_kind(&word).is_some() {
                    let (chain, prop) = self.parse_walk_projection()?;
                    return Ok(ProjExpr::Walk { chain, prop });
                }
                return Err(self.syntax_error(format!("unknown function {word}")));
            }
            self.advance();
            return Ok(ProjExpr::Property(word));
        }

        // `in(...)` lexes as the IN keyword.
        if self.check(&TokenType::In) && self.next_is_call_at(1) {
            let (chain, prop) = self.parse_walk_projection()?;
            return Ok(ProjExpr::Walk { chain, prop });
        }

        Err(self.syntax_error("expected a projection"))
    }

    /// Whether the token after the current one is `(`, making the
    /// current word a call.
    fn next_is_call(&self) -> bool {
        self.next_is_call_at(1)
    }

    fn next_is_call_at(&self, offset: usize) -> bool {
        self.tokens
            .get(self.position + offset)
            .is_some_and(|t| t.token_type == TokenType::LeftParen)
    }

    fn parse_count_args(&mut self) -> Result<Vec<CountArg>> {
        let mut args = Vec::new();
        loop {
            match self.peek_type().clone() {
                TokenType::Asterisk => {
                    self.advance();
                    args.push(CountArg::Star);
                }
                TokenType::String(name) => {
                    self.advance();
                    args.push(CountArg::Property(name));
                }
                TokenType::Identifier(name) => {
                    self.advance();
                    args.push(CountArg::Property(name));
                }
                _ => return Err(self.syntax_error("expected '*' or a property name")),
            }
            if !self.match_token(&TokenType::Comma) {
                break;
            }
        }
        Ok(args)
    }

    /// A walk chain with an optional terminal `.property` projection.
    fn parse_walk_projection(&mut self) -> Result<(WalkChain, Option<String>)> {
        let mut steps = vec![self.parse_walk_step()?];
        let mut prop = None;
        while self.match_token(&TokenType::Dot) {
            match self.peek_type().clone() {
                TokenType::Identifier(word) if walk_kind(&word).is_some() && self.next_is_call() => {
                    steps.push(self.parse_walk_step()?);
                }
                TokenType::In if self.next_is_call() => {
                    steps.push(self.parse_walk_step()?);
                }
                TokenType::Identifier(word) => {
                    self.advance();
                    prop = Some(word);
                    break;
                }
                _ => return Err(self.syntax_error("expected a walk step or property")),
            }
        }
        Ok((WalkChain { steps }, prop))
    }

    fn parse_walk_chain(&mut self) -> Result<WalkChain> {
        let mut steps = vec![self.parse_walk_step()?];
        while self.match_token(&TokenType::Dot) {
            steps.push(self.parse_walk_step()?);
        }
        Ok(WalkChain { steps })
    }

    fn parse_walk_step(&mut self) -> Result<WalkStep> {
        let kind = match self.peek_type().clone() {
            TokenType::In => {
                self.advance();
                WalkKind::In
            }
            TokenType::Identifier(word) => match walk_kind(&word) {
                Some(kind) => {
                    self.advance();
                    kind
                }
                None => return Err(self.syntax_error(format!("unknown walk step {word}"))),
            },
            _ => return Err(self.syntax_error("expected a walk step")),
        };
        self.consume(&TokenType::LeftParen, "'('")?;
        let mut classes = Vec::new();
        while !self.check(&TokenType::RightParen) {
            match self.peek_type().clone() {
                TokenType::String(name) => {
                    self.advance();
                    classes.push(name);
                }
                TokenType::Identifier(name) => {
                    self.advance();
                    classes.push(name);
                }
                _ => return Err(self.syntax_error("expected a class name")),
            }
            if !self.match_token(&TokenType::Comma) {
                break;
            }
        }
        self.consume(&TokenType::RightParen, "')'")?;

        let mut index = None;
        let mut prop_filter = None;
        while self.match_token(&TokenType::LeftBracket) {
            match self.peek_type().clone() {
                TokenType::Integer(v) if v >= 0 => {
                    self.advance();
                    index = Some(v as usize);
                }
                TokenType::Identifier(prop) => {
                    self.advance();
                    self.consume(&TokenType::Equals, "'='")?;
                    let value = self.parse_literal()?;
                    prop_filter = Some((prop, value));
                }
                _ => return Err(self.syntax_error("expected an index or a property filter")),
            }
            self.consume(&TokenType::RightBracket, "']'")?;
        }

        Ok(WalkStep {
            kind,
            classes,
            index,
            prop_filter,
        })
    }

    // --- conditions ---

    fn parse_condition(&mut self) -> Result<CondExpr> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<CondExpr> {
        let mut left = self.parse_and()?;
        while self.match_token(&TokenType::Or) {
            let right = self.parse_and()?;
            left = CondExpr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<CondExpr> {
        let mut left = self.parse_unary()?;
        while self.match_token(&TokenType::And) {
            let right = self.parse_unary()?;
            left = CondExpr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<CondExpr> {
        if self.match_token(&TokenType::Not) {
            return Ok(CondExpr::Not(Box::new(self.parse_unary()?)));
        }
        if self.match_token(&TokenType::LeftParen) {
            let inner = self.parse_condition()?;
            self.consume(&TokenType::RightParen, "')'")?;
            return Ok(inner);
        }
        self.parse_atom()
    }

    fn parse_atom(&mut self) -> Result<CondExpr> {
        let prop = self.identifier("a property name")?;
        match self.peek_type().clone() {
            TokenType::Equals => {
                self.advance();
                Ok(CondExpr::Cmp {
                    prop,
                    op: CmpOp::Eq,
                    value: self.parse_literal()?,
                })
            }
            TokenType::NotEquals => {
                self.advance();
                Ok(CondExpr::Cmp {
                    prop,
                    op: CmpOp::Ne,
                    value: self.parse_literal()?,
                })
            }
            TokenType::LessThan => {
                self.advance();
                Ok(CondExpr::Cmp {
                    prop,
                    op: CmpOp::Lt,
                    value: self.parse_literal()?,
                })
            }
            TokenType::LessEqual => {
                self.advance();
                Ok(CondExpr::Cmp {
                    prop,
                    op: CmpOp::Le,
                    value: self.parse_literal()?,
                })
            }
            TokenType::GreaterThan => {
                self.advance();
                Ok(CondExpr::Cmp {
                    prop,
                    op: CmpOp::Gt,
                    value: self.parse_literal()?,
                })
            }
            TokenType::GreaterEqual => {
                self.advance();
                Ok(CondExpr::Cmp {
                    prop,
                    op: CmpOp::Ge,
                    value: self.parse_literal()?,
                })
            }
            TokenType::Is => {
                self.advance();
                let negated = self.match_token(&TokenType::Not);
                self.consume(&TokenType::Null, "NULL")?;
                Ok(CondExpr::IsNull { prop, negated })
            }
            TokenType::Like => {
                self.advance();
                match self.peek_type().clone() {
                    TokenType::String(pattern) => {
                        self.advance();
                        Ok(CondExpr::Like { prop, pattern })
                    }
                    _ => Err(self.syntax_error("expected a pattern string")),
                }
            }
            TokenType::In => {
                self.advance();
                self.consume(&TokenType::LeftParen, "'('")?;
                let mut values = vec![self.parse_literal()?];
                while self.match_token(&TokenType::Comma) {
                    values.push(self.parse_literal()?);
                }
                self.consume(&TokenType::RightParen, "')'")?;
                Ok(CondExpr::InList { prop, values })
            }
            TokenType::Between => {
                self.advance();
                let low = self.parse_literal()?;
                self.consume(&TokenType::And, "AND")?;
                let high = self.parse_literal()?;
                Ok(CondExpr::Between { prop, low, high })
            }
            _ => Err(self.syntax_error("expected a comparison operator")),
        }
    }

    // --- TRAVERSE ---

    fn parse_traverse(&mut self) -> Result<Statement> {
        self.advance();
        let direction = match self.peek_type().clone() {
            TokenType::In => {
                self.advance();
                TraverseDirection::In
            }
            TokenType::Identifier(word) => {
                let direction = match word.to_ascii_lowercase().as_str() {
                    "out" => TraverseDirection::Out,
                    "all" => TraverseDirection::All,
                    _ => return Err(self.syntax_error("expected in, out or all")),
                };
                self.advance();
                direction
            }
            _ => return Err(self.syntax_error("expected in, out or all")),
        };
        self.consume(&TokenType::LeftParen, "'('")?;
        let mut classes = Vec::new();
        while !self.check(&TokenType::RightParen) {
            match self.peek_type().clone() {
                TokenType::String(name) => {
                    self.advance();
                    classes.push(name);
                }
                TokenType::Identifier(name) => {
                    self.advance();
                    classes.push(name);
                }
                _ => return Err(self.syntax_error("expected a class name")),
            }
            if !self.match_token(&TokenType::Comma) {
                break;
            }
        }
        self.consume(&TokenType::RightParen, "')'")?;
        self.consume(&TokenType::From, "FROM")?;
        let mut from = vec![self.parse_rid()?];
        while self.match_token(&TokenType::Comma) {
            from.push(self.parse_rid()?);
        }
        let mut min_depth = 0u32;
        let mut max_depth = u32::MAX;
        if self.match_token(&TokenType::MinDepth) {
            min_depth = self.parse_unsigned()? as u32;
        }
        if self.match_token(&TokenType::MaxDepth) {
            max_depth = self.parse_unsigned()? as u32;
        }
        let strategy = if self.match_token(&TokenType::Strategy) {
            let word = self.identifier("a strategy")?;
            match word.to_ascii_uppercase().as_str() {
                "BREADTH_FIRST" => TraverseStrategy::BreadthFirst,
                "DEPTH_FIRST" => TraverseStrategy::DepthFirst,
                _ => return Err(self.syntax_error("expected DEPTH_FIRST or BREADTH_FIRST")),
            }
        } else {
            TraverseStrategy::BreadthFirst
        };
        Ok(Statement::Traverse {
            direction,
            classes,
            from,
            min_depth,
            max_depth,
            strategy,
        })
    }
}

fn walk_kind(word: &str) -> Option<WalkKind> {
    Some(match word.to_ascii_lowercase().as_str() {
        "out" => WalkKind::Out,
        "in" => WalkKind::In,
        "both" => WalkKind::Both,
        "oute" => WalkKind::OutE,
        "ine" => WalkKind::InE,
        "bothe" => WalkKind::BothE,
        "outv" => WalkKind::OutV,
        "inv" => WalkKind::InV,
        "bothv" => WalkKind::BothV,
        _ => return None,
    })
}
