//! Parser for scope expressions and predicates.
//!
//! One recursive-descent parser handles both grammars since predicates are
//! embedded in scope filter steps.

use quarry_foundation::{Error, ErrorKind, Result, SemanticLimit, Value};

use crate::ast::{ScopeExpr, Source, Step};
use crate::environment::DEFAULT_MAX_DEPTH;
use crate::lexer::Lexer;
use crate::predicate::{CollectionOp, CompareOp, LogicalOp, Predicate};
use crate::token::{Token, TokenKind};

/// Deepest nesting of groups, `at(...)`, filters and predicate forms the
/// parser accepts. Anything deeper is rejected before it can exhaust the stack.
pub const MAX_PARSE_DEPTH: usize = DEFAULT_MAX_DEPTH * 8;

/// Parses a scope expression.
///
/// # Errors
///
/// Returns a parse error tagged with the source text.
pub fn parse_scope(source: &str) -> Result<ScopeExpr> {
    Parser::new(source).parse_scope_source()
}

/// Parses a predicate.
///
/// # Errors
///
/// Returns a parse error tagged with the source text.
pub fn parse_predicate(source: &str) -> Result<Predicate> {
    Parser::new(source).parse_predicate_source()
}

/// Parser over a single source string.
pub struct Parser<'src> {
    /// The lexer providing tokens.
    lexer: Lexer<'src>,
    /// Current token (lookahead).
    current: Token,
    /// Source text (for error context).
    source: &'src str,
    /// Current nesting depth.
    depth: usize,
}

impl<'src> Parser<'src> {
    /// Creates a new parser for the given source.
    #[must_use]
    pub fn new(source: &'src str) -> Self {
        let mut lexer = Lexer::new(source);
        let current = lexer.next_token();
        Self {
            lexer,
            current,
            source,
            depth: 0,
        }
    }

    /// Parses the whole source as one scope expression.
    ///
    /// # Errors
    ///
    /// Returns an error if the source is not a complete scope expression.
    pub fn parse_scope_source(&mut self) -> Result<ScopeExpr> {
        let result = self.parse_expr().and_then(|expr| {
            self.expect_eof()?;
            Ok(expr)
        });
        result.map_err(|e| e.in_source(self.source))
    }

    /// Parses the whole source as one predicate.
    ///
    /// # Errors
    ///
    /// Returns an error if the source is not a complete predicate.
    pub fn parse_predicate_source(&mut self) -> Result<Predicate> {
        let result = self.parse_predicate().and_then(|predicate| {
            self.expect_eof()?;
            Ok(predicate)
        });
        result.map_err(|e| e.in_source(self.source))
    }

    // =========================================================================
    // Scope grammar
    // =========================================================================

    fn parse_expr(&mut self) -> Result<ScopeExpr> {
        let first = self.parse_term()?;
        if !self.at_union() {
            return Ok(first);
        }

        let mut terms = vec![first];
        while self.at_union() {
            self.advance();
            terms.push(self.parse_term()?);
        }
        Ok(ScopeExpr::Union(terms))
    }

    fn at_union(&self) -> bool {
        matches!(self.current.kind, TokenKind::Pipe | TokenKind::Plus)
    }

    fn parse_term(&mut self) -> Result<ScopeExpr> {
        let source = self.parse_source()?;
        let mut steps = Vec::new();
        loop {
            match self.current.kind {
                TokenKind::Dot => {
                    self.advance();
                    steps.push(Step::Field(self.expect_ident("component or field name")?));
                }
                TokenKind::LBracket => {
                    self.advance();
                    if self.current.kind == TokenKind::RBracket {
                        self.advance();
                        steps.push(Step::Each);
                    } else {
                        let predicate = self.nested(Self::parse_predicate)?;
                        self.expect(&TokenKind::RBracket)?;
                        steps.push(Step::Filter(predicate));
                    }
                }
                _ => break,
            }
        }
        Ok(ScopeExpr::Path { source, steps })
    }

    fn parse_source(&mut self) -> Result<Source> {
        match &self.current.kind {
            TokenKind::LParen => {
                self.advance();
                let inner = self.nested(Self::parse_expr)?;
                self.expect(&TokenKind::RParen)?;
                Ok(Source::Group(Box::new(inner)))
            }
            TokenKind::Ident(name) => {
                let name = name.clone();
                let offset = self.current.span.start;
                self.advance();
                match name.as_str() {
                    "actor" => Ok(Source::Actor),
                    "location" => Ok(Source::Location),
                    "game" => Ok(Source::Game),
                    "target" => Ok(Source::Target),
                    "targets" => Ok(Source::Targets),
                    "none" => Ok(Source::None),
                    "entities" => {
                        self.expect(&TokenKind::LParen)?;
                        let component = self.expect_ident("component name")?;
                        self.expect(&TokenKind::RParen)?;
                        Ok(Source::Entities(component))
                    }
                    "at" => {
                        self.expect(&TokenKind::LParen)?;
                        let inner = self.nested(Self::parse_expr)?;
                        self.expect(&TokenKind::RParen)?;
                        Ok(Source::At(Box::new(inner)))
                    }
                    _ if name.contains(':') => Ok(Source::Named(name)),
                    _ => Err(Error::parse(format!("unknown scope source `{name}`"), offset)),
                }
            }
            TokenKind::Error(msg) => Err(self.error(msg)),
            other => Err(self.error(&format!("expected scope source, found {}", other.name()))),
        }
    }

    // =========================================================================
    // Predicate grammar
    // =========================================================================

    fn parse_predicate(&mut self) -> Result<Predicate> {
        let literal = match &self.current.kind {
            TokenKind::Nil => Some(Value::Nil),
            TokenKind::True => Some(Value::Bool(true)),
            TokenKind::False => Some(Value::Bool(false)),
            TokenKind::Int(n) => Some(Value::Int(*n)),
            TokenKind::Float(n) => Some(Value::Float(*n)),
            TokenKind::String(s) => Some(Value::from(s.as_str())),
            _ => None,
        };
        if let Some(value) = literal {
            self.advance();
            return Ok(Predicate::Literal(value));
        }

        match &self.current.kind {
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.advance();
                let mut path = Vec::new();
                while self.current.kind == TokenKind::Dot {
                    self.advance();
                    path.push(self.expect_ident("field name")?);
                }
                Ok(Predicate::Var { name, path })
            }
            TokenKind::LParen => self.nested(Self::parse_form),
            TokenKind::Error(msg) => Err(self.error(msg)),
            other => Err(self.error(&format!("expected predicate, found {}", other.name()))),
        }
    }

    /// Parses `(op arg*)`.
    fn parse_form(&mut self) -> Result<Predicate> {
        self.expect(&TokenKind::LParen)?;
        let offset = self.current.span.start;
        let op = self.parse_operator()?;

        let mut args = Vec::new();
        while !matches!(self.current.kind, TokenKind::RParen | TokenKind::Eof) {
            args.push(self.parse_predicate()?);
        }
        self.expect(&TokenKind::RParen)?;

        build_form(op, args).map_err(|e| match e.kind {
            ErrorKind::ArityMismatch { .. } => Error::parse(e.kind.to_string(), offset),
            _ => e,
        })
    }

    fn parse_operator(&mut self) -> Result<Operator> {
        let op = match &self.current.kind {
            TokenKind::Eq => Operator::Compare(CompareOp::Eq),
            TokenKind::NotEq => Operator::Compare(CompareOp::NotEq),
            TokenKind::Lt => Operator::Compare(CompareOp::Lt),
            TokenKind::Le => Operator::Compare(CompareOp::Le),
            TokenKind::Gt => Operator::Compare(CompareOp::Gt),
            TokenKind::Ge => Operator::Compare(CompareOp::Ge),
            TokenKind::Ident(name) => match name.as_str() {
                "and" => Operator::Logical(LogicalOp::And),
                "or" => Operator::Logical(LogicalOp::Or),
                "not" => Operator::Logical(LogicalOp::Not),
                "in" => Operator::In,
                "any" => Operator::Any,
                "all" => Operator::All,
                "count" => Operator::Count,
                other => return Err(Error::new(ErrorKind::UnknownOperator(other.to_string()))),
            },
            other => return Err(self.error(&format!("expected operator, found {}", other.name()))),
        };
        self.advance();
        Ok(op)
    }

    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= MAX_PARSE_DEPTH {
            return Err(Error::limit_exceeded(SemanticLimit::MaxParseDepth {
                limit: MAX_PARSE_DEPTH,
            }));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    // =========================================================================
    // Token helpers
    // =========================================================================

    fn advance(&mut self) {
        self.current = self.lexer.next_token();
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<()> {
        if &self.current.kind == kind {
            self.advance();
            Ok(())
        } else {
            Err(self.error(&format!(
                "expected {}, found {}",
                kind.name(),
                self.current.kind.name()
            )))
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<String> {
        if let TokenKind::Ident(name) = &self.current.kind {
            let name = name.clone();
            self.advance();
            Ok(name)
        } else {
            Err(self.error(&format!("expected {what}, found {}", self.current.kind.name())))
        }
    }

    fn expect_eof(&self) -> Result<()> {
        match &self.current.kind {
            TokenKind::Eof => Ok(()),
            TokenKind::Error(msg) => Err(self.error(msg)),
            other => Err(self.error(&format!("unexpected {} after expression", other.name()))),
        }
    }

    fn error(&self, message: &str) -> Error {
        Error::parse(message, self.current.span.start)
    }
}

/// Predicate operator heads.
enum Operator {
    Compare(CompareOp),
    Logical(LogicalOp),
    In,
    Any,
    All,
    Count,
}

impl Operator {
    fn name(&self) -> String {
        match self {
            Self::Compare(op) => op.to_string(),
            Self::Logical(op) => op.to_string(),
            Self::In => "in".to_string(),
            Self::Any => "any".to_string(),
            Self::All => "all".to_string(),
            Self::Count => "count".to_string(),
        }
    }
}

fn build_form(op: Operator, args: Vec<Predicate>) -> Result<Predicate> {
    let arity = |expected: usize, label: &str| -> Result<()> {
        if args.len() == expected {
            Ok(())
        } else {
            Err(Error::arity_mismatch(op.name(), label, args.len()))
        }
    };

    match op {
        Operator::Compare(cmp) => {
            arity(2, "2")?;
            let [left, right] = two(args);
            Ok(Predicate::compare(cmp, left, right))
        }
        Operator::Logical(LogicalOp::Not) => {
            arity(1, "1")?;
            Ok(Predicate::Logical {
                op: LogicalOp::Not,
                operands: args,
            })
        }
        Operator::Logical(logical) => Ok(Predicate::Logical {
            op: logical,
            operands: args,
        }),
        Operator::In => {
            arity(2, "2")?;
            let [item, collection] = two(args);
            Ok(Predicate::CollectionOp(CollectionOp::In {
                item: Box::new(item),
                collection: Box::new(collection),
            }))
        }
        Operator::Any | Operator::All => {
            arity(2, "2")?;
            let is_any = matches!(op, Operator::Any);
            let [collection, body] = two(args);
            let (collection, body) = (Box::new(collection), Box::new(body));
            Ok(Predicate::CollectionOp(if is_any {
                CollectionOp::Any { collection, body }
            } else {
                CollectionOp::All { collection, body }
            }))
        }
        Operator::Count => {
            arity(1, "1")?;
            let collection = args.into_iter().next().unwrap_or(Predicate::Literal(Value::Nil));
            Ok(Predicate::CollectionOp(CollectionOp::Count(Box::new(collection))))
        }
    }
}

/// Splits a two-element argument list. Callers check the arity first.
fn two(args: Vec<Predicate>) -> [Predicate; 2] {
    let mut iter = args.into_iter();
    let first = iter.next().unwrap_or(Predicate::Literal(Value::Nil));
    let second = iter.next().unwrap_or(Predicate::Literal(Value::Nil));
    [first, second]
}
