//! Query parsing.
//!
//! Turns a query string into a [`QueryNode`] tree. The grammar follows the
//! classic Lucene flavour with OR as the default operator:
//!
//! ```text
//! query    → or_expr EOF
//! or_expr  → and_expr (("OR" | "||")? and_expr)*
//! and_expr → unary (("AND" | "&&") unary)*
//! unary    → ("NOT" | "!" | "-" | "+") unary | primary
//! primary  → TERM | PHRASE | FIELD ":" (TERM | PHRASE | "(" or_expr ")")
//!          | "(" or_expr ")"
//! ```
//!
//! Operators are only recognised in upper case. Term and phrase text goes
//! through the same [`Analyzer`] used at indexing time. `+` marks a required
//! clause and `NOT NOT x` reads as `x`. Groups and unary operators nest at
//! most [`MAX_DEPTH`] levels.

use crate::error::{Error, Result};
use crate::tokenizer::Analyzer;
use crate::Field;

/// Deepest nesting of groups and unary operators a query may use.
pub const MAX_DEPTH: usize = 64;

/// A parsed query. Leaves always carry at least one target field.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryNode {
    Term { term: String, fields: Vec<Field> },
    /// Terms that must occur at the given offsets relative to the first one.
    Phrase { terms: Vec<(String, u32)>, fields: Vec<Field> },
    And(Vec<QueryNode>),
    Or(Vec<QueryNode>),
    Not(Box<QueryNode>),
    /// A clause every match must satisfy; its `Or` siblings only add score.
    Required(Box<QueryNode>),
}

impl QueryNode {
    pub fn term(term: impl Into<String>, fields: &[Field]) -> Self {
        QueryNode::Term { term: term.into(), fields: Field::resolve(fields) }
    }

    /// Number of term and phrase leaves in the tree.
    pub fn leaf_count(&self) -> usize {
        match self {
            QueryNode::Term { .. } | QueryNode::Phrase { .. } => 1,
            QueryNode::And(children) | QueryNode::Or(children) => children.iter().map(QueryNode::leaf_count).sum(),
            QueryNode::Not(child) | QueryNode::Required(child) => child.leaf_count(),
        }
    }

    fn and(mut children: Vec<QueryNode>) -> Option<QueryNode> {
        match children.len() {
            0 => None,
            1 => children.pop(),
            _ => Some(QueryNode::And(children)),
        }
    }

    fn or(mut children: Vec<QueryNode>) -> Option<QueryNode> {
        match children.len() {
            0 => None,
            1 => children.pop(),
            _ => Some(QueryNode::Or(children)),
        }
    }
}

/// Parses `query` against `fields` (empty means every field).
///
/// Returns `Ok(None)` when nothing searchable is left, e.g. a blank query or
/// one made only of stop words.
pub fn parse(query: &str, fields: &[Field], analyzer: &Analyzer) -> Result<Option<QueryNode>> {
    let tokens = lex(query)?;
    if tokens.is_empty() {
        return Ok(None);
    }
    let mut parser = Parser { query, tokens, pos: 0, depth: 0, analyzer };
    let tree = parser.parse_or(&Field::resolve(fields))?;
    if let Some(tok) = parser.tokens.get(parser.pos) {
        return Err(Error::syntax("unbalanced ')'", tok.start, query));
    }
    Ok(tree)
}

#[derive(Debug, Clone, PartialEq)]
enum Kind {
    Word(String),
    Phrase(String),
    Field(String),
    And,
    Or,
    Not,
    Plus,
    LParen,
    RParen,
}

#[derive(Debug, Clone)]
struct Lexeme {
    kind: Kind,
    start: usize, // byte offset in the query
}

fn is_word_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '(' | ')' | '"' | ':')
}

fn lex(query: &str) -> Result<Vec<Lexeme>> {
    let mut out = Vec::new();
    let mut chars = query.char_indices().peekable();

    while let Some(&(start, ch)) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }
        let kind = match ch {
            '(' => { chars.next(); Kind::LParen }
            ')' => { chars.next(); Kind::RParen }
            '!' => { chars.next(); Kind::Not }
            '-' => { chars.next(); Kind::Not }
            '+' => { chars.next(); Kind::Plus }
            '"' => {
                chars.next();
                let mut text = String::new();
                loop {
                    match chars.next() {
                        Some((_, '"')) => break,
                        Some((_, c)) => text.push(c),
                        None => return Err(Error::syntax("unclosed quote", start, query)),
                    }
                }
                Kind::Phrase(text)
            }
            ':' => return Err(Error::syntax("field name missing before ':'", start, query)),
            _ => {
                let mut word = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if !is_word_char(c) { break; }
                    word.push(c);
                    chars.next();
                }
                if matches!(chars.peek(), Some(&(_, ':'))) {
                    chars.next();
                    Kind::Field(word)
                } else {
                    match word.as_str() {
                        "AND" | "&&" => Kind::And,
                        "OR" | "||" => Kind::Or,
                        "NOT" => Kind::Not,
                        _ => Kind::Word(word),
                    }
                }
            }
        };
        out.push(Lexeme { kind, start });
    }
    Ok(out)
}

struct Parser<'a> {
    query: &'a str,
    tokens: Vec<Lexeme>,
    pos: usize,
    depth: usize,
    analyzer: &'a Analyzer,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Kind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn here(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.query.len(), |t| t.start)
    }

    fn advance(&mut self) -> Lexeme {
        let tok = self.tokens[self.pos].clone();
        self.pos += 1;
        tok
    }

    fn starts_operand(&self) -> bool {
        matches!(
            self.peek(),
            Some(Kind::Word(_) | Kind::Phrase(_) | Kind::Field(_) | Kind::Not | Kind::Plus | Kind::LParen)
        )
    }

    /// Fails with the operator's own position when nothing follows it.
    fn expect_operand(&self, op: &Lexeme) -> Result<()> {
        if self.starts_operand() {
            Ok(())
        } else {
            Err(Error::syntax("operator is missing its right operand", op.start, self.query))
        }
    }

    fn descend(&mut self, start: usize) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(Error::syntax("query nested too deeply", start, self.query));
        }
        Ok(())
    }

    fn parse_or(&mut self, fields: &[Field]) -> Result<Option<QueryNode>> {
        let mut children = Vec::new();
        children.extend(self.parse_and(fields)?);
        loop {
            if matches!(self.peek(), Some(Kind::Or)) {
                let op = self.advance();
                self.expect_operand(&op)?;
            } else if !self.starts_operand() {
                break;
            }
            children.extend(self.parse_and(fields)?);
        }
        Ok(QueryNode::or(children))
    }

    fn parse_and(&mut self, fields: &[Field]) -> Result<Option<QueryNode>> {
        let mut children = Vec::new();
        children.extend(self.parse_unary(fields)?);
        while matches!(self.peek(), Some(Kind::And)) {
            let op = self.advance();
            self.expect_operand(&op)?;
            children.extend(self.parse_unary(fields)?);
        }
        Ok(QueryNode::and(children))
    }

    fn parse_unary(&mut self, fields: &[Field]) -> Result<Option<QueryNode>> {
        match self.peek() {
            Some(Kind::Not) => {
                let op = self.advance();
                self.expect_operand(&op)?;
                self.descend(op.start)?;
                let inner = self.parse_unary(fields)?;
                self.depth -= 1;
                Ok(inner.map(|n| match n {
                    QueryNode::Not(child) => *child,
                    other => QueryNode::Not(Box::new(other)),
                }))
            }
            Some(Kind::Plus) => {
                let op = self.advance();
                self.expect_operand(&op)?;
                self.descend(op.start)?;
                let inner = self.parse_unary(fields)?;
                self.depth -= 1;
                Ok(inner.map(|n| match n {
                    QueryNode::Not(_) | QueryNode::Required(_) => n,
                    other => QueryNode::Required(Box::new(other)),
                }))
            }
            _ => self.parse_primary(fields),
        }
    }

    fn parse_primary(&mut self, fields: &[Field]) -> Result<Option<QueryNode>> {
        let start = self.here();
        match self.peek().cloned() {
            Some(Kind::Word(text)) => {
                self.advance();
                Ok(self.word_leaf(&text, fields))
            }
            Some(Kind::Phrase(text)) => {
                self.advance();
                Ok(self.phrase_leaf(&text, fields))
            }
            Some(Kind::Field(name)) => {
                self.advance();
                let field: Field = name
                    .parse()
                    .map_err(|_| Error::syntax(format!("unknown field '{name}'"), start, self.query))?;
                match self.peek() {
                    Some(Kind::Word(_) | Kind::Phrase(_) | Kind::LParen) => self.parse_primary(&[field]),
                    _ => Err(Error::syntax(format!("expected term, phrase or group after '{name}:'"), start, self.query)),
                }
            }
            Some(Kind::LParen) => {
                self.advance();
                self.descend(start)?;
                let inner = self.parse_or(fields)?;
                if !matches!(self.peek(), Some(Kind::RParen)) {
                    return Err(Error::syntax("unbalanced '('", start, self.query));
                }
                self.advance();
                self.depth -= 1;
                Ok(inner)
            }
            Some(Kind::RParen) => Err(Error::syntax("unexpected ')'", start, self.query)),
            Some(Kind::And | Kind::Or) => Err(Error::syntax("operator is missing its left operand", start, self.query)),
            Some(Kind::Not | Kind::Plus) => self.parse_unary(fields),
            None => Err(Error::syntax("unexpected end of query", start, self.query)),
        }
    }

    fn word_leaf(&self, text: &str, fields: &[Field]) -> Option<QueryNode> {
        let leaves = self
            .analyzer
            .terms(text)
            .into_iter()
            .map(|term| QueryNode::Term { term, fields: fields.to_vec() })
            .collect();
        QueryNode::or(leaves)
    }

    fn phrase_leaf(&self, text: &str, fields: &[Field]) -> Option<QueryNode> {
        let tokens: Vec<_> = self.analyzer.token_stream(text).collect();
        match tokens.as_slice() {
            [] => None,
            [single] => Some(QueryNode::Term { term: single.term.clone(), fields: fields.to_vec() }),
            [first, ..] => {
                let base = first.position;
                let terms = tokens.iter().map(|t| (t.term.clone(), t.position - base)).collect();
                Some(QueryNode::Phrase { terms, fields: fields.to_vec() })
            }
        }
    }
}
