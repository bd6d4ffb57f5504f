//! Filter engine.
//!
//! Filters select grid rows: `site`, `not geoCity`, `curVal > 20°C`,
//! `siteRef->area >= 1000ft²`, combined with `and`/`or` at a single
//! left-associative precedence level and grouped with parentheses. Paths
//! traverse Refs through the grid's id index and key into Dicts. Compiled
//! filters are kept in a bounded global cache keyed by source text.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tracing::trace;

use crate::codec::zinc::{self, Scanner};
use crate::error::Result;
use crate::grid::{Entity, Grid};
use crate::value::Value;
use crate::version::VER_3_0;

const FILTER_CACHE_SIZE: usize = 500;

static FILTER_CACHE: Lazy<RwLock<FilterCache>> =
    Lazy::new(|| RwLock::new(FilterCache::new(FILTER_CACHE_SIZE)));

/// A compiled filter expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Bare path: true when the path resolves.
    Has(Vec<String>),
    /// `not path`: true when the path does not resolve.
    Missing(Vec<String>),
    Cmp {
        path: Vec<String>,
        op: CmpOp,
        value: Value,
    },
    And(Box<Filter>, Box<Filter>),
    Or(Box<Filter>, Box<Filter>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Filter {
    /// Parse a filter, bypassing the cache.
    pub fn parse(expr: &str) -> Result<Filter> {
        let mut s = Scanner::new(expr);
        let filter = parse_expr(&mut s)?;
        s.skip_spaces();
        if !s.at_end() {
            return Err(s.error("trailing data after filter"));
        }
        Ok(filter)
    }

    /// Evaluate against one row of a grid. The grid supplies the id index
    /// that `->` traversal follows.
    pub fn matches(&self, grid: &Grid, row: &Entity) -> bool {
        match self {
            Filter::Has(path) => resolve(grid, row, path).is_some(),
            Filter::Missing(path) => resolve(grid, row, path).is_none(),
            Filter::Cmp { path, op, value } => match resolve(grid, row, path) {
                // An unresolvable path fails every comparison.
                None => false,
                Some(found) => match op {
                    CmpOp::Eq => found == value,
                    CmpOp::Ne => found != value,
                    CmpOp::Lt => found.partial_cmp(value) == Some(std::cmp::Ordering::Less),
                    CmpOp::Le => matches!(
                        found.partial_cmp(value),
                        Some(std::cmp::Ordering::Less) | Some(std::cmp::Ordering::Equal)
                    ),
                    CmpOp::Gt => found.partial_cmp(value) == Some(std::cmp::Ordering::Greater),
                    CmpOp::Ge => matches!(
                        found.partial_cmp(value),
                        Some(std::cmp::Ordering::Greater) | Some(std::cmp::Ordering::Equal)
                    ),
                },
            },
            Filter::And(left, right) => left.matches(grid, row) && right.matches(grid, row),
            Filter::Or(left, right) => left.matches(grid, row) || right.matches(grid, row),
        }
    }
}

/// Compile a filter through the global cache.
pub fn compile(expr: &str) -> Result<Arc<Filter>> {
    if let Some(filter) = FILTER_CACHE.read().get(expr) {
        return Ok(filter);
    }
    let filter = Arc::new(Filter::parse(expr)?);
    FILTER_CACHE.write().insert(expr, Arc::clone(&filter));
    trace!("compiled filter {expr:?}");
    Ok(filter)
}

/// Bounded insertion-order cache; a lookup does not refresh its entry.
struct FilterCache {
    capacity: usize,
    entries: HashMap<String, Arc<Filter>>,
    order: VecDeque<String>,
}

impl FilterCache {
    fn new(capacity: usize) -> Self {
        FilterCache {
            capacity,
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    fn get(&self, expr: &str) -> Option<Arc<Filter>> {
        self.entries.get(expr).cloned()
    }

    fn insert(&mut self, expr: &str, filter: Arc<Filter>) {
        if self.entries.contains_key(expr) {
            return;
        }
        while self.entries.len() >= self.capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }
        self.entries.insert(expr.to_string(), filter);
        self.order.push_back(expr.to_string());
    }
}

// ---------------------------------------------------------------------------
// Path resolution

/// Walk a path from a row. Intermediate Refs resolve through the grid's id
/// index; intermediate Dicts index directly. `None` is the distinguished
/// not-found result; an explicit Null tag resolves to `Some(Null)`.
fn resolve<'a>(grid: &'a Grid, row: &'a Entity, path: &[String]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    let mut value = row.get(first)?;
    for segment in rest {
        let next: &Entity = match value {
            Value::Ref(id) => grid.get_by_ref(id)?,
            Value::Dict(map) => map,
            _ => return None,
        };
        value = next.get(segment)?;
    }
    Some(value)
}

// ---------------------------------------------------------------------------
// Parsing

/// `expr := term (("and" | "or") term)*`, folded left.
fn parse_expr(s: &mut Scanner) -> Result<Filter> {
    let mut filter = parse_term(s)?;
    loop {
        s.skip_spaces();
        if looking_at_word(s, "and") {
            consume_word(s, "and");
            let right = parse_term(s)?;
            filter = Filter::And(Box::new(filter), Box::new(right));
        } else if looking_at_word(s, "or") {
            consume_word(s, "or");
            let right = parse_term(s)?;
            filter = Filter::Or(Box::new(filter), Box::new(right));
        } else {
            break;
        }
    }
    Ok(filter)
}

fn parse_term(s: &mut Scanner) -> Result<Filter> {
    s.skip_spaces();
    if s.peek() == Some('(') {
        s.advance();
        let inner = parse_expr(s)?;
        s.skip_spaces();
        s.eat(')')?;
        return Ok(inner);
    }
    if looking_at_word(s, "not") {
        consume_word(s, "not");
        s.skip_spaces();
        return Ok(Filter::Missing(parse_path(s)?));
    }
    let path = parse_path(s)?;
    s.skip_spaces();
    let Some(op) = parse_op(s) else {
        return Ok(Filter::Has(path));
    };
    s.skip_spaces();
    let value = if looking_at_word(s, "true") {
        consume_word(s, "true");
        Value::Bool(true)
    } else if looking_at_word(s, "false") {
        consume_word(s, "false");
        Value::Bool(false)
    } else {
        zinc::scalar(s, &VER_3_0)?
    };
    Ok(Filter::Cmp { path, op, value })
}

/// `path := id ("->" id)*`
fn parse_path(s: &mut Scanner) -> Result<Vec<String>> {
    let mut path = vec![zinc::identifier(s)?];
    loop {
        s.skip_spaces();
        if !s.looking_at("->") {
            break;
        }
        s.advance();
        s.advance();
        s.skip_spaces();
        path.push(zinc::identifier(s)?);
    }
    Ok(path)
}

fn parse_op(s: &mut Scanner) -> Option<CmpOp> {
    let two: String = [s.peek(), s.peek_at(1)].iter().flatten().collect();
    let op = match two.as_str() {
        "==" => Some((CmpOp::Eq, 2)),
        "!=" => Some((CmpOp::Ne, 2)),
        "<=" => Some((CmpOp::Le, 2)),
        ">=" => Some((CmpOp::Ge, 2)),
        _ => match s.peek() {
            Some('<') => Some((CmpOp::Lt, 1)),
            Some('>') => Some((CmpOp::Gt, 1)),
            _ => None,
        },
    };
    let (op, width) = op?;
    for _ in 0..width {
        s.advance();
    }
    Some(op)
}

/// A keyword matches only on a word boundary; `notable` is a path.
fn looking_at_word(s: &Scanner, word: &str) -> bool {
    s.looking_at(word)
        && !matches!(
            s.peek_at(word.len()),
            Some(c) if c.is_ascii_alphanumeric() || c == '_'
        )
}

fn consume_word(s: &mut Scanner, word: &str) {
    for _ in 0..word.len() {
        s.advance();
    }
}

// ---------------------------------------------------------------------------
// Grid integration

impl Grid {
    /// Rows matching a filter expression, as a new grid sharing this grid's
    /// metadata and catalog. `limit` of 0 means no limit. The empty
    /// expression matches every row.
    pub fn filter(&self, expr: &str, limit: usize) -> Result<Grid> {
        let mut out = self.slice(0..0);
        if expr.trim().is_empty() {
            for row in self.iter() {
                if limit != 0 && out.len() >= limit {
                    break;
                }
                out.push_row_unchecked(row.clone());
            }
            return Ok(out);
        }
        let filter = compile(expr)?;
        for row in self.iter() {
            if limit != 0 && out.len() >= limit {
                break;
            }
            if filter.matches(self, row) {
                out.push_row_unchecked(row.clone());
            }
        }
        Ok(out)
    }
}
