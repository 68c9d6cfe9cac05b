//! Link name templates.
//!
//! A template is literal text with `{...}` placeholders. A placeholder holds
//! one or more alternatives separated by `|`: field names, or quoted
//! literals used as a fallback. The first alternative that resolves wins.
//!
//! ```text
//! {title} ({year|"unknown"})       "Foo (2001)" / "Foo (unknown)"
//! {directors}/{title}.{ext}        one result per director
//! {watched}/{title}                "Watched/Foo", or "/Foo" when false
//! ```
//!
//! List values multiply: the template yields every combination of the
//! elements of its list-valued placeholders. A placeholder with nothing to
//! resolve to (no alternative found, or an empty list) yields no result at
//! all for the template.
//!
//! `{{` and `}}` stand for literal braces. There are no format specs: the
//! whole text up to the closing brace is the placeholder.

use std::collections::BTreeMap;
use std::fmt;

use kolekto_index::{Record, Scalar, Value};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    #[error("unclosed placeholder starting at byte {0}")]
    Unclosed(usize),
    #[error("unmatched '}}' at byte {0}")]
    UnmatchedClose(usize),
    #[error("empty placeholder at byte {0}")]
    EmptyPlaceholder(usize),
    #[error("empty alternative in placeholder {0:?}")]
    EmptyAlternative(String),
}

/// Attribute lookup used during expansion.
pub trait Environment {
    fn field(&self, name: &str) -> Option<&Value>;
}

impl Environment for Record {
    fn field(&self, name: &str) -> Option<&Value> {
        self.get(name)
    }
}

impl Environment for BTreeMap<String, Value> {
    fn field(&self, name: &str) -> Option<&Value> {
        self.get(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Literal(String),
    Slot(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Alternative {
    Field(String),
    Quoted(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Slot {
    /// Placeholder text between the braces, verbatim.
    token: String,
    alternatives: Vec<Alternative>,
}

/// A parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    source: String,
    pieces: Vec<Piece>,
    /// One per distinct placeholder token, in order of first appearance.
    slots: Vec<Slot>,
}

impl Pattern {
    pub fn parse(template: &str) -> Result<Self, PatternError> {
        let mut pieces = Vec::new();
        let mut slots: Vec<Slot> = Vec::new();
        let mut literal = String::new();

        let mut chars = template.char_indices().peekable();
        while let Some((pos, c)) = chars.next() {
            match c {
                '{' if matches!(chars.peek(), Some((_, '{'))) => {
                    chars.next();
                    literal.push('{');
                }
                '}' if matches!(chars.peek(), Some((_, '}'))) => {
                    chars.next();
                    literal.push('}');
                }
                '}' => return Err(PatternError::UnmatchedClose(pos)),
                '{' => {
                    let mut token = String::new();
                    let mut closed = false;
                    for (_, c) in chars.by_ref() {
                        match c {
                            '}' => {
                                closed = true;
                                break;
                            }
                            '{' => return Err(PatternError::Unclosed(pos)),
                            c => token.push(c),
                        }
                    }
                    if !closed {
                        return Err(PatternError::Unclosed(pos));
                    }
                    if token.trim().is_empty() {
                        return Err(PatternError::EmptyPlaceholder(pos));
                    }

                    if !literal.is_empty() {
                        pieces.push(Piece::Literal(std::mem::take(&mut literal)));
                    }
                    let index = match slots.iter().position(|s| s.token == token) {
                        Some(index) => index,
                        None => {
                            let alternatives = parse_alternatives(&token)?;
                            slots.push(Slot { token, alternatives });
                            slots.len() - 1
                        }
                    };
                    pieces.push(Piece::Slot(index));
                }
                c => literal.push(c),
            }
        }
        if !literal.is_empty() {
            pieces.push(Piece::Literal(literal));
        }

        Ok(Self {
            source: template.to_string(),
            pieces,
            slots,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Placeholder tokens in order of first appearance.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(|s| s.token.as_str())
    }

    /// Every rendering of the template against `env`.
    ///
    /// The last placeholder varies fastest; list elements keep their order.
    pub fn expand<E: Environment + ?Sized>(&self, env: &E) -> Expansions<'_> {
        let values: Vec<Vec<String>> = self.slots.iter().map(|slot| resolve(slot, env)).collect();
        let exhausted = values.iter().any(Vec::is_empty);
        Expansions {
            pattern: self,
            cursor: vec![0; values.len()],
            values,
            exhausted,
        }
    }

    /// Render once, joining list values with `sep`. Unresolved placeholders
    /// render empty.
    pub fn render_joined<E: Environment + ?Sized>(&self, env: &E, sep: &str) -> String {
        let values: Vec<String> = self.slots.iter().map(|slot| resolve(slot, env).join(sep)).collect();
        self.pieces
            .iter()
            .map(|piece| match piece {
                Piece::Literal(text) => text.as_str(),
                Piece::Slot(i) => values[*i].as_str(),
            })
            .collect()
    }

    fn render(&self, values: &[Vec<String>], cursor: &[usize]) -> String {
        let mut out = String::new();
        for piece in &self.pieces {
            match piece {
                Piece::Literal(text) => out.push_str(text),
                Piece::Slot(i) => out.push_str(&values[*i][cursor[*i]]),
            }
        }
        out
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl std::str::FromStr for Pattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Pattern::parse(s)
    }
}

fn parse_alternatives(token: &str) -> Result<Vec<Alternative>, PatternError> {
    token
        .split('|')
        .map(str::trim)
        .map(|alt| {
            let bytes = alt.as_bytes();
            match bytes {
                [] => Err(PatternError::EmptyAlternative(token.to_string())),
                [q, .., last] if (*q == b'"' || *q == b'\'') && q == last => {
                    Ok(Alternative::Quoted(alt[1..alt.len() - 1].to_string()))
                }
                _ => Ok(Alternative::Field(alt.to_string())),
            }
        })
        .collect()
}

/// Renderings of one placeholder: one per list element, a single one for a
/// scalar, none when nothing resolves.
fn resolve<E: Environment + ?Sized>(slot: &Slot, env: &E) -> Vec<String> {
    for alt in &slot.alternatives {
        match alt {
            Alternative::Quoted(text) => return vec![text.clone()],
            Alternative::Field(name) => {
                if let Some(value) = env.field(name) {
                    return value.as_slice().iter().map(|s| render_scalar(name, s)).collect();
                }
            }
        }
    }
    Vec::new()
}

fn render_scalar(field: &str, scalar: &Scalar) -> String {
    match scalar {
        Scalar::Bool(true) => title_case(field),
        Scalar::Bool(false) => String::new(),
        other => other.to_string(),
    }
}

/// Uppercase the first letter of every word, lowercase the rest.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_letter = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_letter = true;
        } else {
            out.push(c);
            prev_letter = false;
        }
    }
    out
}

/// Iterator returned by [`Pattern::expand`].
pub struct Expansions<'a> {
    pattern: &'a Pattern,
    values: Vec<Vec<String>>,
    cursor: Vec<usize>,
    exhausted: bool,
}

impl Iterator for Expansions<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.exhausted {
            return None;
        }
        let item = self.pattern.render(&self.values, &self.cursor);

        // Odometer step, rightmost slot first.
        self.exhausted = true;
        for i in (0..self.cursor.len()).rev() {
            self.cursor[i] += 1;
            if self.cursor[i] < self.values[i].len() {
                self.exhausted = false;
                break;
            }
            self.cursor[i] = 0;
        }
        Some(item)
    }
}

/// Parse and expand in one go.
pub fn expand_all<E: Environment + ?Sized>(template: &str, env: &E) -> Result<Vec<String>, PatternError> {
    Ok(Pattern::parse(template)?.expand(env).collect())
}
