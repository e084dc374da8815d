use std::fmt;
use std::str::FromStr;

/// Rendering of a filter without any criteria.
pub const GLOBAL: &str = "Global";

const SEPARATOR: char = '/';
const KEY_SEPARATOR: char = ':';
const WILDCARD: &str = "*";
const ESCAPE: char = '\\';

/// Characters that are escaped with a backslash when rendering a node name
/// or key.
const RESERVED: [char; 4] = [ESCAPE, SEPARATOR, KEY_SEPARATOR, '*'];

struct Escaped<'a>(&'a str);

impl fmt::Display for Escaped<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in self.0.chars() {
            if RESERVED.contains(&c) {
                write!(f, "{}", ESCAPE)?;
            }
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

/// Byte offset of the first `target` in `s` not preceded by an escape.
fn find_unescaped(s: &str, target: char) -> Option<usize> {
    let mut escaped = false;
    for (idx, c) in s.char_indices() {
        if escaped {
            escaped = false;
        } else if c == ESCAPE {
            escaped = true;
        } else if c == target {
            return Some(idx);
        }
    }
    None
}

fn split_unescaped(mut s: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    while let Some(idx) = find_unescaped(s, separator) {
        parts.push(&s[..idx]);
        s = &s[idx + separator.len_utf8()..];
    }
    parts.push(s);
    parts
}

fn unescape(s: &str) -> Result<String, FilterParseError> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != ESCAPE {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(next) => out.push(next),
            None => {
                return Err(FilterParseError::TrailingEscape {
                    segment: s.to_string(),
                });
            }
        }
    }
    Ok(out)
}

/// The match condition for a single tree level.
///
/// Either part may be unset, in which case it matches anything: a criterion
/// with only a node name matches every node of that kind at its level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Criterion {
    node: Option<String>,
    value: Option<String>,
}

impl Criterion {
    /// Matches any node at this level.
    pub fn any() -> Self {
        Self::default()
    }

    /// Matches any node named `node` at this level.
    pub fn node(node: impl Into<String>) -> Self {
        Self {
            node: Some(node.into()),
            value: None,
        }
    }

    /// Matches only the node named `node` keyed by `value`.
    pub fn exact(node: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            node: Some(node.into()),
            value: Some(value.into()),
        }
    }

    pub fn node_name(&self) -> Option<&str> {
        self.node.as_deref()
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn is_wildcard(&self) -> bool {
        self.node.is_none() && self.value.is_none()
    }

    /// Returns true if a node with the given name and key satisfies this
    /// criterion.
    pub fn admits(&self, node_name: &str, key: Option<&str>) -> bool {
        let node_ok = self.node.as_deref().map_or(true, |n| n == node_name);
        let value_ok = self.value.as_deref().map_or(true, |v| key == Some(v));
        node_ok && value_ok
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.node, &self.value) {
            (Some(node), Some(value)) => write!(f, "{}:{}", Escaped(node), Escaped(value)),
            (Some(node), None) => write!(f, "{}", Escaped(node)),
            (None, Some(value)) => write!(f, "{}:{}", WILDCARD, Escaped(value)),
            (None, None) => write!(f, "{}", WILDCARD),
        }
    }
}

impl FromStr for Criterion {
    type Err = FilterParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // An escaped `\*` is a literal star, only a bare `*` is a wildcard.
        let part = |p: &str| -> Result<Option<String>, FilterParseError> {
            if p == WILDCARD {
                Ok(None)
            } else {
                unescape(p).map(Some)
            }
        };

        let (node, value) = match find_unescaped(s, KEY_SEPARATOR) {
            Some(idx) => (&s[..idx], Some(&s[idx + KEY_SEPARATOR.len_utf8()..])),
            None => (s, None),
        };
        if node.is_empty() || value == Some("") {
            return Err(FilterParseError::EmptySegment {
                segment: s.to_string(),
            });
        }

        Ok(Self {
            node: part(node)?,
            value: value.map(part).transpose()?.flatten(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterParseError {
    #[error("empty filter segment in '{segment}'")]
    EmptySegment { segment: String },

    #[error("trailing escape character in '{segment}'")]
    TrailingEscape { segment: String },
}

/// A depth-ordered path predicate selecting a node or a subtree.
///
/// Criterion `n` applies to the `n`th addressable level below the root.
/// Levels deeper than the filter are unconstrained, so a filter naming a
/// deployment selects that deployment's whole subtree.
///
/// The rendered form joins criteria with `/`. Backslashes, `/`, `:` and `*`
/// inside names and keys are escaped with a backslash, so every filter
/// parses back to itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NodeFilter {
    criteria: Vec<Criterion>,
}

impl NodeFilter {
    /// The filter that matches every node.
    pub fn global() -> Self {
        Self::default()
    }

    /// Append a criterion for the next level.
    pub fn level(mut self, criterion: Criterion) -> Self {
        self.criteria.push(criterion);
        self
    }

    /// Append a level matching any node named `node`.
    pub fn any(self, node: &str) -> Self {
        self.level(Criterion::node(node))
    }

    pub fn deployment(self, name: impl Into<String>) -> Self {
        self.level(Criterion::exact("deployment", name))
    }

    pub fn provider(self, kind: impl Into<String>) -> Self {
        self.level(Criterion::exact("provider", kind))
    }

    pub fn account(self, name: impl Into<String>) -> Self {
        self.level(Criterion::exact("account", name))
    }

    pub fn webhooks(self) -> Self {
        self.level(Criterion::node("webhooks"))
    }

    pub fn criteria(&self) -> &[Criterion] {
        &self.criteria
    }

    /// The criterion for level `depth`, `None` past the end of the filter.
    pub fn get(&self, depth: usize) -> Option<&Criterion> {
        self.criteria.get(depth)
    }

    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    /// The first `len` levels of this filter, i.e. the filter of an ancestor.
    pub fn truncated(&self, len: usize) -> Self {
        Self {
            criteria: self.criteria.iter().take(len).cloned().collect(),
        }
    }

    /// Returns true if no criterion constrains anything.
    pub fn is_global(&self) -> bool {
        self.criteria.iter().all(Criterion::is_wildcard)
    }
}

impl fmt::Display for NodeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_global() {
            return write!(f, "{}", GLOBAL);
        }

        for (idx, criterion) in self.criteria.iter().enumerate() {
            if idx > 0 {
                write!(f, "{}", SEPARATOR)?;
            }
            write!(f, "{}", criterion)?;
        }
        Ok(())
    }
}

impl FromStr for NodeFilter {
    type Err = FilterParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s == GLOBAL {
            return Ok(Self::global());
        }

        let criteria = split_unescaped(s, SEPARATOR)
            .into_iter()
            .map(str::parse)
            .collect::<Result<Vec<Criterion>, _>>()?;
        Ok(Self { criteria })
    }
}
