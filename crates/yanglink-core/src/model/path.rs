//! Schema path expressions.
//!
//! Covers the three path shapes the linker resolves:
//!
//! ```text
//! /ex:interfaces/ex:interface        absolute (augment, deviation, leafref)
//! ../../config/name                  relative with ancestor hops (leafref)
//! interface/mtu                      descendant (uses-augment, unique)
//! /list[key = current()/../id]/value predicates (leafref only)
//! ```

use super::ids::NodeId;
use super::location::Location;
use super::types::QName;
use crate::error::LinkError;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

/// Check an identifier against the YANG naming rules.
///
/// # Errors
///
/// Returns the rule that was broken.
pub fn check_identifier(identifier: &str) -> Result<(), &'static str> {
    let mut chars = identifier.chars();
    match chars.next() {
        None => return Err("identifier is empty"),
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        Some(_) => return Err("must start with a letter or underscore"),
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')) {
        return Err("may only contain letters, digits, '_', '-' and '.'");
    }
    if identifier.len() >= 3 && identifier[..3].eq_ignore_ascii_case("xml") {
        return Err("must not start with \"xml\"");
    }
    Ok(())
}

/// Validate both parts of a qualified name.
///
/// # Errors
///
/// Returns [`LinkError::InvalidIdentifier`] for the first bad part.
pub fn validate_qname(name: &QName, location: &Location) -> Result<(), LinkError> {
    for part in name.prefix.iter().chain(core::iter::once(&name.name)) {
        check_identifier(part).map_err(|reason| LinkError::InvalidIdentifier {
            location: location.clone(),
            identifier: part.clone(),
            reason,
        })?;
    }
    Ok(())
}

/// A `[key = current()/../x]` predicate on a leafref path step.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PathPredicate {
    /// Key leaf named on the left of `=`.
    pub key: QName,
    /// Path after `current()`.
    pub right: SchemaPath,
    /// Key leaf inside the list, once resolved.
    pub left_axis: Option<NodeId>,
    /// Leaf reached by `right`, once resolved.
    pub right_axis: Option<NodeId>,
}

/// One `prefix:name` step.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PathStep {
    /// Step identifier.
    pub name: QName,
    /// Predicates (leafref paths only).
    pub predicates: Vec<PathPredicate>,
}

impl PathStep {
    /// A step without predicates.
    #[must_use]
    pub fn new(name: QName) -> Self {
        Self {
            name,
            predicates: Vec::new(),
        }
    }
}

/// An absolute or relative sequence of steps.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SchemaPath {
    /// Starts at a module root.
    pub absolute: bool,
    /// Number of leading `..` hops (relative paths only).
    pub ancestors: usize,
    /// Steps after the hops.
    pub steps: Vec<PathStep>,
}

impl SchemaPath {
    /// Build an absolute path from `(prefix, name)` pairs.
    #[must_use]
    pub fn absolute(steps: &[(Option<&str>, &str)]) -> Self {
        Self {
            absolute: true,
            ancestors: 0,
            steps: steps
                .iter()
                .map(|(prefix, name)| PathStep::new(QName::new(*prefix, name)))
                .collect(),
        }
    }

    /// Parse a path expression.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::InvalidPath`] for malformed syntax and
    /// [`LinkError::InvalidIdentifier`] for a bad step name.
    pub fn parse(text: &str, location: &Location) -> Result<Self, LinkError> {
        Parser {
            text,
            location,
            allow_predicates: true,
        }
        .path(text.trim())
    }

    /// Last step, if any.
    #[must_use]
    pub fn last(&self) -> Option<&PathStep> {
        self.steps.last()
    }

    /// Apply `f` to every prefix slot, including predicate keys and right paths.
    pub fn for_each_prefix_mut(&mut self, f: &mut dyn FnMut(&mut QName)) {
        for step in &mut self.steps {
            f(&mut step.name);
            for predicate in &mut step.predicates {
                f(&mut predicate.key);
                predicate.right.for_each_prefix_mut(f);
            }
        }
    }
}

impl fmt::Display for SchemaPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.absolute {
            f.write_str("/")?;
        }
        for _ in 0..self.ancestors {
            f.write_str("../")?;
        }
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{}", step.name)?;
            for p in &step.predicates {
                write!(f, "[{} = current()/{}]", p.key, p.right)?;
            }
        }
        Ok(())
    }
}

struct Parser<'a> {
    text: &'a str,
    location: &'a Location,
    allow_predicates: bool,
}

impl Parser<'_> {
    fn fail(&self, reason: &str) -> LinkError {
        LinkError::invalid_path(self.location, "schema", self.text, reason)
    }

    fn path(&self, text: &str) -> Result<SchemaPath, LinkError> {
        if text.is_empty() {
            return Err(self.fail("path is empty"));
        }
        let (absolute, mut rest) = match text.strip_prefix('/') {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        let mut ancestors = 0;
        if !absolute {
            loop {
                rest = rest.trim_start();
                if let Some(after) = rest.strip_prefix("../") {
                    ancestors += 1;
                    rest = after;
                } else if rest == ".." {
                    ancestors += 1;
                    rest = "";
                    break;
                } else {
                    break;
                }
            }
        }

        let mut steps = Vec::new();
        if !rest.is_empty() {
            for segment in split_top_level(rest) {
                steps.push(self.step(segment.trim())?);
            }
        }
        if steps.is_empty() && ancestors == 0 {
            return Err(self.fail("path has no steps"));
        }
        Ok(SchemaPath {
            absolute,
            ancestors,
            steps,
        })
    }

    fn step(&self, segment: &str) -> Result<PathStep, LinkError> {
        if segment.is_empty() {
            return Err(self.fail("empty step"));
        }
        let (name, mut rest) = match segment.find('[') {
            Some(idx) => (segment[..idx].trim(), &segment[idx..]),
            None => (segment, ""),
        };
        let name = QName::parse(name);
        validate_qname(&name, self.location)?;

        let mut predicates = Vec::new();
        while !rest.is_empty() {
            if !self.allow_predicates {
                return Err(self.fail("predicates are not allowed here"));
            }
            let Some(body) = rest.strip_prefix('[') else {
                return Err(self.fail("expected '['"));
            };
            let Some(end) = body.find(']') else {
                return Err(self.fail("unterminated predicate"));
            };
            predicates.push(self.predicate(&body[..end])?);
            rest = body[end + 1..].trim_start();
        }
        Ok(PathStep { name, predicates })
    }

    fn predicate(&self, body: &str) -> Result<PathPredicate, LinkError> {
        let Some((key, right)) = body.split_once('=') else {
            return Err(self.fail("predicate lacks '='"));
        };
        let key = QName::parse(key.trim());
        validate_qname(&key, self.location)?;

        let right = right.trim();
        let Some(after) = right.strip_prefix("current()") else {
            return Err(self.fail("predicate must compare against current()"));
        };
        let after = after.trim_start();
        let Some(relative) = after.strip_prefix('/') else {
            return Err(self.fail("expected '/' after current()"));
        };
        let nested = Parser {
            text: self.text,
            location: self.location,
            allow_predicates: false,
        };
        let right = nested.path(relative.trim())?;
        if right.absolute {
            return Err(self.fail("predicate path must be relative"));
        }
        Ok(PathPredicate {
            key,
            right,
            left_axis: None,
            right_axis: None,
        })
    }
}

/// Split on `/` outside of brackets.
fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (idx, ch) in text.char_indices() {
        match ch {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            '/' if depth == 0 => {
                parts.push(&text[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}
