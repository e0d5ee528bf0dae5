//! # Scope
//!
//! Hierarchical address used to route events, e.g. `/sensors/left/`.
//!
//! ## Rules
//!
//! - A scope string starts with `/`; the trailing `/` may be omitted on input.
//! - Components are non-empty and consist of ASCII alphanumerics, `_` and `-`.
//! - The canonical form always ends with `/`; the root scope is `/`.

use std::fmt;
use std::str::FromStr;

use crate::errors::ScopeError;

/// A parsed, canonical scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Scope {
    components: Vec<String>,
}

impl Scope {
    /// Separator between scope components.
    pub const SEPARATOR: char = '/';

    /// The root scope `/`.
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a scope string.
    ///
    /// # Errors
    ///
    /// Returns [`ScopeError`] when the string does not start with `/`,
    /// contains an empty component, or contains an invalid character.
    pub fn parse(input: &str) -> Result<Self, ScopeError> {
        let Some(rest) = input.strip_prefix(Self::SEPARATOR) else {
            return Err(ScopeError::MissingLeadingSeparator(input.to_string()));
        };
        if rest.is_empty() {
            return Ok(Self::root());
        }

        let rest = rest.strip_suffix(Self::SEPARATOR).unwrap_or(rest);
        let mut components = Vec::new();
        for component in rest.split(Self::SEPARATOR) {
            if component.is_empty() {
                return Err(ScopeError::EmptyComponent(input.to_string()));
            }
            if let Some(bad) = component
                .chars()
                .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
            {
                return Err(ScopeError::InvalidCharacter {
                    scope: input.to_string(),
                    character: bad,
                });
            }
            components.push(component.to_string());
        }
        Ok(Self { components })
    }

    /// Components from the root downwards.
    #[must_use]
    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// Whether this is the root scope.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.components.is_empty()
    }

    /// Append `child` below this scope.
    #[must_use]
    pub fn concat(&self, child: &Scope) -> Scope {
        let mut components = self.components.clone();
        components.extend(child.components.iter().cloned());
        Scope { components }
    }

    /// Strictly below `other` in the hierarchy.
    #[must_use]
    pub fn is_subscope_of(&self, other: &Scope) -> bool {
        self.components.len() > other.components.len()
            && self.components.starts_with(&other.components)
    }

    /// Strictly above `other` in the hierarchy.
    #[must_use]
    pub fn is_superscope_of(&self, other: &Scope) -> bool {
        other.is_subscope_of(self)
    }

    /// Whether an event on `self` is visible to a receiver on `filter`.
    #[must_use]
    pub fn is_within(&self, filter: &Scope) -> bool {
        self == filter || self.is_subscope_of(filter)
    }

    /// All scopes above this one, from the root down, optionally including
    /// this scope itself.
    #[must_use]
    pub fn super_scopes(&self, include_self: bool) -> Vec<Scope> {
        let end = if include_self {
            self.components.len()
        } else {
            self.components.len().saturating_sub(1)
        };
        (0..=end)
            .filter(|len| include_self || *len < self.components.len())
            .map(|len| Scope {
                components: self.components[..len].to_vec(),
            })
            .collect()
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Self::SEPARATOR)?;
        for component in &self.components {
            write!(f, "{component}{}", Self::SEPARATOR)?;
        }
        Ok(())
    }
}

impl FromStr for Scope {
    type Err = ScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
