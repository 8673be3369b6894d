//! Scope names and scope paths shared by the tokenizer and the theme resolver.

use compact_str::CompactString;
use std::sync::Arc;

/// A dot-separated hierarchical label such as `string.quoted.double`.
pub type Scope = CompactString;

/// Ordered scope names active at a position, outermost first.
///
/// Paths are shared between tokens and rule-stack frames; cloning is a refcount bump.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScopePath(Arc<[Scope]>);

impl ScopePath {
    pub fn empty() -> Self {
        Self(Arc::from(Vec::<Scope>::new()))
    }

    pub fn from_scopes<I, S>(scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Scope>,
    {
        let scopes: Vec<Scope> = scopes.into_iter().map(Into::into).collect();
        Self(Arc::from(scopes))
    }

    /// Returns a new path with `scope` appended. A `None` scope returns a cheap clone.
    pub fn push(&self, scope: Option<&Scope>) -> Self {
        let Some(scope) = scope else {
            return self.clone();
        };
        let mut scopes = Vec::with_capacity(self.0.len() + 1);
        scopes.extend(self.0.iter().cloned());
        scopes.push(scope.clone());
        Self(Arc::from(scopes))
    }

    pub fn as_slice(&self) -> &[Scope] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn innermost(&self) -> Option<&Scope> {
        self.0.last()
    }

    pub(crate) fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Default for ScopePath {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::fmt::Display for ScopePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, scope) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            f.write_str(scope)?;
        }
        Ok(())
    }
}

/// `true` when `scope` equals `selector` or extends it on a dot boundary
/// (`string.quoted` matches `string.quoted.double`, not `string.quotedx`).
pub fn scope_matches(selector: &str, scope: &str) -> bool {
    match scope.strip_prefix(selector) {
        Some(rest) => rest.is_empty() || rest.starts_with('.'),
        None => false,
    }
}
