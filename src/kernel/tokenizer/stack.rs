//! Rule-stack state carried from one line to the next.
//!
//! Frames are immutable and linked to their parent through `Arc`, so pushing a frame or
//! handing the state to the next line never copies the stack.

use crate::kernel::grammar::RuleId;
use crate::kernel::scope::ScopePath;
use std::fmt;
use std::sync::Arc;

#[derive(Debug)]
struct Frame {
    parent: Option<Arc<Frame>>,
    rule: RuleId,
    /// End pattern with begin captures substituted, for rules whose `end` uses backreferences.
    end: Option<Arc<str>>,
    name_scopes: ScopePath,
    content_scopes: ScopePath,
    depth: usize,
}

/// Active begin/end contexts, innermost on top. The empty stack means "inside the grammar root".
#[derive(Clone, Default)]
pub struct RuleStack {
    top: Option<Arc<Frame>>,
}

impl RuleStack {
    pub fn empty() -> Self {
        Self { top: None }
    }

    pub fn is_empty(&self) -> bool {
        self.top.is_none()
    }

    pub fn depth(&self) -> usize {
        self.top.as_ref().map_or(0, |f| f.depth)
    }

    pub fn top_rule(&self) -> Option<RuleId> {
        self.top.as_ref().map(|f| f.rule)
    }

    pub(crate) fn top_end(&self) -> Option<&str> {
        self.top.as_ref().and_then(|f| f.end.as_deref())
    }

    pub(crate) fn name_scopes(&self) -> Option<&ScopePath> {
        self.top.as_ref().map(|f| &f.name_scopes)
    }

    pub(crate) fn content_scopes(&self) -> Option<&ScopePath> {
        self.top.as_ref().map(|f| &f.content_scopes)
    }

    pub(crate) fn push(
        &self,
        rule: RuleId,
        end: Option<Arc<str>>,
        name_scopes: ScopePath,
        content_scopes: ScopePath,
    ) -> Self {
        let depth = self.depth() + 1;
        Self {
            top: Some(Arc::new(Frame {
                parent: self.top.clone(),
                rule,
                end,
                name_scopes,
                content_scopes,
                depth,
            })),
        }
    }

    pub(crate) fn pop(&self) -> Self {
        Self {
            top: self.top.as_ref().and_then(|f| f.parent.clone()),
        }
    }

    /// Rule ids from innermost to outermost.
    pub fn rules(&self) -> impl Iterator<Item = RuleId> + '_ {
        let mut cur = self.top.as_deref();
        std::iter::from_fn(move || {
            let frame = cur?;
            cur = frame.parent.as_deref();
            Some(frame.rule)
        })
    }
}

impl PartialEq for RuleStack {
    /// Equal when both stacks hold the same rules with the same resolved end patterns.
    fn eq(&self, other: &Self) -> bool {
        let mut a = self.top.as_ref();
        let mut b = other.top.as_ref();
        loop {
            match (a, b) {
                (None, None) => return true,
                (Some(x), Some(y)) => {
                    if Arc::ptr_eq(x, y) {
                        return true;
                    }
                    if x.depth != y.depth || x.rule != y.rule || x.end != y.end {
                        return false;
                    }
                    a = x.parent.as_ref();
                    b = y.parent.as_ref();
                }
                _ => return false,
            }
        }
    }
}

impl Eq for RuleStack {}

impl fmt::Debug for RuleStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut rules: Vec<RuleId> = self.rules().collect();
        rules.reverse();
        f.debug_struct("RuleStack")
            .field("rules", &rules)
            .field("end", &self.top_end())
            .finish()
    }
}
