//! Named placeholder allocation.

use crate::statement::Params;

/// Hands out `:p0`, `:p1`, ... and records the bound values.
///
/// One binder per statement: assignments and predicates share the counter, so
/// names never collide even when a column appears twice.
#[derive(Debug, Default)]
pub(crate) struct Binder {
    params: Params,
    next: usize,
}

impl Binder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Bind `value` and append its placeholder to `out`.
    pub(crate) fn push_bound(&mut self, out: &mut String, value: impl Into<String>) {
        let name = format!("p{}", self.next);
        self.next += 1;
        out.push(':');
        out.push_str(&name);
        self.params.insert(name, value.into());
    }

    pub(crate) fn into_params(self) -> Params {
        self.params
    }
}
