//! Single-level rollback history

/// Snapshot slot holding the state before the most recent mutation
///
/// Recording overwrites the previous snapshot in place, so repeated mutations
/// of a same-shaped accumulator reuse one allocation.
#[derive(Clone, Debug)]
pub(crate) struct History<S> {
    previous: Option<S>,
}

impl<S> Default for History<S> {
    fn default() -> Self {
        Self { previous: None }
    }
}

impl<S: Clone> History<S> {
    /// Remember `state` as the rollback target
    pub(crate) fn record(&mut self, state: &S) {
        match self.previous.as_mut() {
            Some(previous) => previous.clone_from(state),
            None => self.previous = Some(state.clone()),
        }
    }

    /// Take the snapshot out, leaving the slot empty
    pub(crate) fn take(&mut self) -> Option<S> {
        self.previous.take()
    }

    pub(crate) fn get(&self) -> Option<&S> {
        self.previous.as_ref()
    }

    pub(crate) fn is_recorded(&self) -> bool {
        self.previous.is_some()
    }

    pub(crate) fn clear(&mut self) {
        self.previous = None;
    }
}
