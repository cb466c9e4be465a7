//! Modal-local working copies of drafts.

/// Result of asking to close an [`EditBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// The working copy was discarded.
    Closed,
    /// The working copy has unsaved changes; ask the user, then close again
    /// with `confirmed = true`.
    NeedsConfirmation,
}

/// A working copy of a draft, never persisted.
///
/// Remembers the draft it was opened with so it can tell whether the user
/// changed anything.
#[derive(Debug, Clone)]
pub struct EditBuffer<D> {
    original: D,
    working: D,
}

impl<D: Clone + PartialEq> EditBuffer<D> {
    pub fn open(draft: D) -> Self {
        Self {
            original: draft.clone(),
            working: draft,
        }
    }

    pub fn get(&self) -> &D {
        &self.working
    }

    pub fn get_mut(&mut self) -> &mut D {
        &mut self.working
    }

    pub fn is_dirty(&self) -> bool {
        self.working != self.original
    }

    /// Try to close without saving.
    ///
    /// On [`CloseOutcome::NeedsConfirmation`] the buffer is unchanged.
    pub fn request_close(&mut self, confirmed: bool) -> CloseOutcome {
        if self.is_dirty() && !confirmed {
            return CloseOutcome::NeedsConfirmation;
        }
        self.working = self.original.clone();
        CloseOutcome::Closed
    }

    /// Hand the working copy over for saving.
    pub fn commit(self) -> D {
        self.working
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::ClientDraft;

    #[test]
    fn clean_buffer_closes_immediately() {
        let mut buffer = EditBuffer::open(ClientDraft::new("Ana", ""));
        assert!(!buffer.is_dirty());
        assert_eq!(buffer.request_close(false), CloseOutcome::Closed);
    }

    #[test]
    fn dirty_buffer_needs_confirmation() {
        let mut buffer = EditBuffer::open(ClientDraft::new("Ana", ""));
        buffer.get_mut().phone = "555".into();
        assert!(buffer.is_dirty());

        assert_eq!(buffer.request_close(false), CloseOutcome::NeedsConfirmation);
        assert_eq!(buffer.get().phone, "555");

        assert_eq!(buffer.request_close(true), CloseOutcome::Closed);
        assert!(!buffer.is_dirty());
        assert_eq!(buffer.get().phone, "");
    }

    #[test]
    fn commit_returns_working_copy() {
        let mut buffer = EditBuffer::open(ClientDraft::new("Ana", ""));
        buffer.get_mut().name = "Bea".into();
        assert_eq!(buffer.commit().name, "Bea");
    }
}
