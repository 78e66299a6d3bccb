//! Selection and cursor tracking.
//!
//! Both are keyed by job id, never by row index, so they survive reordering.
//! A background poll only moves the cursor when the focused job disappeared.

use std::collections::BTreeSet;

use super::reconciler::{Diff, ViewModel};
use crate::models::JobId;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    selected: BTreeSet<JobId>,
    cursor: Option<JobId>,
    /// Row of the cursor in the last view it was placed against; used to
    /// relocate when the focused job vanishes
    cursor_row: usize,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip membership of `id`. Returns whether it is now selected.
    /// The cursor is never touched.
    pub fn toggle(&mut self, id: &JobId) -> bool {
        if self.selected.remove(id) {
            false
        } else {
            self.selected.insert(id.clone());
            true
        }
    }

    #[must_use]
    pub fn selected_ids(&self) -> &BTreeSet<JobId> {
        &self.selected
    }

    #[must_use]
    pub fn is_selected(&self, id: &JobId) -> bool {
        self.selected.contains(id)
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Drop the given ids from the selection
    pub fn deselect<'a>(&mut self, ids: impl IntoIterator<Item = &'a JobId>) {
        for id in ids {
            self.selected.remove(id);
        }
    }

    #[must_use]
    pub fn cursor(&self) -> Option<&JobId> {
        self.cursor.as_ref()
    }

    #[must_use]
    pub fn cursor_index(&self, view: &ViewModel) -> Option<usize> {
        self.cursor.as_ref().and_then(|id| view.index_of(id))
    }

    /// Shift the cursor by `delta` rows, clamped to the list.
    pub fn move_cursor(&mut self, delta: isize, view: &ViewModel) {
        if view.is_empty() {
            self.cursor = None;
            self.cursor_row = 0;
            return;
        }
        let current = self.cursor_index(view).unwrap_or(0);
        let last = view.len() - 1;
        let target = current.saturating_add_signed(delta).min(last);
        self.place(target, view);
    }

    pub fn move_to_top(&mut self, view: &ViewModel) {
        if view.is_empty() {
            self.cursor = None;
        } else {
            self.place(0, view);
        }
    }

    pub fn move_to_bottom(&mut self, view: &ViewModel) {
        if view.is_empty() {
            self.cursor = None;
        } else {
            self.place(view.len() - 1, view);
        }
    }

    /// Targets for a kill: the selection if non-empty, else the cursor row
    #[must_use]
    pub fn action_targets(&self) -> Vec<JobId> {
        if self.selected.is_empty() {
            self.cursor.iter().cloned().collect()
        } else {
            self.selected.iter().cloned().collect()
        }
    }

    /// Bring selection and cursor in line with a freshly reconciled view.
    ///
    /// Removed ids leave the selection. A cursor whose job vanished moves to
    /// the row now at the same index, else the last row, else none. An empty
    /// cursor lands on the first row. Applying the same diff twice is a no-op.
    pub fn reconcile(&mut self, diff: &Diff, view: &ViewModel) {
        for id in &diff.removed {
            self.selected.remove(id);
        }
        self.selected.retain(|id| view.contains(id));

        if view.is_empty() {
            self.cursor = None;
            self.cursor_row = 0;
            return;
        }

        match self.cursor_index(view) {
            Some(index) => self.cursor_row = index,
            None => {
                let index = if self.cursor.is_some() {
                    self.cursor_row.min(view.len() - 1)
                } else {
                    0
                };
                self.place(index, view);
            }
        }
    }

    fn place(&mut self, index: usize, view: &ViewModel) {
        self.cursor = view.id_at(index).cloned();
        self.cursor_row = index;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::reconciler::Reconciler;
    use crate::models::{JobRecord, JobState};
    use chrono::Utc;

    fn poll(reconciler: &mut Reconciler, ids: &[&str]) -> Diff {
        let records = ids
            .iter()
            .enumerate()
            .map(|(i, id)| JobRecord::new(*id, JobState::Running).submitted_at(i as i64 + 1))
            .collect();
        reconciler.apply_success(records, Utc::now())
    }

    fn id(s: &str) -> JobId {
        JobId::from(s)
    }

    #[test]
    fn test_toggle_never_moves_cursor() {
        let mut reconciler = Reconciler::new(false);
        let diff = poll(&mut reconciler, &["A", "B", "C"]);
        let mut sel = SelectionState::new();
        sel.reconcile(&diff, reconciler.view());
        assert_eq!(sel.cursor(), Some(&id("A")));

        assert!(sel.toggle(&id("C")));
        assert_eq!(sel.cursor(), Some(&id("A")));
        assert!(sel.is_selected(&id("C")));
        assert!(!sel.toggle(&id("C")));
        assert!(sel.selected_ids().is_empty());
    }

    #[test]
    fn test_move_cursor_clamps() {
        let mut reconciler = Reconciler::new(false);
        let diff = poll(&mut reconciler, &["A", "B", "C"]);
        let view = reconciler.view().clone();
        let mut sel = SelectionState::new();
        sel.reconcile(&diff, &view);

        sel.move_cursor(-5, &view);
        assert_eq!(sel.cursor_index(&view), Some(0));
        sel.move_cursor(1, &view);
        assert_eq!(sel.cursor(), Some(&id("B")));
        sel.move_cursor(100, &view);
        assert_eq!(sel.cursor(), Some(&id("C")));
        sel.move_to_top(&view);
        assert_eq!(sel.cursor(), Some(&id("A")));
        sel.move_to_bottom(&view);
        assert_eq!(sel.cursor(), Some(&id("C")));
    }

    #[test]
    fn test_move_cursor_on_empty_list() {
        let view = ViewModel::default();
        let mut sel = SelectionState::new();
        sel.move_cursor(1, &view);
        assert_eq!(sel.cursor(), None);
    }

    #[test]
    fn test_selected_job_ages_out_and_cursor_moves_to_remaining() {
        let mut reconciler = Reconciler::new(false);
        let diff = poll(&mut reconciler, &["A", "B"]);
        let mut sel = SelectionState::new();
        sel.reconcile(&diff, reconciler.view());

        // User focuses and selects B
        let view = reconciler.view().clone();
        sel.move_cursor(1, &view);
        sel.toggle(&id("B"));

        let diff = poll(&mut reconciler, &["A"]);
        sel.reconcile(&diff, reconciler.view());

        assert!(sel.selected_ids().is_empty());
        assert_eq!(sel.cursor(), Some(&id("A")));
    }

    #[test]
    fn test_cursor_relocates_to_same_index() {
        let mut reconciler = Reconciler::new(false);
        let diff = poll(&mut reconciler, &["A", "B", "C", "D"]);
        let mut sel = SelectionState::new();
        sel.reconcile(&diff, reconciler.view());
        let view = reconciler.view().clone();
        sel.move_cursor(1, &view);
        assert_eq!(sel.cursor(), Some(&id("B")));

        let diff = poll(&mut reconciler, &["A", "C", "D"]);
        sel.reconcile(&diff, reconciler.view());
        assert_eq!(sel.cursor(), Some(&id("C")));
        assert_eq!(sel.cursor_index(reconciler.view()), Some(1));
    }

    #[test]
    fn test_cursor_relocates_to_last_when_list_shrinks() {
        let mut reconciler = Reconciler::new(false);
        let diff = poll(&mut reconciler, &["A", "B", "C", "D"]);
        let mut sel = SelectionState::new();
        sel.reconcile(&diff, reconciler.view());
        let view = reconciler.view().clone();
        sel.move_to_bottom(&view);

        let diff = poll(&mut reconciler, &["A", "B"]);
        sel.reconcile(&diff, reconciler.view());
        assert_eq!(sel.cursor(), Some(&id("B")));
    }

    #[test]
    fn test_cursor_none_when_list_empties() {
        let mut reconciler = Reconciler::new(false);
        let diff = poll(&mut reconciler, &["A"]);
        let mut sel = SelectionState::new();
        sel.reconcile(&diff, reconciler.view());

        let diff = poll(&mut reconciler, &[]);
        sel.reconcile(&diff, reconciler.view());
        assert_eq!(sel.cursor(), None);
    }

    #[test]
    fn test_cursor_stays_when_other_rows_change() {
        let mut reconciler = Reconciler::new(false);
        let diff = poll(&mut reconciler, &["A", "B", "C"]);
        let mut sel = SelectionState::new();
        sel.reconcile(&diff, reconciler.view());
        let view = reconciler.view().clone();
        sel.move_cursor(2, &view);

        // A vanishes, C shifts up a row but keeps focus
        let diff = poll(&mut reconciler, &["B", "C", "E"]);
        sel.reconcile(&diff, reconciler.view());
        assert_eq!(sel.cursor(), Some(&id("C")));
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let mut reconciler = Reconciler::new(false);
        let diff = poll(&mut reconciler, &["A", "B", "C"]);
        let mut sel = SelectionState::new();
        sel.reconcile(&diff, reconciler.view());
        let view = reconciler.view().clone();
        sel.move_cursor(1, &view);
        sel.toggle(&id("A"));
        sel.toggle(&id("B"));

        let diff = poll(&mut reconciler, &["A", "C"]);
        sel.reconcile(&diff, reconciler.view());
        let once = sel.clone();
        sel.reconcile(&diff, reconciler.view());
        assert_eq!(sel, once);

        for removed in &diff.removed {
            assert!(!sel.is_selected(removed));
        }
    }

    #[test]
    fn test_action_targets_prefers_selection() {
        let mut reconciler = Reconciler::new(false);
        let diff = poll(&mut reconciler, &["A", "B", "C"]);
        let mut sel = SelectionState::new();
        sel.reconcile(&diff, reconciler.view());

        assert_eq!(sel.action_targets(), vec![id("A")]);

        sel.toggle(&id("C"));
        sel.toggle(&id("B"));
        assert_eq!(sel.action_targets(), vec![id("B"), id("C")]);

        sel.clear();
        assert_eq!(sel.action_targets(), vec![id("A")]);
    }
}
