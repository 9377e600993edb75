//! Row-edit finite-state machine
//!
//! The single-active-edit invariant lives here as an explicit state value
//! with pure transitions: `transition` returns the next state plus the side
//! effects the controller must execute, so the machine is testable without
//! a network in sight.

use gridloom_core::RowKey;

use crate::notices::NoticeLevel;

/// Edit lifecycle of a table controller. At most one row edits at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditState {
    Idle,
    Editing(RowKey),
    Saving(RowKey),
}

impl EditState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

/// User-driven events feeding the machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditEvent {
    BeginEdit(RowKey),
    /// Begin editing a not-yet-persisted draft row (add or copy)
    BeginAdd,
    Save,
    SaveSucceeded,
    SaveFailed,
    Cancel,
}

/// Side effects the controller executes after a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditCommand {
    /// Snapshot the current row list for later rollback
    SnapshotRows,
    /// Insert the prepared draft row at the head of the list
    InsertDraft,
    /// Submit the draft for the given row to the remote source
    SubmitDraft(RowKey),
    /// Restore the pre-edit row snapshot
    RestoreSnapshot,
    /// Drop the pre-edit snapshot and draft state
    DiscardSnapshot,
    /// Re-fetch the current page and re-derive rows
    Refresh,
    /// The event was rejected; tell the user why
    Reject(NoticeLevel, &'static str),
}

/// Pure transition function: next state plus commands to execute.
pub fn transition(state: EditState, event: EditEvent) -> (EditState, Vec<EditCommand>) {
    use EditCommand::*;
    use EditState::*;

    match (state, event) {
        (Idle, EditEvent::BeginEdit(key)) => (Editing(key), vec![SnapshotRows]),
        (Idle, EditEvent::BeginAdd) => (
            Editing(RowKey::draft()),
            vec![SnapshotRows, InsertDraft],
        ),
        (state @ (Editing(_) | Saving(_)), EditEvent::BeginEdit(_) | EditEvent::BeginAdd) => (
            state,
            vec![Reject(
                NoticeLevel::Warning,
                "another row is already being edited",
            )],
        ),

        (Editing(key), EditEvent::Save) => {
            let submit = SubmitDraft(key.clone());
            (Saving(key), vec![submit])
        }
        (Saving(_), EditEvent::SaveSucceeded) => (Idle, vec![DiscardSnapshot, Refresh]),
        (Saving(key), EditEvent::SaveFailed) => (Editing(key), vec![RestoreSnapshot]),

        (Editing(_), EditEvent::Cancel) => (Idle, vec![RestoreSnapshot, DiscardSnapshot]),
        (state @ Saving(_), EditEvent::Cancel) => (
            state,
            vec![Reject(NoticeLevel::Warning, "a save is still in progress")],
        ),

        // everything else has no active edit to act on
        (state, _) => (
            state,
            vec![Reject(NoticeLevel::Warning, "no row is being edited")],
        ),
    }
}
