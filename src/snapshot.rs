//! Observability snapshots handed to observers after every cycle.

use crate::types::{ActionId, TuringMachineError};

/// The content and head position of one tape at the time of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TapeView<Y> {
    pub cells: Vec<Y>,
    pub head: usize,
}

/// The execution status reported with a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// The machine applied an action and keeps running.
    Running,
    /// The machine reached its halt state.
    Halted,
    /// A cycle failed. The machine cannot continue.
    Errored(TuringMachineError),
    /// The driver was cancelled before the machine halted.
    Cancelled,
}

impl Status {
    /// Returns `true` for every status after which no further snapshot is delivered.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Status::Running)
    }
}

/// A consistent copy of the machine taken between two cycles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot<S, Y> {
    pub tapes: Vec<TapeView<Y>>,
    /// Stack contents from bottom to top.
    pub stacks: Vec<Vec<Y>>,
    pub state: S,
    /// Number of cycles applied so far.
    pub step: usize,
    /// The action applied by the cycle that produced this snapshot, if any.
    pub action: Option<ActionId>,
    pub status: Status,
}

impl<S, Y> Snapshot<S, Y> {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
