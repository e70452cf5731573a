//! This module defines the core vocabulary shared by the engine and the driver:
//! symbol and state bounds, head directions, action identifiers, step outcomes,
//! execution modes and the error type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;
use thiserror::Error;

/// The default blank symbol used by programs that do not declare one.
pub const DEFAULT_BLANK_SYMBOL: char = '_';
/// The default no-write sentinel used by programs that do not declare one.
pub const DEFAULT_NOWRITE_SYMBOL: char = '*';
/// The default name of the halt state.
pub const DEFAULT_HALT_STATE: &str = "halt";
/// The maximum allowed size for a program file in bytes.
pub const MAX_PROGRAM_SIZE: usize = 65536; // 64KB

/// Values that can be written to tapes and stacks.
///
/// The alphabet is not enforced by the engine, any comparable and hashable value works.
pub trait Symbol: Clone + Eq + Hash + fmt::Debug {}

impl<T: Clone + Eq + Hash + fmt::Debug> Symbol for T {}

/// Values that name controller states.
pub trait State: Clone + Eq + Hash + fmt::Debug {}

impl<T: Clone + Eq + Hash + fmt::Debug> State for T {}

/// Represents the possible directions a tape head can move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Move the head one position to the left.
    Left,
    /// Move the head one position to the right.
    Right,
    /// Keep the head in the same position.
    Stay,
}

impl Direction {
    /// Parses one direction per character, e.g. `"<>-"`.
    ///
    /// Whitespace and commas are ignored so `"<, >, -"` is accepted too.
    pub fn parse_all(tokens: &str) -> Result<Vec<Direction>, TuringMachineError> {
        tokens
            .chars()
            .filter(|c| !c.is_whitespace() && *c != ',')
            .map(Direction::try_from)
            .collect()
    }

    /// Returns the canonical token for this direction.
    pub fn token(self) -> char {
        match self {
            Direction::Left => '<',
            Direction::Right => '>',
            Direction::Stay => '-',
        }
    }
}

impl TryFrom<char> for Direction {
    type Error = TuringMachineError;

    fn try_from(token: char) -> Result<Self, Self::Error> {
        match token {
            '<' | 'L' | 'l' => Ok(Direction::Left),
            '>' | 'R' | 'r' => Ok(Direction::Right),
            '-' | 'S' | 's' => Ok(Direction::Stay),
            other => Err(TuringMachineError::InvalidDirection(other)),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

/// A custom set of direction tokens, one character per direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectionTokens {
    pub left: char,
    pub right: char,
    pub stay: char,
}

impl Default for DirectionTokens {
    fn default() -> Self {
        Self {
            left: Direction::Left.token(),
            right: Direction::Right.token(),
            stay: Direction::Stay.token(),
        }
    }
}

impl DirectionTokens {
    /// Checks that the three tokens are distinct and not separators.
    pub fn validate(&self) -> Result<(), TuringMachineError> {
        let tokens = [self.left, self.right, self.stay];
        if let Some(&token) = tokens.iter().find(|c| c.is_whitespace() || **c == ',') {
            return Err(TuringMachineError::ValidationError(format!(
                "Direction token {:?} is a separator",
                token
            )));
        }
        if self.left == self.right || self.left == self.stay || self.right == self.stay {
            return Err(TuringMachineError::ValidationError(format!(
                "Direction tokens must differ, got '{}', '{}' and '{}'",
                self.left, self.right, self.stay
            )));
        }
        Ok(())
    }

    /// Parses one direction per character using only these tokens.
    ///
    /// Whitespace and commas are ignored, as in [`Direction::parse_all`].
    pub fn parse_all(&self, tokens: &str) -> Result<Vec<Direction>, TuringMachineError> {
        tokens
            .chars()
            .filter(|c| !c.is_whitespace() && *c != ',')
            .map(|c| match c {
                c if c == self.left => Ok(Direction::Left),
                c if c == self.right => Ok(Direction::Right),
                c if c == self.stay => Ok(Direction::Stay),
                other => Err(TuringMachineError::InvalidDirection(other)),
            })
            .collect()
    }
}

/// Identifies a registered action, assigned sequentially in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActionId(pub usize);

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Represents the outcome of a single execution cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The action with the given id was applied and the machine keeps running.
    Continue(ActionId),
    /// The machine is in its halt state, either just reached or already there.
    Halt,
}

impl Step {
    /// The action that should be reported as active after this step.
    pub fn action(self) -> Option<ActionId> {
        match self {
            Step::Continue(id) => Some(id),
            Step::Halt => None,
        }
    }
}

/// The execution mode of the engine.
///
/// Controls how stack pops interact with a failed transition lookup:
/// - `Consume` (default): every stack is popped before the lookup and a failed lookup
///   does not restore the popped values.
/// - `Atomic`: stack tops are peeked for the lookup and nothing is mutated unless an
///   action is found.
#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Pops happen unconditionally before the lookup.
    #[default]
    Consume,
    /// The cycle is committed only after a successful lookup.
    Atomic,
}

/// Broad classification of [`TuringMachineError`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller misconfigured the machine. Reported at the offending call.
    Setup,
    /// The machine failed while executing.
    Runtime,
}

/// Represents the errors that can occur while building or executing a machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TuringMachineError {
    /// A direction token is not one of `<`, `>`, `-` (or `L`, `R`, `S`).
    #[error("Invalid direction '{0}'")]
    InvalidDirection(char),
    /// An action carries the wrong number of values for one of its fields.
    #[error("Action for state {state} has {found} {field} values, expected {expected}")]
    ArityMismatch {
        state: String,
        field: &'static str,
        expected: usize,
        found: usize,
    },
    /// `init` was called on a machine without tapes.
    #[error("No tapes defined")]
    NoTapes,
    /// `init` was called on a machine without actions.
    #[error("No actions defined")]
    NoActions,
    /// Tapes, stacks and actions can only be added before `init`.
    #[error("Machine is already initialized")]
    AlreadyInitialized,
    /// Execution was requested before `init`.
    #[error("Machine is not initialized")]
    NotInitialized,
    /// There's no action defined for the current state, read values and popped values.
    #[error("No action defined for state {state} and values ({read}), ({pop})")]
    UndefinedTransition {
        state: String,
        read: String,
        pop: String,
    },
    /// The machine is owned by a running background driver.
    #[error("Machine is running in the background")]
    Busy,
    /// The driver was started more than once.
    #[error("Driver has already been started")]
    AlreadyStarted,
    /// The background worker could not be spawned or it panicked.
    #[error("Driver worker failed: {0}")]
    Worker(String),
    /// A program description is structurally invalid.
    #[error("Program validation error: {0}")]
    ValidationError(String),
    /// A program description could not be decoded.
    #[error("Program parsing error: {0}")]
    ParseError(String),
    /// Indicates an error related to file system operations, such as reading program files.
    #[error("File error: {0}")]
    FileError(String),
}

impl TuringMachineError {
    /// Returns whether this error is a setup or a runtime failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TuringMachineError::InvalidDirection(_)
            | TuringMachineError::ArityMismatch { .. }
            | TuringMachineError::NoTapes
            | TuringMachineError::NoActions
            | TuringMachineError::AlreadyInitialized
            | TuringMachineError::ValidationError(_)
            | TuringMachineError::ParseError(_)
            | TuringMachineError::FileError(_) => ErrorKind::Setup,
            TuringMachineError::UndefinedTransition { .. }
            | TuringMachineError::NotInitialized
            | TuringMachineError::Busy
            | TuringMachineError::AlreadyStarted
            | TuringMachineError::Worker(_) => ErrorKind::Runtime,
        }
    }

    pub(crate) fn undefined_transition<S: State, Y: Symbol>(
        state: &S,
        read: &[Y],
        pop: &[Y],
    ) -> Self {
        TuringMachineError::UndefinedTransition {
            state: format!("{:?}", state),
            read: join_debug(read),
            pop: join_debug(pop),
        }
    }
}

fn join_debug<Y: fmt::Debug>(values: &[Y]) -> String {
    values
        .iter()
        .map(|v| format!("{:?}", v))
        .collect::<Vec<_>>()
        .join(",")
}
