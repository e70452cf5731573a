//! This crate provides the core of a multi-tape, multi-stack Turing Machine simulator.
//! It includes the execution engine, a background driver with pause/resume and speed
//! control, and loading of serializable program descriptions.

pub mod driver;
pub mod loader;
pub mod machine;
pub mod program;
pub mod snapshot;
pub mod stack;
pub mod table;
pub mod tape;
pub mod types;

/// Re-exports the background execution types from the driver module.
pub use driver::{Driver, Observer, Speed};
/// Re-exports the `ProgramLoader` struct from the loader module.
pub use loader::ProgramLoader;
/// Re-exports the engine and its configuration from the machine module.
pub use machine::{MachineConfig, TuringMachine};
/// Re-exports the program description types.
pub use program::{ActionSpec, Program};
/// Re-exports the observability types from the snapshot module.
pub use snapshot::{Snapshot, Status, TapeView};
pub use stack::Stack;
pub use table::{Action, TransitionKey, TransitionTable};
pub use tape::Tape;
/// Re-exports the shared vocabulary from the types module.
pub use types::{
    ActionId, Direction, DirectionTokens, ErrorKind, Mode, State, Step, Symbol,
    TuringMachineError, MAX_PROGRAM_SIZE,
};
