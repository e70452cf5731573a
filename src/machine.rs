//! This module defines the `TuringMachine` struct, the execution engine of the simulator.
//! It owns the tapes, the stacks and the transition table, and runs the
//! read → pop → lookup → write → push → move → transition cycle.

use crate::snapshot::{Snapshot, Status, TapeView};
use crate::stack::Stack;
use crate::table::TransitionTable;
use crate::tape::Tape;
use crate::types::{ActionId, Direction, Mode, State, Step, Symbol, TuringMachineError};

/// Construction parameters of a [`TuringMachine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineConfig<S, Y> {
    /// The state set by `init`.
    pub initial_state: S,
    /// The terminal state.
    pub halt_state: S,
    /// The symbol used to extend tapes and returned when popping an empty stack.
    pub blank: Y,
    /// Writing or pushing this symbol leaves the tape or stack unchanged.
    pub nowrite: Y,
    pub mode: Mode,
}

impl<S, Y> MachineConfig<S, Y> {
    pub fn new(initial_state: S, halt_state: S, blank: Y, nowrite: Y) -> Self {
        Self {
            initial_state,
            halt_state,
            blank,
            nowrite,
            mode: Mode::default(),
        }
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }
}

/// Represents a multi-tape, multi-stack Turing Machine.
///
/// A machine is built with `add_tape`, `add_stack` and `add_action`, then `init` is
/// called once and the machine is driven with `run_step` or `run` until it reaches
/// its halt state.
#[derive(Debug, Clone)]
pub struct TuringMachine<S, Y> {
    config: MachineConfig<S, Y>,
    state: S,
    tapes: Vec<Tape<Y>>,
    stacks: Vec<Stack<Y>>,
    table: TransitionTable<S, Y>,
    initialized: bool,
    // Contents captured by `init`, restored by `reset`.
    initial: (Vec<Tape<Y>>, Vec<Stack<Y>>),
    step_count: usize,
    // Set by a failed cycle, cleared by `reset`.
    fault: Option<TuringMachineError>,
}

impl<S: State, Y: Symbol> TuringMachine<S, Y> {
    /// Creates an empty machine.
    pub fn new(config: MachineConfig<S, Y>) -> Self {
        Self {
            state: config.initial_state.clone(),
            config,
            tapes: Vec::new(),
            stacks: Vec::new(),
            table: TransitionTable::new(),
            initialized: false,
            initial: (Vec::new(), Vec::new()),
            step_count: 0,
            fault: None,
        }
    }

    /// Appends a tape with the head on its first cell.
    pub fn add_tape(&mut self, content: Vec<Y>) -> Result<(), TuringMachineError> {
        self.ensure_building()?;
        self.tapes.push(Tape::new(
            content,
            self.config.blank.clone(),
            self.config.nowrite.clone(),
        ));
        Ok(())
    }

    /// Appends a stack. `content` is ordered from bottom to top.
    pub fn add_stack(&mut self, content: Vec<Y>) -> Result<(), TuringMachineError> {
        self.ensure_building()?;
        self.stacks.push(Stack::new(
            content,
            self.config.blank.clone(),
            self.config.nowrite.clone(),
        ));
        Ok(())
    }

    /// Registers an action in the transition table.
    ///
    /// See [`TransitionTable::register`]. A later action with the same
    /// `(state, read, pop)` replaces the earlier one.
    #[allow(clippy::too_many_arguments)]
    pub fn add_action(
        &mut self,
        state: S,
        read: Vec<Y>,
        pop: Vec<Y>,
        write: Vec<Y>,
        push: Vec<Y>,
        directions: Vec<Direction>,
        next_state: S,
    ) -> Result<ActionId, TuringMachineError> {
        self.ensure_building()?;
        self.table
            .register(state, read, pop, write, push, directions, next_state)
    }

    /// Validates the machine and puts it in its initial state.
    ///
    /// # Returns
    ///
    /// * `Err(TuringMachineError::NoTapes)` if no tape was added.
    /// * `Err(TuringMachineError::NoActions)` if no action was registered.
    /// * `Err(TuringMachineError::ArityMismatch)` if an action does not match the number
    ///   of tapes or stacks.
    pub fn init(&mut self) -> Result<(), TuringMachineError> {
        self.ensure_building()?;

        if self.tapes.is_empty() {
            return Err(TuringMachineError::NoTapes);
        }
        if self.table.is_empty() {
            return Err(TuringMachineError::NoActions);
        }

        for (key, _) in self.table.actions() {
            for (field, expected, found) in [
                ("read", self.tapes.len(), key.read.len()),
                ("pop", self.stacks.len(), key.pop.len()),
            ] {
                if expected != found {
                    return Err(TuringMachineError::ArityMismatch {
                        state: format!("{:?}", key.state),
                        field,
                        expected,
                        found,
                    });
                }
            }
        }

        self.state = self.config.initial_state.clone();
        self.step_count = 0;
        self.initial = (self.tapes.clone(), self.stacks.clone());
        self.initialized = true;

        tracing::debug!(
            tapes = self.tapes.len(),
            stacks = self.stacks.len(),
            actions = self.table.len(),
            "machine initialized"
        );

        Ok(())
    }

    /// Executes a single cycle.
    ///
    /// Reads every tape, pops every stack, looks up the action for the current state and
    /// applies its writes, pushes and moves before switching to the next state.
    ///
    /// # Returns
    ///
    /// * `Ok(Step::Continue(id))` if action `id` was applied and the machine keeps running.
    /// * `Ok(Step::Halt)` if the machine is halted. Calling it again is a no-op.
    /// * `Err(TuringMachineError::UndefinedTransition)` if no action matches. The state is
    ///   left unchanged. In [`Mode::Consume`] the stacks stay popped.
    ///
    /// A failed cycle faults the machine: every later call returns the same error until
    /// [`TuringMachine::reset`] is called.
    pub fn run_step(&mut self) -> Result<Step, TuringMachineError> {
        if !self.initialized {
            return Err(TuringMachineError::NotInitialized);
        }
        if let Some(fault) = &self.fault {
            return Err(fault.clone());
        }
        if self.is_halted() {
            return Ok(Step::Halt);
        }

        let read = self.symbols();
        let pop: Vec<Y> = match self.config.mode {
            Mode::Consume => self.stacks.iter_mut().map(Stack::pop).collect(),
            Mode::Atomic => self.stacks.iter().map(Stack::peek).collect(),
        };

        let Some(action) = self.table.lookup(&self.state, &read, &pop) else {
            let error = TuringMachineError::undefined_transition(&self.state, &read, &pop);
            tracing::warn!(%error, step = self.step_count, "cycle failed");
            self.fault = Some(error.clone());
            return Err(error);
        };

        if self.config.mode == Mode::Atomic {
            for stack in &mut self.stacks {
                stack.pop();
            }
        }

        for (tape, value) in self.tapes.iter_mut().zip(&action.write) {
            tape.write(value);
        }
        for (stack, value) in self.stacks.iter_mut().zip(&action.push) {
            stack.push(value);
        }
        for (tape, &direction) in self.tapes.iter_mut().zip(&action.directions) {
            tape.move_head(direction);
        }

        let id = action.id;
        self.state = action.next_state.clone();
        self.step_count += 1;

        tracing::trace!(action = id.0, state = ?self.state, "cycle applied");

        if self.state == self.config.halt_state {
            tracing::debug!(steps = self.step_count, "machine halted");
            Ok(Step::Halt)
        } else {
            Ok(Step::Continue(id))
        }
    }

    /// Runs the machine until it halts, stopping at the first failing cycle.
    pub fn run(&mut self) -> Result<(), TuringMachineError> {
        while self.run_step()? != Step::Halt {}
        Ok(())
    }

    /// Runs at most `limit` cycles and returns how many were applied.
    ///
    /// Useful for tables that may never reach the halt state.
    pub fn run_for(&mut self, limit: usize) -> Result<usize, TuringMachineError> {
        let mut applied = 0;
        while applied < limit && (self.fault.is_some() || !self.is_halted()) {
            self.run_step()?;
            applied += 1;
        }
        Ok(applied)
    }

    /// Resets the machine to its configuration at `init` time.
    /// This includes the state, tape contents, head positions, stacks, step count and
    /// any fault left by a failed cycle.
    pub fn reset(&mut self) -> Result<(), TuringMachineError> {
        if !self.initialized {
            return Err(TuringMachineError::NotInitialized);
        }

        self.tapes = self.initial.0.clone();
        self.stacks = self.initial.1.clone();
        self.state = self.config.initial_state.clone();
        self.step_count = 0;
        self.fault = None;
        Ok(())
    }

    /// Captures the current tapes, stacks and state.
    pub fn snapshot(&self, action: Option<ActionId>, status: Status) -> Snapshot<S, Y> {
        Snapshot {
            tapes: self
                .tapes
                .iter()
                .map(|tape| TapeView {
                    cells: tape.cells().to_vec(),
                    head: tape.head(),
                })
                .collect(),
            stacks: self
                .stacks
                .iter()
                .map(|stack| stack.items().to_vec())
                .collect(),
            state: self.state.clone(),
            step: self.step_count,
            action,
            status,
        }
    }

    /// Returns the symbols currently under each tape head, in tape order.
    pub fn symbols(&self) -> Vec<Y> {
        self.tapes.iter().map(|tape| tape.read().clone()).collect()
    }

    /// Returns the current state of the machine.
    pub fn state(&self) -> &S {
        &self.state
    }

    /// Returns the error of the failed cycle that faulted the machine, if any.
    pub fn fault(&self) -> Option<&TuringMachineError> {
        self.fault.as_ref()
    }

    /// Checks if the machine has been initialized and sits in its halt state.
    pub fn is_halted(&self) -> bool {
        self.initialized && self.state == self.config.halt_state
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Returns the number of cycles applied since `init` or the last `reset`.
    pub fn step_count(&self) -> usize {
        self.step_count
    }

    pub fn tapes(&self) -> &[Tape<Y>] {
        &self.tapes
    }

    pub fn stacks(&self) -> &[Stack<Y>] {
        &self.stacks
    }

    pub fn table(&self) -> &TransitionTable<S, Y> {
        &self.table
    }

    pub fn config(&self) -> &MachineConfig<S, Y> {
        &self.config
    }

    fn ensure_building(&self) -> Result<(), TuringMachineError> {
        if self.initialized {
            Err(TuringMachineError::AlreadyInitialized)
        } else {
            Ok(())
        }
    }
}
