//! This module defines `Program`, a serializable description of a machine with `char`
//! symbols and `String` states, and turns it into an initialized [`TuringMachine`].

use crate::machine::{MachineConfig, TuringMachine};
use crate::types::{
    Direction, DirectionTokens, Mode, TuringMachineError, DEFAULT_BLANK_SYMBOL,
    DEFAULT_HALT_STATE, DEFAULT_NOWRITE_SYMBOL,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A complete machine description.
///
/// Tapes and stacks are written as strings, one character per symbol. Stacks are listed
/// from bottom to top.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Program {
    /// The name of the program.
    #[serde(default)]
    pub name: String,
    /// How stack pops interact with failed lookups.
    #[serde(default)]
    pub mode: Mode,
    /// The state the machine starts in.
    pub initial_state: String,
    /// The state the machine stops in.
    #[serde(default = "default_halt_state")]
    pub halt_state: String,
    /// The symbol used to extend tapes and returned by empty stacks.
    #[serde(default = "default_blank")]
    pub blank: char,
    /// The symbol that leaves a tape cell or a stack untouched.
    #[serde(default = "default_nowrite")]
    pub nowrite: char,
    /// The symbols tapes, stacks and actions may use, besides blank and no-write.
    /// Any symbol is accepted when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alphabet: Option<String>,
    /// Replaces the built-in direction tokens (`<`, `>`, `-` and their letter aliases).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction_tokens: Option<DirectionTokens>,
    pub tapes: Vec<String>,
    #[serde(default)]
    pub stacks: Vec<String>,
    pub actions: Vec<ActionSpec>,
}

/// A single transition rule of a [`Program`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActionSpec {
    pub state: String,
    /// One character per tape.
    pub read: String,
    /// One character per stack.
    #[serde(default)]
    pub pop: String,
    /// One character per tape.
    pub write: String,
    /// One character per stack.
    #[serde(default)]
    pub push: String,
    /// One direction token per tape: `<`, `>` or `-`.
    pub directions: String,
    pub next_state: String,
}

fn default_halt_state() -> String {
    DEFAULT_HALT_STATE.to_string()
}

fn default_blank() -> char {
    DEFAULT_BLANK_SYMBOL
}

fn default_nowrite() -> char {
    DEFAULT_NOWRITE_SYMBOL
}

impl Program {
    /// Returns the machine configuration described by this program.
    pub fn config(&self) -> MachineConfig<String, char> {
        MachineConfig::new(
            self.initial_state.clone(),
            self.halt_state.clone(),
            self.blank,
            self.nowrite,
        )
        .with_mode(self.mode)
    }

    /// Builds and initializes the machine.
    ///
    /// # Returns
    ///
    /// * `Err(TuringMachineError::ValidationError)` if blank and no-write symbols coincide,
    ///   the direction tokens are ambiguous, or a symbol lies outside the alphabet.
    /// * `Err(TuringMachineError::InvalidDirection)` if an action holds an unknown direction.
    /// * Any setup error raised by the machine itself.
    pub fn build(&self) -> Result<TuringMachine<String, char>, TuringMachineError> {
        if self.blank == self.nowrite {
            return Err(TuringMachineError::ValidationError(format!(
                "Blank and no-write symbols must differ (both are '{}')",
                self.blank
            )));
        }
        if let Some(tokens) = &self.direction_tokens {
            tokens.validate()?;
        }
        self.check_alphabet()?;

        let mut machine = TuringMachine::new(self.config());

        for tape in &self.tapes {
            machine.add_tape(tape.chars().collect())?;
        }
        for stack in &self.stacks {
            machine.add_stack(stack.chars().collect())?;
        }
        for action in &self.actions {
            machine.add_action(
                action.state.clone(),
                action.read.chars().collect(),
                action.pop.chars().collect(),
                action.write.chars().collect(),
                action.push.chars().collect(),
                self.parse_directions(&action.directions)?,
                action.next_state.clone(),
            )?;
        }

        machine.init()?;
        Ok(machine)
    }

    fn parse_directions(&self, tokens: &str) -> Result<Vec<Direction>, TuringMachineError> {
        match &self.direction_tokens {
            Some(custom) => custom.parse_all(tokens),
            None => Direction::parse_all(tokens),
        }
    }

    fn check_alphabet(&self) -> Result<(), TuringMachineError> {
        let Some(alphabet) = &self.alphabet else {
            return Ok(());
        };
        let allowed: HashSet<char> = alphabet
            .chars()
            .chain([self.blank, self.nowrite])
            .collect();

        let contents = self.tapes.iter().chain(&self.stacks);
        let actions = self
            .actions
            .iter()
            .flat_map(|a| [&a.read, &a.pop, &a.write, &a.push]);

        let foreign = contents
            .chain(actions)
            .flat_map(|s| s.chars())
            .find(|c| !allowed.contains(c));

        match foreign {
            Some(symbol) => Err(TuringMachineError::ValidationError(format!(
                "Invalid symbol '{}'",
                symbol
            ))),
            None => Ok(()),
        }
    }

    /// Replaces the initial content of the first `inputs.len()` tapes.
    pub fn set_tapes(&mut self, inputs: &[String]) -> Result<(), TuringMachineError> {
        if inputs.len() > self.tapes.len() {
            return Err(TuringMachineError::ValidationError(format!(
                "Too many tape contents provided: {} contents for {} tapes",
                inputs.len(),
                self.tapes.len()
            )));
        }

        for (tape, input) in self.tapes.iter_mut().zip(inputs) {
            *tape = input.clone();
        }
        Ok(())
    }
}
