//! The transition table: an exact-match mapping from `(state, read values, popped values)`
//! to the action that the controller applies.

use crate::types::{ActionId, Direction, State, Symbol, TuringMachineError};
use std::collections::HashMap;

/// The lookup key of a transition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransitionKey<S, Y> {
    /// The controller state the transition applies to.
    pub state: S,
    /// One symbol per tape, in tape registration order.
    pub read: Vec<Y>,
    /// One symbol per stack, in stack registration order.
    pub pop: Vec<Y>,
}

/// The effect of a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action<S, Y> {
    /// Sequential identifier assigned at registration.
    pub id: ActionId,
    /// One symbol per tape. The no-write sentinel leaves the cell untouched.
    pub write: Vec<Y>,
    /// One symbol per stack. The no-write sentinel pushes nothing.
    pub push: Vec<Y>,
    /// One head movement per tape.
    pub directions: Vec<Direction>,
    /// The state the controller transitions to.
    pub next_state: S,
}

type PopMap<S, Y> = HashMap<Vec<Y>, Action<S, Y>>;
type ReadMap<S, Y> = HashMap<Vec<Y>, PopMap<S, Y>>;

/// Maps transition keys to actions.
///
/// Registering a key twice replaces the earlier action: the last registration wins.
#[derive(Debug, Clone)]
pub struct TransitionTable<S, Y> {
    // state -> read tuple -> pop tuple, so lookups borrow the key parts
    actions: HashMap<S, ReadMap<S, Y>>,
    len: usize,
    next_id: usize,
}

impl<S, Y> Default for TransitionTable<S, Y> {
    fn default() -> Self {
        Self {
            actions: HashMap::new(),
            len: 0,
            next_id: 0,
        }
    }
}

impl<S: State, Y: Symbol> TransitionTable<S, Y> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an action and returns its identifier.
    ///
    /// Fails when `read`, `write` and `directions` differ in length, or when `pop` and
    /// `push` differ in length. An overwritten key gets a fresh identifier, earlier
    /// identifiers are never reused.
    #[allow(clippy::too_many_arguments)]
    pub fn register(
        &mut self,
        state: S,
        read: Vec<Y>,
        pop: Vec<Y>,
        write: Vec<Y>,
        push: Vec<Y>,
        directions: Vec<Direction>,
        next_state: S,
    ) -> Result<ActionId, TuringMachineError> {
        let arity = |field, expected, found| {
            if expected == found {
                Ok(())
            } else {
                Err(TuringMachineError::ArityMismatch {
                    state: format!("{:?}", state),
                    field,
                    expected,
                    found,
                })
            }
        };
        arity("write", read.len(), write.len())?;
        arity("direction", read.len(), directions.len())?;
        arity("push", pop.len(), push.len())?;

        let id = ActionId(self.next_id);
        self.next_id += 1;

        let action = Action {
            id,
            write,
            push,
            directions,
            next_state,
        };

        let pops = self
            .actions
            .entry(state)
            .or_default()
            .entry(read)
            .or_default();
        if pops.insert(pop, action).is_some() {
            tracing::debug!(id = id.0, "transition overwritten by a later registration");
        } else {
            self.len += 1;
        }

        Ok(id)
    }

    /// Finds the action registered for exactly this state, read tuple and pop tuple.
    pub fn lookup(&self, state: &S, read: &[Y], pop: &[Y]) -> Option<&Action<S, Y>> {
        self.actions.get(state)?.get(read)?.get(pop)
    }

    /// Returns the number of distinct keys.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterates over the registered transitions in arbitrary order.
    pub fn actions(&self) -> impl Iterator<Item = (TransitionKey<S, Y>, &Action<S, Y>)> + '_ {
        self.actions.iter().flat_map(|(state, reads)| {
            reads.iter().flat_map(move |(read, pops)| {
                pops.iter().map(move |(pop, action)| {
                    let key = TransitionKey {
                        state: state.clone(),
                        read: read.clone(),
                        pop: pop.clone(),
                    };
                    (key, action)
                })
            })
        })
    }
}
