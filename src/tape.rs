//! A single head-addressed tape that grows lazily in both directions.

use crate::types::{Direction, Symbol};

/// A growable sequence of symbols with a read/write head.
///
/// The cell vector is never empty and the head always points at an existing cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tape<Y> {
    cells: Vec<Y>,
    head: usize,
    blank: Y,
    nowrite: Y,
}

impl<Y: Symbol> Tape<Y> {
    /// Creates a tape with the head on the first cell.
    ///
    /// Empty content is seeded with one blank symbol so `read` and `write` are always defined.
    pub fn new(content: Vec<Y>, blank: Y, nowrite: Y) -> Self {
        let mut cells = content;
        if cells.is_empty() {
            cells.push(blank.clone());
        }

        Self {
            cells,
            head: 0,
            blank,
            nowrite,
        }
    }

    /// Returns the symbol under the head.
    pub fn read(&self) -> &Y {
        &self.cells[self.head]
    }

    /// Overwrites the symbol under the head, unless `value` is the no-write sentinel.
    pub fn write(&mut self, value: &Y) {
        if *value != self.nowrite {
            self.cells[self.head] = value.clone();
        }
    }

    /// Moves the head, extending the tape with a blank when it runs off either edge.
    pub fn move_head(&mut self, direction: Direction) {
        match direction {
            Direction::Left => {
                if self.head == 0 {
                    // Extend tape to the left
                    self.cells.insert(0, self.blank.clone());
                } else {
                    self.head -= 1;
                }
            }
            Direction::Right => {
                self.head += 1;
                if self.head == self.cells.len() {
                    self.cells.push(self.blank.clone());
                }
            }
            Direction::Stay => {}
        }
    }

    /// Returns the tape content.
    pub fn cells(&self) -> &[Y] {
        &self.cells
    }

    /// Returns the head position.
    pub fn head(&self) -> usize {
        self.head
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Always `false`, a tape holds at least one cell.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn blank(&self) -> &Y {
        &self.blank
    }
}
