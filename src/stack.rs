//! A LIFO stack whose pop never fails.

use crate::types::Symbol;

/// A LIFO sequence of symbols. Popping an empty stack yields the blank symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stack<Y> {
    items: Vec<Y>,
    blank: Y,
    nowrite: Y,
}

impl<Y: Symbol> Stack<Y> {
    /// Creates a stack from bottom-to-top content.
    pub fn new(content: Vec<Y>, blank: Y, nowrite: Y) -> Self {
        Self {
            items: content,
            blank,
            nowrite,
        }
    }

    /// Removes and returns the top symbol, or the blank symbol when the stack is empty.
    pub fn pop(&mut self) -> Y {
        self.items.pop().unwrap_or_else(|| self.blank.clone())
    }

    /// Returns what `pop` would return without removing anything.
    pub fn peek(&self) -> Y {
        self.items.last().unwrap_or(&self.blank).clone()
    }

    /// Pushes `value` on top, unless it is the no-write sentinel.
    pub fn push(&mut self, value: &Y) {
        if *value != self.nowrite {
            self.items.push(value.clone());
        }
    }

    /// Returns the content from bottom to top.
    pub fn items(&self) -> &[Y] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_then_pop_twice() {
        let mut stack = Stack::new(Vec::new(), '_', '*');
        stack.push(&'1');

        assert_eq!(stack.pop(), '1');
        assert_eq!(stack.pop(), '_');
        assert!(stack.is_empty());
    }

    #[test]
    fn test_pop_on_empty_leaves_stack_empty() {
        let mut stack: Stack<char> = Stack::new(Vec::new(), '_', '*');
        for _ in 0..3 {
            assert_eq!(stack.pop(), '_');
            assert_eq!(stack.len(), 0);
        }
    }

    #[test]
    fn test_push_nowrite_is_noop() {
        let mut stack = Stack::new(vec!['a'], '_', '*');
        stack.push(&'*');
        assert_eq!(stack.items(), &['a']);
    }

    #[test]
    fn test_peek_does_not_remove() {
        let mut stack = Stack::new(vec!['a', 'b'], '_', '*');
        assert_eq!(stack.peek(), 'b');
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.pop(), 'b');
        assert_eq!(stack.peek(), 'a');

        stack.pop();
        assert_eq!(stack.peek(), '_');
    }
}
