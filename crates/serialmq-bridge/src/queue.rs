use std::collections::VecDeque;

/// Default capacity for both bridge queues.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Insertion-ordered FIFO with a fixed capacity.
///
/// Only the head is ever inspected or removed by the bridge, which is what
/// keeps a single command in flight at a time.
#[derive(Debug)]
pub struct BoundedQueue<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> BoundedQueue<T> {
    /// Create an empty queue. A zero capacity is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append to the tail, handing the item back if the queue is full.
    pub fn push(&mut self, item: T) -> Result<(), T> {
        if self.is_full() {
            return Err(item);
        }
        self.items.push_back(item);
        Ok(())
    }

    pub fn peek(&self) -> Option<&T> {
        self.items.front()
    }

    pub fn peek_mut(&mut self) -> Option<&mut T> {
        self.items.front_mut()
    }

    /// Remove the head only if `predicate` accepts it.
    ///
    /// The predicate gets mutable access so it may record a state transition
    /// on the element it is judging.
    pub fn remove_if<F>(&mut self, predicate: F) -> Option<T>
    where
        F: FnOnce(&mut T) -> bool,
    {
        let head = self.items.front_mut()?;
        if predicate(head) {
            self.items.pop_front()
        } else {
            None
        }
    }

    pub fn pop(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Remove every item, oldest first.
    pub fn drain(&mut self) -> impl Iterator<Item = T> + '_ {
        self.items.drain(..)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.items.iter()
    }
}

impl<T> Default for BoundedQueue<T> {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order() {
        let mut q = BoundedQueue::new(4);
        q.push("a").unwrap();
        q.push("b").unwrap();
        q.push("c").unwrap();
        assert_eq!(q.drain().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert!(q.is_empty());
    }

    #[test]
    fn push_rejects_when_full() {
        let mut q = BoundedQueue::new(2);
        q.push(1).unwrap();
        q.push(2).unwrap();
        assert!(q.is_full());
        assert_eq!(q.push(3), Err(3));
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn remove_if_only_touches_head() {
        let mut q = BoundedQueue::new(4);
        q.push(1).unwrap();
        q.push(2).unwrap();

        assert_eq!(q.remove_if(|head| *head == 2), None);
        assert_eq!(q.peek(), Some(&1));
        assert_eq!(q.remove_if(|head| *head == 1), Some(1));
        assert_eq!(q.peek(), Some(&2));
    }

    #[test]
    fn remove_if_on_empty_queue() {
        let mut q: BoundedQueue<u8> = BoundedQueue::new(1);
        assert_eq!(q.remove_if(|_| true), None);
    }

    #[test]
    fn predicate_can_mutate_head() {
        let mut q = BoundedQueue::new(2);
        q.push(10).unwrap();
        let removed = q.remove_if(|head| {
            *head += 1;
            false
        });
        assert_eq!(removed, None);
        assert_eq!(q.peek(), Some(&11));
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let q: BoundedQueue<u8> = BoundedQueue::new(0);
        assert_eq!(q.capacity(), 1);
    }
}
