/// Free list of reusable slots.
///
/// Layers are recycled when a player is reset and handed out again when the next movie is
/// prepared, so swapping movies does not reallocate per-sprite buffers.
#[derive(Debug)]
pub struct LayerPool<T> {
    free: Vec<T>,
    created: usize,
}

impl<T> Default for LayerPool<T> {
    fn default() -> Self {
        Self {
            free: Vec::new(),
            created: 0,
        }
    }
}

impl<T: Default> LayerPool<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes a recycled slot, or creates a fresh one when the free list is empty.
    pub fn allocate(&mut self) -> T {
        self.free.pop().unwrap_or_else(|| {
            self.created += 1;
            T::default()
        })
    }

    pub fn recycle(&mut self, slot: T) {
        self.free.push(slot);
    }

    pub fn recycle_all(&mut self, slots: impl IntoIterator<Item = T>) {
        self.free.extend(slots);
    }

    /// Slots waiting in the free list.
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// Slots ever created by this pool.
    pub fn created(&self) -> usize {
        self.created
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recycled_slots_are_reused() {
        let mut pool: LayerPool<Vec<u8>> = LayerPool::new();
        let a = pool.allocate();
        let b = pool.allocate();
        assert_eq!(pool.created(), 2);

        pool.recycle_all([a, b]);
        assert_eq!(pool.available(), 2);

        let _ = pool.allocate();
        let _ = pool.allocate();
        let _ = pool.allocate();
        assert_eq!(pool.created(), 3);
        assert_eq!(pool.available(), 0);
    }
}
