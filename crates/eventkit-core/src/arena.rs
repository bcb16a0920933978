//! Generational arena
//!
//! Dense slot storage addressed by `(slot, generation)` pairs. Removing an
//! entry bumps the slot generation, so an index that outlived its entry
//! resolves to nothing instead of aliasing whatever reuses the slot.

/// Index into an [`Arena`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArenaIndex {
    pub(crate) slot: u32,
    pub(crate) generation: u32,
}

impl ArenaIndex {
    pub(crate) const fn new(slot: u32, generation: u32) -> Self {
        Self { slot, generation }
    }

    /// Slot position inside the arena
    pub fn slot(&self) -> u32 {
        self.slot
    }

    /// Generation the slot had when this index was issued
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Slot storage with generation-checked indices
#[derive(Debug)]
pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    len: usize,
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    pub fn insert(&mut self, value: T) -> ArenaIndex {
        self.insert_with(|_| value)
    }

    /// Insert a value that needs to know its own index
    pub fn insert_with(&mut self, make: impl FnOnce(ArenaIndex) -> T) -> ArenaIndex {
        self.len += 1;
        if let Some(slot) = self.free.pop() {
            let entry = &mut self.slots[slot as usize];
            let index = ArenaIndex::new(slot, entry.generation);
            entry.value = Some(make(index));
            return index;
        }

        let index = ArenaIndex::new(self.slots.len() as u32, 0);
        self.slots.push(Slot {
            generation: 0,
            value: Some(make(index)),
        });
        index
    }

    pub fn get(&self, index: ArenaIndex) -> Option<&T> {
        self.slots
            .get(index.slot as usize)
            .filter(|s| s.generation == index.generation)
            .and_then(|s| s.value.as_ref())
    }

    pub fn get_mut(&mut self, index: ArenaIndex) -> Option<&mut T> {
        self.slots
            .get_mut(index.slot as usize)
            .filter(|s| s.generation == index.generation)
            .and_then(|s| s.value.as_mut())
    }

    pub fn contains(&self, index: ArenaIndex) -> bool {
        self.get(index).is_some()
    }

    pub fn remove(&mut self, index: ArenaIndex) -> Option<T> {
        let entry = self
            .slots
            .get_mut(index.slot as usize)
            .filter(|s| s.generation == index.generation)?;
        let value = entry.value.take()?;
        entry.generation = entry.generation.wrapping_add(1);
        self.free.push(index.slot);
        self.len -= 1;
        Some(value)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        for (slot, entry) in self.slots.iter_mut().enumerate() {
            if entry.value.take().is_some() {
                entry.generation = entry.generation.wrapping_add(1);
                self.free.push(slot as u32);
            }
        }
        self.len = 0;
    }

    pub fn iter(&self) -> impl Iterator<Item = (ArenaIndex, &T)> {
        self.slots.iter().enumerate().filter_map(|(slot, s)| {
            s.value
                .as_ref()
                .map(|v| (ArenaIndex::new(slot as u32, s.generation), v))
        })
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}
