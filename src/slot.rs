//! Per-slot state of lazily populated stacks

/// Whether a stack slot holds a stored entry, a cached derived one, or nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Nothing stored yet
    Unset,
    /// Set by the caller
    Explicit,
    /// Derived from slot 0 on first read and cached
    Derived,
}

#[derive(Debug, Clone, Default)]
pub(crate) enum Slot<T> {
    #[default]
    Unset,
    Explicit(T),
    Derived(T),
}

impl<T> Slot<T> {
    pub(crate) fn get(&self) -> Option<&T> {
        match self {
            Slot::Unset => None,
            Slot::Explicit(value) | Slot::Derived(value) => Some(value),
        }
    }

    pub(crate) fn get_mut(&mut self) -> Option<&mut T> {
        match self {
            Slot::Unset => None,
            Slot::Explicit(value) | Slot::Derived(value) => Some(value),
        }
    }

    pub(crate) fn state(&self) -> SlotState {
        match self {
            Slot::Unset => SlotState::Unset,
            Slot::Explicit(_) => SlotState::Explicit,
            Slot::Derived(_) => SlotState::Derived,
        }
    }

    pub(crate) fn is_derived(&self) -> bool {
        matches!(self, Slot::Derived(_))
    }
}

/// `count` unset slots
pub(crate) fn unset_slots<T>(count: usize) -> Vec<Slot<T>> {
    std::iter::repeat_with(|| Slot::Unset).take(count).collect()
}
