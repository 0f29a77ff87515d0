//! Identifier bindings
//!
//! A binding remembers the last identifier seen for one record and tells the
//! form when a fetch is due. Unknown identifiers never trigger a fetch.

/// Outcome of feeding a new identifier to a binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingChange<I> {
    /// Same identifier as before; nothing to do
    Unchanged,
    /// Identifier changed to a known value; fetch it
    Fetch(I),
    /// Identifier changed to unknown; wait for one
    Pending,
}

/// Tracks the identifier a record was last fetched for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdBinding<I> {
    current: Option<I>,
}

impl<I> Default for IdBinding<I> {
    fn default() -> Self {
        Self { current: None }
    }
}

impl<I: Clone + PartialEq> IdBinding<I> {
    /// Create an empty binding
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Identifier currently bound
    #[inline]
    #[must_use]
    pub fn current(&self) -> Option<&I> {
        self.current.as_ref()
    }

    /// Feed the latest identifier
    pub fn update(&mut self, next: Option<I>) -> BindingChange<I> {
        if self.current == next {
            return BindingChange::Unchanged;
        }
        self.current.clone_from(&next);
        match next {
            Some(id) => BindingChange::Fetch(id),
            None => BindingChange::Pending,
        }
    }

    /// Forget the bound identifier so the next update fetches again
    pub fn reset(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_known_id_fetches() {
        let mut binding = IdBinding::new();
        assert_eq!(binding.update(Some("a")), BindingChange::Fetch("a"));
        assert_eq!(binding.current(), Some(&"a"));
    }

    #[test]
    fn same_id_does_not_refetch() {
        let mut binding = IdBinding::new();
        binding.update(Some("a"));
        assert_eq!(binding.update(Some("a")), BindingChange::Unchanged);
    }

    #[test]
    fn unknown_id_is_a_no_op() {
        let mut binding: IdBinding<&str> = IdBinding::new();
        assert_eq!(binding.update(None), BindingChange::Unchanged);

        binding.update(Some("a"));
        assert_eq!(binding.update(None), BindingChange::Pending);
        assert_eq!(binding.current(), None);
    }

    #[test]
    fn changed_id_refetches() {
        let mut binding = IdBinding::new();
        binding.update(Some("a"));
        assert_eq!(binding.update(Some("b")), BindingChange::Fetch("b"));
    }

    #[test]
    fn reset_forces_refetch() {
        let mut binding = IdBinding::new();
        binding.update(Some("a"));
        binding.reset();
        assert_eq!(binding.update(Some("a")), BindingChange::Fetch("a"));
    }
}
