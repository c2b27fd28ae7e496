use std::sync::Arc;

use arc_swap::ArcSwap;

/// A compare-and-swap cell over an immutable snapshot. `update` computes a
/// successor from the current value and installs it, retrying if another
/// writer raced ahead -- the classic read-copy-update pattern, without
/// `arc_swap`'s built-in `rcu` helper since our builders are fallible.
pub struct AtomicSnapshot<T> {
    inner: ArcSwap<T>,
}

impl<T> AtomicSnapshot<T> {
    pub fn new(initial: T) -> Self {
        Self { inner: ArcSwap::new(Arc::new(initial)) }
    }
}

impl<T> AtomicSnapshot<T> {
    /// Returns a cheap, stable reference to the current snapshot.
    pub fn load(&self) -> Arc<T> {
        self.inner.load_full()
    }

    /// Computes and installs a successor snapshot, retrying on contention.
    /// `f` must be pure -- it may be invoked more than once.
    pub fn update<F>(&self, mut f: F) -> Arc<T>
    where
        F: FnMut(&Arc<T>) -> T,
    {
        match self.try_update(|old| Ok::<T, std::convert::Infallible>(f(old))) {
            Ok(it) => it,
            Err(never) => match never {},
        }
    }

    /// Like `update`, but `f` may fail; on failure the cell is left untouched.
    pub fn try_update<T2, E, F>(&self, mut f: F) -> Result<Arc<T>, E>
    where
        T2: Into<Arc<T>>,
        F: FnMut(&Arc<T>) -> Result<T2, E>,
    {
        let mut current = self.inner.load();
        loop {
            let candidate = f(&current)?.into();
            let previous = self.inner.compare_and_swap(&*current, candidate);
            if Arc::ptr_eq(&*current, &*previous) {
                return Ok(arc_swap::Guard::into_inner(current));
            }
            current = previous;
        }
    }
}

impl<T: Default> Default for AtomicSnapshot<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_installs_successor() {
        let snapshot = AtomicSnapshot::new(1u32);
        let installed = snapshot.update(|old| **old + 1);
        assert_eq!(*installed, 2);
        assert_eq!(*snapshot.load(), 2);
    }

    #[test]
    fn try_update_leaves_cell_untouched_on_error() {
        let snapshot = AtomicSnapshot::new(1u32);
        let result: Result<_, &'static str> = snapshot.try_update(|_| Err::<u32, _>("nope"));
        assert!(result.is_err());
        assert_eq!(*snapshot.load(), 1);
    }
}
