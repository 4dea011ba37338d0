//! Lazily recomputed derived values.
//!
//! A [`Derived`] caches one value together with the stamp of the inputs it was computed from
//! (typically live diff revision counters). Reading with a different stamp recomputes it; the
//! previous value is handed to the computation so it can be reused or carried over.

use std::cell::RefCell;
use std::rc::Rc;

pub(crate) struct Derived<S, T> {
    slot: RefCell<Option<(S, Rc<T>)>>,
}

impl<S, T> Default for Derived<S, T> {
    fn default() -> Self {
        Self {
            slot: RefCell::new(None),
        }
    }
}

impl<S: Copy + PartialEq, T> Derived<S, T> {
    /// The value for `stamp`, computing it if the cached value is missing or stale.
    pub(crate) fn get(&self, stamp: S, compute: impl FnOnce(Option<&Rc<T>>) -> Rc<T>) -> Rc<T> {
        if let Some((cached, value)) = self.slot.borrow().as_ref()
            && *cached == stamp
        {
            return Rc::clone(value);
        }

        let previous = self.slot.borrow_mut().take().map(|(_, value)| value);
        let value = compute(previous.as_ref());
        *self.slot.borrow_mut() = Some((stamp, Rc::clone(&value)));
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_recomputes_only_on_new_stamp() {
        let derived: Derived<u64, String> = Derived::default();
        let calls = Cell::new(0);
        let compute = |previous: Option<&Rc<String>>| {
            calls.set(calls.get() + 1);
            Rc::new(format!("{}+", previous.map(|p| p.as_str()).unwrap_or("")))
        };

        assert_eq!(*derived.get(1, compute), "+");
        assert_eq!(*derived.get(1, compute), "+");
        assert_eq!(*derived.get(2, compute), "++");
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_previous_value_can_be_kept() {
        let derived: Derived<u64, Vec<u8>> = Derived::default();
        let first = derived.get(1, |_| Rc::new(vec![1]));
        let kept = derived.get(2, |previous| previous.cloned().unwrap_or_default());
        assert!(Rc::ptr_eq(&first, &kept));
    }
}
