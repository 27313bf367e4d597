//! String interning for identifiers and qualified names.
//!
//! A [`Symbol`] is a compact handle to an interned string, giving O(1)
//! comparison for variable/type/namespace names. The compiler is strictly
//! single-threaded (spec §5), so unlike a concurrent, globally-shared
//! interner this one is an ordinary owned value: one [`Interner`] lives on
//! the `Session`/`Parser` that needs it, with no locking or global state.

use rustc_hash::FxHashMap;

/// A handle to an interned string. Cheap to copy and compare.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(u32);

impl Symbol {
    fn from_index(idx: usize) -> Self {
        Symbol(idx as u32)
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// An owned string interner. Strings are appended once and never removed;
/// equal strings always map to the same [`Symbol`].
#[derive(Debug, Default)]
pub struct Interner {
    strings: Vec<String>,
    lookup: FxHashMap<String, Symbol>,
}

impl Interner {
    pub fn new() -> Self {
        Interner::default()
    }

    /// Intern `s`, returning its (possibly pre-existing) [`Symbol`].
    pub fn intern(&mut self, s: &str) -> Symbol {
        if let Some(&sym) = self.lookup.get(s) {
            return sym;
        }
        let sym = Symbol::from_index(self.strings.len());
        self.strings.push(s.to_owned());
        self.lookup.insert(s.to_owned(), sym);
        sym
    }

    /// Resolve a [`Symbol`] back to its string.
    ///
    /// Panics if `sym` was not produced by this interner — a `Symbol` from
    /// one `Interner` must never be resolved against another.
    pub fn resolve(&self, sym: Symbol) -> &str {
        &self.strings[sym.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_strings_intern_to_the_same_symbol() {
        let mut interner = Interner::new();
        let a = interner.intern("foo");
        let b = interner.intern("foo");
        let c = interner.intern("bar");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn resolve_round_trips() {
        let mut interner = Interner::new();
        let sym = interner.intern("namespace:qualified");
        assert_eq!(interner.resolve(sym), "namespace:qualified");
    }
}
