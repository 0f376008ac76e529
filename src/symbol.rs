//! Symbols and the symbol table mapping them to input slots.
//!
//! A [`Symbol`] is a cheap cloneable handle to a variable defined by the
//! surrounding domain model (a species concentration, a compartment
//! volume, a rate parameter). Symbols compare by identity, not name:
//! two models may both define a variable called `k1` without clashing.
//!
//! A [`SymbolTable`] is built once per compilation context from the
//! model's ordered variable list and shared read-only by the assembler.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use rustc_hash::FxHashMap;

/// Global counter for symbol identities.
static SYMBOL_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_id() -> u64 {
    SYMBOL_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug)]
struct SymbolInner {
    id: u64,
    name: String,
}

/// A variable handle: unique identity plus display name.
///
/// Cloning is cheap (one `Arc` bump); equality and hashing use the
/// identity only.
#[derive(Debug, Clone)]
pub struct Symbol(Arc<SymbolInner>);

impl Symbol {
    /// Create a fresh symbol with a new unique identity.
    pub fn new(name: impl Into<String>) -> Self {
        Symbol(Arc::new(SymbolInner {
            id: next_id(),
            name: name.into(),
        }))
    }

    /// The unique identity of this symbol.
    #[inline]
    pub fn id(&self) -> u64 {
        self.0.id
    }

    /// The display name of this symbol.
    #[inline]
    pub fn name(&self) -> &str {
        &self.0.name
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for Symbol {}

impl std::hash::Hash for Symbol {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Mapping from symbol identity to input slot index.
///
/// Built once from an ordered variable enumeration; slot *i* is the
/// *i*-th variable in that order. Read-only after construction.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    slots: FxHashMap<u64, usize>,
    names: Vec<String>,
}

impl SymbolTable {
    /// Build a table from an ordered variable list.
    pub fn from_ordered<'a, I>(symbols: I) -> Self
    where
        I: IntoIterator<Item = &'a Symbol>,
    {
        let mut slots = FxHashMap::default();
        let mut names = Vec::new();
        for (slot, sym) in symbols.into_iter().enumerate() {
            slots.insert(sym.id(), slot);
            names.push(sym.name().to_owned());
        }
        SymbolTable { slots, names }
    }

    /// Resolve a symbol to its slot index, if present.
    #[inline]
    pub fn resolve(&self, sym: &Symbol) -> Option<usize> {
        self.slots.get(&sym.id()).copied()
    }

    /// Number of slots (input vector length).
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// True if the table holds no variables.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Display name for a slot, if the slot exists.
    pub fn slot_name(&self, slot: usize) -> Option<&str> {
        self.names.get(slot).map(String::as_str)
    }
}
