use fxhash::FxBuildHasher;
use indexmap::IndexSet;
use lazy_static::lazy_static;
use parking_lot::RwLock;

use std::cmp::Ordering;
use std::fmt;

/// An interned name.
///
/// Atoms are indices into a process-wide table that only ever grows, so an
/// `Atom` is `Copy`, compares by index for equality and hashes cheaply. The
/// standard order of terms compares atoms alphabetically, which is what the
/// `Ord` impl does.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Atom {
    index: u32,
}

const_assert!(std::mem::size_of::<Atom>() == 4);

struct AtomTable {
    names: IndexSet<&'static str, FxBuildHasher>,
}

lazy_static! {
    static ref ATOM_TABLE: RwLock<AtomTable> = RwLock::new(AtomTable::new());
}

impl AtomTable {
    fn new() -> Self {
        Self {
            names: IndexSet::with_hasher(FxBuildHasher::default()),
        }
    }

    fn build_with(&mut self, string: &str) -> Atom {
        if let Some(index) = self.names.get_index_of(string) {
            return Atom::from_index(index);
        }

        // names live as long as the table, which lives as long as the process.
        let name: &'static str = Box::leak(string.to_owned().into_boxed_str());
        let (index, _) = self.names.insert_full(name);

        Atom::from_index(index)
    }
}

impl Atom {
    #[inline]
    fn from_index(index: usize) -> Self {
        Atom {
            index: index as u32,
        }
    }

    /// Returns the atom named `string`, interning it on first use.
    pub fn build_with(string: &str) -> Self {
        if let Some(index) = ATOM_TABLE.read().names.get_index_of(string) {
            return Atom::from_index(index);
        }

        ATOM_TABLE.write().build_with(string)
    }

    /// The name of the atom.
    pub fn as_str(self) -> &'static str {
        ATOM_TABLE
            .read()
            .names
            .get_index(self.index as usize)
            .copied()
            .unwrap_or("")
    }

    /// The single character of a one-character atom.
    pub fn as_char(self) -> Option<char> {
        let mut chars = self.as_str().chars();
        let c = chars.next()?;

        if chars.next().is_none() {
            Some(c)
        } else {
            None
        }
    }
}

impl From<&str> for Atom {
    #[inline]
    fn from(string: &str) -> Self {
        Atom::build_with(string)
    }
}

impl PartialOrd for Atom {
    #[inline]
    fn partial_cmp(&self, other: &Atom) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Atom {
    #[inline]
    fn cmp(&self, other: &Atom) -> Ordering {
        if self.index == other.index {
            Ordering::Equal
        } else {
            self.as_str().cmp(other.as_str())
        }
    }
}

impl fmt::Debug for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "atom!({:?})", self.as_str())
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
