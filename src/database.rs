use indexmap::IndexMap;
use log::trace;
use smallvec::SmallVec;
use std::fmt;

/// Index of an interned symbol (constant or variable name).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SymbolId(usize);

/// Index of an interned predicate name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PredicateId(usize);

/// Index of a stored fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FactId(usize);

macro_rules! impl_index {
    ($($id:ident),*) => {$(
        impl $id {
            /// Position in its table.
            #[must_use]
            pub fn index(self) -> usize {
                self.0
            }
        }
    )*};
}

impl_index!(SymbolId, PredicateId, FactId);

/// A place where a symbol appears literally in a stored fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurrence {
    /// Argument position, starting at 0.
    pub position: usize,
    /// The fact holding the symbol at that position.
    pub fact: FactId,
}

/// One stored ground tuple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fact {
    predicate: PredicateId,
    arguments: SmallVec<[SymbolId; 4]>,
}

impl Fact {
    /// The predicate this fact belongs to.
    #[must_use]
    pub fn predicate(&self) -> PredicateId {
        self.predicate
    }

    /// Arguments in order.
    #[must_use]
    pub fn arguments(&self) -> &[SymbolId] {
        &self.arguments
    }

    /// Number of arguments.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.arguments.len()
    }
}

/// Interned symbol and predicate tables over an arena of facts.
///
/// Every symbol keeps the list of places it occurs in, and every predicate
/// keeps its facts in insertion order:
/// - After `parent(tom, bob)` and `parent(bob, ann)`:
///   - `parent -> [#0, #1]`
///   - `bob -> [(#0, 1), (#1, 0)]`
///
/// Ids stay valid for the life of the database; nothing is ever removed.
#[derive(Debug, Clone, Default)]
pub struct FactDatabase {
    /// Symbol name -> occurrences, indexed by `SymbolId`
    symbols: IndexMap<String, Vec<Occurrence>>,
    /// Predicate name -> facts, indexed by `PredicateId`
    predicates: IndexMap<String, Vec<FactId>>,
    facts: Vec<Fact>,
}

impl FactDatabase {
    /// Create an empty database
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of `name`, creating the symbol on first use.
    pub fn intern_symbol(&mut self, name: &str) -> SymbolId {
        if let Some(index) = self.symbols.get_index_of(name) {
            return SymbolId(index);
        }
        let (index, _) = self.symbols.insert_full(name.to_string(), Vec::new());
        trace!("interned symbol `{name}` as #{index}");
        SymbolId(index)
    }

    /// Id of predicate `name`, creating it on first use.
    pub fn intern_predicate(&mut self, name: &str) -> PredicateId {
        if let Some(index) = self.predicates.get_index_of(name) {
            return PredicateId(index);
        }
        let (index, _) = self.predicates.insert_full(name.to_string(), Vec::new());
        trace!("interned predicate `{name}` as #{index}");
        PredicateId(index)
    }

    /// Store `predicate(arguments...)`.
    ///
    /// Duplicates are stored again; facts of different arities may share a
    /// predicate name, and zero arguments is fine.
    pub fn add_fact<S: AsRef<str>>(&mut self, predicate: &str, arguments: &[S]) -> FactId {
        let predicate = self.intern_predicate(predicate);
        let arguments: SmallVec<[SymbolId; 4]> = arguments
            .iter()
            .map(|name| self.intern_symbol(name.as_ref()))
            .collect();

        let id = FactId(self.facts.len());
        for (position, symbol) in arguments.iter().enumerate() {
            self.symbols[symbol.0].push(Occurrence { position, fact: id });
        }
        self.predicates[predicate.0].push(id);
        self.facts.push(Fact {
            predicate,
            arguments,
        });
        trace!("stored fact #{} for predicate #{}", id.0, predicate.0);
        id
    }

    /// Look up a symbol without creating it.
    #[must_use]
    pub fn symbol(&self, name: &str) -> Option<SymbolId> {
        self.symbols.get_index_of(name).map(SymbolId)
    }

    /// Look up a predicate without creating it.
    #[must_use]
    pub fn predicate(&self, name: &str) -> Option<PredicateId> {
        self.predicates.get_index_of(name).map(PredicateId)
    }

    /// Name of a symbol.
    ///
    /// # Panics
    ///
    /// Panics if `id` was issued by another database
    #[must_use]
    pub fn symbol_name(&self, id: SymbolId) -> &str {
        self.symbols.get_index(id.0).map(|(name, _)| name.as_str()).unwrap_or_else(|| {
            panic!("symbol #{} does not belong to this database", id.0)
        })
    }

    /// Name of a predicate.
    ///
    /// # Panics
    ///
    /// Panics if `id` was issued by another database
    #[must_use]
    pub fn predicate_name(&self, id: PredicateId) -> &str {
        self.predicates.get_index(id.0).map(|(name, _)| name.as_str()).unwrap_or_else(|| {
            panic!("predicate #{} does not belong to this database", id.0)
        })
    }

    /// A stored fact.
    ///
    /// # Panics
    ///
    /// Panics if `id` was issued by another database
    #[must_use]
    pub fn fact(&self, id: FactId) -> &Fact {
        &self.facts[id.0]
    }

    /// Facts of a predicate, in insertion order.
    #[must_use]
    pub fn extension(&self, predicate: PredicateId) -> &[FactId] {
        &self.predicates[predicate.0]
    }

    /// Places where a symbol occurs, in insertion order of the facts.
    #[must_use]
    pub fn occurrences(&self, symbol: SymbolId) -> &[Occurrence] {
        &self.symbols[symbol.0]
    }

    /// Facts stored for predicate `name`; nothing for an unknown name.
    pub fn predicate_facts(&self, name: &str) -> impl Iterator<Item = &Fact> + '_ {
        self.predicates
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .map(|&id| self.fact(id))
    }

    /// Places where symbol `name` occurs; nothing for an unknown name.
    #[must_use]
    pub fn symbol_occurrences(&self, name: &str) -> &[Occurrence] {
        self.symbols.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// Number of distinct symbols.
    #[must_use]
    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    /// Number of distinct predicates.
    #[must_use]
    pub fn predicate_count(&self) -> usize {
        self.predicates.len()
    }

    /// Number of stored facts.
    #[must_use]
    pub fn fact_count(&self) -> usize {
        self.facts.len()
    }

    /// All symbols in interning order.
    pub fn symbols(&self) -> impl Iterator<Item = (SymbolId, &str)> + '_ {
        self.symbols
            .keys()
            .enumerate()
            .map(|(index, name)| (SymbolId(index), name.as_str()))
    }

    /// All predicates in interning order.
    pub fn predicates(&self) -> impl Iterator<Item = (PredicateId, &str)> + '_ {
        self.predicates
            .keys()
            .enumerate()
            .map(|(index, name)| (PredicateId(index), name.as_str()))
    }

    /// Render a fact as `name(arg, ...)`.
    #[must_use]
    pub fn display_fact(&self, id: FactId) -> String {
        let fact = self.fact(id);
        let arguments: Vec<&str> = fact
            .arguments
            .iter()
            .map(|&symbol| self.symbol_name(symbol))
            .collect();
        format!(
            "{}({})",
            self.predicate_name(fact.predicate),
            arguments.join(", ")
        )
    }
}

/// Dump of both tables: every fact grouped by predicate, then every symbol
/// with the places it occurs.
impl fmt::Display for FactDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "% predicates")?;
        for (name, facts) in &self.predicates {
            writeln!(f, "% {name}: {} facts", facts.len())?;
            for &id in facts {
                writeln!(f, "{}.", self.display_fact(id))?;
            }
        }
        writeln!(f, "% symbols")?;
        for (name, occurrences) in &self.symbols {
            let places: Vec<String> = occurrences
                .iter()
                .map(|o| format!("#{}[{}]", o.fact.0, o.position))
                .collect();
            writeln!(f, "% {name}: {}", places.join(" "))?;
        }
        Ok(())
    }
}
