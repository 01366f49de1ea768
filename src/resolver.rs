//! Depth-first, leftmost-goal-first resolution of a query against the facts.
//!
//! The search keeps one frame per goal and walks them with an explicit
//! loop: advance to the next goal on a match, retreat to the previous one
//! when a goal runs out of candidates. Bindings go on a trail so a frame can
//! undo exactly the bindings it made. Solutions are produced lazily by the
//! [`Solutions`] iterator; dropping it abandons the search.

use crate::config::Strategy;
use crate::database::{FactDatabase, FactId, SymbolId};
use crate::query::{Condition, Goal, Query, VariableId};
use log::trace;

/// One solution: a symbol for every variable of the query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct BindingSet {
    values: Vec<SymbolId>,
}

impl BindingSet {
    /// The symbol bound to `variable`.
    #[must_use]
    pub fn get(&self, variable: VariableId) -> Option<SymbolId> {
        self.values.get(variable.index()).copied()
    }

    /// Bindings in variable order.
    pub fn iter(&self) -> impl Iterator<Item = SymbolId> + '_ {
        self.values.iter().copied()
    }

    /// Number of bound variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the query had no variables.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Where a frame takes its candidate facts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Candidates {
    /// Every fact of the goal's predicate
    Extension,
    /// Facts holding `symbol` at `position`, found through its occurrences
    Occurrences { symbol: SymbolId, position: usize },
}

/// Search state for one goal.
#[derive(Debug, Clone, Copy)]
struct Frame {
    candidates: Candidates,
    /// Index of the current candidate in the candidate list
    cursor: usize,
    /// Trail length when the frame was entered
    trail_mark: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Fresh,
    /// A solution was just produced from the current candidate of the last frame
    Suspended,
    Done,
}

/// Lazy sequence of the solutions of a query.
#[derive(Debug, Clone)]
pub struct Solutions<'a> {
    database: &'a FactDatabase,
    goals: &'a [Goal],
    strategy: Strategy,
    frames: Vec<Frame>,
    depth: usize,
    bindings: Vec<Option<SymbolId>>,
    trail: Vec<VariableId>,
    state: State,
}

/// Start resolving `query`.
///
/// Solutions come in the order of nested loops over each goal's facts in
/// insertion order, first goal outermost. The database is only read, so any
/// number of searches may run over it at once.
#[must_use]
pub fn solve<'a>(database: &'a FactDatabase, query: &'a Query, strategy: Strategy) -> Solutions<'a> {
    let goals = query.goals();
    Solutions {
        database,
        goals,
        strategy,
        frames: Vec::with_capacity(goals.len()),
        depth: 0,
        bindings: vec![None; query.variables().len()],
        trail: Vec::new(),
        state: State::Fresh,
    }
}

impl Iterator for Solutions<'_> {
    type Item = BindingSet;

    fn next(&mut self) -> Option<BindingSet> {
        match self.state {
            State::Done => return None,
            State::Fresh => {
                if self.goals.is_empty() {
                    self.state = State::Done;
                    return Some(BindingSet::default());
                }
                self.enter(0);
            }
            State::Suspended => self.retry(self.depth),
        }
        self.search()
    }
}

impl Solutions<'_> {
    fn search(&mut self) -> Option<BindingSet> {
        loop {
            let depth = self.depth;
            let Some(fact) = self.candidate(depth) else {
                trace!("goal #{depth} exhausted");
                if depth == 0 {
                    self.state = State::Done;
                    self.frames.clear();
                    return None;
                }
                self.frames.pop();
                self.depth -= 1;
                self.retry(self.depth);
                continue;
            };

            if !self.unify(depth, fact) {
                self.retry(depth);
                continue;
            }
            trace!("goal #{depth} matched fact #{}", fact.index());

            if depth + 1 < self.goals.len() {
                self.enter(depth + 1);
                continue;
            }
            if let Some(solution) = self.snapshot() {
                self.state = State::Suspended;
                return Some(solution);
            }
            self.retry(depth);
        }
    }

    /// Push a fresh frame for goal `depth`.
    fn enter(&mut self, depth: usize) {
        let candidates = self.select(&self.goals[depth]);
        trace!("entering goal #{depth} with {candidates:?}");
        self.frames.push(Frame {
            candidates,
            cursor: 0,
            trail_mark: self.trail.len(),
        });
        self.depth = depth;
    }

    /// Pick the shortest candidate list for `goal` given the current
    /// bindings. Every list is in fact insertion order, so the choice never
    /// changes the order of solutions.
    fn select(&self, goal: &Goal) -> Candidates {
        let mut best = (self.database.extension(goal.predicate).len(), Candidates::Extension);
        if self.strategy == Strategy::Scan {
            return best.1;
        }
        for (position, condition) in goal.conditions.iter().enumerate() {
            let known = match *condition {
                Condition::Constant(symbol) => Some(symbol),
                Condition::Variable(variable) => self.bindings[variable.index()],
            };
            if let Some(symbol) = known {
                let len = self.database.occurrences(symbol).len();
                if len < best.0 {
                    best = (len, Candidates::Occurrences { symbol, position });
                }
            }
        }
        best.1
    }

    /// Current candidate of frame `depth`, skipping occurrences that belong
    /// to another predicate or position.
    fn candidate(&mut self, depth: usize) -> Option<FactId> {
        let database = self.database;
        let goal = &self.goals[depth];
        let frame = &mut self.frames[depth];
        match frame.candidates {
            Candidates::Extension => database.extension(goal.predicate).get(frame.cursor).copied(),
            Candidates::Occurrences { symbol, position } => {
                let occurrences = database.occurrences(symbol);
                while let Some(occurrence) = occurrences.get(frame.cursor) {
                    if occurrence.position == position
                        && database.fact(occurrence.fact).predicate() == goal.predicate
                    {
                        return Some(occurrence.fact);
                    }
                    frame.cursor += 1;
                }
                None
            }
        }
    }

    /// Match goal `depth` against `fact` position by position, binding
    /// unbound variables. On failure the caller undoes partial bindings.
    fn unify(&mut self, depth: usize, fact: FactId) -> bool {
        let goal = &self.goals[depth];
        let arguments = self.database.fact(fact).arguments();
        if goal.conditions.len() != arguments.len() {
            return false;
        }
        for (condition, &argument) in goal.conditions.iter().zip(arguments) {
            match *condition {
                Condition::Constant(symbol) => {
                    if symbol != argument {
                        return false;
                    }
                }
                Condition::Variable(variable) => match self.bindings[variable.index()] {
                    Some(bound) if bound != argument => return false,
                    Some(_) => {}
                    None => {
                        self.bindings[variable.index()] = Some(argument);
                        self.trail.push(variable);
                    }
                },
            }
        }
        true
    }

    /// Undo the bindings of frame `depth` and move it to its next candidate.
    fn retry(&mut self, depth: usize) {
        let frame = &mut self.frames[depth];
        frame.cursor += 1;
        for variable in self.trail.drain(frame.trail_mark..) {
            self.bindings[variable.index()] = None;
        }
    }

    fn snapshot(&self) -> Option<BindingSet> {
        let values = self.bindings.iter().copied().collect::<Option<Vec<_>>>()?;
        Some(BindingSet { values })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::query::{Atom, Term};

    fn family() -> FactDatabase {
        let mut db = FactDatabase::new();
        db.add_fact("parent", &["tom", "bob"]);
        db.add_fact("parent", &["bob", "ann"]);
        db.add_fact("parent", &["bob", "pat"]);
        db
    }

    fn term(name: &str) -> Term {
        if name.starts_with(char::is_uppercase) {
            Term::variable(name)
        } else {
            Term::constant(name)
        }
    }

    fn atom(predicate: &str, args: &[&str]) -> Atom {
        Atom::new(predicate, args.iter().map(|a| term(a)))
    }

    /// Solve and render each solution as `X=a Y=b`, for both strategies,
    /// checking they agree.
    fn answers(db: &mut FactDatabase, atoms: &[Atom]) -> Vec<String> {
        let query = Query::from_atoms(db, atoms, &Config::default()).unwrap();
        let db: &FactDatabase = db;
        let render = |solution: BindingSet| {
            query
                .variables()
                .iter()
                .map(|(var, name)| format!("{name}={}", db.symbol_name(solution.get(var).unwrap())))
                .collect::<Vec<_>>()
                .join(" ")
        };
        let indexed: Vec<String> = solve(db, &query, Strategy::Indexed).map(&render).collect();
        let scanned: Vec<String> = solve(db, &query, Strategy::Scan).map(&render).collect();
        assert_eq!(indexed, scanned, "Strategies must agree");
        indexed
    }

    #[test]
    fn test_single_goal_in_insertion_order() {
        let mut db = family();
        let results = answers(&mut db, &[atom("parent", &["bob", "X"])]);
        assert_eq!(results, vec!["X=ann", "X=pat"]);
    }

    #[test]
    fn test_no_solutions() {
        let mut db = family();
        let results = answers(&mut db, &[atom("parent", &["ann", "X"])]);
        assert!(results.is_empty());
    }

    #[test]
    fn test_conjunction_shares_variables() {
        let mut db = family();
        let results = answers(
            &mut db,
            &[atom("parent", &["tom", "Y"]), atom("parent", &["Y", "ann"])],
        );
        assert_eq!(results, vec!["Y=bob"]);
    }

    #[test]
    fn test_backtracks_into_earlier_goals() {
        let mut db = family();
        let results = answers(
            &mut db,
            &[atom("parent", &["X", "Y"]), atom("parent", &["Y", "Z"])],
        );
        assert_eq!(results, vec!["X=tom Y=bob Z=ann", "X=tom Y=bob Z=pat"]);
    }

    #[test]
    fn test_cross_product_order() {
        let mut db = FactDatabase::new();
        for c in ["red", "green"] {
            db.add_fact("color", &[c]);
        }
        for s in ["s", "m", "l"] {
            db.add_fact("size", &[s]);
        }
        let results = answers(&mut db, &[atom("color", &["C"]), atom("size", &["S"])]);
        assert_eq!(
            results,
            vec![
                "C=red S=s",
                "C=red S=m",
                "C=red S=l",
                "C=green S=s",
                "C=green S=m",
                "C=green S=l",
            ]
        );
    }

    #[test]
    fn test_repeated_variable_in_one_goal() {
        let mut db = FactDatabase::new();
        db.add_fact("same", &["a", "b"]);
        db.add_fact("same", &["c", "c"]);

        // same(X, X) only matches facts whose arguments are identical
        let results = answers(&mut db, &[atom("same", &["X", "X"])]);
        assert_eq!(results, vec!["X=c"]);
    }

    #[test]
    fn test_ground_query() {
        let mut db = family();
        assert_eq!(answers(&mut db, &[atom("parent", &["tom", "bob"])]), vec![""]);
        assert!(answers(&mut db, &[atom("parent", &["bob", "tom"])]).is_empty());
    }

    #[test]
    fn test_duplicate_facts_give_duplicate_solutions() {
        let mut db = FactDatabase::new();
        db.add_fact("p", &["a"]);
        db.add_fact("p", &["a"]);
        assert_eq!(answers(&mut db, &[atom("p", &["X"])]), vec!["X=a", "X=a"]);
    }

    #[test]
    fn test_arity_mismatch_is_skipped() {
        let mut db = FactDatabase::new();
        db.add_fact("p", &["a"]);
        db.add_fact("p", &["b", "c"]);
        db.add_fact("p", &["d"]);
        assert_eq!(answers(&mut db, &[atom("p", &["X"])]), vec!["X=a", "X=d"]);
        assert_eq!(answers(&mut db, &[atom("p", &["X", "Y"])]), vec!["X=b Y=c"]);
    }

    #[test]
    fn test_unknown_predicate_has_no_solutions() {
        let mut db = family();
        let results = answers(
            &mut db,
            &[atom("parent", &["tom", "X"]), atom("sibling", &["X", "Y"])],
        );
        assert!(results.is_empty());
    }

    #[test]
    fn test_failed_partial_match_undoes_bindings() {
        let mut db = FactDatabase::new();
        // X binds to `a` at position 0, then position 1 fails; the binding
        // must not leak into the next candidate
        db.add_fact("pair", &["a", "b"]);
        db.add_fact("pair", &["c", "c"]);
        db.add_fact("link", &["c"]);
        let results = answers(&mut db, &[atom("pair", &["X", "X"]), atom("link", &["X"])]);
        assert_eq!(results, vec!["X=c"]);
    }

    #[test]
    fn test_occurrences_of_other_predicates_are_skipped() {
        let mut db = FactDatabase::new();
        for i in 0..20 {
            db.add_fact("noise", &["k".to_string(), format!("n{i}")]);
        }
        db.add_fact("edge", &["a", "k"]);
        db.add_fact("edge", &["k", "b"]);
        db.add_fact("edge", &["k", "c"]);
        for i in 0..20 {
            db.add_fact("edge", &[format!("x{i}"), format!("y{i}")]);
        }

        let results = answers(&mut db, &[atom("edge", &["k", "X"])]);
        assert_eq!(results, vec!["X=b", "X=c"]);
    }

    #[test]
    fn test_empty_conjunction_has_one_solution() {
        let db = family();
        let query = Query::default();
        let solutions: Vec<BindingSet> = solve(&db, &query, Strategy::Indexed).collect();
        assert_eq!(solutions, vec![BindingSet::default()]);
    }

    #[test]
    fn test_exhausted_iterator_stays_exhausted() {
        let mut db = family();
        let query =
            Query::from_atoms(&mut db, &[atom("parent", &["bob", "X"])], &Config::default())
                .unwrap();
        let mut solutions = solve(&db, &query, Strategy::Indexed);
        assert!(solutions.next().is_some());
        assert!(solutions.next().is_some());
        assert!(solutions.next().is_none());
        assert!(solutions.next().is_none());
    }

    #[test]
    fn test_abandoned_search_restarts_from_scratch() {
        let mut db = family();
        let query =
            Query::from_atoms(&mut db, &[atom("parent", &["bob", "X"])], &Config::default())
                .unwrap();
        let x = query.variables().get("X").unwrap();

        let first = solve(&db, &query, Strategy::Indexed).next().unwrap();
        let again = solve(&db, &query, Strategy::Indexed).next().unwrap();
        assert_eq!(first, again);
        assert_eq!(db.symbol_name(first.get(x).unwrap()), "ann");
    }

    #[test]
    fn test_concurrent_searches_share_the_database() {
        let mut db = family();
        let query = Query::from_atoms(
            &mut db,
            &[atom("parent", &["X", "Y"]), atom("parent", &["Y", "Z"])],
            &Config::default(),
        )
        .unwrap();
        let expected: Vec<BindingSet> = solve(&db, &query, Strategy::Indexed).collect();

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| solve(&db, &query, Strategy::Indexed).collect::<Vec<_>>()))
                .collect();
            for handle in handles {
                assert_eq!(handle.join().unwrap(), expected);
            }
        });
    }
}
