use crate::config::Config;
use crate::cursor::TagCursor;
use crate::database::{FactDatabase, PredicateId, SymbolId};
use crate::error::{Error, Result};
use crate::syntax::{Location, SyntaxNode, CONSTANT, IDENT, PREDICATE, VARIABLE};
use indexmap::IndexSet;
use log::debug;
use smallvec::SmallVec;
use std::fmt;

/// An argument written in a fact or query
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Term {
    /// A variable that can be bound to a constant (e.g., `X`, `Who`)
    Variable(String),
    /// A concrete constant (e.g., `alice`, `42`)
    Constant(String),
}

impl Term {
    /// A variable term.
    pub fn variable(name: impl Into<String>) -> Self {
        Self::Variable(name.into())
    }

    /// A constant term.
    pub fn constant(name: impl Into<String>) -> Self {
        Self::Constant(name.into())
    }
}

/// A predicate call written out by name (e.g., `parent(bob, X)`)
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Atom {
    /// The name of the predicate (e.g., `"parent"`)
    pub predicate: String,
    /// The arguments of the call
    pub terms: Vec<Term>,
}

impl Atom {
    /// Create an atom.
    pub fn new(predicate: impl Into<String>, terms: impl IntoIterator<Item = Term>) -> Self {
        Self {
            predicate: predicate.into(),
            terms: terms.into_iter().collect(),
        }
    }
}

/// Index of a variable in its query's [`VariableTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VariableId(usize);

impl VariableId {
    /// Position in the variable table.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// What a goal requires of one argument of a candidate fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    /// The argument must be exactly this symbol.
    Constant(SymbolId),
    /// The argument binds, or must agree with, this variable.
    Variable(VariableId),
}

/// One predicate call of a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Goal {
    /// The predicate called.
    pub predicate: PredicateId,
    /// One condition per argument.
    pub conditions: SmallVec<[Condition; 4]>,
}

/// The distinct variables of one query, in order of first appearance.
///
/// Every occurrence of a name maps to the same [`VariableId`], so all of
/// them share one binding during resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableTable {
    names: IndexSet<String>,
}

impl VariableTable {
    /// The condition for variable `name`, registering it on first use.
    pub fn condition(&mut self, name: &str) -> Condition {
        let index = match self.names.get_index_of(name) {
            Some(index) => index,
            None => self.names.insert_full(name.to_string()).0,
        };
        Condition::Variable(VariableId(index))
    }

    /// Id of an existing variable.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<VariableId> {
        self.names.get_index_of(name).map(VariableId)
    }

    /// Name of a variable.
    ///
    /// # Panics
    ///
    /// Panics if `id` belongs to another query
    #[must_use]
    pub fn name(&self, id: VariableId) -> &str {
        &self.names[id.0]
    }

    /// Number of distinct variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the query has no variables.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Variables in order of first appearance.
    pub fn iter(&self) -> impl Iterator<Item = (VariableId, &str)> + '_ {
        self.names
            .iter()
            .enumerate()
            .map(|(index, name)| (VariableId(index), name.as_str()))
    }
}

/// A conjunction of goals ready for resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    goals: Vec<Goal>,
    variables: VariableTable,
}

impl Query {
    /// Goals in the order they are resolved.
    #[must_use]
    pub fn goals(&self) -> &[Goal] {
        &self.goals
    }

    /// The query's variables.
    #[must_use]
    pub fn variables(&self) -> &VariableTable {
        &self.variables
    }

    /// Build a query from atoms; variables with the same name are shared
    /// across all of them.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedGoal`] for an empty conjunction or a call without
    /// arguments, and the [`Config`] limit errors.
    pub fn from_atoms(database: &mut FactDatabase, atoms: &[Atom], config: &Config) -> Result<Self> {
        let mut builder = QueryBuilder::new(database, config);
        for atom in atoms {
            let arguments = atom.terms.iter().map(|term| match term {
                Term::Variable(name) => Ok(Argument::Variable(name)),
                Term::Constant(name) => Ok(Argument::Constant(name)),
            });
            builder.goal(&atom.predicate, arguments, None)?;
        }
        builder.finish(None)
    }

    /// Render the query with names from `database`, e.g.
    /// `parent(tom, Y), parent(Y, ann)`.
    #[must_use]
    pub fn display<'a>(&'a self, database: &'a FactDatabase) -> QueryDisplay<'a> {
        QueryDisplay {
            query: self,
            database,
        }
    }
}

/// Helper returned by [`Query::display`].
#[derive(Debug, Clone, Copy)]
pub struct QueryDisplay<'a> {
    query: &'a Query,
    database: &'a FactDatabase,
}

impl fmt::Display for QueryDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, goal) in self.query.goals.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}(", self.database.predicate_name(goal.predicate))?;
            for (j, condition) in goal.conditions.iter().enumerate() {
                if j > 0 {
                    f.write_str(", ")?;
                }
                match *condition {
                    Condition::Constant(symbol) => f.write_str(self.database.symbol_name(symbol))?,
                    Condition::Variable(variable) => f.write_str(self.query.variables.name(variable))?,
                }
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}

/// Build the query held by a `query` syntax node.
///
/// Every `predicate` below the node becomes a goal: its first identifier is
/// the predicate name and each further identifier an argument, classified by
/// its `constant` or `variable` label.
///
/// # Errors
///
/// [`Error::MalformedGoal`] when a call has no arguments, an identifier has
/// neither label, or the query holds no calls at all; the limit errors of
/// [`Config`]. Goals built before the error are discarded.
pub fn build_query(database: &mut FactDatabase, node: &SyntaxNode, config: &Config) -> Result<Query> {
    let mut builder = QueryBuilder::new(database, config);
    let mut calls = TagCursor::new(node);
    while let Some(call) = calls.find_next(PREDICATE) {
        let mut idents = TagCursor::new(call);
        let head = idents.find_next(IDENT).ok_or_else(|| {
            Error::malformed("predicate call has no name", Some(call.location))
        })?;
        let arguments = std::iter::from_fn(|| idents.find_next(IDENT)).map(classify);
        builder.goal(&head.contents, arguments, Some(call.location))?;
    }
    builder.finish(Some(node.location))
}

/// Argument of a call, as written
#[derive(Debug, Clone, Copy)]
enum Argument<'a> {
    Variable(&'a str),
    Constant(&'a str),
}

fn classify(ident: &SyntaxNode) -> Result<Argument<'_>> {
    if ident.has_label(VARIABLE) {
        Ok(Argument::Variable(&ident.contents))
    } else if ident.has_label(CONSTANT) {
        Ok(Argument::Constant(&ident.contents))
    } else {
        Err(Error::malformed(
            format!("cannot classify identifier `{}` (tag `{}`)", ident.contents, ident.tag),
            Some(ident.location),
        ))
    }
}

/// Accumulates goals for one query, sharing one variable table.
struct QueryBuilder<'a> {
    database: &'a mut FactDatabase,
    config: &'a Config,
    goals: Vec<Goal>,
    variables: VariableTable,
}

impl<'a> QueryBuilder<'a> {
    fn new(database: &'a mut FactDatabase, config: &'a Config) -> Self {
        Self {
            database,
            config,
            goals: Vec::new(),
            variables: VariableTable::default(),
        }
    }

    fn goal<'n>(
        &mut self,
        name: &str,
        arguments: impl Iterator<Item = Result<Argument<'n>>>,
        location: Option<Location>,
    ) -> Result<()> {
        let mut conditions = SmallVec::new();
        for argument in arguments {
            let condition = match argument? {
                Argument::Variable(variable) => {
                    self.config.check_name(variable)?;
                    self.database.intern_symbol(variable);
                    self.variables.condition(variable)
                }
                Argument::Constant(constant) => {
                    self.config.check_name(constant)?;
                    Condition::Constant(self.database.intern_symbol(constant))
                }
            };
            conditions.push(condition);
        }
        if conditions.is_empty() {
            return Err(Error::malformed(
                format!("`{name}` is called with no arguments"),
                location,
            ));
        }
        self.config.check_call(name, conditions.len())?;

        let predicate = self.database.intern_predicate(name);
        debug!("goal #{}: {name}/{}", self.goals.len(), conditions.len());
        self.goals.push(Goal {
            predicate,
            conditions,
        });
        Ok(())
    }

    fn finish(self, location: Option<Location>) -> Result<Query> {
        if self.goals.is_empty() {
            return Err(Error::malformed("query has no goals", location));
        }
        Ok(Query {
            goals: self.goals,
            variables: self.variables,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(tag: &str, text: &str) -> SyntaxNode {
        SyntaxNode::leaf(tag, text)
    }

    fn call(name: &str, args: Vec<SyntaxNode>) -> SyntaxNode {
        let mut children = vec![ident("ident|constant", name), ident("char", "(")];
        children.push(SyntaxNode::branch("params", args));
        children.push(ident("char", ")"));
        SyntaxNode::branch("predicate", children)
    }

    fn query(calls: Vec<SyntaxNode>) -> SyntaxNode {
        SyntaxNode::branch(
            "query",
            vec![
                ident("char", "?-"),
                SyntaxNode::branch("union", calls),
                ident("char", "."),
            ],
        )
    }

    #[test]
    fn test_repeated_variables_share_one_condition() {
        let mut db = FactDatabase::new();
        let node = query(vec![
            call(
                "parent",
                vec![ident("ident|constant", "tom"), ident("ident|variable", "Y")],
            ),
            call(
                "parent",
                vec![ident("ident|variable", "Y"), ident("ident|constant", "ann")],
            ),
        ]);

        let query = build_query(&mut db, &node, &Config::default()).unwrap();

        assert_eq!(query.goals().len(), 2);
        assert_eq!(query.variables().len(), 1);
        let y = query.variables().get("Y").unwrap();
        assert_eq!(query.goals()[0].conditions[1], Condition::Variable(y));
        assert_eq!(query.goals()[1].conditions[0], Condition::Variable(y));
        assert_eq!(query.goals()[0].predicate, query.goals()[1].predicate);
        assert_eq!(
            query.display(&db).to_string(),
            "parent(tom, Y), parent(Y, ann)"
        );
    }

    #[test]
    fn test_constants_are_interned_per_occurrence() {
        let mut db = FactDatabase::new();
        let node = query(vec![call(
            "same",
            vec![ident("ident|constant", "c"), ident("ident|constant", "c")],
        )]);

        let query = build_query(&mut db, &node, &Config::default()).unwrap();

        let c = db.symbol("c").unwrap();
        assert_eq!(
            query.goals()[0].conditions.as_slice(),
            &[Condition::Constant(c), Condition::Constant(c)]
        );
        assert!(query.variables().is_empty());
    }

    #[test]
    fn test_variable_names_enter_the_symbol_table() {
        let mut db = FactDatabase::new();
        let node = query(vec![call("p", vec![ident("ident|variable", "X")])]);

        build_query(&mut db, &node, &Config::default()).unwrap();

        assert!(db.symbol("X").is_some());
        assert!(db.symbol_occurrences("X").is_empty());
    }

    #[test]
    fn test_call_without_arguments_is_malformed() {
        let mut db = FactDatabase::new();
        let node = query(vec![
            call("p", vec![ident("ident|constant", "a")]),
            call("q", vec![]),
        ]);

        let err = build_query(&mut db, &node, &Config::default()).unwrap_err();
        assert!(
            matches!(&err, Error::MalformedGoal { reason, .. } if reason.contains("`q`")),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn test_unclassified_identifier_is_malformed() {
        let mut db = FactDatabase::new();
        let node = query(vec![call("p", vec![ident("ident", "mystery")])]);

        let err = build_query(&mut db, &node, &Config::default()).unwrap_err();
        assert!(matches!(err, Error::MalformedGoal { .. }));
    }

    #[test]
    fn test_query_without_calls_is_malformed() {
        let mut db = FactDatabase::new();
        let node = query(vec![]);

        let err = build_query(&mut db, &node, &Config::default()).unwrap_err();
        assert!(matches!(err, Error::MalformedGoal { .. }));
    }

    #[test]
    fn test_argument_limit() {
        let mut db = FactDatabase::new();
        let config = Config {
            max_params: 1,
            ..Config::default()
        };
        let atoms = [Atom::new("edge", [Term::constant("a"), Term::variable("X")])];

        let err = Query::from_atoms(&mut db, &atoms, &config).unwrap_err();
        assert!(matches!(err, Error::TooManyArguments { arity: 2, max: 1, .. }));
    }

    #[test]
    fn test_from_atoms_matches_syntax_build() {
        let mut db = FactDatabase::new();
        let atoms = [
            Atom::new("parent", [Term::constant("tom"), Term::variable("Y")]),
            Atom::new("parent", [Term::variable("Y"), Term::constant("ann")]),
        ];
        let from_atoms = Query::from_atoms(&mut db, &atoms, &Config::default()).unwrap();

        let node = query(vec![
            call(
                "parent",
                vec![ident("ident|constant", "tom"), ident("ident|variable", "Y")],
            ),
            call(
                "parent",
                vec![ident("ident|variable", "Y"), ident("ident|constant", "ann")],
            ),
        ]);
        let from_syntax = build_query(&mut db, &node, &Config::default()).unwrap();

        assert_eq!(from_atoms, from_syntax);
    }
}
