use crate::config::Config;
use crate::cursor::TagCursor;
use crate::database::{FactDatabase, FactId};
use crate::error::{Error, Result};
use crate::query::{build_query, Atom, Query, Term};
use crate::resolver::{solve, BindingSet, Solutions};
use crate::syntax::{SyntaxNode, FACT, IDENT, PREDICATE, QUERY, VARIABLE};
use indexmap::IndexMap;
use log::{info, warn};
use std::fmt;

/// One solution of a query, by name: variable -> constant, in order of the
/// variables' first appearance in the query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct QueryResult {
    /// Variable bindings that satisfy the query
    pub bindings: IndexMap<String, String>,
}

/// `X = ann, Y = bob`, or `true` for a query without variables.
impl fmt::Display for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.bindings.is_empty() {
            return f.write_str("true");
        }
        for (i, (variable, value)) in self.bindings.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{variable} = {value}")?;
        }
        Ok(())
    }
}

/// The answer to one query of a consulted program.
#[derive(Debug)]
pub struct QueryOutcome {
    /// The query as written, e.g. `parent(bob, X)`.
    pub query: String,
    /// All solutions in search order, or why the query was skipped.
    pub answer: Result<Vec<QueryResult>>,
}

/// What loading a program did.
#[derive(Debug, Default)]
pub struct Consultation {
    /// Number of facts stored.
    pub facts_added: usize,
    /// Facts skipped, with the reason.
    pub rejected_facts: Vec<Error>,
    /// One entry per query, in document order.
    pub queries: Vec<QueryOutcome>,
}

/// A fact database plus the settings used to fill and query it
#[derive(Debug, Default)]
pub struct Engine {
    database: FactDatabase,
    config: Config,
}

impl Engine {
    /// Create a new engine with the default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new engine with `config`
    #[must_use]
    pub fn with_config(config: Config) -> Self {
        Self {
            database: FactDatabase::new(),
            config,
        }
    }

    /// The facts loaded so far
    #[must_use]
    pub fn database(&self) -> &FactDatabase {
        &self.database
    }

    /// The active configuration
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Add a fact to the knowledge base
    ///
    /// # Errors
    ///
    /// [`Error::NonGroundFact`] if the atom contains a variable, and the
    /// limit errors of [`Config`].
    pub fn add_fact(&mut self, atom: &Atom) -> Result<FactId> {
        let mut arguments = Vec::with_capacity(atom.terms.len());
        for term in &atom.terms {
            match term {
                Term::Constant(name) => arguments.push(name.as_str()),
                Term::Variable(name) => {
                    return Err(Error::NonGroundFact {
                        predicate: atom.predicate.clone(),
                        variable: name.clone(),
                        location: None,
                    })
                }
            }
        }
        self.store(&atom.predicate, &arguments)
    }

    fn store(&mut self, predicate: &str, arguments: &[&str]) -> Result<FactId> {
        self.config.check_call(predicate, arguments.len())?;
        for name in arguments {
            self.config.check_name(name)?;
        }
        Ok(self.database.add_fact(predicate, arguments))
    }

    /// Store every call of one `fact` statement; each call is a fact of its
    /// own. Returns one result per call.
    fn ingest(&mut self, statement: &SyntaxNode) -> Vec<Result<FactId>> {
        let mut results = Vec::new();
        let mut calls = TagCursor::new(statement);
        while let Some(call) = calls.find_next(PREDICATE) {
            let mut idents = TagCursor::new(call);
            let Some(head) = idents.find_next(IDENT) else {
                results.push(Err(Error::malformed(
                    "predicate call has no name",
                    Some(call.location),
                )));
                continue;
            };
            let mut arguments = Vec::new();
            let mut variable = None;
            while let Some(ident) = idents.find_next(IDENT) {
                if ident.has_label(VARIABLE) {
                    variable.get_or_insert(ident);
                }
                arguments.push(ident.contents.as_str());
            }
            let result = match variable {
                Some(variable) => Err(Error::NonGroundFact {
                    predicate: head.contents.clone(),
                    variable: variable.contents.clone(),
                    location: Some(variable.location),
                }),
                None => self.store(&head.contents, &arguments),
            };
            results.push(result);
        }
        results
    }

    /// Build a query against this engine's database.
    ///
    /// # Errors
    ///
    /// See [`Query::from_atoms`].
    pub fn build(&mut self, atoms: &[Atom]) -> Result<Query> {
        Query::from_atoms(&mut self.database, atoms, &self.config)
    }

    /// Lazily resolve a query built against this engine's database.
    #[must_use]
    pub fn solutions<'a>(&'a self, query: &'a Query) -> Solutions<'a> {
        solve(&self.database, query, self.config.strategy)
    }

    /// Returns all variable bindings that make the query true, in search
    /// order.
    #[must_use]
    pub fn solve(&self, query: &Query) -> Vec<QueryResult> {
        self.solutions(query)
            .map(|solution| self.name_bindings(query, &solution))
            .collect()
    }

    /// Returns whether the query has at least one solution
    #[must_use]
    pub fn ask(&self, query: &Query) -> bool {
        self.solutions(query).next().is_some()
    }

    /// Translate a binding set to names.
    #[must_use]
    pub fn name_bindings(&self, query: &Query, solution: &BindingSet) -> QueryResult {
        let bindings = query
            .variables()
            .iter()
            .filter_map(|(variable, name)| {
                let value = solution.get(variable)?;
                Some((name.to_string(), self.database.symbol_name(value).to_string()))
            })
            .collect();
        QueryResult { bindings }
    }

    /// Load a parsed program: store every fact in document order, then
    /// answer every query in document order against the complete database.
    ///
    /// Bad facts and bad queries are skipped and reported; the rest of the
    /// program still runs.
    pub fn load(&mut self, program: &SyntaxNode) -> Consultation {
        let mut report = Consultation::default();

        let mut statements = TagCursor::new(program);
        while let Some(statement) = statements.find_next(FACT) {
            for result in self.ingest(statement) {
                match result {
                    Ok(_) => report.facts_added += 1,
                    Err(err) => {
                        warn!("skipping fact: {err}");
                        report.rejected_facts.push(err);
                    }
                }
            }
        }

        let mut statements = TagCursor::new(program);
        while let Some(statement) = statements.find_next(QUERY) {
            let outcome = match build_query(&mut self.database, statement, &self.config) {
                Ok(query) => QueryOutcome {
                    query: query.display(&self.database).to_string(),
                    answer: Ok(self.solve(&query)),
                },
                Err(err) => {
                    warn!("skipping query: {err}");
                    QueryOutcome {
                        query: statement.text(),
                        answer: Err(err),
                    }
                }
            };
            report.queries.push(outcome);
        }

        info!(
            "consulted {} facts ({} rejected), answered {} queries",
            report.facts_added,
            report.rejected_facts.len(),
            report.queries.len()
        );
        report
    }

    /// Parse and load a program.
    ///
    /// # Errors
    ///
    /// [`Error::Parse`] if the text is not a valid program; nothing is
    /// loaded in that case.
    #[cfg(feature = "parsing")]
    pub fn consult(&mut self, source: &str) -> Result<Consultation> {
        let program = crate::parser::parse_program(source)?;
        Ok(self.load(&program))
    }

    /// Parse and answer a single `?- ... .` query.
    ///
    /// # Errors
    ///
    /// [`Error::Parse`] for invalid text, [`Error::MalformedGoal`] and the
    /// limit errors for a query that cannot be built.
    #[cfg(feature = "parsing")]
    pub fn query(&mut self, source: &str) -> Result<Vec<QueryResult>> {
        let node = crate::parser::parse_query(source)?;
        let query = build_query(&mut self.database, &node, &self.config)?;
        Ok(self.solve(&query))
    }
}
