//! # Microprolog
//!
//! A minimal Prolog engine for facts and conjunctive queries.
//!
//! ## Features
//!
//! - Interned, cross-linked symbol and predicate tables
//! - Depth-first backtracking resolution with lazy solutions
//! - A `nom` parser for `fact.` and `?- query.` programs (feature `parsing`)
//!
//! ## Example
//!
//! ```rust
//! use microprolog::{Atom, Engine, Term};
//!
//! let mut engine = Engine::new();
//! engine.add_fact(&Atom::new("parent", [Term::constant("tom"), Term::constant("bob")]))?;
//! engine.add_fact(&Atom::new("parent", [Term::constant("bob"), Term::constant("ann")]))?;
//!
//! let query = engine.build(&[
//!     Atom::new("parent", [Term::constant("tom"), Term::variable("Y")]),
//!     Atom::new("parent", [Term::variable("Y"), Term::constant("ann")]),
//! ])?;
//! let results = engine.solve(&query);
//! assert_eq!(results[0].to_string(), "Y = bob");
//! # Ok::<(), microprolog::Error>(())
//! ```

pub mod config;
/// Tag search over syntax trees.
pub mod cursor;
/// Fact database.
pub mod database;
/// Consulting programs and answering queries.
pub mod engine;
/// Error types.
pub mod error;
#[cfg(feature = "parsing")]
pub mod parser;
/// Query construction.
pub mod query;
pub mod resolver;
pub mod syntax;

pub use config::{Config, Strategy};
pub use cursor::TagCursor;
pub use database::{Fact, FactDatabase, FactId, Occurrence, PredicateId, SymbolId};
pub use engine::{Consultation, Engine, QueryOutcome, QueryResult};
pub use error::{Error, Result};
#[cfg(feature = "parsing")]
pub use parser::{parse_program, parse_query};
pub use query::{build_query, Atom, Condition, Goal, Query, Term, VariableId, VariableTable};
pub use resolver::{solve, BindingSet, Solutions};
pub use syntax::{Location, SyntaxNode};
