use crate::syntax::Location;
use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised while reading, parsing, ingesting or querying a program.
///
/// A failed unification is never an error: the resolver backtracks instead.
/// A predicate that no fact defines is not an error either, it simply has no
/// candidates.
#[derive(Debug, Error)]
pub enum Error {
    /// The program text does not follow the grammar.
    #[error("parse error at {location}: {message}")]
    Parse {
        /// Where the parser gave up.
        location: Location,
        /// What the parser expected.
        message: String,
    },
    /// A query goal that cannot be resolved, e.g. a call without arguments.
    #[error("malformed goal{}: {reason}", at(.location))]
    MalformedGoal {
        /// Why the goal was rejected.
        reason: String,
        /// Source location of the offending node, when built from text.
        location: Option<Location>,
    },
    /// A fact mentioning a variable.
    #[error("fact `{predicate}`{} mentions variable `{variable}`", at(.location))]
    NonGroundFact {
        /// Predicate of the rejected fact.
        predicate: String,
        /// The first variable found among its arguments.
        variable: String,
        /// Source location of the fact, when built from text.
        location: Option<Location>,
    },
    /// A fact or goal with more arguments than the configuration allows.
    #[error("`{name}` has {arity} arguments, at most {max} are allowed")]
    TooManyArguments {
        /// Predicate name.
        name: String,
        /// Number of arguments given.
        arity: usize,
        /// Configured ceiling.
        max: usize,
    },
    /// A predicate, constant or variable name over the configured length.
    #[error("name `{name}` is longer than {max} bytes")]
    NameTooLong {
        /// The offending name.
        name: String,
        /// Configured ceiling.
        max: usize,
    },
    /// Reading the program failed.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// The program is not valid UTF-8.
    #[error("input is not valid UTF-8: {0}")]
    Utf8(#[from] bstr::Utf8Error),
}

fn at(location: &Option<Location>) -> String {
    location.map(|l| format!(" at {l}")).unwrap_or_default()
}

impl Error {
    pub(crate) fn malformed(reason: impl Into<String>, location: Option<Location>) -> Self {
        Self::MalformedGoal {
            reason: reason.into(),
            location,
        }
    }

    /// Source location attached to this error, if any.
    #[must_use]
    pub fn location(&self) -> Option<Location> {
        match self {
            Self::Parse { location, .. } => Some(*location),
            Self::MalformedGoal { location, .. } | Self::NonGroundFact { location, .. } => {
                *location
            }
            _ => None,
        }
    }
}
