//! Engine configuration.

/// Default ceiling on the number of arguments of a fact or goal.
pub const MAX_PARAMS: usize = 10;

/// Default ceiling on the length of a name, in bytes.
pub const MAX_NAME_LEN: usize = 255;

/// How the resolver enumerates candidate facts for a goal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum Strategy {
    /// Walk every fact of the goal's predicate.
    Scan,
    /// Walk the shortest of the predicate's facts and the occurrence lists
    /// of the symbols already known for the goal.
    #[default]
    Indexed,
}

/// Limits applied before anything reaches the database, plus resolver
/// settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct Config {
    /// Maximum number of arguments of a fact or goal.
    pub max_params: usize,
    /// Maximum length of any name, in bytes.
    pub max_name_len: usize,
    /// Candidate enumeration strategy.
    pub strategy: Strategy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_params: MAX_PARAMS,
            max_name_len: MAX_NAME_LEN,
            strategy: Strategy::default(),
        }
    }
}

impl Config {
    /// Reject a call of `arity` arguments to `name` over the limits.
    pub(crate) fn check_call(&self, name: &str, arity: usize) -> crate::Result<()> {
        self.check_name(name)?;
        if arity > self.max_params {
            return Err(crate::Error::TooManyArguments {
                name: name.to_string(),
                arity,
                max: self.max_params,
            });
        }
        Ok(())
    }

    /// Reject a name over the length limit.
    pub(crate) fn check_name(&self, name: &str) -> crate::Result<()> {
        if name.len() > self.max_name_len {
            return Err(crate::Error::NameTooLong {
                name: name.to_string(),
                max: self.max_name_len,
            });
        }
        Ok(())
    }
}
