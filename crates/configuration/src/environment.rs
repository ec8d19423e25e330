//! Read access to environment variables. Tests supply a fixed set instead of
//! the process environment.

use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("the environment variable {0} is not set")]
    VariableNotPresent(String),
    #[error("the environment variable {0} is not valid unicode")]
    NonUnicodeValue(String),
}

pub trait Environment {
    fn read(&self, variable: &str) -> Result<String, Error>;
}

impl<E: Environment> Environment for &E {
    fn read(&self, variable: &str) -> Result<String, Error> {
        (*self).read(variable)
    }
}

/// The environment of the running process.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn read(&self, variable: &str) -> Result<String, Error> {
        std::env::var(variable).map_err(|error| match error {
            std::env::VarError::NotPresent => Error::VariableNotPresent(variable.to_string()),
            std::env::VarError::NotUnicode(_) => Error::NonUnicodeValue(variable.to_string()),
        })
    }
}

/// A fixed set of variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixedEnvironment(HashMap<String, String>);

impl Environment for FixedEnvironment {
    fn read(&self, variable: &str) -> Result<String, Error> {
        self.0
            .get(variable)
            .cloned()
            .ok_or_else(|| Error::VariableNotPresent(variable.to_string()))
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for FixedEnvironment {
    fn from(variables: [(K, V); N]) -> Self {
        FixedEnvironment(
            variables
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

/// No variables at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyEnvironment;

impl Environment for EmptyEnvironment {
    fn read(&self, variable: &str) -> Result<String, Error> {
        Err(Error::VariableNotPresent(variable.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_environment_reads_its_variables() {
        let environment = FixedEnvironment::from([("DATABASE_URL", "postgresql://localhost")]);

        assert_eq!(
            environment.read("DATABASE_URL"),
            Ok("postgresql://localhost".to_string())
        );
        assert_eq!(
            environment.read("OTHER"),
            Err(Error::VariableNotPresent("OTHER".to_string()))
        );
    }

    #[test]
    fn empty_environment_has_nothing() {
        assert!(EmptyEnvironment.read("PATH").is_err());
    }
}
