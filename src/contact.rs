use std::fmt;

#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};

use crate::validator::{AddressValidator, EmailError, SyntaxValidator};

/// A sender or recipient: an address and an optional display name.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub email: String,
    pub name: Option<String>,
}

impl Contact {
    /// Validates `email` in strict mode and keeps its normalized form.
    pub fn new(email: &str, name: Option<&str>) -> Result<Self, EmailError> {
        Self::with_validator(email, name, &SyntaxValidator::default())
    }

    pub fn with_validator<V>(email: &str, name: Option<&str>, validator: &V) -> Result<Self, EmailError>
    where
        V: AddressValidator + ?Sized,
    {
        let normalized = validator.validate(email)?;
        Ok(Self {
            email: normalized.address(),
            name: clean_name(name),
        })
    }

    /// Takes `email` as given.
    pub fn unchecked(email: impl Into<String>, name: Option<&str>) -> Self {
        Self {
            email: email.into(),
            name: clean_name(name),
        }
    }
}

fn clean_name(name: Option<&str>) -> Option<String> {
    name.map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

impl fmt::Display for Contact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) if name.contains(|c: char| ",;:<>@\"".contains(c)) => {
                write!(f, "\"{}\" <{}>", name.replace('"', "\\\""), self.email)
            }
            Some(name) => write!(f, "{name} <{}>", self.email),
            None => f.write_str(&self.email),
        }
    }
}
