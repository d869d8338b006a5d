//! Bookie identities: the opaque, comparable tokens that name leaves.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::domain::error::{TopologyError, TopologyResult};

static BOOKIE_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9:._\-]+$").unwrap());

/// Reserved for the read-only bookie registration path.
const READONLY: &str = "readonly";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BookieId(String);

impl BookieId {
    pub fn parse(raw: &str) -> TopologyResult<Self> {
        if raw.is_empty() {
            return Err(invalid(raw, "bookie id is empty"));
        }
        if raw == READONLY {
            return Err(invalid(raw, "'readonly' is a reserved word"));
        }
        if !BOOKIE_ID_PATTERN.is_match(raw) {
            return Err(invalid(
                raw,
                "only letters, digits, ':', '.', '_' and '-' are allowed",
            ));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn invalid(raw: &str, reason: &str) -> TopologyError {
    TopologyError::InvalidBookieId {
        id: raw.to_string(),
        reason: reason.to_string(),
    }
}

impl FromStr for BookieId {
    type Err = TopologyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for BookieId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
