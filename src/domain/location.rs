//! Hierarchical network locations (`/dc/rack`) and query scopes.
//!
//! The only hard syntactic gate is the leading separator. Segments are kept
//! verbatim, so `//rack0` and `/rack0/` are accepted and simply describe
//! different paths than `/rack0`.

use std::fmt;
use std::str::FromStr;

use crate::domain::error::{TopologyError, TopologyResult};

pub const PATH_SEPARATOR: char = '/';
pub const PATH_SEPARATOR_STR: &str = "/";
/// Location of the root inner node.
pub const ROOT: &str = "";
/// Prefix that turns a scope into "everything except this scope".
pub const SCOPE_NOT_INDICATOR: char = '~';

/// Validated location of a leaf: always starts with `/` and is never the root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NetworkLocation(String);

impl NetworkLocation {
    /// Validate a raw location. `None` and the empty string denote the root,
    /// which is rejected here: leaves cannot hang off the root directly.
    pub fn parse(raw: Option<&str>) -> TopologyResult<Self> {
        let raw = raw.ok_or_else(|| {
            TopologyError::invalid_location(ROOT, "location is null (root cannot hold a leaf)")
        })?;
        if is_root_path(raw) {
            return Err(TopologyError::invalid_location(
                raw,
                "root location cannot hold a leaf",
            ));
        }
        if !raw.starts_with(PATH_SEPARATOR) {
            return Err(TopologyError::invalid_location(
                raw,
                "location must start with '/'",
            ));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path segments below the root, in order.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        segments(&self.0)
    }

    /// Number of inner levels between the root and a leaf placed here.
    pub fn depth(&self) -> usize {
        path_depth(&self.0)
    }
}

impl FromStr for NetworkLocation {
    type Err = TopologyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(Some(s))
    }
}

impl fmt::Display for NetworkLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NetworkLocation {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// `""` and `"/"` both denote the root.
pub fn is_root_path(path: &str) -> bool {
    path == ROOT || path == PATH_SEPARATOR_STR
}

/// Split a path into segments below the root.
///
/// The root yields nothing; anything else drops exactly one leading separator.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    let rest = if is_root_path(path) {
        None
    } else {
        Some(path.strip_prefix(PATH_SEPARATOR).unwrap_or(path))
    };
    rest.into_iter().flat_map(|r| r.split(PATH_SEPARATOR))
}

pub fn path_depth(path: &str) -> usize {
    segments(path).count()
}

/// Full path of a node named `name` placed at `location`.
pub fn join(location: &str, name: &str) -> String {
    format!("{location}{PATH_SEPARATOR}{name}")
}

/// Scope of a leaf query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope<'a> {
    /// Leaves under this path; the empty path means the whole tree.
    Within(&'a str),
    /// Leaves not under this path.
    Excluding(&'a str),
}

impl<'a> Scope<'a> {
    pub fn parse(raw: &'a str) -> Self {
        match raw.strip_prefix(SCOPE_NOT_INDICATOR) {
            Some(rest) => Scope::Excluding(rest),
            None => Scope::Within(raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Some("/rack0"), true)]
    #[case(Some("/dc1/rack0"), true)]
    #[case(Some("//rack0"), true)]
    #[case(Some("/rack0/"), true)]
    #[case(Some("not-start-with-sep"), false)]
    #[case(Some(""), false)]
    #[case(Some("/"), false)]
    #[case(None, false)]
    fn given_raw_location_when_parsing_then_only_separator_prefixed_non_root_is_valid(
        #[case] raw: Option<&str>,
        #[case] valid: bool,
    ) {
        let result = NetworkLocation::parse(raw);
        assert_eq!(result.is_ok(), valid, "{:?} -> {:?}", raw, result);
        if let Err(e) = result {
            assert!(matches!(e, TopologyError::InvalidLocation { .. }));
        }
    }

    #[test]
    fn given_valid_location_when_parsing_then_keeps_it_verbatim() {
        let loc: NetworkLocation = "/rack0/".parse().unwrap();
        assert_eq!(loc.as_str(), "/rack0/");
        assert_eq!(loc.segments().collect::<Vec<_>>(), vec!["rack0", ""]);
        assert_eq!(loc.depth(), 2);
    }

    #[rstest]
    #[case("", 0)]
    #[case("/", 0)]
    #[case("/rack0", 1)]
    #[case("//rack0", 2)]
    #[case("/dc/rack0", 2)]
    fn given_path_when_computing_depth_then_counts_segments(
        #[case] path: &str,
        #[case] depth: usize,
    ) {
        assert_eq!(path_depth(path), depth);
    }

    #[test]
    fn given_location_and_name_when_joining_then_builds_full_path() {
        assert_eq!(join("/rack0", "n1"), "/rack0/n1");
        assert_eq!(join(ROOT, ""), "/");
    }

    #[rstest]
    #[case("", Scope::Within(""))]
    #[case("/rack0", Scope::Within("/rack0"))]
    #[case("~/rack0", Scope::Excluding("/rack0"))]
    #[case("~", Scope::Excluding(""))]
    fn given_raw_scope_when_parsing_then_detects_exclusion(
        #[case] raw: &str,
        #[case] expected: Scope<'static>,
    ) {
        assert_eq!(Scope::parse(raw), expected);
    }
}
