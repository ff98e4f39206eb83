//! Render functions that fragments may call
//!
//! Functions are bound by name in a typed [`Functions`] table. The kind of value each function
//! accepts is part of its binding, so a fragment that calls a function with the wrong kind of
//! field (or a table that binds a function with the wrong signature) is rejected when the
//! [`FragmentSet`](crate::FragmentSet) is built rather than when a script is rendered.

use crate::{
    fragment::InitError,
    params::{ApiEndpoint, NetworkRanges},
};
use std::{collections::HashMap, fmt};

/// The name fragments use to call [`endpoint`]
pub const ENDPOINT: &str = "endpoint";

/// The name fragments use to call [`subnet_of`]
pub const SUBNET_OF: &str = "subnetOf";

/// Signatures the fragment library is written against.
const REQUIRED: &[(&str, Kind)] = &[
    (ENDPOINT, Kind::Endpoint),
    (SUBNET_OF, Kind::NetworkRanges),
];

/// Formats an API endpoint as `host:port`
///
/// Values are not validated.
pub fn endpoint(endpoint: &ApiEndpoint) -> String {
    format!("{}:{}", endpoint.host, endpoint.port)
}

/// Returns the CIDR text for a set of network ranges
///
/// Only the first block is used. An empty set of ranges yields an empty string.
pub fn subnet_of(ranges: &NetworkRanges) -> String {
    ranges.cidr_blocks.first().cloned().unwrap_or_default()
}

/// The kind of value a field holds and a function accepts
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    /// Plain text that may be written directly into a script
    Text,

    /// An [`ApiEndpoint`]
    Endpoint,

    /// A set of [`NetworkRanges`]
    NetworkRanges,

    /// A list of text values that may be iterated with `range`
    List,
}

/// A resolved field value
#[derive(Copy, Clone, Debug)]
pub enum Value<'a> {
    /// Plain text
    Text(&'a str),

    /// An API endpoint
    Endpoint(&'a ApiEndpoint),

    /// Network ranges
    NetworkRanges(&'a NetworkRanges),

    /// A list of text values
    List(&'a [String]),
}

/// A render function bound in a [`Functions`] table
#[derive(Copy, Clone)]
pub enum Func {
    /// A function that renders an [`ApiEndpoint`]
    Endpoint(fn(&ApiEndpoint) -> String),

    /// A function that renders [`NetworkRanges`]
    NetworkRanges(fn(&NetworkRanges) -> String),
}

/// A table of named render functions
#[derive(Clone, Debug)]
pub struct Functions {
    bound: HashMap<String, Func>,
}

// === impl Kind ===

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Text => "text",
            Self::Endpoint => "endpoint",
            Self::NetworkRanges => "network ranges",
            Self::List => "list",
        })
    }
}

// === impl Value ===

impl Value<'_> {
    /// Returns the kind of this value
    pub fn kind(&self) -> Kind {
        match self {
            Self::Text(_) => Kind::Text,
            Self::Endpoint(_) => Kind::Endpoint,
            Self::NetworkRanges(_) => Kind::NetworkRanges,
            Self::List(_) => Kind::List,
        }
    }
}

// === impl Func ===

impl Func {
    /// Returns the kind of value this function accepts
    pub fn arg(&self) -> Kind {
        match self {
            Self::Endpoint(_) => Kind::Endpoint,
            Self::NetworkRanges(_) => Kind::NetworkRanges,
        }
    }

    /// Applies the function, returning `None` if `value` is not of the kind the function accepts
    pub fn apply(&self, value: Value<'_>) -> Option<String> {
        match (self, value) {
            (Self::Endpoint(f), Value::Endpoint(e)) => Some(f(e)),
            (Self::NetworkRanges(f), Value::NetworkRanges(r)) => Some(f(r)),
            _ => None,
        }
    }
}

impl fmt::Debug for Func {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn({}) -> text", self.arg())
    }
}

// === impl Functions ===

impl Default for Functions {
    fn default() -> Self {
        Self {
            bound: HashMap::new(),
        }
        .bind(ENDPOINT, Func::Endpoint(endpoint))
        .bind(SUBNET_OF, Func::NetworkRanges(subnet_of))
    }
}

impl Functions {
    /// Binds `func` under `name`, replacing any existing binding
    pub fn bind(mut self, name: impl Into<String>, func: Func) -> Self {
        self.bound.insert(name.into(), func);
        self
    }

    /// Returns the function bound under `name`
    pub fn get(&self, name: &str) -> Option<Func> {
        self.bound.get(name).copied()
    }

    /// Asserts that every function the fragment library calls is bound with the signature the
    /// library was written against
    pub(crate) fn check_required(&self) -> Result<(), InitError> {
        for &(name, expected) in REQUIRED {
            let func = self
                .get(name)
                .ok_or_else(|| InitError::UnknownFunction(name.to_string()))?;
            if func.arg() != expected {
                return Err(InitError::Signature {
                    func: name.to_string(),
                    expected,
                    found: func.arg(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_endpoint() {
        let ep = ApiEndpoint::new("10.0.0.1", 443);
        assert_eq!(endpoint(&ep), "10.0.0.1:443");
    }

    #[test]
    fn endpoint_is_not_validated() {
        assert_eq!(endpoint(&ApiEndpoint::new("", -1)), ":-1");
    }

    #[test]
    fn subnet_uses_first_block() {
        let ranges = ["10.96.0.0/12", "fd00::/108"].into_iter().collect();
        assert_eq!(subnet_of(&ranges), "10.96.0.0/12");
        assert_eq!(subnet_of(&NetworkRanges::default()), "");
    }

    #[test]
    fn default_table_satisfies_required_signatures() {
        Functions::default()
            .check_required()
            .expect("default functions must match");
    }

    #[test]
    fn rejects_rebound_signature() {
        let funcs = Functions::default().bind(SUBNET_OF, Func::Endpoint(endpoint));
        match funcs.check_required() {
            Err(InitError::Signature {
                func,
                expected,
                found,
            }) => {
                assert_eq!(func, SUBNET_OF);
                assert_eq!(expected, Kind::NetworkRanges);
                assert_eq!(found, Kind::Endpoint);
            }
            res => panic!("unexpected result: {res:?}"),
        }
    }

    #[test]
    fn apply_checks_value_kind() {
        let ep = ApiEndpoint::new("host", 6443);
        let f = Func::Endpoint(endpoint);
        assert_eq!(f.apply(Value::Endpoint(&ep)).as_deref(), Some("host:6443"));
        assert_eq!(f.apply(Value::Text("host")), None);
    }
}
