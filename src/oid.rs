//! Object identifier type.
//!
//! An [`Oid`] is an immutable ordered sequence of 32-bit arcs with
//! lexicographic ordering. The ordering is what GETNEXT traversal, root
//! extraction, and registry scopes are built on: OIDs compare arc-by-arc
//! as unsigned integers, and a shorter OID sorts before any of its
//! extensions (`1.3.6.1.2` < `1.3.6.1.2.1` < `1.3.6.1.3`).

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Object identifier - a dotted sequence of non-negative integer arcs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Oid {
    arcs: Vec<u32>,
}

impl Oid {
    /// Create an OID from a vector of arcs.
    pub fn new(arcs: Vec<u32>) -> Self {
        Self { arcs }
    }

    /// The empty OID (zero arcs).
    pub fn empty() -> Self {
        Self { arcs: Vec::new() }
    }

    /// The arcs of this OID.
    pub fn arcs(&self) -> &[u32] {
        &self.arcs
    }

    /// Number of arcs.
    pub fn len(&self) -> usize {
        self.arcs.len()
    }

    /// Whether this OID has no arcs.
    pub fn is_empty(&self) -> bool {
        self.arcs.is_empty()
    }

    /// Compare the first `n` arcs of `self` against the first `n` arcs of
    /// `other`.
    ///
    /// If either OID is shorter than `n`, the comparison covers the common
    /// length and the shorter OID compares as less when all shared arcs are
    /// equal. `Ordering::Equal` therefore means "equal on the first n arcs".
    pub fn left_most_compare(&self, n: usize, other: &Oid) -> Ordering {
        let left = &self.arcs[..n.min(self.arcs.len())];
        let right = &other.arcs[..n.min(other.arcs.len())];
        left.cmp(right)
    }

    /// Whether `self` starts with all arcs of `prefix`.
    ///
    /// Every OID starts with the empty prefix.
    pub fn starts_with(&self, prefix: &Oid) -> bool {
        self.arcs.len() >= prefix.arcs.len() && self.arcs[..prefix.arcs.len()] == prefix.arcs
    }

    /// The smallest OID strictly greater than `self` with the same number of
    /// arcs: the last arc incremented by one.
    ///
    /// The empty OID has no peer and is returned unchanged.
    pub fn next_peer(&self) -> Oid {
        let mut arcs = self.arcs.clone();
        if let Some(last) = arcs.last_mut() {
            *last = last.saturating_add(1);
        }
        Self { arcs }
    }

    /// A copy of this OID with up to `n` trailing arcs removed.
    pub fn trim(&self, n: usize) -> Oid {
        let keep = self.arcs.len().saturating_sub(n);
        Self {
            arcs: self.arcs[..keep].to_vec(),
        }
    }

    /// The prefix of this OID with the given number of arcs.
    ///
    /// Truncates to the full OID if `len` exceeds the arc count.
    pub fn prefix(&self, len: usize) -> Oid {
        Self {
            arcs: self.arcs[..len.min(self.arcs.len())].to_vec(),
        }
    }

    /// A copy of this OID with one arc appended.
    pub fn child(&self, arc: u32) -> Oid {
        let mut arcs = Vec::with_capacity(self.arcs.len() + 1);
        arcs.extend_from_slice(&self.arcs);
        arcs.push(arc);
        Self { arcs }
    }
}

impl FromStr for Oid {
    type Err = Error;

    /// Parse a dotted OID string. A single leading dot is accepted
    /// (`.1.3.6.1` and `1.3.6.1` are the same OID).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.strip_prefix('.').unwrap_or(s);
        if trimmed.is_empty() {
            return Err(Error::InvalidOid { input: s.into() });
        }
        let arcs = trimmed
            .split('.')
            .map(|part| part.parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| Error::InvalidOid { input: s.into() })?;
        Ok(Self { arcs })
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for arc in &self.arcs {
            if !first {
                write!(f, ".")?;
            }
            write!(f, "{}", arc)?;
            first = false;
        }
        Ok(())
    }
}

impl From<&[u32]> for Oid {
    fn from(arcs: &[u32]) -> Self {
        Self {
            arcs: arcs.to_vec(),
        }
    }
}

impl serde::Serialize for Oid {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for Oid {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s: String = serde::Deserialize::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Construct an [`Oid`] from a literal list of arcs.
///
/// ```rust
/// use snmpfleet::{Oid, oid};
///
/// let sys_descr = oid!(1, 3, 6, 1, 2, 1, 1, 1, 0);
/// assert_eq!(sys_descr.to_string(), "1.3.6.1.2.1.1.1.0");
/// ```
#[macro_export]
macro_rules! oid {
    ($($arc:expr),+ $(,)?) => {
        $crate::Oid::new(vec![$($arc),+])
    };
}
