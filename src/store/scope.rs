//! OID range scopes.

use crate::oid::Oid;

/// A half-open-by-convention OID interval with explicit inclusion flags.
///
/// Managed-object subtrees use `[root, root.next_peer())`; GETNEXT queries
/// use `(start, ∞)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoScope {
    lower: Oid,
    lower_included: bool,
    upper: Option<Oid>,
    upper_included: bool,
}

impl MoScope {
    /// The subtree scope of a root: `[root, root.next_peer())`.
    pub fn subtree(root: &Oid) -> Self {
        Self {
            lower: root.clone(),
            lower_included: true,
            upper: Some(root.next_peer()),
            upper_included: false,
        }
    }

    /// A degenerate scope covering exactly one OID.
    pub fn single(oid: &Oid) -> Self {
        Self {
            lower: oid.clone(),
            lower_included: true,
            upper: Some(oid.clone()),
            upper_included: true,
        }
    }

    /// An unbounded scope starting at `lower`.
    pub fn from_lower(lower: Oid, included: bool) -> Self {
        Self {
            lower,
            lower_included: included,
            upper: None,
            upper_included: false,
        }
    }

    /// An explicit interval.
    pub fn range(lower: Oid, lower_included: bool, upper: Oid, upper_included: bool) -> Self {
        Self {
            lower,
            lower_included,
            upper: Some(upper),
            upper_included,
        }
    }

    pub fn lower(&self) -> &Oid {
        &self.lower
    }

    pub fn is_lower_included(&self) -> bool {
        self.lower_included
    }

    pub fn upper(&self) -> Option<&Oid> {
        self.upper.as_ref()
    }

    pub fn is_upper_included(&self) -> bool {
        self.upper_included
    }

    /// Whether the OID lies within this scope.
    pub fn covers(&self, oid: &Oid) -> bool {
        let above_lower = match oid.cmp(&self.lower) {
            std::cmp::Ordering::Greater => true,
            std::cmp::Ordering::Equal => self.lower_included,
            std::cmp::Ordering::Less => false,
        };
        if !above_lower {
            return false;
        }
        match &self.upper {
            None => true,
            Some(upper) => match oid.cmp(upper) {
                std::cmp::Ordering::Less => true,
                std::cmp::Ordering::Equal => self.upper_included,
                std::cmp::Ordering::Greater => false,
            },
        }
    }

    /// Whether two scopes share at least one OID.
    pub fn intersects(&self, other: &MoScope) -> bool {
        lower_below_upper(
            &self.lower,
            self.lower_included,
            other.upper.as_ref(),
            other.upper_included,
        ) && lower_below_upper(
            &other.lower,
            other.lower_included,
            self.upper.as_ref(),
            self.upper_included,
        )
    }
}

/// Whether a lower bound admits values below the given upper bound.
fn lower_below_upper(
    lower: &Oid,
    lower_included: bool,
    upper: Option<&Oid>,
    upper_included: bool,
) -> bool {
    match upper {
        None => true,
        Some(upper) => match lower.cmp(upper) {
            std::cmp::Ordering::Less => true,
            std::cmp::Ordering::Equal => lower_included && upper_included,
            std::cmp::Ordering::Greater => false,
        },
    }
}
