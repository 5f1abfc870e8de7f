use std::fmt;

use uuid::Uuid;

use crate::object::Object;

/// A scalar value for scope filtering.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ScopeValue {
    /// UUID value (owner, organization and resource ids).
    Uuid(Uuid),
    /// String value.
    String(String),
}

impl ScopeValue {
    /// Try to extract a UUID from this value.
    ///
    /// Returns `Some` for `ScopeValue::Uuid` directly, and for
    /// `ScopeValue::String` if the string is a valid UUID.
    #[must_use]
    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            Self::Uuid(u) => Some(*u),
            Self::String(s) => Uuid::parse_str(s).ok(),
        }
    }
}

impl fmt::Display for ScopeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uuid(u) => write!(f, "{u}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<Uuid> for ScopeValue {
    #[inline]
    fn from(u: Uuid) -> Self {
        Self::Uuid(u)
    }
}

impl From<&str> for ScopeValue {
    #[inline]
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

/// Well-known object property names.
pub mod pep_properties {
    /// Resource identity.
    pub const RESOURCE_ID: &str = "id";

    /// Owning user.
    pub const OWNER_ID: &str = "owner_id";

    /// Owning organization.
    pub const ORG_ID: &str = "org_id";
}

/// A single scope filter: a typed predicate on a named object property.
///
/// A filter on a property the object does not carry never matches.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScopeFilter {
    /// Equality: `property = value`.
    Eq(EqScopeFilter),
    /// Set membership: `property IN (values)`.
    In(InScopeFilter),
}

/// Equality scope filter: `property = value`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EqScopeFilter {
    property: String,
    value: ScopeValue,
}

/// Set membership scope filter: `property IN (values)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InScopeFilter {
    property: String,
    values: Vec<ScopeValue>,
}

impl EqScopeFilter {
    #[must_use]
    pub fn new(property: impl Into<String>, value: impl Into<ScopeValue>) -> Self {
        Self {
            property: property.into(),
            value: value.into(),
        }
    }

    #[inline]
    #[must_use]
    pub fn property(&self) -> &str {
        &self.property
    }

    #[inline]
    #[must_use]
    pub fn value(&self) -> &ScopeValue {
        &self.value
    }
}

impl InScopeFilter {
    #[must_use]
    pub fn new(property: impl Into<String>, values: Vec<ScopeValue>) -> Self {
        Self {
            property: property.into(),
            values,
        }
    }

    #[inline]
    #[must_use]
    pub fn property(&self) -> &str {
        &self.property
    }

    #[inline]
    #[must_use]
    pub fn values(&self) -> &[ScopeValue] {
        &self.values
    }
}

impl ScopeFilter {
    /// Create an equality filter (`property = value`).
    #[must_use]
    pub fn eq(property: impl Into<String>, value: impl Into<ScopeValue>) -> Self {
        Self::Eq(EqScopeFilter::new(property, value))
    }

    /// Create a set membership filter from UUID values.
    #[must_use]
    pub fn in_uuids(property: impl Into<String>, uuids: impl IntoIterator<Item = Uuid>) -> Self {
        Self::In(InScopeFilter::new(
            property,
            uuids.into_iter().map(ScopeValue::Uuid).collect(),
        ))
    }

    #[must_use]
    pub fn property(&self) -> &str {
        match self {
            Self::Eq(f) => f.property(),
            Self::In(f) => f.property(),
        }
    }

    /// Evaluate the filter against an object's properties.
    #[must_use]
    pub fn matches(&self, object: &Object) -> bool {
        let Some(actual) = object.property(self.property()) else {
            return false;
        };
        match self {
            Self::Eq(f) => f.value == actual,
            Self::In(f) => f.values.contains(&actual),
        }
    }
}

/// A conjunction (AND) of scope filters: one access path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScopeConstraint {
    filters: Vec<ScopeFilter>,
}

impl ScopeConstraint {
    #[must_use]
    pub fn new(filters: Vec<ScopeFilter>) -> Self {
        Self { filters }
    }

    #[inline]
    #[must_use]
    pub fn filters(&self) -> &[ScopeFilter] {
        &self.filters
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// All filters match. An empty constraint matches every object.
    #[must_use]
    pub fn matches(&self, object: &Object) -> bool {
        self.filters.iter().all(|f| f.matches(object))
    }

    fn and(&self, other: &Self) -> Self {
        let mut filters = self.filters.clone();
        filters.extend(other.filters.iter().cloned());
        Self { filters }
    }
}

/// A disjunction (OR) of scope constraints defining which objects are accessible.
///
/// Produced by the policy engine for list operations and evaluated in
/// memory against each candidate row.
///
/// # Examples
///
/// ```
/// use fleet_security::access_scope::{AccessScope, ScopeConstraint, ScopeFilter, pep_properties};
/// use fleet_security::resources;
/// use uuid::Uuid;
///
/// let me = Uuid::new_v4();
/// let scope = AccessScope::single(ScopeConstraint::new(vec![
///     ScopeFilter::eq(pep_properties::OWNER_ID, me),
/// ]));
///
/// assert!(scope.matches(&resources::WORKSPACE.with_owner(me)));
/// assert!(!scope.matches(&resources::WORKSPACE.with_owner(Uuid::new_v4())));
/// assert!(AccessScope::deny_all().is_deny_all());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessScope {
    constraints: Vec<ScopeConstraint>,
    unconstrained: bool,
}

impl Default for AccessScope {
    /// Default is deny-all: no constraints and not unconstrained.
    fn default() -> Self {
        Self::deny_all()
    }
}

impl AccessScope {
    // ── Constructors ────────────────────────────────────────────────

    /// Create an access scope from a list of constraints (OR-ed).
    #[must_use]
    pub fn from_constraints(constraints: Vec<ScopeConstraint>) -> Self {
        Self {
            constraints,
            unconstrained: false,
        }
    }

    #[must_use]
    pub fn single(constraint: ScopeConstraint) -> Self {
        Self::from_constraints(vec![constraint])
    }

    /// Unconstrained scope: every object of the requested type matches.
    #[must_use]
    pub fn allow_all() -> Self {
        Self {
            constraints: Vec::new(),
            unconstrained: true,
        }
    }

    /// Nothing matches.
    #[must_use]
    pub fn deny_all() -> Self {
        Self {
            constraints: Vec::new(),
            unconstrained: false,
        }
    }

    // ── Accessors ───────────────────────────────────────────────────

    #[must_use]
    pub fn constraints(&self) -> &[ScopeConstraint] {
        &self.constraints
    }

    #[must_use]
    pub fn is_unconstrained(&self) -> bool {
        self.unconstrained
    }

    #[must_use]
    pub fn is_deny_all(&self) -> bool {
        !self.unconstrained && self.constraints.is_empty()
    }

    // ── Combinators ─────────────────────────────────────────────────

    /// Objects accessible through either scope.
    #[must_use]
    pub fn union(mut self, other: Self) -> Self {
        if self.unconstrained || other.unconstrained {
            return Self::allow_all();
        }
        self.constraints.extend(other.constraints);
        self
    }

    /// Objects accessible through both scopes.
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Self {
        if self.unconstrained {
            return other.clone();
        }
        if other.unconstrained {
            return self.clone();
        }
        let constraints = self
            .constraints
            .iter()
            .flat_map(|a| other.constraints.iter().map(move |b| a.and(b)))
            .collect();
        Self::from_constraints(constraints)
    }

    // ── Evaluation ──────────────────────────────────────────────────

    #[must_use]
    pub fn matches(&self, object: &Object) -> bool {
        self.unconstrained || self.constraints.iter().any(|c| c.matches(object))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::object::resources;

    fn owner_scope(owner: Uuid) -> AccessScope {
        AccessScope::single(ScopeConstraint::new(vec![ScopeFilter::eq(
            pep_properties::OWNER_ID,
            owner,
        )]))
    }

    fn org_scope(org: Uuid) -> AccessScope {
        AccessScope::single(ScopeConstraint::new(vec![ScopeFilter::in_uuids(
            pep_properties::ORG_ID,
            [org],
        )]))
    }

    #[test]
    fn default_is_deny_all() {
        let scope = AccessScope::default();
        assert!(scope.is_deny_all());
        assert!(!scope.matches(&resources::USER.object()));
    }

    #[test]
    fn allow_all_matches_anything() {
        let scope = AccessScope::allow_all();
        assert!(scope.is_unconstrained());
        assert!(scope.matches(&resources::USER.object()));
    }

    #[test]
    fn missing_property_never_matches() {
        let scope = owner_scope(Uuid::new_v4());
        assert!(!scope.matches(&resources::GROUP.in_org(Uuid::new_v4())));
    }

    #[test]
    fn constraints_are_or_filters_are_and() {
        let owner = Uuid::new_v4();
        let org = Uuid::new_v4();
        let both = AccessScope::single(ScopeConstraint::new(vec![
            ScopeFilter::eq(pep_properties::OWNER_ID, owner),
            ScopeFilter::eq(pep_properties::ORG_ID, org),
        ]));

        assert!(both.matches(&resources::WORKSPACE.with_owner(owner).in_org(org)));
        assert!(!both.matches(&resources::WORKSPACE.with_owner(owner)));

        let either = owner_scope(owner).union(org_scope(org));
        assert!(either.matches(&resources::WORKSPACE.with_owner(owner)));
        assert!(either.matches(&resources::WORKSPACE.in_org(org)));
        assert!(!either.matches(&resources::WORKSPACE.in_org(Uuid::new_v4())));
    }

    #[test]
    fn union_with_allow_all_is_allow_all() {
        let scope = owner_scope(Uuid::new_v4()).union(AccessScope::allow_all());
        assert!(scope.is_unconstrained());
    }

    #[test]
    fn intersect_narrows() {
        let owner = Uuid::new_v4();
        let org = Uuid::new_v4();
        let scope = owner_scope(owner).intersect(&org_scope(org));

        assert_eq!(scope.constraints().len(), 1);
        assert!(scope.matches(&resources::WORKSPACE.with_owner(owner).in_org(org)));
        assert!(!scope.matches(&resources::WORKSPACE.with_owner(owner)));
    }

    #[test]
    fn intersect_identities() {
        let owner = owner_scope(Uuid::new_v4());

        assert_eq!(AccessScope::allow_all().intersect(&owner), owner);
        assert_eq!(owner.intersect(&AccessScope::allow_all()), owner);
        assert!(owner.intersect(&AccessScope::deny_all()).is_deny_all());
    }

    #[test]
    fn string_values_parse_as_uuid() {
        let id = Uuid::new_v4();
        assert_eq!(ScopeValue::from(id.to_string().as_str()).as_uuid(), Some(id));
        assert_eq!(ScopeValue::from("nope").as_uuid(), None);
    }
}
