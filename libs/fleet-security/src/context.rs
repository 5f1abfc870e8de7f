use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::bypass::{SystemBypass, SystemCaller};

/// Capability restriction narrowing what a [`Subject`] may do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scope {
    /// No restriction beyond the subject's roles.
    #[default]
    All,
    /// Limited to one workspace and read access to its owner.
    WorkspaceAgent { workspace_id: Uuid, owner_id: Uuid },
}

impl Scope {
    #[must_use]
    pub fn workspace_agent(workspace_id: Uuid, owner_id: Uuid) -> Self {
        Self::WorkspaceAgent {
            workspace_id,
            owner_id,
        }
    }

    #[must_use]
    pub fn is_restricted(&self) -> bool {
        !matches!(self, Self::All)
    }
}

/// The authenticated actor attempting an operation.
///
/// Immutable once built and lives for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    id: Uuid,
    roles: BTreeSet<String>,
    groups: BTreeSet<Uuid>,
    #[serde(default)]
    scope: Scope,
}

impl Subject {
    #[must_use]
    pub fn builder(id: Uuid) -> SubjectBuilder {
        SubjectBuilder {
            id,
            roles: BTreeSet::new(),
            groups: BTreeSet::new(),
            scope: Scope::All,
        }
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn roles(&self) -> &BTreeSet<String> {
        &self.roles
    }

    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    #[must_use]
    pub fn groups(&self) -> &BTreeSet<Uuid> {
        &self.groups
    }

    #[must_use]
    pub fn scope(&self) -> Scope {
        self.scope
    }
}

pub struct SubjectBuilder {
    id: Uuid,
    roles: BTreeSet<String>,
    groups: BTreeSet<Uuid>,
    scope: Scope,
}

impl SubjectBuilder {
    #[must_use]
    pub fn roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.roles.insert(role.into());
        self
    }

    #[must_use]
    pub fn groups(mut self, groups: impl IntoIterator<Item = Uuid>) -> Self {
        self.groups = groups.into_iter().collect();
        self
    }

    #[must_use]
    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    #[must_use]
    pub fn build(self) -> Subject {
        Subject {
            id: self.id,
            roles: self.roles,
            groups: self.groups,
            scope: self.scope,
        }
    }
}

/// Who is acting on behalf of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    Subject(Subject),
    System(SystemBypass),
}

/// Errors raised when reading a [`RequestContext`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    /// The context was never given an actor. Always a programming error.
    #[error("request context carries no actor")]
    MissingActor,

    #[error("request cancelled")]
    Cancelled,

    #[error("request deadline exceeded")]
    DeadlineExceeded,
}

/// Request-scoped authorization context.
///
/// Holds exactly one actor (a [`Subject`] or a [`SystemBypass`]) next to the
/// request's cancellation token and deadline. Passed explicitly to every
/// store call; never stored in process-wide state. Deriving a context with a
/// different actor produces a new value and leaves the original untouched.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    actor: Option<Arc<Actor>>,
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl RequestContext {
    /// A context with no actor. Reading the actor fails until one is attached.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tie the context to an externally owned cancellation token.
    #[must_use]
    pub fn with_cancellation(cancel: CancellationToken) -> Self {
        Self {
            actor: None,
            cancel,
            deadline: None,
        }
    }

    #[must_use]
    pub fn deadline(mut self, at: Instant) -> Self {
        self.deadline = Some(at);
        self
    }

    /// Derive a context acting as `subject`, keeping cancellation and deadline.
    #[must_use]
    pub fn with_subject(&self, subject: Subject) -> Self {
        self.with_actor(Actor::Subject(subject))
    }

    /// Derive a context acting as a trusted internal caller.
    #[must_use]
    pub fn as_system(&self, caller: SystemCaller) -> Self {
        self.with_actor(Actor::System(SystemBypass::for_caller(caller)))
    }

    fn with_actor(&self, actor: Actor) -> Self {
        Self {
            actor: Some(Arc::new(actor)),
            cancel: self.cancel.clone(),
            deadline: self.deadline,
        }
    }

    /// The acting identity.
    ///
    /// # Errors
    ///
    /// [`ContextError::MissingActor`] if no actor was ever attached.
    pub fn actor(&self) -> Result<&Actor, ContextError> {
        self.actor.as_deref().ok_or(ContextError::MissingActor)
    }

    #[must_use]
    pub fn subject(&self) -> Option<&Subject> {
        match self.actor.as_deref() {
            Some(Actor::Subject(s)) => Some(s),
            Some(Actor::System(_)) | None => None,
        }
    }

    #[must_use]
    pub fn is_system(&self) -> bool {
        matches!(self.actor.as_deref(), Some(Actor::System(_)))
    }

    #[must_use]
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Fail if the request was cancelled or ran past its deadline.
    ///
    /// # Errors
    ///
    /// [`ContextError::Cancelled`] or [`ContextError::DeadlineExceeded`].
    pub fn ensure_live(&self) -> Result<(), ContextError> {
        if self.cancel.is_cancelled() {
            return Err(ContextError::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(ContextError::DeadlineExceeded);
        }
        Ok(())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::time::Duration;

    use super::*;

    fn subject() -> Subject {
        Subject::builder(Uuid::parse_str("550e8400-e29b-41d4-a716-446655440001").unwrap())
            .roles(["member"])
            .groups([Uuid::nil()])
            .build()
    }

    #[test]
    fn builder_defaults_to_unrestricted_scope() {
        let s = subject();
        assert_eq!(s.scope(), Scope::All);
        assert!(s.has_role("member"));
        assert!(!s.has_role("owner"));
        assert!(s.groups().contains(&Uuid::nil()));
    }

    #[test]
    fn workspace_agent_scope_is_restricted() {
        let scope = Scope::workspace_agent(Uuid::new_v4(), Uuid::new_v4());
        assert!(scope.is_restricted());
        assert!(!Scope::All.is_restricted());
    }

    #[test]
    fn unset_actor_fails_loudly() {
        let ctx = RequestContext::new();
        assert_eq!(ctx.actor().unwrap_err(), ContextError::MissingActor);
        assert!(ctx.subject().is_none());
        assert!(!ctx.is_system());
    }

    #[test]
    fn deriving_leaves_original_untouched() {
        let base = RequestContext::new();
        let user = base.with_subject(subject());
        let system = base.as_system(SystemCaller::BackgroundJob);

        assert!(base.actor().is_err());
        assert_eq!(user.subject(), Some(&subject()));
        assert!(system.is_system());
        assert!(system.subject().is_none());
    }

    #[test]
    fn derived_contexts_share_cancellation() {
        let token = CancellationToken::new();
        let base = RequestContext::with_cancellation(token.clone());
        let user = base.with_subject(subject());

        assert!(user.ensure_live().is_ok());
        token.cancel();
        assert_eq!(user.ensure_live(), Err(ContextError::Cancelled));
    }

    #[test]
    fn past_deadline_is_not_live() {
        let ctx = RequestContext::new()
            .deadline(Instant::now().checked_sub(Duration::from_secs(1)).unwrap());
        assert_eq!(ctx.ensure_live(), Err(ContextError::DeadlineExceeded));

        let ctx = RequestContext::new().deadline(Instant::now() + Duration::from_secs(60));
        assert!(ctx.ensure_live().is_ok());
    }

    #[test]
    fn subject_serde_round_trip_keeps_scope() {
        let s = Subject::builder(Uuid::new_v4())
            .scope(Scope::workspace_agent(Uuid::new_v4(), Uuid::new_v4()))
            .build();
        let json = serde_json::to_string(&s).unwrap();
        let back: Subject = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }
}
