//! Authorization: may this user perform this action on these documents?
//!
//! Services consult a [`PermissionOracle`] after their writes and before
//! committing, so the oracle always sees documents in their updated state.

use std::collections::BTreeSet;
use std::fmt;

use crate::model::{App, Controller, Group, QueryTemplate, Resource, Screen};
use crate::service::ApiError;

/// The kind of document an action applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Apps,
    Groups,
    Screens,
    Controllers,
    QueryTemplates,
    Resources,
}

impl Scope {
    fn as_str(self) -> &'static str {
        match self {
            Self::Apps => "apps",
            Self::Groups => "groups",
            Self::Screens => "screens",
            Self::Controllers => "controllers",
            Self::QueryTemplates => "queryTemplates",
            Self::Resources => "resources",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Create,
    View,
    List,
    Update,
    Delete,
}

impl Verb {
    fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::View => "view",
            Self::List => "list",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// A named permission, displayed as `appBuilder.<scope>.<verb>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Action {
    pub scope: Scope,
    pub verb: Verb,
}

impl Action {
    pub const fn new(scope: Scope, verb: Verb) -> Self {
        Self { scope, verb }
    }

    fn is_read(self) -> bool {
        matches!(self.verb, Verb::View | Verb::List)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "appBuilder.{}.{}", self.scope.as_str(), self.verb.as_str())
    }
}

/// A document an action touches.
#[derive(Debug, Clone, Copy)]
pub enum Subject<'a> {
    App(&'a App),
    Group(&'a Group),
    Screen(&'a Screen),
    Controller(&'a Controller),
    QueryTemplate(&'a QueryTemplate),
    Resource(&'a Resource),
}

impl Subject<'_> {
    pub fn creator(&self) -> &str {
        match self {
            Self::App(a) => &a.creator,
            Self::Group(g) => &g.creator,
            Self::Screen(s) => &s.creator,
            Self::Controller(c) => &c.creator,
            Self::QueryTemplate(q) => &q.creator,
            Self::Resource(r) => &r.creator,
        }
    }
}

/// Decides whether `user` may perform `action` on `subjects`.
///
/// Returns [`ApiError::Authorization`] to deny.
pub trait PermissionOracle {
    fn check(&self, user: &str, action: Action, subjects: &[Subject<'_>]) -> Result<(), ApiError>;
}

/// Administrators may do anything. Everyone else may act only on documents
/// they created. Groups and resources are shared: anyone may view or list
/// them.
#[derive(Debug, Clone, Default)]
pub struct OwnerPolicy {
    admins: BTreeSet<String>,
}

impl OwnerPolicy {
    pub fn new(admins: impl IntoIterator<Item = String>) -> Self {
        Self {
            admins: admins.into_iter().collect(),
        }
    }
}

impl PermissionOracle for OwnerPolicy {
    fn check(&self, user: &str, action: Action, subjects: &[Subject<'_>]) -> Result<(), ApiError> {
        if self.admins.contains(user) {
            return Ok(());
        }
        if action.is_read() && matches!(action.scope, Scope::Groups | Scope::Resources) {
            return Ok(());
        }
        if let Some(subject) = subjects.iter().find(|s| s.creator() != user) {
            tracing::debug!(%action, user, owner = subject.creator(), "permission denied");
            return Err(ApiError::Authorization(format!(
                "{user} is not allowed to perform {action}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use jiff::Timestamp;
    use uuid::Uuid;

    use super::*;
    use crate::model::Status;

    fn group(creator: &str) -> Group {
        Group {
            id: Uuid::new_v4(),
            name: "staff".into(),
            description: String::new(),
            status: Status::Created,
            creator: creator.into(),
            created_at: Timestamp::UNIX_EPOCH,
            updated_at: Timestamp::UNIX_EPOCH,
        }
    }

    #[test]
    fn action_names() {
        let action = Action::new(Scope::QueryTemplates, Verb::Delete);
        assert_eq!(action.to_string(), "appBuilder.queryTemplates.delete");
    }

    #[test]
    fn owner_may_act() {
        let policy = OwnerPolicy::default();
        let g = group("u1");
        let action = Action::new(Scope::Groups, Verb::Update);
        assert!(policy.check("u1", action, &[Subject::Group(&g)]).is_ok());
    }

    #[test]
    fn stranger_is_denied_writes() {
        let policy = OwnerPolicy::default();
        let g = group("u1");
        let action = Action::new(Scope::Groups, Verb::Update);
        let err = policy.check("u2", action, &[Subject::Group(&g)]).unwrap_err();
        assert_eq!(err.code(), "FORBIDDEN_ERROR");
    }

    #[test]
    fn shared_scopes_are_readable() {
        let policy = OwnerPolicy::default();
        let g = group("u1");
        let action = Action::new(Scope::Groups, Verb::View);
        assert!(policy.check("u2", action, &[Subject::Group(&g)]).is_ok());
    }

    #[test]
    fn admins_may_do_anything() {
        let policy = OwnerPolicy::new(["root".to_string()]);
        let g = group("u1");
        let action = Action::new(Scope::Groups, Verb::Delete);
        assert!(policy.check("root", action, &[Subject::Group(&g)]).is_ok());
    }
}
