//! Role-scoped data visibility
//!
//! Every read path in the system (visit lists, coverage lists, summaries,
//! beat plans) narrows its results through one function: [`resolve_mr_scope`].
//! Keeping the rules in a single place means list endpoints and aggregate
//! endpoints can never drift apart in what they expose.
//!
//! The rules:
//!
//! - **Owner** sees everything; an explicit MR filter passes through.
//! - **Manager** sees the MRs reporting to them; asking for an MR outside
//!   that set is an authorization error.
//! - **MR** sees only themselves; a supplied MR filter is ignored and
//!   overridden, never honored and never an error.

use core_kernel::UserId;

use crate::error::DirectoryError;
use crate::ports::{DirectoryPort, UserQuery};
use crate::user::Role;

/// The authenticated caller on whose behalf an operation runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn is_owner(&self) -> bool {
        self.role == Role::Owner
    }

    pub fn is_manager(&self) -> bool {
        self.role == Role::Manager
    }

    pub fn is_mr(&self) -> bool {
        self.role == Role::Mr
    }
}

/// The MR set a query is allowed to touch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeFilter {
    /// No restriction; the query sees all MRs
    Unrestricted,
    /// Restricted to exactly these MR ids (possibly empty)
    MrIds(Vec<UserId>),
}

impl ScopeFilter {
    /// True if the given MR falls inside this scope
    pub fn permits(&self, mr_id: UserId) -> bool {
        match self {
            ScopeFilter::Unrestricted => true,
            ScopeFilter::MrIds(ids) => ids.contains(&mr_id),
        }
    }

    /// The explicit MR id set, or None when unrestricted
    pub fn mr_ids(&self) -> Option<&[UserId]> {
        match self {
            ScopeFilter::Unrestricted => None,
            ScopeFilter::MrIds(ids) => Some(ids),
        }
    }

    /// True if this scope can never match any row
    pub fn is_empty(&self) -> bool {
        matches!(self, ScopeFilter::MrIds(ids) if ids.is_empty())
    }
}

/// Resolves which MRs' data the actor may query.
///
/// `requested_mr` is the optional MR filter supplied by the client. The
/// resolved scope both enforces visibility and applies the filter, so
/// callers pass the result straight into their storage queries.
///
/// # Errors
///
/// Returns `DirectoryError::NotAuthorized` when a manager explicitly
/// requests an MR outside their team.
pub async fn resolve_mr_scope(
    directory: &dyn DirectoryPort,
    actor: &Actor,
    requested_mr: Option<UserId>,
) -> Result<ScopeFilter, DirectoryError> {
    match actor.role {
        Role::Owner => Ok(match requested_mr {
            Some(mr_id) => ScopeFilter::MrIds(vec![mr_id]),
            None => ScopeFilter::Unrestricted,
        }),
        Role::Manager => {
            let team = directory.find_users(UserQuery::mrs_of(actor.user_id)).await?;
            let team_ids: Vec<UserId> = team.into_iter().map(|u| u.id).collect();
            match requested_mr {
                Some(mr_id) if team_ids.contains(&mr_id) => Ok(ScopeFilter::MrIds(vec![mr_id])),
                Some(mr_id) => Err(DirectoryError::NotAuthorized(format!(
                    "MR {} is not in your team",
                    mr_id
                ))),
                None => Ok(ScopeFilter::MrIds(team_ids)),
            }
        }
        // A supplied filter is overridden, not rejected, so shared dashboard
        // links still work when an MR opens them.
        Role::Mr => Ok(ScopeFilter::MrIds(vec![actor.user_id])),
    }
}
