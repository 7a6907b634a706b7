//! Group membership synchronization.
//!
//! Reconciles the global user [`Directory`] with a group's [`Roster`] and
//! applies membership changes optimistically.
//!
//! # Consistency policy
//!
//! An add is applied to the local roster as soon as it is proposed and tracked
//! as pending until the server speaks:
//!
//! - A confirmation finalizes the pending add.
//! - An explicit rejection reverts it. A rejection that does not name a user
//!   reverts the oldest pending add; the server handles commands in order.
//! - A pending add older than the confirmation timeout is reported by
//!   [`MembershipSync::expire`] and stays in the roster. The caller refetches
//!   the roster, which is authoritative.
//! - Any roster fetch replaces the roster wholesale and forgets every pending
//!   add.

use std::{
    collections::{BTreeMap, BTreeSet, VecDeque},
    ops::Sub,
    time::Duration,
};

use parley_proto::UserId;

use crate::{conversation::User, error::ClientError};

/// Set of known users keyed by identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directory {
    users: BTreeMap<UserId, User>,
}

impl Directory {
    /// Empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// User with the given id.
    pub fn get(&self, user_id: UserId) -> Option<&User> {
        self.users.get(&user_id)
    }

    /// User with the given username.
    pub fn find_by_username(&self, username: &str) -> Option<&User> {
        self.users.values().find(|u| u.username == username)
    }

    /// Users ordered by id.
    pub fn iter(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    /// Ids ordered ascending.
    pub fn ids(&self) -> impl Iterator<Item = UserId> + '_ {
        self.users.keys().copied()
    }

    /// Number of users.
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Directory is empty.
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl FromIterator<User> for Directory {
    fn from_iter<T: IntoIterator<Item = User>>(iter: T) -> Self {
        Self { users: iter.into_iter().map(|u| (u.id, u)).collect() }
    }
}

/// Member identities of a group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    members: BTreeSet<UserId>,
}

impl Roster {
    /// Empty roster.
    pub fn new() -> Self {
        Self::default()
    }

    /// `user_id` is a member.
    pub fn contains(&self, user_id: UserId) -> bool {
        self.members.contains(&user_id)
    }

    /// Member ids ordered ascending.
    pub fn iter(&self) -> impl Iterator<Item = UserId> + '_ {
        self.members.iter().copied()
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Roster is empty.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    fn insert(&mut self, user_id: UserId) -> bool {
        self.members.insert(user_id)
    }

    fn remove(&mut self, user_id: UserId) -> bool {
        self.members.remove(&user_id)
    }
}

impl FromIterator<UserId> for Roster {
    fn from_iter<T: IntoIterator<Item = UserId>>(iter: T) -> Self {
        Self { members: iter.into_iter().collect() }
    }
}

/// Users in `directory` that are not in `roster`, by identity.
pub fn compute_addable(directory: &Directory, roster: &Roster) -> Directory {
    directory.iter().filter(|u| !roster.contains(u.id)).cloned().collect()
}

/// What a confirmation changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    /// Finalized one of our pending adds.
    Finalized,
    /// Someone else added the user; roster updated.
    RemoteAdd,
    /// User was already a confirmed member; nothing changed.
    Unchanged,
}

#[derive(Debug, Clone, Copy)]
struct PendingAdd<I> {
    user_id: UserId,
    issued_at: I,
}

/// Directory/roster reconciliation with optimistic adds.
///
/// Generic over `I` (Instant type) so confirmation timeouts run on real or
/// virtual time.
#[derive(Debug, Clone)]
pub struct MembershipSync<I> {
    directory: Directory,
    roster: Roster,
    /// Unconfirmed adds, oldest first.
    pending: VecDeque<PendingAdd<I>>,
    confirmation_timeout: Duration,
}

impl<I> MembershipSync<I>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    /// Empty state with the given confirmation window.
    pub fn new(confirmation_timeout: Duration) -> Self {
        Self {
            directory: Directory::new(),
            roster: Roster::new(),
            pending: VecDeque::new(),
            confirmation_timeout,
        }
    }

    /// Full directory.
    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    /// Current roster, including unconfirmed adds.
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Users that can still be added.
    pub fn addable(&self) -> Directory {
        compute_addable(&self.directory, &self.roster)
    }

    /// `user_id` has an unconfirmed add.
    pub fn is_pending(&self, user_id: UserId) -> bool {
        self.pending.iter().any(|p| p.user_id == user_id)
    }

    /// Number of unconfirmed adds.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Replace the directory with a fetched one.
    pub fn apply_directory(&mut self, users: impl IntoIterator<Item = User>) {
        self.directory = users.into_iter().collect();
    }

    /// Replace the roster with a fetched one, dropping all pending adds.
    pub fn apply_roster(&mut self, members: impl IntoIterator<Item = UserId>) {
        self.roster = members.into_iter().collect();
        self.pending.clear();
    }

    /// Optimistically add `user_id`.
    ///
    /// The roster and addable view change immediately; the add stays pending
    /// until [`Self::confirm`], [`Self::reject`], [`Self::expire`] or the next
    /// roster fetch.
    pub fn propose_add(&mut self, user_id: UserId, now: I) -> Result<User, ClientError> {
        let user = self.directory.get(user_id).cloned().ok_or(ClientError::UnknownUser { user_id })?;

        if !self.roster.insert(user_id) {
            return Err(ClientError::AlreadyMember { user_id });
        }

        self.pending.push_back(PendingAdd { user_id, issued_at: now });
        Ok(user)
    }

    /// Server reported `user_id` joined.
    pub fn confirm(&mut self, user_id: UserId) -> Confirmation {
        if let Some(index) = self.pending.iter().position(|p| p.user_id == user_id) {
            self.pending.remove(index);
            return Confirmation::Finalized;
        }

        if self.roster.insert(user_id) { Confirmation::RemoteAdd } else { Confirmation::Unchanged }
    }

    /// Server refused an add. Returns the reverted user, if any was pending.
    pub fn reject(&mut self, user_id: Option<UserId>) -> Option<UserId> {
        let index = match user_id {
            Some(user_id) => self.pending.iter().position(|p| p.user_id == user_id)?,
            None => {
                if self.pending.is_empty() {
                    return None;
                }
                0
            },
        };

        let pending = self.pending.remove(index)?;
        self.roster.remove(pending.user_id);
        Some(pending.user_id)
    }

    /// Drop pending adds older than the confirmation window.
    ///
    /// Expired users stay in the roster; the returned ids are the adds the
    /// caller should report and reconcile.
    pub fn expire(&mut self, now: I) -> Vec<UserId> {
        let timeout = self.confirmation_timeout;
        let mut expired = Vec::new();

        self.pending.retain(|p| {
            let keep = now - p.issued_at < timeout;
            if !keep {
                expired.push(p.user_id);
            }
            keep
        });

        expired
    }

    /// Forget everything (conversation change).
    pub fn clear(&mut self) {
        self.directory = Directory::new();
        self.roster = Roster::new();
        self.pending.clear();
    }
}
