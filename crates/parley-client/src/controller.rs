//! Conversation session controller.
//!
//! The `ConversationController` owns the one active conversation: its channel,
//! its message log and (for groups) its membership view. It performs no I/O.
//! Every input arrives as a [`ControllerEvent`] and every side effect leaves as
//! a [`ControllerAction`], so the caller decides how channels are opened and
//! how fetches run.
//!
//! At most one channel is live at a time. Each activation allocates a fresh
//! [`ChannelId`]; transport callbacks and fetch results carrying any other id
//! are discarded, which keeps a slow connection from a previous conversation
//! out of the current log.

use std::{
    ops::Sub,
    time::{Duration, Instant},
};

use parley_proto::{ChatId, HistoryContext, InboundFrame, MembershipEvent, UserId, WireMessage};

use crate::{
    channel::{ChannelEvent, ChannelId, ChannelState},
    codec,
    config::ClientConfig,
    conversation::{ClientIdentity, Conversation, Group, User},
    credentials::{CredentialProvider, Credentials},
    error::ClientError,
    event::{ControllerAction, ControllerEvent},
    membership::{Confirmation, MembershipSync},
    store::{Message, MessageLog},
};

/// The active conversation and its channel.
#[derive(Debug)]
struct Session {
    conversation: Conversation,
    channel: ChannelId,
    state: ChannelState,
    /// Server-assigned id of a direct chat, learned from its history.
    chat_id: Option<ChatId>,
    /// Transport may still deliver events for `channel`.
    attached: bool,
}

/// Sans-IO session manager for one active conversation.
///
/// Generic over the credential source `P` and the instant type `I` used for
/// membership confirmation timeouts.
pub struct ConversationController<P, I = Instant> {
    config: ClientConfig,
    identity: ClientIdentity,
    credentials: P,
    next_channel: u64,
    session: Option<Session>,
    log: MessageLog,
    membership: MembershipSync<I>,
}

impl<P, I> ConversationController<P, I>
where
    P: CredentialProvider,
    I: Copy + Ord + Sub<Output = Duration>,
{
    /// Create an idle controller for `identity`.
    pub fn new(config: ClientConfig, identity: ClientIdentity, credentials: P) -> Self {
        let membership = MembershipSync::new(config.membership_confirmation_timeout);
        Self {
            config,
            identity,
            credentials,
            next_channel: 0,
            session: None,
            log: MessageLog::new(),
            membership,
        }
    }

    /// Local user.
    pub fn identity(&self) -> &ClientIdentity {
        &self.identity
    }

    /// Session configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Credential source.
    pub fn credentials(&self) -> &P {
        &self.credentials
    }

    /// Current channel state. `Closed` when nothing is active.
    pub fn state(&self) -> ChannelState {
        self.session.as_ref().map_or(ChannelState::Closed, |s| s.state)
    }

    /// Active conversation, if any.
    pub fn conversation(&self) -> Option<&Conversation> {
        self.session.as_ref().map(|s| &s.conversation)
    }

    /// Channel of the active conversation.
    pub fn channel(&self) -> Option<ChannelId> {
        self.session.as_ref().map(|s| s.channel)
    }

    /// Chat id of the active direct conversation, once history has arrived.
    pub fn chat_id(&self) -> Option<ChatId> {
        self.session.as_ref().and_then(|s| s.chat_id.clone())
    }

    /// Messages of the active conversation, in order.
    pub fn messages(&self) -> &[Message] {
        self.log.snapshot()
    }

    /// Message log of the active conversation.
    pub fn log(&self) -> &MessageLog {
        &self.log
    }

    /// Membership view of the active group.
    pub fn membership(&self) -> &MembershipSync<I> {
        &self.membership
    }

    /// Process an event and return resulting actions.
    pub fn handle(
        &mut self,
        event: ControllerEvent<I>,
    ) -> Result<Vec<ControllerAction>, ClientError> {
        match event {
            ControllerEvent::Activate(conversation) => Ok(self.activate(conversation)),
            ControllerEvent::Deactivate => Ok(self.deactivate()),
            ControllerEvent::SendMessage { text } => self.send_message(&text),
            ControllerEvent::AddMember { user_id, now } => self.propose_add(user_id, now),
            ControllerEvent::RefreshMembership => self.refresh_membership(),
            ControllerEvent::Channel { channel, event } => Ok(self.handle_channel(channel, event)),
            ControllerEvent::DirectoryFetched { channel, users } => {
                Ok(self.handle_directory(channel, users))
            },
            ControllerEvent::RosterFetched { channel, members } => {
                Ok(self.handle_roster(channel, members))
            },
            ControllerEvent::FetchFailed { channel, reason } => {
                Ok(self.handle_fetch_failed(channel, reason))
            },
            ControllerEvent::Tick { now } => Ok(self.handle_tick(now)),
        }
    }

    /// Switch to `conversation`.
    ///
    /// Closes the previous channel (if any), clears the log and membership
    /// view, then opens a new channel. Without credentials no channel is
    /// opened and `AuthMissing` is reported instead.
    pub fn activate(&mut self, conversation: Conversation) -> Vec<ControllerAction> {
        let mut actions = self.teardown();

        if self.credentials.credentials().is_none() {
            tracing::warn!(%conversation, "cannot activate without credentials");
            actions.push(ControllerAction::Report(ClientError::AuthMissing));
            actions.push(ControllerAction::StateChanged { state: ChannelState::Closed });
            return actions;
        }

        self.next_channel += 1;
        let channel = ChannelId(self.next_channel);
        tracing::info!(%conversation, %channel, "activating conversation");

        actions.push(ControllerAction::OpenChannel {
            channel,
            endpoint: self.config.ws_endpoint.clone(),
        });
        actions.push(ControllerAction::StateChanged { state: ChannelState::Connecting });

        if let Conversation::Group { group } = &conversation {
            actions.push(ControllerAction::FetchDirectory { channel });
            actions.push(ControllerAction::FetchRoster { channel, group: group.clone() });
        }

        self.session = Some(Session {
            conversation,
            channel,
            state: ChannelState::Connecting,
            chat_id: None,
            attached: true,
        });

        actions
    }

    /// Leave the active conversation.
    pub fn deactivate(&mut self) -> Vec<ControllerAction> {
        if self.session.is_none() {
            return Vec::new();
        }

        let mut actions = self.teardown();
        actions.push(ControllerAction::StateChanged { state: ChannelState::Closed });
        actions
    }

    /// Send `text` to the active conversation.
    ///
    /// Rejected unless the session is `Live`. The message is not echoed into
    /// the log; it appears when the server broadcasts it back.
    pub fn send_message(&mut self, text: &str) -> Result<Vec<ControllerAction>, ClientError> {
        let session = self.live_session()?;

        if text.trim().is_empty() {
            return Err(ClientError::EmptyMessage);
        }

        let credentials = self.current_credentials()?;
        let frame = codec::encode_send(
            &session.conversation,
            session.chat_id.clone(),
            self.identity.username(),
            text,
            credentials,
        )?;

        Ok(vec![ControllerAction::Send { channel: session.channel, frame }])
    }

    /// Optimistically add `user_id` to the active group.
    ///
    /// The roster changes before the server confirms. The add is finalized by
    /// a matching join notice, reverted by a rejection, and reconciled by a
    /// roster refetch if neither arrives within the confirmation window.
    pub fn propose_add(
        &mut self,
        user_id: UserId,
        now: I,
    ) -> Result<Vec<ControllerAction>, ClientError> {
        let session = self.live_session()?;
        let group = session.conversation.as_group().ok_or(ClientError::NotGroupConversation)?;
        let channel = session.channel;

        let credentials = self.current_credentials()?;
        let frame =
            codec::encode_membership_mutation(group, user_id, self.identity.user_id(), credentials)?;

        let user = self.membership.propose_add(user_id, now)?;
        tracing::debug!(user = %user.username, %channel, "optimistic add");

        Ok(vec![ControllerAction::MembershipChanged, ControllerAction::Send { channel, frame }])
    }

    /// Refetch directory and roster for the active group.
    pub fn refresh_membership(&mut self) -> Result<Vec<ControllerAction>, ClientError> {
        let session = self.session.as_ref().ok_or(ClientError::NoActiveConversation)?;
        let group = session.conversation.as_group().ok_or(ClientError::NotGroupConversation)?;

        Ok(vec![
            ControllerAction::FetchDirectory { channel: session.channel },
            ControllerAction::FetchRoster { channel: session.channel, group: group.clone() },
        ])
    }

    fn live_session(&self) -> Result<&Session, ClientError> {
        match &self.session {
            Some(session) if session.state == ChannelState::Live => Ok(session),
            Some(session) => Err(ClientError::NotLive { state: session.state }),
            None => Err(ClientError::NotLive { state: ChannelState::Closed }),
        }
    }

    fn current_credentials(&self) -> Result<Credentials, ClientError> {
        self.credentials.credentials().ok_or(ClientError::AuthMissing)
    }

    /// Drop the active session, closing its channel if still attached.
    fn teardown(&mut self) -> Vec<ControllerAction> {
        let mut actions = Vec::new();

        if let Some(session) = self.session.take() {
            tracing::debug!(
                channel = %session.channel,
                conversation = %session.conversation,
                "tearing down session"
            );
            if session.attached {
                actions.push(ControllerAction::CloseChannel { channel: session.channel });
            }
        }

        self.log.clear();
        self.membership.clear();
        actions
    }

    /// Active session if `channel` is its channel.
    fn session_for(&mut self, channel: ChannelId) -> Option<&mut Session> {
        self.session.as_mut().filter(|s| s.channel == channel)
    }

    fn handle_channel(&mut self, channel: ChannelId, event: ChannelEvent) -> Vec<ControllerAction> {
        let Some(session) = self.session_for(channel).filter(|s| s.attached) else {
            tracing::debug!(%channel, ?event, "discarding event from stale channel");
            return Vec::new();
        };

        match event {
            ChannelEvent::Opened => self.handle_opened(),
            ChannelEvent::Frame(bytes) => {
                if !matches!(session.state, ChannelState::AwaitingHistory | ChannelState::Live) {
                    tracing::debug!(%channel, state = ?session.state, "frame outside session, ignoring");
                    return Vec::new();
                }
                self.handle_frame(&bytes)
            },
            ChannelEvent::Closed { reason } => {
                tracing::info!(%channel, %reason, "channel closed by remote");
                session.attached = false;
                session.state = ChannelState::Closed;
                vec![ControllerAction::StateChanged { state: ChannelState::Closed }]
            },
            ChannelEvent::Errored { cause } => {
                tracing::warn!(%channel, %cause, "channel failed");
                session.attached = false;
                session.state = ChannelState::Errored;
                vec![
                    ControllerAction::CloseChannel { channel },
                    ControllerAction::Report(ClientError::Transport { channel, cause }),
                    ControllerAction::StateChanged { state: ChannelState::Errored },
                ]
            },
        }
    }

    fn handle_opened(&mut self) -> Vec<ControllerAction> {
        let credentials = self.credentials.credentials();
        let Some(session) = self.session.as_mut() else {
            return Vec::new();
        };

        if session.state != ChannelState::Connecting {
            tracing::debug!(channel = %session.channel, "duplicate open, ignoring");
            return Vec::new();
        }

        let channel = session.channel;
        let Some(credentials) = credentials else {
            tracing::warn!(%channel, "credentials vanished before join");
            return Self::fail(session, ClientError::AuthMissing);
        };

        match codec::encode_join(&session.conversation, &self.identity, credentials) {
            Ok(frame) => {
                session.state = ChannelState::AwaitingHistory;
                vec![
                    ControllerAction::StateChanged { state: ChannelState::AwaitingHistory },
                    ControllerAction::Send { channel, frame },
                ]
            },
            Err(err) => Self::fail(session, err),
        }
    }

    /// Move the session to `Errored` and release its channel.
    fn fail(session: &mut Session, err: ClientError) -> Vec<ControllerAction> {
        session.attached = false;
        session.state = ChannelState::Errored;
        vec![
            ControllerAction::CloseChannel { channel: session.channel },
            ControllerAction::Report(err),
            ControllerAction::StateChanged { state: ChannelState::Errored },
        ]
    }

    fn handle_frame(&mut self, bytes: &[u8]) -> Vec<ControllerAction> {
        match codec::decode(bytes) {
            InboundFrame::HistorySnapshot { context, messages } => {
                self.apply_history(context, messages)
            },
            InboundFrame::LiveMessage(message) => self.apply_live(message),
            InboundFrame::MembershipEvent(event) => self.apply_membership_event(event),
            InboundFrame::Notice(text) => {
                tracing::debug!(%text, "server notice");
                vec![ControllerAction::Notice { text }]
            },
            InboundFrame::Malformed { reason, .. } => {
                tracing::warn!(%reason, "malformed frame");
                vec![ControllerAction::Report(ClientError::MalformedFrame { reason })]
            },
        }
    }

    fn apply_history(
        &mut self,
        context: HistoryContext,
        messages: Vec<WireMessage>,
    ) -> Vec<ControllerAction> {
        let Some(session) = self.session.as_mut() else {
            return Vec::new();
        };

        match (&session.conversation, context) {
            (Conversation::Direct { .. }, HistoryContext::Chat(chat_id)) => {
                session.chat_id = Some(chat_id);
            },
            (Conversation::Group { group }, HistoryContext::Group(group_id))
                if group.id == group_id => {},
            (_, HistoryContext::Unspecified) => {},
            (conversation, context) => {
                let reason = format!("history for {context:?} does not belong to {conversation}");
                tracing::warn!(%reason, "discarding history");
                return vec![ControllerAction::Report(ClientError::MalformedFrame { reason })];
            },
        }

        self.log.replace(messages);

        let mut actions = Vec::new();
        if session.state == ChannelState::AwaitingHistory {
            session.state = ChannelState::Live;
            tracing::info!(channel = %session.channel, messages = self.log.len(), "conversation live");
            actions.push(ControllerAction::StateChanged { state: ChannelState::Live });
        }
        actions.push(ControllerAction::MessagesChanged);
        actions
    }

    fn apply_live(&mut self, message: WireMessage) -> Vec<ControllerAction> {
        if self.state() != ChannelState::Live {
            tracing::debug!(sender = %message.sender, "live message before history, dropping");
            return vec![ControllerAction::Report(ClientError::FrameBeforeHistory {
                sender: message.sender,
            })];
        }

        self.log.append(message);
        vec![ControllerAction::MessagesChanged]
    }

    fn apply_membership_event(&mut self, event: MembershipEvent) -> Vec<ControllerAction> {
        let Some(active_group) = self.active_group().map(|g| g.id) else {
            tracing::debug!(?event, "membership event outside a group, ignoring");
            return Vec::new();
        };

        let event_group = match &event {
            MembershipEvent::MemberAdded { group_id, .. }
            | MembershipEvent::MemberRejected { group_id, .. } => *group_id,
        };
        if event_group.is_some_and(|id| id != active_group) {
            tracing::debug!(?event, "membership event for another group, ignoring");
            return Vec::new();
        }

        match event {
            MembershipEvent::MemberAdded { user_id, .. } => match self.membership.confirm(user_id) {
                Confirmation::Finalized | Confirmation::RemoteAdd => {
                    vec![ControllerAction::MembershipChanged]
                },
                Confirmation::Unchanged => Vec::new(),
            },
            MembershipEvent::MemberRejected { user_id, reason, .. } => {
                let reverted = self.membership.reject(user_id);
                let mut actions = Vec::new();
                if reverted.is_some() {
                    actions.push(ControllerAction::MembershipChanged);
                }
                actions.push(ControllerAction::Report(ClientError::MembershipRejected {
                    user_id: reverted.or(user_id),
                    reason,
                }));
                actions
            },
        }
    }

    fn active_group(&self) -> Option<&Group> {
        self.session.as_ref().and_then(|s| s.conversation.as_group())
    }

    fn handle_directory(&mut self, channel: ChannelId, users: Vec<User>) -> Vec<ControllerAction> {
        if self.session_for(channel).is_none() {
            tracing::debug!(%channel, "discarding directory for stale channel");
            return Vec::new();
        }

        self.membership.apply_directory(users);
        vec![ControllerAction::MembershipChanged]
    }

    fn handle_roster(&mut self, channel: ChannelId, members: Vec<User>) -> Vec<ControllerAction> {
        if self.session_for(channel).is_none() {
            tracing::debug!(%channel, "discarding roster for stale channel");
            return Vec::new();
        }

        self.membership.apply_roster(members.into_iter().map(|u| u.id));
        vec![ControllerAction::MembershipChanged]
    }

    fn handle_fetch_failed(&mut self, channel: ChannelId, reason: String) -> Vec<ControllerAction> {
        if self.session_for(channel).is_none() {
            return Vec::new();
        }

        tracing::warn!(%channel, %reason, "membership fetch failed");
        vec![ControllerAction::Report(ClientError::FetchFailed { reason })]
    }

    fn handle_tick(&mut self, now: I) -> Vec<ControllerAction> {
        let Some(session) = &self.session else {
            return Vec::new();
        };
        let Some(group) = session.conversation.as_group().cloned() else {
            return Vec::new();
        };
        let channel = session.channel;

        let expired = self.membership.expire(now);
        if expired.is_empty() {
            return Vec::new();
        }

        let mut actions: Vec<_> = expired
            .into_iter()
            .map(|user_id| {
                tracing::warn!(%user_id, "add not confirmed in time");
                ControllerAction::Report(ClientError::MembershipConfirmationTimeout { user_id })
            })
            .collect();
        actions.push(ControllerAction::FetchRoster { channel, group });
        actions
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use parley_proto::GroupId;

    use super::*;

    type TestController = ConversationController<Credentials, Instant>;

    fn controller() -> TestController {
        ConversationController::new(
            ClientConfig::default(),
            ClientIdentity::new(User::new(1, "alice")),
            Credentials::new("access", "csrf"),
        )
    }

    fn history(body: &str) -> ChannelEvent {
        ChannelEvent::Frame(body.as_bytes().to_vec())
    }

    #[test]
    fn new_controller_is_closed() {
        let controller = controller();
        assert_eq!(controller.state(), ChannelState::Closed);
        assert!(controller.conversation().is_none());
        assert!(controller.messages().is_empty());
    }

    #[test]
    fn channel_ids_are_never_reused() {
        let mut controller = controller();
        controller.activate(Conversation::direct(User::new(2, "bob")));
        let first = controller.channel().unwrap();
        controller.activate(Conversation::direct(User::new(3, "carol")));
        let second = controller.channel().unwrap();

        assert!(second > first);
    }

    #[test]
    fn deactivate_without_session_is_noop() {
        let mut controller = controller();
        assert!(controller.deactivate().is_empty());
    }

    #[test]
    fn history_for_another_group_is_rejected() {
        let mut controller = controller();
        controller.activate(Conversation::group(Group::new(5, "crabs")));
        let channel = controller.channel().unwrap();
        controller.handle_channel(channel, ChannelEvent::Opened);

        let actions =
            controller.handle_channel(channel, history(r#"{"group_id":6,"history":[]}"#));

        assert!(matches!(
            actions.as_slice(),
            [ControllerAction::Report(ClientError::MalformedFrame { .. })]
        ));
        assert_eq!(controller.state(), ChannelState::AwaitingHistory);
    }

    #[test]
    fn group_history_matching_group_goes_live() {
        let mut controller = controller();
        controller.activate(Conversation::group(Group::new(5, "crabs")));
        let channel = controller.channel().unwrap();
        controller.handle_channel(channel, ChannelEvent::Opened);

        controller.handle_channel(
            channel,
            history(r#"{"group_id":5,"history":[{"sender_username":"bob","content":"hey"}]}"#),
        );

        assert_eq!(controller.state(), ChannelState::Live);
        assert_eq!(controller.messages()[0].content, "hey");
        assert_eq!(controller.active_group().map(|g| g.id), Some(GroupId(5)));
    }

    #[test]
    fn tick_without_pending_adds_does_nothing() {
        let mut controller = controller();
        controller.activate(Conversation::group(Group::new(5, "crabs")));
        assert!(controller.handle_tick(Instant::now()).is_empty());
    }
}
