//! Generic runtime for application orchestration.
//!
//! The Runtime drives the event loop, coordinating between:
//! - [`ConversationController`]: Sans-IO session state machine
//! - [`Driver`]: Platform-specific I/O
//!
//! Driver events become controller events; controller actions become driver
//! calls, executed strictly in the order the controller returned them.

use std::collections::VecDeque;

use parley_client::{
    ChannelEvent, ClientConfig, ClientError, ClientIdentity, ControllerAction, ControllerEvent,
    Conversation, ConversationController, CredentialProvider, Group, User,
};
use thiserror::Error;

use crate::{Driver, DriverEvent, HELP, Update, UserCommand, command::CommandError};

/// Runtime errors.
#[derive(Debug, Error)]
pub enum RuntimeError<E: std::error::Error + 'static> {
    /// The driver failed to produce input or output.
    #[error("driver error: {0}")]
    Driver(#[source] E),
}

/// Whether the loop keeps running after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep going.
    Continue,
    /// User asked to quit.
    Quit,
}

/// Generic runtime that orchestrates the controller and a driver.
///
/// # Type Parameters
///
/// - `D`: Platform-specific I/O driver
/// - `P`: Credential source shared with the login flow
pub struct Runtime<D, P>
where
    D: Driver,
{
    driver: D,
    controller: ConversationController<P, D::Instant>,
    /// Last `/users` listing (or conversation directory fetch).
    users: Vec<User>,
    /// Last `/groups` listing, plus groups created since.
    groups: Vec<Group>,
}

impl<D, P> Runtime<D, P>
where
    D: Driver,
    P: CredentialProvider,
{
    /// Create a runtime for `identity`.
    pub fn new(driver: D, config: ClientConfig, identity: ClientIdentity, credentials: P) -> Self {
        let controller = ConversationController::new(config, identity, credentials);
        Self { driver, controller, users: Vec::new(), groups: Vec::new() }
    }

    /// Run the main event loop until input ends or the user quits.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails to read input or render.
    pub async fn run(mut self) -> Result<(), RuntimeError<D::Error>> {
        self.driver.list_users();
        self.driver.list_groups();

        while let Some(event) = self.driver.next_event().await.map_err(RuntimeError::Driver)? {
            if self.handle_event(event).await? == Flow::Quit {
                break;
            }
        }

        self.shutdown().await
    }

    /// Process one driver event.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails to render.
    pub async fn handle_event(
        &mut self,
        event: DriverEvent,
    ) -> Result<Flow, RuntimeError<D::Error>> {
        match event {
            DriverEvent::Input(line) => return self.handle_input(&line).await,
            DriverEvent::Channel { channel, event } => {
                self.dispatch(ControllerEvent::Channel { channel, event }).await?;
            },
            DriverEvent::DirectoryFetched { channel, users } => {
                if self.controller.channel() == Some(channel) {
                    self.users.clone_from(&users);
                }
                self.dispatch(ControllerEvent::DirectoryFetched { channel, users }).await?;
            },
            DriverEvent::RosterFetched { channel, members } => {
                self.dispatch(ControllerEvent::RosterFetched { channel, members }).await?;
            },
            DriverEvent::FetchFailed { channel, reason } => {
                self.dispatch(ControllerEvent::FetchFailed { channel, reason }).await?;
            },
            DriverEvent::UsersListed(users) => {
                self.users = users;
                self.driver.render(Update::Users(&self.users)).map_err(RuntimeError::Driver)?;
            },
            DriverEvent::GroupsListed(groups) => {
                self.groups = groups;
                self.driver.render(Update::Groups(&self.groups)).map_err(RuntimeError::Driver)?;
            },
            DriverEvent::GroupCreated(group) => {
                let text = format!("created group #{}", group.name);
                self.groups.push(group);
                self.notice(&text)?;
            },
            DriverEvent::RequestFailed { reason } => {
                self.report(&ClientError::FetchFailed { reason })?;
            },
            DriverEvent::Tick => {
                let now = self.driver.now();
                self.dispatch(ControllerEvent::Tick { now }).await?;
            },
        }

        Ok(Flow::Continue)
    }

    /// Session controller.
    pub fn controller(&self) -> &ConversationController<P, D::Instant> {
        &self.controller
    }

    /// Driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Leave the active conversation and stop the driver.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails to render the final state.
    pub async fn shutdown(mut self) -> Result<(), RuntimeError<D::Error>> {
        self.dispatch(ControllerEvent::Deactivate).await?;
        self.driver.stop();
        Ok(())
    }

    async fn handle_input(&mut self, line: &str) -> Result<Flow, RuntimeError<D::Error>> {
        let command = match UserCommand::parse(line) {
            Ok(command) => command,
            Err(CommandError::Empty) => return Ok(Flow::Continue),
            Err(err) => {
                self.notice(&err.to_string())?;
                return Ok(Flow::Continue);
            },
        };

        tracing::debug!(?command, "user command");
        match command {
            UserCommand::Users => self.driver.list_users(),
            UserCommand::Groups => self.driver.list_groups(),
            UserCommand::Direct { username } => {
                let peer = self.users.iter().find(|u| u.username == username).cloned();
                match peer {
                    Some(peer) if peer.id == self.controller.identity().user_id() => {
                        self.notice("cannot open a direct chat with yourself")?;
                    },
                    Some(peer) => {
                        self.dispatch(ControllerEvent::Activate(Conversation::direct(peer))).await?;
                    },
                    None => self.notice(&format!("unknown user {username} (try /users)"))?,
                }
            },
            UserCommand::Group { name } => {
                let group = self.groups.iter().find(|g| g.name == name).cloned();
                match group {
                    Some(group) => {
                        self.dispatch(ControllerEvent::Activate(Conversation::group(group))).await?;
                    },
                    None => self.notice(&format!("unknown group {name} (try /groups)"))?,
                }
            },
            UserCommand::Create { name } => self.driver.create_group(&name),
            UserCommand::Add { username } => {
                let user_id = self
                    .controller
                    .membership()
                    .directory()
                    .find_by_username(&username)
                    .map(|u| u.id);
                match user_id {
                    Some(user_id) => {
                        let now = self.driver.now();
                        self.dispatch(ControllerEvent::AddMember { user_id, now }).await?;
                    },
                    None => self.notice(&format!("unknown user {username}"))?,
                }
            },
            UserCommand::Addable => self.render_membership()?,
            UserCommand::Refresh => self.dispatch(ControllerEvent::RefreshMembership).await?,
            UserCommand::Leave => self.dispatch(ControllerEvent::Deactivate).await?,
            UserCommand::Help => self.notice(HELP)?,
            UserCommand::Quit => return Ok(Flow::Quit),
            UserCommand::Say { text } => {
                self.dispatch(ControllerEvent::SendMessage { text }).await?;
            },
        }

        Ok(Flow::Continue)
    }

    /// Feed one event to the controller and execute the result.
    ///
    /// Rejected operations are reported, not propagated.
    async fn dispatch(
        &mut self,
        event: ControllerEvent<D::Instant>,
    ) -> Result<(), RuntimeError<D::Error>> {
        match self.controller.handle(event) {
            Ok(actions) => self.execute(actions).await,
            Err(err) => self.report(&err),
        }
    }

    /// Execute controller actions in order.
    ///
    /// A failed send becomes a channel error for the owning channel; the
    /// controller's reaction is executed before any remaining action.
    async fn execute(
        &mut self,
        actions: Vec<ControllerAction>,
    ) -> Result<(), RuntimeError<D::Error>> {
        let mut pending: VecDeque<ControllerAction> = actions.into();

        while let Some(action) = pending.pop_front() {
            match action {
                ControllerAction::OpenChannel { channel, endpoint } => {
                    self.driver.open_channel(channel, &endpoint);
                },
                ControllerAction::CloseChannel { channel } => self.driver.close_channel(channel),
                ControllerAction::Send { channel, frame } => {
                    if let Err(err) = self.driver.send_frame(channel, frame).await {
                        tracing::warn!(%channel, error = %err, "send failed");
                        let event = ChannelEvent::Errored { cause: err.to_string() };
                        match self.controller.handle(ControllerEvent::Channel { channel, event }) {
                            Ok(follow_up) => {
                                for action in follow_up.into_iter().rev() {
                                    pending.push_front(action);
                                }
                            },
                            Err(err) => self.report(&err)?,
                        }
                    }
                },
                ControllerAction::FetchDirectory { channel } => self.driver.fetch_directory(channel),
                ControllerAction::FetchRoster { channel, group } => {
                    self.driver.fetch_roster(channel, group);
                },
                ControllerAction::Report(err) => self.report(&err)?,
                ControllerAction::Notice { text } => self.notice(&text)?,
                ControllerAction::StateChanged { state } => {
                    let conversation = self.controller.conversation();
                    self.driver
                        .render(Update::State { conversation, state })
                        .map_err(RuntimeError::Driver)?;
                },
                ControllerAction::MessagesChanged => {
                    let log = self.controller.log();
                    self.driver
                        .render(Update::Messages {
                            messages: log.snapshot(),
                            generation: log.generation(),
                        })
                        .map_err(RuntimeError::Driver)?;
                },
                ControllerAction::MembershipChanged => self.render_membership()?,
            }
        }

        Ok(())
    }

    fn render_membership(&mut self) -> Result<(), RuntimeError<D::Error>> {
        if self.controller.conversation().and_then(Conversation::as_group).is_none() {
            return self.notice("not in a group conversation");
        }

        let membership = self.controller.membership();
        let members: Vec<User> = membership
            .roster()
            .iter()
            .map(|id| {
                membership
                    .directory()
                    .get(id)
                    .cloned()
                    .unwrap_or_else(|| User { id, username: id.to_string() })
            })
            .collect();
        let addable: Vec<User> = membership.addable().iter().cloned().collect();

        self.driver
            .render(Update::Membership { members: &members, addable: &addable })
            .map_err(RuntimeError::Driver)
    }

    fn notice(&mut self, text: &str) -> Result<(), RuntimeError<D::Error>> {
        self.driver.render(Update::Notice(text)).map_err(RuntimeError::Driver)
    }

    fn report(&mut self, err: &ClientError) -> Result<(), RuntimeError<D::Error>> {
        self.driver.report(err).map_err(RuntimeError::Driver)
    }
}
