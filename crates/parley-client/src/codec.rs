//! Session codec.
//!
//! Maps conversation-level operations onto wire [`Command`]s. Each function
//! takes the credentials to embed as an argument; the controller reads them
//! from its [`crate::CredentialProvider`] immediately before calling, so no
//! token outlives a single encode.

use parley_proto::{ChatId, Command, Credentials, UserId};

pub use parley_proto::{InboundFrame, decode};

use crate::{
    conversation::{ClientIdentity, Conversation, Group},
    error::ClientError,
};

/// Encode the authenticated join for `conversation`.
pub fn encode_join(
    conversation: &Conversation,
    identity: &ClientIdentity,
    credentials: Credentials,
) -> Result<Vec<u8>, ClientError> {
    let command = match conversation {
        Conversation::Direct { peer } => {
            Command::join_private(identity.username(), peer.id, credentials)
        },
        Conversation::Group { group } => {
            Command::join_group(group.id, &group.name, identity.username(), credentials)
        },
    };
    Ok(command.encode()?)
}

/// Encode a message send.
///
/// Direct chats are addressed by the chat id from their history snapshot;
/// `chat_id` must be known for them.
pub fn encode_send(
    conversation: &Conversation,
    chat_id: Option<ChatId>,
    sender: &str,
    text: &str,
    credentials: Credentials,
) -> Result<Vec<u8>, ClientError> {
    let command = match conversation {
        Conversation::Direct { .. } => {
            let chat_id = chat_id.ok_or(ClientError::ChatNotAssigned)?;
            Command::send_private(chat_id, sender, text, credentials)
        },
        Conversation::Group { group } => Command::send_group(group.id, sender, text, credentials),
    };
    Ok(command.encode()?)
}

/// Encode an add of `target` to `group` performed by `acting`.
pub fn encode_membership_mutation(
    group: &Group,
    target: UserId,
    acting: UserId,
    credentials: Credentials,
) -> Result<Vec<u8>, ClientError> {
    Ok(Command::add_member(group.id, target, acting, credentials).encode()?)
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;
    use crate::conversation::User;

    fn identity() -> ClientIdentity {
        ClientIdentity::new(User::new(1, "alice"))
    }

    fn parse(bytes: &[u8]) -> Value {
        serde_json::from_slice(bytes).unwrap()
    }

    #[test]
    fn direct_join_names_both_parties() {
        let conversation = Conversation::direct(User::new(2, "bob"));
        let frame = encode_join(&conversation, &identity(), Credentials::new("a", "c")).unwrap();
        let value = parse(&frame);

        assert_eq!(value["action"], json!("join_private_chat"));
        assert_eq!(value["data"], json!({ "user1": { "username": "alice" }, "user2_id": 2 }));
    }

    #[test]
    fn group_join_carries_id_and_name() {
        let conversation = Conversation::group(Group::new(5, "crabs"));
        let frame = encode_join(&conversation, &identity(), Credentials::new("a", "c")).unwrap();

        assert_eq!(
            parse(&frame)["data"],
            json!({ "group_id": 5, "group_name": "crabs", "user_name": "alice" })
        );
    }

    #[test]
    fn direct_send_needs_chat_id() {
        let conversation = Conversation::direct(User::new(2, "bob"));

        let err = encode_send(&conversation, None, "alice", "hi", Credentials::new("a", "c"));
        assert!(matches!(err, Err(ClientError::ChatNotAssigned)));

        let chat_id = Some(ChatId::Number(8));
        let frame =
            encode_send(&conversation, chat_id, "alice", "hi", Credentials::new("a", "c")).unwrap();
        assert_eq!(parse(&frame)["data"]["chat_id"], json!(8));
    }

    #[test]
    fn membership_mutation_names_adder() {
        let frame = encode_membership_mutation(
            &Group::new(5, "crabs"),
            UserId(9),
            UserId(1),
            Credentials::new("a", "c"),
        )
        .unwrap();

        assert_eq!(parse(&frame)["data"], json!({ "group_id": 5, "user_id": 9, "adder_id": 1 }));
    }
}
