//! Account sign-in before the session starts.

use parley_client::{ClientIdentity, SharedCredentials, User, directory::DirectoryClient};

use crate::CliError;

/// Account options from the command line.
#[derive(Debug, Clone)]
pub struct Account {
    /// Login name.
    pub username: String,
    /// Password.
    pub password: String,
    /// Register the account first with this email.
    pub register_email: Option<String>,
}

/// Log in, store the tokens in `credentials` and resolve the caller's user.
///
/// # Errors
///
/// Returns an error if registration or login fails, or the account is not
/// listed in the user directory.
pub async fn sign_in(
    directory: &DirectoryClient<SharedCredentials>,
    credentials: &SharedCredentials,
    account: &Account,
) -> Result<ClientIdentity, CliError> {
    if let Some(email) = &account.register_email {
        let user = directory.register(&account.username, email, &account.password).await?;
        tracing::info!(username = %user.username, "registered account");
    }

    let tokens = directory.login(&account.username, &account.password).await?;
    credentials.set(tokens);

    let users = directory.users().await?;
    identify(&users, &account.username)
}

/// Find `username` among `users`.
///
/// # Errors
///
/// Returns [`CliError::UnknownIdentity`] if no user has that name.
pub fn identify(users: &[User], username: &str) -> Result<ClientIdentity, CliError> {
    users
        .iter()
        .find(|u| u.username == username)
        .cloned()
        .map(ClientIdentity::new)
        .ok_or_else(|| CliError::UnknownIdentity { username: username.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identify_finds_account_by_name() {
        let users = vec![User::new(1, "alice"), User::new(2, "bob")];

        let identity = identify(&users, "bob").unwrap();

        assert_eq!(identity.username(), "bob");
        assert_eq!(identity.user_id(), User::new(2, "bob").id);
    }

    #[test]
    fn identify_rejects_unknown_account() {
        let err = identify(&[User::new(1, "alice")], "mallory").unwrap_err();

        assert!(matches!(err, CliError::UnknownIdentity { ref username } if username == "mallory"));
    }
}
