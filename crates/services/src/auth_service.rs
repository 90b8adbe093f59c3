use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use std::sync::Arc;

use quiz_core::model::{Identity, Role, UserAccount, UserId};
use storage::repository::{IdentityRepository, UserRepository};

use crate::Clock;
use crate::error::AuthError;

/// Argon2 PHC string for `password` with a fresh random salt.
///
/// # Errors
///
/// Returns `AuthError::Hash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AuthError::Hash(e.to_string()))
}

/// Whether `password` matches a stored PHC string. Unparseable hashes never match.
#[must_use]
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

struct DefaultAccount {
    id: u64,
    username: &'static str,
    email: &'static str,
    password: &'static str,
    role: Role,
}

const DEFAULT_ACCOUNTS: [DefaultAccount; 2] = [
    DefaultAccount {
        id: 1,
        username: "admin",
        email: "admin@example.com",
        password: "admin123",
        role: Role::Admin,
    },
    DefaultAccount {
        id: 2,
        username: "user",
        email: "user@example.com",
        password: "user123",
        role: Role::User,
    },
];

/// Signs users in and out against the local user store.
#[derive(Clone)]
pub struct AuthService {
    clock: Clock,
    users: Arc<dyn UserRepository>,
    identity: Arc<dyn IdentityRepository>,
}

impl AuthService {
    #[must_use]
    pub fn new(
        clock: Clock,
        users: Arc<dyn UserRepository>,
        identity: Arc<dyn IdentityRepository>,
    ) -> Self {
        Self {
            clock,
            users,
            identity,
        }
    }

    /// Add the demo admin and user accounts when their emails are missing.
    ///
    /// Returns how many accounts were added.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the user store cannot be read or written.
    pub async fn seed_default_accounts(&self) -> Result<usize, AuthError> {
        let mut users = self.users.list_users().await?;
        let now = self.clock.now();
        let before = users.len();

        for account in &DEFAULT_ACCOUNTS {
            if users.iter().any(|u| u.email == account.email) {
                continue;
            }
            users.push(UserAccount {
                id: UserId::new(account.id),
                username: account.username.to_owned(),
                email: account.email.to_owned(),
                password_hash: hash_password(account.password)?,
                role: account.role,
                created_at: now,
            });
        }

        let added = users.len() - before;
        if added > 0 {
            self.users.save_users(&users).await?;
            tracing::info!("seeded {added} default account(s)");
        }
        Ok(added)
    }

    /// Sign in with email and password and remember the identity.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingCredentials` for blank input,
    /// `AuthError::InvalidCredentials` when no account matches, or storage errors.
    pub async fn login(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        let users = self.users.list_users().await?;
        let Some(account) = users.iter().find(|u| {
            u.email.eq_ignore_ascii_case(email) && verify_password(password, &u.password_hash)
        }) else {
            tracing::warn!("failed login for {email}");
            return Err(AuthError::InvalidCredentials);
        };

        let identity = account.identity();
        self.identity.set_current_identity(&identity).await?;
        tracing::info!("{} signed in", identity.username);
        Ok(identity)
    }

    /// Create a regular user account and sign it in.
    ///
    /// Usernames and emails are trimmed and must be unique (emails compared
    /// case-insensitively). The new id follows the highest existing one.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingCredentials` for blank input,
    /// `AuthError::AccountExists` when the username or email is taken, or
    /// hashing/storage errors.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<Identity, AuthError> {
        let username = username.trim();
        let email = email.trim();
        if username.is_empty() || email.is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        let mut users = self.users.list_users().await?;
        if users
            .iter()
            .any(|u| u.username == username || u.email.eq_ignore_ascii_case(email))
        {
            return Err(AuthError::AccountExists);
        }

        let next_id = users.iter().map(|u| u.id.value()).max().unwrap_or(0) + 1;
        let account = UserAccount {
            id: UserId::new(next_id),
            username: username.to_owned(),
            email: email.to_owned(),
            password_hash: hash_password(password)?,
            role: Role::User,
            created_at: self.clock.now(),
        };
        let identity = account.identity();
        users.push(account);
        self.users.save_users(&users).await?;
        self.identity.set_current_identity(&identity).await?;
        tracing::info!("registered {}", identity.username);
        Ok(identity)
    }

    /// Every account in the user store, without password hashes.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the user store cannot be read.
    pub async fn accounts(&self) -> Result<Vec<Identity>, AuthError> {
        let users = self.users.list_users().await?;
        Ok(users.iter().map(UserAccount::identity).collect())
    }

    /// Forget the signed-in identity, if any.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the identity cannot be cleared.
    pub async fn logout(&self) -> Result<(), AuthError> {
        self.identity.clear_current_identity().await?;
        Ok(())
    }

    /// The signed-in identity, if any.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the identity cannot be read.
    pub async fn current(&self) -> Result<Option<Identity>, AuthError> {
        Ok(self.identity.current_identity().await?)
    }
}
