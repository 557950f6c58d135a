//! Authentication service: password login and bearer-token resolution.

use stockline_core::actor::Actor;
use stockline_core::error::{StocklineError, StocklineResult};
use stockline_core::models::user::{User, UserStatus};
use stockline_core::repository::UserRepository;
use tracing::{debug, info, instrument};

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::password;
use crate::token;

/// Successful login result.
#[derive(Debug)]
pub struct LoginOutput {
    /// Signed JWT access token.
    pub access_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
}

/// Authentication service.
///
/// Generic over the user repository so that the auth layer has no
/// dependency on the database crate.
pub struct AuthService<U: UserRepository> {
    user_repo: U,
    config: AuthConfig,
}

impl<U: UserRepository> AuthService<U> {
    pub fn new(user_repo: U, config: AuthConfig) -> Self {
        Self { user_repo, config }
    }

    /// Verify `username` + `password` and issue an access token.
    ///
    /// Unknown users, deleted users and wrong passwords all fail the
    /// same way.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> StocklineResult<LoginOutput> {
        let user = match self.user_repo.get_by_username(username).await {
            Ok(user) => user,
            Err(StocklineError::NotFound { .. }) => {
                debug!("login for unknown username");
                return Err(AuthError::InvalidCredentials.into());
            }
            Err(e) => return Err(e),
        };

        let valid = password::verify_password(
            password,
            &user.password_hash,
            self.config.pepper.as_deref(),
        )?;
        if !valid {
            debug!(user_id = %user.id, "password mismatch");
            return Err(AuthError::InvalidCredentials.into());
        }
        ensure_active(&user)?;

        let access_token = token::issue_access_token(&user, &self.config)?;
        info!(user_id = %user.id, role = %user.role, "user logged in");

        Ok(LoginOutput {
            access_token,
            expires_in: self.config.access_token_lifetime_secs,
        })
    }

    /// Resolve a bearer token into the actor it authenticates.
    ///
    /// Role, tenant and business come from the stored user rather than
    /// the claims, so changes made after the token was issued apply
    /// immediately.
    pub async fn authenticate(&self, access_token: &str) -> StocklineResult<Actor> {
        let claims = token::decode_access_token(access_token, &self.config)?;
        let user = match self.user_repo.get_by_id(claims.user_id()?).await {
            Ok(user) => user,
            Err(StocklineError::NotFound { .. }) => {
                return Err(AuthError::TokenInvalid("user no longer exists".into()).into());
            }
            Err(e) => return Err(e),
        };
        ensure_active(&user)?;
        Ok(Actor::from(&user))
    }
}

fn ensure_active(user: &User) -> Result<(), AuthError> {
    match user.status {
        UserStatus::Active => Ok(()),
        UserStatus::Inactive => Err(AuthError::AccountInactive),
    }
}
