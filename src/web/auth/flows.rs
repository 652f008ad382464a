//! Decision logic behind the public auth pages: what to validate locally, what
//! to send, which message to show and where to go next.

use super::{
    client::AuthClient,
    guards::Navigator,
    types::{
        EmailSignInRequest, EmailSignUpRequest, PasswordResetRequest, ResetPasswordRequest,
        SocialProvider,
    },
};
use crate::gate::policy::{return_path, LOGIN_PATH};
use regex::Regex;
use thiserror::Error;
use tracing::{error, info, instrument};
use url::form_urlencoded;

pub const MIN_PASSWORD_CHARS: usize = 8;
pub const RESET_PASSWORD_PATH: &str = "/reset-password";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Invalid or missing reset token. Please request a new password reset link.")]
    Missing,
    #[error("This password reset link is invalid or has expired. Please request a new one.")]
    Invalid,
    #[error("This password reset link has expired or is invalid. Please request a new one.")]
    Expired,
}

/// A message for the form, never a raw transport error.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("Please enter a valid email address")]
    InvalidEmail,
    #[error("Passwords do not match")]
    PasswordMismatch,
    #[error("Password must be at least 8 characters long")]
    PasswordTooShort,
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error("{0}")]
    Message(String),
}

#[must_use]
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email.trim()))
}

/// Checked before any new password leaves the page.
///
/// # Errors
/// Returns the form message for a mismatch or a short password.
pub fn validate_new_password(password: &str, confirm: &str) -> Result<(), FormError> {
    if password != confirm {
        return Err(FormError::PasswordMismatch);
    }
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(FormError::PasswordTooShort);
    }
    Ok(())
}

/// Email and password sign-in. Returns the path to load next, taken from the
/// `redirect` query parameter of the login page.
///
/// # Errors
/// Returns the message to show on the form.
#[instrument(skip_all)]
pub async fn login(
    client: &AuthClient,
    email: &str,
    password: &str,
    query: Option<&str>,
) -> Result<String, FormError> {
    let request = EmailSignInRequest {
        email: email.trim().to_string(),
        password: password.to_string(),
    };

    match client.sign_in_email(&request).await {
        Ok(_) => {
            let target = return_path(query);
            info!(location = %target, "signed in");
            Ok(target)
        }
        Err(err) => {
            error!("Sign in failed: {err}");
            Err(FormError::Message(err.user_message("Failed to sign in")))
        }
    }
}

/// Starts an OAuth sign-in that comes back to the login page's return path.
/// Returns the provider URL the browser should follow, if the server sent one.
///
/// # Errors
/// Returns the message to show on the form.
#[instrument(skip(client))]
pub async fn social_login(
    client: &AuthClient,
    provider: SocialProvider,
    query: Option<&str>,
) -> Result<Option<String>, FormError> {
    let callback = return_path(query);

    match client.sign_in_social(provider, &callback).await {
        Ok(response) => Ok(response.url),
        Err(err) => {
            error!("{provider} sign in failed: {err}");
            let fallback = format!("Failed to sign in with {}", provider.label());
            Err(FormError::Message(err.user_message(&fallback)))
        }
    }
}

pub struct SignupForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// Creates an account and signs in. Nothing is sent when local validation fails.
///
/// # Errors
/// Returns the validation or server message to show on the form.
#[instrument(skip_all)]
pub async fn signup(
    client: &AuthClient,
    form: &SignupForm,
    query: Option<&str>,
) -> Result<String, FormError> {
    if !valid_email(&form.email) {
        return Err(FormError::InvalidEmail);
    }
    validate_new_password(&form.password, &form.confirm_password)?;

    let request = EmailSignUpRequest {
        name: form.name.trim().to_string(),
        email: form.email.trim().to_string(),
        password: form.password.clone(),
    };

    match client.sign_up_email(&request).await {
        Ok(_) => Ok(return_path(query)),
        Err(err) => {
            error!("Sign up failed: {err}");
            Err(FormError::Message(err.user_message("Failed to sign up")))
        }
    }
}

/// Requests a reset link. Always reports success so the page never reveals
/// whether an account exists.
#[instrument(skip_all)]
pub async fn forgot_password(client: &AuthClient, email: &str, origin: &str) {
    let request = PasswordResetRequest {
        email: email.trim().to_string(),
        redirect_to: format!("{}{RESET_PASSWORD_PATH}", origin.trim_end_matches('/')),
    };

    if let Err(err) = client.request_password_reset(&request).await {
        error!("Password reset request failed: {err}");
    }
}

/// State of the reset-password page, built from its query string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResetPassword {
    token: Option<String>,
    token_error: Option<TokenError>,
}

impl ResetPassword {
    #[must_use]
    pub fn from_query(query: Option<&str>) -> Self {
        let mut token = None;
        let mut invalid = false;

        for (key, value) in
            form_urlencoded::parse(query.unwrap_or_default().trim_start_matches('?').as_bytes())
        {
            match key.as_ref() {
                "token" if !value.is_empty() => token = Some(value.into_owned()),
                "error" if value == "INVALID_TOKEN" => invalid = true,
                _ => {}
            }
        }

        let token_error = if token.is_none() {
            Some(TokenError::Missing)
        } else if invalid {
            Some(TokenError::Invalid)
        } else {
            None
        };

        Self { token, token_error }
    }

    /// When set, the page shows this instead of the form.
    #[must_use]
    pub fn token_error(&self) -> Option<&TokenError> {
        self.token_error.as_ref()
    }

    /// Sets the new password and navigates to the login page.
    ///
    /// # Errors
    /// Returns the form message. Expired or invalid tokens also switch the
    /// page to its token error.
    #[instrument(skip_all)]
    pub async fn submit(
        &mut self,
        client: &AuthClient,
        password: &str,
        confirm: &str,
        navigator: &mut impl Navigator,
    ) -> Result<(), FormError> {
        let Some(token) = self.token.clone() else {
            return Err(FormError::Message(
                "Invalid reset token. Please request a new password reset link.".to_string(),
            ));
        };
        validate_new_password(password, confirm)?;

        let request = ResetPasswordRequest {
            token,
            new_password: password.to_string(),
        };

        match client.reset_password(&request).await {
            Ok(()) => {
                navigator.push(LOGIN_PATH);
                Ok(())
            }
            Err(err) => {
                error!("Password reset failed: {err}");
                let message = err.user_message("Failed to reset password");
                let lowered = message.to_lowercase();
                if lowered.contains("expired") || lowered.contains("invalid") {
                    self.token_error = Some(TokenError::Expired);
                    Err(FormError::Token(TokenError::Expired))
                } else {
                    Err(FormError::Message(message))
                }
            }
        }
    }
}
