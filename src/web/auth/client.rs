//! Client wrappers for the identity API under `/api/auth`. Every call relies on
//! the session cookie kept by [`ApiClient`]; request payloads holding passwords
//! or tokens are skipped from instrumentation.

use super::types::{
    AuthResponse, ChangePasswordRequest, DeleteUserRequest, EmailSignInRequest,
    EmailSignUpRequest, PasswordResetRequest, ResetPasswordRequest, SocialProvider,
    SocialSignInRequest, SocialSignInResponse, UpdateUserRequest,
};
use crate::{
    gate::session::{Session, DEFAULT_SESSION_PATH},
    web::{api::ApiClient, errors::AppError},
};
use serde_json::Value;
use tracing::instrument;

const SIGN_IN_EMAIL: &str = "/api/auth/sign-in/email";
const SIGN_IN_SOCIAL: &str = "/api/auth/sign-in/social";
const SIGN_UP_EMAIL: &str = "/api/auth/sign-up/email";
const SIGN_OUT: &str = "/api/auth/sign-out";
const UPDATE_USER: &str = "/api/auth/update-user";
const CHANGE_PASSWORD: &str = "/api/auth/change-password";
const DELETE_USER: &str = "/api/auth/delete-user";
const REQUEST_PASSWORD_RESET: &str = "/api/auth/request-password-reset";
const RESET_PASSWORD: &str = "/api/auth/reset-password";

#[derive(Clone, Debug)]
pub struct AuthClient {
    api: ApiClient,
    session_path: String,
}

impl AuthClient {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            session_path: DEFAULT_SESSION_PATH.to_string(),
        }
    }

    /// Read the session from a path other than [`DEFAULT_SESSION_PATH`].
    #[must_use]
    pub fn with_session_path(mut self, path: impl Into<String>) -> Self {
        self.session_path = path.into();
        self
    }

    /// # Errors
    /// Returns the server message for rejected credentials, or a transport error.
    #[instrument(skip_all)]
    pub async fn sign_in_email(&self, request: &EmailSignInRequest) -> Result<AuthResponse, AppError> {
        self.api.post_json(SIGN_IN_EMAIL, request).await
    }

    /// Starts an OAuth sign-in; the provider sends the user back to `callback_url`.
    ///
    /// # Errors
    /// Returns an error if the provider is not configured or the call fails.
    #[instrument(skip(self))]
    pub async fn sign_in_social(
        &self,
        provider: SocialProvider,
        callback_url: &str,
    ) -> Result<SocialSignInResponse, AppError> {
        let request = SocialSignInRequest {
            provider,
            callback_url: callback_url.to_string(),
        };
        self.api.post_json(SIGN_IN_SOCIAL, &request).await
    }

    /// # Errors
    /// Returns the server message (e.g. existing account) or a transport error.
    #[instrument(skip_all)]
    pub async fn sign_up_email(&self, request: &EmailSignUpRequest) -> Result<AuthResponse, AppError> {
        self.api.post_json(SIGN_UP_EMAIL, request).await
    }

    /// # Errors
    /// Returns an error if the session could not be cleared.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) -> Result<(), AppError> {
        self.api.post_empty(SIGN_OUT).await
    }

    /// # Errors
    /// Returns an error if the update was rejected.
    #[instrument(skip_all)]
    pub async fn update_user(&self, request: &UpdateUserRequest) -> Result<(), AppError> {
        self.api.post_json_empty(UPDATE_USER, request).await
    }

    /// # Errors
    /// Returns an error if the current password is wrong or the call fails.
    #[instrument(skip_all, fields(revoke_other_sessions = request.revoke_other_sessions))]
    pub async fn change_password(&self, request: &ChangePasswordRequest) -> Result<(), AppError> {
        self.api.post_json_empty(CHANGE_PASSWORD, request).await
    }

    /// # Errors
    /// Returns an error if the account could not be deleted.
    #[instrument(skip_all)]
    pub async fn delete_user(&self, request: &DeleteUserRequest) -> Result<(), AppError> {
        self.api.post_json_empty(DELETE_USER, request).await
    }

    /// # Errors
    /// Returns an error if the request could not be delivered.
    #[instrument(skip_all)]
    pub async fn request_password_reset(
        &self,
        request: &PasswordResetRequest,
    ) -> Result<(), AppError> {
        self.api.post_json_empty(REQUEST_PASSWORD_RESET, request).await
    }

    /// # Errors
    /// Returns an error if the token is expired or invalid, or the call fails.
    #[instrument(skip_all)]
    pub async fn reset_password(&self, request: &ResetPasswordRequest) -> Result<(), AppError> {
        self.api.post_json_empty(RESET_PASSWORD, request).await
    }

    /// Fetches the current session; `None` when signed out.
    ///
    /// # Errors
    /// Returns an error on transport failure or an unreadable body.
    #[instrument(skip(self))]
    pub async fn get_session(&self) -> Result<Option<Session>, AppError> {
        let Some(body) = self.api.get_optional_json::<Value>(&self.session_path).await? else {
            return Ok(None);
        };
        Session::from_value(body)
            .map_err(|err| AppError::Parse(format!("Failed to decode session: {err}")))
    }
}
