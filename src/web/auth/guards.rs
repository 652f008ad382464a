//! Client-side session guard for protected pages.
//!
//! The edge gate already redirects anonymous requests; this guard covers pages
//! served from cache or reached by client navigation. It uses the same
//! [`decide`] policy so both layers compute the same login target.

use super::client::AuthClient;
use crate::gate::{
    policy::{decide, Decision},
    session::{Session, User},
};
use tracing::{error, info};

/// What the session-fetching collaborator currently knows.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub data: Option<Session>,
    pub is_pending: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Pending,
    Authenticated,
    Unauthenticated,
}

impl SessionSnapshot {
    #[must_use]
    pub const fn pending() -> Self {
        Self {
            data: None,
            is_pending: true,
        }
    }

    #[must_use]
    pub const fn resolved(data: Option<Session>) -> Self {
        Self {
            data,
            is_pending: false,
        }
    }

    /// Fetch the session once and resolve the snapshot. Failures resolve to
    /// "no session".
    pub async fn fetch(client: &AuthClient) -> Self {
        match client.get_session().await {
            Ok(data) => Self::resolved(data),
            Err(err) => {
                error!("Failed to fetch session: {err}");
                Self::resolved(None)
            }
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        match (&self.data, self.is_pending) {
            (_, true) => SessionState::Pending,
            (Some(_), false) => SessionState::Authenticated,
            (None, false) => SessionState::Unauthenticated,
        }
    }

    #[must_use]
    pub fn user(&self) -> Option<&User> {
        self.data.as_ref().map(|session| &session.user)
    }
}

/// What a guarded page may show for a snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuardView<'a> {
    /// Loading indicator only.
    Loading,
    /// Nothing; navigation to login is pending.
    Hidden,
    Content(&'a User),
}

/// Client-side navigation, the router of the hosting UI.
pub trait Navigator {
    fn push(&mut self, path: &str);
    /// Re-run server data loading for the current route.
    fn refresh(&mut self);
}

pub struct SessionGuard {
    path: String,
    redirected: bool,
}

impl SessionGuard {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            redirected: false,
        }
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Pure render decision, never navigates.
    #[must_use]
    pub fn render<'a>(&self, snapshot: &'a SessionSnapshot) -> GuardView<'a> {
        match snapshot.state() {
            SessionState::Pending => GuardView::Loading,
            SessionState::Unauthenticated => GuardView::Hidden,
            SessionState::Authenticated => snapshot
                .user()
                .map_or(GuardView::Hidden, GuardView::Content),
        }
    }

    /// Run after each snapshot change. Navigates to login exactly once per
    /// unauthenticated episode and returns whether it did.
    pub fn sync(&mut self, snapshot: &SessionSnapshot, navigator: &mut impl Navigator) -> bool {
        match snapshot.state() {
            SessionState::Pending => false,
            SessionState::Authenticated => {
                self.redirected = false;
                false
            }
            SessionState::Unauthenticated => {
                if self.redirected {
                    return false;
                }
                match decide(&self.path, snapshot.data.as_ref()) {
                    Decision::Redirect(target) => {
                        info!(path = %self.path, location = %target, "no session, navigating to login");
                        navigator.push(&target);
                        self.redirected = true;
                        true
                    }
                    Decision::Allow => false,
                }
            }
        }
    }
}

/// What a page does once sign-out succeeds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AfterSignOut {
    Refresh,
    Navigate(String),
}

/// Sign out and apply `after`. Failures are logged and swallowed; the guard
/// keeps showing the still-authenticated session.
pub async fn sign_out(
    client: &AuthClient,
    after: &AfterSignOut,
    navigator: &mut impl Navigator,
) -> bool {
    match client.sign_out().await {
        Ok(()) => {
            match after {
                AfterSignOut::Refresh => navigator.refresh(),
                AfterSignOut::Navigate(path) => navigator.push(path),
            }
            true
        }
        Err(err) => {
            error!("Failed to sign out: {err}");
            false
        }
    }
}
