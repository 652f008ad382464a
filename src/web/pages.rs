//! View models for the home page and the protected dashboard.

use super::auth::{
    guards::{self, AfterSignOut, GuardView, Navigator, SessionGuard, SessionSnapshot},
    AuthClient,
};
use crate::gate::policy::DEFAULT_RETURN_PATH;

pub const HOME_PATH: &str = "/";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DashboardView<'a> {
    Loading,
    Hidden,
    Ready {
        greeting: String,
        email: Option<&'a str>,
        image: Option<&'a str>,
    },
}

pub struct Dashboard {
    guard: SessionGuard,
}

impl Default for Dashboard {
    fn default() -> Self {
        Self::new()
    }
}

impl Dashboard {
    #[must_use]
    pub fn new() -> Self {
        Self {
            guard: SessionGuard::new(DEFAULT_RETURN_PATH),
        }
    }

    #[must_use]
    pub fn render<'a>(&self, snapshot: &'a SessionSnapshot) -> DashboardView<'a> {
        match self.guard.render(snapshot) {
            GuardView::Loading => DashboardView::Loading,
            GuardView::Hidden => DashboardView::Hidden,
            GuardView::Content(user) => DashboardView::Ready {
                greeting: format!("Welcome back, {}!", user.display_name()),
                email: user.email.as_deref(),
                image: user.image.as_deref(),
            },
        }
    }

    pub fn sync(&mut self, snapshot: &SessionSnapshot, navigator: &mut impl Navigator) -> bool {
        self.guard.sync(snapshot, navigator)
    }

    /// Signs out and leaves for the home page.
    pub async fn sign_out(&self, client: &AuthClient, navigator: &mut impl Navigator) -> bool {
        guards::sign_out(
            client,
            &AfterSignOut::Navigate(HOME_PATH.to_string()),
            navigator,
        )
        .await
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HomeView<'a> {
    Loading,
    Anonymous,
    SignedIn { email: Option<&'a str> },
}

/// Public landing page; shows who is signed in when there is a session.
#[derive(Clone, Copy, Debug, Default)]
pub struct Home;

impl Home {
    #[must_use]
    pub fn render(snapshot: &SessionSnapshot) -> HomeView<'_> {
        if snapshot.is_pending {
            return HomeView::Loading;
        }
        snapshot.user().map_or(HomeView::Anonymous, |user| HomeView::SignedIn {
            email: user.email.as_deref(),
        })
    }

    /// Signs out and reloads the current route's data.
    pub async fn sign_out(client: &AuthClient, navigator: &mut impl Navigator) -> bool {
        guards::sign_out(client, &AfterSignOut::Refresh, navigator).await
    }
}
