//! Auth feature: identity API client, session guard and the public auth
//! flows. Passwords and reset tokens pass through here and must never be
//! logged.
//!
//! Flow overview: login and signup post credentials, the identity API sets the
//! session cookie, and the page navigates to the `redirect` target it was
//! opened with. Protected pages fetch the session and hand each snapshot to a
//! [`SessionGuard`].

pub mod client;
pub mod flows;
pub mod guards;
pub mod types;

pub use self::client::AuthClient;
pub use self::guards::{AfterSignOut, GuardView, Navigator, SessionGuard, SessionSnapshot};
