//! # Cambigo (session-gated edge)
//!
//! `cambigo` sits in front of the Cambigo web application and decides, per
//! request, whether to serve it or send the caller to sign in.
//!
//! ## Edge gate
//!
//! Every path is classified against two static route lists. Public paths are
//! proxied to the upstream without any network round trip. Protected paths are
//! proxied only after the identity collaborator confirms a session by looking
//! at the forwarded `cookie` header; anything else (no user, a failed call, a
//! malformed body) becomes a `307` to `/login?redirect=<path>`.
//!
//! ## Client behavior
//!
//! The [`web`] module holds the logic that protected pages run after they
//! render: the session guard, sign-in and sign-up flows, the settings
//! operations and the photo upload widget. It reuses [`gate::policy`] so the
//! two enforcement layers cannot drift apart.

pub mod cli;
pub mod gate;
pub mod web;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
