//! Maps parsed CLI arguments to the action the binary runs.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::gate;
use anyhow::Result;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let options = gate::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        upstream: options.upstream,
        session_path: options.session_path,
        session_timeout_seconds: options.session_timeout_seconds,
        upstream_connect_timeout_seconds: options.upstream_connect_timeout_seconds,
        public_routes: options.public_routes,
        protected_routes: options.protected_routes,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;

    #[test]
    fn server_action_from_env() {
        temp_env::with_vars(
            [
                ("CAMBIGO_PORT", Some("9090")),
                ("CAMBIGO_UPSTREAM_URL", Some("http://127.0.0.1:3000")),
                ("CAMBIGO_SESSION_PATH", None),
                ("CAMBIGO_SESSION_TIMEOUT_SECONDS", None),
                ("CAMBIGO_UPSTREAM_CONNECT_TIMEOUT_SECONDS", None),
                ("CAMBIGO_PUBLIC_ROUTES", Some("/, /login ,,/signup")),
                ("CAMBIGO_PROTECTED_ROUTES", Some("/flow")),
            ],
            || {
                let matches = commands::new().get_matches_from(vec!["cambigo"]);
                let action = handler(&matches);
                assert!(action.is_ok());
                let Ok(Action::Server(args)) = action else {
                    return;
                };
                assert_eq!(args.port, 9090);
                assert_eq!(args.upstream, "http://127.0.0.1:3000");
                assert_eq!(args.session_path, "/api/auth/session");
                assert_eq!(args.session_timeout_seconds, 5);
                assert_eq!(args.upstream_connect_timeout_seconds, 5);
                assert_eq!(args.public_routes, vec!["/", "/login", "/signup"]);
                assert_eq!(args.protected_routes, vec!["/flow"]);
            },
        );
    }

    #[test]
    fn flags_override_env() {
        temp_env::with_vars(
            [
                ("CAMBIGO_UPSTREAM_URL", Some("http://127.0.0.1:3000")),
                ("CAMBIGO_PROTECTED_ROUTES", Some("/flow")),
            ],
            || {
                let matches = commands::new().get_matches_from(vec![
                    "cambigo",
                    "--upstream",
                    "https://app.cambigo.com",
                    "--protected-routes",
                    "/admin",
                ]);
                let Ok(Action::Server(args)) = handler(&matches) else {
                    panic!("expected a server action");
                };
                assert_eq!(args.upstream, "https://app.cambigo.com");
                assert_eq!(args.protected_routes, vec!["/admin"]);
            },
        );
    }

    #[test]
    fn session_and_connect_timeouts_are_independent() {
        temp_env::with_vars(
            [
                ("CAMBIGO_UPSTREAM_URL", Some("http://127.0.0.1:3000")),
                ("CAMBIGO_SESSION_TIMEOUT_SECONDS", Some("2")),
                ("CAMBIGO_UPSTREAM_CONNECT_TIMEOUT_SECONDS", None),
            ],
            || {
                let matches = commands::new().get_matches_from(vec![
                    "cambigo",
                    "--upstream-connect-timeout-seconds",
                    "30",
                ]);
                let Ok(Action::Server(args)) = handler(&matches) else {
                    panic!("expected a server action");
                };
                assert_eq!(args.session_timeout_seconds, 2);
                assert_eq!(args.upstream_connect_timeout_seconds, 30);
            },
        );
    }
}
