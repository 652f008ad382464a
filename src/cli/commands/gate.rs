use crate::gate::{
    policy::{DEFAULT_PROTECTED_ROUTES, DEFAULT_PUBLIC_ROUTES},
    session::DEFAULT_SESSION_PATH,
};
use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};

pub const ARG_UPSTREAM: &str = "upstream";
pub const ARG_SESSION_PATH: &str = "session-path";
pub const ARG_SESSION_TIMEOUT_SECONDS: &str = "session-timeout-seconds";
pub const ARG_UPSTREAM_CONNECT_TIMEOUT_SECONDS: &str = "upstream-connect-timeout-seconds";
pub const ARG_PUBLIC_ROUTES: &str = "public-routes";
pub const ARG_PROTECTED_ROUTES: &str = "protected-routes";

#[derive(Debug)]
pub struct Options {
    pub upstream: String,
    pub session_path: String,
    pub session_timeout_seconds: u64,
    pub upstream_connect_timeout_seconds: u64,
    pub public_routes: Vec<String>,
    pub protected_routes: Vec<String>,
}

impl Options {
    /// # Errors
    /// Returns an error if a required argument is missing.
    pub fn parse(matches: &clap::ArgMatches) -> Result<Self> {
        let upstream = matches
            .get_one::<String>(ARG_UPSTREAM)
            .cloned()
            .context("missing required argument: --upstream")?;
        let session_path = matches
            .get_one::<String>(ARG_SESSION_PATH)
            .cloned()
            .unwrap_or_else(|| DEFAULT_SESSION_PATH.to_string());
        let session_timeout_seconds = matches
            .get_one::<u64>(ARG_SESSION_TIMEOUT_SECONDS)
            .copied()
            .unwrap_or(5);
        let upstream_connect_timeout_seconds = matches
            .get_one::<u64>(ARG_UPSTREAM_CONNECT_TIMEOUT_SECONDS)
            .copied()
            .unwrap_or(5);

        Ok(Self {
            upstream,
            session_path,
            session_timeout_seconds,
            upstream_connect_timeout_seconds,
            public_routes: routes(matches, ARG_PUBLIC_ROUTES),
            protected_routes: routes(matches, ARG_PROTECTED_ROUTES),
        })
    }
}

fn routes(matches: &clap::ArgMatches, id: &str) -> Vec<String> {
    matches
        .get_many::<String>(id)
        .map(|values| {
            values
                .map(|route| route.trim().to_string())
                .filter(|route| !route.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_UPSTREAM)
                .short('u')
                .long(ARG_UPSTREAM)
                .help("Upstream application URL, also serving the identity API, example: http://127.0.0.1:3000")
                .env("CAMBIGO_UPSTREAM_URL")
                .required(true),
        )
        .arg(
            Arg::new(ARG_SESSION_PATH)
                .long(ARG_SESSION_PATH)
                .help("Session verification path on the upstream")
                .env("CAMBIGO_SESSION_PATH")
                .default_value(DEFAULT_SESSION_PATH),
        )
        .arg(
            Arg::new(ARG_SESSION_TIMEOUT_SECONDS)
                .long(ARG_SESSION_TIMEOUT_SECONDS)
                .help("Timeout for one session verification call, in seconds")
                .env("CAMBIGO_SESSION_TIMEOUT_SECONDS")
                .default_value("5")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_UPSTREAM_CONNECT_TIMEOUT_SECONDS)
                .long(ARG_UPSTREAM_CONNECT_TIMEOUT_SECONDS)
                .help("Connect timeout for proxied requests to the upstream, in seconds")
                .env("CAMBIGO_UPSTREAM_CONNECT_TIMEOUT_SECONDS")
                .default_value("5")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_PUBLIC_ROUTES)
                .long(ARG_PUBLIC_ROUTES)
                .help("Comma separated routes served without a session")
                .env("CAMBIGO_PUBLIC_ROUTES")
                .action(ArgAction::Append)
                .value_delimiter(',')
                .default_values(DEFAULT_PUBLIC_ROUTES),
        )
        .arg(
            Arg::new(ARG_PROTECTED_ROUTES)
                .long(ARG_PROTECTED_ROUTES)
                .help("Comma separated route prefixes that require a session")
                .env("CAMBIGO_PROTECTED_ROUTES")
                .action(ArgAction::Append)
                .value_delimiter(',')
                .default_values(DEFAULT_PROTECTED_ROUTES),
        )
}
