//! Route policy shared by the edge gate and the client-side session guard.
//!
//! Both layers call [`RouteTable::classify`] and [`decide`] so a path that the
//! edge redirects is the same path the rendered page refuses to show.

use crate::gate::session::Session;
use url::{form_urlencoded, Url};

pub const LOGIN_PATH: &str = "/login";
pub const REDIRECT_PARAM: &str = "redirect";
pub const DEFAULT_RETURN_PATH: &str = "/flow/dashboard";

pub const DEFAULT_PUBLIC_ROUTES: [&str; 6] = [
    "/",
    "/login",
    "/signup",
    "/forgot-password",
    "/reset-password",
    "/api/auth",
];

pub const DEFAULT_PROTECTED_ROUTES: [&str; 2] = ["/settings", "/flow"];

const STATIC_PREFIXES: [&str; 2] = ["/_next/static", "/_next/image"];
const STATIC_EXTENSIONS: [&str; 6] = [".svg", ".png", ".jpg", ".jpeg", ".gif", ".webp"];

/// Access class of a request path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Public,
    Protected,
}

/// Outcome for a path once the session state is known.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Redirect(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteTable {
    public: Vec<String>,
    protected: Vec<String>,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new(DEFAULT_PUBLIC_ROUTES, DEFAULT_PROTECTED_ROUTES)
    }
}

impl RouteTable {
    #[must_use]
    pub fn new<P, Q>(public: P, protected: Q) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
        Q: IntoIterator,
        Q::Item: Into<String>,
    {
        Self {
            public: public.into_iter().map(Into::into).collect(),
            protected: protected.into_iter().map(Into::into).collect(),
        }
    }

    /// Classify a request path.
    ///
    /// Public entries match exactly or as a `<entry>/` prefix and win over
    /// protected entries, which match as a plain prefix. Paths on neither list
    /// are public.
    #[must_use]
    pub fn classify(&self, path: &str) -> Access {
        if is_static_asset(path) {
            return Access::Public;
        }

        let is_public = self.public.iter().any(|route| {
            path == route
                || path
                    .strip_prefix(route.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        });
        if is_public {
            return Access::Public;
        }

        if self
            .protected
            .iter()
            .any(|route| path.starts_with(route.as_str()))
        {
            Access::Protected
        } else {
            Access::Public
        }
    }
}

/// Canonical form of a request path, the one that is classified and forwarded.
///
/// `.` and `..` segments, percent-encoded or not, are resolved with the same
/// URL rules the proxy uses to build the upstream URL, and runs of `/` are
/// collapsed.
#[must_use]
pub fn normalize_path(path: &str) -> Option<String> {
    let mut url = Url::parse("http://cambigo.invalid/").ok()?;
    url.set_path(path);

    let mut normalized = String::with_capacity(url.path().len());
    for ch in url.path().chars() {
        if ch == '/' && normalized.ends_with('/') {
            continue;
        }
        normalized.push(ch);
    }
    Some(normalized)
}

/// Decide what to do with a protected path given the verified session.
#[must_use]
pub fn decide(path: &str, session: Option<&Session>) -> Decision {
    match session {
        Some(_) => Decision::Allow,
        None => Decision::Redirect(login_redirect(path)),
    }
}

/// Build `/login?redirect=<path>`; the encoded parameter decodes back to `path`.
#[must_use]
pub fn login_redirect(path: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair(REDIRECT_PARAM, path)
        .finish();
    format!("{LOGIN_PATH}?{query}")
}

/// Resolve where to send the user after signing in.
///
/// Only local absolute paths are honored; anything else falls back to the
/// dashboard.
#[must_use]
pub fn return_path(query: Option<&str>) -> String {
    query
        .and_then(|query| {
            form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
                .find(|(key, _)| key == REDIRECT_PARAM)
                .map(|(_, value)| value.into_owned())
        })
        .filter(|target| is_local_path(target))
        .unwrap_or_else(|| DEFAULT_RETURN_PATH.to_string())
}

fn is_local_path(target: &str) -> bool {
    target.starts_with('/') && !target.starts_with("//") && !target.starts_with("/\\")
}

fn is_static_asset(path: &str) -> bool {
    if STATIC_PREFIXES
        .iter()
        .any(|prefix| path == *prefix || path.starts_with(&format!("{prefix}/")))
    {
        return true;
    }
    if path == "/favicon.ico" {
        return true;
    }
    let lower = path.to_ascii_lowercase();
    STATIC_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::session::User;

    fn session() -> Session {
        Session {
            user: User {
                id: "1".to_string(),
                email: Some("test@example.com".to_string()),
                name: Some("Test User".to_string()),
                image: None,
                email_verified: false,
            },
            session: None,
        }
    }

    fn decoded_redirect(target: &str) -> Option<String> {
        let (path, query) = target.split_once('?')?;
        assert_eq!(path, LOGIN_PATH);
        form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == REDIRECT_PARAM)
            .map(|(_, value)| value.into_owned())
    }

    #[test]
    fn public_routes_match_exactly_or_with_trailing_segment() {
        let routes = RouteTable::default();
        for path in [
            "/",
            "/login",
            "/signup",
            "/forgot-password",
            "/reset-password",
            "/api/auth",
            "/api/auth/session",
            "/api/auth/sign-in/email",
        ] {
            assert_eq!(routes.classify(path), Access::Public, "{path}");
        }
    }

    #[test]
    fn protected_routes_match_as_prefix() {
        let routes = RouteTable::default();
        for path in ["/settings", "/flow", "/flow/dashboard", "/flowchart", "/settings/profile"] {
            assert_eq!(routes.classify(path), Access::Protected, "{path}");
        }
    }

    #[test]
    fn unlisted_paths_are_public() {
        let routes = RouteTable::default();
        assert_eq!(routes.classify("/pricing"), Access::Public);
        assert_eq!(routes.classify("/health"), Access::Public);
    }

    #[test]
    fn login_prefix_does_not_leak_to_similar_paths() {
        let routes = RouteTable::new(["/login"], ["/login-history"]);
        assert_eq!(routes.classify("/login"), Access::Public);
        assert_eq!(routes.classify("/login-history"), Access::Protected);
    }

    #[test]
    fn static_assets_bypass_the_gate() {
        let routes = RouteTable::default();
        assert_eq!(routes.classify("/flow/logo.png"), Access::Public);
        assert_eq!(routes.classify("/favicon.ico"), Access::Public);
        assert_eq!(routes.classify("/_next/static/chunk.js"), Access::Public);
        assert_eq!(routes.classify("/flow/dashboard.json"), Access::Protected);
    }

    #[test]
    fn dot_segments_resolve_before_classification() {
        let routes = RouteTable::default();
        for (raw, expected) in [
            ("/x/../settings", "/settings"),
            ("/./settings", "/settings"),
            ("/a/%2e%2e/flow/dashboard", "/flow/dashboard"),
            ("/a/.%2E/flow", "/flow"),
            ("/login/../settings", "/settings"),
            ("//settings", "/settings"),
            ("/flow/./a//b", "/flow/a/b"),
        ] {
            let normalized = normalize_path(raw);
            assert_eq!(normalized.as_deref(), Some(expected), "{raw}");
            assert_eq!(
                normalized.map(|path| routes.classify(&path)),
                Some(routes.classify(expected)),
                "{raw}"
            );
        }
    }

    #[test]
    fn normalized_paths_are_stable() {
        for path in ["/", "/settings", "/flow/dashboard", "/api/auth/sign-in/email"] {
            assert_eq!(normalize_path(path).as_deref(), Some(path));
        }
        let once = normalize_path("/x/../flow/a b");
        assert_eq!(once.as_deref(), Some("/flow/a%20b"));
        assert_eq!(once.as_deref().and_then(normalize_path), once);
    }

    #[test]
    fn decide_allows_a_session_and_redirects_without_one() {
        assert_eq!(decide("/settings", Some(&session())), Decision::Allow);
        assert_eq!(
            decide("/settings", None),
            Decision::Redirect(login_redirect("/settings"))
        );
    }

    #[test]
    fn login_redirect_round_trips_the_exact_path() {
        for path in ["/settings", "/flow/dashboard", "/flow/a b", "/flow/x&redirect=/evil"] {
            let target = login_redirect(path);
            assert_eq!(decoded_redirect(&target).as_deref(), Some(path));
        }
    }

    #[test]
    fn login_redirect_is_stable() {
        assert_eq!(login_redirect("/flow/dashboard"), login_redirect("/flow/dashboard"));
    }

    #[test]
    fn return_path_reads_the_redirect_parameter() {
        assert_eq!(return_path(Some("redirect=%2Fsettings")), "/settings");
        assert_eq!(return_path(Some("?redirect=/flow/dashboard")), "/flow/dashboard");
    }

    #[test]
    fn return_path_defaults_and_rejects_foreign_targets() {
        assert_eq!(return_path(None), DEFAULT_RETURN_PATH);
        assert_eq!(return_path(Some("")), DEFAULT_RETURN_PATH);
        assert_eq!(return_path(Some("redirect=https://evil.tld")), DEFAULT_RETURN_PATH);
        assert_eq!(return_path(Some("redirect=//evil.tld")), DEFAULT_RETURN_PATH);
        assert_eq!(return_path(Some("redirect=%2F%5Cevil.tld")), DEFAULT_RETURN_PATH);
    }
}
