//! Route table and navigation guards.
//!
//! Guards are synchronous decisions over the current session: no network,
//! no suspension. A denied navigation is never an error, it is a redirect.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use ori_auth::{Role, RoleRequirement};

use crate::gate::AccessGate;
use crate::session::SessionStore;

pub const ROOT_PATH: &str = "/";
pub const LOGIN_PATH: &str = "/login";
pub const AUTH_PATH: &str = "/auth";
/// Landing page after a successful login.
pub const HOME_PATH: &str = "/auth/dashboard";

const MAX_REDIRECTS: usize = 8;

/// Screens of the admin application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum View {
    Login,
    /// Authenticated shell (navbar, sidebar, start background).
    AuthLayout,
    Dashboard,
    Agreements,
    Snies,
    UploadSpreadsheet,
    Users,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    /// Block the navigation and go here instead.
    Redirect(String),
}

pub trait NavigationGuard: Send + Sync {
    fn check(&self, route: &Route, url: &str) -> GuardDecision;
}

/// Protects a whole section: only asks whether someone is signed in.
///
/// Uses [`SessionStore::is_authenticated`], so an expired session is purged
/// on the way.
pub struct AuthGuard {
    session: Arc<SessionStore>,
    redirect_to: String,
}

impl AuthGuard {
    pub fn new(session: Arc<SessionStore>) -> Self {
        Self {
            session,
            redirect_to: LOGIN_PATH.to_string(),
        }
    }
}

impl NavigationGuard for AuthGuard {
    fn check(&self, _route: &Route, url: &str) -> GuardDecision {
        if self.session.is_authenticated() {
            GuardDecision::Allow
        } else {
            tracing::debug!(url, "not authenticated; redirecting to login");
            GuardDecision::Redirect(self.redirect_to.clone())
        }
    }
}

/// Enforces the route's declared roles. Routes without roles pass.
///
/// Denial sends the user to the root path.
pub struct RoleGuard {
    gate: AccessGate,
}

impl RoleGuard {
    pub fn new(gate: AccessGate) -> Self {
        Self { gate }
    }
}

impl NavigationGuard for RoleGuard {
    fn check(&self, route: &Route, url: &str) -> GuardDecision {
        match self.gate.authorize(route.roles()) {
            Ok(()) => GuardDecision::Allow,
            Err(denied) => {
                tracing::info!(url, reason = %denied, "access denied; redirecting");
                GuardDecision::Redirect(ROOT_PATH.to_string())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Redirect(String),
    View(View),
}

/// One entry of the route table.
///
/// `segment` is a single path segment, `""` (matches only the empty
/// remainder) or `"**"` (matches anything left).
#[derive(Clone)]
pub struct Route {
    segment: String,
    target: Target,
    roles: RoleRequirement,
    guards: Vec<Arc<dyn NavigationGuard>>,
    children: Vec<Route>,
}

impl core::fmt::Debug for Route {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Route")
            .field("segment", &self.segment)
            .field("target", &self.target)
            .field("roles", &self.roles)
            .field("guards", &self.guards.len())
            .field("children", &self.children)
            .finish()
    }
}

impl Route {
    pub fn view(segment: impl Into<String>, view: View) -> Self {
        Self::with_target(segment, Target::View(view))
    }

    /// Redirect to an absolute path.
    pub fn redirect(segment: impl Into<String>, to: impl Into<String>) -> Self {
        Self::with_target(segment, Target::Redirect(to.into()))
    }

    fn with_target(segment: impl Into<String>, target: Target) -> Self {
        Self {
            segment: segment.into(),
            target,
            roles: RoleRequirement::none(),
            guards: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_roles(mut self, roles: RoleRequirement) -> Self {
        self.roles = roles;
        self
    }

    pub fn guarded_by(mut self, guard: Arc<dyn NavigationGuard>) -> Self {
        self.guards.push(guard);
        self
    }

    pub fn with_children(mut self, children: Vec<Route>) -> Self {
        self.children = children;
        self
    }

    /// Declared role requirement (empty when the route declares none).
    pub fn roles(&self) -> &RoleRequirement {
        &self.roles
    }
}

/// Where a navigation ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Navigation {
    pub path: String,
    pub view: View,
    /// Every path visited before `path`, in order.
    pub redirected_from: Vec<String>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NavigationError {
    #[error("no route matches '{0}'")]
    NoRoute(String),

    #[error("too many redirects starting at '{start}'")]
    RedirectLoop { start: String },
}

enum Step {
    Activate(View),
    Redirect(String),
}

#[derive(Debug, Clone)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    /// Resolve `url`, running guards parent-first and following redirects.
    pub fn navigate(&self, url: &str) -> Result<Navigation, NavigationError> {
        let start = normalize(url);
        let mut path = start.clone();
        let mut redirected_from = Vec::new();

        for _ in 0..=MAX_REDIRECTS {
            let segments = segments(&path);
            let chain = match_chain(&self.routes, &segments).ok_or_else(|| NavigationError::NoRoute(path.clone()))?;

            match resolve(&chain, &path) {
                Step::Activate(view) => {
                    tracing::debug!(path = %path, ?view, "navigation activated");
                    return Ok(Navigation {
                        path,
                        view,
                        redirected_from,
                    });
                }
                Step::Redirect(to) => {
                    tracing::debug!(from = %path, to = %to, "navigation redirected");
                    let next = normalize(&to);
                    redirected_from.push(std::mem::replace(&mut path, next));
                }
            }
        }

        tracing::warn!(start = %start, "navigation exceeded redirect limit");
        Err(NavigationError::RedirectLoop { start })
    }
}

fn resolve(chain: &[&Route], url: &str) -> Step {
    for route in chain {
        for guard in &route.guards {
            if let GuardDecision::Redirect(to) = guard.check(route, url) {
                return Step::Redirect(to);
            }
        }
    }

    // `match_chain` never yields an empty chain.
    match chain.last().map(|r| &r.target) {
        Some(Target::View(view)) => Step::Activate(*view),
        Some(Target::Redirect(to)) => Step::Redirect(to.clone()),
        None => Step::Redirect(ROOT_PATH.to_string()),
    }
}

fn match_chain<'r>(routes: &'r [Route], segments: &[&str]) -> Option<Vec<&'r Route>> {
    for route in routes {
        match route.segment.as_str() {
            "**" => return Some(vec![route]),
            "" => {
                if segments.is_empty() {
                    return Some(vec![route]);
                }
            }
            segment => {
                let Some((first, rest)) = segments.split_first() else {
                    continue;
                };
                if *first != segment {
                    continue;
                }
                if rest.is_empty() {
                    return Some(vec![route]);
                }
                if let Some(mut chain) = match_chain(&route.children, rest) {
                    chain.insert(0, route);
                    return Some(chain);
                }
            }
        }
    }
    None
}

/// Drop query/fragment and empty segments; always absolute.
fn normalize(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    format!("/{}", segments(path).join("/"))
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// The admin application's route table.
///
/// Everything under `/auth` requires a session; `cargar-excel` and
/// `usuarios` additionally require roles.
pub fn admin_routes(session: Arc<SessionStore>) -> Router {
    let auth_guard: Arc<dyn NavigationGuard> = Arc::new(AuthGuard::new(Arc::clone(&session)));
    let role_guard: Arc<dyn NavigationGuard> = Arc::new(RoleGuard::new(AccessGate::new(session)));
    let child = |segment: &str, view: View| Route::view(segment, view).guarded_by(Arc::clone(&role_guard));

    Router::new(vec![
        Route::redirect("", LOGIN_PATH),
        Route::view("login", View::Login),
        Route::view("auth", View::AuthLayout)
            .guarded_by(auth_guard)
            .with_children(vec![
                child("dashboard", View::Dashboard),
                child("convenios", View::Agreements),
                child("snies", View::Snies),
                child("cargar-excel", View::UploadSpreadsheet)
                    .with_roles(RoleRequirement::from([Role::Admin, Role::Director])),
                child("usuarios", View::Users).with_roles(RoleRequirement::from([Role::Admin])),
                Route::redirect("**", AUTH_PATH),
            ]),
        Route::redirect("**", LOGIN_PATH),
    ])
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::testing::session_with;

    fn router_for(role: Option<&str>) -> Router {
        admin_routes(session_with(role.map(|role| json!({ "sub": 3, "role": role }))))
    }

    #[test]
    fn root_and_unknown_paths_land_on_login() {
        let router = router_for(None);
        for url in ["/", "", "/nowhere/at/all"] {
            let nav = router.navigate(url).unwrap();
            assert_eq!(nav.path, LOGIN_PATH);
            assert_eq!(nav.view, View::Login);
        }
    }

    #[test]
    fn auth_section_requires_session() {
        let nav = router_for(None).navigate("/auth/dashboard").unwrap();
        assert_eq!(nav.path, LOGIN_PATH);
        assert_eq!(nav.redirected_from, vec!["/auth/dashboard".to_string()]);
    }

    #[test]
    fn unrestricted_children_only_need_a_session() {
        let router = router_for(Some("coordinador"));
        assert_eq!(router.navigate("/auth/dashboard").unwrap().view, View::Dashboard);
        assert_eq!(router.navigate("/auth/convenios").unwrap().view, View::Agreements);
        assert_eq!(router.navigate("/auth/snies").unwrap().view, View::Snies);
        assert_eq!(router.navigate("/auth").unwrap().view, View::AuthLayout);
    }

    #[test]
    fn role_denial_redirects_to_root() {
        let nav = router_for(Some("director")).navigate("/auth/usuarios").unwrap();
        assert_eq!(nav.redirected_from, vec!["/auth/usuarios".to_string(), ROOT_PATH.to_string()]);
        assert_eq!(nav.path, LOGIN_PATH);
    }

    #[test]
    fn role_requirements_per_route() {
        let admin = router_for(Some("admin"));
        assert_eq!(admin.navigate("/auth/usuarios").unwrap().view, View::Users);

        let director = router_for(Some("director"));
        assert_eq!(director.navigate("/auth/cargar-excel").unwrap().view, View::UploadSpreadsheet);

        let coordinator = router_for(Some("coordinador"));
        assert_eq!(coordinator.navigate("/auth/cargar-excel").unwrap().view, View::Login);
    }

    #[test]
    fn unknown_child_falls_back_to_layout() {
        let nav = router_for(Some("admin")).navigate("/auth/reportes").unwrap();
        assert_eq!(nav.path, AUTH_PATH);
        assert_eq!(nav.view, View::AuthLayout);
    }

    #[test]
    fn expired_session_is_purged_by_auth_guard() {
        let session = session_with(Some(json!({ "sub": 3, "role": "admin", "exp": 1 })));
        let router = admin_routes(Arc::clone(&session));

        assert_eq!(router.navigate("/auth/usuarios").unwrap().path, LOGIN_PATH);
        assert!(session.token().is_none());
    }

    #[test]
    fn query_and_fragment_are_ignored() {
        let nav = router_for(Some("admin")).navigate("auth/dashboard/?tab=2#top").unwrap();
        assert_eq!(nav.path, HOME_PATH);
    }

    #[test]
    fn role_guard_passes_routes_without_roles() {
        let guard = RoleGuard::new(AccessGate::new(session_with(None)));
        let route = Route::view("open", View::Dashboard);
        assert_eq!(guard.check(&route, "/open"), GuardDecision::Allow);
    }

    struct Bounce;

    impl NavigationGuard for Bounce {
        fn check(&self, _route: &Route, url: &str) -> GuardDecision {
            GuardDecision::Redirect(url.to_string())
        }
    }

    #[test]
    fn redirect_loops_are_reported() {
        let router = Router::new(vec![Route::view("loop", View::Dashboard).guarded_by(Arc::new(Bounce))]);
        assert_eq!(
            router.navigate("/loop"),
            Err(NavigationError::RedirectLoop { start: "/loop".to_string() })
        );
    }

    #[test]
    fn unmatched_path_without_wildcard_is_an_error() {
        let router = Router::new(vec![Route::view("login", View::Login)]);
        assert_eq!(router.navigate("/other"), Err(NavigationError::NoRoute("/other".to_string())));
    }
}
