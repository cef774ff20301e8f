//! Route table, protected-route guard and history stack
//!
//! Only paths under a protected prefix (`/account`) need a session. Every
//! other page, the upload flow included, is open to guests.

use iris_common::events::{EventBus, IrisEvent};
use iris_common::{time, ContentType};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

use crate::session::SessionStore;

/// Pages the client knows how to show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Home,
    Login,
    Register,
    /// `/predict` or `/predict/:type`
    Predict(Option<ContentType>),
    Guide,
    HowItWorks,
    IntroduceDima,
    Account,
}

impl Route {
    /// Match a normalized path; `None` for paths with no page
    pub fn parse(path: &str) -> Option<Route> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            [] => Some(Route::Home),
            ["login"] => Some(Route::Login),
            ["register"] => Some(Route::Register),
            ["predict"] => Some(Route::Predict(None)),
            ["predict", kind] => kind.parse().ok().map(|t| Route::Predict(Some(t))),
            ["guide"] => Some(Route::Guide),
            ["how-it-works"] => Some(Route::HowItWorks),
            ["introduce-dima"] => Some(Route::IntroduceDima),
            ["account", ..] => Some(Route::Account),
            _ => None,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Login => "/login".to_string(),
            Route::Register => "/register".to_string(),
            Route::Predict(None) => "/predict".to_string(),
            Route::Predict(Some(t)) => format!("/predict/{}", t),
            Route::Guide => "/guide".to_string(),
            Route::HowItWorks => "/how-it-works".to_string(),
            Route::IntroduceDima => "/introduce-dima".to_string(),
            Route::Account => "/account".to_string(),
        }
    }
}

/// Leading slash, no trailing slash, no query or fragment
fn normalize(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default().trim();
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", trimmed)
    }
}

/// Decides which paths need an authenticated session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationGuard {
    pub protected_prefixes: Vec<String>,
}

impl Default for NavigationGuard {
    fn default() -> Self {
        Self {
            protected_prefixes: vec!["/account".to_string()],
        }
    }
}

impl NavigationGuard {
    /// Prefix match on whole segments: `/account` covers `/account/settings`
    /// but not `/accounting`
    pub fn is_protected(&self, path: &str) -> bool {
        let path = normalize(path);
        self.protected_prefixes.iter().any(|prefix| {
            let prefix = normalize(prefix);
            path == prefix || path.starts_with(&format!("{}/", prefix))
        })
    }
}

/// One history entry
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub path: String,
    /// Data handed to the next page, e.g. `{"username": ...}` after login
    pub state: Option<Value>,
}

impl Location {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            state: None,
        }
    }

    pub fn route(&self) -> Option<Route> {
        Route::parse(&self.path)
    }
}

#[derive(Debug, Clone)]
struct History {
    entries: Vec<Location>,
}

impl History {
    fn current(&self) -> Location {
        self.entries.last().cloned().unwrap_or_else(|| Location::new("/"))
    }
}

/// History stack with the guard applied on every transition
#[derive(Clone)]
pub struct Navigator {
    history: Arc<watch::Sender<History>>,
    guard: NavigationGuard,
    session: SessionStore,
    events: EventBus,
}

impl Navigator {
    /// Start at `/`
    pub fn new(session: SessionStore, guard: NavigationGuard) -> Self {
        let events = session.events().clone();
        let (tx, _) = watch::channel(History {
            entries: vec![Location::new("/")],
        });
        Self {
            history: Arc::new(tx),
            guard,
            session,
            events,
        }
    }

    /// Push a new entry (subject to the guard)
    pub fn push(&self, path: &str, state: Option<Value>) -> Location {
        self.go(path, state, false)
    }

    /// Replace the current entry (subject to the guard)
    pub fn replace(&self, path: &str, state: Option<Value>) -> Location {
        self.go(path, state, true)
    }

    /// Pop the current entry; stays put at the first entry
    pub fn back(&self) -> Option<Location> {
        let mut moved = None;
        self.history.send_modify(|history| {
            if history.entries.len() > 1 {
                history.entries.pop();
                moved = Some(history.current());
            }
        });
        if let Some(location) = &moved {
            self.announce(&location.path, false);
        }
        moved
    }

    pub fn current(&self) -> Location {
        self.history.borrow().current()
    }

    pub fn current_route(&self) -> Option<Route> {
        self.current().route()
    }

    /// Number of entries on the history stack
    pub fn depth(&self) -> usize {
        self.history.borrow().entries.len()
    }

    pub fn guard(&self) -> &NavigationGuard {
        &self.guard
    }

    /// Where a request for `path` ends up, and whether it replaces history
    fn resolve(&self, path: &str, state: Option<Value>, replace: bool) -> (Location, bool) {
        let path = normalize(path);

        if self.guard.is_protected(&path) && !self.session.is_authenticated() {
            debug!(path = %path, "Protected route without session, redirecting to login");
            let state = serde_json::json!({ "from": path });
            return (
                Location {
                    path: Route::Login.path(),
                    state: Some(state),
                },
                true,
            );
        }

        if Route::parse(&path).is_none() {
            debug!(path = %path, "Unknown route, redirecting home");
            return (Location::new(Route::Home.path()), true);
        }

        (Location { path, state }, replace)
    }

    fn go(&self, path: &str, state: Option<Value>, replace: bool) -> Location {
        let (location, replace) = self.resolve(path, state, replace);
        let applied = location.clone();
        self.history.send_modify(|history| {
            if replace {
                history.entries.pop();
            }
            history.entries.push(applied);
        });
        self.announce(&location.path, replace);
        location
    }

    fn announce(&self, path: &str, replace: bool) {
        self.events.emit(IrisEvent::Navigated {
            path: path.to_string(),
            replace,
            timestamp: time::now(),
        });
    }
}
