//! Applies the route table's guards to live session state.

use crate::guard::{GuardInput, GuardOutcome, evaluate};
use crate::resolver::RoleResolver;
use crate::role::RoleState;
use crate::routes::{Page, RouteTable};
use scholarhub_session::{Identity, SessionContext, SessionSnapshot, SessionStore};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};

/// The result of navigating to a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// No route matches the path.
    NotFound,
    /// A route matched; `guard` says whether its page may render.
    Page {
        page: Page,
        params: Vec<(String, String)>,
        guard: GuardOutcome,
    },
}

impl RouteOutcome {
    /// Returns the guard decision, if a route matched.
    #[must_use]
    pub fn guard(&self) -> Option<&GuardOutcome> {
        match self {
            Self::NotFound => None,
            Self::Page { guard, .. } => Some(guard),
        }
    }
}

impl fmt::Display for RouteOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not found"),
            Self::Page { page, guard, .. } => write!(f, "{page}: {guard}"),
        }
    }
}

/// Decides what a path shows for the current session and role.
#[derive(Clone)]
pub struct RouteGate {
    store: SessionStore,
    resolver: RoleResolver,
    routes: Arc<RouteTable>,
    sign_in_path: String,
}

impl RouteGate {
    #[must_use]
    pub fn new(
        store: SessionStore,
        resolver: RoleResolver,
        routes: RouteTable,
        sign_in_path: &str,
    ) -> Self {
        Self {
            store,
            resolver,
            routes: Arc::new(routes),
            sign_in_path: sign_in_path.to_string(),
        }
    }

    /// Builds a gate over the platform's routes, fetching roles through the
    /// context's secured client.
    #[must_use]
    pub fn from_context(context: &SessionContext) -> Self {
        Self::new(
            context.store().clone(),
            RoleResolver::new(context.secured().clone()),
            RouteTable::scholarhub(),
            context.sign_in_path(),
        )
    }

    #[must_use]
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Returns the decision for `path` right now, without blocking.
    ///
    /// While the role is still being looked up this is `Waiting`; the lookup
    /// is started in the background if a Tokio runtime is available.
    #[must_use]
    pub fn outcome(&self, path: &str) -> RouteOutcome {
        let Some(matched) = self.routes.resolve(path) else {
            return RouteOutcome::NotFound;
        };
        let session = self.store.snapshot();
        let role = if matched.route.needs_role() {
            self.role_now(&session)
        } else {
            RoleState::Unknown
        };

        RouteOutcome::Page {
            page: matched.route.page(),
            guard: evaluate(matched.route.chain(), &self.input(&session, role, path)),
            params: matched.params,
        }
    }

    /// Waits for the session and role to settle, then decides `path`.
    #[instrument(skip(self))]
    pub async fn settle(&self, path: &str) -> RouteOutcome {
        let Some(matched) = self.routes.resolve(path) else {
            return RouteOutcome::NotFound;
        };

        let (session, role) = loop {
            let session = self.store.wait_settled().await;
            let role = if matched.route.needs_role() {
                self.role_for(&session).await
            } else {
                RoleState::Unknown
            };
            // A rejected role request signs the session out; decide again.
            let current = self.store.snapshot();
            if current.epoch() == session.epoch() && current.phase() == session.phase() {
                break (session, role);
            }
            debug!("session changed while resolving role");
        };

        RouteOutcome::Page {
            page: matched.route.page(),
            guard: evaluate(matched.route.chain(), &self.input(&session, role, path)),
            params: matched.params,
        }
    }

    /// Returns the current identity's role once the session has settled.
    pub async fn current_role(&self) -> RoleState {
        let session = self.store.wait_settled().await;
        self.role_for(&session).await
    }

    fn input<'a>(
        &'a self,
        session: &'a SessionSnapshot,
        role: RoleState,
        path: &'a str,
    ) -> GuardInput<'a> {
        GuardInput {
            session,
            role,
            requested_path: path,
            sign_in_path: &self.sign_in_path,
        }
    }

    fn role_now(&self, session: &SessionSnapshot) -> RoleState {
        let Some(identity) = signed_in(session) else {
            return RoleState::Unknown;
        };
        let state = self.resolver.cached(identity, session.epoch());
        if state.is_pending() {
            self.spawn_lookup(identity.clone(), session.epoch());
        }
        state
    }

    async fn role_for(&self, session: &SessionSnapshot) -> RoleState {
        match signed_in(session) {
            Some(identity) => self.resolver.resolve(identity, session.epoch()).await,
            None => RoleState::Unknown,
        }
    }

    fn spawn_lookup(&self, identity: Identity, epoch: u64) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!("no runtime to fetch the role on; staying pending");
            return;
        };
        let resolver = self.resolver.clone();
        runtime.spawn(async move {
            resolver.resolve(&identity, epoch).await;
        });
    }
}

fn signed_in(session: &SessionSnapshot) -> Option<&Identity> {
    session.identity().filter(|_| session.is_authenticated())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forbidden::ForbiddenView;
    use crate::resolver::role_path;
    use scholarhub_session::{
        CLEAR_SESSION_PATH, ClientConfig, HistoryNavigator, ISSUE_SESSION_PATH, Location,
        MemoryIdentityProvider, SIGN_IN_PATH,
    };
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const EMAIL: &str = "ada@example.com";
    const PASSWORD: &str = "pw1234";

    async fn backend(role: ResponseTemplate) -> MockServer {
        let server = MockServer::start().await;
        for endpoint in [ISSUE_SESSION_PATH, CLEAR_SESSION_PATH] {
            Mock::given(method("POST"))
                .and(path(endpoint))
                .respond_with(ResponseTemplate::new(200))
                .mount(&server)
                .await;
        }
        Mock::given(method("GET"))
            .and(path(role_path(EMAIL)))
            .respond_with(role)
            .mount(&server)
            .await;
        server
    }

    async fn start(server: &MockServer) -> (SessionContext, Arc<HistoryNavigator>) {
        let history = Arc::new(HistoryNavigator::default());
        let provider = Arc::new(MemoryIdentityProvider::new().with_account(EMAIL, PASSWORD));
        let context = SessionContext::start(&ClientConfig::new(server.uri()), provider, history.clone())
            .expect("context");
        context.store().wait_settled().await;
        (context, history)
    }

    fn role_body(role: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({ "role": role }))
    }

    #[tokio::test]
    async fn unknown_path_is_not_found() {
        let server = backend(role_body("admin")).await;
        let (context, _) = start(&server).await;
        let gate = RouteGate::from_context(&context);

        assert_eq!(gate.outcome("/missing"), RouteOutcome::NotFound);
        assert_eq!(gate.settle("/missing").await, RouteOutcome::NotFound);
    }

    #[tokio::test]
    async fn anonymous_visitor_is_redirected() {
        let server = backend(role_body("admin")).await;
        let (context, _) = start(&server).await;
        let gate = RouteGate::from_context(&context);

        assert_eq!(
            gate.settle("/wishlist").await.guard(),
            Some(&GuardOutcome::Redirect(Location::with_return_to(
                SIGN_IN_PATH,
                "/wishlist"
            )))
        );
        assert_eq!(
            gate.outcome("/scholarships").guard(),
            Some(&GuardOutcome::Render)
        );
    }

    #[tokio::test]
    async fn pending_role_waits_then_renders() {
        let server = MockServer::start().await;
        for endpoint in [ISSUE_SESSION_PATH, CLEAR_SESSION_PATH] {
            Mock::given(method("POST"))
                .and(path(endpoint))
                .respond_with(ResponseTemplate::new(200))
                .mount(&server)
                .await;
        }
        Mock::given(method("GET"))
            .and(path(role_path(EMAIL)))
            .respond_with(role_body("admin").set_delay(Duration::from_millis(200)))
            .expect(1)
            .mount(&server)
            .await;
        let (context, _) = start(&server).await;
        context.store().sign_in(EMAIL, PASSWORD).await.expect("sign in");
        let gate = RouteGate::from_context(&context);

        assert_eq!(
            gate.outcome("/dashboard/manage-users").guard(),
            Some(&GuardOutcome::Waiting)
        );
        assert_eq!(
            gate.settle("/dashboard/manage-users").await.guard(),
            Some(&GuardOutcome::Render)
        );
        assert_eq!(
            gate.outcome("/dashboard/manage-users").guard(),
            Some(&GuardOutcome::Render)
        );
    }

    #[tokio::test]
    async fn missing_role_is_forbidden() {
        let server = backend(ResponseTemplate::new(200).set_body_json(json!({}))).await;
        let (context, _) = start(&server).await;
        context.store().sign_in(EMAIL, PASSWORD).await.expect("sign in");
        let gate = RouteGate::from_context(&context);

        assert_eq!(
            gate.settle("/dashboard/add-scholarship").await.guard(),
            Some(&GuardOutcome::Forbidden(ForbiddenView::new()))
        );
        assert_eq!(gate.settle("/dashboard/me").await.guard(), Some(&GuardOutcome::Render));
    }

    #[tokio::test]
    async fn student_is_denied_moderator_pages() {
        let server = backend(role_body("student")).await;
        let (context, _) = start(&server).await;
        context.store().sign_in(EMAIL, PASSWORD).await.expect("sign in");
        let gate = RouteGate::from_context(&context);

        assert!(matches!(
            gate.settle("/dashboard/manage-applications").await.guard(),
            Some(GuardOutcome::Forbidden(_))
        ));
        assert_eq!(
            gate.current_role().await,
            RoleState::Known(crate::role::Role::Student)
        );
    }

    #[tokio::test]
    async fn rejected_role_request_signs_out_and_redirects() {
        let server = backend(ResponseTemplate::new(401)).await;
        let (context, history) = start(&server).await;
        context.store().sign_in(EMAIL, PASSWORD).await.expect("sign in");
        let gate = RouteGate::from_context(&context);

        let outcome = gate.settle("/dashboard/manage-users").await;

        assert!(matches!(outcome.guard(), Some(GuardOutcome::Redirect(_))));
        assert!(context.store().snapshot().is_anonymous());
        let redirects = history
            .entries()
            .iter()
            .filter(|l| l.path() == SIGN_IN_PATH)
            .count();
        assert_eq!(redirects, 1);
    }

    #[tokio::test]
    async fn params_are_reported() {
        let server = backend(role_body("admin")).await;
        let (context, _) = start(&server).await;
        context.store().sign_in(EMAIL, PASSWORD).await.expect("sign in");
        let gate = RouteGate::from_context(&context);

        match gate.settle("/dashboard/edit-scholarship/s-42").await {
            RouteOutcome::Page { page, params, guard } => {
                assert_eq!(page, Page::EditScholarship);
                assert_eq!(params, vec![("id".to_string(), "s-42".to_string())]);
                assert_eq!(guard, GuardOutcome::Render);
            }
            RouteOutcome::NotFound => panic!("route should match"),
        }
    }
}
