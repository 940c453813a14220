use crate::errors::AppError;
use crate::render::{Renderer, Severity};
use crate::session::{Role, Session};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Cancellation flag handed to a page on activation.
///
/// Switching pages cancels the outgoing token; controllers check it after
/// every await and drop results addressed to a page that is no longer
/// visible.
#[derive(Debug, Clone, Default)]
pub struct ActivationToken(Arc<AtomicBool>);

impl ActivationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Page identifiers the shell can navigate between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Page {
    Dashboard,
    Leads,
    Customers,
    Depositors,
    Calendar,
    Users,
    Fields,
    Upload,
}

impl Page {
    pub fn as_str(&self) -> &'static str {
        match self {
            Page::Dashboard => "dashboard",
            Page::Leads => "leads",
            Page::Customers => "customers",
            Page::Depositors => "depositors",
            Page::Calendar => "calendar",
            Page::Users => "users",
            Page::Fields => "fields",
            Page::Upload => "upload",
        }
    }

    /// The role a session must hold to enter this page, if restricted.
    fn required_role(&self) -> Option<Role> {
        match self {
            Page::Customers | Page::Depositors => Some(Role::Agent),
            Page::Users | Page::Fields => Some(Role::Admin),
            _ => None,
        }
    }
}

/// One page's controller, registered with the shell at startup.
///
/// Registering a new page never requires wrapping existing control flow;
/// the shell dispatches through this table only.
#[async_trait]
pub trait PageController: Send {
    /// The page this controller serves.
    fn page(&self) -> Page;

    /// Loads the page's data and renders it. The token is this activation's;
    /// implementations must re-check it after awaits before mutating state.
    async fn activate(&mut self, token: ActivationToken) -> Result<(), AppError>;

    /// Called when the page is left. The shell has already cancelled the
    /// activation token.
    fn deactivate(&mut self) {}
}

/// State machine over page identifiers.
///
/// Constructed with its dependencies explicitly; there is no ambient lookup.
pub struct NavigationShell {
    session: Session,
    renderer: Arc<dyn Renderer>,
    pages: HashMap<Page, Box<dyn PageController>>,
    active: Option<(Page, ActivationToken)>,
}

impl NavigationShell {
    pub fn new(session: Session, renderer: Arc<dyn Renderer>) -> Self {
        Self {
            session,
            renderer,
            pages: HashMap::new(),
            active: None,
        }
    }

    /// Registers a page controller. Last registration per page wins.
    pub fn register(&mut self, controller: Box<dyn PageController>) {
        self.pages.insert(controller.page(), controller);
    }

    /// The currently visible page.
    pub fn active_page(&self) -> Option<Page> {
        self.active.as_ref().map(|(page, _)| *page)
    }

    /// Applies the role guard: a session lacking the page's required role is
    /// silently redirected to the dashboard.
    fn guard(&self, page: Page) -> Page {
        match page.required_role() {
            Some(required) if self.session.role != required => {
                tracing::debug!(
                    "Role {:?} not allowed on {}, redirecting to dashboard",
                    self.session.role,
                    page.as_str()
                );
                Page::Dashboard
            }
            _ => page,
        }
    }

    /// Transitions to `page`: cancels the outgoing activation, marks the
    /// target active, and invokes its controller's `activate` if one is
    /// registered. Errors stop at this boundary as user-visible alerts.
    pub async fn show(&mut self, page: Page) {
        let target = self.guard(page);

        if let Some((old_page, token)) = self.active.take() {
            token.cancel();
            if let Some(controller) = self.pages.get_mut(&old_page) {
                controller.deactivate();
            }
        }

        let token = ActivationToken::new();
        self.active = Some((target, token.clone()));
        tracing::info!("Showing page: {}", target.as_str());

        let Some(controller) = self.pages.get_mut(&target) else {
            // Pages without data (upload) just show
            return;
        };

        match controller.activate(token).await {
            Ok(()) => {}
            Err(e) if matches!(e.root(), AppError::SessionExpired) => {
                self.active = None;
                self.renderer.session_expired();
            }
            Err(e) => {
                self.renderer.notify(Severity::Error, &e.to_string());
            }
        }
    }

    /// Initial transition after session validation; the short settle delay
    /// lets the host finish wiring before the first paint.
    pub async fn start(&mut self) {
        tokio::time::sleep(Duration::from_millis(50)).await;
        self.show(Page::Dashboard).await;
    }
}
