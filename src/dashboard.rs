use crate::errors::{AppError, ResultExt};
use crate::gateway::Gateway;
use crate::models::{DashboardStats, MonthlyTrend};
use crate::render::{DashboardView, Renderer};
use crate::shell::{ActivationToken, Page, PageController};
use async_trait::async_trait;
use std::sync::Arc;

/// Fixed badge order on the dashboard. Unknown or zero statuses still render
/// with count 0.
pub const STATUS_BADGE_ORDER: [&str; 6] = [
    "New",
    "No Answer",
    "Voice Mail",
    "Call Back",
    "Not Interested",
    "Qualified",
];

/// Share of leads marked Qualified, rounded to whole percent.
///
/// Exactly 0 when there are no leads; never divides by zero.
pub fn qualified_rate(stats: &DashboardStats) -> u32 {
    if stats.total_leads == 0 {
        return 0;
    }
    let qualified = stats
        .status_breakdown
        .get("Qualified")
        .copied()
        .unwrap_or(0);
    // A stale breakdown can briefly disagree with the total; pin to 100
    let rate = (100.0 * qualified as f64 / stats.total_leads as f64).round() as u32;
    rate.min(100)
}

/// Month-over-month growth percent from the last two trend entries.
///
/// `None` when fewer than two entries exist or the previous month count is 0.
pub fn monthly_growth(trends: &[MonthlyTrend]) -> Option<i64> {
    let [.., previous, latest] = trends else {
        return None;
    };
    if previous.count == 0 {
        return None;
    }
    let delta = latest.count as f64 - previous.count as f64;
    Some((100.0 * delta / previous.count as f64).round() as i64)
}

/// Builds the presentation values from API-precomputed statistics.
///
/// Strictly derivation for display; aggregates are never recomputed from raw
/// entity lists client-side.
pub fn dashboard_view(stats: &DashboardStats) -> DashboardView {
    DashboardView {
        total_leads: stats.total_leads,
        qualified_rate: qualified_rate(stats),
        growth: monthly_growth(&stats.monthly_trends),
        badges: STATUS_BADGE_ORDER
            .iter()
            .map(|status| {
                (
                    status.to_string(),
                    stats.status_breakdown.get(*status).copied().unwrap_or(0),
                )
            })
            .collect(),
    }
}

/// Pure rendering consumer of `/dashboard/stats`.
pub struct DashboardController {
    gateway: Arc<Gateway>,
    renderer: Arc<dyn Renderer>,
    stats: Option<DashboardStats>,
    activation: ActivationToken,
}

impl DashboardController {
    pub fn new(gateway: Arc<Gateway>, renderer: Arc<dyn Renderer>) -> Self {
        Self {
            gateway,
            renderer,
            stats: None,
            activation: ActivationToken::new(),
        }
    }

    pub fn stats(&self) -> Option<&DashboardStats> {
        self.stats.as_ref()
    }

    pub async fn load(&mut self) -> Result<(), AppError> {
        let payload = self
            .gateway
            .get("/dashboard/stats")
            .await
            .context("Loading dashboard stats")?;

        if self.activation.is_cancelled() {
            tracing::debug!("Discarding stale dashboard load");
            return Ok(());
        }

        let stats: DashboardStats =
            serde_json::from_value(payload).map_err(|e| AppError::RequestFailed {
                status: 200,
                message: format!("Unexpected dashboard payload: {}", e),
            })?;

        self.renderer.render_dashboard(&dashboard_view(&stats));
        self.stats = Some(stats);
        Ok(())
    }
}

#[async_trait]
impl PageController for DashboardController {
    fn page(&self) -> Page {
        Page::Dashboard
    }

    async fn activate(&mut self, token: ActivationToken) -> Result<(), AppError> {
        self.activation = token;
        self.load().await
    }
}
