use crate::models::{Appointment, FieldLabel};
use chrono::NaiveDate;
use serde::Serialize;

/// Notification severity for transient on-screen alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// One rendered table cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Cell {
    /// Plain text.
    Text { value: String },
    /// The entity carries no value for this column; rendered "-".
    Missing,
    /// Click-to-call rendering: masked display text plus the full
    /// normalized number for the call action.
    Phone { display: String, dial: String },
}

/// Status selector cell: current value plus the kind's fixed option set.
#[derive(Debug, Clone, Serialize)]
pub struct StatusCell {
    pub current: String,
    pub options: Vec<String>,
}

/// One entity row: dynamic custom-field cells, status selector, created date.
#[derive(Debug, Clone, Serialize)]
pub struct RowView {
    pub id: String,
    pub cells: Vec<Cell>,
    /// Absent for tables without a status column (admin pages).
    pub status: Option<StatusCell>,
    pub created: Option<String>,
}

/// A full table: data-derived header plus one row per filtered entity.
#[derive(Debug, Clone, Serialize)]
pub struct TableView {
    /// Singular label of what the rows are ("Customer", "User", ...).
    pub kind_label: String,
    pub columns: Vec<FieldLabel>,
    pub rows: Vec<RowView>,
}

/// One cell of the 6×7 month grid.
#[derive(Debug, Clone, Serialize)]
pub struct DayCell {
    pub date: NaiveDate,
    /// False for the leading/trailing padding cells from adjacent months.
    pub in_month: bool,
    pub titles: Vec<String>,
}

/// A month grid; `cells` always holds exactly 42 entries, Sunday-first.
#[derive(Debug, Clone, Serialize)]
pub struct MonthGrid {
    pub year: i32,
    pub month: u32,
    pub cells: Vec<DayCell>,
}

/// Appointments grouped under one calendar day.
#[derive(Debug, Clone, Serialize)]
pub struct DayGroup {
    pub date: NaiveDate,
    pub items: Vec<Appointment>,
}

/// One page of the grouped appointment summary.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryPage {
    /// Clamped into `[1, total_pages]`.
    pub page: usize,
    pub total_pages: usize,
    pub groups: Vec<DayGroup>,
}

/// Presentation-ready dashboard values; all derivation already done.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub total_leads: u64,
    /// Percentage in `[0, 100]`.
    pub qualified_rate: u32,
    /// Month-over-month percent; `None` when the trend is too short or the
    /// previous month had no leads.
    pub growth: Option<i64>,
    /// Status badges in the fixed designer order, zeros included.
    pub badges: Vec<(String, u64)>,
}

/// The seam to the host UI.
///
/// The original client wrote straight into the DOM; everything behind this
/// trait is that external collaborator. Implementations must be cheap and
/// synchronous: controllers call them from the UI task after every state
/// change.
pub trait Renderer: Send + Sync {
    fn render_table(&self, table: &TableView);
    fn render_month(&self, grid: &MonthGrid);
    fn render_summary(&self, summary: &SummaryPage);
    fn render_dashboard(&self, dashboard: &DashboardView);
    /// Transient notification, auto-dismissed by the host after a fixed
    /// interval.
    fn notify(&self, severity: Severity, message: &str);
    /// The session died; the host must route to its unauthenticated view.
    fn session_expired(&self);
}

/// Plain-text renderer for the headless binary.
pub struct StdoutRenderer;

impl Renderer for StdoutRenderer {
    fn render_table(&self, table: &TableView) {
        let header: Vec<&str> = table.columns.iter().map(|c| c.label.as_str()).collect();
        println!("{} list | {} | Status | Created", table.kind_label, header.join(" | "));
        for row in &table.rows {
            let cells: Vec<String> = row
                .cells
                .iter()
                .map(|cell| match cell {
                    Cell::Text { value } => value.clone(),
                    Cell::Missing => "-".to_string(),
                    Cell::Phone { display, dial } => format!("{} (call {})", display, dial),
                })
                .collect();
            println!(
                "{} | {} | {} | {}",
                row.id,
                cells.join(" | "),
                row.status.as_ref().map(|s| s.current.as_str()).unwrap_or("-"),
                row.created.as_deref().unwrap_or("-"),
            );
        }
    }

    fn render_month(&self, grid: &MonthGrid) {
        println!("Calendar {}-{:02}", grid.year, grid.month);
        for week in grid.cells.chunks(7) {
            let days: Vec<String> = week
                .iter()
                .map(|cell| {
                    let day = cell.date.format("%d").to_string();
                    if cell.titles.is_empty() {
                        day
                    } else {
                        format!("{}({})", day, cell.titles.len())
                    }
                })
                .collect();
            println!("  {}", days.join(" "));
        }
    }

    fn render_summary(&self, summary: &SummaryPage) {
        println!("Appointments page {}/{}", summary.page, summary.total_pages);
        for group in &summary.groups {
            println!("  {}", group.date);
            for appt in &group.items {
                println!(
                    "    {} [{}]{}",
                    appt.title,
                    appt.module,
                    appt.time.as_deref().map(|t| format!(" at {}", t)).unwrap_or_default(),
                );
            }
        }
    }

    fn render_dashboard(&self, dashboard: &DashboardView) {
        println!("Total leads: {}", dashboard.total_leads);
        println!("Qualified rate: {}%", dashboard.qualified_rate);
        match dashboard.growth {
            Some(pct) => println!("Monthly growth: {:+}%", pct),
            None => println!("Monthly growth: n/a"),
        }
        for (status, count) in &dashboard.badges {
            println!("  {}: {}", status, count);
        }
    }

    fn notify(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Info => tracing::info!("{}", message),
            Severity::Warning => tracing::warn!("{}", message),
            Severity::Error => tracing::error!("{}", message),
        }
    }

    fn session_expired(&self) {
        println!("Session expired, please log in again.");
    }
}
