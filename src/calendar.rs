use crate::errors::{AppError, ResultExt};
use crate::gateway::Gateway;
use crate::models::{Appointment, Entity, NewAppointment};
use crate::render::{DayCell, DayGroup, MonthGrid, Renderer, Severity, SummaryPage};
use crate::shell::{ActivationToken, Page, PageController};
use async_trait::async_trait;
use chrono::{Datelike, Days, NaiveDate, Utc};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Dates per summary page.
pub const SUMMARY_PAGE_SIZE: usize = 5;

/// Provenance tag whose appointments are user-deletable.
pub const MANUAL_MODULE: &str = "Manual";

/// An upstream source of read-only appointments (e.g. lead follow-ups).
#[async_trait]
pub trait AppointmentProvider: Send + Sync {
    async fn collect(&self) -> Result<Vec<Appointment>, AppError>;
}

/// Computes the fixed 6×7 month grid, Sunday-indexed.
///
/// Leading cells pad back to the Sunday on or before the 1st; trailing cells
/// run into the next month so the grid always holds exactly 42 days. Cell
/// membership is a date-only comparison, immune to timezone drift.
pub fn month_grid(appointments: &[Appointment], year: i32, month: u32) -> MonthGrid {
    let month = month.clamp(1, 12);
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .unwrap_or_else(|| NaiveDate::from_ymd_opt(1970, 1, 1).expect("epoch is valid"));
    let lead = first.weekday().num_days_from_sunday() as u64;
    let start = first - Days::new(lead);

    let cells = (0..42u64)
        .map(|offset| {
            let date = start + Days::new(offset);
            DayCell {
                date,
                in_month: date.year() == year && date.month() == month,
                titles: appointments
                    .iter()
                    .filter(|a| a.date == date)
                    .map(|a| a.title.clone())
                    .collect(),
            }
        })
        .collect();

    MonthGrid { year, month, cells }
}

/// Groups appointments by date (ascending) and pages them.
///
/// The requested page is clamped into `[1, total_pages]` on every render so
/// the view survives deletions that shrink the set.
pub fn summarize(appointments: &[Appointment], page: usize) -> SummaryPage {
    let mut by_date: BTreeMap<NaiveDate, Vec<Appointment>> = BTreeMap::new();
    for appt in appointments {
        by_date.entry(appt.date).or_default().push(appt.clone());
    }

    let total_pages = by_date.len().div_ceil(SUMMARY_PAGE_SIZE).max(1);
    let page = page.clamp(1, total_pages);
    let groups = by_date
        .into_iter()
        .skip((page - 1) * SUMMARY_PAGE_SIZE)
        .take(SUMMARY_PAGE_SIZE)
        .map(|(date, items)| DayGroup { date, items })
        .collect();

    SummaryPage {
        page,
        total_pages,
        groups,
    }
}

/// The appointments calendar: a month grid plus a paginated grouped summary.
///
/// Appointments are the unordered union of all providers and `/meetings`;
/// mutations go through the gateway and trigger a full reload, never local
/// cache patching.
pub struct CalendarController {
    gateway: Arc<Gateway>,
    renderer: Arc<dyn Renderer>,
    providers: Vec<Box<dyn AppointmentProvider>>,
    appointments: Vec<Appointment>,
    current: (i32, u32),
    page: usize,
    activation: ActivationToken,
}

impl CalendarController {
    pub fn new(gateway: Arc<Gateway>, renderer: Arc<dyn Renderer>) -> Self {
        let today = Utc::now().date_naive();
        Self {
            gateway,
            renderer,
            providers: Vec::new(),
            appointments: Vec::new(),
            current: (today.year(), today.month()),
            page: 1,
            activation: ActivationToken::new(),
        }
    }

    /// Registers an upstream provider; call before the first load.
    pub fn add_provider(&mut self, provider: Box<dyn AppointmentProvider>) {
        self.providers.push(provider);
    }

    pub fn appointments(&self) -> &[Appointment] {
        &self.appointments
    }

    pub fn current_month(&self) -> (i32, u32) {
        self.current
    }

    /// Merges provider appointments with `/meetings` and re-renders.
    ///
    /// A failing provider degrades to a warning; the calendar still shows
    /// every source that answered.
    pub async fn load(&mut self) -> Result<(), AppError> {
        let mut merged = Vec::new();
        for provider in &self.providers {
            match provider.collect().await {
                Ok(batch) => merged.extend(batch),
                Err(e) => tracing::warn!("Appointment provider failed: {}", e),
            }
        }

        let payload = self
            .gateway
            .get("/meetings")
            .await
            .context("Loading meetings")?;

        if self.activation.is_cancelled() {
            tracing::debug!("Discarding stale calendar load");
            return Ok(());
        }

        let meetings: Vec<Appointment> =
            serde_json::from_value(payload).map_err(|e| AppError::RequestFailed {
                status: 200,
                message: format!("Unexpected meetings payload: {}", e),
            })?;
        merged.extend(meetings);

        for appt in &mut merged {
            if appt.module.is_empty() {
                appt.module = MANUAL_MODULE.to_string();
            }
        }

        tracing::info!("Loaded {} appointments", merged.len());
        self.appointments = merged;
        self.render();
        Ok(())
    }

    pub fn render(&self) {
        let (year, month) = self.current;
        self.renderer
            .render_month(&month_grid(&self.appointments, year, month));
        self.renderer
            .render_summary(&summarize(&self.appointments, self.page));
    }

    /// Jumps the grid to a month and re-renders.
    pub fn show_month(&mut self, year: i32, month: u32) {
        self.current = (year, month.clamp(1, 12));
        self.render();
    }

    pub fn next_month(&mut self) {
        let (year, month) = self.current;
        self.current = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
        self.render();
    }

    pub fn prev_month(&mut self) {
        let (year, month) = self.current;
        self.current = if month == 1 { (year - 1, 12) } else { (year, month - 1) };
        self.render();
    }

    /// Moves the summary to `page`; clamping happens at render time.
    pub fn set_page(&mut self, page: usize) {
        self.page = page.max(1);
        self.render();
    }

    /// Persists a new appointment from the modal form, then reloads.
    pub async fn save(&mut self, appointment: NewAppointment) -> Result<(), AppError> {
        if appointment.title.trim().is_empty() {
            return Err(AppError::ValidationFailed(
                "Appointment title is required".to_string(),
            ));
        }
        let body = json!(appointment);
        if let Err(e) = self.gateway.post("/meetings", &body).await {
            self.renderer.notify(Severity::Error, &e.to_string());
            return Err(e);
        }
        self.load().await
    }

    /// Deletes a manual appointment by id, then reloads. Entries projected
    /// from other modules are read-only summaries.
    pub async fn delete(&mut self, id: &str) -> Result<(), AppError> {
        let Some(appt) = self.appointments.iter().find(|a| a.id == id) else {
            return Err(AppError::ValidationFailed(
                "Unknown appointment id".to_string(),
            ));
        };
        if appt.module != MANUAL_MODULE {
            return Err(AppError::ValidationFailed(format!(
                "{} appointments cannot be deleted here",
                appt.module
            )));
        }
        if let Err(e) = self.gateway.delete(&format!("/meetings/{}", id)).await {
            self.renderer.notify(Severity::Error, &e.to_string());
            return Err(e);
        }
        self.load().await
    }
}

#[async_trait]
impl PageController for CalendarController {
    fn page(&self) -> Page {
        Page::Calendar
    }

    async fn activate(&mut self, token: ActivationToken) -> Result<(), AppError> {
        self.activation = token;
        self.load().await
    }
}

/// Projects lead follow-up dates into the calendar.
///
/// A lead whose custom fields carry a meeting-like date (a field name
/// containing "meeting" or "callback" holding a `YYYY-MM-DD` prefix) shows
/// up as a read-only "Lead" appointment.
pub struct LeadAppointmentProvider {
    gateway: Arc<Gateway>,
}

impl LeadAppointmentProvider {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }

    fn follow_up_date(entity: &Entity) -> Option<NaiveDate> {
        entity.custom_fields.iter().find_map(|(name, value)| {
            let lowered = name.to_lowercase();
            if !lowered.contains("meeting") && !lowered.contains("callback") {
                return None;
            }
            let text = value.as_str()?;
            NaiveDate::parse_from_str(text.get(..10)?, "%Y-%m-%d").ok()
        })
    }
}

#[async_trait]
impl AppointmentProvider for LeadAppointmentProvider {
    async fn collect(&self) -> Result<Vec<Appointment>, AppError> {
        let payload = self.gateway.get("/leads").await?;
        let leads: Vec<Entity> =
            serde_json::from_value(payload).map_err(|e| AppError::RequestFailed {
                status: 200,
                message: format!("Unexpected leads payload: {}", e),
            })?;

        Ok(leads
            .iter()
            .filter_map(|lead| {
                let date = Self::follow_up_date(lead)?;
                let name = lead
                    .custom_fields
                    .get("name")
                    .and_then(|v| v.as_str())
                    .unwrap_or(&lead.id);
                Some(Appointment {
                    id: format!("lead-{}", lead.id),
                    title: format!("Follow up: {}", name),
                    date,
                    time: None,
                    notes: None,
                    module: "Lead".to_string(),
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn appt(id: &str, title: &str, date: (i32, u32, u32), module: &str) -> Appointment {
        Appointment {
            id: id.to_string(),
            title: title.to_string(),
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            time: None,
            notes: None,
            module: module.to_string(),
        }
    }

    #[test]
    fn grid_always_has_42_cells() {
        for (year, month) in [(2024, 2), (2023, 12), (2025, 1), (1999, 6), (2024, 7)] {
            let grid = month_grid(&[], year, month);
            assert_eq!(grid.cells.len(), 42, "{}-{}", year, month);
        }
    }

    #[test]
    fn feb_2024_has_four_leading_january_cells() {
        // 2024-02-01 is a Thursday: weekday index 4 from Sunday
        let grid = month_grid(&[], 2024, 2);
        let leading: Vec<&DayCell> = grid.cells.iter().take(4).collect();
        assert!(leading.iter().all(|c| !c.in_month && c.date.month() == 1));
        assert_eq!(grid.cells[4].date.day(), 1);
        assert!(grid.cells[4].in_month);
    }

    #[test]
    fn trailing_cells_come_from_next_month() {
        let grid = month_grid(&[], 2024, 2);
        // 29 Feb days + 4 leading = 33; the remaining 9 cells are March
        let trailing: Vec<&DayCell> = grid.cells.iter().skip(33).collect();
        assert_eq!(trailing.len(), 9);
        assert!(trailing.iter().all(|c| !c.in_month && c.date.month() == 3));
    }

    #[test]
    fn appointments_land_in_their_day_cell() {
        let appointments = vec![
            appt("1", "Demo call", (2024, 2, 14), "Manual"),
            appt("2", "Deposit review", (2024, 2, 14), "Manual"),
            appt("3", "Other month", (2024, 3, 14), "Manual"),
        ];
        let grid = month_grid(&appointments, 2024, 2);
        let cell = grid
            .cells
            .iter()
            .find(|c| c.in_month && c.date.day() == 14)
            .unwrap();
        assert_eq!(cell.titles, vec!["Demo call", "Deposit review"]);
    }

    #[test]
    fn twelve_dates_paginate_into_three_pages() {
        let appointments: Vec<Appointment> = (1..=12)
            .map(|day| appt(&day.to_string(), "x", (2024, 3, day), "Manual"))
            .collect();
        let summary = summarize(&appointments, 1);
        assert_eq!(summary.total_pages, 3);
        assert_eq!(summary.groups.len(), 5);
    }

    #[test]
    fn out_of_range_page_clamps_to_last() {
        let appointments: Vec<Appointment> = (1..=12)
            .map(|day| appt(&day.to_string(), "x", (2024, 3, day), "Manual"))
            .collect();
        let summary = summarize(&appointments, 5);
        assert_eq!(summary.page, 3);
        assert_eq!(summary.groups.len(), 2);
    }

    #[test]
    fn empty_set_clamps_to_single_empty_page() {
        let summary = summarize(&[], 7);
        assert_eq!(summary.page, 1);
        assert_eq!(summary.total_pages, 1);
        assert!(summary.groups.is_empty());
    }

    #[test]
    fn summary_dates_are_ascending() {
        let appointments = vec![
            appt("1", "later", (2024, 3, 20), "Manual"),
            appt("2", "earlier", (2024, 3, 5), "Manual"),
        ];
        let summary = summarize(&appointments, 1);
        let dates: Vec<NaiveDate> = summary.groups.iter().map(|g| g.date).collect();
        assert!(dates.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn follow_up_date_reads_meeting_like_fields() {
        let mut entity = Entity {
            id: "l1".to_string(),
            status: "New".to_string(),
            original_list_name: String::new(),
            original_list_labels: Vec::new(),
            custom_fields: serde_json::Map::new(),
            notes: Vec::new(),
            created_at: None,
        };
        entity
            .custom_fields
            .insert("meetingDate".to_string(), serde_json::json!("2024-05-01T10:00"));
        assert_eq!(
            LeadAppointmentProvider::follow_up_date(&entity),
            NaiveDate::from_ymd_opt(2024, 5, 1)
        );

        entity.custom_fields.clear();
        entity
            .custom_fields
            .insert("city".to_string(), serde_json::json!("2024-05-01"));
        assert_eq!(LeadAppointmentProvider::follow_up_date(&entity), None);
    }
}
