use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

// ============ Entity Collection Models ============

/// One dynamic-column definition carried by an imported list.
///
/// `name` is the custom-field key, `label` the header text the list import
/// assigned to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldLabel {
    /// Custom-field key.
    pub name: String,
    /// Header text shown for the column.
    pub label: String,
}

/// A note attached to an entity by an agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Free-text note content.
    pub content: String,
    /// Display name of the author.
    #[serde(default)]
    pub created_by: Option<String>,
    /// Timestamp of creation.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// One Lead, Customer, or Depositor record.
///
/// `custom_fields` keys vary per imported list; the rendered header set is a
/// function of the loaded collection, not a fixed contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    /// Opaque identifier assigned by the API.
    #[serde(alias = "_id")]
    pub id: String,
    /// Current status, drawn from the entity kind's fixed option set.
    #[serde(default)]
    pub status: String,
    /// Provenance of the bulk import that produced this record.
    #[serde(default)]
    pub original_list_name: String,
    /// Ordered dynamic column schema declared by the imported list.
    #[serde(default)]
    pub original_list_labels: Vec<FieldLabel>,
    /// Per-list dynamic attributes; keys vary per imported list.
    #[serde(default)]
    pub custom_fields: serde_json::Map<String, Value>,
    /// Notes in creation order.
    #[serde(default)]
    pub notes: Vec<Note>,
    /// Timestamp of creation.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Conjunctive list filter. `search` matches case-insensitively across
/// standard fields or any custom-field value; `status` matches exactly.
/// Empty strings disable the respective clause.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    pub search: String,
    pub status: String,
}

// ============ Entity Kinds ============

/// How an entity kind's status mutation is shaped on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusUpdateStyle {
    /// `POST {collection}/:id/notes` with `{status, note?}`.
    NotesPost,
    /// `PATCH {collection}/:id/status` with `{status}`.
    StatusPatch,
}

/// A cross-entity transition an entity kind supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// Operation name as exposed to callers.
    pub name: &'static str,
    /// Path suffix appended to `{collection}/:id/`.
    pub path_suffix: &'static str,
}

/// The three entity collections the controller pattern is instantiated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Lead,
    Customer,
    Depositor,
}

impl EntityKind {
    /// Base path of the kind's collection.
    pub fn collection_path(&self) -> &'static str {
        match self {
            EntityKind::Lead => "/leads",
            EntityKind::Customer => "/customers",
            EntityKind::Depositor => "/depositors",
        }
    }

    /// Human-readable singular label.
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Lead => "Lead",
            EntityKind::Customer => "Customer",
            EntityKind::Depositor => "Depositor",
        }
    }

    /// The fixed status option set rendered in the kind's status selector.
    pub fn status_options(&self) -> &'static [&'static str] {
        match self {
            EntityKind::Lead => &[
                "New",
                "No Answer",
                "Voice Mail",
                "Call Back",
                "Not Interested",
                "Qualified",
            ],
            EntityKind::Customer => &[
                "Active",
                "No Answer",
                "Voice Mail",
                "Call Back",
                "Deposit Pending",
                "Closed",
            ],
            EntityKind::Depositor => &["Active", "Deposited", "Redeposit", "Withdrawn", "Closed"],
        }
    }

    /// Wire shape of a status mutation for this kind.
    pub fn status_update_style(&self) -> StatusUpdateStyle {
        match self {
            // Leads and customers fold status changes into the notes endpoint
            EntityKind::Lead | EntityKind::Customer => StatusUpdateStyle::NotesPost,
            EntityKind::Depositor => StatusUpdateStyle::StatusPatch,
        }
    }

    /// Cross-entity transitions this kind supports.
    pub fn transitions(&self) -> &'static [Transition] {
        match self {
            EntityKind::Lead => &[],
            EntityKind::Customer => &[
                Transition {
                    name: "release",
                    path_suffix: "release",
                },
                Transition {
                    name: "move-to-depositors",
                    path_suffix: "move-to-depositors",
                },
            ],
            EntityKind::Depositor => &[Transition {
                name: "release-to-customers",
                path_suffix: "release-to-customers",
            }],
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============ Appointments ============

fn default_module() -> String {
    "Manual".to_string()
}

/// A calendar appointment, merged from `/meetings` and upstream providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    /// Opaque identifier assigned by the API (or the providing module).
    #[serde(alias = "_id")]
    pub id: String,
    /// Title shown in grid cells and the summary.
    pub title: String,
    /// Calendar day, date-only to avoid timezone drift.
    pub date: NaiveDate,
    /// Optional time-of-day text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    /// Optional free-text notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Provenance tag: "Manual" entries are user-deletable, others are
    /// read-only projections from other modules.
    #[serde(default = "default_module")]
    pub module: String,
}

/// Payload for creating an appointment via the modal form.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAppointment {
    pub title: String,
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub module: String,
}

// ============ Dashboard ============

/// One month of the lead-count trend series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyTrend {
    pub year: i32,
    pub month: u32,
    pub count: u64,
}

/// Precomputed statistics delivered by the API.
///
/// The client is a pure rendering consumer; it never recomputes these from
/// raw entity lists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    #[serde(default)]
    pub total_leads: u64,
    /// Status name to lead count.
    #[serde(default)]
    pub status_breakdown: HashMap<String, u64>,
    /// Ordered oldest-first.
    #[serde(default)]
    pub monthly_trends: Vec<MonthlyTrend>,
    /// Optional per-agent breakdowns, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_breakdown: Option<Value>,
}

// ============ Admin Surface ============

/// A CRM user account as listed on the admin page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: String,
}

/// Payload for registering a new user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: String,
}

/// A custom lead-field definition managed on the fields admin page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDef {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    pub label: String,
}
