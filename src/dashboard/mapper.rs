//! Dashboard Mapper
//!
//! Pure, total conversions from the backend's dashboard shapes to the shapes
//! the dashboard renders. Missing input fields become `None`; nothing here
//! can fail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::WorkOrderStatus;

// ============ Backend shapes ============

/// Headline counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiKpis {
    #[serde(default)]
    pub pending_approval: u32,
    #[serde(default)]
    pub high_priority: u32,
    #[serde(default)]
    pub in_progress: u32,
    #[serde(default)]
    pub open_tickets: u32,
}

/// Work order row of the critical list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiWorkOrderSummary {
    pub id: String,
    pub title_text: Option<String>,
    pub asset_name: Option<String>,
    pub current_status: Option<String>,
    pub priority_level: Option<i64>,
    pub assigned_user_name: Option<String>,
    /// RFC 3339 instant
    pub creation_date: Option<String>,
}

/// Ticket row of the recent list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiTicketSummary {
    pub id: String,
    pub title: Option<String>,
    pub requester_name: Option<String>,
    pub time_since_creation: Option<String>,
}

// ============ UI shapes ============

/// One headline card
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiCard {
    pub id: &'static str,
    pub title: &'static str,
    pub value: u32,
    pub color: &'static str,
    pub icon: &'static str,
}

/// Color and icon for a status badge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusTone {
    pub color: &'static str,
    pub icon: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UiWorkOrder {
    pub id: String,
    pub title: Option<String>,
    pub asset: Option<String>,
    pub status: Option<String>,
    pub priority: Option<i64>,
    pub assigned_to: Option<String>,
    pub created_date: Option<DateTime<Utc>>,
    pub status_tone: StatusTone,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UiTicket {
    pub id: String,
    pub title: Option<String>,
    pub requester: Option<String>,
    pub time_since_creation: Option<String>,
}

// ============ Conversions ============

pub fn map_kpis(kpis: &ApiKpis) -> Vec<KpiCard> {
    vec![
        KpiCard {
            id: "pending",
            title: "Work Orders Awaiting Approval",
            value: kpis.pending_approval,
            color: "warning",
            icon: "patch-question-fill",
        },
        KpiCard {
            id: "priority",
            title: "High Priority Work Orders",
            value: kpis.high_priority,
            color: "danger",
            icon: "exclamation-triangle-fill",
        },
        KpiCard {
            id: "progress",
            title: "Work Orders In Progress",
            value: kpis.in_progress,
            color: "info",
            icon: "gear-wide-connected",
        },
        KpiCard {
            id: "tickets",
            title: "Open Tickets",
            value: kpis.open_tickets,
            color: "primary",
            icon: "ticket-detailed-fill",
        },
    ]
}

pub fn map_work_order(order: ApiWorkOrderSummary) -> UiWorkOrder {
    let status_tone = status_tone(order.current_status.as_deref());
    UiWorkOrder {
        id: order.id,
        title: order.title_text,
        asset: order.asset_name,
        status: order.current_status,
        priority: order.priority_level,
        assigned_to: order.assigned_user_name,
        created_date: order.creation_date.as_deref().and_then(parse_instant),
        status_tone,
    }
}

pub fn map_ticket(ticket: ApiTicketSummary) -> UiTicket {
    UiTicket {
        id: ticket.id,
        title: ticket.title,
        requester: ticket.requester_name,
        time_since_creation: ticket.time_since_creation,
    }
}

/// Badge tone for a status code or label
pub fn status_tone(status: Option<&str>) -> StatusTone {
    let (color, icon) = match status.map(WorkOrderStatus::parse_loose) {
        Some(WorkOrderStatus::AwaitingApproval) => ("warning", "hourglass-split"),
        Some(WorkOrderStatus::Open) => ("primary", "folder2-open"),
        Some(WorkOrderStatus::InProgress) => ("info", "gear-wide-connected"),
        Some(WorkOrderStatus::OnHold) => ("secondary", "pause-circle"),
        Some(WorkOrderStatus::Completed) => ("success", "check-circle-fill"),
        Some(WorkOrderStatus::Closed) => ("dark", "archive"),
        Some(WorkOrderStatus::Other(_)) | None => ("light", "question-circle"),
    };
    StatusTone { color, icon }
}

fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
