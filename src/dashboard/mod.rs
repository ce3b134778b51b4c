//! Dashboard
//!
//! Headline counters, the critical work order list and recent tickets.
//!
//! - **mapper**: Backend shape to UI shape conversions
//!
//! Data comes from a [`DashboardSource`]. The backend has no dashboard
//! endpoint yet, so [`FixtureDashboard`] serves canned data behind a
//! simulated delay.

pub mod mapper;

pub use mapper::{
    map_kpis, map_ticket, map_work_order, ApiKpis, ApiTicketSummary, ApiWorkOrderSummary,
    KpiCard, StatusTone, UiTicket, UiWorkOrder,
};

use async_trait::async_trait;
use std::time::Duration;

use crate::client::ClientResult;
use crate::config::DashboardConfig;

/// Where dashboard data comes from
#[async_trait]
pub trait DashboardSource: Send + Sync {
    async fn kpis(&self) -> ClientResult<ApiKpis>;

    async fn critical_work_orders(&self) -> ClientResult<Vec<ApiWorkOrderSummary>>;

    async fn recent_tickets(&self) -> ClientResult<Vec<ApiTicketSummary>>;
}

/// Canned dashboard data
#[derive(Debug, Clone)]
pub struct FixtureDashboard {
    latency: Duration,
}

impl FixtureDashboard {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }

    pub fn from_config(config: &DashboardConfig) -> Self {
        Self::new(Duration::from_millis(config.fixture_latency_ms))
    }

    async fn delay(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

impl Default for FixtureDashboard {
    fn default() -> Self {
        Self::from_config(&DashboardConfig::default())
    }
}

#[async_trait]
impl DashboardSource for FixtureDashboard {
    async fn kpis(&self) -> ClientResult<ApiKpis> {
        self.delay().await;
        Ok(ApiKpis {
            pending_approval: 4,
            high_priority: 2,
            in_progress: 7,
            open_tickets: 12,
        })
    }

    async fn critical_work_orders(&self) -> ClientResult<Vec<ApiWorkOrderSummary>> {
        self.delay().await;
        Ok(vec![
            work_order(
                "uuid-1",
                "Check motor overheating",
                "Hydraulic Press P-05",
                "Awaiting Approval",
                1,
                "Unassigned",
                "2025-10-24T14:10:00Z",
            ),
            work_order(
                "uuid-2",
                "Pressure sensor failure",
                "Air Compressor C-101",
                "In Progress",
                1,
                "João Silva",
                "2025-10-24T11:30:00Z",
            ),
            work_order(
                "uuid-3",
                "Unusual noise on conveyor belt",
                "Conveyor E-22",
                "Open",
                2,
                "Unassigned",
                "2025-10-23T17:00:00Z",
            ),
            work_order(
                "uuid-4",
                "Oil leak in hydraulic unit",
                "Hydraulic Pump B-52",
                "On Hold",
                2,
                "Carlos Pereira",
                "2025-10-23T15:45:00Z",
            ),
            work_order(
                "uuid-5",
                "Weekly preventive maintenance",
                "Industrial Oven F-01",
                "Open",
                3,
                "Ana Carolina Souza",
                "2025-10-23T09:00:00Z",
            ),
        ])
    }

    async fn recent_tickets(&self) -> ClientResult<Vec<ApiTicketSummary>> {
        self.delay().await;
        Ok(vec![
            ticket("uuid-t1", "HMI panel not responding", "Roberto Andrade", "3 min ago"),
            ticket("uuid-t2", "Emergency light blinking", "Lúcia Martins", "25 min ago"),
            ticket("uuid-t3", "Storeroom door does not lock", "Fernando Costa", "1 hour ago"),
        ])
    }
}

fn work_order(
    id: &str,
    title: &str,
    asset: &str,
    status: &str,
    priority: i64,
    assigned: &str,
    created: &str,
) -> ApiWorkOrderSummary {
    ApiWorkOrderSummary {
        id: id.to_string(),
        title_text: Some(title.to_string()),
        asset_name: Some(asset.to_string()),
        current_status: Some(status.to_string()),
        priority_level: Some(priority),
        assigned_user_name: Some(assigned.to_string()),
        creation_date: Some(created.to_string()),
    }
}

fn ticket(id: &str, title: &str, requester: &str, age: &str) -> ApiTicketSummary {
    ApiTicketSummary {
        id: id.to_string(),
        title: Some(title.to_string()),
        requester_name: Some(requester.to_string()),
        time_since_creation: Some(age.to_string()),
    }
}

/// Dashboard data mapped for display
pub struct DashboardService<S> {
    source: S,
}

impl<S: DashboardSource> DashboardService<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub async fn summary(&self) -> ClientResult<Vec<KpiCard>> {
        let kpis = self.source.kpis().await.map_err(|e| {
            tracing::error!(resource = "dashboard", error = %e, "Loading KPIs failed");
            e
        })?;
        Ok(map_kpis(&kpis))
    }

    pub async fn critical_work_orders(&self) -> ClientResult<Vec<UiWorkOrder>> {
        let orders = self.source.critical_work_orders().await.map_err(|e| {
            tracing::error!(resource = "dashboard", error = %e, "Loading critical work orders failed");
            e
        })?;
        Ok(orders.into_iter().map(map_work_order).collect())
    }

    pub async fn recent_tickets(&self) -> ClientResult<Vec<UiTicket>> {
        let tickets = self.source.recent_tickets().await.map_err(|e| {
            tracing::error!(resource = "dashboard", error = %e, "Loading recent tickets failed");
            e
        })?;
        Ok(tickets.into_iter().map(map_ticket).collect())
    }
}
