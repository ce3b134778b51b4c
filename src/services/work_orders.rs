//! Work order service

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{FieldMap, ListParams, Resource, ResourceClient};
use crate::client::{ApiClient, ClientResult};
use crate::models::{Page, WorkOrder, WorkOrderStatus};

pub static WORK_ORDERS: Resource = Resource {
    name: "work order",
    collection: "/work-orders/",
    fields: FieldMap::new(&[
        ("assetId", "asset_id"),
        ("assignedToId", "assigned_to_id"),
        ("scheduledStart", "scheduled_start"),
        ("completedAt", "completed_at"),
    ]),
    required: &["title"],
};

/// Payload for creating a work order
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWorkOrder {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_start: Option<DateTime<Utc>>,
}

/// Partial work order edit
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkOrderUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<WorkOrderStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_start: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct WorkOrderService {
    inner: ResourceClient<WorkOrder>,
}

impl WorkOrderService {
    pub fn new(api: ApiClient) -> Self {
        Self {
            inner: ResourceClient::new(api, &WORK_ORDERS),
        }
    }

    pub async fn list(&self, params: &ListParams) -> ClientResult<Page<WorkOrder>> {
        self.inner.list(params).await
    }

    pub async fn get_by_id(&self, id: &str) -> ClientResult<WorkOrder> {
        self.inner.get_by_id(id).await
    }

    pub async fn create<P: Serialize + ?Sized>(&self, work_order: &P) -> ClientResult<WorkOrder> {
        self.inner.create(work_order).await
    }

    pub async fn update<P: Serialize + ?Sized>(
        &self,
        id: &str,
        partial: &P,
    ) -> ClientResult<WorkOrder> {
        self.inner.update(id, partial).await
    }

    pub async fn delete(&self, id: &str) -> ClientResult<()> {
        self.inner.delete(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_work_order_translation() {
        let start = Utc.with_ymd_and_hms(2025, 10, 27, 8, 0, 0).unwrap();
        let order = NewWorkOrder {
            title: "Replace bearing".to_string(),
            asset_id: Some("a-7".to_string()),
            assigned_to_id: Some("u-3".to_string()),
            scheduled_start: Some(start),
            ..Default::default()
        };

        let body = WORK_ORDERS.prepare(&order).unwrap();
        assert_eq!(body["asset_id"], "a-7");
        assert_eq!(body["assigned_to_id"], "u-3");
        assert_eq!(body["scheduled_start"], "2025-10-27T08:00:00Z");
        for ui_key in ["assetId", "assignedToId", "scheduledStart"] {
            assert!(body.get(ui_key).is_none(), "{} leaked", ui_key);
        }
    }

    #[test]
    fn test_completion_update() {
        let done = Utc.with_ymd_and_hms(2025, 10, 28, 17, 30, 0).unwrap();
        let update = WorkOrderUpdate {
            status: Some(WorkOrderStatus::Completed),
            completed_at: Some(done),
            ..Default::default()
        };

        let body = WORK_ORDERS.prepare(&update).unwrap();
        assert_eq!(
            body,
            json!({"status": "completed", "completed_at": "2025-10-28T17:30:00Z"})
        );
    }

    #[test]
    fn test_title_required() {
        let body = WORK_ORDERS.prepare(&NewWorkOrder::default()).unwrap();
        assert!(WORK_ORDERS.validate_required(&body).is_err());
    }
}
