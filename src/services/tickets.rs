//! Ticket service

use serde::Serialize;

use super::{FieldMap, ListParams, Resource, ResourceClient};
use crate::client::{ApiClient, ClientResult};
use crate::models::{Page, Ticket, TicketStatus};

pub static TICKETS: Resource = Resource {
    name: "ticket",
    collection: "/tickets/",
    fields: FieldMap::new(&[("assetId", "asset_id")]),
    required: &["title", "description"],
};

/// Payload for opening a ticket
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTicket {
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
}

/// Partial ticket edit; unset fields are left alone
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TicketStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
}

#[derive(Clone)]
pub struct TicketService {
    inner: ResourceClient<Ticket>,
}

impl TicketService {
    pub fn new(api: ApiClient) -> Self {
        Self {
            inner: ResourceClient::new(api, &TICKETS),
        }
    }

    pub async fn list(&self, params: &ListParams) -> ClientResult<Page<Ticket>> {
        self.inner.list(params).await
    }

    pub async fn get_by_id(&self, id: &str) -> ClientResult<Ticket> {
        self.inner.get_by_id(id).await
    }

    /// Open a ticket; title and description must be non-blank
    pub async fn create<P: Serialize + ?Sized>(&self, ticket: &P) -> ClientResult<Ticket> {
        self.inner.create(ticket).await
    }

    pub async fn update<P: Serialize + ?Sized>(&self, id: &str, partial: &P) -> ClientResult<Ticket> {
        self.inner.update(id, partial).await
    }

    pub async fn delete(&self, id: &str) -> ClientResult<()> {
        self.inner.delete(id).await
    }
}
