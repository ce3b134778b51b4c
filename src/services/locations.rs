//! Location service

use serde::Serialize;

use super::{FieldMap, ListParams, Resource, ResourceClient};
use crate::client::{ApiClient, ClientResult};
use crate::models::{Location, Page};

pub static LOCATIONS: Resource = Resource {
    name: "location",
    collection: "/locations/",
    fields: FieldMap::new(&[
        ("mapId", "map"),
        ("xCoordinate", "x_coordinate"),
        ("yCoordinate", "y_coordinate"),
    ]),
    required: &["name"],
};

/// Payload for creating a location, optionally pinned on a map
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLocation {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_coordinate: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_coordinate: Option<i64>,
}

#[derive(Clone)]
pub struct LocationService {
    inner: ResourceClient<Location>,
}

impl LocationService {
    pub fn new(api: ApiClient) -> Self {
        Self {
            inner: ResourceClient::new(api, &LOCATIONS),
        }
    }

    pub async fn list(&self, params: &ListParams) -> ClientResult<Page<Location>> {
        self.inner.list(params).await
    }

    pub async fn create<P: Serialize + ?Sized>(&self, location: &P) -> ClientResult<Location> {
        self.inner.create(location).await
    }
}
