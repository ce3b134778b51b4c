//! Site map service
//!
//! Maps are created through a multipart upload carrying the map `name` and
//! the `image` file; the form's boundary content type replaces the JSON
//! default for that request only.

use reqwest::multipart::{Form, Part};
use std::path::Path;

use super::{FieldMap, ListParams, Resource, ResourceClient};
use crate::client::{ApiClient, ClientError, ClientResult};
use crate::models::{Page, SiteMap};

pub static MAPS: Resource = Resource {
    name: "map",
    collection: "/maps/",
    fields: FieldMap::IDENTITY,
    required: &["name"],
};

/// Image file attached to a map upload
#[derive(Debug, Clone)]
pub struct MapImage {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl MapImage {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Read an image from disk
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "map".to_string());
        Ok(Self { file_name, bytes })
    }

    /// MIME type guessed from the file extension
    pub fn mime(&self) -> &'static str {
        let ext = Path::new(&self.file_name)
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase());
        match ext.as_deref() {
            Some("png") => "image/png",
            Some("jpg") | Some("jpeg") => "image/jpeg",
            Some("gif") => "image/gif",
            Some("webp") => "image/webp",
            Some("svg") => "image/svg+xml",
            _ => "application/octet-stream",
        }
    }
}

/// Payload for uploading a map
#[derive(Debug, Clone)]
pub struct NewSiteMap {
    pub name: String,
    pub image: MapImage,
}

impl NewSiteMap {
    fn into_form(self) -> ClientResult<Form> {
        MAPS.validate_required(&serde_json::json!({ "name": self.name }))?;
        if self.image.bytes.is_empty() {
            return Err(ClientError::Validation("map: image is required".to_string()));
        }

        let mime = self.image.mime();
        let image = Part::bytes(self.image.bytes)
            .file_name(self.image.file_name)
            .mime_str(mime)
            .map_err(|e| ClientError::RequestConfig(e.to_string()))?;

        Ok(Form::new().text("name", self.name).part("image", image))
    }
}

#[derive(Clone)]
pub struct MapService {
    inner: ResourceClient<SiteMap>,
}

impl MapService {
    pub fn new(api: ApiClient) -> Self {
        Self {
            inner: ResourceClient::new(api, &MAPS),
        }
    }

    pub async fn list(&self, params: &ListParams) -> ClientResult<Page<SiteMap>> {
        self.inner.list(params).await
    }

    /// Upload a new map
    pub async fn create(&self, map: NewSiteMap) -> ClientResult<SiteMap> {
        let result = match map.into_form() {
            Ok(form) => self.inner.api().post_multipart(MAPS.collection, form).await,
            Err(e) => Err(e),
        };
        if let Err(e) = &result {
            tracing::error!(resource = MAPS.name, operation = "create", error = %e, "Map upload failed");
        }
        result
    }
}
