//! Resource Services
//!
//! One module per backend resource, all built on [`ResourceClient`]:
//!
//! - **auth**: Login, profile, logout
//! - **tickets**: User-reported issues
//! - **work_orders**: Maintenance work
//! - **locations**: Places pinned on site maps
//! - **maps**: Site map uploads
//!
//! A [`Resource`] describes an endpoint once: its collection path, the
//! [`FieldMap`] applied to outgoing payloads and the fields a create needs.
//! Every operation logs its failure with the resource name and hands the
//! error back unchanged.

pub mod auth;
pub mod locations;
pub mod maps;
pub mod tickets;
pub mod work_orders;

pub use auth::AuthService;
pub use locations::LocationService;
pub use maps::MapService;
pub use tickets::TicketService;
pub use work_orders::WorkOrderService;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::marker::PhantomData;

use crate::client::{ApiClient, ClientError, ClientResult};
use crate::models::Page;

// ============ Field translation ============

/// UI key to backend key table for outgoing payloads
#[derive(Debug, Clone, Copy)]
pub struct FieldMap(&'static [(&'static str, &'static str)]);

impl FieldMap {
    /// No renaming
    pub const IDENTITY: FieldMap = FieldMap(&[]);

    pub const fn new(pairs: &'static [(&'static str, &'static str)]) -> Self {
        FieldMap(pairs)
    }

    /// Backend name of a UI key
    pub fn backend_key<'a>(&self, ui_key: &'a str) -> &'a str {
        self.0
            .iter()
            .find(|(ui, _)| *ui == ui_key)
            .map(|(_, backend)| *backend)
            .unwrap_or(ui_key)
    }

    /// Rename the top-level keys of an object payload.
    ///
    /// The UI key never survives; when both spellings are present the UI
    /// value wins. Non-object payloads pass through untouched.
    pub fn translate(&self, payload: Value) -> Value {
        match payload {
            Value::Object(mut object) => {
                for (ui, backend) in self.0 {
                    if let Some(value) = object.remove(*ui) {
                        object.insert((*backend).to_string(), value);
                    }
                }
                Value::Object(object)
            }
            other => other,
        }
    }
}

// ============ Resource descriptor ============

/// Static description of a REST resource
#[derive(Debug)]
pub struct Resource {
    /// Name used in logs and error messages
    pub name: &'static str,
    /// Collection path relative to the API root, with trailing slash
    pub collection: &'static str,
    pub fields: FieldMap,
    /// Backend keys that must be present and non-blank on create
    pub required: &'static [&'static str],
}

impl Resource {
    /// Path of one record; a blank id is rejected before any request
    pub fn detail_path(&self, id: &str) -> ClientResult<String> {
        if id.trim().is_empty() {
            return Err(ClientError::Validation(format!(
                "{} id is required",
                self.name
            )));
        }
        Ok(format!("{}{}/", self.collection, urlencoding::encode(id)))
    }

    /// Serialize and translate an outgoing payload
    pub fn prepare<P: Serialize + ?Sized>(&self, payload: &P) -> ClientResult<Value> {
        let value = serde_json::to_value(payload)
            .map_err(|e| ClientError::RequestConfig(format!("{}: {}", self.name, e)))?;
        Ok(self.fields.translate(value))
    }

    /// Check the required fields of a translated create payload
    pub fn validate_required(&self, payload: &Value) -> ClientResult<()> {
        for field in self.required {
            let present = match payload.get(*field) {
                None | Some(Value::Null) => false,
                Some(Value::String(s)) => !s.trim().is_empty(),
                Some(_) => true,
            };
            if !present {
                return Err(ClientError::Validation(format!(
                    "{}: {} is required",
                    self.name, field
                )));
            }
        }
        Ok(())
    }
}

// ============ Query parameters ============

/// Query string of a list call
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ListParams(BTreeMap<String, String>);

impl ListParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(self, page: u32) -> Self {
        self.filter("page", page.to_string())
    }

    pub fn page_size(self, size: u32) -> Self {
        self.filter("page_size", size.to_string())
    }

    pub fn search(self, term: impl Into<String>) -> Self {
        self.filter("search", term)
    }

    /// Field to order by; prefix with `-` for descending
    pub fn ordering(self, field: impl Into<String>) -> Self {
        self.filter("ordering", field)
    }

    /// Arbitrary backend filter such as `status=open`
    pub fn filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ============ Generic resource client ============

/// The uniform operation set over one resource
pub struct ResourceClient<R> {
    api: ApiClient,
    resource: &'static Resource,
    _record: PhantomData<fn() -> R>,
}

impl<R> Clone for ResourceClient<R> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            resource: self.resource,
            _record: PhantomData,
        }
    }
}

impl<R: DeserializeOwned> ResourceClient<R> {
    pub fn new(api: ApiClient, resource: &'static Resource) -> Self {
        Self {
            api,
            resource,
            _record: PhantomData,
        }
    }

    pub fn resource(&self) -> &'static Resource {
        self.resource
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// GET the collection
    pub async fn list(&self, params: &ListParams) -> ClientResult<Page<R>> {
        let result = if params.is_empty() {
            self.api.get(self.resource.collection).await
        } else {
            self.api
                .get_with_query(self.resource.collection, params)
                .await
        };
        self.report("list", result)
    }

    /// GET one record
    pub async fn get_by_id(&self, id: &str) -> ClientResult<R> {
        let result = match self.resource.detail_path(id) {
            Ok(path) => self.api.get(&path).await,
            Err(e) => Err(e),
        };
        self.report("get", result)
    }

    /// POST a new record after checking its required fields
    pub async fn create<P: Serialize + ?Sized>(&self, payload: &P) -> ClientResult<R> {
        let result = match self.prepare_create(payload) {
            Ok(body) => self.api.post(self.resource.collection, &body).await,
            Err(e) => Err(e),
        };
        self.report("create", result)
    }

    /// PATCH part of a record
    pub async fn update<P: Serialize + ?Sized>(&self, id: &str, partial: &P) -> ClientResult<R> {
        let prepared = self
            .resource
            .detail_path(id)
            .and_then(|path| Ok((path, self.resource.prepare(partial)?)));
        let result = match prepared {
            Ok((path, body)) => self.api.patch(&path, &body).await,
            Err(e) => Err(e),
        };
        self.report("update", result)
    }

    /// DELETE one record
    pub async fn delete(&self, id: &str) -> ClientResult<()> {
        let result = match self.resource.detail_path(id) {
            Ok(path) => self
                .api
                .delete::<Option<serde::de::IgnoredAny>>(&path)
                .await
                .map(|_| ()),
            Err(e) => Err(e),
        };
        self.report("delete", result)
    }

    fn prepare_create<P: Serialize + ?Sized>(&self, payload: &P) -> ClientResult<Value> {
        let body = self.resource.prepare(payload)?;
        self.resource.validate_required(&body)?;
        Ok(body)
    }

    /// Log a failed operation and pass the result through
    fn report<T>(&self, operation: &str, result: ClientResult<T>) -> ClientResult<T> {
        if let Err(e) = &result {
            match e {
                ClientError::Validation(_) => {
                    tracing::warn!(resource = self.resource.name, operation, error = %e, "Rejected before sending");
                }
                _ => {
                    tracing::error!(resource = self.resource.name, operation, error = %e, "Request failed");
                }
            }
        }
        result
    }
}
