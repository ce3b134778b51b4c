//! Backend Records
//!
//! Transient copies of the REST resources. Known fields are typed; anything
//! else the backend sends is kept in `extra` so nothing is lost when a record
//! is edited and sent back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

// ============ Paging ============

/// One page of a list endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PageRepr<T> {
    Envelope {
        #[serde(default)]
        count: Option<u64>,
        #[serde(default)]
        next: Option<String>,
        #[serde(default)]
        previous: Option<String>,
        results: Vec<T>,
    },
    Bare(Vec<T>),
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Page<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match PageRepr::deserialize(deserializer)? {
            PageRepr::Envelope {
                count,
                next,
                previous,
                results,
            } => Page {
                count: count.unwrap_or(results.len() as u64),
                next,
                previous,
                results,
            },
            // Unpaginated endpoints answer with a plain array
            PageRepr::Bare(results) => Page {
                count: results.len() as u64,
                next: None,
                previous: None,
                results,
            },
        })
    }
}

impl<T> Page<T> {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }
}

// ============ Status enumerations ============

macro_rules! loose_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $code:literal, $label:literal;)+ }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $($variant,)+
            /// A value this client does not know about yet
            Other(String),
        }

        impl $name {
            /// Wire code
            pub fn as_str(&self) -> &str {
                match self {
                    $($name::$variant => $code,)+
                    $name::Other(s) => s,
                }
            }

            /// Human-readable label
            pub fn label(&self) -> &str {
                match self {
                    $($name::$variant => $label,)+
                    $name::Other(s) => s,
                }
            }

            /// Match either the wire code or the label, ignoring case
            pub fn parse_loose(s: &str) -> Self {
                let needle = s.trim();
                $(
                    if needle.eq_ignore_ascii_case($code) || needle.eq_ignore_ascii_case($label) {
                        return $name::$variant;
                    }
                )+
                $name::Other(needle.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                match s.as_str() {
                    $($code => $name::$variant,)+
                    _ => $name::Other(s),
                }
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.as_str().to_string()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }
    };
}

loose_enum! {
    /// Lifecycle of a ticket
    TicketStatus {
        Open => "open", "Open";
        Pending => "pending", "Pending";
        Resolved => "resolved", "Resolved";
        Closed => "closed", "Closed";
    }
}

impl Default for TicketStatus {
    fn default() -> Self {
        TicketStatus::Open
    }
}

loose_enum! {
    /// Lifecycle of a work order
    WorkOrderStatus {
        AwaitingApproval => "awaiting_approval", "Awaiting Approval";
        Open => "open", "Open";
        InProgress => "in_progress", "In Progress";
        OnHold => "on_hold", "On Hold";
        Completed => "completed", "Completed";
        Closed => "closed", "Closed";
    }
}

impl Default for WorkOrderStatus {
    fn default() -> Self {
        WorkOrderStatus::AwaitingApproval
    }
}

// ============ Nested references ============

/// Slim user representation nested in tickets and work orders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
}

/// Slim asset representation nested in tickets and work orders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRef {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub asset_tag: Option<String>,
}

// ============ Records ============

/// A user-reported issue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: TicketStatus,
    #[serde(default)]
    pub priority: Option<i64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub requester: Option<UserRef>,
    #[serde(default)]
    pub asset: Option<AssetRef>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A unit of maintenance work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkOrder {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: WorkOrderStatus,
    #[serde(default)]
    pub priority: Option<i64>,
    #[serde(default)]
    pub asset: Option<AssetRef>,
    #[serde(default)]
    pub assigned_to: Option<UserRef>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scheduled_start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A named place, optionally pinned on a site map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Id of the site map the location is pinned on
    #[serde(default)]
    pub map: Option<String>,
    #[serde(default)]
    pub x_coordinate: Option<i64>,
    #[serde(default)]
    pub y_coordinate: Option<i64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An uploaded floor plan or site image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteMap {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ============ Auth ============

/// Login credentials
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

/// Response of the token endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenPair {
    #[serde(default)]
    pub access: Option<String>,
    #[serde(default)]
    pub refresh: Option<String>,
}
