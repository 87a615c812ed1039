//! Generic response wrapper shared by every Armis REST endpoint

use serde::{Deserialize, Serialize};

use crate::errors::{ArmisError, Result};

/// `{ data, success, count?, next?, prev?, total? }`
///
/// `success=false` on a 2xx response is a logical failure, not a transport
/// one. [`Envelope::into_data`] is the strict accessor; generic callers can
/// inspect [`Envelope::success`] themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Payload; `null` for some update and delete responses
    pub data: T,
    /// Logical outcome reported by the server
    pub success: bool,
    /// Items in this page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
    /// Cursor of the next page, empty or absent on the last one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    /// Cursor of the previous page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev: Option<String>,
    /// Items across all pages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<i64>,
}

impl<T> Envelope<T> {
    /// Wrap `data` in a successful envelope without pagination fields.
    pub fn ok(data: T) -> Self {
        Self { data, success: true, count: None, next: None, prev: None, total: None }
    }

    /// Return `data`, or [`ArmisError::Unsuccessful`] when the server
    /// reported `success=false`.
    pub fn into_data(self) -> Result<T> {
        if self.success {
            Ok(self.data)
        } else {
            Err(ArmisError::Unsuccessful)
        }
    }

    /// Whether the server advertised a further page.
    pub fn has_next(&self) -> bool {
        self.next.as_deref().is_some_and(|next| !next.is_empty())
    }

    /// Transform the payload, keeping the status and pagination fields.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Envelope<U> {
        Envelope {
            data: f(self.data),
            success: self.success,
            count: self.count,
            next: self.next,
            prev: self.prev,
            total: self.total,
        }
    }
}
