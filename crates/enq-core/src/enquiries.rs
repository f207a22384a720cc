//! Enquiry records, list filtering, and the dashboard view-model.
//!
//! The cached list is read-through/write-through: every mutation is
//! confirmed by the backend response before the local cache changes.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::api::{ApiClient, ApiError, Envelope};

/// Lifecycle status of an enquiry. The backend defaults new records to
/// `pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Pending,
    Contacted,
    Resolved,
}

impl Status {
    pub fn all() -> &'static [Status] {
        &[Status::Pending, Status::Contacted, Status::Resolved]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Contacted => "contacted",
            Status::Resolved => "resolved",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(Status::Pending),
            "contacted" => Ok(Status::Contacted),
            "resolved" => Ok(Status::Resolved),
            other => Err(format!(
                "Unknown status '{other}' (expected pending, contacted, or resolved)"
            )),
        }
    }
}

/// Status filter for the list view: everything, or a single status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(Status),
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            Ok(StatusFilter::All)
        } else {
            s.parse().map(StatusFilter::Only)
        }
    }
}

/// A customer-submitted contact request, owned by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enquiry {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    pub enquiry: String,
    #[serde(default)]
    pub status: Status,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Pure counts over a list of enquiries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub total: usize,
    pub pending: usize,
    pub contacted: usize,
    pub resolved: usize,
}

/// Computes status counts for a list.
pub fn stats(enquiries: &[Enquiry]) -> Stats {
    let count = |status| enquiries.iter().filter(|e| e.status == status).count();
    Stats {
        total: enquiries.len(),
        pending: count(Status::Pending),
        contacted: count(Status::Contacted),
        resolved: count(Status::Resolved),
    }
}

/// Filters a list by search term and status.
///
/// The search term matches case-insensitively as a substring of name, email,
/// company (when present), or the enquiry text. `StatusFilter::All` bypasses
/// status matching, so narrowing by status only ever removes records.
pub fn filter<'a>(
    enquiries: &'a [Enquiry],
    search: &str,
    status: StatusFilter,
) -> Vec<&'a Enquiry> {
    let needle = search.to_lowercase();
    enquiries
        .iter()
        .filter(|e| {
            let matches_search = needle.is_empty()
                || e.name.to_lowercase().contains(&needle)
                || e.email.to_lowercase().contains(&needle)
                || e.company
                    .as_deref()
                    .is_some_and(|c| c.to_lowercase().contains(&needle))
                || e.enquiry.to_lowercase().contains(&needle);

            let matches_status = match status {
                StatusFilter::All => true,
                StatusFilter::Only(wanted) => e.status == wanted,
            };

            matches_search && matches_status
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct ListEnvelope {
    success: bool,
    #[serde(default)]
    data: Vec<Enquiry>,
    #[serde(default)]
    error: Option<String>,
}

/// The admin dashboard's list state.
///
/// Owns the cached enquiry list and an optional selected record (the detail
/// view). Mutations go request-confirm-then-apply; the cache never changes
/// on a failed response.
#[derive(Debug)]
pub struct Dashboard {
    client: ApiClient,
    enquiries: Vec<Enquiry>,
    selected: Option<String>,
}

impl Dashboard {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            enquiries: Vec::new(),
            selected: None,
        }
    }

    pub fn enquiries(&self) -> &[Enquiry] {
        &self.enquiries
    }

    pub fn stats(&self) -> Stats {
        stats(&self.enquiries)
    }

    pub fn filtered(&self, search: &str, status: StatusFilter) -> Vec<&Enquiry> {
        filter(&self.enquiries, search, status)
    }

    /// Opens the detail view for a record in the cache.
    pub fn select(&mut self, id: &str) {
        if self.enquiries.iter().any(|e| e.id == id) {
            self.selected = Some(id.to_string());
        }
    }

    pub fn selected(&self) -> Option<&Enquiry> {
        let id = self.selected.as_deref()?;
        self.enquiries.iter().find(|e| e.id == id)
    }

    /// Fetches all enquiries, replacing the cached list on success.
    ///
    /// On failure the cache is left untouched; 401 surfaces as
    /// `Unauthorized` for the caller to run the logout procedure.
    pub async fn refresh(&mut self) -> Result<(), ApiError> {
        let envelope: ListEnvelope = self.client.get_json("/api/enquiries").await?;
        if !envelope.success {
            return Err(ApiError::Server {
                message: envelope
                    .error
                    .unwrap_or_else(|| "Failed to fetch enquiries".to_string()),
            });
        }
        tracing::debug!(count = envelope.data.len(), "Fetched enquiries");
        self.enquiries = envelope.data;
        Ok(())
    }

    /// Updates a record's status, applying it locally only after the
    /// backend confirms. Idempotent: repeating the same update yields the
    /// same local state.
    pub async fn update_status(&mut self, id: &str, status: Status) -> Result<(), ApiError> {
        let envelope: Envelope = self
            .client
            .patch_json(
                &format!("/api/enquiries/{id}/status"),
                &json!({ "status": status }),
            )
            .await?;
        envelope.into_result()?;

        if let Some(enquiry) = self.enquiries.iter_mut().find(|e| e.id == id) {
            enquiry.status = status;
        }
        Ok(())
    }

    /// Deletes a record, removing it locally only after the backend
    /// confirms. A matching detail view is closed. The explicit user
    /// confirmation happens before this is called.
    pub async fn delete(&mut self, id: &str) -> Result<(), ApiError> {
        let envelope: Envelope = self
            .client
            .delete_json(&format!("/api/enquiries/{id}"))
            .await?;
        envelope.into_result()?;

        self.enquiries.retain(|e| e.id != id);
        if self.selected.as_deref() == Some(id) {
            self.selected = None;
        }
        Ok(())
    }

    /// Fetches the CSV export as raw bytes.
    pub async fn export_csv(&self) -> Result<Vec<u8>, ApiError> {
        self.client.get_bytes("/api/enquiries/export/csv").await
    }
}

/// Default filename for a CSV export, named with the current date.
pub fn export_filename(today: DateTime<Utc>) -> String {
    format!("enquiries_{}.csv", today.format("%Y-%m-%d"))
}

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles")
});

/// A public enquiry submission, before the backend assigns id/status/date.
#[derive(Debug, Clone, Serialize)]
pub struct NewEnquiry {
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    pub enquiry: String,
}

impl NewEnquiry {
    /// Client-side validation; a failing submission never reaches the
    /// network. Returns one message per offending field.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push("Name is required".to_string());
        }
        if self.email.trim().is_empty() {
            errors.push("Email is required".to_string());
        } else if !EMAIL_RE.is_match(self.email.trim()) {
            errors.push("Please enter a valid email".to_string());
        }
        if self.phone.trim().is_empty() {
            errors.push("Phone number is required".to_string());
        }
        if self.enquiry.trim().is_empty() {
            errors.push("Please describe your enquiry".to_string());
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Submits a new enquiry through the public (unauthenticated) endpoint.
pub async fn submit(client: &ApiClient, enquiry: &NewEnquiry) -> Result<(), ApiError> {
    let envelope: Envelope = client.post_json("/api/enquiries", enquiry).await?;
    envelope.into_result()
}
