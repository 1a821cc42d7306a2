//! Per-request state.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ProbeError, Result};

use super::record::VendorRecord;

/// Search plan produced by the query generator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueryPlan {
    /// Vendor categories the goal asks for (e.g. "event chef")
    pub targets: Vec<String>,

    /// One to three web search queries
    pub web_queries: Vec<String>,

    /// Optional query for business listing providers
    #[serde(default)]
    pub business_query: Option<String>,
}

impl QueryPlan {
    pub fn new(targets: Vec<String>, web_queries: Vec<String>) -> Self {
        Self {
            targets,
            web_queries,
            business_query: None,
        }
    }

    pub fn with_business_query(mut self, query: impl Into<String>) -> Self {
        self.business_query = Some(query.into());
        self
    }
}

/// Mutable state owned by exactly one request.
///
/// The plan is write-once: reading it before [`set_plan`](Self::set_plan) or
/// setting it twice returns an error instead of panicking or defaulting.
#[derive(Debug)]
pub struct PipelineRequest {
    pub id: Uuid,
    pub prompt: String,
    pub location: String,
    pub country_code: String,
    pub started_at: DateTime<Utc>,
    contacts: Vec<VendorRecord>,
    plan: OnceLock<QueryPlan>,
}

impl PipelineRequest {
    /// Create a request, rejecting blank prompt or location.
    pub fn new(
        prompt: impl Into<String>,
        location: impl Into<String>,
        country_code: impl Into<String>,
    ) -> Result<Self> {
        let prompt = prompt.into();
        let location = location.into();
        if prompt.trim().is_empty() {
            return Err(ProbeError::InvalidInput { field: "prompt" });
        }
        if location.trim().is_empty() {
            return Err(ProbeError::InvalidInput { field: "location" });
        }

        Ok(Self {
            id: Uuid::new_v4(),
            prompt,
            location,
            country_code: country_code.into().to_uppercase(),
            started_at: Utc::now(),
            contacts: Vec::new(),
            plan: OnceLock::new(),
        })
    }

    pub fn set_plan(&self, plan: QueryPlan) -> Result<()> {
        self.plan
            .set(plan)
            .map_err(|_| ProbeError::PlanAlreadyResolved)
    }

    pub fn plan(&self) -> Result<&QueryPlan> {
        self.plan.get().ok_or(ProbeError::PlanNotResolved)
    }

    /// Append records. Contacts only ever grow.
    pub fn push_contacts(&mut self, records: impl IntoIterator<Item = VendorRecord>) {
        self.contacts.extend(records);
    }

    pub fn take_contacts(&mut self) -> Vec<VendorRecord> {
        std::mem::take(&mut self.contacts)
    }

    /// Seconds since the request started.
    pub fn elapsed_seconds(&self) -> f64 {
        let elapsed = Utc::now() - self.started_at;
        elapsed.num_milliseconds() as f64 / 1000.0
    }
}
