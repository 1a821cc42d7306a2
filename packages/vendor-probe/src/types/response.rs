//! Result set returned to callers (JSON and SSE payloads).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::record::VendorRecord;
use super::request::PipelineRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Running,
    Completed,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultMeta {
    pub targets: Vec<String>,
    pub queries: Vec<String>,
    pub elapsed_seconds: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSet {
    pub id: Uuid,
    pub status: ResultStatus,
    pub has_more: bool,
    pub location: String,
    pub prompt: String,
    pub count: usize,
    pub results: Vec<VendorRecord>,
    pub meta: ResultMeta,
}

impl ResultSet {
    /// Shape records for `request`. `count` always equals `results.len()`.
    pub fn assemble(request: &PipelineRequest, results: Vec<VendorRecord>, final_set: bool) -> Self {
        let meta = match request.plan() {
            Ok(plan) => ResultMeta {
                targets: plan.targets.clone(),
                queries: plan.web_queries.clone(),
                elapsed_seconds: request.elapsed_seconds(),
            },
            Err(_) => ResultMeta {
                elapsed_seconds: request.elapsed_seconds(),
                ..Default::default()
            },
        };

        Self {
            id: request.id,
            status: if final_set {
                ResultStatus::Completed
            } else {
                ResultStatus::Running
            },
            has_more: !final_set,
            location: request.location.clone(),
            prompt: request.prompt.clone(),
            count: results.len(),
            results,
            meta,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::request::QueryPlan;

    #[test]
    fn test_wire_shape_is_camel_case() {
        let request = PipelineRequest::new("event chef", "Kochi", "IN").unwrap();
        request
            .set_plan(QueryPlan::new(vec!["chef".into()], vec!["chefs in kochi".into()]))
            .unwrap();

        let set = ResultSet::assemble(&request, vec![], true);
        let json = serde_json::to_value(&set).unwrap();

        assert_eq!(json["status"], "completed");
        assert_eq!(json["hasMore"], false);
        assert_eq!(json["count"], 0);
        assert_eq!(json["meta"]["queries"][0], "chefs in kochi");
        assert!(json["meta"]["elapsedSeconds"].is_number());
    }

    #[test]
    fn test_partial_set_has_more() {
        let request = PipelineRequest::new("event chef", "Kochi", "IN").unwrap();
        let set = ResultSet::assemble(&request, vec![], false);
        assert_eq!(set.status, ResultStatus::Running);
        assert!(set.has_more);
        assert!(set.meta.targets.is_empty());
    }
}
