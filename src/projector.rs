use crate::model::RawPod;
use crate::status::{
    aggregate_readiness, aggregate_restarts, classify, describe_container_state, format_age,
};
use k8s_openapi::chrono::{DateTime, Utc};
use podglance_api::data::{ContainerSummary, ProjectedPod};
use std::str::FromStr;

/// Age shown for a pod without a creation timestamp.
pub const UNKNOWN_AGE: &str = "unknown";

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum SearchQueryError {
    #[error("Query parameter is required")]
    Empty,
}

/// A validated, non-empty search term.
///
/// Matching is a plain, case-sensitive substring test against the pod's name and namespace.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SearchQuery(String);

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Result<Self, SearchQueryError> {
        let query = query.into();
        if query.is_empty() {
            return Err(SearchQueryError::Empty);
        }
        Ok(Self(query))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn matches(&self, pod: &RawPod) -> bool {
        pod.name.contains(&self.0) || pod.namespace.contains(&self.0)
    }
}

impl FromStr for SearchQuery {
    type Err = SearchQueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Which flavor of summary to produce
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum View {
    /// Pods of a single namespace, with container details
    Namespace,
    /// Pods across namespaces, carrying their namespace
    Search,
}

fn project(pod: RawPod, now: DateTime<Utc>, view: View) -> ProjectedPod {
    let statuses = &pod.container_statuses;

    let container_statuses = match view {
        View::Namespace => Some(
            statuses
                .iter()
                .map(|status| ContainerSummary {
                    container_name: status.name.clone(),
                    state: describe_container_state(status),
                })
                .collect(),
        ),
        View::Search => None,
    };

    ProjectedPod {
        status: classify(pod.phase, statuses),
        ready: aggregate_readiness(statuses).to_string(),
        restart_count: aggregate_restarts(statuses).to_string(),
        age: pod
            .creation_timestamp
            .map_or_else(|| UNKNOWN_AGE.to_string(), |created| format_age(created, now)),
        container_statuses,
        namespace: match view {
            View::Namespace => None,
            View::Search => Some(pod.namespace),
        },
        name: pod.name,
    }
}

/// Summarize the pods of a single namespace, keeping their order.
pub fn project_namespace<I>(pods: I, now: DateTime<Utc>) -> Vec<ProjectedPod>
where
    I: IntoIterator<Item = RawPod>,
{
    pods.into_iter()
        .map(|pod| project(pod, now, View::Namespace))
        .collect()
}

/// Summarize all pods whose name or namespace contains the query, keeping their order.
pub fn search_across_cluster<I>(
    pods: I,
    query: &SearchQuery,
    now: DateTime<Utc>,
) -> Vec<ProjectedPod>
where
    I: IntoIterator<Item = RawPod>,
{
    pods.into_iter()
        .filter(|pod| query.matches(pod))
        .map(|pod| project(pod, now, View::Search))
        .collect()
}
