/// A cluster the backend can report on
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    pub name: String,
}

/// Pod status, reduced to what a UI needs to show.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
pub enum NormalizedStatus {
    Running,
    CrashLoopBackOff,
    Succeeded,
    Failed,
    Unknown,
}

/// Per container detail, as shown in a namespace listing
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerSummary {
    pub container_name: String,
    /// Human readable state, like `Waiting: CrashLoopBackOff`.
    pub state: String,
}

/// The summary of a single pod.
///
/// `namespace` is only filled in for search results, `container_statuses` only for namespace
/// listings. Absent fields are not serialized at all.
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectedPod {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub status: NormalizedStatus,
    /// Formatted as `<ready>/<total>`
    pub ready: String,
    pub restart_count: String,
    pub age: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_statuses: Option<Vec<ContainerSummary>>,
}
