use crate::model::{ContainerState, Phase, RawContainerStatus, RawPod};
use k8s_openapi::api::core::v1::{self as core, Namespace, Pod};
use kube::api::ListParams;
use kube::{Api, Client};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),
}

/// Read access to the pods of a single cluster.
///
/// A failed listing is reported as a whole, there are no partial results.
pub trait PodSource {
    async fn list_namespaces(&self) -> Result<Vec<String>, Error>;

    async fn list_namespaced_pods(&self, namespace: &str) -> Result<Vec<RawPod>, Error>;

    async fn list_all_pods(&self) -> Result<Vec<RawPod>, Error>;
}

/// A [`PodSource`] talking to the Kubernetes API server.
#[derive(Clone)]
pub struct KubeSource {
    client: Client,
}

impl KubeSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn list_pods(&self, api: Api<Pod>) -> Result<Vec<RawPod>, Error> {
        let pods = api.list(&ListParams::default()).await?;
        Ok(pods.items.into_iter().map(to_raw_pod).collect())
    }
}

impl PodSource for KubeSource {
    async fn list_namespaces(&self) -> Result<Vec<String>, Error> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let namespaces = api.list(&ListParams::default()).await?;

        Ok(namespaces
            .items
            .into_iter()
            .filter_map(|ns| ns.metadata.name)
            .collect())
    }

    async fn list_namespaced_pods(&self, namespace: &str) -> Result<Vec<RawPod>, Error> {
        self.list_pods(Api::namespaced(self.client.clone(), namespace))
            .await
    }

    async fn list_all_pods(&self) -> Result<Vec<RawPod>, Error> {
        self.list_pods(Api::all(self.client.clone())).await
    }
}

/// Convert a pod into its raw record.
///
/// This never fails. Missing fields end up empty, or as [`Phase::Unknown`].
pub fn to_raw_pod(pod: Pod) -> RawPod {
    let Pod {
        metadata, status, ..
    } = pod;
    let status = status.unwrap_or_default();

    RawPod {
        name: metadata.name.unwrap_or_default(),
        namespace: metadata.namespace.unwrap_or_default(),
        phase: Phase::parse_lenient(status.phase.as_deref()),
        creation_timestamp: metadata.creation_timestamp.map(|time| time.0),
        container_statuses: status
            .container_statuses
            .into_iter()
            .flatten()
            .map(to_raw_container_status)
            .collect(),
    }
}

fn to_raw_container_status(status: core::ContainerStatus) -> RawContainerStatus {
    RawContainerStatus {
        name: status.name,
        ready: status.ready,
        restart_count: status.restart_count,
        state: status.state.map(to_container_state).unwrap_or_default(),
    }
}

/// Pick the state which is set. If more than one is set, waiting wins over terminated, which wins
/// over running.
fn to_container_state(state: core::ContainerState) -> ContainerState {
    if let Some(waiting) = state.waiting {
        ContainerState::Waiting {
            reason: waiting.reason.unwrap_or_default(),
        }
    } else if let Some(terminated) = state.terminated {
        ContainerState::Terminated {
            reason: terminated.reason.unwrap_or_default(),
            exit_code: terminated.exit_code,
        }
    } else if state.running.is_some() {
        ContainerState::Running
    } else {
        ContainerState::Unknown
    }
}
