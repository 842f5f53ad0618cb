use k8s_openapi::chrono::{DateTime, Utc};
use std::str::FromStr;

/// Problems with the shape of a record received from the control plane.
///
/// These never abort a projection, the affected field falls back to a neutral value.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum DataShapeError {
    #[error("pod has no phase")]
    MissingPhase,
    #[error("unrecognized pod phase: {0}")]
    UnknownPhase(String),
    #[error("container {container} reports a negative restart count: {count}")]
    NegativeRestartCount { container: String, count: i32 },
}

/// The coarse lifecycle state of a pod, as reported by the control plane
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum Phase {
    Pending,
    Running,
    Succeeded,
    Failed,
    #[default]
    Unknown,
}

impl FromStr for Phase {
    type Err = DataShapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Running" => Ok(Self::Running),
            "Succeeded" => Ok(Self::Succeeded),
            "Failed" => Ok(Self::Failed),
            "Unknown" => Ok(Self::Unknown),
            other => Err(DataShapeError::UnknownPhase(other.to_string())),
        }
    }
}

impl Phase {
    /// Parse an optional phase value, falling back to [`Phase::Unknown`].
    pub fn parse_lenient(value: Option<&str>) -> Self {
        let result = value
            .ok_or(DataShapeError::MissingPhase)
            .and_then(Phase::from_str);

        match result {
            Ok(phase) => phase,
            Err(err) => {
                tracing::debug!("Treating pod phase as unknown: {err}");
                Self::Unknown
            }
        }
    }
}

/// The runtime state of a single container
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum ContainerState {
    Waiting {
        reason: String,
    },
    Terminated {
        reason: String,
        exit_code: i32,
    },
    Running,
    /// None of the known states was set
    #[default]
    Unknown,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RawContainerStatus {
    pub name: String,
    pub ready: bool,
    /// Signed, as that is what the control plane hands out.
    /// See [`DataShapeError::NegativeRestartCount`].
    pub restart_count: i32,
    pub state: ContainerState,
}

#[cfg(test)]
impl RawContainerStatus {
    pub fn new(name: impl Into<String>, state: ContainerState) -> Self {
        Self {
            name: name.into(),
            ready: false,
            restart_count: 0,
            state,
        }
    }

    pub fn ready(mut self, ready: bool) -> Self {
        self.ready = ready;
        self
    }

    pub fn restarts(mut self, restart_count: i32) -> Self {
        self.restart_count = restart_count;
        self
    }
}

/// A pod, as fetched from the cluster, reduced to the fields we evaluate.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RawPod {
    pub name: String,
    pub namespace: String,
    pub phase: Phase,
    pub creation_timestamp: Option<DateTime<Utc>>,
    /// An absent list from the control plane ends up empty here.
    pub container_statuses: Vec<RawContainerStatus>,
}

#[cfg(test)]
impl RawPod {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>, phase: Phase) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            phase,
            ..Default::default()
        }
    }

    pub fn created(mut self, timestamp: DateTime<Utc>) -> Self {
        self.creation_timestamp = Some(timestamp);
        self
    }

    pub fn container(mut self, status: RawContainerStatus) -> Self {
        self.container_statuses.push(status);
        self
    }
}
