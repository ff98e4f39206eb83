//! Parameters for a single script rendering request
//!
//! The descriptor types mirror the parts of a cluster-api `Cluster` and `Machine` that the
//! bootstrap fragments read. They are owned by the caller and are never mutated while rendering.

use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Describes one rendering request
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct RenderRequest {
    /// The bootstrap token used by `kubeadm` to join or initialize the node
    pub token: String,

    /// The cluster the node belongs to
    pub cluster: Option<Arc<ClusterDescriptor>>,

    /// The machine being bootstrapped
    pub machine: Option<Arc<MachineDescriptor>>,

    /// Container image references to pull, in order
    pub images: Vec<String>,

    /// Whether the VM image already contains the node's dependencies
    pub preloaded: bool,
}

/// The cluster-level configuration read by the bootstrap fragments
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct ClusterDescriptor {
    /// The cluster's API endpoints. Only the first one is used.
    pub api_endpoints: Vec<ApiEndpoint>,

    /// The cluster's network configuration
    pub network: ClusterNetwork,
}

/// A host/port pair where the Kubernetes API server can be reached
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ApiEndpoint {
    /// The API server's hostname or address
    pub host: String,

    /// The API server's port
    pub port: i32,
}

/// Network ranges used by the cluster
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct ClusterNetwork {
    /// The range service VIPs are allocated from
    pub services: NetworkRanges,

    /// The range pod IPs are allocated from
    pub pods: NetworkRanges,

    /// The DNS domain for services, e.g. `cluster.local`
    pub service_domain: String,
}

/// A list of CIDR blocks
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct NetworkRanges {
    /// CIDR blocks, e.g. `10.96.0.0/12`
    pub cidr_blocks: Vec<String>,
}

/// The machine-level configuration read by the bootstrap fragments
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct MachineDescriptor {
    /// The machine's name, used to annotate the resulting node
    pub name: String,

    /// Component versions to install on the machine
    pub versions: MachineVersions,
}

/// Kubernetes component versions for a machine
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct MachineVersions {
    /// The kubelet version, without a leading `v` (e.g. `1.9.0`)
    pub kubelet: String,

    /// The control-plane version. Only set on control-plane machines.
    pub control_plane: Option<String>,
}

// === impl RenderRequest ===

impl RenderRequest {
    /// Creates a request with the given bootstrap token and no descriptors
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            ..Default::default()
        }
    }

    /// Creates the minimal request used to render image-preload scripts
    ///
    /// Only the machine's kubelet version and the image list are set; everything else is left at
    /// its zero value since the preload compositions never read it.
    pub fn preload<I, S>(kubelet_version: impl Into<String>, images: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let machine = MachineDescriptor {
            versions: MachineVersions {
                kubelet: kubelet_version.into(),
                control_plane: None,
            },
            ..Default::default()
        };
        Self::default()
            .with_machine(machine)
            .with_images(images)
    }

    /// Sets the cluster descriptor
    pub fn with_cluster(mut self, cluster: impl Into<Arc<ClusterDescriptor>>) -> Self {
        self.cluster = Some(cluster.into());
        self
    }

    /// Sets the machine descriptor
    pub fn with_machine(mut self, machine: impl Into<Arc<MachineDescriptor>>) -> Self {
        self.machine = Some(machine.into());
        self
    }

    /// Sets the images to be pulled
    pub fn with_images<I, S>(mut self, images: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.images = images.into_iter().map(Into::into).collect();
        self
    }

    /// Marks whether the VM image already contains the node's dependencies
    pub fn with_preloaded(mut self, preloaded: bool) -> Self {
        self.preloaded = preloaded;
        self
    }
}

// === impl ClusterDescriptor ===

impl ClusterDescriptor {
    /// Returns the endpoint fragments use to reach the API server, if any
    pub fn api_endpoint(&self) -> Option<&ApiEndpoint> {
        self.api_endpoints.first()
    }
}

// === impl ApiEndpoint ===

impl ApiEndpoint {
    /// Creates an endpoint
    pub fn new(host: impl Into<String>, port: i32) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

// === impl NetworkRanges ===

impl<S: Into<String>> FromIterator<S> for NetworkRanges {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            cidr_blocks: iter.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preload_request_only_sets_version_and_images() {
        let req = RenderRequest::preload("1.9.0", ["imgA", "imgB"]);
        assert!(req.token.is_empty());
        assert!(req.cluster.is_none());
        assert!(!req.preloaded);
        assert_eq!(req.images, vec!["imgA", "imgB"]);

        let machine = req.machine.expect("preload request must carry a machine");
        assert_eq!(machine.versions.kubelet, "1.9.0");
        assert_eq!(machine.versions.control_plane, None);
        assert!(machine.name.is_empty());
    }

    #[test]
    fn first_endpoint_is_the_api_endpoint() {
        let cluster = ClusterDescriptor {
            api_endpoints: vec![
                ApiEndpoint::new("10.0.0.1", 443),
                ApiEndpoint::new("10.0.0.2", 6443),
            ],
            ..Default::default()
        };
        assert_eq!(
            cluster.api_endpoint(),
            Some(&ApiEndpoint::new("10.0.0.1", 443))
        );
        assert_eq!(ClusterDescriptor::default().api_endpoint(), None);
    }
}
