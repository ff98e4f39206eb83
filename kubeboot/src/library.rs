//! The bootstrap fragment library
//!
//! Fragments are split into a generic set, shared by every role, and a per-role set providing
//! `install` and `configure`.

mod control_plane;
mod generic;
mod worker;

use crate::{
    fragment::{FragmentSet, InitError},
    funcs::Functions,
};
use std::fmt;

/// The name of the fragment that installs a node's dependencies
pub const INSTALL: &str = "install";

/// The name of the fragment that configures and joins a node
pub const CONFIGURE: &str = "configure";

/// The name of the fragment that opens every script
pub const START_SCRIPT: &str = "startScript";

/// The name of the fragment that closes every script
pub const END_SCRIPT: &str = "endScript";

/// The role a node plays in the cluster
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum Role {
    /// A node that runs workloads and joins an existing control plane
    Worker,

    /// A node that runs the Kubernetes control plane
    ControlPlane,
}

// === impl Role ===

impl Role {
    /// Returns the role-specific fragments as `(name, body)` pairs
    pub fn fragments(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::Worker => worker::FRAGMENTS,
            Self::ControlPlane => control_plane::FRAGMENTS,
        }
    }

    /// Builds the complete fragment set for this role
    pub fn fragment_set(&self, funcs: &Functions) -> Result<FragmentSet, InitError> {
        FragmentSet::builder(self.to_string())
            .fragments(generic::FRAGMENTS)
            .fragments(self.fragments())
            .build(funcs)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Worker => "worker",
            Self::ControlPlane => "control-plane",
        })
    }
}

/// Returns the generic fragments as `(name, body)` pairs
pub fn generic_fragments() -> &'static [(&'static str, &'static str)] {
    generic::FRAGMENTS
}
