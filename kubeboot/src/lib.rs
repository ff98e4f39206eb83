//! Renders cloud-init bootstrap scripts for Kubernetes nodes
//!
//! Scripts are composed from a small library of named fragments. Every script is wrapped by
//! `startScript` and `endScript`; between them, each role contributes an `install` fragment
//! (which installs the node's dependencies) and a `configure` fragment (which configures the
//! kubelet and initializes or joins the cluster):
//!
//! - `fullScript` runs `install` and then `configure`;
//! - `preloadedScript` only runs `configure`, for VM images that already contain dependencies;
//! - `generatePreloadedImage` runs `install` and pulls a list of images, to build such VM images.
//!
//! The fragment library is parsed once into [`Templates`], which is then passed to whatever
//! renders scripts:
//!
//! ```
//! use kubeboot::{ApiEndpoint, ClusterDescriptor, MachineDescriptor, RenderRequest, Templates};
//!
//! let templates = Templates::new();
//!
//! let mut cluster = ClusterDescriptor::default();
//! cluster.api_endpoints.push(ApiEndpoint::new("10.0.0.1", 443));
//! let mut machine = MachineDescriptor::default();
//! machine.versions.kubelet = "1.9.0".to_string();
//!
//! let req = RenderRequest::new("abcdef.0123456789abcdef")
//!     .with_cluster(cluster)
//!     .with_machine(machine);
//! let script = templates.render_worker_script(&req).unwrap();
//! assert!(script.starts_with("#!/bin/bash"));
//! assert!(script.contains("MASTER=10.0.0.1:443"));
//! ```
//!
//! Values are written into scripts as-is. They are not escaped, so callers must only supply
//! values that are safe to embed in a shell script.
//!
//! # Crate Features
//!
//! - **clap**: Derives [`clap::ValueEnum`] for [`Role`] (and [`LogFormat`] when **log** is
//!   enabled) so they may be parsed from command-line arguments.
//! - **log**: Enables the [`log`] module, which configures a global [`tracing`] subscriber.
//! - **serde**: Implements `Serialize` and `Deserialize` for the request types so requests may
//!   be loaded from configuration.
//!
//! [`clap::ValueEnum`]: https://docs.rs/clap/4/clap/trait.ValueEnum.html
//! [`tracing`]: https://docs.rs/tracing

#![deny(rust_2018_idioms)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod engine;
pub mod fragment;
pub mod funcs;
pub mod library;
pub mod params;
pub mod scripts;

#[cfg(feature = "log")]
#[cfg_attr(docsrs, doc(cfg(feature = "log")))]
pub mod log;

pub use self::{
    engine::{Composition, RenderError},
    fragment::{Field, FragmentSet, InitError},
    funcs::{endpoint, subnet_of, Func, Functions, Kind},
    library::Role,
    params::{
        ApiEndpoint, ClusterDescriptor, ClusterNetwork, MachineDescriptor, MachineVersions,
        NetworkRanges, RenderRequest,
    },
    scripts::Templates,
};

#[cfg(feature = "log")]
pub use self::log::{LogFilter, LogFormat, LogInitError};
