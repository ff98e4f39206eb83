//! Renders bootstrap scripts for worker and control-plane nodes

use crate::{
    engine::{self, Composition, RenderError},
    fragment::{FragmentSet, InitError},
    funcs::Functions,
    library::Role,
    params::RenderRequest,
};

/// Holds the parsed fragment sets for every role
///
/// `Templates` is built once, typically when the process starts, and is then shared (e.g. in an
/// `Arc`) by every caller that renders scripts. Rendering only reads the fragment sets, so no
/// locking is required.
#[derive(Clone, Debug)]
pub struct Templates {
    worker: FragmentSet,
    control_plane: FragmentSet,
}

// === impl Templates ===

impl Default for Templates {
    fn default() -> Self {
        Self::new()
    }
}

impl Templates {
    /// Builds the fragment library with the default render functions
    ///
    /// # Panics
    ///
    /// Panics if the fragment library is inconsistent with the render functions. This can only
    /// happen if the crate itself is broken, so it is treated as fatal.
    pub fn new() -> Self {
        match Self::try_new(&Functions::default()) {
            Ok(templates) => templates,
            Err(error) => panic!("bootstrap fragments failed to initialize: {error}"),
        }
    }

    /// Builds the fragment library with the given render functions
    pub fn try_new(funcs: &Functions) -> Result<Self, InitError> {
        let worker = Role::Worker.fragment_set(funcs)?;
        let control_plane = Role::ControlPlane.fragment_set(funcs)?;
        tracing::debug!("Initialized bootstrap fragments");
        Ok(Self {
            worker,
            control_plane,
        })
    }

    /// Returns the fragment set for `role`
    pub fn fragments(&self, role: Role) -> &FragmentSet {
        match role {
            Role::Worker => &self.worker,
            Role::ControlPlane => &self.control_plane,
        }
    }

    /// Renders the bootstrap script for a worker node
    pub fn render_worker_script(&self, req: &RenderRequest) -> Result<String, RenderError> {
        self.render(Role::Worker, req)
    }

    /// Renders the bootstrap script for a control-plane node
    pub fn render_control_plane_script(&self, req: &RenderRequest) -> Result<String, RenderError> {
        self.render(Role::ControlPlane, req)
    }

    /// Renders a script that prepares a worker VM image by installing dependencies and pulling
    /// `images`
    pub fn render_worker_preload_script<I, S>(
        &self,
        kubelet_version: impl Into<String>,
        images: I,
    ) -> Result<String, RenderError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let req = RenderRequest::preload(kubelet_version, images);
        self.render_composition(Role::Worker, Composition::PreloadImage, &req)
    }

    /// Renders a script that prepares a control-plane VM image by installing dependencies and
    /// pulling `images`
    pub fn render_control_plane_image_preload_script<I, S>(
        &self,
        kubelet_version: impl Into<String>,
        images: I,
    ) -> Result<String, RenderError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let req = RenderRequest::preload(kubelet_version, images);
        self.render_composition(Role::ControlPlane, Composition::PreloadImage, &req)
    }

    /// Renders the bootstrap script for `role`, skipping installation if the request is
    /// preloaded
    pub fn render(&self, role: Role, req: &RenderRequest) -> Result<String, RenderError> {
        self.render_composition(role, Composition::for_request(req), req)
    }

    /// Renders a specific composition for `role`
    pub fn render_composition(
        &self,
        role: Role,
        composition: Composition,
        req: &RenderRequest,
    ) -> Result<String, RenderError> {
        let script = engine::expand(self.fragments(role), composition.name(), req)
            .inspect_err(|error| {
                tracing::debug!(%role, ?composition, %error, "Failed to render script");
            })?;
        tracing::debug!(%role, ?composition, bytes = script.len(), "Rendered script");
        Ok(script)
    }
}
