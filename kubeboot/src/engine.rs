//! Expands fragments into scripts

use crate::{
    fragment::{Field, FragmentSet, Node},
    funcs::Value,
    params::RenderRequest,
};

/// A top-level composition of fragments
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Composition {
    /// Installs a node's dependencies and then configures it
    Full,

    /// Configures a node whose VM image already contains its dependencies
    Preloaded,

    /// Installs a node's dependencies and pulls images, producing a reusable VM image
    PreloadImage,
}

/// Indicates that a script could not be rendered
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    /// An expanded fragment references a field the request does not carry
    #[error("missing field {field}")]
    MissingField {
        /// The referenced field
        field: Field,
    },

    /// A fragment is referenced that has not been registered
    #[error("undefined fragment {name:?}")]
    UndefinedFragment {
        /// The referenced name
        name: String,
    },
}

// === impl Composition ===

impl Composition {
    /// Selects the bootstrap composition for a request
    ///
    /// Requests for preloaded VM images skip installation.
    pub fn for_request(req: &RenderRequest) -> Self {
        if req.preloaded {
            Self::Preloaded
        } else {
            Self::Full
        }
    }

    /// Returns the name of the fragment that implements this composition
    pub fn name(&self) -> &'static str {
        match self {
            Self::Full => "fullScript",
            Self::Preloaded => "preloadedScript",
            Self::PreloadImage => "generatePreloadedImage",
        }
    }
}

// === expand ===

/// Expands the fragment named `name` from `set` into a complete script
///
/// Expansion is all or nothing: if any error is encountered, no partial output is returned.
pub fn expand(set: &FragmentSet, name: &str, req: &RenderRequest) -> Result<String, RenderError> {
    let mut expander = Expander {
        set,
        req,
        out: String::new(),
    };
    expander.include(name, None)?;
    Ok(expander.out)
}

struct Expander<'a> {
    set: &'a FragmentSet,
    req: &'a RenderRequest,
    out: String,
}

impl<'a> Expander<'a> {
    fn include(&mut self, name: &str, item: Option<&str>) -> Result<(), RenderError> {
        let set = self.set;
        let nodes = set
            .get(name)
            .ok_or_else(|| RenderError::UndefinedFragment {
                name: name.to_string(),
            })?;
        tracing::trace!(set = %set.name(), fragment = %name, "Expanding");
        self.nodes(nodes, item)
    }

    fn nodes(&mut self, nodes: &[Node], item: Option<&str>) -> Result<(), RenderError> {
        for node in nodes {
            match node {
                Node::Text(text) => self.out.push_str(text),

                Node::Include(name) => self.include(name, item)?,

                Node::Field(field) => match self.resolve(*field)? {
                    Value::Text(text) => self.out.push_str(text),
                    value => unreachable!(
                        "{field} resolved to a {}; fields are checked when fragments are parsed",
                        value.kind()
                    ),
                },

                Node::Call(func, field) => {
                    let value = self.resolve(*field)?;
                    match func.apply(value) {
                        Some(text) => self.out.push_str(&text),
                        None => unreachable!(
                            "{field} resolved to a {}; calls are checked when fragments are parsed",
                            value.kind()
                        ),
                    }
                }

                // The parser only accepts `{{ . }}` within a range, which always binds an item.
                Node::Item => self.out.push_str(item.unwrap_or_default()),

                Node::Range(field, body) => match self.resolve(*field)? {
                    Value::List(items) => {
                        for item in items {
                            self.nodes(body, Some(item.as_str()))?;
                        }
                    }
                    value => unreachable!(
                        "{field} resolved to a {}; ranges are checked when fragments are parsed",
                        value.kind()
                    ),
                },
            }
        }
        Ok(())
    }

    fn resolve(&self, field: Field) -> Result<Value<'a>, RenderError> {
        let req = self.req;
        let missing = || RenderError::MissingField { field };
        let machine = || req.machine.as_deref().ok_or_else(missing);
        let cluster = || req.cluster.as_deref().ok_or_else(missing);

        let value = match field {
            Field::Token => Value::Text(&req.token),
            Field::MachineName => Value::Text(&machine()?.name),
            Field::KubeletVersion => Value::Text(&machine()?.versions.kubelet),
            Field::ControlPlaneVersion => Value::Text(
                machine()?
                    .versions
                    .control_plane
                    .as_deref()
                    .ok_or_else(missing)?,
            ),
            Field::ApiEndpoint => Value::Endpoint(cluster()?.api_endpoint().ok_or_else(missing)?),
            Field::ServiceDomain => Value::Text(&cluster()?.network.service_domain),
            Field::ServiceRanges => Value::NetworkRanges(&cluster()?.network.services),
            Field::PodRanges => Value::NetworkRanges(&cluster()?.network.pods),
            Field::Images => Value::List(&req.images),
        };
        Ok(value)
    }
}
