//! Named script fragments and the sets they are registered in
//!
//! A fragment is script text with embedded actions:
//!
//! - `{{ template "name" }}` includes another fragment;
//! - `{{ .Path }}` writes a text field of the request;
//! - `{{ fn .Path }}` writes the result of calling a render function on a field;
//! - `{{ range .Images }}...{{ . }}...{{ end }}` repeats its body for each entry of a list;
//! - `{{/* ... */}}` is a comment.
//!
//! As with Go templates, `{{- ` and ` -}}` trim whitespace before and after an action.
//!
//! Fragments are parsed when a [`FragmentSet`] is built. Every problem that can be detected
//! without a request (syntax errors, unknown fields or functions, call signatures, include
//! cycles) is reported as an [`InitError`] at that point, so rendering can only fail for reasons
//! that depend on the request itself.

use crate::funcs::{Func, Functions, Kind};
use std::{collections::HashMap, fmt};

/// A set of fragments that may include one another
#[derive(Clone, Debug)]
pub struct FragmentSet {
    name: String,
    fragments: HashMap<String, Vec<Node>>,
}

/// Configures a [`FragmentSet`]
#[derive(Clone, Debug)]
#[must_use]
pub struct Builder {
    name: String,
    sources: Vec<(String, String)>,
}

/// A request field that fragments may reference
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    /// `.Token`
    Token,

    /// `.Machine.Name`
    MachineName,

    /// `.Machine.Versions.Kubelet`
    KubeletVersion,

    /// `.Machine.Versions.ControlPlane`
    ControlPlaneVersion,

    /// `.Cluster.APIEndpoint`
    ApiEndpoint,

    /// `.Cluster.Network.ServiceDomain`
    ServiceDomain,

    /// `.Cluster.Network.Services`
    ServiceRanges,

    /// `.Cluster.Network.Pods`
    PodRanges,

    /// `.Images`
    Images,
}

/// Indicates that a [`FragmentSet`] could not be built
///
/// These errors reflect a mismatch between fragment text and the code that renders it, so they
/// are treated as fatal when the process starts.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    /// A fragment contains a malformed action
    #[error("fragment {fragment:?}: {message}")]
    Syntax {
        /// The fragment containing the action
        fragment: String,
        /// Describes the problem
        message: String,
    },

    /// A fragment references a field that does not exist
    #[error("fragment {fragment:?}: unknown field {path:?}")]
    UnknownField {
        /// The fragment containing the reference
        fragment: String,
        /// The referenced path
        path: String,
    },

    /// A function is called or required but not bound
    #[error("no function bound as {0:?}")]
    UnknownFunction(String),

    /// A function is bound with a signature other than the one its callers expect
    #[error("function {func:?} must accept {expected} but accepts {found}")]
    Signature {
        /// The function's name
        func: String,
        /// The kind of argument callers pass
        expected: Kind,
        /// The kind of argument the bound function accepts
        found: Kind,
    },

    /// A fragment writes a field that cannot be rendered as text
    #[error("fragment {fragment:?}: {field} holds a {kind} and cannot be written directly")]
    NotText {
        /// The fragment containing the reference
        fragment: String,
        /// The referenced field
        field: Field,
        /// The field's kind
        kind: Kind,
    },

    /// Fragments include one another in a cycle
    #[error("fragments include each other in a cycle: {}", .0.join(" -> "))]
    Cycle(Vec<String>),
}

/// A parsed piece of a fragment
#[derive(Clone, Debug)]
pub(crate) enum Node {
    Text(String),
    Include(String),
    Field(Field),
    Call(Func, Field),
    Item,
    Range(Field, Vec<Node>),
}

// === impl FragmentSet ===

impl FragmentSet {
    /// Returns a [`Builder`] for a set with the given name
    pub fn builder(name: impl Into<String>) -> Builder {
        Builder {
            name: name.into(),
            sources: Vec::new(),
        }
    }

    /// Returns the set's name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true if a fragment is registered under `name`
    pub fn contains(&self, name: &str) -> bool {
        self.fragments.contains_key(name)
    }

    /// Iterates over the names of all registered fragments
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.fragments.keys().map(String::as_str)
    }

    pub(crate) fn get(&self, name: &str) -> Option<&[Node]> {
        self.fragments.get(name).map(Vec::as_slice)
    }

    /// Fails if fragments include one another in a cycle
    ///
    /// Includes of unregistered fragments are not followed; they fail when expanded.
    fn check_acyclic(&self) -> Result<(), InitError> {
        #[derive(Copy, Clone, PartialEq, Eq)]
        enum Mark {
            Visiting,
            Done,
        }

        fn visit<'a>(
            set: &'a FragmentSet,
            name: &'a str,
            marks: &mut HashMap<&'a str, Mark>,
            path: &mut Vec<&'a str>,
        ) -> Result<(), InitError> {
            match marks.get(name) {
                Some(Mark::Done) => return Ok(()),
                Some(Mark::Visiting) => {
                    let start = path.iter().position(|n| *n == name).unwrap_or(0);
                    let mut cycle = path[start..]
                        .iter()
                        .map(|n| n.to_string())
                        .collect::<Vec<_>>();
                    cycle.push(name.to_string());
                    return Err(InitError::Cycle(cycle));
                }
                None => {}
            }
            let Some(nodes) = set.get(name) else {
                return Ok(());
            };

            marks.insert(name, Mark::Visiting);
            path.push(name);
            let mut includes = Vec::new();
            includes_of(nodes, &mut includes);
            for include in includes {
                visit(set, include, marks, path)?;
            }
            path.pop();
            marks.insert(name, Mark::Done);
            Ok(())
        }

        let mut marks = HashMap::new();
        let mut names = self.names().collect::<Vec<_>>();
        // Visit in a stable order so that the reported cycle is deterministic.
        names.sort_unstable();
        for name in names {
            visit(self, name, &mut marks, &mut Vec::new())?;
        }
        Ok(())
    }
}

fn includes_of<'a>(nodes: &'a [Node], out: &mut Vec<&'a str>) {
    for node in nodes {
        match node {
            Node::Include(name) => out.push(name),
            Node::Range(_, body) => includes_of(body, out),
            _ => {}
        }
    }
}

// === impl Builder ===

impl Builder {
    /// Registers a fragment, replacing any fragment previously registered under the same name
    pub fn fragment(mut self, name: impl Into<String>, body: impl Into<String>) -> Self {
        let name = name.into();
        self.sources.retain(|(n, _)| *n != name);
        self.sources.push((name, body.into()));
        self
    }

    /// Registers each `(name, body)` pair
    pub fn fragments<'a>(self, fragments: impl IntoIterator<Item = &'a (&'a str, &'a str)>) -> Self {
        fragments
            .into_iter()
            .fold(self, |b, (name, body)| b.fragment(*name, *body))
    }

    /// Parses every fragment and checks it against `funcs`
    pub fn build(self, funcs: &Functions) -> Result<FragmentSet, InitError> {
        funcs.check_required()?;

        let mut fragments = HashMap::with_capacity(self.sources.len());
        for (name, body) in self.sources {
            let nodes = Parser::new(&name, funcs).parse(&body)?;
            tracing::trace!(set = %self.name, fragment = %name, nodes = nodes.len(), "Parsed");
            fragments.insert(name, nodes);
        }

        let set = FragmentSet {
            name: self.name,
            fragments,
        };
        set.check_acyclic()?;
        tracing::debug!(set = %set.name, fragments = set.fragments.len(), "Built fragment set");
        Ok(set)
    }
}

// === impl Field ===

impl Field {
    const ALL: [Field; 9] = [
        Field::Token,
        Field::MachineName,
        Field::KubeletVersion,
        Field::ControlPlaneVersion,
        Field::ApiEndpoint,
        Field::ServiceDomain,
        Field::ServiceRanges,
        Field::PodRanges,
        Field::Images,
    ];

    /// Returns the path fragments use to reference this field
    pub fn path(&self) -> &'static str {
        match self {
            Self::Token => ".Token",
            Self::MachineName => ".Machine.Name",
            Self::KubeletVersion => ".Machine.Versions.Kubelet",
            Self::ControlPlaneVersion => ".Machine.Versions.ControlPlane",
            Self::ApiEndpoint => ".Cluster.APIEndpoint",
            Self::ServiceDomain => ".Cluster.Network.ServiceDomain",
            Self::ServiceRanges => ".Cluster.Network.Services",
            Self::PodRanges => ".Cluster.Network.Pods",
            Self::Images => ".Images",
        }
    }

    /// Returns the kind of value this field holds
    pub fn kind(&self) -> Kind {
        match self {
            Self::ApiEndpoint => Kind::Endpoint,
            Self::ServiceRanges | Self::PodRanges => Kind::NetworkRanges,
            Self::Images => Kind::List,
            _ => Kind::Text,
        }
    }

    /// Looks up a field by its path
    pub fn from_path(path: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.path() == path)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

// === Parser ===

struct Parser<'a> {
    fragment: &'a str,
    funcs: &'a Functions,
}

/// An open `range` block and the nodes collected so far at its level.
struct Frame {
    range: Option<Field>,
    nodes: Vec<Node>,
}

impl<'a> Parser<'a> {
    fn new(fragment: &'a str, funcs: &'a Functions) -> Self {
        Self { fragment, funcs }
    }

    fn parse(&self, mut src: &str) -> Result<Vec<Node>, InitError> {
        let mut stack = vec![Frame {
            range: None,
            nodes: Vec::new(),
        }];
        let mut trim_next = false;

        loop {
            let Some(open) = src.find("{{") else {
                push_text(&mut stack, src, trim_next, false);
                break;
            };
            let after = &src[open + 2..];
            let close = after
                .find("}}")
                .ok_or_else(|| self.syntax("unterminated action"))?;
            let mut action = &after[..close];

            let trim_before = action.starts_with("- ");
            if trim_before {
                action = &action[1..];
            }
            push_text(&mut stack, &src[..open], trim_next, trim_before);

            trim_next = action.ends_with(" -");
            if trim_next {
                action = &action[..action.len() - 1];
            }
            src = &after[close + 2..];

            self.action(action.trim(), &mut stack)?;
        }

        if stack.len() > 1 {
            return Err(self.syntax("range is missing its end"));
        }
        Ok(stack.pop().map(|f| f.nodes).unwrap_or_default())
    }

    fn action(&self, action: &str, stack: &mut Vec<Frame>) -> Result<(), InitError> {
        if action.starts_with("/*") && action.ends_with("*/") {
            return Ok(());
        }

        let words = action.split_whitespace().collect::<Vec<_>>();
        let node = match words.as_slice() {
            ["template", name] | ["template", name, "."] => {
                let name = name
                    .strip_prefix('"')
                    .and_then(|n| n.strip_suffix('"'))
                    .ok_or_else(|| self.syntax(format!("template name must be quoted: {name}")))?;
                Node::Include(name.to_string())
            }

            ["range", path] => {
                let field = self.field(path)?;
                if field.kind() != Kind::List {
                    return Err(self.syntax(format!("cannot range over {field}")));
                }
                stack.push(Frame {
                    range: Some(field),
                    nodes: Vec::new(),
                });
                return Ok(());
            }

            ["end"] => {
                if stack.len() == 1 {
                    return Err(self.syntax("end without range"));
                }
                let Some(Frame {
                    range: Some(field),
                    nodes,
                }) = stack.pop()
                else {
                    return Err(self.syntax("end without range"));
                };
                Node::Range(field, nodes)
            }

            ["."] => {
                if stack.len() == 1 {
                    return Err(self.syntax("{{ . }} may only be used within range"));
                }
                Node::Item
            }

            [path] if path.starts_with('.') => {
                let field = self.field(path)?;
                if field.kind() != Kind::Text {
                    return Err(InitError::NotText {
                        fragment: self.fragment.to_string(),
                        field,
                        kind: field.kind(),
                    });
                }
                Node::Field(field)
            }

            [name, path] => {
                let func = self
                    .funcs
                    .get(name)
                    .ok_or_else(|| InitError::UnknownFunction(name.to_string()))?;
                let field = self.field(path)?;
                if func.arg() != field.kind() {
                    return Err(InitError::Signature {
                        func: name.to_string(),
                        expected: field.kind(),
                        found: func.arg(),
                    });
                }
                Node::Call(func, field)
            }

            _ => return Err(self.syntax(format!("unsupported action: {{{{ {action} }}}}"))),
        };

        if let Some(frame) = stack.last_mut() {
            frame.nodes.push(node);
        }
        Ok(())
    }

    fn field(&self, path: &str) -> Result<Field, InitError> {
        Field::from_path(path).ok_or_else(|| InitError::UnknownField {
            fragment: self.fragment.to_string(),
            path: path.to_string(),
        })
    }

    fn syntax(&self, message: impl Into<String>) -> InitError {
        InitError::Syntax {
            fragment: self.fragment.to_string(),
            message: message.into(),
        }
    }
}

fn push_text(stack: &mut [Frame], mut text: &str, trim_start: bool, trim_end: bool) {
    if trim_start {
        text = text.trim_start();
    }
    if trim_end {
        text = text.trim_end();
    }
    if text.is_empty() {
        return;
    }
    if let Some(frame) = stack.last_mut() {
        frame.nodes.push(Node::Text(text.to_string()));
    }
}
