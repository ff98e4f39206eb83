#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

use anyhow::{bail, Context, Result};
use clap::Parser;
use kubeboot::{LogFilter, LogFormat, RenderRequest, Role, Templates};
use std::path::{Path, PathBuf};

/// Renders a node bootstrap script to stdout
#[derive(Clone, Debug, Parser)]
#[clap(version)]
struct Args {
    /// The tracing filter used for logs
    #[arg(
        long,
        env = "KUBEBOOT_LOG",
        default_value = "render_script=info,kubeboot=info,warn"
    )]
    log_level: String,

    /// The logging format
    #[arg(long, value_enum, default_value = "plain")]
    log_format: LogFormat,

    /// The role of the node being bootstrapped
    #[arg(long, value_enum, default_value = "worker")]
    role: Role,

    /// A JSON-encoded render request
    #[arg(long, short = 'c', value_name = "FILE")]
    config: Option<PathBuf>,

    /// Overrides the request's preloaded flag
    #[arg(long)]
    preloaded: bool,

    /// Renders a script that prepares a VM image instead of bootstrapping a node
    #[arg(long)]
    preload_images: bool,

    /// The kubelet version installed by --preload-images
    #[arg(long, default_value = "1.9.0")]
    kubelet_version: String,

    /// An image pulled by --preload-images. May be repeated.
    #[arg(long = "image", value_name = "IMAGE")]
    images: Vec<String>,
}

fn main() -> Result<()> {
    let Args {
        log_level,
        log_format,
        role,
        config,
        preloaded,
        preload_images,
        kubelet_version,
        images,
    } = Args::parse();

    let filter = LogFilter::try_new(&log_level).context("invalid log level")?;
    // stdout only carries the script.
    log_format.try_init_with_writer(filter, std::io::stderr)?;

    let templates = Templates::new();

    let script = if preload_images {
        tracing::info!(
            %role,
            %kubelet_version,
            images = images.len(),
            "Rendering preload script"
        );
        match role {
            Role::Worker => templates.render_worker_preload_script(kubelet_version, images)?,
            Role::ControlPlane => {
                templates.render_control_plane_image_preload_script(kubelet_version, images)?
            }
        }
    } else {
        let Some(path) = config else {
            bail!("--config is required unless --preload-images is set");
        };
        let mut req = load(&path)?;
        req.preloaded |= preloaded;
        tracing::info!(
            %role,
            preloaded = req.preloaded,
            config = %path.display(),
            "Rendering bootstrap script"
        );
        templates.render(role, &req)?
    };

    print!("{script}");
    Ok(())
}

fn load(path: &Path) -> Result<RenderRequest> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    serde_json::from_reader(std::io::BufReader::new(file))
        .with_context(|| format!("failed to parse {}", path.display()))
}
