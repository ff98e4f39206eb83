#![deny(rust_2018_idioms)]

use kubeboot::{
    ApiEndpoint, ClusterDescriptor, ClusterNetwork, Field, MachineDescriptor, MachineVersions,
    RenderError, RenderRequest, Role, Templates,
};
use std::sync::Arc;

const PREAMBLE: &str = "#!/bin/bash\n\nset -e\nset -x\n\n(\n";
const CLOSER: &str = "echo done.\n) 2>&1 | tee /var/log/startup.log\n";

/// Distinctive lines from each role's `install` and `configure` fragments.
fn markers(role: Role) -> (&'static str, &'static str) {
    match role {
        Role::Worker => (
            "apt-get install -y apt-transport-https prips",
            "kubeadm join --token",
        ),
        Role::ControlPlane => (
            "curl -sSL https://dl.k8s.io/release/",
            "kubeadm init --config",
        ),
    }
}

fn cluster() -> Arc<ClusterDescriptor> {
    Arc::new(ClusterDescriptor {
        api_endpoints: vec![ApiEndpoint::new("10.0.0.1", 443)],
        network: ClusterNetwork {
            services: ["10.96.0.0/12"].into_iter().collect(),
            pods: ["192.168.0.0/16"].into_iter().collect(),
            service_domain: "cluster.local".to_string(),
        },
    })
}

fn machine() -> Arc<MachineDescriptor> {
    Arc::new(MachineDescriptor {
        name: "node-1".to_string(),
        versions: MachineVersions {
            kubelet: "1.9.0".to_string(),
            control_plane: Some("1.9.1".to_string()),
        },
    })
}

fn request() -> RenderRequest {
    RenderRequest::new("abcdef.0123456789abcdef")
        .with_cluster(cluster())
        .with_machine(machine())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("kubeboot=trace")
        .try_init();
}

fn render(templates: &Templates, role: Role, req: &RenderRequest) -> String {
    let res = match role {
        Role::Worker => templates.render_worker_script(req),
        Role::ControlPlane => templates.render_control_plane_script(req),
    };
    res.unwrap_or_else(|error| panic!("{role} script must render: {error}"))
}

fn assert_wrapped(script: &str) {
    assert!(script.starts_with(PREAMBLE), "missing preamble:\n{script}");
    assert!(script.ends_with(CLOSER), "missing closer:\n{script}");
    assert_eq!(script.matches("#!/bin/bash").count(), 1);
    assert_eq!(script.matches("set -e\n").count(), 1);
    assert_eq!(script.matches(CLOSER).count(), 1);
}

#[test]
fn full_script_installs_then_configures() {
    init_tracing();
    let templates = Templates::new();
    for role in [Role::Worker, Role::ControlPlane] {
        let script = render(&templates, role, &request());
        assert_wrapped(&script);

        let (install, configure) = markers(role);
        assert_eq!(script.matches(install).count(), 1, "{role}");
        assert_eq!(script.matches(configure).count(), 1, "{role}");
        let install_at = script.find(install).expect("install must be present");
        let configure_at = script.find(configure).expect("configure must be present");
        assert!(install_at < configure_at, "{role} must install first");
    }
}

#[test]
fn preloaded_script_only_configures() {
    let templates = Templates::new();
    let req = request().with_preloaded(true);
    for role in [Role::Worker, Role::ControlPlane] {
        let script = render(&templates, role, &req);
        assert_wrapped(&script);

        let (install, configure) = markers(role);
        assert_eq!(script.matches(install).count(), 0, "{role}");
        assert_eq!(script.matches(configure).count(), 1, "{role}");
        assert!(!script.contains("swapoff -a"), "{role} must not install");
    }
}

#[test]
fn worker_script_substitutes_request_fields() {
    let script = Templates::new()
        .render_worker_script(&request())
        .expect("worker script must render");
    for line in [
        "KUBELET_VERSION=1.9.0\n",
        "TOKEN=abcdef.0123456789abcdef\n",
        "MASTER=10.0.0.1:443\n",
        "MACHINE=node-1\n",
        "CLUSTER_DNS_DOMAIN=cluster.local\n",
        "SERVICE_CIDR=10.96.0.0/12\n",
    ] {
        assert!(script.contains(line), "missing {line:?}");
    }
}

#[test]
fn control_plane_script_substitutes_request_fields() {
    let script = Templates::new()
        .render_control_plane_script(&request())
        .expect("control-plane script must render");
    for line in [
        "KUBELET_VERSION=1.9.0\n",
        "TOKEN=abcdef.0123456789abcdef\n",
        "PORT=443\n",
        "MACHINE=node-1\n",
        "CONTROL_PLANE_VERSION=1.9.1\n",
        "CLUSTER_DNS_DOMAIN=cluster.local\n",
        "POD_CIDR=192.168.0.0/16\n",
        "SERVICE_CIDR=10.96.0.0/12\n",
    ] {
        assert!(script.contains(line), "missing {line:?}");
    }
}

#[test]
fn preload_script_pulls_images_in_order() {
    let templates = Templates::new();
    let script = templates
        .render_worker_preload_script("1.9.0", ["imgA", "imgB"])
        .expect("preload script must render");
    assert_wrapped(&script);

    let pulls = script
        .lines()
        .filter(|l| l.starts_with("docker pull"))
        .collect::<Vec<_>>();
    assert_eq!(pulls, ["docker pull imgA", "docker pull imgB"]);
    assert!(script.contains("systemctl start docker || true\n\ndocker pull imgA\n"));
    assert!(script.contains("docker pull imgB\n\necho done.\n"));

    let (install, configure) = markers(Role::Worker);
    assert!(script.contains(install));
    assert!(!script.contains(configure));
}

#[test]
fn preload_script_without_images_pulls_nothing() {
    let templates = Templates::new();
    let script = templates
        .render_worker_preload_script("1.9.0", Vec::<String>::new())
        .expect("preload script must render");
    assert_wrapped(&script);
    assert_eq!(script.matches("docker pull").count(), 0);
}

#[test]
fn preload_script_does_not_deduplicate_images() {
    let script = Templates::new()
        .render_worker_preload_script("1.9.0", ["a", "a"])
        .expect("preload script must render");
    assert_eq!(script.matches("docker pull a\n").count(), 2);
}

#[test]
fn control_plane_preload_script_uses_kubelet_version() {
    let script = Templates::new()
        .render_control_plane_image_preload_script("1.9.0", ["k8s.gcr.io/pause:3.1"])
        .expect("preload script must render");
    assert_wrapped(&script);
    assert!(script.contains("KUBELET_VERSION=1.9.0\n"));
    assert!(script.contains("docker pull k8s.gcr.io/pause:3.1\n"));

    let (install, configure) = markers(Role::ControlPlane);
    assert!(script.contains(install));
    assert!(!script.contains(configure));
}

#[test]
fn rendering_is_idempotent() {
    let templates = Templates::new();
    let req = request().with_images(["imgA"]);
    for role in [Role::Worker, Role::ControlPlane] {
        assert_eq!(
            render(&templates, role, &req),
            render(&templates, role, &req)
        );
    }
    assert_eq!(
        templates.render_worker_preload_script("1.9.0", ["imgA"]),
        templates.render_worker_preload_script("1.9.0", ["imgA"]),
    );
}

#[test]
fn missing_cluster_fails_without_output() {
    init_tracing();
    let templates = Templates::new();
    let req = RenderRequest::new("token").with_machine(machine());

    assert_eq!(
        templates.render_worker_script(&req),
        Err(RenderError::MissingField {
            field: Field::ApiEndpoint
        })
    );
    assert_eq!(
        templates.render_control_plane_script(&req),
        Err(RenderError::MissingField {
            field: Field::ServiceDomain
        })
    );
}

#[test]
fn missing_machine_fails() {
    let req = RenderRequest::new("token").with_cluster(cluster());
    assert_eq!(
        Templates::new().render_worker_script(&req.with_preloaded(true)),
        Err(RenderError::MissingField {
            field: Field::KubeletVersion
        })
    );
}

#[test]
fn control_plane_requires_control_plane_version() {
    let machine = MachineDescriptor {
        versions: MachineVersions {
            control_plane: None,
            ..machine().versions.clone()
        },
        ..(*machine()).clone()
    };
    let req = request().with_machine(machine);

    assert_eq!(
        Templates::new().render_control_plane_script(&req),
        Err(RenderError::MissingField {
            field: Field::ControlPlaneVersion
        })
    );
    // Workers never reference it.
    assert!(Templates::new().render_worker_script(&req).is_ok());
}

#[test]
fn renders_concurrently_from_shared_templates() {
    let templates = Arc::new(Templates::new());
    let req = request().with_images(["imgA", "imgB"]);
    let expected = render(&templates, Role::ControlPlane, &req);

    std::thread::scope(|s| {
        let handles = (0..8)
            .map(|_| s.spawn(|| render(&templates, Role::ControlPlane, &req)))
            .collect::<Vec<_>>();
        for handle in handles {
            assert_eq!(handle.join().expect("render thread must not panic"), expected);
        }
    });
}
