//! Subcommand implementations: wiring, not policy.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use skiff_cluster::{
    paths, BackoffConfig, ClusterAssembler, ClusterCleaner, ClusterPaths, ClusterSpec,
    HostOutcome, NodeRemover, Outcome, StateFile,
};
use skiff_transport::{SshCredentials, SshTransport, Transport};

use crate::membership::KubectlMembership;

struct Wiring {
    transport: Arc<dyn Transport>,
    paths: ClusterPaths,
    state_file: StateFile,
}

fn wire(data_dir: &Path, creds: SshCredentials) -> anyhow::Result<Wiring> {
    let paths = ClusterPaths::discover(data_dir).context("locating skiff executable")?;
    let state_file = StateFile::new(paths.state_file());
    Ok(Wiring {
        transport: Arc::new(SshTransport::new(creds)),
        paths,
        state_file,
    })
}

pub async fn init(
    data_dir: &Path,
    masters: Vec<String>,
    workers: Vec<String>,
    cni: String,
    pod_cidr: String,
    service_cidr: String,
    creds: SshCredentials,
) -> anyhow::Result<()> {
    let w = wire(data_dir, creds.clone())?;
    let spec = ClusterSpec {
        masters,
        workers,
        ssh: creds,
        cni,
        data_dir: data_dir.to_path_buf(),
        pod_cidr,
        service_cidr,
    };

    let assembler = ClusterAssembler::new(
        w.transport,
        w.state_file,
        w.paths,
        BackoffConfig::default(),
    );
    let state = assembler.init_node(&spec).await?;

    if let Some(init) = state.init_node() {
        // Best effort: a slow workload rollout should not fail `init`.
        skiff_cluster::wait_system_ready(&format!("{}:{}", init.host, paths::WORKLOAD_PORT)).await;
    }

    info!(nodes = state.nodes.len(), "cluster is up");
    Ok(())
}

pub async fn join(
    data_dir: &Path,
    masters: Vec<String>,
    workers: Vec<String>,
    creds: SshCredentials,
) -> anyhow::Result<()> {
    let w = wire(data_dir, creds.clone())?;
    let spec = ClusterSpec {
        masters,
        workers,
        ssh: creds,
        data_dir: data_dir.to_path_buf(),
        ..ClusterSpec::default()
    };

    let assembler = ClusterAssembler::new(
        w.transport,
        w.state_file,
        w.paths,
        BackoffConfig::default(),
    );
    let state = assembler.join_node(&spec).await?;
    info!(nodes = state.nodes.len(), "join finished");
    Ok(())
}

pub async fn delete(
    data_dir: &Path,
    nodes: Vec<String>,
    creds: SshCredentials,
) -> anyhow::Result<()> {
    let w = wire(data_dir, creds)?;
    let membership = Arc::new(KubectlMembership::new(w.paths.kubeconfig.clone()));

    let remover = NodeRemover::new(w.transport, membership, w.state_file);
    let outcomes = remover.remove(&nodes).await?;
    report(&outcomes);
    Ok(())
}

pub async fn clean(data_dir: &Path, creds: SshCredentials) -> anyhow::Result<()> {
    let w = wire(data_dir, creds)?;

    let cleaner = ClusterCleaner::new(w.transport, w.state_file);
    let outcomes = cleaner.clean_all().await?;
    report(&outcomes);
    Ok(())
}

pub fn status(data_dir: &Path) -> anyhow::Result<()> {
    let paths = ClusterPaths::discover(data_dir)?;
    let state = StateFile::new(paths.state_file()).load()?;
    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}

fn report(outcomes: &[HostOutcome]) {
    for o in outcomes {
        match &o.outcome {
            Outcome::Cleaned => println!("{}: cleaned", o.host),
            Outcome::Protected => println!("{}: protected (init node)", o.host),
            Outcome::CleanFailed(reason) => println!("{}: clean failed: {reason}", o.host),
        }
    }
}
