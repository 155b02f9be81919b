//! skiff — bootstrap a lightweight Kubernetes cluster over SSH.
//!
//! Single binary that wires the transport, the persisted cluster
//! state, and the lifecycle components together:
//! - `init`   creates a cluster from the given masters and workers
//! - `join`   extends a running cluster with more hosts
//! - `delete` removes individual nodes (the init node is protected)
//! - `clean`  tears down every recorded host
//! - `status` prints the persisted cluster record
//!
//! # Usage
//!
//! ```text
//! skiff init --master 10.0.0.1 --master 10.0.0.2 --worker 10.0.0.3
//! skiff join --worker 10.0.0.4
//! skiff delete --node 10.0.0.3
//! skiff clean
//! ```

mod commands;
mod membership;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "skiff", version, about = "Lightweight Kubernetes cluster bootstrapper")]
struct Cli {
    /// Data directory for state, manifests, scripts, and binaries.
    #[arg(long, global = true, default_value = "/var/lib/skiff")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Clone)]
struct SshArgs {
    /// SSH user for all hosts.
    #[arg(long, default_value = "root")]
    user: String,

    /// SSH port for all hosts.
    #[arg(long, default_value = "22")]
    ssh_port: u16,

    /// SSH password (prefer --key-path where possible).
    #[arg(long)]
    password: Option<String>,

    /// Private key path.
    #[arg(long)]
    key_path: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Create a cluster; the first master becomes the control plane.
    Init {
        /// Master candidate, repeatable.
        #[arg(long = "master", required = true)]
        masters: Vec<String>,

        /// Worker candidate, repeatable.
        #[arg(long = "worker")]
        workers: Vec<String>,

        /// CNI backend.
        #[arg(long, default_value = "flannel")]
        cni: String,

        /// Pod network CIDR.
        #[arg(long, default_value = "10.42.0.0/16")]
        pod_cidr: String,

        /// Service network CIDR.
        #[arg(long, default_value = "10.43.0.0/16")]
        service_cidr: String,

        #[command(flatten)]
        ssh: SshArgs,
    },

    /// Join additional hosts into an existing cluster.
    Join {
        /// Master candidate, repeatable.
        #[arg(long = "master")]
        masters: Vec<String>,

        /// Worker candidate, repeatable.
        #[arg(long = "worker")]
        workers: Vec<String>,

        #[command(flatten)]
        ssh: SshArgs,
    },

    /// Remove individual nodes. The init node is never removed.
    Delete {
        /// Host to remove, repeatable.
        #[arg(long = "node", required = true)]
        nodes: Vec<String>,

        #[command(flatten)]
        ssh: SshArgs,
    },

    /// Tear down every host the cluster ever touched.
    Clean {
        #[command(flatten)]
        ssh: SshArgs,
    },

    /// Print the persisted cluster record as JSON.
    Status,

    /// Print the skiff version.
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,skiff=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let data_dir = cli.data_dir;

    match cli.command {
        Command::Init {
            masters,
            workers,
            cni,
            pod_cidr,
            service_cidr,
            ssh,
        } => {
            commands::init(
                &data_dir,
                masters,
                workers,
                cni,
                pod_cidr,
                service_cidr,
                ssh.into(),
            )
            .await
        }
        Command::Join {
            masters,
            workers,
            ssh,
        } => commands::join(&data_dir, masters, workers, ssh.into()).await,
        Command::Delete { nodes, ssh } => commands::delete(&data_dir, nodes, ssh.into()).await,
        Command::Clean { ssh } => commands::clean(&data_dir, ssh.into()).await,
        Command::Status => commands::status(&data_dir),
        Command::Version => {
            // Also the on-host self check after the binary is copied out.
            println!("skiff {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

impl From<SshArgs> for skiff_transport::SshCredentials {
    fn from(args: SshArgs) -> Self {
        Self {
            user: args.user,
            port: args.ssh_port,
            password: args.password,
            key_path: args.key_path,
        }
    }
}
