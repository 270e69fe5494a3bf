//! dnsherd binary

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use dnsherd::backup::CrontabScheduler;
use dnsherd::cluster::{ClusterNode, MetadataSource};
use dnsherd::db::HttpDatabaseClient;
use dnsherd::naming::RestNaming;
use dnsherd::service::Service;
use dnsherd::{Config, PromotionReason};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Timeout applied to naming API calls
const NAMING_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command(name = "dnsherd")]
#[command(about = "Self-assembling database cluster coordination over DNS")]
#[command(version)]
struct Cli {
    /// Config file (dnsherd.toml in the working directory when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bootstrap this node as a primary or replica
    Init {
        /// Take the primary name even if another node holds it
        #[arg(long)]
        force_claim: bool,
    },

    /// Promote the local replica to primary
    Promote {
        /// Override the active-primary safety check
        #[arg(long)]
        force: bool,

        /// Also take over the primary name after a successful promotion
        #[arg(long)]
        take_name: bool,
    },

    /// Release the primary name binding
    Release,

    /// Show this node's resolved role and local replica state
    Status,
}

type Node = ClusterNode<RestNaming, HttpDatabaseClient, Service, CrontabScheduler>;

async fn build_node(config: Config) -> anyhow::Result<Node> {
    let provider = MetadataSource::from_config(&config.metadata);
    let naming = RestNaming::new(&config.naming.endpoint, &config.naming.zone, NAMING_TIMEOUT)?;
    let db = HttpDatabaseClient::from_config(&config.database)?;
    let service = Service::from_config(&config.service)?;
    let backup = CrontabScheduler::new(config.backup.user.clone());

    Ok(ClusterNode::new(&provider, config, naming, db, service, backup).await?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Init { force_claim } => {
            if force_claim {
                config.naming.force_claim = true;
            }
            let mut node = build_node(config).await?;
            let role = node.initialise().await?;
            println!("Node initialised as {}", role);
        }

        Commands::Promote { force, take_name } => {
            let node = build_node(config).await?;
            let outcome = node.promote(force).await?;

            if outcome.succeeded {
                println!("Promotion succeeded");
                if take_name {
                    node.claim_primary(true).await?;
                    println!("Primary name {} now points at this node", node.primary_name());
                }
            } else {
                match outcome.reason {
                    Some(PromotionReason::ActivePrimaryExists) => {
                        println!("There is an active primary at {}", node.primary_name());
                        println!("Refusing to promote without --force");
                    }
                    Some(PromotionReason::NotAReplica { output }) => {
                        println!("This node is not a replica and can not be promoted:");
                        print!("{}", output);
                    }
                    Some(PromotionReason::CommandFailed { output }) => {
                        println!("Promotion command failed:");
                        print!("{}", output);
                    }
                    None => {}
                }
                anyhow::bail!("promotion failed");
            }
        }

        Commands::Release => {
            let node = build_node(config).await?;
            node.release_primary().await?;
            println!("Released {}", node.primary_name());
        }

        Commands::Status => {
            let node = build_node(config).await?;
            println!("Node: {} ({})", node.identity().stable_id, node.identity().advertised_address);
            println!("Primary name: {}", node.primary_name());
            println!("Replica pool: {}", node.replica_pool_name());

            let role = node.resolve_role().await?;
            println!("Resolved role: {}", role);

            match node.check_replica().await {
                Ok(true) => println!("Local database: replica (in recovery)"),
                Ok(false) => println!("Local database: primary (accepting writes)"),
                Err(e) => println!("Local database: unreachable ({})", e),
            }
        }
    }

    Ok(())
}
