mod config;
mod hash;
mod identity;
mod serve;

use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use clap::{Args, Parser, Subcommand};
use medgate::config::PathSet;

#[async_trait(?Send)]
pub trait RunCommand {
    async fn run(&self) -> Result<()>;
}

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// The config directory. Default: $MEDGATE_CONFIG, /etc/medgate for root,
    /// otherwise ~/.config/medgate.
    #[arg(long)]
    pub config_dir: Option<PathBuf>,

    /// The data directory. Default: $MEDGATE_DATA, /var/lib/medgate for root,
    /// otherwise ~/.local/share/medgate.
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

impl ConfigArgs {
    pub fn build_path_set(&self) -> Result<PathSet> {
        PathSet::new(self.config_dir.clone(), self.data_dir.clone())
    }
}

/// Authentication and role-based access gateway for hospital records.
#[derive(Parser)]
#[command(author, about, version)]
pub struct App {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    Serve(serve::ServeArgs),
    AddIdentity(identity::AddIdentityArgs),
    HashPassword(hash::HashPasswordArgs),
    PrintConfig(config::PrintConfigArgs),
}

#[async_trait(?Send)]
impl RunCommand for App {
    async fn run(&self) -> Result<()> {
        match &self.command {
            Commands::Serve(args) => args.run().await,
            Commands::AddIdentity(args) => args.run().await,
            Commands::HashPassword(args) => args.run().await,
            Commands::PrintConfig(args) => args.run().await,
        }
    }
}
