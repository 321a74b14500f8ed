use anyhow::Result;
use async_trait::async_trait;
use clap::Args;
use medgate::server::config::ServerConfig;

use super::{ConfigArgs, RunCommand};

/// Print the completed server configuration in JSON format and exit.
#[derive(Args)]
pub struct PrintConfigArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
}

#[async_trait(?Send)]
impl RunCommand for PrintConfigArgs {
    async fn run(&self) -> Result<()> {
        let ps = self.config.build_path_set()?;
        let mut cfg: ServerConfig = ps.load_config("server")?;
        if !cfg.authn.token.secret.is_empty() {
            cfg.authn.token.secret = String::from("<redacted>");
        }
        println!("{}", serde_json::to_string_pretty(&cfg)?);
        Ok(())
    }
}
