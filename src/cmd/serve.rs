use anyhow::Result;
use async_trait::async_trait;
use clap::Args;
use medgate::server::config::ServerConfig;
use medgate::server::factory::ServerFactory;

use super::{ConfigArgs, RunCommand};

/// Start the gateway. Serves `/login`, `/healthz` and the protected `/api`
/// routes over HTTP or HTTPS.
#[derive(Args)]
pub struct ServeArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
}

#[async_trait(?Send)]
impl RunCommand for ServeArgs {
    async fn run(&self) -> Result<()> {
        let ps = self.config.build_path_set()?;
        let cfg: ServerConfig = ps.load_config("server")?;
        cfg.logs.init()?;

        let factory = ServerFactory::new(cfg)?;
        let srv = factory.build_server()?;
        srv.run().await
    }
}
