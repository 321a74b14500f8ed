use anyhow::{bail, Result};
use async_trait::async_trait;
use clap::Args;
use medgate::server::authn::password::hash_password;
use medgate::server::authz::Role;
use medgate::server::config::ServerConfig;
use medgate::server::db::factory::DbFactory;
use medgate::server::db::IdentityRecord;

use super::hash::read_password;
use super::{ConfigArgs, RunCommand};

/// Create an identity, or reset the role and password of an existing one.
/// The password is read from stdin when not given.
#[derive(Args)]
pub struct AddIdentityArgs {
    /// Numeric login identifier, must be greater than 0.
    pub identifier: u64,

    /// One of administrator, physician, nurse, clerk, auditor.
    #[arg(short, long)]
    pub role: String,

    #[arg(short, long)]
    pub password: Option<String>,

    #[command(flatten)]
    pub config: ConfigArgs,
}

#[async_trait(?Send)]
impl RunCommand for AddIdentityArgs {
    async fn run(&self) -> Result<()> {
        if self.identifier == 0 {
            bail!("identifier must be greater than 0");
        }
        let role = Role::from_name(&self.role);
        if !role.is_known() {
            bail!("unknown role '{}'", self.role);
        }

        let ps = self.config.build_path_set()?;
        let cfg: ServerConfig = ps.load_config("server")?;

        let password = match self.password {
            Some(ref password) => password.clone(),
            None => read_password()?,
        };
        let hash = hash_password(&password, cfg.authn.bcrypt_cost)?;

        let db = DbFactory::new().build_db(&cfg.db)?;
        let (id, created) = db.with_transaction(|tx| {
            match tx.get_identity_by_identifier(self.identifier)? {
                Some(record) => {
                    tx.update_identity_role(record.id, role.name())?;
                    tx.update_identity_hash(record.id, &hash)?;
                    Ok((record.id, false))
                }
                None => {
                    let record = IdentityRecord::new(self.identifier, role.name(), hash.clone());
                    let id = tx.create_identity(&record)?;
                    Ok((id, true))
                }
            }
        })?;

        if created {
            println!("Created identity {id} ({}) as {role}", self.identifier);
        } else {
            println!("Updated identity {id} ({}) as {role}", self.identifier);
        }
        Ok(())
    }
}
