use std::io::{self, BufRead};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use clap::Args;
use medgate::server::authn::password::hash_password;

use super::RunCommand;

/// Hash a password with bcrypt, for seeding the identity table by hand.
/// The password is read from stdin when not given.
#[derive(Args)]
pub struct HashPasswordArgs {
    pub password: Option<String>,

    /// The bcrypt cost.
    #[arg(long, default_value = "12")]
    pub cost: u32,
}

#[async_trait(?Send)]
impl RunCommand for HashPasswordArgs {
    async fn run(&self) -> Result<()> {
        let password = match self.password {
            Some(ref password) => password.clone(),
            None => read_password()?,
        };
        let hash = hash_password(&password, self.cost)?;
        println!("{hash}");
        Ok(())
    }
}

pub fn read_password() -> Result<String> {
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("read password from stdin")?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        bail!("password cannot be empty");
    }
    Ok(password)
}
