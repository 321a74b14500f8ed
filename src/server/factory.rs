use std::sync::Arc;

use anyhow::{Context, Result};
use openssl::ssl::{SslAcceptor, SslAcceptorBuilder, SslFiletype, SslMethod};

use super::audit::{AuditSink, LogAuditSink};
use super::authn::factory::AuthnFactory;
use super::authn::token::factory::TokenFactory;
use super::authz::factory::AuthzFactory;
use super::config::ServerConfig;
use super::db::factory::DbFactory;
use super::db::{Database, IdentityStore};
use super::handlers::api::ApiHandler;
use super::handlers::healthz::HealthzHandler;
use super::handlers::login::LoginHandler;
use super::restful::{RestfulContext, RestfulServer};

pub struct ServerFactory {
    db: Arc<Database>,
    cfg: ServerConfig,
}

impl ServerFactory {
    pub fn new(cfg: ServerConfig) -> Result<Self> {
        let db_factory = DbFactory::new();
        let db = db_factory.build_db(&cfg.db).context("init database")?;
        Ok(Self { cfg, db })
    }

    pub fn db(&self) -> Arc<Database> {
        self.db.clone()
    }

    pub fn build_server(&self) -> Result<RestfulServer> {
        let ssl = self.build_ssl()?;
        let ctx = self.build_context()?;

        let mut srv =
            RestfulServer::new(self.cfg.bind.clone(), ssl, ctx, self.cfg.payload_limit_mib);
        if self.cfg.keep_alive_secs > 0 {
            srv.set_keep_alive_secs(self.cfg.keep_alive_secs);
        }
        if self.cfg.workers > 0 {
            srv.set_workers(self.cfg.workers);
        }

        Ok(srv)
    }

    pub fn build_ssl(&self) -> Result<Option<SslAcceptorBuilder>> {
        if !self.cfg.ssl {
            return Ok(None);
        }

        let mut builder =
            SslAcceptor::mozilla_intermediate(SslMethod::tls()).context("init ssl acceptor")?;

        builder
            .set_private_key_file(&self.cfg.key_path, SslFiletype::PEM)
            .context("load ssl key file")?;
        builder
            .set_certificate_chain_file(&self.cfg.cert_path)
            .context("load ssl cert file")?;

        Ok(Some(builder))
    }

    pub fn build_context(&self) -> Result<Arc<RestfulContext>> {
        let token_factory = TokenFactory::new(&self.cfg.authn.token).context("init token")?;
        let store: Arc<dyn IdentityStore> = self.db.clone();

        let authn_factory = AuthnFactory::new();
        let authn = authn_factory.build_authenticator(&token_factory, store.clone());
        let verifier = authn_factory.build_password_verifier(&self.cfg.authn);

        let authz_factory = AuthzFactory::new();
        let table = authz_factory
            .build_policy_table(&self.cfg.authz)
            .context("init authorizer")?;
        let authz = authz_factory.build_authorizer(table);

        let audit: Arc<dyn AuditSink> = Arc::new(LogAuditSink);

        let api_handler = ApiHandler::new(authn, authz, audit, self.db.clone());
        let healthz_handler = HealthzHandler::new();
        let login_handler =
            LoginHandler::new(store, verifier, token_factory.build_token_generator());

        let ctx = RestfulContext {
            api_handler,
            healthz_handler,
            login_handler,
        };
        Ok(Arc::new(ctx))
    }
}
