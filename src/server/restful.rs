use std::sync::Arc;
use std::time::Duration;

use actix_web::web::{self, Bytes, Data, PayloadConfig};
use actix_web::{App, HttpRequest, HttpResponse, HttpServer};
use anyhow::{Context, Result};
use log::{info, warn};
use openssl::ssl::SslAcceptorBuilder;
use sd_notify::NotifyState;

use super::handlers::api::ApiHandler;
use super::handlers::healthz::HealthzHandler;
use super::handlers::login::LoginHandler;
use super::handlers::Handler;
use super::response::Response;

pub struct RestfulServer {
    ssl: Option<SslAcceptorBuilder>,
    ctx: Arc<RestfulContext>,

    keep_alive_secs: Option<u64>,
    workers: Option<u64>,

    bind: String,

    payload_limit_mib: usize,
}

pub struct RestfulContext {
    pub api_handler: ApiHandler,
    pub healthz_handler: HealthzHandler,
    pub login_handler: LoginHandler,
}

impl RestfulServer {
    const API_PATH: &'static str = "/api";
    const HEALTHZ_PATH: &'static str = "/healthz";
    const LOGIN_PATH: &'static str = "/login";

    pub fn new(
        bind: String,
        ssl: Option<SslAcceptorBuilder>,
        ctx: Arc<RestfulContext>,
        payload_limit_mib: usize,
    ) -> Self {
        Self {
            ssl,
            ctx,
            keep_alive_secs: None,
            workers: None,
            bind,
            payload_limit_mib,
        }
    }

    pub fn set_keep_alive_secs(&mut self, keep_alive_secs: u64) {
        self.keep_alive_secs = Some(keep_alive_secs);
    }

    pub fn set_workers(&mut self, workers: u64) {
        self.workers = Some(workers);
    }

    /// Registers every route and its shared state. Used by [`Self::run`] and
    /// by tests that mount the routes on a test service.
    pub fn configure(
        ctx: Arc<RestfulContext>,
        payload_limit_mib: usize,
    ) -> impl Fn(&mut web::ServiceConfig) + Clone + Send + 'static {
        move |cfg: &mut web::ServiceConfig| {
            cfg.app_data(Data::new(ctx.clone()))
                .app_data(PayloadConfig::new(payload_limit_mib * 1024 * 1024))
                .service(
                    web::scope(Self::API_PATH)
                        .route("", web::route().to(Self::handle_api))
                        .route("/{path:.*}", web::route().to(Self::handle_api)),
                )
                .service(
                    web::resource(Self::HEALTHZ_PATH)
                        .route(web::get().to(Self::handle_healthz))
                        .default_service(web::route().to(Self::method_not_allowed)),
                )
                .service(
                    web::resource(Self::LOGIN_PATH)
                        .route(web::post().to(Self::handle_login))
                        .default_service(web::route().to(Self::method_not_allowed)),
                );
        }
    }

    pub async fn run(mut self) -> Result<()> {
        let configure = Self::configure(self.ctx.clone(), self.payload_limit_mib);
        let mut srv = HttpServer::new(move || {
            App::new()
                .configure(configure.clone())
                .default_service(web::route().to(Self::default_handler))
        });

        if let Some(ssl) = self.ssl.take() {
            info!("Binding to https://{}", self.bind);
            srv = srv.bind_openssl(&self.bind, ssl).context("bind with ssl")?
        } else {
            warn!("Using HTTP (without SSL), tokens and passwords travel in clear text");
            info!("Binding to http://{}", self.bind);
            srv = srv.bind(&self.bind).context("bind without ssl")?
        };

        if let Some(keep_alive) = self.keep_alive_secs {
            srv = srv.keep_alive(Duration::from_secs(keep_alive));
        }
        if let Some(workers) = self.workers {
            srv = srv.workers(workers as usize);
        }

        if let Err(e) = sd_notify::notify(true, &[NotifyState::Ready]) {
            warn!("Failed to notify systemd: {e}");
        }
        info!("Starting restful server");
        srv.run().await.context("run server")?;

        info!("Server stopped by user");
        Ok(())
    }

    async fn handle_api(
        req: HttpRequest,
        body: Option<Bytes>,
        ctx: Data<Arc<RestfulContext>>,
    ) -> HttpResponse {
        let path = Self::parse_path(Self::API_PATH, &req);
        let body = Self::parse_body(body);

        ctx.api_handler.handle(&path, req, body).into()
    }

    async fn handle_healthz(req: HttpRequest, ctx: Data<Arc<RestfulContext>>) -> HttpResponse {
        ctx.healthz_handler.handle("", req, None).into()
    }

    async fn handle_login(
        req: HttpRequest,
        body: Option<Bytes>,
        ctx: Data<Arc<RestfulContext>>,
    ) -> HttpResponse {
        let body = Self::parse_body(body);

        ctx.login_handler.handle("", req, body).into()
    }

    async fn method_not_allowed() -> HttpResponse {
        Response::method_not_allowed().into()
    }

    async fn default_handler(req: HttpRequest) -> HttpResponse {
        let message = format!("no route to {} {}", req.method(), req.uri().path());
        Response::not_found(message).into()
    }

    fn parse_path(route: &str, req: &HttpRequest) -> String {
        let path = req.uri().path();
        let path = path.strip_prefix(route).unwrap_or(path);
        String::from(path.trim_matches('/'))
    }

    fn parse_body(body: Option<Bytes>) -> Option<Vec<u8>> {
        body.filter(|b| !b.is_empty()).map(|b| b.to_vec())
    }
}
