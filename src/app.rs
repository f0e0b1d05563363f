use crate::{
    api,
    service::BoxGateway,
    setting::Setting,
    ws::WsHub,
    Result, Service,
};
use actix::{Actor, Addr};
use actix_cors::Cors;
use actix_web::{
    body::MessageBody,
    dev::{ServiceFactory, ServiceRequest},
    middleware, web, App as WebApp, HttpServer,
};
use payment_gateway::{Flutterwave, Monnify, Paystack};
use sea_orm::{ConnectOptions, Database};
use std::{path::Path, sync::Arc, time::Duration};
use tracing::info;

pub struct AppState {
    pub service: Service,
    pub setting: Setting,
    pub hub: Addr<WsHub>,
}

impl AppState {
    pub async fn create<P: AsRef<Path>>(
        setting_path: Option<P>,
        setting_env_prefix: Option<String>,
    ) -> Result<Self> {
        let env_notice = setting_env_prefix
            .as_ref()
            .map(|s| {
                format!(
                    ", config will be overrided by ENV seting with prefix `{}_`",
                    s
                )
            })
            .unwrap_or_default();

        let setting = if let Some(path) = setting_path {
            info!("Load config {:?}{}", path.as_ref(), env_notice);
            Setting::read(path.as_ref(), setting_env_prefix)?
        } else if let Some(prefix) = setting_env_prefix {
            info!("Load default config{}", env_notice);
            Setting::from_env(prefix)?
        } else {
            info!("Load default config");
            Setting::default()
        };

        Self::from_setting(setting).await
    }

    /// Connect the database and build a client for every configured gateway.
    /// Must run inside an actix system, the chat hub is an actor.
    pub async fn from_setting(setting: Setting) -> Result<Self> {
        let gateways = create_gateways(&setting)?;

        let mut options = ConnectOptions::from(&setting.db_url);
        options.sqlx_logging_level(tracing::log::LevelFilter::Trace);
        let conn = Database::connect(options).await?;
        let mut service = Service::new(conn, &setting);
        for gateway in gateways {
            info!("Payment gateway {} enabled", gateway.provider());
            service.add_gateway(gateway);
        }

        let hub = WsHub::new().start();
        Ok(Self {
            service,
            setting,
            hub,
        })
    }
}

/// gateways with credentials set
fn create_gateways(setting: &Setting) -> Result<Vec<BoxGateway>> {
    let timeout = Some(Duration::from_secs(setting.payment.timeout));
    let mut gateways: Vec<BoxGateway> = vec![];
    let s = &setting.paystack;
    if !s.secret_key.is_empty() {
        gateways.push(Box::new(Paystack::new(
            s.secret_key.clone(),
            s.base_url.clone(),
            timeout,
        )?));
    }
    let s = &setting.flutterwave;
    if !s.secret_key.is_empty() {
        gateways.push(Box::new(Flutterwave::new(
            s.secret_key.clone(),
            s.secret_hash.clone(),
            s.base_url.clone(),
            timeout,
        )?));
    }
    let s = &setting.monnify;
    if !s.api_key.is_empty() && !s.secret_key.is_empty() {
        gateways.push(Box::new(Monnify::new(
            s.api_key.clone(),
            s.secret_key.clone(),
            s.contract_code.clone(),
            s.source_account.clone(),
            s.base_url.clone(),
            timeout,
        )?));
    }
    Ok(gateways)
}

pub fn create_web_app(
    data: web::Data<AppState>,
) -> WebApp<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    WebApp::new()
        .app_data(data)
        .wrap(middleware::Logger::default()) // enable logger
        .wrap(
            Cors::default()
                .allow_any_header()
                .allow_any_origin()
                .allow_any_method()
                .max_age(86_400),
        )
        .configure(api::configure)
}

/// start the periodic reconcile, audit and renewal task
pub fn start_jobs(state: Arc<AppState>) {
    let jobs = state.setting.jobs.clone();
    if !jobs.enabled {
        info!("Periodic jobs disabled");
        return;
    }
    info!("Start periodic jobs every {}s", jobs.interval);
    let _r = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(jobs.interval.max(1)));
        loop {
            interval.tick().await;
            state
                .service
                .run_jobs(jobs.pending_age, jobs.lookback)
                .await;
        }
    });
}

/// start app and tasks
pub async fn start(state: AppState) -> Result<()> {
    let state = web::Data::new(state);

    start_jobs(state.clone().into_inner());

    let c_data = state.clone();
    let server = HttpServer::new(move || create_web_app(c_data.clone()));
    let num = if state.setting.thread.http == 0 {
        num_cpus::get()
    } else {
        state.setting.thread.http
    };
    let host = state.setting.network.host.clone();
    let port = state.setting.network.port;
    info!("Start http server {}:{}", host, port);
    server.workers(num).bind((host, port))?.run().await?;
    Ok(())
}
