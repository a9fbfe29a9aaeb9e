use actix_web::{dev::Server, middleware::Logger, web, App, HttpServer};
use log::*;
use passport_engine::{
    cache::CacheStore,
    traits::PassportDatabase,
    BrandApi,
    SqliteDatabase,
    TenantDatabases,
    UserApi,
    WalletApi,
};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    middleware::{
        cors,
        InnerTokenMiddlewareFactory,
        RecoveryMiddlewareFactory,
        RequestIdMiddlewareFactory,
    },
    routes::{
        extractor_config,
        health,
        BrandFullInfoRoute,
        BrandListRoute,
        BrandUniminiCheckRoute,
        InnerUserGetRoute,
        LogoutRoute,
        MisInfoRoute,
        MisLoginRoute,
        UserByPhoneRoute,
        UserInfoRoute,
        WalletEditByIdExRoute,
        WalletGetByCondRoute,
        WalletGetSingleByCondRoute,
        WalletGetSingleByIdRoute,
        WxBindInfoRoute,
        WxBindPhoneRoute,
        WxLoginRoute,
        WxRegisterRoute,
        WxUnbindRoute,
    },
};

/// Seconds in-flight requests are given to complete once shutdown starts.
const SHUTDOWN_TIMEOUT: u64 = 5;

/// The connection handles shared by every worker.
#[derive(Clone, Debug)]
pub struct Backends {
    pub db: SqliteDatabase,
    /// Tenant shards are opened, migrated and closed with the server. No HTTP route reads tenant data; callers that
    /// embed the server resolve a tenant's pool with [`TenantDatabases::for_tenant`].
    pub tenants: TenantDatabases,
    pub cache: CacheStore,
}

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let backends = connect_backends(&config).await?;
    let srv = create_server_instance(config, backends.clone())?;
    let result = srv.await.map_err(|e| ServerError::Unspecified(e.to_string()));
    info!("🚀️ Server stopped. Closing connections.");
    backends.db.close().await;
    backends.tenants.close().await;
    result
}

pub async fn connect_backends(config: &ServerConfig) -> Result<Backends, ServerError> {
    let max_connections = config.database.max_connections;
    let db = SqliteDatabase::new_with_url(&config.database.url, max_connections)
        .await
        .map_err(|e| ServerError::InitializeError(format!("Could not open {}. {e}", config.database.url)))?;
    let tenants = TenantDatabases::connect(&config.tenant_databases, max_connections)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    if config.app.run_migrations {
        info!("🚀️ Running database migrations");
        db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
        tenants.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    }
    if tenants.is_empty() {
        info!("🚀️ No tenant databases are configured");
    } else {
        info!("🚀️ Tenant database clusters: {}", tenants.cluster_names().join(", "));
    }
    let cache = CacheStore::connect(&config.cache.url).await?;
    info!("🚀️ Connected to the cache");
    Ok(Backends { db, tenants, cache })
}

/// The domains whose avatars are never replaced on WeChat login. `oss_domain` may list several, comma separated.
fn oss_domains(config: &ServerConfig) -> Vec<String> {
    config.app.oss_domain.split(',').map(str::trim).filter(|d| !d.is_empty()).map(String::from).collect()
}

pub fn create_server_instance(config: ServerConfig, backends: Backends) -> Result<Server, ServerError> {
    let retry = config.cache.retry_policy();
    let domains = oss_domains(&config);
    let inner_token = config.app.inner_token.clone();
    let srv = HttpServer::new(move || {
        let Backends { db, cache, .. } = backends.clone();
        let user_api = UserApi::new(db.clone(), cache).with_retry_policy(retry).with_oss_domains(domains.clone());
        let brand_api = BrandApi::new(db.clone());
        let wallet_api = WalletApi::new(db);
        let user_scope = web::scope("/v1")
            .service(UserByPhoneRoute::<SqliteDatabase, CacheStore>::new())
            .service(WxLoginRoute::<SqliteDatabase, CacheStore>::new())
            .service(WxRegisterRoute::<SqliteDatabase, CacheStore>::new())
            .service(WxBindPhoneRoute::<SqliteDatabase, CacheStore>::new())
            .service(WxBindInfoRoute::<SqliteDatabase, CacheStore>::new())
            .service(WxUnbindRoute::<SqliteDatabase, CacheStore>::new())
            .service(LogoutRoute::<SqliteDatabase, CacheStore>::new())
            .service(UserInfoRoute::<SqliteDatabase, CacheStore>::new())
            .service(MisLoginRoute::<SqliteDatabase, CacheStore>::new())
            .service(MisInfoRoute::<SqliteDatabase, CacheStore>::new())
            .service(BrandListRoute::<SqliteDatabase, CacheStore, SqliteDatabase>::new())
            .service(BrandFullInfoRoute::<SqliteDatabase, CacheStore, SqliteDatabase>::new())
            .service(BrandUniminiCheckRoute::<SqliteDatabase, CacheStore, SqliteDatabase>::new());
        // Routes called by other services in the deployment
        let inner_scope = web::scope("/_inner/v1")
            .wrap(InnerTokenMiddlewareFactory::new(inner_token.clone()))
            .service(InnerUserGetRoute::<SqliteDatabase, CacheStore>::new())
            .service(WalletGetByCondRoute::<SqliteDatabase>::new())
            .service(WalletGetSingleByCondRoute::<SqliteDatabase>::new())
            .service(WalletGetSingleByIdRoute::<SqliteDatabase>::new())
            .service(WalletEditByIdExRoute::<SqliteDatabase>::new());
        App::new()
            .wrap(RecoveryMiddlewareFactory)
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("passport::access_log"))
            .wrap(RequestIdMiddlewareFactory)
            .wrap(cors())
            .configure(extractor_config)
            .app_data(web::Data::new(user_api))
            .app_data(web::Data::new(brand_api))
            .app_data(web::Data::new(wallet_api))
            .service(health)
            .service(user_scope)
            .service(inner_scope)
    })
    .shutdown_timeout(SHUTDOWN_TIMEOUT)
    .client_request_timeout(config.server.read_timeout())
    .client_disconnect_timeout(config.server.write_timeout())
    .bind((config.server.host.as_str(), config.server.http_port))?
    .run();
    Ok(srv)
}

#[cfg(test)]
mod test {
    use passport_engine::ShardConfig;

    use super::*;

    fn temp_db_url(name: &str) -> String {
        let dir = std::env::temp_dir();
        format!("sqlite://{}/passport_server_{name}_{}.db", dir.display(), uuid::Uuid::new_v4())
    }

    #[actix_web::test]
    async fn backends_open_tenant_shards() {
        let mut config = ServerConfig::default();
        config.database.url = temp_db_url("main");
        config.cache.url = "memory://".to_string();
        config.app.run_migrations = true;
        config.tenant_databases = vec![
            ShardConfig { cluster_name: "east".into(), url: temp_db_url("east"), tenant_ids: vec![1, 2] },
            ShardConfig { cluster_name: "west".into(), url: temp_db_url("west"), tenant_ids: vec![3] },
        ];
        let backends = connect_backends(&config).await.unwrap();
        assert_eq!(backends.tenants.cluster_names(), vec!["east", "west"]);
        assert!(backends.tenants.for_tenant(3).is_ok());
        assert!(backends.tenants.for_tenant(4).is_err());
        backends.db.close().await;
        backends.tenants.close().await;

        config.tenant_databases[1].tenant_ids = vec![2];
        let err = connect_backends(&config).await.unwrap_err();
        assert!(matches!(err, ServerError::InitializeError(_)), "{err}");
    }

    #[test]
    fn oss_domain_lists() {
        let mut config = ServerConfig::default();
        assert!(oss_domains(&config).is_empty());
        config.app.oss_domain = "oss.example.com, cdn.example.com,".to_string();
        assert_eq!(oss_domains(&config), vec!["oss.example.com", "cdn.example.com"]);
    }
}
