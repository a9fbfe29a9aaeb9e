use std::{fs::OpenOptions, io::Write, path::Path};

use dotenvy::dotenv;
use env_logger::{Builder, Env, Target};
use log::*;
use passport_server::{
    config::ServerConfig,
    errors::ServerError,
    middleware::current_request_id,
    server::run_server,
};

#[actix_web::main]
async fn main() {
    dotenv().ok();
    let config = ServerConfig::from_env_or_default();
    if let Err(e) = init_logging(&config) {
        eprintln!("Could not open the log file. {e}. Logging to stderr instead.");
    }

    info!("🚀️ Starting server on {}:{}", config.server.host, config.server.http_port);
    match run_server(config).await {
        Ok(_) => println!("Bye!"),
        Err(e) => eprintln!("{e}"),
    }
}

/// `RUST_LOG` wins over the run mode's default level. Every line carries the id of the request being served.
fn init_logging(config: &ServerConfig) -> Result<(), ServerError> {
    let mut builder = Builder::from_env(Env::default());
    if std::env::var("RUST_LOG").is_err() {
        builder.filter_level(config.server.run_mode.default_log_level());
    }
    builder.format(|buf, record| {
        let request_id = current_request_id();
        let request_id = if request_id.is_empty() { "-".to_string() } else { request_id };
        writeln!(
            buf,
            "{} {:<5} [{}] [{request_id}] {}",
            buf.timestamp_millis(),
            record.level(),
            record.target(),
            record.args()
        )
    });
    let result = match config.app.log_file() {
        Some(path) => open_log_file(&path).map(|file| {
            builder.target(Target::Pipe(Box::new(file)));
        }),
        None => Ok(()),
    };
    builder.init();
    result
}

fn open_log_file(path: &str) -> Result<std::fs::File, ServerError> {
    if let Some(dir) = Path::new(path).parent() {
        std::fs::create_dir_all(dir)?;
    }
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}
