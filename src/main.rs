use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use log::{debug, info};

mod api;
mod auth;
mod booking;
mod commands;
mod config;
mod console;
mod control;
mod database;
mod pricing;
mod validation;

use api::ApiClient;
use auth::AuthContext;
use commands::{Cmd, Context};
use config::Configuration;
use database::Database;

/// Campsite booking and utility control client
#[derive(Parser,Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Cmd
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let conf: Configuration = match &args.config {
        Some(conf_file) => Configuration::load(conf_file)?,
        None => Default::default()
    };
    debug!("{:?}", conf);

    let redb_db = redb::Database::create(&conf.database_path)?;
    let mut db = Database::new(&redb_db);
    db.init()?;

    let session = db.session.load()?;
    if let Some(session) = &session {
        info!("Session of {} loaded", session.user.email);
    }

    let auth = Arc::new(AuthContext::new(session));
    let api = Arc::new(ApiClient::new(&conf.api_base_url, conf.request_timeout(), auth.clone())?);

    let ctx = Context {
        conf: &conf,
        db: &db,
        auth: auth,
        api: api
    };

    commands::run(&ctx, args.command).await
}
