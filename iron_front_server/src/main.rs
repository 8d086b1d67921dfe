// Copyright 2025 Justin Hu
//
// This file is part of Iron Front.
//
// Iron Front is free software: you can redistribute it and/or modify it under
// the terms of the GNU Affero General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option)
// any later version.
//
// Iron Front is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License
// for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with Iron Front. If not, see <https://www.gnu.org/licenses/>.
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{
    net::SocketAddr,
    path::PathBuf,
    process::ExitCode,
    sync::{Arc, Mutex},
};

use anyhow::{Context, Result};
use axum::{
    Router,
    extract::{ConnectInfo, State, ws::WebSocketUpgrade},
    response::IntoResponse,
    routing::any,
};
use axum_extra::{TypedHeader, headers};
use axum_server::tls_rustls::RustlsConfig;
use clap::Parser;
use tokio::sync::mpsc::unbounded_channel;
use tower_http::trace::TraceLayer;
use tracing::{Level, error, info};

use crate::{
    config::Content,
    server::{Server, SharedServer},
};

mod config;
mod game;
mod server;
mod session;
mod timer;

#[derive(Parser)]
#[command(version, about = "Iron Front game server")]
struct Args {
    /// Address to listen on
    #[arg(short, long, default_value = "0.0.0.0:8080")]
    address: SocketAddr,

    /// CBOR file with the list of factions
    #[arg(long, default_value = "factions.cbor")]
    factions: PathBuf,

    /// Directory of CBOR map files
    #[arg(long, default_value = "maps")]
    maps: PathBuf,

    /// PEM certificate; serves over TLS together with --key
    #[arg(long, requires = "key")]
    cert: Option<PathBuf>,

    /// PEM private key
    #[arg(long, requires = "cert")]
    key: Option<PathBuf>,

    /// Longest accepted player name, in characters
    #[arg(long, default_value_t = 32)]
    max_name_length: usize,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            Level::DEBUG
        } else {
            Level::INFO
        })
        .init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let content = Content::load(&args.factions, &args.maps)?;

    let (timers, requests) = unbounded_channel();
    let server: SharedServer = Arc::new(Mutex::new(Server::new(
        content,
        args.max_name_length,
        timers,
    )));
    tokio::spawn(timer::run_timers(requests, server.clone()));

    let app = Router::new()
        .route("/ws", any(ws_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(server)
        .into_make_service_with_connect_info::<SocketAddr>();

    match (args.cert, args.key) {
        (Some(cert), Some(key)) => {
            let tls = RustlsConfig::from_pem_file(&cert, &key)
                .await
                .with_context(|| format!("while loading {}", cert.to_string_lossy()))?;
            info!(address = %args.address, "listening with TLS");
            axum_server::bind_rustls(args.address, tls)
                .serve(app)
                .await
                .context("while serving")?;
        }
        _ => {
            info!(address = %args.address, "listening");
            axum_server::bind(args.address)
                .serve(app)
                .await
                .context("while serving")?;
        }
    }
    Ok(())
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    user_agent: Option<TypedHeader<headers::UserAgent>>,
    ConnectInfo(address): ConnectInfo<SocketAddr>,
    State(server): State<SharedServer>,
) -> impl IntoResponse {
    let user_agent = user_agent.map_or_else(
        || "unknown client".to_string(),
        |TypedHeader(user_agent)| user_agent.to_string(),
    );
    info!(%address, %user_agent, "upgrading connection");
    ws.on_upgrade(move |socket| session::handle_socket(socket, server, address))
}
