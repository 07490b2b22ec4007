//! Runnable demo: mounts the `tus` engine on `/files` behind a plain Salvo
//! listener, the out-of-scope "framework wiring" collaborator made concrete.

use salvo_core::prelude::*;
use tus::Tus;
use tus::config::EngineConfig;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().init();

    let config = EngineConfig {
        storage_path: "./data/uploads".to_string(),
        ..EngineConfig::default()
    };

    let tus = Tus::new(config);
    let router = Router::new().push(tus.into_router());

    let acceptor = TcpListener::new("0.0.0.0:5800").bind().await;
    tracing::info!("tus demo server listening on 0.0.0.0:5800");
    Server::new(acceptor).serve(router).await;
}
