use axum::{
    BoxError, Router,
    error_handling::HandleErrorLayer,
    routing::{get, post},
};
use tower::{ServiceBuilder, timeout::TimeoutLayer};

use std::{sync::Arc, time::Duration};

use crate::{ServerError, grocery_items, ledger, links, members, purchases};
use engine::Engine;

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
}

async fn handle_layer_error(err: BoxError) -> ServerError {
    if err.is::<tower::timeout::error::Elapsed>() {
        ServerError::Timeout
    } else {
        tracing::error!("unhandled layer error: {err}");
        ServerError::Generic(err.to_string())
    }
}

/// Build the REST router over `engine`.
///
/// Every request is cut off after `request_timeout` and answered with `408`.
pub fn router(engine: Arc<Engine>, request_timeout: Duration) -> Router {
    let state = ServerState { engine };

    Router::new()
        .route("/members", get(members::list).post(members::add))
        .route(
            "/members/{id}",
            get(members::get).put(members::update).delete(members::delete),
        )
        .route("/members/{id}/items", get(members::items))
        .route("/ledger", get(ledger::get))
        .route("/ledger/{member_id}", get(ledger::member))
        .route("/items", get(grocery_items::list).post(grocery_items::add))
        .route("/items/wanted", post(grocery_items::add_wanted))
        .route("/items/pending", get(grocery_items::pending))
        .route(
            "/items/{id}",
            get(grocery_items::get)
                .put(grocery_items::update)
                .delete(grocery_items::delete),
        )
        .route("/purchases", get(purchases::list).post(purchases::add))
        .route("/purchases/page", get(purchases::page))
        .route(
            "/purchases/{id}",
            get(purchases::get)
                .put(purchases::update)
                .delete(purchases::delete),
        )
        .route(
            "/purchases/{id}/items/{item_id}",
            post(purchases::link_item).delete(purchases::unlink_item),
        )
        .route("/links", get(links::list).post(links::add))
        .route(
            "/links/{id}",
            get(links::get).put(links::update).delete(links::delete),
        )
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_layer_error))
                .layer(TimeoutLayer::new(request_timeout)),
        )
        .with_state(state)
}

pub async fn run(engine: Engine, addr: &str, request_timeout: Duration) {
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener on {addr}: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, listener, request_timeout).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
    request_timeout: Duration,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router(Arc::new(engine), request_timeout)).await
}

pub fn spawn_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
    request_timeout: Duration,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, listener, request_timeout).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
