pub mod chat;
pub mod faq;
pub mod router;

use std::net::SocketAddr;

pub use router::AppState;

pub async fn start(
    state: AppState,
    port: u16,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app = router::create_router(state);
    let addr = SocketAddr::from(([127, 0, 0, 1], port));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("Axum server listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
