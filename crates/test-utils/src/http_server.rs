//! Static file server for reading on-disk stores over HTTP.

use std::net::SocketAddr;
use std::path::Path;

use axum::Router;
use tokio::task::JoinHandle;
use tower_http::services::ServeDir;

/// A running server. The server task is aborted on drop.
pub struct StaticServer {
    base_url: String,
    handle: JoinHandle<()>,
}

impl StaticServer {
    /// Base URL such as `http://127.0.0.1:12345`.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Drop for StaticServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Serve `root` on `127.0.0.1:0` with GET, HEAD and Range support.
///
/// Must be called from within a tokio runtime.
pub async fn serve_directory(root: &Path) -> StaticServer {
    let app = Router::new().fallback_service(ServeDir::new(root));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr: SocketAddr = listener.local_addr().expect("listener addr");

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve static files");
    });

    StaticServer {
        base_url: format!("http://{}", addr),
        handle,
    }
}
