//! 保活 HTTP 服务
//!
//! 托管平台要求进程监听端口，任何方法和路径都返回 200 与固定纯文本。
//! 不承载事件投递。

use std::future::Future;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::AgentError;

/// 构建保活路由，所有请求落到 fallback
pub fn routes(agent_name: &str) -> Router {
    let body = format!("{agent_name} is running");
    Router::new()
        .fallback(move || std::future::ready(body.clone()))
        .layer(TraceLayer::new_for_http())
}

/// 绑定保活端口
pub async fn bind(addr: &str) -> Result<TcpListener, AgentError> {
    let listener = TcpListener::bind(addr).await?;
    info!(
        "HTTP keepalive listening on port {}",
        listener.local_addr()?.port()
    );
    Ok(listener)
}

/// 运行保活服务直到收到关闭信号
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> Result<(), AgentError>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
