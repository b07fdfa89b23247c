//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查
//! - [`tables`] - 桌台管理接口
//! - [`orders`] - 订单生命周期与结账接口
//! - [`receipts`] - 票据号预留接口
//! - [`sales`] - 销售历史与日结接口
//! - [`customers`] - 客户目录接口
//! - [`audit`] - 审计日志接口
//! - [`backups`] - 备份接口
//!
//! 调用方身份由前置网关认证后通过 `X-Actor-*` 头传入，见 [`extract`]。

pub mod extract;

pub mod audit;
pub mod backups;
pub mod customers;
pub mod health;
pub mod orders;
pub mod receipts;
pub mod sales;
pub mod tables;

use axum::Router;
use http::{HeaderName, HeaderValue};
use shared::error::{AppError, AppResult};
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};

use crate::core::{PosResult, ServerState};

pub use extract::CurrentActor;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Custom request ID generator
#[derive(Clone)]
struct XRequestId;

impl MakeRequestId for XRequestId {
    fn make_request_id<B>(&mut self, _request: &http::Request<B>) -> Option<RequestId> {
        let id = uuid::Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Build a router with all routes registered (no middleware, no state)
pub fn build_router() -> Router<ServerState> {
    Router::new()
        .merge(tables::router())
        .merge(orders::router())
        .merge(receipts::router())
        .merge(sales::router())
        .merge(customers::router())
        .merge(audit::router())
        .merge(backups::router())
        .merge(health::router())
}

/// Build the application router with request-id middleware and state
///
/// Used by both the HTTP server and the router integration tests.
pub fn build_app(state: ServerState) -> Router {
    build_router()
        .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
            REQUEST_ID_HEADER,
        )))
        .layer(SetRequestIdLayer::new(
            HeaderName::from_static(REQUEST_ID_HEADER),
            XRequestId,
        ))
        .with_state(state)
}

/// 在阻塞线程池上运行同步引擎操作
///
/// redb 事务是同步的，不能占用 async worker 线程。
pub(crate) async fn blocking<T, F>(f: F) -> AppResult<T>
where
    F: FnOnce() -> PosResult<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result.map_err(AppError::from),
        Err(e) => {
            tracing::error!(error = %e, "Blocking engine task failed");
            Err(AppError::internal("engine task failed"))
        }
    }
}
