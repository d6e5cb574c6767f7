//! Tower middleware applying the gatekeeper to every request.
//!
//! `GatekeeperLayer` and `GatekeeperService` read the `access` cookie,
//! evaluate the route table and either redirect or forward. On `Allow` with
//! a verified token, the [`AccessClaims`](vitrine_session::AccessClaims) are
//! inserted into request extensions for downstream handlers.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::response::{IntoResponse, Redirect};
use axum_extra::extract::cookie::CookieJar;
use http::Request;
use tower::{Layer, Service};

use vitrine_session::ACCESS_COOKIE;

use crate::decision::{AccessVerifier, evaluate};
use crate::routes::RouteTable;

/// Tower `Layer` that wraps services with the gatekeeper.
#[derive(Clone)]
pub struct GatekeeperLayer {
    table: Arc<RouteTable>,
    verifier: Arc<dyn AccessVerifier>,
}

impl GatekeeperLayer {
    /// Create a layer over `table`, verifying tokens with `verifier`.
    pub fn new(table: RouteTable, verifier: Arc<dyn AccessVerifier>) -> Self {
        Self {
            table: Arc::new(table),
            verifier,
        }
    }
}

impl<S> Layer<S> for GatekeeperLayer {
    type Service = GatekeeperService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        GatekeeperService {
            inner,
            table: self.table.clone(),
            verifier: self.verifier.clone(),
        }
    }
}

/// Tower `Service` that decides each request before forwarding it.
#[derive(Clone)]
pub struct GatekeeperService<S> {
    inner: S,
    table: Arc<RouteTable>,
    verifier: Arc<dyn AccessVerifier>,
}

impl<S> Service<Request<Body>> for GatekeeperService<S>
where
    S: Service<Request<Body>, Error = Infallible> + Clone + Send + 'static,
    S::Response: IntoResponse,
    S::Future: Send,
{
    type Response = axum::response::Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let path_and_query = req
            .uri()
            .path_and_query()
            .map_or_else(|| req.uri().path().to_string(), |pq| pq.as_str().to_string());
        let jar = CookieJar::from_headers(req.headers());
        let access = jar.get(ACCESS_COOKIE).map(|c| c.value().to_string());

        let evaluation = evaluate(
            &path_and_query,
            access.as_deref(),
            &self.table,
            self.verifier.as_ref(),
        );
        let location = evaluation.decision.location(&self.table);

        Box::pin(async move {
            if let Some(location) = location {
                log::debug!("Gatekeeper redirecting {path_and_query} to {location}");
                return Ok(Redirect::temporary(&location).into_response());
            }

            if let Some(claims) = evaluation.claims {
                req.extensions_mut().insert(claims);
            }
            let resp = inner
                .call(req)
                .await
                .unwrap_or_else(|infallible| match infallible {});
            Ok(resp.into_response())
        })
    }
}
