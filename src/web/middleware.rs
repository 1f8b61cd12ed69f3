//! # CSRF Middleware
//!
//! A [`tower::Layer`] protecting every route below it.
//!
//! For each request the middleware:
//! 1. loads the client's raw token from the [`TokenStore`], minting one if
//!    there is none (or it is invalid or expired);
//! 2. validates unsafe requests with the [`validator`](crate::web::validator);
//! 3. attaches a [`CsrfContext`] holding a freshly masked token;
//! 4. calls the wrapped service, or the configured error handler on
//!    rejection;
//! 5. appends a freshly masked `Set-Cookie` and `Vary: Cookie` to the
//!    response, whatever the outcome.
//!
//! # Example
//! ```rust,no_run
//! use axum::{routing::{get, post}, Router};
//! use wzs_csrf::config::csrf::CsrfConfig;
//! use wzs_csrf::web::{context::CsrfToken, middleware::CsrfLayer};
//!
//! async fn form(CsrfToken(token): CsrfToken) -> String {
//!     token
//! }
//!
//! let cfg = CsrfConfig::from_env().unwrap();
//! let app: Router = Router::new()
//!     .route("/form", get(form))
//!     .route("/submit", post(|| async { "ok" }))
//!     .layer(CsrfLayer::try_new(cfg).unwrap());
//! ```

use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue, StatusCode, header::VARY},
    response::{IntoResponse, Response},
};
use tower::{Layer, Service};
use tracing::{debug, error, warn};

use crate::config::csrf::CsrfConfig;
use crate::error::csrf::CsrfError;
use crate::store::{TokenStore, cookie_store::CookieStore};
use crate::token::codec;
use crate::token::mask::mask;
use crate::token::random::{OsRandom, RandomSource};
use crate::web::context::CsrfContext;
use crate::web::validator::{self, Verdict};

/// Layer applying CSRF protection to the wrapped service.
#[derive(Clone)]
pub struct CsrfLayer {
    config: Arc<CsrfConfig>,
    store: Option<Arc<dyn TokenStore>>,
    random: Arc<dyn RandomSource>,
}

impl CsrfLayer {
    /// Like [`CsrfLayer::new`], but refuses a configuration whose cookie
    /// could never be written.
    ///
    /// # Errors
    /// Returns [`CsrfError::Cookie`] from [`CsrfConfig::validate`].
    pub fn try_new(config: CsrfConfig) -> Result<Self, CsrfError> {
        config.validate()?;
        Ok(Self::new(config))
    }

    /// Creates a layer using the signed-cookie store and the OS random source.
    ///
    /// The configuration is not checked; see [`CsrfLayer::try_new`].
    pub fn new(config: CsrfConfig) -> Self {
        Self {
            config: Arc::new(config),
            store: None,
            random: Arc::new(OsRandom),
        }
    }

    /// Replaces the token storage backend.
    pub fn with_store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Replaces the random source used for masking (and, with the default
    /// store, for minting).
    pub fn with_random(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = random;
        self
    }
}

impl<S> Layer<S> for CsrfLayer {
    type Service = CsrfService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        let store = self.store.clone().unwrap_or_else(|| {
            Arc::new(CookieStore::new(self.config.clone(), self.random.clone()))
        });

        CsrfService {
            inner,
            protection: Arc::new(Protection {
                config: self.config.clone(),
                store,
                random: self.random.clone(),
            }),
        }
    }
}

/// Service produced by [`CsrfLayer`].
#[derive(Clone)]
pub struct CsrfService<S> {
    inner: S,
    protection: Arc<Protection>,
}

struct Protection {
    config: Arc<CsrfConfig>,
    store: Arc<dyn TokenStore>,
    random: Arc<dyn RandomSource>,
}

/// A request that went through validation, ready to be dispatched.
struct Prepared {
    req: Request,
    verdict: Verdict,
    /// Response headers carrying the re-masked cookie.
    cookies: HeaderMap,
}

impl Protection {
    async fn prepare(&self, req: Request) -> Result<Prepared, CsrfError> {
        let raw = match self.store.load(req.headers()) {
            Some(raw) => raw,
            None => {
                debug!("no valid CSRF cookie, issuing a new token");
                self.store.generate()?
            }
        };

        let token = codec::encode(&mask(&raw, self.random.as_ref())?);

        let mut cookies = HeaderMap::new();
        self.store.save(&mut cookies, &raw)?;

        let (mut req, verdict) = validator::validate(req, &raw, &self.config).await;
        req.extensions_mut().insert(CsrfContext {
            token,
            failure: verdict.reason(),
            header_name: self.config.header_name.clone(),
            field_name: self.config.field_name.clone(),
        });

        Ok(Prepared {
            req,
            verdict,
            cookies,
        })
    }
}

fn finish(res: &mut Response, cookies: &HeaderMap) {
    let headers = res.headers_mut();
    for (name, value) in cookies {
        headers.append(name, value.clone());
    }
    headers.append(VARY, HeaderValue::from_static("Cookie"));
}

impl<S> Service<Request> for CsrfService<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        // Take the service that was polled ready and leave a fresh clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let protection = self.protection.clone();

        Box::pin(async move {
            let Prepared {
                req,
                verdict,
                cookies,
            } = match protection.prepare(req).await {
                Ok(prepared) => prepared,
                Err(e) => {
                    error!(error = %e, "CSRF token could not be issued, aborting request");
                    return Ok(StatusCode::INTERNAL_SERVER_ERROR.into_response());
                }
            };

            let mut res = match verdict {
                Verdict::Accepted => inner.call(req).await?,
                Verdict::Rejected(reason) => {
                    warn!(
                        method = %req.method(),
                        path = %req.uri().path(),
                        %reason,
                        "CSRF validation failed"
                    );
                    protection.config.error_handler.call(req).await
                }
            };

            finish(&mut res, &cookies);
            Ok(res)
        })
    }
}
