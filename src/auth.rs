//! Admin gate.
//!
//! A shared password, mirroring the lock the community site puts in front of
//! its moderation page. It keeps casual visitors out of the admin routes and
//! nothing more; it is not access control.

use std::{
    env,
    future::{ready, Ready},
    task::{Context, Poll},
};

use actix_web::{
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    web::Data,
    HttpResponse,
};
use futures::future::LocalBoxFuture;
use lazy_static::lazy_static;
use log::{log, Level};

use crate::app::AppState;

lazy_static! {
    pub static ref SECURITY_ENABLED: bool = env::var("SECURITY_ENABLED")
        .map(|x| x.parse::<bool>().unwrap_or(true))
        .unwrap_or(true);
}

pub fn password_matches(state: &AppState, candidate: &str) -> bool {
    !candidate.is_empty() && candidate == state.admin_password
}

fn bearer(req: &ServiceRequest) -> Option<String> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|h| h.trim().to_string())
}

#[doc(hidden)]
pub struct AdminAuthService<S> {
    service: S,
    enabled: bool,
}

impl<S> Service<ServiceRequest> for AdminAuthService<S>
where
    S: Service<
        ServiceRequest,
        Response = ServiceResponse<actix_web::body::BoxBody>,
        Error = actix_web::Error,
    >,
    S::Future: 'static,
{
    type Response = ServiceResponse<actix_web::body::BoxBody>;
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, ctx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if self.enabled {
            let unauthorized = |req: ServiceRequest| -> Self::Future {
                Box::pin(async { Ok(req.into_response(HttpResponse::Unauthorized().finish())) })
            };

            let state = match req.app_data::<Data<AppState>>() {
                Some(state) => state.clone(),
                None => {
                    log!(Level::Error, "AppState missing from admin route");
                    return Box::pin(async {
                        Ok(req.into_response(HttpResponse::InternalServerError().finish()))
                    });
                }
            };

            match bearer(&req) {
                Some(password) if password_matches(&state, &password) => {}
                _ => {
                    log!(Level::Debug, "Rejected admin request to {}", req.path());
                    return unauthorized(req);
                }
            }
        }

        let future = self.service.call(req);
        Box::pin(async move {
            let response = future.await?;
            Ok(response)
        })
    }
}

#[derive(Clone, Debug)]
pub struct AdminAuth {
    enabled: bool,
}

impl AdminAuth {
    pub fn required() -> Self {
        Self {
            enabled: *SECURITY_ENABLED,
        }
    }
}

impl<S> Transform<S, ServiceRequest> for AdminAuth
where
    S: Service<
        ServiceRequest,
        Response = ServiceResponse<actix_web::body::BoxBody>,
        Error = actix_web::Error,
    >,
    S::Future: 'static,
{
    type Response = ServiceResponse<actix_web::body::BoxBody>;
    type Error = actix_web::Error;
    type Transform = AdminAuthService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AdminAuthService {
            service,
            enabled: self.enabled,
        }))
    }
}
