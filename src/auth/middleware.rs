use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    web, Error, HttpMessage,
};
use futures::future::{ready, LocalBoxFuture, Ready};

use crate::auth::extractors::authenticate;
use crate::error::AppError;
use crate::state::AppState;

/// Rejects requests without a valid bearer token and binds the verified subject
/// into the request extensions for the handlers behind it.
///
/// Mount it with `.wrap(AuthMiddleware)` on the scope to protect. The token
/// service is taken from the `web::Data<AppState>` registered on the app.
pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService { service }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let Some(state) = req.app_data::<web::Data<AppState>>().cloned() else {
            let app_err =
                AppError::InternalServerError("AppState is not registered on the app".into());
            return Box::pin(async move { Err(app_err.into()) });
        };

        let auth_header = req
            .headers()
            .get(header::AUTHORIZATION)
            .map(|value| value.to_str().unwrap_or_default());

        match authenticate(auth_header, &state.tokens) {
            Ok(subject) => {
                req.extensions_mut().insert(subject);
                Box::pin(self.service.call(req))
            }
            Err(cause) => {
                // The handler is never invoked; the cause only reaches the log.
                log::warn!("rejected {} {}: {}", req.method(), req.path(), cause);
                let app_err: AppError = cause.into();
                Box::pin(async move { Err(app_err.into()) })
            }
        }
    }
}
