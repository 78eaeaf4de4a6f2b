use std::sync::Arc;

use axum::{
    http::{header::AUTHORIZATION, Request},
    middleware::Next,
};

use primitives::Role;

use crate::{auth::Authenticator, response::ResponseError, Application, Auth};

/// Creates an [`Auth`] request extension if a Bearer token was provided.
///
/// Checks the `Authorization` header for the `Bearer` scheme and resolves
/// the token with [`Authenticator::session_from_token`]. Requests without a
/// token pass through unauthenticated - routes that need a caller are
/// guarded by [`authentication_required`] or one of the role guards.
pub async fn authenticate<A: Authenticator + 'static, B>(
    mut request: Request<B>,
    next: Next<B>,
) -> Result<axum::response::Response, ResponseError>
where
    B: Send,
{
    let authenticator = request
        .extensions()
        .get::<Arc<Application<A>>>()
        .expect("Application should always be present")
        .authenticator
        .clone();

    let authorization = request.headers().get(AUTHORIZATION);

    let prefix = "Bearer ";

    let token = authorization
        .and_then(|hv| {
            hv.to_str()
                .map(|token_str| token_str.strip_prefix(prefix))
                .transpose()
        })
        .transpose()?;

    if let Some(token) = token {
        let session = authenticator
            .session_from_token(token)
            .await
            .map_err(|_| ResponseError::Unauthorized)?;

        request.extensions_mut().insert(Auth {
            uid: session.uid,
            role: session.role,
        });
    }

    Ok(next.run(request).await)
}

pub async fn authentication_required<B>(
    request: Request<B>,
    next: Next<B>,
) -> Result<axum::response::Response, ResponseError> {
    if request.extensions().get::<Auth>().is_some() {
        Ok(next.run(request).await)
    } else {
        Err(ResponseError::Unauthorized)
    }
}

/// Only lets through callers authenticated with the `advertiser` role.
pub async fn authenticate_as_advertiser<B>(
    request: Request<B>,
    next: Next<B>,
) -> Result<axum::response::Response, ResponseError> {
    let auth = request
        .extensions()
        .get::<Auth>()
        .ok_or(ResponseError::Unauthorized)?;

    if auth.role != Role::Advertiser {
        return Err(ResponseError::Forbidden(
            "the caller is not an advertiser".to_string(),
        ));
    }

    Ok(next.run(request).await)
}

/// Only lets through callers authenticated with the `blogger` role.
pub async fn authenticate_as_blogger<B>(
    request: Request<B>,
    next: Next<B>,
) -> Result<axum::response::Response, ResponseError> {
    let auth = request
        .extensions()
        .get::<Auth>()
        .ok_or(ResponseError::Unauthorized)?;

    if auth.role != Role::Blogger {
        return Err(ResponseError::Forbidden(
            "the caller is not a blogger".to_string(),
        ));
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod test {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        middleware::from_fn,
        routing::get,
        Extension, Router,
    };
    use tower::Service;

    use primitives::test_util::{discard_logger, ADVERTISER, BLOGGER};

    use crate::{
        application::{Config, Environment, DEFAULT_IP_ADDR, DEFAULT_PORT},
        auth::{Dummy, Session},
        db::postgres_connection,
    };

    /// An application whose pool points nowhere - connections are only
    /// attempted on `pool.get()`, which none of these routes reach.
    async fn test_app() -> Application<Dummy> {
        let config = Config {
            env: Environment::Development,
            port: DEFAULT_PORT,
            ip_addr: DEFAULT_IP_ADDR,
            postgres_user: "postgres".to_string(),
            postgres_password: "postgres".to_string(),
            postgres_host: "localhost".to_string(),
            postgres_port: 5432,
            postgres_db: None,
        };

        let authenticator = Dummy::new(
            [
                (
                    "advertiser-token".to_string(),
                    Session {
                        uid: *ADVERTISER,
                        role: Role::Advertiser,
                    },
                ),
                (
                    "blogger-token".to_string(),
                    Session {
                        uid: *BLOGGER,
                        role: Role::Blogger,
                    },
                ),
            ]
            .into_iter()
            .collect(),
        );

        let pool = postgres_connection(2, &config).await;

        Application::new(authenticator, config, discard_logger(), pool)
    }

    async fn whoami(auth: Option<Extension<Auth>>) -> String {
        match auth {
            Some(Extension(auth)) => auth.role.to_string(),
            None => "anonymous".to_string(),
        }
    }

    fn build_request(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        builder.body(Body::empty()).expect("Should build Request")
    }

    #[tokio::test]
    async fn authentication_and_role_guards() {
        let app = Arc::new(test_app().await);

        let mut router = Router::new()
            .route("/whoami", get(whoami))
            .route(
                "/required",
                get(whoami).layer(from_fn(authentication_required)),
            )
            .route(
                "/advertisers-only",
                get(whoami).layer(from_fn(authenticate_as_advertiser)),
            )
            .route(
                "/bloggers-only",
                get(whoami).layer(from_fn(authenticate_as_blogger)),
            )
            .layer(from_fn(authenticate::<Dummy, _>))
            .layer(Extension(app));

        // no token: the request passes through unauthenticated
        {
            let response = router
                .call(build_request("/whoami", None))
                .await
                .expect("Should handle request");

            assert_eq!(StatusCode::OK, response.status());
            let body = hyper::body::to_bytes(response.into_body())
                .await
                .expect("Should read body");
            assert_eq!("anonymous", std::str::from_utf8(&body).expect("utf-8 body"));
        }

        // an unknown token is rejected outright
        {
            let response = router
                .call(build_request("/whoami", Some("made-up")))
                .await
                .expect("Should handle request");

            assert_eq!(StatusCode::UNAUTHORIZED, response.status());
        }

        // a valid token resolves to the caller's role
        {
            let response = router
                .call(build_request("/whoami", Some("advertiser-token")))
                .await
                .expect("Should handle request");

            assert_eq!(StatusCode::OK, response.status());
            let body = hyper::body::to_bytes(response.into_body())
                .await
                .expect("Should read body");
            assert_eq!("advertiser", std::str::from_utf8(&body).expect("utf-8 body"));
        }

        // guarded routes require authentication...
        {
            let response = router
                .call(build_request("/required", None))
                .await
                .expect("Should handle request");

            assert_eq!(StatusCode::UNAUTHORIZED, response.status());
        }

        // ... and the matching role
        {
            let response = router
                .call(build_request("/advertisers-only", Some("blogger-token")))
                .await
                .expect("Should handle request");

            assert_eq!(StatusCode::FORBIDDEN, response.status());

            let response = router
                .call(build_request("/bloggers-only", Some("blogger-token")))
                .await
                .expect("Should handle request");

            assert_eq!(StatusCode::OK, response.status());
        }
    }
}
