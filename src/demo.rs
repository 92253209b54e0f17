//! Sample handlers.
//!
//! Static pages, a plain-text page and a form handler that keeps a
//! persistent submission counter.

use axum::http::StatusCode;

use crate::http::request::{BodyError, InterceptedRequest};
use crate::http::response::{html, Response};
use crate::routing::handler::{BoxError, HandlerResult};
use crate::routing::pattern::PatternError;
use crate::routing::router::Router;
use crate::store::KvStore;

/// Store key of the submission counter.
pub const COUNTER_KEY: &str = "counter";

/// Register every sample route.
pub fn register(router: &mut Router, store: KvStore) -> Result<(), PatternError> {
    router
        .get("/home", |_req: InterceptedRequest| async {
            Ok::<_, BoxError>(Response::from("<div>Home Page Content</div>"))
        })?
        .get("/about", |_req: InterceptedRequest| async {
            Ok::<_, BoxError>(Response::from("<div>About Page Content</div>"))
        })?
        .get("/contact", |_req: InterceptedRequest| async {
            Ok::<_, BoxError>(Response::from("<div>Contact Page Content</div>"))
        })?
        .get("/pages/index", |_req: InterceptedRequest| pages_index())?
        .post("/submit/[id]/[otherid]/*", move |req: InterceptedRequest| {
            submit(store.clone(), req)
        })?;
    Ok(())
}

async fn pages_index() -> HandlerResult {
    Ok(Response::builder()
        .set_status(200)
        .set_header("Content-Type", "text/plain")
        .set_body("Goodbye world!")
        .build()?)
}

async fn submit(store: KvStore, mut req: InterceptedRequest) -> HandlerResult {
    let counter = store.increment(COUNTER_KEY, 1).await?;

    let id = req.param("id").unwrap_or_default().to_string();
    let otherid = req.param("otherid").unwrap_or_default().to_string();
    let wildcard = req.param("wildcard").unwrap_or_default().to_string();

    let form = match req.form().await {
        Ok(form) => form,
        Err(e) => {
            tracing::warn!(error = %e, "Unreadable form submission");
            let page = html(
                &[
                    "<html><head><title>Error</title></head><body>\
                     <h1>Error Processing Form Data</h1><p>",
                    "</p></body></html>",
                ],
                &[&e],
            );
            let status = match e {
                BodyError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            return Ok(page.into_builder().set_status(status.as_u16()).build()?);
        }
    };

    let name = form.get("name").filter(|v| !v.is_empty());
    let email = form.get("email").filter(|v| !v.is_empty());
    let (Some(name), Some(email)) = (name, email) else {
        let page = html(
            &["<html><head><title>Error</title></head><body>\
               <h1>Error</h1>\
               <p>Missing form fields. Both \"name\" and \"email\" are required.</p>\
               </body></html>"],
            &[],
        );
        return Ok(page.into_builder().set_status(400).build()?);
    };

    Ok(html(
        &[
            "<html><head><title>Form Submitted</title></head><body>\
             <h1>Form Submitted Successfully!</h1>",
            " ",
            " ",
            "<p>Name: ",
            "</p><p>Email: ",
            "</p><p>Counter: ",
            "</p></body></html>",
        ],
        &[&id, &otherid, &wildcard, &name, &email, &counter],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::local::LocalResponder;
    use axum::http::{Method, StatusCode};
    use std::sync::Arc;
    use std::time::Duration;

    fn responder() -> (tempfile::TempDir, KvStore, LocalResponder) {
        let dir = tempfile::tempdir().unwrap();
        let store = KvStore::open(dir.path().join("demo.db"), Duration::from_secs(5));
        let mut router = Router::new();
        register(&mut router, store.clone()).unwrap();
        (dir, store, LocalResponder::new(Arc::new(router), 4096))
    }

    #[tokio::test]
    async fn test_submit_renders_params_and_fields() {
        let (_dir, _store, local) = responder();
        let response = local
            .respond(Method::POST, "/submit/3/4/x/y", Some("name=Ann&email=a%40b.com"))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.text().unwrap();
        for expected in ["3", "4", "x/y", "Ann", "a@b.com", "Counter: 1"] {
            assert!(body.contains(expected), "missing {expected:?} in {body}");
        }
    }

    #[tokio::test]
    async fn test_submit_missing_email_is_400() {
        let (_dir, _store, local) = responder();
        let response = local
            .respond(Method::POST, "/submit/3/4/x/y", Some("name=Ann"))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.text().unwrap().contains("Missing form fields"));
    }

    #[tokio::test]
    async fn test_oversized_form_is_413() {
        let dir = tempfile::tempdir().unwrap();
        let store = KvStore::open(dir.path().join("demo.db"), Duration::from_secs(5));
        let mut router = Router::new();
        register(&mut router, store).unwrap();
        let local = LocalResponder::new(Arc::new(router), 16);

        let form = format!("name={}&email=e", "x".repeat(64));
        let response = local.respond(Method::POST, "/submit/1/2/z", Some(&form)).await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(response.text().unwrap().contains("Error Processing Form Data"));
    }

    #[tokio::test]
    async fn test_counter_persists_between_submissions() {
        let (_dir, store, local) = responder();
        for _ in 0..3 {
            local
                .respond(Method::POST, "/submit/1/2/z", Some("name=A&email=b"))
                .await;
        }
        let counter: Option<i64> = store.get(COUNTER_KEY).await.unwrap();
        assert_eq!(counter, Some(3));
    }

    #[tokio::test]
    async fn test_pages_index_is_plain_text() {
        let (_dir, _store, local) = responder();
        let response = local.respond(Method::GET, "/pages/index", None).await;
        assert_eq!(response.header("content-type"), Some("text/plain"));
        assert_eq!(response.text(), Some("Goodbye world!"));
    }
}
