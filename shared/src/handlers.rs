//! Request dispatch shared by every function.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use lambda_http::http::Method;
use lambda_http::{Body, Request, Response};
use tracing::{error, info, warn};

use crate::http::{error_response, json_response, method_not_allowed, preflight_response};
use crate::query::{QueryParams, ResourceQuery, Route};
use crate::resolver::Resolver;
use crate::upstream::Upstream;
use crate::{Error, Result};

/// Serve one request for `route`. Always produces a response: every failure,
/// including a panic while resolving, is rendered as a JSON error body.
///
/// Parameters are validated before `make_resolver` runs, so a bad request
/// never reaches configuration or the network.
pub async fn dispatch<U, F>(route: Route, event: &Request, make_resolver: F) -> Response<Body>
where
    U: Upstream,
    F: FnOnce() -> Result<Resolver<U>>,
{
    let method = event.method();
    if *method == Method::OPTIONS {
        return preflight_response();
    }
    if *method != Method::GET {
        return method_not_allowed(method.as_str());
    }

    let outcome = match AssertUnwindSafe(serve(route, event, make_resolver))
        .catch_unwind()
        .await
    {
        Ok(outcome) => outcome,
        Err(panic) => {
            error!(route = route.name(), panic = %panic_message(panic.as_ref()), "Handler panicked");
            Err(Error::Internal(format!("{} handler failed unexpectedly", route.name())))
        }
    };

    match outcome {
        Ok(response) => response,
        Err(err) => {
            warn!(route = route.name(), status = err.status_code(), error = %err, "Request failed");
            error_response(&err)
        }
    }
}

async fn serve<U, F>(route: Route, event: &Request, make_resolver: F) -> Result<Response<Body>>
where
    U: Upstream,
    F: FnOnce() -> Result<Resolver<U>>,
{
    let params = QueryParams::from_request(event);
    let query = ResourceQuery::parse(route, &params)?;
    info!(route = route.name(), query = ?query, "Handling request");

    let resolver = make_resolver()?;
    let response = match &query {
        ResourceQuery::Branches(q) => json_response(200, &resolver.resolve_branches(q).await?),
        ResourceQuery::Staff(q) => json_response(200, &resolver.resolve_staff(q).await?),
        ResourceQuery::Schedule(q) => json_response(200, &resolver.resolve_schedule(q).await?),
    };
    Ok(response)
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoints::Endpoints;
    use crate::error::AttemptFailure;
    use crate::upstream::fake::FakeUpstream;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::cell::Cell;

    fn request(method: &str, uri: &str) -> Request {
        lambda_http::http::Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::Empty)
            .unwrap()
    }

    fn body(response: &Response<Body>) -> Value {
        serde_json::from_slice(response.body().as_ref()).unwrap()
    }

    fn resolver(upstream: FakeUpstream) -> Result<Resolver<FakeUpstream>> {
        Ok(Resolver::new(upstream, Endpoints::new("https://api.test", "biz")))
    }

    #[tokio::test]
    async fn test_options_is_preflight() {
        let response = dispatch(Route::Staff, &request("OPTIONS", "/staff"), || {
            resolver(FakeUpstream::new())
        })
        .await;
        assert_eq!(response.status(), 204);
        assert_eq!(response.headers()["access-control-allow-methods"], "GET, OPTIONS");
    }

    #[tokio::test]
    async fn test_post_not_allowed() {
        let response = dispatch(Route::Branches, &request("POST", "/branches"), || {
            resolver(FakeUpstream::new())
        })
        .await;
        assert_eq!(response.status(), 405);
    }

    #[tokio::test]
    async fn test_schedule_missing_params_makes_no_call() {
        let built = Cell::new(false);
        let response = dispatch(
            Route::Schedule,
            &request("GET", "/schedule?branchId=b1&staffId=s1&from=2024-01-01"),
            || {
                built.set(true);
                resolver(FakeUpstream::new())
            },
        )
        .await;
        assert_eq!(response.status(), 400);
        assert_eq!(body(&response)["error"], "invalid_request");
        assert!(!built.get());
    }

    #[tokio::test]
    async fn test_configuration_error_is_500() {
        let response = dispatch(Route::Branches, &request("GET", "/branches"), || {
            Err::<Resolver<FakeUpstream>, _>(Error::Config("missing PHOREST_USERNAME".to_string()))
        })
        .await;
        assert_eq!(response.status(), 500);
        assert_eq!(body(&response)["error"], "configuration_error");
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
    }

    #[tokio::test]
    async fn test_schedule_success() {
        let upstream = FakeUpstream::new().ok(
            "https://api.test/business/biz/branch/b1/staff/s1/rosters?startDate=2024-01-08&endDate=2024-01-08",
            json!([{"startDate": "2024-01-08", "startTime": "09:00", "endTime": "17:00"}]),
        );
        let response = dispatch(
            Route::Schedule,
            &request("GET", "/schedule?branchId=b1&staffId=s1&from=2024-01-08&to=2024-01-08"),
            || resolver(upstream),
        )
        .await;
        assert_eq!(response.status(), 200);
        assert_eq!(
            body(&response),
            json!({"rows": [{
                "dateLabel": "Mon, 08 Jan",
                "status": "WORKING",
                "timeIn": "09:00",
                "timeOut": "17:00",
                "remarks": ""
            }]})
        );
    }

    #[tokio::test]
    async fn test_staff_upstream_failure_is_502() {
        let upstream = FakeUpstream::new()
            .status("https://api.test/business/biz/branch/b1/staff", 500)
            .status("https://api.test/business/biz/branches/b1/staff", 500)
            .status("https://api.test/business/biz/staff?branchId=b1", 500)
            .status("https://api.test/business/biz/staff", 401);
        let response = dispatch(Route::Staff, &request("GET", "/staff?branchId=b1"), || {
            resolver(upstream)
        })
        .await;
        assert_eq!(response.status(), 502);
        let body = body(&response);
        assert_eq!(body["ok"], false);
        assert_eq!(body["error"], "staff_failed");
        assert_eq!(body["details"]["url"], "https://api.test/business/biz/staff");
        assert_eq!(body["details"]["status"], 401);
    }

    #[tokio::test]
    async fn test_staff_account_miss_is_404() {
        let upstream = FakeUpstream::new().ok(
            "https://api.test/business/biz/branches",
            json!({"_embedded": {"branches": [{"branchId": "b1", "accountId": "a1"}]}}),
        );
        let response = dispatch(Route::Staff, &request("GET", "/staff?accountId=zz"), || {
            resolver(upstream)
        })
        .await;
        assert_eq!(response.status(), 404);
        assert_eq!(body(&response)["details"]["accountId"], "zz");
    }

    #[tokio::test]
    async fn test_branches_success_is_array() {
        let upstream = FakeUpstream::new().ok(
            "https://api.test/business/biz/branches",
            json!({"branches": [{"branchId": "b1", "name": "Soho"}]}),
        );
        let response = dispatch(Route::Branches, &request("GET", "/branches"), || {
            resolver(upstream)
        })
        .await;
        assert_eq!(response.status(), 200);
        let body = body(&response);
        assert_eq!(body[0]["id"], "b1");
        assert_eq!(body[0]["name"], "Soho");
        assert_eq!(body[0]["accountId"], Value::Null);
    }

    struct PanickingUpstream;

    #[async_trait]
    impl Upstream for PanickingUpstream {
        async fn get_json(&self, _url: &str) -> std::result::Result<Value, AttemptFailure> {
            panic!("upstream client blew up");
        }
    }

    #[tokio::test]
    async fn test_panic_while_resolving_is_500_json() {
        let response = dispatch(Route::Branches, &request("GET", "/branches"), || {
            Ok(Resolver::new(
                PanickingUpstream,
                Endpoints::new("https://api.test", "biz"),
            ))
        })
        .await;
        assert_eq!(response.status(), 500);
        assert_eq!(response.headers()["content-type"], "application/json");
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
        let body = body(&response);
        assert_eq!(body["ok"], false);
        assert_eq!(body["error"], "internal_error");
        assert!(body["message"].as_str().unwrap().contains("branches"));
    }

    #[test]
    fn test_panic_message_payloads() {
        let owned: Box<dyn Any + Send> = Box::new("boom".to_string());
        assert_eq!(panic_message(owned.as_ref()), "boom");
        let fixed: Box<dyn Any + Send> = Box::new("bang");
        assert_eq!(panic_message(fixed.as_ref()), "bang");
        let other: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(other.as_ref()), "non-string panic payload");
    }
}
