//! End-to-end dispatch properties through the umbrella builder

use http::StatusCode;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use switchyard::http::testing::{echo_handler, CallLog, PostsController, RecordingMiddleware, Step, TestRequest};
use switchyard::http::MatchOutcome;
use switchyard::prelude::*;
use switchyard::security::NonceStore;
use switchyard::SecurityServices;

fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

#[test]
fn first_registered_route_wins_every_time() {
    let dispatcher = Switchyard::default()
        .routes(|r| {
            r.register(RouteDefinition::get(RouteType::Api, "/users/:id", echo_handler()).name("first"))?
                .register(RouteDefinition::get(RouteType::Api, "/users/{id:int}", echo_handler()).name("second"))?;
            Ok(())
        })
        .unwrap()
        .build()
        .unwrap();

    for _ in 0..5 {
        let dispatched = dispatcher
            .dispatch(RouteType::Api, HttpMethod::GET, "/users/42", &TestRequest::get())
            .unwrap();
        assert_eq!(dispatched.route_name.as_deref(), Some("first"));
    }
}

#[test]
fn path_params_contain_only_named_segments() {
    let dispatcher = Switchyard::default()
        .routes(|r| {
            r.register(RouteDefinition::get(RouteType::Api, "/users/:id", echo_handler()))?;
            Ok(())
        })
        .unwrap()
        .build()
        .unwrap();

    let dispatched = dispatcher
        .dispatch(RouteType::Api, HttpMethod::GET, "/users/42?tab=posts", &TestRequest::get())
        .unwrap();
    assert_eq!(dispatched.payload["params"], json!({"id": "42"}));
}

#[test]
fn nested_groups_concatenate_prefixes_and_middleware() {
    let dispatcher = Switchyard::default()
        .routes(|r| {
            r.group(GroupAttributes::new().prefix("api").middleware("cors"), |r| {
                r.group(GroupAttributes::new().prefix("v1").middleware("auth"), |r| {
                    r.group(GroupAttributes::new().prefix("admin"), |r| {
                        r.register(RouteDefinition::get(RouteType::Api, "/stats", echo_handler()).name("stats"))?;
                        Ok(())
                    })?;
                    Ok(())
                })?;
                Ok(())
            })?;
            Ok(())
        })
        .unwrap()
        .build()
        .unwrap();

    let routes = dispatcher.routes(RouteType::Api);
    assert_eq!(routes[0].path, "/api/v1/admin/stats");
    assert_eq!(routes[0].middleware, vec!["cors", "auth"]);
    assert!(matches!(
        dispatcher.match_route(RouteType::Api, HttpMethod::GET, "/api/v1/admin/stats"),
        MatchOutcome::Matched(_)
    ));
}

#[test]
fn pipeline_stops_at_first_rejection() {
    let log = CallLog::default();
    let dispatcher = Switchyard::default()
        .middleware("a", RecordingMiddleware::new("a", Step::Pass).with_log(&log).factory())
        .middleware(
            "b",
            RecordingMiddleware::new("b", Step::Reject(StatusCode::IM_A_TEAPOT))
                .with_log(&log)
                .factory(),
        )
        .middleware("c", RecordingMiddleware::new("c", Step::Pass).with_log(&log).factory())
        .routes(|r| {
            r.register(
                RouteDefinition::get(RouteType::Web, "/brew", echo_handler())
                    .middleware("a")
                    .middleware("b")
                    .middleware("c"),
            )?;
            Ok(())
        })
        .unwrap()
        .build()
        .unwrap();

    let err = dispatcher
        .dispatch(RouteType::Web, HttpMethod::GET, "/brew", &TestRequest::get())
        .unwrap_err();
    assert_eq!(log.calls(), vec!["a", "b"]);
    match err {
        DispatchError::MiddlewareRejected { middleware, status, .. } => {
            assert_eq!(middleware, "b");
            assert_eq!(status, StatusCode::IM_A_TEAPOT);
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn empty_name_fails_required_and_min() {
    let dispatcher = Switchyard::default()
        .rule_set("user", RuleSet::new().field("name", "required|min:3").unwrap())
        .routes(|r| {
            r.register(RouteDefinition::post(RouteType::Api, "/users", echo_handler()).middleware("validate:user"))?;
            Ok(())
        })
        .unwrap()
        .build()
        .unwrap();

    let result = dispatcher.dispatch(
        RouteType::Api,
        HttpMethod::POST,
        "/users",
        &TestRequest::post().json(json!({"name": ""})),
    );
    let envelope = dispatcher.respond(&result);
    assert_eq!(envelope.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = envelope.to_json();
    assert_eq!(body["error"]["kind"], "validation_failed");
    assert_eq!(body["error"]["field_errors"]["name"].as_array().map(Vec::len), Some(2));
}

#[test]
fn confirmed_passes_and_mismatch_gives_one_message() {
    let rules = RuleSet::new().field("password", "confirmed").unwrap();
    let validator = Validator::new();

    let ok = json!({"password": "s3cret!", "password_confirmation": "s3cret!"});
    assert!(validator.validate(&ok, &rules).is_ok());

    let mismatch = json!({"password": "s3cret!", "password_confirmation": "other"});
    let errors = validator.validate(&mismatch, &rules).unwrap_err();
    assert_eq!(errors.messages("password").len(), 1);
}

#[test]
fn url_for_reports_unresolvable_names_and_params() {
    let dispatcher = Switchyard::default()
        .controller("Posts", PostsController)
        .routes(|r| {
            r.resource("posts", "Posts", ResourceOptions::default())?;
            Ok(())
        })
        .unwrap()
        .build()
        .unwrap();

    assert_eq!(
        dispatcher.url_for("posts.show", &params(&[("id", "7")])).unwrap(),
        "/posts/7"
    );
    assert!(matches!(
        dispatcher.url_for("posts.missing", &HashMap::new()),
        Err(DispatchError::UnresolvableUrl { .. })
    ));
    assert!(matches!(
        dispatcher.url_for("posts.show", &HashMap::new()),
        Err(DispatchError::UnresolvableUrl { .. })
    ));
}

#[test]
fn validation_is_idempotent() {
    let rules = RuleSet::new()
        .field("email", "required|email")
        .unwrap()
        .field("age", "nullable|integer|between:18,130")
        .unwrap();
    let validator = Validator::new();
    let data = json!({"email": "not-an-email", "age": 12});

    let first = validator.validate(&data, &rules).unwrap_err();
    let second = validator.validate(&data, &rules).unwrap_err();
    assert_eq!(first.to_messages(), second.to_messages());
    assert_eq!(data, json!({"email": "not-an-email", "age": 12}));
}

#[test]
fn dispatcher_is_shared_across_threads() {
    let dispatcher = Arc::new(
        Switchyard::default()
            .controller("Posts", PostsController)
            .routes(|r| {
                r.api_resource("posts", "Posts", ResourceOptions::default())?;
                Ok(())
            })
            .unwrap()
            .build()
            .unwrap(),
    );

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let dispatcher = Arc::clone(&dispatcher);
            std::thread::spawn(move || {
                let path = format!("/posts/{}", i);
                dispatcher
                    .dispatch(RouteType::Api, HttpMethod::GET, &path, &TestRequest::get())
                    .map(|d| d.payload["params"]["id"].clone())
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap().unwrap(), json!(i.to_string()));
    }
}

#[test]
fn admin_pages_carry_metadata_and_default_capability() {
    let dispatcher = Switchyard::default()
        .routes(|r| {
            r.register(
                RouteDefinition::get(RouteType::Admin, "/reports", echo_handler())
                    .name("reports")
                    .title("Reports")
                    .template("admin/reports")
                    .menu(MenuMeta::new("Reports").icon("chart").position(5)),
            )?;
            Ok(())
        })
        .unwrap()
        .build()
        .unwrap();

    let denied = dispatcher.dispatch(
        RouteType::Admin,
        HttpMethod::GET,
        "/reports",
        &TestRequest::get().capability("read"),
    );
    assert_eq!(dispatcher.respond(&denied).status(), StatusCode::FORBIDDEN);

    let page = dispatcher
        .dispatch(
            RouteType::Admin,
            HttpMethod::GET,
            "/reports",
            &TestRequest::get().capability("manage_options"),
        )
        .unwrap();
    assert_eq!(page.template.as_deref(), Some("admin/reports"));

    let menu = dispatcher.admin_menu();
    assert_eq!(menu.len(), 1);
    assert_eq!(menu[0].menu.icon.as_deref(), Some("chart"));
}

#[test]
fn ajax_actions_with_nonce_and_rate_limit() {
    let services = SecurityServices::default();
    let dispatcher = Switchyard::default()
        .security(services.clone())
        .routes(|r| {
            r.register(
                RouteDefinition::post(RouteType::Ajax, "/vote", echo_handler())
                    .middleware("rate_limit:1,60")
                    .middleware("nonce:vote"),
            )?;
            Ok(())
        })
        .unwrap()
        .build()
        .unwrap();

    let token = services.nonces.issue("vote", "user:9");
    let request = TestRequest::post().user(9).header("x-nonce", &token);
    assert!(dispatcher
        .dispatch(RouteType::Ajax, HttpMethod::POST, "/vote", &request)
        .is_ok());

    let fresh = services.nonces.issue("vote", "user:9");
    let again = TestRequest::post().user(9).header("x-nonce", &fresh);
    let err = dispatcher
        .dispatch(RouteType::Ajax, HttpMethod::POST, "/vote", &again)
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[test]
fn rejected_request_still_spends_its_rate_limit() {
    let services = SecurityServices::default();
    let dispatcher = Switchyard::default()
        .security(services.clone())
        .routes(|r| {
            r.register(
                RouteDefinition::post(RouteType::Ajax, "/vote", echo_handler())
                    .middleware("rate_limit:1,60")
                    .middleware("nonce:vote"),
            )?;
            Ok(())
        })
        .unwrap()
        .build()
        .unwrap();

    let forged = TestRequest::post().user(9).header("x-nonce", "forged-token");
    let err = dispatcher
        .dispatch(RouteType::Ajax, HttpMethod::POST, "/vote", &forged)
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::FORBIDDEN);

    // The count taken by the rejected request is not given back
    let token = services.nonces.issue("vote", "user:9");
    let valid = TestRequest::post().user(9).header("x-nonce", &token);
    let err = dispatcher
        .dispatch(RouteType::Ajax, HttpMethod::POST, "/vote", &valid)
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::TOO_MANY_REQUESTS);

    // nonce never ran for the limited request, so its token is still unspent
    assert!(services.nonces.verify("vote", &token, "user:9"));
}
