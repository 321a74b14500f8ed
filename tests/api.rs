use std::sync::Arc;

use actix_web::http::{Method, StatusCode};
use actix_web::test::{call_service, init_service, read_body, TestRequest};
use actix_web::App;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use medgate::config::CommonConfig;
use medgate::server::authn::password::hash_password;
use medgate::server::config::ServerConfig;
use medgate::server::db::{Database, IdentityRecord};
use medgate::server::factory::ServerFactory;
use medgate::server::restful::{RestfulContext, RestfulServer};
use once_cell::sync::Lazy;
use serde_json::{json, Map, Value};

const SECRET: &str = "integration-test-secret";
const PASSWORD: &str = "Corr3ct-Horse";

// bcrypt is slow even at the lowest cost, hash once for every test.
static PASSWORD_HASH: Lazy<String> = Lazy::new(|| hash_password(PASSWORD, 4).unwrap());

/// `(identifier, stored role)`, ids are assigned in this order starting at 1.
const IDENTITIES: [(u64, &str); 6] = [
    (1001, "administrator"),
    (1002, "Physician"),
    (1003, "nurse"),
    (1004, "clerk"),
    (1005, "auditor"),
    (1006, "janitor"),
];

struct Fixture {
    ctx: Arc<RestfulContext>,
    db: Arc<Database>,
    patient_id: u64,
    appointment_id: u64,
}

impl Fixture {
    fn new() -> Self {
        let mut cfg = ServerConfig::default();
        cfg.db.sqlite.memory = true;
        cfg.authn.token.secret = String::from(SECRET);
        cfg.authn.token.generate_if_not_exists = false;

        let factory = ServerFactory::new(cfg).unwrap();
        let db = factory.db();
        let (patient_id, appointment_id) = db
            .with_transaction(|tx| {
                for (identifier, role) in IDENTITIES {
                    tx.create_identity(&IdentityRecord::new(
                        identifier,
                        role,
                        PASSWORD_HASH.as_str(),
                    ))?;
                }

                let mut patient = Map::new();
                patient.insert(String::from("name"), json!("Jane Roe"));
                let patient = tx.create_record("patients", &patient)?;

                let mut appointment = Map::new();
                appointment.insert(String::from("slot"), json!("09:30"));
                let appointment = tx.create_record("appointments", &appointment)?;

                Ok((patient.id, appointment.id))
            })
            .unwrap();

        Self {
            ctx: factory.build_context().unwrap(),
            db,
            patient_id,
            appointment_id,
        }
    }
}

/// Sends a request and returns the status with the raw body.
macro_rules! call_raw {
    ($app:expr, $req:expr) => {{
        let resp = call_service(&$app, $req.to_request()).await;
        let status = resp.status();
        (status, read_body(resp).await)
    }};
}

/// Sends a request and returns the status with the JSON body, `Value::Null`
/// when the body is empty.
macro_rules! call {
    ($app:expr, $req:expr) => {{
        let (status, bytes) = call_raw!($app, $req);
        let body: Value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }};
}

macro_rules! login {
    ($app:expr, $identifier:expr) => {{
        let req = TestRequest::post()
            .uri("/login")
            .set_json(json!({"identifier": $identifier, "password": PASSWORD}));
        let (status, body) = call!($app, req);
        assert_eq!(status, StatusCode::OK, "login {}: {body}", $identifier);
        body["token"].as_str().unwrap().to_string()
    }};
}

fn api(method: Method, path: &str, token: Option<&str>) -> TestRequest {
    let req = TestRequest::default()
        .method(method)
        .uri(&format!("/api/{path}"));
    match token {
        Some(token) => req.insert_header(("Authorization", format!("Bearer {token}"))),
        None => req,
    }
}

fn token_claims(token: &str) -> Value {
    let payload = token.split('.').nth(1).unwrap();
    let payload = URL_SAFE_NO_PAD.decode(payload).unwrap();
    serde_json::from_slice(&payload).unwrap()
}

#[actix_web::test]
async fn test_healthz() {
    let fx = Fixture::new();
    let app = init_service(App::new().configure(RestfulServer::configure(fx.ctx.clone(), 3))).await;

    let (status, body) = call!(app, TestRequest::get().uri("/healthz"));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], json!(env!("CARGO_PKG_VERSION")));
    assert!(body["now"].as_u64().unwrap() > 0);

    let (status, _) = call!(app, TestRequest::post().uri("/healthz"));
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[actix_web::test]
async fn test_login() {
    let fx = Fixture::new();
    let app = init_service(App::new().configure(RestfulServer::configure(fx.ctx.clone(), 3))).await;

    let req = TestRequest::post()
        .uri("/login")
        .set_json(json!({"identifier": 1002, "password": PASSWORD}));
    let (status, body) = call!(app, req);
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["identity_id"], json!(2));
    assert_eq!(body["role"], json!("physician"));

    let claims = token_claims(body["token"].as_str().unwrap());
    assert_eq!(claims["identity_id"], json!(2));
    assert_eq!(claims["role"], json!("physician"));
    assert!(claims["iat"].as_u64().unwrap() > 0);
    assert!(claims.get("exp").is_none());

    // Login is POST only
    let (status, _) = call!(app, TestRequest::get().uri("/login"));
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[actix_web::test]
async fn test_login_failures() {
    let fx = Fixture::new();
    let app = init_service(App::new().configure(RestfulServer::configure(fx.ctx.clone(), 3))).await;

    for body in [
        json!({}),
        json!({"identifier": 1002}),
        json!({"password": PASSWORD}),
        json!({"identifier": 1002, "password": ""}),
        json!({"identifier": 0, "password": PASSWORD}),
    ] {
        let req = TestRequest::post().uri("/login").set_json(&body);
        let (status, resp) = call!(app, req);
        assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body}");
        assert_eq!(resp, json!({"error": "missing credentials"}));
    }

    let (status, resp) = call!(app, TestRequest::post().uri("/login"));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp, json!({"error": "missing credentials"}));

    // Unknown identifier and wrong password are indistinguishable, down to
    // the body bytes
    let req = TestRequest::post()
        .uri("/login")
        .set_json(json!({"identifier": 1002, "password": "wrong"}));
    let (wrong_status, wrong) = call_raw!(app, req);
    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        serde_json::from_slice::<Value>(&wrong).unwrap(),
        json!({"error": "invalid credentials"})
    );

    for identifier in [json!(9999), json!(-1), json!(i64::MAX), json!(u64::MAX)] {
        let req = TestRequest::post()
            .uri("/login")
            .set_json(json!({"identifier": identifier, "password": PASSWORD}));
        let (status, unknown) = call_raw!(app, req);
        assert_eq!(status, StatusCode::UNAUTHORIZED, "identifier: {identifier}");
        assert_eq!(unknown, wrong, "identifier: {identifier}");
    }
}

#[actix_web::test]
async fn test_unauthenticated() {
    let fx = Fixture::new();
    let app = init_service(App::new().configure(RestfulServer::configure(fx.ctx.clone(), 3))).await;

    let expect = json!({"error": "authentication required"});

    let (status, body) = call!(app, api(Method::GET, "patients", None));
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, expect);

    let (status, body) = call!(app, api(Method::GET, "patients", Some("not-a-token")));
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, expect);

    let req = api(Method::GET, "patients", None).insert_header(("Authorization", "Bearer"));
    let (status, body) = call!(app, req);
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, expect);

    let (status, body) = call!(app, api(Method::GET, "whoami", None));
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, expect);

    // Tampered signature
    let mut token = login!(app, 1002);
    token.push('x');
    let (status, _) = call!(app, api(Method::GET, "patients", Some(&token)));
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_authorization() {
    let fx = Fixture::new();
    let app = init_service(App::new().configure(RestfulServer::configure(fx.ctx.clone(), 3))).await;

    let physician = login!(app, 1002);
    let nurse = login!(app, 1003);
    let auditor = login!(app, 1005);
    let janitor = login!(app, 1006);

    let patient = format!("patients/{}", fx.patient_id);
    let appointment = format!("appointments/{}", fx.appointment_id);

    let (status, body) = call!(app, api(Method::GET, "patients", Some(&physician)));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], json!(1));
    assert_eq!(body["items"][0]["data"]["name"], json!("Jane Roe"));

    let (status, body) = call!(app, api(Method::DELETE, &patient, Some(&physician)));
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, json!({"error": "permission denied"}));

    let (status, _) = call!(app, api(Method::GET, "equipment", Some(&auditor)));
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call!(app, api(Method::POST, "equipment", Some(&auditor)).set_json(json!({})));
    assert_eq!(status, StatusCode::FORBIDDEN);

    let req = api(Method::PATCH, &appointment, Some(&nurse)).set_json(json!({"slot": "10:00"}));
    let (status, body) = call!(app, req);
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["slot"], json!("10:00"));

    let req = api(Method::PATCH, &patient, Some(&nurse)).set_json(json!({"name": "John Doe"}));
    let (status, _) = call!(app, req);
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Roles outside the table are denied everything
    let (status, _) = call!(app, api(Method::GET, "patients", Some(&janitor)));
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The record was not touched by the denied PATCH
    let (_, body) = call!(app, api(Method::GET, &patient, Some(&physician)));
    assert_eq!(body["data"]["name"], json!("Jane Roe"));
}

#[actix_web::test]
async fn test_crud() {
    let fx = Fixture::new();
    let app = init_service(App::new().configure(RestfulServer::configure(fx.ctx.clone(), 3))).await;

    let admin = login!(app, 1001);

    let req = api(Method::POST, "medications", Some(&admin)).set_json(json!({"name": "aspirin"}));
    let (status, body) = call!(app, req);
    assert_eq!(status, StatusCode::CREATED);
    let id = body["id"].as_u64().unwrap();
    let path = format!("medications/{id}");

    let req = api(Method::PUT, &path, Some(&admin)).set_json(json!({"name": "ibuprofen", "mg": 200}));
    let (status, body) = call!(app, req);
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!({"name": "ibuprofen", "mg": 200}));

    let req = api(Method::PATCH, &path, Some(&admin)).set_json(json!({"mg": null}));
    let (_, body) = call!(app, req);
    assert_eq!(body["data"], json!({"name": "ibuprofen"}));

    let (status, body) = call!(app, api(Method::DELETE, &path, Some(&admin)));
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, body) = call!(app, api(Method::GET, &path, Some(&admin)));
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "record not found"}));

    let (status, _) = call!(app, api(Method::GET, "wards", Some(&admin)));
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_out_of_range() {
    let fx = Fixture::new();
    let app = init_service(App::new().configure(RestfulServer::configure(fx.ctx.clone(), 3))).await;

    let admin = login!(app, 1001);
    let huge = u64::MAX;

    for method in [Method::GET, Method::DELETE] {
        let (status, body) = call!(app, api(method.clone(), &format!("patients/{huge}"), Some(&admin)));
        assert_eq!(status, StatusCode::NOT_FOUND, "{method}");
        assert_eq!(body, json!({"error": "record not found"}));
    }

    let req = api(Method::PATCH, &format!("patients/{huge}"), Some(&admin)).set_json(json!({"a": 1}));
    let (status, _) = call!(app, req);
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = call!(app, api(Method::GET, &format!("patients?offset={huge}"), Some(&admin)));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], json!(1));
    assert_eq!(body["items"], json!([]));
}

#[actix_web::test]
async fn test_identity_changes() {
    let fx = Fixture::new();
    let app = init_service(App::new().configure(RestfulServer::configure(fx.ctx.clone(), 3))).await;

    let token = login!(app, 1003);
    let (status, body) = call!(app, api(Method::GET, "whoami", Some(&token)));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"identity_id": 3, "identifier": 1003, "role": "nurse"})
    );

    let (_, body) = call!(app, api(Method::GET, "cani/DELETE/employees", Some(&token)));
    assert_eq!(body, json!({"allow": false}));

    // A role change applies to tokens issued before it
    fx.db
        .with_transaction(|tx| tx.update_identity_role(3, "clerk"))
        .unwrap();
    let (_, body) = call!(app, api(Method::GET, "whoami", Some(&token)));
    assert_eq!(body["role"], json!("clerk"));
    let (_, body) = call!(app, api(Method::GET, "cani/DELETE/employees", Some(&token)));
    assert_eq!(body, json!({"allow": true}));

    // So does a deletion
    fx.db.with_transaction(|tx| tx.delete_identity(3)).unwrap();
    let (status, _) = call!(app, api(Method::GET, "whoami", Some(&token)));
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
