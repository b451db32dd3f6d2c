use nseindia_api::routes::route_url;
use nseindia_api::{
    AnnouncementQuery, Error, HttpVersion, Index, Method, RequestOptions, SearchQuery, Session,
};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn load_fixture(name: &str) -> String {
    std::fs::read_to_string(format!("tests/fixtures/{}", name)).unwrap()
}

fn open(server: &MockServer) -> Session {
    Session::open(1, &server.uri(), HttpVersion::Http1Only).unwrap()
}

#[tokio::test]
async fn warm_up_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>NSE</html>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let session = open(&mock_server);
    let reply = session.warm_up().await.unwrap();
    assert_eq!(reply.status, 200);
    assert_eq!(reply.body, "<html>NSE</html>");
}

#[tokio::test]
async fn warm_up_cookies_are_sent_back() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).insert_header("set-cookie", "nsit=abc123; Path=/"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/search/autocomplete"))
        .and(header("cookie", "nsit=abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_string(load_fixture("search.json")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let session = open(&mock_server);
    session.warm_up().await.unwrap();

    let url = route_url(&mock_server.uri(), "search").unwrap();
    let options = RequestOptions::from_query(&SearchQuery::new("INFY"));
    let reply = session.send(Method::GET, url, &options).await.unwrap();
    assert!(reply.json().unwrap()["symbols"].is_array());
}

#[tokio::test]
async fn browser_headers_are_sent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("sec-fetch-mode", "cors"))
        .and(header("sec-ch-ua-mobile", "?0"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let session = open(&mock_server);
    assert!(session.warm_up().await.is_ok());

    let received = mock_server.received_requests().await.unwrap();
    let ua = received[0].headers.get("user-agent").unwrap().to_str().unwrap();
    assert_eq!(ua, session.user_agent());
}

#[tokio::test]
async fn announcement_params_are_sent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/corporate-announcements"))
        .and(query_param("index", "equities"))
        .and(query_param("symbol", "INFY"))
        .and(query_param("issuer", "Infosys Limited"))
        .and(query_param("from_date", "01-03-2024"))
        .and(query_param("to_date", "08-03-2024"))
        .respond_with(ResponseTemplate::new(200).set_body_string(load_fixture("announcements.json")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let query = AnnouncementQuery::new(Index::Equities)
        .with_issuer("INFY", "Infosys Limited")
        .with_bounds(Some(("01-03-2024".to_string(), "08-03-2024".to_string())));
    let url = route_url(&mock_server.uri(), "ca").unwrap();
    let reply = open(&mock_server)
        .send(Method::GET, url, &RequestOptions::from_query(&query))
        .await
        .unwrap();
    assert_eq!(reply.json().unwrap().as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn post_with_json_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/echo"))
        .and(body_json(serde_json::json!({"symbol": "INFY"})))
        .respond_with(ResponseTemplate::new(201).set_body_string(r#"{"ok": true}"#))
        .expect(1)
        .mount(&mock_server)
        .await;

    let url = route_url(&mock_server.uri(), "/echo").unwrap();
    let options = RequestOptions::new().with_json(serde_json::json!({"symbol": "INFY"}));
    let reply = open(&mock_server).send(Method::POST, url, &options).await.unwrap();
    assert_eq!(reply.status, 201);
    assert_eq!(reply.json().unwrap()["ok"], true);
}

#[tokio::test]
async fn non_success_status_is_an_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/corporate-announcements"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .mount(&mock_server)
        .await;

    let url = route_url(&mock_server.uri(), "ca").unwrap();
    let err = open(&mock_server)
        .send(Method::GET, url, &RequestOptions::new())
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert!(err.is_retryable());
    match err {
        Error::HttpStatus { body, .. } => assert_eq!(body, "Unauthorized"),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn malformed_json_is_not_retryable() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/corporate-announcements"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{not valid json}"))
        .mount(&mock_server)
        .await;

    let url = route_url(&mock_server.uri(), "ca").unwrap();
    let reply = open(&mock_server)
        .send(Method::GET, url, &RequestOptions::new())
        .await
        .unwrap();
    let err = reply.json().unwrap_err();
    assert!(matches!(err, Error::Json(_)));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn closed_session_fails_fast() {
    let mock_server = MockServer::start().await;
    let session = open(&mock_server);
    session.close();
    let err = session.warm_up().await.unwrap_err();
    assert!(matches!(err, Error::SessionClosed(1)));
    assert!(mock_server.received_requests().await.unwrap().is_empty());
}
