//! HttpFetcher against a local mock server.

use encoding_rs::EUC_JP;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use keiba_scraper::scraper::{FetchProfile, Fetcher, HttpFetcher, RateLimiter};
use keiba_scraper::{FetchFailure, ScrapeError};

const USER_AGENT: &str = "Mozilla/5.0 (test)";

fn fetcher() -> HttpFetcher {
    HttpFetcher::new(RateLimiter::disabled(), USER_AGENT, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_euc_jp_body_is_decoded() {
    let server = MockServer::start().await;
    let (body, _, _) = EUC_JP.encode("<h1 class=\"RaceName\">有馬記念</h1>");
    Mock::given(method("GET"))
        .and(path("/race/shutuba.html"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html; charset=utf-8")
                .set_body_bytes(body.into_owned()),
        )
        .mount(&server)
        .await;

    let url = format!("{}/race/shutuba.html?race_id=202406050811", server.uri());
    let content = fetcher().fetch(&url, FetchProfile::Browser).await.unwrap();
    assert_eq!(content, "<h1 class=\"RaceName\">有馬記念</h1>");
}

#[tokio::test]
async fn test_error_status_is_fetch_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let url = format!("{}/race/202406050811/", server.uri());
    let err = fetcher().fetch(&url, FetchProfile::Browser).await.unwrap_err();
    match err {
        ScrapeError::Fetch { url: failed, source } => {
            assert_eq!(failed, url);
            assert!(matches!(source, FetchFailure::Status(503)));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_browser_profile_sends_user_agent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let client = fetcher();
    client.fetch(&format!("{}/browser", server.uri()), FetchProfile::Browser).await.unwrap();
    client.fetch(&format!("{}/bare", server.uri()), FetchProfile::Bare).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);

    let browser = requests.iter().find(|r| r.url.path() == "/browser").unwrap();
    assert_eq!(browser.headers.get("user-agent").unwrap(), USER_AGENT);

    let bare = requests.iter().find(|r| r.url.path() == "/bare").unwrap();
    assert!(bare.headers.get("user-agent").is_none());
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let url = format!("http://127.0.0.1:{}/horse/2019105219/", port);
    let err = fetcher().fetch(&url, FetchProfile::Browser).await.unwrap_err();
    assert!(matches!(err, ScrapeError::Fetch { source: FetchFailure::Transport(_), .. }));
    assert_eq!(err.url(), Some(url.as_str()));
}
