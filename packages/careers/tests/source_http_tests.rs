//! End-to-end tests of the configurable sources against a local HTTP server.

use careers::sources::{parse_employer_specs, SourceContext};
use careers::{fetch_listings, FetchOptions};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

type Handler = fn(&str) -> (u16, String);

/// Serve `handler` on an ephemeral port. Returns the base URL and the
/// request targets (path and query) seen so far.
async fn serve(handler: Handler) -> (String, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let seen = Arc::new(Mutex::new(Vec::new()));

    let log = seen.clone();
    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            let log = log.clone();
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let mut chunk = [0u8; 4096];
                while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut chunk).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    }
                }
                let head = String::from_utf8_lossy(&buf).to_string();
                let target = head.split_whitespace().nth(1).unwrap_or("/").to_string();
                log.lock().unwrap().push(target.clone());

                let (status, body) = handler(&target);
                let response = format!(
                    "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    });

    (base, seen)
}

fn query_param(target: &str, name: &str) -> Option<u64> {
    let (_, query) = target.split_once('?')?;
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == name)
        .and_then(|(_, v)| v.parse().ok())
}

/// Five positions, served `num` at a time from `start`.
fn positions(target: &str) -> (u16, String) {
    let start = query_param(target, "start").unwrap_or(0);
    let num = query_param(target, "num").unwrap_or(10);
    let positions: Vec<_> = (start..(start + num).min(5))
        .map(|i| {
            json!({
                "id": 1000 + i,
                "ats_job_id": format!("JR{}", i),
                "name": format!("Role {}", i),
                "t_create": 1_743_465_600 + i,
                "canonicalPositionUrl": format!("/careers/job/{}", 1000 + i)
            })
        })
        .collect();
    (200, json!({"count": 5, "positions": positions}).to_string())
}

/// Like `positions`, but the second page is a server error.
fn flaky_positions(target: &str) -> (u16, String) {
    match query_param(target, "start") {
        Some(0) | None => positions(target),
        _ => (500, "{}".to_string()),
    }
}

fn api_spec(base: &str) -> String {
    json!([{
        "name": "Local API",
        "source": {
            "kind": "json_api",
            "url": format!("{}/api/jobs", base),
            "query": {"domain": "example.com"},
            "items_pointer": "/positions",
            "pagination": {
                "style": "offset_limit",
                "offset": {"in": "query", "name": "start"},
                "limit": {"in": "query", "name": "num"},
                "page_size": 2,
                "total_pointer": "/count"
            },
            "fields": {
                "id": ["/ats_job_id", "/id"],
                "title": "/name",
                "posted_at": {"pointer": "/t_create", "format": "epoch_seconds"},
                "source_url": "/canonicalPositionUrl",
                "url_base": base
            }
        }
    }])
    .to_string()
}

fn context() -> SourceContext {
    SourceContext::new(Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn api_source_drains_offset_pagination() {
    let (base, seen) = serve(positions).await;
    let specs = parse_employer_specs(&api_spec(&base)).unwrap();
    let source = specs[0].build(&context()).unwrap();

    let outcome = fetch_listings(source.as_ref(), &FetchOptions::default()).await;

    assert!(outcome.is_complete());
    assert_eq!(outcome.pages_fetched, 3);
    assert_eq!(outcome.external_ids(), ["JR0", "JR1", "JR2", "JR3", "JR4"]);

    let first = &outcome.listings[0];
    assert_eq!(first.employer, "Local API");
    assert_eq!(first.title.as_deref(), Some("Role 0"));
    assert_eq!(first.posted_at.map(|d| d.timestamp()), Some(1_743_465_600));
    assert_eq!(
        first.source_url.as_deref(),
        Some(format!("{}/careers/job/1000", base).as_str())
    );

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 3);
    assert!(seen.iter().all(|t| t.contains("domain=example.com")));
    assert_eq!(query_param(&seen[2], "start"), Some(4));
}

#[tokio::test]
async fn api_source_failure_returns_partial_batch() {
    let (base, _) = serve(flaky_positions).await;
    let specs = parse_employer_specs(&api_spec(&base)).unwrap();
    let source = specs[0].build(&context()).unwrap();

    let outcome = fetch_listings(source.as_ref(), &FetchOptions::default()).await;

    assert!(!outcome.is_complete());
    assert!(outcome.halted_early.as_deref().unwrap().contains("500"));
    assert_eq!(outcome.external_ids(), ["JR0", "JR1"]);
}

fn openings(_target: &str) -> (u16, String) {
    let html = r#"
        <html><body>
          <div class="opening" data-id="H-1">
            <h3>Lithography Engineer</h3>
            <a href="/openings/H-1">Details</a>
            <span class="where">Veldhoven</span>
          </div>
          <div class="opening" data-id="H-2">
            <h3>Field Service Engineer</h3>
            <a href="/openings/H-2">Details</a>
          </div>
        </body></html>
    "#;
    (200, html.to_string())
}

#[tokio::test]
async fn html_source_extracts_static_page() {
    let (base, _) = serve(openings).await;
    let definition = json!([{
        "name": "Local HTML",
        "source": {
            "kind": "html",
            "url": format!("{}/openings", base),
            "item_selector": "div.opening",
            "extract": [
                {"name": "id", "attr": "data-id"},
                {"name": "title", "selector": "h3"},
                {"name": "url", "selector": "a", "attr": "href"},
                {"name": "location", "selector": "span.where"}
            ],
            "fields": {"id": ["/id"], "title": "/title", "location": "/location", "source_url": "/url"}
        }
    }])
    .to_string();
    let specs = parse_employer_specs(&definition).unwrap();
    let source = specs[0].build(&context()).unwrap();

    let outcome = fetch_listings(source.as_ref(), &FetchOptions::default()).await;

    assert!(outcome.is_complete());
    assert_eq!(outcome.external_ids(), ["H-1", "H-2"]);
    assert_eq!(outcome.listings[0].title.as_deref(), Some("Lithography Engineer"));
    assert_eq!(outcome.listings[0].location.as_deref(), Some("Veldhoven"));
    assert_eq!(outcome.listings[1].location, None);
    assert_eq!(
        outcome.listings[1].source_url.as_deref(),
        Some(format!("{}/openings/H-2", base).as_str())
    );
}
