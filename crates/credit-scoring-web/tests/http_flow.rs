use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::process::{Child, Command, Stdio};
use std::thread::JoinHandle;
use std::time::Duration;

fn reserve_addr() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("reserve addr");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    addr.to_string()
}

fn wait_for_http(addr: &str) {
    for _ in 0..80 {
        if TcpStream::connect(addr).is_ok() {
            return;
        }
        std::thread::sleep(Duration::from_millis(25));
    }
    panic!("http server not ready on {addr}");
}

fn send_http(addr: &str, method: &str, path: &str, content_type: &str, body: &str) -> String {
    let mut stream = TcpStream::connect(addr).expect("connect http");
    let request = format!(
        "{method} {path} HTTP/1.1\r\nHost: {addr}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    stream.write_all(request.as_bytes()).expect("write request");
    stream.flush().expect("flush");
    let mut buf = String::new();
    stream.read_to_string(&mut buf).expect("read response");
    buf
}

fn response_body(response: &str) -> &str {
    response.split("\r\n\r\n").nth(1).unwrap_or("")
}

/// Answers `responses.len()` requests in order and returns the raw requests.
fn spawn_scoring_stub(responses: Vec<(u16, &'static str)>) -> (String, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub");
    let addr = listener.local_addr().expect("stub addr");
    let handle = std::thread::spawn(move || {
        let mut seen = Vec::new();
        for (status, body) in responses {
            let (mut stream, _) = listener.accept().expect("accept");
            let mut reader = BufReader::new(stream.try_clone().expect("clone"));
            let mut raw = String::new();
            let mut content_length = 0usize;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).expect("header");
                if let Some(v) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                    content_length = v.trim().parse().expect("length");
                }
                raw.push_str(&line);
                if line == "\r\n" || line.is_empty() {
                    break;
                }
            }
            let mut payload = vec![0_u8; content_length];
            reader.read_exact(&mut payload).expect("body");
            raw.push_str(&String::from_utf8(payload).expect("utf8"));
            seen.push(raw);

            let response = format!(
                "HTTP/1.1 {status} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).expect("write");
            stream.flush().expect("flush");
        }
        seen
    });
    (format!("http://{addr}"), handle)
}

fn spawn_form_server(scoring_url: &str) -> (Child, String) {
    let addr = reserve_addr();
    let child = Command::new(env!("CARGO_BIN_EXE_credit-scoringd"))
        .env("CREDIT_SCORING_API_URL", scoring_url)
        .env("CREDIT_SCORING_HTTP_ADDR", &addr)
        .env("CREDIT_SCORING_TIMEOUT_MS", "5000")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn credit-scoringd");
    wait_for_http(&addr);
    (child, addr)
}

fn stop(mut child: Child) {
    let _ = child.kill();
    let _ = child.wait();
}

#[test]
fn health_and_form_page_are_served() {
    let (child, addr) = spawn_form_server(&format!("http://{}", reserve_addr()));

    let health = send_http(&addr, "GET", "/health", "text/plain", "");
    assert!(health.starts_with("HTTP/1.1 200"));
    assert!(response_body(&health).contains("\"status\":\"ok\""));

    let page = send_http(&addr, "GET", "/", "text/plain", "");
    assert!(page.starts_with("HTTP/1.1 200"));
    let body = response_body(&page);
    assert!(body.contains("name=\"AMT_INCOME_TOTAL\""));
    assert!(body.contains("name=\"age_years\""));
    assert!(!body.contains("name=\"DAYS_BIRTH\""));

    let missing = send_http(&addr, "GET", "/nope", "text/plain", "");
    assert!(missing.starts_with("HTTP/1.1 404"));

    stop(child);
}

#[test]
fn default_vector_is_scored_high_risk() {
    let (scoring_url, stub) =
        spawn_scoring_stub(vec![(200, r#"{"probability":0.82,"decision":"HIGH RISK"}"#)]);
    let (child, addr) = spawn_form_server(&scoring_url);

    let resp = send_http(&addr, "POST", "/api/score", "application/json", "{}");
    assert!(resp.starts_with("HTTP/1.1 200"), "{resp}");
    let json: serde_json::Value = serde_json::from_str(response_body(&resp)).expect("json");
    assert_eq!(json["status"], "scored");
    assert_eq!(json["probability_label"], "82.00%");
    assert_eq!(json["high_risk"], true);

    let requests = stub.join().expect("stub");
    assert_eq!(requests.len(), 1);
    let raw = &requests[0];
    assert!(raw.starts_with("POST /predict HTTP/1.1"));
    let sent: serde_json::Value =
        serde_json::from_str(raw.split("\r\n\r\n").nth(1).expect("body")).expect("request json");
    let features = sent["features"].as_array().expect("features");
    assert_eq!(features.len(), 20);
    assert_eq!(features[0].as_f64(), Some(150_000.0));
    assert_eq!(features[19].as_f64(), Some(0.0));

    stop(child);
}

#[test]
fn upstream_failure_is_reported_without_result() {
    let (scoring_url, stub) = spawn_scoring_stub(vec![
        (500, "internal error"),
        (200, r#"{"decision":"LOW RISK"}"#),
    ]);
    let (child, addr) = spawn_form_server(&scoring_url);

    let resp = send_http(&addr, "POST", "/api/score", "application/json", "{}");
    assert!(resp.starts_with("HTTP/1.1 502"), "{resp}");
    let json: serde_json::Value = serde_json::from_str(response_body(&resp)).expect("json");
    assert_eq!(json["status"], "failed");
    assert_eq!(json["category"], "api");
    assert!(json["message"].as_str().unwrap_or("").contains("500"));
    assert!(json.get("probability").is_none());

    let page = send_http(
        &addr,
        "POST",
        "/",
        "application/x-www-form-urlencoded",
        "AMT_CREDIT=500000&CODE_GENDER_M=1&FLAG_OWN_REALTY=1&age_years=40&employment_years=5",
    );
    assert!(page.starts_with("HTTP/1.1 200"));
    assert!(response_body(&page).contains("data-category=\"malformed_response\""));

    assert_eq!(stub.join().expect("stub").len(), 2);
    stop(child);
}

#[test]
fn invalid_input_never_reaches_the_scoring_service() {
    let (child, addr) = spawn_form_server(&format!("http://{}", reserve_addr()));

    let resp = send_http(
        &addr,
        "POST",
        "/api/score",
        "application/json",
        r#"{"REGION_RATING_CLIENT": 4}"#,
    );
    assert!(resp.starts_with("HTTP/1.1 422"), "{resp}");
    let json: serde_json::Value = serde_json::from_str(response_body(&resp)).expect("json");
    assert_eq!(json["category"], "validation");

    stop(child);
}

#[test]
fn rejected_form_post_keeps_submitted_values_and_sends_nothing() {
    let scoring = TcpListener::bind("127.0.0.1:0").expect("bind scoring");
    let scoring_url = format!("http://{}", scoring.local_addr().expect("scoring addr"));
    let (child, addr) = spawn_form_server(&scoring_url);

    let page = send_http(
        &addr,
        "POST",
        "/",
        "application/x-www-form-urlencoded",
        "AMT_CREDIT=250000&REGION_RATING_CLIENT=7&age_years=60",
    );
    assert!(page.starts_with("HTTP/1.1 200"), "{page}");
    let body = response_body(&page);
    assert!(body.contains("data-category=\"validation\""));
    assert!(body.contains("name=\"AMT_CREDIT\" step=\"0.01\" value=\"250000\""));
    assert!(body.contains("name=\"age_years\" min=\"18\" max=\"100\" step=\"1\" value=\"60\""));
    assert!(!body.contains("name=\"FLAG_OWN_REALTY\" value=\"1\" checked"));
    assert!(!body.contains("<progress"));

    scoring.set_nonblocking(true).expect("nonblocking");
    match scoring.accept() {
        Err(err) => assert_eq!(err.kind(), std::io::ErrorKind::WouldBlock),
        Ok((_, peer)) => panic!("scoring service was contacted from {peer}"),
    }

    stop(child);
}

#[test]
fn unreachable_service_is_a_connection_error() {
    let (child, addr) = spawn_form_server(&format!("http://{}", reserve_addr()));

    let resp = send_http(&addr, "POST", "/api/score", "application/json", "");
    assert!(resp.starts_with("HTTP/1.1 502"), "{resp}");
    let json: serde_json::Value = serde_json::from_str(response_body(&resp)).expect("json");
    assert_eq!(json["category"], "connection");
    assert!(json["message"]
        .as_str()
        .unwrap_or("")
        .starts_with("Erreur de connexion"));

    stop(child);
}
