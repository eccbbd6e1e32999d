//! End-to-end tests driving the binary against mock mediator endpoints.
//!
//! The mock is a bare TCP listener speaking just enough HTTP/1.1 for the
//! client: it records request paths and replies with canned bodies. A
//! liveness probe (connect-and-close) is served by simply accepting and
//! dropping the connection.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

struct MockMediator {
    port: u16,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MockMediator {
    /// Serve canned `(status, body)` responses keyed by path prefix.
    fn serve(listener: TcpListener, routes: HashMap<&'static str, (u16, String)>) -> Self {
        let port = listener.local_addr().unwrap().port();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&requests);
        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { continue };
                let mut raw = Vec::new();
                let mut buf = [0u8; 4096];
                loop {
                    match stream.read(&mut buf) {
                        Ok(0) | Err(_) => break,
                        Ok(n) => {
                            raw.extend_from_slice(&buf[..n]);
                            if raw.windows(4).any(|w| w == b"\r\n\r\n") {
                                break;
                            }
                        }
                    }
                }
                if raw.is_empty() {
                    continue; // liveness probe
                }
                let request = String::from_utf8_lossy(&raw);
                let path = request
                    .lines()
                    .next()
                    .and_then(|line| line.split_whitespace().nth(1))
                    .unwrap_or("/")
                    .to_string();
                seen.lock().unwrap().push(path.clone());
                let (status, body) = routes
                    .iter()
                    .find(|(prefix, _)| path.starts_with(**prefix))
                    .map(|(_, response)| response.clone())
                    .unwrap_or((404, String::new()));
                let response = format!(
                    "HTTP/1.1 {status} OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes());
            }
        });
        Self { port, requests }
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

/// Reserve `n` listeners on contiguous ports (discovery scans a
/// contiguous range starting at the base port).
fn contiguous_listeners(n: u16) -> Vec<TcpListener> {
    'attempt: for _ in 0..50 {
        let first = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = first.local_addr().unwrap().port();
        let mut listeners = vec![first];
        for offset in 1..n {
            let Some(port) = base.checked_add(offset) else {
                continue 'attempt;
            };
            match TcpListener::bind(("127.0.0.1", port)) {
                Ok(listener) => listeners.push(listener),
                Err(_) => continue 'attempt,
            }
        }
        return listeners;
    }
    panic!("could not reserve contiguous ports");
}

fn routes(entries: &[(&'static str, u16, &str)]) -> HashMap<&'static str, (u16, String)> {
    entries
        .iter()
        .map(|(path, status, body)| (*path, (*status, body.to_string())))
        .collect()
}

#[test]
fn list_qualifies_tabs_with_endpoint_prefix() {
    let mut listeners = contiguous_listeners(1);
    let mock = MockMediator::serve(
        listeners.remove(0),
        routes(&[(
            "/list_tabs",
            200,
            "1.2\tRust Book\thttps://doc.rust-lang.org\n1.3\tLobsters\thttps://lobste.rs\n",
        )]),
    );

    cargo_bin_cmd!("tabctl")
        .arg("list")
        .env("TABCTL_BASE_PORT", mock.port.to_string())
        .env("TABCTL_PORT_COUNT", "1")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "a.1.2\tRust Book\thttps://doc.rust-lang.org",
        ))
        .stdout(predicate::str::contains("a.1.3\tLobsters"));
}

#[test]
fn list_merges_endpoints_in_prefix_order_despite_one_failure() {
    let mut listeners = contiguous_listeners(3);
    let base = listeners[0].local_addr().unwrap().port();
    let _a = MockMediator::serve(
        listeners.remove(0),
        routes(&[("/list_tabs", 200, "1.1\tA1\tu1\n1.2\tA2\tu2\n")]),
    );
    // Endpoint `b` is alive but errors on the call: it must contribute
    // nothing without disturbing the others.
    let _b = MockMediator::serve(listeners.remove(0), routes(&[("/list_tabs", 500, "")]));
    let _c = MockMediator::serve(
        listeners.remove(0),
        routes(&[("/list_tabs", 200, "7.1\tC1\tu3\n")]),
    );

    cargo_bin_cmd!("tabctl")
        .arg("list")
        .env("TABCTL_BASE_PORT", base.to_string())
        .env("TABCTL_PORT_COUNT", "3")
        .assert()
        .success()
        .stdout(predicate::eq("a.1.1\tA1\tu1\na.1.2\tA2\tu2\nc.7.1\tC1\tu3\n"));
}

#[test]
fn close_dispatches_local_ids_and_drops_unknown_prefix() {
    let mut listeners = contiguous_listeners(2);
    let base = listeners[0].local_addr().unwrap().port();
    let a = MockMediator::serve(listeners.remove(0), routes(&[("/close_tabs", 200, "OK")]));
    let b = MockMediator::serve(listeners.remove(0), routes(&[("/close_tabs", 200, "OK")]));

    cargo_bin_cmd!("tabctl")
        .args(["close", "a.0.1", "b.0.1", "c.0.1"])
        .env("TABCTL_BASE_PORT", base.to_string())
        .env("TABCTL_PORT_COUNT", "2")
        .assert()
        .success();

    assert_eq!(a.requests(), vec!["/close_tabs/0.1".to_string()]);
    assert_eq!(b.requests(), vec!["/close_tabs/0.1".to_string()]);
}

#[test]
fn close_reads_ids_from_stdin_when_no_args() {
    let mut listeners = contiguous_listeners(1);
    let mock = MockMediator::serve(listeners.remove(0), routes(&[("/close_tabs", 200, "OK")]));

    cargo_bin_cmd!("tabctl")
        .arg("close")
        .write_stdin("a.1.2 a.1.3\n")
        .env("TABCTL_BASE_PORT", mock.port.to_string())
        .env("TABCTL_PORT_COUNT", "1")
        .assert()
        .success();

    assert_eq!(mock.requests(), vec!["/close_tabs/1.2,1.3".to_string()]);
}

#[test]
fn words_are_merged_sorted_and_deduplicated_across_endpoints() {
    let mut listeners = contiguous_listeners(2);
    let base = listeners[0].local_addr().unwrap().port();
    let _a = MockMediator::serve(
        listeners.remove(0),
        routes(&[("/get_words", 200, "zebra\nanchor\ntab\n")]),
    );
    let _b = MockMediator::serve(
        listeners.remove(0),
        routes(&[("/get_words", 200, "tab\nbrowser\nanchor\n")]),
    );

    cargo_bin_cmd!("tabctl")
        .arg("words")
        .env("TABCTL_BASE_PORT", base.to_string())
        .env("TABCTL_PORT_COUNT", "2")
        .assert()
        .success()
        .stdout(predicate::eq("anchor\nbrowser\ntab\nzebra\n"));
}

#[test]
fn no_endpoints_yields_empty_output_not_failure() {
    // Grab a free port, then release it so nothing listens there.
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    cargo_bin_cmd!("tabctl")
        .arg("list")
        .env("TABCTL_BASE_PORT", port.to_string())
        .env("TABCTL_PORT_COUNT", "1")
        .assert()
        .success()
        .stdout(predicate::eq(""));
}

#[test]
fn windows_counts_tabs_per_window() {
    let mut listeners = contiguous_listeners(1);
    let mock = MockMediator::serve(
        listeners.remove(0),
        routes(&[(
            "/list_tabs",
            200,
            "1.1\tT\tu\n1.2\tT\tu\n2.9\tT\tu\n",
        )]),
    );

    cargo_bin_cmd!("tabctl")
        .arg("windows")
        .env("TABCTL_BASE_PORT", mock.port.to_string())
        .env("TABCTL_PORT_COUNT", "1")
        .assert()
        .success()
        .stdout(predicate::eq("a.1\t2\na.2\t1\n"));
}

#[test]
fn index_tsv_then_search_returns_snippet() {
    let tmp = tempfile::TempDir::new().unwrap();
    let store = tmp.path().join("store");
    let tsv = tmp.path().join("tabs.tsv");
    std::fs::write(
        &tsv,
        "a.1.1\tBorrow checker\thttps://doc\tthe borrow checker enforces aliasing rules\n\
         b.2.1\tRecipes\thttps://food\tslow cooked short ribs\n",
    )
    .unwrap();

    cargo_bin_cmd!("tabctl")
        .args(["--store"])
        .arg(&store)
        .args(["index", "--tsv"])
        .arg(&tsv)
        .assert()
        .success();

    cargo_bin_cmd!("tabctl")
        .args(["--store"])
        .arg(&store)
        .args(["search", "aliasing"])
        .assert()
        .success()
        .stdout(predicate::str::contains("a.1.1\tBorrow checker\t"))
        .stdout(predicate::str::contains("**aliasing**"))
        .stdout(predicate::str::contains("Recipes").not());
}

#[test]
fn search_missing_store_is_empty_success() {
    let tmp = tempfile::TempDir::new().unwrap();
    cargo_bin_cmd!("tabctl")
        .args(["--store"])
        .arg(tmp.path().join("never-indexed"))
        .args(["search", "anything"])
        .assert()
        .success()
        .stdout(predicate::eq(""));
}
