use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::path::Path;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant, SystemTime};

use serial_test::serial;

use claude_usage_statusline::cache::UsageCache;
use claude_usage_statusline::cli::Args;
use claude_usage_statusline::credentials::{TokenChain, TokenSource};
use claude_usage_statusline::display::{BAR_EMPTY, BAR_FILLED, Palette};
use claude_usage_statusline::statusline::{StatuslineConfig, render_statusline};
use claude_usage_statusline::usage_api::UsageClient;

struct StaticToken(&'static str);

impl TokenSource for StaticToken {
    fn name(&self) -> &'static str {
        "static"
    }
    fn token(&self) -> anyhow::Result<Option<String>> {
        Ok(Some(self.0.to_string()))
    }
}

fn offline_config(cache_dir: &Path) -> StatuslineConfig {
    StatuslineConfig {
        palette: Palette::plain(),
        cache: UsageCache::new(cache_dir, Duration::from_secs(60)),
        client: None,
        tokens: TokenChain::new(Vec::new()),
        git_timeout: Some(Duration::from_secs(3)),
    }
}

/// Answers exactly one HTTP request with `status` and `body`; the join handle
/// yields the request head as received.
fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let endpoint = format!("http://{}/api/oauth/usage", listener.local_addr().unwrap());
    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut head = String::new();
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line).unwrap() == 0 || line == "\r\n" {
                break;
            }
            head.push_str(&line);
        }
        write!(
            stream,
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
        .unwrap();
        stream.flush().unwrap();
        head
    });
    (endpoint, handle)
}

fn online_config(cache_dir: &Path, endpoint: String) -> StatuslineConfig {
    let mut config = offline_config(cache_dir);
    config.tokens = TokenChain::new(vec![Box::new(StaticToken("tok"))]);
    config.client = Some(UsageClient {
        endpoint,
        timeout: Duration::from_secs(5),
    });
    config
}

fn lines(out: &str) -> Vec<&str> {
    assert!(out.ends_with('\n'), "output must end with a newline: {out:?}");
    out.lines().collect()
}

fn payload(dir: &str, session: &str, ctx: f64) -> String {
    serde_json::json!({
        "model": {"display_name": "Test"},
        "cost": {"total_cost_usd": 0.5},
        "context_window": {"used_percentage": ctx},
        "workspace": {"current_dir": dir},
        "session_id": session,
    })
    .to_string()
}

#[test]
fn any_payload_gives_exactly_two_lines() {
    let dir = tempfile::tempdir().unwrap();
    let config = offline_config(dir.path());
    for raw in [
        "{}",
        "",
        "not json at all",
        r#"{"model":{},"cost":{},"context_window":{},"workspace":{}}"#,
        r#"{"model":{"display_name":"Test"},"context_window":{"used_percentage":150}}"#,
        "[1,2,3]",
    ] {
        let out = render_statusline(raw.as_bytes(), &config);
        assert_eq!(lines(&out).len(), 2, "payload {raw:?} rendered {out:?}");
    }
}

#[test]
fn empty_object_renders_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let out = render_statusline(b"{}", &offline_config(dir.path()));
    let l = lines(&out);
    assert_eq!(l[0], "[?] | $0.0000");
    assert!(l[1].ends_with(" ctx 0%"));
    assert_eq!(l[1].chars().filter(|&c| c == BAR_EMPTY).count(), 20);
}

#[test]
fn overflowing_context_fills_the_bar() {
    let dir = tempfile::tempdir().unwrap();
    let raw = payload("", "s", 150.0);
    let out = render_statusline(raw.as_bytes(), &offline_config(dir.path()));
    let l = lines(&out);
    assert_eq!(l[1].chars().filter(|&c| c == BAR_FILLED).count(), 20);
    assert!(l[1].contains("ctx 150%"));
}

#[test]
fn directory_outside_repo_has_no_git_segment() {
    let cache_dir = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    let config = offline_config(cache_dir.path());

    for dir in [
        work.path().to_string_lossy().into_owned(),
        "/no/such/dir/for/ccus".to_string(),
    ] {
        let raw = payload(&dir, "s", 10.0);
        let out = render_statusline(raw.as_bytes(), &config);
        let l = lines(&out);
        assert_eq!(l[0].split(" | ").count(), 2, "unexpected git segment: {}", l[0]);
        assert!(l[0].ends_with("| $0.5000"));
    }
}

#[test]
fn fresh_cache_is_used_without_network() {
    let dir = tempfile::tempdir().unwrap();
    let config = offline_config(dir.path());
    fs::write(
        config.cache.path_for("sess-1"),
        r#"{"five_hour":{"utilization":45,"resets_at":null},"seven_day":{"utilization":30,"resets_at":"null"}}"#,
    )
    .unwrap();

    let raw = payload("", "sess-1", 42.0);
    let out = render_statusline(raw.as_bytes(), &config);
    let l = lines(&out);
    assert!(l[1].contains("sess: "), "{}", l[1]);
    assert!(l[1].contains(" 45% ?"), "{}", l[1]);
    assert!(l[1].contains("week: "), "{}", l[1]);
    assert!(l[1].contains(" 30% ?"), "{}", l[1]);
}

#[test]
fn stale_cache_without_token_omits_usage() {
    let dir = tempfile::tempdir().unwrap();
    let config = offline_config(dir.path());
    let path = config.cache.path_for("old");
    fs::write(&path, r#"{"five_hour":{"utilization":45}}"#).unwrap();
    fs::File::options()
        .write(true)
        .open(&path)
        .unwrap()
        .set_modified(SystemTime::now() - Duration::from_secs(120))
        .unwrap();

    let raw = payload("", "old", 5.0);
    let out = render_statusline(raw.as_bytes(), &config);
    let l = lines(&out);
    assert!(!l[1].contains("sess:"));
    assert!(!l[1].contains("week:"));
    assert!(!l[1].contains('|'));
}

#[test]
fn unreachable_endpoint_degrades_quietly() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = offline_config(dir.path());
    config.tokens = TokenChain::new(vec![Box::new(StaticToken("tok"))]);
    config.client = Some(UsageClient {
        endpoint: "http://127.0.0.1:9/api/oauth/usage".to_string(),
        timeout: Duration::from_secs(2),
    });

    let started = Instant::now();
    let raw = payload("", "net", 5.0);
    let out = render_statusline(raw.as_bytes(), &config);
    assert!(started.elapsed() < Duration::from_secs(10));

    let l = lines(&out);
    assert_eq!(l.len(), 2);
    assert!(!l[1].contains("sess:"));
    assert!(!config.cache.path_for("net").exists());
}

#[test]
fn ansi_palette_colors_both_lines() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = offline_config(dir.path());
    config.palette = Palette::ansi();
    let raw = payload("", "s", 95.0);
    let out = render_statusline(raw.as_bytes(), &config);
    let l = lines(&out);
    assert!(l[0].starts_with("\x1b[36m[Test]\x1b[0m"));
    assert!(l[1].starts_with("\x1b[31m"));
}

#[test]
fn control_characters_cannot_add_lines() {
    let dir = tempfile::tempdir().unwrap();
    let raw = br#"{"model":{"display_name":"Op\nus"},"workspace":{"current_dir":"/tmp/a\nb\u001b[2J"}}"#;
    let out = render_statusline(raw, &offline_config(dir.path()));
    let l = lines(&out);
    assert_eq!(l.len(), 2, "{out:?}");
    assert_eq!(l[0], "[Op?us] 📁 a?b?[2J | $0.0000");
}

#[test]
fn fetched_usage_is_cached_and_rendered() {
    let dir = tempfile::tempdir().unwrap();
    let (endpoint, server) = serve_once(
        "200 OK",
        r#"{"five_hour":{"utilization":45.0,"resets_at":null},"seven_day":{"utilization":72.4,"resets_at":null}}"#,
    );
    let config = online_config(dir.path(), endpoint);

    let raw = payload("", "live", 10.0);
    let out = render_statusline(raw.as_bytes(), &config);
    let l = lines(&out);
    assert!(l[1].contains(" | sess: "), "{}", l[1]);
    assert!(l[1].contains(" 45% ?"), "{}", l[1]);
    assert!(l[1].contains(" | week: "), "{}", l[1]);
    assert!(l[1].contains(" 72% ?"), "{}", l[1]);

    let request = server.join().unwrap().to_ascii_lowercase();
    assert!(request.starts_with("get /api/oauth/usage "), "{request}");
    assert!(request.contains("authorization: bearer tok"), "{request}");
    assert!(request.contains("anthropic-beta: oauth-2025-04-20"), "{request}");

    let path = config.cache.path_for("live");
    let cached: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(cached["five_hour"]["utilization"], 45.0);
    assert_eq!(cached["seven_day"]["utilization"], 72.4);
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}

#[test]
fn response_without_five_hour_is_not_cached() {
    let dir = tempfile::tempdir().unwrap();
    let (endpoint, _server) =
        serve_once("200 OK", r#"{"five_hour":null,"seven_day":{"utilization":10}}"#);
    let config = online_config(dir.path(), endpoint);

    let raw = payload("", "hollow", 10.0);
    let out = render_statusline(raw.as_bytes(), &config);
    let l = lines(&out);
    assert!(!l[1].contains("sess:"), "{}", l[1]);
    assert!(!l[1].contains("week:"), "{}", l[1]);
    assert!(!config.cache.path_for("hollow").exists());
}

#[test]
fn error_status_is_not_cached() {
    let dir = tempfile::tempdir().unwrap();
    let (endpoint, _server) = serve_once(
        "500 Internal Server Error",
        r#"{"five_hour":{"utilization":45.0}}"#,
    );
    let config = online_config(dir.path(), endpoint);

    let raw = payload("", "broken", 10.0);
    let out = render_statusline(raw.as_bytes(), &config);
    let l = lines(&out);
    assert!(!l[1].contains("sess:"), "{}", l[1]);
    assert!(!config.cache.path_for("broken").exists());
}

#[test]
#[serial]
fn bad_env_settings_still_render() {
    let dir = tempfile::tempdir().unwrap();
    // SAFETY: env mutation is serialized with the other env tests.
    unsafe {
        std::env::set_var("CLAUDE_STATUSLINE_CACHE_TTL", "abc");
        std::env::set_var("CLAUDE_STATUSLINE_DEBUG", "1");
    }
    let parsed = Args::parse_from_lenient([
        "ccus".into(),
        "--no-fetch".into(),
        "--cache-dir".into(),
        dir.path().as_os_str().to_owned(),
    ]);
    unsafe {
        std::env::remove_var("CLAUDE_STATUSLINE_CACHE_TTL");
        std::env::remove_var("CLAUDE_STATUSLINE_DEBUG");
    }

    let (args, rejected) = parsed.unwrap();
    assert!(rejected.is_some());
    assert!(args.no_fetch);
    let config = StatuslineConfig::from_args(&args);
    let out = render_statusline(b"{}", &config);
    assert_eq!(lines(&out).len(), 2, "{out:?}");
}
