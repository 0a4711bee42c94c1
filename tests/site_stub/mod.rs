use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

pub const CATALOG_PATH: &str = "/mangas/boyovik/105-test-manga.html";
pub const SLOW_CATALOG_PATH: &str = "/mangas/boyovik/106-slow-manga.html";
pub const IMAGE_LEN: usize = 2048;
/// How long the slow routes stall before answering.
pub const STALL: Duration = Duration::from_millis(1500);

/// Serves a small manga.in.ua-shaped site:
///
/// - chapter 1 (`tom-7`): five images, one 404 and one undersized body
/// - chapter 2 (no volume marker): one good image
/// - chapter 3 (`tom-1`): a single missing image
/// - chapter 4: the chapter page itself is missing
///
/// A second catalog at [`SLOW_CATALOG_PATH`] has one chapter page and one
/// image that both stall for [`STALL`] before answering.
pub struct SiteStub {
    pub base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl SiteStub {
    pub fn spawn() -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start site stub server");
        let addr = server.server_addr();
        let base_url = format!("http://{addr}");

        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&requests);
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let request = match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };

                let path = request.url().to_string();
                if let Ok(mut seen) = seen.lock() {
                    seen.push(path.clone());
                }

                // Stalled responses must not hold up the requests behind them.
                thread::spawn(move || {
                    if path.contains("/slow") {
                        thread::sleep(STALL);
                    }

                    let (status, content_type, body) = route(&path);
                    let header = tiny_http::Header::from_bytes(&b"Content-Type"[..], content_type)
                        .expect("build header");
                    let response = tiny_http::Response::from_data(body)
                        .with_status_code(status)
                        .with_header(header);
                    let _ = request.respond(response);
                });
            }
        });

        Self {
            base_url,
            requests,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn catalog_url(&self) -> String {
        format!("{}{CATALOG_PATH}", self.base_url)
    }

    #[allow(dead_code)]
    pub fn slow_catalog_url(&self) -> String {
        format!("{}{SLOW_CATALOG_PATH}", self.base_url)
    }

    #[allow(dead_code)]
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl Drop for SiteStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

const HTML: &str = "text/html; charset=utf-8";

fn route(path: &str) -> (u16, &'static str, Vec<u8>) {
    match path {
        CATALOG_PATH => (200, HTML, CATALOG_HTML.as_bytes().to_vec()),
        "/chapters/1-tom-7-chapter-1.html" => (200, HTML, CHAPTER_1_HTML.as_bytes().to_vec()),
        "/chapters/2-chapter-2.html" => (200, HTML, CHAPTER_2_HTML.as_bytes().to_vec()),
        "/chapters/3-tom-1-chapter-3.html" => (200, HTML, CHAPTER_3_HTML.as_bytes().to_vec()),
        SLOW_CATALOG_PATH => (200, HTML, SLOW_CATALOG_HTML.as_bytes().to_vec()),
        "/chapters/slow-1-chapter-1.html" => (200, HTML, CHAPTER_2_HTML.as_bytes().to_vec()),
        "/chapters/2-tom-2-chapter-2.html" => (200, HTML, SLOW_CHAPTER_HTML.as_bytes().to_vec()),
        "/img/slow.jpg" => (200, "image/jpeg", image_bytes(0x11)),
        "/img/1.jpg" | "/img/3" => (200, "image/jpeg", image_bytes(0xD8)),
        "/img/2.png" => (200, "image/png", image_bytes(0x89)),
        "/img/tiny.jpg" => (200, "image/jpeg", b"oops".to_vec()),
        _ => (404, HTML, b"<html><body>not found</body></html>".to_vec()),
    }
}

pub fn image_bytes(fill: u8) -> Vec<u8> {
    vec![fill; IMAGE_LEN]
}

const CATALOG_HTML: &str = r#"<!doctype html>
<html>
<head><title>Test Manga</title></head>
<body>
  <h1 class="UAname">Test Manga</h1>
  <div class="circle-progress-text-max">4</div>
  <div class="item__full-sidebar--description">16+</div>
  <div id="linkstocomics">
    <div class="ltcitems"><a href="/chapters/1-tom-7-chapter-1.html">Розділ 1</a></div>
    <div class="ltcitems"><a href="/chapters/2-chapter-2.html">Розділ 2</a></div>
    <div class="ltcitems"><a href="/chapters/3-tom-1-chapter-3.html">Розділ 3</a></div>
    <div class="ltcitems"><a href="/chapters/4-tom-1-chapter-4.html">Розділ 4</a></div>
  </div>
</body>
</html>
"#;

const CHAPTER_1_HTML: &str = r#"<!doctype html>
<html><body>
  <div class="fastcomicsnavigatontop"><span class="youreadnow">Ви читаєте: Test Manga - Перший розділ</span></div>
  <div id="comics"><ul class="xfieldimagegallery">
    <li><img id="comicspage1" data-src="/img/1.jpg"></li>
    <li><img id="comicspage2" data-src="/img/404.jpg"></li>
    <li><img id="comicspage3" data-src="/img/2.png"></li>
    <li><img id="comicspage4" data-src="/img/tiny.jpg"></li>
    <li><img id="comicspage5" data-src="/img/3"></li>
  </ul></div>
</body></html>
"#;

const CHAPTER_2_HTML: &str = r#"<!doctype html>
<html><body>
  <div class="fastcomicsnavigatontop"><span class="youreadnow">Ви читаєте: Test Manga - Другий розділ</span></div>
  <div id="comics"><ul class="xfieldimagegallery">
    <li><img id="comicspage1" data-src="/img/1.jpg"></li>
  </ul></div>
</body></html>
"#;

const CHAPTER_3_HTML: &str = r#"<!doctype html>
<html><body>
  <div id="comics"><ul class="xfieldimagegallery">
    <li><img id="comicspage1" data-src="/img/missing.jpg"></li>
  </ul></div>
</body></html>
"#;

const SLOW_CATALOG_HTML: &str = r#"<!doctype html>
<html><body>
  <h1 class="UAname">Slow Manga</h1>
  <div id="linkstocomics">
    <div class="ltcitems"><a href="/chapters/slow-1-chapter-1.html">Розділ 1</a></div>
    <div class="ltcitems"><a href="/chapters/2-tom-2-chapter-2.html">Розділ 2</a></div>
  </div>
</body></html>
"#;

const SLOW_CHAPTER_HTML: &str = r#"<!doctype html>
<html><body>
  <div id="comics"><ul class="xfieldimagegallery">
    <li><img id="comicspage1" data-src="/img/1.jpg"></li>
    <li><img id="comicspage2" data-src="/img/slow.jpg"></li>
    <li><img id="comicspage3" data-src="/img/2.png"></li>
  </ul></div>
</body></html>
"#;
