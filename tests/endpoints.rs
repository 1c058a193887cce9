use std::path::Path;

use actix_web::cookie::Cookie;
use actix_web::http::{header, StatusCode};
use actix_web::{test, web, App};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use file_analyzer::app::{configure, AppData};
use file_analyzer::config::AnalyzerConfig;

const SALES: &str = "a,b,c,label\n1,2,9,x\n2,4,7,y\n3,6,8,x\n4,8,1,z\n";

fn config(dir: &Path) -> AnalyzerConfig {
    AnalyzerConfig {
        output_dir: dir.to_path_buf(),
        plot_width: 320,
        plot_height: 240,
        ..AnalyzerConfig::default()
    }
}

fn app_data(dir: &Path) -> web::Data<AppData> {
    web::Data::new(AppData::from_config(&config(dir)))
}

fn multipart(field: &str, file_name: &str, content: &[u8]) -> (String, Vec<u8>) {
    let boundary = "----file-analyzer-boundary";
    let mut body = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={boundary}"), body)
}

fn upload_request(file_name: &str, content: &str, cookie: Option<&Cookie<'static>>) -> test::TestRequest {
    let (content_type, body) = multipart("file-input", file_name, content.as_bytes());
    let mut req = test::TestRequest::post()
        .uri("/load-file")
        .insert_header((header::CONTENT_TYPE, content_type))
        .set_payload(body);
    if let Some(cookie) = cookie {
        req = req.cookie(cookie.clone());
    }
    req
}

fn plot_form(kind: &str, x: &str, y: &str) -> Vec<(&'static str, String)> {
    vec![
        ("column-selector-1", x.to_string()),
        ("column-selector-2", y.to_string()),
        ("plot-type-selector", kind.to_string()),
        ("title-input", "Sales".to_string()),
        ("x-axis-input", String::new()),
        ("y-axis-input", "units".to_string()),
    ]
}

fn body_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Pull the base64 payload out of `src="data:<mime>;base64,..."`.
fn embedded_image(html: &str) -> Vec<u8> {
    let start = html.find("src=\"data:").unwrap();
    let rest = &html[start..];
    let b64_start = rest.find("base64,").unwrap() + "base64,".len();
    let b64_end = rest[b64_start..].find('"').unwrap() + b64_start;
    STANDARD.decode(&rest[b64_start..b64_end]).unwrap()
}

#[actix_web::test]
async fn index_and_health() {
    let dir = tempfile::tempdir().unwrap();
    let app = test::init_service(App::new().app_data(app_data(dir.path())).configure(configure)).await;

    let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(test::read_body(resp).await, "ok");

    let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let html = body_text(&test::read_body(resp).await);
    assert!(html.contains("File analyzer"));
    assert!(html.contains("name=\"file-input\""));
}

#[actix_web::test]
async fn upload_then_correlate() {
    let dir = tempfile::tempdir().unwrap();
    let app = test::init_service(App::new().app_data(app_data(dir.path())).configure(configure)).await;

    let resp = test::call_service(&app, upload_request("sales.csv", SALES, None).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let cookie = resp.response().cookies().next().unwrap().into_owned();
    let html = body_text(&test::read_body(resp).await);
    assert!(html.contains("<option value=\"label\">label</option>"));
    assert!(html.contains("4 rows, 4 columns"));
    assert!(!html.contains("id=\"column-selector\""));

    let req = test::TestRequest::post()
        .uri("/get-correlation")
        .cookie(cookie)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let html = body_text(&test::read_body(resp).await);

    let saved = std::fs::read_to_string(dir.path().join("csv").join("corr.csv")).unwrap();
    let mut lines = saved.lines();
    assert_eq!(lines.next(), Some("col1,col2,pearson,kendall,spearman"));
    // a and b are perfectly correlated, so that pair ranks first.
    assert!(lines.next().unwrap().starts_with("b,a,"));
    assert_eq!(lines.count(), 2);
    assert!(!saved.contains("label"));

    assert!(html.contains(&STANDARD.encode(&saved)));
    assert!(html.contains("<td>b</td><td>a</td>"));
}

#[actix_web::test]
async fn plot_returns_image_and_persists_it() {
    let dir = tempfile::tempdir().unwrap();
    let app = test::init_service(App::new().app_data(app_data(dir.path())).configure(configure)).await;

    let resp = test::call_service(&app, upload_request("sales.csv", SALES, None).to_request()).await;
    let cookie = resp.response().cookies().next().unwrap().into_owned();

    for (kind, x, y) in [
        ("scatter", "a", "b"),
        ("line", "label", "c"),
        ("hist", "c", ""),
        ("hist", "label", ""),
        ("bar-sum", "label", "c"),
        ("bar-count", "label", "a"),
    ] {
        let req = test::TestRequest::post()
            .uri("/get-plot")
            .cookie(cookie.clone())
            .set_form(plot_form(kind, x, y))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK, "{kind}");
        let html = body_text(&test::read_body(resp).await);
        assert!(html.contains("download=\"plot.jpg\""), "{kind}");

        let img = image::load_from_memory(&embedded_image(&html)).unwrap();
        assert_eq!((img.width(), img.height()), (320, 240), "{kind}");
    }

    let saved = std::fs::read(dir.path().join("jpg").join("current.jpg")).unwrap();
    assert!(image::load_from_memory(&saved).is_ok());
}

#[actix_web::test]
async fn plot_request_errors() {
    let dir = tempfile::tempdir().unwrap();
    let app = test::init_service(App::new().app_data(app_data(dir.path())).configure(configure)).await;

    let resp = test::call_service(&app, upload_request("sales.csv", SALES, None).to_request()).await;
    let cookie = resp.response().cookies().next().unwrap().into_owned();

    for (kind, x, y) in [
        ("pie", "a", "b"),
        ("scatter", "a", "missing"),
        ("hist", "missing", ""),
        ("bar-sum", "a", "label"),
    ] {
        let req = test::TestRequest::post()
            .uri("/get-plot")
            .cookie(cookie.clone())
            .set_form(plot_form(kind, x, y))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{kind} {x} {y}");
    }
    assert!(!dir.path().join("jpg").exists());
}

#[actix_web::test]
async fn nothing_loaded_is_a_conflict() {
    let dir = tempfile::tempdir().unwrap();
    let app = test::init_service(App::new().app_data(app_data(dir.path())).configure(configure)).await;

    let resp = test::call_service(&app, test::TestRequest::post().uri("/get-correlation").to_request()).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let req = test::TestRequest::post()
        .uri("/get-plot")
        .set_form(plot_form("scatter", "a", "b"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert!(!dir.path().join("csv").exists());
}

#[actix_web::test]
async fn second_upload_replaces_first() {
    let dir = tempfile::tempdir().unwrap();
    let app = test::init_service(App::new().app_data(app_data(dir.path())).configure(configure)).await;

    let resp = test::call_service(&app, upload_request("first.csv", SALES, None).to_request()).await;
    let cookie = resp.response().cookies().next().unwrap().into_owned();

    let second = "x,y\n1,5\n2,3\n3,1\n";
    let resp = test::call_service(&app, upload_request("second.csv", second, Some(&cookie)).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.response().cookies().next().is_none());

    let req = test::TestRequest::post()
        .uri("/get-correlation")
        .cookie(cookie)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let saved = std::fs::read_to_string(dir.path().join("csv").join("corr.csv")).unwrap();
    let rows: Vec<&str> = saved.lines().skip(1).collect();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].starts_with("y,x,-1"));
}

#[actix_web::test]
async fn failed_upload_keeps_previous_dataset() {
    let dir = tempfile::tempdir().unwrap();
    let app = test::init_service(App::new().app_data(app_data(dir.path())).configure(configure)).await;

    let resp = test::call_service(&app, upload_request("sales.csv", SALES, None).to_request()).await;
    let cookie = resp.response().cookies().next().unwrap().into_owned();

    let ragged = "a,b\n1,2\n3\n";
    let resp = test::call_service(&app, upload_request("bad.csv", ragged, Some(&cookie)).to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = test::call_service(&app, upload_request("notes.xlsx", SALES, Some(&cookie)).to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri("/get-correlation")
        .cookie(cookie)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let saved = std::fs::read_to_string(dir.path().join("csv").join("corr.csv")).unwrap();
    assert_eq!(saved.lines().count(), 4);
}

#[actix_web::test]
async fn upload_without_file_field_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let app = test::init_service(App::new().app_data(app_data(dir.path())).configure(configure)).await;

    let (content_type, body) = multipart("something-else", "sales.csv", SALES.as_bytes());
    let req = test::TestRequest::post()
        .uri("/load-file")
        .insert_header((header::CONTENT_TYPE, content_type))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn anonymous_uploads_do_not_grow_the_store_without_bound() {
    let dir = tempfile::tempdir().unwrap();
    let data = web::Data::new(AppData::from_config(&AnalyzerConfig {
        max_sessions: 3,
        ..config(dir.path())
    }));
    let app = test::init_service(App::new().app_data(data.clone()).configure(configure)).await;

    let mut last_cookie = None;
    for _ in 0..10 {
        let resp = test::call_service(&app, upload_request("sales.csv", SALES, None).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        last_cookie = resp.response().cookies().next().map(|c| c.into_owned());
    }
    assert_eq!(data.sessions.len(), 3);

    // the newest session survives eviction
    let req = test::TestRequest::post()
        .uri("/get-correlation")
        .cookie(last_cookie.unwrap())
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
}
