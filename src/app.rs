use actix_multipart::Multipart;
use actix_web::cookie::{Cookie, SameSite};
use actix_web::http::header::ContentType;
use actix_web::http::StatusCode;
use actix_web::{get, middleware, post, web, App, HttpRequest, HttpResponse, HttpServer, ResponseError};
use anyhow::Context;
use futures::StreamExt;
use serde::Deserialize;

use crate::analysis::correlate;
use crate::artifact::{records_to_csv, ArtifactStore, RenderedArtifact};
use crate::config::AnalyzerConfig;
use crate::data::loader::load_upload;
use crate::data::model::Dataset;
use crate::error::{AppError, PlotError};
use crate::plot::{render, ChartOptions, ChartSpec, PlotKind, RenderSettings};
use crate::state::{SessionStore, SESSION_COOKIE};
use crate::ui::panels;

/// Multipart field holding the uploaded file.
pub const UPLOAD_FIELD: &str = "file-input";

// ---------------------------------------------------------------------------
// Shared application data
// ---------------------------------------------------------------------------

/// Handed to every handler through `web::Data`.
pub struct AppData {
    pub sessions: SessionStore,
    pub settings: RenderSettings,
    pub artifacts: ArtifactStore,
    pub max_upload_bytes: usize,
}

impl AppData {
    pub fn from_config(config: &AnalyzerConfig) -> Self {
        Self {
            sessions: SessionStore::with_capacity(config.max_sessions),
            settings: config.render_settings(),
            artifacts: config.artifact_store(),
            max_upload_bytes: config.max_upload_bytes,
        }
    }

    /// Snapshot of the caller's dataset.
    fn dataset_for(&self, req: &HttpRequest) -> Result<std::sync::Arc<Dataset>, AppError> {
        session_id(req)
            .and_then(|id| self.sessions.get(&id))
            .ok_or(AppError::NoDataset)
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NoDataset => StatusCode::CONFLICT,
            AppError::UploadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::MissingUpload | AppError::Multipart(_) | AppError::Dataset(_) => StatusCode::BAD_REQUEST,
            AppError::Plot(
                PlotError::UnsupportedKind(_) | PlotError::ColumnNotFound(_) | PlotError::NonNumericColumn { .. },
            ) => StatusCode::BAD_REQUEST,
            AppError::Plot(_) | AppError::Artifact(_) | AppError::Blocking(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        log::error!("request failed ({}): {self:#}", self.status_code());
        HttpResponse::build(self.status_code())
            .content_type(ContentType::html())
            .body(panels::error_view(&self.to_string()))
    }
}

fn session_id(req: &HttpRequest) -> Option<String> {
    req.cookie(SESSION_COOKIE).map(|c| c.value().to_string())
}

fn session_cookie(id: String) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, id)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .finish()
}

fn html(body: String) -> HttpResponse {
    HttpResponse::Ok().content_type(ContentType::html()).body(body)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

#[get("/")]
async fn index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(panels::INDEX_HTML)
}

#[get("/health")]
async fn health() -> &'static str {
    "ok"
}

// `MultipartError` wraps a non-`Send` actix error; keep only its message.
fn multipart_err(e: actix_multipart::MultipartError) -> AppError {
    AppError::Multipart(e.to_string())
}

/// Read the upload field into memory, enforcing the size limit.
async fn read_upload(payload: &mut Multipart, limit: usize) -> Result<(Option<String>, Vec<u8>), AppError> {
    while let Some(field) = payload.next().await {
        let mut field = field.map_err(multipart_err)?;
        let is_upload = field.name() == Some(UPLOAD_FIELD);
        let file_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string);

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(multipart_err)?;
            if !is_upload {
                continue;
            }
            if bytes.len() + chunk.len() > limit {
                return Err(AppError::UploadTooLarge(limit));
            }
            bytes.extend_from_slice(&chunk);
        }
        if is_upload {
            return Ok((file_name, bytes));
        }
    }
    Err(AppError::MissingUpload)
}

#[post("/load-file")]
async fn load_file(
    req: HttpRequest,
    data: web::Data<AppData>,
    mut payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let (file_name, bytes) = read_upload(&mut payload, data.max_upload_bytes).await?;
    let size = bytes.len();
    let name = file_name.clone();
    let dataset = web::block(move || load_upload(name.as_deref(), &bytes)).await??;

    let columns = dataset.column_names();
    let rows = dataset.len();
    log::info!(
        "loaded {} ({size} bytes): {rows} rows, columns {columns:?}",
        file_name.as_deref().unwrap_or("<unnamed>")
    );

    let (session, fresh) = match session_id(&req) {
        Some(id) => (id, false),
        None => (SessionStore::new_session_id(), true),
    };
    data.sessions.install(&session, dataset);

    let mut response = HttpResponse::Ok();
    if fresh {
        response.cookie(session_cookie(session));
    }
    Ok(response
        .content_type(ContentType::html())
        .body(panels::plot_form(&columns, rows)))
}

#[post("/get-correlation")]
async fn get_correlation(req: HttpRequest, data: web::Data<AppData>) -> Result<HttpResponse, AppError> {
    let dataset = data.dataset_for(&req)?;
    let artifacts = data.artifacts.clone();

    let (records, csv_text) = web::block(move || -> Result<_, AppError> {
        let records = correlate(&dataset);
        let csv_text = records_to_csv(&records)?;
        artifacts.save_correlation_csv(&csv_text)?;
        Ok((records, csv_text))
    })
    .await??;

    log::info!("correlation: {} ranked pairs", records.len());
    Ok(html(panels::correlation_view(&records, &csv_text)))
}

/// Fields of the plot form, named as the browser sends them.
#[derive(Debug, Deserialize)]
pub struct PlotForm {
    #[serde(rename = "column-selector-1")]
    pub x_column: String,
    #[serde(rename = "column-selector-2", default)]
    pub y_column: String,
    #[serde(rename = "plot-type-selector")]
    pub kind: String,
    #[serde(rename = "title-input", default)]
    pub title: Option<String>,
    #[serde(rename = "x-axis-input", default)]
    pub x_label: Option<String>,
    #[serde(rename = "y-axis-input", default)]
    pub y_label: Option<String>,
    #[serde(rename = "legend-input", default)]
    pub legend: Option<String>,
}

impl PlotForm {
    pub fn into_spec(self) -> Result<ChartSpec, PlotError> {
        let kind: PlotKind = self.kind.parse()?;
        Ok(ChartSpec {
            kind,
            x_column: self.x_column,
            y_column: self.y_column,
            options: ChartOptions {
                title: self.title,
                x_label: self.x_label,
                y_label: self.y_label,
                legend: self.legend,
            },
        })
    }
}

#[post("/get-plot")]
async fn get_plot(
    req: HttpRequest,
    data: web::Data<AppData>,
    form: web::Form<PlotForm>,
) -> Result<HttpResponse, AppError> {
    let dataset = data.dataset_for(&req)?;
    let spec = form.into_inner().into_spec()?;
    let settings = data.settings.clone();
    let artifacts = data.artifacts.clone();

    let artifact = web::block(move || -> Result<RenderedArtifact, AppError> {
        let mut artifact = render(&dataset, &spec, &settings)?;
        artifact.persisted = artifacts.save_chart(&artifact)?;
        Ok(artifact)
    })
    .await??;

    Ok(html(panels::plot_view(&artifact)))
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

/// Register every route. Shared by the server and the integration tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(index)
        .service(health)
        .service(load_file)
        .service(get_correlation)
        .service(get_plot);
}

pub async fn run(config: AnalyzerConfig) -> anyhow::Result<()> {
    let data = web::Data::new(AppData::from_config(&config));
    log::info!(
        "listening on http://{}:{} (output dir {}, persist={})",
        config.host,
        config.port,
        config.output_dir.display(),
        config.persist_artifacts
    );

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(data.clone())
            .configure(configure)
    })
    .bind((config.host.as_str(), config.port))
    .with_context(|| format!("could not bind {}:{}", config.host, config.port))?
    .run()
    .await
    .context("server stopped with an error")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(kind: &str) -> PlotForm {
        PlotForm {
            x_column: "a".into(),
            y_column: "b".into(),
            kind: kind.into(),
            title: Some("t".into()),
            x_label: None,
            y_label: None,
            legend: Some("series".into()),
        }
    }

    #[test]
    fn form_builds_spec() {
        let spec = form("bar-count").into_spec().unwrap();
        assert_eq!(spec.kind, PlotKind::BarCount);
        assert_eq!(spec.x_column, "a");
        assert_eq!(spec.options.legend.as_deref(), Some("series"));
        assert_eq!(spec.options.title.as_deref(), Some("t"));
    }

    #[test]
    fn errors_cross_the_blocking_pool() {
        fn sendable<T: Send + 'static>() {}
        sendable::<AppError>();
        let err = multipart_err(actix_multipart::MultipartError::Incomplete);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn status_codes() {
        assert_eq!(AppError::NoDataset.status_code(), StatusCode::CONFLICT);
        let unknown = AppError::from(form("pie").into_spec().unwrap_err());
        assert_eq!(unknown.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::Plot(PlotError::Draw("x".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(AppError::UploadTooLarge(1).status_code(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
