// src/api/mod.rs
// HTTP surface: multipart upload in, base64-encoded dataset out.

use std::fs;

use actix_cors::Cors;
use actix_multipart::Multipart;
use actix_web::{web, App, Error, HttpResponse, HttpServer};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use futures_util::stream::StreamExt;
use serde_json::json;
use tracing::{error, info};

use crate::completion::OpenAiClient;
use crate::config::ApiConfig;
use crate::error::PipelineError;
use crate::pipeline::{run_pipeline, Document, RunOptions, DEFAULT_CHUNK_SIZE, MIN_CHUNK_SIZE};

const DATASET_CONTENT_TYPE: &str = "application/octet-stream";

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json("OK")
}

/// Collected multipart fields for one processing request.
struct UploadForm {
    file_name: String,
    file_bytes: Vec<u8>,
    chunk_size: usize,
    api_key: String,
}

async fn read_text_field(field: &mut actix_multipart::Field) -> Result<String, Error> {
    let mut buf = Vec::new();
    while let Some(chunk) = field.next().await {
        buf.extend_from_slice(&chunk?);
    }
    String::from_utf8(buf)
        .map(|s| s.trim().to_string())
        .map_err(|_| actix_web::error::ErrorBadRequest("Form field is not valid UTF-8"))
}

async fn read_upload_form(mut payload: Multipart) -> Result<UploadForm, Error> {
    let mut file_name = None;
    let mut file_bytes = Vec::new();
    let mut chunk_size = DEFAULT_CHUNK_SIZE;
    let mut api_key = None;

    while let Some(item) = payload.next().await {
        let mut field = item?;
        let name = field
            .content_disposition()
            .as_ref()
            .and_then(|cd| cd.get_name())
            .unwrap_or("")
            .to_string();

        match name.as_str() {
            "file" => {
                file_name = field
                    .content_disposition()
                    .as_ref()
                    .and_then(|cd| cd.get_filename())
                    .map(|s| s.to_string());
                while let Some(chunk) = field.next().await {
                    file_bytes.extend_from_slice(&chunk?);
                }
            }
            "chunk_size" => {
                let raw = read_text_field(&mut field).await?;
                chunk_size = raw.parse().map_err(|_| {
                    actix_web::error::ErrorBadRequest("chunk_size must be an integer")
                })?;
            }
            "api_key" => {
                api_key = Some(read_text_field(&mut field).await?);
            }
            _ => {
                // Drain unknown fields so the stream stays consumable.
                while let Some(chunk) = field.next().await {
                    chunk?;
                }
            }
        }
    }

    let file_name =
        file_name.ok_or_else(|| actix_web::error::ErrorBadRequest("No file uploaded"))?;
    let api_key = api_key
        .filter(|k| !k.is_empty())
        .ok_or_else(|| actix_web::error::ErrorBadRequest("api_key is required"))?;

    Ok(UploadForm {
        file_name,
        file_bytes,
        chunk_size,
        api_key,
    })
}

/// Runs the full pipeline for one uploaded document and returns the
/// accumulated dataset inline, base64-encoded under its per-run file name.
async fn process_document(
    payload: Multipart,
    config: web::Data<ApiConfig>,
) -> Result<HttpResponse, Error> {
    let form = read_upload_form(payload).await?;

    if form.chunk_size < MIN_CHUNK_SIZE {
        return Ok(HttpResponse::BadRequest().json(json!({
            "status": "error",
            "message": format!("chunk_size must be at least {}", MIN_CHUNK_SIZE),
        })));
    }

    let generator = OpenAiClient::new(
        config.completions_url.clone(),
        config.model.clone(),
        config.prompt.render(),
    );
    let document = Document {
        file_name: form.file_name,
        bytes: form.file_bytes,
    };
    let options = RunOptions {
        chunk_size: form.chunk_size,
        api_key: form.api_key,
        dataset_dir: config.dataset_dir.clone(),
    };

    match run_pipeline(&document, &options, &generator).await {
        Ok(report) => {
            let payload = fs::read(&report.dataset_path).map_err(|e| {
                error!(error = %e, "Dataset file unreadable after run");
                actix_web::error::ErrorInternalServerError("Dataset file unreadable")
            })?;
            Ok(HttpResponse::Ok().json(json!({
                "status": "success",
                "run_id": report.run_id,
                "file_name": report.dataset_file,
                "content_type": DATASET_CONTENT_TYPE,
                "content_base64": BASE64.encode(&payload),
                "chunks_total": report.chunks_total,
                "chunks_failed": report.chunks_failed,
                "records_written": report.records_written,
                "failures": report.failures,
            })))
        }
        Err(e @ PipelineError::UnsupportedFormat(_)) => {
            Ok(HttpResponse::BadRequest().json(json!({
                "status": "error",
                "message": e.to_string(),
            })))
        }
        Err(e @ PipelineError::Extraction(_)) => {
            Ok(HttpResponse::UnprocessableEntity().json(json!({
                "status": "error",
                "message": e.to_string(),
            })))
        }
        Err(e) => {
            error!(error = %e, "Run failed before chunk processing");
            Ok(HttpResponse::InternalServerError().json(json!({
                "status": "error",
                "message": e.to_string(),
            })))
        }
    }
}

/// Re-downloads a previous run's dataset as a file attachment.
async fn download_dataset(
    path: web::Path<String>,
    config: web::Data<ApiConfig>,
) -> Result<HttpResponse, Error> {
    let run_id = path.into_inner();
    // Run ids are UUIDs; anything else cannot name a dataset file.
    if run_id.is_empty() || !run_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Ok(HttpResponse::NotFound().json(json!({
            "status": "error",
            "message": "Unknown run id",
        })));
    }

    let file_name = format!("dataset-{}.jsonl", run_id);
    match fs::read(config.dataset_dir.join(&file_name)) {
        Ok(bytes) => Ok(HttpResponse::Ok()
            .content_type(DATASET_CONTENT_TYPE)
            .insert_header((
                "Content-Disposition",
                format!("attachment; filename=\"{}\"", file_name),
            ))
            .body(bytes)),
        Err(_) => Ok(HttpResponse::NotFound().json(json!({
            "status": "error",
            "message": "Unknown run id",
        }))),
    }
}

/// Registers all routes; shared between the server and tests.
pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/process", web::post().to(process_document))
        .route("/datasets/{run_id}", web::get().to(download_dataset));
}

pub fn start_api_server(
    config: &ApiConfig,
) -> impl std::future::Future<Output = std::io::Result<()>> {
    let bind_addr = config.bind_addr();
    let config = config.clone();
    info!(bind_addr = %bind_addr, dataset_dir = %config.dataset_dir.display(), "Starting API server");

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allowed_methods(vec!["GET", "POST"])
            .allowed_headers(vec![
                actix_web::http::header::CONTENT_TYPE,
                actix_web::http::header::AUTHORIZATION,
            ])
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(config.clone()))
            .wrap(cors)
            .configure(register_routes)
    })
    .bind(bind_addr.clone())
    .unwrap_or_else(|e| panic!("Failed to bind to {}: {}", bind_addr, e))
    .run()
}
