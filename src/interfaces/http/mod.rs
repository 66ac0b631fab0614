use crate::application::use_cases::dashboard::FilterRequest;
use crate::application::DashboardUseCase;
use crate::domain::error::AppError;
use crate::domain::export::{EXPORT_FILE_NAME, XLSX_CONTENT_TYPE};
use crate::infrastructure::config::HttpConfig;
use actix_cors::Cors;
use actix_web::http::StatusCode;
use actix_web::{
    dev::Server, get, post, web, App, HttpResponse, HttpServer, Responder, ResponseError,
};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

const MAX_LOG_ENTRIES: usize = 100;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogEntry {
    pub time: String,
    pub level: String,
    pub source: String,
    pub message: String,
}

pub struct HttpState {
    pub dashboard: Arc<DashboardUseCase>,
    pub logs: Arc<Mutex<Vec<LogEntry>>>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: &'static str,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::ParseError(_) | AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.to_string(),
            code: self.code(),
        })
    }
}

#[derive(Deserialize)]
pub struct UploadQuery {
    pub filename: String,
}

#[post("/uploads")]
async fn upload(
    data: web::Data<HttpState>,
    query: web::Query<UploadQuery>,
    body: web::Bytes,
) -> impl Responder {
    add_log(
        &data.logs,
        "INFO",
        "Upload",
        &format!("Ingesting {} ({} bytes)", query.filename, body.len()),
    );

    match data.dashboard.ingest_upload(&query.filename, &body).await {
        Ok(outcome) => {
            add_log(
                &data.logs,
                "INFO",
                "Upload",
                &format!(
                    "Saved {} rows to {}",
                    outcome.rows, outcome.table.identifier
                ),
            );
            HttpResponse::Ok().json(outcome)
        }
        Err(e) => {
            tracing::error!(filename = %query.filename, error = %e, "Upload failed");
            add_log(&data.logs, "ERROR", "Upload", &format!("Upload failed: {}", e));
            e.error_response()
        }
    }
}

#[get("/tables")]
async fn list_tables(data: web::Data<HttpState>) -> impl Responder {
    match data.dashboard.list_tables().await {
        Ok(tables) => {
            if tables.is_empty() {
                add_log(&data.logs, "WARN", "Tables", "No data tables in the store");
            }
            HttpResponse::Ok().json(tables)
        }
        Err(e) => {
            tracing::error!(error = %e, "Listing tables failed");
            add_log(
                &data.logs,
                "ERROR",
                "Tables",
                &format!("Failed to list tables: {}", e),
            );
            e.error_response()
        }
    }
}

#[get("/tables/{identifier}/views")]
async fn table_views(
    data: web::Data<HttpState>,
    path: web::Path<String>,
    query: web::Query<FilterRequest>,
) -> impl Responder {
    let identifier = path.into_inner();

    match data.dashboard.views(&identifier, query.into_inner()).await {
        Ok(views) => HttpResponse::Ok().json(views),
        Err(e) => {
            tracing::error!(table = %identifier, error = %e, "Computing views failed");
            add_log(
                &data.logs,
                "ERROR",
                "Views",
                &format!("Failed to load {}: {}", identifier, e),
            );
            e.error_response()
        }
    }
}

#[get("/tables/{identifier}/export")]
async fn table_export(
    data: web::Data<HttpState>,
    path: web::Path<String>,
    query: web::Query<FilterRequest>,
) -> impl Responder {
    let identifier = path.into_inner();

    match data.dashboard.export(&identifier, query.into_inner()).await {
        Ok(bytes) => {
            add_log(
                &data.logs,
                "INFO",
                "Export",
                &format!("Exported {} ({} bytes)", identifier, bytes.len()),
            );
            HttpResponse::Ok()
                .content_type(XLSX_CONTENT_TYPE)
                .insert_header((
                    "Content-Disposition",
                    format!("attachment; filename=\"{}\"", EXPORT_FILE_NAME),
                ))
                .body(bytes)
        }
        Err(e) => {
            tracing::error!(table = %identifier, error = %e, "Export failed");
            add_log(
                &data.logs,
                "ERROR",
                "Export",
                &format!("Failed to export {}: {}", identifier, e),
            );
            e.error_response()
        }
    }
}

#[get("/logs")]
async fn get_logs(data: web::Data<HttpState>) -> impl Responder {
    let logs = data.logs.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    HttpResponse::Ok().json(&*logs)
}

pub fn add_log_entry(
    logs: &Mutex<Vec<LogEntry>>,
    level: &str,
    source: &str,
    message: &str,
) -> LogEntry {
    let entry = LogEntry {
        time: Local::now().format("%H:%M:%S").to_string(),
        level: level.to_string(),
        source: source.to_string(),
        message: message.to_string(),
    };
    let mut logs = logs.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    logs.push(entry.clone());
    if logs.len() > MAX_LOG_ENTRIES {
        logs.remove(0);
    }
    entry
}

pub fn add_log(logs: &Mutex<Vec<LogEntry>>, level: &str, source: &str, message: &str) {
    add_log_entry(logs, level, source, message);
}

/// Routes under `/api`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(upload)
            .service(list_tables)
            .service(table_views)
            .service(table_export)
            .service(get_logs),
    );
}

pub fn start_server(state: web::Data<HttpState>, config: &HttpConfig) -> std::io::Result<Server> {
    let max_upload_bytes = config.max_upload_bytes;

    let server = HttpServer::new(move || {
        let cors = Cors::permissive(); // Front-end is served from another origin

        App::new()
            .wrap(cors)
            .app_data(state.clone())
            .app_data(web::PayloadConfig::new(max_upload_bytes))
            .configure(configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run();

    tracing::info!(host = %config.host, port = config.port, "HTTP server listening");
    Ok(server)
}
