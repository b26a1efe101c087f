use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::evaluation::EvaluationServiceError;
use crate::workflows::salary::SalaryInputError;
use crate::workflows::staff::StaffServiceError;
use crate::workflows::tasks::TaskServiceError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Payload(serde_json::Error),
    Evaluation(EvaluationServiceError),
    Task(TaskServiceError),
    Staff(StaffServiceError),
    Salary(SalaryInputError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Payload(err) => write!(f, "invalid payload: {}", err),
            AppError::Evaluation(err) => write!(f, "evaluation error: {}", err),
            AppError::Task(err) => write!(f, "task error: {}", err),
            AppError::Staff(err) => write!(f, "staff error: {}", err),
            AppError::Salary(err) => write!(f, "salary input error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Payload(err) => Some(err),
            AppError::Evaluation(err) => Some(err),
            AppError::Task(err) => Some(err),
            AppError::Staff(err) => Some(err),
            AppError::Salary(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::Payload(_)
            | AppError::Evaluation(_)
            | AppError::Task(_)
            | AppError::Staff(_)
            | AppError::Salary(_) => StatusCode::BAD_REQUEST,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Payload(value)
    }
}

impl From<EvaluationServiceError> for AppError {
    fn from(value: EvaluationServiceError) -> Self {
        Self::Evaluation(value)
    }
}

impl From<TaskServiceError> for AppError {
    fn from(value: TaskServiceError) -> Self {
        Self::Task(value)
    }
}

impl From<StaffServiceError> for AppError {
    fn from(value: StaffServiceError) -> Self {
        Self::Staff(value)
    }
}

impl From<SalaryInputError> for AppError {
    fn from(value: SalaryInputError) -> Self {
        Self::Salary(value)
    }
}
