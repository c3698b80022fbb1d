use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use courier_core::error::CoreError;
use courier_dispatch::{CommandError, DispatchError};
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps the domain errors of the core and dispatch crates and implements
/// [`IntoResponse`] to produce consistent `{ "error", "code" }` bodies.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `courier_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A submission rejected by the dispatcher.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// A command registry lookup or update failed.
    #[error(transparent)]
    Command(#[from] CommandError),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => classify_core_error(core),

            AppError::Dispatch(dispatch) => match dispatch {
                DispatchError::Command(command) => classify_command_error(command),
                DispatchError::InvalidJob(core) => classify_core_error(core),
                DispatchError::Stopped => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "Dispatcher is shutting down".to_string(),
                ),
            },

            AppError::Command(command) => classify_command_error(command),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn classify_core_error(err: &CoreError) -> (StatusCode, &'static str, String) {
    match err {
        CoreError::NotFound { entity, id } => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{entity} with id {id} not found"),
        ),
        CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
    }
}

/// - `DuplicateCommand` maps to 409.
/// - `UnknownCommand` maps to 404.
/// - `DerivedState` maps to 400.
fn classify_command_error(err: &CommandError) -> (StatusCode, &'static str, String) {
    match err {
        CommandError::DuplicateCommand(id) => (
            StatusCode::CONFLICT,
            "CONFLICT",
            format!("Job {id} has already been submitted"),
        ),
        CommandError::UnknownCommand(id) => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("Command with id {id} not found"),
        ),
        CommandError::DerivedState(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use courier_core::status::CommandState;

    use super::*;

    #[test]
    fn duplicate_submission_is_conflict() {
        let response =
            AppError::from(DispatchError::Command(CommandError::DuplicateCommand("j".into())))
                .into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn stopped_dispatcher_is_service_unavailable() {
        let response = AppError::from(DispatchError::Stopped).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn invalid_job_is_bad_request() {
        let response = AppError::from(DispatchError::InvalidJob(CoreError::Validation(
            "Job id must not be empty".into(),
        )))
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn unknown_command_is_not_found() {
        let response = AppError::from(CommandError::UnknownCommand("ghost".into())).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn missing_entity_is_not_found() {
        let response = AppError::from(CoreError::NotFound {
            entity: "Worker",
            id: "w-9".into(),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn derived_state_is_bad_request() {
        let response = AppError::from(CommandError::DerivedState(CommandState::TimeoutResponse))
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
