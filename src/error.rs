use std::fmt;

pub const LIST_FAILED_MESSAGE: &str = "Falha ao carregar os dados.";
pub const UNEXPECTED_MESSAGE: &str = "Erro inesperado ao consultar o servidor.";
pub const DELETE_FAILED_MESSAGE: &str = "Não foi possível remover o registro.";
pub const EXPORT_FAILED_MESSAGE: &str = "Não foi possível exportar os registros.";
pub const EMPTY_EXPORT_MESSAGE: &str = "O arquivo exportado está vazio.";

/// Failures surfaced by backend calls and the work that follows them.
///
/// A superseded request is not represented here: cancelled fetches never
/// produce a value at all.
#[derive(Debug)]
pub enum Error {
    /// Network unreachable, connection reset, body could not be read.
    Transport(reqwest::Error),
    /// Non-2xx response, with the server's `error` field when it sent one.
    Status { status: u16, message: Option<String> },
    /// 2xx response whose body was not the expected JSON shape.
    Decode(String),
    /// Export returned zero bytes.
    EmptyPayload,
    /// Export downloaded fine but could not be written to disk.
    Save(std::io::Error),
    /// The task driving the operation ended without reporting an outcome.
    Interrupted,
}

impl Error {
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Error::Status {
                message: Some(message),
                ..
            } => Some(message.as_str()),
            _ => None,
        }
    }

    /// Message shown to the user: the server's own text when available,
    /// otherwise `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Error::Status {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => message.clone(),
            Error::EmptyPayload => EMPTY_EXPORT_MESSAGE.to_string(),
            Error::Interrupted => UNEXPECTED_MESSAGE.to_string(),
            _ => fallback.to_string(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Transport(err) => write!(f, "request failed: {err}"),
            Error::Status {
                status,
                message: Some(message),
            } => write!(f, "server returned {status}: {message}"),
            Error::Status {
                status,
                message: None,
            } => write!(f, "server returned {status}"),
            Error::Decode(message) => write!(f, "invalid response body: {message}"),
            Error::EmptyPayload => write!(f, "export payload is empty"),
            Error::Save(err) => write!(f, "failed to save export: {err}"),
            Error::Interrupted => write!(f, "operation interrupted before completion"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Transport(err) => Some(err),
            Error::Save(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_prefers_server_text() {
        let err = Error::Status {
            status: 404,
            message: Some("Registro de integração não encontrado.".to_string()),
        };
        assert_eq!(
            err.user_message(DELETE_FAILED_MESSAGE),
            "Registro de integração não encontrado."
        );
    }

    #[test]
    fn user_message_falls_back_without_server_text() {
        let err = Error::Status {
            status: 500,
            message: None,
        };
        assert_eq!(err.user_message(LIST_FAILED_MESSAGE), LIST_FAILED_MESSAGE);
        let err = Error::Decode("expected object".to_string());
        assert_eq!(err.user_message(LIST_FAILED_MESSAGE), LIST_FAILED_MESSAGE);
        let blank = Error::Status {
            status: 400,
            message: Some("  ".to_string()),
        };
        assert_eq!(blank.user_message(LIST_FAILED_MESSAGE), LIST_FAILED_MESSAGE);
    }

    #[test]
    fn empty_payload_has_its_own_message() {
        assert_eq!(
            Error::EmptyPayload.user_message(EXPORT_FAILED_MESSAGE),
            EMPTY_EXPORT_MESSAGE
        );
    }
}
