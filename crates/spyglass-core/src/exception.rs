//! Exception values the coordinator knows how to record.
//!
//! The host decides what an "exception" is. Anything that can answer the
//! questions in [`CapturedError`] can be recorded; a value that exposes its
//! own status code and response payload is treated like a framework HTTP
//! error, everything else resolves to `500 Internal Server Error`.

use serde_json::Value;
use std::any::Any;
use std::fmt;

/// Status code used when an exception does not carry its own.
pub const DEFAULT_EXCEPTION_STATUS: u16 = 500;

/// Capability view over a thrown value.
pub trait CapturedError {
    /// Name or type of the exception, if known.
    fn name(&self) -> Option<String>;

    /// Raw error message, if any.
    fn message(&self) -> Option<String>;

    /// Stack trace text captured when the error was raised.
    fn stack(&self) -> Option<String> {
        None
    }

    /// HTTP status the error carries.
    fn status_code(&self) -> Option<u16> {
        None
    }

    /// Message taken from a structured response payload.
    fn response_message(&self) -> Option<String> {
        None
    }
}

/// Resolve the HTTP status for an exception.
pub fn resolve_status_code(error: &dyn CapturedError) -> u16 {
    error.status_code().unwrap_or(DEFAULT_EXCEPTION_STATUS)
}

/// An HTTP error raised by a handler, with a status and response payload.
///
/// Hosts typically build one while converting their own error type into a
/// response, and attach it to the response extensions so an adapter can
/// record it.
#[derive(Debug, Clone)]
pub struct HttpError {
    /// HTTP status code
    pub status: u16,
    /// Error type identifier
    pub name: String,
    /// Human-readable error message
    pub message: String,
    /// Response payload sent to the client
    pub payload: Option<Value>,
    /// Stack trace, when the host captured one
    pub stack: Option<String>,
}

impl HttpError {
    /// Create a new HTTP error.
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            name: "HttpException".to_string(),
            message: message.into(),
            payload: None,
            stack: None,
        }
    }

    /// Set the error type identifier.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the response payload.
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Set the stack trace text.
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// Create a 404 Not Found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(404, message).with_name("NotFoundException")
    }

    /// Create a 400 Bad Request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(400, message).with_name("BadRequestException")
    }

    /// Create a 500 Internal Server Error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(500, message).with_name("InternalServerErrorException")
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.name, self.status, self.message)
    }
}

impl std::error::Error for HttpError {}

impl CapturedError for HttpError {
    fn name(&self) -> Option<String> {
        Some(self.name.clone())
    }

    fn message(&self) -> Option<String> {
        Some(self.message.clone())
    }

    fn stack(&self) -> Option<String> {
        self.stack.clone()
    }

    fn status_code(&self) -> Option<u16> {
        Some(self.status)
    }

    fn response_message(&self) -> Option<String> {
        match self.payload.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Object(map) => match map.get("message")? {
                Value::String(s) => Some(s.clone()),
                Value::Null => None,
                other => Some(other.to_string()),
            },
            _ => None,
        }
    }
}

/// A thrown value with no HTTP status of its own.
///
/// Built from Rust errors, displayable values, or panic payloads.
#[derive(Debug, Clone, Default)]
pub struct ErrorValue {
    name: Option<String>,
    message: Option<String>,
    stack: Option<String>,
}

impl ErrorValue {
    /// Create an error value from a name and message.
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            message: Some(message.into()),
            stack: None,
        }
    }

    /// Capture a Rust error. The source chain is kept as the stack text.
    pub fn from_error<E>(error: &E) -> Self
    where
        E: std::error::Error + ?Sized,
    {
        let mut chain = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            chain.push(format!("caused by: {}", cause));
            source = cause.source();
        }

        Self {
            name: Some(short_type_name::<E>().to_string()),
            message: Some(error.to_string()),
            stack: (!chain.is_empty()).then(|| chain.join("\n")),
        }
    }

    /// Capture an error returned by a service.
    ///
    /// Concrete error types are named after the type. When the type is
    /// erased (`Box<dyn Error>`, `Arc<dyn Error>`) the name is the leading
    /// identifier of the `Debug` output, usually the struct or variant name,
    /// falling back to `"Error"`.
    pub fn from_service_error<E>(error: &E) -> Self
    where
        E: fmt::Debug + fmt::Display + ?Sized,
    {
        let name = if std::any::type_name::<E>().contains("dyn ") {
            let debug = format!("{:?}", error);
            debug_name(&debug).unwrap_or("Error").to_string()
        } else {
            short_type_name::<E>().to_string()
        };

        Self {
            name: Some(name),
            message: Some(error.to_string()),
            stack: None,
        }
    }

    /// Capture a panic payload as returned by `catch_unwind`.
    ///
    /// String payloads keep their text; anything else becomes an
    /// anonymous "Unknown Exception".
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned());

        match message {
            Some(message) => Self {
                name: Some("Panic".to_string()),
                message: Some(message),
                stack: None,
            },
            None => Self {
                name: Some("Unknown".to_string()),
                message: Some("Unknown Exception".to_string()),
                stack: None,
            },
        }
    }

    /// Set the stack trace text.
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }
}

impl CapturedError for ErrorValue {
    fn name(&self) -> Option<String> {
        self.name.clone()
    }

    fn message(&self) -> Option<String> {
        self.message.clone()
    }

    fn stack(&self) -> Option<String> {
        self.stack.clone()
    }
}

/// Leading `UpperCamel` identifier of a `Debug` rendering.
fn debug_name(debug: &str) -> Option<&str> {
    let end = debug
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(debug.len());
    let ident = &debug[..end];
    ident
        .starts_with(|c: char| c.is_ascii_uppercase())
        .then_some(ident)
}

fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    // strip generic arguments before taking the last path segment
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
