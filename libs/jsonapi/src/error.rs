use http::StatusCode;
use serde::{Deserialize, Serialize};

/// Where in the request an error originated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorSource {
    /// JSON Pointer into the request document (e.g. `/data/attributes/name`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pointer: Option<String>,
    /// Name of the offending query parameter (e.g. `include`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
}

/// A JSON:API error object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorObject {
    /// HTTP status code as a string.
    pub status: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<ErrorSource>,
}

impl ErrorObject {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status: status.as_u16().to_string(),
            title: status.canonical_reason().unwrap_or("Error").to_string(),
            detail: None,
            source: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_pointer(mut self, pointer: impl Into<String>) -> Self {
        self.source.get_or_insert_with(ErrorSource::default).pointer = Some(pointer.into());
        self
    }

    pub fn with_parameter(mut self, parameter: impl Into<String>) -> Self {
        self.source.get_or_insert_with(ErrorSource::default).parameter = Some(parameter.into());
        self
    }

    pub fn status_code(&self) -> StatusCode {
        self.status
            .parse::<u16>()
            .ok()
            .and_then(|s| StatusCode::from_u16(s).ok())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

/// Detail and source of a client error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Details {
    pub detail: String,
    pub source: Option<ErrorSource>,
}

impl std::fmt::Display for Details {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.detail)
    }
}

impl Details {
    fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
            source: None,
        }
    }
}

/// Errors raised while building the API registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("resource type '{0}' is registered twice")]
    DuplicateResource(String),

    #[error("resource '{resource}' declares field '{field}' twice")]
    DuplicateField { resource: String, field: String },

    #[error("relationship '{resource}.{field}' targets unknown resource type '{target}'")]
    UnknownRelatedType {
        resource: String,
        field: String,
        target: String,
    },

    #[error("endpoint '{endpoint}' on resource '{resource}' requires the '{capability}' capability")]
    MissingCapability {
        resource: String,
        endpoint: &'static str,
        capability: &'static str,
    },

    #[error("default sort '{sort}' on resource '{resource}' is invalid")]
    InvalidDefaultSort { resource: String, sort: String },

    #[error("default include '{include}' on resource '{resource}' is invalid")]
    InvalidDefaultInclude { resource: String, include: String },

    #[error("extension '{0}' is registered twice")]
    DuplicateExtension(String),
}

/// Request-processing error. Every variant converts into an error document.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    BadRequest(Details),

    #[error("{0}")]
    Forbidden(Details),

    #[error("{0}")]
    NotFound(Details),

    #[error("method {method} not allowed")]
    MethodNotAllowed { method: String },

    #[error("not acceptable")]
    NotAcceptable,

    #[error("{0}")]
    UnsupportedMediaType(Details),

    #[error("{0}")]
    Conflict(Details),

    #[error("validation failed")]
    UnprocessableEntity(Vec<ErrorObject>),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("internal error")]
    Internal(#[source] anyhow::Error),
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Error::Internal(e)
    }
}

impl From<jsonapi_core::Error> for Error {
    fn from(e: jsonapi_core::Error) -> Self {
        use jsonapi_core::Error as Core;
        let parameter = match &e {
            Core::InvalidInclude(_) => "include".to_string(),
            Core::InvalidSort(_) => "sort".to_string(),
            Core::InvalidFilter(_) => "filter".to_string(),
            Core::InvalidPage { parameter, .. } => parameter.clone(),
            Core::InvalidMediaType(detail) => {
                return Error::UnsupportedMediaType(Details::new(detail.clone()))
            }
        };
        Error::bad_request(e.to_string()).with_parameter(parameter)
    }
}

impl Error {
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Error::BadRequest(Details::new(detail))
    }

    pub fn forbidden(detail: impl Into<String>) -> Self {
        Error::Forbidden(Details::new(detail))
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Error::NotFound(Details::new(detail))
    }

    pub fn conflict(detail: impl Into<String>) -> Self {
        Error::Conflict(Details::new(detail))
    }

    pub fn unsupported_media_type(detail: impl Into<String>) -> Self {
        Error::UnsupportedMediaType(Details::new(detail))
    }

    pub fn method_not_allowed(method: &http::Method) -> Self {
        Error::MethodNotAllowed {
            method: method.to_string(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal(anyhow::anyhow!(message.into()))
    }

    fn details_mut(&mut self) -> Option<&mut Details> {
        match self {
            Error::BadRequest(d)
            | Error::Forbidden(d)
            | Error::NotFound(d)
            | Error::UnsupportedMediaType(d)
            | Error::Conflict(d) => Some(d),
            _ => None,
        }
    }

    /// Attach a query parameter source. No effect on variants without a source.
    pub fn with_parameter(mut self, parameter: impl Into<String>) -> Self {
        if let Some(d) = self.details_mut() {
            d.source.get_or_insert_with(ErrorSource::default).parameter = Some(parameter.into());
        }
        self
    }

    /// Attach a JSON Pointer source. No effect on variants without a source.
    pub fn with_pointer(mut self, pointer: impl Into<String>) -> Self {
        if let Some(d) = self.details_mut() {
            d.source.get_or_insert_with(ErrorSource::default).pointer = Some(pointer.into());
        }
        self
    }

    /// Prefix the parameter source: none becomes `prefix`, a relative
    /// `[x]` becomes `prefix[x]`, anything else is left alone.
    pub fn prepend_parameter(mut self, prefix: &str) -> Self {
        if let Some(d) = self.details_mut() {
            let source = d.source.get_or_insert_with(ErrorSource::default);
            if source.pointer.is_some() && source.parameter.is_none() {
                return self;
            }
            source.parameter = Some(match source.parameter.take() {
                None => prefix.to_string(),
                Some(p) if p.starts_with('[') => format!("{prefix}{p}"),
                Some(p) => p,
            });
        }
        self
    }

    pub fn source(&self) -> Option<&ErrorSource> {
        match self {
            Error::BadRequest(d)
            | Error::Forbidden(d)
            | Error::NotFound(d)
            | Error::UnsupportedMediaType(d)
            | Error::Conflict(d) => d.source.as_ref(),
            _ => None,
        }
    }

    /// Shortcut for tests and logs: the offending query parameter, if any.
    pub fn parameter(&self) -> Option<&str> {
        self.source().and_then(|s| s.parameter.as_deref())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::Forbidden(_) => StatusCode::FORBIDDEN,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Error::NotAcceptable => StatusCode::NOT_ACCEPTABLE,
            Error::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Config(_) | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Error objects for the response document. Internal errors never expose
    /// their cause.
    pub fn to_error_objects(&self) -> Vec<ErrorObject> {
        let base = ErrorObject::new(self.status());
        match self {
            Error::BadRequest(d)
            | Error::Forbidden(d)
            | Error::NotFound(d)
            | Error::UnsupportedMediaType(d)
            | Error::Conflict(d) => {
                let mut obj = base;
                if !d.detail.is_empty() {
                    obj.detail = Some(d.detail.clone());
                }
                obj.source = d.source.clone();
                vec![obj]
            }
            Error::MethodNotAllowed { method } => {
                vec![base.with_detail(format!("Method {method} is not allowed"))]
            }
            Error::NotAcceptable => vec![base],
            Error::UnprocessableEntity(errors) if !errors.is_empty() => errors.clone(),
            Error::UnprocessableEntity(_) => vec![base],
            Error::Config(_) | Error::Internal(_) => vec![base],
        }
    }
}
