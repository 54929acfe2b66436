//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Each type mirrors a core type with C-compatible representations:
//! `*mut c_char` instead of `String`, raw pointers instead of `Vec`, and
//! enums with explicit discriminants. Payloads are opaque JSON on the Rust
//! side too, so a successful result carries either the bearer token or the
//! JSON text of the decoded body. Conversion helpers live here to keep
//! `lib.rs` focused on the `extern "C"` surface.

use std::ffi::CString;
use std::os::raw::c_char;

use dosemate_core::error::ApiError;
use dosemate_core::http::HttpMethod;

/// Opaque handle to a `ReminderClient`. C callers receive a pointer to this
/// and pass it back into every FFI function.
pub struct FfiReminderClient {
    pub(crate) inner: dosemate_core::ReminderClient,
}

/// Allocate a C string. Interior NULs truncate to an empty string.
pub(crate) fn c_string(s: impl Into<Vec<u8>>) -> *mut c_char {
    CString::new(s).unwrap_or_default().into_raw()
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// HTTP method as a C enum.
#[repr(C)]
pub enum FfiHttpMethod {
    Get = 0,
    Post = 1,
}

impl From<HttpMethod> for FfiHttpMethod {
    fn from(m: HttpMethod) -> Self {
        match m {
            HttpMethod::Get => FfiHttpMethod::Get,
            HttpMethod::Post => FfiHttpMethod::Post,
        }
    }
}

/// A single HTTP header as a key-value pair of C strings.
#[repr(C)]
pub struct FfiHeader {
    pub key: *mut c_char,
    pub value: *mut c_char,
}

/// An HTTP request described as C-compatible plain data.
///
/// Built by `dosemate_build_*` functions. The host executes the request and
/// passes the response back through `dosemate_parse_*`.
#[repr(C)]
pub struct FfiHttpRequest {
    pub method: FfiHttpMethod,
    pub path: *mut c_char,
    pub headers: *mut FfiHeader,
    pub headers_len: u32,
    pub body: *mut c_char,
}

impl FfiHttpRequest {
    /// Convert a core `HttpRequest` into a heap-allocated `FfiHttpRequest`.
    pub(crate) fn from_core(req: dosemate_core::HttpRequest) -> *mut Self {
        let path = c_string(req.path);
        let body = match req.body {
            Some(b) => c_string(b),
            None => std::ptr::null_mut(),
        };

        let headers_len = req.headers.len() as u32;
        let headers = if req.headers.is_empty() {
            std::ptr::null_mut()
        } else {
            let ffi_headers: Box<[FfiHeader]> = req
                .headers
                .into_iter()
                .map(|(k, v)| FfiHeader {
                    key: c_string(k),
                    value: c_string(v),
                })
                .collect();
            Box::into_raw(ffi_headers) as *mut FfiHeader
        };

        Box::into_raw(Box::new(FfiHttpRequest {
            method: req.method.into(),
            path,
            headers,
            headers_len,
            body,
        }))
    }
}

// ---------------------------------------------------------------------------
// Response input (caller-provided, not heap-allocated by us)
// ---------------------------------------------------------------------------

/// An HTTP response described as C-compatible plain data.
///
/// The host constructs this after executing a request and passes a pointer to
/// a `dosemate_parse_*` function. The FFI layer reads but does not free these
/// fields. A null `body` is treated as empty.
#[repr(C)]
pub struct FfiHttpResponse {
    pub status: u16,
    pub body: *const c_char,
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Error codes returned in `FfiResult`.
#[repr(C)]
#[derive(Debug, PartialEq, Eq)]
pub enum FfiErrorCode {
    Ok = 0,
    Registration = 1,
    Fetch = 2,
    Deserialization = 3,
    Serialization = 4,
    /// Never returned by `dosemate_parse_*`: the host executes requests, so
    /// it reports its own network failures with this code.
    Transport = 5,
    Panic = 6,
    NullArg = 7,
}

/// Tells the host how to read `FfiResult::data`.
#[repr(C)]
#[derive(Debug, PartialEq, Eq)]
pub enum FfiDataTag {
    None = 0,
    /// `data` is the bearer token; the host persists it under `jwt`.
    Token = 1,
    /// `data` is the JSON text of the decoded response body.
    Json = 2,
}

/// Result envelope for all parse operations.
///
/// On success `error_code` is `Ok`, `error_message` is null and `data` holds
/// the payload tagged by `data_tag`. On failure `error_code` describes the
/// category, `error_message` is a human-readable C string containing the
/// status and body, and `data` is null.
#[repr(C)]
pub struct FfiResult {
    pub error_code: FfiErrorCode,
    pub error_message: *mut c_char,
    pub http_status: u16,
    pub data_tag: FfiDataTag,
    pub data: *mut c_char,
}

impl FfiResult {
    fn boxed(self) -> *mut Self {
        Box::into_raw(Box::new(self))
    }

    pub(crate) fn ok_token(token: dosemate_core::AuthToken) -> *mut Self {
        FfiResult {
            error_code: FfiErrorCode::Ok,
            error_message: std::ptr::null_mut(),
            http_status: 0,
            data_tag: FfiDataTag::Token,
            data: c_string(token.into_string()),
        }
        .boxed()
    }

    /// Re-encode a decoded payload as JSON text.
    pub(crate) fn ok_json<T: serde::Serialize>(payload: &T) -> *mut Self {
        match serde_json::to_string(payload) {
            Ok(json) => FfiResult {
                error_code: FfiErrorCode::Ok,
                error_message: std::ptr::null_mut(),
                http_status: 0,
                data_tag: FfiDataTag::Json,
                data: c_string(json),
            }
            .boxed(),
            Err(e) => Self::from_error(ApiError::Serialization(e.to_string())),
        }
    }

    /// Build an error result from an `ApiError`.
    pub(crate) fn from_error(err: ApiError) -> *mut Self {
        let error_code = match &err {
            ApiError::Registration { .. } => FfiErrorCode::Registration,
            ApiError::Fetch { .. } => FfiErrorCode::Fetch,
            ApiError::Deserialization(_) => FfiErrorCode::Deserialization,
            ApiError::Serialization(_) => FfiErrorCode::Serialization,
            ApiError::Transport(_) => FfiErrorCode::Transport,
        };
        FfiResult {
            error_code,
            error_message: c_string(err.to_string()),
            http_status: err.status().unwrap_or(0),
            data_tag: FfiDataTag::None,
            data: std::ptr::null_mut(),
        }
        .boxed()
    }

    /// Build an error result for a null argument.
    pub(crate) fn null_arg(name: &str) -> *mut Self {
        FfiResult {
            error_code: FfiErrorCode::NullArg,
            error_message: c_string(format!("null argument: {name}")),
            http_status: 0,
            data_tag: FfiDataTag::None,
            data: std::ptr::null_mut(),
        }
        .boxed()
    }

    /// Build an error result for a caught panic.
    pub(crate) fn panic(msg: &str) -> *mut Self {
        FfiResult {
            error_code: FfiErrorCode::Panic,
            error_message: c_string(msg),
            http_status: 0,
            data_tag: FfiDataTag::None,
            data: std::ptr::null_mut(),
        }
        .boxed()
    }
}
