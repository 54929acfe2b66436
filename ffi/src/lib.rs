//! C-ABI wrapper around `dosemate-core`.
//!
//! # Overview
//! Exposes the reminders API builder/parser through `extern "C"` functions so
//! the native mobile host (Swift, Kotlin) can build and parse HTTP exchanges
//! while owning the sockets and the secure token storage itself.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - Per-operation `build_*` / `parse_*` mirrors the core API 1:1.
//! - A single `FfiResult` envelope with `FfiDataTag` conveys the token, the
//!   JSON payload, or an error uniformly.
//! - Token flow for the host: read `jwt` from secure storage; if absent or
//!   unreadable, execute `dosemate_build_register`, parse it, and store the
//!   returned token. A failed write should not discard the token.
//! - The host owns all returned pointers and must call the matching
//!   `dosemate_free_*` function to release them.

pub mod types;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};

use dosemate_core::error::ApiError;
use dosemate_core::http::{HttpRequest, HttpResponse};
use dosemate_core::types::{AuthToken, RegisterRequest};
use dosemate_core::ReminderClient;

use types::*;

/// Borrow a C string as `&str`; invalid UTF-8 reads as empty.
///
/// # Safety
/// `ptr` must be non-null and point to a NUL-terminated string.
unsafe fn read_str<'a>(ptr: *const c_char) -> &'a str {
    unsafe { CStr::from_ptr(ptr) }.to_str().unwrap_or("")
}

// ---------------------------------------------------------------------------
// Client lifecycle
// ---------------------------------------------------------------------------

/// Create a new `ReminderClient` bound to `base_url`.
///
/// Returns null if `base_url` is null or if an internal panic occurs.
/// The caller must free the returned pointer with `dosemate_client_free`.
#[unsafe(no_mangle)]
pub extern "C" fn dosemate_client_new(base_url: *const c_char) -> *mut FfiReminderClient {
    catch_unwind(|| {
        if base_url.is_null() {
            return std::ptr::null_mut();
        }
        let url = unsafe { read_str(base_url) };
        let client = ReminderClient::new(url);
        Box::into_raw(Box::new(FfiReminderClient { inner: client }))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a client created by `dosemate_client_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn dosemate_client_free(client: *mut FfiReminderClient) {
    if !client.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { Box::from_raw(client) });
        });
    }
}

// ---------------------------------------------------------------------------
// Build request functions
// ---------------------------------------------------------------------------

/// Build the registration request for a fresh synthetic test user.
///
/// Returns null if `client` is null.
/// The caller must free the returned pointer with `dosemate_free_request`.
#[unsafe(no_mangle)]
pub extern "C" fn dosemate_build_register(client: *const FfiReminderClient) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let client = unsafe { &*client };
        match client.inner.build_register(&RegisterRequest::synthetic_now()) {
            Ok(req) => FfiHttpRequest::from_core(req),
            Err(_) => std::ptr::null_mut(),
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Shared body of the authorized read builders.
fn build_authorized(
    client: *const FfiReminderClient,
    token: *const c_char,
    build: fn(&ReminderClient, &AuthToken) -> HttpRequest,
) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if client.is_null() || token.is_null() {
            return std::ptr::null_mut();
        }
        let client = unsafe { &*client };
        let token = AuthToken::new(unsafe { read_str(token) });
        FfiHttpRequest::from_core(build(&client.inner, &token))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Build `GET /reminders/today` with the bearer `token`.
///
/// Returns null if `client` or `token` is null.
#[unsafe(no_mangle)]
pub extern "C" fn dosemate_build_todays_reminders(
    client: *const FfiReminderClient,
    token: *const c_char,
) -> *mut FfiHttpRequest {
    build_authorized(client, token, ReminderClient::build_todays_reminders)
}

/// Build `GET /reminders/summary` with the bearer `token`.
#[unsafe(no_mangle)]
pub extern "C" fn dosemate_build_progress_summary(
    client: *const FfiReminderClient,
    token: *const c_char,
) -> *mut FfiHttpRequest {
    build_authorized(client, token, ReminderClient::build_progress_summary)
}

/// Build `GET /reminders/streak` with the bearer `token`.
#[unsafe(no_mangle)]
pub extern "C" fn dosemate_build_streak(
    client: *const FfiReminderClient,
    token: *const c_char,
) -> *mut FfiHttpRequest {
    build_authorized(client, token, ReminderClient::build_streak)
}

// ---------------------------------------------------------------------------
// Parse response functions
// ---------------------------------------------------------------------------

/// Convert an `FfiHttpResponse` to a core `HttpResponse`. A null body reads
/// as empty; invalid UTF-8 is replaced so error text survives.
fn ffi_response_to_core(resp: &FfiHttpResponse) -> HttpResponse {
    let body = if resp.body.is_null() {
        String::new()
    } else {
        unsafe { CStr::from_ptr(resp.body) }.to_string_lossy().into_owned()
    };
    HttpResponse {
        status: resp.status,
        headers: Vec::new(),
        body,
    }
}

/// Null-check the arguments, run `parse`, and wrap the outcome.
fn parse_with<T>(
    op: &str,
    client: *const FfiReminderClient,
    response: *const FfiHttpResponse,
    parse: impl FnOnce(&ReminderClient, HttpResponse) -> Result<T, ApiError>,
    ok: impl FnOnce(T) -> *mut FfiResult,
) -> *mut FfiResult {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return FfiResult::null_arg("client");
        }
        if response.is_null() {
            return FfiResult::null_arg("response");
        }
        let client = unsafe { &*client };
        let resp = ffi_response_to_core(unsafe { &*response });
        match parse(&client.inner, resp) {
            Ok(value) => ok(value),
            Err(e) => FfiResult::from_error(e),
        }
    }))
    .unwrap_or_else(|_| FfiResult::panic(&format!("panic in {op}")))
}

/// Parse the registration response.
///
/// Returns a result with `data_tag = Token` on success.
#[unsafe(no_mangle)]
pub extern "C" fn dosemate_parse_register(
    client: *const FfiReminderClient,
    response: *const FfiHttpResponse,
) -> *mut FfiResult {
    parse_with(
        "dosemate_parse_register",
        client,
        response,
        ReminderClient::parse_register,
        FfiResult::ok_token,
    )
}

/// Parse today's reminders. Returns `data_tag = Json` holding an array.
#[unsafe(no_mangle)]
pub extern "C" fn dosemate_parse_todays_reminders(
    client: *const FfiReminderClient,
    response: *const FfiHttpResponse,
) -> *mut FfiResult {
    parse_with(
        "dosemate_parse_todays_reminders",
        client,
        response,
        ReminderClient::parse_todays_reminders,
        |records| FfiResult::ok_json(&records),
    )
}

/// Parse the progress summary. Returns `data_tag = Json`.
#[unsafe(no_mangle)]
pub extern "C" fn dosemate_parse_progress_summary(
    client: *const FfiReminderClient,
    response: *const FfiHttpResponse,
) -> *mut FfiResult {
    parse_with(
        "dosemate_parse_progress_summary",
        client,
        response,
        ReminderClient::parse_progress_summary,
        |summary| FfiResult::ok_json(&summary),
    )
}

/// Parse the streak. Returns `data_tag = Json`.
#[unsafe(no_mangle)]
pub extern "C" fn dosemate_parse_streak(
    client: *const FfiReminderClient,
    response: *const FfiHttpResponse,
) -> *mut FfiResult {
    parse_with(
        "dosemate_parse_streak",
        client,
        response,
        ReminderClient::parse_streak,
        |streak| FfiResult::ok_json(&streak),
    )
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free an `FfiHttpRequest` returned by any `dosemate_build_*` function.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn dosemate_free_request(req: *mut FfiHttpRequest) {
    if req.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let req = unsafe { Box::from_raw(req) };
        free_c_string(req.path);
        free_c_string(req.body);
        if !req.headers.is_null() && req.headers_len > 0 {
            let headers = unsafe {
                Box::from_raw(std::ptr::slice_from_raw_parts_mut(
                    req.headers,
                    req.headers_len as usize,
                ))
            };
            for h in headers.iter() {
                free_c_string(h.key);
                free_c_string(h.value);
            }
        }
    });
}

/// Free an `FfiResult` returned by any `dosemate_parse_*` function.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn dosemate_free_result(result: *mut FfiResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let result = unsafe { Box::from_raw(result) };
        free_c_string(result.error_message);
        free_c_string(result.data);
    });
}

fn free_c_string(s: *mut c_char) {
    if !s.is_null() {
        drop(unsafe { CString::from_raw(s) });
    }
}

/// Free a C string allocated by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn dosemate_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = catch_unwind(|| free_c_string(s));
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
