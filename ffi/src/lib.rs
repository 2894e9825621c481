/*
 * lib.rs
 * Copyright (C) 2026 Conduit Contributors
 *
 * This file is part of Conduit, an embeddable HTTP mediation engine.
 *
 * Conduit is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Conduit is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Conduit.  If not, see <http://www.gnu.org/licenses/>.
 */

//! C FFI for conduit_core. Handlers, requests, and responses are identified by a host-chosen
//! string id (handlers) or an engine-assigned 32-bit id (requests/responses). Returned strings
//! are UTF-8 NUL-terminated and must be freed with `conduit_free_string`. All other string
//! parameters are borrowed for the duration of the call.

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::ptr;
use std::sync::Once;

use bytes::Bytes;
use conduit_core::error::EngineError;
use conduit_core::registry::registry;

fn ptr_to_str(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string()) }
}

thread_local! {
    static LAST_ERROR: std::cell::RefCell<Option<CString>> = std::cell::RefCell::new(None);
}

fn set_last_error(err: &EngineError) {
    let msg = CString::new(err.to_string()).unwrap_or_else(|_| CString::new("(error)").unwrap());
    LAST_ERROR.with(|e| *e.borrow_mut() = Some(msg));
}

fn set_last_error_str(msg: &str) {
    let msg = CString::new(msg).unwrap_or_else(|_| CString::new("(error)").unwrap());
    LAST_ERROR.with(|e| *e.borrow_mut() = Some(msg));
}

fn clear_last_error() {
    LAST_ERROR.with(|e| *e.borrow_mut() = None);
}

static INIT_LOGGING: Once = Once::new();

/// Install a global `tracing` subscriber reading `RUST_LOG`, once per process. Called on first
/// use of the registry rather than requiring a host-side init call.
fn ensure_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

/// Version string (static, do not free).
#[no_mangle]
pub extern "C" fn conduit_version() -> *const c_char {
    b"0.1.0\0".as_ptr() as *const c_char
}

/// Last error message from a failed call on this thread. Valid until the next FFI call on the
/// same thread. Do not free.
#[no_mangle]
pub extern "C" fn conduit_last_error() -> *const c_char {
    LAST_ERROR.with(|e| {
        e.borrow()
            .as_ref()
            .map(|s| s.as_ptr())
            .unwrap_or(ptr::null())
    })
}

/// Free a string returned by `conduit_poll_request`/`conduit_poll_response`. No-op if `ptr` is NULL.
#[no_mangle]
pub unsafe extern "C" fn conduit_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        let _ = CString::from_raw(ptr);
    }
}

/// Register a pipeline factory under `handler_id`, resolved from `uri`. Returns NULL on success, or
/// an owned error string on failure that the caller must free with `conduit_free_string`.
#[no_mangle]
pub unsafe extern "C" fn conduit_create_handler(
    handler_id: *const c_char,
    uri: *const c_char,
) -> *mut c_char {
    ensure_logging();
    clear_last_error();
    let (Some(id), Some(uri)) = (ptr_to_str(handler_id), ptr_to_str(uri)) else {
        let msg = "handler_id or uri is null or not valid UTF-8";
        set_last_error_str(msg);
        return CString::new(msg).map(CString::into_raw).unwrap_or(ptr::null_mut());
    };
    match registry().create_handler(&id, &uri) {
        Ok(()) => ptr::null_mut(),
        Err(e) => {
            let msg = CString::new(e.to_string())
                .map(CString::into_raw)
                .unwrap_or(ptr::null_mut());
            set_last_error(&e);
            msg
        }
    }
}

/// Remove a previously registered handler. No-op if unknown.
#[no_mangle]
pub unsafe extern "C" fn conduit_destroy_handler(handler_id: *const c_char) {
    clear_last_error();
    if let Some(id) = ptr_to_str(handler_id) {
        registry().destroy_handler(&id);
    }
}

/// Create a request mediator bound to `handler_id`. Returns 0 if `handler_id` is unregistered.
#[no_mangle]
pub unsafe extern "C" fn conduit_create_request(handler_id: *const c_char) -> u32 {
    clear_last_error();
    let Some(id) = ptr_to_str(handler_id) else {
        set_last_error_str("handler_id is null or not valid UTF-8");
        return 0;
    };
    registry().create_request(&id)
}

/// Create a response mediator bound to `handler_id`. Returns 0 if `handler_id` is unregistered.
#[no_mangle]
pub unsafe extern "C" fn conduit_create_response(handler_id: *const c_char) -> u32 {
    clear_last_error();
    let Some(id) = ptr_to_str(handler_id) else {
        set_last_error_str("handler_id is null or not valid UTF-8");
        return 0;
    };
    registry().create_response(&id)
}

/// Parse `raw_headers` (CRLF request block) and launch the handler task for request `id`. Returns
/// 0 on success, -1 on error (unknown id, or `begin` called twice).
#[no_mangle]
pub unsafe extern "C" fn conduit_begin_request(id: u32, raw_headers: *const c_char) -> c_int {
    clear_last_error();
    let Some(headers) = ptr_to_str(raw_headers) else {
        set_last_error_str("raw_headers is null or not valid UTF-8");
        return -1;
    };
    match registry().begin_request(id, &headers) {
        Ok(()) => 0,
        Err(e) => {
            set_last_error(&e);
            -1
        }
    }
}

/// Parse `raw_headers` (simplified header block) and launch the handler task for response
/// `resp_id`, routed using the URI originally parsed for request `req_id`. Returns 0 on success,
/// -1 on error (unknown id, or `begin` called twice).
#[no_mangle]
pub unsafe extern "C" fn conduit_begin_response(
    resp_id: u32,
    req_id: u32,
    status: u16,
    raw_headers: *const c_char,
) -> c_int {
    clear_last_error();
    let Some(headers) = ptr_to_str(raw_headers) else {
        set_last_error_str("raw_headers is null or not valid UTF-8");
        return -1;
    };
    match registry().begin_response(resp_id, req_id, status, &headers) {
        Ok(()) => 0,
        Err(e) => {
            set_last_error(&e);
            -1
        }
    }
}

/// Next command for request `id`, as a wire string, or NULL if `block` is 0 and nothing is
/// pending, or on error. Caller frees the result with `conduit_free_string`.
#[no_mangle]
pub unsafe extern "C" fn conduit_poll_request(id: u32, block: c_int) -> *mut c_char {
    clear_last_error();
    match registry().poll_request(id, block != 0) {
        Ok(wire) => CString::new(wire).map(CString::into_raw).unwrap_or(ptr::null_mut()),
        Err(e) => {
            set_last_error(&e);
            ptr::null_mut()
        }
    }
}

/// Next command for response `id`. See `conduit_poll_request`.
#[no_mangle]
pub unsafe extern "C" fn conduit_poll_response(id: u32, block: c_int) -> *mut c_char {
    clear_last_error();
    match registry().poll_response(id, block != 0) {
        Ok(wire) => CString::new(wire).map(CString::into_raw).unwrap_or(ptr::null_mut()),
        Err(e) => {
            set_last_error(&e);
            ptr::null_mut()
        }
    }
}

/// Push `len` bytes at `data` as the next request body chunk for `id`. `last` closes the body
/// channel after this chunk (pass a zero-length chunk with `last` set to close without a final
/// chunk). Returns 0 on success, -1 if `id` is unknown.
#[no_mangle]
pub unsafe extern "C" fn conduit_send_request_body_chunk(
    id: u32,
    data: *const u8,
    len: usize,
    last: c_int,
) -> c_int {
    clear_last_error();
    let bytes = if data.is_null() || len == 0 {
        Bytes::new()
    } else {
        Bytes::copy_from_slice(std::slice::from_raw_parts(data, len))
    };
    match registry().send_request_body_chunk(id, bytes, last != 0) {
        Ok(()) => 0,
        Err(e) => {
            set_last_error(&e);
            -1
        }
    }
}

/// Push a response body chunk for `id`. See `conduit_send_request_body_chunk`.
#[no_mangle]
pub unsafe extern "C" fn conduit_send_response_body_chunk(
    id: u32,
    data: *const u8,
    len: usize,
    last: c_int,
) -> c_int {
    clear_last_error();
    let bytes = if data.is_null() || len == 0 {
        Bytes::new()
    } else {
        Bytes::copy_from_slice(std::slice::from_raw_parts(data, len))
    };
    match registry().send_response_body_chunk(id, bytes, last != 0) {
        Ok(()) => 0,
        Err(e) => {
            set_last_error(&e);
            -1
        }
    }
}

/// Release the request mediator for `id`. No-op if unknown.
#[no_mangle]
pub unsafe extern "C" fn conduit_free_request(id: u32) {
    clear_last_error();
    registry().free_request(id);
}

/// Release the response mediator for `id`. No-op if unknown.
#[no_mangle]
pub unsafe extern "C" fn conduit_free_response(id: u32) {
    clear_last_error();
    registry().free_response(id);
}

/// Borrow the bytes of chunk `id`, valid until `conduit_release_chunk(id)`. Writes the length to
/// `*out_len` and returns a pointer to the first byte, or NULL (and `*out_len = 0`) if unknown.
#[no_mangle]
pub unsafe extern "C" fn conduit_get_chunk(id: u32, out_len: *mut usize) -> *const u8 {
    clear_last_error();
    match registry().chunks().get(id) {
        Some((ptr, len)) => {
            if !out_len.is_null() {
                *out_len = len;
            }
            ptr
        }
        None => {
            if !out_len.is_null() {
                *out_len = 0;
            }
            ptr::null()
        }
    }
}

/// Release chunk `id`. The host must call this exactly once per chunk id it receives via a
/// `WBOD` command. No-op if unknown.
#[no_mangle]
pub unsafe extern "C" fn conduit_release_chunk(id: u32) {
    clear_last_error();
    registry().chunks().release(id);
}
