// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! C ABI for the graph queries (`rmw_hdds_graph_*`).
//!
//! String arrays follow the rcutils layout: `size` entries, each a
//! `malloc`-owned NUL-terminated string, released with
//! `rmw_hdds_graph_string_array_fini`.

#![allow(non_camel_case_types)]

use crate::env_config::EnvConfig;
use crate::guid::GUID;
use crate::query::{self, NodeHandle, StringArray, IMPLEMENTATION_IDENTIFIER};
use crate::{
    Error, GraphContext, HandleFault, RmwRet, RMW_RET_ERROR, RMW_RET_INVALID_ARGUMENT, RMW_RET_OK,
};
use libc::c_char;
use std::ffi::CStr;
use std::mem::size_of;
use std::os::raw::c_void;
use std::ptr;
use std::sync::Once;

/// One-time initialization of logging from the environment
static ENV_CONFIG_INIT: Once = Once::new();

/// NUL-terminated copy of [`IMPLEMENTATION_IDENTIFIER`].
static IDENTIFIER_C: &[u8] = b"rmw_hdds_cpp\0";

fn init_env_config() -> EnvConfig {
    let config = EnvConfig::from_env();
    ENV_CONFIG_INIT.call_once(|| {
        config.init_logging();
        if config.is_custom() {
            log::info!(
                "[ffi] environment config: domain_id={}, log_level={}, take_limit={:?}",
                config.domain_id,
                config.log_level,
                config.discovery_take_limit
            );
        }
    });
    config
}

pub type rmw_hdds_graph_ret_t = RmwRet;

/// rcutils-compatible string array.
#[repr(C)]
#[derive(Debug)]
pub struct rmw_hdds_graph_string_array_t {
    pub size: usize,
    pub data: *mut *mut c_char,
}

impl rmw_hdds_graph_string_array_t {
    fn zeroed() -> Self {
        Self {
            size: 0,
            data: ptr::null_mut(),
        }
    }

    fn is_zero(&self) -> bool {
        self.size == 0 && self.data.is_null()
    }
}

/// Opaque node handle.
#[repr(C)]
pub struct rmw_hdds_graph_node_t {
    pub implementation_identifier: *const c_char,
    pub data: *mut c_void,
}

/// Releases storage obtained from `malloc`/`calloc`.
type FreeFn = unsafe extern "C" fn(*mut c_void);

/// Owns a partially built C string array; frees everything unless released.
struct CStringArrayGuard {
    array: rmw_hdds_graph_string_array_t,
    free: FreeFn,
}

impl CStringArrayGuard {
    #[cfg(test)]
    fn from_strings(strings: &[String]) -> Result<Self, Error> {
        Self::from_strings_with(strings, c_string_dup, libc::free)
    }

    /// Builds the array with `dup` copying each entry; on the first failed
    /// copy every entry made so far is handed back to `free`.
    fn from_strings_with<F>(strings: &[String], mut dup: F, free: FreeFn) -> Result<Self, Error>
    where
        F: FnMut(&str) -> Option<*mut c_char>,
    {
        let mut guard = Self {
            array: rmw_hdds_graph_string_array_t::zeroed(),
            free,
        };
        if strings.is_empty() {
            return Ok(guard);
        }

        // SAFETY: calloc either fails (null) or returns zeroed storage for
        // `strings.len()` pointers, so every slot starts out null.
        let data = unsafe { libc::calloc(strings.len(), size_of::<*mut c_char>()) };
        if data.is_null() {
            return Err(Error::ResourceExhausted);
        }
        guard.array.data = data.cast();
        guard.array.size = strings.len();

        for (i, value) in strings.iter().enumerate() {
            let copy = dup(value).ok_or(Error::ResourceExhausted)?;
            // SAFETY: `i < size` and `data` holds `size` slots.
            unsafe { *guard.array.data.add(i) = copy };
        }
        Ok(guard)
    }

    fn release(mut self) -> rmw_hdds_graph_string_array_t {
        std::mem::replace(&mut self.array, rmw_hdds_graph_string_array_t::zeroed())
    }
}

impl Drop for CStringArrayGuard {
    fn drop(&mut self) {
        // SAFETY: the guard exclusively owns its array.
        unsafe { string_array_fini_with(&mut self.array, self.free) };
    }
}

fn c_string_dup(value: &str) -> Option<*mut c_char> {
    let bytes = value.as_bytes();
    let len = bytes.len().checked_add(1)?;
    // SAFETY: `len` bytes are allocated, `bytes.len()` copied and the last
    // one set to NUL.
    unsafe {
        let copy = libc::malloc(len).cast::<u8>();
        if copy.is_null() {
            return None;
        }
        ptr::copy_nonoverlapping(bytes.as_ptr(), copy, bytes.len());
        *copy.add(bytes.len()) = 0;
        Some(copy.cast())
    }
}

unsafe fn string_array_fini(array: &mut rmw_hdds_graph_string_array_t) {
    string_array_fini_with(array, libc::free);
}

unsafe fn string_array_fini_with(array: &mut rmw_hdds_graph_string_array_t, free: FreeFn) {
    if !array.data.is_null() {
        for i in 0..array.size {
            let entry = *array.data.add(i);
            if !entry.is_null() {
                free(entry.cast());
            }
        }
        free(array.data.cast());
    }
    *array = rmw_hdds_graph_string_array_t::zeroed();
}

unsafe fn node_handle<'a>(node: *const rmw_hdds_graph_node_t) -> Result<&'a NodeHandle, Error> {
    if node.is_null() || (*node).data.is_null() {
        return Err(Error::InvalidHandle(HandleFault::Null));
    }
    let identifier = (*node).implementation_identifier;
    if identifier.is_null()
        || CStr::from_ptr(identifier).to_bytes() != IMPLEMENTATION_IDENTIFIER.as_bytes()
    {
        return Err(Error::InvalidHandle(HandleFault::ForeignImplementation));
    }
    Ok(&*((*node).data as *const NodeHandle))
}

/// Returns a zero-initialized string array.
#[no_mangle]
pub extern "C" fn rmw_hdds_graph_get_zero_initialized_string_array(
) -> rmw_hdds_graph_string_array_t {
    rmw_hdds_graph_string_array_t::zeroed()
}

/// Frees every entry and the array storage, leaving the array zeroed.
///
/// # Safety
/// `array` must be null or point to an array produced by this library (or
/// zero-initialized).
#[no_mangle]
pub unsafe extern "C" fn rmw_hdds_graph_string_array_fini(
    array: *mut rmw_hdds_graph_string_array_t,
) -> rmw_hdds_graph_ret_t {
    if array.is_null() {
        return RMW_RET_INVALID_ARGUMENT;
    }
    string_array_fini(&mut *array);
    RMW_RET_OK
}

/// Creates a node handle with its own graph context.
///
/// Returns null on invalid arguments.
///
/// # Safety
/// - `guid` must point to 16 readable bytes
/// - `name` and `namespace_` must be valid NUL-terminated UTF-8 C strings
/// - The returned node must be destroyed with `rmw_hdds_graph_node_destroy`
#[no_mangle]
pub unsafe extern "C" fn rmw_hdds_graph_node_create(
    guid: *const u8,
    name: *const c_char,
    namespace_: *const c_char,
) -> *mut rmw_hdds_graph_node_t {
    let config = init_env_config();

    if guid.is_null() || name.is_null() || namespace_.is_null() {
        log::error!("[ffi] rmw_hdds_graph_node_create: null argument");
        return ptr::null_mut();
    }

    let mut bytes = [0u8; 16];
    ptr::copy_nonoverlapping(guid, bytes.as_mut_ptr(), bytes.len());

    let (Ok(name), Ok(namespace_)) = (
        CStr::from_ptr(name).to_str(),
        CStr::from_ptr(namespace_).to_str(),
    ) else {
        log::error!("[ffi] rmw_hdds_graph_node_create: name is not valid UTF-8");
        return ptr::null_mut();
    };

    let guid = GUID::from_bytes(bytes);
    let context = match GraphContext::with_config(guid, name, namespace_, config) {
        Ok(context) => context,
        Err(err) => {
            log::error!("[ffi] rmw_hdds_graph_node_create: {}", err);
            return ptr::null_mut();
        }
    };

    let handle = Box::new(context.node_handle());
    Box::into_raw(Box::new(rmw_hdds_graph_node_t {
        implementation_identifier: IDENTIFIER_C.as_ptr().cast(),
        data: Box::into_raw(handle).cast(),
    }))
}

/// Destroys a node created by `rmw_hdds_graph_node_create`.
///
/// # Safety
/// `node` must be null or a pointer returned by `rmw_hdds_graph_node_create`
/// that was not destroyed yet.
#[no_mangle]
pub unsafe extern "C" fn rmw_hdds_graph_node_destroy(
    node: *mut rmw_hdds_graph_node_t,
) -> rmw_hdds_graph_ret_t {
    if let Err(err) = node_handle(node) {
        return err.to_ret();
    }
    let node = Box::from_raw(node);
    drop(Box::from_raw(node.data.cast::<NodeHandle>()));
    RMW_RET_OK
}

/// Lists every named node: index 0 is `node` itself.
///
/// Both arrays must be zero-initialized; on failure they stay zeroed.
///
/// # Safety
/// - `node` must be null or a live node from `rmw_hdds_graph_node_create`
/// - `node_names` and `node_namespaces` must be valid, writable pointers
#[no_mangle]
pub unsafe extern "C" fn rmw_hdds_graph_get_node_names(
    node: *const rmw_hdds_graph_node_t,
    node_names: *mut rmw_hdds_graph_string_array_t,
    node_namespaces: *mut rmw_hdds_graph_string_array_t,
) -> rmw_hdds_graph_ret_t {
    get_node_names_into(node, node_names, node_namespaces, c_string_dup, libc::free)
}

unsafe fn get_node_names_into<F>(
    node: *const rmw_hdds_graph_node_t,
    node_names: *mut rmw_hdds_graph_string_array_t,
    node_namespaces: *mut rmw_hdds_graph_string_array_t,
    dup: F,
    free: FreeFn,
) -> rmw_hdds_graph_ret_t
where
    F: FnMut(&str) -> Option<*mut c_char>,
{
    let handle = match node_handle(node) {
        Ok(handle) => handle,
        Err(err) => {
            log::error!("[ffi] rmw_hdds_graph_get_node_names: {}", err);
            return err.to_ret();
        }
    };
    if node_names.is_null() || node_namespaces.is_null() {
        return RMW_RET_INVALID_ARGUMENT;
    }
    if !(*node_names).is_zero() || !(*node_namespaces).is_zero() {
        log::error!("[ffi] rmw_hdds_graph_get_node_names: output array is not zero initialized");
        return RMW_RET_ERROR;
    }

    match collect_node_names(handle, dup, free) {
        Ok((names, namespaces)) => {
            *node_names = names.release();
            *node_namespaces = namespaces.release();
            RMW_RET_OK
        }
        Err(err) => {
            log::error!("[ffi] rmw_hdds_graph_get_node_names: {}", err);
            err.to_ret()
        }
    }
}

fn collect_node_names<F>(
    handle: &NodeHandle,
    mut dup: F,
    free: FreeFn,
) -> Result<(CStringArrayGuard, CStringArrayGuard), Error>
where
    F: FnMut(&str) -> Option<*mut c_char>,
{
    let mut names = StringArray::zeroed();
    let mut namespaces = StringArray::zeroed();
    query::get_node_names(Some(handle), &mut names, &mut namespaces)?;

    let names = CStringArrayGuard::from_strings_with(names.as_slice(), &mut dup, free)?;
    let namespaces = CStringArrayGuard::from_strings_with(namespaces.as_slice(), &mut dup, free)?;
    Ok((names, namespaces))
}
