use std::os::raw::c_void;

/// Opaque `mecab_t *`.
pub(crate) type MecabHandle = *mut c_void;
