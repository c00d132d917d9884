// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

// Identifiers handed to libdevmapper are checked here first, so that a bad
// value yields a descriptive error instead of the library's bare failure.

// Evaluates to an error string if the value does not match the requirements.
// Non-ASCII values are allowed; libdevmapper mangles them.
macro_rules! str_check {
    ($value:expr, $max_allowed_bytes:expr, $forbidden:expr) => {{
        let value: &str = $value;
        let max_allowed_bytes: usize = $max_allowed_bytes;
        let forbidden: &[char] = $forbidden;
        if value.is_empty() {
            Some("value has zero characters".to_string())
        } else if value.len() > max_allowed_bytes {
            Some(format!(
                "value {} has {} bytes which is greater than maximum allowed {}",
                value,
                value.len(),
                max_allowed_bytes
            ))
        } else if value.contains('\0') {
            Some(format!("value {:?} contains a NUL byte", value))
        } else if let Some(c) = value.chars().find(|c| forbidden.contains(c)) {
            Some(format!("value {} may not contain {:?}", value, c))
        } else {
            None
        }
    }};
}

/// Define borrowed and owned versions of string types that guarantee
/// conformance to DM restrictions: non-empty, shorter than the native
/// buffer, no interior NUL and none of the `$forbidden` characters.
// This implementation follows the example of Path/PathBuf as closely as
// possible.
macro_rules! str_id {
    ($B:ident, $O:ident, $MAX:expr, $forbidden:expr, $err_func:ident) => {
        /// The borrowed version of the DM identifier.
        #[derive(Debug, PartialEq, Eq, Hash)]
        pub struct $B {
            inner: str,
        }

        /// The owned version of the DM identifier.
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $O {
            inner: String,
        }

        impl $B {
            /// Create a new borrowed identifier from a `&str`.
            pub fn new(value: &str) -> $crate::result::DmResult<&$B> {
                if let Some(err_msg) = str_check!(value, $MAX - 1, $forbidden) {
                    return Err($err_func(&err_msg));
                }
                Ok(unsafe { &*(value as *const str as *const $B) })
            }

            /// Get the inner value as a `&str`.
            pub fn as_str(&self) -> &str {
                &self.inner
            }

            /// Copy the value into a C string for the native library.
            pub fn to_cstring(&self) -> std::ffi::CString {
                // str_check rejected interior NUL bytes
                std::ffi::CString::new(self.inner.as_bytes()).unwrap_or_default()
            }
        }

        impl ToOwned for $B {
            type Owned = $O;
            fn to_owned(&self) -> $O {
                $O {
                    inner: self.inner.to_owned(),
                }
            }
        }

        impl std::fmt::Display for $B {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", &self.inner)
            }
        }

        impl $O {
            /// Construct a new owned identifier.
            pub fn new(value: String) -> $crate::result::DmResult<$O> {
                if let Some(err_msg) = str_check!(&value, $MAX - 1, $forbidden) {
                    return Err($err_func(&err_msg));
                }
                Ok($O { inner: value })
            }
        }

        impl std::ops::Deref for $O {
            type Target = $B;
            fn deref(&self) -> &$B {
                unsafe { &*(self.inner.as_str() as *const str as *const $B) }
            }
        }

        impl AsRef<$B> for $O {
            fn as_ref(&self) -> &$B {
                self
            }
        }

        impl std::borrow::Borrow<$B> for $O {
            fn borrow(&self) -> &$B {
                self
            }
        }
    };
}
