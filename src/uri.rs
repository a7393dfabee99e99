//! Object addresses.
//!
//! An upload is sent to an [`ObjectUri`], the pair of a [`Bucket`] and an
//! object [`Key`]. Keys are usually built from a [`KeyPrefix`], the data path
//! under which all uploaded files land, and the name of the local file.
//!
//! # Example
//!
//! ```rust
//! use s3_file_upload::uri::{KeyPrefix, ObjectUri};
//!
//! let prefix = KeyPrefix::from("/simulator/data/");
//! let uri = ObjectUri::new("my-bucket".into(), prefix.to_key("25mb.json"));
//!
//! assert_eq!(uri.to_string(), "s3://my-bucket/simulator/data/25mb.json");
//! ```
use std::borrow::Cow;
use std::fmt::{self, Formatter};
use std::ops::Deref;

/// The address of an uploaded object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ObjectUri {
    /// The bucket for the object.
    ///
    /// This should be the plain bucket name, e.g., "my-s3-bucket".
    pub bucket: Bucket,
    /// The full key of this object within the bucket.
    pub key: Key,
}

impl ObjectUri {
    /// Create a new `ObjectUri` from bucket and object key.
    pub fn new(bucket: Bucket, key: Key) -> Self {
        Self { bucket, key }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.bucket.is_empty() || self.key.is_empty()
    }
}

impl fmt::Display for ObjectUri {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", &self.bucket, &self.key)
    }
}

impl<T: Into<Bucket>, U: Into<Key>> From<(T, U)> for ObjectUri {
    fn from((b, k): (T, U)) -> Self {
        ObjectUri::new(b.into(), k.into())
    }
}

/// The destination bucket for an upload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Bucket(Cow<'static, str>);

impl Bucket {
    /// Create a new `Bucket`.
    pub fn new<T: Into<Cow<'static, str>>>(bucket: T) -> Self {
        let bucket: Cow<'static, str> = bucket.into();
        match bucket.strip_suffix("/") {
            Some(v) => v.to_string().into(),
            _ => Self(bucket),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Deref for Bucket {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<&str> for Bucket {
    fn from(value: &str) -> Self {
        Self::new(value.to_string())
    }
}

impl From<String> for Bucket {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// The key within the associated bucket for this object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Key(Cow<'static, str>);

impl Key {
    /// Create a new object `Key`.
    pub fn new<T: Into<Cow<'static, str>>>(key: T) -> Self {
        Self(key.into())
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Deref for Key {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Self::new(value.to_string())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Self(Cow::Owned(value))
    }
}

/// A prefix of object keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct KeyPrefix(Cow<'static, str>);

impl KeyPrefix {
    /// Create a new object key prefix.
    ///
    /// Normalized to end with a single `'/'` and have no leading `'/'`. An
    /// empty prefix stays empty, so keys built from it are the bare suffix.
    pub fn new<T: Into<Cow<'static, str>>>(prefix: T) -> Self {
        let raw: Cow<'static, str> = prefix.into();
        let trimmed = raw.trim_matches('/');
        if trimmed.is_empty() {
            return Self(Cow::Borrowed(""));
        }
        Self(format!("{trimmed}/").into())
    }

    /// Create an object [`Key`] with this prefix and the given suffix.
    pub fn to_key(&self, suffix: &str) -> Key {
        format!("{self}{}", suffix.trim_start_matches('/')).into()
    }
}

impl Deref for KeyPrefix {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyPrefix {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<&str> for KeyPrefix {
    fn from(value: &str) -> Self {
        Self::new(value.to_string())
    }
}

impl From<String> for KeyPrefix {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_is_normalized() {
        assert_eq!(&*KeyPrefix::from("a/b"), "a/b/");
        assert_eq!(&*KeyPrefix::from("//a/b//"), "a/b/");
        assert_eq!(&*KeyPrefix::from("/"), "");
    }

    #[test]
    fn keys_join_prefix_and_suffix() {
        let prefix = KeyPrefix::from("simulator/data");
        assert_eq!(&*prefix.to_key("25mb.json"), "simulator/data/25mb.json");
        assert_eq!(&*KeyPrefix::default().to_key("25mb.json"), "25mb.json");
    }

    #[test]
    fn bucket_drops_trailing_slash() {
        let uri = ObjectUri::from(("bucket/", "key"));
        assert_eq!(uri.to_string(), "s3://bucket/key");
        assert!(!uri.is_empty());
        assert!(ObjectUri::from(("", "key")).is_empty());
    }
}
