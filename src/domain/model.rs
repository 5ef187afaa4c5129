use crate::utils::error::{Result, ShimError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{Cursor, Read, Seek, SeekFrom, Write};

/// Identity the hosting platform authenticated for the current request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub email: String,
    pub nickname: String,
}

impl Principal {
    pub fn new(email: impl Into<String>, nickname: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            nickname: nickname.into(),
        }
    }
}

/// Local user record, keyed by email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub email: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
}

/// Attributes for a user that does not exist yet; the repository assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub is_staff: bool,
    pub is_superuser: bool,
}

impl NewUser {
    pub fn regular(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            is_staff: false,
            is_superuser: false,
        }
    }

    pub fn superuser(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            is_staff: true,
            is_superuser: true,
        }
    }

    pub fn into_user(self, id: u64) -> User {
        User {
            id,
            username: self.username,
            email: self.email,
            is_staff: self.is_staff,
            is_superuser: self.is_superuser,
            is_active: true,
            date_joined: Utc::now(),
        }
    }
}

/// The user attached to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestUser {
    Anonymous,
    Authenticated(User),
}

impl RequestUser {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, RequestUser::Authenticated(_))
    }

    pub fn is_superuser(&self) -> bool {
        matches!(self, RequestUser::Authenticated(u) if u.is_superuser)
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            RequestUser::Authenticated(u) => Some(u),
            RequestUser::Anonymous => None,
        }
    }
}

/// Opaque handle returned by the managed blob service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlobKey(pub String);

impl BlobKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlobKey {
    fn from(s: &str) -> Self {
        BlobKey(s.to_string())
    }
}

/// Index record describing a stored blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobInfo {
    pub key: BlobKey,
    pub content_type: String,
    pub size: u64,
    pub filename: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Metadata returned by a HEAD-style lookup against an object backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    pub size: u64,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    ReadBinary,
    Append,
}

impl OpenMode {
    /// Parses the host framework's mode strings; nothing else is accepted.
    pub fn parse(mode: &str) -> Result<Self> {
        match mode {
            "r" => Ok(OpenMode::Read),
            "rb" => Ok(OpenMode::ReadBinary),
            "a" => Ok(OpenMode::Append),
            other => Err(ShimError::UnsupportedMode {
                mode: other.to_string(),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OpenMode::Read => "r",
            OpenMode::ReadBinary => "rb",
            OpenMode::Append => "a",
        }
    }

    pub fn is_read(&self) -> bool {
        matches!(self, OpenMode::Read | OpenMode::ReadBinary)
    }
}

impl std::str::FromStr for OpenMode {
    type Err = ShimError;

    fn from_str(s: &str) -> Result<Self> {
        OpenMode::parse(s)
    }
}

/// An opened stored object. Read modes expose the bytes from the start;
/// append mode starts at the end of the existing content.
#[derive(Debug, Clone)]
pub struct StoredFile {
    name: String,
    mode: OpenMode,
    content_type: Option<String>,
    cursor: Cursor<Vec<u8>>,
}

impl StoredFile {
    pub fn new(
        name: impl Into<String>,
        mode: OpenMode,
        content_type: Option<String>,
        data: Vec<u8>,
    ) -> Self {
        let mut cursor = Cursor::new(data);
        if mode == OpenMode::Append {
            cursor.set_position(cursor.get_ref().len() as u64);
        }
        Self {
            name: name.into(),
            mode,
            content_type,
            cursor,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn len(&self) -> usize {
        self.cursor.get_ref().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cursor.get_ref().is_empty()
    }

    pub fn contents(&self) -> &[u8] {
        self.cursor.get_ref()
    }

    pub fn into_contents(self) -> Vec<u8> {
        self.cursor.into_inner()
    }
}

impl Read for StoredFile {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.cursor.read(buf)
    }
}

impl Seek for StoredFile {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.cursor.seek(pos)
    }
}

impl Write for StoredFile {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if self.mode != OpenMode::Append {
            return Err(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                format!("{} was opened read-only", self.name),
            ));
        }
        self.cursor.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_mode_rejects_unknown_strings() {
        assert_eq!(OpenMode::parse("r").unwrap(), OpenMode::Read);
        assert_eq!("rb".parse::<OpenMode>().unwrap(), OpenMode::ReadBinary);
        assert_eq!(OpenMode::parse("a").unwrap(), OpenMode::Append);
        for bad in ["w", "wb", "r+", ""] {
            assert!(matches!(
                OpenMode::parse(bad),
                Err(ShimError::UnsupportedMode { .. })
            ));
        }
    }

    #[test]
    fn append_file_writes_after_existing_content() {
        let mut file = StoredFile::new("log.txt", OpenMode::Append, None, b"abc".to_vec());
        file.write_all(b"def").unwrap();
        assert_eq!(file.contents(), b"abcdef");
    }

    #[test]
    fn read_file_rejects_writes() {
        let mut file = StoredFile::new("a.png", OpenMode::Read, None, b"png".to_vec());
        assert!(file.write_all(b"x").is_err());
        let mut out = String::new();
        file.read_to_string(&mut out).unwrap();
        assert_eq!(out, "png");
    }

    #[test]
    fn superuser_flag_reads_through_request_user() {
        let user = NewUser::superuser("root", "root@example.com").into_user(1);
        assert!(RequestUser::Authenticated(user).is_superuser());
        assert!(!RequestUser::Anonymous.is_authenticated());
    }
}
