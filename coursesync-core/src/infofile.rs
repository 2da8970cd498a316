//! A parsed info file together with the problems found while loading it.
//!
//! Loading never fails because of bad course content: an unreadable or
//! invalid document becomes an [`InfoFile`] carrying errors, so the sync can
//! preserve existing state instead of aborting.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoFile<T> {
    /// UUID recovered from the document, even when the rest failed to parse.
    pub uuid: Option<String>,
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl<T> InfoFile<T> {
    pub fn new(uuid: impl Into<String>, data: T) -> Self {
        Self {
            uuid: Some(uuid.into()),
            data: Some(data),
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn from_error(message: impl Into<String>) -> Self {
        Self {
            uuid: None,
            data: None,
            errors: vec![message.into()],
            warnings: Vec::new(),
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Data is only trusted when the document loaded without errors.
    pub fn valid_data(&self) -> Option<&T> {
        if self.has_errors() {
            None
        } else {
            self.data.as_ref()
        }
    }
}

/// `true` if `value` has the 8-4-4-4-12 hex layout of a UUID.
pub fn is_uuid(value: &str) -> bool {
    let groups: Vec<&str> = value.split('-').collect();
    let expected = [8, 4, 4, 4, 12];
    groups.len() == expected.len()
        && groups
            .iter()
            .zip(expected)
            .all(|(group, len)| group.len() == len && group.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Scan raw (possibly malformed) JSON text for `"uuid": "<uuid>"` pairs.
pub fn find_uuids(contents: &str) -> Vec<String> {
    let mut found = Vec::new();
    let mut rest = contents;
    while let Some(idx) = rest.find("\"uuid\"") {
        rest = &rest[idx + "\"uuid\"".len()..];
        let after_colon = rest.trim_start().strip_prefix(':').map(str::trim_start);
        let Some(value) = after_colon.and_then(|s| s.strip_prefix('"')) else {
            continue;
        };
        if let Some(candidate) = value.get(..36) {
            if is_uuid(candidate) && value[36..].starts_with('"') {
                found.push(candidate.to_string());
            }
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_error_has_errors_and_no_data() {
        let info = InfoFile::<()>::from_error("UUID is missing");
        assert!(info.has_errors());
        assert!(info.valid_data().is_none());
    }

    #[test]
    fn valid_data_hidden_when_errors_present() {
        let mut info = InfoFile::new("5ff4b1a1-4a9c-4b9e-8c5a-0d5e5a1b2c3d", 7);
        assert_eq!(info.valid_data(), Some(&7));
        info.add_error("bad");
        assert_eq!(info.valid_data(), None);
        assert_eq!(info.data, Some(7));
    }

    #[test]
    fn uuid_layout_check() {
        assert!(is_uuid("5ff4b1a1-4a9c-4b9e-8c5a-0d5e5a1b2c3d"));
        assert!(is_uuid("5FF4B1A1-4A9C-4B9E-8C5A-0D5E5A1B2C3D"));
        assert!(!is_uuid("5ff4b1a1-4a9c-4b9e-8c5a"));
        assert!(!is_uuid("zzf4b1a1-4a9c-4b9e-8c5a-0d5e5a1b2c3d"));
    }

    #[test]
    fn find_uuids_in_broken_json() {
        let text = r#"{ "uuid" : "5ff4b1a1-4a9c-4b9e-8c5a-0d5e5a1b2c3d", "title": "#;
        assert_eq!(find_uuids(text), vec!["5ff4b1a1-4a9c-4b9e-8c5a-0d5e5a1b2c3d"]);
        assert!(find_uuids(r#"{"title": "x"#).is_empty());
    }
}
