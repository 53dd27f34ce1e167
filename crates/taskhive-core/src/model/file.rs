use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Global per-file size cap (10 MB).
pub const MAX_FILE_SIZE: i64 = 10 * 1024 * 1024;

/// Content types rejected everywhere, regardless of category.
pub const DANGEROUS_CONTENT_TYPES: &[&str] = &[
    "application/x-executable",
    "application/x-msdownload",
    "application/octet-stream",
    "application/x-dosexec",
];

pub const MAX_FILENAME_LENGTH: usize = 255;
pub const MAX_CONTENT_TYPE_LENGTH: usize = 100;

/// Field-keyed validation failures, serialized as `{"errors":{field:[...]}}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldErrors(pub BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileAttachment {
    pub id: i64,
    pub original_filename: String,
    /// Unique server-side name: `{uuid}_{unix-timestamp}{ext}`.
    pub storage_filename: String,
    pub content_type: String,
    pub file_size: i64,
    pub file_url: String,
    pub user_id: Option<i64>,
    pub category_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAttachmentInput {
    pub original_filename: String,
    pub content_type: String,
    pub file_size: i64,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub category_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileCategory {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Empty list means any non-dangerous content type is allowed.
    #[serde(default)]
    pub allowed_file_types: Vec<String>,
    pub max_file_size: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl FileCategory {
    pub fn allows_content_type(&self, content_type: &str) -> bool {
        self.allowed_file_types.is_empty()
            || self.allowed_file_types.iter().any(|t| t == content_type)
    }

    pub fn allows_file_size(&self, file_size: i64) -> bool {
        self.max_file_size.is_none_or(|max| file_size <= max)
    }
}

/// Validate an attachment against global limits and its category's
/// allow-list, collecting failures per field.
pub fn validate_attachment(
    input: &CreateAttachmentInput,
    category: Option<&FileCategory>,
) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::default();

    if input.original_filename.trim().is_empty() {
        errors.add("original_filename", "can't be blank");
    } else if input.original_filename.len() > MAX_FILENAME_LENGTH {
        errors.add(
            "original_filename",
            format!("is too long (maximum is {MAX_FILENAME_LENGTH} characters)"),
        );
    }

    if input.content_type.trim().is_empty() {
        errors.add("content_type", "can't be blank");
    } else if input.content_type.len() > MAX_CONTENT_TYPE_LENGTH {
        errors.add(
            "content_type",
            format!("is too long (maximum is {MAX_CONTENT_TYPE_LENGTH} characters)"),
        );
    } else if DANGEROUS_CONTENT_TYPES.contains(&input.content_type.as_str()) {
        errors.add("content_type", "is not an allowed file type");
    }

    if input.file_size <= 0 {
        errors.add("file_size", "must be greater than 0");
    } else if input.file_size > MAX_FILE_SIZE {
        errors.add("file_size", "can't exceed 10MB");
    }

    if let Some(category) = category {
        if !input.content_type.is_empty() && !category.allows_content_type(&input.content_type) {
            errors.add("content_type", "is not allowed for this category");
        }
        if input.file_size > 0 && !category.allows_file_size(input.file_size) {
            let max_mb = category.max_file_size.unwrap_or(MAX_FILE_SIZE) as f64 / 1048576.0;
            errors.add(
                "file_size",
                format!("can't exceed {max_mb:.1}MB for this category"),
            );
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Server-side filename for stored content, unique per upload.
pub fn generate_storage_filename(original: &str, now: DateTime<Utc>) -> String {
    let extension = original
        .rsplit_once('.')
        .map(|(_, ext)| format!(".{ext}"))
        .unwrap_or_default();
    format!("{}_{}{}", Uuid::new_v4(), now.timestamp(), extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(filename: &str, content_type: &str, size: i64) -> CreateAttachmentInput {
        CreateAttachmentInput {
            original_filename: filename.to_string(),
            content_type: content_type.to_string(),
            file_size: size,
            file_url: None,
            user_id: Some(1),
            category_id: None,
        }
    }

    fn category(allowed: &[&str], max: Option<i64>) -> FileCategory {
        FileCategory {
            id: 1,
            name: "docs".to_string(),
            description: String::new(),
            allowed_file_types: allowed.iter().map(|s| s.to_string()).collect(),
            max_file_size: max,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn valid_attachment_passes() {
        assert!(validate_attachment(&input("report.pdf", "application/pdf", 1024), None).is_ok());
    }

    #[test]
    fn dangerous_content_type_rejected() {
        let errors =
            validate_attachment(&input("evil.exe", "application/x-msdownload", 10), None)
                .unwrap_err();
        assert!(errors.0.contains_key("content_type"));
    }

    #[test]
    fn oversized_file_rejected() {
        let errors =
            validate_attachment(&input("big.bin", "image/png", MAX_FILE_SIZE + 1), None)
                .unwrap_err();
        assert!(errors.0["file_size"][0].contains("10MB"));
    }

    #[test]
    fn zero_size_rejected() {
        let errors = validate_attachment(&input("empty.txt", "text/plain", 0), None).unwrap_err();
        assert!(errors.0.contains_key("file_size"));
    }

    #[test]
    fn category_allow_list_enforced() {
        let cat = category(&["image/png"], None);
        assert!(validate_attachment(&input("a.png", "image/png", 10), Some(&cat)).is_ok());
        let errors =
            validate_attachment(&input("a.pdf", "application/pdf", 10), Some(&cat)).unwrap_err();
        assert!(errors.0["content_type"][0].contains("category"));
    }

    #[test]
    fn category_size_limit_enforced() {
        let cat = category(&[], Some(1024));
        let errors = validate_attachment(&input("a.png", "image/png", 2048), Some(&cat)).unwrap_err();
        assert!(errors.0.contains_key("file_size"));
    }

    #[test]
    fn empty_category_list_allows_anything_safe() {
        let cat = category(&[], None);
        assert!(cat.allows_content_type("image/webp"));
    }

    #[test]
    fn storage_filename_keeps_extension_and_is_unique() {
        let now = Utc::now();
        let a = generate_storage_filename("photo.jpg", now);
        let b = generate_storage_filename("photo.jpg", now);
        assert!(a.ends_with(".jpg"));
        assert_ne!(a, b);
    }
}
