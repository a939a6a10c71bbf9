//! User-data content type detection
//!
//! Detects the type of a raw user-data payload based on magic bytes,
//! header lines, or content.

use std::fmt;

/// Payload types a provisioning agent may receive as user-data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    /// Cloud-config YAML (#cloud-config)
    CloudConfig,
    /// Shell script (#!)
    Script,
    /// Cloud boothook (runs very early)
    CloudBoothook,
    /// Include file (list of URLs to fetch)
    IncludeUrl,
    /// Jinja template (## template: jinja)
    JinjaTemplate,
    /// MIME multipart message
    Multipart,
    /// Gzip compressed data
    Gzip,
    /// Base64 encoded data
    Base64,
    /// Unknown/binary data
    Unknown,
}

impl ContentType {
    /// MIME type string for this content type
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::CloudConfig => "text/cloud-config",
            Self::Script => "text/x-shellscript",
            Self::CloudBoothook => "text/cloud-boothook",
            Self::IncludeUrl => "text/x-include-url",
            Self::JinjaTemplate => "text/jinja2",
            Self::Multipart => "multipart/mixed",
            Self::Gzip => "application/x-gzip",
            Self::Base64 => "text/plain",
            Self::Unknown => "application/octet-stream",
        }
    }

    /// Detect content type from raw bytes
    pub fn detect(data: &[u8]) -> Self {
        if data.len() >= 2 && data[0] == 0x1f && data[1] == 0x8b {
            return Self::Gzip;
        }

        match std::str::from_utf8(data) {
            Ok(text) => Self::detect_from_text(text),
            Err(_) => Self::Unknown,
        }
    }

    /// Detect content type from text content
    pub fn detect_from_text(text: &str) -> Self {
        let trimmed = text.trim_start();

        if trimmed.starts_with("#cloud-config") {
            return Self::CloudConfig;
        }
        if trimmed.starts_with("## template: jinja") || trimmed.starts_with("## template:jinja") {
            return Self::JinjaTemplate;
        }
        if trimmed.starts_with("#cloud-boothook") {
            return Self::CloudBoothook;
        }
        if trimmed.starts_with("#include") {
            return Self::IncludeUrl;
        }
        if trimmed.starts_with("#!") {
            return Self::Script;
        }
        if (trimmed.starts_with("Content-Type:") || trimmed.starts_with("MIME-Version:"))
            && trimmed.contains("multipart/")
        {
            return Self::Multipart;
        }

        // YAML without the header is still accepted as cloud-config
        if looks_like_yaml(trimmed) {
            return Self::CloudConfig;
        }
        if looks_like_base64(trimmed.as_bytes()) {
            return Self::Base64;
        }

        Self::Unknown
    }

    /// Whether this payload can be handed to the loader as-is
    pub fn is_cloud_config(&self) -> bool {
        matches!(self, Self::CloudConfig)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mime_type())
    }
}

/// Check if data looks like base64 encoded content
fn looks_like_base64(data: &[u8]) -> bool {
    // Base64 only contains A-Z, a-z, 0-9, +, /, =, and whitespace
    let all_valid = data.iter().all(|&b| {
        b.is_ascii_alphanumeric() || b == b'+' || b == b'/' || b == b'=' || b.is_ascii_whitespace()
    });
    if !all_valid || data.iter().all(u8::is_ascii_whitespace) {
        return false;
    }

    // Words separated by single spaces are prose, not base64
    let has_word_spaces = data
        .windows(3)
        .any(|w| w[0].is_ascii_alphabetic() && w[1] == b' ' && w[2].is_ascii_alphabetic());

    !has_word_spaces
}

/// Check if text looks like YAML content
fn looks_like_yaml(text: &str) -> bool {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .any(|line| line.contains(": ") || line.ends_with(':') || line.starts_with("- ") || line == "---")
}
