//! Content type resolution for artifacts

use std::path::Path;

use artifact_core::constants::DEFAULT_CONTENT_TYPE;

/// Determines the MIME type recorded for each artifact.
///
/// A non-empty override is applied verbatim to every file. Otherwise the type is
/// looked up from the file extension; file contents are never inspected.
#[derive(Clone, Debug, Default)]
pub struct ContentTypeResolver {
    content_type_override: Option<String>,
}

impl ContentTypeResolver {
    pub fn new(content_type_override: Option<String>) -> Self {
        Self {
            content_type_override: content_type_override
                .map(|ct| ct.trim().to_string())
                .filter(|ct| !ct.is_empty()),
        }
    }

    pub fn resolve(&self, path: &Path) -> String {
        if let Some(ref content_type) = self.content_type_override {
            return content_type.clone();
        }

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        content_type_for_extension(&extension)
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string()
    }
}

fn content_type_for_extension(extension: &str) -> Option<&'static str> {
    let content_type = match extension {
        // Text and logs
        "txt" | "log" | "out" | "text" | "conf" | "cfg" | "ini" => "text/plain",
        "csv" => "text/csv",
        "tsv" => "text/tab-separated-values",
        "md" | "markdown" => "text/markdown",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "rtf" => "application/rtf",
        "xml" | "xsd" | "xsl" => "application/xml",
        "json" | "map" => "application/json",
        "jsonl" | "ndjson" => "application/x-ndjson",
        "yaml" | "yml" => "application/yaml",
        "toml" => "application/toml",
        "diff" | "patch" => "text/x-diff",
        // Source and scripts
        "js" | "mjs" | "cjs" => "text/javascript",
        "ts" | "mts" | "cts" => "text/typescript",
        "sh" | "bash" => "application/x-sh",
        "py" => "text/x-python",
        "rs" => "text/rust",
        "go" => "text/x-go",
        "java" => "text/x-java-source",
        "c" | "h" => "text/x-c",
        "cpp" | "cc" | "hpp" => "text/x-c++",
        "rb" => "text/x-ruby",
        "sql" => "application/sql",
        // Images
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "ico" => "image/x-icon",
        // Video and audio
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "flac" => "audio/flac",
        // Fonts
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        // Documents
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "odt" => "application/vnd.oasis.opendocument.text",
        "ods" => "application/vnd.oasis.opendocument.spreadsheet",
        "epub" => "application/epub+zip",
        // Archives and packages
        "zip" => "application/zip",
        "gz" | "tgz" => "application/gzip",
        "tar" => "application/x-tar",
        "bz2" => "application/x-bzip2",
        "xz" => "application/x-xz",
        "zst" => "application/zstd",
        "7z" => "application/x-7z-compressed",
        "rar" => "application/vnd.rar",
        "jar" | "war" | "ear" => "application/java-archive",
        "apk" => "application/vnd.android.package-archive",
        "deb" => "application/vnd.debian.binary-package",
        "rpm" => "application/x-rpm",
        "dmg" => "application/x-apple-diskimage",
        "iso" => "application/x-iso9660-image",
        "exe" | "dll" => "application/vnd.microsoft.portable-executable",
        "msi" => "application/x-msdownload",
        "wasm" => "application/wasm",
        _ => return None,
    };
    Some(content_type)
}
