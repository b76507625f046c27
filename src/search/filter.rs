//! Host query-language filter built from the search options
use crate::search::SearchOptions;

/// Response size cap when large responses are skipped (10 MiB)
pub const SMALL_RESPONSE_LIMIT: u64 = 10 * 1024 * 1024;
/// Response size cap otherwise (100 MiB)
pub const LARGE_RESPONSE_LIMIT: u64 = 100 * 1024 * 1024;

/// Binary and media extensions never worth scanning as text
pub const EXCLUDED_EXTENSIONS: [&str; 19] = [
    "png", "jpg", "jpeg", "gif", "bmp", "ico", "webp", "tiff", "woff", "woff2", "ttf", "otf",
    "eot", "mp3", "mp4", "wav", "avi", "mov", "webm",
];

/// Escape a value for the query language's double-quoted strings.
pub fn escape_quoted(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Build the filter expression that narrows which records the host returns.
///
/// All terms are joined into one AND chain; the raw-match terms for requests
/// and responses are OR-ed together inside it.
pub fn build_filter(pattern: &str, options: &SearchOptions) -> String {
    let escaped = escape_quoted(pattern);
    let mut terms = Vec::new();

    if let Some(custom) = options
        .custom_filter
        .as_deref()
        .map(str::trim)
        .filter(|custom| !custom.is_empty())
    {
        terms.push(format!("({custom})"));
    }

    let mut raw_terms = Vec::new();
    if options.include_requests {
        raw_terms.push(format!("req.raw.regex:\"{escaped}\""));
    }
    if options.include_responses {
        raw_terms.push(format!("resp.raw.regex:\"{escaped}\""));
    }
    match raw_terms.len() {
        0 => {}
        1 => terms.push(raw_terms.remove(0)),
        _ => terms.push(format!("({})", raw_terms.join(" OR "))),
    }

    let size_limit = if options.skip_large_responses {
        SMALL_RESPONSE_LIMIT
    } else {
        LARGE_RESPONSE_LIMIT
    };
    terms.push(format!("resp.len.lt:{size_limit}"));

    terms.extend(
        EXCLUDED_EXTENSIONS
            .iter()
            .map(|ext| format!("req.ext.ne:\".{ext}\"")),
    );

    terms.join(" AND ")
}
