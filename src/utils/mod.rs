use crate::domain::SearchResult;

/// Sanitize filename to remove invalid characters
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            _ => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// `video_720p.mp4`, with the extension taken from the MIME subtype.
pub fn suggested_filename(result: &SearchResult) -> String {
    let extension = result
        .mime_type
        .split_once('/')
        .map(|(_, subtype)| subtype.split(';').next().unwrap_or(subtype).trim())
        .filter(|ext| !ext.is_empty())
        .unwrap_or("mp4");

    let name = format!("video_{}.{}", result.quality, extension);
    sanitize_filename(&name)
        .trim_matches(|c| c == '.' || c == ' ')
        .to_string()
}
