use clb_core::{Media, UNKNOWN_MIME_TYPE};
use url::Url;

/// Guesses a mime type from the extension of the URI's path.
///
/// ```
/// use clb_translator::media::mime_type_for;
///
/// assert_eq!(mime_type_for("https://cdn.example.com/a/cat.PNG?size=2"), "image/png");
/// assert_eq!(mime_type_for("https://cdn.example.com/stream"), "application/unknown");
/// ```
pub fn mime_type_for(uri: &str) -> String {
    let path = match Url::parse(uri) {
        Ok(url) => url.path().to_string(),
        Err(_) => uri.split(['?', '#']).next().unwrap_or(uri).to_string(),
    };
    mime_guess::from_path(&path)
        .first_raw()
        .unwrap_or(UNKNOWN_MIME_TYPE)
        .to_string()
}

pub fn media_from_uri(uri: &str) -> Media {
    Media {
        media_uri: uri.to_string(),
        mime_type: mime_type_for(uri),
        alt_text: None,
    }
}
