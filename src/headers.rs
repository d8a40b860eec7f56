//! Header names, a small ordered header map, and content-type helpers.
//!
//! The batch wire format only touches a handful of headers; a `Vec`-backed
//! map with case-insensitive lookup keeps insertion order for bit-exact
//! output and avoids pulling a full HTTP stack into the framing layer.

/// `Content-Type` header name.
pub const CONTENT_TYPE: &str = "Content-Type";
/// `Content-Transfer-Encoding` header name.
pub const CONTENT_TRANSFER_ENCODING: &str = "Content-Transfer-Encoding";
/// `Content-ID` header name.
pub const CONTENT_ID: &str = "Content-ID";
/// `Content-Length` header name.
pub const CONTENT_LENGTH: &str = "Content-Length";
/// `Location` header name, carried by async (202) responses.
pub const LOCATION: &str = "Location";
/// `OData-Version` header name.
pub const ODATA_VERSION: &str = "OData-Version";
/// `Prefer` header name.
pub const PREFER: &str = "Prefer";

/// Media type of a wrapped request or response part.
pub const APPLICATION_HTTP: &str = "application/http";
/// Media type of a multipart body.
pub const MULTIPART_MIXED: &str = "multipart/mixed";
/// Transfer encoding used for wrapped parts.
pub const BINARY: &str = "binary";
/// Preference token enabling continue-on-error changeset processing.
pub const CONTINUE_ON_ERROR: &str = "odata.continue-on-error";

/// An ordered list of header name/value pairs with case-insensitive lookup.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// Create an empty header list.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Append a header, keeping insertion order.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// First value for `name`, compared case-insensitively.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Whether a header with `name` is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool { self.get(name).is_some() }

    /// Iterate over all entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize { self.entries.len() }

    /// Whether the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}

/// Extract the `boundary` parameter from a `Content-Type` value.
///
/// Accepts both quoted and unquoted parameter forms and ignores parameter
/// name case.
#[must_use]
pub fn boundary_parameter(content_type: &str) -> Option<&str> {
    for param in content_type.split(';').skip(1) {
        let Some((name, value)) = param.trim().split_once('=') else {
            continue;
        };
        if name.trim().eq_ignore_ascii_case("boundary") {
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value);
            if value.is_empty() {
                return None;
            }
            return Some(value);
        }
    }
    None
}

/// Whether a content type names the given media type, ignoring parameters.
#[must_use]
pub fn is_media_type(content_type: &str, media_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .is_some_and(|t| t.trim().eq_ignore_ascii_case(media_type))
}
