//! Media type negotiation and extension activation.

use http::header::{ACCEPT, CONTENT_TYPE};
use jsonapi_core::{MediaType, MediaTypeList};

use crate::error::Error;
use crate::request::JsonApiRequest;

/// Top-level query parameters defined by JSON:API. Keys containing anything
/// besides `a-z` are implementation-specific and always allowed.
pub const RESERVED_PARAMETERS: [&str; 5] = ["include", "fields", "filter", "page", "sort"];

/// Follows the JSON:API rule: an all-lowercase `a-z` name is reserved for
/// the base specification, so one outside the allow-list is rejected.
pub fn validate_query_params(request: &JsonApiRequest) -> Result<(), Error> {
    for key in request.query.keys() {
        let lowercase = key.bytes().all(|b| b.is_ascii_lowercase());
        if lowercase && !RESERVED_PARAMETERS.contains(&key.as_str()) {
            return Err(
                Error::bad_request(format!("Invalid query parameter [{key}]")).with_parameter(key.clone())
            );
        }
    }
    Ok(())
}

fn unsupported(raw: &str) -> Error {
    Error::unsupported_media_type(format!("Unsupported media type [{raw}]"))
}

/// The extensions active for this request, in registration order. An
/// extension is active only when both `Content-Type` and the chosen `Accept`
/// entry name it; an absent header names none.
pub fn negotiate<'a>(registered: &[&'a str], request: &JsonApiRequest) -> Result<Vec<&'a str>, Error> {
    let content = match request.header(CONTENT_TYPE) {
        None => None,
        Some(raw) => {
            let media = MediaType::parse(raw).map_err(|_| unsupported(raw))?;
            if !media.is_json_api() || !media.has_only_params(&["ext", "profile"]) {
                return Err(unsupported(raw));
            }
            let extensions = media.extensions();
            if let Some(unknown) = extensions.iter().find(|e| !registered.contains(&e.as_str())) {
                return Err(Error::unsupported_media_type(format!(
                    "Unsupported extension [{unknown}]"
                )));
            }
            Some(extensions)
        }
    };

    let accept = match request.header(ACCEPT) {
        None => None,
        Some(raw) => {
            let list = MediaTypeList::parse(raw).map_err(|_| Error::NotAcceptable)?;
            let chosen = list
                .iter()
                .find(|m| acceptable(m, registered))
                .ok_or(Error::NotAcceptable)?;
            Some(if chosen.is_json_api() {
                chosen.extensions()
            } else {
                Vec::new()
            })
        }
    };

    let named = |uri: &str, list: &Option<Vec<String>>| {
        list.as_ref().is_some_and(|l| l.iter().any(|e| e == uri))
    };
    Ok(registered
        .iter()
        .copied()
        .filter(|&uri| named(uri, &content) && named(uri, &accept))
        .collect())
}

fn acceptable(media: &MediaType, registered: &[&str]) -> bool {
    if media.is_wildcard() {
        return media.param("ext").is_none();
    }
    media.is_json_api()
        && media.has_only_params(&["ext", "profile", "q"])
        && media
            .extensions()
            .iter()
            .all(|e| registered.contains(&e.as_str()))
}
