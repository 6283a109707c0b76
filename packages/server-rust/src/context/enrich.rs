//! Structured log enrichment from an inbound request.

use std::borrow::Cow;
use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use http::header::{HeaderMap, HeaderName, REFERER, USER_AGENT};
use http::request::Parts;
use http::Uri;
use percent_encoding::percent_decode_str;

use super::request_id::resolve_request_id;
use crate::logging::{LogField, LogKey, Logger};

static REMOTE_USER: HeaderName = HeaderName::from_static("remote-user");

/// Derives the structured log fields for a request.
///
/// Order is fixed: `request_id`, `method`, `uri`, `user_agent`,
/// `remote_addr`, `remote_user`, `referer`. Only `request_id` is always
/// present; every other field is omitted when its source is empty.
#[must_use]
pub fn request_fields(parts: &Parts) -> Vec<LogField> {
    let mut fields = Vec::with_capacity(7);
    let mut push = |key: LogKey, value: Option<Cow<'_, str>>| {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            fields.push(LogField::new(key, value.into_owned()));
        }
    };

    push(
        LogKey::RequestId,
        Some(Cow::Owned(resolve_request_id(&parts.headers))),
    );
    push(LogKey::Method, Some(Cow::Borrowed(parts.method.as_str())));
    push(LogKey::Uri, Some(request_uri(&parts.uri)));
    push(LogKey::UserAgent, header_value(&parts.headers, &USER_AGENT));
    push(
        LogKey::RemoteAddr,
        parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| Cow::Owned(addr.to_string())),
    );
    push(LogKey::RemoteUser, remote_user(parts));
    push(LogKey::Referer, header_value(&parts.headers, &REFERER));

    fields
}

/// Returns a child of `logger` carrying the request's fields.
///
/// `logger` itself is left untouched and stays usable unenriched.
#[must_use]
pub fn logger_with_request(logger: &Logger, parts: &Parts) -> Logger {
    logger.with_fields(request_fields(parts))
}

/// URL path, or the full request-target when the path is empty.
fn request_uri(uri: &Uri) -> Cow<'_, str> {
    match uri.path() {
        "" => Cow::Owned(uri.to_string()),
        path => Cow::Borrowed(path),
    }
}

/// Username from URL userinfo, falling back to the `Remote-User` header.
fn remote_user(parts: &Parts) -> Option<Cow<'_, str>> {
    url_username(&parts.uri)
        .filter(|u| !u.is_empty())
        .or_else(|| header_value(&parts.headers, &REMOTE_USER))
}

/// Percent-decoded username of the URL userinfo.
fn url_username(uri: &Uri) -> Option<Cow<'_, str>> {
    let (userinfo, _host) = uri.authority()?.as_str().rsplit_once('@')?;
    let user = userinfo.split_once(':').map_or(userinfo, |(user, _password)| user);
    Some(percent_decode_str(user).decode_utf8_lossy())
}

/// First value of `name`, decoded lossily so opaque bytes still get logged.
fn header_value<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<Cow<'a, str>> {
    headers
        .get(name)
        .map(|v| String::from_utf8_lossy(v.as_bytes()))
}
