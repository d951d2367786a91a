//! HTTP status code resolution.
//!
//! Response annotations name their status either numerically (`401`, `"401"`)
//! or by the framework's enum member (`Unauthorized`, `HttpStatusCode.NotFound`).

use serde_json::Value;

/// Named status codes, keyed by the lowercased member name.
const STATUS_NAMES: &[(&str, u16)] = &[
    ("continue", 100),
    ("switchingprotocols", 101),
    ("ok", 200),
    ("created", 201),
    ("accepted", 202),
    ("nonauthoritativeinformation", 203),
    ("nocontent", 204),
    ("resetcontent", 205),
    ("partialcontent", 206),
    ("multiplechoices", 300),
    ("movedpermanently", 301),
    ("found", 302),
    ("redirect", 302),
    ("seeother", 303),
    ("notmodified", 304),
    ("temporaryredirect", 307),
    ("permanentredirect", 308),
    ("badrequest", 400),
    ("unauthorized", 401),
    ("paymentrequired", 402),
    ("forbidden", 403),
    ("notfound", 404),
    ("methodnotallowed", 405),
    ("notacceptable", 406),
    ("requesttimeout", 408),
    ("conflict", 409),
    ("gone", 410),
    ("lengthrequired", 411),
    ("preconditionfailed", 412),
    ("requestentitytoolarge", 413),
    ("unsupportedmediatype", 415),
    ("unprocessableentity", 422),
    ("locked", 423),
    ("toomanyrequests", 429),
    ("internalservererror", 500),
    ("notimplemented", 501),
    ("badgateway", 502),
    ("serviceunavailable", 503),
    ("gatewaytimeout", 504),
];

/// Resolve a status from a JSON number, a digit string or a status name.
///
/// Returns `None` for anything outside 100..=599 or an unknown name.
pub fn parse_status(value: &Value) -> Option<u16> {
    match value {
        Value::Number(n) => n.as_u64().and_then(in_range),
        Value::String(s) => parse_status_str(s),
        _ => None,
    }
}

/// Resolve a status from its textual form.
pub fn parse_status_str(s: &str) -> Option<u16> {
    let s = s.trim();
    if let Ok(code) = s.parse::<u64>() {
        return in_range(code);
    }

    let name = crate::model::last_segment(s).to_lowercase();
    STATUS_NAMES
        .iter()
        .find(|(candidate, _)| *candidate == name)
        .map(|(_, code)| *code)
}

fn in_range(code: u64) -> Option<u16> {
    (100..=599).contains(&code).then_some(code as u16)
}
