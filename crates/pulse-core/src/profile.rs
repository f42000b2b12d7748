//! Browser header profile attached to the session handshake and the stats
//! request.
//!
//! The scoring service only accepts clients that look like its dashboard, so
//! every outbound request carries this fixed set. `accept-encoding` is left
//! out: the HTTP client is built without decompression support.

/// Origin of the dashboard the node emulates.
pub const DASHBOARD_ORIGIN: &str = "https://dashboard.teneo.pro";

/// Fixed header set, in the order the browser sends it.
pub const BROWSER_HEADERS: &[(&str, &str)] = &[
    ("accept", "application/json, text/plain, */*"),
    ("accept-language", "id-ID"),
    ("cache-control", "no-cache"),
    ("origin", DASHBOARD_ORIGIN),
    ("pragma", "no-cache"),
    ("priority", "u=1, i"),
    ("referer", "https://dashboard.teneo.pro/"),
    ("sec-ch-ua", "\"Chromium\";v=\"127\", \"Not)A;Brand\";v=\"99\""),
    ("sec-ch-ua-mobile", "?0"),
    ("sec-ch-ua-platform", "\"Linux\""),
    ("sec-fetch-dest", "empty"),
    ("sec-fetch-mode", "cors"),
    ("sec-fetch-site", "same-site"),
    (
        "user-agent",
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36",
    ),
];

/// `authorization` header value for the stats API.
pub fn bearer(access_token: &str) -> String {
    format!("Bearer {access_token}")
}
