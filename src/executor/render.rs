//! Table and describe rendering for upstreams

use crate::domain::Upstream;
use unicode_width::UnicodeWidthStr;

/// Render upstreams as a two-column `NAME | TYPE` table.
///
/// Starts with an empty line and always includes the header, even when
/// there are no rows.
pub fn render_table(upstreams: &[Upstream]) -> String {
    let mut rows: Vec<(String, &str)> = vec![(" NAME".to_string(), "TYPE")];
    rows.extend(upstreams.iter().map(|u| (format!(" {}", u.name), u.upstream_type.as_str())));

    let width = rows.iter().map(|(name, _)| name.width()).max().unwrap_or(0) + 1;

    let mut out = String::from("\n");
    for (name, upstream_type) in rows {
        let padding = " ".repeat(width - name.width());
        out.push_str(&format!("{}{}| {}\n", name, padding, upstream_type));
    }
    out
}

/// Pretty JSON for a single upstream.
pub fn render_describe(upstream: &Upstream) -> serde_json::Result<String> {
    serde_json::to_string_pretty(upstream)
}
