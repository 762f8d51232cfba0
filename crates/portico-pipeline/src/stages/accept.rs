//! Shared parsing of `Accept`-style weighted preference lists.

/// Parses a comma-separated preference list (`Accept`, `Accept-Encoding`)
/// into tokens ordered by q-value, highest first. Ties keep their written
/// order; entries with `q=0` are dropped.
pub(crate) fn parse_weighted(header: &str) -> Vec<String> {
    let mut entries: Vec<(String, f32, usize)> = header
        .split(',')
        .enumerate()
        .filter_map(|(position, raw)| {
            let mut parts = raw.trim().split(';');
            let token = parts.next()?.trim().to_ascii_lowercase();
            if token.is_empty() {
                return None;
            }
            let quality = parts
                .find_map(|param| {
                    let param = param.trim();
                    param.strip_prefix("q=").and_then(|q| q.parse::<f32>().ok())
                })
                .unwrap_or(1.0);
            if quality <= 0.0 {
                return None;
            }
            Some((token, quality, position))
        })
        .collect();
    entries.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.2.cmp(&b.2))
    });
    entries.into_iter().map(|(token, _, _)| token).collect()
}

/// Whether an accepted media-type token (possibly wildcarded) covers an
/// available media type.
pub(crate) fn media_matches(accepted: &str, available: &str) -> bool {
    if accepted == "*/*" || accepted == "*" {
        return true;
    }
    if let Some(prefix) = accepted.strip_suffix("/*") {
        return available
            .split('/')
            .next()
            .is_some_and(|main| main.eq_ignore_ascii_case(prefix));
    }
    accepted.eq_ignore_ascii_case(available)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_by_quality_then_position() {
        assert_eq!(
            parse_weighted("text/html;q=0.8, application/json, text/plain;q=0.9"),
            vec!["application/json", "text/plain", "text/html"]
        );
    }

    #[test]
    fn drops_zero_quality_entries() {
        assert_eq!(parse_weighted("gzip;q=0, deflate"), vec!["deflate"]);
    }

    #[test]
    fn wildcards_match() {
        assert!(media_matches("*/*", "application/json"));
        assert!(media_matches("application/*", "application/json"));
        assert!(!media_matches("text/*", "application/json"));
        assert!(media_matches("Application/JSON", "application/json"));
    }
}
