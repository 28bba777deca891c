//! `Accept-Language` parsing and candidate-locale negotiation.
//!
//! Pure in-memory computation; the site resolver runs this against the
//! candidate sites' configured locales.

/// Parse an `Accept-Language` header into normalized locales, most preferred
/// first.
///
/// Entries are split on commas with an optional `;q=` weight (default `1.0`,
/// bare `*` weighted `0.0`). Subtags are normalized (primary lowercased,
/// region uppercased, legacy `i-` prefixes stripped) and joined with `_`.
/// Sorting by descending weight is stable, so equal weights keep header
/// order.
pub fn parse_accept_language(header: &str) -> Vec<String> {
    let mut languages: Vec<(String, f32)> = header
        .split(',')
        .filter_map(|item| {
            let item = item.trim();
            if item.is_empty() {
                return None;
            }

            let (tag, quality) = match item.split_once(";q=") {
                Some((tag, q)) => (tag.trim(), q.trim().parse::<f32>().unwrap_or(1.0)),
                None if item == "*" => (item, 0.0),
                None => (item, 1.0),
            };

            let mut subtags: Vec<String> = tag.split('-').map(str::to_string).collect();
            // Legacy tags registered with the i- prefix, such as i-cherokee.
            if subtags.len() > 1 && subtags[0].eq_ignore_ascii_case("i") {
                subtags.remove(0);
            }
            subtags[0] = subtags[0].to_ascii_lowercase();
            if subtags.len() > 1 {
                subtags[1] = subtags[1].to_ascii_uppercase();
            }

            Some((subtags.join("_"), quality))
        })
        .collect();

    languages.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    languages.into_iter().map(|(tag, _)| tag).collect()
}

/// Negotiate a locale between request languages and candidate locales.
///
/// With no candidates, the first request language wins, then the fallback.
/// With no request languages, the first candidate wins. Otherwise request
/// languages are walked in preference order looking for an exact candidate
/// match, then a candidate sharing the primary subtag (the portion before
/// `_`); when nothing matches, the fallback applies. The returned value is
/// always a candidate locale (or the fallback), so callers can select the
/// site carrying it.
pub fn preferred_locale(request_langs: &[String], candidates: &[String], fallback: &str) -> String {
    if candidates.is_empty() {
        return request_langs
            .first()
            .cloned()
            .unwrap_or_else(|| fallback.to_string());
    }
    if request_langs.is_empty() {
        return candidates[0].clone();
    }

    for language in request_langs {
        if let Some(exact) = candidates.iter().find(|locale| *locale == language) {
            return exact.clone();
        }
        let primary = primary_subtag(language);
        if let Some(by_primary) = candidates
            .iter()
            .find(|locale| primary_subtag(locale) == primary)
        {
            return by_primary.clone();
        }
    }
    fallback.to_string()
}

fn primary_subtag(locale: &str) -> &str {
    locale.split('_').next().unwrap_or(locale)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locales(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_weights_and_sorts_descending() {
        let langs = parse_accept_language("en;q=0.5, fr;q=0.9, de");
        assert_eq!(langs, vec!["de", "fr", "en"]);
    }

    #[test]
    fn normalizes_subtags() {
        let langs = parse_accept_language("EN-us, i-cherokee");
        assert_eq!(langs, vec!["en_US", "cherokee"]);
    }

    #[test]
    fn wildcard_sorts_last() {
        let langs = parse_accept_language("*, en;q=0.1");
        assert_eq!(langs, vec!["en", "*"]);
    }

    #[test]
    fn equal_weights_keep_header_order() {
        let langs = parse_accept_language("fr, en, de");
        assert_eq!(langs, vec!["fr", "en", "de"]);
    }

    #[test]
    fn empty_header_parses_to_nothing() {
        assert!(parse_accept_language("").is_empty());
        assert!(parse_accept_language(" , ").is_empty());
    }

    #[test]
    fn negotiation_prefers_weighted_request_language() {
        let langs = parse_accept_language("fr;q=0.9,en;q=0.5");
        let picked = preferred_locale(&langs, &locales(&["en_US", "fr_FR"]), "en_US");
        assert_eq!(picked, "fr_FR");
    }

    #[test]
    fn exact_match_beats_primary_subtag_match() {
        let langs = parse_accept_language("fr-FR;q=0.9,en;q=0.5");
        let picked = preferred_locale(&langs, &locales(&["en_US", "fr_FR"]), "en_US");
        assert_eq!(picked, "fr_FR");
    }

    #[test]
    fn no_candidates_uses_request_then_fallback() {
        let langs = parse_accept_language("de-DE");
        assert_eq!(preferred_locale(&langs, &[], "en_US"), "de_DE");
        assert_eq!(preferred_locale(&[], &[], "en_US"), "en_US");
    }

    #[test]
    fn no_request_languages_uses_first_candidate() {
        let candidates = locales(&["pt_BR", "en_US"]);
        assert_eq!(preferred_locale(&[], &candidates, "en_US"), "pt_BR");
    }

    #[test]
    fn no_match_falls_back() {
        let langs = parse_accept_language("ja-JP");
        let candidates = locales(&["en_US", "fr_FR"]);
        assert_eq!(preferred_locale(&langs, &candidates, "en_US"), "en_US");
    }
}
