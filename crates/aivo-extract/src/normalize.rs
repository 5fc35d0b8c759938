//! Brand-text normalization.

const TLD_MAX_LEN: usize = 6;

/// Canonical dedup key for a brand string: lowercased, a trailing TLD
/// suffix stripped, and internal whitespace collapsed to single spaces.
///
/// `"HubSpot"`, `"HUBSPOT"`, and `"hubspot.com"` all normalize to
/// `"hubspot"`, so multiple aliases of one brand collapse to a single
/// mention key.
#[must_use]
pub fn canonical_key(brand: &str) -> String {
    let lowered = brand.to_lowercase();
    let collapsed = lowered.split_whitespace().collect::<Vec<_>>().join(" ");
    strip_tld(&collapsed).to_owned()
}

/// Strips a trailing `.tld` segment when the remainder is still a name.
///
/// Only a single short alphabetic segment is treated as a TLD; dots inside
/// multi-word strings are left alone.
fn strip_tld(s: &str) -> &str {
    let Some(pos) = s.rfind('.') else {
        return s;
    };
    let (head, tail) = (&s[..pos], &s[pos + 1..]);
    let tail_is_tld = (2..=TLD_MAX_LEN).contains(&tail.len())
        && tail.chars().all(|c| c.is_ascii_alphabetic());
    if tail_is_tld && !head.is_empty() && !head.contains(' ') {
        head
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_variants_share_a_key() {
        assert_eq!(canonical_key("HUBSPOT"), "hubspot");
        assert_eq!(canonical_key("hubspot"), "hubspot");
        assert_eq!(canonical_key("HubSpot"), "hubspot");
    }

    #[test]
    fn tld_is_stripped() {
        assert_eq!(canonical_key("hubspot.com"), "hubspot");
        assert_eq!(canonical_key("Notion.so"), "notion");
    }

    #[test]
    fn multi_word_names_keep_dots() {
        assert_eq!(canonical_key("U.S. News"), "u.s. news");
    }

    #[test]
    fn whitespace_is_collapsed() {
        assert_eq!(canonical_key("  Zoho   CRM  "), "zoho crm");
    }

    #[test]
    fn bare_dot_suffix_is_kept_when_head_is_empty() {
        assert_eq!(canonical_key(".com"), ".com");
    }
}
