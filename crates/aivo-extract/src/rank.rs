//! Rank extraction from list-like answers.
//!
//! Explicit ordinal markers ("1.", "2)", bullet characters, ordinal words)
//! adjacent to a mention's first occurrence give a high-confidence rank.
//! When the text carries no markers at all, order of first appearance is
//! used as an implicit, lower-confidence rank. Ties on identical explicit
//! numbers are broken by first-occurrence order.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::ExtractedMention;

/// Confidence attached to ranks read from numbered/ordinal markers.
const EXPLICIT_RANK_CONFIDENCE: f64 = 0.9;
/// Confidence attached to ranks inferred from bullet position.
const BULLET_RANK_CONFIDENCE: f64 = 0.7;
/// Confidence attached to the order-of-appearance fallback.
const IMPLICIT_RANK_CONFIDENCE: f64 = 0.5;

static NUMBERED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d{1,3})[.):]\s+").expect("static pattern"));
static BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[-*•‣]\s+").expect("static pattern"));
static ORDINAL_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(first|second|third|fourth|fifth|sixth|seventh|eighth|ninth|tenth)\b")
        .expect("static pattern")
});

/// Assigns rank positions in place.
///
/// Mentions that already carry a rank (from the LLM extractor) keep it.
/// The pass is deterministic: identical text and candidates always yield
/// identical assignments.
pub fn assign_ranks(text: &str, mentions: &mut [ExtractedMention]) {
    let lines = line_spans(text);

    for mention in mentions.iter_mut() {
        if mention.rank_position.is_some() || mention.first_offset == usize::MAX {
            continue;
        }
        if let Some((rank, confidence)) = explicit_rank_at(&lines, text, mention.first_offset) {
            mention.rank_position = Some(rank);
            mention.rank_confidence = confidence;
        }
    }

    if mentions.iter().all(|m| m.rank_position.is_none()) {
        // No explicit markers anywhere: order of first appearance as an
        // implicit rank. Flagged by its lower confidence.
        let mut order: Vec<usize> = (0..mentions.len()).collect();
        order.sort_by_key(|&i| mentions[i].first_offset);
        for (position, index) in order.into_iter().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            let rank = (position + 1) as u32;
            mentions[index].rank_position = Some(rank);
            mentions[index].rank_confidence = IMPLICIT_RANK_CONFIDENCE;
        }
        return;
    }

    break_ties(mentions);
}

/// Explicit marker on the line containing `offset`, if any.
fn explicit_rank_at(
    lines: &[(usize, usize)],
    text: &str,
    offset: usize,
) -> Option<(u32, f64)> {
    let line_index = lines
        .iter()
        .position(|&(start, end)| offset >= start && offset < end)?;
    let line = &text[lines[line_index].0..lines[line_index].1];

    if let Some(caps) = NUMBERED.captures(line) {
        let rank: u32 = caps[1].parse().ok()?;
        return Some((rank, EXPLICIT_RANK_CONFIDENCE));
    }

    if let Some(caps) = ORDINAL_WORD.captures(line) {
        let rank = ordinal_value(&caps[1]);
        return Some((rank, EXPLICIT_RANK_CONFIDENCE));
    }

    if BULLET.is_match(line) {
        // Bullets carry no number; the rank is this item's position among
        // the bullet lines so far.
        let bullet_position = lines[..=line_index]
            .iter()
            .filter(|&&(start, end)| BULLET.is_match(&text[start..end]))
            .count();
        #[allow(clippy::cast_possible_truncation)]
        let rank = bullet_position as u32;
        return Some((rank, BULLET_RANK_CONFIDENCE));
    }

    None
}

/// Duplicate explicit rank numbers are resolved by first-occurrence order:
/// later occurrences of an already-taken rank are bumped past it.
fn break_ties(mentions: &mut [ExtractedMention]) {
    let mut ranked: Vec<usize> = (0..mentions.len())
        .filter(|&i| mentions[i].rank_position.is_some())
        .collect();
    ranked.sort_by_key(|&i| {
        (
            mentions[i].rank_position.unwrap_or(u32::MAX),
            mentions[i].first_offset,
        )
    });

    let mut previous: Option<u32> = None;
    for index in ranked {
        let rank = mentions[index].rank_position.unwrap_or(u32::MAX);
        let assigned = match previous {
            Some(prev) if rank <= prev => prev + 1,
            _ => rank,
        };
        mentions[index].rank_position = Some(assigned);
        previous = Some(assigned);
    }
}

fn ordinal_value(word: &str) -> u32 {
    match word.to_lowercase().as_str() {
        "second" => 2,
        "third" => 3,
        "fourth" => 4,
        "fifth" => 5,
        "sixth" => 6,
        "seventh" => 7,
        "eighth" => 8,
        "ninth" => 9,
        "tenth" => 10,
        _ => 1,
    }
}

/// Byte spans `(start, end)` of each line, end exclusive of the newline.
fn line_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start = 0usize;
    for (i, b) in text.bytes().enumerate() {
        if b == b'\n' {
            spans.push((start, i));
            start = i + 1;
        }
    }
    if start <= text.len() {
        spans.push((start, text.len()));
    }
    spans
}

#[cfg(test)]
mod tests {
    use aivo_core::records::DetectionMethod;

    use super::*;

    fn mention(brand: &str, first_offset: usize) -> ExtractedMention {
        ExtractedMention {
            brand: brand.to_string(),
            normalized_key: brand.to_lowercase(),
            is_mine: false,
            rank_position: None,
            rank_confidence: 0.0,
            confidence: 1.0,
            detection_method: DetectionMethod::Regex,
            sentiment: None,
            mention_context: None,
            first_offset,
        }
    }

    fn offsets_in(text: &str, brands: &[&str]) -> Vec<ExtractedMention> {
        brands
            .iter()
            .map(|b| mention(b, text.find(b).expect("brand present")))
            .collect()
    }

    #[test]
    fn numbered_list_gives_explicit_ranks() {
        let text = "1. HubSpot\n2. Salesforce\n3. Pipedrive";
        let mut mentions = offsets_in(text, &["HubSpot", "Salesforce", "Pipedrive"]);
        assign_ranks(text, &mut mentions);
        assert_eq!(mentions[0].rank_position, Some(1));
        assert_eq!(mentions[1].rank_position, Some(2));
        assert_eq!(mentions[2].rank_position, Some(3));
        assert!((mentions[0].rank_confidence - EXPLICIT_RANK_CONFIDENCE).abs() < f64::EPSILON);
    }

    #[test]
    fn paren_markers_count_as_explicit() {
        let text = "1) HubSpot\n2) Salesforce";
        let mut mentions = offsets_in(text, &["HubSpot", "Salesforce"]);
        assign_ranks(text, &mut mentions);
        assert_eq!(mentions[0].rank_position, Some(1));
        assert_eq!(mentions[1].rank_position, Some(2));
    }

    #[test]
    fn ordinal_words_count_as_explicit() {
        let text = "First, HubSpot leads.\nSecond, Salesforce follows.";
        let mut mentions = offsets_in(text, &["HubSpot", "Salesforce"]);
        assign_ranks(text, &mut mentions);
        assert_eq!(mentions[0].rank_position, Some(1));
        assert_eq!(mentions[1].rank_position, Some(2));
    }

    #[test]
    fn bullet_lines_rank_by_bullet_position() {
        let text = "- HubSpot\nsome prose\n- Salesforce";
        let mut mentions = offsets_in(text, &["HubSpot", "Salesforce"]);
        assign_ranks(text, &mut mentions);
        assert_eq!(mentions[0].rank_position, Some(1));
        assert_eq!(mentions[1].rank_position, Some(2));
        assert!((mentions[0].rank_confidence - BULLET_RANK_CONFIDENCE).abs() < f64::EPSILON);
    }

    #[test]
    fn prose_falls_back_to_appearance_order() {
        let text = "HubSpot is popular, though Salesforce has more market share.";
        let mut mentions = offsets_in(text, &["HubSpot", "Salesforce"]);
        assign_ranks(text, &mut mentions);
        assert_eq!(mentions[0].rank_position, Some(1));
        assert_eq!(mentions[1].rank_position, Some(2));
        assert!((mentions[0].rank_confidence - IMPLICIT_RANK_CONFIDENCE).abs() < f64::EPSILON);
    }

    #[test]
    fn duplicate_explicit_ranks_break_by_occurrence() {
        let text = "1. HubSpot\n1. Salesforce\n2. Pipedrive";
        let mut mentions = offsets_in(text, &["HubSpot", "Salesforce", "Pipedrive"]);
        assign_ranks(text, &mut mentions);
        assert_eq!(mentions[0].rank_position, Some(1));
        assert_eq!(mentions[1].rank_position, Some(2), "tie bumped past 1");
        assert_eq!(mentions[2].rank_position, Some(3), "cascade keeps order");
    }

    #[test]
    fn unmarked_mention_stays_unranked_when_markers_exist() {
        let text = "1. HubSpot\nAlso consider Salesforce.";
        let mut mentions = offsets_in(text, &["HubSpot", "Salesforce"]);
        assign_ranks(text, &mut mentions);
        assert_eq!(mentions[0].rank_position, Some(1));
        assert_eq!(mentions[1].rank_position, None);
    }

    #[test]
    fn assignment_is_deterministic() {
        let text = "2. Salesforce\n1. HubSpot\nPipedrive is fine too.";
        let build = || offsets_in(text, &["Salesforce", "HubSpot", "Pipedrive"]);
        let mut a = build();
        let mut b = build();
        assign_ranks(text, &mut a);
        assign_ranks(text, &mut b);
        let ranks_a: Vec<_> = a.iter().map(|m| m.rank_position).collect();
        let ranks_b: Vec<_> = b.iter().map(|m| m.rank_position).collect();
        assert_eq!(ranks_a, ranks_b);
    }

    #[test]
    fn preassigned_llm_ranks_are_kept() {
        let text = "HubSpot and Salesforce";
        let mut mentions = offsets_in(text, &["HubSpot", "Salesforce"]);
        mentions[1].rank_position = Some(1);
        mentions[1].rank_confidence = 0.8;
        assign_ranks(text, &mut mentions);
        assert_eq!(mentions[1].rank_position, Some(1));
        // The other mention has no marker; markers exist nowhere but an LLM
        // rank does, so no appearance fallback fires for it.
        assert_eq!(mentions[0].rank_position, None);
    }
}
