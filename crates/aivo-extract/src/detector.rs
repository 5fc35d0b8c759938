//! Regex brand detector.
//!
//! Builds one case-insensitive whole-word pattern per configured alias so
//! substrings never match ("Hub" must not fire inside "GitHub"). Multiple
//! aliases of one brand collapse to a single candidate keyed by the
//! brand's canonical key.

use aivo_core::records::DetectionMethod;
use aivo_core::{BrandConfig, BrandsFile};
use regex::Regex;

use crate::error::ExtractError;
use crate::normalize::canonical_key;
use crate::types::ExtractedMention;

struct CompiledBrand {
    name: String,
    normalized_key: String,
    alias_keys: Vec<String>,
    is_mine: bool,
    patterns: Vec<Regex>,
}

/// Whole-word alias matcher over the configured brand lists.
pub struct BrandDetector {
    brands: Vec<CompiledBrand>,
}

impl BrandDetector {
    /// Compiles detection patterns for every alias of every brand.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::Pattern`] if an alias cannot be compiled
    /// into a usable pattern.
    pub fn new(brands_file: &BrandsFile) -> Result<Self, ExtractError> {
        let brands = brands_file
            .brands
            .iter()
            .map(compile_brand)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { brands })
    }

    /// Finds all configured brands mentioned in `text`.
    ///
    /// Returns one candidate per brand (earliest alias occurrence wins the
    /// offset), with `confidence = 1.0` and `detection_method = regex`,
    /// ordered by first occurrence. Empty text yields an empty vector, not
    /// an error. Rank fields are left unassigned for the rank pass.
    #[must_use]
    pub fn detect(&self, text: &str) -> Vec<ExtractedMention> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let mut found: Vec<ExtractedMention> = Vec::new();
        for brand in &self.brands {
            let first_offset = brand
                .patterns
                .iter()
                .filter_map(|p| p.find(text).map(|m| m.start()))
                .min();
            if let Some(first_offset) = first_offset {
                found.push(ExtractedMention {
                    brand: brand.name.clone(),
                    normalized_key: brand.normalized_key.clone(),
                    is_mine: brand.is_mine,
                    rank_position: None,
                    rank_confidence: 0.0,
                    confidence: 1.0,
                    detection_method: DetectionMethod::Regex,
                    sentiment: None,
                    mention_context: None,
                    first_offset,
                });
            }
        }
        found.sort_by_key(|m| m.first_offset);
        found
    }

    /// Resolves free-text brand output (from the LLM extractor) back to a
    /// configured brand by canonical key over the name and all aliases.
    #[must_use]
    pub fn resolve(&self, brand_text: &str) -> Option<(&str, &str, bool)> {
        let key = canonical_key(brand_text);
        self.brands
            .iter()
            .find(|b| b.alias_keys.iter().any(|alias_key| *alias_key == key))
            .map(|b| (b.name.as_str(), b.normalized_key.as_str(), b.is_mine))
    }

    /// First byte offset of any alias of the brand with the given
    /// canonical key, if the text contains one.
    #[must_use]
    pub fn first_offset_of(&self, normalized_key: &str, text: &str) -> Option<usize> {
        self.brands
            .iter()
            .find(|b| b.normalized_key == normalized_key)
            .and_then(|b| {
                b.patterns
                    .iter()
                    .filter_map(|p| p.find(text).map(|m| m.start()))
                    .min()
            })
    }
}

fn compile_brand(brand: &BrandConfig) -> Result<CompiledBrand, ExtractError> {
    let patterns = brand
        .all_aliases()
        .map(|alias| {
            let escaped = regex::escape(alias);
            Regex::new(&format!(r"(?i)\b{escaped}\b")).map_err(|e| ExtractError::Pattern {
                alias: alias.to_owned(),
                reason: e.to_string(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CompiledBrand {
        name: brand.name.clone(),
        normalized_key: canonical_key(&brand.name),
        alias_keys: brand.all_aliases().map(canonical_key).collect(),
        is_mine: brand.is_mine(),
        patterns,
    })
}

#[cfg(test)]
mod tests {
    use aivo_core::Relationship;

    use super::*;

    fn brands(entries: &[(&str, Relationship, &[&str])]) -> BrandsFile {
        BrandsFile {
            brands: entries
                .iter()
                .map(|(name, relationship, aliases)| BrandConfig {
                    name: (*name).to_string(),
                    relationship: *relationship,
                    aliases: aliases.iter().map(|a| (*a).to_string()).collect(),
                    domain: None,
                })
                .collect(),
        }
    }

    fn detector(entries: &[(&str, Relationship, &[&str])]) -> BrandDetector {
        BrandDetector::new(&brands(entries)).expect("patterns should compile")
    }

    #[test]
    fn whole_word_only_no_substring_match() {
        let d = detector(&[
            ("hub", Relationship::Mine, &[]),
            ("HubSpot", Relationship::Competitor, &[]),
        ]);
        let mentions = d.detect("I recommend GitHub and HubSpot");
        assert_eq!(mentions.len(), 1, "'hub' must not match inside 'GitHub'");
        assert_eq!(mentions[0].brand, "HubSpot");
    }

    #[test]
    fn case_insensitive_matching() {
        let d = detector(&[("HubSpot", Relationship::Mine, &[])]);
        for text in ["HUBSPOT is great", "hubspot is great", "HubSpot is great"] {
            let mentions = d.detect(text);
            assert_eq!(mentions.len(), 1, "failed on {text:?}");
            assert_eq!(mentions[0].normalized_key, "hubspot");
        }
    }

    #[test]
    fn multiple_aliases_collapse_to_one_mention() {
        let d = detector(&[("HubSpot", Relationship::Mine, &["hubspot.com"])]);
        let mentions = d.detect("Try hubspot.com — HubSpot is solid.");
        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].normalized_key, "hubspot");
    }

    #[test]
    fn empty_text_yields_zero_mentions() {
        let d = detector(&[("HubSpot", Relationship::Mine, &[])]);
        assert!(d.detect("").is_empty());
        assert!(d.detect("   \n  ").is_empty());
    }

    #[test]
    fn special_characters_in_aliases_are_escaped() {
        let d = detector(&[("Notion", Relationship::Mine, &["notion.so"])]);
        // An unescaped '.' would match "notionXso".
        assert!(d.detect("try notionxso today").is_empty());
        assert_eq!(d.detect("try notion.so today").len(), 1);
    }

    #[test]
    fn detect_orders_by_first_occurrence() {
        let d = detector(&[
            ("Pipedrive", Relationship::Competitor, &[]),
            ("HubSpot", Relationship::Mine, &[]),
        ]);
        let mentions = d.detect("HubSpot beats Pipedrive");
        assert_eq!(mentions[0].brand, "HubSpot");
        assert_eq!(mentions[1].brand, "Pipedrive");
    }

    #[test]
    fn resolve_maps_alias_text_to_brand() {
        let d = detector(&[("HubSpot", Relationship::Mine, &["hubspot.com"])]);
        let (name, key, is_mine) = d.resolve("HUBSPOT.COM").expect("alias should resolve");
        assert_eq!(name, "HubSpot");
        assert_eq!(key, "hubspot");
        assert!(is_mine);
        assert!(d.resolve("Zendesk").is_none());
    }

    #[test]
    fn confidence_is_full_for_regex_hits() {
        let d = detector(&[("HubSpot", Relationship::Mine, &[])]);
        let mentions = d.detect("HubSpot");
        assert!((mentions[0].confidence - 1.0).abs() < f64::EPSILON);
        assert_eq!(mentions[0].detection_method, DetectionMethod::Regex);
    }
}
