use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Whether a tracked brand is ours or a competitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relationship {
    Mine,
    Competitor,
}

impl std::fmt::Display for Relationship {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Relationship::Mine => write!(f, "mine"),
            Relationship::Competitor => write!(f, "competitor"),
        }
    }
}

/// One tracked brand: its display name plus the aliases the detector
/// should match (product names, abbreviations, domain spellings).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandConfig {
    pub name: String,
    pub relationship: Relationship,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub domain: Option<String>,
}

impl BrandConfig {
    /// All strings the detector should match for this brand: the display
    /// name first, then the configured aliases.
    pub fn all_aliases(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    #[must_use]
    pub fn is_mine(&self) -> bool {
        self.relationship == Relationship::Mine
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrandsFile {
    pub brands: Vec<BrandConfig>,
}

impl BrandsFile {
    /// Names of all competitor brands, in file order.
    #[must_use]
    pub fn competitor_names(&self) -> Vec<String> {
        self.brands
            .iter()
            .filter(|b| !b.is_mine())
            .map(|b| b.name.clone())
            .collect()
    }
}

/// Load and validate the brands configuration from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails
/// validation.
pub fn load_brands(path: &Path) -> Result<BrandsFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let brands_file: BrandsFile =
        serde_yaml::from_str(&content).map_err(|e| ConfigError::FileParse {
            path: path.display().to_string(),
            source: e,
        })?;

    validate_brands(&brands_file)?;

    Ok(brands_file)
}

fn validate_brands(brands_file: &BrandsFile) -> Result<(), ConfigError> {
    if brands_file.brands.is_empty() {
        return Err(ConfigError::Validation(
            "brands file declares no brands".to_string(),
        ));
    }

    let mut seen_aliases = HashSet::new();

    for brand in &brands_file.brands {
        if brand.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "brand name must be non-empty".to_string(),
            ));
        }

        for alias in brand.all_aliases() {
            if alias.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "brand '{}' has an empty alias",
                    brand.name
                )));
            }
            // Aliases are matched case-insensitively, so two brands claiming
            // the same alias in different casing would produce ambiguous
            // mentions.
            let lower = alias.to_lowercase();
            if !seen_aliases.insert(lower) {
                return Err(ConfigError::Validation(format!(
                    "alias '{alias}' is claimed by more than one brand"
                )));
            }
        }
    }

    if !brands_file.brands.iter().any(BrandConfig::is_mine) {
        return Err(ConfigError::Validation(
            "brands file declares no brand with relationship 'mine'".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brand(name: &str, relationship: Relationship, aliases: &[&str]) -> BrandConfig {
        BrandConfig {
            name: name.to_string(),
            relationship,
            aliases: aliases.iter().map(|a| (*a).to_string()).collect(),
            domain: None,
        }
    }

    #[test]
    fn valid_brands_pass_validation() {
        let file = BrandsFile {
            brands: vec![
                brand("HubSpot", Relationship::Mine, &["hubspot.com"]),
                brand("Salesforce", Relationship::Competitor, &[]),
            ],
        };
        assert!(validate_brands(&file).is_ok());
    }

    #[test]
    fn duplicate_alias_across_brands_is_rejected() {
        let file = BrandsFile {
            brands: vec![
                brand("HubSpot", Relationship::Mine, &["crm"]),
                brand("Salesforce", Relationship::Competitor, &["CRM"]),
            ],
        };
        let err = validate_brands(&file).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn empty_brand_list_is_rejected() {
        let file = BrandsFile { brands: vec![] };
        assert!(validate_brands(&file).is_err());
    }

    #[test]
    fn missing_mine_brand_is_rejected() {
        let file = BrandsFile {
            brands: vec![brand("Salesforce", Relationship::Competitor, &[])],
        };
        let err = validate_brands(&file).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn all_aliases_yields_name_first() {
        let b = brand("HubSpot", Relationship::Mine, &["hubspot.com", "hs"]);
        let aliases: Vec<&str> = b.all_aliases().collect();
        assert_eq!(aliases, vec!["HubSpot", "hubspot.com", "hs"]);
    }

    #[test]
    fn competitor_names_preserve_file_order() {
        let file = BrandsFile {
            brands: vec![
                brand("HubSpot", Relationship::Mine, &[]),
                brand("Salesforce", Relationship::Competitor, &[]),
                brand("Pipedrive", Relationship::Competitor, &[]),
            ],
        };
        assert_eq!(file.competitor_names(), vec!["Salesforce", "Pipedrive"]);
    }
}
