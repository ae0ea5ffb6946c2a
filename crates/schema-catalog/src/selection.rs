//! Deterministic selection over the provider hierarchy.
//!
//! The provider may expose several versions (releases) and parts (spatial
//! subdivisions) per dataset. One of each is chosen here, explicitly, so a
//! change in the provider's ordering cannot silently change the result:
//!
//! - product: the first product returned for the dataset id
//! - dataset: the one whose id matches the query, else the first
//! - version: the most recent release label, else the first
//! - part: the part named [`SelectionPolicy::preferred_part`], else the first
//!
//! Choosing a single version and part is a known simplification; datasets
//! split into several spatial parts are cataloged by their preferred part only.

use serde::{Deserialize, Serialize};

use crate::describe::{
    DescribeResponse, ProviderDataset, ProviderPart, ProviderProduct, ProviderVersion,
};

/// Policy for choosing one leaf of the provider hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionPolicy {
    /// Name of the spatial part to prefer.
    pub preferred_part: String,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self {
            preferred_part: "default".to_string(),
        }
    }
}

/// The chosen path through the hierarchy.
#[derive(Debug, Clone, Copy)]
pub struct Selection<'a> {
    pub product: &'a ProviderProduct,
    pub dataset: &'a ProviderDataset,
    pub version: &'a ProviderVersion,
    pub part: &'a ProviderPart,
}

impl SelectionPolicy {
    /// Select product, dataset, version and part for a dataset id.
    ///
    /// Returns `None` when any level of the hierarchy is empty.
    pub fn select<'a>(
        &self,
        response: &'a DescribeResponse,
        dataset_id: &str,
    ) -> Option<Selection<'a>> {
        let product = response.products.first()?;
        let dataset = product
            .datasets
            .iter()
            .find(|d| d.dataset_id == dataset_id)
            .or_else(|| product.datasets.first())?;
        let version = self.select_version(&dataset.versions)?;
        let part = self.select_part(&version.parts)?;

        Some(Selection {
            product,
            dataset,
            version,
            part,
        })
    }

    /// Most recent version by label; ties and unlabeled versions keep the
    /// provider's first entry.
    pub fn select_version<'a>(&self, versions: &'a [ProviderVersion]) -> Option<&'a ProviderVersion> {
        versions
            .iter()
            .rev()
            .max_by(|a, b| a.label.cmp(&b.label))
    }

    pub fn select_part<'a>(&self, parts: &'a [ProviderPart]) -> Option<&'a ProviderPart> {
        parts
            .iter()
            .find(|p| p.name.as_deref() == Some(self.preferred_part.as_str()))
            .or_else(|| parts.first())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn version(label: Option<&str>) -> ProviderVersion {
        ProviderVersion {
            label: label.map(str::to_string),
            parts: vec![],
        }
    }

    fn part(name: &str) -> ProviderPart {
        ProviderPart {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_most_recent_version_wins() {
        let versions = vec![version(Some("202211")), version(Some("202406")), version(Some("202311"))];
        let chosen = SelectionPolicy::default().select_version(&versions).unwrap();
        assert_eq!(chosen.label.as_deref(), Some("202406"));
    }

    #[test]
    fn test_unlabeled_versions_keep_first() {
        let mut first = version(None);
        first.parts.push(part("first"));
        let versions = vec![first, version(None)];
        let chosen = SelectionPolicy::default().select_version(&versions).unwrap();
        assert_eq!(chosen.parts.len(), 1);
    }

    #[test]
    fn test_preferred_part() {
        let parts = vec![part("bathy"), part("default")];
        let policy = SelectionPolicy::default();
        assert_eq!(policy.select_part(&parts).unwrap().name.as_deref(), Some("default"));

        let parts = vec![part("north"), part("south")];
        assert_eq!(policy.select_part(&parts).unwrap().name.as_deref(), Some("north"));
        assert!(policy.select_part(&[]).is_none());
    }

    #[test]
    fn test_select_matches_dataset_id() {
        let mut v = version(Some("202406"));
        v.parts.push(part("default"));
        let response = DescribeResponse {
            products: vec![ProviderProduct {
                product_id: "P".to_string(),
                title: None,
                datasets: vec![
                    ProviderDataset {
                        dataset_id: "other".to_string(),
                        dataset_name: None,
                        versions: vec![],
                    },
                    ProviderDataset {
                        dataset_id: "wanted".to_string(),
                        dataset_name: None,
                        versions: vec![v],
                    },
                ],
            }],
        };

        let selection = SelectionPolicy::default().select(&response, "wanted").unwrap();
        assert_eq!(selection.dataset.dataset_id, "wanted");
        assert_eq!(selection.version.label.as_deref(), Some("202406"));

        assert!(SelectionPolicy::default()
            .select(&DescribeResponse::default(), "wanted")
            .is_none());
    }
}
