//! Generate response normalization
//!
//! Shapes, in order of precedence:
//!
//! 1. `designs`: explicit groups, ordered by their base-design tag
//! 2. `images`: artifacts grouped by their base-design tag (untagged
//!    artifacts of a mixed list form a trailing group); a fully untagged
//!    list is one group
//! 3. `imageUrls` / `imageUrl`: one group of bare URLs
//!
//! Base designs and variations are renumbered from 1 in output order.

use std::collections::BTreeMap;

use design_service_types::{GenerateResponse, RawArtifact};

use crate::design::{Design, DesignArtifact};

pub fn normalize_generate_response(response: &GenerateResponse) -> Vec<Design> {
    let groups = explicit_groups(response)
        .or_else(|| tagged_groups(response))
        .unwrap_or_else(|| legacy_group(response));

    groups
        .into_iter()
        .filter(|g| !g.is_empty())
        .enumerate()
        .map(|(i, group)| {
            let base = i as u32 + 1;
            Design {
                base_design_index: base,
                variations: group
                    .into_iter()
                    .enumerate()
                    .map(|(v, raw)| to_artifact(raw, base, v as u32 + 1))
                    .collect(),
            }
        })
        .collect()
}

fn usable(artifact: &&RawArtifact) -> bool {
    !artifact.url().trim().is_empty()
}

fn explicit_groups(response: &GenerateResponse) -> Option<Vec<Vec<RawArtifact>>> {
    let designs = response.designs.as_ref().filter(|d| !d.is_empty())?;

    let mut ordered: Vec<(u32, usize, Vec<RawArtifact>)> = designs
        .iter()
        .enumerate()
        .map(|(position, group)| {
            let tag = group.base_design.unwrap_or(position as u32 + 1);
            let artifacts = group.variations.iter().filter(usable).cloned().collect();
            (tag, position, artifacts)
        })
        .collect();
    ordered.sort_by_key(|(tag, position, _)| (*tag, *position));

    Some(ordered.into_iter().map(|(_, _, a)| a).collect())
}

fn tagged_groups(response: &GenerateResponse) -> Option<Vec<Vec<RawArtifact>>> {
    let images = response.images.as_ref().filter(|i| !i.is_empty())?;

    let mut tagged: BTreeMap<u32, Vec<RawArtifact>> = BTreeMap::new();
    let mut untagged = Vec::new();
    for artifact in images.iter().filter(usable) {
        match artifact.base_design() {
            Some(tag) => tagged.entry(tag).or_default().push(artifact.clone()),
            None => untagged.push(artifact.clone()),
        }
    }

    let mut groups: Vec<Vec<RawArtifact>> = tagged.into_values().collect();
    groups.push(untagged);
    Some(groups)
}

fn legacy_group(response: &GenerateResponse) -> Vec<Vec<RawArtifact>> {
    let mut urls: Vec<String> = response.image_urls.clone().unwrap_or_default();
    if let Some(url) = &response.image_url {
        if !urls.contains(url) {
            urls.push(url.clone());
        }
    }
    let group = urls
        .into_iter()
        .filter(|u| !u.trim().is_empty())
        .map(RawArtifact::Url)
        .collect();
    vec![group]
}

fn to_artifact(raw: RawArtifact, base: u32, variation: u32) -> DesignArtifact {
    let mut artifact = match raw {
        RawArtifact::Url(url) => DesignArtifact::new(url),
        RawArtifact::Detailed(record) => {
            let mut artifact = DesignArtifact::new(record.url);
            artifact.dominant_color = record.dominant_color;
            artifact.metadata = record.extra;
            artifact
        }
    };
    artifact.base_design_index = Some(base);
    artifact.variation_index = Some(variation);
    artifact
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(json: &str) -> Vec<Design> {
        let response: GenerateResponse = serde_json::from_str(json).unwrap();
        normalize_generate_response(&response)
    }

    fn urls(designs: &[Design]) -> Vec<Vec<&str>> {
        designs
            .iter()
            .map(|d| d.variations.iter().map(|a| a.url.as_str()).collect())
            .collect()
    }

    #[test]
    fn test_tagged_images_grouped_ascending() {
        let designs = parse(
            r##"{"images": [
                {"url": "b1", "baseDesign": 2},
                {"url": "a1", "baseDesign": 1, "dominantColor": "#112233"},
                {"url": "b2", "baseDesign": 2},
                {"url": "a2", "baseDesign": 1}
            ]}"##,
        );

        assert_eq!(urls(&designs), vec![vec!["a1", "a2"], vec!["b1", "b2"]]);
        assert_eq!(designs[1].base_design_index, 2);
        assert_eq!(designs[1].variations[1].variation_index, Some(2));
        assert_eq!(designs[0].variations[0].dominant_color.as_deref(), Some("#112233"));
    }

    #[test]
    fn test_zero_based_tags_are_renumbered() {
        let designs = parse(
            r#"{"images": [{"url": "x", "baseDesign": 0}, {"url": "y", "baseDesign": 1}]}"#,
        );
        assert_eq!(designs[0].base_design_index, 1);
        assert_eq!(designs[0].variations[0].location().map(|l| l.base_design_index), Some(1));
        assert_eq!(designs[1].base_design_index, 2);
    }

    #[test]
    fn test_flat_untagged_list_is_one_group() {
        let designs = parse(r#"{"images": ["u1", "u2", {"url": "u3"}]}"#);
        assert_eq!(urls(&designs), vec![vec!["u1", "u2", "u3"]]);
        assert_eq!(designs[0].variations[2].variation_index, Some(3));
    }

    #[test]
    fn test_explicit_groups() {
        let designs = parse(
            r#"{"designs": [
                {"baseDesign": 2, "variations": ["c", "d"]},
                {"baseDesign": 1, "variations": [{"url": "a", "seed": 7}, "b"]}
            ]}"#,
        );
        assert_eq!(urls(&designs), vec![vec!["a", "b"], vec!["c", "d"]]);
        assert_eq!(designs[0].variations[0].metadata["seed"], 7);
    }

    #[test]
    fn test_legacy_single_url() {
        let designs = parse(r#"{"imageUrl": "only"}"#);
        assert_eq!(urls(&designs), vec![vec!["only"]]);
        assert_eq!(designs[0].variations[0].variation_index, Some(1));
    }

    #[test]
    fn test_legacy_url_list() {
        let designs = parse(r#"{"imageUrls": ["one", "two"]}"#);
        assert_eq!(urls(&designs), vec![vec!["one", "two"]]);
    }

    #[test]
    fn test_empty_shapes_yield_nothing() {
        assert!(parse(r#"{}"#).is_empty());
        assert!(parse(r#"{"images": [], "imageUrls": []}"#).is_empty());
        assert!(parse(r#"{"images": [""]}"#).is_empty());
    }
}
