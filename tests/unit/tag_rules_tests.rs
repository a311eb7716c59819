/*!
 * Tests for tag decisions kept between runs
 */

use std::fs;
use anyhow::Result;
use subsync::tag_rules::{TagDecision, TagDecisionCache, TagRef, TagRuleSet, TagClass};
use crate::common;

#[test]
fn test_load_withMissingFile_shouldReturnEmptyCache() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let cache = TagDecisionCache::load(temp_dir.path().join("decisions.json"))?;
    assert!(cache.is_empty());
    Ok(())
}

#[test]
fn test_persist_thenLoad_shouldRestoreDecisions() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("state").join("decisions.json");

    let mut cache = TagDecisionCache::new();
    cache.record(TagRef::style("Flashback JP"), TagDecision::Keep);
    cache.record(TagRef::inline("xyz"), TagDecision::Drop);
    cache.persist(&path)?;

    let loaded = TagDecisionCache::load(&path)?;
    assert_eq!(loaded, cache);
    Ok(())
}

/// Decisions already on disk win over later ones for the same tag
#[test]
fn test_persist_withExistingFile_shouldMergeAppendOnly() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("decisions.json");

    let mut first = TagDecisionCache::new();
    first.record(TagRef::style("Hero"), TagDecision::Drop);
    first.persist(&path)?;

    let mut second = TagDecisionCache::new();
    second.record(TagRef::style("Hero"), TagDecision::Keep);
    second.record(TagRef::style("Villain"), TagDecision::Keep);
    second.persist(&path)?;

    let loaded = TagDecisionCache::load(&path)?;
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded.get(&TagRef::style("Hero")), Some(TagDecision::Drop));
    assert_eq!(loaded.get(&TagRef::style("Villain")), Some(TagDecision::Keep));
    Ok(())
}

#[test]
fn test_load_withCorruptFile_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "decisions.json", "{not json")?;

    assert!(TagDecisionCache::load(&path).is_err());
    assert_eq!(fs::read_to_string(&path)?, "{not json");
    Ok(())
}

/// A loaded decision resolves the tag it was taken for
#[test]
fn test_resolve_withLoadedDecisions_shouldNoLongerBeAmbiguous() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        temp_dir.path(),
        "decisions.json",
        r#"[{"tag": {"style": "Hero"}, "decision": "drop"}]"#,
    )?;

    let rules = TagRuleSet::builtin();
    assert_eq!(rules.classify(&TagRef::style("Hero")), TagClass::AmbiguousPrompt);

    let resolved = rules.resolve(&TagDecisionCache::load(&path)?);
    assert_eq!(resolved.classify(&TagRef::style("Hero")), TagClass::StructuralNoise);
    Ok(())
}
