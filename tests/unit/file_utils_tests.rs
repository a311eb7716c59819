/*!
 * Tests for file discovery, pairing and atomic writes
 */

use std::fs;
use anyhow::Result;
use subsync::file_utils::FileManager;
use crate::common;

/// Episode numbers order naturally, not lexically
#[test]
fn test_find_files_withNumberedEpisodes_shouldSortNaturally() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    for name in ["Show 10.mkv", "Show 2.mkv", "Show 1.MKV", "notes.txt"] {
        common::create_test_video(temp_dir.path(), name)?;
    }

    let files = FileManager::find_files(temp_dir.path(), &["mkv"])?;
    let names: Vec<String> = files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
        .collect();

    assert_eq!(names, vec!["Show 1.MKV", "Show 2.mkv", "Show 10.mkv"]);
    Ok(())
}

/// Subdirectories are not searched
#[test]
fn test_find_files_withNestedFiles_shouldStayAtTopLevel() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_test_video(temp_dir.path(), "ep01.mkv")?;
    fs::create_dir(temp_dir.path().join("extras"))?;
    common::create_test_video(&temp_dir.path().join("extras"), "ep02.mkv")?;

    let files = FileManager::find_files(temp_dir.path(), &["mkv"])?;
    assert_eq!(files.len(), 1);
    Ok(())
}

#[test]
fn test_discover_pairs_withMatchingCounts_shouldPairPositionally() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_test_video(temp_dir.path(), "[Group] Show - 02.mkv")?;
    common::create_test_video(temp_dir.path(), "[Group] Show - 01.mkv")?;
    common::create_test_file(temp_dir.path(), "show_e1.srt", common::ENGLISH_SRT)?;
    common::create_test_file(temp_dir.path(), "show_e2.srt", common::ENGLISH_SRT)?;

    let pairs = FileManager::discover_pairs(temp_dir.path(), true)?;

    assert_eq!(pairs.len(), 2);
    assert!(pairs[0].video.ends_with("[Group] Show - 01.mkv"));
    assert!(pairs[0].subtitle.ends_with("show_e1.srt"));
    assert!(pairs[1].subtitle.ends_with("show_e2.srt"));
    Ok(())
}

/// Missing .srt files are made up with .ass files when allowed
#[test]
fn test_discover_pairs_withAssFallback_shouldIncludeAss() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_test_video(temp_dir.path(), "ep01.mkv")?;
    common::create_test_video(temp_dir.path(), "ep02.mkv")?;
    common::create_test_file(temp_dir.path(), "ep01.srt", common::ENGLISH_SRT)?;
    common::create_test_file(temp_dir.path(), "ep02.ass", common::REFERENCE_ASS)?;

    assert!(FileManager::discover_pairs(temp_dir.path(), false).is_err());

    let pairs = FileManager::discover_pairs(temp_dir.path(), true)?;
    assert_eq!(pairs.len(), 2);
    assert!(pairs[1].subtitle.ends_with("ep02.ass"));
    Ok(())
}

#[test]
fn test_discover_pairs_withCountMismatch_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_test_video(temp_dir.path(), "ep01.mkv")?;
    common::create_test_video(temp_dir.path(), "ep02.mkv")?;
    common::create_test_file(temp_dir.path(), "ep01.srt", common::ENGLISH_SRT)?;

    let result = FileManager::discover_pairs(temp_dir.path(), true);
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("2 videos but 1 subtitle"));
    Ok(())
}

#[test]
fn test_write_atomically_shouldReplaceContentAndLeaveNoTempFiles() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let target = common::create_test_file(temp_dir.path(), "out.srt", "old")?;

    FileManager::write_atomically(&target, "new content")?;

    assert_eq!(fs::read_to_string(&target)?, "new content");
    assert_eq!(fs::read_dir(temp_dir.path())?.count(), 1);
    Ok(())
}

#[test]
fn test_write_atomically_withMissingParent_shouldCreateIt() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let target = temp_dir.path().join("synced").join("ep01.srt");

    FileManager::write_atomically(&target, "1\n00:00:01,000 --> 00:00:02,000\nHi\n")?;

    assert!(target.exists());
    Ok(())
}

#[test]
fn test_remove_stale_temp_files_withLeftoverTempFile_shouldRemoveOnlyIt() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_test_file(temp_dir.path(), ".subsync-a1B2c3.tmp", "partial")?;
    let kept = common::create_test_file(temp_dir.path(), "ep01.srt", "done")?;
    let hidden = common::create_test_file(temp_dir.path(), ".hidden", "user file")?;

    let removed = FileManager::remove_stale_temp_files(temp_dir.path())?;

    assert_eq!(removed, 1);
    assert!(kept.exists());
    assert!(hidden.exists());
    assert_eq!(fs::read_dir(temp_dir.path())?.count(), 2);
    Ok(())
}
