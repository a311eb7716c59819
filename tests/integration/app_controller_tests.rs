/*!
 * Integration tests for the per-pair pipeline and batch runs
 */

use std::fs;
use std::sync::Arc;
use anyhow::Result;

use subsync::app_config::Config;
use subsync::errors::{SelectionError, SyncError};
use subsync::scrubber::ScrubCategory;
use subsync::subtitle_processor::{StreamOrigin, SubtitleStream};
use subsync::tag_rules::{TagDecision, TagDecisionCache, TagRef};
use subsync::{Controller, PairOutcome};

use crate::common;
use crate::common::fakes::{track, FakeAligner, FakeProbe, ScriptedDecider};

const HERO_ASS: &str = r"[Script Info]
ScriptType: v4.00+

[Events]
Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text
Dialogue: 0,0:00:03.00,0:00:05.00,Hero,,0,0,0,,Where are you going?
Dialogue: 0,0:00:06.50,0:00:08.00,Default,,0,0,0,,To the station.
Dialogue: 0,0:00:09.00,0:00:11.00,Hero,,0,0,0,,Wait for me!
";

const ENGLISH_REFERENCE_SRT: &str = "1
00:00:01,000 --> 00:00:03,000
Is it on Netflix tonight?

2
00:00:04,000 --> 00:00:06,000
～I'm home～

3
00:00:07,000 --> 00:00:09,000
Where are you going?
";

const BROKEN_ASS: &str = "[Script Info]\nTitle: broken\n";

fn controller(config: Config, probe: FakeProbe, aligner: FakeAligner, decider: ScriptedDecider) -> Controller {
    Controller::with_components(config, Arc::new(probe), Arc::new(aligner), Box::new(decider))
}

fn japanese_reference_probe() -> FakeProbe {
    FakeProbe::new().with_track(track(2, "ass", Some("jpn"), Some("Full Subs")), common::REFERENCE_ASS)
}

#[tokio::test]
async fn test_run_pair_withOneTrackAndOneFile_shouldSyncWithoutPrompting() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let video = common::create_test_video(temp_dir.path(), "ep01.mkv")?;
    let subtitle = common::create_test_file(temp_dir.path(), "ep01.ja.srt", common::EXTERNAL_SRT)?;
    let out_dir = temp_dir.path().join("out");

    let aligner = FakeAligner::shifting(-2000);
    let calls = aligner.calls();
    let decider = ScriptedDecider::new();
    let log = decider.log();
    let mut controller = controller(Config::default(), japanese_reference_probe(), aligner, decider);

    let outcome = controller.run_pair(&video, &[subtitle], &out_dir, false).await?;

    let PairOutcome::Synced { output, events, report } = outcome else {
        panic!("expected a synced pair");
    };
    assert_eq!(output, out_dir.join("ep01.srt"));
    assert_eq!(events, 5);
    assert_eq!(report.kept, 3);
    assert!(log.lock().unwrap().stream_prompts.is_empty());

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].reference_events, 3);
    assert_eq!(calls[0].target_events, 3);

    let written = SubtitleStream::load(&output, StreamOrigin::External)?;
    let starts: Vec<u64> = written.events().iter().map(|e| e.start_ms).collect();
    assert_eq!(starts, vec![1000, 4000, 4500, 7000, 10000]);
    Ok(())
}

/// With reference cleaning off the aligner gets the whole embedded track
#[tokio::test]
async fn test_run_pair_withoutReferenceCleaning_shouldPassFullReference() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let video = common::create_test_video(temp_dir.path(), "ep01.mkv")?;
    let subtitle = common::create_test_file(temp_dir.path(), "ep01.srt", common::EXTERNAL_SRT)?;

    let mut config = Config::default();
    config.cleaning.clean_reference = false;
    let aligner = FakeAligner::shifting(-2000);
    let calls = aligner.calls();
    let mut controller = controller(config, japanese_reference_probe(), aligner, ScriptedDecider::new());

    controller.run_pair(&video, &[subtitle], temp_dir.path(), true).await?;

    assert_eq!(calls.lock().unwrap()[0].reference_events, 5);
    Ok(())
}

/// Bitmap tracks are never extracted, the track in the wanted language wins
#[tokio::test]
async fn test_run_pair_withBitmapAndForeignTracks_shouldPickPreferredLanguage() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let video = common::create_test_video(temp_dir.path(), "ep01.mkv")?;
    let subtitle = common::create_test_file(temp_dir.path(), "ep01.srt", common::EXTERNAL_SRT)?;

    let probe = FakeProbe::new()
        .with_track(track(2, "hdmv_pgs_subtitle", Some("jpn"), None), "")
        .with_track(track(3, "subrip", Some("eng"), Some("English")), common::ENGLISH_SRT)
        .with_track(track(4, "ass", Some("jpn"), Some("Full Subs")), common::REFERENCE_ASS);
    let extracted = probe.extracted();
    let aligner = FakeAligner::shifting(-2000);
    let calls = aligner.calls();
    let decider = ScriptedDecider::new();
    let log = decider.log();
    let mut controller = controller(Config::default(), probe, aligner, decider);

    controller.run_pair(&video, &[subtitle], temp_dir.path(), true).await?;

    assert_eq!(*extracted.lock().unwrap(), vec![3, 4]);
    assert!(log.lock().unwrap().stream_prompts.is_empty());
    assert_eq!(calls.lock().unwrap()[0].reference_events, 3);
    Ok(())
}

/// The reference is cleaned with the heuristics of its own language and never scrubbed
#[tokio::test]
async fn test_run_pair_withEnglishReference_shouldUseEnglishHeuristics() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let video = common::create_test_video(temp_dir.path(), "ep01.mkv")?;
    let subtitle = common::create_test_file(temp_dir.path(), "ep01.srt", common::EXTERNAL_SRT)?;

    let probe = FakeProbe::new().with_track(track(3, "subrip", Some("eng"), None), ENGLISH_REFERENCE_SRT);
    let aligner = FakeAligner::shifting(-2000);
    let calls = aligner.calls();
    let decider = ScriptedDecider::new().scrubbing(true);
    let log = decider.log();
    let mut controller = controller(Config::default(), probe, aligner, decider);

    controller.run_pair(&video, &[subtitle], temp_dir.path(), true).await?;

    assert!(log.lock().unwrap().scrub_requests.contains(&ScrubCategory::SpecialSymbols));
    let calls = calls.lock().unwrap();
    assert_eq!(calls[0].reference_events, 3);
    assert_eq!(
        calls[0].reference_texts,
        vec!["Is it on Netflix tonight?", "～I'm home～", "Where are you going?"]
    );
    Ok(())
}

/// A broken track is dropped from the candidates, the usable one is still aligned against
#[tokio::test]
async fn test_run_pair_withUnparsableTrack_shouldUseRemainingTrack() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let video = common::create_test_video(temp_dir.path(), "ep01.mkv")?;
    let subtitle = common::create_test_file(temp_dir.path(), "ep01.srt", common::EXTERNAL_SRT)?;

    let probe = FakeProbe::new()
        .with_track(track(2, "ass", Some("jpn"), Some("Broken")), BROKEN_ASS)
        .with_track(track(3, "ass", Some("eng"), Some("Full Subs")), common::REFERENCE_ASS);
    let aligner = FakeAligner::shifting(-2000);
    let calls = aligner.calls();
    let decider = ScriptedDecider::new();
    let log = decider.log();
    let mut controller = controller(Config::default(), probe, aligner, decider);

    let outcome = controller.run_pair(&video, &[subtitle], temp_dir.path(), true).await?;

    assert!(matches!(outcome, PairOutcome::Synced { events: 5, .. }));
    assert!(log.lock().unwrap().stream_prompts.is_empty());
    assert_eq!(calls.lock().unwrap()[0].reference_events, 3);
    Ok(())
}

#[tokio::test]
async fn test_run_pair_withOnlyUnparsableTracks_shouldBeSkippable() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let video = common::create_test_video(temp_dir.path(), "ep01.mkv")?;
    let subtitle = common::create_test_file(temp_dir.path(), "ep01.srt", common::EXTERNAL_SRT)?;

    let probe = FakeProbe::new().with_track(track(2, "ass", Some("jpn"), None), BROKEN_ASS);
    let mut controller = controller(Config::default(), probe, FakeAligner::shifting(0), ScriptedDecider::new());

    let error = controller.run_pair(&video, &[subtitle], temp_dir.path(), false).await.unwrap_err();

    assert!(matches!(
        error,
        SyncError::Selection(SelectionError::NoCandidates { side: StreamOrigin::Embedded })
    ));
    Ok(())
}

#[tokio::test]
async fn test_run_pair_withOnlyBitmapTracks_shouldBeSkippable() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let video = common::create_test_video(temp_dir.path(), "ep01.mkv")?;
    let subtitle = common::create_test_file(temp_dir.path(), "ep01.srt", common::EXTERNAL_SRT)?;

    let probe = FakeProbe::new().with_track(track(2, "dvd_subtitle", Some("jpn"), None), "");
    let mut controller = controller(Config::default(), probe, FakeAligner::shifting(0), ScriptedDecider::new());

    let error = controller.run_pair(&video, &[subtitle], temp_dir.path(), false).await.unwrap_err();

    assert!(matches!(
        error,
        SyncError::Selection(SelectionError::NoCandidates { side: StreamOrigin::Embedded })
    ));
    assert!(error.is_skip());
    Ok(())
}

#[tokio::test]
async fn test_run_pair_withExistingOutput_shouldNotAlign() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let video = common::create_test_video(temp_dir.path(), "ep01.mkv")?;
    let subtitle = common::create_test_file(temp_dir.path(), "episode one.srt", common::EXTERNAL_SRT)?;
    let existing = common::create_test_file(temp_dir.path(), "ep01.srt", "keep me")?;

    let aligner = FakeAligner::shifting(-2000);
    let calls = aligner.calls();
    let mut controller = controller(Config::default(), japanese_reference_probe(), aligner, ScriptedDecider::new());

    let outcome = controller.run_pair(&video, &[subtitle], temp_dir.path(), false).await?;

    assert_eq!(outcome, PairOutcome::AlreadyExists(existing.clone()));
    assert!(calls.lock().unwrap().is_empty());
    assert_eq!(fs::read_to_string(&existing)?, "keep me");
    Ok(())
}

/// Several candidate files in different languages: the user picks one
#[tokio::test]
async fn test_run_pair_withCandidateFiles_shouldUseChosenFile() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let video = common::create_test_video(temp_dir.path(), "ep01.mkv")?;
    let english = common::create_test_file(temp_dir.path(), "ep01.en.srt", common::ENGLISH_SRT)?;
    let german = common::create_test_file(temp_dir.path(), "ep01.de.ass", HERO_ASS)?;
    let out_dir = temp_dir.path().join("out");

    let decider = ScriptedDecider::new().choosing(&[1]);
    let log = decider.log();
    let mut controller = controller(Config::default(), japanese_reference_probe(), FakeAligner::shifting(-2000), decider);

    let outcome = controller.run_pair(&video, &[english, german], &out_dir, false).await?;

    assert_eq!(log.lock().unwrap().stream_prompts, vec![StreamOrigin::External]);
    let PairOutcome::Synced { output, events, .. } = outcome else {
        panic!("expected a synced pair");
    };
    assert_eq!(output, out_dir.join("ep01.ass"));
    assert_eq!(events, 3);
    Ok(())
}

#[tokio::test]
async fn test_run_pair_withCancelledChoice_shouldFailAsSkip() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let video = common::create_test_video(temp_dir.path(), "ep01.mkv")?;
    let english = common::create_test_file(temp_dir.path(), "ep01.en.srt", common::ENGLISH_SRT)?;
    let german = common::create_test_file(temp_dir.path(), "ep01.de.srt", common::EXTERNAL_SRT)?;

    let mut controller = controller(
        Config::default(),
        japanese_reference_probe(),
        FakeAligner::shifting(0),
        ScriptedDecider::new().cancelling(),
    );

    let error = controller.run_pair(&video, &[english, german], temp_dir.path(), false).await.unwrap_err();
    assert!(matches!(error, SyncError::Selection(SelectionError::Cancelled)));
    assert!(error.is_skip());
    Ok(())
}

/// An embedded track chosen by hand is reused for the next video
#[tokio::test]
async fn test_run_pair_withRememberedTrack_shouldAskOnlyOnce() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let first_video = common::create_test_video(temp_dir.path(), "ep01.mkv")?;
    let second_video = common::create_test_video(temp_dir.path(), "ep02.mkv")?;
    let first_subtitle = common::create_test_file(temp_dir.path(), "ep01.srt", common::EXTERNAL_SRT)?;
    let second_subtitle = common::create_test_file(temp_dir.path(), "ep02.srt", common::EXTERNAL_SRT)?;

    let probe = FakeProbe::new()
        .with_track(track(2, "subrip", Some("eng"), Some("English")), common::ENGLISH_SRT)
        .with_track(track(3, "ass", Some("fre"), Some("Signs & Songs")), common::REFERENCE_ASS);
    let aligner = FakeAligner::shifting(-2000);
    let calls = aligner.calls();
    let decider = ScriptedDecider::new().choosing(&[1]);
    let log = decider.log();
    let mut controller = controller(Config::default(), probe, aligner, decider);

    controller.run_pair(&first_video, &[first_subtitle], temp_dir.path(), true).await?;
    controller.run_pair(&second_video, &[second_subtitle], temp_dir.path(), true).await?;

    assert_eq!(log.lock().unwrap().stream_prompts, vec![StreamOrigin::Embedded]);
    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|call| call.reference_events == 3));
    Ok(())
}

/// Unknown styles are asked about once, written to the decisions file and applied
#[tokio::test]
async fn test_run_pair_withUnknownStyle_shouldAskOnceAndPersist() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let first_video = common::create_test_video(temp_dir.path(), "ep01.mkv")?;
    let second_video = common::create_test_video(temp_dir.path(), "ep02.mkv")?;
    let first_subtitle = common::create_test_file(temp_dir.path(), "ep01.ass", HERO_ASS)?;
    let second_subtitle = common::create_test_file(temp_dir.path(), "ep02.ass", HERO_ASS)?;
    let decisions_file = temp_dir.path().join("decisions.json");

    let mut config = Config::default();
    config.cleaning.decisions_file = Some(decisions_file.clone());
    let aligner = FakeAligner::shifting(-2000);
    let calls = aligner.calls();
    let decider = ScriptedDecider::new().deciding_tags(TagDecision::Drop);
    let log = decider.log();
    let mut controller = controller(config, japanese_reference_probe(), aligner, decider);

    controller.run_pair(&first_video, &[first_subtitle], temp_dir.path(), true).await?;
    controller.run_pair(&second_video, &[second_subtitle], temp_dir.path(), true).await?;

    assert_eq!(log.lock().unwrap().tag_requests, vec![TagRef::style("Hero")]);
    assert_eq!(controller.state().decisions.get(&TagRef::style("Hero")), Some(TagDecision::Drop));

    let stored = TagDecisionCache::load(&decisions_file)?;
    assert_eq!(stored.get(&TagRef::style("Hero")), Some(TagDecision::Drop));

    // Both Hero lines were dropped before aligning, the output still has them
    let calls = calls.lock().unwrap();
    assert!(calls.iter().all(|call| call.target_events == 1));
    let written = SubtitleStream::load(temp_dir.path().join("ep02.ass"), StreamOrigin::External)?;
    assert_eq!(written.event_count(), 3);
    Ok(())
}

/// Dropping every line of the target is an error, not an empty alignment
#[tokio::test]
async fn test_run_pair_withEverythingDropped_shouldFailWithEmptyStream() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let video = common::create_test_video(temp_dir.path(), "ep01.mkv")?;
    let subtitle = common::create_test_file(
        temp_dir.path(),
        "ep01.srt",
        "1\n00:00:01,000 --> 00:00:02,000\n(door creaks)\n\n2\n00:00:03,000 --> 00:00:04,000\n♪ ♪\n",
    )?;

    let aligner = FakeAligner::shifting(0);
    let calls = aligner.calls();
    let mut controller = controller(Config::default(), japanese_reference_probe(), aligner, ScriptedDecider::new());

    let error = controller.run_pair(&video, &[subtitle], temp_dir.path(), true).await.unwrap_err();

    assert!(matches!(error, SyncError::EmptyStream { .. }));
    assert!(!error.is_skip());
    assert!(calls.lock().unwrap().is_empty());
    Ok(())
}

/// Scrub categories are offered once per run, and only when they occur
#[tokio::test]
async fn test_run_pair_withScrubbableText_shouldOfferEachCategoryOnce() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let first_video = common::create_test_video(temp_dir.path(), "ep01.mkv")?;
    let second_video = common::create_test_video(temp_dir.path(), "ep02.mkv")?;
    let first_subtitle = common::create_test_file(temp_dir.path(), "ep01.srt", common::EXTERNAL_SRT)?;
    let second_subtitle = common::create_test_file(temp_dir.path(), "ep02.srt", common::EXTERNAL_SRT)?;

    let decider = ScriptedDecider::new().scrubbing(true);
    let log = decider.log();
    let mut controller = controller(Config::default(), japanese_reference_probe(), FakeAligner::shifting(-2000), decider);

    controller.run_pair(&first_video, &[first_subtitle], temp_dir.path(), true).await?;
    controller.run_pair(&second_video, &[second_subtitle], temp_dir.path(), true).await?;

    let mut asked = log.lock().unwrap().scrub_requests.clone();
    asked.sort();
    assert_eq!(asked, vec![ScrubCategory::SpecialSymbols, ScrubCategory::InitialBrackets]);
    assert!(controller.state().scrubber.is_enabled(ScrubCategory::SpecialSymbols));
    assert!(!controller.state().scrubber.is_enabled(ScrubCategory::Furigana));
    Ok(())
}

#[tokio::test]
async fn test_run_folder_withExistingOutput_shouldReportSkippedAndSynced() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = temp_dir.path().join("season1");
    fs::create_dir(&input)?;
    common::create_test_video(&input, "Show 01.mkv")?;
    common::create_test_video(&input, "Show 02.mkv")?;
    common::create_test_file(&input, "show_01.srt", common::EXTERNAL_SRT)?;
    common::create_test_file(&input, "show_02.srt", common::EXTERNAL_SRT)?;

    let out_dir = temp_dir.path().join("synced");
    fs::create_dir(&out_dir)?;
    common::create_test_file(&out_dir, "Show 01.srt", "already done")?;

    let mut config = Config::default();
    config.output.directory = Some(out_dir.clone());
    let mut controller = controller(config, japanese_reference_probe(), FakeAligner::shifting(-2000), ScriptedDecider::new());

    let summary = controller.run_folder(&input, false).await?;

    assert_eq!(summary.total(), 2);
    assert_eq!(summary.succeeded, vec![input.join("Show 02.mkv")]);
    assert_eq!(summary.skipped.len(), 1);
    assert!(summary.skipped[0].0.ends_with("Show 01.mkv"));
    assert!(!summary.has_failures());
    assert_eq!(fs::read_to_string(out_dir.join("Show 01.srt"))?, "already done");
    assert!(out_dir.join("Show 02.srt").exists());
    Ok(())
}

/// A failing pair does not stop the batch
#[tokio::test]
async fn test_run_folder_withFailingAligner_shouldContinueAndReportFailures() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_test_video(temp_dir.path(), "ep01.mkv")?;
    common::create_test_video(temp_dir.path(), "ep02.mkv")?;
    common::create_test_file(temp_dir.path(), "ep01.srt", common::EXTERNAL_SRT)?;
    common::create_test_file(temp_dir.path(), "ep02.srt", common::EXTERNAL_SRT)?;

    let aligner = FakeAligner::failing();
    let calls = aligner.calls();
    let mut controller = controller(Config::default(), japanese_reference_probe(), aligner, ScriptedDecider::new());

    let summary = controller.run_folder(temp_dir.path(), true).await?;

    assert_eq!(summary.failed.len(), 2);
    assert!(summary.failed[0].1.contains("aligner exited with status 1"));
    assert!(summary.has_failures());
    assert_eq!(calls.lock().unwrap().len(), 2);
    assert_eq!(fs::read_to_string(temp_dir.path().join("ep01.srt"))?, common::EXTERNAL_SRT);
    Ok(())
}

#[tokio::test]
async fn test_run_folder_withUnpairedFiles_shouldFailBeforeProcessing() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_test_video(temp_dir.path(), "ep01.mkv")?;
    common::create_test_video(temp_dir.path(), "ep02.mkv")?;
    common::create_test_file(temp_dir.path(), "ep01.srt", common::EXTERNAL_SRT)?;

    let aligner = FakeAligner::shifting(0);
    let calls = aligner.calls();
    let mut controller = controller(Config::default(), japanese_reference_probe(), aligner, ScriptedDecider::new());

    assert!(controller.run_folder(temp_dir.path(), false).await.is_err());
    assert!(calls.lock().unwrap().is_empty());
    Ok(())
}
