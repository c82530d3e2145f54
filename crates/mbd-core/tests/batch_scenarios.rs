//! End-to-end batches with in-process collaborators.

mod common;

use std::path::Path;
use std::sync::Arc;

use mbd_core::batch::{BatchRequest, Orchestrator, Target};
use mbd_core::discovery::DiscoveryError;
use mbd_core::error::FailureKind;
use mbd_core::helper::PlaylistInfo;
use mbd_core::pipeline::{Stage, StageResult};
use mbd_core::source::MemorySource;
use mbd_core::transcode::{Codec, OutputFormat};
use mbd_core::variant::{AudioCodec, Container, ItemPolicy, OutputKind, Variant};
use tempfile::tempdir;

use common::fakes::{self, FakeDiscovery, FakePlaylists, FakeTranscoder, Tools};

fn orchestrator(discovery: FakeDiscovery, playlist: Option<PlaylistInfo>, tools: &Tools) -> Orchestrator {
    Orchestrator::new(Arc::new(discovery), Arc::new(FakePlaylists(playlist)), tools.toolkit.clone()).hide_progress()
}

fn single(url: &str, kind: OutputKind, policy: ItemPolicy) -> BatchRequest {
    BatchRequest {
        target: Target::Single(url.to_string()),
        kind,
        policy,
    }
}

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn audio_from_progressive_leaves_only_tagged_mp3() {
    let url = "https://media.example/watch?v=1";
    let discovery = FakeDiscovery::default().with(url, Ok(fakes::media("My Song", fakes::typical_variants())));
    let tools = fakes::tools(FakeTranscoder::default(), false);
    let out = tempdir().unwrap();

    let report = orchestrator(discovery, None, &tools)
        .run(&single(url, OutputKind::Audio, ItemPolicy::default()), out.path())
        .await
        .unwrap();

    assert_eq!(report.len(), 1);
    assert!(report.results[0].is_success(), "{:?}", report.results[0]);
    assert_eq!(file_names(out.path()), vec!["My_Song.mp3"]);

    let specs = tools.transcoder.specs();
    assert_eq!(specs.len(), 1);
    assert_eq!(specs[0].format, OutputFormat::Mp3);
    assert_eq!(specs[0].inputs[0], out.path().join("My_Song.src.mp4.part"));

    let saved = tools.tagger.saved();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].performers, vec!["Some Artist"]);
    assert_eq!(saved[0].title.as_deref(), Some("My Song"));
    assert_eq!(saved[0].cover_mime.as_deref(), Some("image/jpeg"));
}

#[tokio::test]
async fn playlist_drops_item_whose_discovery_times_out() {
    let urls: Vec<String> = (1..=3).map(|i| format!("https://media.example/{}", i)).collect();
    let discovery = FakeDiscovery::default()
        .with(&urls[0], Ok(fakes::media("One", fakes::typical_variants())))
        .with(&urls[1], Err(DiscoveryError::Timeout(urls[1].clone())))
        .with(&urls[2], Ok(fakes::media("Three", fakes::typical_variants())));
    let playlist = PlaylistInfo {
        name: "Road Trip".to_string(),
        urls: urls.clone(),
    };
    let tools = fakes::tools(FakeTranscoder::default(), false);
    let out = tempdir().unwrap();
    let request = BatchRequest {
        target: Target::Playlist("https://media.example/list".to_string()),
        kind: OutputKind::Audio,
        policy: ItemPolicy::default(),
    };

    let report = orchestrator(discovery, Some(playlist), &tools)
        .run(&request, out.path())
        .await
        .unwrap();

    assert_eq!(report.len(), 2);
    assert!(report.failure_lines().is_empty());
    assert_eq!(report.skipped, vec![urls[1].clone()]);
    assert_eq!(file_names(&out.path().join("playlist_Road Trip")), vec!["One.mp3", "Three.mp3"]);
}

#[tokio::test]
async fn split_both_with_high_ceiling_uses_best_available_video() {
    let url = "https://media.example/hd";
    let discovery = FakeDiscovery::default().with(url, Ok(fakes::media("Clip", fakes::typical_variants())));
    let tools = fakes::tools(FakeTranscoder::default(), false);
    let out = tempdir().unwrap();
    let policy = ItemPolicy {
        resolution_ceiling: 2160,
        prefer_progressive: false,
        ..ItemPolicy::default()
    };

    let report = orchestrator(discovery, None, &tools)
        .run(&single(url, OutputKind::Both, policy), out.path())
        .await
        .unwrap();

    let StageResult::Success(ok) = &report.results[0] else {
        panic!("expected success: {:?}", report.results[0]);
    };
    assert_eq!(ok.artifacts, vec![out.path().join("Clip.mp4"), out.path().join("Clip.mp3")]);
    assert_eq!(file_names(out.path()), vec!["Clip.mp3", "Clip.mp4"]);

    let specs = tools.transcoder.specs();
    assert_eq!(specs[0].format, OutputFormat::Mp4);
    assert_eq!(specs[0].tracks[0].codec, Codec::H264);
    assert_eq!(specs[0].tracks[1].codec, Codec::Mp3);
    let fetched_video = std::fs::read(&specs[0].inputs[0]);
    assert!(fetched_video.is_err(), "temp dir should be gone after the run");
    assert!(specs[0].inputs[0].ends_with("video.mp4"));
    assert!(specs[0].inputs[1].ends_with("audio.opus"));
}

#[tokio::test]
async fn failures_are_isolated_per_item() {
    let good = "https://media.example/good";
    let bad = "https://media.example/bad";
    let audio_free = vec![fakes::variant("137", Container::Mp4, AudioCodec::None, Some(1080), None, b"v")];
    let discovery = FakeDiscovery::default()
        .with(good, Ok(fakes::media("Good", fakes::typical_variants())))
        .with(bad, Ok(fakes::media("Bad", audio_free)));
    let playlist = PlaylistInfo {
        name: "mixed".to_string(),
        urls: vec![bad.to_string(), good.to_string()],
    };
    let tools = fakes::tools(FakeTranscoder::default(), false);
    let out = tempdir().unwrap();
    let request = BatchRequest {
        target: Target::Playlist("https://media.example/mixed".to_string()),
        kind: OutputKind::Audio,
        policy: ItemPolicy {
            prefer_audio_quality: true,
            ..ItemPolicy::default()
        },
    };

    let report = orchestrator(discovery, Some(playlist), &tools)
        .run(&request, out.path())
        .await
        .unwrap();

    assert_eq!(report.len(), 2);
    let failure = report.results[0].failure().expect("first item fails");
    assert_eq!(failure.source, bad);
    assert_eq!(failure.kind, FailureKind::NoEligibleVariant);
    assert_eq!(failure.stage, Stage::Selecting);
    assert!(report.results[1].is_success());
    assert_eq!(report.failure_lines(), vec![format!("{}: no eligible audio-only variant", bad)]);
}

#[tokio::test]
async fn waveform_failure_is_a_warning() {
    let url = "https://media.example/wave";
    let discovery = FakeDiscovery::default().with(url, Ok(fakes::media("Wave", fakes::typical_variants())));
    let tools = fakes::tools(FakeTranscoder::failing_on(OutputFormat::Png), false);
    let out = tempdir().unwrap();
    let policy = ItemPolicy {
        derive_waveform: true,
        ..ItemPolicy::default()
    };

    let report = orchestrator(discovery, None, &tools)
        .run(&single(url, OutputKind::Audio, policy), out.path())
        .await
        .unwrap();

    let StageResult::Success(ok) = &report.results[0] else {
        panic!("expected success: {:?}", report.results[0]);
    };
    assert!(ok.warning.as_deref().unwrap_or("").starts_with("waveform not generated"));
    assert_eq!(file_names(out.path()), vec!["Wave.mp3"]);
}

#[tokio::test]
async fn cover_failure_still_saves_tags_then_fails() {
    let url = "https://media.example/nocover";
    let discovery = FakeDiscovery::default().with(url, Ok(fakes::media("NoCover", fakes::typical_variants())));
    let tools = fakes::tools(FakeTranscoder::default(), true);
    let out = tempdir().unwrap();

    let report = orchestrator(discovery, None, &tools)
        .run(&single(url, OutputKind::Audio, ItemPolicy::default()), out.path())
        .await
        .unwrap();

    let failure = report.results[0].failure().expect("item fails");
    assert_eq!(failure.kind, FailureKind::TaggingFailed);
    assert_eq!(failure.stage, Stage::Tagging);
    assert_eq!(tools.tagger.saved().len(), 1);
    assert!(file_names(out.path()).is_empty());
}

#[tokio::test]
async fn playlist_resolution_failure_is_fatal() {
    let tools = fakes::tools(FakeTranscoder::default(), false);
    let out = tempdir().unwrap();
    let request = BatchRequest {
        target: Target::Playlist("https://media.example/gone".to_string()),
        kind: OutputKind::Video,
        policy: ItemPolicy::default(),
    };
    let err = orchestrator(FakeDiscovery::default(), None, &tools)
        .run(&request, out.path())
        .await
        .unwrap_err();
    assert!(format!("{:#}", err).contains("playlist resolution failed"));
    assert!(tools.transcoder.specs().is_empty());
}

#[tokio::test]
async fn duplicate_titles_get_distinct_stems() {
    let a = "https://media.example/a";
    let b = "https://media.example/b";
    let discovery = FakeDiscovery::default()
        .with(a, Ok(fakes::media("Same", fakes::typical_variants())))
        .with(b, Ok(fakes::media("Same", fakes::typical_variants())));
    let playlist = PlaylistInfo {
        name: "dupes".to_string(),
        urls: vec![a.to_string(), b.to_string()],
    };
    let tools = fakes::tools(FakeTranscoder::default(), false);
    let out = tempdir().unwrap();
    let request = BatchRequest {
        target: Target::Playlist("https://media.example/dupes".to_string()),
        kind: OutputKind::Video,
        policy: ItemPolicy::default(),
    };

    let report = orchestrator(discovery, Some(playlist), &tools)
        .run(&request, out.path())
        .await
        .unwrap();

    assert_eq!(report.succeeded(), 2);
    assert_eq!(file_names(&out.path().join("playlist_dupes")), vec!["Same.mp4", "Same_2.mp4"]);
    assert!(tools.transcoder.specs().is_empty());
}

#[tokio::test]
async fn mp3_audio_only_extracts_into_a_different_file() {
    let url = "https://media.example/track";
    let variants = vec![fakes::variant("http_mp3_128", Container::None, AudioCodec::Mp3, None, Some(128), b"mp3-bytes")];
    let discovery = FakeDiscovery::default().with(url, Ok(fakes::media("Track", variants)));
    let tools = fakes::tools(FakeTranscoder::default(), false);
    let out = tempdir().unwrap();
    let policy = ItemPolicy {
        prefer_audio_quality: true,
        ..ItemPolicy::default()
    };

    let report = orchestrator(discovery, None, &tools)
        .run(&single(url, OutputKind::Audio, policy), out.path())
        .await
        .unwrap();

    assert!(report.results[0].is_success(), "{:?}", report.results[0]);
    let specs = tools.transcoder.specs();
    assert_eq!(specs.len(), 1);
    assert_ne!(specs[0].inputs[0], specs[0].output);
    assert_eq!(file_names(out.path()), vec!["Track.mp3"]);
}

fn failing_variant(format_id: &str, container: Container, audio: AudioCodec, resolution: Option<u32>, status: u32) -> Variant {
    let body = b"never delivered".to_vec();
    Variant {
        format_id: format_id.to_string(),
        container,
        audio,
        resolution,
        audio_bitrate: if resolution.is_none() { Some(160) } else { None },
        content_length: Some(body.len() as u64),
        source: Arc::new(MemorySource::new(body).failing(10, status)),
    }
}

#[tokio::test]
async fn failed_split_fetch_removes_temp_dir() {
    let url = "https://media.example/broken-video";
    let variants = vec![
        fakes::variant("251", Container::None, AudioCodec::Opus, None, Some(160), b"audio-160"),
        failing_variant("137", Container::Mp4, AudioCodec::None, Some(1080), 404),
    ];
    let discovery = FakeDiscovery::default().with(url, Ok(fakes::media("Broken", variants)));
    let tools = fakes::tools(FakeTranscoder::default(), false);
    let out = tempdir().unwrap();
    let policy = ItemPolicy {
        prefer_progressive: false,
        ..ItemPolicy::default()
    };

    let report = orchestrator(discovery, None, &tools)
        .run(&single(url, OutputKind::Both, policy), out.path())
        .await
        .unwrap();

    let failure = report.results[0].failure().expect("item fails");
    assert_eq!(failure.kind, FailureKind::TransferFailed);
    assert_eq!(failure.stage, Stage::Fetching);
    assert!(file_names(out.path()).is_empty(), "left behind: {:?}", file_names(out.path()));
    assert!(tools.transcoder.specs().is_empty());
}

#[tokio::test]
async fn failed_fetch_removes_partial_intermediate() {
    let url = "https://media.example/broken-audio";
    let variants = vec![failing_variant("140", Container::None, AudioCodec::Aac, None, 500)];
    let discovery = FakeDiscovery::default().with(url, Ok(fakes::media("Partial", variants)));
    let tools = fakes::tools(FakeTranscoder::default(), false);
    let out = tempdir().unwrap();
    let policy = ItemPolicy {
        prefer_audio_quality: true,
        ..ItemPolicy::default()
    };

    let report = orchestrator(discovery, None, &tools)
        .run(&single(url, OutputKind::Audio, policy), out.path())
        .await
        .unwrap();

    let failure = report.results[0].failure().expect("item fails");
    assert_eq!(failure.kind, FailureKind::TransferFailed);
    assert!(file_names(out.path()).is_empty(), "left behind: {:?}", file_names(out.path()));
}

#[tokio::test]
async fn crashed_discovery_skips_item_without_failing_batch() {
    let ok = "https://media.example/ok";
    let crash = "https://media.example/crash";
    let discovery = FakeDiscovery::default()
        .with(ok, Ok(fakes::media("Fine", fakes::typical_variants())))
        .panicking(crash);
    let playlist = PlaylistInfo {
        name: "crashy".to_string(),
        urls: vec![crash.to_string(), ok.to_string()],
    };
    let tools = fakes::tools(FakeTranscoder::default(), false);
    let out = tempdir().unwrap();
    let request = BatchRequest {
        target: Target::Playlist("https://media.example/crashy".to_string()),
        kind: OutputKind::Video,
        policy: ItemPolicy::default(),
    };

    let report = orchestrator(discovery, Some(playlist), &tools)
        .run(&request, out.path())
        .await
        .expect("a crashed discovery is not fatal");

    assert_eq!(report.len(), 1);
    assert!(report.results[0].is_success());
    assert_eq!(report.skipped, vec![crash.to_string()]);
}
