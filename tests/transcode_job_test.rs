//! Transcode job integration tests.
//!
//! Drives [`TranscodeJob`] end to end against the fake ffmpeg/ffprobe
//! scripts from [`common::FakeTools`].

#![cfg(unix)]

mod common;

use common::{ffmpeg_failing, ffmpeg_ok, ffmpeg_script, ffprobe_failing, ffprobe_ok, FakeTools};
use fc_av::{ConversionOptions, Invocation, TranscodeJob};
use fc_core::config::TranscodeConfig;
use fc_core::{Error, JobEvent, ProgressEvent};
use futures::StreamExt;

async fn run_collecting(job: TranscodeJob) -> (fc_core::Result<std::path::PathBuf>, Vec<ProgressEvent>) {
    let mut events = Vec::new();
    let result = job.run(|e| events.push(e)).await;
    (result, events)
}

fn percents(events: &[ProgressEvent]) -> Vec<u8> {
    events.iter().map(|e| e.percent).collect()
}

fn assert_well_formed_success(events: &[ProgressEvent]) {
    let (last, running) = events.split_last().expect("no progress events");
    assert_eq!(last, &ProgressEvent::completed());
    assert_eq!(last.message, "Conversion completed!");
    assert!(running.iter().all(|e| e.percent <= 99), "{:?}", percents(events));
    assert!(
        events.windows(2).all(|w| w[0].percent <= w[1].percent),
        "percent went backwards: {:?}",
        percents(events)
    );
    assert_eq!(events.iter().filter(|e| e.percent == 100).count(), 1);
}

// ---------------------------------------------------------------------------
// Success
// ---------------------------------------------------------------------------

#[tokio::test]
async fn success_with_probed_duration() {
    let tools = FakeTools::new(Some(&ffmpeg_ok()), Some(&ffprobe_ok("10.000000")));
    let input = tools.input("in.mov");
    let output = tools.path("out.mp4");

    let job = TranscodeJob::new(&tools.registry(), &input, &output, ConversionOptions::for_output(&output));
    let (result, events) = run_collecting(job).await;

    assert_eq!(result.unwrap(), output);
    assert!(output.exists());
    assert_well_formed_success(&events);
    assert_eq!(percents(&events), vec![25, 50, 75, 99, 100]);
    assert_eq!(events[0].message, "Converting... 00:00:02.500000");
}

#[tokio::test]
async fn probe_failure_falls_back_to_tool_estimate() {
    let tools = FakeTools::new(Some(&ffmpeg_ok()), Some(&ffprobe_failing()));
    let input = tools.input("in.mov");
    let output = tools.path("out.mkv");

    let mut job = TranscodeJob::new(&tools.registry(), &input, &output, ConversionOptions::new("mkv"));
    assert_eq!(job.probe_duration().await, None);

    let (result, events) = run_collecting(job).await;
    assert!(result.is_ok(), "{result:?}");
    assert_well_formed_success(&events);
    // The 10s banner duration stands in for the failed probe.
    assert!(percents(&events).contains(&50), "{:?}", percents(&events));
}

#[tokio::test]
async fn no_duration_anywhere_holds_at_zero() {
    let ffmpeg = ffmpeg_script(&[], &["00:00:01.000000", "00:00:02.000000"], 0);
    let tools = FakeTools::new(Some(&ffmpeg), None);
    let input = tools.input("in.mov");
    let output = tools.path("out.webm");

    let job = TranscodeJob::new(&tools.registry(), &input, &output, ConversionOptions::new("webm"));
    let (result, events) = run_collecting(job).await;

    assert!(result.is_ok(), "{result:?}");
    assert_well_formed_success(&events);
    let (_, running) = events.split_last().unwrap();
    assert!(!running.is_empty());
    assert!(running.iter().all(|e| e.percent == 0));
    assert!(running[0].message.starts_with("Converting..."));
}

#[tokio::test]
async fn trimmed_job_scales_progress_to_trimmed_length() {
    let tools = FakeTools::new(Some(&ffmpeg_ok()), Some(&ffprobe_ok("10.0")));
    let input = tools.input("in.mov");
    let output = tools.path("clip.mp4");

    let options = ConversionOptions::new("mp4").with_trim(Some(5.0), None);
    let job = TranscodeJob::new(&tools.registry(), &input, &output, options);
    let (result, events) = run_collecting(job).await;

    assert!(result.is_ok(), "{result:?}");
    assert_well_formed_success(&events);
    // 2.5s of a 5s clip.
    assert_eq!(events[0].percent, 50);

    let args = tools.recorded_args();
    let ss = args.iter().position(|a| a == "-ss").expect("-ss missing");
    assert_eq!(args[ss + 1], "5.000");
    assert!(!args.contains(&"-t".to_string()));
}

#[tokio::test]
async fn trimmed_job_without_probe_scales_tool_estimate() {
    let tools = FakeTools::new(Some(&ffmpeg_ok()), Some(&ffprobe_failing()));
    let input = tools.input("in.mov");
    let output = tools.path("clip.mp4");

    let options = ConversionOptions::new("mp4").with_trim(None, Some(5.0));
    let job = TranscodeJob::new(&tools.registry(), &input, &output, options);
    let (result, events) = run_collecting(job).await;

    assert!(result.is_ok(), "{result:?}");
    assert_well_formed_success(&events);
    // 2.5s of a 5s clip of the 10s input from the banner.
    assert_eq!(events[0].percent, 50);
    assert_eq!(percents(&events)[..3], [50, 99, 99]);
}

#[tokio::test]
async fn audio_output_drops_video() {
    let tools = FakeTools::new(Some(&ffmpeg_ok()), Some(&ffprobe_ok("10.0")));
    let input = tools.input("in.mp4");
    let output = tools.path("out.mp3");

    let job = TranscodeJob::new(&tools.registry(), &input, &output, ConversionOptions::for_output(&output));
    let (result, _) = run_collecting(job).await;
    assert!(result.is_ok(), "{result:?}");

    let args = tools.recorded_args();
    assert!(args.contains(&"-vn".to_string()), "{args:?}");
    let ca = args.iter().position(|a| a == "-c:a").unwrap();
    assert_eq!(args[ca + 1], "libmp3lame");
    let ba = args.iter().position(|a| a == "-b:a").unwrap();
    assert_eq!(args[ba + 1], "192k");
    assert_eq!(args.last().map(String::as_str), output.to_str());
}

// ---------------------------------------------------------------------------
// Failure
// ---------------------------------------------------------------------------

#[tokio::test]
async fn transcode_failure_is_reported_without_completion() {
    let tools = FakeTools::new(Some(&ffmpeg_failing()), Some(&ffprobe_ok("10.0")));
    let input = tools.input("in.mp4");
    let output = tools.path("out.avi");

    let job = TranscodeJob::new(&tools.registry(), &input, &output, ConversionOptions::new("avi"));
    let (result, events) = run_collecting(job).await;

    let err = result.unwrap_err();
    assert!(matches!(err, Error::Transcode { .. }), "got {err:?}");
    let msg = err.to_string();
    assert!(msg.starts_with("FFmpeg conversion failed:"), "{msg}");
    assert!(msg.contains("Invalid data found when processing input"), "{msg}");
    assert!(!msg.contains("progress="), "{msg}");
    assert!(!msg.contains("Duration:"), "{msg}");

    assert!(events.iter().all(|e| e.percent < 100));
    assert_eq!(percents(&events), vec![25]);
}

#[tokio::test]
async fn timeout_is_a_transcode_failure() {
    let tools = FakeTools::new(Some("#!/bin/sh\nexec sleep 5\n"), None);
    let input = tools.input("in.mp4");
    let output = tools.path("out.mp4");

    let settings = TranscodeConfig {
        timeout_secs: Some(1),
        ..Default::default()
    };
    let job = TranscodeJob::new(&tools.registry(), &input, &output, ConversionOptions::new("mp4"))
        .with_settings(settings);
    let (result, events) = run_collecting(job).await;

    let err = result.unwrap_err();
    assert!(matches!(err, Error::Transcode { .. }), "got {err:?}");
    assert!(err.to_string().contains("timed out"));
    assert!(events.is_empty());
}

#[tokio::test]
async fn strict_formats_rejects_unknown_format() {
    let tools = FakeTools::new(Some(&ffmpeg_ok()), None);
    let input = tools.input("in.mp4");
    let output = tools.path("out.xyz");

    let settings = TranscodeConfig {
        strict_formats: true,
        ..Default::default()
    };
    let job = TranscodeJob::new(&tools.registry(), &input, &output, ConversionOptions::new("xyz"))
        .with_settings(settings);
    let (result, events) = run_collecting(job).await;

    assert!(matches!(result, Err(Error::InvalidOptions(_))), "{result:?}");
    assert!(events.is_empty());
    assert!(tools.recorded_args().is_empty());
}

// ---------------------------------------------------------------------------
// Concurrency and event streams
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_jobs_are_independent() {
    let ok = FakeTools::new(Some(&ffmpeg_ok()), Some(&ffprobe_ok("10.0")));
    let bad = FakeTools::new(Some(&ffmpeg_failing()), Some(&ffprobe_ok("20.0")));

    let ok_out = ok.path("a.mp4");
    let bad_out = bad.path("b.mp4");
    let ok_job = TranscodeJob::new(&ok.registry(), ok.input("a.mov"), &ok_out, ConversionOptions::new("mp4"));
    let bad_job = TranscodeJob::new(&bad.registry(), bad.input("b.mov"), &bad_out, ConversionOptions::new("mp4"));

    let ((ok_result, ok_events), (bad_result, bad_events)) =
        tokio::join!(run_collecting(ok_job), run_collecting(bad_job));

    assert_eq!(ok_result.unwrap(), ok_out);
    assert_well_formed_success(&ok_events);

    assert!(bad_result.is_err());
    assert!(bad_events.iter().all(|e| e.percent < 100));
    // 2.5s of the 20s probed duration, not of the other job's 10s.
    assert_eq!(percents(&bad_events), vec![13]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn spawned_jobs_stream_events_to_completion() {
    let tools = FakeTools::new(Some(&ffmpeg_ok()), Some(&ffprobe_ok("10.0")));
    let input = tools.input("in.mov");
    let output = tools.path("out.gif");

    let handle = TranscodeJob::new(&tools.registry(), &input, &output, ConversionOptions::new("gif")).spawn();
    let events: Vec<JobEvent> = handle.into_stream().collect().await;

    let (terminal, progress) = events.split_last().unwrap();
    assert_eq!(terminal, &JobEvent::Completed { output: output.clone() });
    assert!(progress.iter().all(|e| !e.is_terminal()));
    assert_eq!(
        progress.last(),
        Some(&JobEvent::Progress(ProgressEvent::completed()))
    );

    let args = tools.recorded_args();
    assert!(args.contains(&"-an".to_string()), "{args:?}");
    assert!(args.contains(&"scale=480:-1".to_string()), "{args:?}");
}

#[tokio::test]
async fn wait_returns_the_job_result() {
    let tools = FakeTools::new(Some(&ffmpeg_failing()), None);
    let input = tools.input("in.mov");
    let output = tools.path("out.flac");

    let handle = TranscodeJob::new(&tools.registry(), &input, &output, ConversionOptions::new("flac")).spawn();
    let err = handle.wait().await.unwrap_err();
    assert!(matches!(err, Error::Transcode { .. }), "got {err:?}");
}

// ---------------------------------------------------------------------------
// Codec defaults
// ---------------------------------------------------------------------------

#[test]
fn codec_defaults_for_every_format() {
    let table: &[(&str, Option<&str>, Option<&str>)] = &[
        ("mp4", Some("libx264"), Some("aac")),
        ("avi", Some("libx264"), Some("aac")),
        ("mov", Some("libx264"), Some("aac")),
        ("mkv", Some("libx264"), Some("aac")),
        ("flv", Some("libx264"), Some("aac")),
        ("webm", Some("libvpx-vp9"), Some("libopus")),
        ("mp3", None, Some("libmp3lame")),
        ("aac", None, Some("aac")),
        ("ogg", None, Some("libvorbis")),
        ("flac", None, Some("flac")),
        ("m4a", None, Some("aac")),
        ("wav", None, Some("pcm_s16le")),
        ("gif", Some("gif"), None),
    ];

    let defaults = TranscodeConfig::default();
    for &(format, video, audio) in table {
        let inv = Invocation::build(&ConversionOptions::new(format), &defaults).unwrap();
        assert_eq!(inv.video_codec.as_deref(), video, "video codec for {format}");
        assert_eq!(inv.audio_codec.as_deref(), audio, "audio codec for {format}");
    }
}

#[test]
fn caller_codecs_override_defaults() {
    let defaults = TranscodeConfig::default();

    let options = ConversionOptions::new("webm").with_video_codec("libvpx");
    let inv = Invocation::build(&options, &defaults).unwrap();
    assert_eq!(inv.video_codec.as_deref(), Some("libvpx"));
    assert_eq!(inv.audio_codec.as_deref(), Some("libopus"));

    let options = ConversionOptions::new("wav").with_audio_codec("pcm_s24le");
    let inv = Invocation::build(&options, &defaults).unwrap();
    assert_eq!(inv.audio_codec.as_deref(), Some("pcm_s24le"));
}
