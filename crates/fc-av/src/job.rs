//! A single conversion: probe the input, build the ffmpeg invocation, run it,
//! and report normalized progress.
//!
//! Each [`TranscodeJob`] owns its paths and its child process; nothing is
//! shared between jobs, so any number of them can run concurrently on one
//! runtime. There is no retry and no cancellation hook here. Dropping the
//! future returned by [`TranscodeJob::run`] kills the child, which is how a
//! caller-side watchdog bounds a run.

use std::path::{Path, PathBuf};
use std::time::Duration;

use fc_core::config::TranscodeConfig;
use fc_core::{Error, JobEvent, ProgressEvent};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, error, info, trace, warn};

use crate::command::{StderrLine, ToolCommand};
use crate::options::{ConversionOptions, Invocation};
use crate::probe::FfprobeProber;
use crate::progress::{trimmed_length, ParsedLine, ProgressParser, ProgressTracker};
use crate::tools::ToolRegistry;

/// One conversion of `input` into `output`.
#[derive(Debug, Clone)]
pub struct TranscodeJob {
    input: PathBuf,
    output: PathBuf,
    options: ConversionOptions,
    settings: TranscodeConfig,
    ffmpeg: Option<PathBuf>,
    ffprobe: Option<PathBuf>,
    duration_secs: Option<f64>,
    probed: bool,
}

impl TranscodeJob {
    /// Create a job using the tools found in `tools` and default settings.
    ///
    /// A missing ffmpeg is not an error here; it surfaces from [`run`](Self::run).
    pub fn new(
        tools: &ToolRegistry,
        input: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        options: ConversionOptions,
    ) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            options,
            settings: TranscodeConfig::default(),
            ffmpeg: tools.path("ffmpeg").map(Path::to_path_buf),
            ffprobe: tools.path("ffprobe").map(Path::to_path_buf),
            duration_secs: None,
            probed: false,
        }
    }

    /// Replace the default transcode settings.
    pub fn with_settings(mut self, settings: TranscodeConfig) -> Self {
        self.settings = settings;
        self
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn options(&self) -> &ConversionOptions {
        &self.options
    }

    /// Probed input duration, once [`probe_duration`](Self::probe_duration)
    /// has succeeded.
    pub fn duration_secs(&self) -> Option<f64> {
        self.duration_secs
    }

    /// The ffmpeg invocation this job will run.
    pub fn invocation(&self) -> fc_core::Result<Invocation> {
        Invocation::build(&self.options, &self.settings)
    }

    /// Probe the input duration with ffprobe.
    ///
    /// Best effort: any failure is logged and yields `None`, leaving progress
    /// to ffmpeg's own estimate. The probe runs at most once per job.
    pub async fn probe_duration(&mut self) -> Option<f64> {
        if self.probed {
            return self.duration_secs;
        }
        self.probed = true;

        let Some(ffprobe) = self.ffprobe.clone() else {
            warn!(
                "Could not get duration of {}: ffprobe not found",
                self.input.display()
            );
            return None;
        };

        let prober = FfprobeProber::new(ffprobe)
            .with_timeout(Duration::from_secs(self.settings.probe_timeout_secs));

        match prober.duration(&self.input).await {
            Ok(d) => {
                debug!("Duration of {}: {d:.3}s", self.input.display());
                self.duration_secs = Some(d);
                Some(d)
            }
            Err(e) => {
                warn!("Could not get duration of {}: {e}", self.input.display());
                None
            }
        }
    }

    /// Seconds of output the run should produce, accounting for trimming.
    fn expected_output_secs(&self) -> Option<f64> {
        trimmed_length(
            self.duration_secs?,
            self.options.start_offset(),
            self.options.length_limit(),
        )
    }

    /// Run the conversion, handing each progress update to `sink`.
    ///
    /// Intermediate updates report at most 99%. On success `sink` receives a
    /// final `(100, "Conversion completed!")` and the output path is returned.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidOptions`] if the options cannot be mapped to an
    ///   invocation.
    /// - [`Error::Transcode`] if ffmpeg is missing, cannot be spawned, times
    ///   out or exits unsuccessfully. Partial output is left in place.
    pub async fn run<F>(mut self, mut sink: F) -> fc_core::Result<PathBuf>
    where
        F: FnMut(ProgressEvent),
    {
        self.probe_duration().await;

        let invocation = self.invocation()?;
        let ffmpeg = self
            .ffmpeg
            .clone()
            .ok_or_else(|| Error::transcode("ffmpeg not found; is it installed and in PATH?"))?;

        let args = invocation.to_args(&self.input, &self.output);
        info!(
            "Converting {} -> {} (format={}, family={}, video={:?}, audio={:?})",
            self.input.display(),
            self.output.display(),
            invocation.format,
            invocation.family,
            invocation.video_codec,
            invocation.audio_codec,
        );
        debug!("FFmpeg args: {:?}", args);

        let mut cmd = ToolCommand::new(ffmpeg);
        cmd.args(args);
        match self.settings.timeout_secs {
            Some(secs) => cmd.timeout(Duration::from_secs(secs)),
            None => cmd.unbounded(),
        };

        let mut parser = ProgressParser::new()
            .with_trim(self.options.start_offset(), self.options.length_limit());
        let mut tracker = ProgressTracker::new(self.expected_output_secs());

        let result = cmd
            .execute_with_stderr_callback(|line| match parser.feed(line) {
                ParsedLine::Tick(tick) => {
                    let event = tracker.update(&tick);
                    trace!(percent = event.percent, "{}", event.message);
                    sink(event);
                    StderrLine::Skip
                }
                ParsedLine::Field => StderrLine::Skip,
                ParsedLine::Other => StderrLine::Keep,
            })
            .await;

        match result {
            Ok(_) => {
                sink(ProgressEvent::completed());
                info!("Conversion completed: {}", self.output.display());
                Ok(self.output)
            }
            Err(e) => {
                let err = match e {
                    Error::Tool { message, .. } => Error::transcode(message),
                    other => other,
                };
                error!("Conversion error for {}: {err}", self.input.display());
                Err(err)
            }
        }
    }

    /// Run the conversion on a spawned task and observe it through a channel.
    ///
    /// The handle yields [`JobEvent::Progress`] for every update (the 100%
    /// event included) followed by exactly one [`JobEvent::Completed`] or
    /// [`JobEvent::Failed`].
    pub fn spawn(self) -> TranscodeHandle {
        let (tx, rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(async move {
            let progress_tx = tx.clone();
            let result = self
                .run(move |event| {
                    let _ = progress_tx.send(JobEvent::Progress(event));
                })
                .await;

            let terminal = match &result {
                Ok(output) => JobEvent::Completed {
                    output: output.clone(),
                },
                Err(e) => JobEvent::Failed {
                    error: e.to_string(),
                },
            };
            if tx.send(terminal).is_err() {
                debug!("No subscribers for transcode events");
            }
            result
        });

        TranscodeHandle { events: rx, task }
    }
}

/// Handle to a job started with [`TranscodeJob::spawn`].
#[derive(Debug)]
pub struct TranscodeHandle {
    events: mpsc::UnboundedReceiver<JobEvent>,
    task: JoinHandle<fc_core::Result<PathBuf>>,
}

impl TranscodeHandle {
    /// Next event, or `None` once the terminal event has been consumed.
    pub async fn next_event(&mut self) -> Option<JobEvent> {
        self.events.recv().await
    }

    /// Turn the handle into an event stream. The job keeps running detached.
    pub fn into_stream(self) -> UnboundedReceiverStream<JobEvent> {
        UnboundedReceiverStream::new(self.events)
    }

    /// Wait for the job and return its result, discarding unread events.
    pub async fn wait(self) -> fc_core::Result<PathBuf> {
        self.task
            .await
            .map_err(|e| Error::Internal(format!("transcode task failed: {e}")))?
    }
}
