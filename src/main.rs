mod cli;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands, ConvertArgs};
use fc_av::{ConversionOptions, FfprobeProber, ToolRegistry, TranscodeJob};
use fc_core::config::Config;
use fc_core::JobEvent;
use tokio_stream::StreamExt;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "fileconv=trace,fc_av=trace,fc_core=debug".to_string()
        } else {
            "fileconv=info,fc_av=warn,fc_core=warn".to_string()
        }
    });

    // Logs go to stderr so stdout stays machine-readable with --json.
    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load_or_default(cli.config.as_deref());

    match cli.command {
        Commands::Convert(args) => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(convert(args, &config))
        }
        Commands::Probe { file } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(probe_file(&file, &config))
        }
        Commands::CheckTools => check_tools(&config),
        Commands::Codecs { encoders_only } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(list_codecs(&config, encoders_only))
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("fileconv {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn convert(args: ConvertArgs, config: &Config) -> Result<()> {
    if !args.input.exists() {
        anyhow::bail!("Input file does not exist: {:?}", args.input);
    }

    let mut options = match args.format {
        Some(f) => ConversionOptions::new(f),
        None => ConversionOptions::for_output(&args.output),
    };
    options.codec.video = args.video_codec;
    options.codec.audio = args.audio_codec;
    options.quality.video = args.video_bitrate;
    options.quality.audio = args.audio_bitrate;
    options.quality.fps = args.fps;
    options.quality.size = args.size;
    options = options.with_trim(args.start, args.duration);

    let tools = ToolRegistry::discover(&config.tools);
    let job = TranscodeJob::new(&tools, &args.input, &args.output, options)
        .with_settings(config.transcode.clone());

    let mut events = job.spawn().into_stream();
    let mut failure = None;

    while let Some(event) = events.next().await {
        if args.json {
            println!("{}", serde_json::to_string(&event)?);
        }
        match event {
            JobEvent::Progress(p) if !args.json => {
                println!("[{:>3}%] {}", p.percent, p.message);
            }
            JobEvent::Completed { output } if !args.json => {
                println!("Output: {}", output.display());
            }
            JobEvent::Failed { error } => failure = Some(error),
            _ => {}
        }
    }

    match failure {
        Some(error) => Err(anyhow::anyhow!(error)),
        None => Ok(()),
    }
}

async fn probe_file(file: &Path, config: &Config) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let tools = ToolRegistry::discover(&config.tools);
    let duration = match tools.require("ffprobe") {
        Ok(ffprobe) => FfprobeProber::new(ffprobe.path.clone())
            .with_timeout(std::time::Duration::from_secs(
                config.transcode.probe_timeout_secs,
            ))
            .duration(file)
            .await,
        Err(e) => Err(e),
    };

    println!("File: {}", file.display());
    match duration {
        Ok(secs) => {
            let whole = secs as u64;
            println!(
                "Duration: {:02}:{:02}:{:02} ({secs:.3}s)",
                whole / 3600,
                (whole / 60) % 60,
                whole % 60
            );
        }
        Err(e) => {
            tracing::warn!("Could not get duration of {}: {e}", file.display());
            println!("Duration: unknown");
        }
    }

    Ok(())
}

fn check_tools(config: &Config) -> Result<()> {
    println!("Checking external tools...\n");

    let tools = ToolRegistry::discover(&config.tools).check_all();
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version);
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Install ffmpeg to enable conversions.");
    }

    Ok(())
}

async fn list_codecs(config: &Config, encoders_only: bool) -> Result<()> {
    let tools = ToolRegistry::discover(&config.tools);
    let version = tools
        .ffmpeg_version()
        .await
        .context("cannot list codecs")?;
    println!("{version}\n");

    let codecs = fc_av::supported_codecs(&tools).await;
    let mut shown = 0;
    for codec in codecs.iter().filter(|c| c.encode || !encoders_only) {
        println!(
            "{}{} {:<7} {:<20} {}",
            if codec.decode { 'D' } else { '.' },
            if codec.encode { 'E' } else { '.' },
            format!("{:?}", codec.kind).to_lowercase(),
            codec.name,
            codec.description
        );
        shown += 1;
    }

    println!("\n{shown} codecs");
    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = Config::load(p).with_context(|| format!("invalid config {:?}", p))?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    let t = &config.transcode;
    println!("  Video bitrate: {}", t.video_bitrate);
    println!("  Audio bitrate: {}", t.audio_bitrate);
    println!("  Preset: {}", t.preset);
    println!("  GIF: {} fps, {} px wide", t.gif_fps, t.gif_width);
    match t.timeout_secs {
        Some(secs) => println!("  Timeout: {secs}s"),
        None => println!("  Timeout: none"),
    }

    let warnings = config.validate();
    for w in &warnings {
        println!("  ⚠ {w}");
    }
    if warnings.is_empty() {
        println!("  No warnings");
    }

    Ok(())
}
