use std::{
    fs::File,
    io::{BufReader, Write as _},
    path::{Path, PathBuf},
    rc::Rc,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use invita::{
    Invitation, InvitationConfig, MemoryOutput, Millis, Point, Scheduler, SimulatedClock,
    audio::AudioOutput,
};

#[derive(Parser, Debug)]
#[command(name = "invita", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the resolved choreography (every timeline with absolute step times) as JSON.
    Describe(DescribeArgs),
    /// Drive the page with a scripted guest and print every event as a JSON line.
    Simulate(SimulateArgs),
}

#[derive(Parser, Debug)]
struct DescribeArgs {
    /// Page configuration JSON. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct SimulateArgs {
    /// Page configuration JSON. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Guest script JSON. Without one the guest confirms at 1s and opens the gate at 4s.
    #[arg(long)]
    script: Option<PathBuf>,

    /// Display frame length; overrides the configuration.
    #[arg(long)]
    frame_ms: Option<u64>,

    /// Stop after this much virtual time.
    #[arg(long, default_value_t = 12_000)]
    until_ms: u64,

    /// Wall-clock start of the simulation (RFC 3339). Defaults to now.
    #[arg(long)]
    now: Option<String>,

    /// Simulate a host without an audio element.
    #[arg(long)]
    no_audio: bool,
}

#[derive(Clone, Debug, serde::Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum Action {
    ConfirmEntry,
    OpenGate,
    Intersect { id: String, fraction: f64 },
    PointerMove { x: f64, y: f64 },
    PointerDown,
    PointerUp,
    Hover { interactive: bool },
    ToggleAudio,
    OpenPhoto { index: usize },
    NextPhoto,
    PrevPhoto,
    ClosePhoto,
}

#[derive(Clone, Debug, serde::Deserialize)]
struct ScriptStep {
    at_ms: Millis,
    #[serde(flatten)]
    action: Action,
}

#[derive(Debug, Default, serde::Deserialize)]
struct Script {
    #[serde(default)]
    steps: Vec<ScriptStep>,
}

impl Script {
    fn default_guest() -> Self {
        Self {
            steps: vec![
                ScriptStep {
                    at_ms: Millis(1000),
                    action: Action::ConfirmEntry,
                },
                ScriptStep {
                    at_ms: Millis(4000),
                    action: Action::OpenGate,
                },
            ],
        }
    }
}

#[derive(serde::Serialize)]
struct Summary<'a> {
    at: Millis,
    state: Option<invita::EntryState>,
    mounted: Vec<invita::Section>,
    countdown: Option<invita::Remaining>,
    cursor: Option<invita::tracker::CursorSnapshot>,
    playback: invita::Playback,
    photo: Option<usize>,
    stage: &'a invita::Stage,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Describe(args) => cmd_describe(args),
        Command::Simulate(args) => cmd_simulate(args),
    }
}

fn read_config(path: Option<&Path>) -> anyhow::Result<InvitationConfig> {
    match path {
        Some(path) => Ok(InvitationConfig::from_path(path)?),
        None => Ok(InvitationConfig::default()),
    }
}

fn read_script(path: &Path) -> anyhow::Result<Script> {
    let f = File::open(path).with_context(|| format!("open script '{}'", path.display()))?;
    let script: Script =
        serde_json::from_reader(BufReader::new(f)).with_context(|| "parse script JSON")?;
    Ok(script)
}

fn cmd_describe(args: DescribeArgs) -> anyhow::Result<()> {
    let cfg = read_config(args.config.as_deref())?;

    let mut sections = serde_json::Map::new();
    for section in &cfg.sections {
        sections.insert(
            section.id.clone(),
            serde_json::json!({
                "threshold": section.threshold,
                "schedule": section.timeline.schedule()?,
            }),
        );
    }
    let out = serde_json::json!({
        "pre_entry": cfg.pre_entry,
        "gate": cfg.gate.schedule()?,
        "couple_reveal": cfg.couple_reveal.schedule()?,
        "sections": sections,
        "countdown": cfg.countdown,
        "cursor": cfg.cursor,
        "audio": cfg.audio,
        "gallery_photos": cfg.gallery_photos,
        "frame_ms": cfg.frame_ms,
    });

    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn cmd_simulate(args: SimulateArgs) -> anyhow::Result<()> {
    let mut cfg = read_config(args.config.as_deref())?;
    if let Some(frame) = args.frame_ms {
        anyhow::ensure!(frame > 0, "--frame-ms must be > 0");
        cfg.frame_ms = Millis(frame);
    }
    let frame = cfg.frame_ms;

    let mut steps = match &args.script {
        Some(path) => read_script(path)?.steps,
        None => Script::default_guest().steps,
    };
    steps.sort_by_key(|s| s.at_ms);

    let epoch_ms = match &args.now {
        Some(now) => chrono::DateTime::parse_from_rfc3339(now)
            .with_context(|| format!("parse --now '{now}'"))?
            .timestamp_millis(),
        None => chrono::Utc::now().timestamp_millis(),
    };

    let scheduler = Scheduler::new();
    let clock = Rc::new(SimulatedClock::new(&scheduler, epoch_ms));
    let output: Box<dyn AudioOutput> = if args.no_audio {
        Box::new(MemoryOutput::unavailable())
    } else {
        Box::new(MemoryOutput::new())
    };
    let mut page = Invitation::new(&scheduler, cfg, output, clock)?;
    page.start()?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let until = Millis(args.until_ms);
    let mut next = 0;

    loop {
        while let Some(step) = steps.get(next)
            && step.at_ms <= scheduler.now()
        {
            apply(&mut page, &step.action)?;
            next += 1;
        }
        for event in page.take_events() {
            writeln!(out, "{}", serde_json::to_string(&event)?)?;
        }
        if scheduler.now() >= until {
            break;
        }
        scheduler.tick_frame(frame.min(until - scheduler.now()));
    }

    let stage = page.stage();
    let stage = stage.borrow();
    let summary = Summary {
        at: scheduler.now(),
        state: page.state(),
        mounted: page.mounted(),
        countdown: page.countdown(),
        cursor: page.cursor(),
        playback: page.audio().playback(),
        photo: page.photo(),
        stage: &stage,
    };
    writeln!(out, "{}", serde_json::to_string(&summary)?)?;
    Ok(())
}

fn apply(page: &mut Invitation, action: &Action) -> anyhow::Result<()> {
    tracing::debug!(?action, "script step");
    match action {
        Action::ConfirmEntry => {
            page.confirm_entry()?;
        }
        Action::OpenGate => {
            page.open_gate();
        }
        Action::Intersect { id, fraction } => {
            page.intersect(id, *fraction);
        }
        Action::PointerMove { x, y } => page.pointer_move(Point::new(*x, *y)),
        Action::PointerDown => page.pointer_down(),
        Action::PointerUp => page.pointer_up(),
        Action::Hover { interactive } => page.hover(*interactive),
        Action::ToggleAudio => {
            page.toggle_audio();
        }
        Action::OpenPhoto { index } => {
            page.open_photo(*index);
        }
        Action::NextPhoto => {
            page.next_photo();
        }
        Action::PrevPhoto => {
            page.prev_photo();
        }
        Action::ClosePhoto => page.close_photo(),
    }
    Ok(())
}
