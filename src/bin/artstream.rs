use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use artstream::{BlockStore, GenerationSession, InMemoryBlockStore, JsonlBlockStore, RegistryOpts};
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "artstream", version)]
struct Cli {
    /// Log debug diagnostics to stderr.
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract output blocks from a text file and print them as JSON.
    Extract(ExtractArgs),
    /// Replay a JSON-lines event stream and print the resulting session state.
    Replay(ReplayArgs),
}

#[derive(Parser, Debug)]
struct ExtractArgs {
    /// Input text (the cumulative model reply).
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Message id used to derive block ids.
    #[arg(long, default_value = "message")]
    message_id: String,
}

#[derive(Parser, Debug)]
struct ReplayArgs {
    /// Input event stream, one JSON event per line.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Append finalized blocks to this JSON-lines file.
    #[arg(long)]
    store: Option<PathBuf>,

    /// Registry options JSON file.
    #[arg(long)]
    opts: Option<PathBuf>,

    /// Do not open the display panel when a block appears.
    #[arg(long)]
    no_auto_open: bool,

    /// Do not persist blocks that were force-completed by an abort.
    #[arg(long)]
    no_persist_forced: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match cli.cmd {
        Command::Extract(args) => cmd_extract(args),
        Command::Replay(args) => cmd_replay(args),
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_extract(args: ExtractArgs) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(&args.in_path)
        .with_context(|| format!("read input '{}'", args.in_path.display()))?;
    let extraction = artstream::extract(&text, &args.message_id);
    println!("{}", serde_json::to_string_pretty(&extraction)?);
    Ok(())
}

fn cmd_replay(args: ReplayArgs) -> anyhow::Result<()> {
    let mut opts = match &args.opts {
        Some(path) => read_opts(path)?,
        None => RegistryOpts::default(),
    };
    if args.no_auto_open {
        opts.auto_open_panel = false;
    }
    if args.no_persist_forced {
        opts.persist_forced = false;
    }

    let f = File::open(&args.in_path)
        .with_context(|| format!("open events '{}'", args.in_path.display()))?;
    let events = artstream::read_events(BufReader::new(f)).with_context(|| "parse events")?;

    let store: Box<dyn BlockStore> = match &args.store {
        Some(path) => Box::new(
            JsonlBlockStore::open(path)
                .with_context(|| format!("open store '{}'", path.display()))?,
        ),
        None => Box::new(InMemoryBlockStore::new()),
    };

    let mut session = GenerationSession::new(store, opts);
    let rejected = session.replay(events);
    if rejected > 0 {
        eprintln!("ignored {rejected} out-of-order event(s)");
    }

    println!("{}", serde_json::to_string_pretty(&session.summary())?);
    Ok(())
}

fn read_opts(path: &Path) -> anyhow::Result<RegistryOpts> {
    let f = File::open(path).with_context(|| format!("open opts '{}'", path.display()))?;
    let opts: RegistryOpts =
        serde_json::from_reader(BufReader::new(f)).with_context(|| "parse registry opts JSON")?;
    Ok(opts)
}
