//! readsync - reading-position sync and narration index for EPUBs

use std::io;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use readsync::cfi::Cfi;
use readsync::config::DEFAULT_CHARS_PER_PAGE;
use readsync::{
    JsonLinesSink, Message, MessageSink, NarratableUnit, ReaderConfig, ReadingSession,
    RecordingSink, epub,
};

#[derive(Parser)]
#[command(name = "readsync")]
#[command(
    version,
    about = "Reading-position sync and narration index for EPUBs",
    long_about = None
)]
#[command(after_help = "EXAMPLES:
    readsync index book.epub --section 3     Print the narration index of section 3
    readsync replay book.epub --narrate      Page through the book as a narrator would
    readsync compare 'epubcfi(/6/4!/4/2/1:0)' 'epubcfi(/6/4!/4/4)'")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// More log output (repeat for more); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Print the narration index of one section as JSON lines
    Index {
        #[arg(value_name = "EPUB")]
        input: String,

        /// Spine position of the section
        #[arg(short, long, default_value_t = 0)]
        section: usize,

        /// Narration selector
        #[arg(long)]
        selector: Option<String>,
    },

    /// Simulate a reading session, printing every message as a JSON line
    Replay {
        #[arg(value_name = "EPUB")]
        input: String,

        /// Characters per page
        #[arg(short, long, default_value_t = DEFAULT_CHARS_PER_PAGE)]
        chars_per_page: usize,

        /// Walk each section's units and turn pages when narration runs ahead
        #[arg(short, long)]
        narrate: bool,
    },

    /// Print how two CFI positions are ordered
    Compare { a: String, b: String },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Command::Index {
            input,
            section,
            selector,
        } => index(&input, section, selector),
        Command::Replay {
            input,
            chars_per_page,
            narrate,
        } => replay(&input, chars_per_page, narrate),
        Command::Compare { a, b } => compare(&a, &b),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => log::LevelFilter::Error,
        (false, 0) => log::LevelFilter::Warn,
        (false, 1) => log::LevelFilter::Info,
        (false, 2) => log::LevelFilter::Debug,
        (false, _) => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .init();
}

fn index(path: &str, section: usize, selector: Option<String>) -> readsync::Result<()> {
    let mut config = ReaderConfig::default();
    if let Some(selector) = selector {
        config = config.with_selector(selector);
    }
    let book = epub::open(path, &config)?;
    let out = JsonLinesSink::new(io::stdout().lock());
    let mut session = ReadingSession::new(book, out, &config)?;

    session.engine_mut().display(section)?;
    session.reindex();
    Ok(())
}

fn replay(path: &str, chars_per_page: usize, narrate: bool) -> readsync::Result<()> {
    let config = ReaderConfig::default().with_chars_per_page(chars_per_page);
    let book = epub::open(path, &config)?;
    log::info!(
        "{path}: {} sections, {} characters",
        book.section_count(),
        book.total_chars()
    );

    let recorder = RecordingSink::new();
    let mut out = JsonLinesSink::new(io::stdout().lock());
    let mut session = ReadingSession::new(book, recorder.clone(), &config)?;

    session.start();
    let mut next = Some(session.engine_mut().display(0)?);
    while let Some(relocation) = next {
        session.relocated(&relocation);
        let units = forward(&recorder, &mut out);

        if narrate {
            for unit in &units {
                while session.should_advance(&unit.position)? {
                    forward(&recorder, &mut out);
                    let Some(turned) = session.engine_mut().next_page() else {
                        break;
                    };
                    session.relocated(&turned);
                    forward(&recorder, &mut out);
                }
                log::info!("narrating {:?}", unit.text);
            }
        }

        next = session.engine_mut().next_page();
    }
    forward(&recorder, &mut out);
    Ok(())
}

/// Write out everything the session emitted and return the units of the
/// last section index among it.
fn forward(recorder: &RecordingSink, out: &mut impl MessageSink) -> Vec<NarratableUnit> {
    let mut units = Vec::new();
    for message in recorder.take() {
        if let Message::SectionIndex { units: indexed, .. } = &message {
            units = indexed.clone();
        }
        out.send(message);
    }
    units
}

fn compare(a: &str, b: &str) -> readsync::Result<()> {
    let ordering = Cfi::parse(a)?.compare(&Cfi::parse(b)?);
    let symbol = match ordering {
        std::cmp::Ordering::Less => "<",
        std::cmp::Ordering::Equal => "=",
        std::cmp::Ordering::Greater => ">",
    };
    println!("{a} {symbol} {b}");
    Ok(())
}
