//! CLI entry point for the memscan memory inspector.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use memscan_core::{
    parse_int, BankedBus, MemoryFlags, MemorySpace, ResultKind, SearchKind, SearchResult,
    SearchTarget, SliceRange, ViewKind,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

const USAGE_TEXT: &str = "\
Usage: memscan <command> [options]

Commands:
  peek   <image> <address>                 Print values read through a typed view
  poke   <image> <address> <value>         Write a masked value and save the image
  search <image> <value>                   Scan an image for a value
  track  <image> <value> [<image> <value>]...
                                           Scan the first snapshot, then narrow the
                                           candidates on each following snapshot

Options:
  --view <u8|u16|u32|s8|s16|s32>   View used by peek/poke (default: u8)
  --count <n>                      Number of values printed by peek (default: 1)
  --base <address>                 Image offset of logical address 0 (default: 0)
  -o, --output <file>              Output image for poke (default: overwrite input)
  --kind <int8|int16|int32|guess|string>
                                   Search mode (default: guess)
  --flags <r|w|rw>                 Block eligibility filter (default: rw)
  --limit <n>                      Result cap of an initial scan (default: 10000)
  -h, --help                       Show this help message

Numbers accept decimal or 0x-prefixed hexadecimal.

Examples:
  memscan peek save.bin 0x40 --view u16 --count 4
  memscan poke save.bin 0x40 999 --view u16 -o patched.bin
  memscan search save.bin 42 --kind int8
  memscan track before.bin 100 after.bin 96
";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Peek(PeekArgs),
    Poke(PokeArgs),
    Search(SearchArgs),
    Track(TrackArgs),
}

#[derive(Debug, PartialEq, Eq)]
struct PeekArgs {
    image: PathBuf,
    address: i64,
    view: ViewKind,
    count: usize,
    base: u32,
}

#[derive(Debug, PartialEq, Eq)]
struct PokeArgs {
    image: PathBuf,
    address: i64,
    value: i64,
    view: ViewKind,
    base: u32,
    output: Option<PathBuf>,
}

#[derive(Debug, PartialEq, Eq)]
struct SearchArgs {
    image: PathBuf,
    target: String,
    kind: SearchKind,
    flags: MemoryFlags,
    limit: Option<usize>,
}

#[derive(Debug, PartialEq, Eq)]
struct TrackArgs {
    snapshots: Vec<(PathBuf, String)>,
    kind: SearchKind,
    flags: MemoryFlags,
}

#[derive(Debug)]
enum ParseResult {
    Command(Command),
    Help,
}

/// Options shared by every command; each command validates which ones it
/// accepts.
#[derive(Debug, Default)]
struct Options {
    positional: Vec<String>,
    view: Option<ViewKind>,
    count: Option<usize>,
    base: Option<u32>,
    output: Option<PathBuf>,
    kind: Option<SearchKind>,
    flags: Option<MemoryFlags>,
    limit: Option<usize>,
}

fn parse_args(mut args: impl Iterator<Item = OsString>) -> Result<ParseResult, String> {
    let first = args.next().ok_or_else(|| "missing command".to_string())?;

    if first == "--help" || first == "-h" {
        return Ok(ParseResult::Help);
    }

    let command_str = first.to_string_lossy().to_string();
    let options = parse_options(args)?;

    let command = match command_str.as_str() {
        "peek" => Command::Peek(peek_args(options)?),
        "poke" => Command::Poke(poke_args(options)?),
        "search" => Command::Search(search_args(options)?),
        "track" => Command::Track(track_args(options)?),
        other => return Err(format!("unknown command: {other}")),
    };
    Ok(ParseResult::Command(command))
}

fn next_value(args: &mut impl Iterator<Item = OsString>, flag: &str) -> Result<String, String> {
    args.next()
        .map(|value| value.to_string_lossy().to_string())
        .ok_or_else(|| format!("missing value for {flag}"))
}

fn parse_number(text: &str) -> Result<i64, String> {
    parse_int(text).ok_or_else(|| format!("invalid number: {text}"))
}

fn parse_count(text: &str) -> Result<usize, String> {
    parse_number(text)
        .and_then(|value| usize::try_from(value).map_err(|_| format!("invalid count: {text}")))
}

fn parse_address(text: &str) -> Result<u32, String> {
    parse_number(text)
        .and_then(|value| u32::try_from(value).map_err(|_| format!("invalid address: {text}")))
}

#[allow(clippy::while_let_on_iterator)]
fn parse_options(mut args: impl Iterator<Item = OsString>) -> Result<Options, String> {
    let mut options = Options::default();

    while let Some(arg) = args.next() {
        let arg = arg.to_string_lossy().to_string();
        match arg.as_str() {
            "--help" | "-h" => return Err(USAGE_TEXT.to_string()),
            "--view" => {
                let value = next_value(&mut args, "--view")?;
                let view =
                    ViewKind::from_name(&value).ok_or_else(|| format!("unknown view: {value}"))?;
                options.view = Some(view);
            }
            "--count" => options.count = Some(parse_count(&next_value(&mut args, "--count")?)?),
            "--base" => options.base = Some(parse_address(&next_value(&mut args, "--base")?)?),
            "-o" | "--output" => {
                options.output = Some(PathBuf::from(next_value(&mut args, "-o")?));
            }
            "--kind" => {
                let value = next_value(&mut args, "--kind")?;
                let kind = SearchKind::from_name(&value)
                    .ok_or_else(|| format!("unknown search kind: {value}"))?;
                options.kind = Some(kind);
            }
            "--flags" => {
                let value = next_value(&mut args, "--flags")?;
                let flags = MemoryFlags::from_name(&value)
                    .ok_or_else(|| format!("unknown flags: {value}"))?;
                options.flags = Some(flags);
            }
            "--limit" => options.limit = Some(parse_count(&next_value(&mut args, "--limit")?)?),
            // Negative numbers are values, not options.
            other if other.starts_with('-') && parse_int(other).is_none() => {
                return Err(format!("unknown option: {other}"));
            }
            _ => options.positional.push(arg),
        }
    }

    Ok(options)
}

fn reject(present: bool, option: &str, command: &str) -> Result<(), String> {
    if present {
        Err(format!("{option} is not accepted by {command}"))
    } else {
        Ok(())
    }
}

fn peek_args(options: Options) -> Result<PeekArgs, String> {
    reject(options.output.is_some(), "--output", "peek")?;
    reject(options.kind.is_some(), "--kind", "peek")?;
    reject(options.flags.is_some(), "--flags", "peek")?;
    reject(options.limit.is_some(), "--limit", "peek")?;
    let [image, address] = <[String; 2]>::try_from(options.positional)
        .map_err(|_| "peek expects <image> <address>".to_string())?;
    Ok(PeekArgs {
        image: PathBuf::from(image),
        address: parse_number(&address)?,
        view: options.view.unwrap_or(ViewKind::U8),
        count: options.count.unwrap_or(1),
        base: options.base.unwrap_or(0),
    })
}

fn poke_args(options: Options) -> Result<PokeArgs, String> {
    reject(options.count.is_some(), "--count", "poke")?;
    reject(options.kind.is_some(), "--kind", "poke")?;
    reject(options.flags.is_some(), "--flags", "poke")?;
    reject(options.limit.is_some(), "--limit", "poke")?;
    let [image, address, value] = <[String; 3]>::try_from(options.positional)
        .map_err(|_| "poke expects <image> <address> <value>".to_string())?;
    Ok(PokeArgs {
        image: PathBuf::from(image),
        address: parse_number(&address)?,
        value: parse_number(&value)?,
        view: options.view.unwrap_or(ViewKind::U8),
        base: options.base.unwrap_or(0),
        output: options.output,
    })
}

fn search_args(options: Options) -> Result<SearchArgs, String> {
    reject(options.view.is_some(), "--view", "search")?;
    reject(options.count.is_some(), "--count", "search")?;
    reject(options.base.is_some(), "--base", "search")?;
    reject(options.output.is_some(), "--output", "search")?;
    let [image, target] = <[String; 2]>::try_from(options.positional)
        .map_err(|_| "search expects <image> <value>".to_string())?;
    Ok(SearchArgs {
        image: PathBuf::from(image),
        target,
        kind: options.kind.unwrap_or(SearchKind::Guess),
        flags: options.flags.unwrap_or_default(),
        limit: options.limit,
    })
}

fn track_args(options: Options) -> Result<TrackArgs, String> {
    reject(options.view.is_some(), "--view", "track")?;
    reject(options.count.is_some(), "--count", "track")?;
    reject(options.base.is_some(), "--base", "track")?;
    reject(options.output.is_some(), "--output", "track")?;
    reject(options.limit.is_some(), "--limit", "track")?;
    if options.positional.is_empty() || options.positional.len() % 2 != 0 {
        return Err("track expects <image> <value> pairs".to_string());
    }
    let snapshots = options
        .positional
        .chunks_exact(2)
        .map(|pair| (PathBuf::from(&pair[0]), pair[1].clone()))
        .collect();
    Ok(TrackArgs {
        snapshots,
        kind: options.kind.unwrap_or(SearchKind::Guess),
        flags: options.flags.unwrap_or_default(),
    })
}

fn fail(message: &str) -> i32 {
    eprintln!("error: {message}");
    1
}

fn load_space(path: &Path, base: u32) -> Result<MemorySpace<BankedBus>, String> {
    let bytes = fs::read(path).map_err(|e| format!("failed to read {}: {e}", path.display()))?;
    let len = bytes.len();
    debug!(image = %path.display(), bytes = len, base, "loaded image");
    let size = usize::try_from(base)
        .ok()
        .and_then(|base| len.checked_sub(base))
        .ok_or_else(|| format!("base {base:#x} is past the end of {}", path.display()))?;
    MemorySpace::new(BankedBus::flat(bytes), size, base)
        .map_err(|e| format!("{}: {e}", path.display()))
}

fn run_peek(args: &PeekArgs) -> Result<(), i32> {
    let mut space = load_space(&args.image, args.base).map_err(|e| fail(&e))?;
    let width = args.view.width().bytes();
    let stop = i64::try_from(args.count)
        .ok()
        .and_then(|count| count.checked_mul(i64::from(width)))
        .and_then(|span| span.checked_add(args.address))
        .ok_or_else(|| fail("peek range overflows"))?;
    let values: Vec<i64> = space
        .read_slice(args.view, SliceRange::new(args.address, stop))
        .map_err(|e| fail(&e.to_string()))?
        .collect();
    let addresses = (args.address..).step_by(usize::from(width));
    for (address, value) in addresses.zip(values) {
        println!("{address:#010x}: {value}");
    }
    Ok(())
}

fn run_poke(args: PokeArgs) -> Result<(), i32> {
    let mut space = load_space(&args.image, args.base).map_err(|e| fail(&e))?;
    space
        .write(args.view, args.address, args.value)
        .map_err(|e| fail(&e.to_string()))?;
    let written = space
        .read(args.view, args.address)
        .map_err(|e| fail(&e.to_string()))?;
    let bus = space.into_backend();
    let bytes = bus
        .block_contents(0)
        .ok_or_else(|| fail("image block missing"))?;
    let output = args.output.unwrap_or(args.image);
    if let Err(e) = fs::write(&output, bytes) {
        return Err(fail(&format!("failed to write {}: {e}", output.display())));
    }
    println!(
        "Wrote {written} at {:#x} -> {}",
        args.address,
        output.display()
    );
    Ok(())
}

fn describe(result: &SearchResult, space: &MemorySpace<BankedBus>) -> String {
    let kind = match result.kind() {
        ResultKind::Int(width) => format!("int{}", width.bits()),
        ResultKind::Guessed(width) => format!("guess{}", width.bits()),
        ResultKind::Text { len } => format!("string[{len}]"),
    };
    let value = result
        .value(space)
        .map_or_else(|_| "-".to_string(), |value| value.to_string());
    format!(
        "{:#010x} seg={} {kind} x{} = {value}",
        result.address(),
        result.segment(),
        result.divisor()
    )
}

fn run_search(args: SearchArgs) -> Result<(), i32> {
    let space = load_space(&args.image, 0).map_err(|e| fail(&e))?;
    let mut query = space
        .query(SearchTarget::Text(args.target))
        .with_kind(args.kind)
        .with_flags(args.flags);
    if let Some(limit) = args.limit {
        query = query.with_limit(limit);
    }
    let results = space
        .search(&query, &[])
        .map_err(|e| fail(&e.to_string()))?;
    for result in &results {
        println!("{}", describe(result, &space));
    }
    println!("{} result(s)", results.len());
    Ok(())
}

fn run_track(args: TrackArgs) -> Result<(), i32> {
    let mut candidates: Vec<SearchResult> = Vec::new();
    let mut last = None;
    for (image, target) in args.snapshots {
        let space = load_space(&image, 0).map_err(|e| fail(&e))?;
        let query = space
            .query(SearchTarget::Text(target))
            .with_kind(args.kind)
            .with_flags(args.flags);
        candidates = space
            .search(&query, &candidates)
            .map_err(|e| fail(&e.to_string()))?;
        println!("{}: {} candidate(s)", image.display(), candidates.len());
        // An empty list would restart the scan on the next snapshot.
        if candidates.is_empty() {
            break;
        }
        last = Some(space);
    }
    if let Some(space) = &last {
        for result in &candidates {
            println!("{}", describe(result, space));
        }
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let exit_code = match parse_args(env::args_os().skip(1)) {
        Ok(ParseResult::Help) => {
            println!("{USAGE_TEXT}");
            0
        }
        Ok(ParseResult::Command(command)) => {
            let outcome = match command {
                Command::Peek(args) => run_peek(&args),
                Command::Poke(args) => run_poke(args),
                Command::Search(args) => run_search(args),
                Command::Track(args) => run_track(args),
            };
            match outcome {
                Ok(()) => 0,
                Err(code) => code,
            }
        }
        Err(error) => {
            if error.starts_with("Usage:") {
                println!("{error}");
            } else {
                eprintln!("error: {error}");
                eprintln!("{USAGE_TEXT}");
            }
            1
        }
    };

    std::process::exit(exit_code);
}
