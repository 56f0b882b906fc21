use anyhow::{Context, Result};
use clap::Parser;
use mimalloc::MiMalloc;
use std::io::Write;
use std::time::{Duration, Instant};

use njq::input::{self, InputBuffer};
use njq::output::{OutputConfig, OutputFormat};
use njq::parallel::ndjson::{EngineOptions, process_ndjson};
use njq::query::FieldPath;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser)]
#[command(
    name = "njq",
    about = "njq - filter NDJSON with MongoDB-style queries",
    version,
    after_help = "Examples:\n\n\t$ njq '{\"age\":{\"$gt\":30}}' people.ndjson\n\t$ cat events.ndjson | njq --count '{\"type\":\"push\"}' -\n\t$ njq --select name,age --output csv '{}' people.json"
)]
struct Cli {
    /// MongoDB-style query (a JSON object), e.g. '{"age":{"$gt":30}}'
    query: String,

    /// Input file (.json/.ndjson/.jsonl, optionally .gz/.zst), or '-' for
    /// stdin; may swap positions with the query
    path: Option<String>,

    /// Emit only these fields, comma-separated (dotted paths allowed)
    #[arg(long, value_name = "FIELDS")]
    select: Option<String>,

    /// Print the number of matching records instead of the records
    #[arg(long)]
    count: bool,

    /// Emit at most the first N matches
    #[arg(long, value_name = "N")]
    limit: Option<usize>,

    /// Worker thread count (clamped to available cores)
    #[arg(long, value_name = "N", default_value_t = 4)]
    threads: usize,

    /// Output format
    #[arg(long, value_enum, default_value = "ndjson")]
    output: OutputFormatArg,

    /// Pretty-print JSON array output (one record per line)
    #[arg(long)]
    pretty: bool,

    /// Print timing breakdown to stderr (for profiling)
    #[arg(long = "debug-timing", hide = true)]
    debug_timing: bool,
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormatArg {
    Ndjson,
    Json,
    Csv,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Ndjson => OutputFormat::Ndjson,
            OutputFormatArg::Json => OutputFormat::Json,
            OutputFormatArg::Csv => OutputFormat::Csv,
        }
    }
}

/// Does this positional look like an input path rather than a query?
fn looks_like_path(arg: &str) -> bool {
    arg == "-"
        || [".json", ".ndjson", ".jsonl", ".gz", ".gzip", ".zst", ".zstd"]
            .iter()
            .any(|suffix| arg.ends_with(suffix))
}

/// The query and path positionals are accepted in either order; a path is
/// recognized by `-` or a known suffix.
fn untangle(first: String, second: Option<String>) -> Result<(String, Option<String>)> {
    match second {
        Some(second) => {
            if looks_like_path(&first) && !looks_like_path(&second) {
                Ok((second, Some(first)))
            } else {
                Ok((first, Some(second)))
            }
        }
        None => {
            if looks_like_path(&first) {
                anyhow::bail!("missing query (got input path {first:?})");
            }
            // Sole positional: it is the query, input comes from stdin.
            Ok((first, None))
        }
    }
}

fn parse_select(select: &str) -> Result<Vec<FieldPath>> {
    let mut paths = Vec::new();
    for field in select.split(',') {
        let field = field.trim();
        if field.is_empty() {
            anyhow::bail!("--select contains an empty field name");
        }
        paths.push(FieldPath::new(field.as_bytes()));
    }
    Ok(paths)
}

fn main() {
    // Restore default SIGPIPE behavior so piping to `head` etc. exits
    // cleanly instead of producing BrokenPipe errors.
    #[cfg(unix)]
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);
    }

    let cli = Cli::parse();

    let (query, path) = match untangle(cli.query.clone(), cli.path.clone()) {
        Ok(pair) => pair,
        Err(e) => {
            eprintln!("njq: error: {e}");
            std::process::exit(2);
        }
    };

    let select = match cli.select.as_deref().map(parse_select).transpose() {
        Ok(select) => select,
        Err(e) => {
            eprintln!("njq: error: {e}");
            std::process::exit(2);
        }
    };

    let filter = match njq::query::compile(query.as_bytes()) {
        Ok(filter) => filter,
        Err(e) => {
            eprintln!("njq: error: invalid query: {query}\n\nCaused by:\n    {e}");
            std::process::exit(3);
        }
    };

    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let threads = cli.threads.clamp(1, cores);
    // Ignore the error if a pool already exists (e.g. in tests).
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();

    let config = OutputConfig {
        format: cli.output.into(),
        pretty: cli.pretty,
        select,
    };
    let opts = EngineOptions {
        threads,
        limit: cli.limit,
        count: cli.count,
    };

    match run(&path, &filter, &config, &opts, cli.count, cli.debug_timing) {
        Ok(()) => {}
        Err(e) => {
            eprintln!("njq: error: {e:#}");
            std::process::exit(2);
        }
    }
}

fn run(
    path: &Option<String>,
    filter: &njq::query::Filter,
    config: &OutputConfig,
    opts: &EngineOptions,
    count: bool,
    debug_timing: bool,
) -> Result<()> {
    let t0 = Instant::now();
    let raw = match path.as_deref() {
        None | Some("-") => input::read_stdin()?,
        Some(p) => input::read_file(p)?,
    };
    let t_read = t0.elapsed();

    // JSON-array input becomes an owned NDJSON buffer; the mmap is released
    // as soon as the conversion finishes.
    let t1 = Instant::now();
    let data: InputBuffer = input::normalize(raw);
    let t_normalize = t1.elapsed();

    let t2 = Instant::now();
    let result = process_ndjson(data.as_bytes(), filter, config, opts);
    let t_filter = t2.elapsed();

    // All output leaves in one write.
    let t3 = Instant::now();
    let mut stdout = std::io::stdout().lock();
    if count {
        let mut line = itoa::Buffer::new().format(result.matched).as_bytes().to_vec();
        line.push(b'\n');
        stdout.write_all(&line).context("failed to write output")?;
    } else {
        stdout
            .write_all(&result.output)
            .context("failed to write output")?;
    }
    stdout.flush().context("failed to flush output")?;
    let t_write = t3.elapsed();

    if debug_timing {
        let total = t_read + t_normalize + t_filter + t_write;
        let mb = data.as_bytes().len() as f64 / (1024.0 * 1024.0);
        eprintln!("--- debug-timing ({mb:.1} MB) ---");
        print_timing_line("read", t_read, total);
        print_timing_line("normalize", t_normalize, total);
        print_timing_line("filter", t_filter, total);
        print_timing_line("write", t_write, total);
        print_timing_total(total, mb);
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Debug timing helpers
// ---------------------------------------------------------------------------

fn print_timing_line(label: &str, dur: Duration, total: Duration) {
    let pct = if total.as_nanos() > 0 {
        dur.as_secs_f64() / total.as_secs_f64() * 100.0
    } else {
        0.0
    };
    eprintln!(
        "  {label:<9} {:>8.2}ms  ({pct:.0}%)",
        dur.as_secs_f64() * 1000.0,
    );
}

fn print_timing_total(total: Duration, mb: f64) {
    eprintln!(
        "  total:    {:>8.2}ms  ({:.0} MB/s)",
        total.as_secs_f64() * 1000.0,
        mb / total.as_secs_f64()
    );
}
