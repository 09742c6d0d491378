use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::debug;

use plsort_rs::common::io::{FileData, read_file, read_stdin};
use plsort_rs::common::{PlError, io_error_msg, reset_sigpipe};
use plsort_rs::heap::{Heap, HeapConfig, TermReader, TermRef};
use plsort_rs::sort::{keysort, msort, sort, sort4};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Predicate {
    /// sort/2: ascending, duplicates removed
    Sort,
    /// msort/2: ascending, duplicates kept
    Msort,
    /// keysort/2: stable sort of Key-Value pairs on Key
    Keysort,
    /// sort/4: sort on --key with --order
    Sort4,
}

#[derive(Parser)]
#[command(name = "plsort", about = "Sort Prolog list terms", version)]
struct Cli {
    /// Sort predicate applied to every term
    #[arg(short = 'p', long = "predicate", value_enum, default_value = "sort")]
    predicate: Predicate,

    /// Key for sort4: 0, an argument index, a dict key, or a list of those
    #[arg(short = 'k', long = "key", value_name = "TERM", default_value = "0")]
    key: String,

    /// Order for sort4: @<, @=<, @>, @>= (or <, =<, >, >=)
    #[arg(short = 'o', long = "order", value_name = "ATOM", default_value = "@=<")]
    order: String,

    /// Maximum heap size, in cells
    #[arg(long = "heap-limit", value_name = "CELLS")]
    heap_limit: Option<usize>,

    /// Files of `.`-terminated list terms (stdin if none, or -)
    files: Vec<String>,
}

static INTERRUPT: OnceLock<Arc<AtomicBool>> = OnceLock::new();

extern "C" fn on_sigint(_signal: libc::c_int) {
    if let Some(flag) = INTERRUPT.get() {
        flag.store(true, Ordering::SeqCst);
    }
}

/// Route SIGINT to the heap's interrupt flag so long sorts abort cleanly.
fn install_sigint(flag: Arc<AtomicBool>) {
    if INTERRUPT.set(flag).is_err() {
        return;
    }
    #[cfg(unix)]
    unsafe {
        libc::signal(
            libc::SIGINT,
            on_sigint as extern "C" fn(libc::c_int) as libc::sighandler_t,
        );
    }
}

/// The predicate to run, with the `sort/4` arguments read once up front.
struct Job {
    predicate: Predicate,
    key: TermRef,
    order: TermRef,
}

impl Job {
    fn prepare(cli: &Cli, heap: &mut Heap) -> Result<Job> {
        let key = heap
            .read_term(&cli.key)
            .with_context(|| format!("invalid key `{}'", cli.key))?;
        let order = heap
            .read_term(&cli.order)
            .with_context(|| format!("invalid order `{}'", cli.order))?;
        Ok(Job {
            predicate: cli.predicate,
            key,
            order,
        })
    }

    fn apply(&self, heap: &mut Heap, list: TermRef) -> Result<TermRef, PlError> {
        match self.predicate {
            Predicate::Sort => sort(heap, list),
            Predicate::Msort => msort(heap, list),
            Predicate::Keysort => keysort(heap, list),
            Predicate::Sort4 => sort4(heap, self.key, self.order, list),
        }
    }
}

fn load(name: &str) -> io::Result<FileData> {
    if name == "-" {
        read_stdin().map(FileData::Owned)
    } else {
        read_file(Path::new(name))
    }
}

/// Sort every term in `text`, writing one result per line.
/// Returns the number of terms that raised an error.
fn sort_terms(
    job: &Job,
    heap: &mut Heap,
    name: &str,
    text: &str,
    out: &mut impl Write,
) -> Result<usize> {
    let mut reader = TermReader::new(text);
    let mut errors = 0usize;
    loop {
        let frame = heap.frame();
        let mark = heap.mark();
        let result = match reader.next_term(heap) {
            Ok(None) => break,
            Ok(Some(list)) => job.apply(heap, list),
            Err(e) => {
                reader.skip_to_end();
                Err(e)
            }
        };
        match result {
            Ok(sorted) => {
                writeln!(out, "{}.", heap.write_term(sorted)).context("write error")?;
            }
            Err(PlError::Interrupted) => return Err(PlError::Interrupted.into()),
            Err(e) => {
                eprintln!("plsort: {}: {}", name, e);
                errors += 1;
            }
        }
        heap.discard_frame(frame);
        heap.reset_to(mark);
    }
    Ok(errors)
}

fn main() {
    reset_sigpipe();
    env_logger::init();
    let cli = Cli::parse();

    let mut config = HeapConfig::default();
    if let Some(limit) = cli.heap_limit {
        config.max_cells = limit;
        config.initial_cells = config.initial_cells.min(limit);
    }
    debug!("heap config: {:?}", config);
    let mut heap = Heap::new(config);
    install_sigint(heap.interrupt_flag());

    let job = match Job::prepare(&cli, &mut heap) {
        Ok(job) => job,
        Err(e) => {
            eprintln!("plsort: {:#}", e);
            process::exit(2);
        }
    };

    let inputs = if cli.files.is_empty() {
        vec!["-".to_string()]
    } else {
        cli.files.clone()
    };

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut status = 0;

    for name in &inputs {
        let data = match load(name) {
            Ok(data) => data,
            Err(e) => {
                eprintln!("plsort: {}: {}", name, io_error_msg(&e));
                status = 2;
                continue;
            }
        };
        let Ok(text) = std::str::from_utf8(&data) else {
            eprintln!("plsort: {}: invalid UTF-8", name);
            status = 2;
            continue;
        };

        match sort_terms(&job, &mut heap, name, text, &mut out) {
            Ok(0) => {}
            Ok(errors) => {
                debug!("{}: {} terms failed", name, errors);
                if status == 0 {
                    status = 1;
                }
            }
            Err(e) if e.downcast_ref::<PlError>() == Some(&PlError::Interrupted) => {
                let _ = out.flush();
                eprintln!("plsort: {}", e);
                process::exit(130);
            }
            Err(e) => {
                eprintln!("plsort: {:#}", e);
                process::exit(2);
            }
        }
    }

    if let Err(e) = out.flush() {
        eprintln!("plsort: write error: {}", io_error_msg(&e));
        process::exit(2);
    }
    debug!("heap relocated {} times", heap.relocations());
    process::exit(status);
}
