//! The `rabbet` command-line interface: read a Rabin automaton, decide
//! emptiness, and emit the requested renderings of the verdict.

use std::fs::File;
use std::io::{self, Read as _, Write as _};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

use rabbet_automata::{RabinAutomaton, Run};
use rabbet_reader::parse_automaton;

const AUT_HEAD: &str =
    "%%---------------------------------AUTOMATON----------------------------------";
const RUN_HEAD: &str =
    "%%------------------------------------RUN-------------------------------------";

/// Decide emptiness of a Rabin tree automaton and fold a witness run.
///
/// The automaton is read from FILE, or from the standard input when no
/// file is given. The verdict (`NONEMPTY LANGUAGE` or `EMPTY LANGUAGE`)
/// goes to the standard output.
#[derive(Parser)]
#[command(name = "rabbet", version)]
struct Args {
    /// Input file; the standard input when absent.
    file: Option<PathBuf>,

    /// Set the input file (the positional FILE wins when both are given).
    #[arg(short = 'i', long = "input", value_name = "FILE")]
    input: Option<PathBuf>,

    /// Output a Graphviz representation of a found run.
    #[arg(short = 'g', long = "graphviz")]
    graphviz: bool,

    /// Output file for the Graphviz representation; implies -g.
    #[arg(short = 'o', long = "graphviz-out", value_name = "FILE")]
    graphviz_out: Option<PathBuf>,

    /// Output a logic-program representation of the automaton, and of a
    /// found run.
    #[arg(short = 'l', long = "logic")]
    logic: bool,

    /// Output file for the logic-program representation; implies -l.
    #[arg(short = 'L', long = "logic-out", value_name = "FILE")]
    logic_out: Option<PathBuf>,

    /// Maximum number of concurrent threads for the search.
    #[arg(short = 't', long = "threads", value_name = "NUM", default_value = "1")]
    threads: NonZeroUsize,

    /// Overwrite output files that already exist.
    #[arg(short = 'w', long = "overwrite")]
    overwrite: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let automaton = read_automaton(args.file.as_deref().or(args.input.as_deref()))?;

    let graphviz_out = args
        .graphviz_out
        .clone()
        .unwrap_or_else(|| PathBuf::from("run.gv"));
    let logic_out = args
        .logic_out
        .clone()
        .unwrap_or_else(|| PathBuf::from("automaton.lp"));
    let want_graphviz = args.graphviz || args.graphviz_out.is_some();
    let want_logic = args.logic || args.logic_out.is_some();

    let mut logic_file = if want_logic {
        let mut file = create_out(&logic_out, args.overwrite)?;
        writeln!(file, "{AUT_HEAD}")
            .and_then(|()| writeln!(file, "{}", automaton.logic_program()))
            .with_context(|| format!("could not write {}", logic_out.display()))?;
        Some(file)
    } else {
        None
    };

    log::info!("searching for an accepted regular run");
    match automaton.find_run(args.threads.get())? {
        Some(run) => {
            println!("NONEMPTY LANGUAGE");
            if let Some(file) = logic_file.as_mut() {
                writeln!(file, "\n{RUN_HEAD}")
                    .and_then(|()| writeln!(file, "{}", run.logic_program()))
                    .with_context(|| format!("could not write {}", logic_out.display()))?;
            }
            if want_graphviz {
                write_graphviz(&run, &graphviz_out, args.overwrite)?;
            }
        }
        None => println!("EMPTY LANGUAGE"),
    }
    Ok(())
}

fn read_automaton(path: Option<&Path>) -> Result<RabinAutomaton> {
    let text = match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("could not read {}", path.display()))?,
        None => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("could not read the standard input")?;
            text
        }
    };
    parse_automaton(&text).context("could not parse the automaton")
}

/// Create an output file, refusing to clobber an existing one unless
/// `overwrite` is set.
fn create_out(path: &Path, overwrite: bool) -> Result<File> {
    let result = if overwrite {
        File::create(path)
    } else {
        File::create_new(path)
    };
    result.with_context(|| {
        if !overwrite && path.exists() {
            format!("file {} already exists, not overwriting", path.display())
        } else {
            format!("could not open file {}", path.display())
        }
    })
}

fn write_graphviz(run: &Run, path: &Path, overwrite: bool) -> Result<()> {
    let mut file = create_out(path, overwrite)?;
    writeln!(file, "{}", run.graphviz())
        .with_context(|| format!("could not write {}", path.display()))
}
