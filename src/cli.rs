use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;

use crate::config::load_options;
use crate::graph::NetworkGraph;
use crate::layout::create_engine;
use crate::layout_dump::{LayoutDump, write_layout_dump};

#[derive(Parser, Debug)]
#[command(name = "nml", version, about = "Network diagram layout engine")]
pub struct Args {
    /// Input graph file (.json/.json5) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output layout dump (JSON). Defaults to stdout.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Layout engine name
    #[arg(short = 'e', long = "engine", default_value = "hierarchical")]
    pub engine: String,

    /// Layout options file (JSON/JSON5)
    #[arg(short = 'c', long = "options")]
    pub options: Option<PathBuf>,
}

pub fn run() -> Result<()> {
    let args = Args::parse();

    let (contents, is_json5) = read_input(args.input.as_deref())?;
    let graph: NetworkGraph = if is_json5 {
        json5::from_str(&contents)?
    } else {
        serde_json::from_str(&contents)?
    };

    let options = load_options(args.options.as_deref())?;
    let engine = create_engine(&args.engine)?;
    let result = engine.layout(&graph, &options)?;

    match args.output.as_deref() {
        Some(path) => write_layout_dump(path, &result)?,
        None => {
            let dump = LayoutDump::from_result(&result);
            println!("{}", serde_json::to_string_pretty(&dump)?);
        }
    }

    Ok(())
}

fn read_input(path: Option<&Path>) -> Result<(String, bool)> {
    if let Some(path) = path {
        if path == Path::new("-") {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            return Ok((buf, false));
        }
        let contents = std::fs::read_to_string(path)?;
        let is_json5 = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("json5"))
            .unwrap_or(false);
        return Ok((contents, is_json5));
    }

    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok((buf, false))
}
