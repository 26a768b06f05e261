//! flowdump - link positioned text fragments into reading order
//!
//! Reads a JSON page description (bounds, transformed text fragments,
//! font styles), runs the flow linker over it, and prints one JSON
//! object per fragment with its derived geometry and neighbor links.

use clap::{ArgAction, Parser};
use pageflow_core::layout::{FlowLinker, FragmentStyle, PageFragment, StyleMap};
use pageflow_core::quadtree::{Item, QuadTree, Rect};
use serde::Deserialize;
use serde_json::json;
use smol_str::SmolStr;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::PathBuf;

/// Link positioned text fragments into reading order and dump the
/// result as JSON lines.
#[derive(Parser, Debug)]
#[command(name = "flowdump")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// One or more paths to JSON page files, or "-" for stdin
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Path to file where output is written, or "-" for stdout
    #[arg(short = 'o', long, default_value = "-")]
    outfile: String,

    /// Print the spatial index structure after linking
    #[arg(short = 't', long, action = ArgAction::SetTrue)]
    tree: bool,

    /// Check spatial index structural invariants after linking
    #[arg(long, action = ArgAction::SetTrue)]
    validate: bool,
}

/// On-disk page description.
#[derive(Debug, Deserialize)]
struct PageInput {
    /// Page bounds as [x, y, width, height].
    bounds: [f64; 4],
    #[serde(default)]
    fragments: Vec<FragmentInput>,
    #[serde(default)]
    styles: HashMap<String, StyleInput>,
}

#[derive(Debug, Deserialize)]
struct FragmentInput {
    /// Text matrix as [a, b, c, d, e, f].
    transform: [f64; 6],
    text: String,
    fontname: String,
    width: f64,
    height: f64,
}

#[derive(Debug, Deserialize)]
struct StyleInput {
    #[serde(default)]
    vertical: bool,
    ascent: Option<f64>,
    descent: Option<f64>,
}

fn read_page(path: &PathBuf) -> Result<PageInput, Box<dyn std::error::Error>> {
    let raw = if path.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        let mut buf = String::new();
        File::open(path)?.read_to_string(&mut buf)?;
        buf
    };
    Ok(serde_json::from_str(&raw)?)
}

fn process_page(
    input: PageInput,
    args: &Args,
    output: &mut dyn Write,
) -> Result<(), Box<dyn std::error::Error>> {
    let [x, y, width, height] = input.bounds;
    let bounds = Rect::new(x, y, width, height);

    let fragments: Vec<PageFragment> = input
        .fragments
        .into_iter()
        .map(|f| {
            let [a, b, c, d, e, ff] = f.transform;
            PageFragment {
                transform: (a, b, c, d, e, ff),
                text: f.text,
                fontname: SmolStr::new(&f.fontname),
                width: f.width,
                height: f.height,
            }
        })
        .collect();

    let mut styles = StyleMap::default();
    for (name, s) in input.styles {
        styles.insert(
            SmolStr::new(&name),
            FragmentStyle {
                vertical: s.vertical,
                ascent: s.ascent,
                descent: s.descent,
            },
        );
    }

    let page = FlowLinker::new(bounds).link(&fragments, &styles)?;

    for d in &page.fragments {
        let line = json!({
            "id": d.id,
            "x": d.x,
            "y": d.y,
            "width": d.width,
            "height": d.height,
            "angle": d.angle,
            "font_height": d.font_height,
            "vertical": d.vertical,
            "right": d.right,
            "bottom": d.bottom,
            "is_whitespace": d.is_whitespace,
            "as_int": d.as_int,
            "topmost": page.topmost == Some(d.id),
        });
        writeln!(output, "{line}")?;
    }

    if args.tree || args.validate {
        let mut tree = QuadTree::with_limits(bounds, 4, 16)?;
        for d in &page.fragments {
            tree.insert(Item::new(Rect::new(d.x, d.y, d.width, d.height), d.id));
        }
        if args.validate {
            tree.validate()?;
        }
        if args.tree {
            write!(output, "{}", tree.dump())?;
        }
    }

    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut output: Box<dyn Write> = if args.outfile == "-" {
        Box::new(BufWriter::new(io::stdout()))
    } else {
        let file = File::create(&args.outfile)
            .map_err(|e| format!("Failed to create output file {}: {}", args.outfile, e))?;
        Box::new(BufWriter::new(file))
    };

    for path in &args.files {
        if path.as_os_str() != "-" && !path.exists() {
            eprintln!("Error: File not found: {}", path.display());
            std::process::exit(1);
        }

        let page = match read_page(path) {
            Ok(page) => page,
            Err(e) => {
                eprintln!("Error reading {}: {}", path.display(), e);
                std::process::exit(1);
            }
        };
        if let Err(e) = process_page(page, &args, &mut output) {
            eprintln!("Error processing {}: {}", path.display(), e);
            std::process::exit(1);
        }
    }

    output.flush()?;
    Ok(())
}
