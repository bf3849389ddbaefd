//! # Linewise - Line Layout Inspector
//!
//! Loads a text file into a `Document`, optionally applies edits, and prints
//! the resulting logical or wrapped lines with their head offsets.
//!
//! ## Quick Start
//!
//! ```bash
//! # Show wrapped lines at 320px (40 cells of 8px)
//! cargo run -- --width 320 path/to/file.txt
//!
//! # Show logical lines only
//! cargo run -- --logical path/to/file.txt
//!
//! # Insert text at offset 10, then dump both indices as JSON
//! cargo run -- --insert '10:hello\n' --json path/to/file.txt
//!
//! # List regex matches with their logical positions
//! cargo run -- --find '^fn \w+' --regex --match-case src/main.rs
//! ```

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use linewise_core::{
    Config, Document, DocumentEvent, LineLayoutStrategy, SearchOptions, ViewConfig,
};

/// Linewise - inspect logical and wrapped line layout
#[derive(Parser, Debug)]
#[command(name = "linewise")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// File to load
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Config file (defaults to the user config directory)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Wrap width in pixels (0 disables wrapping)
    #[arg(short, long, value_name = "PX")]
    width: Option<u32>,

    /// Tab width in columns
    #[arg(short, long, value_name = "COLS")]
    tab_width: Option<u32>,

    /// Width of one character cell in pixels
    #[arg(long, value_name = "PX")]
    cell_px: Option<u32>,

    /// Print logical lines instead of wrapped lines
    #[arg(short, long)]
    logical: bool,

    /// Print the line heads as JSON
    #[arg(long)]
    json: bool,

    /// Insert text before printing, as OFFSET:TEXT (`\n`, `\r`, `\t` escapes)
    #[arg(short, long, value_name = "OFFSET:TEXT", value_parser = parse_insert)]
    insert: Vec<(usize, String)>,

    /// List matches of PATTERN instead of printing lines
    #[arg(short, long, value_name = "PATTERN")]
    find: Option<String>,

    /// Case-sensitive search
    #[arg(long)]
    match_case: bool,

    /// Treat the search pattern as a regular expression
    #[arg(long)]
    regex: bool,

    /// Verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// JSON view of both indices.
#[derive(Debug, Serialize)]
struct LayoutDump {
    length: usize,
    strategy: LineLayoutStrategy,
    line_heads: Vec<usize>,
    wrap_line_heads: Vec<usize>,
}

fn parse_insert(value: &str) -> Result<(usize, String), String> {
    let (offset, text) = value
        .split_once(':')
        .ok_or_else(|| format!("expected OFFSET:TEXT, got `{}`", value))?;
    let offset = offset
        .parse()
        .map_err(|e| format!("invalid offset `{}`: {}", offset, e))?;
    Ok((offset, unescape(text)))
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Renders one line's text with the configured whitespace marks.
fn render_line(text: &str, view: &ViewConfig) -> String {
    let body = text.trim_end_matches(['\r', '\n']);
    let mut out: String = body
        .chars()
        .map(|c| match c {
            '\t' if view.draws_tab => '→',
            '\u{3000}' if view.draws_full_width_space => '□',
            c => c,
        })
        .collect();
    if view.draws_eol_code && body.len() < text.len() {
        out.push('↵');
    }
    out
}

fn print_lines(doc: &Document, view: &ViewConfig, logical: bool) -> anyhow::Result<()> {
    let count = if logical {
        doc.line_count()
    } else {
        doc.wrap_line_count()
    };

    for line in 0..count {
        let range = if logical {
            doc.line_range(line, true)?
        } else {
            doc.wrap_line_range(line)?
        };
        let text = doc.text_range(range.start, range.end)?;
        let rendered = render_line(&text, view);
        if view.shows_line_number {
            println!("{:>5} {:>8}  {}", line + 1, range.start, rendered);
        } else {
            println!("{}", rendered);
        }
    }
    Ok(())
}

fn print_matches(doc: &Document, pattern: &str, options: SearchOptions) -> anyhow::Result<()> {
    let matches = doc
        .search_all(pattern, options)
        .with_context(|| format!("Invalid search pattern `{}`", pattern))?;
    for range in &matches {
        let position = doc.line_column(range.start)?;
        let text = doc.text_range(range.start, range.end)?;
        println!(
            "{}:{}  {:>8}  {:?}",
            position.line + 1,
            position.column + 1,
            range.start,
            text
        );
    }
    tracing::info!("{} matches", matches.len());
    Ok(())
}

fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    let log_level = match args.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_level(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    tracing::info!("Starting Linewise v{}", env!("CARGO_PKG_VERSION"));

    // Settings: config file, then command line overrides
    let mut config = match &args.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::load(),
    };
    if let Some(width) = args.width {
        config.document.wrap_width = width;
        config.view.wrap = width > 0;
    }
    if let Some(tab_width) = args.tab_width {
        config.document.tab_width = tab_width;
    }
    if let Some(cell_px) = args.cell_px {
        config.view.cell_px = cell_px;
        config.view.eol_px = cell_px;
    }

    let mut doc = match &args.file {
        Some(path) => Document::from_file(path)
            .with_context(|| format!("Failed to open {}", path.display()))?,
        None => Document::new(),
    };
    doc.apply_config(&config)?;

    let mut events = doc.subscribe();
    for (offset, text) in &args.insert {
        doc.insert(*offset, text)
            .with_context(|| format!("Failed to insert at {}", offset))?;
    }
    while let Ok(event) = events.try_recv() {
        if let DocumentEvent::ContentChanged {
            index,
            old_text,
            new_text,
            ..
        } = event
        {
            tracing::info!(index, ?old_text, ?new_text, "Content changed");
        }
    }

    if let Some(pattern) = &args.find {
        let options = SearchOptions {
            match_case: args.match_case,
            use_regex: args.regex,
        };
        print_matches(&doc, pattern, options)?;
    } else if args.json {
        let dump = LayoutDump {
            length: doc.len(),
            strategy: doc.layout_strategy(),
            line_heads: doc.line_heads(),
            wrap_line_heads: doc.wrap_line_heads(),
        };
        println!("{}", serde_json::to_string_pretty(&dump)?);
    } else {
        print_lines(&doc, &config.view, args.logical)?;
    }

    Ok(())
}
