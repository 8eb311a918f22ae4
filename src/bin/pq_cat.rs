use clap::Parser;
use pq_reader::engine::core::SchemaPathIndex;
use pq_reader::logging;
use pq_reader::shared::config::CONFIG;
use pq_reader::{FileSource, MmapSource, ParquetReader, ReaderOptions, Row, SeekableSource};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "pq-cat")]
#[command(about = "Print the rows of a columnar file as JSON lines", long_about = None)]
struct Args {
    /// File to read
    path: PathBuf,

    /// Print schema, leaf paths and row count instead of rows
    #[arg(long)]
    schema: bool,

    /// Maximum number of rows to print (0 = all)
    #[arg(short, long, default_value = "0")]
    limit: usize,

    /// Worker threads; defaults to reader.worker_count from configuration
    #[arg(short, long)]
    workers: Option<usize>,

    /// Rows fetched per read call
    #[arg(long, default_value = "1024")]
    batch: usize,

    /// Map the file into memory instead of using positioned reads
    #[arg(long)]
    mmap: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init(&CONFIG.logging)?;

    let mut options = ReaderOptions::from_settings(&CONFIG.reader);
    if let Some(workers) = args.workers {
        options = options.with_worker_count(workers);
    }

    let mut reader = if args.mmap {
        open(MmapSource::open(&args.path)?, options)?
    } else {
        open(FileSource::open(&args.path)?, options)?
    };
    info!(
        target: "pq_reader::open",
        path = %args.path.display(),
        rows = reader.row_count(),
        "Reading file"
    );

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    if args.schema {
        print_schema(&mut out, &reader)?;
        out.flush()?;
        return Ok(());
    }

    let limit = if args.limit == 0 {
        reader.row_count()
    } else {
        args.limit.min(reader.row_count())
    };
    let batch = args.batch.max(1);
    let mut printed = 0usize;
    let mut rows: Vec<Row> = Vec::with_capacity(batch);
    while printed < limit {
        reader.read(&mut rows, batch.min(limit - printed))?;
        if rows.is_empty() {
            break;
        }
        for row in &rows {
            serde_json::to_writer(&mut out, &serde_json::Value::from(row))?;
            out.write_all(b"\n")?;
        }
        printed += rows.len();
    }
    out.flush()?;
    reader.close();
    Ok(())
}

fn open<S: SeekableSource + 'static>(
    source: S,
    options: ReaderOptions,
) -> anyhow::Result<ParquetReader> {
    ParquetReader::open_with(source, options).map_err(|e| {
        e.log_error();
        anyhow::anyhow!(e)
    })
}

fn print_schema(out: &mut impl Write, reader: &ParquetReader) -> io::Result<()> {
    let schema = reader.schema();
    writeln!(out, "message {}", schema.root_name())?;
    print_children(out, schema, 0, 1)?;
    writeln!(out)?;
    writeln!(out, "rows: {}", reader.row_count())?;
    writeln!(out, "row groups: {}", reader.metadata().row_groups.len())?;
    if let Some(created_by) = &reader.metadata().created_by {
        writeln!(out, "created by: {created_by}")?;
    }
    writeln!(out, "leaf columns:")?;
    for path in reader.leaf_paths() {
        writeln!(out, "  {path}")?;
    }
    Ok(())
}

fn print_children(
    out: &mut impl Write,
    schema: &SchemaPathIndex,
    position: usize,
    depth: usize,
) -> io::Result<()> {
    for &child in schema.children(position) {
        let element = schema.element(child);
        let node = schema.node(child);
        let kind = match element.physical_type {
            Some(t) => format!("{t:?}"),
            None => "group".to_string(),
        };
        writeln!(
            out,
            "{:indent$}{:?} {kind} {} (def={}, rep={})",
            "",
            element.repetition(),
            element.name,
            node.max_def_level,
            node.max_rep_level,
            indent = depth * 2
        )?;
        print_children(out, schema, child, depth + 1)?;
    }
    Ok(())
}
