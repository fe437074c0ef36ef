use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, ValueEnum};
use log::LevelFilter;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "pdfnup",
    about = "Merge PDF files onto N-up sheets",
    version
)]
struct Cli {
    /// Input PDF files or directories (directories are scanned for *.pdf)
    inputs: Vec<PathBuf>,

    /// Output PDF file
    #[arg(short, long)]
    output: PathBuf,

    /// Source pages per output sheet (1, 2, 4, 6 or 9)
    #[arg(short = 'n', long)]
    pages_per_sheet: Option<usize>,

    /// Number of parallel workers [default: number of CPU cores]
    #[arg(short = 'j', long)]
    workers: Option<usize>,

    /// Silently repair minor page problems instead of reporting them
    #[arg(long)]
    lenient: bool,

    /// Output paper size
    #[arg(long, value_enum)]
    paper: Option<PaperArg>,

    /// Output orientation
    #[arg(long, value_enum)]
    orientation: Option<OrientationArg>,

    /// Drop the files of a failed worker instead of aborting
    #[arg(long)]
    keep_going: bool,

    /// Load options from a JSON file (command-line flags take precedence)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the effective options to a JSON file
    #[arg(long)]
    save_config: Option<PathBuf>,

    /// More log output (repeat for trace)
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum PaperArg {
    A3,
    A4,
    A5,
    Letter,
    Legal,
    Tabloid,
}

#[derive(Clone, Copy, ValueEnum)]
enum OrientationArg {
    Portrait,
    Landscape,
}

impl From<PaperArg> for pdf_nup::PaperSize {
    fn from(arg: PaperArg) -> Self {
        match arg {
            PaperArg::A3 => Self::A3,
            PaperArg::A4 => Self::A4,
            PaperArg::A5 => Self::A5,
            PaperArg::Letter => Self::Letter,
            PaperArg::Legal => Self::Legal,
            PaperArg::Tabloid => Self::Tabloid,
        }
    }
}

impl From<OrientationArg> for pdf_nup::Orientation {
    fn from(arg: OrientationArg) -> Self {
        match arg {
            OrientationArg::Portrait => Self::Portrait,
            OrientationArg::Landscape => Self::Landscape,
        }
    }
}

impl Cli {
    fn log_level(&self) -> LevelFilter {
        match (self.quiet, self.verbose) {
            (true, _) => LevelFilter::Warn,
            (false, 0) => LevelFilter::Info,
            (false, 1) => LevelFilter::Debug,
            (false, _) => LevelFilter::Trace,
        }
    }

    /// Build the run options: config file first, then command-line overrides
    async fn options(&self) -> Result<pdf_nup::MergeOptions> {
        let mut options = match &self.config {
            Some(path) => pdf_nup::MergeOptions::load(path)
                .await
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => pdf_nup::MergeOptions::default(),
        };

        if !self.inputs.is_empty() {
            let mut files = Vec::new();
            for input in &self.inputs {
                let found = pdf_nup::collect_inputs(input)
                    .await
                    .with_context(|| format!("Cannot read input {}", input.display()))?;
                files.extend(found);
            }
            options.input_files = files;
        }

        if let Some(n) = self.pages_per_sheet {
            options.pages_per_sheet = n;
        }
        if let Some(workers) = self.workers {
            options.worker_count = Some(workers);
        }
        if let Some(paper) = self.paper {
            options.paper_size = paper.into();
        }
        if let Some(orientation) = self.orientation {
            options.orientation = orientation.into();
        }
        if self.lenient {
            options.strict = false;
        }
        if self.keep_going {
            options.tolerate_worker_failure = true;
        }

        Ok(options)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .parse_default_env()
        .init();

    let options = cli.options().await?;

    if let Some(path) = &cli.save_config {
        options.save(path).await?;
        println!("Saved options → {}", path.display());
    }

    if options.input_files.is_empty() {
        bail!("No input PDF files found");
    }

    let merged = match pdf_nup::merge_pdfs(&options).await {
        Ok(merged) => merged,
        Err(err) => {
            let skipped = err.skipped();
            if !skipped.is_empty() {
                eprintln!("Files skipped before the failure:");
                for record in skipped {
                    eprintln!("  {}", record);
                }
            }
            return Err(err.into());
        }
    };

    println!("Merge Statistics:");
    for line in merged.statistics.to_string().lines() {
        println!("  {}", line);
    }

    if !merged.report.skipped.is_empty() {
        println!("Warnings:");
        for record in &merged.report.skipped {
            println!("  {}", record);
        }
    }

    pdf_nup::save_pdf(merged.document, &cli.output).await?;
    println!("Merged → {}", cli.output.display());

    Ok(())
}
