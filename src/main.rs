use anyhow::{bail, Context, Result};
use citeformat::config::{default_config_path, load_config, Config};
use citeformat::export::{export_to_path, render, ExportFormat, ExportOptions};
use citeformat::format::{AuthorHighlighter, CitationStyle};
use citeformat::input::{classify, parse_lines};
use citeformat::pipeline::{build_source, Pipeline, PipelineOptions, RunReport};
use citeformat::ui::{self, LookupProgress, Status};
use clap::{Parser, Subcommand};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Exit status when some lines could not be resolved
const EXIT_PARTIAL: u8 = 2;
/// Exit status after Ctrl-C
const EXIT_CANCELLED: u8 = 130;

/// citeformat - Turn a list of loose references into formatted citations
#[derive(Parser, Debug)]
#[command(name = "citeformat")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Look up references on Crossref and format them as citations", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v for debug, -vv for trace)
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress everything except citations and errors
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Bypass the on-disk lookup cache
    #[arg(long, global = true, default_value_t = false)]
    no_cache: bool,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Look up every line of INPUT and print or export the citations
    #[command(alias = "f")]
    Format {
        /// Reference list, one per line ("-" reads stdin)
        input: String,

        /// Citation style name, alias or menu number (see `citeformat styles`)
        #[arg(long, short)]
        style: Option<String>,

        /// Output format: text, markdown, html or pdf (default: from --output)
        #[arg(long, short = 'f')]
        format: Option<String>,

        /// Write the document to this file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Author name to emphasize in every citation (repeatable)
        #[arg(long, value_name = "NAME")]
        highlight: Vec<String>,

        /// Lookups in flight at once
        #[arg(long, short = 'j')]
        jobs: Option<usize>,

        /// Do not prefix citations with their position
        #[arg(long)]
        no_number: bool,
    },

    /// Show how each line of INPUT would be looked up
    #[command(alias = "d")]
    Detect {
        /// Reference list, one per line ("-" reads stdin)
        input: String,
    },

    /// List the supported citation styles
    #[command(alias = "ls")]
    Styles,

    /// Write a default configuration file
    InitConfig {
        /// Destination (default: the per-user configuration file)
        path: Option<PathBuf>,

        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Where and how the citations of a `format` run are written
#[derive(Debug, Clone, PartialEq, Eq)]
struct OutputTarget {
    format: ExportFormat,
    path: Option<PathBuf>,
}

impl OutputTarget {
    /// Resolve the output format from the flags, failing before any lookup
    fn resolve(format: Option<&str>, path: Option<PathBuf>) -> Result<Self> {
        let format = match (format, path.as_deref()) {
            (Some(name), _) => name.parse::<ExportFormat>()?,
            (None, Some(path)) => ExportFormat::from_path(path)?,
            (None, None) => ExportFormat::Plain,
        };

        match path.as_deref() {
            None if format.is_binary() => {
                bail!("{} output needs a file, pass --output", format)
            }
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    if !parent.is_dir() {
                        bail!("Output directory {} does not exist", parent.display());
                    }
                }
            }
            None => {}
        }

        Ok(Self { format, path })
    }
}

fn init_tracing(cli: &Cli, config: &Config) {
    let level = if cli.quiet {
        "error".to_string()
    } else {
        match cli.verbose {
            0 => config.logging.level.clone(),
            1 => "debug".to_string(),
            _ => "trace".to_string(),
        }
    };

    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| format!("citeformat={}", level)),
    );
    let registry = tracing_subscriber::registry().with(filter);

    if config.logging.is_json() {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read references from stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(input).with_context(|| format!("Failed to read {}", input))
}

fn exit_code(report: &RunReport) -> ExitCode {
    if report.cancelled {
        ExitCode::from(EXIT_CANCELLED)
    } else if !report.failures.is_empty() {
        ExitCode::from(EXIT_PARTIAL)
    } else {
        ExitCode::SUCCESS
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_format(
    cli: &Cli,
    mut config: Config,
    input: &str,
    style: Option<&str>,
    format: Option<&str>,
    output: Option<PathBuf>,
    highlight: &[String],
    jobs: Option<usize>,
    no_number: bool,
) -> Result<ExitCode> {
    let style: CitationStyle = style
        .unwrap_or(config.output.style.as_str())
        .parse()
        .context("Unsupported citation style")?;
    let target = OutputTarget::resolve(format, output)?;
    let text = read_input(input)?;

    if let Some(jobs) = jobs {
        config.pipeline.max_concurrent = jobs;
    }
    let names = if highlight.is_empty() {
        config.output.highlight.clone()
    } else {
        highlight.to_vec()
    };
    let highlighter = AuthorHighlighter::new(&names);
    let numbered = config.output.numbered && !no_number;

    let source = build_source(&config, cli.no_cache).context("Failed to set up the lookup client")?;
    let pipeline = Pipeline::new(source, PipelineOptions::from_config(&config));

    let cancel = CancellationToken::new();
    let cancel_on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_on_signal.cancel();
        }
    });

    let progress = LookupProgress::new(!cli.quiet);
    let report = pipeline.run(&text, &cancel, &progress).await;

    let highlighter = (!highlighter.is_empty()).then_some(&highlighter);
    let citations = report.citations(style, numbered, highlighter);
    let options = ExportOptions::new(style);

    match &target.path {
        Some(path) => {
            export_to_path(&citations, target.format, &options, path)?;
            if !cli.quiet {
                ui::print_status(
                    Status::Success,
                    &format!(
                        "Wrote {} citation(s) as {} to {}",
                        citations.len(),
                        target.format,
                        path.display()
                    ),
                );
            }
        }
        None => {
            let bytes = render(&citations, target.format, &options)?;
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&bytes).context("Failed to write citations")?;
            stdout.flush().context("Failed to write citations")?;
        }
    }

    if !cli.quiet {
        ui::print_summary(&report);
    } else if !report.failures.is_empty() {
        eprintln!("{}", ui::failure_table(&report.failures));
    }

    Ok(exit_code(&report))
}

fn run_detect(input: &str) -> Result<ExitCode> {
    let text = read_input(input)?;
    let rows: Vec<_> = parse_lines(&text)
        .into_iter()
        .map(|line| {
            let query = classify(&line);
            (line, query)
        })
        .collect();
    println!("{}", ui::detection_table(&rows));
    Ok(ExitCode::SUCCESS)
}

fn run_init_config(cli: &Cli, path: Option<&Path>, force: bool) -> Result<ExitCode> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => default_config_path().context("Could not determine the configuration directory")?,
    };
    Config::default()
        .save(&path, force)
        .with_context(|| format!("Failed to write configuration to {}", path.display()))?;
    if !cli.quiet {
        ui::print_status(
            Status::Success,
            &format!("Wrote default configuration to {}", path.display()),
        );
    }
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(timeout) = cli.timeout {
        config.lookup.timeout_seconds = timeout;
    }
    init_tracing(&cli, &config);

    match &cli.command {
        Commands::Format {
            input,
            style,
            format,
            output,
            highlight,
            jobs,
            no_number,
        } => {
            run_format(
                &cli,
                config,
                input,
                style.as_deref(),
                format.as_deref(),
                output.clone(),
                highlight,
                *jobs,
                *no_number,
            )
            .await
        }
        Commands::Detect { input } => run_detect(input),
        Commands::Styles => {
            println!("{}", ui::styles_table());
            Ok(ExitCode::SUCCESS)
        }
        Commands::InitConfig { path, force } => run_init_config(&cli, path.as_deref(), *force),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_format_flags() {
        let cli = Cli::parse_from([
            "citeformat",
            "-vv",
            "--no-cache",
            "format",
            "refs.txt",
            "-s",
            "ieee",
            "-o",
            "out.pdf",
            "--highlight",
            "Hinton",
            "--highlight",
            "LeCun",
            "-j",
            "8",
            "--no-number",
        ]);
        assert_eq!(cli.verbose, 2);
        assert!(cli.no_cache);
        match cli.command {
            Commands::Format {
                input,
                style,
                output,
                highlight,
                jobs,
                no_number,
                format,
            } => {
                assert_eq!(input, "refs.txt");
                assert_eq!(style.as_deref(), Some("ieee"));
                assert_eq!(output, Some(PathBuf::from("out.pdf")));
                assert_eq!(highlight, vec!["Hinton", "LeCun"]);
                assert_eq!(jobs, Some(8));
                assert!(no_number);
                assert!(format.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["citeformat", "detect", "-", "--timeout", "5", "-q"]);
        assert_eq!(cli.timeout, Some(5));
        assert!(cli.quiet);
        assert!(matches!(cli.command, Commands::Detect { ref input } if input == "-"));
    }

    #[test]
    fn test_cli_init_config() {
        let cli = Cli::parse_from(["citeformat", "init-config", "my.toml", "--force"]);
        match cli.command {
            Commands::InitConfig { path, force } => {
                assert_eq!(path, Some(PathBuf::from("my.toml")));
                assert!(force);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["citeformat"]).is_err());
        assert!(Cli::try_parse_from(["citeformat", "format"]).is_err());
    }

    #[test]
    fn test_output_target_resolution() {
        let target = OutputTarget::resolve(None, None).unwrap();
        assert_eq!(target.format, ExportFormat::Plain);

        let target = OutputTarget::resolve(None, Some(PathBuf::from("refs.md"))).unwrap();
        assert_eq!(target.format, ExportFormat::Markdown);

        let target = OutputTarget::resolve(Some("html"), Some(PathBuf::from("refs.txt"))).unwrap();
        assert_eq!(target.format, ExportFormat::Html);

        assert!(OutputTarget::resolve(Some("docx"), None).is_err());
        assert!(OutputTarget::resolve(Some("pdf"), None).is_err());
        assert!(OutputTarget::resolve(None, Some(PathBuf::from("refs.xyz"))).is_err());
        assert!(
            OutputTarget::resolve(None, Some(PathBuf::from("/no/such/dir/refs.html"))).is_err()
        );
    }

    #[test]
    fn test_exit_codes() {
        let mut report = RunReport::default();
        assert_eq!(exit_code(&report), ExitCode::SUCCESS);

        report.failures.push(citeformat::pipeline::LineFailure {
            line: 1,
            text: "x".to_string(),
            kind: citeformat::pipeline::FailureKind::NotFound,
            reason: "no match".to_string(),
        });
        assert_eq!(exit_code(&report), ExitCode::from(EXIT_PARTIAL));

        report.cancelled = true;
        assert_eq!(exit_code(&report), ExitCode::from(EXIT_CANCELLED));
    }
}
