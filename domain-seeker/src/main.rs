//! Domain Seeker CLI Application
//!
//! Scans candidate domain names for availability over RDAP, one query at a
//! time, and reports what can be registered.

mod deliver;
mod ui;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::Parser;
use deliver::{Notifier, PasteUploader};
use domain_seeker_lib::{
    configured_generator, load_env_config, parse_delay_string, parse_timeout_string,
    render_markdown, render_text, select_source, ConfigManager, DomainSeekerError, FanoutSink,
    HttpTransport, NotifyMethod, RdapBootstrap, RdapClient, ResultSink, ResultsFileSink,
    ScanResult, ScanSummary, Scanner, Settings, SourceMode, StopSignal, TldSet,
    IANA_BOOTSTRAP_URL,
};
use serde::Serialize;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// Exit code for a run stopped by Ctrl-C.
const EXIT_INTERRUPTED: i32 = 130;

/// CLI arguments for domain-seeker
#[derive(Parser, Debug)]
#[command(name = "domain-seeker")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Find registrable domain names by scanning RDAP services")]
#[command(
    long_about = "Find registrable domain names by scanning RDAP services.\n\nBase names come from a domain list file or a generator and are checked against every configured TLD, one query at a time with a pause between queries."
)]
#[command(styles = STYLES)]
pub struct Args {
    /// TLDs to check (comma-separated or multiple -t flags)
    #[arg(short = 't', long = "tld", value_name = "TLD", value_delimiter = ',', action = clap::ArgAction::Append, help_heading = "Scan")]
    pub tlds: Option<Vec<String>>,

    /// Pause between query starts: seconds (1.5), or with unit (1.5s, 500ms)
    #[arg(long = "delay", value_name = "DELAY", help_heading = "Scan")]
    pub delay: Option<String>,

    /// Extra attempts after a rate-limited or failed query
    #[arg(long = "max-retries", value_name = "N", help_heading = "Scan")]
    pub max_retries: Option<u32>,

    /// Per-request timeout (e.g. 10s, 1m)
    #[arg(long = "timeout", value_name = "DURATION", help_heading = "Scan")]
    pub timeout: Option<String>,

    /// Merge the IANA RDAP bootstrap registry into the built-in endpoints
    #[arg(long = "bootstrap", help_heading = "Scan")]
    pub bootstrap: bool,

    /// Where names come from: file, generator or auto
    #[arg(long = "source", value_name = "MODE", help_heading = "Domain Source")]
    pub source: Option<String>,

    /// Domain list file (one base name per line)
    #[arg(
        short = 'f',
        long = "file",
        value_name = "FILE",
        help_heading = "Domain Source"
    )]
    pub file: Option<PathBuf>,

    /// Built-in generator: three-letter, three-char or pattern:<p>
    #[arg(
        short = 'g',
        long = "generator",
        value_name = "NAME",
        help_heading = "Domain Source"
    )]
    pub generator: Option<String>,

    /// TOML generator file (names, patterns, prefixes, suffixes)
    #[arg(long = "generator-file", value_name = "FILE", help_heading = "Domain Source")]
    pub generator_file: Option<PathBuf>,

    /// Results file for available domains
    #[arg(
        short = 'o',
        long = "output",
        value_name = "FILE",
        help_heading = "Output"
    )]
    pub output: Option<PathBuf>,

    /// Do not write a results file
    #[arg(long = "no-output", conflicts_with = "output", help_heading = "Output")]
    pub no_output: bool,

    /// Print the final result as JSON instead of console lines
    #[arg(short = 'j', long = "json", help_heading = "Output")]
    pub json: bool,

    /// HedgeDoc base URL to upload the Markdown report to
    #[arg(long = "paste-url", value_name = "URL", help_heading = "Output")]
    pub paste_url: Option<String>,

    /// Skip the report upload even if a paste URL is configured
    #[arg(long = "no-upload", conflicts_with = "paste_url", help_heading = "Output")]
    pub no_upload: bool,

    /// Completion notification: none, email or telegram
    #[arg(long = "notify", value_name = "METHOD", help_heading = "Output")]
    pub notify: Option<String>,

    /// Use specific config file instead of automatic discovery
    #[arg(long = "config", value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<String>,

    /// Show every outcome and debug logging
    #[arg(short = 'v', long = "verbose", help_heading = "Configuration")]
    pub verbose: bool,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    summary: &'a ScanSummary,
    result: &'a ScanResult,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(args).await {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

/// Install the stderr subscriber. `RUST_LOG` overrides the default filter.
fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "domain_seeker=debug,domain_seeker_lib=debug,warn"
    } else {
        "domain_seeker=info,domain_seeker_lib=info,warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();
}

/// Main scan logic. Returns the process exit code.
async fn run(args: Args) -> Result<i32, DomainSeekerError> {
    let settings = build_settings(&args)?;
    let scan_config = settings.scan_config()?;

    let transport = HttpTransport::new(scan_config.request_timeout, &scan_config.user_agent)?;
    let bootstrap = build_bootstrap(&settings, transport.http_client()).await;
    let client = RdapClient::new(transport, Arc::new(bootstrap));

    let generator = configured_generator(
        settings.generator.as_deref(),
        settings.generator_file.as_deref(),
    )?;
    let mut source = select_source(
        settings.source_mode,
        Some(settings.domains_file.as_path()),
        generator,
    )?;

    let mut sink = FanoutSink::new();
    if !settings.json {
        sink.push(Box::new(ui::ConsoleSink::new(args.verbose)));
    }
    if let Some(path) = &settings.results_file {
        sink.push(Box::new(ResultsFileSink::create(path, &scan_config.tlds)?));
    }

    let stop = StopSignal::new();
    install_interrupt_handler(stop.clone());

    let tlds = scan_config.tlds.clone();
    let scanner = Scanner::new(client, scan_config).with_stop_signal(stop);

    if !settings.json {
        ui::print_header(&settings, &source.describe());
    }

    let result = match scanner.run(source.as_mut(), &mut sink).await {
        Ok(result) => result,
        Err(failure) => {
            if !failure.partial.is_empty() {
                // Keep what was found: footer in the results file and a summary.
                let _ = sink.finish(&failure.partial);
                if !settings.json {
                    ui::print_summary(&ScanSummary::from_result(&failure.partial, &tlds));
                }
            }
            eprintln!("Error: {}", failure);
            return Ok(1);
        }
    };

    let summary = ScanSummary::from_result(&result, &tlds);
    if settings.json {
        let report = JsonReport {
            summary: &summary,
            result: &result,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        ui::print_summary(&summary);
    }

    deliver_report(&settings, &summary, &result, &tlds).await;

    Ok(if result.is_interrupted() {
        EXIT_INTERRUPTED
    } else {
        0
    })
}

fn install_interrupt_handler(stop: StopSignal) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current query");
            stop.raise();
        }
    });
}

/// Resolve settings: defaults, then config files, then `DS_*`, then flags.
fn build_settings(args: &Args) -> Result<Settings, DomainSeekerError> {
    let mut settings = Settings::default();
    let config_manager = ConfigManager::new(args.verbose);
    let env_config = load_env_config();

    // Step 1: explicit config file (flag, then DS_CONFIG) or discovery
    let explicit_path = args.config.clone().or_else(|| env_config.config.clone());
    let file_config = match explicit_path {
        Some(path) => {
            info!(path = %path, "Using explicit config file");
            config_manager.load_file(&path)?
        }
        None => config_manager.discover_and_load()?,
    };
    settings.apply_file(&file_config);

    // Step 2: environment variables
    settings.apply_env(&env_config);

    // Step 3: CLI arguments (highest precedence)
    apply_cli_args(&mut settings, args)?;

    settings.validate()?;
    Ok(settings)
}

fn apply_cli_args(settings: &mut Settings, args: &Args) -> Result<(), DomainSeekerError> {
    if let Some(tlds) = &args.tlds {
        TldSet::parse(tlds)?;
        settings.tlds = tlds.clone();
    }

    if let Some(delay) = &args.delay {
        settings.delay = parse_delay_string(delay).ok_or_else(|| {
            DomainSeekerError::config(format!(
                "Invalid delay '{}'. Use seconds like 1.5, or '1.5s', '500ms'",
                delay
            ))
        })?;
    }

    if let Some(retries) = args.max_retries {
        settings.max_retries = retries;
    }

    if let Some(timeout) = &args.timeout {
        let secs = parse_timeout_string(timeout).ok_or_else(|| {
            DomainSeekerError::config(format!(
                "Invalid timeout '{}'. Use format like '5s', '30s', '2m'",
                timeout
            ))
        })?;
        settings.timeout = Duration::from_secs(secs);
    }

    if args.bootstrap {
        settings.bootstrap = true;
    }

    if let Some(mode) = &args.source {
        settings.source_mode = mode.parse::<SourceMode>()?;
    }
    if let Some(path) = &args.file {
        settings.domains_file = path.clone();
    }
    if let Some(generator) = &args.generator {
        settings.generator = Some(generator.clone());
    }
    if let Some(path) = &args.generator_file {
        settings.generator_file = Some(path.clone());
    }

    if args.no_output {
        settings.results_file = None;
    } else if let Some(path) = &args.output {
        settings.results_file = Some(path.clone());
    }

    if args.json {
        settings.json = true;
    }

    if args.no_upload {
        settings.paste_url = None;
    } else if let Some(url) = &args.paste_url {
        settings.paste_url = Some(url.clone());
    }

    if let Some(method) = &args.notify {
        settings.notification.method = method.parse::<NotifyMethod>()?;
    }

    Ok(())
}

/// Built-in endpoints, plus the IANA registry when enabled.
///
/// A failed IANA fetch is not fatal; TLDs the built-in table lacks are
/// reported when the scan checks coverage.
async fn build_bootstrap(settings: &Settings, http: &reqwest::Client) -> RdapBootstrap {
    let builtin = RdapBootstrap::builtin();
    if !settings.bootstrap {
        return builtin;
    }

    match RdapBootstrap::fetch_iana(http, IANA_BOOTSTRAP_URL, settings.timeout).await {
        Ok(iana) => builtin.merge(iana),
        Err(err) => {
            warn!(error = %err, "IANA bootstrap unavailable, using built-in endpoints only");
            builtin
        }
    }
}

/// Upload the report and send the notification. Failures are only logged.
async fn deliver_report(
    settings: &Settings,
    summary: &ScanSummary,
    result: &ScanResult,
    tlds: &TldSet,
) {
    let mut report_url = None;

    if let Some(base_url) = &settings.paste_url {
        let markdown = render_markdown(summary, result, tlds);
        let uploaded = match PasteUploader::new(base_url, settings.timeout) {
            Ok(uploader) => uploader.upload(&markdown).await,
            Err(err) => Err(err),
        };
        match uploaded {
            Ok(url) => {
                info!(url = %url, "Report uploaded");
                if !settings.json {
                    println!("Report: {}", url);
                }
                report_url = Some(url);
            }
            Err(err) => warn!(error = %err, "Report upload failed"),
        }
    }

    if settings.notification.method == NotifyMethod::None {
        return;
    }

    let subject = format!(
        "domain-seeker {}: {} available of {} checked",
        summary.status_label(),
        summary.available,
        summary.checked
    );
    let mut body = render_text(summary);
    if let Some(url) = &report_url {
        body.push_str(&format!("\nReport: {}\n", url));
    }

    let sent = match Notifier::new(settings.notification.clone(), settings.timeout) {
        Ok(notifier) => notifier.notify(&subject, &body).await,
        Err(err) => Err(err),
    };
    if let Err(err) = sent {
        warn!(error = %err, "Notification failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("domain-seeker").chain(argv.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_cli_args_override_settings() {
        let args = parse(&[
            "-t", "io,dev", "--delay", "250ms", "--max-retries", "5", "--timeout", "30s",
            "--source", "generator", "-g", "three-letter", "--no-output", "--notify", "none",
        ]);
        let mut settings = Settings::default();
        apply_cli_args(&mut settings, &args).unwrap();

        assert_eq!(settings.tlds, vec!["io", "dev"]);
        assert_eq!(settings.delay, Duration::from_millis(250));
        assert_eq!(settings.max_retries, 5);
        assert_eq!(settings.timeout, Duration::from_secs(30));
        assert_eq!(settings.source_mode, SourceMode::Generator);
        assert_eq!(settings.generator.as_deref(), Some("three-letter"));
        assert_eq!(settings.results_file, None);
    }

    #[test]
    fn test_invalid_cli_values_are_configuration_errors() {
        for argv in [
            &["--delay", "soon"][..],
            &["--timeout", "0s"][..],
            &["--source", "both"][..],
            &["--notify", "pager"][..],
            &["-t", "b@d"][..],
        ] {
            let mut settings = Settings::default();
            let err = apply_cli_args(&mut settings, &parse(argv)).unwrap_err();
            assert!(err.is_configuration(), "{:?} gave {}", argv, err);
        }
    }

    #[test]
    fn test_no_upload_clears_configured_paste_url() {
        let mut settings = Settings {
            paste_url: Some("https://pad.example".to_string()),
            ..Default::default()
        };
        apply_cli_args(&mut settings, &parse(&["--no-upload"])).unwrap();
        assert_eq!(settings.paste_url, None);
    }

    #[test]
    fn test_output_and_no_output_conflict() {
        let parsed = Args::try_parse_from(["domain-seeker", "-o", "a.txt", "--no-output"]);
        assert!(parsed.is_err());
    }
}
