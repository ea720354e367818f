use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;

use base64::{engine::general_purpose::STANDARD_NO_PAD as BASE64, Engine};
use clap::{ArgAction, Parser, ValueEnum};
use serde::Serialize;

use bqstorage_errors::logging::{init_logging, LoggingConfig};
use bqstorage_errors::transport::{code_name, parse_code_name};
use bqstorage_errors::{
    classify_with, ClassifierConfig, FailureKind, MessageClassifier, RecoveryHint, StorageFailure,
};

mod exit_codes {
    use std::process::ExitCode;

    pub fn classified() -> ExitCode {
        ExitCode::SUCCESS
    }

    pub fn unclassified() -> ExitCode {
        ExitCode::from(1)
    }

    pub fn failed() -> ExitCode {
        ExitCode::from(2)
    }
}

/// Output format for the classification report
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum OutputFormat {
    /// Human-readable key/value lines
    #[default]
    Text,
    /// A single JSON object
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "bqclassify")]
#[command(version)]
#[command(about = "Classify a BigQuery Storage Write API append failure")]
#[command(after_help = "Examples:
  bqclassify -m 'Stream has been finalized and cannot be appended'
  bqclassify -c unavailable -m 'connection reset'
  bqclassify --details \"$GRPC_STATUS_DETAILS_BIN\" --format json

Exit codes:
  0   Classified
  1   Not a recognised failure; apply generic handling
  2   Malformed details, bad base64, or bad configuration")]
struct Cli {
    /// gRPC status code of the failed call (e.g. invalid-argument, UNAVAILABLE)
    #[arg(long, short, default_value = "invalid-argument", value_parser = parse_code)]
    code: tonic::Code,

    /// Status message returned by the server
    #[arg(long, short)]
    message: Option<String>,

    /// Base64 `grpc-status-details-bin` value (padding optional)
    #[arg(long, value_name = "BASE64")]
    details: Option<String>,

    /// Classifier configuration file (TOML)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Report format
    #[arg(long, short, default_value = "text", value_enum)]
    format: OutputFormat,

    /// Suppress log output
    #[arg(long, short)]
    quiet: bool,

    /// Increase verbosity (-v, -vv)
    #[arg(long, short, action = ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,
}

fn parse_code(value: &str) -> Result<tonic::Code, String> {
    parse_code_name(value).ok_or_else(|| format!("unknown gRPC status code: {}", value))
}

#[derive(Debug, Serialize)]
struct Report<'a> {
    classified: bool,
    kind: Option<FailureKind>,
    stream_name: Option<&'a str>,
    message: Option<&'a str>,
    recovery_hint: Option<RecoveryHint>,
    errors: BTreeMap<&'a str, &'static str>,
}

impl<'a> Report<'a> {
    fn new(failure: Option<&'a StorageFailure>) -> Self {
        match failure {
            Some(failure) => Self {
                classified: true,
                kind: Some(failure.kind()),
                stream_name: failure.stream_name(),
                message: failure.message(),
                recovery_hint: Some(failure.recovery_hint()),
                errors: failure
                    .errors()
                    .iter()
                    .map(|(stream, code)| (stream.as_str(), code_name(*code)))
                    .collect(),
            },
            None => Self {
                classified: false,
                kind: None,
                stream_name: None,
                message: None,
                recovery_hint: None,
                errors: BTreeMap::new(),
            },
        }
    }

    fn render_text(&self) -> String {
        let Some(kind) = self.kind else {
            return "unclassified\n".to_string();
        };

        let mut out = format!("kind: {}\n", kind);
        if let Some(stream) = self.stream_name {
            out.push_str(&format!("stream: {}\n", stream));
        }
        if let Some(hint) = self.recovery_hint {
            out.push_str(&format!("recovery: {}\n", hint));
        }
        if let Some(message) = self.message {
            out.push_str(&format!("message: {}\n", message));
        }
        for (stream, code) in &self.errors {
            out.push_str(&format!("error: {} {}\n", stream, code));
        }
        out
    }
}

fn load_classifier(
    path: Option<&PathBuf>,
) -> Result<MessageClassifier, Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            let config = ClassifierConfig::load(path)?;
            tracing::debug!(path = %path.display(), "loaded classifier configuration");
            Ok(MessageClassifier::from_config(&config)?)
        }
        None => Ok(MessageClassifier::new()),
    }
}

fn decode_details(value: &str) -> Result<Vec<u8>, base64::DecodeError> {
    BASE64.decode(value.trim().trim_end_matches('='))
}

fn run(cli: &Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let classifier = load_classifier(cli.config.as_ref())?;

    let message = cli.message.clone().unwrap_or_default();
    let status = match &cli.details {
        Some(details) => {
            let bytes = decode_details(details)?;
            tonic::Status::with_details(cli.code, message, bytes.into())
        }
        None => tonic::Status::new(cli.code, message),
    };

    let failure = classify_with(&classifier, &status)?;
    let report = Report::new(failure.as_ref());

    match cli.format {
        OutputFormat::Text => print!("{}", report.render_text()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    Ok(if report.classified {
        exit_codes::classified()
    } else {
        exit_codes::unclassified()
    })
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.quiet {
        init_logging(LoggingConfig::quiet());
    } else {
        init_logging(LoggingConfig::from_verbosity(cli.verbose));
    }

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            tracing::debug!(error = %e, "classification failed");
            eprintln!("error: {}", e);
            exit_codes::failed()
        }
    }
}
