//! Violation Triage CLI

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, Level};
use tracing_subscriber::FmtSubscriber;
use triage_core::listing::{FlaggedQuery, SortKey};
use triage_core::memory::{Fixture, InMemoryStore};
use triage_core::model::{CarrierId, ChallengeType, SafetyCategory, ViolationId};
use triage_core::report::{self, Report, ReportFormat};
use triage_core::{
    codes, Category, CoreError, CoreResult, OutcomeLearner, ScanOptions, ScanOrchestrator,
    TriagePolicy,
};

#[derive(Parser)]
#[command(name = "triage")]
#[command(about = "Violation challenge triage over a JSON fixture")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Fixture with carriers, their records and jurisdiction profiles
    #[arg(short, long, global = true, default_value = "triage.json")]
    fixture: PathBuf,

    /// Policy file (JSON); missing fields keep their defaults
    #[arg(short, long, global = true)]
    policy: Option<PathBuf>,

    /// Reference time (RFC 3339) used instead of the current time
    #[arg(long, global = true)]
    as_of: Option<DateTime<Utc>>,

    /// Output format (json, markdown)
    #[arg(short, long, global = true, default_value = "markdown")]
    output: String,

    /// Output file (defaults to stdout)
    #[arg(short = 'O', long, global = true)]
    output_file: Option<PathBuf>,

    /// Write scan results and learned profiles back to the fixture
    #[arg(long, global = true)]
    save: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a carrier's stale violations
    Scan {
        /// Carrier id (optional when the fixture holds one carrier)
        #[arg(short, long)]
        carrier: Option<CarrierId>,

        /// Rescan records that are still fresh
        #[arg(long)]
        force: bool,

        /// Records per chunk
        #[arg(long)]
        batch_size: Option<usize>,
    },

    /// Re-run the full pipeline for one violation
    Rescan {
        #[arg(long)]
        violation: ViolationId,
    },

    /// Dashboard statistics for a carrier
    Dashboard {
        #[arg(short, long)]
        carrier: Option<CarrierId>,
    },

    /// List scanned violations, best candidates first
    List {
        #[arg(short, long)]
        carrier: Option<CarrierId>,

        /// easy_win, worth_challenging, expiring_soon or unlikely
        #[arg(long)]
        category: Option<Category>,

        /// Safety category, e.g. hours_of_service
        #[arg(long, value_parser = parse_tag::<SafetyCategory>)]
        safety_category: Option<SafetyCategory>,

        #[arg(long, default_value = "1")]
        page: usize,

        #[arg(long, default_value = "20")]
        limit: usize,

        /// priority_score, flag_count, violation_date, category or percentile_change
        #[arg(long, default_value = "priority_score")]
        sort_by: SortKey,
    },

    /// Feed a challenge outcome to the jurisdiction learner
    Outcome {
        /// Jurisdiction code, e.g. TX
        #[arg(short, long)]
        jurisdiction: String,

        /// data_error, policy_violation, procedural_error or not_responsible
        #[arg(long, value_parser = parse_tag::<ChallengeType>)]
        challenge_type: Option<ChallengeType>,

        #[arg(long, value_enum)]
        result: Verdict,
    },

    /// List stored jurisdiction profiles
    Profiles,

    /// List regulatory codes with a history of recording errors
    Codes,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Verdict {
    Accepted,
    Denied,
}

/// Parse a snake_case enum tag the way the fixture spells it
fn parse_tag<T: DeserializeOwned>(s: &str) -> Result<T, String> {
    serde_json::from_value(serde_json::Value::String(s.trim().to_string()))
        .map_err(|_| format!("unknown value: {}", s))
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging; reports go to stdout, logs to stderr
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set subscriber: {}", e);
    }

    let format: ReportFormat = match cli.output.parse() {
        Ok(format) => format,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let result = match &cli.command {
        Commands::Codes => cmd_codes(format),
        _ => run(&cli, format).await,
    };

    match result {
        Ok(content) => {
            if let Some(out_path) = &cli.output_file {
                if let Err(e) = std::fs::write(out_path, &content) {
                    error!("Failed to write {}: {}", out_path.display(), e);
                    std::process::exit(1);
                }
                info!("Report written to: {}", out_path.display());
            } else {
                println!("{}", content);
            }
        }
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    }
}

/// Orchestrator over the fixture loaded into memory
struct Session {
    store: Arc<InMemoryStore>,
    orchestrator: ScanOrchestrator<InMemoryStore, InMemoryStore>,
    carriers: Vec<CarrierId>,
}

impl Session {
    async fn open(fixture_path: &Path, policy_path: Option<&Path>, as_of: Option<DateTime<Utc>>) -> CoreResult<Self> {
        let fixture = Fixture::load(fixture_path).await?;
        let carriers: Vec<CarrierId> = fixture.carriers.iter().map(|c| c.carrier.id).collect();
        let policy = load_policy(policy_path).await?;
        info!(
            "Loaded {} carrier(s) from {}",
            carriers.len(),
            fixture_path.display()
        );

        let store = Arc::new(InMemoryStore::from_fixture(fixture).await);
        let mut orchestrator = ScanOrchestrator::new(store.clone(), store.clone(), policy);
        if let Some(as_of) = as_of {
            debug!(%as_of, "Using fixed reference time");
            orchestrator = orchestrator.with_clock(Arc::new(move || as_of));
        }

        Ok(Self {
            store,
            orchestrator,
            carriers,
        })
    }

    fn carrier(&self, requested: Option<CarrierId>) -> CoreResult<CarrierId> {
        pick_carrier(requested, &self.carriers)
    }

    async fn save(&self, path: &Path) -> CoreResult<()> {
        self.store.to_fixture().await.save(path).await?;
        info!("Fixture saved to: {}", path.display());
        Ok(())
    }
}

fn pick_carrier(requested: Option<CarrierId>, known: &[CarrierId]) -> CoreResult<CarrierId> {
    match (requested, known) {
        (Some(id), _) => Ok(id),
        (None, [only]) => Ok(*only),
        (None, []) => Err(CoreError::NotFound("fixture has no carriers".to_string())),
        (None, _) => Err(CoreError::Config(
            "fixture holds several carriers, pass --carrier".to_string(),
        )),
    }
}

async fn load_policy(path: Option<&Path>) -> CoreResult<TriagePolicy> {
    let Some(path) = path else {
        return TriagePolicy::from_env();
    };
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| CoreError::Config(format!("{}: {}", path.display(), e)))?;
    let policy: TriagePolicy = serde_json::from_str(&raw)?;
    policy.validate()?;
    Ok(policy)
}

async fn run(cli: &Cli, format: ReportFormat) -> CoreResult<String> {
    let session = Session::open(&cli.fixture, cli.policy.as_deref(), cli.as_of).await?;

    let content = match &cli.command {
        Commands::Scan { carrier, force, batch_size } => {
            cmd_scan(&session, *carrier, *force, *batch_size, format).await?
        }
        Commands::Rescan { violation } => cmd_rescan(&session, *violation, format).await?,
        Commands::Dashboard { carrier } => cmd_dashboard(&session, *carrier, format).await?,
        Commands::List {
            carrier,
            category,
            safety_category,
            page,
            limit,
            sort_by,
        } => {
            let query = FlaggedQuery {
                category: *category,
                safety_category: *safety_category,
                page: *page,
                limit: *limit,
                sort_by: *sort_by,
            };
            cmd_list(&session, *carrier, &query, format).await?
        }
        Commands::Outcome {
            jurisdiction,
            challenge_type,
            result,
        } => cmd_outcome(&session, jurisdiction, *challenge_type, *result, format).await?,
        Commands::Profiles => cmd_profiles(&session, format).await?,
        Commands::Codes => cmd_codes(format)?,
    };

    if cli.save {
        session.save(&cli.fixture).await?;
    }
    Ok(content)
}

async fn cmd_scan(
    session: &Session,
    carrier: Option<CarrierId>,
    force: bool,
    batch_size: Option<usize>,
    format: ReportFormat,
) -> CoreResult<String> {
    let carrier_id = session.carrier(carrier)?;
    info!("Scanning carrier: {}", carrier_id);

    let summary = session
        .orchestrator
        .scan_carrier(carrier_id, ScanOptions { force, batch_size })
        .await?;
    info!(
        "Scan completed: {} scanned, {} flagged, {} failed",
        summary.scanned, summary.flagged, summary.failed
    );

    report::generate_report(&Report::Scan(&summary), format)
}

async fn cmd_rescan(session: &Session, violation: ViolationId, format: ReportFormat) -> CoreResult<String> {
    info!("Rescanning violation: {}", violation);
    let result = session.orchestrator.rescan_violation(violation).await?;
    report::generate_report(&Report::Rescan(&result), format)
}

async fn cmd_dashboard(session: &Session, carrier: Option<CarrierId>, format: ReportFormat) -> CoreResult<String> {
    let stats = session.orchestrator.dashboard(session.carrier(carrier)?).await?;
    report::generate_report(&Report::Dashboard(&stats), format)
}

async fn cmd_list(
    session: &Session,
    carrier: Option<CarrierId>,
    query: &FlaggedQuery,
    format: ReportFormat,
) -> CoreResult<String> {
    let page = session
        .orchestrator
        .list_flagged(session.carrier(carrier)?, query)
        .await?;
    report::generate_report(&Report::Flagged(&page), format)
}

async fn cmd_outcome(
    session: &Session,
    jurisdiction: &str,
    challenge_type: Option<ChallengeType>,
    verdict: Verdict,
    format: ReportFormat,
) -> CoreResult<String> {
    let profiles = session.orchestrator.profiles();
    let (reporter, learner) = OutcomeLearner::spawn(profiles.clone(), 16);

    reporter.record(jurisdiction, challenge_type, matches!(verdict, Verdict::Accepted));
    drop(reporter);
    let processed = learner
        .await
        .map_err(|e| CoreError::Task(e.to_string()))?;
    debug!(processed, "Learner drained");

    let updated: Vec<_> = profiles.get_or_seed(jurisdiction).await?.into_iter().collect();
    report::generate_report(&Report::Profiles(&updated), format)
}

async fn cmd_profiles(session: &Session, format: ReportFormat) -> CoreResult<String> {
    let profiles = session.orchestrator.profiles().list_profiles().await?;
    report::generate_report(&Report::Profiles(&profiles), format)
}

fn cmd_codes(format: ReportFormat) -> CoreResult<String> {
    match format {
        ReportFormat::Json => Ok(serde_json::to_string_pretty(codes::all())?),
        ReportFormat::Markdown => {
            let mut out = String::from("# Error-Prone Codes\n\n| Code | Boost | Reason |\n|---|---|---|\n");
            for code in codes::all() {
                out.push_str(&format!("| {} | {} | {} |\n", code.code, code.boost, code.reason));
            }
            Ok(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_parse_tag() {
        assert_eq!(
            parse_tag::<SafetyCategory>("hours_of_service"),
            Ok(SafetyCategory::HoursOfService)
        );
        assert_eq!(
            parse_tag::<ChallengeType>(" data_error "),
            Ok(ChallengeType::DataError)
        );
        assert!(parse_tag::<SafetyCategory>("parking").is_err());
    }

    #[test]
    fn test_pick_carrier() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(pick_carrier(None, &[a]).unwrap(), a);
        assert_eq!(pick_carrier(Some(b), &[a]).unwrap(), b);
        assert!(matches!(pick_carrier(None, &[a, b]), Err(CoreError::Config(_))));
        assert!(matches!(pick_carrier(None, &[]), Err(CoreError::NotFound(_))));
    }

    #[test]
    fn test_cli_parses_list_options() {
        let cli = Cli::try_parse_from([
            "triage",
            "list",
            "--category",
            "easy_win",
            "--safety-category",
            "vehicle_maintenance",
            "--sort-by",
            "flagCount",
            "-o",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.output, "json");
        match cli.command {
            Commands::List {
                category,
                safety_category,
                sort_by,
                page,
                ..
            } => {
                assert_eq!(category, Some(Category::EasyWin));
                assert_eq!(safety_category, Some(SafetyCategory::VehicleMaintenance));
                assert_eq!(sort_by, SortKey::FlagCount);
                assert_eq!(page, 1);
            }
            _ => panic!("expected list"),
        }
    }

    #[test]
    fn test_codes_markdown() {
        let md = cmd_codes(ReportFormat::Markdown).unwrap();
        assert!(md.contains("| 395.8 | 18 |"));
    }

    #[tokio::test]
    async fn test_scan_then_save_round_trip() {
        use triage_core::memory::CarrierData;
        use triage_core::model::{Carrier, Challenge, Location, Violation};

        let carrier = Carrier {
            id: Uuid::new_v4(),
            name: "Prairie Haulers".to_string(),
            registration_id: "7654321".to_string(),
        };
        let as_of: DateTime<Utc> = "2026-06-01T00:00:00Z".parse().unwrap();
        let violation = Violation {
            id: Uuid::new_v4(),
            carrier_id: carrier.id,
            inspection_number: "IA-1".to_string(),
            violation_date: Some(as_of - chrono::Duration::days(60)),
            code: Some("395.8".to_string()),
            description: "Record of duty status not current".to_string(),
            category: SafetyCategory::HoursOfService,
            severity_weight: 5,
            out_of_service: false,
            crash_related: false,
            location: Location {
                city: Some("Des Moines".to_string()),
                jurisdiction: Some("IA".to_string()),
            },
            driver_id: None,
            vehicle_id: None,
            challenge: Challenge::default(),
            favorable_outcome: None,
            scan: None,
        };
        let fixture = Fixture {
            carriers: vec![CarrierData {
                carrier,
                drivers: vec![],
                inspections: vec![],
                accidents: vec![],
                violations: vec![violation],
            }],
            profiles: vec![],
        };

        let path = std::env::temp_dir().join(format!("triage-cli-{}.json", Uuid::new_v4()));
        fixture.save(&path).await.unwrap();

        let session = Session::open(&path, None, Some(as_of)).await.unwrap();
        let json = cmd_scan(&session, None, false, None, ReportFormat::Json).await.unwrap();
        let summary: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(summary["scanned"], 1);
        session.save(&path).await.unwrap();

        let reloaded = Fixture::load(&path).await.unwrap();
        assert!(reloaded.carriers[0].violations[0].scan.is_some());
        assert_eq!(reloaded.profiles.len(), 1);
        assert_eq!(reloaded.profiles[0].code, "IA");

        let _ = std::fs::remove_file(&path);
    }
}
