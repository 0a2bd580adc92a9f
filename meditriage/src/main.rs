use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use medi_triage::{
    ExplanationReport, PatientRecord, TriageArtifacts, TriageConfig, TriageDecision, TriageError,
};
use serde::Serialize;

#[derive(Debug, Parser)]
#[command(
    name = "meditriage",
    version,
    about = "Emergency department triage with safety rules and explained model output",
    long_about = "meditriage classifies a patient into triage levels 0-3.\n\n\
        Hard safety rules (SpO2 < 90, systolic BP > 190) override the model,\n\
        the department is routed from vitals, and a TreeSHAP explanation lists\n\
        the three features that weighed most on the level.\n\n\
        EXAMPLES:\n\
        \n  meditriage assess --age 75 --spo2 88                 Assess from intake flags\n\
        \n  meditriage assess --input patient.json --json        Assess a JSON record\n\
        \n  cat patient.json | meditriage explain --input -      Explain a record from stdin\n\
        \n  meditriage config                                    Show the effective configuration"
)]
struct Cli {
    /// Increase verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// TOML configuration file (falls back to MEDI_TRIAGE_CONFIG, then built-in defaults)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run triage and the explanation for one patient
    Assess(AssessArgs),

    /// Explain the model's own prediction for one patient
    Explain(ExplainArgs),

    /// Print the effective configuration as TOML
    Config,
}

#[derive(Debug, Args, Clone)]
struct AssessArgs {
    #[command(flatten)]
    intake: IntakeArgs,

    /// Emit the decision and explanation as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args, Clone)]
struct ExplainArgs {
    #[command(flatten)]
    intake: IntakeArgs,

    /// Emit the explanation as JSON
    #[arg(long)]
    json: bool,
}

/// Patient intake. `--input` takes precedence over the individual fields.
#[derive(Debug, Args, Clone)]
struct IntakeArgs {
    /// JSON patient record ("-" reads stdin)
    #[arg(long, value_name = "FILE")]
    input: Option<PathBuf>,

    #[arg(long, default_value_t = 45, value_parser = clap::value_parser!(u16).range(0..=120))]
    age: u16,

    #[arg(long, default_value = "walk_in", value_parser = ["walk_in", "ambulance", "wheelchair"])]
    arrival_mode: String,

    /// Heart rate (BPM)
    #[arg(long, visible_alias = "hr", default_value_t = 80, value_parser = clap::value_parser!(u16).range(40..=200))]
    heart_rate: u16,

    #[arg(long, visible_alias = "sbp", default_value_t = 120, value_parser = clap::value_parser!(u16).range(70..=220))]
    systolic_blood_pressure: u16,

    /// Oxygen saturation (SpO2 %)
    #[arg(long, visible_alias = "spo2", default_value_t = 98, value_parser = clap::value_parser!(u8).range(70..=100))]
    oxygen_saturation: u8,

    /// Body temperature (°C, 35.0-42.0)
    #[arg(long, visible_alias = "temp", default_value_t = 37.0, value_parser = parse_temperature)]
    body_temperature: f64,

    #[arg(long, visible_alias = "pain", default_value_t = 5, value_parser = clap::value_parser!(u8).range(1..=10))]
    pain_level: u8,

    #[arg(long, visible_alias = "chronic", default_value_t = 0, value_parser = clap::value_parser!(u32).range(0..=10))]
    chronic_disease_count: u32,

    #[arg(long, visible_alias = "prev-er", default_value_t = 0, value_parser = clap::value_parser!(u32).range(0..=20))]
    previous_er_visits: u32,
}

fn parse_temperature(s: &str) -> Result<f64, String> {
    let t: f64 = s.parse().map_err(|_| format!("'{s}' is not a number"))?;
    if (35.0..=42.0).contains(&t) {
        Ok(t)
    } else {
        Err(format!("{t} is not in 35.0..=42.0"))
    }
}

impl IntakeArgs {
    fn record(&self) -> Result<PatientRecord, TriageError> {
        if let Some(path) = &self.input {
            let text = read_input(path).map_err(|e| TriageError::InvalidField {
                field: "input".into(),
                reason: format!("cannot read {}: {e}", path.display()),
            })?;
            return PatientRecord::from_json_str(&text);
        }
        let record = PatientRecord {
            age: f64::from(self.age),
            heart_rate: f64::from(self.heart_rate),
            systolic_blood_pressure: f64::from(self.systolic_blood_pressure),
            oxygen_saturation: f64::from(self.oxygen_saturation),
            body_temperature: self.body_temperature,
            pain_level: self.pain_level,
            chronic_disease_count: self.chronic_disease_count,
            previous_er_visits: self.previous_er_visits,
            arrival_mode: self.arrival_mode.clone(),
        };
        record.validate()?;
        Ok(record)
    }
}

fn read_input(path: &Path) -> io::Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        fs::read_to_string(path)
    }
}

#[derive(Debug, Serialize)]
struct Assessment<'a> {
    record: &'a PatientRecord,
    decision: &'a TriageDecision,
    explanation: Option<&'a ExplanationReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    explanation_error: Option<String>,
}

/// Text layout of the result card: level, source, department, explanation, note.
fn render_assessment(
    decision: &TriageDecision,
    explanation: &Result<ExplanationReport, TriageError>,
) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "LEVEL {} ({})\n",
        decision.triage_level,
        decision.triage_level.color()
    ));
    out.push_str(&format!("Source: {}\n", decision.source));
    out.push_str(&format!("Recommended Department: {}\n", decision.department));
    match explanation {
        Ok(report) => {
            out.push('\n');
            out.push_str(&report.render());
            if report.overrides_model() {
                out.push_str(&format!(
                    "(model alone predicted Level {})\n",
                    report.model_level
                ));
            }
        }
        Err(e) => out.push_str(&format!("\nExplanation unavailable: {e}\n")),
    }
    if let Some(reason) = &decision.reason {
        out.push_str(&format!("\nNote: {reason}\n"));
    }
    out
}

fn exit_code(err: &TriageError) -> i32 {
    match err {
        TriageError::ArtifactLoad { .. }
        | TriageError::InvalidArtifact(_)
        | TriageError::Config(_) => 2,
        _ => 1,
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn load(config: &TriageConfig) -> Result<TriageArtifacts, i32> {
    TriageArtifacts::load(&config.artifacts).map_err(|e| {
        eprintln!("error: {e}");
        exit_code(&e)
    })
}

fn run_assess(config: &TriageConfig, args: &AssessArgs) -> i32 {
    let artifacts = match load(config) {
        Ok(a) => a,
        Err(rc) => return rc,
    };
    let record = match args.intake.record() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return exit_code(&e);
        }
    };

    let decision = match artifacts.decision_engine().process(&record) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("error: {e}");
            return exit_code(&e);
        }
    };
    // An explanation failure never hides the decision.
    let explanation = artifacts
        .explanation_generator(config.explanation.layout)
        .explain_for(&record, &decision, config.explanation.target);
    if let Err(e) = &explanation {
        log::warn!("explanation step failed: {e}");
    }

    if args.json {
        let out = Assessment {
            record: &record,
            decision: &decision,
            explanation: explanation.as_ref().ok(),
            explanation_error: explanation.as_ref().err().map(ToString::to_string),
        };
        match serde_json::to_string_pretty(&out) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("error: failed to serialize JSON: {e}");
                return 2;
            }
        }
    } else {
        print!("{}", render_assessment(&decision, &explanation));
    }
    0
}

fn run_explain(config: &TriageConfig, args: &ExplainArgs) -> i32 {
    let artifacts = match load(config) {
        Ok(a) => a,
        Err(rc) => return rc,
    };
    let report = args.intake.record().and_then(|record| {
        artifacts
            .explanation_generator(config.explanation.layout)
            .explain(&record)
    });
    match report {
        Ok(report) if args.json => match serde_json::to_string_pretty(&report) {
            Ok(json) => {
                println!("{json}");
                0
            }
            Err(e) => {
                eprintln!("error: failed to serialize JSON: {e}");
                2
            }
        },
        Ok(report) => {
            print!("{report}");
            0
        }
        Err(e) => {
            eprintln!("error: {e}");
            exit_code(&e)
        }
    }
}

fn run_cli() -> i32 {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match TriageConfig::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return 2;
        }
    };

    match cli.command {
        Command::Assess(args) => run_assess(&config, &args),
        Command::Explain(args) => run_explain(&config, &args),
        Command::Config => match config.to_toml() {
            Ok(text) => {
                print!("{text}");
                0
            }
            Err(e) => {
                eprintln!("error: {e}");
                2
            }
        },
    }
}

fn main() {
    std::process::exit(run_cli());
}
