use clap::{Parser, Subcommand};
use std::sync::Arc;
use triage_core::{
    facilities, first_aid, Assessment, AssessmentInput, ClassifierKind, CoreConfig, Facility,
    LogNotificationSink, MemoryRecordStore, RequestContext, TriageService, UrgencyHint,
};

#[derive(Parser)]
#[command(name = "triage")]
#[command(about = "Symptom severity triage CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a symptom description
    Assess {
        /// Free-text symptom description
        symptoms: String,
        /// Extra context appended to the description before scoring
        #[arg(long)]
        additional_info: Option<String>,
        /// Self-reported urgency (e.g. very-urgent); recorded but not scored
        #[arg(long)]
        urgency: Option<UrgencyHint>,
        /// Consult the keyword classifier regardless of TRIAGE_CLASSIFIER
        #[arg(long)]
        classifier: bool,
        /// Print the assessment as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show first-aid steps for a condition tag
    FirstAid {
        /// Condition tag, e.g. chest_pain
        condition: String,
    },
    /// List emergency hospitals, nearest first
    Hospitals {
        /// Only show the nearest hospital with an emergency room
        #[arg(long)]
        nearest: bool,
        /// Only show trauma centers
        #[arg(long, conflicts_with = "nearest")]
        trauma: bool,
    },
    /// Print the active rule table as YAML
    Rules,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("triage_core=warn".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = CoreConfig::from_env_values(
        std::env::var("TRIAGE_DATA_DIR").ok(),
        std::env::var("TRIAGE_RULES_FILE").ok(),
        std::env::var("TRIAGE_CLASSIFIER").ok(),
        std::env::var("TRIAGE_CLASSIFIER_TIMEOUT_MS").ok(),
    )?;

    match cli.command {
        Commands::Assess {
            symptoms,
            additional_info,
            urgency,
            classifier,
            json,
        } => {
            let cfg = if classifier {
                CoreConfig::new(
                    cfg.data_dir().to_path_buf(),
                    cfg.rules_file().map(|p| p.to_path_buf()),
                    ClassifierKind::Keyword,
                    cfg.classifier_timeout(),
                )?
            } else {
                cfg
            };

            let service = TriageService::new(
                cfg.build_assessor()?,
                Arc::new(MemoryRecordStore::new()),
                Arc::new(LogNotificationSink),
            );
            let input = AssessmentInput {
                symptom_text: symptoms,
                additional_info,
                urgency_hint: urgency,
            };
            let mut ctx = RequestContext::anonymous();
            let assessment = service.assess(&mut ctx, &input);
            let steps = if assessment.is_emergency {
                service.first_aid(&assessment)
            } else {
                Vec::new()
            };

            if json {
                let out = serde_json::json!({
                    "assessment": assessment,
                    "emergency_mode": ctx.emergency_mode(),
                    "first_aid": steps,
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                print_assessment(&assessment, ctx.emergency_mode(), &steps);
            }
        }
        Commands::FirstAid { condition } => {
            if !first_aid::has_specific_instructions(&condition) {
                println!("No specific steps for '{condition}'; general guidance:");
            }
            for (i, step) in first_aid::instructions_for(&condition).iter().enumerate() {
                println!("{}. {}", i + 1, step);
            }
        }
        Commands::Hospitals { nearest, trauma } => {
            let listed: Vec<&Facility> = if nearest {
                facilities::nearest_emergency_hospital().into_iter().collect()
            } else if trauma {
                facilities::trauma_centers().collect()
            } else {
                facilities::emergency_hospitals().iter().collect()
            };
            if listed.is_empty() {
                anyhow::bail!("no matching emergency hospital");
            }
            for f in listed {
                print_facility(f);
            }
        }
        Commands::Rules => {
            print!("{}", cfg.load_rules()?.render()?);
        }
    }

    Ok(())
}

fn print_assessment(assessment: &Assessment, emergency_mode: bool, steps: &[String]) {
    let rec = &assessment.recommendation;
    println!("Score: {} ({})", assessment.total_score, rec.level);
    println!("Action: {}", rec.action);
    println!("{}", rec.message);

    if !assessment.matches.is_empty() {
        println!("Matches:");
        for m in &assessment.matches {
            println!(
                "  - {} (+{}) via \"{}\"",
                m.condition_tag, m.severity_weight, m.matched_keyword
            );
        }
    }
    let conditions = assessment.condition_tags();
    if !conditions.is_empty() {
        println!("Conditions: {}", conditions.join(", "));
    }
    if let Some(hint) = assessment.urgency_hint {
        println!("Reported urgency: {}", hint.label());
    }
    if emergency_mode {
        println!("EMERGENCY MODE ACTIVE");
    }
    if !steps.is_empty() {
        println!("First aid:");
        for (i, step) in steps.iter().enumerate() {
            println!("  {}. {}", i + 1, step);
        }
    }
}

fn print_facility(f: &Facility) {
    let trauma = if f.trauma_center { ", trauma center" } else { "" };
    println!(
        "{} ({}{}) - {}, {} - wait {}",
        f.name, f.distance, trauma, f.address, f.phone, f.wait_time
    );
}
