use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clinic_records_core::{
    ClinicConfig, Identity, MatchPolicy, PatientDocument, PatientRecord, PatientStore,
    PatientSummary, RecordId,
};

#[derive(Parser, Debug)]
#[command(name = "clinic")]
#[command(about = "Clinic patient records")]
struct Cli {
    /// Database file (overrides CLINIC_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Root directory for patient folders (overrides CLINIC_FOLDER_ROOT)
    #[arg(long, global = true)]
    folder_root: Option<PathBuf>,

    /// Directory for exported documents (overrides CLINIC_EXPORT_DIR)
    #[arg(long, global = true)]
    export_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the database if it does not exist
    Init,
    /// Add a new patient record
    Add(RecordArgs),
    /// Save by name: replace the patient with the same name or add a new one
    Save(RecordArgs),
    /// Replace every field of an existing patient
    Update {
        /// Patient id
        id: i64,
        #[command(flatten)]
        record: RecordArgs,
    },
    /// Delete a patient
    Delete {
        #[command(flatten)]
        target: TargetArgs,
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
    /// List all patients
    List,
    /// Search patients by name
    Search {
        /// Text to look for in patient names
        query: String,
        /// Match only at the start of the name
        #[arg(long)]
        prefix: bool,
    },
    /// Show every field of a patient
    Show(TargetArgs),
    /// Export a patient's details document
    Export {
        #[command(flatten)]
        target: TargetArgs,
        /// Output file (default: patient_<name>.pdf in the export directory)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Create the patient's folder under the folder root
    Folder(TargetArgs),
}

#[derive(Args, Debug)]
struct RecordArgs {
    /// Patient name
    name: String,
    /// Visit date
    date: String,
    #[arg(long)]
    complaint: Option<String>,
    #[arg(long)]
    diagnosis: Option<String>,
    #[arg(long)]
    treatment: Option<String>,
    #[arg(long)]
    next_visit: Option<String>,
}

impl From<RecordArgs> for PatientRecord {
    fn from(args: RecordArgs) -> Self {
        PatientRecord {
            name: args.name,
            date: args.date,
            complaint: args.complaint,
            diagnosis: args.diagnosis,
            treatment: args.treatment,
            next_visit: args.next_visit,
        }
    }
}

#[derive(Args, Debug)]
struct TargetArgs {
    /// Patient id
    #[arg(required_unless_present = "name", conflicts_with = "name")]
    id: Option<i64>,
    /// Exact patient name, when it is unique
    #[arg(long)]
    name: Option<String>,
}

impl TargetArgs {
    fn identity(&self) -> Identity {
        match (&self.id, &self.name) {
            (Some(id), _) => Identity::Id(RecordId(*id)),
            (None, Some(name)) => Identity::Name(name.clone()),
            // clap rejects a missing target before we get here
            (None, None) => Identity::Name(String::new()),
        }
    }
}

fn config_from(cli: &Cli) -> ClinicConfig {
    let mut config = ClinicConfig::from_env();
    if let Some(db) = &cli.db {
        config = config.with_database_path(db);
    }
    if let Some(root) = &cli.folder_root {
        config = config.with_folder_root(root);
    }
    if let Some(dir) = &cli.export_dir {
        config = config.with_export_dir(dir);
    }
    config
}

fn print_summaries(summaries: &[PatientSummary]) {
    if summaries.is_empty() {
        println!("No patients found.");
        return;
    }
    for summary in summaries {
        println!("{:>6}  {:<30}  {}", summary.id.get(), summary.name, summary.date);
    }
}

fn run(command: Commands, config: &ClinicConfig, store: &PatientStore) -> anyhow::Result<()> {
    match command {
        Commands::Init => {
            println!("Database ready at {}", store.path().display());
        }
        Commands::Add(record) => {
            let id = store.create(record.into()).context("Failed to add patient")?;
            println!("Added patient {}", id);
        }
        Commands::Save(record) => {
            let id = store.upsert(record.into()).context("Failed to save patient")?;
            println!("Saved patient {}", id);
        }
        Commands::Update { id, record } => {
            store
                .update(&Identity::Id(RecordId(id)), record.into())
                .context("Failed to update patient")?;
            println!("Updated patient {}", id);
        }
        Commands::Delete { target, yes } => {
            let identity = target.identity();
            if !yes {
                bail!("Refusing to delete patient with {} without --yes", identity);
            }
            store.delete(&identity).context("Failed to delete patient")?;
            println!("Deleted patient with {}", identity);
        }
        Commands::List => {
            print_summaries(&store.list_all().context("Failed to list patients")?);
        }
        Commands::Search { query, prefix } => {
            let policy = if prefix {
                MatchPolicy::Prefix
            } else {
                MatchPolicy::Substring
            };
            let results = store
                .clone()
                .with_match_policy(policy)
                .search(&query)
                .context("Failed to search patients")?;
            print_summaries(&results);
        }
        Commands::Show(target) => {
            let patient = store
                .find_by_identity(&target.identity())
                .context("Failed to load patient")?;
            println!("ID: {}", patient.id);
            print!("{}", PatientDocument::from_record(&patient.record).to_text());
        }
        Commands::Export { target, out } => {
            let patient = store
                .find_by_identity(&target.identity())
                .context("Failed to load patient")?;
            let document = PatientDocument::from_record(&patient.record);
            let path = match out {
                Some(out) => document.write_to(out),
                None => document.write_into(config.export_dir()),
            }
            .context("Failed to export patient")?;
            println!("Patient details exported to {}", path.display());
        }
        Commands::Folder(target) => {
            let provisioner = config.folder_provisioner()?;
            let patient = store
                .find_by_identity(&target.identity())
                .context("Failed to load patient")?;
            let path = provisioner
                .provision(&patient.summary())
                .context("Failed to create folder")?;
            println!("Folder created at {}", path.display());
        }
    }
    Ok(())
}

/// Entry point for the clinic CLI
///
/// # Environment Variables
/// - `CLINIC_DB_PATH`: database file (default: "clinic.db")
/// - `CLINIC_FOLDER_ROOT`: root directory for patient folders (no default)
/// - `CLINIC_EXPORT_DIR`: directory for exported documents (default: ".")
/// - `RUST_LOG`: log filter (default: "clinic=info,clinic_records_core=info")
fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("clinic=info".parse()?)
                .add_directive("clinic_records_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = config_from(&cli);
    tracing::debug!(?config, "configuration loaded");

    let store = config.store();
    store
        .initialize()
        .with_context(|| format!("Cannot open {}", config.database_path.display()))?;

    run(cli.command, &config, &store)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("clinic").chain(args.iter().copied()))
    }

    fn temp_config(dir: &tempfile::TempDir) -> ClinicConfig {
        ClinicConfig::default()
            .with_database_path(dir.path().join("clinic.db"))
            .with_folder_root(dir.path().join("folders"))
            .with_export_dir(dir.path())
    }

    #[test]
    fn test_parse_add() {
        let cli = parse(&["add", "Ali Khan", "23/03/2025", "--diagnosis", "Flu"]).unwrap();
        let Commands::Add(record) = cli.command else {
            panic!("expected add");
        };
        let record: PatientRecord = record.into();
        assert_eq!(record.name, "Ali Khan");
        assert_eq!(record.diagnosis, Some("Flu".into()));
        assert_eq!(record.complaint, None);
    }

    #[test]
    fn test_parse_requires_target() {
        assert!(parse(&["show"]).is_err());
        assert!(parse(&["show", "3", "--name", "Ali"]).is_err());

        let cli = parse(&["show", "--name", "Ali"]).unwrap();
        let Commands::Show(target) = cli.command else {
            panic!("expected show");
        };
        assert_eq!(target.identity(), Identity::Name("Ali".into()));
    }

    #[test]
    fn test_global_flags_override_config() {
        let cli = parse(&["list", "--db", "other.db", "--folder-root", "/tmp/f"]).unwrap();
        let config = config_from(&cli);
        assert_eq!(config.database_path, PathBuf::from("other.db"));
        assert_eq!(config.folder_root, Some(PathBuf::from("/tmp/f")));
    }

    #[test]
    fn test_delete_requires_confirmation() {
        let dir = tempfile::tempdir().unwrap();
        let config = temp_config(&dir);
        let store = config.store();
        store.initialize().unwrap();
        let id = store.create(PatientRecord::new("Ali", "1")).unwrap();

        let cli = parse(&["delete", &id.to_string()]).unwrap();
        assert!(run(cli.command, &config, &store).is_err());
        assert_eq!(store.count().unwrap(), 1);

        let cli = parse(&["delete", &id.to_string(), "--yes"]).unwrap();
        run(cli.command, &config, &store).unwrap();
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_export_and_folder_commands() {
        let dir = tempfile::tempdir().unwrap();
        let config = temp_config(&dir);
        let store = config.store();
        store.initialize().unwrap();
        let id = store
            .create(PatientRecord::new("Ahmad Ali", "23/03/2025"))
            .unwrap();

        let cli = parse(&["export", &id.to_string()]).unwrap();
        run(cli.command, &config, &store).unwrap();
        let exported = std::fs::read(dir.path().join("patient_Ahmad_Ali.pdf")).unwrap();
        assert!(exported.starts_with(b"%PDF"));

        let cli = parse(&["folder", "--name", "Ahmad Ali"]).unwrap();
        run(cli.command, &config, &store).unwrap();
        assert!(dir.path().join("folders").join("Ahmad_Ali_23032025").is_dir());
    }

    #[test]
    fn test_invalid_add_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = temp_config(&dir);
        let store = config.store();
        store.initialize().unwrap();

        let cli = parse(&["add", "", "23/03/2025"]).unwrap();
        assert!(run(cli.command, &config, &store).is_err());
        assert_eq!(store.count().unwrap(), 0);
    }
}
