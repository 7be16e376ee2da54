// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use codomi::config::DEFAULT_CONFIG_FILE;
use codomi::{
    audit, filter_owners, reconcile, AppConfig, ApartmentFilter, ApartmentStatus, ApartmentsPage,
    Condominium, DocumentType, OwnerFilter, ReferenceData, Selection,
};

#[derive(Parser, Debug)]
#[clap(author, version, about = "Condominium administration: apartments, owners and their links")]
struct Cli {
    /// Path to the configuration file
    #[clap(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// JSON snapshot to load instead of the demo data
    #[clap(long, global = true)]
    data: Option<PathBuf>,

    /// Building id the pages start scoped to
    #[clap(long, global = true)]
    building: Option<String>,

    /// Verbose logging (-v debug, -vv trace)
    #[clap(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive admin pages (default)
    Tui,

    /// List apartments grouped by building
    Apartments {
        /// Match number, building name or owner name
        #[clap(long, short = 's', default_value = "")]
        search: String,

        /// occupied | vacant | maintenance | all
        #[clap(long, default_value = "all")]
        status: Selection<ApartmentStatus>,

        /// Print the matching records as JSON
        #[clap(long)]
        json: bool,
    },

    /// List owners
    Owners {
        /// Match name, document number or apartment number
        #[clap(long, short = 's', default_value = "")]
        search: String,

        /// cedula | rif | all
        #[clap(long, default_value = "all")]
        document_type: Selection<DocumentType>,

        #[clap(long)]
        json: bool,
    },

    /// Check apartment/owner links for inconsistencies
    Audit {
        /// Repair one-sided links and stale denormalized fields
        #[clap(long)]
        repair: bool,
    },

    /// Print the current data set as a JSON snapshot
    Snapshot,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = AppConfig::from_env(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config.display()))?;
    if let Some(data) = cli.data.clone() {
        config.data_file = Some(data);
    }
    if let Some(building) = cli.building.clone() {
        config.selected_building = Some(building);
    }

    let store = config.open_store().context("Failed to open data set")?;

    match cli.command.unwrap_or(Command::Tui) {
        Command::Tui => run_ui_mode(store, &config)?,
        Command::Apartments {
            search,
            status,
            json,
        } => {
            let building = config.selected_building.clone().into();
            let filter = ApartmentFilter {
                search_term: search,
                building,
                status,
            };
            list_apartments(&store, &config, filter, json)?;
        }
        Command::Owners {
            search,
            document_type,
            json,
        } => {
            let filter = OwnerFilter {
                search_term: search,
                building: config.selected_building.clone().into(),
                document_type,
            };
            list_owners(&store, &filter, json)?;
        }
        Command::Audit { repair } => run_audit(store, repair),
        Command::Snapshot => {
            let json = store.snapshot().to_json().context("Failed to serialize snapshot")?;
            println!("{}", json);
        }
    }

    Ok(())
}

/// Logs go to stderr; RUST_LOG wins over -v
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn list_apartments(
    store: &Condominium,
    config: &AppConfig,
    filter: ApartmentFilter,
    json: bool,
) -> Result<()> {
    let mut page = ApartmentsPage::new(config.page_context());
    page.filter = filter;

    if json {
        let visible = page.visible(store);
        println!("{}", serde_json::to_string_pretty(&visible)?);
        return Ok(());
    }

    let stats = page.stats(store);
    println!("🏢 Apartamentos");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!(
        "📊 Total: {}  Ocupados: {}  Vacantes: {}  Mantenimiento: {}",
        stats.total, stats.occupied, stats.vacant, stats.maintenance
    );

    let sections = page.sections(store);
    if sections.is_empty() {
        println!("\nNo se encontraron apartamentos con los filtros aplicados");
        return Ok(());
    }

    for (building, apartments) in sections {
        println!("\n📍 {} ({})", building, apartments.len());
        for apt in apartments {
            let owners = apt
                .owners
                .iter()
                .map(|o| o.name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            println!(
                "   {:<6} piso {:<3} {:<10} {:<14} {:>10.2}  {}",
                apt.number,
                apt.floor,
                apt.measurement_label(),
                apt.status.label(),
                apt.monthly_fee,
                if owners.is_empty() { "-" } else { owners.as_str() }
            );
        }
    }

    Ok(())
}

fn list_owners(store: &Condominium, filter: &OwnerFilter, json: bool) -> Result<()> {
    let owners = filter_owners(store.owners(), store.apartments(), filter);

    if json {
        println!("{}", serde_json::to_string_pretty(&owners)?);
        return Ok(());
    }

    println!("👤 Propietarios ({})", owners.len());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for owner in owners {
        let numbers = store
            .apartments_of(&owner.id)?
            .iter()
            .map(|a| format!("{} {}", a.building_name, a.number))
            .collect::<Vec<_>>()
            .join(", ");
        println!(
            "   {:<22} {:<18} {}",
            owner.name,
            owner.document_label(),
            if numbers.is_empty() { "-" } else { numbers.as_str() }
        );
    }

    Ok(())
}

fn run_audit(mut store: Condominium, repair: bool) {
    println!("🔍 Auditoría de vínculos apartamento ↔ propietario");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let issues = audit(&store);
    if issues.is_empty() {
        println!("✅ Sin inconsistencias");
        return;
    }

    for issue in &issues {
        println!("⚠️  {}", issue);
    }

    if repair {
        let report = reconcile(&mut store);
        println!("\n🔧 Reparados: {}", report.repaired);
        for issue in &report.remaining {
            println!("❌ Pendiente: {}", issue);
        }
    }
}

#[cfg(feature = "tui")]
fn run_ui_mode(store: Condominium, config: &AppConfig) -> Result<()> {
    println!("🖥️  Loading CODOMI admin...\n");
    println!(
        "✓ {} apartamentos, {} propietarios",
        store.apartments().len(),
        store.owners().len()
    );
    println!("Starting UI... (Press 'q' to quit)\n");

    let mut app = ui::App::new(store, config.page_context());
    ui::run_ui(&mut app)?;

    println!("\n✅ UI closed successfully");

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_store: Condominium, _config: &AppConfig) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use the API: cargo run --bin codomi-server --features server");
    std::process::exit(1);
}
