use crate::specimens::Specimen;

pub mod advance;
pub mod init_config;
pub mod register;
pub mod serve;
pub mod show;
pub mod specimens;
pub mod stages;

pub use advance::AdvanceCommand;
pub use init_config::InitConfigCommand;
pub use register::RegisterCommand;
pub use serve::ServeCommand;
pub use show::ShowCommand;
pub use specimens::{ListCommand, SearchCommand};
pub use stages::StagesCommand;

pub fn show_usage() {
    println!("🔬 HistoPath Tracker - Specimen Stage Tracking");
    println!();
    println!("To get started:");
    println!("  🚀 histopath-tracker serve      # Run the HTTP API");
    println!("  🧾 histopath-tracker register   # Register a specimen at reception");
    println!("  📋 histopath-tracker list       # Specimens, newest first");
    println!("  ➡️  histopath-tracker advance    # Move a specimen to its next stage");
    println!();
    println!("Reference:");
    println!("  🗂️  histopath-tracker stages     # Stage catalog and permitted roles");
    println!("  ⚙️  histopath-tracker init-config # Write a configuration file");
}

/// One line per specimen, used by list and search
pub(crate) fn print_specimen_rows(specimens: &[Specimen]) {
    if specimens.is_empty() {
        println!("📋 No specimens found");
        return;
    }
    for specimen in specimens {
        println!(
            "{}  {:<8} {:<30} {:<14} {}",
            specimen.accession_number,
            specimen.priority.to_string(),
            specimen.current_stage.label(),
            specimen.patient_id,
            specimen.patient_name
        );
    }
    println!();
    println!("{} specimen(s)", specimens.len());
}
