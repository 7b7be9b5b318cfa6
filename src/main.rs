use anyhow::Result;
use clap::Parser;

use histopath_tracker::cli::commands::{
    show_usage, AdvanceCommand, InitConfigCommand, ListCommand, RegisterCommand, SearchCommand,
    ServeCommand, ShowCommand, StagesCommand,
};
use histopath_tracker::cli::{Cli, Commands};
use histopath_tracker::specimens::NewSpecimen;
use histopath_tracker::{config, init_telemetry, TrackingService};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        show_usage();
        return Ok(());
    };

    let config = config()?;
    init_telemetry(&config.observability)?;

    match command {
        Commands::Serve { bind } => {
            let service = TrackingService::open(config).await?;
            ServeCommand::new(config).with_bind(bind).execute(service).await
        }
        Commands::InitConfig { path, force } => InitConfigCommand::new(path, force).execute(config),
        Commands::Stages => StagesCommand.execute(&TrackingService::in_memory()),
        Commands::Register {
            actor,
            patient_name,
            patient_id,
            age,
            sex,
            specimen_type,
            clinical_notes,
            referring_doctor,
            priority,
        } => {
            let input = NewSpecimen {
                patient_name,
                patient_id,
                age,
                sex,
                specimen_type,
                clinical_notes,
                referring_doctor,
                priority,
            };
            let service = TrackingService::open(config).await?;
            RegisterCommand::new(actor.actor(), input)
                .execute(&service)
                .await
        }
        Commands::List => {
            let service = TrackingService::open(config).await?;
            ListCommand.execute(&service).await
        }
        Commands::Show { reference } => {
            let service = TrackingService::open(config).await?;
            ShowCommand::new(reference).execute(&service).await
        }
        Commands::Search { query } => {
            let service = TrackingService::open(config).await?;
            SearchCommand::new(query).execute(&service).await
        }
        Commands::Advance {
            reference,
            stage,
            notes,
            photo_reference,
            actor,
        } => {
            let service = TrackingService::open(config).await?;
            AdvanceCommand {
                reference,
                stage,
                notes,
                photo_reference,
                actor: actor.actor(),
            }
            .execute(&service)
            .await
        }
    }
}
