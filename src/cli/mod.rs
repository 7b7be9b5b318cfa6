use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::priority::Priority;
use crate::specimens::Actor;
use crate::workflows::{Role, Stage};

pub mod commands;

#[derive(Parser)]
#[command(name = "histopath-tracker")]
#[command(about = "Histopathology specimen tracking: registration, stage transitions and audit trail")]
#[command(long_about = "HistoPath Tracker follows each tissue specimen from reception to report \
                       dispatch. Every stage change is checked against the staff role matrix and \
                       recorded in an append-only ledger. Start the API with 'histopath-tracker serve'.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Identity the command acts as
#[derive(Args, Debug, Clone)]
pub struct ActorArgs {
    /// Staff identifier recorded in the ledger
    #[arg(long)]
    pub actor_id: String,
    /// Staff role, e.g. receptionist, lab_technician, pathologist
    #[arg(long)]
    pub actor_role: Role,
}

impl ActorArgs {
    pub fn actor(&self) -> Actor {
        Actor::new(self.actor_id.clone(), self.actor_role)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API until SIGINT/SIGTERM
    Serve {
        /// Listen address, overrides server.bind
        #[arg(long, help = "Address to listen on, e.g. 127.0.0.1:5000")]
        bind: Option<String>,
    },
    /// Register a new specimen at reception
    Register {
        #[command(flatten)]
        actor: ActorArgs,
        #[arg(long)]
        patient_name: String,
        #[arg(long)]
        patient_id: String,
        #[arg(long)]
        age: Option<u16>,
        #[arg(long)]
        sex: Option<String>,
        /// e.g. Biopsy, Excision, Cytology
        #[arg(long)]
        specimen_type: String,
        #[arg(long)]
        clinical_notes: Option<String>,
        #[arg(long)]
        referring_doctor: Option<String>,
        #[arg(long, default_value = "routine", help = "routine, urgent or stat")]
        priority: Priority,
    },
    /// List specimens, newest first
    List,
    /// Show a specimen with its timeline and ledger
    Show {
        /// Specimen UUID or accession number
        reference: String,
    },
    /// Move a specimen to another stage
    Advance {
        /// Specimen UUID or accession number
        reference: String,
        #[arg(long)]
        stage: Stage,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long, help = "Evidence token for photo-required stages")]
        photo_reference: Option<String>,
        #[command(flatten)]
        actor: ActorArgs,
    },
    /// Search by accession number, patient name or patient id
    Search {
        #[arg(default_value = "")]
        query: String,
    },
    /// Print the stage catalog and who may enter each stage
    Stages,
    /// Write the current configuration as TOML
    InitConfig {
        #[arg(long, default_value = "histopath-tracker.toml")]
        path: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
