use anyhow::Result;

use crate::service::TrackingService;
use crate::specimens::{Actor, NewSpecimen};

pub struct RegisterCommand {
    pub actor: Actor,
    pub input: NewSpecimen,
}

impl RegisterCommand {
    pub fn new(actor: Actor, input: NewSpecimen) -> Self {
        Self { actor, input }
    }

    pub async fn execute(&self, service: &TrackingService) -> Result<()> {
        let registration = service.register(self.input.clone(), &self.actor).await?;
        let specimen = &registration.specimen;

        println!("✅ Specimen registered");
        println!("   🏷️  Accession: {}", specimen.accession_number);
        println!("   🆔 Id: {}", specimen.id);
        println!("   👤 Patient: {} ({})", specimen.patient_name, specimen.patient_id);
        println!("   🧪 Type: {}", specimen.specimen_type);
        println!("   ⚡ Priority: {}", specimen.priority);
        if let Some(hours) = specimen.priority.turnaround_hours() {
            println!("   ⏱️  Target turnaround: {hours}h");
        }
        Ok(())
    }
}
