use anyhow::Result;

use crate::service::TrackingService;
use crate::specimens::Actor;
use crate::workflows::{NotesPolicy, Stage, TransitionRequest};

pub struct AdvanceCommand {
    pub reference: String,
    pub stage: Stage,
    pub notes: Option<String>,
    pub photo_reference: Option<String>,
    pub actor: Actor,
}

impl AdvanceCommand {
    pub async fn execute(&self, service: &TrackingService) -> Result<()> {
        let specimen = service.resolve(&self.reference).await?;
        let guard = service.guard();

        if guard.photo_required(self.stage) && self.photo_reference.is_none() {
            println!("📷 {} expects a specimen photo; pass --photo-reference once captured", self.stage.label());
        }
        if guard.notes_policy(self.stage) == NotesPolicy::Recommended && self.notes.is_none() {
            println!("📝 Notes are recommended for {}", self.stage.label());
        }

        let updated = service
            .update_stage(TransitionRequest {
                specimen_id: specimen.id,
                target: self.stage,
                actor: self.actor.clone(),
                notes: self.notes.clone(),
                photo_reference: self.photo_reference.clone(),
            })
            .await?;

        println!(
            "✅ {} moved from {} to {}",
            updated.accession_number,
            specimen.current_stage.label(),
            updated.current_stage.label()
        );
        match updated.current_stage.successor() {
            Some(next) => println!("   ➡️  Next stage: {}", next.label()),
            None => println!("   🏁 Workflow complete"),
        }
        Ok(())
    }
}
