use anyhow::Result;

use crate::service::TrackingService;
use crate::workflows::NotesPolicy;

pub struct StagesCommand;

impl StagesCommand {
    pub fn execute(&self, service: &TrackingService) -> Result<()> {
        println!("🗂️  STAGE CATALOG");
        println!("────────────────");
        for (position, overview) in service.stages().iter().enumerate() {
            let definition = &overview.definition;
            let mut flags = Vec::new();
            if definition.photo_required {
                flags.push("📷 photo");
            }
            match definition.notes_policy {
                NotesPolicy::Mandatory => flags.push("📝 notes required"),
                NotesPolicy::Recommended => flags.push("📝 notes recommended"),
                NotesPolicy::Optional => {}
            }
            let roles: Vec<&str> = overview.allowed_roles.iter().map(|r| r.as_str()).collect();

            println!(
                "{:>2}. {:<30} [{}] {}",
                position + 1,
                definition.label,
                roles.join(", "),
                flags.join(" ")
            );
        }
        Ok(())
    }
}
