use anyhow::Result;

use crate::service::TrackingService;
use crate::workflows::StageStatus;

pub struct ShowCommand {
    pub reference: String,
}

impl ShowCommand {
    pub fn new(reference: String) -> Self {
        Self { reference }
    }

    pub async fn execute(&self, service: &TrackingService) -> Result<()> {
        let specimen = service.resolve(&self.reference).await?;
        let detail = service.detail(specimen.id).await?;
        let specimen = &detail.specimen;

        println!("🔬 {} - {}", specimen.accession_number, specimen.patient_name);
        println!("   Patient id: {}", specimen.patient_id);
        if let Some(age) = specimen.age {
            println!("   Age: {age}");
        }
        if let Some(sex) = &specimen.sex {
            println!("   Sex: {sex}");
        }
        println!("   Type: {}", specimen.specimen_type);
        println!("   Priority: {}", specimen.priority);
        if let Some(doctor) = &specimen.referring_doctor {
            println!("   Referring doctor: {doctor}");
        }
        if let Some(notes) = &specimen.clinical_notes {
            println!("   Clinical notes: {notes}");
        }
        println!("   Registered: {} by {}", specimen.created_at, specimen.registered_by);
        println!();

        println!("📍 TIMELINE:");
        for row in &detail.timeline {
            let marker = match row.status {
                StageStatus::Completed => "✅",
                StageStatus::InProgress => "🔄",
                StageStatus::Pending => "⬜",
            };
            match &row.entry {
                Some(entry) => println!(
                    "   {marker} {:<30} {} by {} ({})",
                    row.label,
                    entry.timestamp.format("%Y-%m-%d %H:%M"),
                    entry.performed_by,
                    entry.performed_by_role.label()
                ),
                None if row.status == StageStatus::Completed => {
                    println!("   {marker} {:<30} not recorded", row.label)
                }
                None => println!("   {marker} {}", row.label),
            }
        }
        println!();

        println!("📜 LEDGER ({} entries):", detail.ledger.len());
        for entry in &detail.ledger {
            println!(
                "   #{} {} {} by {}{}",
                entry.id,
                entry.timestamp.to_rfc3339(),
                entry.stage,
                entry.performed_by,
                entry
                    .notes
                    .as_deref()
                    .map(|notes| format!(" - {notes}"))
                    .unwrap_or_default()
            );
        }
        Ok(())
    }
}
