use anyhow::Result;

use super::print_specimen_rows;
use crate::service::TrackingService;

pub struct ListCommand;

impl ListCommand {
    pub async fn execute(&self, service: &TrackingService) -> Result<()> {
        let specimens = service.list().await?;
        print_specimen_rows(&specimens);
        Ok(())
    }
}

pub struct SearchCommand {
    pub query: String,
}

impl SearchCommand {
    pub fn new(query: String) -> Self {
        Self { query }
    }

    pub async fn execute(&self, service: &TrackingService) -> Result<()> {
        let specimens = service.search(&self.query).await?;
        if !self.query.trim().is_empty() {
            println!("🔍 Results for '{}':", self.query.trim());
        }
        print_specimen_rows(&specimens);
        Ok(())
    }
}
