//! Shared builders for the integration tests
#![allow(dead_code)]

use std::sync::Arc;

use histopath_tracker::config::WorkflowConfig;
use histopath_tracker::specimens::RandomAccessionSource;
use histopath_tracker::{
    Actor, InMemoryStore, NewSpecimen, Priority, Role, Specimen, TrackingService, TrackingStore,
    TransitionPolicy,
};

pub fn intake(patient_name: &str, patient_id: &str, priority: Priority) -> NewSpecimen {
    NewSpecimen {
        patient_name: patient_name.to_string(),
        patient_id: patient_id.to_string(),
        age: Some(54),
        sex: Some("M".to_string()),
        specimen_type: "Biopsy".to_string(),
        clinical_notes: None,
        referring_doctor: None,
        priority,
    }
}

pub fn john_doe() -> NewSpecimen {
    intake("John Doe", "LAU123456", Priority::Stat)
}

pub fn actor(role: Role) -> Actor {
    Actor::new(format!("{}-1", role.as_str()), role)
}

pub fn service_over(
    store: Arc<dyn TrackingStore>,
    policy: TransitionPolicy,
    require_photo_evidence: bool,
) -> TrackingService {
    TrackingService::new(
        store,
        Arc::new(RandomAccessionSource::with_seed(7)),
        10,
        &WorkflowConfig {
            transition_policy: policy,
            require_photo_evidence,
        },
    )
}

pub fn memory_service(policy: TransitionPolicy) -> TrackingService {
    service_over(Arc::new(InMemoryStore::new()), policy, false)
}

pub async fn register(service: &TrackingService, input: NewSpecimen) -> Specimen {
    service
        .register(input, &actor(Role::Receptionist))
        .await
        .expect("registration should succeed")
        .specimen
}
