use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One fixed step of the laboratory pipeline, in catalog order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Reception,
    Grossing,
    Processing,
    Embedding,
    Sectioning,
    Staining,
    SlideLabeling,
    SlideDispatch,
    Reporting,
    #[serde(alias = "typing")]
    Verification,
    #[serde(alias = "dispatch")]
    ReportDispatch,
}

/// How strongly a stage asks for free-text notes on entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotesPolicy {
    /// Transition is rejected without notes
    Mandatory,
    /// Caller should confirm before proceeding without notes
    Recommended,
    Optional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageDefinition {
    pub stage: Stage,
    pub label: &'static str,
    pub photo_required: bool,
    pub notes_policy: NotesPolicy,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown stage '{0}'")]
pub struct UnknownStage(pub String);

impl Stage {
    /// All stages in pipeline order.
    pub const ALL: [Stage; 11] = [
        Stage::Reception,
        Stage::Grossing,
        Stage::Processing,
        Stage::Embedding,
        Stage::Sectioning,
        Stage::Staining,
        Stage::SlideLabeling,
        Stage::SlideDispatch,
        Stage::Reporting,
        Stage::Verification,
        Stage::ReportDispatch,
    ];

    /// Zero-based position in the catalog
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Reception => "reception",
            Stage::Grossing => "grossing",
            Stage::Processing => "processing",
            Stage::Embedding => "embedding",
            Stage::Sectioning => "sectioning",
            Stage::Staining => "staining",
            Stage::SlideLabeling => "slide_labeling",
            Stage::SlideDispatch => "slide_dispatch",
            Stage::Reporting => "reporting",
            Stage::Verification => "verification",
            Stage::ReportDispatch => "report_dispatch",
        }
    }

    pub fn definition(self) -> StageDefinition {
        let (label, photo_required, notes_policy) = match self {
            Stage::Reception => ("Reception/Registration", false, NotesPolicy::Optional),
            Stage::Grossing => ("Grossing/Tissue Selection", true, NotesPolicy::Recommended),
            Stage::Processing => ("Tissue Processing", false, NotesPolicy::Optional),
            Stage::Embedding => ("Embedding", false, NotesPolicy::Optional),
            Stage::Sectioning => ("Sectioning/Microtomy", false, NotesPolicy::Optional),
            Stage::Staining => ("Staining", false, NotesPolicy::Optional),
            Stage::SlideLabeling => ("Slide Labeling", true, NotesPolicy::Optional),
            Stage::SlideDispatch => ("Slide Dispatch to Pathologist", false, NotesPolicy::Optional),
            Stage::Reporting => ("Reporting", false, NotesPolicy::Mandatory),
            Stage::Verification => ("Typing/Verification", false, NotesPolicy::Optional),
            Stage::ReportDispatch => ("Report Dispatch/Collection", false, NotesPolicy::Optional),
        };

        StageDefinition {
            stage: self,
            label,
            photo_required,
            notes_policy,
        }
    }

    pub fn label(self) -> &'static str {
        self.definition().label
    }

    pub fn photo_required(self) -> bool {
        self.definition().photo_required
    }

    pub fn notes_policy(self) -> NotesPolicy {
        self.definition().notes_policy
    }

    /// The stage immediately after this one, if any
    pub fn successor(self) -> Option<Stage> {
        Stage::ALL.get(self.index() + 1).copied()
    }

    pub fn predecessor(self) -> Option<Stage> {
        self.index().checked_sub(1).map(|i| Stage::ALL[i])
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = UnknownStage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "typing" => return Ok(Stage::Verification),
            "dispatch" => return Ok(Stage::ReportDispatch),
            _ => {}
        }
        Stage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == normalized)
            .ok_or_else(|| UnknownStage(s.to_string()))
    }
}

/// The full ordered stage catalog
pub fn catalog() -> Vec<StageDefinition> {
    Stage::ALL.iter().map(|stage| stage.definition()).collect()
}
