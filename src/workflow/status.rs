use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    Pending,
    InProgress,
    AwaitingApproval,
    Approved,
    AutoProcessing,
    Completed,
    Cancelled,
}

impl InstanceStatus {
    pub const ALL: [InstanceStatus; 7] = [
        InstanceStatus::Pending,
        InstanceStatus::InProgress,
        InstanceStatus::AwaitingApproval,
        InstanceStatus::Approved,
        InstanceStatus::AutoProcessing,
        InstanceStatus::Completed,
        InstanceStatus::Cancelled,
    ];

    /// Step-progression edges. Administrative overrides (`cancel`, `complete`)
    /// only require a non-terminal source and are not checked against this table.
    pub fn can_transition_to(self, next: Self) -> bool {
        use InstanceStatus::*;
        matches!(
            (self, next),
            (Pending | InProgress | Approved, InProgress)
                | (Pending | InProgress | Approved, AwaitingApproval)
                | (Pending | InProgress | Approved, AutoProcessing)
                | (Pending | InProgress | Approved, Completed)
                | (Pending | InProgress | Approved, Cancelled)
                | (AwaitingApproval, Approved)
                | (AwaitingApproval, Cancelled)
                | (AutoProcessing, AutoProcessing)
                | (AutoProcessing, InProgress)
                | (AutoProcessing, AwaitingApproval)
                | (AutoProcessing, Completed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, InstanceStatus::Completed | InstanceStatus::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            InstanceStatus::Pending => "pending",
            InstanceStatus::InProgress => "in_progress",
            InstanceStatus::AwaitingApproval => "awaiting_approval",
            InstanceStatus::Approved => "approved",
            InstanceStatus::AutoProcessing => "auto_processing",
            InstanceStatus::Completed => "completed",
            InstanceStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstanceStatus {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == raw)
            .ok_or_else(|| format!("unknown instance status `{raw}`"))
    }
}
