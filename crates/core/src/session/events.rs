use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Tag attached to every entry the kiosk emits.
pub const KIOSK_TAG: &str = "totem";

/// Severity understood by the log collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        }
    }
}

/// A single record handed to the log collaborator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub message: String,
    pub level: LogLevel,
    pub tags: Vec<String>,
    pub data: Value,
}

/// Kiosk event types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KioskEvent {
    // Process lifecycle
    ServiceStarted {
        version: String,
        config_hash: String,
    },
    ServiceStopped {
        reason: String,
    },

    /// A screen finished its enter transition.
    ScreenOpened {
        screen: String,
    },

    // Maintenance
    MaintenanceEntered {
        reason: String,
    },
    MaintenanceExited,
    MaintenanceHoldChanged {
        held: bool,
    },

    /// The kiosk's own network is down; never escalated.
    NoConnectivity {
        stage: String,
    },

    // Job pipeline
    UploadAccepted {
        request_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        position_in_queue: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        estimated_wait_seconds: Option<f64>,
    },
    JobCompleted {
        request_id: String,
        image_url: String,
    },
    JobEscalated {
        request_id: String,
        cause: String,
    },
    JobAborted {
        reason: String,
    },

    /// Raw command drained from the UDP channel.
    CommandReceived {
        command: String,
    },
}

impl KioskEvent {
    /// Short machine name of the event.
    pub fn event_type(&self) -> &'static str {
        match self {
            KioskEvent::ServiceStarted { .. } => "service_started",
            KioskEvent::ServiceStopped { .. } => "service_stopped",
            KioskEvent::ScreenOpened { .. } => "screen_opened",
            KioskEvent::MaintenanceEntered { .. } => "maintenance_entered",
            KioskEvent::MaintenanceExited => "maintenance_exited",
            KioskEvent::MaintenanceHoldChanged { .. } => "maintenance_hold_changed",
            KioskEvent::NoConnectivity { .. } => "no_connectivity",
            KioskEvent::UploadAccepted { .. } => "upload_accepted",
            KioskEvent::JobCompleted { .. } => "job_completed",
            KioskEvent::JobEscalated { .. } => "job_escalated",
            KioskEvent::JobAborted { .. } => "job_aborted",
            KioskEvent::CommandReceived { .. } => "command_received",
        }
    }

    fn level(&self) -> LogLevel {
        match self {
            KioskEvent::MaintenanceEntered { .. }
            | KioskEvent::NoConnectivity { .. }
            | KioskEvent::JobAborted { .. } => LogLevel::Warning,
            KioskEvent::JobEscalated { .. } => LogLevel::Error,
            KioskEvent::CommandReceived { .. } => LogLevel::Debug,
            _ => LogLevel::Info,
        }
    }

    /// Convert into the collaborator's record shape.
    ///
    /// Screen events keep the `TOTEM_<SCREEN>` message format the session
    /// reports are keyed on; everything else carries its payload as data.
    pub fn to_entry(&self) -> LogEntry {
        match self {
            KioskEvent::ScreenOpened { screen } => LogEntry {
                message: format!("TOTEM_{}", screen),
                level: LogLevel::Info,
                tags: vec![KIOSK_TAG.to_string()],
                data: json!({}),
            },
            KioskEvent::NoConnectivity { stage } => LogEntry {
                message: "TOTEM_NO_INTERNET".to_string(),
                level: self.level(),
                tags: vec![KIOSK_TAG.to_string(), "network".to_string()],
                data: json!({ "stage": stage }),
            },
            other => {
                let data = serde_json::to_value(other).unwrap_or(Value::Null);
                LogEntry {
                    message: format!("TOTEM_{}", other.event_type().to_uppercase()),
                    level: other.level(),
                    tags: vec![KIOSK_TAG.to_string(), other.category().to_string()],
                    data,
                }
            }
        }
    }

    fn category(&self) -> &'static str {
        match self {
            KioskEvent::ServiceStarted { .. } | KioskEvent::ServiceStopped { .. } => "service",
            KioskEvent::ScreenOpened { .. } => "screen",
            KioskEvent::MaintenanceEntered { .. }
            | KioskEvent::MaintenanceExited
            | KioskEvent::MaintenanceHoldChanged { .. } => "maintenance",
            KioskEvent::NoConnectivity { .. } => "network",
            KioskEvent::UploadAccepted { .. }
            | KioskEvent::JobCompleted { .. }
            | KioskEvent::JobEscalated { .. }
            | KioskEvent::JobAborted { .. } => "job",
            KioskEvent::CommandReceived { .. } => "command",
        }
    }
}
