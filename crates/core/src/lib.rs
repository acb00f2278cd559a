pub mod command;
pub mod config;
pub mod jobs;
pub mod maintenance;
pub mod runtime;
pub mod schedule;
pub mod screen;
pub mod session;
pub mod testing;

pub use command::{
    command_channel, CommandError, CommandQueue, CommandSender, UdpCommandReceiver,
    UdpCommandSender,
};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, ScreensConfig,
    UdpConfig, DEFAULT_UDP_PORT,
};
pub use jobs::{
    HttpConnectivity, HttpJobServer, JobPipeline, PipelineConfig, PipelineError, ProcessUi,
    SubmissionOutcome,
};
pub use maintenance::{
    HealthProbe, HttpHealthProbe, MaintenanceMode, MaintenanceMonitor, MaintenanceTrigger,
    MonitorConfig, ProbeOutcome,
};
pub use runtime::{HoursRule, KioskRuntime, RuntimeConfig};
pub use schedule::{OperatingHours, OperatingHoursConfig};
pub use screen::{Navigator, Screen, ScreenController, ScreenError, ScreenRegistry};
pub use session::{
    create_session_log, KioskEvent, SessionLogHandle, SessionLogSink, SessionStore, TracingSink,
};
