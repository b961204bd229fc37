mod settings;

pub use settings::{
    DatabaseConfig, FcmConfig, OtelConfig, SchedulerConfig, ServerConfig, Settings,
};
