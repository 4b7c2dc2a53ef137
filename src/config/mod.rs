mod settings;

pub use settings::{
    ApiConfig, LogConfig, OtelConfig, ServerConfig, Settings, ShutdownSettings, WebSocketConfig,
};
