mod settings;

pub use settings::{
    expand_home, CaptureSettings, Command, Config, ModelArgs, MonitorArgs, MonitorSettings,
    ParseArgs, Settings, VisionSettings,
};
