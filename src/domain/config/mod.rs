//! Configuration value objects

mod app_config;

pub use app_config::{
    AppConfig, BackendKind, FfmpegConfig, DEFAULT_FFMPEG_INPUT_DEVICE, DEFAULT_FFMPEG_INPUT_FORMAT,
};
