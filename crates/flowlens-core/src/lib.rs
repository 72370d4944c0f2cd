pub mod config;

pub use config::{
    ExporterConfig, FlowlensConfig, LogConfig, LogFormat, ServerConfig, StoreConfig, XcomParam,
};
