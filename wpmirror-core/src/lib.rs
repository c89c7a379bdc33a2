mod client;

pub use client::{CpanelClient, CpanelError, CpanelOptions, ErrorClass};
pub use reqwest::StatusCode;
