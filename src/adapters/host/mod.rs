pub mod recording_host;

pub use recording_host::RecordingScanHost;
