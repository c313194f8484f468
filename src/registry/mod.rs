pub mod remote_sources;
