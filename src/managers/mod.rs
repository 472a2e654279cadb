pub mod archive;
pub mod backup;
pub mod local_retention;
pub mod logging;
pub mod remote_retention;
pub mod retention;
