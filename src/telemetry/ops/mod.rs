pub mod init;
pub mod shiur;
pub mod stats;
pub mod sync;
pub mod videos;
