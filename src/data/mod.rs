pub mod graph;
pub mod init;
pub mod structures;
