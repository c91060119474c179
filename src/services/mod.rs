pub mod clipboard;
pub mod normalizer;
pub mod payload;
pub mod webhook;
pub mod wizard;
pub mod workspace;
