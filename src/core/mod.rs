pub mod audio;
pub mod eval;
