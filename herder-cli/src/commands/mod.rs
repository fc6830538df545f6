pub mod herds;
pub mod sync;
