pub mod compare;
pub mod deal;
pub mod sensitivity;
pub mod snapshot;
