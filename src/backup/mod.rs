pub mod minecraft;
pub mod transfer;
