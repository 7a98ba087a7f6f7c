pub mod analyzer;
pub mod controller;
pub mod extraction;
pub mod speech;
pub mod validation;
