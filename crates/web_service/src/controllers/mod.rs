pub mod diagnosis_controller;
pub mod system_controller;
