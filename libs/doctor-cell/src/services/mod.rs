pub mod clinic;
pub mod doctor;

pub use clinic::ClinicService;
pub use doctor::DoctorService;
