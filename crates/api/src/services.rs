/// Reads of individual appointments and per-party lists
pub mod appointments;
/// Weekly template edits
pub mod availability;
/// Reservation of slots
pub mod booking;
/// Status transitions and the expiry sweep
pub mod lifecycle;
/// Outbound messages to patients and doctors
pub mod notifier;
/// Payment capture hand-off on acceptance
pub mod payment;
/// Slot listing and validation
pub mod slots;
