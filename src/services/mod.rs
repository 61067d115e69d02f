//! Service layer for business logic and orchestration.
//!
//! This module contains the service layer that sits between the repository
//! and the presentation layer. Services orchestrate repository calls and
//! implement the scheduling, capacity and billing rules.

pub mod attendance;

pub mod billing;

pub mod enrollment;

pub mod expander;

pub use attendance::update_attendance;
pub use billing::{
    compute_pro_rata, compute_pro_rata_with_settings, BillingError, ProRataInvoice,
};
pub use enrollment::{
    confirm_displacement, remove_enrollment, try_enroll, DisplacementProposal, EnrollOutcome,
};
pub use expander::{
    apply_template_edit, create_template, delete_template, expand_template,
    occurrences_in_window, TemplateEditSummary,
};
