//! resume-site CLI — drives the resume site checks and maps results to exit codes.

pub mod commands;
pub mod config;

pub use config::{resolve_visual_config, resolve_visual_dir, VisualOverrides};

/// Exit status for an error returned by any command.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<resume_site::SiteError>()
        .map(resume_site::SiteError::exit_code)
        .unwrap_or(resume_site::exit_codes::GENERIC_FAILURE)
}
