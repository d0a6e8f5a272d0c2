//! Tableau Server REST API session client.
//!
//! `SessionClient` performs authenticated request/response exchanges against
//! `{server}/api/{version}/...` and the Pulse namespace `{server}/api/-/pulse/...`.
//! Sign-in returns a [`Credential`] that every other operation borrows; sign-out
//! consumes it.
//!
//! Each API area lives in its own module as an `impl SessionClient` block:
//! authentication, sites, projects, workbooks, data sources (including Hyper
//! data updates), publishing (single request and chunked upload), extension
//! settings, users, groups, permissions, views, favorites, jobs, webhooks and
//! Pulse.

mod auth;
mod client;
pub mod config;
mod datasources;
mod extensions;
mod favorites;
mod groups;
mod jobs;
mod multipart;
mod permissions;
mod projects;
mod publish;
mod pulse;
mod sites;
mod users;
mod views;
mod webhooks;
mod workbooks;
mod xml;

#[cfg(test)]
mod testing;

pub use client::{AUTH_HEADER, SessionClient};
pub use config::{ClientConfig, ConfigError, ResponseFormat};
pub use permissions::{Grant, Grantee};
pub use publish::{ContentKind, PublishRequest, UploadSession};
pub use workbooks::WorkbookUpdate;

pub use tableau_abstraction::{
    Credential, DataAction, ExtensionsServerSettings, ExtensionsSiteSettings, PermissionMode,
    RestError, SafeListEntry,
};
