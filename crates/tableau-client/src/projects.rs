//! Project queries and creation.

use crate::client::{FailureKind, SessionClient, require};
use crate::xml::XmlElement;
use reqwest::Method;
use tableau_abstraction::{Credential, Project, RestError};
use tracing::debug;

impl SessionClient {
    /// Lists the projects on a site.
    ///
    /// # Errors
    /// Returns `RestError::NotFound` if the response carries no projects
    /// section. An empty `<projects/>` element is an empty list, not an error.
    pub async fn query_projects(
        &self,
        credential: &Credential,
        site_id: &str,
    ) -> Result<Vec<Project>, RestError> {
        let url = self.api_url(&format!("sites/{site_id}/projects"));
        let request = self.request(Method::GET, &url, Some(&credential.token));
        let response = self.send_envelope(request, "query projects", FailureKind::General).await?;
        let projects = require(response.projects, "projects", "query projects")?.items;

        debug!(site_id = %site_id, count = projects.len(), "Queried projects");
        Ok(projects)
    }

    /// Finds a project by name, ignoring case.
    ///
    /// # Errors
    /// Returns `RestError::NotFound` if no project has that name.
    pub async fn find_project_by_name(
        &self,
        credential: &Credential,
        site_id: &str,
        name: &str,
    ) -> Result<Project, RestError> {
        self.query_projects(credential, site_id)
            .await?
            .into_iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| RestError::NotFound(format!("No project named '{name}' on site {site_id}")))
    }

    /// Creates a project, optionally nested under `parent_project_id`.
    ///
    /// # Errors
    /// Returns `RestError::Api` with status 409 if the name is taken.
    pub async fn create_project(
        &self,
        credential: &Credential,
        site_id: &str,
        name: &str,
        description: Option<&str>,
        parent_project_id: Option<&str>,
    ) -> Result<Project, RestError> {
        debug!(site_id = %site_id, name = %name, "Creating project");

        let url = self.api_url(&format!("sites/{site_id}/projects"));
        let project = XmlElement::new("project")
            .attr("name", name)
            .attr_opt("description", description)
            .attr_opt("parentProjectId", parent_project_id);
        let request = self.xml_request(Method::POST, &url, Some(&credential.token), Some(project))?;
        let response = self.send_envelope(request, "create project", FailureKind::General).await?;
        require(response.project, "project", "create project")
    }
}
