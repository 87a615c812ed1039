//! Policy and boundary operations
//!
//! Thin typed wrappers over [`ArmisClient`]. Inputs are validated before any
//! request is built, so an empty rule tree or a blank id never reaches the
//! network.

use std::sync::Arc;

use armis_domain::constants::{BOUNDARIES_PATH, POLICIES_PATH};
use armis_domain::{
    ArmisError, Boundary, BoundarySettings, CreatedResource, Envelope, Policy, PolicySettings,
    Result,
};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};
use urlencoding::encode;

use super::service::ArmisClient;

/// API commands for policies and boundaries
#[derive(Debug, Clone)]
pub struct ArmisCommands {
    client: Arc<ArmisClient>,
}

impl ArmisCommands {
    /// Commands issued through `client`.
    pub fn new(client: Arc<ArmisClient>) -> Self {
        Self { client }
    }

    /// Authenticated client the commands go through.
    pub fn client(&self) -> &Arc<ArmisClient> {
        &self.client
    }

    // === Policy Operations ===

    /// Create a policy and return its id.
    ///
    /// # Errors
    /// [`ArmisError::Validation`] for a blank name or rule type or an empty
    /// rule tree, [`ArmisError::Unsuccessful`] when the server reports
    /// `success=false`, plus the client's classified errors.
    #[instrument(skip(self, settings, cancel), fields(name = %settings.name))]
    pub async fn create_policy(
        &self,
        settings: &PolicySettings,
        cancel: &CancellationToken,
    ) -> Result<String> {
        settings.validate()?;

        let created: CreatedResource =
            self.client.post(&collection(POLICIES_PATH), settings, cancel).await?.into_data()?;

        debug!(policy_id = %created.id, "Policy created");
        Ok(created.id)
    }

    /// # Errors
    /// [`ArmisError::Validation`] for a blank id, [`ArmisError::Api`] with
    /// status 404 for an unknown one.
    #[instrument(skip(self, cancel))]
    pub async fn get_policy(&self, id: &str, cancel: &CancellationToken) -> Result<Policy> {
        let path = item(POLICIES_PATH, id)?;
        self.client.get(&path, cancel).await?.into_data()
    }

    /// Replace a policy's writable fields.
    ///
    /// # Errors
    /// Same validation as [`ArmisCommands::create_policy`], plus a blank id.
    #[instrument(skip(self, settings, cancel))]
    pub async fn update_policy(
        &self,
        id: &str,
        settings: &PolicySettings,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let path = item(POLICIES_PATH, id)?;
        settings.validate()?;

        let envelope: Envelope<Option<Value>> = self.client.put(&path, settings, cancel).await?;
        envelope.into_data().map(drop)
    }

    /// # Errors
    /// [`ArmisError::Validation`] for a blank id,
    /// [`ArmisError::Unsuccessful`] when the server reports `success=false`.
    #[instrument(skip(self, cancel))]
    pub async fn delete_policy(&self, id: &str, cancel: &CancellationToken) -> Result<()> {
        let path = item(POLICIES_PATH, id)?;
        let envelope: Envelope<Option<Value>> = self.client.delete(&path, cancel).await?;
        envelope.into_data().map(drop)
    }

    // === Boundary Operations ===

    /// Create a boundary and return its id.
    ///
    /// # Errors
    /// [`ArmisError::Validation`] for a blank name or an empty rule tree.
    #[instrument(skip(self, settings, cancel), fields(name = %settings.name))]
    pub async fn create_boundary(
        &self,
        settings: &BoundarySettings,
        cancel: &CancellationToken,
    ) -> Result<String> {
        settings.validate()?;

        let created: CreatedResource =
            self.client.post(&collection(BOUNDARIES_PATH), settings, cancel).await?.into_data()?;

        debug!(boundary_id = %created.id, "Boundary created");
        Ok(created.id)
    }

    /// # Errors
    /// [`ArmisError::Validation`] for a blank id.
    #[instrument(skip(self, cancel))]
    pub async fn get_boundary(&self, id: &str, cancel: &CancellationToken) -> Result<Boundary> {
        let path = item(BOUNDARIES_PATH, id)?;
        self.client.get(&path, cancel).await?.into_data()
    }

    /// # Errors
    /// Same validation as [`ArmisCommands::create_boundary`], plus a blank id.
    #[instrument(skip(self, settings, cancel))]
    pub async fn update_boundary(
        &self,
        id: &str,
        settings: &BoundarySettings,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let path = item(BOUNDARIES_PATH, id)?;
        settings.validate()?;

        let envelope: Envelope<Option<Value>> = self.client.put(&path, settings, cancel).await?;
        envelope.into_data().map(drop)
    }

    /// # Errors
    /// [`ArmisError::Validation`] for a blank id.
    #[instrument(skip(self, cancel))]
    pub async fn delete_boundary(&self, id: &str, cancel: &CancellationToken) -> Result<()> {
        let path = item(BOUNDARIES_PATH, id)?;
        let envelope: Envelope<Option<Value>> = self.client.delete(&path, cancel).await?;
        envelope.into_data().map(drop)
    }

    /// First page of boundaries with the server's pagination fields.
    ///
    /// The envelope is returned untouched; check `success` before use.
    #[instrument(skip(self, cancel))]
    pub async fn list_boundaries(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Envelope<Vec<Boundary>>> {
        self.client.get(&collection(BOUNDARIES_PATH), cancel).await
    }
}

fn collection(resource: &str) -> String {
    format!("{resource}/")
}

fn item(resource: &str, id: &str) -> Result<String> {
    let id = id.trim();
    if id.is_empty() {
        return Err(ArmisError::Validation(format!("{resource} id required")));
    }
    Ok(format!("{resource}/{}/", encode(id)))
}
