//! Workload backends
//!
//! Implementations of [`WorkloadBackend`] for each supported platform.

pub mod aws;
pub mod container;
pub mod images;
pub mod replay;

pub use aws::{AwsInstanceBackend, AwsSettings, AWS_BACKEND_ID, DEFAULT_INSTANCE_TYPE};
pub use container::{
    ContainerBackend, ContainerRuntime, ContainerSettings, CONTAINER_BACKEND_ID,
    DEFAULT_CONTAINER_IMAGE,
};
pub use images::{ImageCatalog, ImageCatalogError};
pub use replay::{ReplayBackend, REPLAY_BACKEND_ID};

use egress_verifier_base::workload::WorkloadBackend;

/// Platform selector exposed on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Platform {
    /// EC2 instance in the subnet under test
    Aws,
    /// Local docker/podman container
    Container,
    /// Captured console or log file
    Replay,
}

/// Everything any backend may need; each backend reads its own fields
#[derive(Debug, Clone, Default)]
pub struct BackendOptions {
    pub subnet_id: Option<String>,
    pub image_id: Option<String>,
    pub instance_type: Option<String>,
    pub region: Option<String>,
    pub profile: Option<String>,
    pub security_group_ids: Vec<String>,
    pub network: Option<String>,
    pub podman: bool,
    pub replay_file: Option<String>,
    pub image_catalog: Option<ImageCatalog>,
}

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Missing option for the {platform} platform: {option}")]
    MissingOption {
        platform: &'static str,
        option: &'static str,
    },

    #[error(transparent)]
    Workload(#[from] egress_verifier_base::workload::WorkloadError),
}

/// Build the backend for `platform`
pub fn create_backend(
    platform: Platform,
    options: &BackendOptions,
) -> Result<Box<dyn WorkloadBackend>, BackendError> {
    match platform {
        Platform::Aws => {
            let missing = |option| BackendError::MissingOption {
                platform: AWS_BACKEND_ID,
                option,
            };
            let region = options.region.clone().ok_or_else(|| missing("--region"))?;
            let image_id = match &options.image_id {
                Some(id) => id.clone(),
                None => options
                    .image_catalog
                    .as_ref()
                    .and_then(|c| c.aws_image(&region))
                    .map(str::to_string)
                    .ok_or_else(|| missing("--image-id (no catalog entry for region)"))?,
            };
            let settings = AwsSettings {
                subnet_id: options.subnet_id.clone().ok_or_else(|| missing("--subnet-id"))?,
                image_id,
                instance_type: options
                    .instance_type
                    .clone()
                    .unwrap_or_else(|| DEFAULT_INSTANCE_TYPE.to_string()),
                region,
                profile: options.profile.clone(),
                security_group_ids: options.security_group_ids.clone(),
            };
            Ok(Box::new(AwsInstanceBackend::new(settings)?))
        }
        Platform::Container => {
            let settings = ContainerSettings {
                runtime: if options.podman {
                    ContainerRuntime::Podman
                } else {
                    ContainerRuntime::Docker
                },
                image: options
                    .image_id
                    .clone()
                    .unwrap_or_else(|| DEFAULT_CONTAINER_IMAGE.to_string()),
                network: options.network.clone(),
            };
            Ok(Box::new(ContainerBackend::new(settings)?))
        }
        Platform::Replay => {
            let path = options
                .replay_file
                .clone()
                .ok_or(BackendError::MissingOption {
                    platform: REPLAY_BACKEND_ID,
                    option: "--replay-file",
                })?;
            Ok(Box::new(ReplayBackend::new(path)))
        }
    }
}
