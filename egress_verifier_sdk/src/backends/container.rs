//! Container backend (docker or podman)
//!
//! Runs the probe script as `/bin/sh -c` in a detached container attached to
//! the network under test, reads `logs`, and force-removes the container.

use crate::commands::create_container_command_executor;
use egress_verifier_base::extraction::OutputEncoding;
use egress_verifier_base::workload::{
    LaunchRequest, SystemCommandExecutor, WorkloadBackend, WorkloadError, WorkloadHandle,
};

pub const CONTAINER_BACKEND_ID: &str = "container";
pub const DEFAULT_CONTAINER_IMAGE: &str = "docker.io/curlimages/curl:latest";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerRuntime {
    Docker,
    Podman,
}

impl ContainerRuntime {
    pub fn program(&self) -> &'static str {
        match self {
            ContainerRuntime::Docker => "docker",
            ContainerRuntime::Podman => "podman",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSettings {
    pub runtime: ContainerRuntime,
    pub image: String,
    /// Network to attach to; runtime default when unset
    pub network: Option<String>,
}

pub struct ContainerBackend {
    settings: ContainerSettings,
    executor: SystemCommandExecutor,
}

impl ContainerBackend {
    pub fn new(settings: ContainerSettings) -> Result<Self, WorkloadError> {
        Self::with_executor(settings, create_container_command_executor())
    }

    pub fn with_executor(
        settings: ContainerSettings,
        executor: SystemCommandExecutor,
    ) -> Result<Self, WorkloadError> {
        if settings.image.trim().is_empty() {
            return Err(WorkloadError::InvalidConfiguration {
                reason: "container image is required".to_string(),
            });
        }
        Ok(Self { settings, executor })
    }

    fn run_args(&self, request: &LaunchRequest) -> Vec<String> {
        let mut args = vec!["run".to_string(), "--detach".to_string()];
        args.push("--label".to_string());
        args.push(format!("egress-verifier-probe={}", request.probe_id));
        for (key, value) in &request.tags {
            args.push("--label".to_string());
            args.push(format!("{}={}", key, value));
        }
        if let Some(network) = &self.settings.network {
            args.push("--network".to_string());
            args.push(network.clone());
        }
        args.extend([
            "--entrypoint".to_string(),
            "/bin/sh".to_string(),
            self.settings.image.clone(),
            "-c".to_string(),
            request.userdata.clone(),
        ]);
        args
    }

    fn run(&self, args: &[&str]) -> Result<String, WorkloadError> {
        Ok(self
            .executor
            .execute_checked(self.settings.runtime.program(), args, None)?)
    }
}

impl WorkloadBackend for ContainerBackend {
    fn backend_id(&self) -> &str {
        CONTAINER_BACKEND_ID
    }

    fn output_encoding(&self) -> OutputEncoding {
        OutputEncoding::Plain
    }

    fn target(&self) -> String {
        format!(
            "{} network {}",
            self.settings.runtime.program(),
            self.settings.network.as_deref().unwrap_or("default")
        )
    }

    fn launch(&self, request: &LaunchRequest) -> Result<WorkloadHandle, WorkloadError> {
        let args = self.run_args(request);
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let stdout = self
            .run(&refs)
            .map_err(|e| WorkloadError::launch_failed(CONTAINER_BACKEND_ID, e.to_string()))?;

        let id = stdout.trim();
        if id.is_empty() {
            return Err(WorkloadError::launch_failed(
                CONTAINER_BACKEND_ID,
                "runtime returned no container id",
            ));
        }
        Ok(WorkloadHandle::new(id, CONTAINER_BACKEND_ID))
    }

    /// Combined stdout and stderr of the container
    fn fetch_output(&self, handle: &WorkloadHandle) -> Result<String, WorkloadError> {
        let output = self
            .executor
            .execute(self.settings.runtime.program(), &["logs", handle.id.as_str()], None)
            .map_err(|e| WorkloadError::fetch_failed(&handle.id, e.to_string()))?;
        if !output.success() {
            return Err(WorkloadError::fetch_failed(&handle.id, output.stderr.trim()));
        }
        Ok(format!("{}{}", output.stdout, output.stderr))
    }

    fn terminate(&self, handle: &WorkloadHandle) -> Result<(), WorkloadError> {
        self.run(&["rm", "--force", handle.id.as_str()])
            .map(|_| ())
            .map_err(|e| WorkloadError::terminate_failed(&handle.id, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> ContainerSettings {
        ContainerSettings {
            runtime: ContainerRuntime::Podman,
            image: DEFAULT_CONTAINER_IMAGE.to_string(),
            network: Some("egress-test".to_string()),
        }
    }

    #[test]
    fn test_run_args() {
        let backend = ContainerBackend::new(settings()).unwrap();
        let request = LaunchRequest::new("dummy", "echo hi");
        let args = backend.run_args(&request);

        assert_eq!(args[0], "run");
        assert!(args.contains(&"egress-verifier-probe=dummy".to_string()));
        let net = args.iter().position(|a| a == "--network").unwrap();
        assert_eq!(args[net + 1], "egress-test");
        assert_eq!(args[args.len() - 2], "-c");
        assert_eq!(args[args.len() - 1], "echo hi");
        assert_eq!(backend.target(), "podman network egress-test");
    }

    #[test]
    fn test_empty_image_rejected() {
        let mut bad = settings();
        bad.image = " ".to_string();
        assert!(ContainerBackend::new(bad).is_err());
    }

    #[test]
    fn test_runtime_outside_whitelist() {
        let backend =
            ContainerBackend::with_executor(settings(), SystemCommandExecutor::new()).unwrap();
        let handle = WorkloadHandle::new("abc", CONTAINER_BACKEND_ID);
        assert!(backend.terminate(&handle).is_err());
    }
}
