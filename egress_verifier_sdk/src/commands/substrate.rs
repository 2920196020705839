//! Substrate CLI executor configuration

use egress_verifier_base::workload::SystemCommandExecutor;
use std::time::Duration;

/// Variables the aws CLI needs to find credentials and configuration
const AWS_ENV: &[&str] = &[
    "HOME",
    "AWS_ACCESS_KEY_ID",
    "AWS_SECRET_ACCESS_KEY",
    "AWS_SESSION_TOKEN",
    "AWS_PROFILE",
    "AWS_REGION",
    "AWS_DEFAULT_REGION",
    "AWS_CONFIG_FILE",
    "AWS_SHARED_CREDENTIALS_FILE",
    "AWS_CA_BUNDLE",
    "HTTPS_PROXY",
    "HTTP_PROXY",
    "NO_PROXY",
];

/// Variables docker/podman need to reach their daemon or user storage
const CONTAINER_ENV: &[&str] = &[
    "HOME",
    "DOCKER_HOST",
    "DOCKER_CONFIG",
    "CONTAINER_HOST",
    "XDG_RUNTIME_DIR",
    "XDG_CONFIG_HOME",
];

/// Create command executor for the AWS instance backend
pub fn create_aws_command_executor() -> SystemCommandExecutor {
    let mut executor = SystemCommandExecutor::with_timeout(Duration::from_secs(60));

    executor.allow_commands(&[
        "aws", // EC2 run/get-console-output/terminate
    ]);
    executor.pass_env(AWS_ENV);
    // Keep CLI output machine-readable
    executor.set_env("AWS_PAGER", "");

    executor
}

/// Create command executor for the container backend
pub fn create_container_command_executor() -> SystemCommandExecutor {
    let mut executor = SystemCommandExecutor::with_timeout(Duration::from_secs(120));

    executor.allow_commands(&[
        "docker", // Container runtime
        "podman", // Rootless alternative
    ]);
    executor.pass_env(CONTAINER_ENV);

    executor
}
