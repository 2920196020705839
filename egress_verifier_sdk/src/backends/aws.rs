//! AWS EC2 instance backend
//!
//! Launches one instance per run in the subnet under test, reads its serial
//! console through `get-console-output`, and terminates it afterwards. All
//! calls go through the `aws` CLI.

use crate::commands::create_aws_command_executor;
use egress_verifier_base::extraction::OutputEncoding;
use egress_verifier_base::workload::{
    LaunchRequest, SystemCommandExecutor, WorkloadBackend, WorkloadError, WorkloadHandle,
};

pub const AWS_BACKEND_ID: &str = "aws";
pub const DEFAULT_INSTANCE_TYPE: &str = "t3.micro";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwsSettings {
    pub subnet_id: String,
    pub image_id: String,
    pub instance_type: String,
    pub region: String,
    pub profile: Option<String>,
    pub security_group_ids: Vec<String>,
}

pub struct AwsInstanceBackend {
    settings: AwsSettings,
    executor: SystemCommandExecutor,
}

impl AwsInstanceBackend {
    pub fn new(settings: AwsSettings) -> Result<Self, WorkloadError> {
        Self::with_executor(settings, create_aws_command_executor())
    }

    pub fn with_executor(
        settings: AwsSettings,
        executor: SystemCommandExecutor,
    ) -> Result<Self, WorkloadError> {
        for (name, value) in [
            ("subnet id", &settings.subnet_id),
            ("image id", &settings.image_id),
            ("region", &settings.region),
            ("instance type", &settings.instance_type),
        ] {
            if value.trim().is_empty() {
                return Err(WorkloadError::InvalidConfiguration {
                    reason: format!("{} is required for the aws backend", name),
                });
            }
        }
        if !settings.subnet_id.starts_with("subnet-") {
            return Err(WorkloadError::InvalidConfiguration {
                reason: format!("'{}' is not a subnet id", settings.subnet_id),
            });
        }
        Ok(Self { settings, executor })
    }

    /// Arguments shared by every call: region and optional profile
    fn base_args(&self, service_args: &[&str]) -> Vec<String> {
        let mut args: Vec<String> = service_args.iter().map(|s| s.to_string()).collect();
        args.push("--region".to_string());
        args.push(self.settings.region.clone());
        if let Some(profile) = &self.settings.profile {
            args.push("--profile".to_string());
            args.push(profile.clone());
        }
        args
    }

    fn run_instances_args(&self, request: &LaunchRequest) -> Vec<String> {
        let mut args = self.base_args(&["ec2", "run-instances"]);
        args.extend(
            [
                "--image-id",
                self.settings.image_id.as_str(),
                "--instance-type",
                self.settings.instance_type.as_str(),
                "--subnet-id",
                self.settings.subnet_id.as_str(),
                "--count",
                "1",
                "--user-data",
                request.userdata.as_str(),
                "--query",
                "Instances[0].InstanceId",
                "--output",
                "text",
            ]
            .iter()
            .map(|s| s.to_string()),
        );

        if !self.settings.security_group_ids.is_empty() {
            args.push("--security-group-ids".to_string());
            args.extend(self.settings.security_group_ids.iter().cloned());
        }

        let mut tags = vec![format!("{{Key=egress-verifier-probe,Value={}}}", request.probe_id)];
        tags.extend(
            request
                .tags
                .iter()
                .map(|(k, v)| format!("{{Key={},Value={}}}", k, v)),
        );
        args.push("--tag-specifications".to_string());
        args.push(format!("ResourceType=instance,Tags=[{}]", tags.join(",")));

        args
    }

    fn run(&self, args: &[String]) -> Result<String, WorkloadError> {
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        Ok(self.executor.execute_checked("aws", &refs, None)?)
    }
}

/// The CLI prints `None` for a null text query result
fn parse_text_output(stdout: &str) -> Option<&str> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() || trimmed == "None" {
        None
    } else {
        Some(trimmed)
    }
}

impl WorkloadBackend for AwsInstanceBackend {
    fn backend_id(&self) -> &str {
        AWS_BACKEND_ID
    }

    /// The CLI decodes the console output before printing it
    fn output_encoding(&self) -> OutputEncoding {
        OutputEncoding::Plain
    }

    fn target(&self) -> String {
        format!("{} ({})", self.settings.subnet_id, self.settings.region)
    }

    fn launch(&self, request: &LaunchRequest) -> Result<WorkloadHandle, WorkloadError> {
        let stdout = self
            .run(&self.run_instances_args(request))
            .map_err(|e| WorkloadError::launch_failed(AWS_BACKEND_ID, e.to_string()))?;

        match parse_text_output(&stdout) {
            Some(id) if id.starts_with("i-") => Ok(WorkloadHandle::new(id, AWS_BACKEND_ID)),
            _ => Err(WorkloadError::launch_failed(
                AWS_BACKEND_ID,
                format!("unexpected run-instances output '{}'", stdout.trim()),
            )),
        }
    }

    fn fetch_output(&self, handle: &WorkloadHandle) -> Result<String, WorkloadError> {
        let args = self.base_args(&[
            "ec2",
            "get-console-output",
            "--instance-id",
            handle.id.as_str(),
            "--query",
            "Output",
            "--output",
            "text",
        ]);
        let stdout = self
            .run(&args)
            .map_err(|e| WorkloadError::fetch_failed(&handle.id, e.to_string()))?;
        Ok(parse_text_output(&stdout).unwrap_or_default().to_string())
    }

    fn terminate(&self, handle: &WorkloadHandle) -> Result<(), WorkloadError> {
        let args = self.base_args(&["ec2", "terminate-instances", "--instance-ids", handle.id.as_str()]);
        self.run(&args)
            .map(|_| ())
            .map_err(|e| WorkloadError::terminate_failed(&handle.id, e.to_string()))
    }
}
