//! No-op probe used to smoke-test workload backends

use crate::output::OutputModel;
use crate::probes::errors::ProbeError;
use crate::probes::traits::Probe;
use crate::template::{TemplateSpec, ValueRules};
use std::collections::HashMap;

pub const DUMMY_PROBE_ID: &str = "dummy";

const STARTING_TOKEN: &str = "NV_DUMMY_BEGIN";
const ENDING_TOKEN: &str = "NV_DUMMY_END";
const MARKER: &str = "dummy probe ran";

const USERDATA_TEMPLATE: &str = include_str!("assets/dummy_userdata.sh");

pub struct DummyProbe {
    template: TemplateSpec,
}

impl DummyProbe {
    pub fn new() -> Result<Self, ProbeError> {
        Ok(Self {
            template: TemplateSpec::parse(USERDATA_TEMPLATE)?,
        })
    }
}

impl Probe for DummyProbe {
    fn probe_id(&self) -> &str {
        DUMMY_PROBE_ID
    }

    fn starting_token(&self) -> &str {
        STARTING_TOKEN
    }

    fn ending_token(&self) -> &str {
        ENDING_TOKEN
    }

    fn expanded_userdata(&self, supplied: &HashMap<String, String>) -> Result<String, ProbeError> {
        let reserved: HashMap<String, String> = [
            ("USERDATA_BEGIN", STARTING_TOKEN),
            ("USERDATA_END", ENDING_TOKEN),
            ("DUMMY_MARKER", MARKER),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Ok(self.template.expand(&reserved, supplied, &ValueRules::new())?)
    }

    fn parse_probe_output(&self, payload: &str, output: &mut OutputModel) {
        output.add_debug(format!(
            "dummy probe output received ({} bytes, marker present: {})",
            payload.len(),
            payload.contains(MARKER)
        ));
    }

    fn description(&self) -> &str {
        "no-op probe that never touches the network"
    }
}
