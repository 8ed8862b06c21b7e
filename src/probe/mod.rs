//! In-process probe: the hit table, global runtime config, class filter,
//! bytecode instrumentation model, control-plane HTTP server, and
//! startup-argument parsing that together make up the agent side of the
//! system (SPEC_FULL.md §2, §4.1-§4.4, §6.1-§6.2).

pub mod class_filter;
pub mod control_plane;
pub mod hit_table;
pub mod instrumenter;
pub mod launch_args;
pub mod runtime;

use crate::probe::control_plane::ResetLedger;
use crate::probe::runtime::ProbeRuntime;
use std::sync::Arc;

/// Installs the probe: parses startup arguments and returns the runtime and
/// reset ledger an embedder wires into its control-plane server and
/// instrumentation hooks. Does not itself start the HTTP listener; callers
/// choose when to call [`control_plane::serve`].
#[must_use]
pub fn install(
    raw_args: &str,
    system_properties: &launch_args::SystemProperties,
) -> (launch_args::LaunchArgs, Arc<ProbeRuntime>, Arc<ResetLedger>) {
    let args = launch_args::parse(raw_args, system_properties);
    let runtime = Arc::new(ProbeRuntime::new());
    runtime.configure(runtime::RuntimeConfig {
        mode: args.mode,
        actuator_id: args.actuator_id.clone(),
        actuate_target_key: args.actuate_target.clone(),
        actuate_return_boolean: args.actuate_return_boolean,
    });
    (args, runtime, Arc::new(ResetLedger::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_applies_parsed_args_to_runtime() {
        let (args, runtime, _ledger) =
            install("mode=actuate;actuatorId=a;actuateTarget=c.C#m:1", &launch_args::SystemProperties::new());
        assert_eq!(args.mode, runtime::ProbeMode::Actuate);
        assert_eq!(runtime.config().actuator_id, "a");
    }
}
