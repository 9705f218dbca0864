//! Run-order planner - module names to an ordered step list

use crate::core::{ModuleName, StepDescriptor, StepKey};

/// Map enabled module names to the steps to run.
///
/// Steps always come out in `StepKey::ALL` order, whatever order the
/// modules were enabled in. A step is included when any module name
/// contains its keyword, case-insensitively.
pub fn plan_steps(modules: &[ModuleName]) -> Vec<StepDescriptor> {
    StepKey::ALL
        .iter()
        .filter(|key| modules.iter().any(|m| m.mentions(key.keyword())))
        .map(|key| StepDescriptor::from(*key))
        .collect()
}
