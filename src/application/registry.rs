// Name → constructor tables for everything a training script can
// ask for by name: the model, its architecture presets and the task.

use crate::application::task::TASK_NAME;
use crate::error::{BertNmtError, Result};
use crate::ml::arch::{bert_nmt_base, bert_nmt_big, bert_nmt_big_t2t, ArchOverrides, ModelArgs};
use crate::ml::model::MODEL_NAME;

pub type ArchFn = fn(&ArchOverrides) -> ModelArgs;

/// Every registered architecture. All of them build `MODEL_NAME`.
pub const ARCHITECTURES: [(&str, ArchFn); 3] = [
    ("bert_nmt",         bert_nmt_base),
    ("bert_nmt_big",     bert_nmt_big),
    ("bert_nmt_big_t2t", bert_nmt_big_t2t),
];

pub fn lookup_architecture(name: &str) -> Result<ArchFn> {
    ARCHITECTURES
        .iter()
        .find(|(arch, _)| *arch == name)
        .map(|(_, build)| *build)
        .ok_or_else(|| BertNmtError::UnknownRegistryName { kind: "architecture", name: name.to_string() })
}

pub fn lookup_model(name: &str) -> Result<&'static str> {
    (name == MODEL_NAME)
        .then_some(MODEL_NAME)
        .ok_or_else(|| BertNmtError::UnknownRegistryName { kind: "model", name: name.to_string() })
}

pub fn lookup_task(name: &str) -> Result<&'static str> {
    (name == TASK_NAME)
        .then_some(TASK_NAME)
        .ok_or_else(|| BertNmtError::UnknownRegistryName { kind: "task", name: name.to_string() })
}

/// Resolve an architecture by name and apply it to `overrides`.
pub fn build_arch_args(name: &str, overrides: &ArchOverrides) -> Result<ModelArgs> {
    Ok(lookup_architecture(name)?(overrides))
}
