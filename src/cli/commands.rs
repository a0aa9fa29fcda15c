// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the subcommands and their flags. The BERT flags are
// shared by every command that builds or restores a model.
//
// Reference: Rust Book §12 (Building a CLI Program)

use std::path::PathBuf;

use clap::{Args, Subcommand};

use bert_nmt::application::task::TaskArgs;
use bert_nmt::domain::bert_name::BertName;
use bert_nmt::infra::pretrained::PRETRAINED_DIR_ENV;
use bert_nmt::ml::arch::ArchOverrides;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Count a target corpus into a Bert-compatible dictionary file
    BuildDict(BuildDictArgs),

    /// Encode source lines with the BERT tokenizer and print the ids
    Encode(EncodeArgs),

    /// Print the fully resolved configuration of an architecture
    Arch(ArchArgs),

    /// Set up the bert_translation task and check its dictionaries
    CheckTask(CheckTaskArgs),

    /// Restore a model from a checkpoint directory
    LoadCheckpoint(LoadCheckpointArgs),

    /// Convert a store's pytorch_model.bin into a Burn record
    ImportBert(ImportBertArgs),
}

/// Where pretrained BERT models live.
#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    #[arg(long, env = PRETRAINED_DIR_ENV, default_value = "pretrained")]
    pub bert_dir: PathBuf,
}

/// The encoder flags registered by the bert_nmt model.
#[derive(Args, Debug, Clone, Default)]
pub struct BertArgs {
    /// Pretrained BERT checkpoint used as the source encoder
    #[arg(long, value_enum)]
    pub bert_name: Option<BertName>,

    /// Which BERT layer's hidden states feed the decoder; negative counts from the top
    #[arg(long, allow_negative_numbers = true)]
    pub bert_layer: Option<i64>,

    /// Train BERT along with the decoder instead of freezing it
    #[arg(long)]
    pub no_freeze_bert: bool,
}

impl BertArgs {
    /// Flags given on the command line win over the config file.
    pub fn apply(&self, overrides: ArchOverrides) -> ArchOverrides {
        ArchOverrides {
            bert_name:      self.bert_name.or(overrides.bert_name),
            bert_layer:     self.bert_layer.or(overrides.bert_layer),
            no_freeze_bert: self.no_freeze_bert.then_some(true).or(overrides.no_freeze_bert),
            ..overrides
        }
    }
}

#[derive(Args, Debug)]
pub struct BuildDictArgs {
    /// Tokenized corpus files, one sentence per line
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Output dictionary file
    #[arg(long, default_value = "dict.txt")]
    pub dest: PathBuf,

    /// Drop symbols seen fewer times than this
    #[arg(long, default_value_t = 0)]
    pub threshold: usize,

    /// Keep at most this many learned symbols
    #[arg(long)]
    pub nwords: Option<usize>,

    /// Pad the table size to a multiple of this
    #[arg(long, default_value_t = 8)]
    pub padding_factor: usize,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    #[command(flatten)]
    pub bert: BertArgs,

    #[command(flatten)]
    pub store: StoreArgs,

    /// Explicit vocab.txt instead of the store's
    #[arg(long)]
    pub vocab: Option<PathBuf>,

    /// Reverse the subword order inside [CLS] ... [SEP]
    #[arg(long)]
    pub reverse: bool,

    /// File to encode; stdin when absent
    #[arg(long)]
    pub input: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ArchArgs {
    /// Registered architecture name
    #[arg(long, default_value = "bert_nmt")]
    pub arch: String,

    /// JSON file with architecture overrides
    #[arg(long)]
    pub arch_config: Option<PathBuf>,

    #[command(flatten)]
    pub bert: BertArgs,
}

#[derive(Args, Debug)]
pub struct CheckTaskArgs {
    /// Data directories; the first one holds the dictionaries
    #[arg(long, required = true)]
    pub data: Vec<PathBuf>,

    #[arg(long)]
    pub source_lang: Option<String>,

    #[arg(long)]
    pub target_lang: Option<String>,

    #[arg(long, default_value = "True")]
    pub left_pad_source: String,

    #[arg(long, default_value = "False")]
    pub left_pad_target: String,

    #[arg(long, default_value_t = 1024)]
    pub max_source_positions: usize,

    #[arg(long, default_value_t = 1024)]
    pub max_target_positions: usize,

    /// Also build the model with this architecture
    #[arg(long)]
    pub arch: Option<String>,

    /// JSON file with architecture overrides
    #[arg(long)]
    pub arch_config: Option<PathBuf>,

    #[command(flatten)]
    pub bert: BertArgs,

    #[command(flatten)]
    pub store: StoreArgs,
}

/// Convert CLI args into the task's own argument struct.
/// The task never sees clap types.
impl From<&CheckTaskArgs> for TaskArgs {
    fn from(a: &CheckTaskArgs) -> Self {
        TaskArgs {
            data:                 a.data.clone(),
            source_lang:          a.source_lang.clone(),
            target_lang:          a.target_lang.clone(),
            left_pad_source:      a.left_pad_source.clone(),
            left_pad_target:      a.left_pad_target.clone(),
            bert_name:            a.bert.bert_name.unwrap_or_default(),
            max_source_positions: a.max_source_positions,
            max_target_positions: a.max_target_positions,
        }
    }
}

#[derive(Args, Debug)]
pub struct LoadCheckpointArgs {
    /// Checkpoint directory written by save_checkpoint
    #[arg(long)]
    pub path: PathBuf,

    /// Target dictionary file
    #[arg(long)]
    pub tgt_dict: PathBuf,

    /// Explicit source vocab.txt instead of the store's
    #[arg(long)]
    pub src_vocab: Option<PathBuf>,

    /// JSON file with architecture overrides
    #[arg(long)]
    pub arch_config: Option<PathBuf>,

    #[command(flatten)]
    pub bert: BertArgs,

    #[command(flatten)]
    pub store: StoreArgs,
}

#[derive(Args, Debug)]
pub struct ImportBertArgs {
    /// Store entry holding config.json and pytorch_model.bin
    #[arg(long, value_enum)]
    pub bert_name: BertName,

    #[command(flatten)]
    pub store: StoreArgs,
}
