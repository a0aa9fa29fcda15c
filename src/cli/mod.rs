// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses command line arguments with clap and hands the work
// to the library. Nothing here computes; it only routes and
// prints.
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use std::{
    fs,
    io::{self, BufRead},
    path::Path,
};

use anyhow::{Context, Result};
use burn::module::Module;
use clap::Parser;
use commands::{
    ArchArgs, BuildDictArgs, CheckTaskArgs, Commands, EncodeArgs, ImportBertArgs, LoadCheckpointArgs,
};

use bert_nmt::application::{registry::build_arch_args, task::{BertTranslationTask, TaskArgs}};
use bert_nmt::data::bert_based::BertBasedDictionary;
use bert_nmt::domain::traits::Vocabulary;
use bert_nmt::infra::pretrained::PretrainedStore;
use bert_nmt::ml::arch::ArchOverrides;

type CliBackend = burn::backend::Wgpu;

#[derive(Parser, Debug)]
#[command(
    name = "bert-nmt",
    version = "0.1.0",
    about = "Translation with a pretrained BERT encoder and a transformer decoder."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

fn read_overrides(path: Option<&Path>) -> Result<ArchOverrides> {
    match path {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("Cannot read arch config '{}'", path.display()))?;
            serde_json::from_str(&json)
                .with_context(|| format!("Invalid arch config '{}'", path.display()))
        }
        None => Ok(ArchOverrides::default()),
    }
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::BuildDict(args)      => run_build_dict(args),
            Commands::Encode(args)         => run_encode(args),
            Commands::Arch(args)           => run_arch(args),
            Commands::CheckTask(args)      => run_check_task(args),
            Commands::LoadCheckpoint(args) => run_load_checkpoint(args),
            Commands::ImportBert(args)     => run_import_bert(args),
        }
    }
}

fn run_build_dict(args: BuildDictArgs) -> Result<()> {
    tracing::info!("Building dictionary from {} file(s)", args.files.len());
    let dict = BertTranslationTask::build_dictionary(args.files.as_slice(), args.threshold, args.nwords, args.padding_factor)?;
    dict.save(&args.dest)
        .with_context(|| format!("Cannot write '{}'", args.dest.display()))?;
    println!("Wrote {} symbols to {}", dict.len(), args.dest.display());
    Ok(())
}

fn run_encode(args: EncodeArgs) -> Result<()> {
    let name = args.bert.bert_name.unwrap_or_default();
    let dict = match &args.vocab {
        Some(vocab) => BertBasedDictionary::from_vocab_file(name, vocab)?,
        None        => BertBasedDictionary::new(name, &PretrainedStore::new(&args.store.bert_dir))?,
    };

    let lines: Vec<String> = match &args.input {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?
            .lines()
            .map(str::to_string)
            .collect(),
        None => io::stdin().lock().lines().collect::<io::Result<_>>()?,
    };

    for line in &lines {
        let ids = dict.encode_line(line, args.reverse)?;
        let ids_str: Vec<String> = ids.iter().map(u32::to_string).collect();
        println!("{}", ids_str.join(" "));
        println!("{}", dict.string(&ids, None, false));
    }
    Ok(())
}

fn run_arch(args: ArchArgs) -> Result<()> {
    let overrides = args.bert.apply(read_overrides(args.arch_config.as_deref())?);
    let model_args = build_arch_args(&args.arch, &overrides)?;
    println!("{}", serde_json::to_string_pretty(&model_args)?);
    Ok(())
}

fn run_check_task(args: CheckTaskArgs) -> Result<()> {
    let store = PretrainedStore::new(&args.store.bert_dir);
    let task  = BertTranslationTask::setup_task(TaskArgs::from(&args), store)
        .context("Task setup failed")?;

    println!(
        "{} -> {}: source {} types, target {} types",
        task.args.source_lang.as_deref().unwrap_or("?"),
        task.args.target_lang.as_deref().unwrap_or("?"),
        task.src_dict.len(),
        task.tgt_dict.len(),
    );

    if let Some(arch) = &args.arch {
        let overrides  = args.bert.apply(read_overrides(args.arch_config.as_deref())?);
        let model_args = build_arch_args(arch, &overrides)?;
        let device     = burn::backend::wgpu::WgpuDevice::default();
        let model      = task.build_model::<CliBackend>(&model_args, &device)?;
        println!("Built {arch}: {} parameters", model.num_params());
    }
    Ok(())
}

fn run_load_checkpoint(args: LoadCheckpointArgs) -> Result<()> {
    let store     = PretrainedStore::new(&args.store.bert_dir);
    let overrides = match (&args.arch_config, &args.bert) {
        (None, b) if b.bert_name.is_none() && b.bert_layer.is_none() && !b.no_freeze_bert => None,
        (path, b) => Some(b.apply(read_overrides(path.as_deref())?)),
    };

    let device = burn::backend::wgpu::WgpuDevice::default();
    let (task, model) = BertTranslationTask::load_pretrained_model::<CliBackend>(
        &args.path,
        args.src_vocab.as_deref(),
        &args.tgt_dict,
        overrides.as_ref(),
        store,
        &device,
    )
    .with_context(|| format!("Cannot load checkpoint '{}'", args.path.display()))?;

    println!(
        "Loaded {} ({} parameters, encoder layer {}, target vocabulary {})",
        args.path.display(),
        model.num_params(),
        model.encoder.layer(),
        task.tgt_dict.len(),
    );
    Ok(())
}

fn run_import_bert(args: ImportBertArgs) -> Result<()> {
    let store  = PretrainedStore::new(&args.store.bert_dir);
    let device = burn::backend::wgpu::WgpuDevice::default();
    store
        .convert_pytorch::<CliBackend>(args.bert_name, &device)
        .with_context(|| format!("Cannot import {}", args.bert_name))?;
    println!("Wrote {}", store.weights_path(args.bert_name).with_extension("mpk").display());
    Ok(())
}
